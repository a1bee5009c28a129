use serde::Serialize;

use crate::api::ApiConfig;

/// 确认后提交给 barcoded 服务端的入库请求（库存 +1）。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemSubmission {
    pub barcode: String,
    pub url: String,
    pub quantity_change: i32,
}

impl ItemSubmission {
    /// 由确认载荷构建请求；非 UTF-8 载荷无法作为路径提交。
    pub fn from_payload(api: &ApiConfig, payload: &[u8]) -> Option<Self> {
        let barcode = std::str::from_utf8(payload).ok()?;
        Some(Self {
            barcode: barcode.to_string(),
            url: api.item_url(barcode),
            quantity_change: 1,
        })
    }

    /// 表单编码的请求体。
    pub fn form_body(&self) -> String {
        format!("quantity_change={}", self.quantity_change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_submission_from_utf8_payload() {
        let api = ApiConfig::new("host:41040", false);
        let submission = ItemSubmission::from_payload(&api, b"0123").unwrap();
        assert_eq!(submission.url, "http://host:41040/api/item/0123");
        assert_eq!(submission.form_body(), "quantity_change=1");
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["barcode"], "0123");
        assert_eq!(json["quantity_change"], 1);
    }

    #[test]
    fn rejects_non_utf8_payload() {
        let api = ApiConfig::new("host", false);
        assert!(ItemSubmission::from_payload(&api, &[0xff, 0xfe]).is_none());
    }
}
