#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub address: String,
    pub uses_https: bool,
}

pub const ITEM_PATH: &str = "/api/item";

impl ApiConfig {
    pub fn new(address: impl Into<String>, uses_https: bool) -> Self {
        Self {
            address: address.into(),
            uses_https,
        }
    }

    pub fn protocol(&self) -> &'static str {
        if self.uses_https {
            "https"
        } else {
            "http"
        }
    }

    pub fn item_url(&self, barcode: &str) -> String {
        format!("{}://{}{}/{}", self.protocol(), self.address, ITEM_PATH, barcode)
    }
}
