use std::time::Instant;

use serde::Serialize;

use crate::api::ApiConfig;
use crate::model::{payload_key, Decision, FrequencySnapshot, GatePhase};
use crate::state::DecisionGate;
use crate::upload::ItemSubmission;

/// 解码器输出的一帧（同一帧内可能有多个条码，顺序不保证）。
#[derive(Clone, Debug, Default)]
pub struct DecodedFrame {
    pub symbols: Vec<Vec<u8>>,
    pub captured_at: Option<Instant>,
}

impl DecodedFrame {
    pub fn new(symbols: Vec<Vec<u8>>) -> Self {
        Self {
            symbols,
            captured_at: None,
        }
    }

    pub fn at(symbols: Vec<Vec<u8>>, at: Instant) -> Self {
        Self {
            symbols,
            captured_at: Some(at),
        }
    }
}

/// 处理统计。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub frames: u64,
    pub symbols: u64,
    pub discarded: u64,
    pub confirmations: u64,
}

/// 单个条码的处理结果（决策 + 可选提交请求）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanOutcome {
    pub decision: Decision,
    pub submission: Option<ItemSubmission>,
}

impl ScanOutcome {
    pub fn is_confirmed(&self) -> bool {
        self.decision.is_confirmed()
    }

    /// 确认时生成输出报告。
    pub fn report(&self) -> Option<ConfirmationReport<'_>> {
        let barcode = self.decision.confirmed.as_deref()?;
        Some(ConfirmationReport {
            barcode: payload_key(barcode),
            url: self.submission.as_ref().map(|s| s.url.as_str()),
            body: self.submission.as_ref().map(|s| s.form_body()),
            counts: &self.decision.frequencies,
        })
    }
}

/// 确认结果的 JSON 行输出。
#[derive(Debug, Serialize)]
pub struct ConfirmationReport<'a> {
    pub barcode: String,
    pub url: Option<&'a str>,
    pub body: Option<String>,
    pub counts: &'a FrequencySnapshot,
}

/// 扫码处理器（解码结果 -> 决策 -> 提交请求）。
#[derive(Debug)]
pub struct ScanProcessor {
    gate: DecisionGate,
    api: ApiConfig,
    stats: ScanStats,
}

impl ScanProcessor {
    pub fn new(gate: DecisionGate, api: ApiConfig) -> Self {
        Self {
            gate,
            api,
            stats: ScanStats::default(),
        }
    }

    pub fn gate(&self) -> &DecisionGate {
        &self.gate
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// 处理一个条码读数。
    pub fn handle_symbol(&mut self, payload: impl Into<Vec<u8>>, now: Instant) -> ScanOutcome {
        self.stats.symbols += 1;
        let was_cooling = self.gate.phase() == GatePhase::Cooldown;
        let decision = self.gate.input_at(payload, now);

        // 冷却期内被丢弃的读数返回空快照
        if was_cooling && decision.frequencies.is_empty() {
            self.stats.discarded += 1;
        }

        let submission = match decision.confirmed.as_deref() {
            Some(barcode) => {
                self.stats.confirmations += 1;
                let submission = ItemSubmission::from_payload(&self.api, barcode);
                if submission.is_none() {
                    log::warn!(
                        "confirmed barcode is not valid UTF-8, skipping submission: {:02X?}",
                        barcode
                    );
                }
                submission
            }
            None => None,
        };

        ScanOutcome {
            decision,
            submission,
        }
    }

    /// 逐个处理一帧中的全部条码。
    pub fn handle_frame(&mut self, frame: DecodedFrame, now: Instant) -> Vec<ScanOutcome> {
        self.stats.frames += 1;
        let now = frame.captured_at.unwrap_or(now);
        frame
            .symbols
            .into_iter()
            .map(|symbol| self.handle_symbol(symbol, now))
            .collect()
    }
}
