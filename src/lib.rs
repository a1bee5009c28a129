// 模块划分：决策门核心（窗口、冷却、投票）与外围处理管线
pub mod api;
pub mod cache;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod processor;
pub mod state;
pub mod upload;

pub use error::ConfigError;
pub use model::{Decision, FrequencySnapshot, GateConfig, GatePhase, Reading, ScannerSettings};
pub use state::DecisionGate;
