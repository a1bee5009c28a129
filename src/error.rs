use thiserror::Error;

/// 决策门配置错误（构造时校验，运行期不再检查）。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("set_size must be greater than zero")]
    ZeroSetSize,
    #[error("required_num must be greater than zero")]
    ZeroRequiredNum,
    #[error("required_num ({required_num}) must not exceed set_size ({set_size})")]
    RequiredExceedsSetSize { required_num: usize, set_size: usize },
    #[error("set_time must be a positive finite number of seconds, got {0}")]
    InvalidSetTime(f64),
    #[error("cooldown_time must be a non-negative finite number of seconds, got {0}")]
    InvalidCooldownTime(f64),
}
