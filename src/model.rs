use std::fmt;
use std::time::{Duration, Instant};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::ConfigError;

/// 服务端默认端口（barcoded server）。
pub const DEFAULT_SERVER_PORT: u16 = 41040;

/// 单次解码读数（时间戳 + 原始载荷），创建后不可变。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reading {
    pub timestamp: Instant,
    pub payload: Vec<u8>,
}

impl Reading {
    pub fn new(timestamp: Instant, payload: Vec<u8>) -> Self {
        Self { timestamp, payload }
    }

    /// 相对 `now` 的年龄；时钟倒退时按 0 处理。
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }
}

/// 决策门状态（空闲/冷却）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatePhase {
    Idle,
    Cooldown,
}

/// 扫码参数（命令行或配置文件提供）。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScannerSettings {
    pub server_address: String,
    pub server_port: u16,
    pub set_size: usize,
    pub required_num: usize,
    pub barcode_lifetime_secs: f64,
    pub cooldown_secs: f64,
}

impl ScannerSettings {
    /// 使用指定服务端地址构建默认参数。
    pub fn with_server(address: impl Into<String>) -> Self {
        Self {
            server_address: address.into(),
            server_port: DEFAULT_SERVER_PORT,
            set_size: 10,
            required_num: 7,
            barcode_lifetime_secs: 2.0,
            cooldown_secs: 2.0,
        }
    }

    /// `host:port` 形式的服务端地址。
    pub fn server_authority(&self) -> String {
        format!("{}:{}", self.server_address, self.server_port)
    }

    /// 校验并生成决策门配置。
    pub fn gate_config(&self) -> Result<GateConfig, ConfigError> {
        GateConfig::from_secs(
            self.set_size,
            self.required_num,
            self.barcode_lifetime_secs,
            self.cooldown_secs,
        )
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self::with_server("127.0.0.1")
    }
}

/// 已校验的决策门配置，构造后不可变。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateConfig {
    set_size: usize,
    required_num: usize,
    set_time: Duration,
    cooldown_time: Duration,
}

impl GateConfig {
    pub fn new(
        set_size: usize,
        required_num: usize,
        set_time: Duration,
        cooldown_time: Duration,
    ) -> Result<Self, ConfigError> {
        if set_size == 0 {
            return Err(ConfigError::ZeroSetSize);
        }
        if required_num == 0 {
            return Err(ConfigError::ZeroRequiredNum);
        }
        if required_num > set_size {
            return Err(ConfigError::RequiredExceedsSetSize {
                required_num,
                set_size,
            });
        }
        if set_time.is_zero() {
            return Err(ConfigError::InvalidSetTime(0.0));
        }
        Ok(Self {
            set_size,
            required_num,
            set_time,
            cooldown_time,
        })
    }

    /// 以秒为单位构建（命令行参数为浮点秒）。
    pub fn from_secs(
        set_size: usize,
        required_num: usize,
        set_time_secs: f64,
        cooldown_secs: f64,
    ) -> Result<Self, ConfigError> {
        let set_time = match Duration::try_from_secs_f64(set_time_secs) {
            Ok(d) if !d.is_zero() => d,
            _ => return Err(ConfigError::InvalidSetTime(set_time_secs)),
        };
        let cooldown_time = Duration::try_from_secs_f64(cooldown_secs)
            .map_err(|_| ConfigError::InvalidCooldownTime(cooldown_secs))?;
        Self::new(set_size, required_num, set_time, cooldown_time)
    }

    pub fn set_size(&self) -> usize {
        self.set_size
    }

    pub fn required_num(&self) -> usize {
        self.required_num
    }

    pub fn set_time(&self) -> Duration {
        self.set_time
    }

    pub fn cooldown_time(&self) -> Duration {
        self.cooldown_time
    }
}

impl fmt::Display for GateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "set_size={} required_num={} set_time={:.3}s cooldown={:.3}s",
            self.set_size,
            self.required_num,
            self.set_time.as_secs_f64(),
            self.cooldown_time.as_secs_f64()
        )
    }
}

/// 窗口内各载荷的出现次数（按首次出现顺序排列）。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrequencySnapshot {
    entries: Vec<(Vec<u8>, usize)>,
}

impl FrequencySnapshot {
    /// 空快照（冷却期间返回）。
    pub fn empty() -> Self {
        Self::default()
    }

    /// 按顺序统计载荷频次。
    pub fn from_payloads<'a, I>(payloads: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut entries: Vec<(Vec<u8>, usize)> = Vec::new();
        for payload in payloads {
            match entries.iter_mut().find(|(p, _)| p.as_slice() == payload) {
                Some((_, count)) => *count += 1,
                None => entries.push((payload.to_vec(), 1)),
            }
        }
        Self { entries }
    }

    pub fn get(&self, payload: &[u8]) -> Option<usize> {
        self.entries
            .iter()
            .find(|(p, _)| p.as_slice() == payload)
            .map(|(_, count)| *count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有计数之和（等于窗口长度）。
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], usize)> {
        self.entries.iter().map(|(p, count)| (p.as_slice(), *count))
    }

    /// 众数；并列时取最先出现者。
    pub fn mode(&self) -> Option<(&[u8], usize)> {
        let mut best: Option<(&[u8], usize)> = None;
        for (payload, count) in self.iter() {
            match best {
                Some((_, top)) if count <= top => {}
                _ => best = Some((payload, count)),
            }
        }
        best
    }
}

// 序列化为 JSON 对象，键见 `payload_key`，保持首次出现顺序
impl Serialize for FrequencySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (payload, count) in &self.entries {
            map.serialize_entry(&payload_key(payload), count)?;
        }
        map.end()
    }
}

/// 单次输入的决策结果（确认载荷 + 频次快照）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub confirmed: Option<Vec<u8>>,
    pub frequencies: FrequencySnapshot,
}

impl Decision {
    pub fn pending(frequencies: FrequencySnapshot) -> Self {
        Self {
            confirmed: None,
            frequencies,
        }
    }

    pub fn confirmed(payload: Vec<u8>, frequencies: FrequencySnapshot) -> Self {
        Self {
            confirmed: Some(payload),
            frequencies,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed.is_some()
    }
}

/// 载荷的可读形式（非 UTF-8 字节做替换，仅用于日志）。
pub fn display_payload(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

/// 载荷的 JSON 键，不同载荷的键互不相同。
///
/// UTF-8 且不以 `0x` 开头的载荷原样输出；其余载荷输出 `0x` + 小写十六进制。
pub fn payload_key(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.starts_with("0x") => text.to_string(),
        _ => {
            let mut key = String::with_capacity(2 + payload.len() * 2);
            key.push_str("0x");
            for byte in payload {
                key.push_str(&format!("{:02x}", byte));
            }
            key
        }
    }
}
