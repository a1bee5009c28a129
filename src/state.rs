use std::time::Instant;

use crate::cache::{Cooldown, ReadingWindow};
use crate::error::ConfigError;
use crate::model::{display_payload, Decision, FrequencySnapshot, GateConfig, GatePhase, Reading};

/// 决策门：读数窗口 + 多数投票 + 确认后冷却。
///
/// 每个扫码会话持有一个实例；内部无锁，多路传感器需各自持有。
#[derive(Debug)]
pub struct DecisionGate {
    config: GateConfig,
    window: ReadingWindow,
    cooldown: Cooldown,
}

impl DecisionGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            window: ReadingWindow::new(config.set_size(), config.set_time()),
            cooldown: Cooldown::new(config.cooldown_time()),
        }
    }

    /// 以秒为单位的参数直接构建（参数非法时拒绝）。
    pub fn from_secs(
        set_size: usize,
        required_num: usize,
        set_time_secs: f64,
        cooldown_secs: f64,
    ) -> Result<Self, ConfigError> {
        GateConfig::from_secs(set_size, required_num, set_time_secs, cooldown_secs).map(Self::new)
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn phase(&self) -> GatePhase {
        if self.cooldown.is_active() {
            GatePhase::Cooldown
        } else {
            GatePhase::Idle
        }
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// 窗口中的读数（最旧在前）。
    pub fn readings(&self) -> impl Iterator<Item = &Reading> {
        self.window.iter()
    }

    /// 当前窗口的频次快照（不修改状态）。
    pub fn frequencies(&self) -> FrequencySnapshot {
        self.window.frequencies()
    }

    /// 使用单调时钟输入一个载荷。
    pub fn input(&mut self, payload: impl Into<Vec<u8>>) -> Decision {
        self.input_at(payload, Instant::now())
    }

    /// 在指定时刻输入一个载荷。
    pub fn input_at(&mut self, payload: impl Into<Vec<u8>>, now: Instant) -> Decision {
        let payload = payload.into();

        // 冷却期内直接丢弃读数
        if self.cooldown.is_active() {
            if self.cooldown.is_blocking(now) {
                log::debug!("cooldown active, discarding {}", display_payload(&payload));
                return Decision::pending(FrequencySnapshot::empty());
            }
            log::info!("cooldown elapsed, gate idle again");
        }

        let evicted = self.window.push(Reading::new(now, payload));
        if evicted > 0 {
            log::debug!("window evicted {} reading(s), {} left", evicted, self.window.len());
        }

        let frequencies = self.window.frequencies();
        let winner = match frequencies.mode() {
            Some((payload, count)) if count >= self.config.required_num() => {
                Some((payload.to_vec(), count))
            }
            _ => None,
        };

        match winner {
            Some((payload, count)) => {
                self.cooldown.start(now);
                log::info!(
                    "confirmed {} ({}/{} in window)",
                    display_payload(&payload),
                    count,
                    self.window.len()
                );
                Decision::confirmed(payload, frequencies)
            }
            None => Decision::pending(frequencies),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn gate(set_size: usize, required: usize, set_time: f64, cooldown: f64) -> DecisionGate {
        DecisionGate::from_secs(set_size, required, set_time, cooldown).unwrap()
    }

    fn at(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn starts_idle_and_empty() {
        let gate = gate(5, 3, 10.0, 2.0);
        assert_eq!(gate.phase(), GatePhase::Idle);
        assert_eq!(gate.window_len(), 0);
        assert!(gate.frequencies().is_empty());
    }

    #[test]
    fn confirms_when_required_count_reached() {
        let base = Instant::now();
        let mut gate = gate(5, 3, 10.0, 2.0);
        assert!(!gate.input_at("A", base).is_confirmed());
        assert!(!gate.input_at("A", at(base, 100)).is_confirmed());
        let decision = gate.input_at("A", at(base, 200));
        assert_eq!(decision.confirmed.as_deref(), Some(&b"A"[..]));
        assert_eq!(decision.frequencies.get(b"A"), Some(3));
        assert_eq!(gate.phase(), GatePhase::Cooldown);
    }

    #[test]
    fn flicker_does_not_confirm_minority() {
        let base = Instant::now();
        let mut gate = gate(5, 3, 10.0, 2.0);
        let seq: [&[u8]; 4] = [b"A", b"B", b"A", b"B"];
        for (i, payload) in seq.iter().enumerate() {
            let decision = gate.input_at(*payload, at(base, i as u64 * 10));
            assert!(!decision.is_confirmed());
        }
        let decision = gate.input_at("A", at(base, 50));
        assert_eq!(decision.confirmed.as_deref(), Some(&b"A"[..]));
        assert_eq!(decision.frequencies.get(b"A"), Some(3));
        assert_eq!(decision.frequencies.get(b"B"), Some(2));
    }

    #[test]
    fn cooldown_discards_without_recording() {
        let base = Instant::now();
        let mut gate = gate(5, 1, 10.0, 1.0);
        assert!(gate.input_at("X", base).is_confirmed());
        let decision = gate.input_at("Y", at(base, 500));
        assert_eq!(decision, Decision::pending(FrequencySnapshot::empty()));
        assert_eq!(gate.window_len(), 1);
    }

    #[test]
    fn aged_out_readings_do_not_count() {
        let base = Instant::now();
        let mut gate = gate(10, 3, 1.0, 0.0);
        gate.input_at("A", base);
        gate.input_at("A", at(base, 100));
        let decision = gate.input_at("A", at(base, 1_500));
        assert!(!decision.is_confirmed());
        assert_eq!(decision.frequencies.get(b"A"), Some(1));
    }

    #[test]
    fn tie_after_cooldown_goes_to_first_seen() {
        let base = Instant::now();
        let mut gate = gate(4, 2, 10.0, 1.0);
        gate.input_at("B", base);
        gate.input_at("A", at(base, 1));
        let decision = gate.input_at("B", at(base, 2));
        assert_eq!(decision.confirmed.as_deref(), Some(&b"B"[..]));

        // 冷却结束后 A 与 B 各 2 次，B 先出现
        let decision = gate.input_at("A", at(base, 1_500));
        assert_eq!(decision.frequencies.get(b"A"), Some(2));
        assert_eq!(decision.frequencies.get(b"B"), Some(2));
        assert_eq!(decision.confirmed.as_deref(), Some(&b"B"[..]));
    }

    #[test]
    fn debug_output_includes_window_and_cooldown() {
        let mut gate = gate(3, 1, 10.0, 1.0);
        gate.input_at("A", Instant::now());
        let text = format!("{:?}", gate);
        assert!(text.contains("window"));
        assert!(text.contains("cooldown"));
        assert!(text.contains("active: true"));
    }

    #[test]
    fn empty_payload_is_counted_like_any_other() {
        let base = Instant::now();
        let mut gate = gate(3, 2, 10.0, 1.0);
        gate.input_at(Vec::<u8>::new(), base);
        let decision = gate.input_at(Vec::<u8>::new(), at(base, 1));
        assert_eq!(decision.confirmed.as_deref(), Some(&b""[..]));
    }
}
