use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::model::{FrequencySnapshot, Reading};

/// 最近读数窗口：按年龄与数量双重限制。
#[derive(Debug)]
pub struct ReadingWindow {
    max_len: usize,
    max_age: Duration,
    readings: VecDeque<Reading>,
}

impl ReadingWindow {
    pub fn new(max_len: usize, max_age: Duration) -> Self {
        Self {
            max_len,
            max_age,
            readings: VecDeque::with_capacity(max_len + 1),
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// 追加读数：先按年龄清理，再入队，最后按数量截断。返回被淘汰的条数。
    pub fn push(&mut self, reading: Reading) -> usize {
        let now = reading.timestamp;
        let mut evicted = self.purge_expired(now);
        self.readings.push_back(reading);
        evicted += self.drop_oldest_over_cap();
        evicted
    }

    pub fn frequencies(&self) -> FrequencySnapshot {
        FrequencySnapshot::from_payloads(self.readings.iter().map(|r| r.payload.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let mut purged = 0;
        // 队首最旧，遇到未过期即停止
        while let Some(front) = self.readings.front() {
            if front.age(now) <= self.max_age {
                break;
            }
            self.readings.pop_front();
            purged += 1;
        }
        purged
    }

    fn drop_oldest_over_cap(&mut self) -> usize {
        let mut dropped = 0;
        while self.readings.len() > self.max_len {
            self.readings.pop_front();
            dropped += 1;
        }
        dropped
    }
}

/// 确认后的冷却状态（惰性过期，无定时器）。
#[derive(Debug)]
pub struct Cooldown {
    duration: Duration,
    active: bool,
    started_at: Option<Instant>,
}

impl Cooldown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            active: false,
            started_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn start(&mut self, now: Instant) {
        self.active = true;
        self.started_at = Some(now);
    }

    /// 检查冷却是否仍生效；超时则在此处退出冷却。
    pub fn is_blocking(&mut self, now: Instant) -> bool {
        if !self.active {
            return false;
        }
        let elapsed = self
            .started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(Duration::ZERO);
        if elapsed > self.duration {
            self.active = false;
            return false;
        }
        true
    }
}
