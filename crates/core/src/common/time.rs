use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// 缓存过期判定使用的时钟。测试中以 `FakeClockProvider` 替换，从而无需真实等待 TTL。
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 手动推进的虚拟时钟。
///
/// # Invariants
/// - 时间只会向前推进；锁中毒时沿用内部值继续工作。
pub struct FakeClockProvider {
    at: Mutex<DateTime<Utc>>,
}

impl FakeClockProvider {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            at: Mutex::new(start),
        }
    }

    /// 推进时钟，负时长按 0 处理
    pub fn advance(&self, by: Duration) {
        let mut at = self.at.lock().unwrap_or_else(|e| e.into_inner());
        *at += by.max(Duration::zero());
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self.at.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fake_clock_only_moves_forward() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        let clock = FakeClockProvider::new(start);
        clock.advance(Duration::seconds(90));
        clock.advance(Duration::seconds(-30));
        assert_eq!(clock.now(), start + Duration::seconds(90));
    }
}
