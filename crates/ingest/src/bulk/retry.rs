//! 재시도 정책과 배치별 지수 백오프
//!
//! [`RetryPolicy`]는 워커가 공유하는 불변 설정이고, [`ExponentialBackoff`]는
//! 배치 하나의 재시도 에피소드마다 새로 만들어져 해당 워커 퓨처만 소유합니다.

use std::time::Duration;

/// 재시도 정책
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 매 재시도마다 대기 시간에 곱하는 계수
    backoff_coefficient: u32,
    /// 첫 재시도 전 대기
    initial_interval: Duration,
    /// 대기 상한
    maximum_interval: Duration,
    /// 에피소드당 최대 재시도 횟수
    max_retries: u32,
    /// 재시도 대상 HTTP 상태 코드
    retry_on_status: Vec<u16>,
}

impl RetryPolicy {
    pub fn new(
        initial_interval: Duration,
        maximum_interval: Duration,
        max_retries: u32,
        retry_on_status: Vec<u16>,
    ) -> Self {
        Self {
            backoff_coefficient: 2,
            initial_interval,
            maximum_interval,
            max_retries,
            retry_on_status,
        }
    }

    /// 상태 코드가 재시도 대상인지 확인합니다.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    /// `attempt`번째(0부터) 재시도 전 대기 시간을 계산합니다.
    pub fn time_until_next_retry(&self, attempt: u32) -> Duration {
        let factor = self.backoff_coefficient.saturating_pow(attempt);
        let candidate = self
            .initial_interval
            .checked_mul(factor)
            .unwrap_or(self.maximum_interval);
        candidate.min(self.maximum_interval)
    }

    /// 새 재시도 에피소드를 시작합니다.
    pub fn episode(&self) -> ExponentialBackoff<'_> {
        ExponentialBackoff {
            policy: self,
            attempts: 0,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_on_status(&self) -> &[u16] {
        &self.retry_on_status
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(100),
            Duration::from_secs(10),
            5,
            vec![429, 502, 503, 504],
        )
    }
}

/// 한 배치의 재시도 에피소드 상태
///
/// 다른 배치와 공유되지 않으므로 한 워커의 실패가 다른 워커의 대기에 영향을 주지 않습니다.
#[derive(Debug)]
pub struct ExponentialBackoff<'a> {
    policy: &'a RetryPolicy,
    attempts: u32,
}

impl ExponentialBackoff<'_> {
    /// 다음 대기 시간을 반환합니다. 재시도 한도를 넘으면 `None`입니다.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempts >= self.policy.max_retries {
            return None;
        }
        let delay = self.policy.time_until_next_retry(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    /// 지금까지 수행한 재시도 횟수
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
