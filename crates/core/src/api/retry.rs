//! Backoff schedule for transient upstream failures.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with additive jitter.
///
/// Retry `n` (zero-based) waits `min(base * 2^n, max_delay)` plus a random
/// amount below `max_jitter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Retries after the first attempt.
	pub max_retries: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub max_jitter: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			base_delay: Duration::from_secs(3),
			max_delay: Duration::from_secs(15),
			max_jitter: Duration::from_secs(1),
		}
	}
}

impl RetryPolicy {
	/// Delay before retry number `retry` without jitter.
	pub fn base_delay_for(&self, retry: u32) -> Duration {
		let factor = 2u32.saturating_pow(retry.min(16));
		self.base_delay.saturating_mul(factor).min(self.max_delay)
	}

	/// Delay before retry number `retry`, jitter included.
	pub fn delay(&self, retry: u32) -> Duration {
		let jitter = rand::thread_rng().r#gen::<f64>() * self.max_jitter.as_secs_f64();
		self.base_delay_for(retry) + Duration::from_secs_f64(jitter)
	}
}
