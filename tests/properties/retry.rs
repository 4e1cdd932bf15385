//! Property-based tests for retry backoff delays.
//!
//! Delays grow exponentially from the base, are capped at the maximum, and
//! stay within the jitter band around that value.
use proptest::{prelude::*, test_runner::Config};
use sponsored_relay::{constants::RETRY_JITTER_PERCENT, services::calculate_retry_delay};

fn expected_delay_ms(attempt: u8, base_delay_ms: u64, max_delay_ms: u64) -> u64 {
    base_delay_ms
        .saturating_mul(1u64.checked_shl(attempt as u32).unwrap_or(u64::MAX))
        .min(max_delay_ms)
}

proptest! {
  #![proptest_config(Config {
    cases: 1000, ..Config::default()
  })]

  #[test]
  fn prop_retry_delay_within_jitter_band(
    attempt in 0u8..20,
    base_delay_ms in 1u64..5_000,
    extra_ms in 0u64..60_000
  ) {
      let max_delay_ms = base_delay_ms + extra_ms;
      let expected = expected_delay_ms(attempt, base_delay_ms, max_delay_ms);
      let jitter = (expected as f64 * RETRY_JITTER_PERCENT).floor() as u64;

      let delay = calculate_retry_delay(attempt, base_delay_ms, max_delay_ms).as_millis() as u64;
      prop_assert!(delay >= expected - jitter);
      prop_assert!(delay <= expected + jitter);
  }

  #[test]
  fn prop_retry_delay_disabled_by_zero_bounds(
    attempt in any::<u8>(),
    delay_ms in any::<u64>()
  ) {
      prop_assert_eq!(calculate_retry_delay(attempt, 0, delay_ms).as_millis(), 0);
      prop_assert_eq!(calculate_retry_delay(attempt, delay_ms, 0).as_millis(), 0);
  }
}
