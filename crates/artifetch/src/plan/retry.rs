use std::time::Duration;

/// Delay before retry number `retry_count` (0 = first retry): `base * 2^retry_count`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use artifetch::retry_delay;
///
/// assert_eq!(retry_delay(0, Duration::from_millis(100)), Duration::from_millis(100));
/// assert_eq!(retry_delay(2, Duration::from_millis(100)), Duration::from_millis(400));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(retry_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles() {
        let base = Duration::from_millis(250);
        let delays: Vec<Duration> = (0..4).map(|i| retry_delay(i, base)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(250),
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
            ]
        );
    }

    #[test]
    fn test_retry_delay_zero_base() {
        assert_eq!(retry_delay(10, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_retry_delay_saturates() {
        let delay = retry_delay(64, Duration::from_secs(u64::MAX / 2));
        assert_eq!(delay, Duration::MAX);
    }
}
