use std::time::Duration;

pub const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Attempts past this one stop doubling.
const EXPONENT_CEILING_ATTEMPT: u32 = 6;

/// Delay before reconnect `attempt` (1-based): `min(30s, 2^(min(attempt, 6) - 1)s)`.
pub fn reconnect_delay(attempt: u32) -> Duration {
    let exponent = attempt.clamp(1, EXPONENT_CEILING_ATTEMPT) - 1;
    Duration::from_secs(1u64 << exponent).min(MAX_RECONNECT_DELAY)
}
