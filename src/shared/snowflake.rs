//! Snowflake ID Generator
//!
//! Time-ordered 64-bit ids, serialised as decimal strings at the edges.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use super::error::AppError;

/// Custom epoch (2024-01-01T00:00:00.000Z)
pub const EPOCH: u64 = 1_704_067_200_000;

/// Snowflake ID generator
///
/// Layout: 41 bits of milliseconds since [`EPOCH`], 10 bits machine id,
/// 12 bits sequence. State is packed as `timestamp << 12 | sequence` in a
/// single atomic so concurrent callers never hand out the same id.
pub struct SnowflakeGenerator {
    machine_id: u64,
    state: AtomicU64,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u16) -> Self {
        Self {
            machine_id: (machine_id as u64) & 0x3FF, // 10 bits
            state: AtomicU64::new(0),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let now = current_millis();
            let last_ts = current >> 12;
            let next = if now > last_ts {
                now << 12
            } else {
                // Same millisecond (or clock went back): bump the sequence,
                // borrowing from the next millisecond on overflow.
                current + 1
            };

            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    let timestamp = next >> 12;
                    let sequence = next & 0xFFF;
                    let id = (timestamp.saturating_sub(EPOCH) << 22)
                        | (self.machine_id << 12)
                        | sequence;
                    return id as i64;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

fn current_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Extract timestamp from snowflake ID
pub fn extract_timestamp(snowflake: i64) -> u64 {
    ((snowflake as u64) >> 22) + EPOCH
}

/// Parse a client-supplied id, naming the entity in the error.
pub fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::InvalidArgument(format!("Invalid {} id: {}", what, raw)))
}

/// Parse a list of client-supplied ids.
pub fn parse_ids(raw: &[String], what: &str) -> Result<Vec<i64>, AppError> {
    raw.iter().map(|id| parse_id(id, what)).collect()
}
