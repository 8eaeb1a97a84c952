//! Routable phone-number-shaped handle.
//!
//! ## Format
//!
//! ```text
//! +  55  11  912345678
//!    |   |   +-- 9 digits, 100000000..=999999999
//!    |   +------ area code, 11..=99
//!    +---------- 2-digit country code
//! ```

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A user's virtual number, e.g. `+5511912345678`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualNumber(String);

impl VirtualNumber {
    /// Generate a random number for the given 2-digit country code.
    ///
    /// Uniqueness is the caller's job: regenerate until unused.
    pub fn generate<R: Rng>(country_code: &str, rng: &mut R) -> Self {
        let area: u32 = rng.random_range(11..=99);
        let number: u32 = rng.random_range(100_000_000..=999_999_999);
        Self(format!("+{}{}{}", country_code, area, number))
    }

    /// Parse and validate a handle supplied by a client.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('+')?;
        if digits.len() != 13 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Whether `raw` looks like a handle rather than an id.
    pub fn looks_like(raw: &str) -> bool {
        raw.trim_start().starts_with('+')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for VirtualNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
