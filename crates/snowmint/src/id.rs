use core::{fmt, num::ParseIntError, str::FromStr};

/// A packed 64-bit Snowflake ID.
///
/// The sign bit is always zero, so the raw value is a non-negative `i64` that
/// sorts in minting order. The field layout is not carried by the ID itself;
/// decode it with the [`GeneratorConfig`] that minted it.
///
/// ```text
///  Bit Index:  63           63 62          T+W+S-1   W+S-1        S  S-1         0
///              +--------------+----------------+---------------+-------------+
///  Field:      | reserved (1) | timestamp (T)  | worker ID (W) | sequence (S)|
///              +--------------+----------------+---------------+-------------+
///              |<----------- MSB ---------- 64 bits ----------- LSB -------->|
/// ```
///
/// [`GeneratorConfig`]: crate::GeneratorConfig
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeId(i64);

impl SnowflakeId {
    /// Wraps a raw value without validating it against any layout.
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer, suitable for storage.
    pub const fn to_raw(self) -> i64 {
        self.0
    }

    /// Returns the ID as a zero-padded 19-digit string, which sorts
    /// lexicographically in the same order as the numeric value.
    pub fn to_padded_string(&self) -> String {
        format!("{:019}", self.0)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SnowflakeId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<SnowflakeId> for i64 {
    fn from(id: SnowflakeId) -> Self {
        id.0
    }
}

impl From<i64> for SnowflakeId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// The fields of a decoded [`SnowflakeId`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SnowflakeParts {
    /// Absolute timestamp in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub worker_id: i64,
    pub sequence: i64,
}

impl From<SnowflakeParts> for (i64, i64, i64) {
    fn from(parts: SnowflakeParts) -> Self {
        (parts.timestamp_ms, parts.worker_id, parts.sequence)
    }
}
