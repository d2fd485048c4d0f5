use crate::SnowflakeId;

/// The outcome of a single, non-blocking attempt to mint an ID.
///
/// Returned by [`LockSnowflakeGenerator::poll_id`]:
///
/// - [`IdGenStatus::Ready`] carries a freshly minted ID.
/// - [`IdGenStatus::Pending`] means nothing was minted, either because the
///   sequence is exhausted for the current millisecond or because the clock
///   moved backward. Retry once the clock reaches `yield_until`.
///
/// [`LockSnowflakeGenerator::poll_id`]: crate::LockSnowflakeGenerator::poll_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated Snowflake ID.
        id: SnowflakeId,
    },
    /// No ID could be generated yet.
    Pending {
        /// The Unix time in milliseconds (inclusive) at which generation can
        /// resume.
        yield_until: i64,
    },
}

impl IdGenStatus {
    /// Returns the ID if one was minted.
    pub const fn ready(self) -> Option<SnowflakeId> {
        match self {
            Self::Ready { id } => Some(id),
            Self::Pending { .. } => None,
        }
    }
}
