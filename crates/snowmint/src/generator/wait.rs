use core::time::Duration;

/// How a stalled [`LockSnowflakeGenerator::next_id`] re-polls the clock.
///
/// The generator keeps its lock while waiting, so every strategy blocks all
/// other callers too. Stalls normally last well under a millisecond; the
/// strategy only matters when the clock is corrected by a larger step.
///
/// [`LockSnowflakeGenerator::next_id`]: crate::LockSnowflakeGenerator::next_id
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Re-poll immediately with a CPU spin hint. Lowest latency, pegs a core.
    Spin,
    /// Yield the thread to the OS scheduler between polls.
    #[default]
    Yield,
    /// Sleep for the given duration between polls.
    Sleep(Duration),
}

impl WaitStrategy {
    pub fn wait(&self) {
        match self {
            Self::Spin => core::hint::spin_loop(),
            Self::Yield => std::thread::yield_now(),
            Self::Sleep(duration) => std::thread::sleep(*duration),
        }
    }
}
