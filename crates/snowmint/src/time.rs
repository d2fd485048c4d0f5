use std::{
    sync::Arc,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

/// Default epoch: Sunday, September 15, 2024 09:42:54.657 UTC
pub const DEFAULT_EPOCH: i64 = 1_726_306_974_657;

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: i64 = 1_288_834_974_657;

/// Discord epoch: Thursday, January 1, 2015 00:00:00 UTC
pub const DISCORD_EPOCH: i64 = 1_420_070_400_000;

/// Standard UNIX epoch: Thursday, January 1, 1970 00:00:00 UTC
pub const UNIX_EPOCH_MS: i64 = 0;

/// A source of wall-clock time in **milliseconds since the Unix epoch**.
///
/// Generators subtract their configured epoch themselves, so implementations
/// report absolute time. Plug in [`SystemClock`], [`MonotonicClock`], or a
/// mocked clock in tests.
///
/// # Example
///
/// ```
/// use snowmint::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> i64 {
///         1_700_000_001_000
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1_700_000_001_000);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> i64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> i64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> i64 {
        (**self).current_millis()
    }
}

/// The system wall clock.
///
/// Follows every adjustment made to the host clock (NTP, manual changes), so
/// readings may move backward. The generator handles that, see
/// [`GeneratorConfig::max_clock_rollback`].
///
/// [`GeneratorConfig::max_clock_rollback`]: crate::GeneratorConfig::max_clock_rollback
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> i64 {
        unix_millis(SystemTime::now())
    }
}

/// A clock that reads the wall clock once and then advances monotonically.
///
/// The Unix time is captured at construction and every later reading adds the
/// elapsed [`Instant`] time. Readings never move backward, even when the host
/// clock is adjusted, at the cost of drifting from wall time over long
/// uptimes.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    anchor_millis: i64,
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Anchors a new clock at the current wall-clock time.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            anchor_millis: unix_millis(SystemTime::now()),
        }
    }

    /// Anchors a new clock at an explicit Unix time in milliseconds.
    pub fn with_anchor(anchor_millis: i64) -> Self {
        Self {
            anchor_millis,
            start: Instant::now(),
        }
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> i64 {
        let elapsed = i64::try_from(self.start.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.anchor_millis.saturating_add(elapsed)
    }
}

/// Converts a [`SystemTime`] to signed milliseconds since the Unix epoch.
///
/// Times before 1970 come out negative rather than failing; the generator
/// rejects them against its epoch.
fn unix_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_millis())
            .map(|ms| -ms)
            .unwrap_or(i64::MIN),
    }
}
