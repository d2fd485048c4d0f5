use std::{cmp::Ordering, sync::Arc};

use parking_lot::Mutex;
#[cfg(feature = "tracing")]
use tracing::{debug, instrument, trace, warn};

use crate::{
    DeviceIdSource, Error, GeneratorConfig, IdGenStatus, Result, SnowflakeId, SnowflakeParts,
    TimeSource, WorkerId,
};

/// Mutable minting state, only touched under the generator's lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct GeneratorState {
    /// Absolute timestamp of the last minted ID, or [`Self::UNUSED`].
    last_timestamp: i64,
    sequence: i64,
}

impl GeneratorState {
    const UNUSED: i64 = -1;
}

/// Result of one pass of the state machine against a single clock reading.
#[derive(Clone, Copy, Debug)]
enum Step {
    Ready(SnowflakeId),
    /// The sequence is used up for `last_timestamp`.
    Exhausted { yield_until: i64 },
    /// The clock reads earlier than `last_timestamp`.
    Behind {
        last_timestamp: i64,
        #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
        now: i64,
    },
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The minting state sits behind a single [`parking_lot::Mutex`] held for the
/// whole of [`next_id`], including any wait, so callers are fully serialized.
/// Cloning the generator is cheap and the clones share that state; they
/// never hand out the same ID.
///
/// The worker id is fixed at construction, before the generator can be
/// shared, and never changes afterwards.
///
/// ## Stalls
/// - **Sequence exhausted**: more than `sequence_mask + 1` IDs were requested
///   in one millisecond. The call waits for the next millisecond.
/// - **Clock rollback**: the clock reads earlier than the last minted
///   timestamp. The call waits for the clock to catch up, or fails with
///   [`Error::ClockRollback`] if the jump exceeds
///   [`GeneratorConfig::max_clock_rollback`].
///
/// Waiting follows [`GeneratorConfig::wait_strategy`]. Use [`poll_id`] to
/// handle stalls yourself.
///
/// # Example
///
/// ```
/// use snowmint::{GeneratorConfig, LockSnowflakeGenerator, SystemClock};
///
/// let config = GeneratorConfig::default();
/// let generator = LockSnowflakeGenerator::new(config, &|| "device-42", SystemClock);
///
/// let first = generator.next_id().unwrap();
/// let second = generator.next_id().unwrap();
/// assert!(first < second);
///
/// let parts = generator.decode(second);
/// assert_eq!(parts.worker_id, generator.worker_id().get());
/// ```
///
/// [`next_id`]: Self::next_id
/// [`poll_id`]: Self::poll_id
pub struct LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: Arc<crossbeam_utils::CachePadded<Mutex<GeneratorState>>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Arc<Mutex<GeneratorState>>,
    config: GeneratorConfig,
    worker_id: WorkerId,
    clock: T,
}

impl<T> LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator whose worker id is derived from the device
    /// identifier, see [`WorkerId::derive`].
    pub fn new<S>(config: GeneratorConfig, device: &S, clock: T) -> Self
    where
        S: DeviceIdSource + ?Sized,
    {
        Self::with_worker_id(config, WorkerId::derive(device, &config), clock)
    }

    /// Validates a bit layout and creates a generator from it in one step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBitWidths`] or [`Error::InvalidEpoch`] for an
    /// invalid layout, see [`GeneratorConfig::new`].
    pub fn with_layout<S>(
        epoch: i64,
        worker_id_bits: u32,
        sequence_bits: u32,
        device: &S,
        clock: T,
    ) -> Result<Self>
    where
        S: DeviceIdSource + ?Sized,
    {
        let config = GeneratorConfig::new(epoch, worker_id_bits, sequence_bits)?;
        Ok(Self::new(config, device, clock))
    }

    /// Creates a generator with an explicitly assigned worker id.
    pub fn with_worker_id(config: GeneratorConfig, worker_id: WorkerId, clock: T) -> Self {
        Self::from_components(config, worker_id, GeneratorState::UNUSED, 0, clock)
    }

    /// Creates a generator preloaded with a last timestamp and sequence.
    ///
    /// Useful to resume after a known point or to exercise edge cases. The
    /// sequence is masked to its width.
    ///
    /// In typical use cases, prefer [`Self::new`].
    pub fn from_components(
        config: GeneratorConfig,
        worker_id: WorkerId,
        last_timestamp: i64,
        sequence: i64,
        clock: T,
    ) -> Self {
        #[cfg(feature = "tracing")]
        debug!(
            %worker_id,
            epoch = config.epoch(),
            worker_id_bits = config.worker_id_bits(),
            sequence_bits = config.sequence_bits(),
            timestamp_bits = config.timestamp_bits(),
            "snowflake generator ready"
        );
        let state = Mutex::new(GeneratorState {
            last_timestamp,
            sequence: sequence & config.sequence_mask(),
        });
        Self {
            #[cfg(feature = "cache-padded")]
            state: Arc::new(crossbeam_utils::CachePadded::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: Arc::new(state),
            config,
            worker_id,
            clock,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    /// Splits an ID minted with this generator's layout into its fields.
    pub fn decode(&self, id: SnowflakeId) -> SnowflakeParts {
        self.config.decode(id)
    }

    /// Mints the next ID, blocking through sequence exhaustion and small
    /// clock rollbacks.
    ///
    /// IDs from one generator are unique and strictly increasing as long as
    /// the clock does not move backward further than the configured
    /// tolerance. There is no timeout: a clock that stops advancing stalls
    /// the call, and every other caller with it, indefinitely.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRollback`] if the clock jumped back further than
    ///   [`GeneratorConfig::max_clock_rollback`].
    /// - [`Error::ClockBeforeEpoch`] if the clock reads before the epoch.
    /// - [`Error::TimestampOverflow`] once the timestamp field is exhausted.
    ///
    /// No state is consumed by a failed call.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self), fields(worker_id = %self.worker_id))
    )]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let mut state = self.state.lock();
        #[cfg(feature = "tracing")]
        let mut rollback_reported = false;
        loop {
            let now = self.clock.current_millis();
            match self.step(&mut state, now)? {
                Step::Ready(id) => return Ok(id),
                #[cfg(feature = "tracing")]
                Step::Exhausted { yield_until } => {
                    trace!(yield_until, "sequence exhausted, waiting for next millisecond");
                }
                #[cfg(feature = "tracing")]
                Step::Behind {
                    last_timestamp,
                    now,
                } => {
                    if !rollback_reported {
                        warn!(
                            last_timestamp,
                            now,
                            behind_ms = last_timestamp - now,
                            "clock moved backwards, waiting for it to catch up"
                        );
                        rollback_reported = true;
                    }
                }
                #[cfg(not(feature = "tracing"))]
                Step::Exhausted { .. } | Step::Behind { .. } => {}
            }
            self.config.wait_strategy().wait();
        }
    }

    /// Makes one non-blocking attempt to mint an ID.
    ///
    /// Reads the clock once. State is only committed when
    /// [`IdGenStatus::Ready`] is returned.
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_id`].
    ///
    /// # Example
    ///
    /// ```
    /// use snowmint::{GeneratorConfig, IdGenStatus, LockSnowflakeGenerator, SystemClock, WorkerId};
    ///
    /// let config = GeneratorConfig::default();
    /// let worker_id = WorkerId::new(1, &config).unwrap();
    /// let generator = LockSnowflakeGenerator::with_worker_id(config, worker_id, SystemClock);
    ///
    /// let id = loop {
    ///     match generator.poll_id().unwrap() {
    ///         IdGenStatus::Ready { id } => break id,
    ///         IdGenStatus::Pending { .. } => std::thread::yield_now(),
    ///     }
    /// };
    /// assert_eq!(generator.decode(id).worker_id, 1);
    /// ```
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self), fields(worker_id = %self.worker_id))
    )]
    pub fn poll_id(&self) -> Result<IdGenStatus> {
        let mut state = self.state.lock();
        let now = self.clock.current_millis();
        Ok(match self.step(&mut state, now)? {
            Step::Ready(id) => IdGenStatus::Ready { id },
            Step::Exhausted { yield_until } => IdGenStatus::Pending { yield_until },
            Step::Behind { last_timestamp, .. } => IdGenStatus::Pending {
                yield_until: last_timestamp,
            },
        })
    }

    /// Advances `state` for the clock reading `now`, committing only when an
    /// ID is minted.
    fn step(&self, state: &mut GeneratorState, now: i64) -> Result<Step> {
        // A rollback is waited out even when it lands before the epoch, as
        // long as there is a minted timestamp to catch up to.
        let ordering = now.cmp(&state.last_timestamp);
        if ordering == Ordering::Less && state.last_timestamp != GeneratorState::UNUSED {
            return self.cold_clock_behind(state.last_timestamp, now);
        }

        let epoch = self.config.epoch();
        if now < epoch {
            return Err(Error::ClockBeforeEpoch { now, epoch });
        }
        // Also guards the same-millisecond path against a preloaded
        // `last_timestamp` outside the timestamp field.
        let elapsed = now - epoch;
        let max = self.config.max_timestamp();
        if elapsed > max {
            return Err(Error::TimestampOverflow { elapsed, max });
        }

        match ordering {
            Ordering::Equal => {
                if state.sequence >= self.config.sequence_mask() {
                    return Ok(Step::Exhausted {
                        yield_until: now + 1,
                    });
                }
                state.sequence += 1;
            }
            Ordering::Greater | Ordering::Less => {
                state.last_timestamp = now;
                state.sequence = 0;
            }
        }

        Ok(Step::Ready(self.config.pack(SnowflakeParts {
            timestamp_ms: state.last_timestamp,
            worker_id: self.worker_id.get(),
            sequence: state.sequence,
        })))
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(&self, last_timestamp: i64, now: i64) -> Result<Step> {
        let behind = last_timestamp - now;
        debug_assert!(behind > 0);
        if let Some(tolerance) = self.config.max_clock_rollback() {
            let tolerance_ms = i64::try_from(tolerance.as_millis()).unwrap_or(i64::MAX);
            if behind > tolerance_ms {
                #[cfg(feature = "tracing")]
                warn!(
                    last_timestamp,
                    now, tolerance_ms, "clock rollback exceeds tolerance"
                );
                return Err(Error::ClockRollback {
                    last_timestamp,
                    now,
                    tolerance_ms,
                });
            }
        }
        Ok(Step::Behind {
            last_timestamp,
            now,
        })
    }
}

impl<T> Clone for LockSnowflakeGenerator<T>
where
    T: TimeSource + Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: self.config,
            worker_id: self.worker_id,
            clock: self.clock.clone(),
        }
    }
}

impl<T> core::fmt::Debug for LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockSnowflakeGenerator")
            .field("config", &self.config)
            .field("worker_id", &self.worker_id)
            .finish_non_exhaustive()
    }
}
