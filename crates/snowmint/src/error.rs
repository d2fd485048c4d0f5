use thiserror::Error;

/// A result type defaulting to the crate's [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `snowmint` can emit.
///
/// Configuration errors are only raised while building a
/// [`GeneratorConfig`] or a generator. The remaining variants describe clock
/// conditions that cannot be absorbed by waiting. Sequence exhaustion and
/// small clock rollbacks are never reported; the generator waits them out.
///
/// [`GeneratorConfig`]: crate::GeneratorConfig
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
    /// The worker and sequence widths leave no room for a timestamp, or one of
    /// them is zero.
    #[error(
        "invalid bit widths: worker_id_bits={worker_id_bits}, sequence_bits={sequence_bits} \
         (both must be positive and sum to at most 62)"
    )]
    InvalidBitWidths {
        worker_id_bits: u32,
        sequence_bits: u32,
    },

    /// The epoch lies before the Unix epoch.
    #[error("invalid epoch: {epoch} ms is before the Unix epoch")]
    InvalidEpoch { epoch: i64 },

    /// An explicit worker id does not fit the configured worker field.
    #[error("worker id {worker_id} exceeds the maximum of {max}")]
    WorkerIdOutOfRange { worker_id: i64, max: i64 },

    /// The clock jumped further back than the configured tolerance.
    #[error(
        "clock moved backwards by {} ms (last={last_timestamp}, now={now}, tolerance={tolerance_ms} ms)",
        .last_timestamp - .now
    )]
    ClockRollback {
        last_timestamp: i64,
        now: i64,
        tolerance_ms: i64,
    },

    /// The clock reports a time before the configured epoch.
    #[error("clock reports {now} ms which is before the epoch {epoch} ms")]
    ClockBeforeEpoch { now: i64, epoch: i64 },

    /// The elapsed time since the epoch no longer fits the timestamp field.
    #[error("timestamp {elapsed} ms since epoch exceeds the maximum of {max}")]
    TimestampOverflow { elapsed: i64, max: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_message_reports_distance() {
        let err = Error::ClockRollback {
            last_timestamp: 1_000,
            now: 400,
            tolerance_ms: 500,
        };
        assert_eq!(
            err.to_string(),
            "clock moved backwards by 600 ms (last=1000, now=400, tolerance=500 ms)"
        );
    }

    #[test]
    fn errors_are_std_errors() {
        fn assert_error<E: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<Error>();
    }
}
