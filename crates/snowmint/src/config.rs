use core::time::Duration;

use crate::{DEFAULT_EPOCH, Error, Result, SnowflakeId, SnowflakeParts, WaitStrategy};

/// Bits available to the timestamp, worker and sequence fields. The sign bit
/// is never used.
const USABLE_BITS: u32 = 63;

/// Default width of the worker id field (1024 workers).
pub const DEFAULT_WORKER_ID_BITS: u32 = 10;

/// Default width of the sequence field (4096 IDs per millisecond).
pub const DEFAULT_SEQUENCE_BITS: u32 = 12;

/// Default tolerance for a backward clock jump before it is reported.
pub const DEFAULT_MAX_CLOCK_ROLLBACK: Duration = Duration::from_secs(1);

/// A validated bit layout plus the runtime knobs of a generator.
///
/// Built with [`GeneratorConfig::new`] or [`GeneratorConfig::builder`]. Every
/// constructor validates the layout, so a `GeneratorConfig` in hand always
/// satisfies `worker_id_bits + sequence_bits < 63`.
///
/// # Example
///
/// ```
/// use snowmint::GeneratorConfig;
///
/// let config = GeneratorConfig::new(1_700_000_000_000, 10, 12).unwrap();
/// assert_eq!(config.timestamp_bits(), 41);
/// assert_eq!(config.max_worker_id(), 1023);
/// assert_eq!(config.sequence_mask(), 4095);
///
/// assert!(GeneratorConfig::new(1_700_000_000_000, 40, 23).is_err());
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "GeneratorConfigBuilder", into = "GeneratorConfigBuilder")
)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    epoch: i64,
    worker_id_bits: u32,
    sequence_bits: u32,
    wait_strategy: WaitStrategy,
    max_clock_rollback: Option<Duration>,
}

impl Default for GeneratorConfig {
    /// 10 worker bits and 12 sequence bits from [`DEFAULT_EPOCH`], leaving 41
    /// timestamp bits (about 69 years).
    fn default() -> Self {
        Self {
            epoch: DEFAULT_EPOCH,
            worker_id_bits: DEFAULT_WORKER_ID_BITS,
            sequence_bits: DEFAULT_SEQUENCE_BITS,
            wait_strategy: WaitStrategy::default(),
            max_clock_rollback: Some(DEFAULT_MAX_CLOCK_ROLLBACK),
        }
    }
}

impl GeneratorConfig {
    /// Creates a layout with default runtime knobs.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBitWidths`] if either width is zero or they leave no
    ///   bit for the timestamp.
    /// - [`Error::InvalidEpoch`] if `epoch` is negative.
    pub fn new(epoch: i64, worker_id_bits: u32, sequence_bits: u32) -> Result<Self> {
        Self::builder()
            .epoch(epoch)
            .worker_id_bits(worker_id_bits)
            .sequence_bits(sequence_bits)
            .build()
    }

    /// Starts a builder seeded with the defaults.
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::default()
    }

    fn validate(self) -> Result<Self> {
        let widths_fit = self
            .worker_id_bits
            .checked_add(self.sequence_bits)
            .is_some_and(|sum| sum < USABLE_BITS);
        if self.worker_id_bits == 0 || self.sequence_bits == 0 || !widths_fit {
            return Err(Error::InvalidBitWidths {
                worker_id_bits: self.worker_id_bits,
                sequence_bits: self.sequence_bits,
            });
        }
        if self.epoch < 0 {
            return Err(Error::InvalidEpoch { epoch: self.epoch });
        }
        Ok(self)
    }

    /// Milliseconds since the Unix epoch subtracted from every timestamp.
    pub const fn epoch(&self) -> i64 {
        self.epoch
    }

    pub const fn worker_id_bits(&self) -> u32 {
        self.worker_id_bits
    }

    pub const fn sequence_bits(&self) -> u32 {
        self.sequence_bits
    }

    /// Bits left for the timestamp once the sign, worker and sequence fields
    /// are reserved.
    pub const fn timestamp_bits(&self) -> u32 {
        USABLE_BITS - self.worker_id_bits - self.sequence_bits
    }

    pub const fn max_worker_id(&self) -> i64 {
        (1 << self.worker_id_bits) - 1
    }

    pub const fn sequence_mask(&self) -> i64 {
        (1 << self.sequence_bits) - 1
    }

    /// Largest encodable distance from the epoch, in milliseconds.
    pub const fn max_timestamp(&self) -> i64 {
        (1 << self.timestamp_bits()) - 1
    }

    pub const fn worker_id_shift(&self) -> u32 {
        self.sequence_bits
    }

    pub const fn timestamp_shift(&self) -> u32 {
        self.sequence_bits + self.worker_id_bits
    }

    /// How long the timestamp field lasts from the epoch.
    pub const fn horizon(&self) -> Duration {
        Duration::from_millis(self.max_timestamp() as u64)
    }

    pub const fn wait_strategy(&self) -> WaitStrategy {
        self.wait_strategy
    }

    /// The largest backward clock jump the generator waits out. `None` waits
    /// indefinitely.
    pub const fn max_clock_rollback(&self) -> Option<Duration> {
        self.max_clock_rollback
    }

    /// Packs already-validated fields into an ID.
    ///
    /// `parts.timestamp_ms` is absolute; the epoch is subtracted here. Each
    /// field is masked to its width, so out-of-range input cannot bleed into a
    /// neighbouring field or the sign bit.
    pub const fn pack(&self, parts: SnowflakeParts) -> SnowflakeId {
        let timestamp = (parts.timestamp_ms.wrapping_sub(self.epoch) & self.max_timestamp())
            << self.timestamp_shift();
        let worker_id = (parts.worker_id & self.max_worker_id()) << self.worker_id_shift();
        let sequence = parts.sequence & self.sequence_mask();
        SnowflakeId::from_raw(timestamp | worker_id | sequence)
    }

    /// Splits an ID into its fields; the exact inverse of [`Self::pack`].
    ///
    /// # Example
    ///
    /// ```
    /// use snowmint::{GeneratorConfig, SnowflakeId};
    ///
    /// let config = GeneratorConfig::new(1_700_000_000_000, 10, 12).unwrap();
    /// let parts = config.decode(SnowflakeId::from_raw(4_194_324_481));
    /// assert_eq!(parts.timestamp_ms, 1_700_000_001_000);
    /// assert_eq!(parts.worker_id, 5);
    /// assert_eq!(parts.sequence, 1);
    /// ```
    pub const fn decode(&self, id: SnowflakeId) -> SnowflakeParts {
        let raw = id.to_raw();
        SnowflakeParts {
            timestamp_ms: ((raw >> self.timestamp_shift()) & self.max_timestamp())
                .wrapping_add(self.epoch),
            worker_id: (raw >> self.worker_id_shift()) & self.max_worker_id(),
            sequence: raw & self.sequence_mask(),
        }
    }
}

/// Fluent builder for [`GeneratorConfig`].
///
/// Unset fields keep their defaults. With the `serde` feature this is also the
/// serialized form of a config; missing fields take the defaults as well.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfigBuilder {
    epoch: i64,
    worker_id_bits: u32,
    sequence_bits: u32,
    wait_strategy: WaitStrategy,
    max_clock_rollback: Option<Duration>,
}

impl Default for GeneratorConfigBuilder {
    fn default() -> Self {
        GeneratorConfig::default().into()
    }
}

impl GeneratorConfigBuilder {
    pub fn epoch(mut self, epoch: i64) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn worker_id_bits(mut self, bits: u32) -> Self {
        self.worker_id_bits = bits;
        self
    }

    pub fn sequence_bits(mut self, bits: u32) -> Self {
        self.sequence_bits = bits;
        self
    }

    pub fn wait_strategy(mut self, strategy: WaitStrategy) -> Self {
        self.wait_strategy = strategy;
        self
    }

    /// Sets the rollback tolerance; `None` waits out any rollback.
    pub fn max_clock_rollback(mut self, tolerance: Option<Duration>) -> Self {
        self.max_clock_rollback = tolerance;
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// # Errors
    ///
    /// See [`GeneratorConfig::new`].
    pub fn build(self) -> Result<GeneratorConfig> {
        GeneratorConfig {
            epoch: self.epoch,
            worker_id_bits: self.worker_id_bits,
            sequence_bits: self.sequence_bits,
            wait_strategy: self.wait_strategy,
            max_clock_rollback: self.max_clock_rollback,
        }
        .validate()
    }
}

impl From<GeneratorConfig> for GeneratorConfigBuilder {
    fn from(config: GeneratorConfig) -> Self {
        Self {
            epoch: config.epoch,
            worker_id_bits: config.worker_id_bits,
            sequence_bits: config.sequence_bits,
            wait_strategy: config.wait_strategy,
            max_clock_rollback: config.max_clock_rollback,
        }
    }
}

impl TryFrom<GeneratorConfigBuilder> for GeneratorConfig {
    type Error = Error;

    fn try_from(builder: GeneratorConfigBuilder) -> Result<Self> {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR_MS: u64 = 365 * 24 * 60 * 60 * 1000;

    #[test]
    fn default_layout_matches_twitter_widths() {
        let config = GeneratorConfig::default();
        assert_eq!(config.epoch(), DEFAULT_EPOCH);
        assert_eq!(config.timestamp_bits(), 41);
        assert_eq!(config.worker_id_shift(), 12);
        assert_eq!(config.timestamp_shift(), 22);
        assert_eq!(config.max_worker_id(), 1023);
        assert_eq!(config.sequence_mask(), 4095);
        assert_eq!(config.max_clock_rollback(), Some(DEFAULT_MAX_CLOCK_ROLLBACK));
    }

    #[test]
    fn default_layout_lasts_decades() {
        let years = GeneratorConfig::default().horizon().as_millis() as u64 / YEAR_MS;
        assert_eq!(years, 69);
    }

    #[test]
    fn rejects_zero_widths() {
        assert_eq!(
            GeneratorConfig::new(0, 0, 12),
            Err(Error::InvalidBitWidths {
                worker_id_bits: 0,
                sequence_bits: 12
            })
        );
        assert!(GeneratorConfig::new(0, 10, 0).is_err());
    }

    #[test]
    fn rejects_widths_without_timestamp_room() {
        assert!(GeneratorConfig::new(0, 31, 32).is_err());
        assert!(GeneratorConfig::new(0, 50, 13).is_err());
        assert!(GeneratorConfig::new(0, u32::MAX, 1).is_err());

        let widest = GeneratorConfig::new(0, 31, 31).unwrap();
        assert_eq!(widest.timestamp_bits(), 1);
        assert_eq!(widest.max_timestamp(), 1);
    }

    #[test]
    fn rejects_negative_epoch() {
        assert_eq!(
            GeneratorConfig::new(-1, 10, 12),
            Err(Error::InvalidEpoch { epoch: -1 })
        );
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = GeneratorConfig::builder()
            .epoch(1_700_000_000_000)
            .worker_id_bits(8)
            .sequence_bits(4)
            .wait_strategy(WaitStrategy::Spin)
            .max_clock_rollback(None)
            .build()
            .unwrap();
        assert_eq!(config.epoch(), 1_700_000_000_000);
        assert_eq!(config.timestamp_bits(), 51);
        assert_eq!(config.sequence_mask(), 15);
        assert_eq!(config.wait_strategy(), WaitStrategy::Spin);
        assert_eq!(config.max_clock_rollback(), None);
    }

    #[test]
    fn packs_concrete_scenario() {
        let config = GeneratorConfig::new(1_700_000_000_000, 10, 12).unwrap();
        let parts = SnowflakeParts {
            timestamp_ms: 1_700_000_001_000,
            worker_id: 5,
            sequence: 0,
        };
        assert_eq!(config.pack(parts).to_raw(), 4_194_324_480);
        assert_eq!(
            config.decode(SnowflakeId::from_raw(4_194_324_481)),
            SnowflakeParts {
                sequence: 1,
                ..parts
            }
        );
    }

    #[test]
    fn decode_inverts_pack_at_field_extremes() {
        let layouts = [(10, 12), (1, 1), (31, 31), (5, 20), (20, 5)];
        for (worker_id_bits, sequence_bits) in layouts {
            let config = GeneratorConfig::new(DEFAULT_EPOCH, worker_id_bits, sequence_bits)
                .unwrap();
            let extremes = |max: i64| [0, max.min(1), max / 2, max];
            for elapsed in extremes(config.max_timestamp()) {
                for worker_id in extremes(config.max_worker_id()) {
                    for sequence in extremes(config.sequence_mask()) {
                        let parts = SnowflakeParts {
                            timestamp_ms: DEFAULT_EPOCH + elapsed,
                            worker_id,
                            sequence,
                        };
                        let id = config.pack(parts);
                        assert!(id.to_raw() >= 0, "sign bit set for {parts:?}");
                        assert_eq!(config.decode(id), parts);
                    }
                }
            }
        }
    }

    #[test]
    fn pack_masks_out_of_range_fields() {
        let config = GeneratorConfig::new(0, 2, 2).unwrap();
        let id = config.pack(SnowflakeParts {
            timestamp_ms: 1,
            worker_id: 0b111,
            sequence: 0b110,
        });
        assert_eq!(
            config.decode(id),
            SnowflakeParts {
                timestamp_ms: 1,
                worker_id: 0b11,
                sequence: 0b10,
            }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_with_defaults_and_validates() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{ "epoch": 1700000000000, "sequence_bits": 8 }"#).unwrap();
        assert_eq!(config.epoch(), 1_700_000_000_000);
        assert_eq!(config.worker_id_bits(), DEFAULT_WORKER_ID_BITS);
        assert_eq!(config.sequence_bits(), 8);

        let json = serde_json::to_string(&config).unwrap();
        let back: GeneratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        let invalid = serde_json::from_str::<GeneratorConfig>(r#"{ "worker_id_bits": 62 }"#);
        assert!(invalid.is_err());
    }
}
