use std::{fmt, fs, path::PathBuf};

use rand::RngCore;
#[cfg(feature = "tracing")]
use tracing::warn;

use crate::{Error, GeneratorConfig, Result};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a, 64-bit variant. Stable across platforms and releases, unlike the
/// standard library's `DefaultHasher`.
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Supplies the stable identifier of the device running the generator.
///
/// The bytes are opaque; they are only hashed. They must stay the same for
/// the lifetime of the process. An unstable source does not fail, it only
/// weakens cross-device uniqueness.
///
/// Any closure returning bytes is a source:
///
/// ```
/// use snowmint::{GeneratorConfig, WorkerId};
///
/// let source = || "5f0c8a2e-vendor-id";
/// let worker = WorkerId::derive(&source, &GeneratorConfig::default());
/// assert!(worker.get() <= 1023);
/// ```
pub trait DeviceIdSource {
    fn device_id(&self) -> Vec<u8>;
}

impl<F, B> DeviceIdSource for F
where
    F: Fn() -> B,
    B: AsRef<[u8]>,
{
    fn device_id(&self) -> Vec<u8> {
        self().as_ref().to_vec()
    }
}

/// Random bytes, for hosts that cannot provide a stable device identifier.
///
/// A fresh identifier is drawn on every call, so the worker id only stays
/// stable because the generator derives it once.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomDeviceId;

impl DeviceIdSource for RandomDeviceId {
    fn device_id(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        bytes
    }
}

/// Reads the device identifier from a file such as `/etc/machine-id`.
///
/// Surrounding whitespace is trimmed. If the file is missing, unreadable or
/// empty, a warning is logged and [`RandomDeviceId`] is used instead.
#[derive(Clone, Debug)]
pub struct MachineIdFile {
    path: PathBuf,
}

impl MachineIdFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for MachineIdFile {
    fn default() -> Self {
        Self::new("/etc/machine-id")
    }
}

impl DeviceIdSource for MachineIdFile {
    fn device_id(&self) -> Vec<u8> {
        match fs::read(&self.path) {
            Ok(bytes) if !bytes.trim_ascii().is_empty() => bytes.trim_ascii().to_vec(),
            Ok(_) => {
                #[cfg(feature = "tracing")]
                warn!(path = %self.path.display(), "device id file is empty, using random id");
                RandomDeviceId.device_id()
            }
            #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
            Err(err) => {
                #[cfg(feature = "tracing")]
                warn!(
                    path = %self.path.display(),
                    %err,
                    "device id file unreadable, using random id"
                );
                RandomDeviceId.device_id()
            }
        }
    }
}

/// The worker field embedded in every ID, in `[0, max_worker_id]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(i64);

impl WorkerId {
    /// Uses an explicitly assigned worker id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerIdOutOfRange`] if `raw` is negative or exceeds
    /// [`GeneratorConfig::max_worker_id`].
    pub fn new(raw: i64, config: &GeneratorConfig) -> Result<Self> {
        let max = config.max_worker_id();
        if !(0..=max).contains(&raw) {
            return Err(Error::WorkerIdOutOfRange {
                worker_id: raw,
                max,
            });
        }
        Ok(Self(raw))
    }

    /// Derives a worker id from the device identifier: FNV-1a 64 of the
    /// bytes, read as `i64`, absolute value, modulo `max_worker_id + 1`.
    ///
    /// Two devices can land on the same worker id; nothing detects that.
    pub fn derive<S>(source: &S, config: &GeneratorConfig) -> Self
    where
        S: DeviceIdSource + ?Sized,
    {
        Self::from_device_id(&source.device_id(), config)
    }

    pub fn from_device_id(device_id: &[u8], config: &GeneratorConfig) -> Self {
        let hash = fnv1a_64(device_id) as i64;
        let buckets = config.max_worker_id().unsigned_abs() + 1;
        Self((hash.unsigned_abs() % buckets) as i64)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<WorkerId> for i64 {
    fn from(worker_id: WorkerId) -> Self {
        worker_id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, process};

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(fnv1a_64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a_64(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn derived_worker_id_is_stable_and_in_range() {
        let config = GeneratorConfig::default();
        let source = || b"device-1234".to_vec();
        let first = WorkerId::derive(&source, &config);
        let second = WorkerId::derive(&source, &config);
        assert_eq!(first, second);
        assert!((0..=config.max_worker_id()).contains(&first.get()));
    }

    #[test]
    fn derived_worker_id_follows_documented_formula() {
        let config = GeneratorConfig::new(0, 4, 12).unwrap();
        let expected = ((fnv1a_64(b"a") as i64).unsigned_abs() % 16) as i64;
        assert_eq!(WorkerId::from_device_id(b"a", &config).get(), expected);
    }

    #[test]
    fn empty_device_id_still_hashes() {
        let config = GeneratorConfig::default();
        let worker = WorkerId::from_device_id(&[], &config);
        let expected = ((FNV_OFFSET_BASIS as i64).unsigned_abs() % 1024) as i64;
        assert_eq!(worker.get(), expected);
    }

    #[test]
    fn derived_worker_ids_spread_across_buckets() {
        let config = GeneratorConfig::new(0, 4, 12).unwrap();
        let mut seen = std::collections::HashSet::new();
        for device in 0..256u32 {
            seen.insert(WorkerId::from_device_id(&device.to_be_bytes(), &config));
        }
        assert!(seen.len() > 8, "only {} distinct worker ids", seen.len());
    }

    #[test]
    fn explicit_worker_id_is_range_checked() {
        let config = GeneratorConfig::default();
        assert_eq!(WorkerId::new(5, &config).unwrap().get(), 5);
        assert_eq!(WorkerId::new(1023, &config).unwrap().get(), 1023);
        assert_eq!(
            WorkerId::new(1024, &config),
            Err(Error::WorkerIdOutOfRange {
                worker_id: 1024,
                max: 1023
            })
        );
        assert!(WorkerId::new(-1, &config).is_err());
    }

    #[test]
    fn random_device_id_has_sixteen_bytes() {
        assert_eq!(RandomDeviceId.device_id().len(), 16);
    }

    #[test]
    fn machine_id_file_trims_contents() {
        let path = env::temp_dir().join(format!("snowmint-machine-id-{}", process::id()));
        fs::write(&path, "  abc123\n").unwrap();
        let bytes = MachineIdFile::new(&path).device_id();
        fs::remove_file(&path).unwrap();
        assert_eq!(bytes, b"abc123");
    }

    #[test]
    fn blank_machine_id_file_falls_back_to_random() {
        let path = env::temp_dir().join(format!("snowmint-blank-machine-id-{}", process::id()));
        fs::write(&path, " \n\t\n").unwrap();
        let first = MachineIdFile::new(&path).device_id();
        let second = MachineIdFile::new(&path).device_id();
        fs::remove_file(&path).unwrap();
        assert_eq!(first.len(), 16);
        assert_ne!(first, second);
    }

    #[test]
    fn missing_machine_id_file_falls_back_to_random() {
        let source = MachineIdFile::new("/nonexistent/snowmint/machine-id");
        assert_eq!(source.device_id().len(), 16);
    }
}
