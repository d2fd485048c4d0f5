//! Coordination-free Snowflake-style ID generation.
//!
//! `snowmint` mints 64-bit IDs on a device without asking any server. Each ID
//! packs a millisecond timestamp, a worker id derived from the device, and a
//! per-millisecond sequence:
//!
//! ```text
//! | 0 (sign) | timestamp - epoch | worker id | sequence |
//! ```
//!
//! IDs from one generator are unique and time-ordered. IDs from different
//! devices stay distinct as long as their worker ids differ.
//!
//! ```
//! use snowmint::{GeneratorConfig, LockSnowflakeGenerator, SystemClock};
//!
//! let config = GeneratorConfig::builder()
//!     .worker_id_bits(10)
//!     .sequence_bits(12)
//!     .build()
//!     .unwrap();
//! let generator = LockSnowflakeGenerator::new(config, &|| "vendor-id", SystemClock);
//! let id = generator.next_id().unwrap();
//! println!("{id} -> {:?}", generator.decode(id));
//! ```
mod config;
mod error;
mod generator;
mod id;
mod time;
mod worker;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::time::*;
pub use crate::worker::*;
