mod lock;
mod status;
mod wait;

pub use lock::*;
pub use status::*;
pub use wait::*;
