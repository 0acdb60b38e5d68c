pub mod bootstrap;
pub mod config;
pub mod correlation;
pub mod directory;
pub mod error;
pub mod event;
pub mod identity;
pub mod logging;
pub mod mentions;
pub mod registry;
pub mod relay;
pub mod slack;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AggregatorError, ErrorKind, Result};
pub use relay::{AGGREGATE_PREFIX, RelayEngine};
