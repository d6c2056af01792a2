pub mod aggregator;
pub mod allocation;
pub mod classifier;
pub mod config;
pub mod diff;
pub mod filters;
pub mod generator;
pub mod metadata;
pub mod scoring;
pub mod selection;

#[cfg(test)]
mod config_tests;

pub use aggregator::*;
pub use allocation::*;
pub use classifier::*;
pub use config::*;
pub use diff::*;
pub use filters::*;
pub use generator::*;
pub use metadata::*;
pub use scoring::*;
pub use selection::*;
