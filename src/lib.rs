pub mod config;
pub mod error;
pub mod models;
pub mod playlist;
pub mod sources;


pub use error::{ConfigError, ConfigResult};
pub use playlist::{CuratorConfig, CurationOutcome, PlaylistGenerator, RunContext};
