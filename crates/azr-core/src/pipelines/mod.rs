mod azr;
mod config;

pub use azr::Azr;
pub use config::{Config, PreparedRun};
