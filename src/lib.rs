pub mod bootstrap;
pub mod config;
pub mod paths;
pub mod runlog;

pub use config::Config;
