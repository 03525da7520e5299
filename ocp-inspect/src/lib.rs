pub mod cli;
pub mod cluster;
pub mod load_config;

pub use cli::{execute, run, Cli, Commands};
