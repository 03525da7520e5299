#![doc = "ocp-inspect-core: core pipelines for ocp-inspect."]

//! This crate holds the data-transformation logic behind the `ocp-inspect`
//! CLI: OWNERS aggregation over a source tree and MachineConfig content
//! extraction. Everything here is synchronous and side-effect free apart
//! from reading files; fetching live documents from a cluster is left to
//! [`contract::DocumentSource`] implementations.
//!
//! # Usage
//! - [`owners::aggregate`] for a checkout root
//! - [`machine_config::extract_from_str`] for a YAML/JSON document stream
//! - [`yaml::to_yaml`] to render either result

pub mod config;
pub mod content;
pub mod contract;
pub mod error;
pub mod machine_config;
pub mod owners;
pub mod source;
pub mod yaml;

pub use error::InspectError;
