//! tgpt core - Shared functionality for the tgpt tool
//!
//! Configuration, standard paths and the boxed text formatter.

pub mod config;
pub mod format;
pub mod paths;

pub use config::Config;
pub use paths::Paths;
