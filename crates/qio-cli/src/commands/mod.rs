//! CLI command implementations.

pub mod cancel;
pub mod common;
pub mod config;
pub mod result;
pub mod status;
pub mod submit;
pub mod upload;
pub mod wait;
