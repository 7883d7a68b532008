//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`init`] - Configuration initialization
//! - [`monitor`] - Follow a relay, optionally against a planned route
//! - [`relay`] - Bridge a TCP GPS source to WebSocket subscribers

pub mod common;
pub mod init;
pub mod monitor;
pub mod relay;
