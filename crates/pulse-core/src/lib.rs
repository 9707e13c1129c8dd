//! # pulse-core
//!
//! Core crate for SocialPulse. Contains the collaborator traits, the
//! configuration schema, the data shapes shared by the foreground
//! application and the background worker, and the unified error system.
//!
//! This crate has **no** internal dependencies on other SocialPulse crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
