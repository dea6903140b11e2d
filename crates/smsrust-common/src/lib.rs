//! SmsRust Common - shared configuration, errors and types
//!
//! This crate provides the configuration loader, the error taxonomy and the
//! identifier/status types shared by every SmsRust crate.

pub mod config;
pub mod error;
pub mod types;

pub use error::{Error, Result};
