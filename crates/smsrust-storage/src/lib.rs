//! SmsRust Storage - data models and repository abstraction
//!
//! This crate defines the persistent models for campaigns, contacts, devices
//! and per-message delivery details, the repository traits the dispatch
//! engine is written against, a PostgreSQL implementation and an in-memory
//! implementation used by tests and the `memory` backend.

pub mod db;
pub mod memory;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
pub use memory::MemoryStore;
pub use models::*;
pub use repository::*;
