//! Ledger Store - collection-oriented document storage
//!
//! Provides the persistence layer for the ledger runtime:
//! - `DataService` / `DataCollection`: named collections of JSON objects
//! - A single serialized write queue per service
//! - Staged (deferred) writes with commit / rollback per session
//! - Pluggable backends: in-memory, sled, filesystem
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              DataService                 │
//! │   sessions ── staging ── handle_action   │
//! └────────────────────┬─────────────────────┘
//!                      │ batches
//!               ┌──────▼──────┐
//!               │ WriteQueue  │ (one worker)
//!               └──────┬──────┘
//!        ┌─────────────┼─────────────┐
//!        ▼             ▼             ▼
//!   MemoryBackend  SledBackend   FsBackend
//! ```

pub mod action;
pub mod backend;
pub mod collection;
pub mod error;
pub mod service;

mod queue;
mod staging;

pub use action::Action;
pub use backend::{FsBackend, MemoryBackend, SledBackend, SledConfig, StorageBackend};
pub use collection::DataCollection;
pub use error::{Result, StoreError};
pub use service::{DataService, DataServiceOptions};
