//! Fedblock storage abstractions.
//!
//! This crate defines the storage contract the policy evaluator relies on:
//! - the policy store, read inside a transaction for each evaluation
//! - the resolution audit sink, append-only, written inside the same transaction
//! - administrative and audit read surfaces outside the evaluation path
//!
//! Design stance:
//! - Postgres is the transactional source of truth (`postgres` feature).
//! - The in-memory adapter mirrors the transactional semantics for tests
//!   and single-process deployments.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::{InMemoryStorage, InMemoryTransaction};
pub use traits::{
    FedblockStorage, PolicyAdmin, PolicyStore, QueryWindow, ResolutionLog, ResolutionSink,
    StorageTransaction, TransactionalStorage,
};
