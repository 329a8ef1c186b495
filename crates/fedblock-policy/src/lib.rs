//! # Fedblock Policy
//!
//! Decides whether an inbound federated activity is blocked for a local
//! user, and records why.
//!
//! ## Evaluation model
//!
//! - Policies are walked in ascending order; the first deny stops the walk
//! - Verdicts compose on the lattice `Deny > Grant > Unknown`
//! - One [`fedblock_types::Resolution`] is recorded per consulted policy
//! - Reading policies and recording resolutions share one transaction
//! - Every error rejects delivery
//!
//! ## Example
//!
//! ```rust,no_run
//! use fedblock_policy::BlockingService;
//! use fedblock_storage::InMemoryStorage;
//! use fedblock_types::ActorIri;
//! use std::sync::Arc;
//!
//! # async fn example() -> fedblock_policy::Result<()> {
//! let service = BlockingService::new(Arc::new(InMemoryStorage::new()));
//! let from = vec![ActorIri::parse("https://remote.example/users/bob")?];
//! let blocked = service
//!     .is_blocked("alice", &from, "https://remote.example/activities/1", "Follow")
//!     .await?;
//! # let _ = blocked;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod activity;
pub mod cancellation;
pub mod error;
pub mod evaluator;
pub mod policy_set;
pub mod service;
pub mod unit_of_work;
pub mod variant;

pub use activity::InboundActivity;
pub use cancellation::{cancellation, Cancellation, CancellationHandle};
pub use error::{BlockError, Result};
pub use evaluator::{Evaluation, PolicySetEvaluator};
pub use policy_set::PolicySet;
pub use service::BlockingService;
pub use unit_of_work::{run_in_transaction, UnitOfWork};
pub use variant::{Resolve, ResolvePolicy, Verdict};
