//! # Fedblock Types
//!
//! Core data model shared by every Fedblock crate.
//!
//! ## Key Types
//!
//! - [`Permit`]: three-valued verdict with its composition law
//! - [`PolicyKind`] / [`PolicyRule`]: the six recognised policy variants
//! - [`PolicyRecord`]: persisted, unvalidated policy shape
//! - [`Policy`]: validated policy snapshot used during one evaluation
//! - [`Resolution`]: append-only audit record of one policy verdict
//! - [`ActorIri`] / [`ActivityId`]: federated identifiers
//!
//! ## Example
//!
//! ```rust
//! use fedblock_types::Permit;
//!
//! let outcome = Permit::Unknown.compose(Permit::Grant).compose(Permit::Deny);
//! assert_eq!(outcome, Permit::Deny);
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod iri;
pub mod permit;
pub mod policy;
pub mod resolution;

pub use error::{Result, TypeError};
pub use iri::{ActivityId, ActorIri};
pub use permit::Permit;
pub use policy::{
    NewPolicy, Policy, PolicyKind, PolicyRecord, PolicyRule, PolicyScope, Purpose,
};
pub use resolution::Resolution;
