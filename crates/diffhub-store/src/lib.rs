//! Request and result storage for diffhub.
//!
//! Holds every [`diffhub_types::ComparisonRequest`] and the
//! [`diffhub_types::DiffResult`] of each completed one.
//!
//! # Storage Backends
//!
//! Backends implement [`ComparisonRequestStore`] and [`DiffResultStore`]:
//!
//! - [`InMemoryRequestStore`] -- `HashMap`-based request store
//! - [`InMemoryResultStore`] -- `HashMap`-based result store
//!
//! # Design Rules
//!
//! 1. Status changes only through [`ComparisonRequestStore::claim`],
//!    [`ComparisonRequestStore::complete`] and [`ComparisonRequestStore::fail`].
//! 2. A claim is a compare-and-set on `Pending`; concurrent claims on one
//!    request have exactly one winner.
//! 3. A stored result is never replaced.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryRequestStore, InMemoryResultStore};
pub use traits::{ClaimOutcome, ComparisonRequestStore, DiffResultStore};
