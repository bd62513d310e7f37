//! Error types and result aliases for Federa.
//!
//! Every crate in the workspace reports failures through [`FederaError`].
//! Recoverable planning outcomes (an untranslatable predicate, a rule that
//! does not match) are modelled as values, not errors.

mod error;

pub use error::{FederaError, FederaResult, GenericError};
