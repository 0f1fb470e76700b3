//! Core domain types for the fraudscan toolkit.

pub mod blacklist;
pub mod transaction;

pub use blacklist::*;
pub use transaction::*;
