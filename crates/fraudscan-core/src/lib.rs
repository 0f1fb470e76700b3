//! Fraudscan Core Library
//!
//! Shared building blocks for the fraudscan toolkit: the Polygonscan
//! client, the wallet crawler, rule-based fraud scoring, feature
//! extraction for the classifier, and the SQLite storage layer.

pub mod api;
pub mod config;
pub mod crawler;
pub mod db;
pub mod error;
pub mod export;
pub mod features;
pub mod scoring;
pub mod types;

pub use error::{Error, Result};
