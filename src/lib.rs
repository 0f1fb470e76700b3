//! Fraudscan: Polygon Transaction Fraud-Screening Toolkit
//!
//! This is the root crate that provides benchmark and integration-test
//! access to the workspace. For actual functionality, use the individual
//! crates directly:
//!
//! - `fraudscan-core`: shared types, the Polygonscan client, the wallet
//!   crawler, scoring rules, and SQLite storage
//! - `tx-crawler`: transaction ingestion CLI
//! - `fraud-classifier`: RandomForest training and wallet screening CLI

// Re-export for benchmarks
pub use fraudscan_core as core;
