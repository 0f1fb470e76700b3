//! API clients for external services.

pub mod polygonscan;

pub use polygonscan::{PolygonscanClient, BLOCK_CEILING, RESULT_WINDOW_LIMIT};
