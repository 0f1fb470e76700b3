//! Chunked block-range archiving.
//!
//! Fetches every block in a range and writes the raw transaction objects
//! to JSON files of `chunk_size` blocks each, named `blk_{start}_{end}.json`.

use anyhow::{bail, Result};
use fraudscan_core::api::PolygonscanClient;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Summary of a block-range fetch.
#[derive(Debug, Clone)]
pub struct BlockFetchReport {
    pub blocks_fetched: usize,
    pub blocks_failed: usize,
    pub transactions_found: usize,
    pub chunks_written: usize,
    pub total_seconds: f64,
    pub avg_seconds_per_block: f64,
}

pub async fn fetch_block_range(
    client: &PolygonscanClient,
    chunk_dir: &str,
    start_block: u64,
    end_block: u64,
    chunk_size: u64,
) -> Result<BlockFetchReport> {
    if chunk_size == 0 {
        bail!("chunk size must be at least 1");
    }
    if end_block < start_block {
        bail!("end block {end_block} is before start block {start_block}");
    }

    fs::create_dir_all(chunk_dir)?;
    let started = Instant::now();

    let mut blocks_fetched = 0usize;
    let mut blocks_failed = 0usize;
    let mut transactions_found = 0usize;
    let mut chunks_written = 0usize;

    for (chunk_start, chunk_end) in chunk_bounds(start_block, end_block, chunk_size) {
        let mut transactions = Vec::new();

        for block in chunk_start..=chunk_end {
            match client.block_by_number(block).await {
                Ok(record) => {
                    blocks_fetched += 1;
                    transactions.extend(record.transactions);
                }
                Err(e) => {
                    warn!(block, error = %e, "block fetch failed, skipping");
                    blocks_failed += 1;
                }
            }
        }

        let path = chunk_path(chunk_dir, chunk_start, chunk_end);
        fs::write(&path, serde_json::to_string_pretty(&transactions)?)?;
        info!(
            path = %path.display(),
            transactions = transactions.len(),
            "chunk written"
        );
        transactions_found += transactions.len();
        chunks_written += 1;
    }

    let total_seconds = started.elapsed().as_secs_f64();
    // Widen before the +1 so a range ending at u64::MAX cannot wrap.
    let block_count = (end_block - start_block) as f64 + 1.0;

    Ok(BlockFetchReport {
        blocks_fetched,
        blocks_failed,
        transactions_found,
        chunks_written,
        total_seconds,
        avg_seconds_per_block: total_seconds / block_count,
    })
}

/// Closed chunk bounds covering `start_block..=end_block`, `chunk_size`
/// blocks each. The final chunk closes the range without stepping past
/// it, so bounds at `u64::MAX` cannot wrap.
fn chunk_bounds(start_block: u64, end_block: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    let mut bounds = Vec::new();
    let mut chunk_start = start_block;
    loop {
        let chunk_end = chunk_start.saturating_add(chunk_size - 1).min(end_block);
        bounds.push((chunk_start, chunk_end));
        if chunk_end == end_block {
            break;
        }
        chunk_start = chunk_end + 1;
    }
    bounds
}

fn chunk_path(chunk_dir: &str, chunk_start: u64, chunk_end: u64) -> PathBuf {
    Path::new(chunk_dir).join(format!("blk_{chunk_start}_{chunk_end}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_path_naming() {
        let path = chunk_path("data", 45_000_000, 45_000_004);
        assert_eq!(path, PathBuf::from("data/blk_45000000_45000004.json"));
    }

    #[test]
    fn test_chunk_bounds_cover_the_range() {
        let bounds = chunk_bounds(10, 22, 5);
        assert_eq!(bounds, vec![(10, 14), (15, 19), (20, 22)]);
    }

    #[test]
    fn test_single_block_range_is_one_chunk() {
        assert_eq!(chunk_bounds(7, 7, 5), vec![(7, 7)]);
    }

    #[test]
    fn test_chunk_bounds_at_the_numeric_ceiling() {
        // An open-ended archive can pass u64::MAX as its end bound; the
        // final chunk must close the range without wrapping.
        let bounds = chunk_bounds(u64::MAX - 6, u64::MAX, 4);
        assert_eq!(
            bounds,
            vec![(u64::MAX - 6, u64::MAX - 3), (u64::MAX - 2, u64::MAX)]
        );
    }
}
