//! Feeding blocks from a file into the chain.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use dexchain_consensus_logic::BlockStatus;
use dexchain_state::block::Block;
use tracing::*;

use crate::{context::NodeChain, errors::InitError};

/// Counts of how imported blocks ended up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    pub(crate) accepted: usize,
    pub(crate) rejected: usize,
}

/// Reads one JSON encoded block per line, skipping blank lines.
pub(crate) fn read_blocks(reader: impl BufRead) -> Result<Vec<Block>, InitError> {
    let mut blocks = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let block = serde_json::from_str(&line).map_err(|source| InitError::UnparsableBlock {
            line: lineno + 1,
            source,
        })?;
        blocks.push(block);
    }
    Ok(blocks)
}

/// Pushes every block in `path`.  A block the chain refuses is logged and
/// counted, the import goes on with the next one.
pub(crate) fn import_blocks(
    chain: &mut NodeChain,
    path: &Path,
) -> Result<ImportSummary, InitError> {
    let blocks = read_blocks(BufReader::new(File::open(path)?))?;
    info!(count = blocks.len(), path = %path.display(), "importing blocks");

    let mut summary = ImportSummary::default();
    for block in blocks {
        let id = block.id();
        let block_num = block.header.block_num;
        match chain.push_block(block) {
            Ok(BlockStatus::Invalid) => {
                warn!(%id, %block_num, "block invalid");
                summary.rejected += 1;
            }
            Ok(status) => {
                debug!(%id, %block_num, ?status, "block imported");
                summary.accepted += 1;
            }
            Err(e) => {
                warn!(%id, %block_num, %e, "block rejected");
                summary.rejected += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_blocks_skips_blank_lines() {
        let input: &[u8] = b"\n   \n";
        assert!(read_blocks(input).unwrap().is_empty());
    }

    #[test]
    fn test_read_blocks_reports_bad_line() {
        let input: &[u8] = b"\n{\"not\": \"a block\"}\n";
        assert!(matches!(
            read_blocks(input),
            Err(InitError::UnparsableBlock { line: 2, .. })
        ));
    }
}
