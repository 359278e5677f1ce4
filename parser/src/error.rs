use thiserror::Error;

use tessera_types::BlockHash;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The block does not extend the current head. Nothing was applied.
    #[error(
        "block {height} does not connect: expected height {expected_height}, \
         prev hash {prev_hash}, head {head_hash:?}"
    )]
    BlockNotConnecting {
        height: u32,
        expected_height: u32,
        prev_hash: BlockHash,
        head_hash: Option<BlockHash>,
    },
}
