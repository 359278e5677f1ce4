//! Span constructors shared by the parse pipeline, so traces use the same
//! names and fields everywhere.

use tracing::{info_span, Span};

/// One block going through the parser.
pub fn parse_block_span(height: u32, tx_count: usize) -> Span {
    info_span!("parse_block", height, tx_count)
}

/// A batch of blocks handed over by the source.
pub fn parse_batch_span(first_height: u32, count: usize) -> Span {
    info_span!("parse_batch", first_height, count)
}

/// A request for blocks to the source.
pub fn request_blocks_span(from_height: u32) -> Span {
    info_span!("request_blocks", from_height)
}

/// One reorg recovery attempt.
pub fn reorg_span(attempt: u32, rollback_to: u32) -> Span {
    info_span!("reorg", attempt, rollback_to)
}
