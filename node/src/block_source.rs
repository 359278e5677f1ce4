//! Where blocks come from.
//!
//! A full node reads raw blocks straight from its chain backend. A lite node
//! asks a peer, which hands over blocks it has already parsed. The controller
//! treats both the same: every block is reset to its pristine form and parsed
//! locally, so nothing a peer derived is ever trusted.

use std::future::Future;

use thiserror::Error;

use tessera_types::{Block, Pristine, RawBlock};

use crate::NodeRole;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("block source unavailable: {0}")]
    Unavailable(String),

    #[error("request for blocks from height {0} timed out")]
    Timeout(u32),
}

/// A block as delivered by a source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceBlock {
    Raw(RawBlock),
    /// Parsed by a peer. Only its header and transaction shapes are used.
    Parsed(Block),
}

impl SourceBlock {
    pub fn height(&self) -> u32 {
        match self {
            Self::Raw(b) => b.height,
            Self::Parsed(b) => b.height,
        }
    }
}

impl Pristine for SourceBlock {
    fn pristine(&self) -> RawBlock {
        match self {
            Self::Raw(b) => b.pristine(),
            Self::Parsed(b) => b.pristine(),
        }
    }
}

impl From<RawBlock> for SourceBlock {
    fn from(block: RawBlock) -> Self {
        Self::Raw(block)
    }
}

impl From<Block> for SourceBlock {
    fn from(block: Block) -> Self {
        Self::Parsed(block)
    }
}

/// Capability to fetch blocks. Retrieval is the only awaiting operation in
/// the node.
pub trait BlockSource: Send {
    fn role(&self) -> NodeRole;

    /// Blocks from `from_height` upwards, in height order. An empty list
    /// means the source has nothing newer.
    fn request_blocks(
        &mut self,
        from_height: u32,
    ) -> impl Future<Output = Result<Vec<SourceBlock>, SourceError>> + Send;
}

// ── Full node ──────────────────────────────────────────────────────────

/// Direct, synchronous access to a chain backend.
pub trait ChainReader: Send {
    fn raw_blocks_from(&self, from_height: u32) -> Result<Vec<RawBlock>, SourceError>;
}

impl ChainReader for Vec<RawBlock> {
    fn raw_blocks_from(&self, from_height: u32) -> Result<Vec<RawBlock>, SourceError> {
        Ok(self
            .iter()
            .filter(|b| b.height >= from_height)
            .cloned()
            .collect())
    }
}

/// Full-node source: no network round trip.
pub struct DirectSource<R> {
    reader: R,
}

impl<R: ChainReader> DirectSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}

impl<R: ChainReader> BlockSource for DirectSource<R> {
    fn role(&self) -> NodeRole {
        NodeRole::Full
    }

    fn request_blocks(
        &mut self,
        from_height: u32,
    ) -> impl Future<Output = Result<Vec<SourceBlock>, SourceError>> + Send {
        let result = self
            .reader
            .raw_blocks_from(from_height)
            .map(|blocks| blocks.into_iter().map(SourceBlock::Raw).collect());
        std::future::ready(result)
    }
}

// ── Lite node ──────────────────────────────────────────────────────────

/// A peer that serves blocks it has parsed.
pub trait PeerClient: Send {
    fn fetch_blocks(
        &mut self,
        from_height: u32,
    ) -> impl Future<Output = Result<Vec<Block>, SourceError>> + Send;
}

/// Lite-node source: one batch request to a peer.
pub struct PeerSource<P> {
    peer: P,
}

impl<P: PeerClient> PeerSource<P> {
    pub fn new(peer: P) -> Self {
        Self { peer }
    }

    pub fn peer_mut(&mut self) -> &mut P {
        &mut self.peer
    }
}

impl<P: PeerClient> BlockSource for PeerSource<P> {
    fn role(&self) -> NodeRole {
        NodeRole::Lite
    }

    async fn request_blocks(&mut self, from_height: u32) -> Result<Vec<SourceBlock>, SourceError> {
        let blocks = self.peer.fetch_blocks(from_height).await?;
        Ok(blocks.into_iter().map(SourceBlock::Parsed).collect())
    }
}
