//! Periodic ledger snapshots.
//!
//! At every height on the snapshot grid the service writes the candidate it
//! took one grid earlier and keeps a fresh copy of the current state as the
//! next candidate. The persisted snapshot therefore always lags the tip by a
//! full grid, which keeps it below the blocks a typical reorg discards.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use tessera_ledger::{LedgerState, PersistedLedger};

use crate::NodeError;

const SNAPSHOT_PREFIX: &str = "ledger-";
const SNAPSHOT_EXT: &str = "bin";

pub struct SnapshotService {
    dir: PathBuf,
    grid: u32,
    genesis_height: u32,
    candidate: Option<LedgerState>,
}

impl SnapshotService {
    pub fn new(dir: impl Into<PathBuf>, grid: u32, genesis_height: u32) -> Self {
        Self {
            dir: dir.into(),
            grid: grid.max(1),
            genesis_height,
            candidate: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_snapshot_height(&self, height: u32) -> bool {
        height % self.grid == 0 && height.saturating_sub(self.genesis_height) >= self.grid
    }

    pub fn candidate_height(&self) -> Option<u32> {
        self.candidate.as_ref().map(LedgerState::chain_height)
    }

    /// Called after each parsed block. Returns the height written, if any.
    pub fn on_block_parsed(&mut self, state: &LedgerState) -> Result<Option<u32>, NodeError> {
        let height = state.chain_height();
        if !self.is_snapshot_height(height) {
            return Ok(None);
        }
        let written = match self.candidate.take() {
            Some(candidate) => {
                let written_height = candidate.chain_height();
                self.persist(candidate)?;
                Some(written_height)
            }
            None => None,
        };
        self.candidate = Some(state.clone());
        debug!(height, "snapshot candidate taken");
        Ok(written)
    }

    /// Forget snapshots above `height`; they belong to discarded blocks.
    pub fn on_rollback(&mut self, height: u32) -> Result<(), NodeError> {
        if self.candidate_height().is_some_and(|h| h > height) {
            self.candidate = None;
        }
        for (snapshot_height, path) in self.list()? {
            if snapshot_height > height {
                std::fs::remove_file(&path)?;
                info!(snapshot_height, "snapshot above rollback height removed");
            }
        }
        Ok(())
    }

    /// The newest readable snapshot, if any.
    ///
    /// A snapshot that fails to load is skipped with a warning in favour of
    /// the next older one.
    pub fn load_latest(&self) -> Result<Option<LedgerState>, NodeError> {
        let mut snapshots = self.list()?;
        snapshots.sort_by(|a, b| b.0.cmp(&a.0));
        for (height, path) in snapshots {
            match PersistedLedger::load(&path) {
                Ok(Some(persisted)) => {
                    info!(height, "ledger restored from snapshot");
                    return Ok(Some(persisted.state));
                }
                Ok(None) => {}
                Err(e) => warn!(height, error = %e, "unreadable snapshot skipped"),
            }
        }
        Ok(None)
    }

    fn persist(&self, state: LedgerState) -> Result<(), NodeError> {
        let height = state.chain_height();
        let path = self.path_for(height);
        PersistedLedger::new(state).save(&path)?;
        info!(height, path = %path.display(), "snapshot written");
        Ok(())
    }

    fn path_for(&self, height: u32) -> PathBuf {
        self.dir
            .join(format!("{SNAPSHOT_PREFIX}{height:010}.{SNAPSHOT_EXT}"))
    }

    fn list(&self) -> Result<Vec<(u32, PathBuf)>, NodeError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut found = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            let height = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix(SNAPSHOT_PREFIX))
                .and_then(|s| s.parse::<u32>().ok());
            if let Some(height) = height {
                found.push((height, path));
            }
        }
        Ok(found)
    }
}
