//! On-disk form of the ledger state.
//!
//! A node writes the whole state after each parsed block and reloads it on
//! start, so it resumes from the persisted height instead of genesis.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{LedgerError, LedgerState};

/// Bumped whenever the serialized layout of [`LedgerState`] changes.
pub const LEDGER_FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedLedger {
    pub version: u32,
    pub state: LedgerState,
}

impl PersistedLedger {
    pub fn new(state: LedgerState) -> Self {
        Self {
            version: LEDGER_FORMAT_VERSION,
            state,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let persisted: Self = bincode::deserialize(bytes)?;
        if persisted.version != LEDGER_FORMAT_VERSION {
            return Err(LedgerError::UnsupportedVersion {
                found: persisted.version,
                expected: LEDGER_FORMAT_VERSION,
            });
        }
        Ok(persisted)
    }

    /// Write atomically: the bytes go to a sibling temp file first, then
    /// replace `path`.
    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;
        debug!(
            path = %path.display(),
            height = self.state.chain_height(),
            bytes = bytes.len(),
            "ledger persisted"
        );
        Ok(())
    }

    /// `Ok(None)` when nothing has been persisted yet.
    pub fn load(path: &Path) -> Result<Option<Self>, LedgerError> {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::{
        BlockHash, GenesisTxInfo, NetworkId, RawBlock, RawTxOutput, Tx, TxId, TxInput, TxOutput,
        TxOutputType, TxType,
    };

    fn sample_state() -> LedgerState {
        let genesis_id = TxId::new([7; 32]);
        let mut state = LedgerState::new(NetworkId::Regtest, GenesisTxInfo::new(genesis_id, 5), 10);
        let raw = RawBlock {
            height: 5,
            time: 1,
            hash: BlockHash::new([5; 32]),
            prev_hash: BlockHash::ZERO,
            txs: Vec::new(),
        };
        let mut output = TxOutput::from_raw(genesis_id, 5, &RawTxOutput::new(0, 2500, "a"));
        output.output_type = TxOutputType::Genesis;
        let mut writer = state.open_block(&raw);
        writer.apply_tx(Tx {
            id: genesis_id,
            block_height: 5,
            inputs: vec![TxInput::new(TxId::ZERO, 0)],
            outputs: vec![output],
            tx_type: TxType::Genesis,
            burnt_fee: 0,
        });
        drop(writer);
        state
    }

    #[test]
    fn save_and_load_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger").join("state.bin");
        let state = sample_state();

        PersistedLedger::new(state.clone()).save(&path).unwrap();
        let loaded = PersistedLedger::load(&path).unwrap().unwrap();

        assert_eq!(loaded.state.chain_height(), 5);
        assert_eq!(loaded.state.unspent_outputs(), state.unspent_outputs());
        assert_eq!(loaded.state.total_supply(), 2500);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PersistedLedger::load(&dir.path().join("absent.bin"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn rejects_other_format_version() {
        let mut persisted = PersistedLedger::new(sample_state());
        persisted.version = LEDGER_FORMAT_VERSION + 1;
        let bytes = persisted.to_bytes().unwrap();
        assert!(matches!(
            PersistedLedger::from_bytes(&bytes),
            Err(LedgerError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            PersistedLedger::from_bytes(&[1, 2, 3]),
            Err(LedgerError::Serialization(_))
        ));
    }
}
