//! Cross-check of recent blocks against hashes signed by trusted oracles.
//!
//! An oracle publishes the hash of a window of blocks together with an
//! Ed25519 signature. A node recomputes the hash over its own copy of the
//! window and accepts the attestation only if the signer is on the
//! configured allow-list, the signature holds and the hashes agree.

use serde::{Deserialize, Serialize};
use tracing::warn;

use tessera_crypto::{sign_message, verify_signature, KeyPair, PublicKey, Signature};
use tessera_ledger::hash_of_block_window;
use tessera_types::Block;

/// A signed claim about the blocks `from_height..=to_height`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedBlockWindow {
    pub from_height: u32,
    pub to_height: u32,
    pub hash: [u8; 32],
    pub signer: PublicKey,
    pub signature: Signature,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowVerdict {
    Accepted,
    UnknownSigner,
    BadSignature,
    /// Signature is fine but our blocks hash differently.
    HashMismatch,
}

/// Bytes the oracle signs.
fn signing_message(from_height: u32, to_height: u32, hash: &[u8; 32]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(40);
    msg.extend_from_slice(&from_height.to_be_bytes());
    msg.extend_from_slice(&to_height.to_be_bytes());
    msg.extend_from_slice(hash);
    msg
}

/// Sign the hash of `blocks` as an oracle would.
pub fn sign_block_window(blocks: &[Block], keys: &KeyPair) -> SignedBlockWindow {
    let from_height = blocks.first().map_or(0, |b| b.height);
    let to_height = blocks.last().map_or(0, |b| b.height);
    let hash = hash_of_block_window(blocks);
    let signature = sign_message(&signing_message(from_height, to_height, &hash), &keys.private);
    SignedBlockWindow {
        from_height,
        to_height,
        hash,
        signer: keys.public.clone(),
        signature,
    }
}

/// Check `signed` against our own `blocks` for the same window.
pub fn verify_block_window(
    blocks: &[Block],
    signed: &SignedBlockWindow,
    allowed: &[PublicKey],
) -> WindowVerdict {
    if !allowed.contains(&signed.signer) {
        warn!(signer = %signed.signer.to_hex(), "block window signed by unknown key");
        return WindowVerdict::UnknownSigner;
    }
    let msg = signing_message(signed.from_height, signed.to_height, &signed.hash);
    if !verify_signature(&msg, &signed.signature, &signed.signer) {
        warn!(signer = %signed.signer.to_hex(), "block window signature invalid");
        return WindowVerdict::BadSignature;
    }
    if hash_of_block_window(blocks) != signed.hash {
        warn!(
            from_height = signed.from_height,
            to_height = signed.to_height,
            "block window hash differs from oracle"
        );
        return WindowVerdict::HashMismatch;
    }
    WindowVerdict::Accepted
}
