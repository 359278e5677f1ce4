//! Cryptographic primitives for the Tessera ledger engine.
//!
//! - **Blake2b-256** for state hashes, block-window hashes and the hash chain
//! - **Ed25519** for checking signed block-window attestations from oracles

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{blake2b_256, blake2b_256_multi, chain_hash};
pub use keys::{keypair_from_seed, public_from_private, KeyError, KeyPair, PrivateKey, PublicKey, Signature};
pub use sign::{sign_message, verify_signature};
