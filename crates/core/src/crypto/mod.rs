//! Cryptographic collaborators: hash, key/value Merkle tree, EdDSA

pub mod eddsa;
pub mod merkle;
pub mod poseidon;
pub mod poseidon_constants;

pub use eddsa::{PublicKey, Signature, SigningKey};
pub use merkle::{KvMerkleTree, MerklePath, TreeKey};
pub use poseidon::{FieldHasher, Poseidon};
