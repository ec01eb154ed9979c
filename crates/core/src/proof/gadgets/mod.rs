//! Circuit gadgets
//!
//! - Poseidon hash over one to five inputs
//! - Fixed-height Merkle path verification

pub mod merkle;
pub mod poseidon;

pub use merkle::MerklePathGadget;
pub use poseidon::PoseidonGadget;
