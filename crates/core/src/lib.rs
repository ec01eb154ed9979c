//! Vault Prover - Core
//!
//! Input derivation, validation and proving for vault membership proofs.
//!
//! # Modules
//! - `field`: Scalar parsing and field range checks
//! - `identity` / `request`: Accounts, vault and claim descriptors
//! - `derivation`: Vault identifier, secret hash and nullifier
//! - `membership`: Dual Merkle tree lookups
//! - `commitment`: EdDSA commitment receipts
//! - `validation`: Ordered checks run before proving
//! - `inputs`: Private and public circuit inputs
//! - `crypto`: Poseidon hash, key/value Merkle trees, Baby JubJub EdDSA
//! - `proof`: Membership circuit and Groth16 engine
//! - `prover`: The orchestrator tying the above together

pub mod commitment;
pub mod config;
pub mod crypto;
pub mod derivation;
pub mod error;
pub mod field;
pub mod identity;
pub mod inputs;
pub mod membership;
pub mod proof;
pub mod prover;
pub mod request;
pub mod validation;

// Re-export common types
pub use commitment::{
    AuthorityPublicKey, CommitmentMapper, CommitmentVerifier, EddsaCommitmentVerifier,
};
pub use config::{CircuitArtifacts, ProverConfig, ACCOUNTS_TREE_HEIGHT, REGISTRY_TREE_HEIGHT};
pub use crypto::{FieldHasher, KvMerkleTree, Poseidon, TreeKey};
pub use error::{CryptoError, ProofError, ProverError, ProverResult, Side, TreeRole};
pub use field::Scalar;
pub use identity::{Account, AccountInput, CommitmentReceipt, RawAccount};
pub use inputs::{CircuitInputs, FormattedInputs, PrivateInputBundle, PublicInputBundle};
pub use membership::{MembershipTree, MembershipWitness};
pub use proof::{EngineOutput, Groth16Engine, ProofPoints, ProvingEngine, SnarkProof};
pub use prover::Prover;
pub use request::{ClaimComparator, ClaimDescriptor, ProofRequest, VaultDescriptor};
