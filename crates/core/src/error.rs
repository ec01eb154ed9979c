//! Unified Error Types for the vault prover
//!
//! Every failure of the input pipeline is terminal for the request that raised
//! it. Variants carry the side, tree or field involved plus the offending
//! values so callers can act on them without re-running the pipeline.

use std::fmt;

use thiserror::Error;

/// Which account of the request a failure refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Source,
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Destination => f.write_str("destination"),
        }
    }
}

/// Role of a Merkle tree inside a claim
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeRole {
    Accounts,
    Registry,
}

impl fmt::Display for TreeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeRole::Accounts => f.write_str("accounts"),
            TreeRole::Registry => f.write_str("registry"),
        }
    }
}

/// Scalars that are range-checked against the field modulus before proving
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverflowField {
    ProofIdentifier,
    VaultIdentifier,
    SourceIdentifier,
    RequestIdentifier,
    ExtraData,
    DestinationIdentifier,
    VaultNamespace,
    VaultSecret,
    SourceSecret,
    SourceVaultNamespace,
    DestinationVaultNamespace,
    CommitmentMapperPubkey,
}

impl fmt::Display for OverflowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowField::ProofIdentifier => f.write_str("proof identifier"),
            OverflowField::VaultIdentifier => f.write_str("vault identifier"),
            OverflowField::SourceIdentifier => f.write_str("source identifier"),
            OverflowField::RequestIdentifier => f.write_str("request identifier"),
            OverflowField::ExtraData => f.write_str("extra data"),
            OverflowField::DestinationIdentifier => f.write_str("destination identifier"),
            OverflowField::VaultNamespace => f.write_str("vault namespace"),
            OverflowField::VaultSecret => f.write_str("vault secret"),
            OverflowField::SourceSecret => f.write_str("source secret"),
            OverflowField::SourceVaultNamespace => f.write_str("source vault namespace"),
            OverflowField::DestinationVaultNamespace => {
                f.write_str("destination vault namespace")
            }
            OverflowField::CommitmentMapperPubkey => f.write_str("commitment mapper public key"),
        }
    }
}

/// Top-level error type for the prover
#[derive(Error, Debug)]
pub enum ProverError {
    #[error("Malformed scalar {value:?}: {reason}")]
    MalformedScalar { value: String, reason: String },

    #[error("Vault secret must be identical to the {side} secret")]
    SecretMismatch { side: Side },

    #[error("{side} account is vault-derived but has no {field}")]
    IncompleteAccount { side: Side, field: &'static str },

    #[error("Accounts tree and registry tree must be supplied together ({missing} tree is missing)")]
    IncompleteClaimTrees { missing: TreeRole },

    #[error("Invalid {which} tree height: expected {expected}, got {actual}")]
    InvalidTreeHeight {
        which: TreeRole,
        expected: usize,
        actual: usize,
    },

    #[error("Accounts tree root {root} not found in the registry tree")]
    AccountsTreeNotInRegistryTree { root: String },

    #[error("Could not find the source {key} in the accounts tree")]
    SourceNotInAccountsTree { key: String },

    #[error("Claim value {claim} can't be superior to source value {source_value}")]
    ClaimExceedsSourceValue { claim: String, source_value: String },

    #[error("Source value {source_value} exceeds the comparable maximum {max}")]
    SourceValueOutOfRange { source_value: String, max: String },

    #[error("Claim value {claim} can't be negative")]
    ClaimNotNegative { claim: String },

    #[error("Claim value {claim} must be equal to source value {source_value} when the comparator is EQUAL")]
    ClaimNotEqualForComparatorEQ { claim: String, source_value: String },

    #[error("Invalid {side} commitment receipt")]
    InvalidCommitmentReceipt { side: Side },

    #[error("Invalid {side} namespace or secret")]
    InvalidNamespaceOrSecret { side: Side },

    #[error("The {field} {value} overflows the snark field")]
    FieldOverflow { field: OverflowField, value: String },

    /// Failure surfaced verbatim from the proving engine
    #[error("Proving engine failure: {0}")]
    ProvingEngineFailure(#[from] ProofError),

    /// Hash, tree or signature collaborator failure
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for prover operations
pub type ProverResult<T> = Result<T, ProverError>;

/// Errors from the hash, tree and signature collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Poseidon hash needs at least one input")]
    EmptyHashInput,

    #[error("Poseidon hash supports at most {max} inputs, got {got}")]
    HashArity { max: usize, got: usize },

    #[error("Merkle tree of height {height} cannot hold {entries} entries")]
    TreeCapacity { height: usize, entries: usize },

    #[error("Duplicate Merkle tree key {0}")]
    DuplicateKey(String),

    #[error("Key {0} not found in Merkle tree")]
    KeyNotFound(String),

    #[error("Invalid EdDSA public key")]
    InvalidPublicKey,
}

/// Errors from the proving engine
#[derive(Error, Debug)]
pub enum ProofError {
    #[error("Circuit constraint not satisfied: {0}")]
    ConstraintNotSatisfied(String),

    #[error("Proof generation failed: {0}")]
    GenerationFailed(String),

    #[error("Proof verification failed: {0}")]
    VerificationFailed(String),

    #[error("Invalid proving key: {0}")]
    InvalidProvingKey(String),

    #[error("Setup failed: {0}")]
    SetupFailed(String),

    #[error("Invalid circuit input {name}: {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("Expected {expected} public signals, engine returned {got}")]
    PublicSignalCount { expected: usize, got: usize },

    #[error("Public signal {index} mismatch: expected {expected}, engine returned {got}")]
    PublicSignalMismatch {
        index: usize,
        expected: String,
        got: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
