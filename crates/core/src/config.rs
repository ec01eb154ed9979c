//! Prover configuration and fixed circuit constants

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProverError, ProverResult};
use crate::field::Scalar;

/// Height of every accounts tree accepted by the circuit
pub const ACCOUNTS_TREE_HEIGHT: usize = 20;

/// Height of every registry tree accepted by the circuit
pub const REGISTRY_TREE_HEIGHT: usize = 20;

/// Number of public signals exposed to the verifier
pub const PUBLIC_SIGNAL_COUNT: usize = 14;

/// Number of scalars in a commitment receipt `(R.x, R.y, S)`
pub const COMMITMENT_RECEIPT_LEN: usize = 3;

/// Locations of the proving artifacts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitArtifacts {
    /// Compiled circuit, consumed by external witness generators
    pub circuit_path: PathBuf,
    /// Serialized Groth16 proving key
    pub proving_key_path: PathBuf,
}

/// Construction-time settings for a [`crate::Prover`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProverConfig {
    /// Commitment mapper EdDSA public key `[x, y]`
    pub commitment_mapper_pubkey: [Scalar; 2],
    pub artifacts: CircuitArtifacts,
}

impl ProverConfig {
    pub fn from_json(json: &str) -> ProverResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ProverError::Configuration(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ProverResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ProverError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    fn check(&self) -> ProverResult<()> {
        for coordinate in &self.commitment_mapper_pubkey {
            if coordinate.exceeds_field() {
                return Err(ProverError::Configuration(format!(
                    "commitment mapper public key coordinate {} overflows the snark field",
                    coordinate
                )));
            }
        }
        Ok(())
    }
}
