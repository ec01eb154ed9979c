//! Commitment receipts
//!
//! The commitment mapper binds an external identity to a vault by signing
//! `H(identifier, H(vaultSecret, accountSecret))`. The receipt is the EdDSA
//! signature `(R.x, R.y, S)`.

mod mapper;

pub use mapper::CommitmentMapper;

use std::sync::Arc;

use ark_bn254::Fr;
use tracing::debug;

use crate::crypto::eddsa::{self, PublicKey, Signature};
use crate::crypto::poseidon::{FieldHasher, Poseidon};
use crate::error::CryptoError;
use crate::field::Scalar;
use crate::identity::CommitmentReceipt;

/// Public key of the commitment mapper
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorityPublicKey {
    pub x: Scalar,
    pub y: Scalar,
}

impl AuthorityPublicKey {
    pub fn new(x: Scalar, y: Scalar) -> Self {
        Self { x, y }
    }

    /// The two public-signal coordinates `[x, y]`
    pub fn coordinates(&self) -> [Scalar; 2] {
        [self.x.clone(), self.y.clone()]
    }
}

impl From<[Scalar; 2]> for AuthorityPublicKey {
    fn from([x, y]: [Scalar; 2]) -> Self {
        Self { x, y }
    }
}

impl From<PublicKey> for AuthorityPublicKey {
    fn from(key: PublicKey) -> Self {
        Self {
            x: key.x.into(),
            y: key.y.into(),
        }
    }
}

/// Checks that a receipt attests an identity/secret pair
pub trait CommitmentVerifier: Send + Sync {
    fn verify_commitment(
        &self,
        identifier: &Scalar,
        vault_secret: &Scalar,
        account_secret: &Scalar,
        receipt: &CommitmentReceipt,
        authority: &AuthorityPublicKey,
    ) -> bool;
}

/// Message signed by the commitment mapper
pub fn commitment_message(
    hasher: &dyn FieldHasher,
    identifier: &Scalar,
    vault_secret: &Scalar,
    account_secret: &Scalar,
) -> Result<Fr, CryptoError> {
    let commitment = hasher.hash(&[vault_secret.to_fr(), account_secret.to_fr()])?;
    hasher.hash(&[identifier.to_fr(), commitment])
}

/// EdDSA (Baby JubJub, Poseidon) receipt verification
pub struct EddsaCommitmentVerifier {
    hasher: Arc<dyn FieldHasher>,
}

impl Default for EddsaCommitmentVerifier {
    fn default() -> Self {
        Self::new(Arc::new(Poseidon::new()))
    }
}

impl EddsaCommitmentVerifier {
    pub fn new(hasher: Arc<dyn FieldHasher>) -> Self {
        Self { hasher }
    }
}

impl CommitmentVerifier for EddsaCommitmentVerifier {
    fn verify_commitment(
        &self,
        identifier: &Scalar,
        vault_secret: &Scalar,
        account_secret: &Scalar,
        receipt: &CommitmentReceipt,
        authority: &AuthorityPublicKey,
    ) -> bool {
        let (Some(pk_x), Some(pk_y)) = (authority.x.to_fr_checked(), authority.y.to_fr_checked())
        else {
            return false;
        };
        let (Some(r8_x), Some(r8_y)) = (receipt[0].to_fr_checked(), receipt[1].to_fr_checked())
        else {
            return false;
        };

        let hasher = self.hasher.as_ref();
        let msg = match commitment_message(hasher, identifier, vault_secret, account_secret) {
            Ok(msg) => msg,
            Err(_) => return false,
        };

        let signature = Signature {
            r8_x,
            r8_y,
            s: receipt[2].as_biguint().clone(),
        };
        let public_key = PublicKey { x: pk_x, y: pk_y };

        match eddsa::verify(hasher, &public_key, &msg, &signature) {
            Ok(valid) => valid,
            Err(e) => {
                debug!(error = %e, "commitment mapper key rejected");
                false
            }
        }
    }
}
