//! Issuer side of commitment receipts

use std::sync::Arc;

use crate::crypto::eddsa::SigningKey;
use crate::crypto::poseidon::{FieldHasher, Poseidon};
use crate::error::CryptoError;
use crate::field::Scalar;
use crate::identity::CommitmentReceipt;

use super::{commitment_message, AuthorityPublicKey};

/// A commitment mapper holding an EdDSA signing key
pub struct CommitmentMapper {
    key: SigningKey,
    hasher: Arc<dyn FieldHasher>,
}

impl CommitmentMapper {
    pub fn from_seed(seed: &[u8]) -> Self {
        Self::with_hasher(seed, Arc::new(Poseidon::new()))
    }

    pub fn with_hasher(seed: &[u8], hasher: Arc<dyn FieldHasher>) -> Self {
        Self {
            key: SigningKey::from_seed(seed),
            hasher,
        }
    }

    pub fn public_key(&self) -> AuthorityPublicKey {
        self.key.public_key().into()
    }

    /// Sign `H(identifier, commitment)` for an already computed commitment
    pub fn commit(
        &self,
        identifier: &Scalar,
        commitment: &Scalar,
    ) -> Result<CommitmentReceipt, CryptoError> {
        let msg = self
            .hasher
            .hash(&[identifier.to_fr(), commitment.to_fr()])?;
        self.sign(&msg)
    }

    /// Commit the pair `(vault_secret, account_secret)` for `identifier`
    pub fn commit_account(
        &self,
        identifier: &Scalar,
        vault_secret: &Scalar,
        account_secret: &Scalar,
    ) -> Result<CommitmentReceipt, CryptoError> {
        let msg = commitment_message(
            self.hasher.as_ref(),
            identifier,
            vault_secret,
            account_secret,
        )?;
        self.sign(&msg)
    }

    fn sign(&self, msg: &ark_bn254::Fr) -> Result<CommitmentReceipt, CryptoError> {
        let signature = self.key.sign(self.hasher.as_ref(), msg)?;
        Ok([
            signature.r8_x.into(),
            signature.r8_y.into(),
            Scalar::from_biguint(signature.s),
        ])
    }
}
