//! Identifier and nullifier derivations
//!
//! All three derivations hash through the [`FieldHasher`] collaborator. Two of
//! them deliberately collapse to `0`: a vault without a namespace has no vault
//! identifier, and a proof without a request identifier has no nullifier.

use crate::crypto::poseidon::FieldHasher;
use crate::error::CryptoError;
use crate::field::Scalar;
use crate::identity::Account;

/// Domain separator appended to secret hashes
const SECRET_HASH_DOMAIN: u64 = 1;

/// `H(secret, namespace)`, the identifier a vault exposes in a namespace
pub fn namespaced_identifier(
    hasher: &dyn FieldHasher,
    secret: &Scalar,
    namespace: &Scalar,
) -> Result<Scalar, CryptoError> {
    Ok(hasher.hash(&[secret.to_fr(), namespace.to_fr()])?.into())
}

/// Public vault identifier, `0` when the namespace is `0`
pub fn vault_identifier(
    hasher: &dyn FieldHasher,
    secret: &Scalar,
    namespace: &Scalar,
) -> Result<Scalar, CryptoError> {
    if namespace.is_zero() {
        return Ok(Scalar::zero());
    }
    namespaced_identifier(hasher, secret, namespace)
}

/// Secret hash of the source account
///
/// `H(secret, 1)` for a committed account, `H(secret, namespace, 1)` for a
/// vault-derived one. A missing source hashes a zero secret.
pub fn secret_hash(hasher: &dyn FieldHasher, source: Option<&Account>) -> Result<Scalar, CryptoError> {
    let domain = Scalar::from(SECRET_HASH_DOMAIN).to_fr();
    let hash = match source {
        Some(Account::Vault(account)) => {
            hasher.hash(&[account.secret.to_fr(), account.namespace.to_fr(), domain])?
        }
        Some(Account::Committed(account)) => hasher.hash(&[account.secret.to_fr(), domain])?,
        None => hasher.hash(&[Scalar::zero().to_fr(), domain])?,
    };
    Ok(hash.into())
}

/// Per-request nullifier, `0` when the request identifier is `0`
pub fn proof_identifier(
    hasher: &dyn FieldHasher,
    secret_hash: &Scalar,
    request_identifier: &Scalar,
) -> Result<Scalar, CryptoError> {
    if request_identifier.is_zero() {
        return Ok(Scalar::zero());
    }
    Ok(hasher
        .hash(&[secret_hash.to_fr(), request_identifier.to_fr()])?
        .into())
}
