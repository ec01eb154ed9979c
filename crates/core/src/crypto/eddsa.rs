//! EdDSA over Baby JubJub with Poseidon challenges
//!
//! Signatures are `(R, S)` with `R = r·G` and `S = r + h·sk`, where
//! `h = H(R.x, R.y, A.x, A.y, msg)` and `A = sk·G`. Curve coordinates live in
//! the BN254 scalar field, so every signature component is a circuit-native
//! field element.

use ark_bn254::Fr;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ed_on_bn254::{EdwardsAffine, Fr as SubgroupScalar};
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;

use super::poseidon::FieldHasher;
use crate::error::CryptoError;

/// An EdDSA public key point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey {
    pub x: Fr,
    pub y: Fr,
}

impl PublicKey {
    fn to_point(self) -> Result<EdwardsAffine, CryptoError> {
        let point = EdwardsAffine::new_unchecked(self.x, self.y);
        if point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve() {
            Ok(point)
        } else {
            Err(CryptoError::InvalidPublicKey)
        }
    }
}

/// A raw EdDSA signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub r8_x: Fr,
    pub r8_y: Fr,
    /// Integer form so out-of-range values survive until verification
    pub s: BigUint,
}

/// Order of the prime subgroup generated by the base point
pub fn subgroup_order() -> BigUint {
    BigUint::from(SubgroupScalar::MODULUS)
}

fn challenge(
    hasher: &dyn FieldHasher,
    r: &EdwardsAffine,
    a: &EdwardsAffine,
    msg: &Fr,
) -> Result<Fr, CryptoError> {
    hasher.hash(&[r.x, r.y, a.x, a.y, *msg])
}

fn to_subgroup_scalar(value: &Fr) -> SubgroupScalar {
    SubgroupScalar::from_le_bytes_mod_order(&value.into_bigint().to_bytes_le())
}

/// Signing key derived deterministically from a seed
#[derive(Clone)]
pub struct SigningKey {
    secret: SubgroupScalar,
    public: EdwardsAffine,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"vault_prover_eddsa_signing_key");
        hasher.update(seed);
        let secret = SubgroupScalar::from_le_bytes_mod_order(hasher.finalize().as_bytes());
        let public = EdwardsAffine::generator()
            .mul_bigint(secret.into_bigint())
            .into_affine();
        Self { secret, public }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            x: self.public.x,
            y: self.public.y,
        }
    }

    /// Sign a single field element
    pub fn sign(&self, hasher: &dyn FieldHasher, msg: &Fr) -> Result<Signature, CryptoError> {
        let mut nonce = blake3::Hasher::new();
        nonce.update(&self.secret.into_bigint().to_bytes_le());
        nonce.update(&msg.into_bigint().to_bytes_le());
        let r = SubgroupScalar::from_le_bytes_mod_order(nonce.finalize().as_bytes());

        let r_point = EdwardsAffine::generator().mul_bigint(r.into_bigint()).into_affine();
        let h = challenge(hasher, &r_point, &self.public, msg)?;
        let s = r + to_subgroup_scalar(&h) * self.secret;

        Ok(Signature {
            r8_x: r_point.x,
            r8_y: r_point.y,
            s: BigUint::from(s.into_bigint()),
        })
    }
}

/// Verify `signature` over `msg` against `public_key`
///
/// Rejects a public key off the curve, an `S` at or above the subgroup order
/// and an `R` outside the prime subgroup.
pub fn verify(
    hasher: &dyn FieldHasher,
    public_key: &PublicKey,
    msg: &Fr,
    signature: &Signature,
) -> Result<bool, CryptoError> {
    let a = public_key.to_point()?;

    if signature.s >= subgroup_order() {
        return Ok(false);
    }

    let r = EdwardsAffine::new_unchecked(signature.r8_x, signature.r8_y);
    if !r.is_on_curve() || !r.is_in_correct_subgroup_assuming_on_curve() {
        return Ok(false);
    }

    let s = SubgroupScalar::from(signature.s.clone());
    let h = challenge(hasher, &r, &a, msg)?;

    let lhs = EdwardsAffine::generator().mul_bigint(s.into_bigint());
    let rhs = r.into_group() + a.mul_bigint(h.into_bigint());

    Ok(lhs == rhs)
}
