//! Field arithmetic adapter
//!
//! Every scalar entering the pipeline (hex strings, decimal strings, native
//! integers, field elements) is normalized into a [`Scalar`]: an
//! arbitrary-precision non-negative integer. Scalars are NOT reduced, so a
//! value above the BN254 scalar modulus stays observable until the overflow
//! checks run.

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use ark_ff::PrimeField;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Num, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ProverError, ProverResult};

/// Canonical non-negative integer representation of a scalar input
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scalar(BigUint);

/// The BN254 scalar field modulus
pub fn field_modulus() -> BigUint {
    BigUint::from(Fr::MODULUS)
}

/// Parse a hex (`0x`-prefixed) or decimal string into a [`Scalar`]
pub fn normalize(raw: &str) -> ProverResult<Scalar> {
    let value = normalize_signed(raw)?;
    match value.to_biguint() {
        Some(unsigned) => Ok(Scalar(unsigned)),
        None => Err(malformed(raw, "negative values are not scalars")),
    }
}

/// Parse a hex or decimal string that may carry a leading minus sign
///
/// Only claim values are allowed to be negative at parse time; the
/// validation pipeline rejects them later with a dedicated error.
pub fn normalize_signed(raw: &str) -> ProverResult<BigInt> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let magnitude = if let Some(hex_digits) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        if hex_digits.is_empty() || !hex_digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(malformed(raw, "invalid hex digits"));
        }
        BigUint::from_str_radix(hex_digits, 16).map_err(|e| malformed(raw, &e.to_string()))?
    } else {
        if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed(raw, "invalid decimal digits"));
        }
        BigUint::from_str_radix(body, 10).map_err(|e| malformed(raw, &e.to_string()))?
    };

    let sign = if negative && !magnitude.is_zero() {
        Sign::Minus
    } else {
        Sign::Plus
    };
    Ok(BigInt::from_biguint(sign, magnitude))
}

/// True when `value` is not strictly below the field modulus
pub fn exceeds_field(value: &Scalar) -> bool {
    value.0 >= field_modulus()
}

/// Map a signed integer onto its field representative in `[0, p)`
pub fn signed_to_field(value: &BigInt) -> Scalar {
    let modulus = BigInt::from_biguint(Sign::Plus, field_modulus());
    let reduced = ((value % &modulus) + &modulus) % &modulus;
    Scalar(reduced.magnitude().clone())
}

fn malformed(raw: &str, reason: &str) -> ProverError {
    ProverError::MalformedScalar {
        value: raw.to_string(),
        reason: reason.to_string(),
    }
}

impl Scalar {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn from_biguint(value: BigUint) -> Self {
        Self(value)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Convert to a signed integer for comparisons against claim values
    pub fn to_bigint(&self) -> BigInt {
        BigInt::from_biguint(Sign::Plus, self.0.clone())
    }

    /// Map into the scalar field, reducing modulo the field order
    ///
    /// This mirrors how the hash collaborator treats out-of-range inputs.
    pub fn to_fr(&self) -> Fr {
        Fr::from(self.0.clone())
    }

    /// Map into the scalar field, refusing values at or above the modulus
    pub fn to_fr_checked(&self) -> Option<Fr> {
        if exceeds_field(self) {
            None
        } else {
            Some(self.to_fr())
        }
    }

    pub fn exceeds_field(&self) -> bool {
        exceeds_field(self)
    }

    /// Number of bytes in the minimal big-endian encoding (zero encodes as one byte)
    pub fn byte_len(&self) -> usize {
        self.0.to_bytes_be().len()
    }

    /// Minimal even-length `0x`-prefixed lowercase hex (zero is `0x00`)
    pub fn to_hex_string(&self) -> String {
        format!("0x{}", hex::encode(self.0.to_bytes_be()))
    }

    /// Big-endian 32-byte word, `None` if the value does not fit in 256 bits
    pub fn to_be_bytes32(&self) -> Option<[u8; 32]> {
        let bytes = self.0.to_bytes_be();
        if bytes.len() > 32 {
            return None;
        }
        let mut word = [0u8; 32];
        word[32 - bytes.len()..].copy_from_slice(&bytes);
        Some(word)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u128> for Scalar {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::from(u64::from(value))
    }
}

impl From<BigUint> for Scalar {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl From<Fr> for Scalar {
    fn from(value: Fr) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<&Fr> for Scalar {
    fn from(value: &Fr) -> Self {
        Self(BigUint::from(*value))
    }
}

impl FromStr for Scalar {
    type Err = ProverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawScalar {
            Text(String),
            Int(u64),
        }

        match RawScalar::deserialize(deserializer)? {
            RawScalar::Text(text) => normalize(&text).map_err(serde::de::Error::custom),
            RawScalar::Int(value) => Ok(Scalar::from(value)),
        }
    }
}
