//! zkSNARK proof generation and verification
//!
//! Components:
//! - `circuit`: the membership circuit over BN254
//! - `gadgets`: R1CS constraint gadgets (Poseidon, Merkle)
//! - [`ProvingEngine`]: the seam the prover calls to turn circuit inputs into
//!   a proof, implemented here by [`Groth16Engine`]
//! - [`SnarkProof`]: the verifier-facing proof encoding

pub mod circuit;
pub mod gadgets;

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::{PrimeField, Zero};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use num_bigint::BigUint;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{CircuitArtifacts, PUBLIC_SIGNAL_COUNT};
use crate::error::ProofError;
use crate::field::Scalar;
use crate::inputs::CircuitInputs;

pub use circuit::MembershipCircuit;

/// Proof points as a proving engine emits them
///
/// `b` keeps the native `[[x.c0, x.c1], [y.c0, y.c1]]` coordinate order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPoints {
    pub a: [Scalar; 2],
    pub b: [[Scalar; 2]; 2],
    pub c: [Scalar; 2],
}

/// What a proving engine hands back
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOutput {
    pub proof: ProofPoints,
    pub public_signals: Vec<Scalar>,
}

/// Turns assembled circuit inputs into a proof
pub trait ProvingEngine: Send + Sync {
    fn full_prove(&self, inputs: &CircuitInputs) -> Result<EngineOutput, ProofError>;
}

fn base_to_scalar(value: &Fq) -> Scalar {
    Scalar::from_biguint(value.into_bigint().into())
}

fn scalar_to_base(value: &Scalar) -> Result<Fq, ProofError> {
    let modulus: BigUint = Fq::MODULUS.into();
    if *value.as_biguint() >= modulus {
        return Err(ProofError::SerializationError(format!(
            "{value} is not a base field element"
        )));
    }
    Ok(Fq::from(value.as_biguint().clone()))
}

fn g1_to_scalars(point: &G1Affine) -> [Scalar; 2] {
    [base_to_scalar(&point.x), base_to_scalar(&point.y)]
}

fn g1_from_scalars(coords: &[Scalar; 2]) -> Result<G1Affine, ProofError> {
    let x = scalar_to_base(&coords[0])?;
    let y = scalar_to_base(&coords[1])?;
    if x.is_zero() && y.is_zero() {
        return Ok(G1Affine::identity());
    }
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(ProofError::SerializationError("G1 point not on curve".into()));
    }
    Ok(point)
}

fn g2_from_scalars(coords: &[[Scalar; 2]; 2]) -> Result<G2Affine, ProofError> {
    let x = Fq2::new(scalar_to_base(&coords[0][0])?, scalar_to_base(&coords[0][1])?);
    let y = Fq2::new(scalar_to_base(&coords[1][0])?, scalar_to_base(&coords[1][1])?);
    if x.is_zero() && y.is_zero() {
        return Ok(G2Affine::identity());
    }
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(ProofError::SerializationError("G2 point not in subgroup".into()));
    }
    Ok(point)
}

impl From<&Proof<Bn254>> for ProofPoints {
    fn from(proof: &Proof<Bn254>) -> Self {
        Self {
            a: g1_to_scalars(&proof.a),
            b: [
                [base_to_scalar(&proof.b.x.c0), base_to_scalar(&proof.b.x.c1)],
                [base_to_scalar(&proof.b.y.c0), base_to_scalar(&proof.b.y.c1)],
            ],
            c: g1_to_scalars(&proof.c),
        }
    }
}

impl ProofPoints {
    pub fn to_ark(&self) -> Result<Proof<Bn254>, ProofError> {
        Ok(Proof {
            a: g1_from_scalars(&self.a)?,
            b: g2_from_scalars(&self.b)?,
            c: g1_from_scalars(&self.c)?,
        })
    }
}

/// Groth16 proof in the layout on-chain verifiers consume
///
/// `b` holds `[[x.c1, x.c0], [y.c1, y.c0]]`, the swapped order of the
/// precompile pairing input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnarkProof {
    pub a: [Scalar; 2],
    pub b: [[Scalar; 2]; 2],
    pub c: [Scalar; 2],
    pub input: [Scalar; PUBLIC_SIGNAL_COUNT],
}

impl SnarkProof {
    /// Size of [`SnarkProof::to_bytes`]: 8 proof words plus the public inputs
    pub const ENCODED_LEN: usize = (8 + PUBLIC_SIGNAL_COUNT) * 32;

    pub fn new(proof: ProofPoints, input: [Scalar; PUBLIC_SIGNAL_COUNT]) -> Self {
        let [[bx0, bx1], [by0, by1]] = proof.b;
        Self {
            a: proof.a,
            b: [[bx1, bx0], [by1, by0]],
            c: proof.c,
            input,
        }
    }

    pub fn public_signals(&self) -> &[Scalar] {
        &self.input
    }

    /// Undo the coordinate swap
    pub fn proof_points(&self) -> ProofPoints {
        let [[bx1, bx0], [by1, by0]] = self.b.clone();
        ProofPoints {
            a: self.a.clone(),
            b: [[bx0, bx1], [by0, by1]],
            c: self.c.clone(),
        }
    }

    /// ABI encoding of `(uint256[2], uint256[2][2], uint256[2], uint256[14])`
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProofError> {
        let words = self
            .a
            .iter()
            .chain(self.b.iter().flatten())
            .chain(self.c.iter())
            .chain(self.input.iter());

        let mut bytes = Vec::with_capacity(Self::ENCODED_LEN);
        for word in words {
            let encoded = word.to_be_bytes32().ok_or_else(|| {
                ProofError::SerializationError(format!("{word} does not fit in 32 bytes"))
            })?;
            bytes.extend_from_slice(&encoded);
        }
        Ok(bytes)
    }

    /// `0x`-prefixed hex of [`SnarkProof::to_bytes`]
    pub fn to_hex(&self) -> Result<String, ProofError> {
        Ok(format!("0x{}", hex::encode(self.to_bytes()?)))
    }
}

/// Run the circuit on a fresh constraint system and report the first
/// unsatisfied constraint
pub fn check_satisfied(circuit: &MembershipCircuit) -> Result<(), ProofError> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit
        .clone()
        .generate_constraints(cs.clone())
        .map_err(|e| ProofError::ConstraintNotSatisfied(e.to_string()))?;

    let satisfied = cs
        .is_satisfied()
        .map_err(|e| ProofError::ConstraintNotSatisfied(e.to_string()))?;
    if !satisfied {
        let which = cs
            .which_is_unsatisfied()
            .map_err(|e| ProofError::ConstraintNotSatisfied(e.to_string()))?
            .unwrap_or_else(|| "unknown constraint".to_string());
        return Err(ProofError::ConstraintNotSatisfied(which));
    }

    debug!(constraints = cs.num_constraints(), "circuit satisfied");
    Ok(())
}

/// Groth16 over BN254 for [`MembershipCircuit`]
pub struct Groth16Engine {
    proving_key: ProvingKey<Bn254>,
    prepared_vk: PreparedVerifyingKey<Bn254>,
}

impl Groth16Engine {
    /// Generate proving and verifying keys for the membership circuit
    ///
    /// WARNING: This uses random toxic waste and is suitable only for testing.
    /// Production keys come from a trusted setup ceremony.
    pub fn setup() -> Result<Self, ProofError> {
        let (pk, _vk) =
            Groth16::<Bn254>::circuit_specific_setup(MembershipCircuit::blank(), &mut OsRng)
                .map_err(|e| ProofError::SetupFailed(e.to_string()))?;

        info!("generated membership circuit keys");
        Self::from_proving_key(pk)
    }

    /// Load from a compressed proving key
    pub fn from_keys(pk_bytes: &[u8]) -> Result<Self, ProofError> {
        let proving_key = ProvingKey::deserialize_compressed(pk_bytes)
            .map_err(|e| ProofError::InvalidProvingKey(e.to_string()))?;
        Self::from_proving_key(proving_key)
    }

    /// Load the proving key named by the artifact paths
    pub fn load(artifacts: &CircuitArtifacts) -> Result<Self, ProofError> {
        debug!(
            proving_key = %artifacts.proving_key_path.display(),
            "loading proving key"
        );
        let bytes = std::fs::read(&artifacts.proving_key_path)?;
        Self::from_keys(&bytes)
    }

    fn from_proving_key(proving_key: ProvingKey<Bn254>) -> Result<Self, ProofError> {
        let prepared_vk = Groth16::<Bn254>::process_vk(&proving_key.vk)
            .map_err(|e| ProofError::SetupFailed(e.to_string()))?;
        Ok(Self {
            proving_key,
            prepared_vk,
        })
    }

    /// Serialize the proving key
    pub fn serialize_proving_key(&self) -> Result<Vec<u8>, ProofError> {
        let mut bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| ProofError::SerializationError(e.to_string()))?;
        Ok(bytes)
    }

    /// Get the verifying key
    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.proving_key.vk
    }

    /// Verify a proof against its public signals
    pub fn verify(&self, proof: &ProofPoints, public_signals: &[Scalar]) -> Result<bool, ProofError> {
        if public_signals.len() != PUBLIC_SIGNAL_COUNT {
            return Err(ProofError::PublicSignalCount {
                expected: PUBLIC_SIGNAL_COUNT,
                got: public_signals.len(),
            });
        }
        let inputs = public_signals
            .iter()
            .map(|s| {
                s.to_fr_checked().ok_or_else(|| {
                    ProofError::VerificationFailed(format!("{s} is not a field element"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Groth16::<Bn254>::verify_with_processed_vk(&self.prepared_vk, &inputs, &proof.to_ark()?)
            .map_err(|e| ProofError::VerificationFailed(e.to_string()))
    }
}

impl ProvingEngine for Groth16Engine {
    fn full_prove(&self, inputs: &CircuitInputs) -> Result<EngineOutput, ProofError> {
        let circuit = MembershipCircuit::from_inputs(inputs)?;
        check_satisfied(&circuit)?;

        let public_signals = circuit
            .public_inputs()
            .unwrap_or_default()
            .into_iter()
            .map(Scalar::from)
            .collect();

        let proof = Groth16::<Bn254>::prove(&self.proving_key, circuit, &mut OsRng)
            .map_err(|e| ProofError::GenerationFailed(e.to_string()))?;

        Ok(EngineOutput {
            proof: ProofPoints::from(&proof),
            public_signals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::AuthorityPublicKey;
    use crate::crypto::poseidon::Poseidon;
    use crate::inputs::{assemble, format_request};
    use crate::membership::MembershipWitness;
    use crate::request::{ProofRequest, VaultDescriptor};

    fn points() -> ProofPoints {
        let s = |v: u64| Scalar::from(v);
        ProofPoints {
            a: [s(1), s(2)],
            b: [[s(3), s(4)], [s(5), s(6)]],
            c: [s(7), s(8)],
        }
    }

    fn signals() -> [Scalar; PUBLIC_SIGNAL_COUNT] {
        std::array::from_fn(|i| Scalar::from(100 + i as u64))
    }

    #[test]
    fn test_snark_proof_swaps_b() {
        let proof = SnarkProof::new(points(), signals());
        assert_eq!(
            proof.b,
            [
                [Scalar::from(4u64), Scalar::from(3u64)],
                [Scalar::from(6u64), Scalar::from(5u64)]
            ]
        );
        assert_eq!(proof.proof_points(), points());
        assert_eq!(proof.public_signals().len(), PUBLIC_SIGNAL_COUNT);
    }

    #[test]
    fn test_snark_proof_abi_encoding() {
        let proof = SnarkProof::new(points(), signals());
        let bytes = proof.to_bytes().unwrap();
        assert_eq!(bytes.len(), SnarkProof::ENCODED_LEN);
        assert_eq!(bytes.len(), 22 * 32);

        // a.x, then b[0][0] which is the swapped x.c1
        assert_eq!(bytes[31], 1);
        assert_eq!(bytes[2 * 32 + 31], 4);
        assert_eq!(bytes[8 * 32 + 31], 100);
        assert!(bytes[..31].iter().all(|b| *b == 0));

        let hex = proof.to_hex().unwrap();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 2 + 2 * SnarkProof::ENCODED_LEN);
    }

    #[test]
    fn test_proof_points_reject_off_curve() {
        assert!(points().to_ark().is_err());
    }

    #[test]
    #[ignore = "runs a full Groth16 setup"]
    fn test_groth16_engine_round_trip() {
        let engine = Groth16Engine::setup().unwrap();
        let hasher = Poseidon::new();
        let request = ProofRequest {
            vault: Some(VaultDescriptor::new(Scalar::from(0x123456u64)).with_namespace(Scalar::from(123u64))),
            request_identifier: Some(Scalar::from(123u64)),
            ..Default::default()
        };
        let formatted = format_request(&hasher, &request).unwrap();
        let authority = AuthorityPublicKey::new(Scalar::from(1u64), Scalar::from(2u64));
        let inputs = assemble(&formatted, &MembershipWitness::empty(), &authority);

        let output = engine.full_prove(&inputs).unwrap();
        assert_eq!(output.public_signals, inputs.public.to_signals().to_vec());
        assert!(engine.verify(&output.proof, &output.public_signals).unwrap());

        let mut tampered = output.public_signals.clone();
        tampered[1] = Scalar::from(9u64);
        assert!(!engine.verify(&output.proof, &tampered).unwrap());

        let reloaded = Groth16Engine::from_keys(&engine.serialize_proving_key().unwrap()).unwrap();
        assert!(reloaded.verify(&output.proof, &output.public_signals).unwrap());
    }

    #[test]
    fn test_unsatisfied_assignment_reported() {
        let hasher = Poseidon::new();
        let formatted = format_request(&hasher, &ProofRequest::default()).unwrap();
        let authority = AuthorityPublicKey::new(Scalar::from(1u64), Scalar::from(2u64));
        let mut inputs = assemble(&formatted, &MembershipWitness::empty(), &authority);
        inputs.public.vault_identifier = Scalar::from(5u64);

        let circuit = MembershipCircuit::from_inputs(&inputs).unwrap();
        assert!(matches!(
            check_satisfied(&circuit),
            Err(ProofError::ConstraintNotSatisfied(_))
        ));
    }
}
