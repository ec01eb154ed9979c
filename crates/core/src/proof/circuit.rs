//! Membership circuit
//!
//! Public inputs are allocated in verifier order (see
//! [`PUBLIC_SIGNAL_NAMES`](crate::inputs::PUBLIC_SIGNAL_NAMES)). The circuit
//! enforces:
//!
//! - verification flags and the comparator are bits
//! - `vaultIdentifier` is `H(vaultSecret, vaultNamespace)`, or `0` without a namespace
//! - `proofIdentifier` is `H(secretHash, requestIdentifier)`, or `0` without a request
//! - vault accounts under verification satisfy `identifier == H(vaultSecret, namespace)`
//! - when `registryTreeRoot != 0`: both membership paths, `claimValue <= sourceValue`,
//!   and equality under the `EQ` comparator
//!
//! Commitment receipts are checked natively before proving and are not part
//! of the constraint system.

use std::cmp::Ordering;

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, boolean::Boolean, fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use super::gadgets::{MerklePathGadget, PoseidonGadget};
use crate::config::{ACCOUNTS_TREE_HEIGHT, PUBLIC_SIGNAL_COUNT, REGISTRY_TREE_HEIGHT};
use crate::crypto::merkle::MerklePath;
use crate::error::ProofError;
use crate::field::Scalar;
use crate::inputs::CircuitInputs;

/// Concrete values for every circuit variable
#[derive(Clone, Debug)]
struct Assignment {
    public: [Fr; PUBLIC_SIGNAL_COUNT],
    vault_secret: Fr,
    source_identifier: Fr,
    source_secret: Fr,
    source_vault_namespace: Fr,
    destination_vault_namespace: Fr,
    accounts_tree_root: Fr,
    source_value: Fr,
    account_path: MerklePath,
    registry_path: MerklePath,
}

/// Membership and identity statement over BN254
#[derive(Clone, Debug, Default)]
pub struct MembershipCircuit {
    assignment: Option<Assignment>,
}

fn field_input(name: &str, value: &Scalar) -> Result<Fr, ProofError> {
    value.to_fr_checked().ok_or_else(|| ProofError::InvalidInput {
        name: name.to_string(),
        reason: format!("{value} is not a field element"),
    })
}

fn path_input(
    name: &str,
    elements: &[Scalar],
    indices: &[bool],
    height: usize,
) -> Result<MerklePath, ProofError> {
    if elements.len() != height || indices.len() != height {
        return Err(ProofError::InvalidInput {
            name: name.to_string(),
            reason: format!(
                "expected {height} levels, got {} elements and {} indices",
                elements.len(),
                indices.len()
            ),
        });
    }
    let elements = elements
        .iter()
        .map(|e| field_input(name, e))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MerklePath {
        elements,
        indices: indices.to_vec(),
    })
}

impl MembershipCircuit {
    /// Shape-only circuit for key generation
    pub fn blank() -> Self {
        Self::default()
    }

    /// Assign a circuit from assembled inputs
    pub fn from_inputs(inputs: &CircuitInputs) -> Result<Self, ProofError> {
        let p = &inputs.private;
        let signals = inputs.public.to_signals();

        let mut public = [Fr::from(0u64); PUBLIC_SIGNAL_COUNT];
        for (slot, (name, value)) in public
            .iter_mut()
            .zip(crate::inputs::PUBLIC_SIGNAL_NAMES.iter().zip(signals.iter()))
        {
            *slot = field_input(name, value)?;
        }

        Ok(Self {
            assignment: Some(Assignment {
                public,
                vault_secret: field_input("vaultSecret", &p.vault_secret)?,
                source_identifier: field_input("sourceIdentifier", &p.source_identifier)?,
                source_secret: field_input("sourceSecret", &p.source_secret)?,
                source_vault_namespace: field_input(
                    "sourceVaultNamespace",
                    &p.source_vault_namespace,
                )?,
                destination_vault_namespace: field_input(
                    "destinationVaultNamespace",
                    &p.destination_vault_namespace,
                )?,
                accounts_tree_root: field_input("accountsTreeRoot", &p.accounts_tree_root)?,
                source_value: field_input("sourceValue", &p.source_value)?,
                account_path: path_input(
                    "accountMerklePath",
                    &p.account_merkle_path_elements,
                    &p.account_merkle_path_indices,
                    ACCOUNTS_TREE_HEIGHT,
                )?,
                registry_path: path_input(
                    "registryMerklePath",
                    &p.registry_merkle_path_elements,
                    &p.registry_merkle_path_indices,
                    REGISTRY_TREE_HEIGHT,
                )?,
            }),
        })
    }

    /// Public inputs in allocation order, if assigned
    pub fn public_inputs(&self) -> Option<Vec<Fr>> {
        self.assignment.as_ref().map(|a| a.public.to_vec())
    }
}

/// Constrain `var` to a bit and return it as a [`Boolean`]
fn bit(var: &FpVar<Fr>) -> Result<Boolean<Fr>, SynthesisError> {
    var.mul_equals(&(var - FpVar::one()), &FpVar::zero())?;
    var.is_eq(&FpVar::one())
}

impl ConstraintSynthesizer<Fr> for MembershipCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let a = self.assignment.as_ref();

        let public = (0..PUBLIC_SIGNAL_COUNT)
            .map(|i| {
                FpVar::new_input(cs.clone(), || {
                    a.map(|a| a.public[i])
                        .ok_or(SynthesisError::AssignmentMissing)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let [
            destination_identifier,
            _extra_data,
            _pubkey_x,
            _pubkey_y,
            registry_tree_root,
            request_identifier,
            proof_identifier,
            claim_value,
            accounts_tree_value,
            claim_comparator,
            vault_identifier,
            vault_namespace,
            source_verification_enabled,
            destination_verification_enabled,
        ] = <[FpVar<Fr>; PUBLIC_SIGNAL_COUNT]>::try_from(public)
            .map_err(|_| SynthesisError::Unsatisfiable)?;

        let witness = |value: fn(&Assignment) -> Fr| {
            FpVar::new_witness(cs.clone(), || {
                a.map(value).ok_or(SynthesisError::AssignmentMissing)
            })
        };
        let vault_secret = witness(|a| a.vault_secret)?;
        let source_identifier = witness(|a| a.source_identifier)?;
        let source_secret = witness(|a| a.source_secret)?;
        let source_vault_namespace = witness(|a| a.source_vault_namespace)?;
        let destination_vault_namespace = witness(|a| a.destination_vault_namespace)?;
        let accounts_tree_root = witness(|a| a.accounts_tree_root)?;
        let source_value = witness(|a| a.source_value)?;

        let account_path = MerklePathGadget::new_witness(
            cs.clone(),
            ACCOUNTS_TREE_HEIGHT,
            a.map(|a| &a.account_path),
        )?;
        let registry_path = MerklePathGadget::new_witness(
            cs.clone(),
            REGISTRY_TREE_HEIGHT,
            a.map(|a| &a.registry_path),
        )?;

        let poseidon = PoseidonGadget::new(cs.clone())?;
        let zero = FpVar::<Fr>::zero();
        let one = FpVar::<Fr>::one();

        let source_enabled = bit(&source_verification_enabled)?;
        let destination_enabled = bit(&destination_verification_enabled)?;
        let comparator_eq = bit(&claim_comparator)?;

        // Vault identifier
        let namespaced = poseidon.hash2(&vault_secret, &vault_namespace)?;
        vault_namespace
            .is_zero()?
            .select(&zero, &namespaced)?
            .enforce_equal(&vault_identifier)?;

        // Nullifier
        let source_is_committed = source_vault_namespace.is_zero()?;
        let committed_hash = poseidon.hash(&[source_secret.clone(), one.clone()])?;
        let vault_hash = poseidon.hash(&[source_secret, source_vault_namespace.clone(), one])?;
        let secret_hash = source_is_committed.select(&committed_hash, &vault_hash)?;
        let nullifier = poseidon.hash2(&secret_hash, &request_identifier)?;
        request_identifier
            .is_zero()?
            .select(&zero, &nullifier)?
            .enforce_equal(&proof_identifier)?;

        // Vault-derived accounts
        let source_binding = source_enabled.and(&source_is_committed.not())?;
        poseidon
            .hash2(&vault_secret, &source_vault_namespace)?
            .conditional_enforce_equal(&source_identifier, &source_binding)?;

        let destination_binding =
            destination_enabled.and(&destination_vault_namespace.is_zero()?.not())?;
        poseidon
            .hash2(&vault_secret, &destination_vault_namespace)?
            .conditional_enforce_equal(&destination_identifier, &destination_binding)?;

        // Membership and claim, only when a registry root is exposed
        let has_trees = registry_tree_root.is_zero()?.not();

        let account_leaf = poseidon.hash2(&source_identifier, &source_value)?;
        account_path.conditional_verify(&poseidon, &account_leaf, &accounts_tree_root, &has_trees)?;

        let registry_leaf = poseidon.hash2(&accounts_tree_root, &accounts_tree_value)?;
        registry_path.conditional_verify(
            &poseidon,
            &registry_leaf,
            &registry_tree_root,
            &has_trees,
        )?;

        let claimed = has_trees.select(&claim_value, &zero)?;
        let held = has_trees.select(&source_value, &zero)?;
        claimed.enforce_cmp(&held, Ordering::Less, true)?;

        claim_value.conditional_enforce_equal(&source_value, &has_trees.and(&comparator_eq)?)?;

        Ok(())
    }
}
