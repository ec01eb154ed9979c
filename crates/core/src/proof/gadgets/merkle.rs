//! Merkle path verification gadget
//!
//! Walks a fixed-height authentication path with the same orientation as
//! [`MerklePath::compute_root`]: a set index bit places the running node on
//! the right.

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, boolean::Boolean, fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use super::poseidon::PoseidonGadget;
use crate::crypto::merkle::MerklePath;

/// Merkle path gadget
pub struct MerklePathGadget {
    /// Sibling hashes along the path
    pub siblings: Vec<FpVar<Fr>>,
    /// Path indices (true = running node is the right child)
    pub indices: Vec<Boolean<Fr>>,
}

impl MerklePathGadget {
    /// Allocate a path of `height` levels as witnesses
    ///
    /// `path` is `None` during key generation; values are only read when the
    /// constraint system asks for them.
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        height: usize,
        path: Option<&MerklePath>,
    ) -> Result<Self, SynthesisError> {
        if let Some(path) = path {
            if path.elements.len() != height || path.indices.len() != height {
                return Err(SynthesisError::Unsatisfiable);
            }
        }

        let mut siblings = Vec::with_capacity(height);
        let mut indices = Vec::with_capacity(height);

        for level in 0..height {
            siblings.push(FpVar::new_witness(cs.clone(), || {
                path.map(|p| p.elements[level])
                    .ok_or(SynthesisError::AssignmentMissing)
            })?);
            indices.push(Boolean::new_witness(cs.clone(), || {
                path.map(|p| p.indices[level])
                    .ok_or(SynthesisError::AssignmentMissing)
            })?);
        }

        Ok(Self { siblings, indices })
    }

    pub fn height(&self) -> usize {
        self.siblings.len()
    }

    /// Compute the root reached from `leaf`
    pub fn compute_root(
        &self,
        poseidon: &PoseidonGadget,
        leaf: &FpVar<Fr>,
    ) -> Result<FpVar<Fr>, SynthesisError> {
        let mut current = leaf.clone();

        for (sibling, is_right) in self.siblings.iter().zip(self.indices.iter()) {
            let left = is_right.select(sibling, &current)?;
            let right = is_right.select(&current, sibling)?;
            current = poseidon.hash2(&left, &right)?;
        }

        Ok(current)
    }

    /// Enforce that `leaf` hashes up to `root` whenever `should_enforce` holds
    pub fn conditional_verify(
        &self,
        poseidon: &PoseidonGadget,
        leaf: &FpVar<Fr>,
        root: &FpVar<Fr>,
        should_enforce: &Boolean<Fr>,
    ) -> Result<(), SynthesisError> {
        let computed_root = self.compute_root(poseidon, leaf)?;
        computed_root.conditional_enforce_equal(root, should_enforce)
    }
}
