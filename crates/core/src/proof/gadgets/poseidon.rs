//! Poseidon Hash Gadget for R1CS circuits
//!
//! Mirrors `crypto::poseidon` constraint for constraint: one permutation per
//! call, state width chosen by the number of inputs.

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::crypto::poseidon_constants::{
    get_mds_matrix, get_round_constants, FULL_ROUNDS, MAX_WIDTH, MIN_WIDTH, PARTIAL_ROUNDS,
};

struct WidthConstants {
    width: usize,
    round_constants: Vec<FpVar<Fr>>,
    mds_matrix: Vec<Vec<FpVar<Fr>>>,
}

impl WidthConstants {
    fn new(cs: ConstraintSystemRef<Fr>, width: usize) -> Result<Self, SynthesisError> {
        let round_constants = get_round_constants(width)
            .into_iter()
            .map(|c| FpVar::new_constant(cs.clone(), c))
            .collect::<Result<Vec<_>, _>>()?;

        let mds_matrix = get_mds_matrix(width)
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|c| FpVar::new_constant(cs.clone(), c))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            width,
            round_constants,
            mds_matrix,
        })
    }
}

/// Poseidon hash gadget for circuits
pub struct PoseidonGadget {
    constants: Vec<WidthConstants>,
}

impl PoseidonGadget {
    /// Create a new Poseidon gadget holding the constants of every width
    pub fn new(cs: ConstraintSystemRef<Fr>) -> Result<Self, SynthesisError> {
        let constants = (MIN_WIDTH..=MAX_WIDTH)
            .map(|width| WidthConstants::new(cs.clone(), width))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { constants })
    }

    /// Hash two field elements
    pub fn hash2(&self, a: &FpVar<Fr>, b: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
        self.hash(&[a.clone(), b.clone()])
    }

    /// Hash one to five field elements
    pub fn hash(&self, inputs: &[FpVar<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
        if inputs.is_empty() {
            return Err(SynthesisError::AssignmentMissing);
        }
        if inputs.len() >= MAX_WIDTH {
            return Err(SynthesisError::Unsatisfiable);
        }

        let params = &self.constants[inputs.len() + 1 - MIN_WIDTH];

        // Capacity element first, then the inputs
        let mut state = Vec::with_capacity(params.width);
        state.push(FpVar::zero());
        state.extend(inputs.iter().cloned());

        self.permute(params, &mut state);

        Ok(state[0].clone())
    }

    fn permute(&self, params: &WidthConstants, state: &mut [FpVar<Fr>]) {
        let t = params.width;
        let mut round_ctr = 0;

        for _ in 0..(FULL_ROUNDS / 2) {
            full_round(params, state, round_ctr);
            round_ctr += t;
        }

        for _ in 0..PARTIAL_ROUNDS {
            partial_round(params, state, round_ctr);
            round_ctr += t;
        }

        for _ in 0..(FULL_ROUNDS / 2) {
            full_round(params, state, round_ctr);
            round_ctr += t;
        }
    }
}

/// Full round: S-box on all elements, then MDS
fn full_round(params: &WidthConstants, state: &mut [FpVar<Fr>], round_ctr: usize) {
    for (i, elem) in state.iter_mut().enumerate() {
        *elem = sbox(&(&*elem + &params.round_constants[round_ctr + i]));
    }
    mds_multiply(params, state);
}

/// Partial round: S-box on the first element only, then MDS
fn partial_round(params: &WidthConstants, state: &mut [FpVar<Fr>], round_ctr: usize) {
    for (i, elem) in state.iter_mut().enumerate() {
        *elem = &*elem + &params.round_constants[round_ctr + i];
    }
    state[0] = sbox(&state[0]);
    mds_multiply(params, state);
}

/// S-box function: x^5
fn sbox(x: &FpVar<Fr>) -> FpVar<Fr> {
    let x2 = x * x;
    let x4 = &x2 * &x2;
    &x4 * x
}

fn mds_multiply(params: &WidthConstants, state: &mut [FpVar<Fr>]) {
    let new_state: Vec<FpVar<Fr>> = params
        .mds_matrix
        .iter()
        .map(|row| {
            row.iter()
                .zip(state.iter())
                .fold(FpVar::zero(), |sum, (m, s)| sum + m * s)
        })
        .collect();

    for (slot, value) in state.iter_mut().zip(new_state) {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::poseidon::Poseidon;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_poseidon_gadget_matches_native() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let gadget = PoseidonGadget::new(cs.clone()).unwrap();

        for arity in 1..MAX_WIDTH {
            let values: Vec<Fr> = (1..=arity as u64).map(Fr::from).collect();
            let vars: Vec<FpVar<Fr>> = values
                .iter()
                .map(|v| FpVar::new_witness(cs.clone(), || Ok(*v)).unwrap())
                .collect();

            let result = gadget.hash(&vars).unwrap();
            assert_eq!(result.value().unwrap(), Poseidon::new().hash(&values).unwrap());
        }

        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_poseidon_gadget_arity_bounds() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let gadget = PoseidonGadget::new(cs.clone()).unwrap();
        let one = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1u64))).unwrap();

        assert!(gadget.hash(&[]).is_err());
        assert!(gadget.hash(&vec![one; MAX_WIDTH]).is_err());
    }

    #[test]
    fn test_poseidon_gadget_constraint_count() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let gadget = PoseidonGadget::new(cs.clone()).unwrap();

        let a = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1u64))).unwrap();
        let b = FpVar::new_witness(cs.clone(), || Ok(Fr::from(2u64))).unwrap();
        gadget.hash2(&a, &b).unwrap();

        println!("Constraint count: {}", cs.num_constraints());
        assert!(cs.num_constraints() > 0);
        assert!(cs.is_satisfied().unwrap());
    }
}
