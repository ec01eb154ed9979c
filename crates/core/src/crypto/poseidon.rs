//! Poseidon Hash Function
//!
//! A zkSNARK-friendly hash over the BN254 scalar field, following the Poseidon
//! paper (https://eprint.iacr.org/2019/458). The state width adapts to the
//! number of inputs (t = inputs + 1, capacity element first), so `H(a, b)` and
//! `H(a, b, c)` are distinct permutations, as in circom-style Poseidon.

use ark_bn254::Fr;
use ark_ff::Field;

use super::poseidon_constants::{self, FULL_ROUNDS, MAX_WIDTH, MIN_WIDTH, PARTIAL_ROUNDS};
use crate::error::CryptoError;

/// Maximum number of inputs for a single hash call
pub const MAX_INPUTS: usize = MAX_WIDTH - 1;

/// The hash collaborator consumed by the derivation and tree code
pub trait FieldHasher: Send + Sync {
    /// Hash one to [`MAX_INPUTS`] field elements into one
    fn hash(&self, inputs: &[Fr]) -> Result<Fr, CryptoError>;
}

/// Poseidon parameters for a single state width
pub struct PoseidonParams {
    pub width: usize,
    pub round_constants: Vec<Fr>,
    pub mds_matrix: Vec<Vec<Fr>>,
}

impl PoseidonParams {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            round_constants: poseidon_constants::get_round_constants(width),
            mds_matrix: poseidon_constants::get_mds_matrix(width),
        }
    }
}

/// Poseidon hasher holding the parameters of every supported width
pub struct Poseidon {
    params: Vec<PoseidonParams>,
}

impl Default for Poseidon {
    fn default() -> Self {
        Self::new()
    }
}

impl Poseidon {
    pub fn new() -> Self {
        Self {
            params: (MIN_WIDTH..=MAX_WIDTH).map(PoseidonParams::new).collect(),
        }
    }

    /// Hash a variable number of field elements
    pub fn hash(&self, inputs: &[Fr]) -> Result<Fr, CryptoError> {
        if inputs.is_empty() {
            return Err(CryptoError::EmptyHashInput);
        }
        if inputs.len() > MAX_INPUTS {
            return Err(CryptoError::HashArity {
                max: MAX_INPUTS,
                got: inputs.len(),
            });
        }

        let params = &self.params[inputs.len() + 1 - MIN_WIDTH];

        let mut state = vec![Fr::from(0u64); params.width];
        state[1..].copy_from_slice(inputs);

        self.permute(params, &mut state);

        Ok(state[0])
    }

    fn permute(&self, params: &PoseidonParams, state: &mut [Fr]) {
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

impl FieldHasher for Poseidon {
    fn hash(&self, inputs: &[Fr]) -> Result<Fr, CryptoError> {
        Poseidon::hash(self, inputs)
    }
}

/// Full round: S-box on all elements, then MDS
fn full_round(params: &PoseidonParams, state: &mut [Fr], round_ctr: usize) {
    for (i, elem) in state.iter_mut().enumerate() {
        *elem += params.round_constants[round_ctr + i];
        *elem = sbox(*elem);
    }
    mds_multiply(params, state);
}

/// Partial round: S-box on the first element only, then MDS
fn partial_round(params: &PoseidonParams, state: &mut [Fr], round_ctr: usize) {
    for (i, elem) in state.iter_mut().enumerate() {
        *elem += params.round_constants[round_ctr + i];
    }
    state[0] = sbox(state[0]);
    mds_multiply(params, state);
}

fn mds_multiply(params: &PoseidonParams, state: &mut [Fr]) {
    let new_state: Vec<Fr> = params
        .mds_matrix
        .iter()
        .map(|row| row.iter().zip(state.iter()).map(|(m, s)| *m * s).sum())
        .collect();
    state.copy_from_slice(&new_state);
}

/// S-box function: x^5
#[inline]
fn sbox(x: Fr) -> Fr {
    let x2 = x.square();
    let x4 = x2.square();
    x4 * x
}
