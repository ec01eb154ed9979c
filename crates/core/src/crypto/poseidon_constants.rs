//! Poseidon constants for the BN254 scalar field
//!
//! Constants are derived deterministically per state width from a
//! blake3-seeded stream, so the native hasher and the circuit gadget always
//! agree. Deployments that must match an external circuit replace these with
//! that circuit's constants.
//!
//! Parameters:
//! - Field: BN254 scalar field (Fr)
//! - Width: t = arity + 1, for arity 1..=5
//! - Full rounds: RF = 8 (4 at start, 4 at end)
//! - Partial rounds: RP = 57
//! - S-box: x^5

use ark_bn254::Fr;
use ark_ff::{Field, PrimeField};

/// Number of full rounds (RF = 8)
pub const FULL_ROUNDS: usize = 8;

/// Number of partial rounds (RP = 57)
pub const PARTIAL_ROUNDS: usize = 57;

/// Smallest supported state width (one input)
pub const MIN_WIDTH: usize = 2;

/// Largest supported state width (five inputs)
pub const MAX_WIDTH: usize = 6;

/// Total number of round constants for a given width
pub const fn num_constants(width: usize) -> usize {
    width * (FULL_ROUNDS + PARTIAL_ROUNDS)
}

/// Generate the round constants for a state of `width` elements
pub fn get_round_constants(width: usize) -> Vec<Fr> {
    let count = num_constants(width);
    let mut constants = Vec::with_capacity(count);

    let domain = format!("Poseidon_BN254_t{}_RF{}_RP{}", width, FULL_ROUNDS, PARTIAL_ROUNDS);

    for i in 0..count {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        hasher.update(&(i as u64).to_le_bytes());
        hasher.update(b"round_constant");

        let hash = hasher.finalize();
        constants.push(Fr::from_le_bytes_mod_order(hash.as_bytes()));
    }

    constants
}

/// Cauchy MDS matrix for a state of `width` elements
///
/// M[i][j] = 1 / (x[i] + y[j]) with x = [0, 1, ..], y = [width, width + 1, ..]
pub fn get_mds_matrix(width: usize) -> Vec<Vec<Fr>> {
    let mut matrix = vec![vec![Fr::from(0u64); width]; width];

    let x: Vec<Fr> = (0..width).map(|i| Fr::from(i as u64)).collect();
    let y: Vec<Fr> = (width..(2 * width)).map(|i| Fr::from(i as u64)).collect();

    for i in 0..width {
        for j in 0..width {
            let sum = x[i] + y[j];
            matrix[i][j] = sum.inverse().unwrap_or(Fr::from(1u64));
        }
    }

    matrix
}
