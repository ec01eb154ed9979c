//! Poseidon-based key/value Merkle tree
//!
//! Each entry `(key, value)` occupies the leaf at its insertion index and
//! hashes to `H(key, value)`. Empty leaves are `0` and internal nodes are
//! `H(left, right)`, so untouched subtrees collapse onto precomputed zero
//! hashes and only populated nodes are stored.
//!
//! Keys are hex strings. Lookups match the key text exactly (after
//! lowercasing), so callers must format keys the same way the tree was built.

use std::collections::HashMap;
use std::fmt;

use ark_bn254::Fr;

use super::poseidon::FieldHasher;
use crate::error::{CryptoError, ProverError, ProverResult};
use crate::field::{normalize, Scalar};
use crate::membership::MembershipTree;

/// Upper bound on tree height, keeps leaf indices inside a `u64`
pub const MAX_TREE_HEIGHT: usize = 63;

/// Canonical key of a [`KvMerkleTree`] entry
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeKey(String);

impl TreeKey {
    /// Parse a `0x`-prefixed hex key, keeping its width
    pub fn new(raw: &str) -> ProverResult<Self> {
        let text = raw.trim().to_ascii_lowercase();
        if !text.starts_with("0x") {
            return Err(ProverError::MalformedScalar {
                value: raw.to_string(),
                reason: "tree keys must be 0x-prefixed hex".to_string(),
            });
        }
        normalize(&text)?;
        Ok(Self(text))
    }

    /// Minimal even-length hex key for a scalar (zero is `0x00`)
    pub fn from_scalar(value: &Scalar) -> Self {
        Self(value.to_hex_string())
    }

    /// Wrap text already in canonical lowercase `0x` hex form
    pub(crate) fn from_canonical(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key as a scalar, as it enters the leaf hash
    pub fn to_scalar(&self) -> Scalar {
        // Validated hex by construction
        normalize(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for TreeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Merkle path (proof) for a leaf
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    /// Sibling hashes from leaf to root
    pub elements: Vec<Fr>,
    /// Path indices (false = left, true = right)
    pub indices: Vec<bool>,
}

impl MerklePath {
    /// Placeholder path of `height` zero siblings, all on the left
    pub fn empty(height: usize) -> Self {
        Self {
            elements: vec![Fr::from(0u64); height],
            indices: vec![false; height],
        }
    }

    pub fn height(&self) -> usize {
        self.elements.len()
    }

    /// Recompute the root from `leaf` along this path
    pub fn compute_root(&self, hasher: &dyn FieldHasher, leaf: &Fr) -> Result<Fr, CryptoError> {
        let mut current = *leaf;

        for (sibling, &is_right) in self.elements.iter().zip(self.indices.iter()) {
            current = if is_right {
                hasher.hash(&[*sibling, current])?
            } else {
                hasher.hash(&[current, *sibling])?
            };
        }

        Ok(current)
    }

    /// Verify the path leads to the expected root
    pub fn verify(&self, hasher: &dyn FieldHasher, leaf: &Fr, expected_root: &Fr) -> bool {
        if self.elements.len() != self.indices.len() {
            return false;
        }
        matches!(self.compute_root(hasher, leaf), Ok(root) if root == *expected_root)
    }
}

/// Precomputed zero hashes for each level
/// zeros[0] = 0 (empty leaf)
/// zeros[i] = H(zeros[i-1], zeros[i-1])
fn compute_zero_hashes(hasher: &dyn FieldHasher, height: usize) -> Result<Vec<Fr>, CryptoError> {
    let mut zeros = Vec::with_capacity(height + 1);
    zeros.push(Fr::from(0u64));

    for i in 1..=height {
        let below = zeros[i - 1];
        zeros.push(hasher.hash(&[below, below])?);
    }

    Ok(zeros)
}

/// Smallest height (at least 1) whose leaf layer holds `entries` leaves
fn minimal_height(entries: usize) -> usize {
    let mut height = 1;
    while height < MAX_TREE_HEIGHT && (1u64 << height) < entries as u64 {
        height += 1;
    }
    height
}

#[derive(Clone, Debug)]
struct Entry {
    index: u64,
    value: Scalar,
}

/// Sparse key/value Merkle tree
#[derive(Clone, Debug)]
pub struct KvMerkleTree {
    height: usize,
    entries: HashMap<TreeKey, Entry>,
    /// Populated nodes per level, level 0 holds the leaves
    levels: Vec<HashMap<u64, Fr>>,
    zeros: Vec<Fr>,
    root: Fr,
}

impl KvMerkleTree {
    /// Build a tree from `(key, value)` pairs in insertion order
    ///
    /// With `height = None` the tree takes the minimal height holding every
    /// entry.
    pub fn new<I, K, V>(data: I, hasher: &dyn FieldHasher, height: Option<usize>) -> ProverResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Scalar>,
    {
        let mut ordered = Vec::new();
        let mut entries = HashMap::new();

        for (index, (raw_key, value)) in data.into_iter().enumerate() {
            let key = TreeKey::new(raw_key.as_ref())?;
            let value = value.into();
            if entries.contains_key(&key) {
                return Err(CryptoError::DuplicateKey(key.to_string()).into());
            }
            ordered.push((key.clone(), value.clone()));
            entries.insert(
                key,
                Entry {
                    index: index as u64,
                    value,
                },
            );
        }

        let height = height.unwrap_or_else(|| minimal_height(ordered.len()));
        if height == 0 || height > MAX_TREE_HEIGHT || ordered.len() as u64 > (1u64 << height) {
            return Err(CryptoError::TreeCapacity {
                height,
                entries: ordered.len(),
            }
            .into());
        }

        let zeros = compute_zero_hashes(hasher, height)?;

        let mut leaves = HashMap::with_capacity(ordered.len());
        for (index, (key, value)) in ordered.iter().enumerate() {
            let leaf = hasher.hash(&[key.to_scalar().to_fr(), value.to_fr()])?;
            leaves.insert(index as u64, leaf);
        }

        let mut levels = Vec::with_capacity(height + 1);
        levels.push(leaves);

        for level in 0..height {
            let current = &levels[level];
            let mut next = HashMap::with_capacity(current.len() / 2 + 1);

            for &index in current.keys() {
                let parent = index >> 1;
                if next.contains_key(&parent) {
                    continue;
                }
                let left = current.get(&(index & !1)).copied().unwrap_or(zeros[level]);
                let right = current.get(&(index | 1)).copied().unwrap_or(zeros[level]);
                next.insert(parent, hasher.hash(&[left, right])?);
            }

            levels.push(next);
        }

        let root = levels[height].get(&0).copied().unwrap_or(zeros[height]);

        Ok(Self {
            height,
            entries,
            levels,
            zeros,
            root,
        })
    }

    /// Get the root as a field element
    pub fn root_fr(&self) -> Fr {
        self.root
    }

    /// Get the number of entries in the tree
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        TreeKey::new(key)
            .map(|k| self.entries.contains_key(&k))
            .unwrap_or(false)
    }

    fn entry(&self, key: &str) -> Result<&Entry, CryptoError> {
        TreeKey::new(key)
            .ok()
            .and_then(|k| self.entries.get(&k))
            .ok_or_else(|| CryptoError::KeyNotFound(key.to_string()))
    }

    /// Leaf hash stored for `key`
    pub fn leaf(&self, key: &str) -> Result<Fr, CryptoError> {
        let entry = self.entry(key)?;
        self.levels[0]
            .get(&entry.index)
            .copied()
            .ok_or_else(|| CryptoError::KeyNotFound(key.to_string()))
    }
}

impl MembershipTree for KvMerkleTree {
    fn height(&self) -> usize {
        self.height
    }

    fn root(&self) -> Scalar {
        Scalar::from(self.root)
    }

    fn value_at(&self, key: &str) -> Result<Scalar, CryptoError> {
        self.entry(key).map(|e| e.value.clone())
    }

    fn path_from(&self, key: &str) -> Result<MerklePath, CryptoError> {
        let mut index = self.entry(key)?.index;

        let mut elements = Vec::with_capacity(self.height);
        let mut indices = Vec::with_capacity(self.height);

        for level in 0..self.height {
            let sibling = self.levels[level]
                .get(&(index ^ 1))
                .copied()
                .unwrap_or(self.zeros[level]);
            elements.push(sibling);
            indices.push(index & 1 == 1);
            index >>= 1;
        }

        Ok(MerklePath { elements, indices })
    }
}
