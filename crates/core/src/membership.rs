//! Dual Merkle membership: source in the accounts tree, accounts tree in the
//! registry tree

use tracing::debug;

use crate::config::ACCOUNTS_TREE_HEIGHT;
use crate::crypto::merkle::{MerklePath, TreeKey};
use crate::error::{CryptoError, ProverError, ProverResult};
use crate::field::Scalar;
use crate::identity::account_tree_key;

/// Key/value Merkle tree as consumed by the prover
pub trait MembershipTree: Send + Sync {
    fn height(&self) -> usize;

    fn root(&self) -> Scalar;

    /// Value stored under `key`, failing if the key is absent
    fn value_at(&self, key: &str) -> Result<Scalar, CryptoError>;

    /// Sibling path from the leaf at `key` to the root
    fn path_from(&self, key: &str) -> Result<MerklePath, CryptoError>;
}

/// Registry key of an accounts tree: its root in minimal hex
pub fn registry_key(accounts_root: &Scalar) -> TreeKey {
    TreeKey::from_scalar(accounts_root)
}

/// Paths and values the circuit needs for the membership statement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipWitness {
    pub accounts_tree_root: Scalar,
    pub registry_tree_root: Scalar,
    /// Value recorded for the source in the accounts tree
    pub source_value: Scalar,
    /// Value recorded for the accounts tree in the registry tree
    pub accounts_tree_value: Scalar,
    pub account_path: MerklePath,
    pub registry_path: MerklePath,
}

impl MembershipWitness {
    /// Witness of a proof that asserts no membership at all
    pub fn empty() -> Self {
        Self {
            accounts_tree_root: Scalar::zero(),
            registry_tree_root: Scalar::zero(),
            source_value: Scalar::zero(),
            accounts_tree_value: Scalar::zero(),
            account_path: MerklePath::empty(ACCOUNTS_TREE_HEIGHT),
            registry_path: MerklePath::empty(ACCOUNTS_TREE_HEIGHT),
        }
    }
}

/// Value recorded for `source_identifier` in the accounts tree
pub fn source_value(
    accounts: &dyn MembershipTree,
    source_identifier: &Scalar,
) -> ProverResult<Scalar> {
    let key = account_tree_key(source_identifier);
    accounts
        .value_at(key.as_str())
        .map_err(|_| ProverError::SourceNotInAccountsTree {
            key: key.to_string(),
        })
}

/// Value recorded for the accounts tree in the registry tree
pub fn accounts_tree_value(
    accounts: &dyn MembershipTree,
    registry: &dyn MembershipTree,
) -> ProverResult<Scalar> {
    let root = accounts.root();
    registry
        .value_at(registry_key(&root).as_str())
        .map_err(|_| ProverError::AccountsTreeNotInRegistryTree {
            root: root.to_string(),
        })
}

/// Extract both membership paths and their leaf values
pub fn extract(
    accounts: &dyn MembershipTree,
    registry: &dyn MembershipTree,
    source_identifier: &Scalar,
) -> ProverResult<MembershipWitness> {
    let source_key = account_tree_key(source_identifier);
    let source_value = source_value(accounts, source_identifier)?;
    let account_path = accounts
        .path_from(source_key.as_str())
        .map_err(|_| ProverError::SourceNotInAccountsTree {
            key: source_key.to_string(),
        })?;

    let accounts_tree_root = accounts.root();
    let accounts_tree_value = accounts_tree_value(accounts, registry)?;
    let registry_path = registry
        .path_from(registry_key(&accounts_tree_root).as_str())
        .map_err(|_| ProverError::AccountsTreeNotInRegistryTree {
            root: accounts_tree_root.to_string(),
        })?;

    debug!(
        source_key = %source_key,
        accounts_root = %accounts_tree_root,
        "extracted membership paths"
    );

    Ok(MembershipWitness {
        accounts_tree_root,
        registry_tree_root: registry.root(),
        source_value,
        accounts_tree_value,
        account_path,
        registry_path,
    })
}
