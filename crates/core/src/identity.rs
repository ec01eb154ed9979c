//! Account variants and the accounts-tree key format
//!
//! An account is either committed (an external identity bound to its secret
//! by a commitment mapper receipt) or vault-derived (an identifier that the
//! vault secret and a namespace reproduce). The variant is decided once, by
//! [`RawAccount::classify`], and carried as an [`Account`] from then on.

use serde::{Deserialize, Serialize};

use crate::config::COMMITMENT_RECEIPT_LEN;
use crate::crypto::merkle::TreeKey;
use crate::error::{ProverError, ProverResult, Side};
use crate::field::Scalar;

/// Byte length above which an identifier is treated as a vault identifier
pub const ADDRESS_BYTE_LEN: usize = 20;

/// EdDSA receipt `(R.x, R.y, S)` issued by the commitment mapper
pub type CommitmentReceipt = [Scalar; COMMITMENT_RECEIPT_LEN];

/// An externally-issued identity attested by the commitment mapper
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedAccount {
    pub identifier: Scalar,
    pub secret: Scalar,
    pub commitment_receipt: CommitmentReceipt,
}

/// An identity derived from the vault secret and a namespace
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultAccount {
    pub identifier: Scalar,
    pub secret: Scalar,
    pub namespace: Scalar,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Account {
    Committed(CommittedAccount),
    Vault(VaultAccount),
}

impl Account {
    pub fn identifier(&self) -> &Scalar {
        match self {
            Account::Committed(a) => &a.identifier,
            Account::Vault(a) => &a.identifier,
        }
    }

    pub fn secret(&self) -> &Scalar {
        match self {
            Account::Committed(a) => &a.secret,
            Account::Vault(a) => &a.secret,
        }
    }

    pub fn is_vault(&self) -> bool {
        matches!(self, Account::Vault(_))
    }
}

/// A source or destination account plus its verification switch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInput {
    pub account: Account,
    pub verification_enabled: bool,
}

impl AccountInput {
    pub fn committed(
        identifier: Scalar,
        secret: Scalar,
        commitment_receipt: CommitmentReceipt,
        verification_enabled: bool,
    ) -> Self {
        Self {
            account: Account::Committed(CommittedAccount {
                identifier,
                secret,
                commitment_receipt,
            }),
            verification_enabled,
        }
    }

    pub fn vault(
        identifier: Scalar,
        secret: Scalar,
        namespace: Scalar,
        verification_enabled: bool,
    ) -> Self {
        Self {
            account: Account::Vault(VaultAccount {
                identifier,
                secret,
                namespace,
            }),
            verification_enabled,
        }
    }
}

/// Untyped account as it arrives from JSON or other loose sources
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccount {
    pub identifier: Scalar,
    pub secret: Scalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment_receipt: Option<CommitmentReceipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Scalar>,
    #[serde(default)]
    pub verification_enabled: bool,
}

impl RawAccount {
    /// A receipt selects the committed variant, its absence the vault variant
    pub fn classify(self, side: Side) -> ProverResult<AccountInput> {
        match (self.commitment_receipt, self.namespace) {
            (Some(receipt), _) => Ok(AccountInput::committed(
                self.identifier,
                self.secret,
                receipt,
                self.verification_enabled,
            )),
            (None, Some(namespace)) => Ok(AccountInput::vault(
                self.identifier,
                self.secret,
                namespace,
                self.verification_enabled,
            )),
            (None, None) => Err(ProverError::IncompleteAccount {
                side,
                field: "namespace",
            }),
        }
    }
}

/// Accounts-tree key of a source identifier
///
/// Identifiers that fit in 20 bytes are address-like and get left-padded to
/// exactly 20 bytes. Longer ones are vault identifiers and keep their
/// minimal encoding. A vault identifier that happens to fit in 20 bytes is
/// padded like an address.
pub fn account_tree_key(identifier: &Scalar) -> TreeKey {
    if identifier.byte_len() > ADDRESS_BYTE_LEN {
        return TreeKey::from_scalar(identifier);
    }
    let minimal = identifier.to_hex_string();
    TreeKey::from_canonical(format!(
        "0x{:0>width$}",
        &minimal[2..],
        width = ADDRESS_BYTE_LEN * 2
    ))
}
