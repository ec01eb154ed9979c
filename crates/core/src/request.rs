//! User-facing proof request

use num_bigint::BigInt;

use crate::field::Scalar;
use crate::identity::AccountInput;
use crate::membership::MembershipTree;

/// The user's root secret and optional namespace
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VaultDescriptor {
    pub secret: Scalar,
    pub namespace: Option<Scalar>,
}

impl VaultDescriptor {
    pub fn new(secret: Scalar) -> Self {
        Self {
            secret,
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: Scalar) -> Self {
        self.namespace = Some(namespace);
        self
    }
}

/// How the claimed value relates to the value recorded in the accounts tree
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClaimComparator {
    /// Claim value at most the recorded value
    #[default]
    AtLeast = 0,
    /// Claim value exactly the recorded value
    Equal = 1,
}

impl ClaimComparator {
    pub fn as_scalar(self) -> Scalar {
        Scalar::from(self as u64)
    }
}

/// What the proof claims about the source's recorded value
#[derive(Clone, Default)]
pub struct ClaimDescriptor<'a> {
    /// Signed so that negative claims surface as a validation failure
    pub value: Option<BigInt>,
    pub comparator: Option<ClaimComparator>,
    pub accounts_tree: Option<&'a dyn MembershipTree>,
    pub registry_tree: Option<&'a dyn MembershipTree>,
}

impl<'a> ClaimDescriptor<'a> {
    pub fn new(
        accounts_tree: &'a dyn MembershipTree,
        registry_tree: &'a dyn MembershipTree,
    ) -> Self {
        Self {
            accounts_tree: Some(accounts_tree),
            registry_tree: Some(registry_tree),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<BigInt>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_comparator(mut self, comparator: ClaimComparator) -> Self {
        self.comparator = Some(comparator);
        self
    }
}

/// Everything a single proof is generated from
#[derive(Clone, Default)]
pub struct ProofRequest<'a> {
    pub vault: Option<VaultDescriptor>,
    pub source: Option<AccountInput>,
    pub destination: Option<AccountInput>,
    pub claim: Option<ClaimDescriptor<'a>>,
    pub request_identifier: Option<Scalar>,
    pub extra_data: Option<Scalar>,
}
