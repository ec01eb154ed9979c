//! Input formatting and assembly
//!
//! [`format_request`] resolves every optional field of a [`ProofRequest`] to
//! its default and derives the identifiers. [`assemble`] then lays the result
//! out as the circuit's private and public inputs.

use num_bigint::BigInt;
use serde_json::{json, Map, Value};

use crate::commitment::AuthorityPublicKey;
use crate::config::PUBLIC_SIGNAL_COUNT;
use crate::crypto::merkle::MerklePath;
use crate::crypto::poseidon::FieldHasher;
use crate::derivation;
use crate::error::{ProverResult, Side};
use crate::field::{signed_to_field, Scalar};
use crate::identity::{Account, AccountInput, CommitmentReceipt};
use crate::membership::MembershipWitness;
use crate::request::{ClaimComparator, ProofRequest};
use crate::validation::check_secret_consistency;

/// Fully-defaulted scalar view of a request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormattedInputs {
    pub vault_secret: Scalar,
    pub vault_namespace: Scalar,
    pub vault_identifier: Scalar,
    pub source_identifier: Scalar,
    pub source_secret: Scalar,
    pub source_vault_namespace: Scalar,
    pub source_secret_hash: Scalar,
    pub source_commitment_receipt: CommitmentReceipt,
    pub destination_identifier: Scalar,
    pub destination_secret: Scalar,
    pub destination_vault_namespace: Scalar,
    pub destination_commitment_receipt: CommitmentReceipt,
    pub request_identifier: Scalar,
    pub proof_identifier: Scalar,
    pub claim_value: BigInt,
    pub claim_comparator: ClaimComparator,
    pub source_verification_enabled: bool,
    pub destination_verification_enabled: bool,
    pub extra_data: Scalar,
}

struct SideFields {
    identifier: Scalar,
    secret: Scalar,
    namespace: Scalar,
    receipt: CommitmentReceipt,
    verification_enabled: bool,
}

/// Receipts only reach the circuit when their side is verified
fn side_fields(input: Option<&AccountInput>) -> SideFields {
    let Some(input) = input else {
        return SideFields {
            identifier: Scalar::zero(),
            secret: Scalar::zero(),
            namespace: Scalar::zero(),
            receipt: Default::default(),
            verification_enabled: false,
        };
    };

    let (namespace, receipt) = match &input.account {
        Account::Committed(account) if input.verification_enabled => {
            (Scalar::zero(), account.commitment_receipt.clone())
        }
        Account::Committed(_) => (Scalar::zero(), Default::default()),
        Account::Vault(account) => (account.namespace.clone(), Default::default()),
    };

    SideFields {
        identifier: input.account.identifier().clone(),
        secret: input.account.secret().clone(),
        namespace,
        receipt,
        verification_enabled: input.verification_enabled,
    }
}

/// Normalize a request into [`FormattedInputs`]
///
/// Fails on vault/account secret mismatches before deriving anything.
pub fn format_request(
    hasher: &dyn FieldHasher,
    request: &ProofRequest<'_>,
) -> ProverResult<FormattedInputs> {
    check_secret_consistency(request.vault.as_ref(), request.source.as_ref(), Side::Source)?;
    check_secret_consistency(
        request.vault.as_ref(),
        request.destination.as_ref(),
        Side::Destination,
    )?;

    let vault_secret = request
        .vault
        .as_ref()
        .map(|v| v.secret.clone())
        .or_else(|| request.source.as_ref().map(|s| s.account.secret().clone()))
        .unwrap_or_default();
    let vault_namespace = request
        .vault
        .as_ref()
        .and_then(|v| v.namespace.clone())
        .unwrap_or_default();
    let vault_identifier = derivation::vault_identifier(hasher, &vault_secret, &vault_namespace)?;

    let source = side_fields(request.source.as_ref());
    let destination = side_fields(request.destination.as_ref());

    let source_secret_hash =
        derivation::secret_hash(hasher, request.source.as_ref().map(|s| &s.account))?;
    let request_identifier = request.request_identifier.clone().unwrap_or_default();
    let proof_identifier =
        derivation::proof_identifier(hasher, &source_secret_hash, &request_identifier)?;

    let claim = request.claim.as_ref();

    Ok(FormattedInputs {
        vault_secret,
        vault_namespace,
        vault_identifier,
        source_identifier: source.identifier,
        source_secret: source.secret,
        source_vault_namespace: source.namespace,
        source_secret_hash,
        source_commitment_receipt: source.receipt,
        destination_identifier: destination.identifier,
        destination_secret: destination.secret,
        destination_vault_namespace: destination.namespace,
        destination_commitment_receipt: destination.receipt,
        request_identifier,
        proof_identifier,
        claim_value: claim.and_then(|c| c.value.clone()).unwrap_or_default(),
        claim_comparator: claim.and_then(|c| c.comparator).unwrap_or_default(),
        source_verification_enabled: source.verification_enabled,
        destination_verification_enabled: destination.verification_enabled,
        extra_data: request.extra_data.clone().unwrap_or_default(),
    })
}

/// Witness values the verifier never sees
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateInputBundle {
    pub vault_secret: Scalar,
    pub source_identifier: Scalar,
    pub source_secret: Scalar,
    pub source_vault_namespace: Scalar,
    pub source_commitment_receipt: CommitmentReceipt,
    pub destination_vault_namespace: Scalar,
    pub destination_secret: Scalar,
    pub destination_commitment_receipt: CommitmentReceipt,
    pub accounts_tree_root: Scalar,
    pub account_merkle_path_elements: Vec<Scalar>,
    pub account_merkle_path_indices: Vec<bool>,
    pub registry_merkle_path_elements: Vec<Scalar>,
    pub registry_merkle_path_indices: Vec<bool>,
    pub source_value: Scalar,
}

/// Values exposed to the verifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicInputBundle {
    pub destination_identifier: Scalar,
    pub extra_data: Scalar,
    pub commitment_mapper_pubkey: [Scalar; 2],
    pub registry_tree_root: Scalar,
    pub request_identifier: Scalar,
    pub proof_identifier: Scalar,
    pub claim_value: Scalar,
    pub accounts_tree_value: Scalar,
    pub claim_comparator: Scalar,
    pub vault_identifier: Scalar,
    pub vault_namespace: Scalar,
    pub source_verification_enabled: Scalar,
    pub destination_verification_enabled: Scalar,
}

/// Circuit signal names of the public inputs, in verifier order
pub const PUBLIC_SIGNAL_NAMES: [&str; PUBLIC_SIGNAL_COUNT] = [
    "destinationIdentifier",
    "extraData",
    "commitmentMapperPubKeyX",
    "commitmentMapperPubKeyY",
    "registryTreeRoot",
    "requestIdentifier",
    "proofIdentifier",
    "claimValue",
    "accountsTreeValue",
    "claimComparator",
    "vaultIdentifier",
    "vaultNamespace",
    "sourceVerificationEnabled",
    "destinationVerificationEnabled",
];

impl PublicInputBundle {
    /// The public-signal vector in verifier order
    pub fn to_signals(&self) -> [Scalar; PUBLIC_SIGNAL_COUNT] {
        let [pubkey_x, pubkey_y] = self.commitment_mapper_pubkey.clone();
        [
            self.destination_identifier.clone(),
            self.extra_data.clone(),
            pubkey_x,
            pubkey_y,
            self.registry_tree_root.clone(),
            self.request_identifier.clone(),
            self.proof_identifier.clone(),
            self.claim_value.clone(),
            self.accounts_tree_value.clone(),
            self.claim_comparator.clone(),
            self.vault_identifier.clone(),
            self.vault_namespace.clone(),
            self.source_verification_enabled.clone(),
            self.destination_verification_enabled.clone(),
        ]
    }
}

/// The union of both bundles, as handed to a proving engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircuitInputs {
    pub private: PrivateInputBundle,
    pub public: PublicInputBundle,
}

fn scalar_json(value: &Scalar) -> Value {
    Value::String(value.to_string())
}

fn scalars_json<'a>(values: impl IntoIterator<Item = &'a Scalar>) -> Value {
    Value::Array(values.into_iter().map(scalar_json).collect())
}

fn indices_json(indices: &[bool]) -> Value {
    Value::Array(
        indices
            .iter()
            .map(|&bit| Value::String(u8::from(bit).to_string()))
            .collect(),
    )
}

impl CircuitInputs {
    /// Input map keyed by circuit signal name, all values in decimal
    pub fn to_json(&self) -> Value {
        let p = &self.private;
        let q = &self.public;

        let mut map = Map::new();
        map.insert("vaultSecret".into(), scalar_json(&p.vault_secret));
        map.insert("sourceIdentifier".into(), scalar_json(&p.source_identifier));
        map.insert("sourceSecret".into(), scalar_json(&p.source_secret));
        map.insert(
            "sourceVaultNamespace".into(),
            scalar_json(&p.source_vault_namespace),
        );
        map.insert(
            "sourceCommitmentReceipt".into(),
            scalars_json(&p.source_commitment_receipt),
        );
        map.insert(
            "destinationVaultNamespace".into(),
            scalar_json(&p.destination_vault_namespace),
        );
        map.insert("destinationSecret".into(), scalar_json(&p.destination_secret));
        map.insert(
            "destinationCommitmentReceipt".into(),
            scalars_json(&p.destination_commitment_receipt),
        );
        map.insert("accountsTreeRoot".into(), scalar_json(&p.accounts_tree_root));
        map.insert(
            "accountMerklePathElements".into(),
            scalars_json(&p.account_merkle_path_elements),
        );
        map.insert(
            "accountMerklePathIndices".into(),
            indices_json(&p.account_merkle_path_indices),
        );
        map.insert(
            "registryMerklePathElements".into(),
            scalars_json(&p.registry_merkle_path_elements),
        );
        map.insert(
            "registryMerklePathIndices".into(),
            indices_json(&p.registry_merkle_path_indices),
        );
        map.insert("sourceValue".into(), scalar_json(&p.source_value));

        map.insert(
            "destinationIdentifier".into(),
            scalar_json(&q.destination_identifier),
        );
        map.insert("extraData".into(), scalar_json(&q.extra_data));
        map.insert(
            "commitmentMapperPubKey".into(),
            scalars_json(&q.commitment_mapper_pubkey),
        );
        map.insert("registryTreeRoot".into(), scalar_json(&q.registry_tree_root));
        map.insert("requestIdentifier".into(), scalar_json(&q.request_identifier));
        map.insert("proofIdentifier".into(), scalar_json(&q.proof_identifier));
        map.insert("claimValue".into(), scalar_json(&q.claim_value));
        map.insert("accountsTreeValue".into(), scalar_json(&q.accounts_tree_value));
        map.insert("claimComparator".into(), scalar_json(&q.claim_comparator));
        map.insert("vaultIdentifier".into(), scalar_json(&q.vault_identifier));
        map.insert("vaultNamespace".into(), scalar_json(&q.vault_namespace));
        map.insert(
            "sourceVerificationEnabled".into(),
            scalar_json(&q.source_verification_enabled),
        );
        map.insert(
            "destinationVerificationEnabled".into(),
            scalar_json(&q.destination_verification_enabled),
        );

        Value::Object(map)
    }

    /// Public signals as the decimal strings a verifier expects
    pub fn public_signals_json(&self) -> Value {
        json!(self
            .public
            .to_signals()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>())
    }
}

fn path_scalars(path: &MerklePath) -> Vec<Scalar> {
    path.elements.iter().map(Scalar::from).collect()
}

/// Lay out formatted inputs and membership witness as circuit inputs
pub fn assemble(
    formatted: &FormattedInputs,
    witness: &MembershipWitness,
    authority: &AuthorityPublicKey,
) -> CircuitInputs {
    let private = PrivateInputBundle {
        vault_secret: formatted.vault_secret.clone(),
        source_identifier: formatted.source_identifier.clone(),
        source_secret: formatted.source_secret.clone(),
        source_vault_namespace: formatted.source_vault_namespace.clone(),
        source_commitment_receipt: formatted.source_commitment_receipt.clone(),
        destination_vault_namespace: formatted.destination_vault_namespace.clone(),
        destination_secret: formatted.destination_secret.clone(),
        destination_commitment_receipt: formatted.destination_commitment_receipt.clone(),
        accounts_tree_root: witness.accounts_tree_root.clone(),
        account_merkle_path_elements: path_scalars(&witness.account_path),
        account_merkle_path_indices: witness.account_path.indices.clone(),
        registry_merkle_path_elements: path_scalars(&witness.registry_path),
        registry_merkle_path_indices: witness.registry_path.indices.clone(),
        source_value: witness.source_value.clone(),
    };

    let public = PublicInputBundle {
        destination_identifier: formatted.destination_identifier.clone(),
        extra_data: formatted.extra_data.clone(),
        commitment_mapper_pubkey: authority.coordinates(),
        registry_tree_root: witness.registry_tree_root.clone(),
        request_identifier: formatted.request_identifier.clone(),
        proof_identifier: formatted.proof_identifier.clone(),
        claim_value: signed_to_field(&formatted.claim_value),
        accounts_tree_value: witness.accounts_tree_value.clone(),
        claim_comparator: formatted.claim_comparator.as_scalar(),
        vault_identifier: formatted.vault_identifier.clone(),
        vault_namespace: formatted.vault_namespace.clone(),
        source_verification_enabled: Scalar::from(formatted.source_verification_enabled),
        destination_verification_enabled: Scalar::from(
            formatted.destination_verification_enabled,
        ),
    };

    CircuitInputs { private, public }
}
