//! Validation pipeline
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. vault/source then vault/destination secret consistency
//! 2. claim trees: co-presence, registry membership of the accounts root,
//!    registry height, accounts height, source membership, source value range,
//!    claim bounds
//! 3. source then destination commitment or namespace verification
//! 4. proof identifier, vault identifier and source identifier range checks,
//!    then every other scalar the circuit takes unreduced

use num_bigint::BigInt;
use num_traits::Zero;
use tracing::debug;

use crate::commitment::{AuthorityPublicKey, CommitmentVerifier};
use crate::config::{ACCOUNTS_TREE_HEIGHT, REGISTRY_TREE_HEIGHT};
use crate::crypto::poseidon::FieldHasher;
use crate::derivation::namespaced_identifier;
use crate::error::{OverflowField, ProverError, ProverResult, Side, TreeRole};
use crate::field::{field_modulus, Scalar};
use crate::identity::{Account, AccountInput};
use crate::inputs::{format_request, FormattedInputs};
use crate::membership::{accounts_tree_value, source_value, MembershipTree};
use crate::request::{ClaimComparator, ClaimDescriptor, ProofRequest, VaultDescriptor};

/// Collaborators the pipeline consults
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub hasher: &'a dyn FieldHasher,
    pub verifier: &'a dyn CommitmentVerifier,
    pub authority: &'a AuthorityPublicKey,
}

/// Both trees of a claim
#[derive(Clone, Copy)]
pub struct ClaimTrees<'a> {
    pub accounts: &'a dyn MembershipTree,
    pub registry: &'a dyn MembershipTree,
}

/// A vault-derived account must reuse the vault secret
///
/// Skipped for committed accounts, which hold per-account secrets, and when
/// either secret is zero.
pub fn check_secret_consistency(
    vault: Option<&VaultDescriptor>,
    input: Option<&AccountInput>,
    side: Side,
) -> ProverResult<()> {
    let (Some(vault), Some(input)) = (vault, input) else {
        return Ok(());
    };
    let Account::Vault(account) = &input.account else {
        return Ok(());
    };
    if vault.secret.is_zero() || account.secret.is_zero() {
        return Ok(());
    }
    if vault.secret != account.secret {
        return Err(ProverError::SecretMismatch { side });
    }
    Ok(())
}

/// Resolve the claim's trees, which must be supplied together
pub fn claim_trees<'a>(claim: Option<&ClaimDescriptor<'a>>) -> ProverResult<Option<ClaimTrees<'a>>> {
    let Some(claim) = claim else {
        return Ok(None);
    };
    match (claim.accounts_tree, claim.registry_tree) {
        (Some(accounts), Some(registry)) => Ok(Some(ClaimTrees { accounts, registry })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ProverError::IncompleteClaimTrees {
            missing: TreeRole::Registry,
        }),
        (None, Some(_)) => Err(ProverError::IncompleteClaimTrees {
            missing: TreeRole::Accounts,
        }),
    }
}

/// Tree shape, membership and claim bounds
pub fn check_claim(trees: ClaimTrees<'_>, formatted: &FormattedInputs) -> ProverResult<()> {
    accounts_tree_value(trees.accounts, trees.registry)?;

    let registry_height = trees.registry.height();
    if registry_height != REGISTRY_TREE_HEIGHT {
        return Err(ProverError::InvalidTreeHeight {
            which: TreeRole::Registry,
            expected: REGISTRY_TREE_HEIGHT,
            actual: registry_height,
        });
    }

    let accounts_height = trees.accounts.height();
    if accounts_height != ACCOUNTS_TREE_HEIGHT {
        return Err(ProverError::InvalidTreeHeight {
            which: TreeRole::Accounts,
            expected: ACCOUNTS_TREE_HEIGHT,
            actual: accounts_height,
        });
    }

    let source_value = source_value(trees.accounts, &formatted.source_identifier)?;
    check_source_value_range(&source_value)?;
    check_claim_value(
        &formatted.claim_value,
        formatted.claim_comparator,
        &source_value,
    )
}

/// The in-circuit comparison only orders values up to `(p - 1) / 2`
fn check_source_value_range(source_value: &Scalar) -> ProverResult<()> {
    let max = (field_modulus() - 1u32) >> 1;
    if *source_value.as_biguint() > max {
        return Err(ProverError::SourceValueOutOfRange {
            source_value: source_value.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

fn check_claim_value(
    claim: &BigInt,
    comparator: ClaimComparator,
    source_value: &Scalar,
) -> ProverResult<()> {
    let source = source_value.to_bigint();

    if *claim > source {
        return Err(ProverError::ClaimExceedsSourceValue {
            claim: claim.to_string(),
            source_value: source.to_string(),
        });
    }
    if *claim < BigInt::zero() {
        return Err(ProverError::ClaimNotNegative {
            claim: claim.to_string(),
        });
    }
    if comparator == ClaimComparator::Equal && *claim != source {
        return Err(ProverError::ClaimNotEqualForComparatorEQ {
            claim: claim.to_string(),
            source_value: source.to_string(),
        });
    }
    Ok(())
}

/// Commitment receipt or namespace binding of one side, when enabled
pub fn check_account_verification(
    ctx: ValidationContext<'_>,
    side: Side,
    input: Option<&AccountInput>,
    vault_secret: &Scalar,
) -> ProverResult<()> {
    let Some(input) = input.filter(|i| i.verification_enabled) else {
        return Ok(());
    };

    match &input.account {
        Account::Committed(account) => {
            let valid = ctx.verifier.verify_commitment(
                &account.identifier,
                vault_secret,
                &account.secret,
                &account.commitment_receipt,
                ctx.authority,
            );
            if !valid {
                return Err(ProverError::InvalidCommitmentReceipt { side });
            }
        }
        Account::Vault(account) => {
            let expected = namespaced_identifier(ctx.hasher, vault_secret, &account.namespace)?;
            if expected != account.identifier {
                return Err(ProverError::InvalidNamespaceOrSecret { side });
            }
        }
    }

    debug!(%side, "account verification passed");
    Ok(())
}

/// Scalars that reach the circuit unreduced must lie inside the field
///
/// Derived identifiers are checked first, then raw request scalars and the
/// mapper key.
pub fn check_overflows(
    formatted: &FormattedInputs,
    authority: &AuthorityPublicKey,
) -> ProverResult<()> {
    let checks = [
        (OverflowField::ProofIdentifier, &formatted.proof_identifier),
        (OverflowField::VaultIdentifier, &formatted.vault_identifier),
        (OverflowField::SourceIdentifier, &formatted.source_identifier),
        (OverflowField::RequestIdentifier, &formatted.request_identifier),
        (OverflowField::ExtraData, &formatted.extra_data),
        (OverflowField::DestinationIdentifier, &formatted.destination_identifier),
        (OverflowField::VaultNamespace, &formatted.vault_namespace),
        (OverflowField::VaultSecret, &formatted.vault_secret),
        (OverflowField::SourceSecret, &formatted.source_secret),
        (OverflowField::SourceVaultNamespace, &formatted.source_vault_namespace),
        (
            OverflowField::DestinationVaultNamespace,
            &formatted.destination_vault_namespace,
        ),
        (OverflowField::CommitmentMapperPubkey, &authority.x),
        (OverflowField::CommitmentMapperPubkey, &authority.y),
    ];
    for (field, value) in checks {
        if value.exceeds_field() {
            return Err(ProverError::FieldOverflow {
                field,
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

/// Run the whole pipeline, returning the formatted inputs on success
pub fn validate(ctx: ValidationContext<'_>, request: &ProofRequest<'_>) -> ProverResult<FormattedInputs> {
    let formatted = format_request(ctx.hasher, request)?;

    if let Some(trees) = claim_trees(request.claim.as_ref())? {
        check_claim(trees, &formatted)?;
    }

    check_account_verification(
        ctx,
        Side::Source,
        request.source.as_ref(),
        &formatted.vault_secret,
    )?;
    check_account_verification(
        ctx,
        Side::Destination,
        request.destination.as_ref(),
        &formatted.vault_secret,
    )?;

    check_overflows(&formatted, ctx.authority)?;

    Ok(formatted)
}
