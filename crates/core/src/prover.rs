//! Proof orchestration
//!
//! [`Prover`] validates a request, assembles the circuit inputs and hands
//! them to a [`ProvingEngine`]. Nothing reaches the engine unless every
//! validation step passed.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::commitment::{AuthorityPublicKey, CommitmentVerifier, EddsaCommitmentVerifier};
use crate::config::{ProverConfig, PUBLIC_SIGNAL_COUNT};
use crate::crypto::poseidon::{FieldHasher, Poseidon};
use crate::error::{ProofError, ProverResult};
use crate::field::Scalar;
use crate::inputs::{assemble, format_request, CircuitInputs, FormattedInputs};
use crate::membership::{self, MembershipWitness};
use crate::proof::{EngineOutput, Groth16Engine, ProvingEngine, SnarkProof};
use crate::request::ProofRequest;
use crate::validation::{self, claim_trees, ValidationContext};

/// Vault membership prover
///
/// Holds only immutable state and can be shared across threads.
pub struct Prover {
    authority: AuthorityPublicKey,
    hasher: Arc<dyn FieldHasher>,
    verifier: Arc<dyn CommitmentVerifier>,
    engine: Arc<dyn ProvingEngine>,
}

impl Prover {
    /// Prover with Poseidon hashing and EdDSA receipt verification
    pub fn new(authority: AuthorityPublicKey, engine: Arc<dyn ProvingEngine>) -> Self {
        let hasher: Arc<dyn FieldHasher> = Arc::new(Poseidon::new());
        Self {
            authority,
            verifier: Arc::new(EddsaCommitmentVerifier::new(hasher.clone())),
            hasher,
            engine,
        }
    }

    /// Prover whose Groth16 proving key is read from the configured artifacts
    pub fn from_config(config: &ProverConfig) -> ProverResult<Self> {
        let engine = Groth16Engine::load(&config.artifacts)?;
        Ok(Self::new(
            config.commitment_mapper_pubkey.clone().into(),
            Arc::new(engine),
        ))
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn FieldHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn CommitmentVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn authority(&self) -> &AuthorityPublicKey {
        &self.authority
    }

    fn context(&self) -> ValidationContext<'_> {
        ValidationContext {
            hasher: self.hasher.as_ref(),
            verifier: self.verifier.as_ref(),
            authority: &self.authority,
        }
    }

    /// Resolve defaults and derive identifiers without validating
    pub fn format(&self, request: &ProofRequest<'_>) -> ProverResult<FormattedInputs> {
        format_request(self.hasher.as_ref(), request)
    }

    /// Run every validation check, returning the formatted inputs
    #[instrument(skip_all)]
    pub fn validate(&self, request: &ProofRequest<'_>) -> ProverResult<FormattedInputs> {
        validation::validate(self.context(), request).map_err(|e| {
            warn!(error = %e, "proof request rejected");
            e
        })
    }

    /// Assemble circuit inputs without running the validation checks
    #[instrument(skip_all)]
    pub fn generate_inputs(&self, request: &ProofRequest<'_>) -> ProverResult<CircuitInputs> {
        let formatted = self.format(request)?;
        self.assemble(request, &formatted)
    }

    fn assemble(
        &self,
        request: &ProofRequest<'_>,
        formatted: &FormattedInputs,
    ) -> ProverResult<CircuitInputs> {
        let witness = match claim_trees(request.claim.as_ref())? {
            Some(trees) => membership::extract(
                trees.accounts,
                trees.registry,
                &formatted.source_identifier,
            )?,
            None => MembershipWitness::empty(),
        };
        Ok(assemble(formatted, &witness, &self.authority))
    }

    /// Validate, assemble and prove
    #[instrument(skip_all)]
    pub fn generate_snark_proof(&self, request: &ProofRequest<'_>) -> ProverResult<SnarkProof> {
        let formatted = self.validate(request)?;
        let inputs = self.assemble(request, &formatted)?;
        let expected = inputs.public.to_signals();

        debug!(
            vault_identifier = %formatted.vault_identifier,
            proof_identifier = %formatted.proof_identifier,
            "inputs assembled"
        );

        let started = Instant::now();
        let output = self.engine.full_prove(&inputs)?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "proof generated");

        let input = check_public_signals(&output, &expected)?;
        Ok(SnarkProof::new(output.proof, input))
    }
}

/// The engine must echo the assembled public signals in order
fn check_public_signals(
    output: &EngineOutput,
    expected: &[Scalar; PUBLIC_SIGNAL_COUNT],
) -> Result<[Scalar; PUBLIC_SIGNAL_COUNT], ProofError> {
    let got = output.public_signals.len();
    let signals: [Scalar; PUBLIC_SIGNAL_COUNT] = output
        .public_signals
        .clone()
        .try_into()
        .map_err(|_| ProofError::PublicSignalCount {
            expected: PUBLIC_SIGNAL_COUNT,
            got,
        })?;

    for (index, (expected, got)) in expected.iter().zip(signals.iter()).enumerate() {
        if expected != got {
            return Err(ProofError::PublicSignalMismatch {
                index,
                expected: expected.to_string(),
                got: got.to_string(),
            });
        }
    }
    Ok(signals)
}
