//! End-to-end tests for the proof orchestrator
//!
//! A call-counting engine stands in for Groth16: it checks the membership
//! circuit is satisfied by the assembled inputs and echoes the public signals.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ark_bn254::Fr;
use vault_prover::crypto::merkle::KvMerkleTree;
use vault_prover::crypto::poseidon::Poseidon;
use vault_prover::error::OverflowField;
use vault_prover::field::field_modulus;
use vault_prover::membership::{registry_key, MembershipTree};
use vault_prover::proof::{check_satisfied, MembershipCircuit, ProofPoints};
use vault_prover::{
    AccountInput, CircuitArtifacts, CircuitInputs, ClaimComparator, ClaimDescriptor,
    CommitmentMapper, EngineOutput, ProofError, ProofRequest, Prover, ProverConfig, ProverError,
    ProvingEngine, Scalar, Side, SnarkProof, TreeRole, VaultDescriptor, ACCOUNTS_TREE_HEIGHT,
    REGISTRY_TREE_HEIGHT,
};

const SOURCE: &str = "0xa76f290c490c70f2d816d286efe47fd64a35800b";
const OTHER: &str = "0x0085560b24769dac4ed057f1b2ae40746aa9aab6";
const VAULT_SECRET: u64 = 0x123456;
const VAULT_NAMESPACE: u64 = 123;
const DESTINATION_NAMESPACE: u64 = 456;
const REQUEST: u64 = 123;
const SOURCE_VALUE: u64 = 4;
const ACCOUNTS_TREE_VALUE: u64 = 12;

enum Behaviour {
    Echo,
    Reorder,
    Fail,
}

struct CountingEngine {
    calls: AtomicUsize,
    behaviour: Behaviour,
}

impl CountingEngine {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            behaviour,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProvingEngine for CountingEngine {
    fn full_prove(&self, inputs: &CircuitInputs) -> Result<EngineOutput, ProofError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut public_signals = inputs.public.to_signals().to_vec();
        match self.behaviour {
            Behaviour::Echo => check_satisfied(&MembershipCircuit::from_inputs(inputs)?)?,
            Behaviour::Reorder => public_signals.swap(0, 1),
            Behaviour::Fail => return Err(ProofError::GenerationFailed("stub".into())),
        }

        let s = |v: u64| Scalar::from(v);
        Ok(EngineOutput {
            proof: ProofPoints {
                a: [s(1), s(2)],
                b: [[s(3), s(4)], [s(5), s(6)]],
                c: [s(7), s(8)],
            },
            public_signals,
        })
    }
}

fn hash(values: &[u64]) -> Scalar {
    let inputs: Vec<Fr> = values.iter().map(|v| Fr::from(*v)).collect();
    Poseidon::new().hash(&inputs).unwrap().into()
}

fn hash_scalars(values: &[&Scalar]) -> Scalar {
    let inputs: Vec<Fr> = values.iter().map(|v| v.to_fr()).collect();
    Poseidon::new().hash(&inputs).unwrap().into()
}

struct Fixture {
    mapper: CommitmentMapper,
    accounts: KvMerkleTree,
    registry: KvMerkleTree,
}

impl Fixture {
    fn new() -> Self {
        Self::with_heights(ACCOUNTS_TREE_HEIGHT, REGISTRY_TREE_HEIGHT)
    }

    fn with_heights(accounts_height: usize, registry_height: usize) -> Self {
        let hasher = Poseidon::new();
        let accounts = KvMerkleTree::new(
            vec![(SOURCE, SOURCE_VALUE), (OTHER, 7)],
            &hasher,
            Some(accounts_height),
        )
        .unwrap();
        let registry = KvMerkleTree::new(
            vec![
                ("0x01".to_string(), 1u64),
                (registry_key(&accounts.root()).as_str().to_string(), ACCOUNTS_TREE_VALUE),
            ],
            &hasher,
            Some(registry_height),
        )
        .unwrap();

        Self {
            mapper: CommitmentMapper::from_seed(b"commitment-mapper"),
            accounts,
            registry,
        }
    }

    fn prover(&self, engine: Arc<CountingEngine>) -> Prover {
        Prover::new(self.mapper.public_key(), engine)
    }

    fn source_identifier() -> Scalar {
        SOURCE.parse().unwrap()
    }

    fn source(&self, verification_enabled: bool) -> AccountInput {
        let identifier = Self::source_identifier();
        let secret = Scalar::from(VAULT_SECRET);
        let receipt = self
            .mapper
            .commit_account(&identifier, &secret, &secret)
            .unwrap();
        AccountInput::committed(identifier, secret, receipt, verification_enabled)
    }

    fn destination(&self) -> AccountInput {
        AccountInput::vault(
            hash(&[VAULT_SECRET, DESTINATION_NAMESPACE]),
            Scalar::from(VAULT_SECRET),
            Scalar::from(DESTINATION_NAMESPACE),
            true,
        )
    }

    fn claim(&self, value: i64, comparator: ClaimComparator) -> ClaimDescriptor<'_> {
        ClaimDescriptor::new(&self.accounts, &self.registry)
            .with_value(value)
            .with_comparator(comparator)
    }

    fn request(&self) -> ProofRequest<'_> {
        ProofRequest {
            vault: Some(
                VaultDescriptor::new(Scalar::from(VAULT_SECRET))
                    .with_namespace(Scalar::from(VAULT_NAMESPACE)),
            ),
            source: Some(self.source(true)),
            destination: Some(self.destination()),
            claim: Some(self.claim(SOURCE_VALUE as i64, ClaimComparator::AtLeast)),
            request_identifier: Some(Scalar::from(REQUEST)),
            extra_data: Some(Scalar::from(0xbeefu64)),
        }
    }
}

#[test]
fn test_worked_example() {
    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());

    let proof = prover.generate_snark_proof(&fx.request()).unwrap();
    let signals = proof.public_signals();

    assert_eq!(engine.calls(), 1);
    assert_eq!(signals.len(), 14);
    assert_eq!(signals[10], hash(&[VAULT_SECRET, VAULT_NAMESPACE]));
    assert_eq!(signals[6], hash_scalars(&[&hash(&[VAULT_SECRET, 1]), &Scalar::from(REQUEST)]));
    assert_eq!(signals[8], Scalar::from(ACCOUNTS_TREE_VALUE));
    assert_eq!(signals[4], fx.registry.root());
    assert_eq!(proof.to_bytes().unwrap().len(), SnarkProof::ENCODED_LEN);
}

#[test]
fn test_public_signal_order_matches_reference() {
    let fx = Fixture::new();
    let prover = fx.prover(CountingEngine::new(Behaviour::Echo));
    let authority = fx.mapper.public_key();

    let proof = prover.generate_snark_proof(&fx.request()).unwrap();

    let reference = [
        hash(&[VAULT_SECRET, DESTINATION_NAMESPACE]),
        Scalar::from(0xbeefu64),
        authority.x.clone(),
        authority.y.clone(),
        fx.registry.root(),
        Scalar::from(REQUEST),
        hash_scalars(&[&hash(&[VAULT_SECRET, 1]), &Scalar::from(REQUEST)]),
        Scalar::from(SOURCE_VALUE),
        Scalar::from(ACCOUNTS_TREE_VALUE),
        Scalar::from(0u64),
        hash(&[VAULT_SECRET, VAULT_NAMESPACE]),
        Scalar::from(VAULT_NAMESPACE),
        Scalar::from(1u64),
        Scalar::from(1u64),
    ];
    assert_eq!(proof.input, reference);
}

#[test]
fn test_namespace_zero_suppresses_vault_identifier() {
    let fx = Fixture::new();
    let prover = fx.prover(CountingEngine::new(Behaviour::Echo));
    let request = ProofRequest {
        vault: Some(VaultDescriptor::new(Scalar::from(VAULT_SECRET))),
        ..fx.request()
    };

    let proof = prover.generate_snark_proof(&request).unwrap();
    assert!(proof.input[10].is_zero());
    assert!(proof.input[11].is_zero());
}

#[test]
fn test_request_zero_suppresses_proof_identifier() {
    let fx = Fixture::new();
    let prover = fx.prover(CountingEngine::new(Behaviour::Echo));
    let request = ProofRequest {
        request_identifier: None,
        ..fx.request()
    };

    let proof = prover.generate_snark_proof(&request).unwrap();
    assert!(proof.input[5].is_zero());
    assert!(proof.input[6].is_zero());
}

#[test]
fn test_comparator_behaviour() {
    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());

    let with_claim = |value: i64, comparator| ProofRequest {
        claim: Some(fx.claim(value, comparator)),
        ..fx.request()
    };

    let eq = prover
        .generate_snark_proof(&with_claim(4, ClaimComparator::Equal))
        .unwrap();
    assert_eq!(eq.input[9], Scalar::from(1u64));
    prover
        .generate_snark_proof(&with_claim(4, ClaimComparator::AtLeast))
        .unwrap();
    prover
        .generate_snark_proof(&with_claim(3, ClaimComparator::AtLeast))
        .unwrap();
    assert_eq!(engine.calls(), 3);

    let err = prover
        .generate_snark_proof(&with_claim(3, ClaimComparator::Equal))
        .unwrap_err();
    assert!(matches!(err, ProverError::ClaimNotEqualForComparatorEQ { .. }));

    let err = prover
        .generate_snark_proof(&with_claim(5, ClaimComparator::AtLeast))
        .unwrap_err();
    assert_eq!(err.to_string(), "Claim value 5 can't be superior to source value 4");

    let err = prover
        .generate_snark_proof(&with_claim(-1, ClaimComparator::AtLeast))
        .unwrap_err();
    assert!(matches!(err, ProverError::ClaimNotNegative { .. }));

    assert_eq!(engine.calls(), 3);
}

#[test]
fn test_disabled_verification_skips_receipt() {
    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());

    let garbage = [Scalar::from(1u64), Scalar::from(2u64), Scalar::from(3u64)];
    let request = ProofRequest {
        source: Some(AccountInput::committed(
            Fixture::source_identifier(),
            Scalar::from(VAULT_SECRET),
            garbage.clone(),
            false,
        )),
        ..fx.request()
    };
    let proof = prover.generate_snark_proof(&request).unwrap();
    assert!(proof.input[12].is_zero());

    // The receipt never reaches the circuit either
    let inputs = prover.generate_inputs(&request).unwrap();
    assert!(inputs
        .private
        .source_commitment_receipt
        .iter()
        .all(Scalar::is_zero));

    let enabled = ProofRequest {
        source: Some(AccountInput::committed(
            Fixture::source_identifier(),
            Scalar::from(VAULT_SECRET),
            garbage,
            true,
        )),
        ..fx.request()
    };
    let err = prover.generate_snark_proof(&enabled).unwrap_err();
    assert!(matches!(
        err,
        ProverError::InvalidCommitmentReceipt { side: Side::Source }
    ));
    assert_eq!(engine.calls(), 1);
}

#[test]
fn test_receipt_from_other_mapper_rejected() {
    let fx = Fixture::new();
    let prover = Prover::new(
        CommitmentMapper::from_seed(b"other-mapper").public_key(),
        CountingEngine::new(Behaviour::Echo),
    );
    let err = prover.generate_snark_proof(&fx.request()).unwrap_err();
    assert!(matches!(
        err,
        ProverError::InvalidCommitmentReceipt { side: Side::Source }
    ));
}

#[test]
fn test_vault_source_with_wrong_namespace() {
    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());

    let request = ProofRequest {
        source: Some(AccountInput::vault(
            hash(&[VAULT_SECRET, 777]),
            Scalar::from(VAULT_SECRET),
            Scalar::from(778u64),
            true,
        )),
        claim: None,
        ..fx.request()
    };
    let err = prover.generate_snark_proof(&request).unwrap_err();
    assert!(matches!(
        err,
        ProverError::InvalidNamespaceOrSecret { side: Side::Source }
    ));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_vault_source_with_matching_namespace() {
    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());

    let request = ProofRequest {
        source: Some(AccountInput::vault(
            hash(&[VAULT_SECRET, 777]),
            Scalar::from(VAULT_SECRET),
            Scalar::from(777u64),
            true,
        )),
        claim: None,
        ..fx.request()
    };
    let proof = prover.generate_snark_proof(&request).unwrap();
    assert_eq!(
        proof.input[6],
        hash_scalars(&[&hash(&[VAULT_SECRET, 777, 1]), &Scalar::from(REQUEST)])
    );
    assert!(proof.input[4].is_zero());
    assert_eq!(engine.calls(), 1);
}

#[test]
fn test_vault_account_secret_mismatch() {
    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());

    let request = ProofRequest {
        destination: Some(AccountInput::vault(
            hash(&[1, DESTINATION_NAMESPACE]),
            Scalar::from(1u64),
            Scalar::from(DESTINATION_NAMESPACE),
            true,
        )),
        ..fx.request()
    };
    let err = prover.generate_snark_proof(&request).unwrap_err();
    assert!(matches!(
        err,
        ProverError::SecretMismatch {
            side: Side::Destination
        }
    ));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_tree_height_mismatch_never_reaches_engine() {
    for (accounts_height, registry_height, which) in [
        (ACCOUNTS_TREE_HEIGHT - 1, REGISTRY_TREE_HEIGHT, TreeRole::Accounts),
        (ACCOUNTS_TREE_HEIGHT, REGISTRY_TREE_HEIGHT + 1, TreeRole::Registry),
    ] {
        let fx = Fixture::with_heights(accounts_height, registry_height);
        let engine = CountingEngine::new(Behaviour::Echo);
        let prover = fx.prover(engine.clone());

        let err = prover.generate_snark_proof(&fx.request()).unwrap_err();
        match err {
            ProverError::InvalidTreeHeight { which: got, .. } => assert_eq!(got, which),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(engine.calls(), 0);
    }
}

#[test]
fn test_membership_failures() {
    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());
    let hasher = Poseidon::new();

    let unregistered =
        KvMerkleTree::new(vec![(SOURCE, SOURCE_VALUE)], &hasher, Some(ACCOUNTS_TREE_HEIGHT))
            .unwrap();
    let request = ProofRequest {
        claim: Some(ClaimDescriptor::new(&unregistered, &fx.registry).with_value(1)),
        ..fx.request()
    };
    assert!(matches!(
        prover.generate_snark_proof(&request).unwrap_err(),
        ProverError::AccountsTreeNotInRegistryTree { .. }
    ));

    let request = ProofRequest {
        source: Some(AccountInput::committed(
            Scalar::from(0xdeadu64),
            Scalar::from(VAULT_SECRET),
            Default::default(),
            false,
        )),
        ..fx.request()
    };
    match prover.generate_snark_proof(&request).unwrap_err() {
        ProverError::SourceNotInAccountsTree { key } => {
            assert_eq!(key, "0x000000000000000000000000000000000000dead")
        }
        other => panic!("unexpected error: {other}"),
    }

    let request = ProofRequest {
        claim: Some(ClaimDescriptor {
            registry_tree: None,
            ..fx.claim(1, ClaimComparator::AtLeast)
        }),
        ..fx.request()
    };
    assert!(matches!(
        prover.generate_snark_proof(&request).unwrap_err(),
        ProverError::IncompleteClaimTrees {
            missing: TreeRole::Registry
        }
    ));

    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_source_identifier_overflow() {
    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());

    let request = ProofRequest {
        source: Some(AccountInput::committed(
            Scalar::from(field_modulus()),
            Scalar::from(VAULT_SECRET),
            Default::default(),
            false,
        )),
        claim: None,
        ..fx.request()
    };
    assert!(matches!(
        prover.generate_snark_proof(&request).unwrap_err(),
        ProverError::FieldOverflow {
            field: OverflowField::SourceIdentifier,
            ..
        }
    ));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_unreduced_public_scalars_rejected_before_proving() {
    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());

    let request = ProofRequest {
        extra_data: Some(Scalar::from(field_modulus())),
        ..fx.request()
    };
    assert!(prover.validate(&request).is_err());
    assert!(matches!(
        prover.generate_snark_proof(&request).unwrap_err(),
        ProverError::FieldOverflow {
            field: OverflowField::ExtraData,
            ..
        }
    ));

    let request = ProofRequest {
        request_identifier: Some(Scalar::from(field_modulus() + 5u32)),
        ..fx.request()
    };
    assert!(matches!(
        prover.generate_snark_proof(&request).unwrap_err(),
        ProverError::FieldOverflow {
            field: OverflowField::RequestIdentifier,
            ..
        }
    ));

    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_source_value_beyond_comparable_range() {
    let hasher = Poseidon::new();
    let large = (field_modulus() - 1u32) / 2u32 + 10u32;
    let accounts = KvMerkleTree::new(
        vec![(SOURCE, Scalar::from(large))],
        &hasher,
        Some(ACCOUNTS_TREE_HEIGHT),
    )
    .unwrap();
    let registry = KvMerkleTree::new(
        vec![(registry_key(&accounts.root()).as_str().to_string(), ACCOUNTS_TREE_VALUE)],
        &hasher,
        Some(REGISTRY_TREE_HEIGHT),
    )
    .unwrap();

    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());
    let request = ProofRequest {
        claim: Some(
            ClaimDescriptor::new(&accounts, &registry)
                .with_value(1)
                .with_comparator(ClaimComparator::AtLeast),
        ),
        ..fx.request()
    };

    assert!(matches!(
        prover.generate_snark_proof(&request).unwrap_err(),
        ProverError::SourceValueOutOfRange { .. }
    ));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_engine_failures_surface() {
    let fx = Fixture::new();

    let failing = fx.prover(CountingEngine::new(Behaviour::Fail));
    assert!(matches!(
        failing.generate_snark_proof(&fx.request()).unwrap_err(),
        ProverError::ProvingEngineFailure(ProofError::GenerationFailed(_))
    ));

    let reordering = fx.prover(CountingEngine::new(Behaviour::Reorder));
    assert!(matches!(
        reordering.generate_snark_proof(&fx.request()).unwrap_err(),
        ProverError::ProvingEngineFailure(ProofError::PublicSignalMismatch { index: 0, .. })
    ));
}

#[test]
fn test_minimal_request_proves() {
    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());

    let proof = prover.generate_snark_proof(&ProofRequest::default()).unwrap();
    assert!(proof.input[4].is_zero());
    assert!(proof.input[10].is_zero());
    assert_eq!(engine.calls(), 1);

    let inputs = prover.generate_inputs(&ProofRequest::default()).unwrap();
    assert_eq!(
        inputs.private.registry_merkle_path_elements.len(),
        ACCOUNTS_TREE_HEIGHT
    );
}

#[test]
fn test_generate_inputs_skips_validation() {
    let fx = Fixture::new();
    let engine = CountingEngine::new(Behaviour::Echo);
    let prover = fx.prover(engine.clone());

    let request = ProofRequest {
        claim: Some(fx.claim(100, ClaimComparator::Equal)),
        ..fx.request()
    };
    assert!(prover.validate(&request).is_err());

    let inputs = prover.generate_inputs(&request).unwrap();
    assert_eq!(inputs.public.claim_value, Scalar::from(100u64));
    assert_eq!(inputs.private.source_value, Scalar::from(SOURCE_VALUE));

    let json = inputs.to_json();
    assert_eq!(json["claimValue"], "100");
    assert_eq!(json["sourceValue"], "4");
    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_from_config_missing_proving_key() {
    let config = ProverConfig {
        commitment_mapper_pubkey: [Scalar::from(1u64), Scalar::from(2u64)],
        artifacts: CircuitArtifacts {
            circuit_path: "missing.r1cs".into(),
            proving_key_path: "definitely/missing/proving.key".into(),
        },
    };
    assert!(matches!(
        Prover::from_config(&config),
        Err(ProverError::ProvingEngineFailure(ProofError::Io(_)))
    ));
}
