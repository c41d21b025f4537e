mod common;

use std::sync::Arc;

use airdrop_claim_core::{
    ClaimCommand, ClaimDestination, ExternalAccountAddress, Orchestrator, PortError,
    ProviderRegistry, SessionState,
};

use common::{signer, wallet, MockClaimService, MockProvider, ACCOUNT_KEY, OTHER_KEY};

type TestOrchestrator = Orchestrator<MockProvider, MockClaimService>;

fn destination() -> ClaimDestination {
    ClaimDestination::for_user("e476187f6ddfeb9d588c7b45d3df334d5501d6499b3f9ad5595cae86cce16a65", "0xowner")
}

fn orchestrator(service: MockClaimService) -> TestOrchestrator {
    Orchestrator::new(ProviderRegistry::new(), service, "app-1", destination())
}

#[test]
fn claim_signs_envelope_and_submits_mutation() {
    let service = MockClaimService::default();
    let orch = orchestrator(service.clone());
    let provider = MockProvider::signing_with(ACCOUNT_KEY);
    orch.registry.announce(wallet("one", provider.clone()));

    let result = orch.handle(ClaimCommand::Authorize).expect("authorize");
    assert!(matches!(result.session, SessionState::Authorized { .. }));
    assert!(orch.claim_enabled("token"));
    assert!(!orch.claim_enabled("  "));

    let result = orch
        .handle(ClaimCommand::Claim {
            api_token: "token".to_owned(),
        })
        .expect("claim");
    let receipt = result.receipt.expect("claim returns a receipt");
    assert_eq!(receipt.0, vec![1, 2, 3]);
    assert_eq!(receipt.to_hex(), "0x010203");
    assert!(!orch.is_claiming());

    let submitted = service.submitted.lock().expect("lock").clone();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].destination, destination());
    assert_eq!(submitted[0].api_token, "token");

    let envelope = airdrop_claim_core::build_envelope("app-1", &destination());
    let recovered = envelope
        .recover_signer(&submitted[0].signature)
        .expect("recover");
    assert_eq!(recovered, signer(ACCOUNT_KEY).address());
    assert_eq!(
        provider.calls(),
        vec!["eth_requestAccounts".to_owned(), "eth_signTypedData_v4".to_owned()]
    );
}

#[test]
fn no_providers_keeps_claim_disabled() {
    let orch = orchestrator(MockClaimService::default());
    let result = orch.handle(ClaimCommand::SyncProviders).expect("sync");
    assert_eq!(result.session, SessionState::Unselected);
    assert_eq!(orch.authorize().expect("authorize"), None);
    assert!(!orch.claim_enabled("token"));
}

#[test]
fn claim_before_authorization_fails_fast() {
    let service = MockClaimService::default();
    let orch = orchestrator(service.clone());
    orch.registry
        .announce(wallet("one", MockProvider::signing_with(ACCOUNT_KEY)));
    orch.sync_providers().expect("sync");

    let err = orch.claim("token").expect_err("precondition");
    assert!(matches!(err, PortError::Precondition(_)));
    assert!(!orch.is_claiming());
    assert!(service.submitted.lock().expect("lock").is_empty());
}

#[test]
fn blank_api_token_is_refused_before_signing() {
    let service = MockClaimService::default();
    let orch = orchestrator(service.clone());
    let provider = MockProvider::signing_with(ACCOUNT_KEY);
    orch.registry.announce(wallet("one", provider.clone()));
    orch.authorize().expect("authorize");

    for token in ["", "   "] {
        let err = orch.claim(token).expect_err("blank token");
        assert_eq!(err, PortError::Precondition("claim requires an API token"));
    }
    let err = orch
        .handle(ClaimCommand::Claim {
            api_token: String::new(),
        })
        .expect_err("blank token");
    assert!(matches!(err, PortError::Precondition(_)));

    assert!(service.submitted.lock().expect("lock").is_empty());
    assert_eq!(provider.calls(), vec!["eth_requestAccounts".to_owned()]);
    assert!(!orch.is_claiming());
    assert!(orch.claim_enabled("token"));
}

#[test]
fn rejected_signature_sends_no_mutation() {
    let service = MockClaimService::default();
    let orch = orchestrator(service.clone());
    let provider = MockProvider::signing_with(ACCOUNT_KEY);
    orch.registry.announce(wallet("one", provider.clone()));
    let account = orch.authorize().expect("authorize").expect("account");

    provider.reject_signing();
    let err = orch.claim("token").expect_err("rejected");
    assert!(matches!(err, PortError::Rejected(_)));
    assert!(service.submitted.lock().expect("lock").is_empty());
    assert_eq!(orch.account().expect("account"), Some(account));
    assert!(!orch.is_claiming());
    assert!(orch.claim_enabled("token"));
}

#[test]
fn signature_from_another_key_is_not_submitted() {
    let service = MockClaimService::default();
    let orch = orchestrator(service.clone());
    let provider = MockProvider::signing_with(ACCOUNT_KEY);
    orch.registry.announce(wallet("one", provider.clone()));
    orch.authorize().expect("authorize");

    provider.set_signer(OTHER_KEY);
    let err = orch.claim("token").expect_err("wrong signer");
    assert!(matches!(err, PortError::Validation(_)));
    assert!(service.submitted.lock().expect("lock").is_empty());
}

#[test]
fn graphql_errors_are_surfaced_without_retry() {
    let service = MockClaimService {
        fail_with: Some(PortError::GraphQl(vec!["already claimed".to_owned()])),
        ..MockClaimService::default()
    };
    let orch = orchestrator(service);
    orch.registry
        .announce(wallet("one", MockProvider::signing_with(ACCOUNT_KEY)));
    orch.authorize().expect("authorize");

    let err = orch.claim("token").expect_err("graphql error");
    assert_eq!(err.to_string(), "graphql errors: already claimed");
    assert!(!orch.is_claiming());
}

#[test]
fn second_claim_is_refused_while_one_is_in_flight() {
    let orch = orchestrator(MockClaimService::default());
    orch.registry
        .announce(wallet("one", MockProvider::signing_with(ACCOUNT_KEY)));
    orch.authorize().expect("authorize");

    let prepared = orch.prepare_claim("token").expect("prepare");
    assert!(!orch.claim_enabled("token"));
    let err = orch.prepare_claim("token").expect_err("in flight");
    assert!(matches!(err, PortError::Policy(_)));

    let err = orch
        .signed_claim(prepared, Err(PortError::Timeout(10)))
        .expect_err("timeout");
    assert_eq!(err, PortError::Timeout(10));
    assert!(orch.claim_enabled("token"));
}

#[test]
fn authorization_is_shared_across_threads_without_double_requests() {
    let provider = MockProvider::with_accounts(vec!["0x1111111111111111111111111111111111111111"]);
    let orch = Arc::new(orchestrator(MockClaimService::default()));
    orch.registry.announce(wallet("one", provider.clone()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let orch = Arc::clone(&orch);
            std::thread::spawn(move || orch.authorize().expect("authorize"))
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    assert_eq!(
        orch.account().expect("account"),
        Some(ExternalAccountAddress::parse("0x1111111111111111111111111111111111111111").expect("addr"))
    );
    // Callers that find the slot taken skip the wallet entirely.
    assert_eq!(provider.calls().len(), 1);
}
