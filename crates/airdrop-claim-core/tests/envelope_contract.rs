mod common;

use alloy::signers::SignerSync;
use serde_json::json;

use airdrop_claim_core::{
    build_envelope, build_mutation_variables, ClaimDestination, ClaimEnvelope, GraphQlRequest,
    PortError, AIRDROP_CLAIM_MUTATION,
};

use common::{signer, ACCOUNT_KEY};

fn claimer() -> ClaimDestination {
    ClaimDestination::new("C", "User:0xabc")
}

#[test]
fn envelope_is_deterministic() {
    let a = build_envelope("X", &claimer());
    let b = build_envelope("X", &claimer());
    assert_eq!(a, b);
    assert_eq!(a.signing_hash(), b.signing_hash());
    assert_eq!(
        serde_json::to_string(&a).expect("json"),
        serde_json::to_string(&b).expect("json")
    );
}

#[test]
fn envelope_matches_typed_data_contract() {
    let envelope = build_envelope("X", &claimer());
    let value = envelope.to_json().expect("json");
    assert_eq!(
        value,
        json!({
            "types": {
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "chainId", "type": "uint256"}
                ],
                "AirDropClaim": [
                    {"name": "appId", "type": "string"},
                    {"name": "claimer", "type": "FungibleAccount"}
                ],
                "FungibleAccount": [
                    {"name": "chainId", "type": "string"},
                    {"name": "owner", "type": "string"}
                ]
            },
            "primaryType": "AirDropClaim",
            "domain": {
                "name": "Linera AirDrop demo",
                "version": "0.0.1",
                "chainId": 1
            },
            "message": {
                "appId": "X",
                "claimer": {"chainId": "C", "owner": "User:0xabc"}
            }
        })
    );
}

#[test]
fn signing_hash_depends_on_every_message_field() {
    let base = build_envelope("X", &claimer()).signing_hash();
    assert_ne!(base, build_envelope("Y", &claimer()).signing_hash());
    assert_ne!(
        base,
        build_envelope("X", &ClaimDestination::new("D", "User:0xabc")).signing_hash()
    );
    assert_ne!(
        base,
        build_envelope("X", &ClaimDestination::new("C", "User:0xABC")).signing_hash()
    );
}

#[test]
fn signer_is_recovered_from_wallet_signature() {
    let wallet = signer(ACCOUNT_KEY);
    let envelope = build_envelope("X", &claimer());
    let signature = wallet
        .sign_hash_sync(&envelope.signing_hash())
        .expect("sign");
    let hex = format!("0x{}", alloy::hex::encode(signature.as_bytes()));

    let recovered = envelope.recover_signer(&hex).expect("recover");
    assert_eq!(recovered, wallet.address());

    let other = build_envelope("other-app", &claimer());
    assert_ne!(other.recover_signer(&hex).expect("recover"), wallet.address());
}

#[test]
fn garbage_signature_is_a_validation_error() {
    let envelope = build_envelope("X", &claimer());
    let err = envelope.recover_signer("0xnothex").expect_err("bad hex");
    assert!(matches!(err, PortError::Validation(_)));
    let err = envelope.recover_signer("0x1234").expect_err("short");
    assert!(matches!(err, PortError::Validation(_)));
}

#[test]
fn tampered_domain_is_rejected_on_parse() {
    let mut value = build_envelope("X", &claimer()).to_json().expect("json");
    value["domain"]["chainId"] = json!(5);
    let err = ClaimEnvelope::from_json(&value).expect_err("tampered");
    assert!(matches!(err, PortError::Validation(_)));

    let mut value = build_envelope("X", &claimer()).to_json().expect("json");
    value["types"]["FungibleAccount"]
        .as_array_mut()
        .expect("fields")
        .push(json!({"name": "extra", "type": "string"}));
    assert!(ClaimEnvelope::from_json(&value).is_err());
}

#[test]
fn mutation_variables_keep_owner_verbatim() {
    let destination = ClaimDestination::for_user("chain", "0xAbCd000000000000000000000000000000000001 ");
    assert_eq!(
        destination.owner,
        "User:0xAbCd000000000000000000000000000000000001 "
    );

    let vars = build_mutation_variables("0xsig", destination.clone(), "token-1");
    assert_eq!(vars.destination, destination);
    assert_eq!(
        serde_json::to_value(&vars).expect("json"),
        json!({
            "destination": {
                "chainId": "chain",
                "owner": "User:0xAbCd000000000000000000000000000000000001 "
            },
            "signature": "0xsig",
            "apiToken": "token-1"
        })
    );
}

#[test]
fn graphql_request_carries_claim_mutation() {
    let vars = build_mutation_variables("0xsig", claimer(), "tok");
    let request = GraphQlRequest::claim(&vars).expect("request");
    let body = serde_json::to_value(&request).expect("json");
    assert_eq!(body["query"], json!(AIRDROP_CLAIM_MUTATION));
    assert_eq!(body["operationName"], json!("AirDropClaim"));
    assert_eq!(body["variables"]["apiToken"], json!("tok"));
    assert!(AIRDROP_CLAIM_MUTATION.contains("$apiToken: String!"));
}
