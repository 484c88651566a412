//! End-to-end workflow scenarios over scripted collaborators

mod common;

use common::{MockBackend, ScriptedConnector};
use medledger_core::{
    Gender, MedicalRecord, MemoryRecordStore, RecordStore, RegistrationDetails, SessionCipher,
    SessionClaims, SessionContext, UserRole,
};
use medledger_signing::{FlowOutcome, Initiator, Workflows};

const OPENED: &str = r#"{"opened": true}"#;
const SCANNED: &str = r#"{"payload_uuidv4": "abc"}"#;

fn workflows(backend: MockBackend, frames: &[&str]) -> Workflows<MockBackend> {
    Workflows::new(Initiator::new(backend, "rOracle"))
        .with_connector(Box::new(ScriptedConnector::new(frames)))
}

fn sample_record() -> MedicalRecord {
    MedicalRecord {
        name: "Alice".into(),
        age: 34,
        date_of_birth: "1992-03-14".into(),
        gender: Gender::Female,
        blood_type: "O+".into(),
        allergies: Some("penicillin".into()),
        attachment: b"scan.pdf contents".to_vec(),
    }
}

#[tokio::test]
async fn test_registration_completes_with_generated_account() {
    let flows = workflows(
        MockBackend::approving("rADDR", Some("T1")),
        &[OPENED, SCANNED],
    );

    let outcome = flows
        .register(RegistrationDetails::new("Alice", "St. Mary"))
        .await
        .unwrap();

    match outcome {
        FlowOutcome::Completed(registration) => {
            assert!(registration.account.address.starts_with('r'));
            assert!(registration.account.seed.starts_with("sEd"));
            assert_eq!(registration.tx_id.as_deref(), Some("T1"));
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_registration_decline_is_not_an_error() {
    let flows = workflows(MockBackend::declining(), &[OPENED, SCANNED]);

    let outcome = flows
        .register(RegistrationDetails::new("Alice", "St. Mary"))
        .await
        .unwrap();

    assert!(matches!(outcome, FlowOutcome::Declined));
}

#[tokio::test]
async fn test_login_stores_authorized_session() {
    let cipher = SessionCipher::new("service-key");
    let blob = cipher
        .encrypt_claims(&SessionClaims {
            error: None,
            role: Some(UserRole::Admin),
            address: Some("rADDR".into()),
        })
        .unwrap();

    let flows = workflows(
        MockBackend::approving("rADDR", None).with_token(&blob),
        &[OPENED, SCANNED],
    );
    let session = SessionContext::new();

    let outcome = flows.login(&cipher, &session).await.unwrap();

    match outcome {
        FlowOutcome::Completed(claims) => assert_eq!(claims.role, Some(UserRole::Admin)),
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(session.is_signed_in().await);
    assert_eq!(session.role().await, Some(UserRole::Admin));
    assert_eq!(session.current().await.unwrap().token, blob);
}

#[tokio::test]
async fn test_login_with_unregistered_signer_fails_without_session() {
    let cipher = SessionCipher::new("service-key");
    let blob = cipher
        .encrypt_claims(&SessionClaims {
            error: Some("unknown signer".into()),
            role: None,
            address: None,
        })
        .unwrap();

    let flows = workflows(
        MockBackend::approving("rUNKNOWN", None).with_token(&blob),
        &[SCANNED],
    );
    let session = SessionContext::new();

    let outcome = flows.login(&cipher, &session).await.unwrap();

    match outcome {
        FlowOutcome::Failed { reason } => assert_eq!(reason, "unknown signer"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!session.is_signed_in().await);
}

#[tokio::test]
async fn test_login_with_wrong_service_key_is_an_error() {
    let backend_cipher = SessionCipher::new("backend-key");
    let blob = backend_cipher
        .encrypt_claims(&SessionClaims {
            error: None,
            role: Some(UserRole::User),
            address: Some("rADDR".into()),
        })
        .unwrap();

    let flows = workflows(
        MockBackend::approving("rADDR", None).with_token(&blob),
        &[SCANNED],
    );
    let session = SessionContext::new();

    let result = flows.login(&SessionCipher::new("client-key"), &session).await;

    assert!(result.is_err());
    assert!(!session.is_signed_in().await);
}

#[tokio::test]
async fn test_mint_record_stores_blob_and_returns_reference() {
    let flows = workflows(
        MockBackend::approving("rOracle", Some("MINT1")),
        &[OPENED, SCANNED],
    );
    let store = MemoryRecordStore::new();

    let outcome = flows
        .mint_record("rSubject", &sample_record(), "passcode", &store)
        .await
        .unwrap();

    match outcome {
        FlowOutcome::Completed(reference) => {
            assert_eq!(reference.subject, "rSubject");
            assert_eq!(reference.mint_tx.as_deref(), Some("MINT1"));
            assert!(store.exists(&reference.content_id).await.unwrap());

            let sealed = store.load(&reference.content_id).await.unwrap();
            let record = sealed.unseal("passcode").unwrap();
            assert_eq!(record.name, "Alice");
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_mint_record_decline_leaves_store_empty() {
    let flows = workflows(MockBackend::declining(), &[SCANNED]);
    let store = MemoryRecordStore::new();

    let outcome = flows
        .mint_record("rSubject", &sample_record(), "passcode", &store)
        .await
        .unwrap();

    assert!(matches!(outcome, FlowOutcome::Declined));
    assert!(store.list().await.unwrap().is_empty());
}
