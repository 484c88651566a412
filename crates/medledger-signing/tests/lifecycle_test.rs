//! Wait-channel lifecycle behavior over scripted channels

mod common;

use common::{MockBackend, ScriptedConnector};
use medledger_signing::{LogProgress, WaitChannel, WaitOutcome};
use std::sync::atomic::Ordering;

const OPENED: &str = r#"{"opened": true}"#;
const SCANNED: &str = r#"{"payload_uuidv4": "abc"}"#;

#[tokio::test]
async fn test_scan_resolves_approved_and_closes_once() {
    let connector = ScriptedConnector::new(&[OPENED, SCANNED]);
    let backend = MockBackend::approving("rADDR", Some("T1"));

    let outcome = WaitChannel::new(connector.source())
        .run(&backend, &LogProgress)
        .await;

    assert_eq!(
        outcome,
        WaitOutcome::Approved {
            signer: "rADDR".into(),
            tx_id: Some("T1".into())
        }
    );
    assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    assert_eq!(backend.verify_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_duplicate_scan_events_verify_once() {
    // The first scan event resolves the channel; later duplicates are
    // never consumed.
    let connector = ScriptedConnector::new(&[OPENED, SCANNED, SCANNED, SCANNED]);
    let backend = MockBackend::approving("rADDR", None);

    let outcome = WaitChannel::new(connector.source())
        .run(&backend, &LogProgress)
        .await;

    assert!(outcome.is_approved());
    assert_eq!(backend.verify_calls.load(Ordering::SeqCst), 1);
    assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unsigned_verification_is_rejected() {
    let connector = ScriptedConnector::new(&[SCANNED]);
    let backend = MockBackend::declining();

    let outcome = WaitChannel::new(connector.source())
        .run(&backend, &LogProgress)
        .await;

    // An explicit decline is never reported as a failure.
    assert_eq!(outcome, WaitOutcome::Rejected);
    assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_frame_fails_without_verification() {
    let connector = ScriptedConnector::new(&[OPENED, "{not json"]);
    let backend = MockBackend::approving("rADDR", None);

    let outcome = WaitChannel::new(connector.source())
        .run(&backend, &LogProgress)
        .await;

    assert!(outcome.is_failed());
    assert_eq!(backend.verify_calls.load(Ordering::SeqCst), 0);
    assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_heartbeats_before_scan_are_skipped() {
    let connector = ScriptedConnector::new(&[
        r#"{"expires_in_seconds": 599}"#,
        OPENED,
        r#"{"expires_in_seconds": 598}"#,
        SCANNED,
    ]);
    let backend = MockBackend::approving("rADDR", Some("T1"));

    let outcome = WaitChannel::new(connector.source())
        .run(&backend, &LogProgress)
        .await;

    assert!(outcome.is_approved());
}

#[tokio::test]
async fn test_channel_end_without_terminal_event_fails() {
    let connector = ScriptedConnector::new(&[OPENED]);
    let backend = MockBackend::approving("rADDR", None);

    let outcome = WaitChannel::new(connector.source())
        .run(&backend, &LogProgress)
        .await;

    assert_eq!(
        outcome,
        WaitOutcome::Failed {
            reason: "channel closed before a terminal event".into()
        }
    );
    assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
}
