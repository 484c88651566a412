//! Types for the sign-request lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque payload identifier correlating a signing request with its
/// real-time channel and verification lookup
pub type PayloadId = String;

/// A signing request as returned by the backend's QR endpoint.
///
/// Created once per workflow action and discarded after resolution; a
/// retry creates a fresh request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignRequest {
    /// Payload identifier assigned by the signing service
    pub request_id: PayloadId,
    /// Renderable QR image URL
    pub qr_png: String,
    /// Real-time status channel URL
    pub channel_url: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Lifecycle events produced from inbound real-time messages.
///
/// Each event causes at most one side effect in the wait channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum LifecycleEvent {
    /// The QR code was opened on the device; informational only
    Opened,
    /// The request was scanned; approval status not yet known
    ScannedPendingApproval {
        /// Identifier to verify with the backend
        payload_id: PayloadId,
    },
    /// Verification confirmed the user approved
    ScannedApproved {
        /// Signer address
        signer: String,
        /// Ledger transaction id, when the request carried a transaction
        tx_id: Option<String>,
    },
    /// Verification confirmed the user declined
    ScannedRejected,
    /// An inbound message could not be parsed
    MalformedMessage {
        /// Parse failure description
        reason: String,
    },
}

/// Terminal value of exactly one wait-channel invocation; never reused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum WaitOutcome {
    /// The user approved and the request was signed
    Approved {
        /// Signer address
        signer: String,
        /// Ledger transaction id, when the request carried a transaction
        tx_id: Option<String>,
    },
    /// The user explicitly declined. Not an error: the workflow resets
    /// and may be retried by the user.
    Rejected,
    /// The channel or verification failed
    Failed {
        /// Failure description
        reason: String,
    },
}

impl WaitOutcome {
    /// Whether the request was approved
    pub fn is_approved(&self) -> bool {
        matches!(self, WaitOutcome::Approved { .. })
    }

    /// Whether the user declined
    pub fn is_rejected(&self) -> bool {
        matches!(self, WaitOutcome::Rejected)
    }

    /// Whether the channel failed
    pub fn is_failed(&self) -> bool {
        matches!(self, WaitOutcome::Failed { .. })
    }
}

/// Raw shape of a status-channel message
#[derive(Debug, Deserialize)]
struct ChannelMessage {
    #[serde(default)]
    payload_uuidv4: Option<String>,
    #[serde(default)]
    opened: Option<bool>,
}

/// Parse one inbound text frame into a lifecycle event.
///
/// Invalid JSON is `MalformedMessage`. Valid JSON carrying neither field
/// (heartbeats, expiry countdowns) yields `None` and is skipped.
pub(crate) fn parse_event(text: &str) -> Option<LifecycleEvent> {
    let message: ChannelMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return Some(LifecycleEvent::MalformedMessage {
                reason: e.to_string(),
            })
        }
    };

    if let Some(payload_id) = message.payload_uuidv4 {
        return Some(LifecycleEvent::ScannedPendingApproval { payload_id });
    }
    if message.opened == Some(true) {
        return Some(LifecycleEvent::Opened);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opened() {
        assert_eq!(
            parse_event(r#"{"opened": true}"#),
            Some(LifecycleEvent::Opened)
        );
    }

    #[test]
    fn test_parse_scanned() {
        assert_eq!(
            parse_event(r#"{"payload_uuidv4": "abc"}"#),
            Some(LifecycleEvent::ScannedPendingApproval {
                payload_id: "abc".into()
            })
        );
    }

    #[test]
    fn test_scanned_wins_over_opened() {
        // Both fields present: the payload id is the terminal-qualifying one.
        assert_eq!(
            parse_event(r#"{"opened": true, "payload_uuidv4": "abc"}"#),
            Some(LifecycleEvent::ScannedPendingApproval {
                payload_id: "abc".into()
            })
        );
    }

    #[test]
    fn test_parse_irrelevant_json_skipped() {
        assert_eq!(parse_event(r#"{"expires_in_seconds": 599}"#), None);
        assert_eq!(parse_event(r#"{"opened": false}"#), None);
    }

    #[test]
    fn test_parse_invalid_json_is_malformed() {
        match parse_event("not json") {
            Some(LifecycleEvent::MalformedMessage { .. }) => {}
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_outcome_predicates() {
        assert!(WaitOutcome::Approved {
            signer: "rADDR".into(),
            tx_id: Some("T1".into())
        }
        .is_approved());
        assert!(WaitOutcome::Rejected.is_rejected());
        assert!(WaitOutcome::Failed {
            reason: "boom".into()
        }
        .is_failed());
    }
}
