//! # MedLedger Signing
//!
//! The sign-request lifecycle: every action that needs the user's key is
//! delegated to their mobile wallet app through a QR code.
//!
//! One request moves through three stages:
//! 1. **Initiation** ([`Initiator`]): a transaction payload is submitted to
//!    the backend, which answers with a QR image URL, a real-time channel
//!    URL, and a request id.
//! 2. **Waiting** ([`WaitChannel`]): the channel streams status messages
//!    while the user scans; a scan event carries the payload id.
//! 3. **Verification** ([`verify::confirm`]): the payload id is looked up
//!    with the backend to learn whether the user approved, and by whom.
//!
//! [`Workflows`] composes the stages into the registration, login, and
//! record-minting flows.

pub mod backend;
pub mod channel;
pub mod error;
pub mod initiator;
pub mod types;
pub mod verify;
pub mod workflow;

pub use backend::{ApprovalCheck, BackendConfig, HttpBackend, SigningBackend};
pub use channel::{
    ChannelConnector, EventSource, LogProgress, ProgressListener, WaitChannel, WaitOptions,
    WebSocketConnector, WebSocketSource,
};
pub use error::{Result, SignError};
pub use initiator::{Initiator, SignIntent};
pub use types::{LifecycleEvent, PayloadId, SignRequest, WaitOutcome};
pub use workflow::{CompletedRegistration, FlowOutcome, Workflows};

pub(crate) use types::parse_event;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
