//! Caller workflows
//!
//! The three user-facing flows are thin compositions of the same pipeline:
//! build an intent, initiate a sign request, show the QR, wait on the
//! real-time channel, and act on the outcome. A declined request is a
//! normal outcome, not an error; the caller resets and may try again.

use crate::{
    ChannelConnector, Initiator, LogProgress, ProgressListener, Result, SignIntent, SignRequest,
    SigningBackend, WaitChannel, WaitOptions, WaitOutcome, WebSocketConnector,
};
use medledger_core::{
    GeneratedAccount, MedicalRecord, RecordReference, RecordStore, RegistrationDetails,
    SealedRecord, SessionCipher, SessionClaims, SessionContext, TxHash,
};
use tracing::{info, warn};

/// Terminal result of one workflow attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome<T> {
    /// The user approved and the flow finished
    Completed(T),
    /// The user declined; the flow reset without side effects
    Declined,
    /// The channel, backend, or verification failed
    Failed {
        /// Failure description
        reason: String,
    },
}

impl<T> FlowOutcome<T> {
    /// Whether the flow finished
    pub fn is_completed(&self) -> bool {
        matches!(self, FlowOutcome::Completed(_))
    }
}

/// A finished registration: the generated account and, once the payment
/// settled, its transaction hash
#[derive(Debug)]
pub struct CompletedRegistration {
    /// The account the user imported and paid the fee from
    pub account: GeneratedAccount,
    /// Registration payment hash
    pub tx_id: Option<TxHash>,
}

/// The registration, login, and record-minting flows over one backend
pub struct Workflows<B: SigningBackend> {
    initiator: Initiator<B>,
    connector: Box<dyn ChannelConnector>,
    progress: Box<dyn ProgressListener>,
    options: WaitOptions,
}

impl<B: SigningBackend> Workflows<B> {
    /// Create workflows with the default websocket connector and log-based
    /// progress reporting
    pub fn new(initiator: Initiator<B>) -> Self {
        Self {
            initiator,
            connector: Box::new(WebSocketConnector),
            progress: Box::new(LogProgress),
            options: WaitOptions::default(),
        }
    }

    /// Replace the channel connector
    pub fn with_connector(mut self, connector: Box<dyn ChannelConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Replace the progress listener
    pub fn with_progress(mut self, progress: Box<dyn ProgressListener>) -> Self {
        self.progress = progress;
        self
    }

    /// Apply wait options to every flow
    pub fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Initiate an intent and wait for its resolution
    async fn resolve(&self, intent: &SignIntent) -> Result<WaitOutcome> {
        let request = self.initiator.initiate(intent).await?;
        self.progress.on_sign_request(&request);
        self.await_outcome(&request).await
    }

    async fn await_outcome(&self, request: &SignRequest) -> Result<WaitOutcome> {
        let source = self.connector.connect(&request.channel_url).await?;
        let channel = WaitChannel::new(source).with_options(self.options);
        Ok(channel
            .run(self.initiator.backend(), self.progress.as_ref())
            .await)
    }

    /// Register a new patient: generate an account for them, then ask for
    /// the fixed registration fee to be paid from it.
    ///
    /// The generated seed must be imported into the wallet app and the
    /// account funded before the QR code can be approved.
    pub async fn register(
        &self,
        details: RegistrationDetails,
    ) -> Result<FlowOutcome<CompletedRegistration>> {
        let account = GeneratedAccount::generate();
        info!(address = %account.address, "Generated registration account");

        let intent = SignIntent::RegistrationFee {
            account: account.address.clone(),
            details,
        };
        Ok(match self.resolve(&intent).await? {
            WaitOutcome::Approved { tx_id, .. } => {
                FlowOutcome::Completed(CompletedRegistration { account, tx_id })
            }
            WaitOutcome::Rejected => FlowOutcome::Declined,
            WaitOutcome::Failed { reason } => FlowOutcome::Failed { reason },
        })
    }

    /// Sign in with the wallet app and store the resulting session.
    ///
    /// The signer established by the approval is exchanged for an encrypted
    /// token blob, decrypted with the shared service key, and kept in the
    /// session context when the claims authorize the account.
    pub async fn login(
        &self,
        cipher: &SessionCipher,
        session: &SessionContext,
    ) -> Result<FlowOutcome<SessionClaims>> {
        let signer = match self.resolve(&SignIntent::SignIn).await? {
            WaitOutcome::Approved { signer, .. } => signer,
            WaitOutcome::Rejected => return Ok(FlowOutcome::Declined),
            WaitOutcome::Failed { reason } => return Ok(FlowOutcome::Failed { reason }),
        };

        let token = self.initiator.backend().sign_in(&signer).await?;
        let claims = cipher.decrypt_claims(&token).map_err(crate::SignError::Invalid)?;

        if !claims.is_authorized() {
            let reason = claims
                .error
                .unwrap_or_else(|| "signer is not a registered account".to_string());
            warn!(%signer, %reason, "Sign-in refused by the backend");
            return Ok(FlowOutcome::Failed { reason });
        }

        session.sign_in(token, claims.clone()).await;
        info!(%signer, role = ?claims.role, "Signed in");
        Ok(FlowOutcome::Completed(claims))
    }

    /// Mint a record token for a subject: seal the record, store it under
    /// its content id, then ask the administrator to approve the mint.
    ///
    /// The stored blob is removed again when the mint is not approved, so a
    /// declined or failed attempt leaves the store unchanged.
    pub async fn mint_record(
        &self,
        subject: &str,
        record: &MedicalRecord,
        passcode: &str,
        store: &dyn RecordStore,
    ) -> Result<FlowOutcome<RecordReference>> {
        let sealed = SealedRecord::seal(record, passcode).map_err(crate::SignError::Invalid)?;
        let content_id = sealed.content_id().map_err(crate::SignError::Invalid)?;
        store
            .store(&content_id, &sealed)
            .await
            .map_err(crate::SignError::Invalid)?;
        info!(%content_id, %subject, "Record sealed and stored");

        let intent = SignIntent::MintRecordToken {
            subject: subject.to_string(),
        };
        let outcome = self.resolve(&intent).await?;

        Ok(match outcome {
            WaitOutcome::Approved { tx_id, .. } => {
                let mut reference = RecordReference::new(&content_id, subject);
                if let Some(tx) = tx_id {
                    reference = reference.with_mint_tx(tx);
                }
                FlowOutcome::Completed(reference)
            }
            other => {
                if let Err(e) = store.delete(&content_id).await {
                    warn!(%content_id, error = %e, "Failed to remove unminted record");
                }
                match other {
                    WaitOutcome::Rejected => FlowOutcome::Declined,
                    WaitOutcome::Failed { reason } => FlowOutcome::Failed { reason },
                    WaitOutcome::Approved { .. } => unreachable!(),
                }
            }
        })
    }
}
