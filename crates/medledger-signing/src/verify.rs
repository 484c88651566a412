//! Approval verification
//!
//! Scan events only say that the user interacted with the request; whether
//! they approved is established by a backend lookup keyed on the payload id.

use crate::{PayloadId, SigningBackend, WaitOutcome};
use tracing::{info, warn};

/// Resolve a scanned request into its terminal outcome.
///
/// A `signed: false` answer is an explicit decline and maps to `Rejected`,
/// never `Failed`. An unreachable backend maps to `Failed`.
pub async fn confirm(backend: &dyn SigningBackend, payload_id: &PayloadId) -> WaitOutcome {
    match backend.check_approval(payload_id).await {
        Ok(check) if check.signed => match check.signer {
            Some(signer) => {
                info!(%payload_id, %signer, "Sign request approved");
                WaitOutcome::Approved {
                    signer,
                    tx_id: check.txid,
                }
            }
            // Signed but unattributable; treating it as approved would
            // hand out a session for an unknown address.
            None => WaitOutcome::Failed {
                reason: "approval response carried no signer address".to_string(),
            },
        },
        Ok(_) => {
            info!(%payload_id, "Sign request rejected by the user");
            WaitOutcome::Rejected
        }
        Err(e) => {
            warn!(%payload_id, error = %e, "Approval verification failed");
            WaitOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}
