//! Read-only ledger queries
//!
//! The ledger itself is an external collaborator reached over its JSON-RPC
//! interface. Only the two calls backing the pending-registration listing
//! are wrapped here; signing and submission always go through the signing
//! service, never directly to the ledger.

use crate::tx::{hex_to_text, MemoEntry};
use crate::{Address, Error, RegistrationDetails, RegistrationRequest, Result, TxHash};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// A transaction as returned by the ledger's account history
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerTx {
    /// Transaction hash
    pub hash: TxHash,
    /// Sending account
    #[serde(rename = "Account")]
    pub account: Address,
    /// Transaction type tag
    #[serde(rename = "TransactionType")]
    pub tx_type: String,
    /// Attached memos
    #[serde(rename = "Memos", default)]
    pub memos: Vec<MemoEntry>,
}

/// A minted token held by an account
#[derive(Debug, Clone, Deserialize)]
pub struct AccountToken {
    /// Token id
    #[serde(rename = "NFTokenID")]
    pub token_id: String,
    /// Hex-encoded URI
    #[serde(rename = "URI", default)]
    pub uri: Option<String>,
}

/// Read access to an account's history and token holdings
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Most recent transactions sent to or from an account
    async fn account_transactions(&self, account: &str, limit: u32) -> Result<Vec<LedgerTx>>;

    /// Tokens currently held by an account
    async fn account_tokens(&self, account: &str) -> Result<Vec<AccountToken>>;
}

/// JSON-RPC implementation of [`LedgerClient`]
pub struct JsonRpcLedger {
    url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct RpcEnvelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct AccountTxResult {
    transactions: Vec<AccountTxEntry>,
}

#[derive(Deserialize)]
struct AccountTxEntry {
    tx: LedgerTx,
}

#[derive(Deserialize)]
struct AccountTokensResult {
    account_nfts: Vec<AccountToken>,
}

impl JsonRpcLedger {
    /// Create a client against a JSON-RPC endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let body = serde_json::json!({
            "method": method,
            "params": [params],
        });

        let envelope: RpcEnvelope<T> = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Ledger(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Ledger(e.to_string()))?;

        Ok(envelope.result)
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedger {
    async fn account_transactions(&self, account: &str, limit: u32) -> Result<Vec<LedgerTx>> {
        let result: AccountTxResult = self
            .call(
                "account_tx",
                serde_json::json!({ "account": account, "limit": limit }),
            )
            .await?;
        Ok(result.transactions.into_iter().map(|e| e.tx).collect())
    }

    async fn account_tokens(&self, account: &str) -> Result<Vec<AccountToken>> {
        let result: AccountTokensResult = self
            .call("account_nfts", serde_json::json!({ "account": account }))
            .await?;
        Ok(result.account_nfts)
    }
}

/// Reconstruct the oracle's registration queue.
///
/// A payment to the oracle whose memo decodes to registration metadata is a
/// request; it counts as accepted once the oracle holds a token whose URI
/// names the requesting account.
pub async fn pending_registrations(
    ledger: &dyn LedgerClient,
    oracle: &str,
) -> Result<Vec<RegistrationRequest>> {
    let transactions = ledger.account_transactions(oracle, 100).await?;
    let tokens = ledger.account_tokens(oracle).await?;

    let accepted: HashSet<String> = tokens
        .iter()
        .filter_map(|t| t.uri.as_deref())
        .filter_map(|uri| hex_to_text(uri).ok())
        .collect();

    let mut requests = Vec::new();
    for tx in transactions {
        // The oracle's own mints show up in its history too; only inbound
        // payments are registration requests.
        if tx.tx_type != "Payment" || tx.account == oracle {
            continue;
        }

        let details = tx
            .memos
            .first()
            .and_then(|entry| entry.memo.decode_text().ok())
            .and_then(|text| decode_registration_memo(&text));

        if details.is_none() {
            debug!(hash = %tx.hash, "Skipping payment without registration memo");
            continue;
        }

        requests.push(RegistrationRequest {
            accepted: accepted.contains(&tx.account),
            account: tx.account,
            details,
            tx_hash: tx.hash,
        });
    }

    Ok(requests)
}

fn decode_registration_memo(text: &str) -> Option<RegistrationDetails> {
    match serde_json::from_str::<crate::tx::RegistrationMemo>(text) {
        Ok(memo) if memo.kind == crate::tx::REGISTRATION_MEMO => {
            Some(RegistrationDetails::new(memo.name, memo.hospital))
        }
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "Unparsable memo in oracle history");
            None
        }
    }
}
