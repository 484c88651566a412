//! Ledger-native transaction shapes
//!
//! The backend's QR endpoint accepts the transaction JSON exactly as the
//! ledger defines it (PascalCase fields, uppercase-hex memo data), so these
//! types serialize straight into the submitted body.

use crate::{Error, RegistrationDetails, Result};
use serde::{Deserialize, Serialize};

/// Drops per XRP
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Fixed registration fee, in XRP
pub const REGISTRATION_FEE_XRP: u64 = 1;

/// Memo text marking a registration-related transaction
pub const REGISTRATION_MEMO: &str = "Registration";

/// Memo text marking a sign-in challenge
pub const LOGIN_MEMO: &str = "Login";

/// Mint flag: token is burnable by the issuer
const NFT_FLAG_BURNABLE: u32 = 1;

/// Convert a UTF-8 string to the ledger's uppercase hex encoding
pub fn text_to_hex(text: &str) -> String {
    hex::encode_upper(text.as_bytes())
}

/// Decode the ledger's hex encoding back to UTF-8 text
pub fn hex_to_text(encoded: &str) -> Result<String> {
    let bytes = hex::decode(encoded)?;
    String::from_utf8(bytes).map_err(|e| Error::Deserialization(e.to_string()))
}

/// Convert whole XRP to a drops amount string
pub fn xrp_to_drops(xrp: u64) -> String {
    (xrp * DROPS_PER_XRP).to_string()
}

/// A single memo attached to a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoEntry {
    #[serde(rename = "Memo")]
    pub memo: Memo,
}

/// Memo payload, hex-encoded on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    #[serde(rename = "MemoData", default)]
    pub memo_data: String,
}

impl Memo {
    /// Build a memo from plain text
    pub fn from_text(text: &str) -> MemoEntry {
        MemoEntry {
            memo: Memo {
                memo_data: text_to_hex(text),
            },
        }
    }

    /// Decode the memo data back to text
    pub fn decode_text(&self) -> Result<String> {
        hex_to_text(&self.memo_data)
    }
}

/// The registration metadata serialized into the payment memo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationMemo {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub hospital: String,
}

impl RegistrationMemo {
    /// Wrap registration details with the memo type tag
    pub fn from_details(details: &RegistrationDetails) -> Self {
        Self {
            kind: REGISTRATION_MEMO.to_string(),
            name: details.name.clone(),
            hospital: details.hospital.clone(),
        }
    }
}

/// An unsigned transaction in the shape the ledger (and the signing
/// service) expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "TransactionType")]
pub enum TxPayload {
    /// Mint a record token whose URI names the subject account
    #[serde(rename = "NFTokenMint")]
    NfTokenMint {
        #[serde(rename = "Account")]
        account: String,
        #[serde(rename = "NFTokenTaxon")]
        taxon: u32,
        #[serde(rename = "Flags")]
        flags: u32,
        #[serde(rename = "URI")]
        uri: String,
        #[serde(rename = "Memos")]
        memos: Vec<MemoEntry>,
    },
    /// Fixed-fee registration payment to the oracle account
    #[serde(rename = "Payment")]
    Payment {
        #[serde(rename = "Account")]
        account: String,
        #[serde(rename = "Destination")]
        destination: String,
        #[serde(rename = "Amount")]
        amount: String,
        #[serde(rename = "Memos")]
        memos: Vec<MemoEntry>,
    },
    /// Sign-in challenge: carries no ledger effect, only a memo
    #[serde(rename = "SignIn")]
    SignIn {
        #[serde(rename = "Memos")]
        memos: Vec<MemoEntry>,
    },
}

impl TxPayload {
    /// Mint transaction for a subject's record token. The URI is the hex
    /// encoding of the subject address, which is how acceptance is later
    /// detected in the oracle's token list.
    pub fn record_mint(minter: impl Into<String>, subject: &str) -> Self {
        TxPayload::NfTokenMint {
            account: minter.into(),
            taxon: 0,
            flags: NFT_FLAG_BURNABLE,
            uri: text_to_hex(subject),
            memos: vec![Memo::from_text(REGISTRATION_MEMO)],
        }
    }

    /// Registration fee payment carrying the patient metadata memo
    pub fn registration_payment(
        account: impl Into<String>,
        oracle: impl Into<String>,
        details: &RegistrationDetails,
    ) -> Result<Self> {
        details.validate()?;
        let memo_json = serde_json::to_string(&RegistrationMemo::from_details(details))?;
        Ok(TxPayload::Payment {
            account: account.into(),
            destination: oracle.into(),
            amount: xrp_to_drops(REGISTRATION_FEE_XRP),
            memos: vec![Memo::from_text(&memo_json)],
        })
    }

    /// Sign-in challenge payload
    pub fn sign_in() -> Self {
        TxPayload::SignIn {
            memos: vec![Memo::from_text(LOGIN_MEMO)],
        }
    }
}
