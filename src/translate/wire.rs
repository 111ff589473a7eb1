//! Element layout of the DICT XML messages.
//!
//! Root element names come from the struct `rename`; children are
//! PascalCase. Response structs ignore their root name and any element
//! they do not model (signatures, for instance).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireAccount {
    pub participant: String,
    #[serde(default)]
    pub branch: String,
    pub account_number: String,
    pub account_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireOwner {
    #[serde(rename = "Type")]
    pub kind: String,
    pub tax_id_number: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireNewEntry {
    pub key: String,
    pub key_type: String,
    pub account: WireAccount,
    pub owner: WireOwner,
}

#[derive(Debug, Serialize)]
#[serde(rename = "CreateEntryRequest", rename_all = "PascalCase")]
pub(crate) struct CreateEntry {
    pub entry: WireNewEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "GetEntryRequest", rename_all = "PascalCase")]
pub(crate) struct GetEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "UpdateEntryRequest", rename_all = "PascalCase")]
pub(crate) struct UpdateEntry {
    pub entry_id: String,
    pub new_account: WireAccount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "DeleteEntryRequest", rename_all = "PascalCase")]
pub(crate) struct DeleteEntry {
    pub entry_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireNewClaim {
    pub entry_id: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub key: String,
    pub key_type: String,
    pub claimer_participant: String,
    pub donor_participant: String,
    pub claimer_account: WireAccount,
    pub completion_period_days: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename = "CreateClaimRequest", rename_all = "PascalCase")]
pub(crate) struct CreateClaim {
    pub claim: WireNewClaim,
    pub request_id: String,
}

/// Shared shape of the get/confirm/cancel/complete claim requests.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ClaimAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_reason: Option<String>,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "InitiatePortabilityRequest", rename_all = "PascalCase")]
pub(crate) struct InitiatePortability {
    pub entry_id: String,
    pub key: String,
    pub key_type: String,
    pub new_account: WireAccount,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "ConfirmPortabilityRequest", rename_all = "PascalCase")]
pub(crate) struct ConfirmPortability {
    pub entry_id: String,
    pub portability_id: String,
    pub new_account: WireAccount,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "CancelPortabilityRequest", rename_all = "PascalCase")]
pub(crate) struct CancelPortability {
    pub entry_id: String,
    pub portability_id: String,
    pub reason: String,
    pub request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireEntry {
    #[serde(default)]
    pub entry_id: Option<String>,
    pub key: String,
    pub key_type: String,
    pub account: WireAccount,
    pub owner: WireOwner,
    #[serde(default)]
    pub creation_time: Option<String>,
    #[serde(default)]
    pub key_ownership_date: Option<String>,
    #[serde(default)]
    pub last_modified_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EntryReply {
    #[serde(default)]
    pub response_time: Option<String>,
    pub entry: WireEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DeleteReply {
    #[serde(default)]
    pub response_time: Option<String>,
    pub deleted: bool,
    #[serde(default)]
    pub entry_id: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireClaim {
    pub claim_id: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub key: String,
    pub key_type: String,
    pub status: String,
    #[serde(default)]
    pub donor_participant: String,
    #[serde(default)]
    pub claimer_account: Option<WireAccount>,
    #[serde(default)]
    pub completion_period_end: Option<String>,
    #[serde(default)]
    pub resolution_period_end: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ClaimReply {
    #[serde(default)]
    pub response_time: Option<String>,
    pub claim: WireClaim,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WirePortability {
    pub portability_id: String,
    #[serde(default)]
    pub entry_id: String,
    pub status: String,
    #[serde(default)]
    pub new_account: Option<WireAccount>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PortabilityReply {
    #[serde(default)]
    pub response_time: Option<String>,
    pub portability: WirePortability,
}
