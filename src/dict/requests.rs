//! Caller-facing requests and responses for each DICT operation.

use serde::{Deserialize, Serialize};

use crate::bacen::Operation;
use crate::observability::redact::mask;
use crate::dict::types::{
    require, validate_ispb, Account, Claim, ClaimRef, ClaimType, DictKey, Entry, EntryLookup, Owner,
    Portability, ValidationError,
};

/// Completion period the counterparty mandates for every claim.
pub const CLAIM_COMPLETION_PERIOD_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEntryRequest {
    /// Caller idempotency key.
    pub request_id: String,
    pub key: DictKey,
    pub account: Account,
    pub owner: Owner,
    #[serde(default)]
    pub reason: Option<String>,
}

impl CreateEntryRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("request_id", &self.request_id)?;
        self.key.validate("key")?;
        self.account.validate("account", false)?;
        self.owner.validate("owner")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetEntryRequest {
    pub lookup: EntryLookup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEntryRequest {
    pub entry_id: String,
    pub new_account: Account,
    #[serde(default)]
    pub reason: Option<String>,
}

impl UpdateEntryRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("entry_id", &self.entry_id)?;
        self.new_account.validate("new_account", false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEntryRequest {
    pub entry_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateClaimRequest {
    pub entry_id: String,
    pub key: DictKey,
    pub claim_type: ClaimType,
    pub claimer_ispb: String,
    pub owner_ispb: String,
    pub claimer_account: Account,
    #[serde(default = "default_completion_period")]
    pub completion_period_days: u32,
}

fn default_completion_period() -> u32 {
    CLAIM_COMPLETION_PERIOD_DAYS
}

impl CreateClaimRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("entry_id", &self.entry_id)?;
        self.key.validate("key")?;
        validate_ispb("claimer_ispb", &self.claimer_ispb)?;
        validate_ispb("owner_ispb", &self.owner_ispb)?;
        self.claimer_account.validate("claimer_account", false)?;
        if self.completion_period_days != CLAIM_COMPLETION_PERIOD_DAYS {
            return Err(ValidationError::invalid(
                "completion_period_days",
                format!("must be {}", CLAIM_COMPLETION_PERIOD_DAYS),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetClaimRequest {
    pub claim: ClaimRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmClaimRequest {
    pub claim: ClaimRef,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelClaimRequest {
    pub claim: ClaimRef,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteClaimRequest {
    pub claim: ClaimRef,
    #[serde(default)]
    pub resolution_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatePortabilityRequest {
    pub entry_id: String,
    pub key: DictKey,
    pub new_account: Account,
}

impl InitiatePortabilityRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("entry_id", &self.entry_id)?;
        self.key.validate("key")?;
        self.new_account.validate("new_account", true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPortabilityRequest {
    pub entry_id: String,
    pub portability_id: String,
    pub new_account: Account,
}

impl ConfirmPortabilityRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("entry_id", &self.entry_id)?;
        require("portability_id", &self.portability_id)?;
        self.new_account.validate("new_account", false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPortabilityRequest {
    pub entry_id: String,
    pub portability_id: String,
    pub reason: String,
}

impl CancelPortabilityRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("entry_id", &self.entry_id)?;
        require("portability_id", &self.portability_id)?;
        require("reason", &self.reason)
    }
}

/// Any operation request, as handed to the translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DictRequest {
    CreateEntry(CreateEntryRequest),
    GetEntry(GetEntryRequest),
    UpdateEntry(UpdateEntryRequest),
    DeleteEntry(DeleteEntryRequest),
    CreateClaim(CreateClaimRequest),
    GetClaim(GetClaimRequest),
    ConfirmClaim(ConfirmClaimRequest),
    CancelClaim(CancelClaimRequest),
    CompleteClaim(CompleteClaimRequest),
    InitiatePortability(InitiatePortabilityRequest),
    ConfirmPortability(ConfirmPortabilityRequest),
    CancelPortability(CancelPortabilityRequest),
}

impl DictRequest {
    pub fn operation(&self) -> Operation {
        match self {
            DictRequest::CreateEntry(_) => Operation::CreateEntry,
            DictRequest::GetEntry(_) => Operation::GetEntry,
            DictRequest::UpdateEntry(_) => Operation::UpdateEntry,
            DictRequest::DeleteEntry(_) => Operation::DeleteEntry,
            DictRequest::CreateClaim(_) => Operation::CreateClaim,
            DictRequest::GetClaim(_) => Operation::GetClaim,
            DictRequest::ConfirmClaim(_) => Operation::ConfirmClaim,
            DictRequest::CancelClaim(_) => Operation::CancelClaim,
            DictRequest::CompleteClaim(_) => Operation::CompleteClaim,
            DictRequest::InitiatePortability(_) => Operation::InitiatePortability,
            DictRequest::ConfirmPortability(_) => Operation::ConfirmPortability,
            DictRequest::CancelPortability(_) => Operation::CancelPortability,
        }
    }

    /// Check required fields and formats before anything leaves the process.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            DictRequest::CreateEntry(r) => r.validate(),
            DictRequest::GetEntry(r) => r.lookup.validate(),
            DictRequest::UpdateEntry(r) => r.validate(),
            DictRequest::DeleteEntry(r) => require("entry_id", &r.entry_id),
            DictRequest::CreateClaim(r) => r.validate(),
            DictRequest::GetClaim(r) => r.claim.validate(),
            DictRequest::ConfirmClaim(r) => r.claim.validate(),
            DictRequest::CancelClaim(r) => {
                r.claim.validate()?;
                require("reason", &r.reason)
            }
            DictRequest::CompleteClaim(r) => r.claim.validate(),
            DictRequest::InitiatePortability(r) => r.validate(),
            DictRequest::ConfirmPortability(r) => r.validate(),
            DictRequest::CancelPortability(r) => r.validate(),
        }
    }

    /// Log-safe description of what the request targets.
    pub fn log_summary(&self) -> String {
        match self {
            DictRequest::CreateEntry(r) => format!("key={}", r.key.masked()),
            DictRequest::GetEntry(r) => format!("lookup={}", r.lookup.masked()),
            DictRequest::UpdateEntry(r) => format!("entry_id={}", r.entry_id),
            DictRequest::DeleteEntry(r) => format!("entry_id={}", r.entry_id),
            DictRequest::CreateClaim(r) => format!("entry_id={} key={}", r.entry_id, r.key.masked()),
            DictRequest::GetClaim(r) => format!("claim={}", r.claim.id()),
            DictRequest::ConfirmClaim(r) => format!("claim={}", r.claim.id()),
            DictRequest::CancelClaim(r) => format!("claim={}", r.claim.id()),
            DictRequest::CompleteClaim(r) => format!("claim={}", r.claim.id()),
            DictRequest::InitiatePortability(r) => format!("entry_id={} key={}", r.entry_id, r.key.masked()),
            DictRequest::ConfirmPortability(r) => format!("portability_id={}", r.portability_id),
            DictRequest::CancelPortability(r) => format!("portability_id={}", r.portability_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryResponse {
    pub entry: Entry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEntryResponse {
    pub entry_id: String,
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub claim: Claim,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortabilityResponse {
    pub portability: Portability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
}

/// Any operation response, as produced by the translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DictResponse {
    Entry(EntryResponse),
    Deleted(DeleteEntryResponse),
    Claim(ClaimResponse),
    Portability(PortabilityResponse),
}

impl DictResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            DictResponse::Entry(_) => "entry",
            DictResponse::Deleted(_) => "deleted",
            DictResponse::Claim(_) => "claim",
            DictResponse::Portability(_) => "portability",
        }
    }

    /// Identifier of the record the response describes, for events.
    pub fn subject_id(&self) -> Option<&str> {
        match self {
            DictResponse::Entry(r) => r.entry.entry_id.as_deref(),
            DictResponse::Deleted(r) => Some(&r.entry_id),
            DictResponse::Claim(r) => Some(&r.claim.claim_id),
            DictResponse::Portability(r) => Some(&r.portability.portability_id),
        }
    }

    /// Event body for the response: identifiers and states in clear, key
    /// values and account numbers masked, owner identity left out.
    pub fn event_payload(&self) -> serde_json::Value {
        match self {
            DictResponse::Entry(r) => serde_json::json!({
                "kind": self.kind(),
                "entry_id": r.entry.entry_id,
                "key": r.entry.key.masked(),
                "participant": r.entry.account.participant,
                "account_number": mask(&r.entry.account.number),
                "response_time": r.response_time,
            }),
            DictResponse::Deleted(r) => serde_json::json!({
                "kind": self.kind(),
                "entry_id": r.entry_id,
                "deleted": r.deleted,
                "response_time": r.response_time,
            }),
            DictResponse::Claim(r) => serde_json::json!({
                "kind": self.kind(),
                "claim_id": r.claim.claim_id,
                "claim_type": r.claim.claim_type.as_str(),
                "status": r.claim.status.as_str(),
                "key": r.claim.key.masked(),
                "donor_participant": r.claim.donor_participant,
                "response_time": r.response_time,
            }),
            DictResponse::Portability(r) => serde_json::json!({
                "kind": self.kind(),
                "portability_id": r.portability.portability_id,
                "entry_id": r.portability.entry_id,
                "status": r.portability.status.as_str(),
                "response_time": r.response_time,
            }),
        }
    }

    pub fn into_entry(self) -> Result<EntryResponse, Self> {
        match self {
            DictResponse::Entry(r) => Ok(r),
            other => Err(other),
        }
    }

    pub fn into_deleted(self) -> Result<DeleteEntryResponse, Self> {
        match self {
            DictResponse::Deleted(r) => Ok(r),
            other => Err(other),
        }
    }

    pub fn into_claim(self) -> Result<ClaimResponse, Self> {
        match self {
            DictResponse::Claim(r) => Ok(r),
            other => Err(other),
        }
    }

    pub fn into_portability(self) -> Result<PortabilityResponse, Self> {
        match self {
            DictResponse::Portability(r) => Ok(r),
            other => Err(other),
        }
    }
}
