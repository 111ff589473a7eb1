use crate::bacen::Operation;
use crate::dict::{
    Account, AccountType, Claim, ClaimRef, ClaimResponse, ClaimStatus, ClaimType, DeleteEntryResponse, DictKey,
    DictRequest, DictResponse, Entry, EntryLookup, EntryResponse, KeyType, Owner, OwnerType, Portability,
    PortabilityResponse,
};
use crate::translate::wire::{self, WireAccount, WireOwner};
use crate::translate::{TranslationError, Translator};

/// Default DICT XML schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlTranslator;

impl XmlTranslator {
    pub fn new() -> Self {
        Self
    }
}

impl Translator for XmlTranslator {
    fn to_wire(&self, request: &DictRequest, correlation_id: &str) -> Result<String, TranslationError> {
        let request_id = correlation_id.to_string();
        let rendered = match request {
            DictRequest::CreateEntry(r) => quick_xml::se::to_string(&wire::CreateEntry {
                entry: wire::WireNewEntry {
                    key: r.key.value.clone(),
                    key_type: r.key.key_type.as_str().to_string(),
                    account: account_to_wire(&r.account),
                    owner: owner_to_wire(&r.owner),
                },
                reason: r.reason.clone(),
                // Caller idempotency key wins over the per-call correlation id.
                request_id: r.request_id.clone(),
            }),
            DictRequest::GetEntry(r) => {
                let mut get = wire::GetEntry {
                    key: None,
                    key_type: None,
                    entry_id: None,
                    external_id: None,
                    request_id,
                };
                match &r.lookup {
                    EntryLookup::EntryId(id) => get.entry_id = Some(id.clone()),
                    EntryLookup::ExternalId(id) => get.external_id = Some(id.clone()),
                    EntryLookup::Key(key) => {
                        get.key = Some(key.value.clone());
                        get.key_type = Some(key.key_type.as_str().to_string());
                    }
                }
                quick_xml::se::to_string(&get)
            }
            DictRequest::UpdateEntry(r) => quick_xml::se::to_string(&wire::UpdateEntry {
                entry_id: r.entry_id.clone(),
                new_account: account_to_wire(&r.new_account),
                reason: r.reason.clone(),
                request_id,
            }),
            DictRequest::DeleteEntry(r) => quick_xml::se::to_string(&wire::DeleteEntry {
                entry_id: r.entry_id.clone(),
                reason: r.reason.clone(),
                request_id,
            }),
            DictRequest::CreateClaim(r) => quick_xml::se::to_string(&wire::CreateClaim {
                claim: wire::WireNewClaim {
                    entry_id: r.entry_id.clone(),
                    kind: r.claim_type.as_str().to_string(),
                    key: r.key.value.clone(),
                    key_type: r.key.key_type.as_str().to_string(),
                    claimer_participant: r.claimer_ispb.clone(),
                    donor_participant: r.owner_ispb.clone(),
                    claimer_account: account_to_wire(&r.claimer_account),
                    completion_period_days: r.completion_period_days,
                },
                request_id,
            }),
            DictRequest::GetClaim(r) => claim_action("GetClaimRequest", &r.claim, None, None, request_id),
            DictRequest::ConfirmClaim(r) => {
                claim_action("ConfirmClaimRequest", &r.claim, r.reason.clone(), None, request_id)
            }
            DictRequest::CancelClaim(r) => {
                claim_action("CancelClaimRequest", &r.claim, Some(r.reason.clone()), None, request_id)
            }
            DictRequest::CompleteClaim(r) => claim_action(
                "CompleteClaimRequest",
                &r.claim,
                None,
                r.resolution_reason.clone(),
                request_id,
            ),
            DictRequest::InitiatePortability(r) => quick_xml::se::to_string(&wire::InitiatePortability {
                entry_id: r.entry_id.clone(),
                key: r.key.value.clone(),
                key_type: r.key.key_type.as_str().to_string(),
                new_account: account_to_wire(&r.new_account),
                request_id,
            }),
            DictRequest::ConfirmPortability(r) => quick_xml::se::to_string(&wire::ConfirmPortability {
                entry_id: r.entry_id.clone(),
                portability_id: r.portability_id.clone(),
                new_account: account_to_wire(&r.new_account),
                request_id,
            }),
            DictRequest::CancelPortability(r) => quick_xml::se::to_string(&wire::CancelPortability {
                entry_id: r.entry_id.clone(),
                portability_id: r.portability_id.clone(),
                reason: r.reason.clone(),
                request_id,
            }),
        };

        rendered.map_err(|e| TranslationError::Encode {
            operation: request.operation(),
            message: e.to_string(),
        })
    }

    fn from_wire(&self, operation: Operation, body: &[u8]) -> Result<DictResponse, TranslationError> {
        let text = std::str::from_utf8(body).map_err(|e| TranslationError::Decode {
            operation,
            message: e.to_string(),
        })?;
        let decode_err = |e: quick_xml::DeError| TranslationError::Decode {
            operation,
            message: e.to_string(),
        };

        match operation {
            Operation::CreateEntry | Operation::GetEntry | Operation::UpdateEntry => {
                let reply: wire::EntryReply = quick_xml::de::from_str(text).map_err(decode_err)?;
                Ok(DictResponse::Entry(EntryResponse {
                    entry: entry_from_wire(reply.entry)?,
                    response_time: reply.response_time,
                }))
            }
            Operation::DeleteEntry => {
                let reply: wire::DeleteReply = quick_xml::de::from_str(text).map_err(decode_err)?;
                Ok(DictResponse::Deleted(DeleteEntryResponse {
                    entry_id: reply.entry_id.or(reply.key).unwrap_or_default(),
                    deleted: reply.deleted,
                    response_time: reply.response_time,
                }))
            }
            Operation::CreateClaim
            | Operation::GetClaim
            | Operation::ConfirmClaim
            | Operation::CancelClaim
            | Operation::CompleteClaim => {
                let reply: wire::ClaimReply = quick_xml::de::from_str(text).map_err(decode_err)?;
                Ok(DictResponse::Claim(ClaimResponse {
                    claim: claim_from_wire(reply.claim)?,
                    response_time: reply.response_time,
                }))
            }
            Operation::InitiatePortability | Operation::ConfirmPortability | Operation::CancelPortability => {
                let reply: wire::PortabilityReply = quick_xml::de::from_str(text).map_err(decode_err)?;
                let p = reply.portability;
                Ok(DictResponse::Portability(PortabilityResponse {
                    portability: Portability {
                        portability_id: p.portability_id,
                        entry_id: p.entry_id,
                        status: claim_status(&p.status)?,
                        new_account: p.new_account.map(account_from_wire).transpose()?,
                        updated_at: p.last_modified,
                    },
                    response_time: reply.response_time,
                }))
            }
        }
    }
}

fn claim_action(
    root: &str,
    claim: &ClaimRef,
    reason: Option<String>,
    resolution_reason: Option<String>,
    request_id: String,
) -> Result<String, quick_xml::DeError> {
    let (claim_id, external_id) = match claim {
        ClaimRef::ClaimId(id) => (Some(id.clone()), None),
        ClaimRef::ExternalId(id) => (None, Some(id.clone())),
    };
    quick_xml::se::to_string_with_root(
        root,
        &wire::ClaimAction {
            claim_id,
            external_id,
            reason,
            resolution_reason,
            request_id,
        },
    )
}

fn account_to_wire(account: &Account) -> WireAccount {
    WireAccount {
        participant: account.participant.clone(),
        branch: account.branch.clone(),
        account_number: account.number.clone(),
        account_type: account.account_type.code().to_string(),
        opening_date: account.opening_date.clone(),
    }
}

fn owner_to_wire(owner: &Owner) -> WireOwner {
    WireOwner {
        kind: owner.owner_type.as_str().to_string(),
        tax_id_number: owner.tax_id.clone(),
        name: owner.name.clone(),
        trade_name: owner.trade_name.clone(),
    }
}

fn account_from_wire(account: WireAccount) -> Result<Account, TranslationError> {
    let account_type = AccountType::from_code(&account.account_type).ok_or(TranslationError::InvalidField {
        field: "AccountType",
        value: account.account_type.clone(),
    })?;
    Ok(Account {
        participant: account.participant,
        branch: account.branch,
        number: account.account_number,
        account_type,
        opening_date: account.opening_date,
    })
}

fn owner_from_wire(owner: WireOwner) -> Result<Owner, TranslationError> {
    let owner_type = OwnerType::parse(&owner.kind).ok_or(TranslationError::InvalidField {
        field: "Owner.Type",
        value: owner.kind.clone(),
    })?;
    Ok(Owner {
        owner_type,
        tax_id: owner.tax_id_number,
        name: owner.name,
        trade_name: owner.trade_name,
    })
}

fn key_from_wire(key_type: &str, value: String) -> Result<DictKey, TranslationError> {
    let key_type = key_type.parse::<KeyType>().map_err(|_| TranslationError::InvalidField {
        field: "KeyType",
        value: key_type.to_string(),
    })?;
    Ok(DictKey::new(key_type, value))
}

fn claim_status(status: &str) -> Result<ClaimStatus, TranslationError> {
    ClaimStatus::parse(status).ok_or(TranslationError::InvalidField {
        field: "Status",
        value: status.to_string(),
    })
}

fn entry_from_wire(entry: wire::WireEntry) -> Result<Entry, TranslationError> {
    Ok(Entry {
        entry_id: entry.entry_id,
        key: key_from_wire(&entry.key_type, entry.key)?,
        account: account_from_wire(entry.account)?,
        owner: owner_from_wire(entry.owner)?,
        created_at: entry.creation_time,
        key_owned_since: entry.key_ownership_date,
        updated_at: entry.last_modified_date,
    })
}

fn claim_from_wire(claim: wire::WireClaim) -> Result<Claim, TranslationError> {
    let claim_type = ClaimType::parse(&claim.kind).ok_or(TranslationError::InvalidField {
        field: "Claim.Type",
        value: claim.kind.clone(),
    })?;
    Ok(Claim {
        claim_id: claim.claim_id,
        claim_type,
        key: key_from_wire(&claim.key_type, claim.key)?,
        status: claim_status(&claim.status)?,
        donor_participant: claim.donor_participant,
        claimer_account: claim.claimer_account.map(account_from_wire).transpose()?,
        completion_period_end: claim.completion_period_end,
        resolution_period_end: claim.resolution_period_end,
        updated_at: claim.last_modified,
    })
}
