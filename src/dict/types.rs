//! DICT domain values shared by requests and responses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::observability::mask;

/// A request field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        Self {
            field: field.to_string(),
            reason: "is required".to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::required(field))
    } else {
        Ok(())
    }
}

fn all_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Validate an 8-digit participant ISPB.
pub(crate) fn validate_ispb(field: &str, value: &str) -> Result<(), ValidationError> {
    require(field, value)?;
    if all_digits(value, 8) {
        Ok(())
    } else {
        Err(ValidationError::invalid(field, "must be an 8-digit ISPB"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyType {
    Cpf,
    Cnpj,
    Email,
    Phone,
    Evp,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Cpf => "CPF",
            KeyType::Cnpj => "CNPJ",
            KeyType::Email => "EMAIL",
            KeyType::Phone => "PHONE",
            KeyType::Evp => "EVP",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPF" => Ok(KeyType::Cpf),
            "CNPJ" => Ok(KeyType::Cnpj),
            "EMAIL" => Ok(KeyType::Email),
            "PHONE" => Ok(KeyType::Phone),
            "EVP" => Ok(KeyType::Evp),
            other => Err(ValidationError::invalid("key_type", format!("unknown key type '{}'", other))),
        }
    }
}

/// A DICT key (the value a payer types to reach an account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictKey {
    pub key_type: KeyType,
    pub value: String,
}

impl DictKey {
    pub fn new(key_type: KeyType, value: impl Into<String>) -> Self {
        Self {
            key_type,
            value: value.into(),
        }
    }

    /// Check the value against the format of its key type.
    pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
        require(field, &self.value)?;
        let value = self.value.as_str();
        let ok = match self.key_type {
            KeyType::Cpf => all_digits(value, 11),
            KeyType::Cnpj => all_digits(value, 14),
            KeyType::Email => {
                value.len() <= 77
                    && value
                        .split_once('@')
                        .map_or(false, |(local, domain)| !local.is_empty() && !domain.is_empty())
            }
            KeyType::Phone => {
                let digits = value.strip_prefix('+').unwrap_or("");
                (2..=15).contains(&digits.len())
                    && digits.bytes().all(|b| b.is_ascii_digit())
                    && !digits.starts_with('0')
            }
            KeyType::Evp => value.len() == 36 && Uuid::parse_str(value).is_ok(),
        };
        if ok {
            Ok(())
        } else {
            Err(ValidationError::invalid(
                field,
                format!("not a valid {} key", self.key_type),
            ))
        }
    }

    /// Masked rendering for logs.
    pub fn masked(&self) -> String {
        format!("{}:{}", self.key_type, mask(&self.value))
    }
}

/// Account type, carried on the wire as its ISO code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Checking,
    Savings,
    Payment,
    Salary,
}

impl AccountType {
    pub fn code(&self) -> &'static str {
        match self {
            AccountType::Checking => "CACC",
            AccountType::Savings => "SVGS",
            AccountType::Payment => "TRAN",
            AccountType::Salary => "SLRY",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CACC" => Some(AccountType::Checking),
            "SVGS" => Some(AccountType::Savings),
            "TRAN" => Some(AccountType::Payment),
            "SLRY" => Some(AccountType::Salary),
            _ => None,
        }
    }
}

/// Account a key points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// ISPB of the account-holding participant.
    pub participant: String,
    pub branch: String,
    pub number: String,
    pub account_type: AccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_date: Option<String>,
}

impl Account {
    /// ISPB and account number are always required; branch only when asked.
    pub fn validate(&self, field: &str, require_branch: bool) -> Result<(), ValidationError> {
        validate_ispb(&format!("{}.participant", field), &self.participant)?;
        require(&format!("{}.number", field), &self.number)?;
        if require_branch {
            require(&format!("{}.branch", field), &self.branch)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerType {
    NaturalPerson,
    LegalPerson,
}

impl OwnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::NaturalPerson => "NATURAL_PERSON",
            OwnerType::LegalPerson => "LEGAL_PERSON",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NATURAL_PERSON" => Some(OwnerType::NaturalPerson),
            "LEGAL_PERSON" => Some(OwnerType::LegalPerson),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub owner_type: OwnerType,
    /// CPF for natural persons, CNPJ for legal persons.
    pub tax_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_name: Option<String>,
}

impl Owner {
    pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
        let tax_field = format!("{}.tax_id", field);
        require(&tax_field, &self.tax_id)?;
        let expected = match self.owner_type {
            OwnerType::NaturalPerson => 11,
            OwnerType::LegalPerson => 14,
        };
        if !all_digits(&self.tax_id, expected) {
            return Err(ValidationError::invalid(
                &tax_field,
                format!("must have {} digits", expected),
            ));
        }
        require(&format!("{}.name", field), &self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimType {
    Ownership,
    Portability,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Ownership => "OWNERSHIP",
            ClaimType::Portability => "PORTABILITY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OWNERSHIP" => Some(ClaimType::Ownership),
            "PORTABILITY" => Some(ClaimType::Portability),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Open,
    WaitingResolution,
    Confirmed,
    Cancelled,
    Completed,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Open => "OPEN",
            ClaimStatus::WaitingResolution => "WAITING_RESOLUTION",
            ClaimStatus::Confirmed => "CONFIRMED",
            ClaimStatus::Cancelled => "CANCELLED",
            ClaimStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(ClaimStatus::Open),
            "WAITING_RESOLUTION" => Some(ClaimStatus::WaitingResolution),
            "CONFIRMED" => Some(ClaimStatus::Confirmed),
            "CANCELLED" => Some(ClaimStatus::Cancelled),
            "COMPLETED" | "COMPLETE" => Some(ClaimStatus::Completed),
            _ => None,
        }
    }
}

/// How a claim is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRef {
    ClaimId(String),
    ExternalId(String),
}

impl ClaimRef {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ClaimRef::ClaimId(id) => require("claim_id", id),
            ClaimRef::ExternalId(id) => require("external_id", id),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ClaimRef::ClaimId(id) | ClaimRef::ExternalId(id) => id,
        }
    }
}

/// How an entry is looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryLookup {
    EntryId(String),
    ExternalId(String),
    Key(DictKey),
}

impl EntryLookup {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            EntryLookup::EntryId(id) => require("entry_id", id),
            EntryLookup::ExternalId(id) => require("external_id", id),
            EntryLookup::Key(key) => key.validate("key"),
        }
    }

    /// Masked rendering for logs.
    pub fn masked(&self) -> String {
        match self {
            EntryLookup::EntryId(id) => format!("entry:{}", id),
            EntryLookup::ExternalId(id) => format!("external:{}", id),
            EntryLookup::Key(key) => key.masked(),
        }
    }
}

/// A directory entry as reported by the counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    pub key: DictKey,
    pub account: Account,
    pub owner: Owner,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_owned_since: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: String,
    pub claim_type: ClaimType,
    pub key: DictKey,
    pub status: ClaimStatus,
    pub donor_participant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimer_account: Option<Account>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_period_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_period_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portability {
    pub portability_id: String,
    pub entry_id: String,
    pub status: ClaimStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_account: Option<Account>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        let valid = [
            (KeyType::Cpf, "12345678901"),
            (KeyType::Cnpj, "12345678000199"),
            (KeyType::Email, "ana@example.com"),
            (KeyType::Phone, "+5511987654321"),
            (KeyType::Evp, "123e4567-e89b-12d3-a456-426614174000"),
        ];
        for (key_type, value) in valid {
            assert!(DictKey::new(key_type, value).validate("key").is_ok(), "{} {}", key_type, value);
        }

        let invalid = [
            (KeyType::Cpf, "1234567890"),
            (KeyType::Cpf, "123.456.789-01"),
            (KeyType::Cnpj, "12345678901"),
            (KeyType::Email, "ana.example.com"),
            (KeyType::Email, "@example.com"),
            (KeyType::Phone, "5511987654321"),
            (KeyType::Phone, "+0511987654321"),
            (KeyType::Evp, "not-a-uuid"),
            (KeyType::Evp, "123e4567e89b12d3a456426614174000"),
        ];
        for (key_type, value) in invalid {
            let err = DictKey::new(key_type, value).validate("key").unwrap_err();
            assert_eq!(err.field, "key");
        }

        assert_eq!(
            DictKey::new(KeyType::Cpf, " ").validate("key").unwrap_err(),
            ValidationError::required("key")
        );
    }

    #[test]
    fn test_key_type_parsing() {
        assert_eq!("email".parse::<KeyType>().unwrap(), KeyType::Email);
        assert!("IBAN".parse::<KeyType>().is_err());
    }

    #[test]
    fn test_masked_key_hides_value() {
        let key = DictKey::new(KeyType::Cpf, "12345678901");
        assert_eq!(key.masked(), "CPF:12****01");
    }

    #[test]
    fn test_account_and_owner_rules() {
        let account = Account {
            participant: "1234567".to_string(),
            branch: String::new(),
            number: "0001".to_string(),
            account_type: AccountType::Checking,
            opening_date: None,
        };
        assert_eq!(account.validate("account", false).unwrap_err().field, "account.participant");

        let account = Account { participant: "12345678".to_string(), ..account };
        assert!(account.validate("account", false).is_ok());
        assert_eq!(account.validate("account", true).unwrap_err().field, "account.branch");

        let owner = Owner {
            owner_type: OwnerType::LegalPerson,
            tax_id: "12345678901".to_string(),
            name: "Acme".to_string(),
            trade_name: None,
        };
        assert_eq!(owner.validate("owner").unwrap_err().field, "owner.tax_id");
    }

    #[test]
    fn test_codes_round_trip() {
        for t in [AccountType::Checking, AccountType::Savings, AccountType::Payment, AccountType::Salary] {
            assert_eq!(AccountType::from_code(t.code()), Some(t));
        }
        assert_eq!(ClaimStatus::parse("COMPLETE"), Some(ClaimStatus::Completed));
    }
}
