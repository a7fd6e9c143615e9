use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::hash::HashAlgorithm;

/// Outcome a store reports for a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertStatus {
    Good,
    Revoked,
    /// The issuer is known but the serial is not.
    Unknown,
    /// The store does not serve this issuer; another store may.
    IssuerUnknown,
    /// The store deliberately declines to vouch for this certificate.
    Ignore,
}

impl fmt::Display for CertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CertStatus::Good => "good",
            CertStatus::Revoked => "revoked",
            CertStatus::Unknown => "unknown",
            CertStatus::IssuerUnknown => "issuer_unknown",
            CertStatus::Ignore => "ignore",
        };
        f.write_str(text)
    }
}

/// CRL reason codes (RFC 5280 section 5.3.1). Code 7 is unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CrlReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

impl CrlReason {
    pub fn code(self) -> u8 {
        match self {
            CrlReason::Unspecified => 0,
            CrlReason::KeyCompromise => 1,
            CrlReason::CaCompromise => 2,
            CrlReason::AffiliationChanged => 3,
            CrlReason::Superseded => 4,
            CrlReason::CessationOfOperation => 5,
            CrlReason::CertificateHold => 6,
            CrlReason::RemoveFromCrl => 8,
            CrlReason::PrivilegeWithdrawn => 9,
            CrlReason::AaCompromise => 10,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CrlReason::Unspecified),
            1 => Some(CrlReason::KeyCompromise),
            2 => Some(CrlReason::CaCompromise),
            3 => Some(CrlReason::AffiliationChanged),
            4 => Some(CrlReason::Superseded),
            5 => Some(CrlReason::CessationOfOperation),
            6 => Some(CrlReason::CertificateHold),
            8 => Some(CrlReason::RemoveFromCrl),
            9 => Some(CrlReason::PrivilegeWithdrawn),
            10 => Some(CrlReason::AaCompromise),
            _ => None,
        }
    }
}

impl FromStr for CrlReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "unspecified" => Ok(CrlReason::Unspecified),
            "keycompromise" => Ok(CrlReason::KeyCompromise),
            "cacompromise" => Ok(CrlReason::CaCompromise),
            "affiliationchanged" => Ok(CrlReason::AffiliationChanged),
            "superseded" => Ok(CrlReason::Superseded),
            "cessationofoperation" => Ok(CrlReason::CessationOfOperation),
            "certificatehold" => Ok(CrlReason::CertificateHold),
            "removefromcrl" => Ok(CrlReason::RemoveFromCrl),
            "privilegewithdrawn" => Ok(CrlReason::PrivilegeWithdrawn),
            "aacompromise" => Ok(CrlReason::AaCompromise),
            _ => Err(format!("unknown CRL reason: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationInfo {
    pub reason: CrlReason,
    pub revocation_time: DateTime<Utc>,
    #[serde(default)]
    pub invalidity_time: Option<DateTime<Utc>>,
}

impl RevocationInfo {
    pub fn new(reason: CrlReason, revocation_time: DateTime<Utc>) -> Self {
        Self {
            reason,
            revocation_time,
            invalidity_time: None,
        }
    }

    #[must_use]
    pub fn with_invalidity_time(mut self, invalidity_time: DateTime<Utc>) -> Self {
        self.invalidity_time = Some(invalidity_time);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertHash {
    pub algorithm: HashAlgorithm,
    pub value: Vec<u8>,
}

/// Identifies the CRL an answer was derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrlId {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

/// A store's answer for one query.
///
/// Revocation details are present exactly when the status is
/// [`CertStatus::Revoked`]; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertStatusInfo {
    status: CertStatus,
    revocation: Option<RevocationInfo>,
    cert_hash: Option<CertHash>,
    this_update: Option<DateTime<Utc>>,
    next_update: Option<DateTime<Utc>>,
    archive_cutoff: Option<DateTime<Utc>>,
    crl_id: Option<CrlId>,
    certprofile: Option<String>,
}

impl CertStatusInfo {
    fn with_status(
        status: CertStatus,
        this_update: Option<DateTime<Utc>>,
        next_update: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            status,
            revocation: None,
            cert_hash: None,
            this_update,
            next_update,
            archive_cutoff: None,
            crl_id: None,
            certprofile: None,
        }
    }

    pub fn good(this_update: Option<DateTime<Utc>>, next_update: Option<DateTime<Utc>>) -> Self {
        Self::with_status(CertStatus::Good, this_update, next_update)
    }

    pub fn revoked(
        revocation: RevocationInfo,
        this_update: Option<DateTime<Utc>>,
        next_update: Option<DateTime<Utc>>,
    ) -> Self {
        let mut info = Self::with_status(CertStatus::Revoked, this_update, next_update);
        info.revocation = Some(revocation);
        info
    }

    pub fn unknown(this_update: Option<DateTime<Utc>>, next_update: Option<DateTime<Utc>>) -> Self {
        Self::with_status(CertStatus::Unknown, this_update, next_update)
    }

    pub fn issuer_unknown(
        this_update: Option<DateTime<Utc>>,
        next_update: Option<DateTime<Utc>>,
    ) -> Self {
        Self::with_status(CertStatus::IssuerUnknown, this_update, next_update)
    }

    pub fn ignore(this_update: Option<DateTime<Utc>>, next_update: Option<DateTime<Utc>>) -> Self {
        Self::with_status(CertStatus::Ignore, this_update, next_update)
    }

    /// Replaces the status with REVOKED, keeping every other field.
    #[must_use]
    pub fn into_revoked(mut self, revocation: RevocationInfo) -> Self {
        self.status = CertStatus::Revoked;
        self.revocation = Some(revocation);
        self
    }

    #[must_use]
    pub fn with_cert_hash(mut self, algorithm: HashAlgorithm, value: Vec<u8>) -> Self {
        self.cert_hash = Some(CertHash { algorithm, value });
        self
    }

    #[must_use]
    pub fn with_archive_cutoff(mut self, archive_cutoff: DateTime<Utc>) -> Self {
        self.archive_cutoff = Some(archive_cutoff);
        self
    }

    #[must_use]
    pub fn with_crl_id(mut self, crl_id: CrlId) -> Self {
        self.crl_id = Some(crl_id);
        self
    }

    #[must_use]
    pub fn with_certprofile(mut self, certprofile: impl Into<String>) -> Self {
        self.certprofile = Some(certprofile.into());
        self
    }

    pub fn status(&self) -> CertStatus {
        self.status
    }

    pub fn revocation(&self) -> Option<&RevocationInfo> {
        self.revocation.as_ref()
    }

    pub fn cert_hash(&self) -> Option<&CertHash> {
        self.cert_hash.as_ref()
    }

    /// `None` when the store did not set it; the responder substitutes "now".
    pub fn this_update(&self) -> Option<DateTime<Utc>> {
        self.this_update
    }

    pub fn next_update(&self) -> Option<DateTime<Utc>> {
        self.next_update
    }

    pub fn archive_cutoff(&self) -> Option<DateTime<Utc>> {
        self.archive_cutoff
    }

    pub fn crl_id(&self) -> Option<&CrlId> {
        self.crl_id.as_ref()
    }

    pub fn certprofile(&self) -> Option<&str> {
        self.certprofile.as_deref()
    }
}
