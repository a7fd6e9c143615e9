//! Status resolution across the ordered stores of a responder.

use chrono::{DateTime, Utc};
use ocsp_api::{
    CertStatus, CertStatusInfo, CrlReason, RevocationInfo, StatusOptions, StatusQuery, StatusStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error};

/// Answer chosen for one query.
pub struct Resolved<'a> {
    pub info: CertStatusInfo,
    /// Store that produced a definitive answer; `None` for ISSUER_UNKNOWN.
    pub store: Option<&'a Arc<dyn StatusStore>>,
}

/// Asks each store in order; the first answer other than ISSUER_UNKNOWN wins.
///
/// Returns `None` when no store produced any answer and at least one of them
/// failed or timed out.
pub async fn resolve_status<'a>(
    stores: &'a [Arc<dyn StatusStore>],
    now: DateTime<Utc>,
    query: &StatusQuery,
    options: &StatusOptions<'_>,
    deadline: Duration,
) -> Option<Resolved<'a>> {
    let mut issuer_unknown: Option<CertStatusInfo> = None;
    let mut failures = 0usize;

    for store in stores {
        match timeout(deadline, store.cert_status(now, query, options)).await {
            Ok(Ok(Some(info))) if info.status() != CertStatus::IssuerUnknown => {
                debug!(store = %store.name(), serial = %query.serial, status = %info.status(), "Store answered");
                return Some(Resolved {
                    info,
                    store: Some(store),
                });
            }
            Ok(Ok(Some(info))) => {
                issuer_unknown.get_or_insert(info);
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                failures += 1;
                error!(store = %store.name(), serial = %query.serial, error = %e, "Status store failed");
            }
            Err(_) => {
                failures += 1;
                error!(store = %store.name(), serial = %query.serial, timeout = ?deadline, "Status store timed out");
            }
        }
    }

    match issuer_unknown {
        Some(info) => Some(Resolved { info, store: None }),
        None if failures > 0 => None,
        None => Some(Resolved {
            info: CertStatusInfo::issuer_unknown(Some(now), None),
            store: None,
        }),
    }
}

/// Applies the revocation of the issuing CA to an entry's answer.
///
/// GOOD and UNKNOWN become REVOKED; a REVOKED entry is only replaced when it
/// was revoked strictly after the CA. The reason is always CA compromise.
pub fn inherit_ca_revocation(info: CertStatusInfo, ca: &RevocationInfo) -> CertStatusInfo {
    let replace = match info.status() {
        CertStatus::Good | CertStatus::Unknown => true,
        CertStatus::Revoked => info
            .revocation()
            .is_some_and(|own| own.revocation_time > ca.revocation_time),
        CertStatus::IssuerUnknown | CertStatus::Ignore => false,
    };
    if !replace {
        return info;
    }

    let inherited = RevocationInfo {
        reason: CrlReason::CaCompromise,
        revocation_time: ca.revocation_time,
        invalidity_time: ca.invalidity_time,
    };
    info.into_revoked(inherited)
}
