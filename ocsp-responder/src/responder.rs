use futures::future::join_all;
use ocsp_api::{CertprofileOption, StatusStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ResponderError, Result};
use crate::options::{RequestOption, ResponderOption, ResponseOption};
use crate::signer::ResponderSigner;

/// Audit certificate-type label used when no profile is known.
pub const UNKNOWN_CERT_TYPE: &str = "UNKNOWN";

/// Maps certificate profiles to the certificate-type label written to audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditOption {
    #[serde(default)]
    pub certprofile_mapping: HashMap<String, String>,
}

impl AuditOption {
    pub fn cert_type(&self, certprofile: Option<&str>) -> String {
        match certprofile {
            Some(profile) => self
                .certprofile_mapping
                .get(profile)
                .cloned()
                .unwrap_or_else(|| profile.to_string()),
            None => UNKNOWN_CERT_TYPE.to_string(),
        }
    }
}

/// One configured responder endpoint.
///
/// Immutable after construction; reconfiguration builds a new one.
pub struct Responder {
    name: String,
    option: ResponderOption,
    request_option: Arc<RequestOption>,
    response_option: Arc<ResponseOption>,
    signer: Arc<ResponderSigner>,
    stores: Vec<Arc<dyn StatusStore>>,
    audit_option: Option<Arc<AuditOption>>,
    certprofile_option: Option<Arc<CertprofileOption>>,
    servlet_paths: Vec<String>,
}

impl Responder {
    /// # Errors
    /// Returns an error when `stores` is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        option: ResponderOption,
        request_option: Arc<RequestOption>,
        response_option: Arc<ResponseOption>,
        signer: Arc<ResponderSigner>,
        stores: Vec<Arc<dyn StatusStore>>,
        audit_option: Option<Arc<AuditOption>>,
        certprofile_option: Option<Arc<CertprofileOption>>,
        servlet_paths: Vec<String>,
    ) -> Result<Self> {
        let name = name.into();
        if stores.is_empty() {
            return Err(ResponderError::InvalidConf(format!(
                "responder {name} references no store"
            )));
        }
        Ok(Self {
            name,
            option,
            request_option,
            response_option,
            signer,
            stores,
            audit_option,
            certprofile_option,
            servlet_paths,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn option(&self) -> &ResponderOption {
        &self.option
    }

    pub fn request_option(&self) -> &RequestOption {
        &self.request_option
    }

    pub fn response_option(&self) -> &ResponseOption {
        &self.response_option
    }

    pub fn signer(&self) -> &ResponderSigner {
        &self.signer
    }

    pub fn stores(&self) -> &[Arc<dyn StatusStore>] {
        &self.stores
    }

    pub fn audit_option(&self) -> Option<&AuditOption> {
        self.audit_option.as_deref()
    }

    pub fn certprofile_option(&self) -> Option<&CertprofileOption> {
        self.certprofile_option.as_deref()
    }

    pub fn servlet_paths(&self) -> &[String] {
        &self.servlet_paths
    }

    /// Healthy iff the signer and every referenced store are healthy.
    pub async fn health(&self) -> HealthCheckResult {
        let mut children = join_all(self.stores.iter().map(|store| async move {
            HealthCheckResult::leaf(format!("store:{}", store.name()), store.is_healthy().await)
        }))
        .await;
        children.push(HealthCheckResult::leaf(
            format!("signer:{}", self.signer.name()),
            self.signer.is_healthy(),
        ));

        HealthCheckResult {
            name: self.name.clone(),
            healthy: children.iter().all(|child| child.healthy),
            children,
        }
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("name", &self.name)
            .field("option", &self.option)
            .field("stores", &self.stores.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("servlet_paths", &self.servlet_paths)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HealthCheckResult>,
}

impl HealthCheckResult {
    pub fn leaf(name: impl Into<String>, healthy: bool) -> Self {
        Self {
            name: name.into(),
            healthy,
            children: Vec::new(),
        }
    }
}
