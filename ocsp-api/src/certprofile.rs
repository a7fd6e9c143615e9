use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Include/exclude filter on certificate-profile labels.
///
/// A profile passes when it is in `includes` (or `includes` is absent) and
/// is not in `excludes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertprofileOption {
    #[serde(default)]
    pub includes: Option<BTreeSet<String>>,
    #[serde(default)]
    pub excludes: BTreeSet<String>,
}

impl CertprofileOption {
    pub fn new(includes: Option<BTreeSet<String>>, excludes: BTreeSet<String>) -> Self {
        Self { includes, excludes }
    }

    pub fn include(&self, certprofile: &str) -> bool {
        let included = self
            .includes
            .as_ref()
            .map_or(true, |includes| includes.contains(certprofile));
        included && !self.excludes.contains(certprofile)
    }
}
