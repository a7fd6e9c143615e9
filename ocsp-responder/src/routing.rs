//! Maps request paths to responders by longest configured prefix.

use std::collections::HashSet;

use crate::error::{ResponderError, Result};

#[derive(Debug, Clone, Default)]
pub struct PathTable {
    /// `(path, responder index)`, longest path first.
    entries: Vec<(String, usize)>,
}

impl PathTable {
    /// # Errors
    /// Returns an error when two responders claim the same path.
    pub fn new(mounts: impl IntoIterator<Item = (String, usize)>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (path, index) in mounts {
            let path = normalize(&path);
            if !seen.insert(path.clone()) {
                return Err(ResponderError::InvalidConf(format!(
                    "servlet path '{path}' is used by more than one responder"
                )));
            }
            entries.push((path, index));
        }
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Ok(Self { entries })
    }

    /// Index of the responder mounted at the longest prefix of `path`.
    pub fn resolve(&self, path: &str) -> Option<usize> {
        let path = normalize(path);
        self.entries
            .iter()
            .find(|(prefix, _)| matches_prefix(&path, prefix))
            .map(|(_, index)| *index)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Prefix match on whole path segments; `/` matches everything.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
