//! Package source descriptions.
//!
//! A [`RepoConfig`] describes one package repository: where it lives and
//! how its contents are verified. The engine never talks to a repository;
//! configs and their resolved checksums are handed in by the caller and
//! embedded opaquely into the package-install stage.
//!
//! # Wire compatibility
//!
//! Older executors exchanged repositories with a single `baseurl` string
//! that could carry several comma-joined URLs. The current shape is an
//! explicit `baseurls` list; serialization emits both so old readers keep
//! working, and deserialization accepts either, normalizing to the list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque repository-id → checksum mapping supplied by the resolver.
pub type Checksums = BTreeMap<String, String>;

/// One package source: location plus integrity metadata.
///
/// Identity is `id`. Configs are immutable once constructed; order is
/// significant wherever several configs are listed (first-listed wins on
/// a duplicate id within a scope).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RepoConfigWire", into = "RepoConfigWire")]
pub struct RepoConfig {
    pub id: String,
    pub name: String,
    pub base_urls: Vec<String>,
    pub metalink: Option<String>,
    pub mirrorlist: Option<String>,
    pub gpg_keys: Vec<String>,
    pub check_gpg: Option<bool>,
    pub priority: Option<i32>,
    pub enabled: Option<bool>,
}

/// On-wire shape of [`RepoConfig`], including the legacy `baseurl` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RepoConfigWire {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    baseurls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metalink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mirrorlist: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    gpgkeys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    check_gpg: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    /// Legacy single-URL field, comma-joined when several URLs exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    baseurl: Option<String>,
}

impl From<RepoConfigWire> for RepoConfig {
    fn from(wire: RepoConfigWire) -> Self {
        let base_urls = if !wire.baseurls.is_empty() {
            wire.baseurls
        } else {
            wire.baseurl
                .as_deref()
                .unwrap_or("")
                .split(',')
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect()
        };

        RepoConfig {
            id: wire.id,
            name: wire.name,
            base_urls,
            metalink: wire.metalink,
            mirrorlist: wire.mirrorlist,
            gpg_keys: wire.gpgkeys,
            check_gpg: wire.check_gpg,
            priority: wire.priority,
            enabled: wire.enabled,
        }
    }
}

impl From<RepoConfig> for RepoConfigWire {
    fn from(repo: RepoConfig) -> Self {
        let baseurl = if repo.base_urls.is_empty() {
            None
        } else {
            Some(repo.base_urls.join(","))
        };

        RepoConfigWire {
            id: repo.id,
            name: repo.name,
            baseurls: repo.base_urls,
            metalink: repo.metalink,
            mirrorlist: repo.mirrorlist,
            gpgkeys: repo.gpg_keys,
            check_gpg: repo.check_gpg,
            priority: repo.priority,
            enabled: repo.enabled,
            baseurl,
        }
    }
}

/// A resolved set of packages together with the repositories that supply
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackageSet {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepoConfig>,
}

impl PackageSet {
    /// Resolve an effective package set.
    ///
    /// The include list is `base ∪ additions` minus `excluded`; both lists
    /// come out sorted and deduplicated so two translations of identical
    /// input produce identical, diff-stable stages. Subtracting the
    /// exclusions guarantees no name appears on both sides.
    pub fn resolved<B: AsRef<str>, E: AsRef<str>>(
        base: &[B],
        additions: &[String],
        excluded: &[E],
    ) -> PackageSet {
        let mut exclude: Vec<String> = excluded.iter().map(|p| p.as_ref().to_string()).collect();
        exclude.sort();
        exclude.dedup();

        let mut include: Vec<String> = base
            .iter()
            .map(|p| p.as_ref().to_string())
            .chain(additions.iter().cloned())
            .filter(|p| exclude.binary_search(p).is_err())
            .collect();
        include.sort();
        include.dedup();

        PackageSet {
            include,
            exclude,
            repositories: Vec::new(),
        }
    }
}
