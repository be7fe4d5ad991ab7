//! Blueprints: the user-facing description of image customizations.
//!
//! A blueprint is a TOML document naming extra packages and an optional
//! set of customizations. Every customization field is independently
//! optional, and the translator maps *presence* to stage emission: an
//! absent field means "emit no corresponding stage", never "emit the
//! stage with defaults". An empty list inside a present field is a third
//! state (e.g. a timezone with no NTP servers yields a timezone stage but
//! no time-sync stage), so nothing here conflates a zero value with
//! absence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A parsed blueprint. Read-only input to the translator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Package>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Customizations>,
}

/// One package addition. The version is advisory; resolution happens
/// outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Customizations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<KernelCustomization>,
    #[serde(default, rename = "user", skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<UserCustomization>,
    #[serde(default, rename = "group", skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<TimezoneCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<LocaleCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall: Option<FirewallCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<ServicesCustomization>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KernelCustomization {
    /// Extra kernel command-line options, appended after the output
    /// format's own options.
    pub append: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserCustomization {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCustomization {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimezoneCustomization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ntpservers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocaleCustomization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FirewallCustomization {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<FirewallServices>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FirewallServices {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServicesCustomization {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
}

impl Blueprint {
    /// Parse a blueprint from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Blueprint> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a blueprint file.
    pub fn from_path(path: &Path) -> Result<Blueprint> {
        let text = std::fs::read_to_string(path)?;
        Blueprint::from_toml_str(&text)
    }

    /// Names of all packages the blueprint adds.
    pub fn package_names(&self) -> Vec<String> {
        self.packages.iter().map(|p| p.name.clone()).collect()
    }

    pub fn kernel(&self) -> Option<&KernelCustomization> {
        self.customizations.as_ref()?.kernel.as_ref()
    }

    pub fn hostname(&self) -> Option<&str> {
        self.customizations.as_ref()?.hostname.as_deref()
    }

    /// The primary language and keyboard, each independently optional.
    pub fn primary_locale(&self) -> (Option<&str>, Option<&str>) {
        match self.customizations.as_ref().and_then(|c| c.locale.as_ref()) {
            Some(locale) => (locale.language.as_deref(), locale.keyboard.as_deref()),
            None => (None, None),
        }
    }

    /// The timezone name and NTP server list. A present timezone block
    /// with no servers returns `(Some(..) | None, &[])`.
    pub fn timezone_settings(&self) -> (Option<&str>, &[String]) {
        match self
            .customizations
            .as_ref()
            .and_then(|c| c.timezone.as_ref())
        {
            Some(tz) => (tz.timezone.as_deref(), &tz.ntpservers),
            None => (None, &[]),
        }
    }

    pub fn users(&self) -> &[UserCustomization] {
        self.customizations
            .as_ref()
            .map(|c| c.users.as_slice())
            .unwrap_or(&[])
    }

    pub fn groups(&self) -> &[GroupCustomization] {
        self.customizations
            .as_ref()
            .map(|c| c.groups.as_slice())
            .unwrap_or(&[])
    }

    pub fn services(&self) -> Option<&ServicesCustomization> {
        self.customizations.as_ref()?.services.as_ref()
    }

    pub fn firewall(&self) -> Option<&FirewallCustomization> {
        self.customizations.as_ref()?.firewall.as_ref()
    }
}
