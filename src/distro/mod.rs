//! Distribution catalogs.
//!
//! A [`Catalog`] is the per-distro-version registry of supported
//! architectures and output formats, built once by a pure factory (see
//! [`rocky8::catalog`]) from static tables and read-only afterwards.
//! There is no global registry: every distro version is an independent
//! catalog value, freely shared by reference across threads.

pub mod rocky8;
mod translate;

pub(crate) use translate::{groups_map, users_map};

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::pipeline::Assembler;
use crate::repo::RepoConfig;

/// One supported target architecture within a catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Architecture {
    pub name: String,
    /// Installed into the image when the output format is bootable.
    pub bootloader_packages: Vec<String>,
    /// Added to the bootstrap build environment.
    pub build_packages: Vec<String>,
}

/// One supported output format within a catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDefinition {
    /// Filename of the produced artifact.
    pub filename: String,
    pub mime_type: String,
    pub packages: Vec<String>,
    pub excluded_packages: Vec<String>,
    pub enabled_services: Vec<String>,
    pub disabled_services: Vec<String>,
    pub bootable: bool,
    pub default_target: Option<String>,
    pub kernel_options: String,
    /// Prototype assembler, cloned into each translated pipeline.
    pub assembler: Assembler,
}

/// Immutable per-distro-version registry. Lookups are exact; an unknown
/// key is a caller error, never a silent default.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub(crate) name: String,
    pub(crate) release_version: String,
    pub(crate) module_platform_id: String,
    pub(crate) runner: String,
    /// Fixed bootstrap set for the build environment, before per-arch
    /// additions.
    pub(crate) build_packages: Vec<String>,
    /// UUID of the root filesystem, shared between the fstab stage, the
    /// bootloader stage and the disk assemblers. Computed once here,
    /// passed into every consumer.
    pub(crate) root_fs_uuid: Uuid,
    pub(crate) arches: BTreeMap<String, Architecture>,
    pub(crate) outputs: BTreeMap<String, OutputDefinition>,
    /// Static repository tables; `$arch` in URLs is substituted at query
    /// time.
    pub(crate) repositories: Vec<RepoConfig>,
}

impl Catalog {
    /// The distro-version identity of this catalog (e.g. `rocky8`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The runner identity stamped onto build environments.
    pub fn runner(&self) -> &str {
        &self.runner
    }

    /// Supported architecture names, lexicographic.
    pub fn architectures(&self) -> Vec<&str> {
        self.arches.keys().map(String::as_str).collect()
    }

    /// Supported output format names, stable lexicographic order for
    /// reproducible listings.
    pub fn output_formats(&self) -> Vec<&str> {
        self.outputs.keys().map(String::as_str).collect()
    }

    pub fn architecture(&self, name: &str) -> Result<&Architecture> {
        self.arches
            .get(name)
            .ok_or_else(|| Error::InvalidArchitecture(name.to_string()))
    }

    pub fn output(&self, format: &str) -> Result<&OutputDefinition> {
        self.outputs
            .get(format)
            .ok_or_else(|| Error::InvalidOutputFormat(format.to_string()))
    }

    /// `(filename, mime type)` of the artifact an output format
    /// produces.
    pub fn filename_from_type(&self, format: &str) -> Result<(&str, &str)> {
        let output = self.output(format)?;
        Ok((&output.filename, &output.mime_type))
    }

    /// The distribution's own repositories, qualified for one
    /// architecture.
    pub fn repositories(&self, arch: &str) -> Vec<RepoConfig> {
        self.repositories
            .iter()
            .map(|repo| {
                let mut repo = repo.clone();
                for url in &mut repo.base_urls {
                    *url = url.replace("$arch", arch);
                }
                if let Some(mirrorlist) = &mut repo.mirrorlist {
                    *mirrorlist = mirrorlist.replace("$arch", arch);
                }
                repo
            })
            .collect()
    }
}
