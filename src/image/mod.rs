//! Composite image definitions.
//!
//! A composite image is built from several chained pipelines inside one
//! manifest, where later pipelines consume values computed for earlier
//! ones. Shared fields (type name, platform, output filename) live in
//! [`ImageBase`]; kind-specific fields live in the closed [`ImageKind`]
//! variant.

pub mod installer;
pub mod partition;

use rand::RngCore;

use crate::distro::Catalog;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::repo::Checksums;

pub use installer::OstreeInstaller;

/// Target CPU architecture of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl Arch {
    /// The catalog lookup key for this architecture.
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform identity of the machine an image boots on.
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub arch: Arch,
    /// Vendor directory name under `EFI/` on the boot medium.
    pub uefi_vendor: String,
}

/// Descriptor of the final produced file. No bytes are held here; the
/// executor exports the named pipeline's output under this filename.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub filename: String,
    pub mime_type: String,
    /// Name of the pipeline whose output is exported.
    pub export: String,
}

/// Fields every image definition shares.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBase {
    /// Human-readable image type name, for listings.
    pub type_name: &'static str,
    pub platform: Platform,
    /// Filename of the artifact to produce.
    pub filename: String,
}

/// Closed variant over the supported composite image kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageKind {
    /// Installable ISO with an embedded OS commit.
    OstreeInstaller(OstreeInstaller),
}

/// One composite image definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub base: ImageBase,
    pub kind: ImageKind,
}

impl Image {
    /// Populate `manifest` with this image's pipelines and return the
    /// artifact descriptor. The random generator is injected so that
    /// identical seeds yield byte-identical manifests.
    pub fn instantiate(
        &self,
        catalog: &Catalog,
        manifest: &mut Manifest,
        checksums: &Checksums,
        rng: &mut impl RngCore,
    ) -> Result<Artifact> {
        match &self.kind {
            ImageKind::OstreeInstaller(image) => {
                image.instantiate(&self.base, catalog, manifest, checksums, rng)
            }
        }
    }
}
