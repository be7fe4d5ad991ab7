//! The installable-ISO composite image: an installer environment plus
//! an embedded OS commit, chained across six pipelines.
//!
//! Later pipelines consume values computed for earlier ones (the ISO
//! volume label, the partition table, kernel-argument strings), so the
//! orchestrator computes each shared value once and hands it to every
//! consumer. The executor performs no semantic validation; getting this
//! wiring wrong produces an ISO that silently fails to boot.

use rand::RngCore;

use crate::distro::{self, Catalog};
use crate::error::Result;
use crate::image::partition::efi_boot_partition_table;
use crate::image::{Arch, Artifact, ImageBase};
use crate::manifest::Manifest;
use crate::pipeline::assembler::{Assembler, IsoAssemblerOptions};
use crate::pipeline::stage::{
    BootTreeStageOptions, InstallerStageOptions, IsoTreeStageOptions, KickstartStageOptions,
    OstreeCommit, RootfsImageStageOptions,
};
use crate::pipeline::{Pipeline, Stage};
use crate::repo::{Checksums, PackageSet};

const GIB: u64 = 1024 * 1024 * 1024;

/// The installer root filesystem image is sized independently of the
/// installed system's partitioning.
const ROOTFS_IMAGE_SIZE: u64 = 4 * GIB;

/// Kickstart location in the root of the ISO. Both label-bearing kernel
/// arguments are derived from this one constant plus the volume label.
pub const KICKSTART_PATH: &str = "/install.ks";

/// Where the OS commit lives on the medium.
const PAYLOAD_PATH: &str = "/ostree/repo";

/// Installer backend module activated in FIPS mode.
const SECURITY_MODULE: &str = "org.levitate.installer.modules.security";

/// Baseline package set of the install medium itself.
const INSTALLER_PACKAGES: &[&str] = &[
    "anaconda",
    "dracut-config-generic",
    "efibootmgr",
    "kernel",
    "squashfs-tools",
    "xorriso",
];

/// Definition of an installable ISO carrying an OS commit.
///
/// `users` and `groups` describe the installed system, not the install
/// medium: they ride the kickstart (and the installer environment's
/// module configuration), never the medium's own package stages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OstreeInstaller {
    pub extra_base_packages: PackageSet,
    pub users: Vec<crate::blueprint::UserCustomization>,
    pub groups: Vec<crate::blueprint::GroupCustomization>,

    pub language: Option<String>,
    pub keyboard: Option<String>,
    pub timezone: Option<String>,

    /// Make the installation fully unattended.
    pub unattended: bool,

    pub squashfs_compression: Option<String>,

    pub iso_label: String,
    pub product: String,
    pub os_name: String,
    pub os_version: String,
    pub release: String,
    pub remote: String,

    pub commit: OstreeCommit,

    pub additional_installer_modules: Vec<String>,
    pub fips: bool,
}

impl OstreeInstaller {
    pub fn new(commit: OstreeCommit) -> OstreeInstaller {
        OstreeInstaller {
            commit,
            ..OstreeInstaller::default()
        }
    }

    /// Chain the six pipelines into `manifest` and return the artifact
    /// descriptor of the final ISO.
    pub fn instantiate(
        &self,
        base: &ImageBase,
        catalog: &Catalog,
        manifest: &mut Manifest,
        checksums: &Checksums,
        rng: &mut impl RngCore,
    ) -> Result<Artifact> {
        let arch = catalog.architecture(base.platform.arch.as_str())?;
        let build = catalog.bootstrap_pipeline(arch, checksums);
        let runner = catalog.runner();

        // Computed once, consumed by several pipelines below.
        let users = distro::users_map(&self.users)?;
        let groups = distro::groups_map(&self.groups);
        // Legacy BIOS boot is a pure function of the platform identity.
        let isolinux = base.platform.arch == Arch::X86_64;

        // Installer environment: fixes the package set of the medium.
        let mut installer_tree = Pipeline::new();
        installer_tree.set_build(build.clone(), runner)?;
        let packages = PackageSet::resolved(
            INSTALLER_PACKAGES,
            &self.extra_base_packages.include,
            &self.extra_base_packages.exclude,
        );
        installer_tree.add_stage(Stage::Dnf(catalog.dnf_stage_options(
            arch,
            &self.extra_base_packages.repositories,
            checksums,
            &packages,
        )));
        let mut additional_modules = self.additional_installer_modules.clone();
        if self.fips {
            additional_modules.push(SECURITY_MODULE.to_string());
        }
        installer_tree.add_stage(Stage::Installer(InstallerStageOptions {
            product: self.product.clone(),
            version: self.os_version.clone(),
            additional_modules,
            users: users.clone(),
            groups: groups.clone(),
        }));

        // Fixed-capacity image holding the installer tree.
        let mut rootfs_image = Pipeline::new();
        rootfs_image.set_build(build.clone(), runner)?;
        rootfs_image.add_stage(Stage::RootfsImage(RootfsImageStageOptions {
            size: ROOTFS_IMAGE_SIZE,
            compression: self.squashfs_compression.clone(),
        }));

        // EFI boot tree. Both label-bearing arguments reference the one
        // volume label; changing it propagates to both atomically.
        let mut boot_kernel_opts = vec![
            format!("inst.stage2=hd:LABEL={}", self.iso_label),
            format!("inst.ks=hd:LABEL={}:{}", self.iso_label, KICKSTART_PATH),
        ];
        if self.fips {
            boot_kernel_opts.push("fips=1".to_string());
        }
        let mut boot_tree = Pipeline::new();
        boot_tree.set_build(build.clone(), runner)?;
        boot_tree.add_stage(Stage::BootTree(BootTreeStageOptions {
            product: self.product.clone(),
            version: self.os_version.clone(),
            uefi_vendor: base.platform.uefi_vendor.clone(),
            iso_label: self.iso_label.clone(),
            kernel_opts: boot_kernel_opts,
        }));

        // ISO tree: kickstart plus the on-disc layout.
        let mut iso_kernel_opts = Vec::new();
        if self.fips {
            iso_kernel_opts.push("fips=1".to_string());
        }
        let mut iso_tree = Pipeline::new();
        iso_tree.set_build(build.clone(), runner)?;
        iso_tree.add_stage(Stage::Kickstart(KickstartStageOptions {
            path: KICKSTART_PATH.to_string(),
            os_name: self.os_name.clone(),
            remote: self.remote.clone(),
            users,
            groups,
            language: self.language.clone(),
            keyboard: self.keyboard.clone(),
            timezone: self.timezone.clone(),
            unattended: self.unattended,
        }));
        iso_tree.add_stage(Stage::IsoTree(IsoTreeStageOptions {
            partition_table: efi_boot_partition_table(rng),
            payload_path: PAYLOAD_PATH.to_string(),
            commit: self.commit.clone(),
            isolinux,
            kernel_opts: iso_kernel_opts,
            release: Some(self.release.clone()),
        }));

        // Terminal assembler pipeline.
        let mut bootiso = Pipeline::new();
        bootiso.set_build(build.clone(), runner)?;
        bootiso.set_assembler(Assembler::Iso(IsoAssemblerOptions {
            filename: base.filename.clone(),
            volid: self.iso_label.clone(),
            isolinux,
        }));

        manifest.add_pipeline("build", build)?;
        manifest.add_pipeline("installer-tree", installer_tree)?;
        manifest.add_pipeline("rootfs-image", rootfs_image)?;
        manifest.add_pipeline("efiboot-tree", boot_tree)?;
        manifest.add_pipeline("iso-tree", iso_tree)?;
        manifest.add_pipeline("bootiso", bootiso)?;
        manifest.set_sources(checksums.clone());

        Ok(Artifact {
            filename: base.filename.clone(),
            mime_type: "application/x-iso9660-image".to_string(),
            export: "bootiso".to_string(),
        })
    }
}
