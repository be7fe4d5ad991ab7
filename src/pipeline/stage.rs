//! Stage definitions.
//!
//! A stage is one deterministic transformation of the filesystem tree
//! under construction, described as data: a stable vendor-qualified type
//! identifier plus a per-kind option schema. Stages carry no behavior;
//! the external build executor pattern-matches on the type identifier,
//! so renaming one is a wire-format break.
//!
//! Stages are immutable once constructed. Anything two stages both need
//! (the root filesystem UUID, a kernel option string) is computed once by
//! the translator and passed into both constructors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::repo::RepoConfig;

/// One build stage: a closed variant over the known stage kinds.
///
/// The serialized form is `{"name": <type id>, "options": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "options")]
pub enum Stage {
    #[serde(rename = "org.levitate.dnf")]
    Dnf(DnfStageOptions),
    #[serde(rename = "org.levitate.fix-bls")]
    FixBls(FixBlsStageOptions),
    #[serde(rename = "org.levitate.fstab")]
    FsTab(FsTabStageOptions),
    #[serde(rename = "org.levitate.grub2")]
    Grub2(Grub2StageOptions),
    #[serde(rename = "org.levitate.locale")]
    Locale(LocaleStageOptions),
    #[serde(rename = "org.levitate.keymap")]
    Keymap(KeymapStageOptions),
    #[serde(rename = "org.levitate.hostname")]
    Hostname(HostnameStageOptions),
    #[serde(rename = "org.levitate.timezone")]
    Timezone(TimezoneStageOptions),
    #[serde(rename = "org.levitate.chrony")]
    Chrony(ChronyStageOptions),
    #[serde(rename = "org.levitate.users")]
    Users(UsersStageOptions),
    #[serde(rename = "org.levitate.groups")]
    Groups(GroupsStageOptions),
    #[serde(rename = "org.levitate.systemd")]
    Systemd(SystemdStageOptions),
    #[serde(rename = "org.levitate.firewall")]
    Firewall(FirewallStageOptions),
    #[serde(rename = "org.levitate.selinux")]
    Selinux(SelinuxStageOptions),
    #[serde(rename = "org.levitate.installer")]
    Installer(InstallerStageOptions),
    #[serde(rename = "org.levitate.rootfs-image")]
    RootfsImage(RootfsImageStageOptions),
    #[serde(rename = "org.levitate.boot-tree")]
    BootTree(BootTreeStageOptions),
    #[serde(rename = "org.levitate.kickstart")]
    Kickstart(KickstartStageOptions),
    #[serde(rename = "org.levitate.iso-tree")]
    IsoTree(IsoTreeStageOptions),
}

impl Stage {
    /// The stable wire identifier of this stage.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Dnf(_) => "org.levitate.dnf",
            Stage::FixBls(_) => "org.levitate.fix-bls",
            Stage::FsTab(_) => "org.levitate.fstab",
            Stage::Grub2(_) => "org.levitate.grub2",
            Stage::Locale(_) => "org.levitate.locale",
            Stage::Keymap(_) => "org.levitate.keymap",
            Stage::Hostname(_) => "org.levitate.hostname",
            Stage::Timezone(_) => "org.levitate.timezone",
            Stage::Chrony(_) => "org.levitate.chrony",
            Stage::Users(_) => "org.levitate.users",
            Stage::Groups(_) => "org.levitate.groups",
            Stage::Systemd(_) => "org.levitate.systemd",
            Stage::Firewall(_) => "org.levitate.firewall",
            Stage::Selinux(_) => "org.levitate.selinux",
            Stage::Installer(_) => "org.levitate.installer",
            Stage::RootfsImage(_) => "org.levitate.rootfs-image",
            Stage::BootTree(_) => "org.levitate.boot-tree",
            Stage::Kickstart(_) => "org.levitate.kickstart",
            Stage::IsoTree(_) => "org.levitate.iso-tree",
        }
    }
}

/// Package-install stage: resolves nothing, just records what the
/// executor must install and from where.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DnfStageOptions {
    pub release_version: String,
    pub base_architecture: String,
    pub module_platform_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<DnfRepository>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_packages: Vec<String>,
}

/// One repository entry inside a dnf stage. The checksum is the opaque
/// resolver output for the repository's metadata; the engine embeds it
/// without interpretation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DnfRepository {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirrorlist: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpg_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl DnfStageOptions {
    pub fn new(
        release_version: impl Into<String>,
        base_architecture: impl Into<String>,
        module_platform_id: impl Into<String>,
    ) -> DnfStageOptions {
        DnfStageOptions {
            release_version: release_version.into(),
            base_architecture: base_architecture.into(),
            module_platform_id: module_platform_id.into(),
            ..DnfStageOptions::default()
        }
    }

    pub fn add_repository(&mut self, repo: &RepoConfig, checksum: Option<&str>) {
        self.repositories.push(DnfRepository {
            base_urls: repo.base_urls.clone(),
            metalink: repo.metalink.clone(),
            mirrorlist: repo.mirrorlist.clone(),
            gpg_keys: repo.gpg_keys.clone(),
            checksum: checksum.map(str::to_string),
        });
    }
}

/// Rewrites Boot Loader Specification entries after package install.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FixBlsStageOptions {}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FsTabStageOptions {
    pub filesystems: Vec<FsTabEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsTabEntry {
    pub uuid: Uuid,
    pub vfs_type: String,
    pub path: String,
    pub options: String,
    pub freq: u32,
    pub passno: u32,
}

impl FsTabStageOptions {
    pub fn add_filesystem(
        &mut self,
        uuid: Uuid,
        vfs_type: impl Into<String>,
        path: impl Into<String>,
        options: impl Into<String>,
        freq: u32,
        passno: u32,
    ) {
        self.filesystems.push(FsTabEntry {
            uuid,
            vfs_type: vfs_type.into(),
            path: path.into(),
            options: options.into(),
            freq,
            passno,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grub2StageOptions {
    pub root_fs_uuid: Uuid,
    pub kernel_options: String,
    /// Install the legacy BIOS bootloader alongside the BLS entries.
    pub legacy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleStageOptions {
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeymapStageOptions {
    pub keymap: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostnameStageOptions {
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimezoneStageOptions {
    pub zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChronyStageOptions {
    pub timeservers: Vec<String>,
}

impl ChronyStageOptions {
    /// A time-sync stage with no servers would silently configure
    /// nothing, so an empty list is rejected at construction.
    pub fn new(timeservers: Vec<String>) -> Result<ChronyStageOptions> {
        if timeservers.is_empty() {
            return Err(Error::EmptyStageInput {
                stage: "org.levitate.chrony",
                field: "timeservers",
            });
        }
        Ok(ChronyStageOptions { timeservers })
    }
}

/// Users keyed by name; `BTreeMap` keeps the serialized order stable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UsersStageOptions {
    pub users: BTreeMap<String, User>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Always a crypt(3) hash by the time it lands here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupsStageOptions {
    pub groups: BTreeMap<String, Group>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemdStageOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_services: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FirewallStageOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_services: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_services: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelinuxStageOptions {
    pub file_contexts: String,
}

/// Installer-environment configuration for the composite ISO image.
///
/// The user and group lists describe the *installed* system, not the
/// install medium; the same lists ride the kickstart stage and both
/// copies come from one computation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstallerStageOptions {
    pub product: String,
    pub version: String,
    /// Installer backend module ids to activate beyond the defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_modules: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub users: BTreeMap<String, User>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, Group>,
}

/// Packs the installer environment tree into a fixed-size root
/// filesystem image, sized independently of the installed system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootfsImageStageOptions {
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
}

/// EFI boot tree: bootloader configuration for the install medium.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BootTreeStageOptions {
    pub product: String,
    pub version: String,
    pub uefi_vendor: String,
    pub iso_label: String,
    /// Kernel command line of the install medium. Both label-bearing
    /// entries are derived from `iso_label` by the orchestrator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kernel_opts: Vec<String>,
}

/// Kickstart record embedded into the ISO tree. Text rendering is the
/// executor's job; this carries only the inputs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KickstartStageOptions {
    pub path: String,
    pub os_name: String,
    pub remote: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub users: BTreeMap<String, User>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub unattended: bool,
}

/// Assembles the on-ISO directory tree: partition table for the
/// embedded EFI image, payload commit, boot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsoTreeStageOptions {
    pub partition_table: crate::image::partition::PartitionTable,
    pub payload_path: String,
    pub commit: OstreeCommit,
    pub isolinux: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kernel_opts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

/// Source reference for the OS commit embedded into the ISO.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OstreeCommit {
    pub url: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub checksum: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::uuid;

    #[test]
    fn test_stage_wire_shape() {
        let stage = Stage::Hostname(HostnameStageOptions {
            hostname: "node1".into(),
        });
        let json = serde_json::to_value(&stage).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "org.levitate.hostname",
                "options": {"hostname": "node1"}
            })
        );
    }

    #[test]
    fn test_stage_name_matches_serialized_identifier() {
        let stage = Stage::FixBls(FixBlsStageOptions::default());
        let json = serde_json::to_value(&stage).unwrap();
        assert_eq!(json["name"], stage.name());
    }

    #[test]
    fn test_chrony_rejects_empty_timeservers() {
        assert!(matches!(
            ChronyStageOptions::new(Vec::new()),
            Err(Error::EmptyStageInput { .. })
        ));
        assert!(ChronyStageOptions::new(vec!["0.pool.ntp.org".into()]).is_ok());
    }

    #[test]
    fn test_dnf_repository_carries_checksum_opaquely() {
        let repo = RepoConfig {
            id: "baseos".into(),
            name: "BaseOS".into(),
            mirrorlist: Some("https://mirrors.example.com/?repo=BaseOS-8".into()),
            ..RepoConfig::default()
        };
        let mut options = DnfStageOptions::new("8", "x86_64", "platform:el8");
        options.add_repository(&repo, Some("sha256:aa00"));
        assert_eq!(
            options.repositories[0].checksum.as_deref(),
            Some("sha256:aa00")
        );
        assert_eq!(options.repositories[0].mirrorlist, repo.mirrorlist);
    }

    #[test]
    fn test_fstab_entries_keep_insertion_order() {
        let root = uuid!("76c56bc3-6b39-4a32-9b1d-b41b8e0f2b04");
        let mut options = FsTabStageOptions::default();
        options.add_filesystem(root, "xfs", "/", "defaults", 0, 0);
        options.add_filesystem(root, "vfat", "/boot/efi", "umask=0077", 0, 2);
        assert_eq!(options.filesystems[0].path, "/");
        assert_eq!(options.filesystems[1].path, "/boot/efi");
    }

    #[test]
    fn test_stage_round_trips_through_wire_format() {
        let stage = Stage::Systemd(SystemdStageOptions {
            enabled_services: vec!["sshd".into()],
            disabled_services: vec!["kdump".into()],
            default_target: Some("multi-user.target".into()),
        });
        let json = serde_json::to_string(&stage).unwrap();
        let back: Stage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stage);
    }
}
