//! The catalog-driven translation algorithm.
//!
//! Turns `(blueprint, repos, checksums, architecture, output format)`
//! into one concrete [`Pipeline`]. The stage sequence below is a
//! correctness contract with the executor, not an implementation detail:
//! package install first, BLS fix immediately after, fstab and
//! bootloader configuration next, the optional customization stages in a
//! fixed relative order, SELinux relabeling always last before the
//! assembler.

use crate::blueprint::Blueprint;
use crate::crypt;
use crate::distro::{Architecture, Catalog, OutputDefinition};
use crate::error::Result;
use crate::pipeline::stage::{
    ChronyStageOptions, DnfStageOptions, FirewallStageOptions, FixBlsStageOptions,
    FsTabStageOptions, Group, GroupsStageOptions, Grub2StageOptions, HostnameStageOptions,
    KeymapStageOptions, LocaleStageOptions, SelinuxStageOptions, SystemdStageOptions,
    TimezoneStageOptions, User, UsersStageOptions,
};
use crate::pipeline::{Pipeline, Stage};
use crate::repo::{Checksums, PackageSet, RepoConfig};

/// Language installed when the blueprint sets none. Keymaps have no
/// such default; a keymap stage only appears when asked for.
const DEFAULT_LANGUAGE: &str = "en_US";

const SELINUX_FILE_CONTEXTS: &str = "etc/selinux/targeted/contexts/files/file_contexts";

impl Catalog {
    /// Translate one image description into a pipeline.
    ///
    /// Fails on an unknown architecture or output format, or when a
    /// user's password cannot be hashed; no partial pipeline is ever
    /// returned.
    pub fn build_pipeline(
        &self,
        blueprint: &Blueprint,
        additional_repos: &[RepoConfig],
        checksums: &Checksums,
        arch_name: &str,
        format_name: &str,
    ) -> Result<Pipeline> {
        let output = self.output(format_name)?;
        let arch = self.architecture(arch_name)?;

        let mut p = Pipeline::new();
        p.set_build(self.bootstrap_pipeline(arch, checksums), self.runner.as_str())?;

        // Effective package set: base ∪ blueprint additions (∪ bootloader
        // packages when bootable), minus the format's exclusions. Sorted
        // and deduplicated for diff-stable output.
        let mut additions = blueprint.package_names();
        if output.bootable {
            additions.extend(arch.bootloader_packages.iter().cloned());
        }
        let packages =
            PackageSet::resolved(&output.packages, &additions, &output.excluded_packages);
        p.add_stage(Stage::Dnf(self.dnf_stage_options(
            arch,
            additional_repos,
            checksums,
            &packages,
        )));
        p.add_stage(Stage::FixBls(FixBlsStageOptions::default()));

        if output.bootable {
            let mut fstab = FsTabStageOptions::default();
            fstab.add_filesystem(self.root_fs_uuid, "xfs", "/", "defaults", 0, 0);
            p.add_stage(Stage::FsTab(fstab));
        }

        let mut kernel_options = output.kernel_options.clone();
        if let Some(kernel) = blueprint.kernel() {
            kernel_options.push(' ');
            kernel_options.push_str(&kernel.append);
        }
        p.add_stage(Stage::Grub2(Grub2StageOptions {
            root_fs_uuid: self.root_fs_uuid,
            kernel_options,
            legacy: true,
        }));

        let (language, keyboard) = blueprint.primary_locale();
        p.add_stage(Stage::Locale(LocaleStageOptions {
            language: language.unwrap_or(DEFAULT_LANGUAGE).to_string(),
        }));
        if let Some(keyboard) = keyboard {
            p.add_stage(Stage::Keymap(KeymapStageOptions {
                keymap: keyboard.to_string(),
            }));
        }

        if let Some(hostname) = blueprint.hostname() {
            p.add_stage(Stage::Hostname(HostnameStageOptions {
                hostname: hostname.to_string(),
            }));
        }

        let (timezone, ntp_servers) = blueprint.timezone_settings();
        if let Some(zone) = timezone {
            p.add_stage(Stage::Timezone(TimezoneStageOptions {
                zone: zone.to_string(),
            }));
        }
        if !ntp_servers.is_empty() {
            p.add_stage(Stage::Chrony(ChronyStageOptions::new(
                ntp_servers.to_vec(),
            )?));
        }

        if !blueprint.users().is_empty() {
            p.add_stage(Stage::Users(user_stage_options(blueprint)?));
        }

        if !blueprint.groups().is_empty() {
            p.add_stage(Stage::Groups(group_stage_options(blueprint)));
        }

        if blueprint.services().is_some() || !output.enabled_services.is_empty() {
            p.add_stage(Stage::Systemd(systemd_stage_options(blueprint, output)));
        }

        if let Some(firewall) = blueprint.firewall() {
            let mut options = FirewallStageOptions {
                ports: firewall.ports.clone(),
                ..FirewallStageOptions::default()
            };
            if let Some(services) = &firewall.services {
                options.enabled_services = services.enabled.clone();
                options.disabled_services = services.disabled.clone();
            }
            p.add_stage(Stage::Firewall(options));
        }

        p.add_stage(Stage::Selinux(SelinuxStageOptions {
            file_contexts: SELINUX_FILE_CONTEXTS.to_string(),
        }));
        p.set_assembler(output.assembler.clone());

        Ok(p)
    }

    /// The bootstrap build environment: one package-install stage with
    /// the fixed core tool set plus architecture build packages, no
    /// assembler.
    pub(crate) fn bootstrap_pipeline(
        &self,
        arch: &Architecture,
        checksums: &Checksums,
    ) -> Pipeline {
        let packages =
            PackageSet::resolved(&self.build_packages, &arch.build_packages, &[] as &[&str]);
        let mut p = Pipeline::new();
        p.add_stage(Stage::Dnf(
            self.dnf_stage_options(arch, &[], checksums, &packages),
        ));
        p
    }

    pub(crate) fn dnf_stage_options(
        &self,
        arch: &Architecture,
        additional_repos: &[RepoConfig],
        checksums: &Checksums,
        packages: &PackageSet,
    ) -> DnfStageOptions {
        let mut options = DnfStageOptions::new(
            self.release_version.as_str(),
            arch.name.as_str(),
            self.module_platform_id.as_str(),
        );
        for repo in self
            .repositories(&arch.name)
            .iter()
            .chain(additional_repos)
        {
            options.add_repository(repo, checksums.get(&repo.id).map(String::as_str));
        }
        options.packages = packages.include.clone();
        options.exclude_packages = packages.exclude.clone();
        options
    }
}

/// Convert user customizations, hashing any plaintext password. Used by
/// both the users stage here and the composite installer's kickstart,
/// so all consumers see the same hashes.
pub(crate) fn users_map(
    customizations: &[crate::blueprint::UserCustomization],
) -> Result<std::collections::BTreeMap<String, User>> {
    let mut users = std::collections::BTreeMap::new();
    for customization in customizations {
        let password = match &customization.password {
            Some(password) if !crypt::password_is_crypted(password) => {
                Some(crypt::crypt_sha512(password, &customization.name)?)
            }
            other => other.clone(),
        };
        users.insert(
            customization.name.clone(),
            User {
                uid: customization.uid,
                gid: customization.gid,
                groups: customization.groups.clone(),
                description: customization.description.clone(),
                home: customization.home.clone(),
                shell: customization.shell.clone(),
                password,
                key: customization.key.clone(),
            },
        );
    }
    Ok(users)
}

pub(crate) fn groups_map(
    customizations: &[crate::blueprint::GroupCustomization],
) -> std::collections::BTreeMap<String, Group> {
    customizations
        .iter()
        .map(|group| (group.name.clone(), Group { gid: group.gid }))
        .collect()
}

fn user_stage_options(blueprint: &Blueprint) -> Result<UsersStageOptions> {
    Ok(UsersStageOptions {
        users: users_map(blueprint.users())?,
    })
}

fn group_stage_options(blueprint: &Blueprint) -> GroupsStageOptions {
    GroupsStageOptions {
        groups: groups_map(blueprint.groups()),
    }
}

/// Merge the output format's default service lists with the blueprint's.
/// The two lists stay independent throughout; nothing from one side ever
/// lands in the other.
fn systemd_stage_options(blueprint: &Blueprint, output: &OutputDefinition) -> SystemdStageOptions {
    let mut enabled = output.enabled_services.clone();
    let mut disabled = output.disabled_services.clone();
    if let Some(services) = blueprint.services() {
        enabled.extend(services.enabled.iter().cloned());
        disabled.extend(services.disabled.iter().cloned());
    }
    SystemdStageOptions {
        enabled_services: enabled,
        disabled_services: disabled,
        default_target: output.default_target.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{
        Customizations, KernelCustomization, ServicesCustomization, TimezoneCustomization,
        UserCustomization,
    };
    use crate::distro::rocky8;

    fn translate(blueprint: &Blueprint, format: &str) -> Pipeline {
        rocky8::catalog()
            .build_pipeline(blueprint, &[], &Checksums::new(), "x86_64", format)
            .unwrap()
    }

    fn stage_names(p: &Pipeline) -> Vec<&'static str> {
        p.stages().iter().map(Stage::name).collect()
    }

    #[test]
    fn test_every_catalog_pair_translates() {
        let catalog = rocky8::catalog();
        let blueprint = Blueprint::default();
        for arch in catalog.architectures() {
            for format in catalog.output_formats() {
                let p = catalog
                    .build_pipeline(&blueprint, &[], &Checksums::new(), arch, format)
                    .unwrap();
                assert!(p.assembler().is_some(), "{arch}/{format}");
                assert!(!p.stages().is_empty(), "{arch}/{format}");
                let build = p.build().expect("build pipeline attached");
                assert!(build.assembler().is_none(), "{arch}/{format}");
            }
        }
    }

    #[test]
    fn test_stage_order_invariants() {
        let p = translate(&Blueprint::default(), "qcow2");
        let names = stage_names(&p);
        assert_eq!(names[0], "org.levitate.dnf");
        assert_eq!(names[1], "org.levitate.fix-bls");
        assert_eq!(*names.last().unwrap(), "org.levitate.selinux");
    }

    #[test]
    fn test_unknown_architecture_fails() {
        let err = rocky8::catalog()
            .build_pipeline(
                &Blueprint::default(),
                &[],
                &Checksums::new(),
                "riscv128",
                "qcow2",
            )
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::InvalidArchitecture(name) if name == "riscv128"
        ));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let blueprint = Blueprint {
            packages: vec![crate::blueprint::Package {
                name: "vim-enhanced".into(),
                version: None,
            }],
            customizations: Some(Customizations {
                hostname: Some("node1".into()),
                ..Customizations::default()
            }),
            ..Blueprint::default()
        };
        let a = translate(&blueprint, "qcow2");
        let b = translate(&blueprint, "qcow2");
        assert_eq!(a, b);
    }

    #[test]
    fn test_bootable_output_gets_fstab_and_bootloader_packages() {
        let catalog = rocky8::catalog();
        let p = translate(&Blueprint::default(), "qcow2");
        let names = stage_names(&p);
        assert!(names.contains(&"org.levitate.fstab"));

        let Stage::Dnf(dnf) = &p.stages()[0] else {
            panic!("first stage must install packages");
        };
        let arch = catalog.architecture("x86_64").unwrap();
        let output = catalog.output("qcow2").unwrap();
        for pkg in &arch.bootloader_packages {
            assert!(dnf.packages.contains(pkg), "missing {pkg}");
        }
        for pkg in &output.excluded_packages {
            assert!(!dnf.packages.contains(pkg), "excluded {pkg} present");
        }
        let mut sorted = dnf.packages.clone();
        sorted.sort();
        assert_eq!(dnf.packages, sorted);
    }

    #[test]
    fn test_non_bootable_output_has_no_fstab() {
        let p = translate(&Blueprint::default(), "tar");
        assert!(!stage_names(&p).contains(&"org.levitate.fstab"));
        // The bootloader stage itself is still emitted, with the
        // format's own kernel options.
        assert!(stage_names(&p).contains(&"org.levitate.grub2"));
    }

    #[test]
    fn test_locale_defaults_but_keymap_does_not() {
        let p = translate(&Blueprint::default(), "qcow2");
        let names = stage_names(&p);
        assert!(names.contains(&"org.levitate.locale"));
        assert!(!names.contains(&"org.levitate.keymap"));
        let locale = p
            .stages()
            .iter()
            .find_map(|s| match s {
                Stage::Locale(options) => Some(options),
                _ => None,
            })
            .unwrap();
        assert_eq!(locale.language, "en_US");
    }

    #[test]
    fn test_absent_timezone_emits_no_stage() {
        let p = translate(&Blueprint::default(), "qcow2");
        let names = stage_names(&p);
        assert!(!names.contains(&"org.levitate.timezone"));
        assert!(!names.contains(&"org.levitate.chrony"));
    }

    #[test]
    fn test_timezone_without_ntp_servers_emits_no_chrony() {
        let blueprint = Blueprint {
            customizations: Some(Customizations {
                timezone: Some(TimezoneCustomization {
                    timezone: Some("UTC".into()),
                    ntpservers: vec![],
                }),
                ..Customizations::default()
            }),
            ..Blueprint::default()
        };
        let p = translate(&blueprint, "qcow2");
        let names = stage_names(&p);
        assert!(names.contains(&"org.levitate.timezone"));
        assert!(!names.contains(&"org.levitate.chrony"));
    }

    #[test]
    fn test_kernel_append_lands_after_format_options() {
        let blueprint = Blueprint {
            customizations: Some(Customizations {
                kernel: Some(KernelCustomization {
                    append: "nosmt=force".into(),
                }),
                ..Customizations::default()
            }),
            ..Blueprint::default()
        };
        let p = translate(&blueprint, "qcow2");
        let grub2 = p
            .stages()
            .iter()
            .find_map(|s| match s {
                Stage::Grub2(options) => Some(options),
                _ => None,
            })
            .unwrap();
        assert!(grub2.kernel_options.ends_with(" nosmt=force"));
        assert!(grub2.kernel_options.starts_with("ro "));
    }

    #[test]
    fn test_format_default_services_alone_emit_systemd_stage() {
        // vhd declares enabled services; the blueprint sets none.
        let p = translate(&Blueprint::default(), "vhd");
        let systemd = p
            .stages()
            .iter()
            .find_map(|s| match s {
                Stage::Systemd(options) => Some(options),
                _ => None,
            })
            .unwrap();
        assert!(systemd.enabled_services.contains(&"sshd".to_string()));
        assert_eq!(
            systemd.default_target.as_deref(),
            Some("multi-user.target")
        );
    }

    #[test]
    fn test_service_merge_keeps_lists_independent() {
        let blueprint = Blueprint {
            customizations: Some(Customizations {
                services: Some(ServicesCustomization {
                    enabled: vec!["nginx".into()],
                    disabled: vec!["kdump".into()],
                }),
                ..Customizations::default()
            }),
            ..Blueprint::default()
        };
        let p = translate(&blueprint, "vhd");
        let systemd = p
            .stages()
            .iter()
            .find_map(|s| match s {
                Stage::Systemd(options) => Some(options),
                _ => None,
            })
            .unwrap();
        assert!(systemd.enabled_services.contains(&"nginx".to_string()));
        assert!(systemd.disabled_services.contains(&"kdump".to_string()));
        assert!(!systemd.enabled_services.contains(&"kdump".to_string()));
        assert!(!systemd.disabled_services.contains(&"nginx".to_string()));
    }

    #[test]
    fn test_user_passwords_are_hashed() {
        let blueprint = Blueprint {
            customizations: Some(Customizations {
                users: vec![UserCustomization {
                    name: "admin".into(),
                    password: Some("hunter2".into()),
                    ..UserCustomization::default()
                }],
                ..Customizations::default()
            }),
            ..Blueprint::default()
        };
        let p = translate(&blueprint, "qcow2");
        let users = p
            .stages()
            .iter()
            .find_map(|s| match s {
                Stage::Users(options) => Some(options),
                _ => None,
            })
            .unwrap();
        let password = users.users["admin"].password.as_deref().unwrap();
        assert!(password.starts_with("$6$"));
    }

    #[test]
    fn test_precrypted_passwords_pass_through() {
        let blueprint = Blueprint {
            customizations: Some(Customizations {
                users: vec![UserCustomization {
                    name: "admin".into(),
                    password: Some("$6$salt$alreadyhashed".into()),
                    ..UserCustomization::default()
                }],
                ..Customizations::default()
            }),
            ..Blueprint::default()
        };
        let p = translate(&blueprint, "qcow2");
        let users = p
            .stages()
            .iter()
            .find_map(|s| match s {
                Stage::Users(options) => Some(options),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            users.users["admin"].password.as_deref(),
            Some("$6$salt$alreadyhashed")
        );
    }
}
