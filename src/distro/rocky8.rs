//! Rocky Linux 8 catalog tables.
//!
//! Everything here is static data; [`catalog`] is a pure factory and the
//! returned value is never mutated. A second distro version gets its own
//! module and its own independent catalog.

use std::collections::BTreeMap;

use uuid::{uuid, Uuid};

use crate::distro::{Architecture, Catalog, OutputDefinition};
use crate::pipeline::assembler::{
    Assembler, QemuAssemblerOptions, QemuFilesystem, QemuPartition, RawFsAssemblerOptions,
    TarAssemblerOptions,
};
use crate::repo::RepoConfig;

const GIB: u64 = 1024 * 1024 * 1024;

/// Root filesystem UUID shared by fstab, grub2 and the disk assemblers.
const ROOT_FS_UUID: Uuid = uuid!("76c56bc3-6b39-4a32-9b1d-b41b8e0f2b04");

/// MBR disk identifier for partitioned outputs.
const PT_UUID: &str = "0x2e1ad9fc";

/// Volume label of the installer ISO built from this catalog.
pub const ISO_LABEL: &str = "Rocky-8-BaseOS";

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn qemu_assembler(format: &str, filename: &str, size: u64) -> Assembler {
    Assembler::Qemu(QemuAssemblerOptions {
        format: format.into(),
        filename: filename.into(),
        size,
        ptuuid: PT_UUID.into(),
        pttype: "mbr".into(),
        partitions: vec![QemuPartition {
            start: 2048,
            bootable: true,
            filesystem: QemuFilesystem {
                fs_type: "xfs".into(),
                uuid: ROOT_FS_UUID,
                mountpoint: "/".into(),
            },
        }],
    })
}

fn tar_assembler(filename: &str, compression: &str) -> Assembler {
    Assembler::Tar(TarAssemblerOptions {
        filename: filename.into(),
        compression: Some(compression.into()),
    })
}

fn rawfs_assembler(filename: &str) -> Assembler {
    Assembler::RawFs(RawFsAssemblerOptions {
        filename: filename.into(),
        root_fs_uuid: ROOT_FS_UUID,
        size: 3 * GIB,
        fs_type: "xfs".into(),
    })
}

/// Build the Rocky Linux 8 catalog.
pub fn catalog() -> Catalog {
    let mut arches = BTreeMap::new();
    arches.insert(
        "x86_64".to_string(),
        Architecture {
            name: "x86_64".into(),
            bootloader_packages: strings(&["grub2-pc"]),
            build_packages: strings(&["grub2-pc"]),
        },
    );
    arches.insert(
        "aarch64".to_string(),
        Architecture {
            name: "aarch64".into(),
            bootloader_packages: strings(&[
                "efibootmgr",
                "grub2-efi-aa64",
                "grub2-tools",
                "shim-aa64",
            ]),
            build_packages: strings(&[]),
        },
    );

    let mut outputs = BTreeMap::new();

    outputs.insert(
        "ami".to_string(),
        OutputDefinition {
            filename: "image.raw.xz".into(),
            mime_type: "application/octet-stream".into(),
            packages: strings(&[
                "@core",
                "checkpolicy",
                "chrony",
                "cloud-init",
                "cloud-utils-growpart",
                "dhcp-client",
                "dracut-config-generic",
                "gdisk",
                "kernel",
                "langpacks-en",
                "net-tools",
                "NetworkManager",
                "rng-tools",
                "rocky-release",
                "rsync",
                "selinux-policy-targeted",
                "tar",
                "yum-utils",
            ]),
            excluded_packages: strings(&[
                "aic94xx-firmware",
                "alsa-firmware",
                "alsa-lib",
                "alsa-tools-firmware",
                "biosdevname",
                "dracut-config-rescue",
                "firewalld",
                "iprutils",
                "ivtv-firmware",
                "iwl1000-firmware",
                "iwl100-firmware",
                "iwl105-firmware",
                "iwl135-firmware",
                "iwl2000-firmware",
                "iwl2030-firmware",
                "iwl3160-firmware",
                "iwl3945-firmware",
                "iwl4965-firmware",
                "iwl5000-firmware",
                "iwl5150-firmware",
                "iwl6000-firmware",
                "iwl6000g2a-firmware",
                "iwl6000g2b-firmware",
                "iwl6050-firmware",
                "iwl7260-firmware",
                "libertas-sd8686-firmware",
                "libertas-sd8787-firmware",
                "libertas-usb8388-firmware",
                "plymouth",
            ]),
            enabled_services: strings(&[]),
            disabled_services: strings(&[]),
            bootable: true,
            default_target: Some("multi-user.target".into()),
            kernel_options: "ro console=ttyS0,115200n8 console=tty0 net.ifnames=0 rd.blacklist=nouveau nvme_core.io_timeout=4294967295 crashkernel=auto".into(),
            assembler: qemu_assembler("raw.xz", "image.raw.xz", 6 * GIB),
        },
    );

    outputs.insert(
        "ext4-filesystem".to_string(),
        OutputDefinition {
            filename: "filesystem.img".into(),
            mime_type: "application/octet-stream".into(),
            packages: strings(&[
                "chrony",
                "dracut-config-generic",
                "firewalld",
                "kernel",
                "langpacks-en",
                "policycoreutils",
                "selinux-policy-targeted",
            ]),
            excluded_packages: strings(&["dracut-config-rescue"]),
            enabled_services: strings(&[]),
            disabled_services: strings(&[]),
            bootable: false,
            default_target: None,
            kernel_options: "ro net.ifnames=0".into(),
            assembler: rawfs_assembler("filesystem.img"),
        },
    );

    outputs.insert(
        "partitioned-disk".to_string(),
        OutputDefinition {
            filename: "disk.img".into(),
            mime_type: "application/octet-stream".into(),
            packages: strings(&[
                "@core",
                "chrony",
                "dracut-config-generic",
                "firewalld",
                "kernel",
                "langpacks-en",
                "selinux-policy-targeted",
            ]),
            excluded_packages: strings(&["dracut-config-rescue"]),
            enabled_services: strings(&[]),
            disabled_services: strings(&[]),
            bootable: true,
            default_target: None,
            kernel_options: "ro net.ifnames=0".into(),
            assembler: qemu_assembler("raw", "disk.img", 3 * GIB),
        },
    );

    outputs.insert(
        "qcow2".to_string(),
        OutputDefinition {
            filename: "disk.qcow2".into(),
            mime_type: "application/x-qemu-disk".into(),
            packages: strings(&[
                "chrony",
                "dracut-config-generic",
                "kernel-core",
                "langpacks-en",
                "polkit",
                "selinux-policy-targeted",
                "systemd-udev",
            ]),
            excluded_packages: strings(&[
                "dracut-config-rescue",
                "firewalld",
                "gobject-introspection",
                "plymouth",
            ]),
            enabled_services: strings(&[]),
            disabled_services: strings(&[]),
            bootable: true,
            default_target: None,
            kernel_options: "ro net.ifnames=0".into(),
            assembler: qemu_assembler("qcow2", "disk.qcow2", 3 * GIB),
        },
    );

    outputs.insert(
        "openstack".to_string(),
        OutputDefinition {
            filename: "image.qcow2".into(),
            mime_type: "application/x-qemu-disk".into(),
            packages: strings(&[
                "@core",
                "cloud-init",
                // Generic initrd so the virtio modules the cloud needs
                // are always present.
                "dracut-config-generic",
                "kernel",
                "langpacks-en",
                "qemu-guest-agent",
                "selinux-policy-targeted",
                "spice-vdagent",
            ]),
            excluded_packages: strings(&["dracut-config-rescue"]),
            enabled_services: strings(&[]),
            disabled_services: strings(&[]),
            bootable: true,
            default_target: None,
            kernel_options: "ro net.ifnames=0".into(),
            assembler: qemu_assembler("qcow2", "image.qcow2", 3 * GIB),
        },
    );

    outputs.insert(
        "tar".to_string(),
        OutputDefinition {
            filename: "root.tar.xz".into(),
            mime_type: "application/x-tar".into(),
            packages: strings(&[
                "chrony",
                "dracut-config-generic",
                "firewalld",
                "kernel",
                "langpacks-en",
                "policycoreutils",
                "selinux-policy-targeted",
            ]),
            excluded_packages: strings(&["dracut-config-rescue"]),
            enabled_services: strings(&[]),
            disabled_services: strings(&[]),
            bootable: false,
            default_target: None,
            kernel_options: "ro net.ifnames=0".into(),
            assembler: tar_assembler("root.tar.xz", "xz"),
        },
    );

    outputs.insert(
        "vhd".to_string(),
        OutputDefinition {
            filename: "image.vhd".into(),
            mime_type: "application/x-vhd".into(),
            packages: strings(&[
                "@core",
                "chrony",
                "cloud-init",
                "cloud-utils-growpart",
                // Pull the hv_vmbus/hv_netvsc/hv_storvsc modules into
                // the initrd.
                "dracut-config-generic",
                "gdisk",
                "kernel",
                "langpacks-en",
                "net-tools",
                "python3",
                "selinux-policy-targeted",
                "WALinuxAgent",
            ]),
            excluded_packages: strings(&["dracut-config-rescue"]),
            enabled_services: strings(&["sshd", "waagent"]),
            disabled_services: strings(&[]),
            bootable: true,
            default_target: Some("multi-user.target".into()),
            kernel_options:
                "ro biosdevname=0 rootdelay=300 console=ttyS0 earlyprintk=ttyS0 net.ifnames=0"
                    .into(),
            assembler: qemu_assembler("vpc", "image.vhd", 3 * GIB),
        },
    );

    outputs.insert(
        "vmdk".to_string(),
        OutputDefinition {
            filename: "disk.vmdk".into(),
            mime_type: "application/x-vmdk".into(),
            packages: strings(&[
                "@core",
                "chrony",
                "dracut-config-generic",
                "firewalld",
                "kernel",
                "langpacks-en",
                "open-vm-tools",
                "selinux-policy-targeted",
            ]),
            excluded_packages: strings(&["dracut-config-rescue"]),
            enabled_services: strings(&[]),
            disabled_services: strings(&[]),
            bootable: true,
            default_target: None,
            kernel_options: "ro net.ifnames=0".into(),
            assembler: qemu_assembler("vmdk", "disk.vmdk", 3 * GIB),
        },
    );

    Catalog {
        name: "rocky8".into(),
        release_version: "8".into(),
        module_platform_id: "platform:el8".into(),
        runner: "org.levitate.rocky8".into(),
        build_packages: strings(&[
            "dnf",
            "dracut-config-generic",
            "e2fsprogs",
            "glibc",
            "policycoreutils",
            "python3",
            "qemu-img",
            "systemd",
            "tar",
            "xfsprogs",
        ]),
        root_fs_uuid: ROOT_FS_UUID,
        arches,
        outputs,
        repositories: vec![
            RepoConfig {
                id: "baseos".into(),
                name: "BaseOS".into(),
                mirrorlist: Some(
                    "https://mirrors.rockylinux.org/mirrorlist?arch=$arch&repo=BaseOS-8".into(),
                ),
                check_gpg: Some(true),
                ..RepoConfig::default()
            },
            RepoConfig {
                id: "appstream".into(),
                name: "AppStream".into(),
                mirrorlist: Some(
                    "https://mirrors.rockylinux.org/mirrorlist?arch=$arch&repo=AppStream-8".into(),
                ),
                check_gpg: Some(true),
                ..RepoConfig::default()
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_output_formats() {
        let catalog = catalog();
        assert_eq!(
            catalog.output_formats(),
            vec![
                "ami",
                "ext4-filesystem",
                "openstack",
                "partitioned-disk",
                "qcow2",
                "tar",
                "vhd",
                "vmdk",
            ]
        );
    }

    #[test]
    fn test_expected_architectures() {
        assert_eq!(catalog().architectures(), vec!["aarch64", "x86_64"]);
    }

    #[test]
    fn test_bootable_formats_have_partitioned_assemblers() {
        let catalog = catalog();
        for format in catalog.output_formats() {
            let output = catalog.output(format).unwrap();
            if let Assembler::Qemu(options) = &output.assembler {
                assert!(output.bootable, "{format} is partitioned but not bootable");
                assert_eq!(options.partitions[0].filesystem.uuid, ROOT_FS_UUID);
            }
        }
    }

    #[test]
    fn test_catalog_factory_is_pure() {
        assert_eq!(catalog(), catalog());
    }

    #[test]
    fn test_two_repositories_per_architecture() {
        let catalog = catalog();
        for arch in catalog.architectures() {
            let ids: Vec<String> = catalog
                .repositories(arch)
                .into_iter()
                .map(|r| r.id)
                .collect();
            assert_eq!(ids, vec!["baseos", "appstream"]);
        }
    }
}
