//! Partition-table generation for composite images.
//!
//! Identifiers are drawn exclusively from the caller-supplied generator:
//! two translations seeded identically must produce byte-identical
//! manifests, so nothing here touches ambient randomness.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::{Builder, Uuid};

/// GPT partition type GUID of an EFI system partition.
const ESP_TYPE_GUID: &str = "C12A7328-F81F-11D2-BA4B-00A0C93EC93B";

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionTable {
    pub uuid: Uuid,
    #[serde(rename = "type")]
    pub pt_type: String,
    pub partitions: Vec<Partition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Offset and length in bytes.
    pub start: u64,
    pub size: u64,
    pub partition_type: String,
    pub uuid: Uuid,
    pub bootable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<Filesystem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filesystem {
    #[serde(rename = "type")]
    pub fs_type: String,
    /// Filesystem identifier; a 32-bit hex volume id for vfat.
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub mountpoint: String,
}

/// Draw a version-4 UUID from the injected generator.
pub fn uuid_from_rng(rng: &mut impl RngCore) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    Builder::from_random_bytes(bytes).into_uuid()
}

/// Draw a FAT volume id (32-bit, lowercase hex) from the generator.
pub fn volid_from_rng(rng: &mut impl RngCore) -> String {
    format!("{:08x}", rng.next_u32())
}

/// The partition table of the EFI boot image embedded in an installer
/// ISO: a single EFI system partition holding the boot tree.
pub fn efi_boot_partition_table(rng: &mut impl RngCore) -> PartitionTable {
    PartitionTable {
        uuid: uuid_from_rng(rng),
        pt_type: "gpt".into(),
        partitions: vec![Partition {
            start: MIB,
            size: 20 * MIB,
            partition_type: ESP_TYPE_GUID.into(),
            uuid: uuid_from_rng(rng),
            bootable: true,
            filesystem: Some(Filesystem {
                fs_type: "vfat".into(),
                uuid: volid_from_rng(rng),
                label: Some("EFI-SYSTEM".into()),
                mountpoint: "/".into(),
            }),
        }],
    }
}
