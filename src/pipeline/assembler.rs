//! Assembler definitions.
//!
//! An assembler is the terminal stage of a pipeline: it turns the
//! prepared filesystem tree into exactly one distributable artifact.
//! Structurally it looks like a stage (`{"name", "options"}` on the
//! wire) but it is stored as a distinct pipeline field so "at most one,
//! and last" holds by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A closed variant over the known artifact producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "options")]
pub enum Assembler {
    #[serde(rename = "org.levitate.qemu")]
    Qemu(QemuAssemblerOptions),
    #[serde(rename = "org.levitate.tar")]
    Tar(TarAssemblerOptions),
    #[serde(rename = "org.levitate.rawfs")]
    RawFs(RawFsAssemblerOptions),
    #[serde(rename = "org.levitate.iso")]
    Iso(IsoAssemblerOptions),
}

impl Assembler {
    /// The stable wire identifier of this assembler.
    pub fn name(&self) -> &'static str {
        match self {
            Assembler::Qemu(_) => "org.levitate.qemu",
            Assembler::Tar(_) => "org.levitate.tar",
            Assembler::RawFs(_) => "org.levitate.rawfs",
            Assembler::Iso(_) => "org.levitate.iso",
        }
    }

    /// The filename of the artifact this assembler produces.
    pub fn filename(&self) -> &str {
        match self {
            Assembler::Qemu(options) => &options.filename,
            Assembler::Tar(options) => &options.filename,
            Assembler::RawFs(options) => &options.filename,
            Assembler::Iso(options) => &options.filename,
        }
    }
}

/// Writes a partitioned disk image in one of the qemu-img formats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QemuAssemblerOptions {
    /// Target disk format ("raw", "raw.xz", "qcow2", "vpc", "vmdk").
    pub format: String,
    pub filename: String,
    pub size: u64,
    pub ptuuid: String,
    pub pttype: String,
    pub partitions: Vec<QemuPartition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QemuPartition {
    pub start: u64,
    pub bootable: bool,
    pub filesystem: QemuFilesystem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QemuFilesystem {
    #[serde(rename = "type")]
    pub fs_type: String,
    pub uuid: Uuid,
    pub mountpoint: String,
}

/// Packs the tree into a (optionally compressed) tarball.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TarAssemblerOptions {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
}

/// Writes the tree into a single unpartitioned filesystem image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFsAssemblerOptions {
    pub filename: String,
    pub root_fs_uuid: Uuid,
    pub size: u64,
    pub fs_type: String,
}

/// Produces the final bootable ISO 9660 image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsoAssemblerOptions {
    pub filename: String,
    /// Volume label; boot entries locate the medium via this label.
    pub volid: String,
    pub isolinux: bool,
}
