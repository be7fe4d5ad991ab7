//! Pure, deterministic compilation of OS image descriptions into build
//! manifests.
//!
//! The engine takes a customer blueprint plus a distribution/
//! architecture/output-format selection and produces a [`manifest::Manifest`]:
//! an ordered set of build pipelines the (external) build executor
//! interprets syntactically, stage by stage. Nothing here touches the
//! network, the package database, or the filesystem; every input is a
//! value, and identical inputs yield byte-identical output.
//!
//! - **[`blueprint`]** - The customer-facing image description (TOML)
//! - **[`repo`]** - Repository configurations and resolved package sets
//! - **[`pipeline`]** - Stages, assemblers, and the pipeline container
//! - **[`manifest`]** - The serialization unit handed to the executor
//! - **[`distro`]** - Immutable per-distribution catalogs and the
//!   blueprint-to-pipeline translation
//! - **[`image`]** - Composite multi-pipeline image definitions
//!
//! # Example
//!
//! ```rust,ignore
//! use distro_manifest::blueprint::Blueprint;
//! use distro_manifest::distro::rocky8;
//! use distro_manifest::manifest::Manifest;
//!
//! let catalog = rocky8::catalog();
//! let blueprint = Blueprint::from_toml_str(r#"
//!     name = "web"
//!     [[packages]]
//!     name = "nginx"
//! "#)?;
//! let pipeline = catalog.build_pipeline(&blueprint, &[], &checksums, "x86_64", "qcow2")?;
//! let mut manifest = Manifest::new();
//! manifest.add_pipeline("os", pipeline)?;
//! manifest.set_sources(checksums);
//! println!("{}", manifest.to_json()?);
//! ```

pub mod blueprint;
pub mod crypt;
pub mod distro;
pub mod error;
pub mod image;
pub mod manifest;
pub mod pipeline;
pub mod repo;

pub use blueprint::Blueprint;
pub use distro::Catalog;
pub use error::{Error, Result};
pub use manifest::Manifest;
pub use pipeline::Pipeline;
