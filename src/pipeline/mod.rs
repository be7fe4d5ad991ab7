//! Pipeline model: an ordered sequence of stages, an optional upstream
//! build pipeline, and an optional terminal assembler.
//!
//! The build pipeline is the environment the stages execute in; it is
//! attached by value, so ownership transfer (no sharing of one build
//! pipeline between two consumers) is enforced by move semantics. A
//! pipeline with stages but no build pipeline runs in the executor's
//! minimal default environment, which is only acceptable for the root
//! build pipeline itself.

pub mod assembler;
pub mod stage;

pub use assembler::Assembler;
pub use stage::Stage;

use crate::error::{Error, Result};

/// One build pipeline. Pure data; immutable once the translator returns
/// it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    build: Option<Box<Pipeline>>,
    runner: Option<String>,
    stages: Vec<Stage>,
    assembler: Option<Assembler>,
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline::default()
    }

    /// Attach the build pipeline this pipeline's stages execute in,
    /// together with the runner identity for that environment. Takes the
    /// build pipeline by value: once attached it cannot be reused
    /// elsewhere.
    ///
    /// A build environment is not an artifact producer; a build pipeline
    /// carrying an assembler is rejected.
    pub fn set_build(&mut self, build: Pipeline, runner: impl Into<String>) -> Result<()> {
        if build.assembler.is_some() {
            return Err(Error::BuildPipelineProducesArtifact);
        }
        self.build = Some(Box::new(build));
        self.runner = Some(runner.into());
        Ok(())
    }

    /// Append a stage. Order is meaningful and preserved.
    pub fn add_stage(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// Set the terminal assembler. At most one exists, held as a
    /// distinct field rather than a list member.
    pub fn set_assembler(&mut self, assembler: Assembler) {
        self.assembler = Some(assembler);
    }

    pub fn build(&self) -> Option<&Pipeline> {
        self.build.as_deref()
    }

    pub fn runner(&self) -> Option<&str> {
        self.runner.as_deref()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn assembler(&self) -> Option<&Assembler> {
        self.assembler.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::assembler::TarAssemblerOptions;
    use crate::pipeline::stage::{FixBlsStageOptions, HostnameStageOptions};

    fn tar_assembler() -> Assembler {
        Assembler::Tar(TarAssemblerOptions {
            filename: "root.tar".into(),
            compression: None,
        })
    }

    #[test]
    fn test_stage_order_is_preserved() {
        let mut p = Pipeline::new();
        p.add_stage(Stage::FixBls(FixBlsStageOptions::default()));
        p.add_stage(Stage::Hostname(HostnameStageOptions {
            hostname: "a".into(),
        }));
        let names: Vec<_> = p.stages().iter().map(Stage::name).collect();
        assert_eq!(names, ["org.levitate.fix-bls", "org.levitate.hostname"]);
    }

    #[test]
    fn test_build_pipeline_with_assembler_is_rejected() {
        let mut build = Pipeline::new();
        build.set_assembler(tar_assembler());

        let mut p = Pipeline::new();
        assert!(matches!(
            p.set_build(build, "org.levitate.rocky8"),
            Err(Error::BuildPipelineProducesArtifact)
        ));
        assert!(p.build().is_none());
        assert!(p.runner().is_none());
    }

    #[test]
    fn test_set_build_records_runner_identity() {
        let mut p = Pipeline::new();
        p.set_build(Pipeline::new(), "org.levitate.rocky8").unwrap();
        assert_eq!(p.runner(), Some("org.levitate.rocky8"));
        assert!(p.build().is_some());
    }
}
