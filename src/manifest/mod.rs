//! Manifest: the serialization unit handed to the build executor.
//!
//! A manifest aggregates named pipelines plus the resolved checksum per
//! repository. On the wire each pipeline is a flat record referencing
//! its build pipeline by name; owned build chains are flattened
//! dependency-first, and structurally identical pipelines are emitted
//! exactly once (the composite images hand every sub-pipeline its own
//! copy of one build environment, which must serialize as a single
//! pipeline). The executor performs purely syntactic interpretation, so
//! this ordering is a correctness requirement, not a nicety.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::pipeline::{Assembler, Pipeline, Stage};
use crate::repo::Checksums;

/// Root container for one translation result. Immutable once returned
/// by the engine; safe to hand to any number of readers concurrently.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    pipelines: Vec<(String, Pipeline)>,
    sources: Checksums,
}

/// Flat wire record for one pipeline.
#[derive(Debug, Serialize)]
struct WirePipeline<'a> {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    runner: Option<&'a str>,
    stages: &'a [Stage],
    #[serde(skip_serializing_if = "Option::is_none")]
    assembler: Option<&'a Assembler>,
}

impl Manifest {
    pub fn new() -> Manifest {
        Manifest::default()
    }

    /// Insert a named pipeline. Names are unique within a manifest;
    /// insertion order is the serialization order of independent roots.
    pub fn add_pipeline(&mut self, name: impl Into<String>, pipeline: Pipeline) -> Result<()> {
        let name = name.into();
        if self.pipelines.iter().any(|(n, _)| *n == name) {
            return Err(Error::DuplicatePipeline(name));
        }
        self.pipelines.push((name, pipeline));
        Ok(())
    }

    /// Record the resolved checksum for one repository id.
    pub fn add_source(&mut self, repo_id: impl Into<String>, checksum: impl Into<String>) {
        self.sources.insert(repo_id.into(), checksum.into());
    }

    pub fn set_sources(&mut self, sources: Checksums) {
        self.sources = sources;
    }

    pub fn pipelines(&self) -> &[(String, Pipeline)] {
        &self.pipelines
    }

    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
    }

    pub fn sources(&self) -> &Checksums {
        &self.sources
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn flattened(&self) -> Vec<WirePipeline<'_>> {
        let mut out = Vec::new();
        let mut emitted: Vec<(String, &Pipeline)> = Vec::new();
        for (name, pipeline) in &self.pipelines {
            emit(name, pipeline, &mut out, &mut emitted);
        }
        out
    }
}

/// Emit `pipeline` under `name`, its build chain first. Returns the name
/// the pipeline ended up under: a structurally identical pipeline that
/// was already emitted is not emitted again, its existing name is
/// reused.
fn emit<'a>(
    name: &str,
    pipeline: &'a Pipeline,
    out: &mut Vec<WirePipeline<'a>>,
    emitted: &mut Vec<(String, &'a Pipeline)>,
) -> String {
    if let Some((existing, _)) = emitted.iter().find(|(_, p)| *p == pipeline) {
        return existing.clone();
    }

    let build = pipeline
        .build()
        .map(|b| emit(&format!("{name}-build"), b, out, emitted));

    emitted.push((name.to_string(), pipeline));
    out.push(WirePipeline {
        name: name.to_string(),
        build,
        runner: pipeline.runner(),
        stages: pipeline.stages(),
        assembler: pipeline.assembler(),
    });
    name.to_string()
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Manifest", 2)?;
        state.serialize_field("pipelines", &self.flattened())?;
        state.serialize_field("sources", &self.sources)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::assembler::TarAssemblerOptions;
    use crate::pipeline::stage::{FixBlsStageOptions, HostnameStageOptions};

    fn build_env() -> Pipeline {
        let mut p = Pipeline::new();
        p.add_stage(Stage::FixBls(FixBlsStageOptions::default()));
        p
    }

    fn os_pipeline(hostname: &str) -> Pipeline {
        let mut p = Pipeline::new();
        p.set_build(build_env(), "org.levitate.rocky8").unwrap();
        p.add_stage(Stage::Hostname(HostnameStageOptions {
            hostname: hostname.into(),
        }));
        p.set_assembler(Assembler::Tar(TarAssemblerOptions {
            filename: "root.tar".into(),
            compression: None,
        }));
        p
    }

    #[test]
    fn test_duplicate_pipeline_names_are_rejected() {
        let mut m = Manifest::new();
        m.add_pipeline("os", Pipeline::new()).unwrap();
        assert!(matches!(
            m.add_pipeline("os", Pipeline::new()),
            Err(Error::DuplicatePipeline(name)) if name == "os"
        ));
    }

    #[test]
    fn test_build_pipeline_serializes_before_dependent() {
        let mut m = Manifest::new();
        m.add_pipeline("os", os_pipeline("node1")).unwrap();
        m.add_source("baseos", "sha256:aa00");

        let json: serde_json::Value =
            serde_json::from_str(&m.to_json().unwrap()).unwrap();
        let pipelines = json["pipelines"].as_array().unwrap();
        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0]["name"], "os-build");
        assert!(pipelines[0].get("build").is_none());
        assert_eq!(pipelines[1]["name"], "os");
        assert_eq!(pipelines[1]["build"], "os-build");
        assert_eq!(pipelines[1]["runner"], "org.levitate.rocky8");
        assert_eq!(json["sources"]["baseos"], "sha256:aa00");
    }

    #[test]
    fn test_identical_build_environments_serialize_exactly_once() {
        // Two pipelines each own a copy of the same build environment,
        // the way composite images are wired.
        let mut m = Manifest::new();
        m.add_pipeline("tree-a", os_pipeline("a")).unwrap();
        m.add_pipeline("tree-b", os_pipeline("b")).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&m.to_json().unwrap()).unwrap();
        let pipelines = json["pipelines"].as_array().unwrap();
        let build_count = pipelines
            .iter()
            .filter(|p| p["name"].as_str().unwrap().ends_with("-build"))
            .count();
        assert_eq!(build_count, 1);
        assert_eq!(pipelines[1]["build"], "tree-a-build");
        assert_eq!(pipelines[2]["build"], "tree-a-build");
    }

    #[test]
    fn test_sources_serialize_in_stable_order() {
        let mut m = Manifest::new();
        m.add_source("zeta", "sha256:ff");
        m.add_source("alpha", "sha256:aa");
        let text = m.to_json().unwrap();
        assert!(text.find("alpha").unwrap() < text.find("zeta").unwrap());
    }
}
