//! Rendered output: one JSON template per stack plus an assembly manifest.

use crate::error::SynthError;
use crate::stack::{Stack, StackEnv};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Content hash of a rendered template, used to detect drift between two
/// synthesis runs without diffing whole documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TemplateHash(String);

impl TemplateHash {
    fn of(body: &str) -> Self {
        let hash = blake3::hash(body.as_bytes());
        TemplateHash(hex::encode(hash.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TemplateHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stack that has been rendered to its final JSON body.
#[derive(Debug, Clone)]
pub struct SynthesizedStack {
    name: String,
    env: StackEnv,
    template_file: String,
    body: String,
    hash: TemplateHash,
}

impl SynthesizedStack {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> &StackEnv {
        &self.env
    }

    pub fn template_file(&self) -> &str {
        &self.template_file
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn hash(&self) -> &TemplateHash {
        &self.hash
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub stack_name: String,
    pub template_file: String,
    pub environment: String,
    pub template_hash: TemplateHash,
}

/// Index of everything the assembly contains, written next to the templates.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyManifest {
    pub version: String,
    pub generated_at: String,
    pub artifacts: Vec<ManifestEntry>,
}

pub const MANIFEST_FILE: &str = "manifest.json";

/// File name a stack's template is written under. Anything that references
/// a template before synthesis (pipeline deploy actions) uses the same rule.
pub fn template_file_name(stack_name: &str) -> String {
    format!("{stack_name}.template.json")
}

/// All synthesized stacks of one app run.
#[derive(Debug, Default)]
pub struct CloudAssembly {
    stacks: Vec<SynthesizedStack>,
}

impl CloudAssembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a stack into the assembly. Fails on an empty template or a
    /// stack name already taken, since both would clobber output files.
    pub fn add_stack(&mut self, stack: Stack) -> Result<(), SynthError> {
        let (name, env, template) = stack.into_parts();
        if self.stacks.iter().any(|s| s.name == name) {
            return Err(SynthError::DuplicateStackName { name });
        }
        if template.resource_count() == 0 {
            return Err(SynthError::EmptyStack { stack: name });
        }

        let body = template.to_json_pretty()?;
        let hash = TemplateHash::of(&body);
        info!(stack = %name, hash = %hash, "synthesized stack");

        self.stacks.push(SynthesizedStack {
            template_file: template_file_name(&name),
            name,
            env,
            body,
            hash,
        });
        Ok(())
    }

    pub fn stacks(&self) -> &[SynthesizedStack] {
        &self.stacks
    }

    pub fn stack(&self, name: &str) -> Option<&SynthesizedStack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    pub fn manifest(&self) -> AssemblyManifest {
        AssemblyManifest {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            artifacts: self
                .stacks
                .iter()
                .map(|s| ManifestEntry {
                    stack_name: s.name.clone(),
                    template_file: s.template_file.clone(),
                    environment: s.env.to_uri(),
                    template_hash: s.hash.clone(),
                })
                .collect(),
        }
    }

    /// Write every template plus `manifest.json` under `out_dir`, creating
    /// the directory if needed. Existing files are overwritten.
    pub fn write_to(&self, out_dir: &Path) -> Result<(), SynthError> {
        fs::create_dir_all(out_dir)?;
        for stack in &self.stacks {
            let path = out_dir.join(&stack.template_file);
            fs::write(&path, stack.body.as_bytes())?;
            info!(stack = %stack.name, path = %path.display(), "wrote template");
        }

        let manifest_path = out_dir.join(MANIFEST_FILE);
        let manifest = serde_json::to_string_pretty(&self.manifest())?;
        fs::write(&manifest_path, manifest.as_bytes())?;
        info!(path = %manifest_path.display(), stacks = self.stacks.len(), "wrote assembly manifest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackforge_core::{Props, Resource};

    fn sample_stack(name: &str) -> Stack {
        let mut stack = Stack::new(name, StackEnv::new("111122223333", "us-west-2"));
        stack
            .add_resource(
                "Cluster",
                Resource::new("AWS::ECS::Cluster", Props::new().set("ClusterName", "testcluster")),
            )
            .unwrap();
        stack
    }

    #[test]
    fn empty_stack_is_rejected() {
        let mut assembly = CloudAssembly::new();
        let err = assembly
            .add_stack(Stack::new("Empty", StackEnv::new("111122223333", "us-west-2")))
            .unwrap_err();
        assert!(matches!(err, SynthError::EmptyStack { .. }));
    }

    #[test]
    fn duplicate_stack_name_is_rejected() {
        let mut assembly = CloudAssembly::new();
        assembly.add_stack(sample_stack("Dup")).unwrap();
        let err = assembly.add_stack(sample_stack("Dup")).unwrap_err();
        assert!(matches!(err, SynthError::DuplicateStackName { .. }));
    }

    #[test]
    fn template_hash_is_stable_for_identical_bodies() {
        let mut first = CloudAssembly::new();
        first.add_stack(sample_stack("Same")).unwrap();
        let mut second = CloudAssembly::new();
        second.add_stack(sample_stack("Same")).unwrap();

        assert_eq!(first.stacks()[0].hash(), second.stacks()[0].hash());
        assert_eq!(first.stacks()[0].hash().as_str().len(), 64);
    }

    #[test]
    fn write_to_emits_templates_and_manifest() {
        let mut assembly = CloudAssembly::new();
        assembly.add_stack(sample_stack("SafeTestECSServiceStack")).unwrap();

        let dir = tempfile::tempdir().unwrap();
        assembly.write_to(dir.path()).unwrap();

        let body = std::fs::read_to_string(dir.path().join("SafeTestECSServiceStack.template.json")).unwrap();
        let template: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(manifest["artifacts"][0]["stackName"], "SafeTestECSServiceStack");
        assert_eq!(manifest["artifacts"][0]["templateFile"], "SafeTestECSServiceStack.template.json");
        assert_eq!(manifest["artifacts"][0]["environment"], "aws://111122223333/us-west-2");
    }
}
