//! CodeBuild projects and buildspec documents.

use crate::iam::{inline_policy, PolicyDocument, PolicyStatement, Principal, Role};
use serde::Serialize;
use stackforge_core::{pseudo, CfnValue, Props, Resource};
use stackforge_synth::{Stack, SynthError};
use std::collections::BTreeMap;

/// Curated build images.
pub mod image {
    /// Amazon Linux 2 standard image, docker capable.
    pub const AMAZON_LINUX_2_STANDARD_3: &str = "aws/codebuild/amazonlinux2-x86_64-standard:3.0";
    /// Ubuntu standard image for toolchain builds.
    pub const STANDARD_7: &str = "aws/codebuild/standard:7.0";
}

/// A buildspec document, version 0.2. Embedded into the project resource as
/// a JSON string.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSpec {
    version: &'static str,
    phases: Phases,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifacts: Option<Artifacts>,
}

impl BuildSpec {
    pub fn v0_2(phases: Phases) -> Self {
        BuildSpec {
            version: "0.2",
            phases,
            artifacts: None,
        }
    }

    pub fn with_artifacts(mut self, artifacts: Artifacts) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Build phases, serialized in lifecycle order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Phases {
    #[serde(skip_serializing_if = "Option::is_none")]
    install: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pre_build: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_build: Option<Phase>,
}

impl Phases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(mut self, phase: Phase) -> Self {
        self.install = Some(phase);
        self
    }

    pub fn pre_build(mut self, phase: Phase) -> Self {
        self.pre_build = Some(phase);
        self
    }

    pub fn build(mut self, phase: Phase) -> Self {
        self.build = Some(phase);
        self
    }

    pub fn post_build(mut self, phase: Phase) -> Self {
        self.post_build = Some(phase);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Phase {
    #[serde(rename = "runtime-versions", skip_serializing_if = "BTreeMap::is_empty")]
    runtime_versions: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    commands: Vec<String>,
}

impl Phase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runtime(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.runtime_versions.insert(name.into(), version.into());
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
        self
    }
}

/// Output artifacts of a buildspec: one primary group, or several named
/// secondary groups when the pipeline action declares multiple outputs.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Artifacts {
    Primary(ArtifactSpec),
    Secondary {
        #[serde(rename = "secondary-artifacts")]
        groups: BTreeMap<String, ArtifactSpec>,
    },
}

impl Artifacts {
    pub fn primary(spec: ArtifactSpec) -> Self {
        Artifacts::Primary(spec)
    }

    pub fn secondary<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = (S, ArtifactSpec)>,
        S: Into<String>,
    {
        Artifacts::Secondary {
            groups: groups.into_iter().map(|(name, spec)| (name.into(), spec)).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSpec {
    #[serde(rename = "base-directory", skip_serializing_if = "Option::is_none")]
    base_directory: Option<String>,
    files: Vec<String>,
}

impl ArtifactSpec {
    pub fn files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ArtifactSpec {
            base_directory: None,
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    pub fn in_directory(mut self, directory: impl Into<String>) -> Self {
        self.base_directory = Some(directory.into());
        self
    }
}

/// Everything a pipeline-bound project needs beyond its name.
#[derive(Debug, Clone)]
pub struct PipelineProjectSpec {
    pub build_spec: BuildSpec,
    pub image: &'static str,
    pub privileged: bool,
    pub environment_variables: Vec<(String, CfnValue)>,
    /// Statements appended to the service role beyond log access.
    pub role_statements: Vec<PolicyStatement>,
}

/// Handle to a created CodeBuild project.
#[derive(Debug, Clone)]
pub struct PipelineProject {
    logical_id: String,
}

impl PipelineProject {
    /// Declare the project, its service role and the role's default policy.
    /// Source and artifacts are both CODEPIPELINE: the pipeline owns them.
    pub fn create(stack: &mut Stack, logical_id: &str, spec: PipelineProjectSpec) -> Result<Self, SynthError> {
        let role_id = format!("{logical_id}Role");
        let policy_id = format!("{role_id}DefaultPolicy");

        stack.add_resource(
            &role_id,
            Role::assumed_by(Principal::service("codebuild.amazonaws.com")).into_resource(),
        )?;

        let mut log_group_parts = vec![
            CfnValue::string("arn:"),
            CfnValue::ref_to(pseudo::PARTITION),
            ":logs:".into(),
            CfnValue::ref_to(pseudo::REGION),
            ":".into(),
            CfnValue::ref_to(pseudo::ACCOUNT_ID),
            ":log-group:/aws/codebuild/".into(),
            CfnValue::ref_to(logical_id),
        ];
        let log_group = CfnValue::concat(log_group_parts.clone());
        log_group_parts.push(":*".into());
        let log_streams = CfnValue::concat(log_group_parts);

        let mut document = PolicyDocument::new(vec![PolicyStatement::allow()
            .actions(["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"])
            .resources([log_group, log_streams])]);
        for statement in spec.role_statements {
            document.push(statement);
        }
        stack.add_resource(
            &policy_id,
            inline_policy(&policy_id, &document, vec![CfnValue::ref_to(role_id.as_str())]),
        )?;

        let mut environment = Props::new()
            .set("ComputeType", "BUILD_GENERAL1_SMALL")
            .set("Image", spec.image)
            .set("Type", "LINUX_CONTAINER");
        if spec.privileged {
            environment = environment.set("PrivilegedMode", true);
        }
        if !spec.environment_variables.is_empty() {
            environment = environment.set(
                "EnvironmentVariables",
                CfnValue::List(
                    spec.environment_variables
                        .into_iter()
                        .map(|(name, value)| {
                            Props::new()
                                .set("Name", name)
                                .set("Type", "PLAINTEXT")
                                .set("Value", value)
                                .into()
                        })
                        .collect(),
                ),
            );
        }

        let build_spec_json = spec.build_spec.to_json_string()?;
        stack.add_resource(
            logical_id,
            Resource::new(
                "AWS::CodeBuild::Project",
                Props::new()
                    .set("Artifacts", Props::new().set("Type", "CODEPIPELINE"))
                    .set("Environment", environment)
                    .set("ServiceRole", CfnValue::get_att(role_id.as_str(), "Arn"))
                    .set(
                        "Source",
                        Props::new().set("BuildSpec", build_spec_json).set("Type", "CODEPIPELINE"),
                    ),
            ),
        )?;

        Ok(PipelineProject {
            logical_id: logical_id.to_string(),
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn name(&self) -> CfnValue {
        CfnValue::ref_to(self.logical_id.as_str())
    }

    pub fn arn(&self) -> CfnValue {
        CfnValue::get_att(self.logical_id.as_str(), "Arn")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackforge_synth::StackEnv;

    fn spec_with_phases() -> BuildSpec {
        BuildSpec::v0_2(
            Phases::new()
                .install(Phase::new().runtime("java", "corretto11").runtime("docker", "18"))
                .pre_build(Phase::new().command("echo pre"))
                .build(Phase::new().command("./gradlew build"))
                .post_build(Phase::new().command("echo post")),
        )
        .with_artifacts(Artifacts::primary(ArtifactSpec::files(["imageDetail.json"])))
    }

    #[test]
    fn phases_serialize_in_lifecycle_order() {
        let body = spec_with_phases().to_json_string().unwrap();
        let install = body.find("\"install\"").unwrap();
        let pre_build = body.find("\"pre_build\"").unwrap();
        let build = body.find("\"build\"").unwrap();
        let post_build = body.find("\"post_build\"").unwrap();
        assert!(install < pre_build && pre_build < build && build < post_build);
    }

    #[test]
    fn runtime_versions_use_hyphenated_key() {
        let body = spec_with_phases().to_json_string().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["phases"]["install"]["runtime-versions"]["java"], "corretto11");
        assert_eq!(parsed["version"], "0.2");
    }

    #[test]
    fn secondary_artifacts_group_by_identifier() {
        let spec = BuildSpec::v0_2(Phases::new().build(Phase::new().command("true"))).with_artifacts(
            Artifacts::secondary([
                ("CdkBuildOutput", ArtifactSpec::files(["Stack.template.json"]).in_directory("infrastructure/dist")),
                ("AssetBuildOutput", ArtifactSpec::files(["*"]).in_directory("infrastructure/dist/myartifact")),
            ]),
        );
        let parsed: serde_json::Value = serde_json::from_str(&spec.to_json_string().unwrap()).unwrap();
        let groups = &parsed["artifacts"]["secondary-artifacts"];
        assert_eq!(groups["CdkBuildOutput"]["base-directory"], "infrastructure/dist");
        assert_eq!(groups["AssetBuildOutput"]["files"], serde_json::json!(["*"]));
    }

    #[test]
    fn project_declares_role_policy_and_source() {
        let mut stack = Stack::new("Pipeline", StackEnv::new("111122223333", "us-west-2"));
        let project = PipelineProject::create(
            &mut stack,
            "JavaBuild",
            PipelineProjectSpec {
                build_spec: spec_with_phases(),
                image: image::AMAZON_LINUX_2_STANDARD_3,
                privileged: true,
                environment_variables: vec![("ECR_REPOSITORY_URI".to_string(), CfnValue::string("uri"))],
                role_statements: vec![PolicyStatement::allow().action("ecr:GetAuthorizationToken").resource("*")],
            },
        )
        .unwrap();

        assert_eq!(project.logical_id(), "JavaBuild");
        let template = stack.template();
        assert!(template.resource("JavaBuildRole").is_some());
        assert!(template.resource("JavaBuildRoleDefaultPolicy").is_some());

        let rendered = serde_json::to_value(template.resource("JavaBuild").unwrap()).unwrap();
        assert_eq!(rendered["Properties"]["Artifacts"]["Type"], "CODEPIPELINE");
        assert_eq!(rendered["Properties"]["Environment"]["PrivilegedMode"], true);
        assert_eq!(
            rendered["Properties"]["Environment"]["Image"],
            "aws/codebuild/amazonlinux2-x86_64-standard:3.0"
        );
        assert_eq!(
            rendered["Properties"]["Environment"]["EnvironmentVariables"][0]["Name"],
            "ECR_REPOSITORY_URI"
        );
        let buildspec = rendered["Properties"]["Source"]["BuildSpec"].as_str().unwrap();
        assert!(buildspec.contains("./gradlew build"));

        let policy = serde_json::to_value(template.resource("JavaBuildRoleDefaultPolicy").unwrap()).unwrap();
        let statements = policy["Properties"]["PolicyDocument"]["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1]["Action"], "ecr:GetAuthorizationToken");
    }

    #[test]
    fn unprivileged_project_omits_the_flag() {
        let mut stack = Stack::new("Pipeline", StackEnv::new("111122223333", "us-west-2"));
        PipelineProject::create(
            &mut stack,
            "CdkBuild",
            PipelineProjectSpec {
                build_spec: BuildSpec::v0_2(Phases::new().build(Phase::new().command("true"))),
                image: image::STANDARD_7,
                privileged: false,
                environment_variables: Vec::new(),
                role_statements: Vec::new(),
            },
        )
        .unwrap();

        let rendered = serde_json::to_value(stack.template().resource("CdkBuild").unwrap()).unwrap();
        assert!(rendered["Properties"]["Environment"].get("PrivilegedMode").is_none());
        assert!(rendered["Properties"]["Environment"].get("EnvironmentVariables").is_none());
    }
}
