//! CodePipeline topology: artifacts, actions, stages and the pipeline
//! resource itself.
//!
//! `Pipeline::create` validates the declared topology before any resource is
//! attached: artifact names are unique, every consumed artifact has exactly
//! one producer in a strictly earlier stage, stage names are unique, and
//! parameter overrides must name parameters the target template declares
//! whenever that template is part of the same assembly.

use crate::codebuild::PipelineProject;
use crate::codecommit::RepositoryRef;
use crate::iam::{inline_policy, PolicyDocument, PolicyStatement, Principal, Role};
use crate::s3;
use crate::sns::Topic;
use stackforge_core::{pseudo, CfnValue, Props, Resource};
use stackforge_synth::{Stack, StackEnv, SynthError};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline declares {count} stage(s); a pipeline needs a source stage and at least one more")]
    TooFewStages { count: usize },

    #[error("stage `{stage}` is declared twice")]
    DuplicateStage { stage: String },

    #[error("stage `{stage}` has no actions")]
    EmptyStage { stage: String },

    #[error("artifact `{artifact}` is produced by both `{first}` and `{second}`")]
    ArtifactProducedTwice {
        artifact: String,
        first: String,
        second: String,
    },

    #[error("action `{action}` consumes artifact `{artifact}` that no action produces")]
    UnknownArtifact { artifact: String, action: String },

    #[error("action `{action}` in stage `{stage}` consumes artifact `{artifact}` before stage `{produced_in}` has produced it")]
    ArtifactNotYetProduced {
        artifact: String,
        action: String,
        stage: String,
        produced_in: String,
    },

    #[error("action `{action}` overrides parameter `{parameter}` but template `{template_file}` does not declare it")]
    UnknownParameterOverride {
        action: String,
        parameter: String,
        template_file: String,
    },

    #[error("action `{action}` deploys to account {account} but the pipeline runs in {pipeline_account}; cross-account deployment roles are not modeled")]
    CrossAccountDeploy {
        action: String,
        account: String,
        pipeline_account: String,
    },

    #[error(transparent)]
    Synth(#[from] SynthError),
}

/// A named artifact passed between stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    name: String,
}

impl Artifact {
    pub fn named(name: impl Into<String>) -> Self {
        Artifact { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<artifact>::<file>`, the path form deploy actions use.
    pub fn at_path(&self, file: impl Into<String>) -> TemplatePath {
        TemplatePath {
            artifact: self.clone(),
            file: file.into(),
        }
    }

    pub fn bucket_name(&self) -> ArtifactValue {
        ArtifactValue::BucketName(self.clone())
    }

    pub fn object_key(&self) -> ArtifactValue {
        ArtifactValue::ObjectKey(self.clone())
    }

    pub fn get_param(&self, file: impl Into<String>, key: impl Into<String>) -> ArtifactValue {
        ArtifactValue::GetParam {
            artifact: self.clone(),
            file: file.into(),
            key: key.into(),
        }
    }
}

/// A file inside a produced artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePath {
    artifact: Artifact,
    file: String,
}

impl TemplatePath {
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn location(&self) -> String {
        format!("{}::{}", self.artifact.name, self.file)
    }
}

/// A parameter-override value: a literal, or one of the pipeline-scoped
/// functions resolved while the deploy action runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactValue {
    Literal(String),
    BucketName(Artifact),
    ObjectKey(Artifact),
    GetParam {
        artifact: Artifact,
        file: String,
        key: String,
    },
}

impl ArtifactValue {
    pub fn literal(value: impl Into<String>) -> Self {
        ArtifactValue::Literal(value.into())
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            ArtifactValue::Literal(value) => serde_json::Value::String(value.clone()),
            ArtifactValue::BucketName(artifact) => {
                serde_json::json!({"Fn::GetArtifactAtt": [artifact.name(), "BucketName"]})
            }
            ArtifactValue::ObjectKey(artifact) => {
                serde_json::json!({"Fn::GetArtifactAtt": [artifact.name(), "ObjectKey"]})
            }
            ArtifactValue::GetParam { artifact, file, key } => {
                serde_json::json!({"Fn::GetParam": [artifact.name(), file, key]})
            }
        }
    }

    fn artifact(&self) -> Option<&Artifact> {
        match self {
            ArtifactValue::Literal(_) => None,
            ArtifactValue::BucketName(artifact) | ArtifactValue::ObjectKey(artifact) => Some(artifact),
            ArtifactValue::GetParam { artifact, .. } => Some(artifact),
        }
    }
}

/// One pipeline action.
#[derive(Debug, Clone)]
pub enum Action {
    CodeCommitSource {
        action_name: String,
        repository: RepositoryRef,
        branch: String,
        output: Artifact,
    },
    CodeBuild {
        action_name: String,
        project: PipelineProject,
        input: Artifact,
        outputs: Vec<Artifact>,
    },
    CloudFormationCreateUpdate {
        action_name: String,
        template_path: TemplatePath,
        stack_name: String,
        admin_permissions: bool,
        parameter_overrides: BTreeMap<String, ArtifactValue>,
        extra_inputs: Vec<Artifact>,
        account: String,
    },
    ManualApproval {
        action_name: String,
        notify_emails: Vec<String>,
        additional_information: String,
    },
}

impl Action {
    pub fn name(&self) -> &str {
        match self {
            Action::CodeCommitSource { action_name, .. }
            | Action::CodeBuild { action_name, .. }
            | Action::CloudFormationCreateUpdate { action_name, .. }
            | Action::ManualApproval { action_name, .. } => action_name,
        }
    }

    fn produced(&self) -> Vec<&Artifact> {
        match self {
            Action::CodeCommitSource { output, .. } => vec![output],
            Action::CodeBuild { outputs, .. } => outputs.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Everything the action reads, including artifacts referenced from
    /// parameter-override functions.
    fn consumed(&self) -> Vec<&Artifact> {
        match self {
            Action::CodeCommitSource { .. } | Action::ManualApproval { .. } => Vec::new(),
            Action::CodeBuild { input, .. } => vec![input],
            Action::CloudFormationCreateUpdate {
                template_path,
                parameter_overrides,
                extra_inputs,
                ..
            } => {
                let mut consumed = vec![template_path.artifact()];
                consumed.extend(extra_inputs.iter());
                consumed.extend(parameter_overrides.values().filter_map(ArtifactValue::artifact));
                consumed
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stage {
    name: String,
    actions: Vec<Action>,
}

impl Stage {
    pub fn new(name: impl Into<String>, actions: Vec<Action>) -> Self {
        Stage {
            name: name.into(),
            actions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSpec {
    pub stages: Vec<Stage>,
}

/// Parameter sets of templates synthesized by this same app, keyed by
/// template file name. Overrides against a registered template are checked;
/// templates produced elsewhere cannot be checked and pass through.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, BTreeSet<String>>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<I, S>(&mut self, template_file: impl Into<String>, parameters: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.templates.insert(
            template_file.into(),
            parameters.into_iter().map(Into::into).collect(),
        );
    }

    fn parameters(&self, template_file: &str) -> Option<&BTreeSet<String>> {
        self.templates.get(template_file)
    }
}

/// Handle to a created pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    logical_id: String,
}

impl Pipeline {
    /// Validate the topology, then declare the pipeline with its artifact
    /// bucket, service role and per-action support resources.
    pub fn create(
        stack: &mut Stack,
        logical_id: &str,
        spec: PipelineSpec,
        catalog: &TemplateCatalog,
    ) -> Result<Self, PipelineError> {
        validate(&spec, stack.env(), catalog)?;

        let bucket_id = format!("{logical_id}ArtifactsBucket");
        stack.add_resource(&bucket_id, s3::artifact_bucket())?;

        let role_id = format!("{logical_id}Role");
        stack.add_resource(
            &role_id,
            Role::assumed_by(Principal::service("codepipeline.amazonaws.com")).into_resource(),
        )?;

        let mut statements = vec![PolicyStatement::allow()
            .actions([
                "s3:GetObject*",
                "s3:GetBucket*",
                "s3:List*",
                "s3:DeleteObject*",
                "s3:PutObject*",
                "s3:Abort*",
            ])
            .resources([
                CfnValue::get_att(bucket_id.as_str(), "Arn"),
                CfnValue::concat(vec![CfnValue::get_att(bucket_id.as_str(), "Arn"), "/*".into()]),
            ])];

        let mut stage_values = Vec::with_capacity(spec.stages.len());
        for stage in &spec.stages {
            let mut action_values = Vec::with_capacity(stage.actions.len());
            for action in &stage.actions {
                action_values.push(render_action(stack, action, &mut statements)?);
            }
            stage_values.push(
                Props::new()
                    .set("Actions", CfnValue::List(action_values))
                    .set("Name", stage.name())
                    .into(),
            );
        }

        let policy_id = format!("{role_id}DefaultPolicy");
        stack.add_resource(
            &policy_id,
            inline_policy(
                &policy_id,
                &PolicyDocument::new(statements),
                vec![CfnValue::ref_to(role_id.as_str())],
            ),
        )?;

        stack.add_resource(
            logical_id,
            Resource::new(
                "AWS::CodePipeline::Pipeline",
                Props::new()
                    .set(
                        "ArtifactStore",
                        Props::new()
                            .set("Location", CfnValue::ref_to(bucket_id.as_str()))
                            .set("Type", "S3"),
                    )
                    .set("RoleArn", CfnValue::get_att(role_id.as_str(), "Arn"))
                    .set("Stages", CfnValue::List(stage_values)),
            )
            .with_depends_on(policy_id),
        )?;

        info!(pipeline = logical_id, stages = spec.stages.len(), "declared delivery pipeline");
        Ok(Pipeline {
            logical_id: logical_id.to_string(),
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }
}

fn validate(spec: &PipelineSpec, env: &StackEnv, catalog: &TemplateCatalog) -> Result<(), PipelineError> {
    if spec.stages.len() < 2 {
        return Err(PipelineError::TooFewStages {
            count: spec.stages.len(),
        });
    }

    let mut stage_names = BTreeSet::new();
    let mut produced: BTreeMap<&str, (usize, &str)> = BTreeMap::new();
    for (index, stage) in spec.stages.iter().enumerate() {
        if !stage_names.insert(stage.name.as_str()) {
            return Err(PipelineError::DuplicateStage {
                stage: stage.name.clone(),
            });
        }
        if stage.actions.is_empty() {
            return Err(PipelineError::EmptyStage {
                stage: stage.name.clone(),
            });
        }
        for action in &stage.actions {
            for artifact in action.produced() {
                if let Some((_, first)) = produced.insert(artifact.name(), (index, action.name())) {
                    return Err(PipelineError::ArtifactProducedTwice {
                        artifact: artifact.name().to_string(),
                        first: first.to_string(),
                        second: action.name().to_string(),
                    });
                }
            }
        }
    }

    for (index, stage) in spec.stages.iter().enumerate() {
        for action in &stage.actions {
            for artifact in action.consumed() {
                match produced.get(artifact.name()) {
                    None => {
                        return Err(PipelineError::UnknownArtifact {
                            artifact: artifact.name().to_string(),
                            action: action.name().to_string(),
                        })
                    }
                    Some((producer_stage, _)) if *producer_stage >= index => {
                        return Err(PipelineError::ArtifactNotYetProduced {
                            artifact: artifact.name().to_string(),
                            action: action.name().to_string(),
                            stage: stage.name.clone(),
                            produced_in: spec.stages[*producer_stage].name.clone(),
                        })
                    }
                    _ => {}
                }
            }

            if let Action::CloudFormationCreateUpdate {
                action_name,
                template_path,
                parameter_overrides,
                account,
                ..
            } = action
            {
                if account != &env.account {
                    return Err(PipelineError::CrossAccountDeploy {
                        action: action_name.clone(),
                        account: account.clone(),
                        pipeline_account: env.account.clone(),
                    });
                }
                if let Some(parameters) = catalog.parameters(template_path.file()) {
                    for parameter in parameter_overrides.keys() {
                        if !parameters.contains(parameter) {
                            return Err(PipelineError::UnknownParameterOverride {
                                action: action_name.clone(),
                                parameter: parameter.clone(),
                                template_file: template_path.file().to_string(),
                            });
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn render_action(
    stack: &mut Stack,
    action: &Action,
    statements: &mut Vec<PolicyStatement>,
) -> Result<CfnValue, PipelineError> {
    let rendered = match action {
        Action::CodeCommitSource {
            action_name,
            repository,
            branch,
            output,
        } => {
            statements.push(
                PolicyStatement::allow()
                    .actions([
                        "codecommit:GetBranch",
                        "codecommit:GetCommit",
                        "codecommit:UploadArchive",
                        "codecommit:GetUploadArchiveStatus",
                        "codecommit:CancelUploadArchive",
                    ])
                    .resource(repository.arn()),
            );
            Props::new()
                .set("ActionTypeId", action_type("Source", "CodeCommit"))
                .set(
                    "Configuration",
                    Props::new()
                        .set("BranchName", branch.as_str())
                        .set("PollForSourceChanges", true)
                        .set("RepositoryName", repository.name()),
                )
                .set("Name", action_name.as_str())
                .set("OutputArtifacts", artifact_list(std::slice::from_ref(output)))
                .set("RunOrder", 1_u32)
        }

        Action::CodeBuild {
            action_name,
            project,
            input,
            outputs,
        } => {
            statements.push(
                PolicyStatement::allow()
                    .actions(["codebuild:BatchGetBuilds", "codebuild:StartBuild", "codebuild:StopBuild"])
                    .resource(project.arn()),
            );
            Props::new()
                .set("ActionTypeId", action_type("Build", "CodeBuild"))
                .set("Configuration", Props::new().set("ProjectName", project.name()))
                .set("InputArtifacts", artifact_list(std::slice::from_ref(input)))
                .set("Name", action_name.as_str())
                .set("OutputArtifacts", artifact_list(outputs))
                .set("RunOrder", 1_u32)
        }

        Action::CloudFormationCreateUpdate {
            action_name,
            template_path,
            stack_name,
            admin_permissions,
            parameter_overrides,
            extra_inputs,
            account: _,
        } => {
            let deploy_role_id = format!("{}Role", logicalize(action_name));
            stack.add_resource(
                &deploy_role_id,
                Role::assumed_by(Principal::service("cloudformation.amazonaws.com")).into_resource(),
            )?;
            if *admin_permissions {
                let admin_policy_id = format!("{deploy_role_id}DefaultPolicy");
                stack.add_resource(
                    &admin_policy_id,
                    inline_policy(
                        &admin_policy_id,
                        &PolicyDocument::new(vec![PolicyStatement::allow().action("*").resource("*")]),
                        vec![CfnValue::ref_to(deploy_role_id.as_str())],
                    ),
                )?;
            }
            statements.push(
                PolicyStatement::allow()
                    .action("iam:PassRole")
                    .resource(CfnValue::get_att(deploy_role_id.as_str(), "Arn")),
            );
            statements.push(
                PolicyStatement::allow()
                    .actions([
                        "cloudformation:CreateStack",
                        "cloudformation:DescribeStacks",
                        "cloudformation:GetTemplate",
                        "cloudformation:UpdateStack",
                        "cloudformation:ValidateTemplate",
                    ])
                    .resource(stack_arn(stack_name)),
            );

            // The template's artifact is the first input; extras follow,
            // skipping repeats.
            let mut inputs: Vec<&Artifact> = vec![template_path.artifact()];
            for extra in extra_inputs {
                if !inputs.iter().any(|a| a.name() == extra.name()) {
                    inputs.push(extra);
                }
            }
            let input_values = CfnValue::List(
                inputs
                    .iter()
                    .map(|artifact| Props::new().set("Name", artifact.name()).into())
                    .collect(),
            );

            Props::new()
                .set("ActionTypeId", action_type("Deploy", "CloudFormation"))
                .set(
                    "Configuration",
                    Props::new()
                        .set("ActionMode", "CREATE_UPDATE")
                        .set("Capabilities", "CAPABILITY_NAMED_IAM")
                        .set("ParameterOverrides", render_overrides(parameter_overrides))
                        .set("RoleArn", CfnValue::get_att(deploy_role_id.as_str(), "Arn"))
                        .set("StackName", stack_name.as_str())
                        .set("TemplatePath", template_path.location()),
                )
                .set("InputArtifacts", input_values)
                .set("Name", action_name.as_str())
                .set("RunOrder", 1_u32)
        }

        Action::ManualApproval {
            action_name,
            notify_emails,
            additional_information,
        } => {
            let topic_id = format!("{}Topic", logicalize(action_name));
            let topic = Topic::create(stack, &topic_id)?;
            for (index, email) in notify_emails.iter().enumerate() {
                topic.subscribe_email(stack, &format!("{topic_id}Subscription{}", index + 1), email)?;
            }
            statements.push(PolicyStatement::allow().action("sns:Publish").resource(topic.arn()));
            Props::new()
                .set("ActionTypeId", action_type("Approval", "Manual"))
                .set(
                    "Configuration",
                    Props::new()
                        .set("CustomData", additional_information.as_str())
                        .set("NotificationArn", topic.arn()),
                )
                .set("Name", action_name.as_str())
                .set("RunOrder", 1_u32)
        }
    };
    Ok(rendered.into())
}

fn action_type(category: &str, provider: &str) -> Props {
    Props::new()
        .set("Category", category)
        .set("Owner", "AWS")
        .set("Provider", provider)
        .set("Version", "1")
}

fn artifact_list(artifacts: &[Artifact]) -> CfnValue {
    CfnValue::List(
        artifacts
            .iter()
            .map(|artifact| Props::new().set("Name", artifact.name()).into())
            .collect(),
    )
}

/// Overrides serialize into the action configuration as one compact JSON
/// document; keys come out sorted.
fn render_overrides(overrides: &BTreeMap<String, ArtifactValue>) -> String {
    let document: serde_json::Map<String, serde_json::Value> = overrides
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();
    serde_json::Value::Object(document).to_string()
}

/// `arn:<partition>:cloudformation:<region>:<account>:stack/<name>/*`.
fn stack_arn(stack_name: &str) -> CfnValue {
    CfnValue::concat(vec![
        "arn:".into(),
        CfnValue::ref_to(pseudo::PARTITION),
        ":cloudformation:".into(),
        CfnValue::ref_to(pseudo::REGION),
        ":".into(),
        CfnValue::ref_to(pseudo::ACCOUNT_ID),
        ":stack/".into(),
        stack_name.into(),
        "/*".into(),
    ])
}

// Action names double as logical-id stems once separators are stripped.
fn logicalize(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebuild::{BuildSpec, Phase, Phases, PipelineProject, PipelineProjectSpec};

    fn dev_stack() -> Stack {
        Stack::new("PipelineDeployingSafeApiStack", StackEnv::new("111122223333", "us-west-2"))
    }

    fn build_project(stack: &mut Stack, logical_id: &str) -> PipelineProject {
        PipelineProject::create(
            stack,
            logical_id,
            PipelineProjectSpec {
                build_spec: BuildSpec::v0_2(Phases::new().build(Phase::new().command("true"))),
                image: crate::codebuild::image::STANDARD_7,
                privileged: false,
                environment_variables: Vec::new(),
                role_statements: Vec::new(),
            },
        )
        .unwrap()
    }

    fn source_stage(output: &Artifact) -> Stage {
        Stage::new(
            "Source",
            vec![Action::CodeCommitSource {
                action_name: "CodeCommit_Source".to_string(),
                repository: RepositoryRef::from_name("test-ecs-demo"),
                branch: "master".to_string(),
                output: output.clone(),
            }],
        )
    }

    #[test]
    fn single_stage_pipeline_is_rejected() {
        let mut stack = dev_stack();
        let source = Artifact::named("SourceOutput");
        let err = Pipeline::create(
            &mut stack,
            "ApiPipeline",
            PipelineSpec {
                stages: vec![source_stage(&source)],
            },
            &TemplateCatalog::new(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::TooFewStages { count: 1 }));
    }

    #[test]
    fn consuming_an_artifact_in_its_own_stage_is_rejected() {
        let mut stack = dev_stack();
        let project = build_project(&mut stack, "Build");
        let source = Artifact::named("SourceOutput");
        let built = Artifact::named("BuildOutput");

        let err = Pipeline::create(
            &mut stack,
            "ApiPipeline",
            PipelineSpec {
                stages: vec![
                    source_stage(&source),
                    Stage::new(
                        "Build",
                        vec![
                            Action::CodeBuild {
                                action_name: "Produce".to_string(),
                                project: project.clone(),
                                input: source.clone(),
                                outputs: vec![built.clone()],
                            },
                            Action::CodeBuild {
                                action_name: "ConsumeTooEarly".to_string(),
                                project,
                                input: built,
                                outputs: vec![Artifact::named("Other")],
                            },
                        ],
                    ),
                ],
            },
            &TemplateCatalog::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ArtifactNotYetProduced { ref artifact, .. } if artifact == "BuildOutput"
        ));
    }

    #[test]
    fn two_producers_for_one_artifact_are_rejected() {
        let mut stack = dev_stack();
        let project = build_project(&mut stack, "Build");
        let source = Artifact::named("SourceOutput");
        let clash = Artifact::named("Clash");

        let err = Pipeline::create(
            &mut stack,
            "ApiPipeline",
            PipelineSpec {
                stages: vec![
                    source_stage(&source),
                    Stage::new(
                        "Build",
                        vec![
                            Action::CodeBuild {
                                action_name: "First".to_string(),
                                project: project.clone(),
                                input: source.clone(),
                                outputs: vec![clash.clone()],
                            },
                            Action::CodeBuild {
                                action_name: "Second".to_string(),
                                project,
                                input: source.clone(),
                                outputs: vec![clash],
                            },
                        ],
                    ),
                ],
            },
            &TemplateCatalog::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ArtifactProducedTwice { ref first, ref second, .. }
                if first == "First" && second == "Second"
        ));
    }

    #[test]
    fn unknown_artifact_is_rejected() {
        let mut stack = dev_stack();
        let project = build_project(&mut stack, "Build");
        let source = Artifact::named("SourceOutput");

        let err = Pipeline::create(
            &mut stack,
            "ApiPipeline",
            PipelineSpec {
                stages: vec![
                    source_stage(&source),
                    Stage::new(
                        "Build",
                        vec![Action::CodeBuild {
                            action_name: "Build".to_string(),
                            project,
                            input: Artifact::named("NeverProduced"),
                            outputs: vec![Artifact::named("BuildOutput")],
                        }],
                    ),
                ],
            },
            &TemplateCatalog::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnknownArtifact { ref artifact, .. } if artifact == "NeverProduced"
        ));
    }

    #[test]
    fn override_must_match_a_declared_parameter() {
        let mut stack = dev_stack();
        let source = Artifact::named("SourceOutput");
        let mut catalog = TemplateCatalog::new();
        catalog.register("App.template.json", ["RegistryParameter"]);

        let mut overrides = BTreeMap::new();
        overrides.insert("NoSuchParameter".to_string(), ArtifactValue::literal("1"));

        let err = Pipeline::create(
            &mut stack,
            "ApiPipeline",
            PipelineSpec {
                stages: vec![
                    source_stage(&source),
                    Stage::new(
                        "Deploy",
                        vec![Action::CloudFormationCreateUpdate {
                            action_name: "Deploy".to_string(),
                            template_path: source.at_path("App.template.json"),
                            stack_name: "App".to_string(),
                            admin_permissions: true,
                            parameter_overrides: overrides,
                            extra_inputs: Vec::new(),
                            account: "111122223333".to_string(),
                        }],
                    ),
                ],
            },
            &catalog,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnknownParameterOverride { ref parameter, .. } if parameter == "NoSuchParameter"
        ));
    }

    #[test]
    fn cross_account_deploy_is_rejected() {
        let mut stack = dev_stack();
        let source = Artifact::named("SourceOutput");

        let err = Pipeline::create(
            &mut stack,
            "ApiPipeline",
            PipelineSpec {
                stages: vec![
                    source_stage(&source),
                    Stage::new(
                        "Deploy",
                        vec![Action::CloudFormationCreateUpdate {
                            action_name: "Deploy".to_string(),
                            template_path: source.at_path("App.template.json"),
                            stack_name: "App".to_string(),
                            admin_permissions: true,
                            parameter_overrides: BTreeMap::new(),
                            extra_inputs: Vec::new(),
                            account: "999988887777".to_string(),
                        }],
                    ),
                ],
            },
            &TemplateCatalog::new(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::CrossAccountDeploy { .. }));
    }

    #[test]
    fn deploy_action_renders_overrides_and_deduped_inputs() {
        let mut stack = dev_stack();
        let source = Artifact::named("SourceOutput");
        let cdk = Artifact::named("CdkBuildOutput");
        let asset = Artifact::named("AssetBuildOutput");
        let project = build_project(&mut stack, "CdkBuild");

        let mut overrides = BTreeMap::new();
        overrides.insert("ArtifactS3Bucket".to_string(), asset.bucket_name());
        overrides.insert("ArtifactS3VersionKey".to_string(), asset.object_key());
        overrides.insert("ArtifactS3Hash".to_string(), ArtifactValue::literal("1"));

        Pipeline::create(
            &mut stack,
            "ApiPipeline",
            PipelineSpec {
                stages: vec![
                    source_stage(&source),
                    Stage::new(
                        "Build",
                        vec![Action::CodeBuild {
                            action_name: "Cdk_Build".to_string(),
                            project,
                            input: source.clone(),
                            outputs: vec![cdk.clone(), asset.clone()],
                        }],
                    ),
                    Stage::new(
                        "DeployDev",
                        vec![Action::CloudFormationCreateUpdate {
                            action_name: "Java_CFN_Deploy".to_string(),
                            template_path: cdk.at_path("App.template.json"),
                            stack_name: "App".to_string(),
                            admin_permissions: true,
                            parameter_overrides: overrides,
                            extra_inputs: vec![cdk.clone(), asset.clone()],
                            account: "111122223333".to_string(),
                        }],
                    ),
                ],
            },
            &TemplateCatalog::new(),
        )
        .unwrap();

        let rendered = serde_json::to_value(stack.template().resource("ApiPipeline").unwrap()).unwrap();
        let stages = rendered["Properties"]["Stages"].as_array().unwrap();
        assert_eq!(stages[2]["Name"], "DeployDev");

        let deploy = &stages[2]["Actions"][0];
        assert_eq!(deploy["Name"], "Java_CFN_Deploy");
        assert_eq!(deploy["ActionTypeId"]["Provider"], "CloudFormation");
        assert_eq!(deploy["Configuration"]["ActionMode"], "CREATE_UPDATE");
        assert_eq!(deploy["Configuration"]["TemplatePath"], "CdkBuildOutput::App.template.json");
        assert_eq!(
            deploy["Configuration"]["ParameterOverrides"],
            "{\"ArtifactS3Bucket\":{\"Fn::GetArtifactAtt\":[\"AssetBuildOutput\",\"BucketName\"]},\
             \"ArtifactS3Hash\":\"1\",\
             \"ArtifactS3VersionKey\":{\"Fn::GetArtifactAtt\":[\"AssetBuildOutput\",\"ObjectKey\"]}}"
        );

        let inputs = deploy["InputArtifacts"].as_array().unwrap();
        let names: Vec<&str> = inputs.iter().map(|v| v["Name"].as_str().unwrap()).collect();
        assert_eq!(names, ["CdkBuildOutput", "AssetBuildOutput"]);

        assert!(stack.template().resource("JavaCFNDeployRole").is_some());
        assert!(stack.template().resource("JavaCFNDeployRoleDefaultPolicy").is_some());
        assert_eq!(
            rendered["DependsOn"],
            serde_json::json!(["ApiPipelineRoleDefaultPolicy"])
        );
    }

    #[test]
    fn manual_approval_renders_topic_and_subscription() {
        let mut stack = dev_stack();
        let source = Artifact::named("SourceOutput");

        Pipeline::create(
            &mut stack,
            "ApiPipeline",
            PipelineSpec {
                stages: vec![
                    source_stage(&source),
                    Stage::new(
                        "ApproveDeployQA",
                        vec![Action::ManualApproval {
                            action_name: "ApproveDeployQA".to_string(),
                            notify_emails: vec!["oconnor@railroad19.com".to_string()],
                            additional_information: "Deploy to QA approval".to_string(),
                        }],
                    ),
                ],
            },
            &TemplateCatalog::new(),
        )
        .unwrap();

        let template = stack.template();
        assert!(template.resource("ApproveDeployQATopic").is_some());
        let subscription =
            serde_json::to_value(template.resource("ApproveDeployQATopicSubscription1").unwrap()).unwrap();
        assert_eq!(subscription["Properties"]["Endpoint"], "oconnor@railroad19.com");
        assert_eq!(subscription["Properties"]["Protocol"], "email");

        let rendered = serde_json::to_value(template.resource("ApiPipeline").unwrap()).unwrap();
        let approval = &rendered["Properties"]["Stages"][1]["Actions"][0];
        assert_eq!(approval["ActionTypeId"]["Category"], "Approval");
        assert_eq!(approval["Configuration"]["CustomData"], "Deploy to QA approval");
    }

    #[test]
    fn source_action_polls_the_branch() {
        let mut stack = dev_stack();
        let source = Artifact::named("SourceOutput");
        let project = build_project(&mut stack, "Build");

        Pipeline::create(
            &mut stack,
            "ApiPipeline",
            PipelineSpec {
                stages: vec![
                    source_stage(&source),
                    Stage::new(
                        "Build",
                        vec![Action::CodeBuild {
                            action_name: "Build".to_string(),
                            project,
                            input: source.clone(),
                            outputs: vec![Artifact::named("BuildOutput")],
                        }],
                    ),
                ],
            },
            &TemplateCatalog::new(),
        )
        .unwrap();

        let rendered = serde_json::to_value(stack.template().resource("ApiPipeline").unwrap()).unwrap();
        let action = &rendered["Properties"]["Stages"][0]["Actions"][0];
        assert_eq!(action["ActionTypeId"]["Provider"], "CodeCommit");
        assert_eq!(action["Configuration"]["RepositoryName"], "test-ecs-demo");
        assert_eq!(action["Configuration"]["BranchName"], "master");
        assert_eq!(action["Configuration"]["PollForSourceChanges"], true);
        assert_eq!(action["OutputArtifacts"][0]["Name"], "SourceOutput");

        assert!(stack.template().resource("ApiPipelineArtifactsBucket").is_some());
        assert!(stack.template().resource("ApiPipelineRole").is_some());
    }
}
