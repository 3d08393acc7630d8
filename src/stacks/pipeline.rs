//! The delivery pipeline stack: one source stage, two parallel builds and a
//! CloudFormation deploy per environment.
//!
//! The CDK build action runs this synthesizer itself, so the templates the
//! deploy stages consume are always the ones produced from the commit being
//! shipped.

use crate::stacks::{
    service, ARTIFACT_S3_BUCKET, ARTIFACT_S3_HASH, ARTIFACT_S3_VERSION_KEY, REGISTRY_PARAMETER,
};
use anyhow::{Context, Result};
use stackforge_aws::codebuild::{
    image, ArtifactSpec, Artifacts, BuildSpec, Phase, Phases, PipelineProject, PipelineProjectSpec,
};
use stackforge_aws::codecommit::RepositoryRef;
use stackforge_aws::codepipeline::{
    Action, Artifact, ArtifactValue, Pipeline, PipelineSpec, Stage, TemplateCatalog,
};
use stackforge_aws::ecr::Repository;
use stackforge_aws::iam::{PolicyDocument, PolicyStatement, Principal};
use stackforge_config::{AppConfig, PromotionTarget};
use stackforge_core::CfnValue;
use stackforge_synth::{template_file_name, Stack, StackEnv};
use std::collections::BTreeMap;
use tracing::info;

pub const STACK_NAME: &str = "PipelineDeployingSafeApiStack";

const ECR_REPOSITORY_ID: &str = "SampleRepository";

/// Value the deploy actions pin the asset-hash parameter to. Bumping it
/// forces CloudFormation to re-read the staged assets.
const ASSET_HASH_PIN: &str = "1";

pub fn build(config: &AppConfig, catalog: &TemplateCatalog) -> Result<Stack> {
    let mut stack = Stack::new(
        STACK_NAME,
        StackEnv::new(&config.environment.account, &config.environment.region),
    );

    let repository_uri = declare_image_repository(&mut stack, config)?;

    let source_output = Artifact::named("SourceOutput");
    let cdk_output = Artifact::named("CdkBuildOutput");
    let lambda_output = Artifact::named("LambdaBuildOutput");
    let java_output = Artifact::named("JavaBuildOutput");
    let asset_output = Artifact::named("AssetBuildOutput");

    let java_build = PipelineProject::create(&mut stack, "JavaBuild", java_project(repository_uri))?;
    let cdk_build = PipelineProject::create(&mut stack, "CdkBuild", infrastructure_project(config))?;

    let mut stages = vec![
        Stage::new(
            "Source",
            vec![Action::CodeCommitSource {
                action_name: "CodeCommit_Source".to_string(),
                repository: RepositoryRef::from_name(&config.pipeline.repository),
                branch: config.pipeline.branch.clone(),
                output: source_output.clone(),
            }],
        ),
        Stage::new(
            "Build",
            vec![
                Action::CodeBuild {
                    action_name: "SafeApi_Java_Build".to_string(),
                    project: java_build,
                    input: source_output.clone(),
                    outputs: vec![java_output.clone()],
                },
                Action::CodeBuild {
                    action_name: "SafeApi_CDK_Build".to_string(),
                    project: cdk_build,
                    input: source_output,
                    outputs: vec![cdk_output.clone(), lambda_output.clone(), asset_output.clone()],
                },
            ],
        ),
        Stage::new(
            "DeployDev",
            vec![Action::CloudFormationCreateUpdate {
                action_name: "Java_CFN_Deploy".to_string(),
                template_path: cdk_output.at_path(template_file_name(service::STACK_NAME)),
                stack_name: service::STACK_NAME.to_string(),
                admin_permissions: true,
                parameter_overrides: asset_overrides(&asset_output),
                extra_inputs: vec![
                    java_output.clone(),
                    lambda_output.clone(),
                    cdk_output.clone(),
                    asset_output.clone(),
                ],
                account: config.environment.account.clone(),
            }],
        ),
    ];

    let promotion = &config.pipeline.promotion;
    if promotion.enabled {
        let qa = promotion
            .qa
            .as_ref()
            .context("promotion is enabled but no [pipeline.promotion.qa] target is configured")?;
        let staging = promotion.staging.as_ref().context(
            "promotion is enabled but no [pipeline.promotion.staging] target is configured",
        )?;

        stages.push(approval_stage(
            "ApproveDeployQA",
            &promotion.notify_email,
            "Deploy to QA approval",
        ));
        stages.push(Stage::new(
            "DeployQA",
            vec![promotion_deploy(
                "Java_CFN_Deploy_QA",
                qa,
                &cdk_output,
                &java_output,
                &lambda_output,
                &asset_output,
            )],
        ));
        stages.push(approval_stage(
            "ApproveDeployStaging",
            &promotion.notify_email,
            "Deploy to Staging approval",
        ));
        stages.push(Stage::new(
            "DeployStaging",
            vec![promotion_deploy(
                "Java_CFN_Deploy_Staging",
                staging,
                &cdk_output,
                &java_output,
                &lambda_output,
                &asset_output,
            )],
        ));
    }

    Pipeline::create(&mut stack, "ApiPipeline", PipelineSpec { stages }, catalog)?;
    info!(stack = STACK_NAME, promotion = promotion.enabled, "declared pipeline stack");
    Ok(stack)
}

/// Image repository the Java build pushes to. Every account that deploys the
/// service gets pull/push access through the repository policy.
fn declare_image_repository(stack: &mut Stack, config: &AppConfig) -> Result<CfnValue> {
    let mut pull_push = PolicyStatement::allow()
        .action("ecr:*")
        .principal(Principal::account(&config.environment.account));
    let promotion = &config.pipeline.promotion;
    if promotion.enabled {
        for target in [&promotion.qa, &promotion.staging].into_iter().flatten() {
            pull_push = pull_push.principal(Principal::account(&target.account));
        }
    }

    let repository = Repository::new(&config.pipeline.repository)
        .with_resource_policy(PolicyDocument::new(vec![pull_push]));
    let uri = repository.repository_uri();
    stack.add_resource(ECR_REPOSITORY_ID, repository.into_resource())?;
    Ok(uri)
}

/// Gradle build plus a Docker push. The image tag is the short commit hash,
/// and `imageDetail.json` records the pushed URI for later deploy stages.
fn java_project(repository_uri: CfnValue) -> PipelineProjectSpec {
    let build_spec = BuildSpec::v0_2(
        Phases::new()
            .install(Phase::new().runtime("java", "corretto11").runtime("docker", "18"))
            .pre_build(Phase::new().commands([
                "echo Logging in to Amazon ECR...",
                "aws --version",
                "echo $ECR_REPOSITORY_URI",
                "$(aws ecr get-login --region $AWS_DEFAULT_REGION --no-include-email)",
                "COMMIT_HASH=$(echo $CODEBUILD_RESOLVED_SOURCE_VERSION | cut -c 1-7)",
                "IMAGE_TAG=${COMMIT_HASH:=latest}",
                "echo $IMAGE_TAG",
            ]))
            .build(Phase::new().commands([
                "echo Build started on `date`",
                "echo Building Java",
                "./gradlew build",
                "dir build/libs",
                "docker build -t $ECR_REPOSITORY_URI:latest .",
                "docker tag $ECR_REPOSITORY_URI:latest $ECR_REPOSITORY_URI:$IMAGE_TAG",
            ]))
            .post_build(Phase::new().commands([
                "echo Build completed on `date`",
                "echo Pushing the Docker images...",
                "docker push $ECR_REPOSITORY_URI:$IMAGE_TAG",
                r#"printf '{"ImageURI":"%s:%s"}' $ECR_REPOSITORY_URI $IMAGE_TAG > imageDetail.json"#,
            ])),
    )
    .with_artifacts(Artifacts::primary(ArtifactSpec::files(["imageDetail.json"])));

    PipelineProjectSpec {
        build_spec,
        image: image::AMAZON_LINUX_2_STANDARD_3,
        privileged: true,
        environment_variables: vec![("ECR_REPOSITORY_URI".to_string(), repository_uri)],
        role_statements: vec![
            PolicyStatement::allow()
                .action("ecr:*")
                .resource(Repository::arn_of(ECR_REPOSITORY_ID)),
            PolicyStatement::allow()
                .action("ecr:GetAuthorizationToken")
                .resource("*"),
        ],
    }
}

/// Runs this synthesizer and stages its outputs: the templates, the asset
/// staging directory and a placeholder directory for function bundles.
fn infrastructure_project(config: &AppConfig) -> PipelineProjectSpec {
    let mut template_files = vec![template_file_name(service::STACK_NAME)];
    let promotion = &config.pipeline.promotion;
    if promotion.enabled {
        for target in [&promotion.qa, &promotion.staging].into_iter().flatten() {
            template_files.push(target.template_file.clone());
        }
    }

    let build_spec = BuildSpec::v0_2(
        Phases::new()
            .install(Phase::new().command("cd infrastructure"))
            .build(Phase::new().commands([
                "cargo build --release",
                "cargo run --release -- --out dist",
                "cd dist",
                "mkdir myartifact lambda",
                "cp manifest.json myartifact",
            ])),
    )
    .with_artifacts(Artifacts::secondary([
        (
            "CdkBuildOutput",
            ArtifactSpec::files(template_files).in_directory("infrastructure/dist"),
        ),
        (
            "LambdaBuildOutput",
            ArtifactSpec::files(["*"]).in_directory("infrastructure/dist/lambda"),
        ),
        (
            "AssetBuildOutput",
            ArtifactSpec::files(["*"]).in_directory("infrastructure/dist/myartifact"),
        ),
    ]));

    PipelineProjectSpec {
        build_spec,
        image: image::STANDARD_7,
        privileged: false,
        environment_variables: Vec::new(),
        role_statements: Vec::new(),
    }
}

fn asset_overrides(asset: &Artifact) -> BTreeMap<String, ArtifactValue> {
    BTreeMap::from([
        (ARTIFACT_S3_BUCKET.to_string(), asset.bucket_name()),
        (ARTIFACT_S3_VERSION_KEY.to_string(), asset.object_key()),
        (ARTIFACT_S3_HASH.to_string(), ArtifactValue::literal(ASSET_HASH_PIN)),
    ])
}

/// Promotion deploys additionally override the image parameter with the URI
/// the Java build recorded, so the promoted stack runs the image dev ran.
fn promotion_deploy(
    action_name: &str,
    target: &PromotionTarget,
    cdk: &Artifact,
    java: &Artifact,
    lambda: &Artifact,
    asset: &Artifact,
) -> Action {
    let mut overrides = asset_overrides(asset);
    overrides.insert(
        REGISTRY_PARAMETER.to_string(),
        java.get_param("imageDetail.json", "ImageURI"),
    );
    Action::CloudFormationCreateUpdate {
        action_name: action_name.to_string(),
        template_path: cdk.at_path(target.template_file.as_str()),
        stack_name: target.stack_name.clone(),
        admin_permissions: true,
        parameter_overrides: overrides,
        extra_inputs: vec![java.clone(), lambda.clone(), cdk.clone(), asset.clone()],
        account: target.account.clone(),
    }
}

fn approval_stage(name: &str, notify_email: &str, information: &str) -> Stage {
    Stage::new(
        name,
        vec![Action::ManualApproval {
            action_name: name.to_string(),
            notify_emails: vec![notify_email.to_string()],
            additional_information: information.to_string(),
        }],
    )
}
