//! The ECS Fargate service stack.
//!
//! Networking is owned by a separately deployed environment stack; this stack
//! binds to it through named exports and only declares the task definition,
//! the service and (when not configured) the task roles.

use crate::stacks::{
    ARTIFACT_S3_BUCKET, ARTIFACT_S3_HASH, ARTIFACT_S3_VERSION_KEY, REGISTRY_PARAMETER,
};
use anyhow::{Context, Result};
use stackforge_aws::ec2::{SecurityGroupRef, VpcAttributes};
use stackforge_aws::ecs::{
    AwsLogDriver, ClusterRef, ContainerDefinition, FargateService, FargateTaskDefinition,
    PortMapping,
};
use stackforge_aws::elbv2::ApplicationListenerRef;
use stackforge_aws::iam::{aws_managed_policy, Principal, Role, RoleReference};
use stackforge_aws::logs::LogGroup;
use stackforge_config::AppConfig;
use stackforge_core::{CfnValue, Parameter};
use stackforge_synth::{ExportRegistry, Stack, StackEnv};
use tracing::info;

pub const STACK_NAME: &str = "SafeTestECSServiceStack";

const TASK_FAMILY: &str = "test-ecs-demo-task";
const TASK_CPU: u32 = 512;
const TASK_MEMORY_MIB: u32 = 2048;
const CONTAINER_NAME: &str = "FargateContainer1";
const CONTAINER_PORT: u16 = 8080;
const SERVICE_NAME: &str = "test-ecs-demo-service";

/// Target group the listener forwards to. Registration of the service into
/// the group still happens outside this stack.
const TARGET_GROUP_NAME: &str = "dev-cacheapi-target";

/// Managed policies attached to an execution role this stack creates itself.
/// An imported role is used as configured, with no policy changes.
const EXECUTION_ROLE_POLICIES: &[&str] = &[
    "SecretsManagerReadWrite",
    "CloudWatchLogsFullAccess",
    "AmazonEC2ContainerRegistryReadOnly",
];

/// The declared stack plus the references later composition steps need.
#[derive(Debug)]
pub struct ServiceStack {
    pub stack: Stack,
    /// Listener of the environment's load balancer, resolved but not yet
    /// wired to the service.
    pub listener: ApplicationListenerRef,
    pub target_group_name: &'static str,
}

/// Export key for `base` in environment `env_name`. Managed environments
/// publish the load-balancer-facing values under an `Api` suffix.
fn export_name(env_name: &str, base: &str, append_api: bool) -> String {
    if append_api {
        format!("{env_name}-{base}Api")
    } else {
        format!("{env_name}-{base}")
    }
}

pub fn build(config: &AppConfig, exports: &ExportRegistry) -> Result<ServiceStack> {
    let env_name = &config.environment.name;
    let api_suffix = config.environment.nbc_environment;

    let load_balancer_group = SecurityGroupRef::from_export(
        &exports.resolve(&export_name(env_name, "SafeLoadBalancerSecurityGroup", api_suffix))?,
    );
    // The service's own group is environment-internal and never carries the
    // Api suffix.
    let fargate_group = SecurityGroupRef::from_export(
        &exports.resolve(&export_name(env_name, "SafeFargateSecurityGroup", false))?,
    );
    let listener = ApplicationListenerRef::from_attributes(
        exports
            .resolve(&export_name(env_name, "SafeListener", api_suffix))?
            .import_value(),
        load_balancer_group,
    );

    let vpc = VpcAttributes {
        vpc_id: config.network.vpc_id.clone(),
        availability_zones: config.network.availability_zones.clone(),
        isolated_subnet_ids: config.network.isolated_subnet_ids.clone(),
    };

    let mut stack = Stack::new(
        STACK_NAME,
        StackEnv::new(&config.environment.account, &config.environment.region),
    );

    stack.add_parameter(
        REGISTRY_PARAMETER,
        Parameter::string()
            .with_default(config.service.image_uri.as_str())
            .with_description("Image URI the service tasks run"),
    )?;
    for name in [ARTIFACT_S3_BUCKET, ARTIFACT_S3_VERSION_KEY, ARTIFACT_S3_HASH] {
        stack.add_parameter(name, Parameter::string().with_default(""))?;
    }

    let execution_role = reference_or_declare(
        &mut stack,
        "FargateExecutionRole",
        config.roles.execution_role_arn.as_deref(),
        EXECUTION_ROLE_POLICIES,
    )?;
    let task_role = reference_or_declare(
        &mut stack,
        "FargateTaskRole",
        config.roles.task_role_arn.as_deref(),
        &[],
    )?;

    let log_group_id = "FargateContainer1LogGroup";
    stack.add_resource(log_group_id, LogGroup::new().into_resource())?;

    let container = ContainerDefinition::new(CONTAINER_NAME, CfnValue::ref_to(REGISTRY_PARAMETER))
        .with_port_mapping(PortMapping::tcp(CONTAINER_PORT))
        .with_logging(AwsLogDriver::new(STACK_NAME, CfnValue::ref_to(log_group_id)));
    stack.add_resource(
        "FargateTask",
        FargateTaskDefinition::new(
            TASK_FAMILY,
            TASK_CPU,
            TASK_MEMORY_MIB,
            execution_role.arn_value(),
            task_role.arn_value(),
        )
        .with_container(container)
        .into_resource(),
    )?;

    stack.add_resource(
        "Service",
        FargateService::new(
            SERVICE_NAME,
            ClusterRef::from_name(&config.service.cluster_name),
            CfnValue::ref_to("FargateTask"),
        )
        .desired_count(1)
        .assign_public_ip(false)
        .subnets(vpc.subnet_values())
        .security_group(fargate_group)
        .into_resource(),
    )?;

    info!(stack = STACK_NAME, environment = %env_name, "declared service stack");
    Ok(ServiceStack {
        stack,
        listener,
        target_group_name: TARGET_GROUP_NAME,
    })
}

/// Bind `logical_id` to a configured role ARN, or declare the role in this
/// stack when none is configured.
fn reference_or_declare(
    stack: &mut Stack,
    logical_id: &str,
    configured_arn: Option<&str>,
    managed_policies: &[&str],
) -> Result<RoleReference> {
    match configured_arn {
        Some(arn) => RoleReference::imported(arn)
            .with_context(|| format!("invalid role ARN configured for {logical_id}")),
        None => {
            let mut role = Role::assumed_by(Principal::service("ecs-tasks.amazonaws.com"));
            for name in managed_policies {
                role = role.with_managed_policy(aws_managed_policy(name));
            }
            stack.add_resource(logical_id, role.into_resource())?;
            Ok(RoleReference::declared(logical_id))
        }
    }
}
