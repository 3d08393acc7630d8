// stackforge-config - Layered configuration.
//
// Precedence, lowest to highest: built-in defaults, a TOML file, then
// STACKFORGE_* environment variables. The defaults describe the dev
// environment, `<>` standing in for account-specific identifiers that are
// filled per deployment.

pub mod sources;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use sources::{load, load_from_file, EnvSource, StdEnv};
pub use validation::validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: EnvironmentConfig,
    pub network: NetworkConfig,
    pub roles: RolesConfig,
    pub service: ServiceConfig,
    pub pipeline: PipelineConfig,
    /// Cross-stack export registry: export name to currently published
    /// value. Consumed exports must be present here.
    pub exports: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            environment: EnvironmentConfig::default(),
            network: NetworkConfig::default(),
            roles: RolesConfig::default(),
            service: ServiceConfig::default(),
            pipeline: PipelineConfig::default(),
            exports: default_exports(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Environment name, the prefix of every consumed export key.
    pub name: String,
    /// Managed environments suffix `Api` to the load balancer and listener
    /// export bases.
    pub nbc_environment: bool,
    pub account: String,
    pub region: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            name: "dev".to_string(),
            nbc_environment: true,
            account: "<>".to_string(),
            region: "us-west-2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub vpc_id: String,
    pub availability_zones: Vec<String>,
    pub isolated_subnet_ids: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            vpc_id: "vpc-".to_string(),
            availability_zones: vec!["us-west-2b".to_string(), "us-west-2a".to_string()],
            isolated_subnet_ids: vec!["<>".to_string(), "<>".to_string()],
        }
    }
}

/// Task roles. When an ARN is present the stack binds the existing role
/// read-only; when absent the stack declares the role itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    pub execution_role_arn: Option<String>,
    pub task_role_arn: Option<String>,
}

impl Default for RolesConfig {
    fn default() -> Self {
        RolesConfig {
            execution_role_arn: Some("arn:aws:iam::<>:role/ecsTaskExecutionRole".to_string()),
            task_role_arn: Some("arn:aws:iam::<>:role/ecsTaskExecutionRole".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub cluster_name: String,
    /// Default container image; the template exposes it as an overridable
    /// parameter.
    pub image_uri: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            cluster_name: "testcluster".to_string(),
            image_uri: "985218050846.dkr.ecr.us-west-2.amazonaws.com/test-ecs-demo:latest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CodeCommit repository holding application and infrastructure code.
    pub repository: String,
    pub branch: String,
    pub promotion: PromotionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            repository: "test-ecs-demo".to_string(),
            branch: "master".to_string(),
            promotion: PromotionConfig::default(),
        }
    }
}

/// The QA/Staging promotion flow. Kept inert by default: stages are only
/// synthesized when `enabled` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
    pub enabled: bool,
    pub notify_email: String,
    pub qa: Option<PromotionTarget>,
    pub staging: Option<PromotionTarget>,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        PromotionConfig {
            enabled: false,
            notify_email: "oconnor@railroad19.com".to_string(),
            qa: Some(PromotionTarget {
                account: "<>".to_string(),
                stack_name: "SafeApiQAStack".to_string(),
                template_file: "SafeApiQAStack.template.json".to_string(),
            }),
            staging: Some(PromotionTarget {
                account: "<>".to_string(),
                stack_name: "SafeApiStagingStack".to_string(),
                template_file: "SafeApiStagingStack.template.json".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionTarget {
    pub account: String,
    pub stack_name: String,
    pub template_file: String,
}

// Placeholder values for the three export names the dev service stack
// consumes; real ids replace them once the network stack is deployed.
fn default_exports() -> BTreeMap<String, String> {
    [
        ("dev-SafeLoadBalancerSecurityGroupApi", "<>"),
        ("dev-SafeFargateSecurityGroup", "<>"),
        ("dev-SafeListenerApi", "<>"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}
