//! ECS cluster references, Fargate task definitions and services.

use crate::ec2::SecurityGroupRef;
use stackforge_core::{pseudo, CfnValue, Props, Resource};

/// An existing cluster referenced by name.
#[derive(Debug, Clone)]
pub struct ClusterRef {
    name: String,
}

impl ClusterRef {
    pub fn from_name(name: impl Into<String>) -> Self {
        ClusterRef { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One container port, always TCP here.
#[derive(Debug, Clone, Copy)]
pub struct PortMapping {
    container_port: u16,
}

impl PortMapping {
    pub fn tcp(container_port: u16) -> Self {
        PortMapping { container_port }
    }

    fn to_value(self) -> CfnValue {
        Props::new()
            .set("ContainerPort", self.container_port)
            .set("Protocol", "tcp")
            .into()
    }
}

/// awslogs log configuration backed by a log group in the same template.
#[derive(Debug, Clone)]
pub struct AwsLogDriver {
    stream_prefix: String,
    log_group: CfnValue,
}

impl AwsLogDriver {
    pub fn new(stream_prefix: impl Into<String>, log_group: CfnValue) -> Self {
        AwsLogDriver {
            stream_prefix: stream_prefix.into(),
            log_group,
        }
    }

    fn to_value(&self) -> CfnValue {
        Props::new()
            .set("LogDriver", "awslogs")
            .set(
                "Options",
                Props::new()
                    .set("awslogs-group", self.log_group.clone())
                    .set("awslogs-region", CfnValue::ref_to(pseudo::REGION))
                    .set("awslogs-stream-prefix", self.stream_prefix.as_str()),
            )
            .into()
    }
}

#[derive(Debug, Clone)]
pub struct ContainerDefinition {
    name: String,
    image: CfnValue,
    port_mappings: Vec<PortMapping>,
    logging: Option<AwsLogDriver>,
}

impl ContainerDefinition {
    pub fn new(name: impl Into<String>, image: CfnValue) -> Self {
        ContainerDefinition {
            name: name.into(),
            image,
            port_mappings: Vec::new(),
            logging: None,
        }
    }

    pub fn with_port_mapping(mut self, mapping: PortMapping) -> Self {
        self.port_mappings.push(mapping);
        self
    }

    pub fn with_logging(mut self, logging: AwsLogDriver) -> Self {
        self.logging = Some(logging);
        self
    }

    fn to_value(&self) -> CfnValue {
        Props::new()
            .set("Essential", true)
            .set("Image", self.image.clone())
            .set_opt("LogConfiguration", self.logging.as_ref().map(AwsLogDriver::to_value))
            .set("Name", self.name.as_str())
            .set_opt(
                "PortMappings",
                if self.port_mappings.is_empty() {
                    None
                } else {
                    Some(CfnValue::List(
                        self.port_mappings.iter().map(|m| m.to_value()).collect(),
                    ))
                },
            )
            .into()
    }
}

/// A Fargate task definition. Cpu and memory are task-level and serialized
/// as the strings CloudFormation expects.
#[derive(Debug, Clone)]
pub struct FargateTaskDefinition {
    family: String,
    cpu: u32,
    memory_mib: u32,
    execution_role: CfnValue,
    task_role: CfnValue,
    containers: Vec<ContainerDefinition>,
}

impl FargateTaskDefinition {
    pub fn new(
        family: impl Into<String>,
        cpu: u32,
        memory_mib: u32,
        execution_role: CfnValue,
        task_role: CfnValue,
    ) -> Self {
        FargateTaskDefinition {
            family: family.into(),
            cpu,
            memory_mib,
            execution_role,
            task_role,
            containers: Vec::new(),
        }
    }

    pub fn with_container(mut self, container: ContainerDefinition) -> Self {
        self.containers.push(container);
        self
    }

    pub fn into_resource(self) -> Resource {
        Resource::new(
            "AWS::ECS::TaskDefinition",
            Props::new()
                .set(
                    "ContainerDefinitions",
                    CfnValue::List(self.containers.iter().map(ContainerDefinition::to_value).collect()),
                )
                .set("Cpu", self.cpu.to_string())
                .set("ExecutionRoleArn", self.execution_role)
                .set("Family", self.family.as_str())
                .set("Memory", self.memory_mib.to_string())
                .set("NetworkMode", "awsvpc")
                .set("RequiresCompatibilities", vec![CfnValue::string("FARGATE")])
                .set("TaskRoleArn", self.task_role),
        )
    }
}

/// A Fargate service placed in isolated subnets.
#[derive(Debug, Clone)]
pub struct FargateService {
    service_name: String,
    cluster: ClusterRef,
    task_definition: CfnValue,
    desired_count: u32,
    assign_public_ip: bool,
    subnets: Vec<CfnValue>,
    security_groups: Vec<SecurityGroupRef>,
}

impl FargateService {
    pub fn new(service_name: impl Into<String>, cluster: ClusterRef, task_definition: CfnValue) -> Self {
        FargateService {
            service_name: service_name.into(),
            cluster,
            task_definition,
            desired_count: 1,
            assign_public_ip: false,
            subnets: Vec::new(),
            security_groups: Vec::new(),
        }
    }

    pub fn desired_count(mut self, count: u32) -> Self {
        self.desired_count = count;
        self
    }

    pub fn assign_public_ip(mut self, assign: bool) -> Self {
        self.assign_public_ip = assign;
        self
    }

    pub fn subnets(mut self, subnets: Vec<CfnValue>) -> Self {
        self.subnets = subnets;
        self
    }

    pub fn security_group(mut self, group: SecurityGroupRef) -> Self {
        self.security_groups.push(group);
        self
    }

    pub fn into_resource(self) -> Resource {
        let network = Props::new().set(
            "AwsvpcConfiguration",
            Props::new()
                .set(
                    "AssignPublicIp",
                    if self.assign_public_ip { "ENABLED" } else { "DISABLED" },
                )
                .set(
                    "SecurityGroups",
                    CfnValue::List(self.security_groups.iter().map(SecurityGroupRef::id).collect()),
                )
                .set("Subnets", CfnValue::List(self.subnets)),
        );
        Resource::new(
            "AWS::ECS::Service",
            Props::new()
                .set("Cluster", self.cluster.name())
                .set(
                    "DeploymentConfiguration",
                    Props::new().set("MaximumPercent", 200_u32).set("MinimumHealthyPercent", 50_u32),
                )
                .set("DesiredCount", self.desired_count)
                .set("LaunchType", "FARGATE")
                .set("NetworkConfiguration", network)
                .set("ServiceName", self.service_name.as_str())
                .set("TaskDefinition", self.task_definition),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_definition_renders_fargate_shape() {
        let task = FargateTaskDefinition::new(
            "test-ecs-demo-task",
            512,
            2048,
            CfnValue::string("arn:aws:iam::111122223333:role/exec"),
            CfnValue::get_att("FargateTaskRole", "Arn"),
        )
        .with_container(
            ContainerDefinition::new("FargateContainer1", CfnValue::ref_to("RegistryParameter"))
                .with_port_mapping(PortMapping::tcp(8080))
                .with_logging(AwsLogDriver::new("svc", CfnValue::ref_to("ContainerLogGroup"))),
        )
        .into_resource();

        let rendered = serde_json::to_value(&task).unwrap();
        let props = &rendered["Properties"];
        assert_eq!(props["Cpu"], "512");
        assert_eq!(props["Memory"], "2048");
        assert_eq!(props["NetworkMode"], "awsvpc");
        assert_eq!(props["RequiresCompatibilities"], json!(["FARGATE"]));

        let container = &props["ContainerDefinitions"][0];
        assert_eq!(container["Name"], "FargateContainer1");
        assert_eq!(container["Image"], json!({"Ref": "RegistryParameter"}));
        assert_eq!(
            container["PortMappings"],
            json!([{"ContainerPort": 8080, "Protocol": "tcp"}])
        );
        assert_eq!(container["LogConfiguration"]["LogDriver"], "awslogs");
    }

    #[test]
    fn service_disables_public_ip_by_default() {
        let service = FargateService::new(
            "test-ecs-demo-service",
            ClusterRef::from_name("testcluster"),
            CfnValue::ref_to("FargateTask"),
        )
        .subnets(vec![CfnValue::string("subnet-a"), CfnValue::string("subnet-b")])
        .security_group(SecurityGroupRef::from_group_id("sg-123"))
        .into_resource();

        let rendered = serde_json::to_value(&service).unwrap();
        let net = &rendered["Properties"]["NetworkConfiguration"]["AwsvpcConfiguration"];
        assert_eq!(net["AssignPublicIp"], "DISABLED");
        assert_eq!(net["Subnets"], json!(["subnet-a", "subnet-b"]));
        assert_eq!(rendered["Properties"]["DesiredCount"], 1);
        assert_eq!(rendered["Properties"]["Cluster"], "testcluster");
    }
}
