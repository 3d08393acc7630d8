//! VPC attributes and security group references.
//!
//! Networking is owned by stacks outside this app; nothing here declares a
//! resource. The VPC is described by attributes from configuration and
//! security groups are bound through cross-stack exports.

use stackforge_core::CfnValue;
use stackforge_synth::ResolvedExport;

/// Attributes of an existing VPC, as configured.
#[derive(Debug, Clone)]
pub struct VpcAttributes {
    pub vpc_id: String,
    pub availability_zones: Vec<String>,
    pub isolated_subnet_ids: Vec<String>,
}

impl VpcAttributes {
    pub fn subnet_values(&self) -> Vec<CfnValue> {
        self.isolated_subnet_ids.iter().map(CfnValue::string).collect()
    }
}

/// Reference to an existing security group.
#[derive(Debug, Clone)]
pub struct SecurityGroupRef {
    id: CfnValue,
}

impl SecurityGroupRef {
    /// Bind to the group id published by another stack.
    pub fn from_export(export: &ResolvedExport) -> Self {
        SecurityGroupRef {
            id: export.import_value(),
        }
    }

    pub fn from_group_id(group_id: impl Into<String>) -> Self {
        SecurityGroupRef {
            id: CfnValue::string(group_id),
        }
    }

    pub fn id(&self) -> CfnValue {
        self.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackforge_synth::ExportRegistry;

    #[test]
    fn export_bound_group_renders_import_value() {
        let registry: ExportRegistry = [("dev-SafeFargateSecurityGroup", "sg-0abc")].into_iter().collect();
        let group = SecurityGroupRef::from_export(&registry.resolve("dev-SafeFargateSecurityGroup").unwrap());
        assert_eq!(
            serde_json::to_value(group.id()).unwrap(),
            serde_json::json!({"Fn::ImportValue": "dev-SafeFargateSecurityGroup"})
        );
    }
}
