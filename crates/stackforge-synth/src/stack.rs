//! A deployable stack: one template bound to a target account and region.

use crate::error::SynthError;
use stackforge_core::{Parameter, Resource, Template};

/// The account and region a stack deploys into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEnv {
    pub account: String,
    pub region: String,
}

impl StackEnv {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        StackEnv {
            account: account.into(),
            region: region.into(),
        }
    }

    /// `aws://<account>/<region>`, the form the assembly manifest records.
    pub fn to_uri(&self) -> String {
        format!("aws://{}/{}", self.account, self.region)
    }
}

/// A named stack under construction.
///
/// Logical ids must be unique per template section; duplicates are reported
/// as declaration errors instead of silently overwriting the earlier entry.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    env: StackEnv,
    template: Template,
}

impl Stack {
    pub fn new(name: impl Into<String>, env: StackEnv) -> Self {
        Stack {
            name: name.into(),
            env,
            template: Template::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> &StackEnv {
        &self.env
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.template.set_description(description);
    }

    pub fn add_resource(&mut self, logical_id: impl Into<String>, resource: Resource) -> Result<(), SynthError> {
        let logical_id = logical_id.into();
        if self.template.insert_resource(logical_id.clone(), resource).is_some() {
            return Err(SynthError::DuplicateLogicalId {
                stack: self.name.clone(),
                logical_id,
            });
        }
        Ok(())
    }

    pub fn add_parameter(&mut self, logical_id: impl Into<String>, parameter: Parameter) -> Result<(), SynthError> {
        let logical_id = logical_id.into();
        if self.template.insert_parameter(logical_id.clone(), parameter).is_some() {
            return Err(SynthError::DuplicateParameter {
                stack: self.name.clone(),
                logical_id,
            });
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (String, StackEnv, Template) {
        (self.name, self.env, self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackforge_core::Props;

    fn dev_env() -> StackEnv {
        StackEnv::new("111122223333", "us-west-2")
    }

    #[test]
    fn duplicate_resource_id_is_rejected() {
        let mut stack = Stack::new("SafeTestECSServiceStack", dev_env());
        stack
            .add_resource("TaskDef", Resource::new("AWS::ECS::TaskDefinition", Props::new()))
            .unwrap();

        let err = stack
            .add_resource("TaskDef", Resource::new("AWS::ECS::TaskDefinition", Props::new()))
            .unwrap_err();
        assert!(matches!(err, SynthError::DuplicateLogicalId { ref logical_id, .. } if logical_id == "TaskDef"));
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        let mut stack = Stack::new("SafeTestECSServiceStack", dev_env());
        stack
            .add_parameter("ArtifactS3Bucket", Parameter::string())
            .unwrap();

        let err = stack
            .add_parameter("ArtifactS3Bucket", Parameter::string())
            .unwrap_err();
        assert!(matches!(err, SynthError::DuplicateParameter { ref logical_id, .. } if logical_id == "ArtifactS3Bucket"));
    }

    #[test]
    fn env_uri_matches_manifest_form() {
        assert_eq!(dev_env().to_uri(), "aws://111122223333/us-west-2");
    }
}
