//! CodeCommit repository references.

use stackforge_core::{pseudo, CfnValue};

/// An existing CodeCommit repository referenced by name.
#[derive(Debug, Clone)]
pub struct RepositoryRef {
    name: String,
}

impl RepositoryRef {
    pub fn from_name(name: impl Into<String>) -> Self {
        RepositoryRef { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `arn:<partition>:codecommit:<region>:<account>:<name>`.
    pub fn arn(&self) -> CfnValue {
        CfnValue::concat(vec![
            "arn:".into(),
            CfnValue::ref_to(pseudo::PARTITION),
            ":codecommit:".into(),
            CfnValue::ref_to(pseudo::REGION),
            ":".into(),
            CfnValue::ref_to(pseudo::ACCOUNT_ID),
            ":".into(),
            self.name.as_str().into(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arn_targets_the_named_repository() {
        let rendered = serde_json::to_value(RepositoryRef::from_name("test-ecs-demo").arn()).unwrap();
        let parts = rendered["Fn::Join"][1].as_array().unwrap();
        assert_eq!(parts.last().unwrap(), "test-ecs-demo");
        assert_eq!(parts[2], ":codecommit:");
    }
}
