//! CloudWatch log groups.

use stackforge_core::{DeletionPolicy, Props, Resource};

/// A log group for container logs. The name is left to CloudFormation so
/// repeated deploys never collide; the group survives stack deletion.
#[derive(Debug, Clone, Default)]
pub struct LogGroup {
    retention_days: Option<u32>,
}

impl LogGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = Some(days);
        self
    }

    pub fn into_resource(self) -> Resource {
        Resource::new(
            "AWS::Logs::LogGroup",
            Props::new().set_opt("RetentionInDays", self.retention_days),
        )
        .with_removal_policy(DeletionPolicy::Retain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_group_is_retained() {
        let rendered = serde_json::to_value(LogGroup::new().into_resource()).unwrap();
        assert_eq!(rendered["Type"], "AWS::Logs::LogGroup");
        assert_eq!(rendered["DeletionPolicy"], "Retain");
        assert!(rendered.get("Properties").is_none());
    }
}
