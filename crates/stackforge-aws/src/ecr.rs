//! ECR repositories.

use crate::iam::PolicyDocument;
use stackforge_core::{pseudo, CfnValue, DeletionPolicy, Props, Resource};

/// A container registry declared by this app.
#[derive(Debug, Clone)]
pub struct Repository {
    repository_name: String,
    policy: Option<PolicyDocument>,
}

impl Repository {
    pub fn new(repository_name: impl Into<String>) -> Self {
        Repository {
            repository_name: repository_name.into(),
            policy: None,
        }
    }

    /// Resource policy controlling which principals may pull and push.
    pub fn with_resource_policy(mut self, policy: PolicyDocument) -> Self {
        self.policy = Some(policy);
        self
    }

    /// `<account>.dkr.ecr.<region>.<url-suffix>/<name>`, assembled from the
    /// deploying environment's pseudo parameters.
    pub fn repository_uri(&self) -> CfnValue {
        CfnValue::concat(vec![
            CfnValue::ref_to(pseudo::ACCOUNT_ID),
            ".dkr.ecr.".into(),
            CfnValue::ref_to(pseudo::REGION),
            ".".into(),
            CfnValue::ref_to(pseudo::URL_SUFFIX),
            "/".into(),
            self.repository_name.as_str().into(),
        ])
    }

    pub fn arn_of(logical_id: &str) -> CfnValue {
        CfnValue::get_att(logical_id, "Arn")
    }

    pub fn into_resource(self) -> Resource {
        Resource::new(
            "AWS::ECR::Repository",
            Props::new()
                .set("RepositoryName", self.repository_name.as_str())
                .set_opt("RepositoryPolicyText", self.policy.as_ref().map(PolicyDocument::to_value)),
        )
        .with_removal_policy(DeletionPolicy::Delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::{PolicyStatement, Principal};
    use serde_json::json;

    #[test]
    fn repository_carries_policy_and_delete_on_removal() {
        let policy = PolicyDocument::new(vec![PolicyStatement::allow()
            .action("ecr:*")
            .principal(Principal::account("985218050846"))]);
        let rendered =
            serde_json::to_value(Repository::new("test-ecs-demo").with_resource_policy(policy).into_resource())
                .unwrap();

        assert_eq!(rendered["Type"], "AWS::ECR::Repository");
        assert_eq!(rendered["Properties"]["RepositoryName"], "test-ecs-demo");
        assert_eq!(rendered["DeletionPolicy"], "Delete");
        assert_eq!(rendered["UpdateReplacePolicy"], "Delete");
        assert_eq!(
            rendered["Properties"]["RepositoryPolicyText"]["Statement"][0]["Action"],
            "ecr:*"
        );
    }

    #[test]
    fn repository_uri_joins_pseudo_parameters() {
        let uri = Repository::new("test-ecs-demo").repository_uri();
        let rendered = serde_json::to_value(uri).unwrap();
        assert_eq!(
            rendered,
            json!({"Fn::Join": ["", [
                {"Ref": "AWS::AccountId"},
                ".dkr.ecr.",
                {"Ref": "AWS::Region"},
                ".",
                {"Ref": "AWS::URLSuffix"},
                "/",
                "test-ecs-demo"
            ]]})
        );
    }
}
