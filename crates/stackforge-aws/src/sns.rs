//! SNS topics for manual approval notifications.

use stackforge_core::{CfnValue, Props, Resource};
use stackforge_synth::{Stack, SynthError};

/// A notification topic with email subscriptions.
#[derive(Debug, Clone)]
pub struct Topic {
    logical_id: String,
}

impl Topic {
    pub fn create(stack: &mut Stack, logical_id: &str) -> Result<Self, SynthError> {
        stack.add_resource(logical_id, Resource::new("AWS::SNS::Topic", Props::new()))?;
        Ok(Topic {
            logical_id: logical_id.to_string(),
        })
    }

    pub fn subscribe_email(&self, stack: &mut Stack, logical_id: &str, email: &str) -> Result<(), SynthError> {
        stack.add_resource(
            logical_id,
            Resource::new(
                "AWS::SNS::Subscription",
                Props::new()
                    .set("Endpoint", email)
                    .set("Protocol", "email")
                    .set("TopicArn", self.arn()),
            ),
        )
    }

    /// `Ref` on a topic yields its ARN.
    pub fn arn(&self) -> CfnValue {
        CfnValue::ref_to(self.logical_id.as_str())
    }
}
