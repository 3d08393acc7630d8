//! S3 buckets.

use stackforge_core::{CfnValue, DeletionPolicy, Props, Resource};

/// The pipeline's artifact store: S3-managed encryption, all public access
/// blocked, retained on stack deletion so in-flight executions keep their
/// artifacts.
pub fn artifact_bucket() -> Resource {
    Resource::new(
        "AWS::S3::Bucket",
        Props::new()
            .set(
                "BucketEncryption",
                Props::new().set(
                    "ServerSideEncryptionConfiguration",
                    vec![CfnValue::from(Props::new().set(
                        "ServerSideEncryptionByDefault",
                        Props::new().set("SSEAlgorithm", "AES256"),
                    ))],
                ),
            )
            .set(
                "PublicAccessBlockConfiguration",
                Props::new()
                    .set("BlockPublicAcls", true)
                    .set("BlockPublicPolicy", true)
                    .set("IgnorePublicAcls", true)
                    .set("RestrictPublicBuckets", true),
            ),
    )
    .with_removal_policy(DeletionPolicy::Retain)
}
