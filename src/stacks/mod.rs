//! The two stacks this app declares: the Fargate service and the delivery
//! pipeline that builds and deploys it.

pub mod pipeline;
pub mod service;

/// Service-template parameters the deploy action fills with values taken
/// from the asset artifact at deploy time.
pub const ARTIFACT_S3_BUCKET: &str = "ArtifactS3Bucket";
pub const ARTIFACT_S3_VERSION_KEY: &str = "ArtifactS3VersionKey";
pub const ARTIFACT_S3_HASH: &str = "ArtifactS3Hash";

/// Parameter naming the container image. Promotion deploys override it with
/// the URI the Java build recorded in `imageDetail.json`.
pub const REGISTRY_PARAMETER: &str = "RegistryParameter";
