// stackforge-aws - Typed declarations for the AWS resources this app emits.
//
// Each module mirrors one service namespace. Builders either return a
// `Resource` for the caller to place, or attach a small resource group to a
// `Stack` and hand back a typed handle (`codebuild::PipelineProject`,
// `codepipeline::Pipeline`).

pub mod codebuild;
pub mod codecommit;
pub mod codepipeline;
pub mod ec2;
pub mod ecr;
pub mod ecs;
pub mod elbv2;
pub mod iam;
pub mod logs;
pub mod s3;
pub mod sns;
