// stackforge-core - Pure CloudFormation document model
//
// This crate contains the template vocabulary only: values, intrinsic
// functions, resources, parameters and whole templates, plus ARN parsing.
// No I/O, no synthesis bookkeeping, deterministic serialization.

pub mod arn;
pub mod template;
pub mod value;

// Re-export commonly used types
pub use arn::{Arn, ArnError};
pub use template::{DeletionPolicy, Parameter, Resource, Template};
pub use value::{pseudo, CfnValue, Props};
