use thiserror::Error;

/// Errors surfaced while declaring stacks or writing the assembly.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("export `{name}` is not registered; add it to the [exports] table or deploy the stack that publishes it")]
    MissingExport { name: String },

    #[error("stack `{stack}` already declares a resource with logical id `{logical_id}`")]
    DuplicateLogicalId { stack: String, logical_id: String },

    #[error("stack `{stack}` already declares a parameter named `{logical_id}`")]
    DuplicateParameter { stack: String, logical_id: String },

    #[error("assembly already contains a stack named `{name}`")]
    DuplicateStackName { name: String },

    #[error("stack `{stack}` declares no resources")]
    EmptyStack { stack: String },

    #[error("template serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("assembly io error: {0}")]
    Io(#[from] std::io::Error),
}
