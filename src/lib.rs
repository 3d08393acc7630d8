// stackforge - CloudFormation synthesis for the Safe API service and its
// delivery pipeline.
//
// `compose` builds both stacks against one configuration: the ECS service
// stack bound to its environment's exports, and the pipeline stack that
// builds, synthesizes and deploys it. The result is a cloud assembly ready
// to be written to disk.

pub mod init;
pub mod stacks;

use anyhow::{Context, Result};
use stackforge_aws::codepipeline::TemplateCatalog;
use stackforge_config::AppConfig;
use stackforge_synth::{template_file_name, CloudAssembly, ExportRegistry};
use tracing::info;

/// Declare every stack of the app and synthesize them into one assembly.
///
/// The service stack is built first so the pipeline's parameter overrides
/// can be checked against the template it will actually deploy.
pub fn compose(config: &AppConfig) -> Result<CloudAssembly> {
    let exports: ExportRegistry = config.exports.iter().collect();
    let service = stacks::service::build(config, &exports).context("declaring the service stack")?;

    let mut catalog = TemplateCatalog::new();
    catalog.register(
        template_file_name(service.stack.name()),
        service.stack.template().parameter_names(),
    );

    let pipeline =
        stacks::pipeline::build(config, &catalog).context("declaring the pipeline stack")?;

    let mut assembly = CloudAssembly::new();
    assembly.add_stack(service.stack)?;
    assembly.add_stack(pipeline)?;
    info!(stacks = assembly.stacks().len(), "composed cloud assembly");
    Ok(assembly)
}
