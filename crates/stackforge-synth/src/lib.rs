// stackforge-synth - Stack synthesis and cloud assembly output.
//
// A `Stack` collects declared resources and parameters for one deployable
// template. The `ExportRegistry` resolves values published by stacks outside
// this app. `CloudAssembly` renders every stack to JSON and writes the
// templates plus a manifest to an output directory.

pub mod assembly;
pub mod error;
pub mod registry;
pub mod stack;

pub use assembly::{
    template_file_name, AssemblyManifest, CloudAssembly, ManifestEntry, SynthesizedStack,
    TemplateHash,
};
pub use error::SynthError;
pub use registry::{ExportRegistry, ResolvedExport};
pub use stack::{Stack, StackEnv};
