//! Output post-processing for shell sessions.
//!
//! Provides:
//! - `OutputTransformer` - named text rewriters selected after a `|`
//! - `TransformerRegistry` - startup-time, read-only transformer set
//! - `PipelineInvoker` - all-or-nothing application of a `PipelineSpec`
//! - Built-in transformers: `grep`, `highlight`, `json`, `save`

pub mod builtin;
pub mod pipeline;
pub mod registry;
pub mod transformer;

pub use pipeline::{PipelineError, PipelineInvoker, PipelineSpec, PipelineStage, split_pipeline};
pub use registry::{RegistryError, TransformerRegistry, builtins, builtins_saving_to};
pub use transformer::{InputKind, OutputTransformer, TransformError, TransformerInfo, effective_args};
