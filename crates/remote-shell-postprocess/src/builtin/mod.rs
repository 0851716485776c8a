//! Transformers shipped with the crate.

mod grep;
mod highlight;
mod json;
mod save;

pub use grep::GrepTransformer;
pub use highlight::HighlightTransformer;
pub use json::JsonPointerTransformer;
pub use save::SaveTransformer;
