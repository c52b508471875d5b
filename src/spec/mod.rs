//! # Spec Module
//!
//! Swagger 2.0 document handling: the document model, loading documents from
//! YAML/JSON files, merging generated operations into a file document, and
//! assembling a document from the routes registered on an [`App`](crate::app::App).

mod build;
mod load;
mod types;

pub use build::*;
pub use load::*;
pub use types::*;
