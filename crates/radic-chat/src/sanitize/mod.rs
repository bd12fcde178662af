//! Response sanitizing: positional annotation removal followed by textual
//! citation cleanup.

pub mod annotations;
pub mod citations;

pub use annotations::strip_annotations;
pub use citations::{clean_citations, CitationCleaner};
