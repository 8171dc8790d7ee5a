//! Sanehtml
//!
//! Re-exports the tree builder crates so the command line tools and the integration tests can use
//! a single dependency.

pub use sanehtml_html5 as html5;
pub use sanehtml_shared as shared;

pub use sanehtml_html5::build_document;
pub use sanehtml_shared::types;
