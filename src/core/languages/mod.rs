//! Language-specific parsers
//!
//! Each language gets its own module with a consistent interface for turning
//! one source file into a structural class record.

mod java;

pub use java::JavaParser;

use crate::error::Result;
use super::parser::ClassRecord;

/// Trait that all language parsers must implement
pub trait LanguageParser {
    /// Parse source code into the record of its first type declaration
    fn parse(&mut self, content: &str, file_path: &std::path::Path) -> Result<ClassRecord>;

    /// Get the language name
    fn language_name(&self) -> &str;
}
