use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Digest};
use tracing::debug;

use crate::config::ScanConfig;
use crate::error::{FlowdocError, Result};
use super::languages::{LanguageParser, JavaParser};

/// An annotation as written on a class, method or field.
///
/// Attribute values are kept as raw source text (quotes, braces and
/// enum prefixes included); consumers clean them up as needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Name as written, e.g. `GetMapping` or `org.apache.dubbo.config.annotation.Service`
    pub name: String,

    /// Attribute name -> raw value text
    pub attributes: BTreeMap<String, String>,
}

impl AnnotationRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Name without any package qualifier
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// True when this annotation is `marker`, either simple or qualified
    pub fn matches(&self, marker: &str) -> bool {
        self.name == marker
            || (self.name.len() > marker.len()
                && self.name.ends_with(marker)
                && self.name[..self.name.len() - marker.len()].ends_with('.'))
    }
}

/// Anything that carries annotations
pub trait Annotated {
    fn annotations(&self) -> &[AnnotationRecord];

    fn has_annotation(&self, marker: &str) -> bool {
        self.annotations().iter().any(|a| a.matches(marker))
    }

    /// First annotation matching any of the given markers
    fn find_annotation<S: AsRef<str>>(&self, markers: &[S]) -> Option<&AnnotationRecord> {
        self.annotations()
            .iter()
            .find(|a| markers.iter().any(|m| a.matches(m.as_ref())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    pub field_type: String,
    pub annotations: Vec<AnnotationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub name: String,

    /// `"<type> <name>"` per parameter, in declaration order
    pub parameters: Vec<String>,

    pub return_type: String,

    pub annotations: Vec<AnnotationRecord>,

    /// Call expressions found in the body, receiver-qualified where a receiver exists
    pub called_methods: Vec<String>,

    pub is_public: bool,

    pub is_static: bool,

    /// `name(<param>, <param>)`, stable identity within a class
    pub signature: String,
}

/// Structural record of the first class or interface declared in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub class_name: String,
    pub package_name: Option<String>,
    pub full_class_name: String,
    pub annotations: Vec<AnnotationRecord>,
    pub fields: Vec<FieldRecord>,
    pub methods: Vec<MethodRecord>,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub file_path: PathBuf,

    /// SHA-256 of the source text, for change detection
    pub content_hash: String,
}

impl ClassRecord {
    /// First method with the given simple name
    pub fn find_method(&self, name: &str) -> Option<&MethodRecord> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldRecord> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Qualify a type name against this class's package.
    ///
    /// Dotted names are taken as already qualified.
    pub fn resolve_type_name(&self, type_name: &str) -> String {
        let base = type_name.split('<').next().unwrap_or(type_name).trim();
        if base.contains('.') {
            return base.to_string();
        }
        match &self.package_name {
            Some(package) => format!("{}.{}", package, base),
            None => base.to_string(),
        }
    }
}

impl Annotated for ClassRecord {
    fn annotations(&self) -> &[AnnotationRecord] {
        &self.annotations
    }
}

impl Annotated for MethodRecord {
    fn annotations(&self) -> &[AnnotationRecord] {
        &self.annotations
    }
}

impl Annotated for FieldRecord {
    fn annotations(&self) -> &[AnnotationRecord] {
        &self.annotations
    }
}

thread_local! {
    // tree-sitter parsers are not Sync; one per rayon worker
    static JAVA_PARSER: RefCell<Option<JavaParser>> = const { RefCell::new(None) };
}

/// Reads source files and hands them to the language parser
#[derive(Debug, Clone)]
pub struct CodeParser {
    config: ScanConfig,
}

impl CodeParser {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Determine if a file should be parsed based on extension
    pub fn should_parse_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| JavaParser::EXTENSIONS.contains(&ext))
    }

    /// Parseable source files under `dir`, sorted by path.
    ///
    /// Ignore files (`.gitignore`, `.ignore`, global excludes) are not consulted;
    /// the configured exclusion patterns are the only filter. Exclusion patterns are matched against the path relative to `dir`
    /// with a leading separator, so `/test/` also catches a top-level `test` directory.
    pub fn source_files<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut files = Vec::new();

        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .build();

        for entry in walker {
            let entry = entry.map_err(|e| FlowdocError::FileSystem(e.to_string()))?;
            let path = entry.path();

            if path.is_file() && self.should_parse_file(path) && !self.is_excluded(dir, path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn is_excluded(&self, dir: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(dir).unwrap_or(path);
        let text = format!("{}{}", MAIN_SEPARATOR, relative.display());
        self.config.exclude_patterns.iter().any(|pattern| text.contains(pattern.as_str()))
    }

    /// Parse a single source file from disk
    pub fn parse_file<P: AsRef<Path>>(&self, file_path: P) -> Result<ClassRecord> {
        let path = file_path.as_ref();

        let metadata = std::fs::metadata(path)?;
        if metadata.len() as usize > self.config.max_file_size {
            return Err(FlowdocError::Parser(
                format!("File {} exceeds maximum size limit", path.display())
            ));
        }

        let source_content = std::fs::read_to_string(path)?;
        self.parse_source(&source_content, path)
    }

    /// Parse source text that is already in memory
    pub fn parse_source(&self, content: &str, path: &Path) -> Result<ClassRecord> {
        JAVA_PARSER.with(|cell| {
            let mut slot = cell.borrow_mut();
            if slot.is_none() {
                *slot = Some(JavaParser::new()?);
            }
            match slot.as_mut() {
                Some(parser) => {
                    let record = parser.parse(content, path)?;
                    debug!("Parsed {} file {} -> {}", parser.language_name(), path.display(), record.full_class_name);
                    Ok(record)
                }
                None => Err(FlowdocError::Parser("Java parser unavailable".to_string())),
            }
        })
    }
}

/// Calculate SHA256 hash of content
pub(crate) fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_matching() {
        let simple = AnnotationRecord::new("Service");
        let qualified = AnnotationRecord::new("org.apache.dubbo.config.annotation.Service");
        let other = AnnotationRecord::new("DubboService");

        assert!(simple.matches("Service"));
        assert!(qualified.matches("Service"));
        assert_eq!(qualified.simple_name(), "Service");
        assert!(!other.matches("Service"));
    }

    #[test]
    fn test_resolve_type_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("OrderController.java");
        std::fs::write(&path, "package com.shop.order;\npublic class OrderController {}\n").unwrap();

        let parser = CodeParser::new(&ScanConfig::default());
        let class = parser.parse_file(&path).unwrap();

        assert_eq!(class.resolve_type_name("StockApi"), "com.shop.order.StockApi");
        assert_eq!(class.resolve_type_name("com.shop.api.StockApi"), "com.shop.api.StockApi");
        assert_eq!(class.resolve_type_name("List<Item>"), "com.shop.order.List");
        assert_eq!(class.content_hash.len(), 64);
    }

    #[test]
    fn test_oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Big.java");
        std::fs::write(&path, "public class Big {}\n").unwrap();

        let config = ScanConfig { max_file_size: 4, ..ScanConfig::default() };
        let parser = CodeParser::new(&config);

        assert!(matches!(parser.parse_file(&path), Err(FlowdocError::Parser(_))));
    }

    #[test]
    fn test_source_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for file in ["b/Beta.java", "a/Alpha.java", "test/AlphaTest.java", "x/target/Gen.java", "a/notes.txt"] {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "class X {}").unwrap();
        }

        let parser = CodeParser::new(&ScanConfig::default());
        let files: Vec<_> = parser.source_files(root).unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(files, vec![PathBuf::from("a/Alpha.java"), PathBuf::from("b/Beta.java")]);
    }

    #[test]
    fn test_ignore_files_do_not_hide_sources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join(".ignore"), "*.java\n").unwrap();
        std::fs::write(root.join(".gitignore"), "*.java\n").unwrap();
        std::fs::create_dir_all(root.join("svc/.hidden")).unwrap();
        std::fs::write(root.join("svc/.gitignore"), "Api.java\n").unwrap();
        std::fs::write(root.join("svc/Api.java"), "class Api {}").unwrap();
        std::fs::write(root.join("svc/.hidden/Dot.java"), "class Dot {}").unwrap();

        let parser = CodeParser::new(&ScanConfig::default());
        let svc = root.join("svc");
        let files: Vec<_> = parser.source_files(&svc).unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(&svc).unwrap().to_path_buf())
            .collect();

        assert_eq!(files, vec![PathBuf::from(".hidden/Dot.java"), PathBuf::from("Api.java")]);
    }

    #[test]
    fn test_should_parse_file() {
        let parser = CodeParser::new(&ScanConfig::default());
        assert!(parser.should_parse_file(Path::new("a/B.java")));
        assert!(!parser.should_parse_file(Path::new("a/B.kt")));
        assert!(!parser.should_parse_file(Path::new("pom.xml")));
    }
}
