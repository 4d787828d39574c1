// src/core/modules.rs
//! Build-descriptor readers that split a project root into modules

use std::path::Path;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{FlowdocError, Result};
use super::structure::ModuleDescriptor;

/// Reads a project's build descriptor and reports its modules
pub trait ModuleReader {
    /// Modules of the project at `root`. Never empty for an existing root.
    fn read_modules(&self, root: &Path) -> Result<Vec<ModuleDescriptor>>;
}

/// Maven `pom.xml` reader
#[derive(Debug, Clone)]
pub struct MavenModuleReader {
    source_root: String,
}

/// The parts of a pom we care about
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PomSummary {
    pub modules: Vec<String>,
    pub artifact_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl MavenModuleReader {
    pub fn new(source_root: impl Into<String>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }

    pub fn is_maven_project(root: &Path) -> bool {
        root.join("pom.xml").is_file()
    }

    pub fn is_multi_module_project(root: &Path) -> bool {
        let pom = root.join("pom.xml");
        std::fs::read_to_string(pom)
            .ok()
            .and_then(|content| parse_pom(&content).ok())
            .map_or(false, |summary| !summary.modules.is_empty())
    }

    fn describe(&self, module_path: &Path, pom: Option<&PomSummary>) -> ModuleDescriptor {
        let dir_name = directory_name(module_path);
        let (class_count, package_count) = self.count_sources(module_path);

        let module = ModuleDescriptor {
            name: pom.and_then(|p| p.artifact_id.clone()).unwrap_or(dir_name),
            path: module_path.to_path_buf(),
            package_count,
            class_count,
            description: pom.and_then(|p| p.name.clone()),
        };

        debug!(
            "Module {}: {} classes, {} packages",
            module.name, module.class_count, module.package_count
        );
        module
    }

    /// (java file count, package directory count) under the module's source root
    fn count_sources(&self, module_path: &Path) -> (usize, usize) {
        let src = module_path.join(&self.source_root);
        if !src.is_dir() {
            return (0, 0);
        }

        let mut files = 0;
        let mut packages = 0;
        for entry in WalkDir::new(&src).min_depth(1).into_iter().filter_map(|e| e.ok()) {
            let file_type = entry.file_type();
            if file_type.is_dir() {
                packages += 1;
            } else if file_type.is_file()
                && entry.path().extension().map_or(false, |ext| ext == "java")
            {
                files += 1;
            }
        }
        (files, packages)
    }
}

impl Default for MavenModuleReader {
    fn default() -> Self {
        Self::new("src/main/java")
    }
}

impl ModuleReader for MavenModuleReader {
    fn read_modules(&self, root: &Path) -> Result<Vec<ModuleDescriptor>> {
        let root_pom = root.join("pom.xml");
        if !root_pom.is_file() {
            debug!("No pom.xml in {}, treating it as a single module", root.display());
            return Ok(vec![self.describe(root, None)]);
        }

        let summary = match read_pom(&root_pom) {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Could not read {}: {}", root_pom.display(), e);
                return Ok(vec![self.describe(root, None)]);
            }
        };

        if summary.modules.is_empty() {
            return Ok(vec![self.describe(root, Some(&summary))]);
        }

        info!("Multi-module Maven project with {} declared modules", summary.modules.len());

        let mut modules = Vec::new();
        for declared in &summary.modules {
            let module_path = root.join(declared);
            let module_pom = module_path.join("pom.xml");
            if !module_pom.is_file() {
                warn!("Declared module {} has no pom.xml, skipping", module_path.display());
                continue;
            }
            match read_pom(&module_pom) {
                Ok(module_summary) => modules.push(self.describe(&module_path, Some(&module_summary))),
                Err(e) => {
                    warn!("Could not read {}: {}", module_pom.display(), e);
                    modules.push(self.describe(&module_path, None));
                }
            }
        }

        if modules.is_empty() {
            warn!("No declared module could be read, scanning {} as one module", root.display());
            modules.push(self.describe(root, Some(&summary)));
        }

        Ok(modules)
    }
}

pub(crate) fn read_pom(path: &Path) -> Result<PomSummary> {
    let content = std::fs::read_to_string(path)?;
    parse_pom(&content)
}

/// Extract declared modules and the project's own `artifactId`, `name` and
/// `description`. Values nested elsewhere (`<parent>`, dependencies) are ignored.
pub fn parse_pom(content: &str) -> Result<PomSummary> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut summary = PomSummary::default();
    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape()
                    .map_err(|e| FlowdocError::Xml(e.to_string()))?
                    .trim()
                    .to_string();
                if text.is_empty() {
                    buf.clear();
                    continue;
                }

                let current = stack.last().map(String::as_str);
                let parent = stack.len().checked_sub(2).map(|i| stack[i].as_str());
                match (current, parent) {
                    (Some("module"), Some("modules")) => summary.modules.push(text),
                    (Some("artifactId"), Some("project")) => summary.artifact_id = Some(text),
                    (Some("name"), Some("project")) => summary.name = Some(text),
                    (Some("description"), Some("project")) => summary.description = Some(text),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FlowdocError::Xml(format!("pom.xml parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(summary)
}

fn directory_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    const PARENT_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <groupId>com.shop</groupId>
  <artifactId>shop-parent</artifactId>
  <name>Shop Parent</name>
  <description>Everything a shop needs</description>
  <!-- <modules><module>ghost</module></modules> -->
  <modules>
    <module>order-service</module>
    <module>stock-service</module>
    <module>missing-service</module>
  </modules>
</project>"#;

    fn module_pom(artifact: &str, name: &str) -> String {
        format!(
            "<project><parent><artifactId>shop-parent</artifactId></parent>\
             <artifactId>{}</artifactId><name>{}</name></project>",
            artifact, name
        )
    }

    #[test]
    fn test_parse_pom() {
        let summary = parse_pom(PARENT_POM).unwrap();
        assert_eq!(summary.modules, vec!["order-service", "stock-service", "missing-service"]);
        assert_eq!(summary.artifact_id.as_deref(), Some("shop-parent"));
        assert_eq!(summary.name.as_deref(), Some("Shop Parent"));
        assert_eq!(summary.description.as_deref(), Some("Everything a shop needs"));
    }

    #[test]
    fn test_module_outside_modules_block_is_ignored() {
        let summary = parse_pom("<project><build><module>x</module></build></project>").unwrap();
        assert!(summary.modules.is_empty());
        assert!(summary.artifact_id.is_none());
    }

    #[test]
    fn test_parent_and_dependency_coordinates_are_ignored() {
        let summary = parse_pom(
            "<project>\
               <parent><artifactId>shop-parent</artifactId><name>Parent</name></parent>\
               <artifactId>order-svc</artifactId>\
               <dependencies><dependency><artifactId>guava</artifactId></dependency></dependencies>\
             </project>"
        ).unwrap();
        assert_eq!(summary.artifact_id.as_deref(), Some("order-svc"));
        assert!(summary.name.is_none());
    }

    #[test]
    fn test_malformed_pom_is_xml_error() {
        assert!(matches!(parse_pom("<project><artifactId>x</name></project>"), Err(FlowdocError::Xml(_))));
    }

    #[test]
    fn test_multi_module_project() {
        let temp = TempDir::new().unwrap();
        temp.child("pom.xml").write_str(PARENT_POM).unwrap();
        temp.child("order-service/pom.xml").write_str(&module_pom("order-svc", "Orders")).unwrap();
        temp.child("order-service/src/main/java/com/shop/order/OrderController.java")
            .write_str("package com.shop.order; public class OrderController {}").unwrap();
        temp.child("order-service/src/main/java/com/shop/order/OrderService.java")
            .write_str("package com.shop.order; public interface OrderService {}").unwrap();
        temp.child("stock-service/pom.xml").write_str("<project/>").unwrap();
        temp.child("missing-service/README.md").write_str("no pom here").unwrap();

        assert!(MavenModuleReader::is_maven_project(temp.path()));
        assert!(MavenModuleReader::is_multi_module_project(temp.path()));

        let modules = MavenModuleReader::default().read_modules(temp.path()).unwrap();
        assert_eq!(modules.len(), 2);

        // the child's own artifactId, not the one under <parent>
        assert_eq!(modules[0].name, "order-svc");
        assert_eq!(modules[0].description.as_deref(), Some("Orders"));
        assert_eq!(modules[0].class_count, 2);
        // com, com/shop, com/shop/order
        assert_eq!(modules[0].package_count, 3);

        assert_eq!(modules[1].name, "stock-service");
        assert_eq!(modules[1].class_count, 0);
    }

    #[test]
    fn test_plain_directory_is_single_module() {
        let temp = TempDir::new().unwrap();
        temp.child("src/A.java").write_str("public class A {}").unwrap();

        assert!(!MavenModuleReader::is_maven_project(temp.path()));
        assert!(!MavenModuleReader::is_multi_module_project(temp.path()));

        let modules = MavenModuleReader::default().read_modules(temp.path()).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].path, temp.path());
        assert_eq!(modules[0].name, directory_name(temp.path()));
        assert!(modules[0].description.is_none());
    }
}
