// src/core/overview.rs
//! Project overview: modules, package layout, features and data models,
//! gathered from the file tree without parsing any source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;
use super::modules::read_pom;

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid regex"));

const OVERVIEW_TEMPLATE: &str = r#"# {{ project_name }}

_Generated {{ generated_at }}_
{% if modules %}
## Modules

| Module | Artifact | Description |
|--------|----------|-------------|
{% for module in modules -%}
| {{ module.name }} | {{ module.artifact_id }} | {{ module.description }} |
{% endfor -%}
{% endif %}
{%- if packages %}
## Packages

| Package | Classes | Purpose |
|---------|---------|---------|
{% for package in packages -%}
| {{ package.package_name }} | {{ package.class_count }} | {{ package.purpose }} |
{% endfor -%}
{% endif %}
{%- if features %}
## Features

{% for feature in features -%}
- **{{ feature.name }}**: {{ feature.description }}
{% endfor -%}
{% endif %}
{%- if data_models %}
## Data Models

| Entity | Table |
|--------|-------|
{% for model in data_models -%}
| {{ model.entity_name }} | {{ model.table_name }} |
{% endfor -%}
{% endif %}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewModule {
    pub name: String,
    pub artifact_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    pub package_name: String,
    pub class_count: usize,
    pub purpose: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feature {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataModel {
    pub entity_name: String,
    pub table_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectOverview {
    pub project_name: String,
    pub generated_at: String,
    pub modules: Vec<OverviewModule>,
    pub packages: Vec<PackageSummary>,
    pub features: Vec<Feature>,
    pub data_models: Vec<DataModel>,
}

impl ProjectOverview {
    pub fn render(&self) -> Result<String> {
        let mut tera = Tera::default();
        tera.add_raw_template("overview.md", OVERVIEW_TEMPLATE)?;
        let context = Context::from_serialize(self)?;
        Ok(tera.render("overview.md", &context)?)
    }
}

/// Collects a `ProjectOverview` for a project root
pub struct OverviewScanner {
    source_root: String,
}

impl OverviewScanner {
    pub fn new(source_root: impl Into<String>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }

    pub fn scan(&self, root: &Path) -> ProjectOverview {
        let project_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.display().to_string());

        let java_files = self.java_files(root);
        debug!("Overview of {}: {} source files", project_name, java_files.len());

        ProjectOverview {
            project_name,
            generated_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            modules: scan_modules(root),
            packages: self.scan_packages(root, &java_files),
            features: scan_features(&java_files),
            data_models: scan_data_models(&java_files),
        }
    }

    /// Java files under the source root, sorted
    fn java_files(&self, root: &Path) -> Vec<PathBuf> {
        let src = root.join(&self.source_root);
        if !src.is_dir() {
            return Vec::new();
        }

        let mut files: Vec<_> = WalkDir::new(&src)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().map_or(false, |ext| ext == "java"))
            .collect();
        files.sort();
        files
    }

    fn scan_packages(&self, root: &Path, java_files: &[PathBuf]) -> Vec<PackageSummary> {
        let src = root.join(&self.source_root);
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();

        for file in java_files {
            let Some(dir) = file.parent().and_then(|p| p.strip_prefix(&src).ok()) else {
                continue;
            };
            let package = dir
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join(".");
            *counts.entry(package).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(package_name, class_count)| PackageSummary {
                purpose: infer_purpose(&package_name).to_string(),
                package_name,
                class_count,
            })
            .collect()
    }
}

impl Default for OverviewScanner {
    fn default() -> Self {
        Self::new("src/main/java")
    }
}

/// Declared modules of a Maven root; empty when there is no readable pom
fn scan_modules(root: &Path) -> Vec<OverviewModule> {
    let root_pom = root.join("pom.xml");
    if !root_pom.is_file() {
        return Vec::new();
    }

    let summary = match read_pom(&root_pom) {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Could not read {}: {}", root_pom.display(), e);
            return Vec::new();
        }
    };

    summary
        .modules
        .iter()
        .filter_map(|declared| {
            let pom = root.join(declared).join("pom.xml");
            if !pom.is_file() {
                return None;
            }
            match read_pom(&pom) {
                Ok(module) => {
                    let artifact_id = module.artifact_id.unwrap_or_default();
                    Some(OverviewModule {
                        name: module.name.unwrap_or_else(|| artifact_id.clone()),
                        artifact_id,
                        description: module.description.unwrap_or_default(),
                    })
                }
                Err(e) => {
                    warn!("Could not read {}: {}", pom.display(), e);
                    None
                }
            }
        })
        .collect()
}

fn scan_features(java_files: &[PathBuf]) -> Vec<Feature> {
    java_files
        .iter()
        .filter_map(|p| p.file_name()?.to_str()?.strip_suffix("Controller.java"))
        .map(|name| Feature {
            name: name.to_string(),
            description: format!("{} features", name),
        })
        .collect()
}

fn scan_data_models(java_files: &[PathBuf]) -> Vec<DataModel> {
    java_files
        .iter()
        .filter_map(|p| p.file_name()?.to_str()?.strip_suffix(".java"))
        .filter(|stem| stem.ends_with("Entity"))
        .map(|stem| DataModel {
            entity_name: stem.to_string(),
            table_name: to_snake_case(&stem.replace("Entity", "")),
        })
        .collect()
}

/// Layer a package most likely belongs to, judged by its name
pub fn infer_purpose(package_name: &str) -> &'static str {
    let has = |needle: &str| package_name.contains(needle);
    if has("controller") {
        "API layer"
    } else if has("service") {
        "business layer"
    } else if has("repository") || has("dao") {
        "data access"
    } else if has("entity") || has("domain") {
        "domain model"
    } else if has("dto") || has("vo") {
        "data transfer objects"
    } else if has("config") {
        "configuration"
    } else if has("util") {
        "utilities"
    } else {
        "other"
    }
}

pub fn to_snake_case(camel_case: &str) -> String {
    CAMEL_BOUNDARY.replace_all(camel_case, "${1}_${2}").to_lowercase()
}
