// src/core/project_scanner.rs
use std::path::{Path, PathBuf};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{Config, ScanConfig};
use crate::error::{FlowdocError, Result};
use super::call_graph::EntryPointDetector;
use super::markers::MarkerTable;
use super::modules::{MavenModuleReader, ModuleReader};
use super::parser::{ClassRecord, CodeParser};
use super::structure::ProjectStructure;

/// Walks a project root and builds its `ProjectStructure`
pub struct ProjectScanner {
    config: ScanConfig,
    code_parser: CodeParser,
    detector: EntryPointDetector,
    module_reader: Box<dyn ModuleReader + Send + Sync>,
}

/// A source file queued for parsing, with the module it belongs to
struct SourceFile {
    path: PathBuf,
    module: String,
}

impl ProjectScanner {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.scan.clone(),
            code_parser: CodeParser::new(&config.scan),
            detector: EntryPointDetector::new(MarkerTable::from_config(&config.markers)),
            module_reader: Box::new(MavenModuleReader::new(config.scan.source_root.clone())),
        }
    }

    /// Swap the build-descriptor reader
    pub fn with_module_reader(mut self, reader: Box<dyn ModuleReader + Send + Sync>) -> Self {
        self.module_reader = reader;
        self
    }

    pub fn scan_project<P: AsRef<Path>>(&self, root: P) -> Result<ProjectStructure> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(FlowdocError::InvalidRoot(root.to_path_buf()));
        }

        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let project_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.display().to_string());

        info!("Scanning project {} at {}", project_name, root.display());

        let mut structure = ProjectStructure::new(project_name, root.clone());
        let modules = self.module_reader.read_modules(&root)?;

        let mut sources = Vec::new();
        for module in &modules {
            let conventional = module.path.join(&self.config.source_root);
            let source_dir = if conventional.is_dir() { conventional } else { module.path.clone() };

            let files = self.code_parser.source_files(&source_dir)?;
            debug!("Module {} has {} source files", module.name, files.len());

            sources.extend(files.into_iter().map(|path| SourceFile {
                path,
                module: module.name.clone(),
            }));
        }
        for module in modules {
            structure.add_module(module);
        }

        sources.sort_by(|a, b| a.path.cmp(&b.path));
        sources.dedup_by(|a, b| a.path == b.path);

        let parsed = if self.config.parallel {
            self.parse_parallel(&sources)
        } else {
            self.parse_sequential(&sources)
        };

        let mut failures = 0;
        for (source, result) in sources.iter().zip(parsed) {
            match result {
                Ok(class) => self.register(&mut structure, class, &source.module),
                Err(e) => {
                    warn!("Skipping {}: {}", source.path.display(), e);
                    failures += 1;
                }
            }
        }

        let stats = structure.statistics();
        info!(
            "Scan of {} complete: {} classes, {} entry points, {} files skipped",
            structure.project_name, stats.class_count, stats.entry_point_count, failures
        );

        Ok(structure)
    }

    fn parse_parallel(&self, sources: &[SourceFile]) -> Vec<Result<ClassRecord>> {
        sources.par_iter()
            .map(|source| self.code_parser.parse_file(&source.path))
            .collect()
    }

    fn parse_sequential(&self, sources: &[SourceFile]) -> Vec<Result<ClassRecord>> {
        sources.iter()
            .map(|source| self.code_parser.parse_file(&source.path))
            .collect()
    }

    fn register(&self, structure: &mut ProjectStructure, class: ClassRecord, module: &str) {
        let entry_points = self.detector.detect_entry_points(&class);
        structure.add_class(class);

        for mut entry_point in entry_points {
            entry_point.annotations.insert("module".to_string(), module.to_string());
            debug!("Entry point {} in {}", entry_point.display_name(), module);
            structure.add_entry_point(entry_point);
        }
    }
}

impl Default for ProjectScanner {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Scan a project with default settings
pub fn scan_project<P: AsRef<Path>>(root: P) -> Result<ProjectStructure> {
    ProjectScanner::default().scan_project(root)
}
