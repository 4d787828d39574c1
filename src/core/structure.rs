// src/core/structure.rs
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use serde::Serialize;
use tracing::warn;

use super::call_graph::{EntryPoint, EntryType};
use super::parser::{ClassRecord, MethodRecord};

/// One build module of a scanned project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub package_count: usize,
    pub class_count: usize,
    pub description: Option<String>,
}

/// Structural index of one scanned codebase.
///
/// Classes keep their registration order, which is the order the scanner
/// saw their files in. Project-wide lookups by simple method name resolve to
/// the first registered class, so that order is part of the contract.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectStructure {
    pub project_name: String,
    pub project_path: PathBuf,
    pub modules: Vec<ModuleDescriptor>,
    classes: Vec<ClassRecord>,
    #[serde(skip)]
    class_index: HashMap<String, usize>,
    entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectStatistics {
    pub module_count: usize,
    pub class_count: usize,
    pub entry_point_count: usize,
    pub entry_type_count: BTreeMap<EntryType, usize>,
}

impl ProjectStructure {
    pub fn new(project_name: impl Into<String>, project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_name: project_name.into(),
            project_path: project_path.into(),
            ..Self::default()
        }
    }

    pub fn add_module(&mut self, module: ModuleDescriptor) {
        self.modules.push(module);
    }

    /// Register a class by FQCN. A duplicate FQCN replaces the earlier
    /// record in place, keeps its registration slot and drops the entry
    /// points detected on the replaced record.
    pub fn add_class(&mut self, class: ClassRecord) {
        match self.class_index.get(&class.full_class_name) {
            Some(&slot) => {
                warn!(
                    "Duplicate class {} ({} replaces {})",
                    class.full_class_name,
                    class.file_path.display(),
                    self.classes[slot].file_path.display()
                );
                let fqcn = class.full_class_name.clone();
                self.entry_points.retain(|ep| ep.class_name != fqcn);
                self.classes[slot] = class;
            }
            None => {
                self.class_index.insert(class.full_class_name.clone(), self.classes.len());
                self.classes.push(class);
            }
        }
    }

    pub fn add_entry_point(&mut self, entry_point: EntryPoint) {
        self.entry_points.push(entry_point);
    }

    pub fn get_class(&self, full_class_name: &str) -> Option<&ClassRecord> {
        self.class_index.get(full_class_name).map(|&i| &self.classes[i])
    }

    /// Classes in registration order
    pub fn classes(&self) -> &[ClassRecord] {
        &self.classes
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    /// First class, in registration order, declaring a method with this simple name
    pub fn find_method_owner(&self, method_name: &str) -> Option<(&ClassRecord, &MethodRecord)> {
        self.classes
            .iter()
            .find_map(|c| c.find_method(method_name).map(|m| (c, m)))
    }

    /// Resolve an entry point back to its class and method records
    pub fn resolve_entry_point(&self, entry_point: &EntryPoint) -> Option<(&ClassRecord, &MethodRecord)> {
        let class = self.get_class(&entry_point.class_name)?;
        let method = class.methods.iter()
            .find(|m| m.signature == entry_point.method_signature)
            .or_else(|| class.find_method(&entry_point.method_name))?;
        Some((class, method))
    }

    pub fn statistics(&self) -> ProjectStatistics {
        let mut entry_type_count = BTreeMap::new();
        for ep in &self.entry_points {
            *entry_type_count.entry(ep.entry_type).or_insert(0) += 1;
        }

        ProjectStatistics {
            module_count: self.modules.len(),
            class_count: self.classes.len(),
            entry_point_count: self.entry_points.len(),
            entry_type_count,
        }
    }

    /// Classes worth documenting first: entry point owners, then service interfaces
    pub fn key_classes(&self) -> Vec<&ClassRecord> {
        let mut key_classes: Vec<&ClassRecord> = Vec::new();

        for ep in &self.entry_points {
            if let Some(class) = self.get_class(&ep.class_name) {
                if !key_classes.iter().any(|c| c.full_class_name == class.full_class_name) {
                    key_classes.push(class);
                }
            }
        }

        for class in self.classes.iter().filter(|c| c.is_interface && c.full_class_name.contains(".service.")) {
            if !key_classes.iter().any(|c| c.full_class_name == class.full_class_name) {
                key_classes.push(class);
            }
        }

        key_classes
    }
}
