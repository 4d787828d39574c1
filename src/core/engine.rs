// src/core/engine.rs
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use tracing::{info, warn, debug};

use crate::config::Config;
use super::{
    ProjectScanner, ProjectStructure, MavenModuleReader, MarkerTable, MarkerRole,
    EntryPoint, EntryPointFinder, EntryPointMatch, EntryType, ServiceGraphBuilder,
    ServiceDependencyGraph, CallChainTracer, CallChain, CallNode, SequenceDiagramRenderer,
    OverviewScanner
};

const CONFIG_FILE_NAME: &str = "Flowdoc.toml";

/// Main orchestration engine: scans projects and drives tracing and rendering
pub struct Engine {
    config: Config,
    markers: MarkerTable,
    renderer: SequenceDiagramRenderer,
}

impl Engine {
    /// Create a new engine instance
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        let markers = MarkerTable::from_config(&config.markers);
        debug!(
            "Remote reference markers: {:?}, HTTP client markers: {:?}",
            markers.names(MarkerRole::RpcReference),
            markers.names(MarkerRole::HttpClient)
        );

        Ok(Self {
            config,
            markers,
            renderer: SequenceDiagramRenderer::default(),
        })
    }

    /// Scan every project on the blocking pool. Results keep argument order.
    pub async fn scan_many(&self, paths: &[PathBuf]) -> Result<Vec<ProjectStructure>> {
        info!("🔍 Scanning {} project(s)...", paths.len());

        let handles: Vec<_> = paths
            .iter()
            .cloned()
            .map(|path| {
                let config = self.config.clone();
                tokio::task::spawn_blocking(move || ProjectScanner::new(&config).scan_project(&path))
            })
            .collect();

        let mut structures = Vec::with_capacity(handles.len());
        for (handle, path) in handles.into_iter().zip(paths) {
            let structure = handle
                .await
                .map_err(|e| anyhow!("Scan task for {} failed: {}", path.display(), e))?
                .with_context(|| format!("Failed to scan {}", path.display()))?;
            structures.push(structure);
        }

        Ok(structures)
    }

    async fn scan_one(&self, path: PathBuf) -> Result<ProjectStructure> {
        self.scan_many(std::slice::from_ref(&path))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No scan result for {}", path.display()))
    }

    /// Print a summary of one project, or its full structure as JSON
    pub async fn scan(&self, path: PathBuf, json: bool) -> Result<()> {
        let structure = self.scan_one(path).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&structure)?);
        } else {
            print!("{}", scan_summary(&structure));
        }

        Ok(())
    }

    /// Rank the entry points of all projects against the keywords
    pub async fn find(&self, keywords: Vec<String>, projects: Vec<PathBuf>) -> Result<()> {
        let structures = self.scan_many(&projects).await?;

        let finder = EntryPointFinder::new(self.config.ranking.threshold);
        let matches = finder.find_by_keywords(&keywords, &structures);

        if matches.is_empty() {
            println!("No entry points matched {}", keywords.join(", "));
            return Ok(());
        }

        print!("{}", format_matches(&matches));
        Ok(())
    }

    /// Print the cross-service dependency graph of the given projects
    pub async fn graph(&self, projects: Vec<PathBuf>) -> Result<()> {
        let structures = self.scan_many(&projects).await?;
        let graph = ServiceGraphBuilder::new(self.markers.clone()).build(&structures);

        print!("{}", format_graph(&graph));
        Ok(())
    }

    /// Trace one method of `project` and emit its flow document.
    ///
    /// `services` are scanned only to resolve remote calls.
    pub async fn trace(
        &self,
        project: PathBuf,
        services: Vec<PathBuf>,
        class_name: &str,
        method_name: &str,
        max_depth: Option<usize>,
        output: Option<PathBuf>,
    ) -> Result<()> {
        let mut paths = vec![project];
        paths.extend(services);

        let structures = self.scan_many(&paths).await?;
        let structure = structures
            .first()
            .ok_or_else(|| anyhow!("No project to trace"))?;

        info!("🔗 Building service dependency graph...");
        let graph = ServiceGraphBuilder::new(self.markers.clone()).build(&structures);

        let entry_point = select_entry_point(structure, class_name, method_name);
        let max_depth = max_depth.unwrap_or(self.config.trace.max_depth);
        let tracer = CallChainTracer::new(max_depth, self.markers.clone());
        let chain = tracer.trace(&entry_point, structure, &graph);

        if chain.root.is_none() {
            warn!("⚠️ {}.{} was not found in {}", class_name, method_name, structure.project_name);
        }

        let document = self.write_flow_document(&chain)?;
        match output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, document)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("📝 Flow document written to {}", path.display());
            }
            None => print!("{}", document),
        }

        Ok(())
    }

    /// Markdown flow document: front-matter, sequence diagram, call tree.
    ///
    /// Front-matter strings are double-quoted; entry names such as
    /// `MQ Queue: order.created` carry `: ` and would not parse bare.
    pub fn write_flow_document(&self, chain: &CallChain) -> Result<String> {
        let entry = &chain.entry_point;
        let mut content = String::new();

        content.push_str(&format!(
            "---\n\
            chain_id: {}\n\
            entry: {}\n\
            entry_type: {}\n\
            generated_at: {}\n\
            nodes: {}\n\
            max_depth: {}\n\
            ---\n\n",
            quoted(&chain.chain_id)?,
            quoted(&entry.display_name())?,
            quoted(&entry.entry_type.to_string())?,
            quoted(&chrono::Utc::now().to_rfc3339())?,
            chain.nodes().len(),
            chain.max_depth()
        ));

        content.push_str(&format!("# {}\n\n", entry.display_name()));
        content.push_str(&format!("`{}.{}`\n\n", entry.class_name, entry.method_signature));
        if let Some(description) = &entry.description {
            content.push_str(&format!("{}\n\n", description));
        }

        content.push_str("## Sequence\n\n```mermaid\n");
        content.push_str(&self.renderer.render(chain));
        content.push_str("```\n\n");

        content.push_str("## Call Tree\n\n");
        match &chain.root {
            Some(root) => write_tree(root, &mut content),
            None => content.push_str("_Entry method not found; nothing was traced._\n"),
        }

        Ok(content)
    }

    /// Render the project overview as Markdown
    pub async fn overview(&self, path: PathBuf, output: Option<PathBuf>) -> Result<()> {
        info!("📖 Building overview of {}", path.display());

        let scanner = OverviewScanner::new(self.config.scan.source_root.clone());
        let markdown = scanner.scan(&path).render()?;

        match output {
            Some(output) => {
                std::fs::write(&output, markdown)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                info!("✅ Overview written to {}", output.display());
            }
            None => print!("{}", markdown),
        }

        Ok(())
    }

    /// Write a default configuration file, never replacing an existing one
    pub async fn init(&self, path: Option<PathBuf>) -> Result<()> {
        let target_dir = match path {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        info!("Initializing flowdoc in: {}", target_dir.display());

        let config_path = target_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            warn!("⚠️ {} already exists, leaving it untouched", config_path.display());
            return Ok(());
        }

        std::fs::create_dir_all(&target_dir)?;
        Config::default().save(&config_path)?;
        info!("✅ Wrote {}", config_path.display());

        Ok(())
    }
}

/// A JSON string literal, which is also a valid double-quoted YAML scalar
fn quoted(value: &str) -> crate::error::Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// The detected entry point for `class_name.method_name`, or an ad-hoc one
/// of type `Other` when the method is not a classified entry point
fn select_entry_point(structure: &ProjectStructure, class_name: &str, method_name: &str) -> EntryPoint {
    if let Some(ep) = structure
        .entry_points()
        .iter()
        .find(|ep| ep.class_name == class_name && ep.method_name == method_name)
    {
        debug!("Tracing detected entry point {}", ep.display_name());
        return ep.clone();
    }

    let method = structure
        .get_class(class_name)
        .and_then(|class| class.find_method(method_name));

    EntryPoint {
        entry_type: EntryType::Other,
        path: None,
        http_method: None,
        class_name: class_name.to_string(),
        method_name: method_name.to_string(),
        method_signature: method
            .map(|m| m.signature.clone())
            .unwrap_or_else(|| format!("{}()", method_name)),
        direct_calls: method.map(|m| m.called_methods.clone()).unwrap_or_default(),
        annotations: BTreeMap::new(),
        description: None,
    }
}

fn scan_summary(structure: &ProjectStructure) -> String {
    let stats = structure.statistics();
    let mut summary = String::new();

    let layout = if MavenModuleReader::is_multi_module_project(&structure.project_path) {
        "multi-module"
    } else {
        "single module"
    };
    summary.push_str(&format!("Project: {} ({})\n", structure.project_name, layout));
    summary.push_str(&format!("Path: {}\n\n", structure.project_path.display()));

    summary.push_str(&format!("Modules ({}):\n", stats.module_count));
    for module in &structure.modules {
        summary.push_str(&format!(
            "  {} - {} packages, {} classes",
            module.name, module.package_count, module.class_count
        ));
        if let Some(description) = &module.description {
            summary.push_str(&format!(" - {}", description));
        }
        summary.push('\n');
    }

    summary.push_str(&format!("\nClasses: {}\n", stats.class_count));
    summary.push_str(&format!("Entry points: {}\n", stats.entry_point_count));
    for (entry_type, count) in &stats.entry_type_count {
        summary.push_str(&format!("  {}: {}\n", entry_type, count));
    }

    let key_classes = structure.key_classes();
    if !key_classes.is_empty() {
        summary.push_str("\nKey classes:\n");
        for class in key_classes {
            summary.push_str(&format!("  {}\n", class.full_class_name));
        }
    }

    if !structure.entry_points().is_empty() {
        summary.push_str("\nEntry points:\n");
        for ep in structure.entry_points() {
            summary.push_str(&format!(
                "  {} -> {}.{}\n",
                ep.display_name(),
                ep.class_name,
                ep.method_name
            ));
        }
    }

    summary
}

fn format_matches(matches: &[EntryPointMatch]) -> String {
    let mut out = String::new();
    for m in matches {
        out.push_str(&format!(
            "{:>4}  [{}] {}  {}.{}\n",
            m.relevance_score,
            m.project_name,
            m.entry_point.display_name(),
            m.entry_point.class_name,
            m.entry_point.method_name
        ));
        for reason in &m.match_reasons {
            out.push_str(&format!("        - {}\n", reason));
        }
    }
    out
}

fn format_graph(graph: &ServiceDependencyGraph) -> String {
    let mut out = String::from("Services:\n");
    for service in graph.services() {
        out.push_str(&format!(
            "  {} (provides {}, requires {})\n",
            service.service_name,
            service.provided_interfaces.len(),
            service.required_interfaces.len()
        ));
        for interface_name in &service.provided_interfaces {
            out.push_str(&format!("    + {}\n", interface_name));
        }
    }

    out.push_str("\nDependencies:\n");
    if graph.dependencies().is_empty() {
        out.push_str("  (none)\n");
    }
    for dep in graph.dependencies() {
        out.push_str(&format!(
            "  {} -> {} [{}] {} via {}.{}\n",
            dep.source_service,
            dep.target_service.as_deref().unwrap_or("?"),
            dep.dependency_type,
            dep.interface_name,
            dep.source_class,
            dep.source_field
        ));
    }
    out
}

fn write_tree(node: &CallNode, out: &mut String) {
    out.push_str(&format!(
        "{}- [{}] {}: {}.{}\n",
        "  ".repeat(node.depth),
        node.call_type,
        node.service.as_deref().unwrap_or("Unknown"),
        node.class_name,
        node.method
    ));
    for child in &node.children {
        write_tree(child, out);
    }
}
