use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use flowdoc::core::Engine;

#[derive(Parser)]
#[command(name = "flowdoc")]
#[command(about = "Entry points, service dependencies and call-chain flows for Java codebases")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a project and summarize its structure
    Scan {
        /// Project root
        path: PathBuf,

        /// Print the full structure as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank entry points by keyword relevance
    Find {
        /// Keywords to search for
        #[arg(required = true)]
        keywords: Vec<String>,

        /// Project roots to search (repeatable)
        #[arg(short, long = "project", required = true)]
        projects: Vec<PathBuf>,
    },

    /// Show the service dependency graph across projects
    Graph {
        /// Project roots, one per service (repeatable)
        #[arg(short, long = "project", required = true)]
        projects: Vec<PathBuf>,
    },

    /// Trace the call chain of one method and write a flow document
    Trace {
        /// Project that owns the entry method
        #[arg(short, long)]
        project: PathBuf,

        /// Other service roots used to resolve remote calls (repeatable)
        #[arg(short, long = "service")]
        services: Vec<PathBuf>,

        /// Fully-qualified class name
        #[arg(long)]
        class: String,

        /// Method name
        #[arg(short, long)]
        method: String,

        /// Override the configured maximum depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a Markdown overview of a project
    Overview {
        /// Project root
        path: PathBuf,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default Flowdoc.toml
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Scan { path, json } => {
                engine.scan(path, json).await
            }
            Commands::Find { keywords, projects } => {
                engine.find(keywords, projects).await
            }
            Commands::Graph { projects } => {
                engine.graph(projects).await
            }
            Commands::Trace { project, services, class, method, max_depth, output } => {
                engine.trace(project, services, &class, &method, max_depth, output).await
            }
            Commands::Overview { path, output } => {
                engine.overview(path, output).await
            }
            Commands::Init { path } => {
                engine.init(path).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace_command() {
        let cli = Cli::try_parse_from([
            "flowdoc", "-v", "trace",
            "--project", "order",
            "--service", "stock",
            "--service", "billing",
            "--class", "com.shop.OrderController",
            "--method", "create",
            "--max-depth", "3",
        ]).unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Trace { project, services, class, method, max_depth, output } => {
                assert_eq!(project, PathBuf::from("order"));
                assert_eq!(services, vec![PathBuf::from("stock"), PathBuf::from("billing")]);
                assert_eq!(class, "com.shop.OrderController");
                assert_eq!(method, "create");
                assert_eq!(max_depth, Some(3));
                assert!(output.is_none());
            }
            _ => panic!("expected trace command"),
        }
    }

    #[test]
    fn test_find_requires_project() {
        assert!(Cli::try_parse_from(["flowdoc", "find", "order"]).is_err());

        let cli = Cli::try_parse_from(["flowdoc", "find", "order", "pay", "-p", "a", "-p", "b"]).unwrap();
        match cli.command {
            Commands::Find { keywords, projects } => {
                assert_eq!(keywords, vec!["order", "pay"]);
                assert_eq!(projects.len(), 2);
            }
            _ => panic!("expected find command"),
        }
    }
}
