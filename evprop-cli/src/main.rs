//! evprop CLI - event propagation documentation generator.
//!
//! Features:
//! - Application and framework source discovery
//! - Optional `evprop.toml` configuration
//! - reStructuredText propagation tables and module index
//! - Plain, JSON and Graphviz DOT summaries

use anyhow::{Context, Result};
use clap::Parser;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use evprop_core::{
    generate_dot, init_structured_logging, load_config, load_config_file, print_model_json, print_plain,
    render_documents, render_listener_table, EventGraph, Evprop, EvpropConfig, FrameworkLayout, RenderedDocuments,
    ReportOptions, DEFAULT_FAN_OUT_COLLAPSE_THRESHOLD,
};

/// Output directory, relative to the project root.
const DEFAULT_OUT_DIR: &str = "doc";

/// Index threshold used unless configured otherwise.
const DEFAULT_INDEX_THRESHOLD: usize = 7;

#[derive(Parser, Debug)]
#[command(author, version, about = "Event propagation documentation generator")]
pub struct Cli {
    /// Path to the root of the application
    #[arg(default_value = ".")]
    path: String,

    /// Configuration file (default: <path>/evprop.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Application source directory, relative to the root
    #[arg(long)]
    app_dir: Option<String>,

    /// Framework tree (default: derived from ZEPHYR_BASE)
    #[arg(long, value_name = "DIR")]
    framework_root: Option<PathBuf>,

    /// Framework module to include besides event definitions (repeatable)
    #[arg(long = "framework-module", value_name = "FILE")]
    framework_modules: Vec<String>,

    /// Analyze application sources only
    #[arg(long)]
    no_framework: bool,

    /// Label prefix used in cross-references
    #[arg(long)]
    project_name: Option<String>,

    /// Directory the documents are written to (default: <path>/doc)
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Collapse producer/subscriber lists of at least this many modules
    #[arg(long)]
    collapse_threshold: Option<usize>,

    /// List an event in the index only when it has this many sources or sinks
    #[arg(long)]
    index_threshold: Option<usize>,

    /// List every event in the index
    #[arg(long, conflicts_with = "index_threshold")]
    no_index_threshold: bool,

    /// Print the model as JSON instead of the plain summary
    #[arg(long)]
    json: bool,

    /// Print the propagation table of a single listener
    #[arg(long, value_name = "NAME")]
    listener: Option<String>,

    /// Generate Graphviz DOT output for the event graph
    #[arg(long)]
    dot: bool,

    /// Write DOT output to a specified file instead of stdout
    #[arg(long)]
    dot_file: Option<PathBuf>,

    /// Emit log lines as JSON
    #[arg(long)]
    log_json: bool,
}

/// Loads the explicit config file, or `evprop.toml` below the root if present.
fn load_cli_config(root: &Path, explicit: Option<&Path>) -> Result<Option<EvpropConfig>> {
    match explicit {
        Some(path) => load_config_file(path)
            .map(Some)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => load_config(root).context("Failed to load project config"),
    }
}

/// Builder from config, then CLI flags, then the `ZEPHYR_BASE` fallback.
fn configure_builder(cli: &Cli, root: &Path, config: Option<&EvpropConfig>, zephyr_base: Option<OsString>) -> Evprop {
    let mut builder = match config {
        Some(config) => Evprop::from_config(root, config),
        None => Evprop::new(root),
    };

    if let Some(name) = &cli.project_name {
        builder = builder.project_name(name.clone());
    }
    if let Some(dir) = &cli.app_dir {
        builder = builder.app_dir(dir.clone());
    }
    if let Some(framework) = &cli.framework_root {
        builder = builder.framework_root(framework.clone());
    }
    if !cli.framework_modules.is_empty() {
        builder = builder.framework_modules(cli.framework_modules.iter().cloned());
    }

    if cli.no_framework {
        return builder.no_framework();
    }
    if !builder.has_framework() {
        match zephyr_base
            .as_deref()
            .map(Path::new)
            .and_then(FrameworkLayout::from_zephyr_base)
        {
            Some(layout) => builder = builder.framework_root(layout.root),
            None => warn!("ZEPHYR_BASE is not set, analyzing application sources only"),
        }
    }
    builder
}

/// Rendering options: CLI flags over config values over defaults.
fn report_options(cli: &Cli, config: Option<&EvpropConfig>) -> ReportOptions {
    let report = config.and_then(|c| c.report.as_ref());

    let fan_out_collapse_threshold = cli
        .collapse_threshold
        .or(report.and_then(|r| r.fan_out_collapse_threshold))
        .unwrap_or(DEFAULT_FAN_OUT_COLLAPSE_THRESHOLD);

    let index_module_count_threshold = if cli.no_index_threshold {
        None
    } else {
        cli.index_threshold
            .or(report.and_then(|r| r.index_module_count_threshold))
            .or(Some(DEFAULT_INDEX_THRESHOLD))
    };

    ReportOptions {
        project_name: None,
        fan_out_collapse_threshold,
        index_module_count_threshold,
        propagation_title: report.and_then(|r| r.propagation_title.clone()),
    }
}

/// Writes both documents into `out_dir`, creating it if needed.
fn write_documents(out_dir: &Path, docs: &RenderedDocuments) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(2);
    for (name, text) in docs.files() {
        let path = out_dir.join(name);
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] evprop internal error: {}", info);
        std::process::exit(2);
    }));

    let cli = Cli::parse();
    init_structured_logging(cli.log_json);

    // 1. Configuration
    let root = PathBuf::from(&cli.path);
    let config = load_cli_config(&root, cli.config.as_deref())?;

    // 2. Analysis
    let builder = configure_builder(&cli, &root, config.as_ref(), std::env::var_os("ZEPHYR_BASE"));
    let result = builder
        .analyze()
        .with_context(|| format!("Failed to analyze {}", root.display()))?;
    let graph = EventGraph::build(&result.model);
    let options = report_options(&cli, config.as_ref());

    // 3. Stdout report
    let mut lookup_failed = false;
    if let Some(name) = &cli.listener {
        match render_listener_table(&graph, name, &options) {
            Ok(table) => println!("{table}"),
            Err(e) => {
                error!(listener = %name, error = %e, "Listener lookup failed");
                lookup_failed = true;
            }
        }
    } else if cli.json {
        print_model_json(&graph);
    } else {
        print_plain(&graph);
    }

    // 4. Documents
    let docs = render_documents(&graph, &options).context("Failed to render documents")?;
    let out_dir = cli.out_dir.clone().unwrap_or_else(|| root.join(DEFAULT_OUT_DIR));
    for path in write_documents(&out_dir, &docs)? {
        info!(file = %path.display(), "Document written");
    }

    // 5. DOT/Graphviz output
    if cli.dot || cli.dot_file.is_some() {
        let dot = generate_dot(&graph);
        match &cli.dot_file {
            Some(file) => {
                fs::write(file, &dot).with_context(|| format!("Failed to write {}", file.display()))?;
            }
            None => println!("{}", dot),
        }
    }

    if lookup_failed {
        std::process::exit(1);
    }
    Ok(())
}
