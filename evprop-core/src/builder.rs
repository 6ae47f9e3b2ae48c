//! Builder pattern API for evprop analysis.
//!
//! Provides a fluent interface for discovering sources and building the
//! corpus model:
//!
//! ```rust,ignore
//! use evprop_core::prelude::*;
//!
//! let result = Evprop::new("/path/to/app")
//!     .framework_root("/path/to/ncs/nrf")
//!     .framework_modules(["buttons.c", "leds.c"])
//!     .analyze()?;
//!
//! let graph = EventGraph::build(&result.model);
//! println!("Listeners: {:?}", graph.all_listeners());
//! ```

use std::path::PathBuf;
use tracing::info;

use crate::aggregate::{build_model, SourceCorpus};
use crate::config::EvpropConfig;
use crate::error::{EvpropError, EvpropResult};
use crate::extract::{ExtractOptions, DEFAULT_DEFINITIONS_SUFFIX};
use crate::model::CorpusModel;
use crate::scan::{gather_app_corpus, gather_framework_corpus, FrameworkLayout};

/// Default application source directory, relative to the root.
pub const DEFAULT_APP_DIR: &str = "src";

/// Builder for configuring an analysis run.
#[derive(Debug, Clone)]
pub struct Evprop {
    /// Root of the application
    root: PathBuf,

    /// Label prefix; defaults to the root directory name
    project_name: Option<String>,

    /// Application sources, relative to `root`
    app_dir: String,

    /// Framework tree; no framework corpus when unset
    framework_root: Option<PathBuf>,

    /// Framework C files to include besides event definitions
    framework_modules: Vec<String>,

    definitions_suffix: String,
}

impl Evprop {
    /// Create a new analysis builder for the given application root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            project_name: None,
            app_dir: DEFAULT_APP_DIR.to_string(),
            framework_root: None,
            framework_modules: Vec::new(),
            definitions_suffix: DEFAULT_DEFINITIONS_SUFFIX.to_string(),
        }
    }

    /// Create a builder seeded from an `evprop.toml` configuration.
    ///
    /// Relative framework paths are resolved against `root`.
    pub fn from_config(root: impl Into<PathBuf>, config: &EvpropConfig) -> Self {
        let root = root.into();
        let mut builder = Self::new(root.clone());
        if let Some(name) = &config.project_name {
            builder = builder.project_name(name.clone());
        }
        if let Some(sources) = &config.sources {
            if let Some(dir) = &sources.app_dir {
                builder = builder.app_dir(dir.clone());
            }
            if let Some(framework) = &sources.framework_root {
                builder = builder.framework_root(root.join(framework));
            }
            if let Some(modules) = &sources.framework_modules {
                builder = builder.framework_modules(modules.iter().cloned());
            }
            if let Some(suffix) = &sources.definitions_suffix {
                builder = builder.definitions_suffix(suffix.clone());
            }
        }
        builder
    }

    /// Set the project name used as label prefix.
    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Set the application source directory, relative to the root.
    pub fn app_dir(mut self, dir: impl Into<String>) -> Self {
        self.app_dir = dir.into();
        self
    }

    /// Set the framework tree root.
    pub fn framework_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.framework_root = Some(root.into());
        self
    }

    /// Drop the framework corpus.
    pub fn no_framework(mut self) -> Self {
        self.framework_root = None;
        self.framework_modules.clear();
        self
    }

    /// Set the framework modules to include, replacing earlier ones.
    pub fn framework_modules(mut self, modules: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.framework_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    /// Set the suffix identifying event definition headers.
    pub fn definitions_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.definitions_suffix = suffix.into();
        self
    }

    pub fn has_framework(&self) -> bool {
        self.framework_root.is_some()
    }

    /// Project name: explicit, or the root directory name.
    pub fn resolved_project_name(&self) -> String {
        if let Some(name) = &self.project_name {
            return name.clone();
        }
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    }

    fn framework_corpus(&self) -> EvpropResult<SourceCorpus> {
        match &self.framework_root {
            Some(root) => gather_framework_corpus(&FrameworkLayout::new(root), &self.framework_modules),
            None if !self.framework_modules.is_empty() => Err(EvpropError::invalid_argument(
                "framework modules were selected but no framework root is set",
            )),
            None => Ok(SourceCorpus::new()),
        }
    }

    /// Gather both corpora and build the model.
    pub fn analyze(&self) -> EvpropResult<AnalysisResult> {
        // 1. Gather sources
        let app = gather_app_corpus(&self.root.join(&self.app_dir))?;
        let mut corpus = self.framework_corpus()?;
        let (app_files, framework_files) = (app.len(), corpus.len());

        // 2. Application files win on name clashes
        corpus.overlay(app);

        // 3. Extract and aggregate
        let options = ExtractOptions {
            definitions_suffix: self.definitions_suffix.clone(),
        };
        let model = build_model(&self.resolved_project_name(), &corpus, &options)?;

        info!(
            root = %self.root.display(),
            app_files,
            framework_files,
            listeners = model.listeners.len(),
            "Analysis finished"
        );

        Ok(AnalysisResult {
            root: self.root.clone(),
            model,
            app_files,
            framework_files,
        })
    }
}

/// Result of an analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Root path that was analyzed
    pub root: PathBuf,

    pub model: CorpusModel,

    /// Files in the application corpus
    pub app_files: usize,

    /// Files in the framework corpus, before overlay
    pub framework_files: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EvpropConfig, SourcesConfig};

    #[test]
    fn test_builder_defaults() {
        let builder = Evprop::new("/tmp/app");
        assert_eq!(builder.app_dir, "src");
        assert!(!builder.has_framework());
        assert_eq!(builder.definitions_suffix, "_def.h");
    }

    #[test]
    fn test_from_config() {
        let config = EvpropConfig {
            project_name: Some("desk".into()),
            sources: Some(SourcesConfig {
                app_dir: Some("app_src".into()),
                framework_root: Some("../nrf".into()),
                framework_modules: Some(vec!["leds.c".into()]),
                definitions_suffix: None,
            }),
            report: None,
        };
        let builder = Evprop::from_config("/work/app", &config);
        assert_eq!(builder.resolved_project_name(), "desk");
        assert_eq!(builder.app_dir, "app_src");
        assert_eq!(builder.framework_root, Some(PathBuf::from("/work/app/../nrf")));
        assert_eq!(builder.framework_modules, vec!["leds.c".to_string()]);
    }

    #[test]
    fn test_no_framework_clears_selection() {
        let builder = Evprop::new("/tmp/app")
            .framework_root("/nrf")
            .framework_modules(["leds.c"])
            .no_framework();
        assert!(!builder.has_framework());
        assert!(builder.framework_modules.is_empty());
    }

    #[test]
    fn test_framework_modules_replace() {
        let builder = Evprop::new("/tmp/app")
            .framework_modules(["leds.c"])
            .framework_modules(["buttons.c"]);
        assert_eq!(builder.framework_modules, vec!["buttons.c".to_string()]);
    }

    #[test]
    fn test_modules_without_framework_root_fail() {
        let builder = Evprop::new("/tmp/app").framework_modules(["leds.c"]);
        let err = builder.framework_corpus().unwrap_err();
        assert!(matches!(err, EvpropError::InvalidArgument { .. }));
    }

    #[test]
    fn test_project_name_from_root() {
        let builder = Evprop::new("/definitely/not/here/nrf_desktop");
        assert_eq!(builder.resolved_project_name(), "nrf_desktop");
    }
}
