//! Configuration loading from evprop.toml.
//!
//! Every key is optional; command-line flags override whatever the file sets.
//!
//! ```toml
//! project_name = "nrf_desktop"
//!
//! [sources]
//! app_dir = "src"
//! framework_root = "../nrf"
//! framework_modules = ["leds.c", "buttons.c"]
//! definitions_suffix = "_def.h"
//!
//! [report]
//! fan_out_collapse_threshold = 7
//! index_module_count_threshold = 7
//! propagation_title = "Event propagation"
//! ```

use serde::Deserialize;
use std::{fs, path::Path};

use crate::error::{EvpropError, EvpropResult};

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "evprop.toml";

/// Main configuration structure for evprop.toml.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EvpropConfig {
    /// Prefix for every cross-reference label.
    pub project_name: Option<String>,
    /// Source discovery settings.
    pub sources: Option<SourcesConfig>,
    /// Document rendering settings.
    pub report: Option<ReportConfig>,
}

/// Where sources are gathered from.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    /// Application source directory, relative to the project root.
    pub app_dir: Option<String>,
    /// Root of the framework tree (the one holding `subsys/caf`).
    pub framework_root: Option<String>,
    /// Framework C files to include besides the event definitions.
    pub framework_modules: Option<Vec<String>>,
    /// Suffix identifying event definition headers.
    pub definitions_suffix: Option<String>,
}

/// How documents are rendered.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    pub fan_out_collapse_threshold: Option<usize>,
    pub index_module_count_threshold: Option<usize>,
    pub propagation_title: Option<String>,
}

/// Loads configuration from evprop.toml if it exists.
pub fn load_config(root: &Path) -> EvpropResult<Option<EvpropConfig>> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Loads configuration from an explicit path.
pub fn load_config_file(path: &Path) -> EvpropResult<EvpropConfig> {
    let content = fs::read_to_string(path).map_err(|e| EvpropError::io(path, e))?;
    toml::from_str(&content).map_err(|e| EvpropError::config(path, format!("Invalid {CONFIG_FILE}: {e}")))
}
