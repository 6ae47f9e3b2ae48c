//! Parallel, deterministic source discovery.
//!
//! Produces the [`SourceCorpus`] the aggregator works on:
//! - the application corpus is every `.c`/`.h` file below the app directory
//! - the framework corpus is C sources from `<framework>/subsys/caf` (event
//!   definitions plus selected modules) and every header from
//!   `<framework>/include/caf`
//!
//! Files are keyed by base name. Directory walks prune `.git`, `build` and
//! `twister-out` early via `WalkDir::filter_entry`.

use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::aggregate::SourceCorpus;
use crate::error::{EvpropError, EvpropResult, IoResultExt};

/// Directories never descended into.
const EXCLUDED_DIRS: &[&str] = &[".git", "build", "twister-out"];

pub const C_EXTENSION: &str = "c";
pub const H_EXTENSION: &str = "h";

#[inline]
fn is_excluded_dir(entry: &walkdir::DirEntry, excludes: &HashSet<&str>) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excludes.contains(name))
}

/// Gathers files with one of the given extensions below `root`, sorted.
pub fn gather_source_files(root: &Path, extensions: &[&str]) -> EvpropResult<Vec<PathBuf>> {
    let excludes: HashSet<&str> = EXCLUDED_DIRS.iter().copied().collect();

    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e, &excludes))
        .par_bridge()
        .filter_map(|entry| match entry {
            Ok(e) => {
                let path = e.path();
                let wanted = e.file_type().is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| extensions.contains(&ext));
                wanted.then(|| Ok(path.to_path_buf()))
            }
            Err(e) => Some(Err(e)),
        })
        .collect::<Result<Vec<_>, walkdir::Error>>()
        .map_err(|e| {
            let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
            EvpropError::io(path, e.into())
        })?;

    files.sort();
    Ok(files)
}

/// Reads files into a base name → content map.
///
/// Content is decoded lossily as UTF-8. When two paths share a base name the
/// first one in sorted order is kept.
pub fn read_sources(paths: &[PathBuf]) -> EvpropResult<BTreeMap<String, String>> {
    let results: Vec<EvpropResult<(&PathBuf, String)>> = paths
        .par_iter()
        .map(|path| {
            let bytes = fs::read(path).with_path(path)?;
            Ok((path, String::from_utf8_lossy(&bytes).into_owned()))
        })
        .collect();

    let mut sources = BTreeMap::new();
    for result in results {
        let (path, text) = result?;
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if sources.contains_key(&name) {
            warn!(file = %path.display(), name = %name, "Duplicate file name, keeping the first one");
            continue;
        }
        sources.insert(name, text);
    }
    Ok(sources)
}

fn require_dir(dir: &Path) -> EvpropResult<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(EvpropError::invalid_argument(format!(
            "{} is not a directory",
            dir.display()
        )))
    }
}

/// Gathers the application corpus below `dir`.
pub fn gather_app_corpus(dir: &Path) -> EvpropResult<SourceCorpus> {
    require_dir(dir)?;
    let corpus = SourceCorpus {
        c_sources: read_sources(&gather_source_files(dir, &[C_EXTENSION])?)?,
        h_sources: read_sources(&gather_source_files(dir, &[H_EXTENSION])?)?,
    };
    debug!(dir = %dir.display(), files = corpus.len(), "Application corpus gathered");
    Ok(corpus)
}

/// Directory layout of the framework tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkLayout {
    pub root: PathBuf,
}

impl FrameworkLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<parent of ZEPHYR_BASE>/nrf`
    pub fn from_zephyr_base(zephyr_base: &Path) -> Option<Self> {
        zephyr_base.parent().map(|ncs| Self::new(ncs.join("nrf")))
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join("subsys").join("caf")
    }

    pub fn include_dir(&self) -> PathBuf {
        self.root.join("include").join("caf")
    }
}

/// Keeps event definitions and the selected modules.
///
/// Every selected module must exist among the framework sources.
pub fn select_framework_sources(
    all: BTreeMap<String, String>,
    modules: &[String],
) -> EvpropResult<BTreeMap<String, String>> {
    if let Some(missing) = modules.iter().find(|m| !all.contains_key(*m)) {
        return Err(EvpropError::invalid_argument(format!(
            "framework module {missing} not found"
        )));
    }

    Ok(all
        .into_iter()
        .filter(|(name, _)| name.contains("event") || modules.contains(name))
        .collect())
}

/// Gathers the framework corpus.
pub fn gather_framework_corpus(layout: &FrameworkLayout, modules: &[String]) -> EvpropResult<SourceCorpus> {
    let source_dir = layout.source_dir();
    let include_dir = layout.include_dir();
    require_dir(&source_dir)?;
    require_dir(&include_dir)?;

    let all_c = read_sources(&gather_source_files(&source_dir, &[C_EXTENSION])?)?;
    let corpus = SourceCorpus {
        c_sources: select_framework_sources(all_c, modules)?,
        h_sources: read_sources(&gather_source_files(&include_dir, &[H_EXTENSION])?)?,
    };
    debug!(root = %layout.root.display(), files = corpus.len(), "Framework corpus gathered");
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_dir(tag: &str) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("evprop_scan_{}_{}_{}", tag, std::process::id(), n));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(dir: &Path, rel: &str, text: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_gather_prunes_excluded_dirs() {
        let dir = temp_dir("prune");
        write(&dir, "a.c", "");
        write(&dir, "sub/b.h", "");
        write(&dir, "build/c.c", "");
        write(&dir, "notes.txt", "");

        let files = gather_source_files(&dir, &[C_EXTENSION, H_EXTENSION]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.c", "b.h"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_duplicate_base_name_keeps_first_sorted_path() {
        let dir = temp_dir("dup");
        write(&dir, "a/leds.c", "first");
        write(&dir, "b/leds.c", "second");

        let sources = read_sources(&gather_source_files(&dir, &[C_EXTENSION]).unwrap()).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources["leds.c"], "first");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_lossy_decoding() {
        let dir = temp_dir("lossy");
        fs::write(dir.join("x.c"), [b'a', 0xff, b'b']).unwrap();
        let sources = read_sources(&[dir.join("x.c")]).unwrap();
        assert_eq!(sources["x.c"], "a\u{fffd}b");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_select_framework_sources() {
        let all: BTreeMap<String, String> = ["leds.c", "button_event.c", "ble_adv.c"]
            .iter()
            .map(|n| (n.to_string(), String::new()))
            .collect();

        let selected = select_framework_sources(all.clone(), &["leds.c".to_string()]).unwrap();
        assert_eq!(selected.keys().collect::<Vec<_>>(), vec!["button_event.c", "leds.c"]);

        let err = select_framework_sources(all, &["missing.c".to_string()]).unwrap_err();
        assert!(matches!(err, EvpropError::InvalidArgument { .. }));
    }

    #[test]
    fn test_framework_layout() {
        let layout = FrameworkLayout::from_zephyr_base(Path::new("/ncs/zephyr")).unwrap();
        assert_eq!(layout.root, PathBuf::from("/ncs/nrf"));
        assert_eq!(layout.source_dir(), PathBuf::from("/ncs/nrf/subsys/caf"));
        assert_eq!(layout.include_dir(), PathBuf::from("/ncs/nrf/include/caf"));
    }

    #[test]
    fn test_missing_app_dir() {
        let dir = temp_dir("missing");
        let err = gather_app_corpus(&dir.join("src")).unwrap_err();
        assert!(matches!(err, EvpropError::InvalidArgument { .. }));
        let _ = fs::remove_dir_all(&dir);
    }
}
