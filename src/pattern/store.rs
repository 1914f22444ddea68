//! Read-only pattern template store with an in-process cache.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;

use crate::error::GenerationError;

/// Summary statistics stored alongside a template curve.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatisticalFeatures {
    pub max_power: Option<f64>,
}

/// One reference power-draw curve.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatternTemplate {
    /// Power samples at the native timestep.
    pub power_sequence: Vec<f64>,
    /// Recorded duration of the activation in seconds.
    #[serde(default)]
    pub total_duration_seconds: Option<f64>,
    #[serde(default)]
    pub statistical_features: StatisticalFeatures,
}

impl PatternTemplate {
    /// Recorded peak power, falling back to the sequence maximum.
    pub fn max_power(&self) -> f64 {
        self.statistical_features.max_power.unwrap_or_else(|| {
            self.power_sequence
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max)
        })
    }

    /// Recorded duration in seconds, falling back to samples × `timestep_native`.
    pub fn duration_secs(&self, timestep_native: f64) -> f64 {
        self.total_duration_seconds
            .unwrap_or(self.power_sequence.len() as f64 * timestep_native)
    }
}

#[derive(Debug, Deserialize)]
struct PatternFile {
    time_warping_patterns: Vec<PatternTemplate>,
}

/// All templates found in one pattern directory.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLibrary {
    pub dir: PathBuf,
    pub templates: Vec<PatternTemplate>,
}

impl TemplateLibrary {
    /// Loads every `*.json` file in `dir`, in file-name order.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::TemplateNotFound` if the directory is missing,
    /// holds no JSON pattern files, a file cannot be parsed, or no usable
    /// template is found.
    pub fn load(dir: &Path) -> Result<Self, GenerationError> {
        let not_found = |reason: String| GenerationError::TemplateNotFound {
            path: dir.to_path_buf(),
            reason,
        };

        if !dir.is_dir() {
            return Err(not_found("directory does not exist".to_string()));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| not_found(format!("cannot list directory: {e}")))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(not_found("no *.json pattern files".to_string()));
        }

        let mut templates = Vec::new();
        for file in &files {
            let raw = fs::read_to_string(file)
                .map_err(|e| not_found(format!("cannot read {}: {e}", file.display())))?;
            let parsed: PatternFile = serde_json::from_str(&raw)
                .map_err(|e| not_found(format!("invalid pattern file {}: {e}", file.display())))?;
            templates.extend(
                parsed
                    .time_warping_patterns
                    .into_iter()
                    .filter(|t| !t.power_sequence.is_empty()),
            );
        }

        if templates.is_empty() {
            return Err(not_found("pattern files contain no templates".to_string()));
        }

        debug!(
            dir = %dir.display(),
            files = files.len(),
            templates = templates.len(),
            "pattern library loaded"
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            templates,
        })
    }

    /// Builds a library from in-memory templates.
    pub fn from_templates(dir: impl Into<PathBuf>, templates: Vec<PatternTemplate>) -> Self {
        Self {
            dir: dir.into(),
            templates,
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Pattern directories under one base path, cached after first load.
///
/// Libraries are immutable once loaded and shared via `Arc`, so one store can
/// serve many generator threads.
#[derive(Debug)]
pub struct PatternStore {
    base_dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<TemplateLibrary>>>,
}

impl PatternStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the library for `pattern_dir`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Propagates `GenerationError::TemplateNotFound` from [`TemplateLibrary::load`].
    /// Failures are not cached.
    pub fn library(&self, pattern_dir: &str) -> Result<Arc<TemplateLibrary>, GenerationError> {
        if let Some(lib) = self.cache.read().get(pattern_dir) {
            return Ok(Arc::clone(lib));
        }
        let lib = Arc::new(TemplateLibrary::load(&self.base_dir.join(pattern_dir))?);
        let mut cache = self.cache.write();
        Ok(Arc::clone(
            cache.entry(pattern_dir.to_string()).or_insert(lib),
        ))
    }

    /// Like [`PatternStore::library`], but when `pattern_dir` is missing also
    /// tries the appliance name, the lowercased directory and the directory
    /// with spaces replaced by underscores.
    ///
    /// # Errors
    ///
    /// Returns the error for `pattern_dir` itself when no candidate loads.
    pub fn library_for(
        &self,
        pattern_dir: &str,
        appliance: &str,
    ) -> Result<Arc<TemplateLibrary>, GenerationError> {
        let primary = match self.library(pattern_dir) {
            Ok(lib) => return Ok(lib),
            Err(e) => e,
        };
        let candidates = [
            appliance.to_string(),
            pattern_dir.to_lowercase(),
            pattern_dir.replace(' ', "_"),
        ];
        for candidate in candidates.iter().filter(|c| c.as_str() != pattern_dir) {
            if self.base_dir.join(candidate).is_dir() {
                if let Ok(lib) = self.library(candidate) {
                    debug!(pattern_dir, fallback = %candidate, "using fallback pattern directory");
                    return Ok(lib);
                }
            }
        }
        Err(primary)
    }
}
