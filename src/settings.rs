use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Settings – dataset-wide constants
// ---------------------------------------------------------------------------

/// Immutable dataset-wide configuration, passed explicitly to every stage.
///
/// Every field has a default, so a settings file only needs to name the
/// values it changes:
///
/// ```json
/// { "data_root": "/scratch/dos", "gap_tol": 0.05 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding grid files and one sub-directory per dataset.
    pub data_root: PathBuf,
    /// Maximum energy-grid resolution; every other resolution divides it.
    pub max_resolution: usize,
    /// Half-width of the symmetric energy window.
    pub energy_range: f64,
    /// Gaps at or below this are treated as metallic (single zero offset).
    pub gap_tol: f64,
    /// Number of Fermi offsets enumerated across a nontrivial gap.
    pub fermi_samples: usize,
    /// Threshold of the `m` constraint.
    pub moment_threshold: f64,
    /// Direct-curve files need a `UF` token strictly above this.
    pub strength_threshold: f64,
    /// Multiplier applied to precomputed DOS curves.
    pub curve_scale: f64,
    /// Integrated DOS below this marks a row as defective.
    pub defect_tolerance: f64,
    /// Result files whose path contains this tag did not converge.
    pub exclude_tag: String,
    /// Shared library providing the broadening kernel.
    pub kernel_library: PathBuf,
    /// Exported kernel symbol.
    pub kernel_symbol: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            max_resolution: 1024,
            energy_range: 8.0,
            gap_tol: 0.1,
            fermi_samples: 5,
            moment_threshold: 0.1,
            strength_threshold: 5.0,
            curve_scale: 6.0,
            defect_tolerance: 3.0,
            exclude_tag: "nost_F".to_string(),
            kernel_library: PathBuf::from("lib/b2d.so"),
            kernel_symbol: "Band2DOS".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing settings file {}", path.display()))
    }

    /// Directory of one dataset.
    pub fn dataset_dir(&self, dataset: &str) -> PathBuf {
        self.data_root.join(dataset)
    }

    /// Grid file for a given resolution.
    pub fn energy_path(&self, resolution: usize) -> PathBuf {
        self.data_root.join(format!("energy_Ne{resolution}.dat"))
    }
}
