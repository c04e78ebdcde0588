use std::path::{Path, PathBuf};

use super::descriptor::Descriptor;
use super::grid::EnergyGrid;
use super::ground::Candidate;
use super::kernel::{BroadeningKernel, KernelShape};
use super::params::{filename_fields, ParameterTuple};
use super::table::AssembledTable;
use crate::error::{DosError, Result};
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Variant selection
// ---------------------------------------------------------------------------

/// How DOS rows are obtained for a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Band files broadened by the external kernel.
    Kernel,
    /// Precomputed DOS curves read directly.
    DirectCurve,
}

impl Variant {
    /// Datasets whose directory name contains `hf` carry band files.
    pub fn for_dataset(dataset: &str) -> Self {
        if dataset.contains("hf") {
            Variant::Kernel
        } else {
            Variant::DirectCurve
        }
    }
}

// ---------------------------------------------------------------------------
// Kernel variant
// ---------------------------------------------------------------------------

/// Fermi offsets for a ground state: `samples` points evenly spanning
/// `[-gap/2, gap/2]` when the gap exceeds `gap_tol`, otherwise just zero.
pub fn fermi_offsets(gap: f64, gap_tol: f64, samples: usize) -> Vec<f64> {
    if gap <= gap_tol || samples <= 1 {
        return vec![0.0];
    }
    let step = gap / (samples - 1) as f64;
    (0..samples).map(|i| -gap / 2.0 + i as f64 * step).collect()
}

/// Band energies of the selected k-point rows, flattened `[kpoint][band]`.
///
/// The first line of a band file is its header; each following non-blank
/// line holds the `2 * n_bands` energies of one k-point.
pub fn read_band_rows(path: &Path, rows: &[usize], n_bands: usize) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).map_err(|e| DosError::io(path, e))?;
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, l)| !l.trim().is_empty())
        .collect();

    let width = 2 * n_bands;
    let mut bands = Vec::with_capacity(rows.len() * width);
    for &row in rows {
        let Some(&(line_no, line)) = lines.get(row) else {
            return Err(DosError::Shape {
                path: path.to_path_buf(),
                message: format!("k-point row {row} out of range ({} rows)", lines.len()),
            });
        };
        let values = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|_| DosError::parse(path, line_no + 1, format!("'{tok}' is not a number")))
            })
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != width {
            return Err(DosError::Shape {
                path: path.to_path_buf(),
                message: format!("row {row} has {} energies, expected {width}", values.len()),
            });
        }
        bands.extend(values);
    }
    Ok(bands)
}

/// Broaden every ground state (and each of its Fermi offsets) in one kernel call.
pub fn assemble_with_kernel(
    grounds: &[Candidate],
    descriptor: &Descriptor,
    grid: &EnergyGrid,
    weights: &[f64],
    settings: &Settings,
    kernel: &dyn BroadeningKernel,
) -> Result<AssembledTable> {
    let rows = descriptor.rows();
    let mut params: Vec<(&Path, ParameterTuple)> = Vec::new();
    let mut bands: Vec<f64> = Vec::new();

    for ground in grounds {
        let raw = read_band_rows(&ground.path, &rows, descriptor.n_bands)?;
        let offsets = fermi_offsets(ground.params.gap, settings.gap_tol, settings.fermi_samples);
        log::debug!("{}: {} offset(s)", ground.path.display(), offsets.len());

        for offset in offsets {
            bands.extend(raw.iter().map(|e| e + offset));
            params.push((ground.path.as_path(), ground.params));
        }
    }

    let mut table = AssembledTable::new(descriptor.labels(), grid.len());
    if params.is_empty() {
        return Ok(table);
    }

    let shape = KernelShape {
        n_kpoints: rows.len(),
        n_bands: descriptor.n_bands,
        n_energy: grid.len(),
        n_rows: params.len(),
    };
    let dos = kernel.broaden(shape, &bands, grid.values(), weights)?;
    if dos.len() != shape.dos_len() {
        return Err(DosError::Kernel(format!(
            "returned {} values, expected {}",
            dos.len(),
            shape.dos_len()
        )));
    }

    for ((origin, p), row) in params.into_iter().zip(dos.chunks(table.dos_width())) {
        table.push(p, row.to_vec(), origin)?;
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Direct-curve variant
// ---------------------------------------------------------------------------

/// Filename marker replaced by each k-point label.
const KPOINT_MARKER: &str = "_kG_";

/// Whether a curve file belongs to this run: strength token `UF` above the
/// threshold and broadening tag `ep<eta>` present in the name.
pub fn qualifies(path: &Path, settings: &Settings, eta: f64) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let strong = filename_fields(path)
        .get("UF")
        .is_some_and(|&uf| uf > settings.strength_threshold);
    strong && name.contains(&format!("ep{eta:.2}"))
}

/// Sibling curve file of `path` for k-point `label`.
pub fn curve_path(path: &Path, label: &str) -> Result<PathBuf> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if !name.contains(KPOINT_MARKER) {
        return Err(DosError::Shape {
            path: path.to_path_buf(),
            message: format!("file name lacks the '{KPOINT_MARKER}' marker"),
        });
    }
    Ok(path.with_file_name(name.replacen(KPOINT_MARKER, &format!("_k{label}_"), 1)))
}

/// Second column of a two-column curve file, `#` lines skipped.
pub fn read_curve(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).map_err(|e| DosError::io(path, e))?;
    let mut values = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tok = line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| DosError::parse(path, line_no + 1, "expected two columns"))?;
        let value = tok
            .parse::<f64>()
            .map_err(|_| DosError::parse(path, line_no + 1, format!("'{tok}' is not a number")))?;
        values.push(value);
    }
    Ok(values)
}

/// Local maxima of a curve: indices where it stops rising.
pub fn peaks(curve: &[f64]) -> Vec<usize> {
    let rising: Vec<bool> = curve.windows(2).map(|w| w[1] - w[0] > 0.0).collect();
    rising
        .windows(2)
        .enumerate()
        .filter(|(_, r)| r[0] && !r[1])
        .map(|(j, _)| j + 1)
        .collect()
}

/// Energy span between the nearest peaks below and above `fermi_index`.
pub fn curve_gap(curve: &[f64], grid: &EnergyGrid, fermi_index: usize) -> Option<f64> {
    let found = peaks(curve);
    let above = found.iter().copied().filter(|&i| i > fermi_index).min()?;
    let below = found.iter().copied().filter(|&i| i < fermi_index).max()?;
    let e = grid.values();
    Some(e[above] - e[below])
}

/// Read precomputed curves for every qualifying file of the dataset.
///
/// `grid` is the maximum-resolution grid; down-sampling happens afterwards
/// by block-summing.
pub fn assemble_direct(
    files: &[PathBuf],
    descriptor: &Descriptor,
    grid: &EnergyGrid,
    settings: &Settings,
    eta: f64,
) -> Result<AssembledTable> {
    let labels = descriptor.labels();
    let fermi_index = grid.fermi_index().ok_or_else(|| DosError::Shape {
        path: settings.energy_path(grid.len()),
        message: "grid has no positive energies".to_string(),
    })?;

    let mut table = AssembledTable::new(labels.clone(), grid.len());
    for path in files.iter().filter(|p| qualifies(p, settings, eta)) {
        let mut dos = Vec::with_capacity(table.dos_width());
        let mut gap = f64::INFINITY;

        for label in &labels {
            let curve_file = curve_path(path, label)?;
            let curve: Vec<f64> = read_curve(&curve_file)?
                .into_iter()
                .map(|v| v * settings.curve_scale)
                .collect();
            if curve.len() != grid.len() {
                return Err(DosError::Shape {
                    path: curve_file,
                    message: format!("{} points, grid has {}", curve.len(), grid.len()),
                });
            }
            let span = curve_gap(&curve, grid, fermi_index).ok_or_else(|| DosError::NoGapFound {
                path: curve_file.clone(),
                label: label.clone(),
            })?;
            gap = gap.min(span);
            dos.extend(curve);
        }

        let mut params = ParameterTuple::from_curve_file(path)?;
        params.gap = gap;
        table.push(params, dos, path)?;
    }
    Ok(table)
}
