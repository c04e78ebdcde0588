use std::fmt::Write as _;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{DosError, Result};
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Resolution helpers
// ---------------------------------------------------------------------------

/// Stride between a maximum-resolution grid and a coarser one.
pub fn stride(requested: usize, max: usize) -> Result<usize> {
    if requested == 0 || requested > max || max % requested != 0 {
        return Err(DosError::UnsupportedResolution { requested, max });
    }
    Ok(max / requested)
}

// ---------------------------------------------------------------------------
// EnergyGrid
// ---------------------------------------------------------------------------

/// Uniform, increasing energy axis.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyGrid {
    values: Vec<f64>,
}

impl EnergyGrid {
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// `n` points spanning `[-half_width, half_width]`, both ends included.
    pub fn uniform(n: usize, half_width: f64) -> Self {
        let values = match n {
            0 => Vec::new(),
            1 => vec![-half_width],
            _ => {
                let step = 2.0 * half_width / (n - 1) as f64;
                (0..n).map(|i| -half_width + i as f64 * step).collect()
            }
        };
        Self { values }
    }

    /// Every `max / requested`-th point of this grid.
    pub fn downsample(&self, requested: usize) -> Result<Self> {
        let k = stride(requested, self.len())?;
        Ok(Self {
            values: self.values.iter().step_by(k).copied().collect(),
        })
    }

    /// Load a grid written by [`EnergyGrid::save`]: one value per line.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| DosError::io(path, e))?;
        let values = text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| {
                l.trim()
                    .parse::<f64>()
                    .map_err(|_| DosError::parse(path, i + 1, format!("'{}' is not a number", l.trim())))
            })
            .collect::<Result<Vec<_>>>()?;
        let grid = Self { values };
        if grid.is_empty() {
            return Err(DosError::Shape {
                path: path.to_path_buf(),
                message: "grid file holds no energies".to_string(),
            });
        }
        Ok(grid)
    }

    /// Load a grid file that must hold exactly `resolution` points.
    fn load_sized(path: &Path, resolution: usize) -> Result<Self> {
        let grid = Self::load(path)?;
        if grid.len() != resolution {
            return Err(DosError::Shape {
                path: path.to_path_buf(),
                message: format!("{} points, expected {resolution}", grid.len()),
            });
        }
        Ok(grid)
    }

    /// Write with ten decimals, one value per line.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = String::with_capacity(self.values.len() * 16);
        for v in &self.values {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{v:.10}");
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DosError::io(parent, e))?;
        }
        std::fs::write(path, out).map_err(|e| DosError::io(path, e))
    }

    /// The grid at `resolution`, from its file when present.
    ///
    /// A missing file is created: the maximum-resolution grid is generated
    /// (and saved) first, then strided down.
    pub fn resolve(settings: &Settings, resolution: usize) -> Result<Self> {
        let max = settings.max_resolution;
        stride(resolution, max)?;

        let path = settings.energy_path(resolution);
        if path.is_file() {
            return Self::load_sized(&path, resolution);
        }

        let max_path = settings.energy_path(max);
        let full = if max_path.is_file() {
            Self::load_sized(&max_path, max)?
        } else {
            let full = Self::uniform(max, settings.energy_range);
            full.save(&max_path)?;
            log::info!("generated {}", max_path.display());
            full
        };
        if resolution == max {
            return Ok(full);
        }

        let grid = full.downsample(resolution)?;
        grid.save(&path)?;
        log::info!("generated {}", path.display());
        Ok(grid)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Spacing between neighbouring points (0 for fewer than two).
    pub fn spacing(&self) -> f64 {
        match self.values.as_slice() {
            [a, b, ..] => b - a,
            _ => 0.0,
        }
    }

    /// Largest |E| on the grid.
    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0, |m, e| m.max(e.abs()))
    }

    /// First index with strictly positive energy.
    pub fn fermi_index(&self) -> Option<usize> {
        self.values.iter().position(|&e| e > 0.0)
    }
}

// ---------------------------------------------------------------------------
// Weighting masks
// ---------------------------------------------------------------------------

/// Shaping mask applied to the broadening scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightMask {
    /// All ones.
    Uniform,
    /// 1 at or below zero energy, 0 above.
    Occupied,
    /// |E| / max|E|.
    Linear,
    /// Independent uniform draws in [0, 1).
    Random,
}

impl WeightMask {
    pub fn from_char(c: char) -> Result<Self> {
        match c {
            'n' => Ok(WeightMask::Uniform),
            'f' => Ok(WeightMask::Occupied),
            'l' => Ok(WeightMask::Linear),
            'r' => Ok(WeightMask::Random),
            other => Err(DosError::UnknownMask(other)),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            WeightMask::Uniform => 'n',
            WeightMask::Occupied => 'f',
            WeightMask::Linear => 'l',
            WeightMask::Random => 'r',
        }
    }

    fn values(self, grid: &EnergyGrid, rng: &mut StdRng) -> Vec<f64> {
        let e_max = grid.max_abs();
        grid.values()
            .iter()
            .map(|&e| match self {
                WeightMask::Uniform => 1.0,
                WeightMask::Occupied => {
                    if e > 0.0 {
                        0.0
                    } else {
                        1.0
                    }
                }
                WeightMask::Linear => {
                    if e_max > 0.0 {
                        (e / e_max).abs()
                    } else {
                        0.0
                    }
                }
                WeightMask::Random => rng.gen::<f64>(),
            })
            .collect()
    }
}

/// Set of masks plus an optional seed for the random one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeightPolicy {
    pub masks: Vec<WeightMask>,
    pub seed: Option<u64>,
}

impl WeightPolicy {
    /// Parse a mask string such as `"fl"`.
    pub fn parse(spec: &str, seed: Option<u64>) -> Result<Self> {
        let masks = spec
            .chars()
            .map(WeightMask::from_char)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { masks, seed })
    }

    /// Mask string used in output file names.
    pub fn tag(&self) -> String {
        self.masks.iter().map(|m| m.as_char()).collect()
    }

    /// Base broadening times the product of all masks, one value per grid point.
    pub fn weights(&self, grid: &EnergyGrid, eta: f64) -> Vec<f64> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut weights = vec![eta; grid.len()];
        for mask in &self.masks {
            for (w, m) in weights.iter_mut().zip(mask.values(grid, &mut rng)) {
                *w *= m;
            }
        }
        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_grid_is_symmetric() {
        let grid = EnergyGrid::uniform(5, 2.0);
        assert_eq!(grid.values(), &[-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert_eq!(grid.spacing(), 1.0);
        assert_eq!(grid.fermi_index(), Some(3));
        assert_eq!(grid.max_abs(), 2.0);
    }

    #[test]
    fn downsample_picks_stride_points() {
        let full = EnergyGrid::uniform(100, 8.0);
        let coarse = full.downsample(25).unwrap();
        assert_eq!(coarse.len(), 25);
        for (j, v) in coarse.values().iter().enumerate() {
            assert_eq!(*v, full.values()[4 * j]);
        }
        assert_eq!(coarse.values()[24], full.values()[96]);
    }

    #[test]
    fn non_divisor_resolution_is_rejected() {
        let full = EnergyGrid::uniform(100, 8.0);
        for bad in [0, 30, 101, 200] {
            assert!(matches!(
                full.downsample(bad),
                Err(DosError::UnsupportedResolution { .. })
            ));
        }
        assert_eq!(full.downsample(100).unwrap(), full);
    }

    #[test]
    fn save_load_keeps_ten_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("energy_Ne7.dat");
        let grid = EnergyGrid::uniform(7, 1.0);
        grid.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("-1.0000000000"));

        let loaded = EnergyGrid::load(&path).unwrap();
        for (a, b) in grid.values().iter().zip(loaded.values()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn resolve_generates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_root: dir.path().to_path_buf(),
            max_resolution: 40,
            energy_range: 4.0,
            ..Settings::default()
        };

        let coarse = EnergyGrid::resolve(&settings, 10).unwrap();
        assert_eq!(coarse.len(), 10);
        assert!(settings.energy_path(40).is_file());
        assert!(settings.energy_path(10).is_file());

        let again = EnergyGrid::resolve(&settings, 10).unwrap();
        assert_eq!(again.len(), 10);
        assert!(matches!(
            EnergyGrid::resolve(&settings, 15),
            Err(DosError::UnsupportedResolution { requested: 15, max: 40 })
        ));
    }

    #[test]
    fn resolve_rejects_grid_file_of_wrong_length() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_root: dir.path().to_path_buf(),
            max_resolution: 64,
            ..Settings::default()
        };
        // stale file: 31 values under the Ne32 name
        EnergyGrid::uniform(31, 8.0)
            .save(&settings.energy_path(32))
            .unwrap();

        let err = EnergyGrid::resolve(&settings, 32).unwrap_err();
        assert!(matches!(
            err,
            DosError::Shape { ref path, ref message }
                if path.ends_with("energy_Ne32.dat") && message.contains("expected 32")
        ));

        // a truncated maximum-resolution grid cannot seed coarser ones
        EnergyGrid::uniform(60, 8.0)
            .save(&settings.energy_path(64))
            .unwrap();
        assert!(matches!(
            EnergyGrid::resolve(&settings, 16),
            Err(DosError::Shape { .. })
        ));
        assert!(!settings.energy_path(16).exists());
    }

    #[test]
    fn empty_grid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("energy_Ne8.dat");
        std::fs::write(&path, "\n\n").unwrap();
        assert!(matches!(EnergyGrid::load(&path), Err(DosError::Shape { .. })));
    }

    #[test]
    fn masks_multiply_into_weights() {
        let grid = EnergyGrid::uniform(5, 2.0);

        let none = WeightPolicy::parse("", None).unwrap();
        assert_eq!(none.weights(&grid, 0.5), vec![0.5; 5]);

        let occupied = WeightPolicy::parse("nf", None).unwrap();
        assert_eq!(occupied.weights(&grid, 0.5), vec![0.5, 0.5, 0.5, 0.0, 0.0]);

        let linear = WeightPolicy::parse("l", None).unwrap();
        assert_eq!(linear.weights(&grid, 2.0), vec![2.0, 1.0, 0.0, 1.0, 2.0]);
        assert_eq!(linear.tag(), "l");
    }

    #[test]
    fn random_mask_is_reproducible_with_seed() {
        let grid = EnergyGrid::uniform(50, 3.0);
        let policy = WeightPolicy::parse("r", Some(7)).unwrap();
        let a = policy.weights(&grid, 1.0);
        let b = policy.weights(&grid, 1.0);
        assert_eq!(a, b);
        assert!(a.iter().all(|w| (0.0..1.0).contains(w)));
    }

    #[test]
    fn unknown_mask_is_rejected() {
        assert!(matches!(WeightPolicy::parse("nx", None), Err(DosError::UnknownMask('x'))));
    }
}
