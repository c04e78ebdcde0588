use std::os::raw::c_int;
use std::path::{Path, PathBuf};

use crate::error::{DosError, Result};

// ---------------------------------------------------------------------------
// Kernel contract
// ---------------------------------------------------------------------------

/// Dimensions of one kernel call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelShape {
    pub n_kpoints: usize,
    /// Bands per spin channel; each k-point carries `2 * n_bands` energies.
    pub n_bands: usize,
    pub n_energy: usize,
    /// Number of band rows (one per ground state × Fermi offset).
    pub n_rows: usize,
}

impl KernelShape {
    /// Expected length of the flattened band array.
    pub fn band_len(&self) -> usize {
        self.n_rows * self.n_kpoints * 2 * self.n_bands
    }

    /// Length of the flattened DOS array the kernel fills.
    pub fn dos_len(&self) -> usize {
        self.n_rows * self.n_kpoints * self.n_energy
    }
}

/// Converts band energies into DOS values on an energy grid.
///
/// `bands` is row-major `[row][kpoint][band]`; the result is row-major
/// `[row][kpoint][energy]` with length [`KernelShape::dos_len`].
pub trait BroadeningKernel {
    fn broaden(
        &self,
        shape: KernelShape,
        bands: &[f64],
        energy: &[f64],
        weights: &[f64],
    ) -> Result<Vec<f64>>;
}

/// Check argument lengths against `shape` before handing them to a kernel.
pub fn check_inputs(shape: KernelShape, bands: &[f64], energy: &[f64], weights: &[f64]) -> Result<()> {
    if bands.len() != shape.band_len() {
        return Err(DosError::Kernel(format!(
            "band array has {} values, expected {}",
            bands.len(),
            shape.band_len()
        )));
    }
    if energy.len() != shape.n_energy || weights.len() != shape.n_energy {
        return Err(DosError::Kernel(format!(
            "grid/weights have {}/{} points, expected {}",
            energy.len(),
            weights.len(),
            shape.n_energy
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared-library kernel
// ---------------------------------------------------------------------------

/// `void Band2DOS(int Nk, int Nb, int Ne, int Nrows, double *band, double *energy, double *eta, double *dos)`
type Band2DosFn = unsafe extern "C" fn(
    c_int,
    c_int,
    c_int,
    c_int,
    *const f64,
    *const f64,
    *const f64,
    *mut f64,
);

/// The compiled kernel, loaded from a shared library.
pub struct SharedLibraryKernel {
    library: libloading::Library,
    symbol: String,
    path: PathBuf,
}

impl SharedLibraryKernel {
    pub fn open(path: &Path, symbol: &str) -> Result<Self> {
        // SAFETY: loading runs the library's initialisers; the kernel library
        // is a plain numerical routine without global constructors.
        let library = unsafe { libloading::Library::new(path) }
            .map_err(|e| DosError::Kernel(format!("loading {}: {e}", path.display())))?;

        let kernel = Self {
            library,
            symbol: symbol.to_string(),
            path: path.to_path_buf(),
        };
        // Missing symbols surface here, before any band file is read.
        kernel.function()?;
        log::info!("loaded broadening kernel {} from {}", symbol, path.display());
        Ok(kernel)
    }

    fn function(&self) -> Result<libloading::Symbol<'_, Band2DosFn>> {
        // SAFETY: the symbol's signature is fixed by the kernel contract.
        unsafe { self.library.get::<Band2DosFn>(self.symbol.as_bytes()) }.map_err(|e| {
            DosError::Kernel(format!(
                "symbol '{}' in {}: {e}",
                self.symbol,
                self.path.display()
            ))
        })
    }
}

fn to_c_int(value: usize, what: &str) -> Result<c_int> {
    c_int::try_from(value).map_err(|_| DosError::Kernel(format!("{what} {value} exceeds C int range")))
}

impl BroadeningKernel for SharedLibraryKernel {
    fn broaden(
        &self,
        shape: KernelShape,
        bands: &[f64],
        energy: &[f64],
        weights: &[f64],
    ) -> Result<Vec<f64>> {
        check_inputs(shape, bands, energy, weights)?;

        let n_kpoints = to_c_int(shape.n_kpoints, "k-point count")?;
        let n_bands = to_c_int(shape.n_bands, "band count")?;
        let n_energy = to_c_int(shape.n_energy, "grid resolution")?;
        let n_rows = to_c_int(shape.n_rows, "row count")?;

        let mut dos = vec![0.0; shape.dos_len()];
        let function = self.function()?;
        // SAFETY: every buffer has the length the contract requires for the
        // dimensions passed alongside it, checked above.
        unsafe {
            function(
                n_kpoints,
                n_bands,
                n_energy,
                n_rows,
                bands.as_ptr(),
                energy.as_ptr(),
                weights.as_ptr(),
                dos.as_mut_ptr(),
            );
        }

        if let Some(bad) = dos.iter().position(|v| !v.is_finite()) {
            return Err(DosError::Kernel(format!("non-finite DOS value at index {bad}")));
        }
        Ok(dos)
    }
}
