use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};

use crate::data::assemble::{assemble_direct, assemble_with_kernel, Variant};
use crate::data::descriptor::Descriptor;
use crate::data::filter::{self, Constraint};
use crate::data::grid::{self, EnergyGrid, WeightPolicy};
use crate::data::ground;
use crate::data::kernel::BroadeningKernel;
use crate::data::table::{read_table, write_table, AssembledTable};
use crate::data::validate::{validate, ValidationReport};
use crate::error::DosError;
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Energy grid
// ---------------------------------------------------------------------------

/// Write `energy_Ne<resolution>.dat`, generating the maximum-resolution grid
/// first if it does not exist yet.
pub fn generate_energy(settings: &Settings, resolution: usize) -> Result<PathBuf> {
    let max = settings.max_resolution;
    grid::stride(resolution, max)?;

    let grid = if resolution == max {
        EnergyGrid::uniform(max, settings.energy_range)
    } else {
        EnergyGrid::resolve(settings, max)?.downsample(resolution)?
    };
    let path = settings.energy_path(resolution);
    grid.save(&path)
        .with_context(|| format!("writing energy grid {}", path.display()))?;

    log::info!("GenEnergy({})", path.display());
    Ok(path)
}

// ---------------------------------------------------------------------------
// Dataset generation
// ---------------------------------------------------------------------------

/// Everything that selects one generated dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Directory name under the data root.
    pub dataset: String,
    /// Output grid resolution.
    pub resolution: usize,
    /// Base broadening.
    pub eta: f64,
    /// Constraint name (`n`, `m`, `gap`).
    pub constraint: String,
    /// Weighting masks, e.g. `"n"` or `"fl"`.
    pub masks: String,
    /// Seed for the random mask.
    pub seed: Option<u64>,
}

/// Outcome of [`generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateReport {
    pub path: PathBuf,
    pub variant: Variant,
    /// Rows before the constraint.
    pub assembled: usize,
    /// Rows written.
    pub kept: usize,
    pub dos_width: usize,
}

/// `data/<dataset>/dos_<masks>_Ne<N>_eta<eta>[_<constraint><threshold>].csv`
pub fn output_path(
    settings: &Settings,
    request: &GenerateRequest,
    constraint: &Constraint,
    policy: &WeightPolicy,
) -> PathBuf {
    settings.dataset_dir(&request.dataset).join(format!(
        "dos_{}_Ne{}_eta{:.2}{}.csv",
        policy.tag(),
        request.resolution,
        request.eta,
        constraint.suffix()
    ))
}

/// Assemble, filter and write one dataset.
///
/// `kernel` is only consulted for datasets of the kernel variant. Nothing is
/// written unless every stage succeeds.
pub fn generate(
    settings: &Settings,
    request: &GenerateRequest,
    kernel: Option<&dyn BroadeningKernel>,
) -> Result<GenerateReport> {
    let constraint = Constraint::parse(&request.constraint, settings)?;
    let policy = WeightPolicy::parse(&request.masks, request.seed)?;
    let stride = grid::stride(request.resolution, settings.max_resolution)?;

    let dir = settings.dataset_dir(&request.dataset);
    let descriptor = Descriptor::read(&dir)?;
    if descriptor.kpoints.is_empty() {
        bail!("descriptor in {} selects no k-points", dir.display());
    }
    let pattern = descriptor.require_pattern(&dir)?;

    let variant = Variant::for_dataset(&request.dataset);
    let grid_resolution = match variant {
        Variant::Kernel => request.resolution,
        Variant::DirectCurve => settings.max_resolution,
    };
    let grid = EnergyGrid::resolve(settings, grid_resolution)
        .with_context(|| format!("preparing energy grid Ne{grid_resolution}"))?;
    let weights = policy.weights(&grid, request.eta);

    let start = Instant::now();
    let table = match variant {
        Variant::Kernel => {
            descriptor.require_bands(&dir)?;
            let kernel = kernel.context("kernel-based dataset but no broadening kernel loaded")?;
            let grounds = ground::ground_states(pattern, &settings.exclude_tag)?;
            assemble_with_kernel(&grounds, &descriptor, &grid, &weights, settings, kernel)
                .with_context(|| format!("assembling {}", request.dataset))?
        }
        Variant::DirectCurve => {
            let files = ground::discover(pattern, &settings.exclude_tag)?;
            let table = assemble_direct(&files, &descriptor, &grid, settings, request.eta)
                .with_context(|| format!("assembling {}", request.dataset))?;
            if table.is_empty() {
                return Err(DosError::NoGroundStates(pattern.to_string()).into());
            }
            if stride > 1 {
                table.block_sum(stride)?
            } else {
                table
            }
        }
    };
    log::info!("DOS shape : ({}, {})", table.len(), table.dos_width());

    let assembled = table.len();
    let table = filter::apply(table, &constraint);
    log::info!("{} -> ({}){}", assembled, constraint.name(), table.len());

    let path = output_path(settings, request, &constraint, &policy);
    write_table(&table, &path).with_context(|| format!("writing {}", path.display()))?;
    log::info!(
        "GenDOS({}) : {:.3}s",
        path.display(),
        start.elapsed().as_secs_f64()
    );

    Ok(GenerateReport {
        path,
        variant,
        assembled,
        kept: table.len(),
        dos_width: table.dos_width(),
    })
}

// ---------------------------------------------------------------------------
// Reading back
// ---------------------------------------------------------------------------

/// Load a written table, taking its k-point labels from the descriptor of
/// the dataset directory that holds it.
pub fn load_table(table_path: &Path) -> Result<(Descriptor, AssembledTable)> {
    let dir = table_path
        .parent()
        .with_context(|| format!("{} has no dataset directory", table_path.display()))?;
    let descriptor = Descriptor::read(dir)?;
    let table = read_table(table_path, &descriptor.labels())
        .with_context(|| format!("reading {}", table_path.display()))?;
    log::info!(
        "loaded {} rows ({} k-points x {} points) from {}",
        table.len(),
        table.labels.len(),
        table.n_energy,
        table_path.display()
    );
    Ok((descriptor, table))
}

/// The energy grid matching a loaded table.
pub fn grid_for(settings: &Settings, table: &AssembledTable) -> Result<EnergyGrid> {
    let grid = EnergyGrid::resolve(settings, table.n_energy)
        .with_context(|| format!("preparing energy grid Ne{}", table.n_energy))?;
    if grid.len() != table.n_energy {
        bail!(
            "energy grid has {} points but the table has {} per k-point",
            grid.len(),
            table.n_energy
        );
    }
    Ok(grid)
}

/// Integrate every row of a written table and flag defective ones.
pub fn check(settings: &Settings, table_path: &Path) -> Result<ValidationReport> {
    let (_, table) = load_table(table_path)?;
    let grid = grid_for(settings, &table)?;
    Ok(validate(&table, &grid, settings.defect_tolerance))
}
