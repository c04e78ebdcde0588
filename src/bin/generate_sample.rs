//! Writes two small synthetic datasets under the data root: `hf_demo`
//! (band files for the kernel variant) and `dmft_demo` (precomputed curves).

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dosgen::{EnergyGrid, Settings};

#[derive(Parser)]
#[command(about = "Write synthetic datasets for trying the pipeline")]
struct Args {
    /// Root directory the datasets are created in.
    #[arg(long, default_value = "data")]
    data_root: PathBuf,

    /// Points of the precomputed curves; must match the maximum resolution.
    #[arg(long, default_value_t = 1024)]
    resolution: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const BANDS: usize = 4;
const BAND_ROWS: usize = 6;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn descriptor(pattern: &Path, kpoints: &[(&str, usize)]) -> String {
    let mut text = format!("path {}\nNb {BANDS}\nbegin kpoints\n", pattern.display());
    for (label, row) in kpoints {
        let _ = writeln!(text, "{label} {row}");
    }
    text.push_str("end kpoints\n");
    text
}

// ---------------------------------------------------------------------------
// Kernel-variant dataset
// ---------------------------------------------------------------------------

fn band_file(rng: &mut StdRng, gap: f64, energy: f64, moment: f64) -> String {
    let mut text = format!("# e {energy:.6} m {moment:.4} gap {gap:.4}\n");
    for _ in 0..BAND_ROWS {
        // two spin channels, each with bands split around the Fermi level
        let row: Vec<String> = (0..2 * BANDS)
            .map(|b| {
                let band = b % BANDS;
                let centre = if band < BANDS / 2 {
                    -gap / 2.0 - 1.5 * (BANDS / 2 - band) as f64
                } else {
                    gap / 2.0 + 1.5 * (band - BANDS / 2) as f64
                };
                format!("{:.6}", centre + rng.gen_range(-0.3..0.3))
            })
            .collect();
        text.push_str(&row.join(" "));
        text.push('\n');
    }
    text
}

fn write_kernel_dataset(root: &Path, rng: &mut StdRng) -> Result<usize> {
    let dir = root.join("hf_demo");
    let bands = dir.join("bands");
    write_file(
        &dir.join("config.txt"),
        &descriptor(&bands.join("*.txt"), &[("G", 0), ("X", 2), ("M", 4)]),
    )?;

    let mut written = 0;
    for kind in [11, 12, 21] {
        for coupling in [0.1, 0.2] {
            for filling in [1.0, 2.0] {
                for interaction in [1.0, 3.0] {
                    let gap = if interaction > 2.0 { rng.gen_range(0.2..1.0) } else { 0.0 };
                    let energy = -interaction * filling + rng.gen_range(-0.5..0.5);
                    let moment = rng.gen_range(0.0..0.5);
                    let mut name = format!(
                        "type{kind}_JU{coupling:.2}_N{filling:.2}_U{interaction:.2}"
                    );
                    if rng.gen_bool(0.1) {
                        name.push_str("_nost_F");
                    }
                    name.push_str("_band.txt");
                    write_file(&bands.join(name), &band_file(rng, gap, energy, moment))?;
                    written += 1;
                }
            }
        }
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Direct-curve dataset
// ---------------------------------------------------------------------------

fn curve_file(grid: &EnergyGrid, gap: f64, width: f64) -> String {
    let mut text = String::from("# energy dos\n");
    for &e in grid.values() {
        let dos = gaussian(e, -gap / 2.0 - 1.0, width, 0.5)
            + gaussian(e, gap / 2.0 + 1.0, width, 0.5);
        let _ = writeln!(text, "{e:.8} {dos:e}");
    }
    text
}

fn write_curve_dataset(root: &Path, grid: &EnergyGrid, rng: &mut StdRng) -> Result<usize> {
    let dir = root.join("dmft_demo");
    let curves = dir.join("curves");
    let labels = ["G", "X"];
    write_file(
        &dir.join("config.txt"),
        &descriptor(&curves.join("*_kG_*.dat"), &[("G", 0), ("X", 1)]),
    )?;

    let mut written = 0;
    for kind in [12, 22] {
        for interaction in [2.0, 4.0] {
            for strength in [4.0, 6.0, 8.0] {
                let gap = rng.gen_range(0.1..1.5);
                for label in labels {
                    let name = format!(
                        "type{kind}_JU0.10_N2.00_U{interaction:.2}_UF{strength:.2}_ep0.10_k{label}_dos.dat"
                    );
                    let width = rng.gen_range(0.3..0.6);
                    write_file(&curves.join(name), &curve_file(grid, gap, width))?;
                }
                written += 1;
            }
        }
    }
    Ok(written)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let settings = Settings {
        data_root: args.data_root.clone(),
        max_resolution: args.resolution,
        ..Settings::default()
    };
    let grid = EnergyGrid::uniform(args.resolution, settings.energy_range);
    grid.save(&settings.energy_path(args.resolution))?;

    let bands = write_kernel_dataset(&args.data_root, &mut rng)?;
    let curves = write_curve_dataset(&args.data_root, &grid, &mut rng)?;
    log::info!("wrote {bands} band files and {curves} curve sets");

    println!(
        "Wrote hf_demo and dmft_demo under {} (curves at Ne{}).",
        args.data_root.display(),
        args.resolution
    );
    Ok(())
}
