mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use eframe::egui;

use app::DosViewerApp;
use dosgen::{pipeline, BroadeningKernel, GenerateRequest, Settings, SharedLibraryKernel, Variant};

#[derive(Parser)]
#[command(author, version, about = "Density-of-states dataset assembly")]
struct Cli {
    /// JSON settings file; unspecified keys keep their defaults.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Override the data root from the settings.
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Writes the energy grid at the given resolution.
    Energy { resolution: usize },

    /// Assembles, filters and writes a DOS dataset.
    Generate {
        /// Dataset directory under the data root.
        dataset: String,
        resolution: usize,
        eta: f64,

        /// Constraint: n, m or gap.
        #[arg(default_value = "n")]
        constraint: String,

        /// Weighting masks, any of n (uniform), f (occupied), l (linear), r (random).
        #[arg(default_value = "n")]
        masks: String,

        /// Seed for the random mask.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Flags rows whose integrated DOS is below tolerance.
    Check {
        table: PathBuf,

        /// Print every row's integrals as well.
        #[arg(long)]
        verbose: bool,
    },

    /// Opens a viewer on one row of a table.
    Show {
        table: PathBuf,

        #[arg(default_value_t = 10)]
        index: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(root) = cli.data_root {
        settings.data_root = root;
    }

    match cli.command {
        Commands::Energy { resolution } => {
            let path = pipeline::generate_energy(&settings, resolution)?;
            println!("Wrote {}", path.display());
        }
        Commands::Generate {
            dataset,
            resolution,
            eta,
            constraint,
            masks,
            seed,
        } => {
            let kernel = match Variant::for_dataset(&dataset) {
                Variant::Kernel => Some(SharedLibraryKernel::open(
                    &settings.kernel_library,
                    &settings.kernel_symbol,
                )?),
                Variant::DirectCurve => None,
            };
            let request = GenerateRequest {
                dataset,
                resolution,
                eta,
                constraint,
                masks,
                seed,
            };
            let report = pipeline::generate(
                &settings,
                &request,
                kernel.as_ref().map(|k| k as &dyn BroadeningKernel),
            )?;
            println!(
                "Wrote {} of {} rows ({} DOS columns) to {}",
                report.kept,
                report.assembled,
                report.dos_width,
                report.path.display()
            );
        }
        Commands::Check { table, verbose } => {
            let report = pipeline::check(&settings, &table)?;
            if verbose {
                print!("{}", report.integrals_table());
            }
            print!("{report}");
        }
        Commands::Show { table, index } => {
            let (descriptor, loaded) = pipeline::load_table(&table)?;
            let grid = pipeline::grid_for(&settings, &loaded)?;
            if index >= loaded.len() {
                anyhow::bail!("row {index} out of range ({} rows)", loaded.len());
            }

            let app = DosViewerApp::new(settings, table, descriptor, loaded, grid, index);
            let options = eframe::NativeOptions {
                viewport: egui::ViewportBuilder::default()
                    .with_inner_size([1200.0, 800.0])
                    .with_min_inner_size([600.0, 400.0]),
                ..Default::default()
            };
            eframe::run_native(
                "dosgen – DOS Viewer",
                options,
                Box::new(move |_cc| Ok(Box::new(app))),
            )
            .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))?;
        }
    }

    Ok(())
}
