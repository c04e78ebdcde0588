use std::path::{Path, PathBuf};

use dosgen::{
    pipeline, AssembledTable, Descriptor, EnergyGrid, Settings, TableRow, PARAMETER_SCHEMA,
};

use crate::color::KPointColors;

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// Curve of one k-point: `[dos, energy]` points.
pub struct Curve {
    pub label: String,
    pub points: Vec<[f64; 2]>,
}

/// The full viewer state, independent of rendering.
pub struct ViewerState {
    pub settings: Settings,

    /// Path of the loaded table.
    pub table_path: PathBuf,

    /// Descriptor of the dataset the table belongs to.
    pub descriptor: Descriptor,

    pub table: AssembledTable,

    /// Energy grid matching the table's resolution.
    pub grid: EnergyGrid,

    /// Row currently shown.
    pub row: usize,

    pub colors: KPointColors,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl ViewerState {
    pub fn new(
        settings: Settings,
        table_path: PathBuf,
        descriptor: Descriptor,
        table: AssembledTable,
        grid: EnergyGrid,
        row: usize,
    ) -> Self {
        let colors = KPointColors::new(&table.labels);
        Self {
            settings,
            table_path,
            descriptor,
            table,
            grid,
            row,
            colors,
            status_message: None,
        }
    }

    pub fn current(&self) -> Option<&TableRow> {
        self.table.rows.get(self.row)
    }

    /// Clamp and select a row.
    pub fn set_row(&mut self, row: usize) {
        self.row = row.min(self.table.len().saturating_sub(1));
    }

    /// DOS against energy, one curve per k-point of the current row.
    pub fn curves(&self) -> Vec<Curve> {
        let Some(row) = self.current() else {
            return Vec::new();
        };
        self.table
            .labels
            .iter()
            .enumerate()
            .map(|(k, label)| Curve {
                label: label.clone(),
                points: self
                    .table
                    .block(row, k)
                    .iter()
                    .zip(self.grid.values())
                    .map(|(&dos, &e)| [dos, e])
                    .collect(),
            })
            .collect()
    }

    /// Two-line parameter summary: identifiers, then physical values.
    pub fn title(&self) -> String {
        let Some(row) = self.current() else {
            return String::new();
        };
        let values: Vec<f64> = std::iter::once(row.index as f64)
            .chain(row.params.values())
            .collect();
        let fmt_pair = |i: usize, precision: usize| {
            format!("{} {:.*}", PARAMETER_SCHEMA[i], precision, values[i])
        };
        let head: Vec<String> = (0..5).map(|i| fmt_pair(i, 1)).collect();
        let tail: Vec<String> = (5..values.len()).map(|i| fmt_pair(i, 3)).collect();
        format!("{}\n{}", head.join(" "), tail.join(" "))
    }

    /// Replace the table with another one, keeping the current one on failure.
    pub fn open_table(&mut self, path: &Path) {
        let loaded = pipeline::load_table(path).and_then(|(descriptor, table)| {
            let grid = pipeline::grid_for(&self.settings, &table)?;
            Ok((descriptor, table, grid))
        });
        match loaded {
            Ok((descriptor, table, grid)) => {
                log::info!("Loaded {} rows from {}", table.len(), path.display());
                self.colors = KPointColors::new(&table.labels);
                self.descriptor = descriptor;
                self.table = table;
                self.grid = grid;
                self.table_path = path.to_path_buf();
                self.set_row(self.row);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load table: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
