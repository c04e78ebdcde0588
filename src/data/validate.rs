use std::fmt;

use super::grid::EnergyGrid;
use super::params::ParameterTuple;
use super::table::AssembledTable;

// ---------------------------------------------------------------------------
// Integrated DOS checks
// ---------------------------------------------------------------------------

/// A row whose integrated DOS fell below tolerance at one or more k-points.
#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedRow {
    pub index: usize,
    pub params: ParameterTuple,
    pub integrals: Vec<f64>,
}

/// Integrated DOS of every row plus the rows that look defective.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub labels: Vec<String>,
    pub tolerance: f64,
    /// `[row][kpoint]`
    pub integrals: Vec<Vec<f64>>,
    pub flagged: Vec<FlaggedRow>,
}

/// Integrate each k-point block as `Σ dos × ΔE` and flag rows with any
/// integral below `tolerance`. The table is left untouched.
pub fn validate(table: &AssembledTable, grid: &EnergyGrid, tolerance: f64) -> ValidationReport {
    let de = grid.spacing();

    let integrals: Vec<Vec<f64>> = table
        .rows
        .iter()
        .map(|row| {
            (0..table.labels.len())
                .map(|k| table.block(row, k).iter().map(|v| v * de).sum())
                .collect()
        })
        .collect();

    let flagged = table
        .rows
        .iter()
        .zip(&integrals)
        .filter(|(_, sums)| sums.iter().any(|&s| s < tolerance))
        .map(|(row, sums)| FlaggedRow {
            index: row.index,
            params: row.params,
            integrals: sums.clone(),
        })
        .collect();

    ValidationReport {
        labels: table.labels.clone(),
        tolerance,
        integrals,
        flagged,
    }
}

impl ValidationReport {
    /// All integrals, one line per row.
    pub fn integrals_table(&self) -> String {
        let mut out = format!("{:>6}", "row");
        for label in &self.labels {
            out.push_str(&format!(" {label:>12}"));
        }
        out.push('\n');
        for (i, sums) in self.integrals.iter().enumerate() {
            out.push_str(&format!("{i:>6}"));
            for s in sums {
                out.push_str(&format!(" {s:>12.6}"));
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "DOS sum shape : ({}, {})",
            self.integrals.len(),
            self.labels.len()
        )?;
        writeln!(f, "Defective DOS list (tol = {:.3}):", self.tolerance)?;
        if self.flagged.is_empty() {
            return writeln!(f, "  none");
        }

        write!(f, "{:>6} {:>5} {:>8} {:>8} {:>8} {:>8} {:>10} {:>8}", "idx", "type", "JU", "N", "U", "m", "e", "gap")?;
        for label in &self.labels {
            write!(f, " {label:>10}")?;
        }
        writeln!(f)?;

        for row in &self.flagged {
            let p = &row.params;
            write!(
                f,
                "{:>6} {:>5} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>10.4} {:>8.3}",
                row.index, p.kind.0, p.coupling, p.filling, p.interaction, p.moment, p.energy, p.gap
            )?;
            for s in &row.integrals {
                write!(f, " {s:>10.4}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
