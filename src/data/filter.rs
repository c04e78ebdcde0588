use super::table::AssembledTable;
use crate::error::{DosError, Result};
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Constraint: which rows of an assembled table are kept
// ---------------------------------------------------------------------------

/// Named physical constraint applied to the parameter block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// `n` – keep everything.
    None,
    /// `m` – moment above the threshold.
    MinMoment(f64),
    /// `gap` – gap above the threshold.
    MinGap(f64),
}

impl Constraint {
    /// Resolve a constraint name against the dataset settings.
    pub fn parse(name: &str, settings: &Settings) -> Result<Self> {
        match name {
            "n" => Ok(Constraint::None),
            "m" => Ok(Constraint::MinMoment(settings.moment_threshold)),
            "gap" => Ok(Constraint::MinGap(settings.gap_tol)),
            other => Err(DosError::UnknownConstraint(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Constraint::None => "n",
            Constraint::MinMoment(_) => "m",
            Constraint::MinGap(_) => "gap",
        }
    }

    /// `(column, threshold)`, or `None` when nothing is filtered.
    pub fn threshold(&self) -> Option<(&'static str, f64)> {
        match *self {
            Constraint::None => None,
            Constraint::MinMoment(t) => Some(("m", t)),
            Constraint::MinGap(t) => Some(("gap", t)),
        }
    }

    /// File-name suffix such as `_gap0.10`; empty without a positive threshold.
    pub fn suffix(&self) -> String {
        match self.threshold() {
            Some((_, t)) if t > 0.0 => format!("_{}{t:.2}", self.name()),
            _ => String::new(),
        }
    }
}

/// Return indices of rows that pass the constraint.
///
/// A row passes when its constrained column is strictly above the threshold.
pub fn filtered_indices(table: &AssembledTable, constraint: &Constraint) -> Vec<usize> {
    let Some((column, threshold)) = constraint.threshold() else {
        return (0..table.len()).collect();
    };
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.params.get(column).is_some_and(|v| v > threshold))
        .map(|(i, _)| i)
        .collect()
}

/// Drop the rows that fail the constraint. Parameters and DOS move together.
pub fn apply(mut table: AssembledTable, constraint: &Constraint) -> AssembledTable {
    let keep = filtered_indices(&table, constraint);
    let mut keep = keep.into_iter().peekable();
    let mut position = 0;
    table.rows.retain(|_| {
        let kept = keep.peek() == Some(&position);
        if kept {
            keep.next();
        }
        position += 1;
        kept
    });
    table
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::data::params::{ConfigCode, ParameterTuple};

    fn table(rows: &[(f64, f64)]) -> AssembledTable {
        let mut t = AssembledTable::new(vec!["G".into()], 2);
        for &(moment, gap) in rows {
            let p = ParameterTuple {
                kind: ConfigCode(10),
                coupling: 0.0,
                filling: 1.0,
                interaction: 1.0,
                moment,
                energy: 0.0,
                gap,
            };
            t.push(p, vec![moment, gap], Path::new("t")).unwrap();
        }
        t
    }

    #[test]
    fn names_resolve_against_settings() {
        let settings = Settings::default();
        assert_eq!(Constraint::parse("n", &settings).unwrap(), Constraint::None);
        assert_eq!(Constraint::parse("m", &settings).unwrap(), Constraint::MinMoment(0.1));
        assert_eq!(Constraint::parse("gap", &settings).unwrap(), Constraint::MinGap(0.1));
        assert!(matches!(
            Constraint::parse("spin", &settings),
            Err(DosError::UnknownConstraint(name)) if name == "spin"
        ));
    }

    #[test]
    fn suffix_only_for_thresholds() {
        assert_eq!(Constraint::None.suffix(), "");
        assert_eq!(Constraint::MinGap(0.1).suffix(), "_gap0.10");
        assert_eq!(Constraint::MinMoment(0.1).suffix(), "_m0.10");
    }

    #[test]
    fn keeps_rows_strictly_above_threshold() {
        let t = table(&[(0.0, 0.5), (0.2, 0.1), (0.1, 0.0), (0.3, 0.3)]);
        let kept = apply(t, &Constraint::MinMoment(0.1));
        let moments: Vec<f64> = kept.rows.iter().map(|r| r.params.moment).collect();
        assert_eq!(moments, vec![0.2, 0.3]);
        assert_eq!(kept.rows[0].dos, vec![0.2, 0.1]);
        assert_eq!(kept.rows[1].index, 3);
    }

    #[test]
    fn none_keeps_everything() {
        let t = table(&[(0.0, 0.0), (0.0, 0.0)]);
        assert_eq!(apply(t.clone(), &Constraint::None), t);
    }
}
