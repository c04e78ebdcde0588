use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::params::{ParameterTuple, PARAMETER_SCHEMA};
use crate::error::{DosError, Result};

// ---------------------------------------------------------------------------
// TableRow – one line of the assembled dataset
// ---------------------------------------------------------------------------

/// Parameters and DOS of one accepted ground state (or Fermi-offset sample).
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Synthetic row index assigned during assembly; survives filtering.
    pub index: usize,
    pub params: ParameterTuple,
    /// `labels.len() * n_energy` values, one block per k-point.
    pub dos: Vec<f64>,
}

// ---------------------------------------------------------------------------
// AssembledTable – the complete dataset
// ---------------------------------------------------------------------------

/// Parameter block ‖ DOS block, one [`TableRow`] per line.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTable {
    /// K-point labels, in block order.
    pub labels: Vec<String>,
    /// Grid points per k-point block.
    pub n_energy: usize,
    pub rows: Vec<TableRow>,
}

impl AssembledTable {
    pub fn new(labels: Vec<String>, n_energy: usize) -> Self {
        Self {
            labels,
            n_energy,
            rows: Vec::new(),
        }
    }

    /// Values per DOS row.
    pub fn dos_width(&self) -> usize {
        self.labels.len() * self.n_energy
    }

    /// Append a row with the next synthetic index.
    pub fn push(&mut self, params: ParameterTuple, dos: Vec<f64>, origin: &Path) -> Result<()> {
        if dos.len() != self.dos_width() {
            return Err(DosError::Shape {
                path: origin.to_path_buf(),
                message: format!("DOS row has {} values, expected {}", dos.len(), self.dos_width()),
            });
        }
        let index = self.rows.len();
        self.rows.push(TableRow { index, params, dos });
        Ok(())
    }

    /// Column names: parameter schema, then `<label><grid-index>`.
    pub fn header(&self) -> Vec<String> {
        PARAMETER_SCHEMA
            .iter()
            .map(|s| s.to_string())
            .chain(dos_columns(&self.labels, self.n_energy))
            .collect()
    }

    /// One k-point block of one row.
    pub fn block<'a>(&self, row: &'a TableRow, kpoint: usize) -> &'a [f64] {
        let start = kpoint * self.n_energy;
        &row.dos[start..start + self.n_energy]
    }

    /// Sum each run of `stride` consecutive DOS columns.
    ///
    /// Runs never straddle two k-point blocks because `stride` must divide
    /// `n_energy`.
    pub fn block_sum(mut self, stride: usize) -> Result<Self> {
        if stride == 0 || self.n_energy % stride != 0 {
            return Err(DosError::UnsupportedResolution {
                requested: if stride == 0 { 0 } else { self.n_energy / stride },
                max: self.n_energy,
            });
        }
        for row in &mut self.rows {
            row.dos = row.dos.chunks(stride).map(|c| c.iter().sum()).collect();
        }
        self.n_energy /= stride;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `G0, G1, …, X0, X1, …`
pub fn dos_columns(labels: &[String], n_energy: usize) -> impl Iterator<Item = String> + '_ {
    labels
        .iter()
        .flat_map(move |label| (0..n_energy).map(move |i| format!("{label}{i}")))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Write the table as comma-separated text with a `# `-prefixed header.
///
/// The file is written to a temporary sibling first and renamed into place,
/// so `path` either holds the whole table or is left untouched.
pub fn write_table(table: &AssembledTable, path: &Path) -> Result<()> {
    let tmp = temp_sibling(path);
    write_to(table, &tmp).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp);
    })?;
    std::fs::rename(&tmp, path).map_err(|e| DosError::io(path, e))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_to(table: &AssembledTable, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| DosError::io(path, e))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "# {}", table.header().join(",")).map_err(|e| DosError::io(path, e))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    let csv_err = |source| DosError::Csv {
        path: path.to_path_buf(),
        source,
    };

    for row in &table.rows {
        let record = std::iter::once(row.index as f64)
            .chain(row.params.values())
            .chain(row.dos.iter().copied())
            .map(|v| format!("{v:.10}"));
        writer.write_record(record).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| DosError::io(path, e))
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Read a table written by [`write_table`], splitting the DOS block by `labels`.
pub fn read_table(path: &Path, labels: &[String]) -> Result<AssembledTable> {
    let shape_err = |message: String| DosError::Shape {
        path: path.to_path_buf(),
        message,
    };
    let csv_err = |source| DosError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let header: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('#').trim().to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let n_params = PARAMETER_SCHEMA.len();
    if header.len() < n_params || header[..n_params] != PARAMETER_SCHEMA {
        return Err(shape_err(format!(
            "header does not start with {}",
            PARAMETER_SCHEMA.join(",")
        )));
    }
    if labels.is_empty() {
        return Err(shape_err("no k-point labels to split the DOS block".to_string()));
    }
    let width = header.len() - n_params;
    if width % labels.len() != 0 {
        return Err(shape_err(format!(
            "{width} DOS columns do not split into {} k-points",
            labels.len()
        )));
    }
    let n_energy = width / labels.len();
    if let Some((got, want)) = header[n_params..]
        .iter()
        .zip(dos_columns(labels, n_energy))
        .find(|(got, want)| **got != *want)
    {
        return Err(shape_err(format!("column '{got}' where '{want}' was expected")));
    }

    let mut table = AssembledTable::new(labels.to_vec(), n_energy);
    for (row_no, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        // Header is line 1.
        let line = row_no + 2;
        if record.len() != header.len() {
            return Err(DosError::parse(
                path,
                line,
                format!("{} fields, expected {}", record.len(), header.len()),
            ));
        }
        let values = record
            .iter()
            .map(|field| {
                field
                    .parse::<f64>()
                    .map_err(|_| DosError::parse(path, line, format!("'{field}' is not a number")))
            })
            .collect::<Result<Vec<f64>>>()?;

        let mut params = [0.0; 7];
        params.copy_from_slice(&values[1..n_params]);
        table.rows.push(TableRow {
            index: values[0].round() as usize,
            params: ParameterTuple::from_values(&params),
            dos: values[n_params..].to_vec(),
        });
    }

    Ok(table)
}
