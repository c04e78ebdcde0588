use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{DosError, Result};

/// Column names of the parameter block, in table order.
pub const PARAMETER_SCHEMA: [&str; 8] = ["idx", "type", "JU", "N", "U", "m", "e", "gap"];

// ---------------------------------------------------------------------------
// ConfigCode – configuration type and its family
// ---------------------------------------------------------------------------

/// Solver configuration type code. The tens digit and above name the family
/// (`12` and `17` are both family `1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigCode(pub i64);

impl ConfigCode {
    /// Family used when deduplicating competing configurations.
    pub fn family(self) -> i64 {
        self.0.div_euclid(10)
    }
}

impl fmt::Display for ConfigCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ParameterTuple – one row of the parameter block
// ---------------------------------------------------------------------------

/// Physical parameters of one result file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterTuple {
    pub kind: ConfigCode,
    /// Hund coupling ratio `JU`.
    pub coupling: f64,
    /// Filling `N`.
    pub filling: f64,
    /// Interaction strength `U`.
    pub interaction: f64,
    /// Moment `m`.
    pub moment: f64,
    /// Total energy `e`.
    pub energy: f64,
    pub gap: f64,
}

impl ParameterTuple {
    /// Values in schema order, without the leading `idx` column.
    pub fn values(&self) -> [f64; 7] {
        [
            self.kind.0 as f64,
            self.coupling,
            self.filling,
            self.interaction,
            self.moment,
            self.energy,
            self.gap,
        ]
    }

    /// Rebuild from schema-ordered values (without `idx`).
    pub fn from_values(values: &[f64; 7]) -> Self {
        Self {
            kind: ConfigCode(values[0].round() as i64),
            coupling: values[1],
            filling: values[2],
            interaction: values[3],
            moment: values[4],
            energy: values[5],
            gap: values[6],
        }
    }

    /// Look a value up by its schema column name.
    pub fn get(&self, column: &str) -> Option<f64> {
        let pos = PARAMETER_SCHEMA[1..].iter().position(|c| *c == column)?;
        Some(self.values()[pos])
    }

    /// Parse the parameters of a band file from its name and header line.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_fields(&file_fields(path)?, path, true)
    }

    /// Like [`ParameterTuple::from_file`], but a missing total energy reads
    /// as 0: precomputed curve files need not record it.
    pub fn from_curve_file(path: &Path) -> Result<Self> {
        let fields = file_fields(path)?;
        if !fields.contains_key("e") {
            log::debug!("{}: no total energy, using 0", path.display());
        }
        Self::from_fields(&fields, path, false)
    }

    fn from_fields(fields: &BTreeMap<String, f64>, path: &Path, energy_required: bool) -> Result<Self> {
        let required = |name: &'static str| {
            fields
                .get(name)
                .copied()
                .ok_or_else(|| DosError::MissingParameter {
                    path: path.to_path_buf(),
                    name,
                })
        };
        let optional = |name: &str| fields.get(name).copied().unwrap_or(0.0);

        Ok(Self {
            kind: ConfigCode(required("type")?.round() as i64),
            coupling: required("JU")?,
            filling: required("N")?,
            interaction: required("U")?,
            moment: optional("m"),
            energy: if energy_required {
                required("e")?
            } else {
                optional("e")
            },
            gap: optional("gap"),
        })
    }
}

/// Filename tokens overlaid with the header line's pairs.
fn file_fields(path: &Path) -> Result<BTreeMap<String, f64>> {
    let mut fields = filename_fields(path);

    let file = std::fs::File::open(path).map_err(|e| DosError::io(path, e))?;
    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .map_err(|e| DosError::io(path, e))?;
    fields.extend(header_fields(&first));
    Ok(fields)
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z]+)(-?\d+(?:\.\d+)?(?:[eE]-?\d+)?)$").unwrap())
}

/// `type12_JU0.10_N2.00_U1.00_band.txt` → {type: 12, JU: 0.1, N: 2, U: 1}.
pub fn filename_fields(path: &Path) -> BTreeMap<String, f64> {
    // Only a purely alphabetic extension is stripped: `U3.00` has none.
    let textual_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.chars().all(|c| c.is_ascii_alphabetic()));
    let name = if textual_ext { path.file_stem() } else { path.file_name() };
    let name = name.and_then(|s| s.to_str()).unwrap_or("");

    name.split('_')
        .filter_map(|token| {
            let caps = token_regex().captures(token)?;
            let value = caps[2].parse::<f64>().ok()?;
            Some((caps[1].to_string(), value))
        })
        .collect()
}

/// `# e -5.0 m 0.3 gap=0.2` → {e: -5, m: 0.3, gap: 0.2}. Non-`#` lines give nothing.
pub fn header_fields(line: &str) -> BTreeMap<String, f64> {
    let Some(body) = line.trim_start().strip_prefix('#') else {
        return BTreeMap::new();
    };
    let normalized = body.replace('=', " ");
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    tokens
        .windows(2)
        .filter_map(|pair| {
            let key = pair[0];
            if key.parse::<f64>().is_ok() {
                return None;
            }
            pair[1].parse::<f64>().ok().map(|v| (key.to_string(), v))
        })
        .collect()
}
