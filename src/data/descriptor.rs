use std::path::Path;

use crate::error::{DosError, Result};

/// File name of the per-dataset descriptor.
pub const DESCRIPTOR_FILE: &str = "config.txt";

// ---------------------------------------------------------------------------
// KPoint / Descriptor
// ---------------------------------------------------------------------------

/// A labelled k-point and the row it occupies in a band file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KPoint {
    pub label: String,
    pub row: usize,
}

/// Contents of a dataset's `config.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Descriptor {
    /// Glob matching the dataset's result files.
    pub pattern: String,
    /// Number of bands per spin channel.
    pub n_bands: usize,
    /// Selected k-points, in file order.
    pub kpoints: Vec<KPoint>,
}

impl Descriptor {
    /// Read `<dataset_dir>/config.txt`.
    pub fn read(dataset_dir: &Path) -> Result<Self> {
        let path = dataset_dir.join(DESCRIPTOR_FILE);
        if !path.is_file() {
            return Err(DosError::ConfigNotFound(path));
        }
        let text = std::fs::read_to_string(&path).map_err(|e| DosError::io(&path, e))?;
        Self::parse(&text, &path)
    }

    /// Parse descriptor text.
    ///
    /// `path` and `Nb` are read wherever they appear before the end of the
    /// k-point block; everything after `end kpoints` is ignored, as are lines
    /// that match no known key.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let mut descriptor = Descriptor::default();
        let mut in_block = false;

        for (line_no, line) in text.lines().enumerate() {
            let line_no = line_no + 1;

            if line.starts_with("end kpoints") {
                break;
            }
            if in_block {
                if let Some(kpoint) = parse_kpoint(line, origin, line_no)? {
                    descriptor.kpoints.push(kpoint);
                }
                continue;
            }
            if line.starts_with("begin kpoints") {
                in_block = true;
            } else if line.starts_with("path") {
                descriptor.pattern = second_token(line, origin, line_no)?.to_string();
            } else if line.starts_with("Nb") {
                let value = second_token(line, origin, line_no)?;
                descriptor.n_bands = value.parse().map_err(|_| {
                    DosError::parse(origin, line_no, format!("'{value}' is not a band count"))
                })?;
            }
        }

        Ok(descriptor)
    }

    /// K-point labels in order.
    pub fn labels(&self) -> Vec<String> {
        self.kpoints.iter().map(|k| k.label.clone()).collect()
    }

    /// Band-file rows in k-point order.
    pub fn rows(&self) -> Vec<usize> {
        self.kpoints.iter().map(|k| k.row).collect()
    }

    /// The band count, or an error naming the descriptor if `Nb` is absent.
    pub fn require_bands(&self, dataset_dir: &Path) -> Result<usize> {
        if self.n_bands == 0 {
            return Err(DosError::Descriptor {
                path: dataset_dir.join(DESCRIPTOR_FILE),
                message: "no 'Nb' entry".to_string(),
            });
        }
        Ok(self.n_bands)
    }

    /// The glob pattern, or an error naming the descriptor if none was given.
    pub fn require_pattern(&self, dataset_dir: &Path) -> Result<&str> {
        if self.pattern.is_empty() {
            return Err(DosError::Descriptor {
                path: dataset_dir.join(DESCRIPTOR_FILE),
                message: "no 'path' entry".to_string(),
            });
        }
        Ok(&self.pattern)
    }
}

fn second_token<'a>(line: &'a str, origin: &Path, line_no: usize) -> Result<&'a str> {
    line.split_whitespace()
        .nth(1)
        .ok_or_else(|| DosError::parse(origin, line_no, "missing value"))
}

/// Accepts `G 0` as well as `(G, 0)`. Blank lines yield `None`.
fn parse_kpoint(line: &str, origin: &Path, line_no: usize) -> Result<Option<KPoint>> {
    let cleaned: String = line
        .chars()
        .map(|c| match c {
            '(' | ')' | ',' | '"' | '\'' => ' ',
            other => other,
        })
        .collect();
    let mut tokens = cleaned.split_whitespace();
    let Some(label) = tokens.next() else {
        return Ok(None);
    };
    let row = tokens
        .next()
        .ok_or_else(|| DosError::parse(origin, line_no, format!("k-point '{label}' has no row index")))?;
    let row = row
        .parse::<usize>()
        .map_err(|_| DosError::parse(origin, line_no, format!("'{row}' is not a row index")))?;

    Ok(Some(KPoint {
        label: label.to_string(),
        row,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Descriptor> {
        Descriptor::parse(text, Path::new("config.txt"))
    }

    #[test]
    fn reads_keys_and_kpoint_block() {
        let d = parse("path data/raw/*.txt\nNb 4\nbegin kpoints\nG 0\nX 3\nend kpoints\n").unwrap();
        assert_eq!(d.pattern, "data/raw/*.txt");
        assert_eq!(d.n_bands, 4);
        assert_eq!(d.labels(), vec!["G", "X"]);
        assert_eq!(d.rows(), vec![0, 3]);
    }

    #[test]
    fn accepts_tuple_notation() {
        let d = parse("begin kpoints\n(\"G\", 0)\n(M, 7)\nend kpoints\n").unwrap();
        assert_eq!(d.rows(), vec![0, 7]);
        assert_eq!(d.labels(), vec!["G", "M"]);
    }

    #[test]
    fn stops_at_first_terminator() {
        let d = parse("begin kpoints\nG 0\nend kpoints\nX 3\nend kpoints\nNb 9\n").unwrap();
        assert_eq!(d.kpoints.len(), 1);
        assert_eq!(d.n_bands, 0);
    }

    #[test]
    fn ignores_unrecognized_lines() {
        let d = parse("# comment\nlattice square\nNb 2\n\nbegin kpoints\n\nG 0\nend kpoints\n").unwrap();
        assert_eq!(d.n_bands, 2);
        assert_eq!(d.kpoints.len(), 1);
    }

    #[test]
    fn rejects_non_integer_row() {
        let err = parse("begin kpoints\nG zero\nend kpoints\n").unwrap_err();
        assert!(matches!(err, DosError::Parse { line: 2, .. }));
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Descriptor::read(dir.path()).unwrap_err();
        assert!(matches!(err, DosError::ConfigNotFound(p) if p.ends_with(DESCRIPTOR_FILE)));
    }

    #[test]
    fn missing_pattern_is_reported() {
        let d = parse("Nb 2\n").unwrap();
        assert!(d.require_pattern(Path::new("data/hf")).is_err());
    }

    #[test]
    fn missing_band_count_is_reported() {
        let d = parse("path data/raw/*.txt
begin kpoints
G 0
end kpoints
").unwrap();
        let err = d.require_bands(Path::new("data/hf")).unwrap_err();
        assert!(matches!(
            err,
            DosError::Descriptor { ref path, ref message }
                if path.ends_with("hf/config.txt") && message.contains("Nb")
        ));
        assert_eq!(parse("Nb 3
").unwrap().require_bands(Path::new("d")).unwrap(), 3);
    }
}
