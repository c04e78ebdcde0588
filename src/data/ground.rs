use std::collections::HashSet;
use std::path::PathBuf;

use super::params::ParameterTuple;
use crate::error::{DosError, Result};

// ---------------------------------------------------------------------------
// Candidate discovery
// ---------------------------------------------------------------------------

/// A result file together with its parsed parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub path: PathBuf,
    pub params: ParameterTuple,
}

/// Files matching `pattern`, minus those whose path contains `exclude_tag`.
/// Order is the glob's (alphabetical).
pub fn discover(pattern: &str, exclude_tag: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|source| DosError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            DosError::io(path, e.into_error())
        })?;
        if !exclude_tag.is_empty() && path.to_string_lossy().contains(exclude_tag) {
            log::debug!("skipping non-converged {}", path.display());
            continue;
        }
        files.push(path);
    }
    Ok(files)
}

/// Parse every file into a [`Candidate`].
pub fn parse_candidates(files: &[PathBuf]) -> Result<Vec<Candidate>> {
    files
        .iter()
        .map(|path| {
            Ok(Candidate {
                path: path.clone(),
                params: ParameterTuple::from_file(path)?,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Ground-state selection
// ---------------------------------------------------------------------------

/// Deduplication key: (coupling, filling, interaction, family).
type GroundKey = (u64, u64, u64, i64);

fn ground_key(p: &ParameterTuple) -> GroundKey {
    // `+ 0.0` folds -0.0 into 0.0 so both land in the same group.
    let bits = |x: f64| (x + 0.0).to_bits();
    (
        bits(p.coupling),
        bits(p.filling),
        bits(p.interaction),
        p.kind.family(),
    )
}

/// Indices of the rows that survive ground-state selection, ascending.
///
/// Rows are ordered by (coupling, filling, interaction, energy, type) with a
/// stable sort; the first row seen for each (coupling, filling, interaction,
/// family) key is kept, which is the lowest-energy member of its group.
pub fn ground_state_indices(rows: &[ParameterTuple]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (&rows[a], &rows[b]);
        ra.coupling
            .total_cmp(&rb.coupling)
            .then(ra.filling.total_cmp(&rb.filling))
            .then(ra.interaction.total_cmp(&rb.interaction))
            .then(ra.energy.total_cmp(&rb.energy))
            .then(ra.kind.cmp(&rb.kind))
    });

    let mut seen: HashSet<GroundKey> = HashSet::new();
    let mut kept: Vec<usize> = order
        .into_iter()
        .filter(|&i| seen.insert(ground_key(&rows[i])))
        .collect();
    kept.sort_unstable();
    kept
}

/// Keep one candidate per physical configuration, in candidate order.
pub fn select_ground_states(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let params: Vec<ParameterTuple> = candidates.iter().map(|c| c.params).collect();
    let keep = ground_state_indices(&params);

    let mut keep = keep.into_iter().peekable();
    candidates
        .into_iter()
        .enumerate()
        .filter_map(|(i, c)| {
            if keep.peek() == Some(&i) {
                keep.next();
                Some(c)
            } else {
                None
            }
        })
        .collect()
}

/// Discover, parse and reduce the candidates of one dataset.
pub fn ground_states(pattern: &str, exclude_tag: &str) -> Result<Vec<Candidate>> {
    let files = discover(pattern, exclude_tag)?;
    let candidates = parse_candidates(&files)?;
    let n_candidates = candidates.len();

    let grounds = select_ground_states(candidates);
    log::info!("{} candidates -> {} ground states", n_candidates, grounds.len());

    if grounds.is_empty() {
        return Err(DosError::NoGroundStates(pattern.to_string()));
    }
    Ok(grounds)
}
