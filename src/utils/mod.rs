//! Small helpers shared across modules.

use anyhow::{Context, Result};
use std::path::PathBuf;
use strsim::levenshtein;

use crate::constants::SIMILARITY_THRESHOLD_PERCENT;

/// Closest candidate to `target` by Levenshtein distance, if it is within
/// [`SIMILARITY_THRESHOLD_PERCENT`] of the target's length.
pub fn find_similar_name<'a, I>(target: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let max_distance = (target.len() * SIMILARITY_THRESHOLD_PERCENT / 100).max(1);

    candidates
        .into_iter()
        .map(|candidate| (levenshtein(target, candidate), candidate))
        .filter(|(distance, _)| *distance <= max_distance)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

/// Expand `~` and `$VAR`/`${VAR}` in a configured path.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).with_context(|| {
        format!(
            "Failed to expand path: {path}\n\n\
            Use $VAR or ${{VAR}} for environment variables and ~/ for the home directory"
        )
    })?;
    Ok(PathBuf::from(expanded.as_ref()))
}
