use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::config::CandidateConfig;
use crate::error::{Context, Result};

/// Channels looked up when no candidate file is available.
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "Seenacrash",
    "Keoxer",
    "Farshadsilent",
    "LastDudeStanding",
    "Kamandd",
    "AmirRight",
    "DeejayFaren",
    "AliBesi",
    "Nichoqu",
    "Siabach",
    "AliDP",
    "Erph",
    "Eyzed",
    "Heisenbergofficial",
    "Nabbiltv",
    "Mckellen",
    "SamiraSaly",
    "Fox_3pi",
];

pub fn builtin_candidates() -> Vec<String> {
    DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect()
}

/// Candidate identifiers from the configured JSON file, capped at the configured limit.
pub fn load_candidates(config: &CandidateConfig) -> Result<Vec<String>> {
    let mut candidates = match config.file.as_deref() {
        Some(path) if path.exists() => read_candidate_file(path)?,
        Some(path) => {
            info!(
                "Candidate file {} not found, using built-in list",
                path.display()
            );
            builtin_candidates()
        }
        None => builtin_candidates(),
    };

    if candidates.is_empty() {
        warn!("Candidate list is empty, using built-in list");
        candidates = builtin_candidates();
    }

    candidates.truncate(config.limit);
    Ok(candidates)
}

fn read_candidate_file(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read candidate file {}", path.display()))?;
    let entries: Vec<String> = serde_json::from_str(&text)
        .with_context(|| format!("Candidate file {} is not a JSON string array", path.display()))?;

    Ok(entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect())
}
