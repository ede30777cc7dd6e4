use std::sync::Arc;

use log::{info, warn};

use crate::acquire::{BoundedRetryAcquirer, UpdateSender};
use crate::error::Result;
use crate::fetch::RecordSource;
use crate::records::{filter_records, StreamerRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Blank query: the caller should run a full load again.
    Reload,
    Results {
        source: SearchSource,
        records: Vec<StreamerRecord>,
    },
}

/// Free-text search over the candidate list, answered remotely when possible.
pub struct Searcher<S> {
    acquirer: Arc<BoundedRetryAcquirer<S>>,
    candidates: Vec<String>,
}

impl<S: RecordSource + 'static> Searcher<S> {
    pub fn new(acquirer: Arc<BoundedRetryAcquirer<S>>, candidates: Vec<String>) -> Self {
        Self {
            acquirer,
            candidates,
        }
    }

    pub fn matching_candidates(&self, query: &str) -> Vec<String> {
        let needle = query.trim().to_lowercase();
        self.candidates
            .iter()
            .filter(|candidate| candidate.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Look up the candidates whose identifier contains `query`. If the remote
    /// run breaks, filter `fetched` locally instead.
    pub async fn search(
        &self,
        query: &str,
        fetched: &[StreamerRecord],
        updates: &UpdateSender,
    ) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchOutcome::Reload);
        }

        let matches = self.matching_candidates(query);
        if matches.is_empty() {
            info!("No candidate channel matches `{}`", query);
            return Ok(SearchOutcome::Results {
                source: SearchSource::Remote,
                records: Vec::new(),
            });
        }

        let handle = Arc::clone(&self.acquirer).spawn_run(matches, updates.clone());
        match handle.join().await {
            Ok(outcome) => Ok(SearchOutcome::Results {
                source: SearchSource::Remote,
                records: outcome.into_records(),
            }),
            Err(err) if err.is_orchestration() => {
                warn!(
                    "Remote search for `{}` failed, filtering loaded channels instead: {}",
                    query, err
                );
                Ok(SearchOutcome::Results {
                    source: SearchSource::Local,
                    records: filter_records(fetched, query),
                })
            }
            Err(err) => Err(err),
        }
    }
}
