use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;

use super::domain::{Consultant, ConsultantId, SectorId};
use super::repository::{ApplicationStore, ConsultantDirectory, DirectoryError, StoreError};

/// Load snapshot taken for one candidate during a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateScore {
    pub consultant_id: ConsultantId,
    pub load: u32,
    pub capacity: u32,
}

/// Result of a sector match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Selected {
        consultant: Consultant,
        /// All candidates in ranked order, for diagnostics and demos.
        considered: Vec<CandidateScore>,
    },
    NoMatch {
        reason: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Capacity-aware consultant selection for a sector.
///
/// Pure read over the directory and the store's derived load counts; the
/// caller decides what to do with the outcome. Capacity is a soft target:
/// a fully loaded sector still yields the least-loaded consultant rather
/// than starving the application.
pub struct ConsultantMatcher<D, S> {
    directory: Arc<D>,
    store: Arc<S>,
    default_capacity: u32,
}

impl<D, S> ConsultantMatcher<D, S>
where
    D: ConsultantDirectory,
    S: ApplicationStore,
{
    pub fn new(directory: Arc<D>, store: Arc<S>, default_capacity: u32) -> Self {
        Self {
            directory,
            store,
            default_capacity: default_capacity.max(1),
        }
    }

    pub fn match_consultant(&self, sector: &SectorId) -> Result<MatchOutcome, MatchError> {
        let candidates: Vec<Consultant> = self
            .directory
            .list_consultants(sector, true)?
            .into_iter()
            .filter(|consultant| consultant.active && consultant.approved)
            .collect();

        if candidates.is_empty() {
            return Ok(MatchOutcome::NoMatch {
                reason: format!("no active consultant in sector {}", sector.0),
            });
        }

        let mut ranked = Vec::with_capacity(candidates.len());
        for consultant in candidates {
            let load = self.store.count_open_assigned(&consultant.id)?;
            let capacity = consultant
                .max_concurrent_applications
                .unwrap_or(self.default_capacity)
                .max(1);
            let score = CandidateScore {
                consultant_id: consultant.id.clone(),
                load,
                capacity,
            };
            ranked.push((consultant, score));
        }

        ranked.sort_by(rank);
        let considered = ranked.iter().map(|(_, score)| score.clone()).collect();
        let (consultant, _) = ranked.swap_remove(0);

        Ok(MatchOutcome::Selected {
            consultant,
            considered,
        })
    }
}

/// Ranking: load/capacity ratio, then absolute load, then seniority, then
/// id. The ratio comparison cross-multiplies so ordering stays exact.
fn rank(a: &(Consultant, CandidateScore), b: &(Consultant, CandidateScore)) -> Ordering {
    let left = u64::from(a.1.load) * u64::from(b.1.capacity);
    let right = u64::from(b.1.load) * u64::from(a.1.capacity);
    left.cmp(&right)
        .then_with(|| a.1.load.cmp(&b.1.load))
        .then_with(|| a.0.created_at.cmp(&b.0.created_at))
        .then_with(|| a.0.id.cmp(&b.0.id))
}
