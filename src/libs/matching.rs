use crate::libs::core::models::{PreferenceKind, Preferences};
use crate::libs::storage::records::UserRecord;
use crate::libs::storage::storage_traits::{StoreError, UserStore};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ineligible {
    NotActive,
    AlreadyPaired,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    NotEligible(Ineligible),
    NoMatch,
    Found(UserRecord),
}

/// Two users are compatible unless some attribute is set on both sides with
/// different values. Gender is checked first, then language, then country.
pub fn compatible(a: &Preferences, b: &Preferences) -> bool {
    PreferenceKind::MATCH_ORDER
        .iter()
        .all(|&kind| match (a.get(kind), b.get(kind)) {
            (Some(left), Some(right)) => left == right,
            _ => true,
        })
}

pub fn eligibility(requester: &UserRecord) -> Result<(), Ineligible> {
    if !requester.active {
        return Err(Ineligible::NotActive);
    }
    if requester.is_paired() {
        return Err(Ineligible::AlreadyPaired);
    }
    Ok(())
}

/// Picks a partner for a requester from a point-in-time view of the store.
///
/// Selection never writes; committing the pairing is the session manager's job.
pub struct MatchEngine {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchEngine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic candidate order, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    pub fn select(
        &self,
        store: &dyn UserStore,
        requester: &UserRecord,
    ) -> Result<Selection, StoreError> {
        if let Err(reason) = eligibility(requester) {
            return Ok(Selection::NotEligible(reason));
        }

        let mut candidates = store.scan_active_unpaired(requester.user_id)?;
        {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            candidates.shuffle(&mut **rng);
        }
        debug!(requester = %requester.user_id, candidates = candidates.len(), "evaluating candidates");

        for candidate_id in candidates {
            let candidate = match store.get(candidate_id) {
                Ok(candidate) => candidate,
                Err(err) => {
                    warn!(candidate = %candidate_id, "Error checking compatibility: {err}");
                    continue;
                }
            };
            if candidate.user_id == requester.user_id || !candidate.is_available() {
                continue;
            }
            if compatible(&requester.preferences, &candidate.preferences) {
                return Ok(Selection::Found(candidate));
            }
        }

        Ok(Selection::NoMatch)
    }
}
