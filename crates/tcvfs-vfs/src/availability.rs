//! Availability classification of a subtree.

use tcvfs_core::journal::normalize_path;
use tcvfs_core::{
    AvailabilityError, AvailabilityResult, HydrationFacts, PinState, SyncJournal,
    VfsItemAvailability,
};
use tracing::warn;

use crate::pin::PinStates;

/// Combine hydration facts with the subtree's pin state.
///
/// `Mixed` wins over any pin: it is an observation, not a policy. A pin only
/// refines a uniform subtree into its pinned variant.
pub fn classify(facts: HydrationFacts, pin: Option<PinState>) -> AvailabilityResult {
    match (facts.has_hydrated, facts.has_dehydrated) {
        (true, true) => Ok(VfsItemAvailability::Mixed),
        (false, true) if pin == Some(PinState::OnlineOnly) => Ok(VfsItemAvailability::OnlineOnly),
        (false, true) => Ok(VfsItemAvailability::AllDehydrated),
        (true, false) if pin == Some(PinState::AlwaysLocal) => {
            Ok(VfsItemAvailability::AlwaysLocal)
        }
        (true, false) => Ok(VfsItemAvailability::AllHydrated),
        (false, false) => Err(AvailabilityError::NoSuchItem),
    }
}

/// Look up the subtree at `path` in the journal and classify it.
pub fn availability_in_db(journal: &dyn SyncJournal, path: &str) -> AvailabilityResult {
    let path = normalize_path(path);

    // A missing pin still allows an answer from hydration facts alone.
    let pin = match PinStates::new(journal).effective_for_subtree(&path) {
        Ok(pin) => pin,
        Err(e) => {
            warn!(path = %path, "pin state lookup failed: {e}");
            None
        }
    };

    let facts = journal.hydration_facts(&path).map_err(|e| {
        warn!(path = %path, "hydration state lookup failed: {e}");
        AvailabilityError::DbError
    })?;

    classify(facts, pin)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PINS: [Option<PinState>; 4] = [
        None,
        Some(PinState::Inherited),
        Some(PinState::AlwaysLocal),
        Some(PinState::OnlineOnly),
    ];

    fn facts(has_hydrated: bool, has_dehydrated: bool) -> HydrationFacts {
        HydrationFacts {
            has_hydrated,
            has_dehydrated,
        }
    }

    #[test]
    fn mixed_ignores_pin() {
        for pin in PINS {
            assert_eq!(classify(facts(true, true), pin), Ok(VfsItemAvailability::Mixed));
        }
    }

    #[test]
    fn dehydrated_subtree() {
        assert_eq!(
            classify(facts(false, true), Some(PinState::OnlineOnly)),
            Ok(VfsItemAvailability::OnlineOnly)
        );
        for pin in [None, Some(PinState::Inherited), Some(PinState::AlwaysLocal)] {
            assert_eq!(
                classify(facts(false, true), pin),
                Ok(VfsItemAvailability::AllDehydrated)
            );
        }
    }

    #[test]
    fn hydrated_subtree() {
        assert_eq!(
            classify(facts(true, false), Some(PinState::AlwaysLocal)),
            Ok(VfsItemAvailability::AlwaysLocal)
        );
        for pin in [None, Some(PinState::Inherited), Some(PinState::OnlineOnly)] {
            assert_eq!(
                classify(facts(true, false), pin),
                Ok(VfsItemAvailability::AllHydrated)
            );
        }
    }

    #[test]
    fn empty_subtree_is_no_such_item() {
        for pin in PINS {
            assert_eq!(
                classify(facts(false, false), pin),
                Err(AvailabilityError::NoSuchItem)
            );
        }
    }
}
