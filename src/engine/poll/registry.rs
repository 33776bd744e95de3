use crate::engine::error::{FormflowError, Result};
use log::debug;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Tracks which UI regions currently have a job in flight.
///
/// A region is held by the [`RegionGuard`] returned from
/// [`InFlightRegistry::try_acquire`] and released when the guard drops.
/// Clones share the same set of regions.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    regions: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `region`, failing with `Busy` if a job already holds it
    pub fn try_acquire(&self, region: &str) -> Result<RegionGuard> {
        let mut regions = lock(&self.regions);
        if !regions.insert(region.to_string()) {
            return Err(FormflowError::Busy(format!(
                "a job is already running for '{region}'"
            )));
        }
        debug!("Acquired region '{region}'");
        Ok(RegionGuard {
            region: region.to_string(),
            regions: Arc::clone(&self.regions),
        })
    }

    pub fn is_busy(&self, region: &str) -> bool {
        lock(&self.regions).contains(region)
    }

    /// Regions currently held, sorted
    pub fn in_flight(&self) -> Vec<String> {
        let mut regions: Vec<String> = lock(&self.regions).iter().cloned().collect();
        regions.sort();
        regions
    }
}

/// Holds a region until dropped
#[derive(Debug)]
pub struct RegionGuard {
    region: String,
    regions: Arc<Mutex<HashSet<String>>>,
}

impl RegionGuard {
    pub fn region(&self) -> &str {
        &self.region
    }
}

impl Drop for RegionGuard {
    fn drop(&mut self) {
        lock(&self.regions).remove(&self.region);
        debug!("Released region '{}'", self.region);
    }
}

// The set stays consistent even if a holder panicked, so recover from poisoning.
fn lock(regions: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    regions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_busy() {
        let registry = InFlightRegistry::new();
        let guard = registry.try_acquire("dbt-run").unwrap();
        assert_eq!(guard.region(), "dbt-run");
        assert!(registry.is_busy("dbt-run"));

        let err = registry.try_acquire("dbt-run").unwrap_err();
        assert!(matches!(err, FormflowError::Busy(_)));

        // Other regions are independent
        let _other = registry.try_acquire("summarize").unwrap();
        assert_eq!(registry.in_flight(), vec!["dbt-run", "summarize"]);
    }

    #[test]
    fn test_drop_releases_region() {
        let registry = InFlightRegistry::new();
        {
            let _guard = registry.try_acquire("dbt-run").unwrap();
        }
        assert!(!registry.is_busy("dbt-run"));
        assert!(registry.try_acquire("dbt-run").is_ok());
    }

    #[test]
    fn test_clones_share_regions() {
        let registry = InFlightRegistry::new();
        let shared = registry.clone();
        let _guard = registry.try_acquire("lock").unwrap();
        assert!(shared.try_acquire("lock").is_err());
    }
}
