//! Persistence adapter for the single saved report snapshot.
//!
//! The snapshot lives under two independent keys, so a partial write is
//! possible; `load` treats a half-present snapshot as absent. Nothing in here
//! returns an error: failures are logged and degrade to "absent" / no-op.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageError};
use crate::survey::models::{ReportData, SurveyResponse};

pub const SAVED_REPORT_KEY: &str = "savedReport";
pub const SAVED_RESPONSES_KEY: &str = "savedSurveyResponses";

pub struct ReportStore {
    store: Box<dyn KeyValueStore>,
}

impl ReportStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// True when a saved report key is readable and non-empty.
    pub fn has_saved_report(&self) -> bool {
        match self.store.get(SAVED_REPORT_KEY) {
            Ok(value) => value.is_some_and(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!("Could not access saved report: {e}");
                false
            }
        }
    }

    /// Writes both keys. A failure on the first does not skip the second.
    /// Returns whether both writes succeeded.
    pub fn save(&mut self, report: &ReportData, responses: &[SurveyResponse]) -> bool {
        let report_saved = match self.write_json(SAVED_REPORT_KEY, report) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save report: {e}");
                false
            }
        };
        let responses_saved = match self.write_json(SAVED_RESPONSES_KEY, responses) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save survey responses: {e}");
                false
            }
        };

        if report_saved && responses_saved {
            debug!("Saved report snapshot ({} responses)", responses.len());
        }
        report_saved && responses_saved
    }

    /// Returns the snapshot only when both keys are present and parse.
    pub fn load(&self) -> Option<(ReportData, Vec<SurveyResponse>)> {
        let report: ReportData = self.read_json(SAVED_REPORT_KEY)?;
        let responses: Vec<SurveyResponse> = self.read_json(SAVED_RESPONSES_KEY)?;
        Some((report, responses))
    }

    /// Removes both keys, each attempted independently.
    pub fn clear(&mut self) {
        for key in [SAVED_REPORT_KEY, SAVED_RESPONSES_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!("Failed to clear '{key}': {e}");
            }
        }
    }

    fn write_json<T: serde::Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No saved value under '{key}'");
                return None;
            }
            Err(e) => {
                warn!("Failed to read '{key}': {e}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Saved value under '{key}' is corrupt: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::survey::models::{AnalysisItem, ChartData};
    use std::collections::HashSet;

    /// Store whose operations fail for the listed keys.
    #[derive(Default)]
    pub struct FlakyStore {
        pub inner: MemoryStore,
        pub failing_keys: HashSet<String>,
    }

    impl FlakyStore {
        pub fn failing(keys: &[&str]) -> Self {
            Self {
                inner: MemoryStore::new(),
                failing_keys: keys.iter().map(|k| k.to_string()).collect(),
            }
        }

        fn check(&self, key: &str) -> Result<(), StorageError> {
            if self.failing_keys.contains(key) {
                Err(StorageError::Io {
                    key: key.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "quota exceeded"),
                })
            } else {
                Ok(())
            }
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.check(key)?;
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.check(key)?;
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            self.check(key)?;
            self.inner.remove(key)
        }
    }

    pub fn sample_report() -> ReportData {
        ReportData {
            title: "Votre plan d'action".to_string(),
            summary: "Vous voulez courir un marathon.".to_string(),
            detailed_analysis: vec![AnalysisItem {
                question: "Quel est votre objectif ?".to_string(),
                answer: "Courir \"vite\"".to_string(),
                insight: "Objectif ambitieux.".to_string(),
            }],
            conclusion: "Bonne chance !".to_string(),
            chart_data: ChartData {
                title: "Priorités".to_string(),
                labels: vec!["Santé".to_string(), "Temps".to_string()],
                values: vec![8.0, 3.5],
            },
        }
    }

    pub fn sample_responses() -> Vec<SurveyResponse> {
        vec![
            SurveyResponse {
                question: "Quel est votre objectif ?".to_string(),
                answer: "Courir \"vite\"".to_string(),
            },
            SurveyResponse {
                question: String::new(),
                answer: "Trois mois".to_string(),
            },
        ]
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let mut store = ReportStore::new(Box::new(MemoryStore::new()));
        let report = sample_report();
        let responses = sample_responses();

        assert!(store.save(&report, &responses));

        assert!(store.has_saved_report());
        let (loaded_report, loaded_responses) = store.load().expect("snapshot present");
        assert_eq!(loaded_report, report);
        assert_eq!(loaded_responses, responses);
    }

    #[test]
    fn test_load_empty_store_is_none() {
        let store = ReportStore::new(Box::new(MemoryStore::new()));
        assert!(!store.has_saved_report());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_failed_report_write_still_writes_responses() {
        let mut store = ReportStore::new(Box::new(FlakyStore::failing(&[SAVED_REPORT_KEY])));
        assert!(!store.save(&sample_report(), &sample_responses()));
        // the report key is unreadable, so the snapshot is absent
        assert!(store.load().is_none());
        assert!(!store.has_saved_report());
        assert_eq!(
            store.read_json::<Vec<SurveyResponse>>(SAVED_RESPONSES_KEY),
            Some(sample_responses())
        );
    }

    #[test]
    fn test_partial_snapshot_loads_as_none() {
        let mut inner = MemoryStore::new();
        inner
            .set(SAVED_REPORT_KEY, &serde_json::to_string(&sample_report()).unwrap())
            .unwrap();
        let store = ReportStore::new(Box::new(inner));
        assert!(store.has_saved_report());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_corrupt_json_loads_as_none() {
        let mut inner = MemoryStore::new();
        inner.set(SAVED_REPORT_KEY, "{not json").unwrap();
        inner.set(SAVED_RESPONSES_KEY, "[]").unwrap();
        let store = ReportStore::new(Box::new(inner));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_clear_attempts_both_keys() {
        let mut flaky = FlakyStore::failing(&[SAVED_REPORT_KEY]);
        flaky.inner.set(SAVED_RESPONSES_KEY, "[]").unwrap();
        let mut store = ReportStore::new(Box::new(flaky));

        store.clear();

        // responses key removed even though removing the report key failed
        assert!(store.read_json::<Vec<SurveyResponse>>(SAVED_RESPONSES_KEY).is_none());
    }

    #[test]
    fn test_read_failure_reports_no_saved_report() {
        let store = ReportStore::new(Box::new(FlakyStore::failing(&[
            SAVED_REPORT_KEY,
            SAVED_RESPONSES_KEY,
        ])));
        assert!(!store.has_saved_report());
        assert!(store.load().is_none());
    }
}
