use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::QuizTuning;
use crate::quiz::QuizDomain;

/// Version written into every stored envelope.
pub const SCHEMA_VERSION: u32 = 1;

pub const CLEARS_KEY: &str = "geoquiz-quiz-clears";

pub fn progress_key(domain: QuizDomain) -> String {
    format!("geoquiz-{}-progress", domain.as_str())
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
    #[error("failed to write {key}: {message}")]
    Write { key: String, message: String },
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat string key/value namespace the progress store persists into.
pub trait StorageBackend {
    /// Absent and unreadable entries both read as `None`.
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for Box<T> {
    fn read(&self, key: &str) -> Option<String> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// In-memory backend. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per entry under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScopeScore {
    pub correct: u32,
    pub total: u32,
}

/// Completed modules and level of the curriculum track.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurriculumProgress {
    pub completed_modules: BTreeSet<String>,
    pub level: u32,
}

impl Default for CurriculumProgress {
    fn default() -> Self {
        Self {
            completed_modules: BTreeSet::new(),
            level: 1,
        }
    }
}

impl CurriculumProgress {
    pub fn level_name(&self) -> &'static str {
        level_name(self.level)
    }
}

/// Aggregate results of one quiz domain.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressRecord {
    pub quizzes_completed: u32,
    /// Questions answered over all sessions.
    pub total_taken: u32,
    pub total_correct: u32,
    pub scope_scores: BTreeMap<String, ScopeScore>,
    /// Best single-session percentage per scope. Never lowered.
    pub best_scores: BTreeMap<String, u32>,
    /// Scopes whose best score reached the mastery threshold. Never shrinks.
    pub mastered: BTreeSet<String>,
    pub curriculum: CurriculumProgress,
}

impl ProgressRecord {
    /// Rounded overall percentage, 0 before any answer.
    pub fn accuracy(&self) -> u32 {
        percentage(self.total_correct, self.total_taken)
    }

    pub fn scope_accuracy(&self, scope_key: &str) -> Option<u32> {
        self.scope_scores
            .get(scope_key)
            .map(|score| percentage(score.correct, score.total))
    }

    pub fn best_score(&self, scope_key: &str) -> Option<u32> {
        self.best_scores.get(scope_key).copied()
    }

    pub fn is_mastered(&self, scope_key: &str) -> bool {
        self.mastered.contains(scope_key)
    }

    fn refresh_mastery(&mut self, threshold: u32) {
        for (key, best) in &self.best_scores {
            if *best >= threshold && !self.mastered.contains(key) {
                self.mastered.insert(key.clone());
            }
        }
    }
}

fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((f64::from(correct) / f64::from(total)) * 100.0).round() as u32
}

/// `(minimum answers, minimum accuracy, level reached)`, earliest rule first.
const LEVEL_RULES: [(u32, f64, u32); 5] = [
    (10, 0.80, 2),
    (30, 0.70, 3),
    (50, 0.75, 4),
    (80, 0.80, 5),
    (120, 0.85, 6),
];

/// Level after one more recorded result: the first rule that applies and
/// would raise the level wins.
fn next_level(level: u32, taken: u32, correct: u32) -> u32 {
    if taken == 0 {
        return level;
    }
    let accuracy = f64::from(correct) / f64::from(taken);

    LEVEL_RULES
        .iter()
        .find(|(min_taken, min_accuracy, target)| {
            taken >= *min_taken && accuracy >= *min_accuracy && level < *target
        })
        .map_or(level, |(_, _, target)| *target)
}

pub fn level_name(level: u32) -> &'static str {
    match level {
        2 => "基礎",
        3 => "中級",
        4 => "上級",
        5 => "エキスパート",
        6 => "マスター",
        _ => "入門",
    }
}

#[derive(serde::Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(serde::Deserialize)]
struct Envelope<T> {
    version: u32,
    data: T,
}

/// Result of one completed session as handed to a [`ResultSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub domain: QuizDomain,
    pub correct: u32,
    pub total: u32,
    pub scope_key: Option<String>,
    /// Set only for perfect runs of a configuration that tracks clears.
    pub clear_key: Option<String>,
}

/// Receiver of completed session results.
pub trait ResultSink {
    fn record(&self, result: &QuizResult);
}

impl<T: ResultSink + ?Sized> ResultSink for Rc<T> {
    fn record(&self, result: &QuizResult) {
        (**self).record(result);
    }
}

impl<T: ResultSink + ?Sized> ResultSink for &T {
    fn record(&self, result: &QuizResult) {
        (**self).record(result);
    }
}

/// Persistent per-domain progress, clears, and curriculum state.
///
/// Every operation is a read-modify-write of one key. Reads never fail:
/// absent, corrupt, or differently-versioned entries read as defaults.
/// Write failures are logged and dropped.
#[derive(Debug, Clone)]
pub struct ProgressStore<B> {
    backend: B,
    mastery_threshold: u32,
}

impl<B: StorageBackend> ProgressStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_tuning(backend, &QuizTuning::default())
    }

    pub fn with_tuning(backend: B, tuning: &QuizTuning) -> Self {
        Self {
            backend,
            mastery_threshold: tuning.mastery_threshold,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn mastery_threshold(&self) -> u32 {
        self.mastery_threshold
    }

    pub fn progress(&self, domain: QuizDomain) -> ProgressRecord {
        let mut record: ProgressRecord = self.load(&progress_key(domain));
        record.refresh_mastery(self.mastery_threshold);
        record
    }

    /// Adds one session's score to `domain`. With a scope key the scope's
    /// totals accumulate and its best percentage ratchets upward.
    pub fn record_quiz_result(
        &self,
        domain: QuizDomain,
        correct: u32,
        total: u32,
        scope_key: Option<&str>,
    ) {
        if total == 0 {
            log::debug!("ignoring empty {domain} result");
            return;
        }
        let correct = correct.min(total);
        let mut record = self.progress(domain);

        record.quizzes_completed = record.quizzes_completed.saturating_add(1);
        record.total_taken = record.total_taken.saturating_add(total);
        record.total_correct = record.total_correct.saturating_add(correct);

        if let Some(key) = scope_key {
            let score = record.scope_scores.entry(key.to_string()).or_default();
            score.correct = score.correct.saturating_add(correct);
            score.total = score.total.saturating_add(total);

            let session = percentage(correct, total);
            let best = record.best_scores.entry(key.to_string()).or_insert(0);
            *best = (*best).max(session);
        }
        record.refresh_mastery(self.mastery_threshold);

        if domain == QuizDomain::Module {
            let level = next_level(record.curriculum.level, record.total_taken, record.total_correct);
            if level > record.curriculum.level {
                log::info!("curriculum level {} -> {level}", record.curriculum.level);
                record.curriculum.level = level;
            }
        }

        log::info!(
            "recorded {domain} result {correct}/{total} (scope {})",
            scope_key.unwrap_or("-")
        );
        self.save(&progress_key(domain), &record);
    }

    pub fn record_clear(&self, key: &str) {
        let mut clears = self.clear_map();
        if clears.insert(key.to_string(), true) != Some(true) {
            log::info!("recorded clear {key}");
            self.save(CLEARS_KEY, &clears);
        }
    }

    pub fn is_cleared(&self, key: &str) -> bool {
        self.clear_map().get(key).copied().unwrap_or(false)
    }

    pub fn clears(&self) -> BTreeSet<String> {
        self.clear_map()
            .into_iter()
            .filter_map(|(key, cleared)| cleared.then_some(key))
            .collect()
    }

    /// Marks a curriculum module as done. Returns true when newly completed.
    pub fn complete_module(&self, module_id: &str) -> bool {
        let key = progress_key(QuizDomain::Module);
        let mut record: ProgressRecord = self.load(&key);

        if !record
            .curriculum
            .completed_modules
            .insert(module_id.to_string())
        {
            return false;
        }

        log::info!("completed module {module_id}");
        self.save(&key, &record);
        true
    }

    pub fn curriculum(&self) -> CurriculumProgress {
        self.progress(QuizDomain::Module).curriculum
    }

    pub fn reset(&self, domain: QuizDomain) {
        self.remove(&progress_key(domain));
    }

    /// Removes every domain record and all clears.
    pub fn reset_all(&self) {
        for domain in QuizDomain::ALL {
            self.reset(domain);
        }
        self.remove(CLEARS_KEY);
    }

    fn clear_map(&self) -> BTreeMap<String, bool> {
        self.load(CLEARS_KEY)
    }

    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(raw) = self.backend.read(key) else {
            return T::default();
        };

        match serde_json::from_str::<Envelope<T>>(&raw) {
            Ok(envelope) if envelope.version == SCHEMA_VERSION => envelope.data,
            Ok(envelope) => {
                log::warn!(
                    "stored {key} has version {}, expected {SCHEMA_VERSION}; using defaults",
                    envelope.version
                );
                T::default()
            }
            Err(error) => {
                log::warn!("stored {key} is unreadable ({error}); using defaults");
                T::default()
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, data: &T) {
        let envelope = EnvelopeRef {
            version: SCHEMA_VERSION,
            data,
        };

        let result = serde_json::to_string(&envelope)
            .map_err(|error| StorageError::Write {
                key: key.to_string(),
                message: error.to_string(),
            })
            .and_then(|text| self.backend.write(key, &text));

        if let Err(error) = result {
            log::warn!("dropping progress update: {error}");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(error) = self.backend.remove(key) {
            log::warn!("failed to remove {key}: {error}");
        }
    }
}

impl<B: StorageBackend> ResultSink for ProgressStore<B> {
    fn record(&self, result: &QuizResult) {
        self.record_quiz_result(
            result.domain,
            result.correct,
            result.total,
            result.scope_key.as_deref(),
        );

        if let Some(key) = &result.clear_key {
            if result.total > 0 && result.correct == result.total {
                self.record_clear(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ProgressStore<MemoryStorage> {
        ProgressStore::new(MemoryStorage::new())
    }

    #[test]
    fn saturated_counters_stay_at_the_maximum() {
        let backend = MemoryStorage::new();
        let max = u32::MAX;
        let stored = format!(
            r#"{{"version":1,"data":{{"quizzesCompleted":{max},"totalTaken":{max},"totalCorrect":{max},
                "scopeScores":{{"13":{{"correct":{max},"total":{max}}}}}}}}}"#
        );
        backend
            .write(&progress_key(QuizDomain::Municipality), &stored)
            .expect("memory writes succeed");
        let store = ProgressStore::new(backend);

        store.record_quiz_result(QuizDomain::Municipality, 5, 5, Some("13"));

        let record = store.progress(QuizDomain::Municipality);
        assert_eq!(record.quizzes_completed, max);
        assert_eq!(record.total_taken, max);
        assert_eq!(record.total_correct, max);
        assert_eq!(record.scope_scores["13"], ScopeScore { correct: max, total: max });
        assert_eq!(record.best_score("13"), Some(100));
    }

    #[test]
    fn absent_record_reads_as_defaults() {
        let record = store().progress(QuizDomain::Road);

        assert_eq!(record, ProgressRecord::default());
        assert_eq!(record.accuracy(), 0);
        assert_eq!(record.curriculum.level, 1);
    }

    #[test]
    fn accumulates_totals_and_scope_scores() {
        let store = store();
        store.record_quiz_result(QuizDomain::Municipality, 3, 4, Some("13"));
        store.record_quiz_result(QuizDomain::Municipality, 1, 4, Some("13"));
        store.record_quiz_result(QuizDomain::Municipality, 2, 2, None);

        let record = store.progress(QuizDomain::Municipality);
        assert_eq!(record.quizzes_completed, 3);
        assert_eq!(record.total_taken, 10);
        assert_eq!(record.total_correct, 6);
        assert_eq!(record.accuracy(), 60);
        assert_eq!(record.scope_scores["13"], ScopeScore { correct: 4, total: 8 });
        assert_eq!(record.scope_accuracy("13"), Some(50));
        assert_eq!(record.best_score("13"), Some(75));
        assert!(!record.is_mastered("13"));
    }

    #[test]
    fn domains_are_kept_apart() {
        let store = store();
        store.record_quiz_result(QuizDomain::River, 5, 5, None);

        assert_eq!(store.progress(QuizDomain::River).total_taken, 5);
        assert_eq!(store.progress(QuizDomain::Road).total_taken, 0);
        assert!(store.backend().read("geoquiz-river-progress").is_some());
    }

    #[test]
    fn empty_result_is_ignored() {
        let store = store();
        store.record_quiz_result(QuizDomain::Oaza, 0, 0, Some("13101"));

        assert!(store.backend().is_empty());
    }

    #[test]
    fn mastery_is_derived_from_stored_best_scores() {
        let storage = MemoryStorage::new();
        storage
            .write(
                "geoquiz-municipality-progress",
                r#"{ "version": 1, "data": { "bestScores": { "27": 90, "28": 40 } } }"#,
            )
            .expect("memory writes succeed");

        let record = ProgressStore::new(storage).progress(QuizDomain::Municipality);
        assert!(record.is_mastered("27"));
        assert!(!record.is_mastered("28"));
    }

    #[test]
    fn corrupt_and_foreign_versions_read_as_defaults() {
        let storage = MemoryStorage::new();
        storage
            .write("geoquiz-road-progress", "{ truncated")
            .expect("memory writes succeed");
        storage
            .write(
                "geoquiz-river-progress",
                r#"{ "version": 7, "data": { "totalTaken": 3 } }"#,
            )
            .expect("memory writes succeed");
        let store = ProgressStore::new(storage);

        assert_eq!(store.progress(QuizDomain::Road), ProgressRecord::default());
        assert_eq!(store.progress(QuizDomain::River), ProgressRecord::default());

        store.record_quiz_result(QuizDomain::Road, 1, 1, None);
        assert_eq!(store.progress(QuizDomain::Road).total_taken, 1);
    }

    #[test]
    fn clears_are_exact_keys() {
        let store = store();
        store.record_clear("area-code:all:10");
        store.record_clear("area-code:all:10");

        assert!(store.is_cleared("area-code:all:10"));
        assert!(!store.is_cleared("area-code:all:20"));
        assert_eq!(store.clears().len(), 1);
    }

    #[test]
    fn sink_records_clear_only_for_perfect_runs() {
        let store = store();
        let sink: &dyn ResultSink = &store;

        sink.record(&QuizResult {
            domain: QuizDomain::Oaza,
            correct: 9,
            total: 10,
            scope_key: None,
            clear_key: Some("oaza:muni_13101:10".to_string()),
        });
        assert!(!store.is_cleared("oaza:muni_13101:10"));

        sink.record(&QuizResult {
            domain: QuizDomain::Oaza,
            correct: 10,
            total: 10,
            scope_key: None,
            clear_key: Some("oaza:muni_13101:10".to_string()),
        });
        assert!(store.is_cleared("oaza:muni_13101:10"));
        assert_eq!(store.progress(QuizDomain::Oaza).quizzes_completed, 2);
    }

    #[test]
    fn modules_complete_once() {
        let store = store();

        assert!(store.complete_module("basics-1"));
        assert!(!store.complete_module("basics-1"));
        assert!(store.complete_module("basics-2"));
        assert_eq!(store.curriculum().completed_modules.len(), 2);
    }

    #[test]
    fn levels_rise_one_rule_at_a_time() {
        let store = store();

        store.record_quiz_result(QuizDomain::Module, 9, 10, None);
        assert_eq!(store.curriculum().level, 2);
        assert_eq!(store.curriculum().level_name(), "基礎");

        // 27 of 30 reaches the second rule
        store.record_quiz_result(QuizDomain::Module, 18, 20, None);
        assert_eq!(store.curriculum().level, 3);

        // other domains never touch the curriculum level
        store.record_quiz_result(QuizDomain::Road, 100, 100, None);
        assert_eq!(store.curriculum().level, 3);
    }

    #[test]
    fn poor_accuracy_keeps_level() {
        assert_eq!(next_level(1, 40, 10), 1);
        assert_eq!(next_level(1, 30, 22), 3);
        assert_eq!(next_level(6, 500, 500), 6);
        assert_eq!(next_level(1, 0, 0), 1);
        assert_eq!(level_name(0), "入門");
    }

    #[test]
    fn reset_removes_records_and_clears() {
        let store = store();
        store.record_quiz_result(QuizDomain::Road, 1, 2, None);
        store.record_quiz_result(QuizDomain::River, 1, 2, None);
        store.record_clear("road:all:5");

        store.reset(QuizDomain::Road);
        assert_eq!(store.progress(QuizDomain::Road).total_taken, 0);
        assert_eq!(store.progress(QuizDomain::River).total_taken, 2);

        store.reset_all();
        assert!(store.backend().is_empty());
    }

    #[test]
    fn file_storage_round_trips_through_directory() {
        let root = tempfile::tempdir().expect("temporary directory should be created");
        let storage = FileStorage::new(root.path().join("progress"));
        let store = ProgressStore::new(storage.clone());

        store.record_quiz_result(QuizDomain::AreaCode, 4, 5, Some("13"));
        assert!(root.path().join("progress").join("geoquiz-area-code-progress.json").exists());

        let reopened = ProgressStore::new(storage);
        assert_eq!(reopened.progress(QuizDomain::AreaCode).best_score("13"), Some(80));
        assert!(reopened.progress(QuizDomain::AreaCode).is_mastered("13"));

        reopened.reset_all();
        assert_eq!(reopened.progress(QuizDomain::AreaCode).total_taken, 0);
    }
}
