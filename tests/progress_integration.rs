use geoquiz::progress::{CLEARS_KEY, progress_key};
use geoquiz::{
    FileStorage, MemoryStorage, ProgressStore, QuizDomain, QuizResult, QuizTuning, ResultSink,
    StorageBackend,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn best_score_reaches_mastery_for_a_prefecture_scope() {
    let store = ProgressStore::new(MemoryStorage::new());

    store.record_quiz_result(QuizDomain::Municipality, 8, 10, Some("13"));
    store.record_quiz_result(QuizDomain::Municipality, 10, 10, Some("13"));

    let record = store.progress(QuizDomain::Municipality);
    assert_eq!(record.best_score("13"), Some(100));
    assert!(record.is_mastered("13"));
    assert_eq!(record.quizzes_completed, 2);
    assert_eq!(record.total_taken, 20);
    assert_eq!(record.total_correct, 18);
    assert_eq!(record.scope_accuracy("13"), Some(90));
}

#[test]
fn best_scores_never_drop_and_mastery_sticks() {
    let store = ProgressStore::new(MemoryStorage::new());
    let mut rng = StdRng::seed_from_u64(512);
    let mut previous = 0;
    let mut mastered = false;

    for _ in 0..60 {
        let total = rng.gen_range(1..=10);
        let correct = rng.gen_range(0..=total);
        store.record_quiz_result(QuizDomain::River, correct, total, Some("kanto"));

        let record = store.progress(QuizDomain::River);
        let best = record.best_score("kanto").expect("scope was recorded");
        assert!(best >= previous, "best score dropped from {previous} to {best}");
        previous = best;

        if best >= 80 {
            mastered = true;
        }
        assert_eq!(record.is_mastered("kanto"), mastered);
    }
}

#[test]
fn custom_threshold_controls_mastery() {
    let tuning = QuizTuning {
        mastery_threshold: 95,
        ..QuizTuning::default()
    };
    let store = ProgressStore::with_tuning(MemoryStorage::new(), &tuning);

    store.record_quiz_result(QuizDomain::Road, 9, 10, Some("27"));
    assert!(!store.progress(QuizDomain::Road).is_mastered("27"));

    store.record_quiz_result(QuizDomain::Road, 10, 10, Some("27"));
    assert!(store.progress(QuizDomain::Road).is_mastered("27"));
}

#[test]
fn results_through_the_sink_record_clears_only_when_perfect() {
    let store = ProgressStore::new(MemoryStorage::new());

    store.record(&QuizResult {
        domain: QuizDomain::AreaCode,
        correct: 4,
        total: 5,
        scope_key: None,
        clear_key: Some("area-code:all:5".to_string()),
    });
    assert!(!store.is_cleared("area-code:all:5"));

    store.record(&QuizResult {
        domain: QuizDomain::AreaCode,
        correct: 5,
        total: 5,
        scope_key: None,
        clear_key: Some("area-code:all:5".to_string()),
    });
    assert!(store.is_cleared("area-code:all:5"));
    assert_eq!(store.progress(QuizDomain::AreaCode).quizzes_completed, 2);
}

#[test]
fn corrupt_entries_read_as_defaults_and_are_overwritten() {
    let backend = MemoryStorage::new();
    backend
        .write(&progress_key(QuizDomain::Prefecture), "{not json")
        .expect("memory writes succeed");
    backend
        .write(CLEARS_KEY, r#"{"version":99,"data":{"prefecture:all:5":true}}"#)
        .expect("memory writes succeed");
    let store = ProgressStore::new(backend.clone());

    assert_eq!(store.progress(QuizDomain::Prefecture).quizzes_completed, 0);
    assert!(store.clears().is_empty(), "unknown versions are ignored");

    store.record_quiz_result(QuizDomain::Prefecture, 3, 5, None);
    let raw = backend
        .read(&progress_key(QuizDomain::Prefecture))
        .expect("record was written");
    assert!(raw.contains("\"version\":1"));
    assert_eq!(store.progress(QuizDomain::Prefecture).accuracy(), 60);
}

#[test]
fn progress_survives_a_new_store_over_the_same_directory() {
    let dir = tempfile::tempdir().expect("temp dir");

    {
        let store = ProgressStore::new(FileStorage::new(dir.path()));
        store.record_quiz_result(QuizDomain::Oaza, 7, 7, Some("13101"));
        store.record_clear("oaza:muni_13101:7");
        assert!(store.complete_module("basics"));
    }

    let store = ProgressStore::new(FileStorage::new(dir.path()));
    assert!(store.progress(QuizDomain::Oaza).is_mastered("13101"));
    assert!(store.is_cleared("oaza:muni_13101:7"));
    assert!(store.curriculum().completed_modules.contains("basics"));
    assert!(!store.complete_module("basics"));

    store.reset_all();
    assert_eq!(store.progress(QuizDomain::Oaza).quizzes_completed, 0);
    assert!(store.clears().is_empty());
    assert!(store.curriculum().completed_modules.is_empty());
}

#[test]
fn reset_only_touches_one_domain() {
    let store = ProgressStore::new(MemoryStorage::new());
    store.record_quiz_result(QuizDomain::Prefecture, 1, 2, None);
    store.record_quiz_result(QuizDomain::River, 2, 2, None);

    store.reset(QuizDomain::Prefecture);

    assert_eq!(store.progress(QuizDomain::Prefecture).total_taken, 0);
    assert_eq!(store.progress(QuizDomain::River).total_taken, 2);
}

#[test]
fn module_results_raise_the_curriculum_level() {
    let store = ProgressStore::new(MemoryStorage::new());
    assert_eq!(store.curriculum().level, 1);

    store.record_quiz_result(QuizDomain::Module, 9, 10, None);
    assert_eq!(store.curriculum().level, 2);
    assert_eq!(store.curriculum().level_name(), "基礎");

    store.record_quiz_result(QuizDomain::Prefecture, 10, 10, None);
    assert_eq!(store.curriculum().level, 2, "other domains do not count");
}
