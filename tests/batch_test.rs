//! Batch runner with scripted generators and stores.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use copysmith::batch::{BatchOptions, BatchRunner, JsonFileStore};
use copysmith::{
    CopysmithError, DescriptionField, DescriptionGenerator, DescriptionStore, ErrorKind,
    GenerationOutcome, Product, Result, Sleeper,
};

// ============================================================================
// Mocks
// ============================================================================

/// Answers from a queue; once empty, echoes the token budget.
#[derive(Default)]
struct ScriptedGenerator {
    queue: Mutex<VecDeque<GenerationOutcome>>,
    prompts: Mutex<Vec<(String, u32)>>,
}

impl ScriptedGenerator {
    fn with(outcomes: Vec<GenerationOutcome>) -> Self {
        Self {
            queue: Mutex::new(outcomes.into()),
            prompts: Mutex::default(),
        }
    }

    fn prompts(&self) -> Vec<(String, u32)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DescriptionGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> GenerationOutcome {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), max_tokens));
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| GenerationOutcome::success(format!("generated ({max_tokens})")))
    }
}

#[derive(Default)]
struct MemoryStore {
    saved: Mutex<Vec<(u64, DescriptionField, String)>>,
    fail: bool,
}

impl MemoryStore {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn saved(&self) -> Vec<(u64, DescriptionField, String)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl DescriptionStore for MemoryStore {
    async fn save(&self, product_id: u64, field: DescriptionField, text: &str) -> Result<()> {
        if self.fail {
            return Err(CopysmithError::Storage("disk full".into()));
        }
        self.saved
            .lock()
            .unwrap()
            .push((product_id, field, text.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

fn products() -> Vec<Product> {
    vec![
        Product::new(1, "Oak Table").attribute("Material", "Oak"),
        Product::new(2, "Linen Shirt"),
    ]
}

const LEAKED: &str = "user_abcdefghijklmnopqrstuvwxyz";

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn processes_full_then_short_for_each_product() {
    let generator = ScriptedGenerator::default();
    let store = MemoryStore::default();

    let report = BatchRunner::new(&generator, &store)
        .with_sleeper(Arc::new(RecordingSleeper::default()))
        .run(&products())
        .await;

    assert_eq!(report.processed, 4);
    assert_eq!(report.succeeded(), 4);
    let order: Vec<_> = report
        .results
        .iter()
        .map(|r| (r.product_id, r.field))
        .collect();
    assert_eq!(
        order,
        vec![
            (1, DescriptionField::Full),
            (1, DescriptionField::Short),
            (2, DescriptionField::Full),
            (2, DescriptionField::Short),
        ]
    );

    let budgets: Vec<_> = generator.prompts().iter().map(|(_, n)| *n).collect();
    assert_eq!(budgets, vec![500, 200, 500, 200]);
    assert_eq!(store.saved().len(), 4);
    assert!(report.results.iter().all(|r| r.saved));
}

#[tokio::test]
async fn short_prompt_sees_generated_full_description() {
    let generator = ScriptedGenerator::with(vec![GenerationOutcome::success(
        "Solid oak, seats six.",
    )]);
    let store = MemoryStore::default();

    BatchRunner::new(&generator, &store)
        .run(&products()[..1])
        .await;

    let prompts = generator.prompts();
    assert!(prompts[0].0.contains("\"Oak Table\""));
    assert!(prompts[1].0.contains("Solid oak, seats six."));
}

#[tokio::test]
async fn failed_field_does_not_stop_the_batch() {
    let generator = ScriptedGenerator::with(vec![
        CopysmithError::from_status(500, Some("boom")).into(),
    ]);
    let store = MemoryStore::default();

    let report = BatchRunner::new(&generator, &store)
        .run(&products())
        .await;

    assert_eq!(report.processed, 4);
    assert_eq!(report.succeeded(), 3);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].product_id, 1);
    assert_eq!(failures[0].field, DescriptionField::Full);
    assert!(!failures[0].saved);
    assert_eq!(store.saved().len(), 3);
}

#[tokio::test]
async fn identifier_text_is_requested_again() {
    let generator = ScriptedGenerator::with(vec![
        GenerationOutcome::success(LEAKED),
        GenerationOutcome::success(LEAKED),
        GenerationOutcome::success("Real description"),
    ]);
    let store = MemoryStore::default();
    let sleeper = Arc::new(RecordingSleeper::default());

    let report = BatchRunner::new(&generator, &store)
        .with_sleeper(sleeper.clone())
        .run(&products()[..1])
        .await;

    assert_eq!(report.results[0].outcome.text(), Some("Real description"));
    assert_eq!(
        *sleeper.delays.lock().unwrap(),
        vec![Duration::from_millis(1500); 2]
    );
    // 3 for the full description, 1 for the short one.
    assert_eq!(generator.prompts().len(), 4);
}

#[tokio::test]
async fn identifier_text_is_never_saved() {
    let generator = ScriptedGenerator::with(vec![GenerationOutcome::success(LEAKED); 4]);
    let store = MemoryStore::default();

    let report = BatchRunner::new(&generator, &store)
        .with_sleeper(Arc::new(RecordingSleeper::default()))
        .run(&products()[..1])
        .await;

    let full = &report.results[0];
    assert_eq!(full.outcome.error_kind(), Some(ErrorKind::UserIdResponse));
    assert!(!full.saved);
    assert!(
        store
            .saved()
            .iter()
            .all(|(_, field, _)| *field == DescriptionField::Short)
    );
}

#[tokio::test]
async fn auto_save_off_keeps_store_untouched() {
    let generator = ScriptedGenerator::default();
    let store = MemoryStore::default();

    let report = BatchRunner::new(&generator, &store)
        .options(BatchOptions {
            auto_save: false,
            ..BatchOptions::default()
        })
        .run(&products())
        .await;

    assert_eq!(report.succeeded(), 4);
    assert!(store.saved().is_empty());
    assert!(report.results.iter().all(|r| !r.saved));
}

#[tokio::test]
async fn save_failure_is_reported_as_storage_error() {
    let generator = ScriptedGenerator::default();
    let store = MemoryStore::failing();

    let report = BatchRunner::new(&generator, &store)
        .run(&products()[..1])
        .await;

    assert_eq!(report.succeeded(), 0);
    assert!(
        report
            .failures()
            .all(|r| r.outcome.error_kind() == Some(ErrorKind::StorageError))
    );
}

// ============================================================================
// JSON file store
// ============================================================================

#[tokio::test]
async fn json_store_persists_by_product_and_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("descriptions.json");
    let store = JsonFileStore::new(&path);

    store.save(7, DescriptionField::Full, "Long text").await.unwrap();
    store.save(7, DescriptionField::Short, "Short").await.unwrap();
    store.save(8, DescriptionField::Full, "Other").await.unwrap();
    store.save(7, DescriptionField::Full, "Rewritten").await.unwrap();

    let stored = JsonFileStore::load(&path).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored["7"]["full_description"], "Rewritten");
    assert_eq!(stored["7"]["short_description"], "Short");
    assert_eq!(stored["8"]["full_description"], "Other");
}

#[test]
fn json_store_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let stored = JsonFileStore::load(&dir.path().join("absent.json")).unwrap();
    assert!(stored.is_empty());
}

#[test]
fn json_store_corrupt_file_is_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{not json").unwrap();

    let err = JsonFileStore::load(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageError);
}

#[tokio::test]
async fn batch_run_writes_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("out.json"));
    let generator = ScriptedGenerator::default();

    BatchRunner::new(&generator, &store)
        .run(&products())
        .await;

    let stored = JsonFileStore::load(store.path()).unwrap();
    assert_eq!(stored["2"]["short_description"], "generated (200)");
}

#[tokio::test]
async fn json_store_ignores_leftover_tmp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    let store = JsonFileStore::new(&path);
    store.save(1, DescriptionField::Full, "Kept").await.unwrap();

    // A save killed before its rename leaves a half-written tmp file behind.
    std::fs::write(dir.path().join("out.json.tmp"), "{\"1\": {\"full_desc").unwrap();
    assert_eq!(JsonFileStore::load(&path).unwrap()["1"]["full_description"], "Kept");

    store.save(2, DescriptionField::Short, "Next").await.unwrap();
    let stored = JsonFileStore::load(&path).unwrap();
    assert_eq!(stored["1"]["full_description"], "Kept");
    assert_eq!(stored["2"]["short_description"], "Next");
    assert!(!dir.path().join("out.json.tmp").exists());
}

#[tokio::test]
async fn json_store_failed_write_keeps_previous_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    let store = JsonFileStore::new(&path);
    store.save(1, DescriptionField::Full, "Kept").await.unwrap();

    // A directory in the tmp file's place makes the write fail.
    std::fs::create_dir(dir.path().join("out.json.tmp")).unwrap();
    let err = store
        .save(1, DescriptionField::Full, "Lost")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageError);

    let stored = JsonFileStore::load(&path).unwrap();
    assert_eq!(stored["1"]["full_description"], "Kept");
}

#[tokio::test]
async fn per_field_toggles_limit_what_is_saved() {
    let generator = ScriptedGenerator::default();
    let store = MemoryStore::default();

    let report = BatchRunner::new(&generator, &store)
        .options(BatchOptions {
            update_full: false,
            ..BatchOptions::default()
        })
        .run(&products())
        .await;

    assert_eq!(report.succeeded(), 4);
    let saved = store.saved();
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|(_, field, _)| *field == DescriptionField::Short));
    let saved_flags: Vec<_> = report.results.iter().map(|r| r.saved).collect();
    assert_eq!(saved_flags, vec![false, true, false, true]);
}

#[test]
fn batch_options_follow_settings() {
    let settings: copysmith::Settings = toml::from_str(
        r#"
            [batch]
            update_short = false
            identifier_retries = 1
        "#,
    )
    .unwrap();
    let options = BatchOptions::from(&settings.batch);

    assert!(options.saves(DescriptionField::Full));
    assert!(!options.saves(DescriptionField::Short));
    assert_eq!(options.identifier_retries, 1);

    let off = BatchOptions {
        auto_save: false,
        ..BatchOptions::default()
    };
    assert!(!off.saves(DescriptionField::Full));
}
