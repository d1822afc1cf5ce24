//! Sequential batch generation over a product catalog.
//!
//! Items are processed strictly one after another: a product's full
//! description, then its short description, then the next product. The
//! upstream is rate limited, so there is no fan-out.
//!
//! A failed field never stops the batch; it is recorded in the
//! [`BatchReport`] and the runner moves on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::BatchSettings;
use crate::detect::is_leaked_identifier;
use crate::prompt::{full_description_prompt, short_description_prompt};
use crate::retry::{Sleeper, TokioSleeper};
use crate::traits::{DescriptionGenerator, DescriptionStore};
use crate::{CopysmithError, DescriptionField, GenerationOutcome, Product, Result, telemetry};

/// Knobs for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Save each successful description through the store.
    pub auto_save: bool,
    /// Save generated full descriptions (only with `auto_save`).
    pub update_full: bool,
    /// Save generated short descriptions (only with `auto_save`).
    pub update_short: bool,
    /// Extra requests when a "successful" result still looks like an
    /// identifier (the client serves such text once its own retries run out).
    pub identifier_retries: u32,
    /// Pause before each of those extra requests.
    pub identifier_retry_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            auto_save: true,
            update_full: true,
            update_short: true,
            identifier_retries: 3,
            identifier_retry_delay: Duration::from_millis(1500),
        }
    }
}

impl BatchOptions {
    /// Whether a generated `field` goes to the store.
    pub fn saves(&self, field: DescriptionField) -> bool {
        self.auto_save
            && match field {
                DescriptionField::Full => self.update_full,
                DescriptionField::Short => self.update_short,
            }
    }
}

impl From<&BatchSettings> for BatchOptions {
    fn from(settings: &BatchSettings) -> Self {
        Self {
            auto_save: settings.auto_save,
            update_full: settings.update_full,
            update_short: settings.update_short,
            identifier_retries: settings.identifier_retries,
            ..Self::default()
        }
    }
}

/// Result of one field of one product.
#[derive(Debug, Clone, Serialize)]
pub struct FieldResult {
    pub product_id: u64,
    pub field: DescriptionField,
    pub outcome: GenerationOutcome,
    pub saved: bool,
}

/// Everything a batch run produced, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Number of fields attempted, successful or not.
    pub processed: usize,
    pub results: Vec<FieldResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FieldResult> {
        self.results.iter().filter(|r| !r.outcome.is_success())
    }

    fn push(&mut self, result: FieldResult) {
        self.processed += 1;
        self.results.push(result);
    }
}

/// Drives a [`DescriptionGenerator`] over many products.
pub struct BatchRunner<'a> {
    generator: &'a dyn DescriptionGenerator,
    store: &'a dyn DescriptionStore,
    sleeper: Arc<dyn Sleeper>,
    options: BatchOptions,
}

impl<'a> BatchRunner<'a> {
    pub fn new(generator: &'a dyn DescriptionGenerator, store: &'a dyn DescriptionStore) -> Self {
        Self {
            generator,
            store,
            sleeper: Arc::new(TokioSleeper),
            options: BatchOptions::default(),
        }
    }

    pub fn options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Process every product in order.
    pub async fn run(&self, products: &[Product]) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, product) in products.iter().enumerate() {
            info!(
                product_id = product.id,
                position = index + 1,
                total = products.len(),
                "processing product"
            );
            let full = self.process_field(product, DescriptionField::Full, None).await;
            let full_text = full.outcome.text().map(str::to_owned);
            report.push(full);

            let short = self
                .process_field(product, DescriptionField::Short, full_text.as_deref())
                .await;
            report.push(short);
        }
        info!(
            processed = report.processed,
            succeeded = report.succeeded(),
            "batch finished"
        );
        report
    }

    async fn process_field(
        &self,
        product: &Product,
        field: DescriptionField,
        full_description: Option<&str>,
    ) -> FieldResult {
        let prompt = match field {
            DescriptionField::Full => full_description_prompt(product),
            DescriptionField::Short => short_description_prompt(product, full_description),
        };

        let mut outcome = self.generator.generate(&prompt, field.max_tokens()).await;
        let mut extra_requests = 0;
        while outcome.text().is_some_and(is_leaked_identifier) {
            if extra_requests >= self.options.identifier_retries {
                outcome = CopysmithError::UserIdResponse { raw: None }.into();
                break;
            }
            extra_requests += 1;
            warn!(
                product_id = product.id,
                field = field.as_str(),
                extra_requests,
                "identifier returned as description, requesting again"
            );
            self.sleeper.sleep(self.options.identifier_retry_delay).await;
            outcome = self.generator.generate(&prompt, field.max_tokens()).await;
        }

        let mut saved = false;
        if self.options.saves(field)
            && let Some(text) = outcome.text()
        {
            match self.store.save(product.id, field, text).await {
                Ok(()) => saved = true,
                Err(e) => {
                    warn!(product_id = product.id, field = field.as_str(), error = %e, "failed to save description");
                    outcome = e.into();
                }
            }
        }

        let status = match &outcome {
            GenerationOutcome::Success { .. } => "ok",
            GenerationOutcome::Failure { kind, message } => {
                warn!(
                    product_id = product.id,
                    field = field.as_str(),
                    kind = kind.as_str(),
                    message = %message,
                    "description generation failed"
                );
                kind.as_str()
            }
        };
        metrics::counter!(telemetry::BATCH_FIELDS_TOTAL,
            "field" => field.as_str(),
            "status" => status,
        )
        .increment(1);

        FieldResult {
            product_id: product.id,
            field,
            outcome,
            saved,
        }
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Saved descriptions keyed by product id, then by field name.
pub type StoredDescriptions = BTreeMap<String, BTreeMap<String, String>>;

/// [`DescriptionStore`] backed by a single JSON file.
///
/// Layout: `{ "<product id>": { "full_description": ..., "short_description": ... } }`.
/// Every save rewrites the file through a tmp file and a rename, so an
/// interrupted save leaves the previous contents intact.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a store file; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<StoredDescriptions> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredDescriptions::new());
            }
            Err(e) => {
                return Err(CopysmithError::Storage(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            CopysmithError::Storage(format!("failed to parse {}: {e}", path.display()))
        })
    }

    fn write(&self, stored: &StoredDescriptions) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                CopysmithError::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(stored)
            .map_err(|e| CopysmithError::Storage(format!("failed to serialize store: {e}")))?;

        // Write to a sibling tmp file, then rename over the store.
        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, json).map_err(|e| {
            CopysmithError::Storage(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            CopysmithError::Storage(format!(
                "failed to rename {} to {}: {e}",
                tmp_path.display(),
                self.path.display()
            ))
        })
    }

    /// `<store path>.tmp`, next to the store so the rename stays on one filesystem.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl DescriptionStore for JsonFileStore {
    async fn save(&self, product_id: u64, field: DescriptionField, text: &str) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CopysmithError::Storage("store lock poisoned".into()))?;
        let mut stored = Self::load(&self.path)?;
        stored
            .entry(product_id.to_string())
            .or_default()
            .insert(field.as_str().to_string(), text.to_string());
        self.write(&stored)
    }
}
