use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;

use crate::{
    aliases::{AliasRegistry, AliasState},
    bookmarks::{BookmarkTree, Entry},
    config::{FailurePolicy, IndexConfig},
    errors::{AppError, AppResult},
    pool::{Outcome, WorkerPool},
    store::{DocumentStore, StoreError},
};

/// Suffix appended to the base name, one generation per second at most.
pub const GENERATION_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// One immutable, independently named set of indexed documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexGeneration {
    name: String,
}

impl IndexGeneration {
    pub fn for_time(base_name: &str, at: DateTime<Utc>) -> Self {
        IndexGeneration {
            name: format!("{base_name}-{}", at.format(GENERATION_TIME_FORMAT)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for IndexGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub id: String,
    pub name: String,
    pub url: String,
    pub reason: String,
}

/// Per-entry outcomes of one publish run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub generation: String,
    pub submitted: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failures: Vec<EntryFailure>,
}

impl PublishReport {
    /// Every submitted entry made it into the store.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0 && self.indexed == self.submitted
    }
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} indexed, {} failed, {} skipped ({} submitted)",
            self.generation,
            self.indexed,
            self.failures.len(),
            self.skipped,
            self.submitted
        )?;
        for failure in &self.failures {
            writeln!(
                f,
                "  ! {} [{}] {}: {}",
                failure.id, failure.url, failure.name, failure.reason
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub generation: IndexGeneration,
    pub report: PublishReport,
    pub promoted: bool,
}

/// Owns the lifecycle of index generations: creation, bulk indexing and
/// promotion behind the default alias.
pub struct IndexPublisher {
    store: Arc<dyn DocumentStore>,
    registry: AliasRegistry,
    settings: IndexConfig,
    progress: ProgressBar,
}

impl IndexPublisher {
    pub fn new(store: Arc<dyn DocumentStore>, settings: &IndexConfig) -> Self {
        IndexPublisher {
            registry: AliasRegistry::new(store.clone(), &settings.default_alias),
            store,
            settings: settings.clone(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn registry(&self) -> &AliasRegistry {
        &self.registry
    }

    /// Existing generations of this base name, oldest first.
    pub fn generations(&self) -> AppResult<Vec<String>> {
        let prefix = format!("{}-", self.settings.base_name);
        let mut names = self
            .store
            .index_names()
            .map_err(|err| AppError::store("list", "all indices", err))?
            .into_iter()
            .filter(|name| name.starts_with(&prefix))
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    pub fn create_generation(&self) -> AppResult<IndexGeneration> {
        self.create_generation_at(Utc::now())
    }

    /// Creates the index for the generation named after `at`.
    ///
    /// A name collision is not retried: two generations within the same
    /// second is a caller error.
    pub fn create_generation_at(&self, at: DateTime<Utc>) -> AppResult<IndexGeneration> {
        let generation = IndexGeneration::for_time(&self.settings.base_name, at);
        let name = generation.name();

        let exists = self
            .store
            .index_exists(name)
            .map_err(|err| AppError::store("look up", name, err))?;
        if exists {
            return Err(AppError::store(
                "create",
                name,
                StoreError::Rejected {
                    status: 409,
                    body: format!("index {name} already exists"),
                },
            ));
        }

        self.store
            .create_index(name)
            .map_err(|err| AppError::store("create", name, err))?;
        log::info!("created generation {name}");

        Ok(generation)
    }

    fn index_entry(&self, index: &str, entry: &Entry) -> Result<(), EntryFailure> {
        let failure = |reason: String| EntryFailure {
            id: entry.id.clone(),
            name: entry.name.clone(),
            url: entry.url.clone(),
            reason,
        };

        let document = entry.to_indexable().map_err(|err| failure(err.to_string()))?;
        let body = serde_json::to_value(&document).map_err(|err| failure(err.to_string()))?;

        self.store
            .index_document(index, &self.settings.document_type, &body)
            .map_err(|err| {
                log::warn!("{index}: failed to index entry {}: {err}", entry.id);
                failure(err.to_string())
            })
    }

    /// Indexes every entry of `tree` into `generation` through the worker
    /// pool.
    ///
    /// With [`FailurePolicy::Abort`] the first failed entry stops the run and
    /// the result is [`AppError::IndexingAborted`]. Documents already written
    /// stay in the generation.
    pub fn publish(
        &self,
        tree: &BookmarkTree,
        generation: &IndexGeneration,
    ) -> AppResult<PublishReport> {
        let span = tracing::info_span!("publish", generation = %generation);
        let _guard = span.enter();

        let index = generation.name();
        let total = tree.count().total();
        self.progress.set_length(total as u64);

        let pool = WorkerPool::new(self.settings.workers as usize)
            .abort_on_error(self.settings.failure_policy == FailurePolicy::Abort)
            .with_progress(self.progress.clone());

        log::info!(
            "indexing {total} entries into {index} with {} workers",
            pool.workers()
        );
        let mut result = pool.run(tree.entries(), |entry| self.index_entry(index, entry));
        self.progress.finish();

        result.outcomes.sort_by_key(|(seq, _)| *seq);

        let mut report = PublishReport {
            generation: index.to_string(),
            submitted: result.submitted,
            ..Default::default()
        };
        for (_, outcome) in result.outcomes {
            match outcome {
                Outcome::Done(()) => report.indexed += 1,
                Outcome::Failed(failure) => report.failures.push(failure),
                Outcome::Skipped => report.skipped += 1,
            }
        }

        if result.aborted {
            log::error!(
                "indexing of {index} aborted, {} entries indexed before the failure",
                report.indexed
            );
            return Err(AppError::IndexingAborted {
                report: Box::new(report),
            });
        }

        log::info!(
            "indexed {} of {} entries into {index}",
            report.indexed,
            report.submitted
        );
        Ok(report)
    }

    /// Makes `generation` the target of default search traffic.
    ///
    /// The very first generation is also bound to the base name itself,
    /// unless some other index already carries it. The result only reflects
    /// the default alias.
    pub fn promote_to_default(&self, generation: &str) -> AppResult<bool> {
        let generations = self.generations()?;
        if !generations.iter().any(|g| g == generation) {
            return Err(AppError::UnknownGeneration(generation.to_string()));
        }

        if generations.len() == 1 {
            log::info!("{generation} is the first generation");
            if !self
                .registry
                .add_alias(generation, &self.settings.base_name)?
            {
                log::warn!(
                    "{} is taken, {generation} is reachable through {} only",
                    self.settings.base_name,
                    self.settings.default_alias
                );
            }
        }

        self.registry.switch_default(generation)
    }

    pub fn delete(&self, generation: &str) -> AppResult<()> {
        let exists = self
            .store
            .index_exists(generation)
            .map_err(|err| AppError::store("look up", generation, err))?;
        if !exists {
            return Err(AppError::NotFound {
                kind: "generation",
                name: generation.to_string(),
            });
        }

        if self.registry.resolve(&self.settings.default_alias)?
            == AliasState::Bound(generation.to_string())
        {
            log::warn!(
                "{generation} holds {}, default search traffic will have no target",
                self.settings.default_alias
            );
        }

        self.store
            .delete_index(generation)
            .map_err(|err| AppError::store("delete", generation, err))?;
        log::info!("deleted generation {generation}");

        Ok(())
    }

    /// Creates a generation, indexes `tree` into it and promotes it when
    /// every entry was indexed.
    pub fn run(&self, tree: &BookmarkTree) -> AppResult<PublishOutcome> {
        let generation = self.create_generation()?;
        let report = self.publish(tree, &generation)?;

        let promoted = if report.is_complete() {
            self.promote_to_default(generation.name())?
        } else {
            log::warn!(
                "{generation} is incomplete ({} failed), leaving default alias untouched",
                report.failures.len()
            );
            false
        };

        Ok(PublishOutcome {
            generation,
            report,
            promoted,
        })
    }
}
