use std::sync::Arc;

use serde::Serialize;

use crate::{
    errors::{AppError, AppResult},
    store::DocumentStore,
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct AliasBinding {
    pub generation: String,
    pub alias: String,
}

/// Where an alias currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasState {
    Unbound,
    Bound(String),
    /// More than one generation carries the alias and callers must repair it
    Inconsistent(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub name: String,
    pub documents: u64,
    pub aliases: Vec<String>,
}

/// Alias directory of the store, with at most one generation per alias.
pub struct AliasRegistry {
    store: Arc<dyn DocumentStore>,
    default_alias: String,
}

impl AliasRegistry {
    pub fn new(store: Arc<dyn DocumentStore>, default_alias: &str) -> Self {
        AliasRegistry {
            store,
            default_alias: default_alias.to_string(),
        }
    }

    pub fn default_alias(&self) -> &str {
        &self.default_alias
    }

    pub fn list_aliases(&self) -> AppResult<Vec<AliasBinding>> {
        let table = self
            .store
            .list_aliases()
            .map_err(|err| AppError::store("list aliases of", "all indices", err))?;

        let mut bindings = table
            .into_iter()
            .flat_map(|(generation, aliases)| {
                aliases.into_iter().map(move |alias| AliasBinding {
                    generation: generation.clone(),
                    alias,
                })
            })
            .collect::<Vec<_>>();
        bindings.sort();

        Ok(bindings)
    }

    /// Sorted alias names, without duplicates.
    pub fn alias_names(&self) -> AppResult<Vec<String>> {
        let mut names = self
            .list_aliases()?
            .into_iter()
            .map(|binding| binding.alias)
            .collect::<Vec<_>>();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Generations currently carrying `alias`, sorted.
    pub fn bindings_for(&self, alias: &str) -> AppResult<Vec<String>> {
        Ok(self
            .list_aliases()?
            .into_iter()
            .filter(|binding| binding.alias == alias)
            .map(|binding| binding.generation)
            .collect())
    }

    pub fn resolve(&self, alias: &str) -> AppResult<AliasState> {
        let mut generations = self.bindings_for(alias)?;
        Ok(match generations.len() {
            0 => AliasState::Unbound,
            1 => AliasState::Bound(generations.remove(0)),
            _ => AliasState::Inconsistent(generations),
        })
    }

    /// Binds `alias` to `generation`.
    ///
    /// Returns `false` without touching the store when the alias already
    /// points somewhere else.
    pub fn add_alias(&self, generation: &str, alias: &str) -> AppResult<bool> {
        let current = self.bindings_for(alias)?;
        if current.iter().any(|g| g != generation) {
            log::warn!(
                "alias {alias} already points to [{}], not binding it to {generation}",
                current.join(", ")
            );
            return Ok(false);
        }
        if !current.is_empty() {
            return Ok(true);
        }

        log::info!("binding alias {alias} to {generation}");
        self.store
            .add_alias(generation, alias)
            .map_err(|err| AppError::store("add alias to", generation, err))
    }

    pub fn remove_alias(&self, generation: &str, alias: &str) -> AppResult<bool> {
        if !self.bindings_for(alias)?.iter().any(|g| g == generation) {
            return Err(AppError::NotFound {
                kind: "alias",
                name: format!("{alias} on {generation}"),
            });
        }

        log::info!("removing alias {alias} from {generation}");
        self.store
            .remove_alias(generation, alias)
            .map_err(|err| AppError::store("remove alias from", generation, err))
    }

    /// Removes `alias` from every generation carrying it.
    pub fn unalias(&self, alias: &str) -> AppResult<usize> {
        let generations = self.bindings_for(alias)?;
        for generation in &generations {
            log::info!("removing alias {alias} from {generation}");
            self.store
                .remove_alias(generation, alias)
                .map_err(|err| AppError::store("remove alias from", generation.as_str(), err))?;
        }
        Ok(generations.len())
    }

    /// Moves the default alias onto `generation`.
    ///
    /// The store offers no atomic swap here: old bindings are removed first,
    /// then the new one is added. A failed add after a successful removal
    /// surfaces as [`AppError::PartialSwap`].
    pub fn switch_default(&self, generation: &str) -> AppResult<bool> {
        let exists = self
            .store
            .index_exists(generation)
            .map_err(|err| AppError::store("look up", generation, err))?;
        if !exists {
            return Err(AppError::UnknownGeneration(generation.to_string()));
        }

        let alias = self.default_alias.as_str();
        let current = self.bindings_for(alias)?;

        let mut removed = vec![];
        for holder in current.iter().filter(|g| g.as_str() != generation) {
            log::info!("removing alias {alias} from {holder}");
            if let Err(err) = self.store.remove_alias(holder, alias) {
                if removed.is_empty() {
                    return Err(AppError::store("remove alias from", holder.as_str(), err));
                }
                return Err(AppError::PartialSwap {
                    alias: alias.to_string(),
                    generation: generation.to_string(),
                    removed,
                    source: err,
                });
            }
            removed.push(holder.clone());
        }

        if current.iter().any(|g| g == generation) {
            log::info!("alias {alias} already bound to {generation}");
            return Ok(true);
        }

        log::info!("binding alias {alias} to {generation}");
        match self.store.add_alias(generation, alias) {
            Ok(ack) => Ok(ack),
            Err(err) if removed.is_empty() => {
                Err(AppError::store("add alias to", generation, err))
            }
            Err(err) => Err(AppError::PartialSwap {
                alias: alias.to_string(),
                generation: generation.to_string(),
                removed,
                source: err,
            }),
        }
    }

    /// Every index with its document count and aliases.
    pub fn summaries(&self) -> AppResult<Vec<IndexSummary>> {
        let table = self
            .store
            .list_aliases()
            .map_err(|err| AppError::store("list aliases of", "all indices", err))?;
        let names = self
            .store
            .index_names()
            .map_err(|err| AppError::store("list", "all indices", err))?;

        let mut summaries = vec![];
        for name in names {
            let documents = self
                .store
                .count(&name)
                .map_err(|err| AppError::store("count documents of", name.as_str(), err))?;
            summaries.push(IndexSummary {
                aliases: table.get(&name).cloned().unwrap_or_default(),
                documents,
                name,
            });
        }

        Ok(summaries)
    }
}
