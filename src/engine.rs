//! Serves the active [`RequestFilter`] and replaces it when the set of filter lists changes.
//!
//! Readers get the filter with [`Engine::filter`] and keep using that instance for as long as
//! they hold it. Rebuilds compile a complete new filter off to the side and install it with a
//! single pointer swap, so a reader never sees a half-built rule set.

use arc_swap::ArcSwap;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::lists::{parse_filter_lists, parse_rules, FilterList};
use crate::request_filter::{RequestFilter, RequestFilterOptions};

pub const DEFAULT_REBUILD_BATCH_SIZE: usize = 1000;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum EngineError {
    #[error("rebuild {0} was superseded by rebuild {1}")]
    Superseded(u64, u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub filter: RequestFilterOptions,
    /// Number of rule lines parsed between two yields of [`Engine::rebuild_chunked`].
    pub rebuild_batch_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            filter: RequestFilterOptions::default(),
            rebuild_batch_size: DEFAULT_REBUILD_BATCH_SIZE,
        }
    }
}

pub struct Engine {
    current: ArcSwap<RequestFilter>,
    /// Incremented by every rebuild. Only the latest rebuild may install its result.
    generation: AtomicU64,
    /// Serializes writers; readers never take it.
    install: Mutex<()>,
    options: EngineOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineOptions::default())
    }
}

impl Engine {
    /// An engine serving an empty rule set.
    pub fn new(options: EngineOptions) -> Engine {
        Engine {
            current: ArcSwap::from_pointee(RequestFilter::new(options.filter.clone())),
            generation: AtomicU64::new(0),
            install: Mutex::new(()),
            options,
        }
    }

    pub fn from_filter_lists(lists: &[FilterList], options: EngineOptions) -> Engine {
        let engine = Engine::new(options);
        // a freshly created engine has no concurrent rebuild to lose against
        let _ = engine.rebuild(lists);
        engine
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The filter currently served.
    pub fn filter(&self) -> Arc<RequestFilter> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn start_rebuild(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn check_superseded(&self, generation: u64) -> Result<(), EngineError> {
        let latest = self.generation();
        if latest != generation {
            info!("Discarding rebuild {}, superseded by rebuild {}", generation, latest);
            return Err(EngineError::Superseded(generation, latest));
        }
        Ok(())
    }

    fn install(&self, generation: u64, filter: RequestFilter) -> Result<(), EngineError> {
        let _guard = self.install.lock().unwrap_or_else(|e| e.into_inner());
        self.check_superseded(generation)?;
        info!(
            "Installing rebuild {} with {} rules",
            generation,
            filter.rules_count()
        );
        self.current.store(Arc::new(filter));
        Ok(())
    }

    /// Compiles `lists` in one go and installs the result, unless another rebuild started in
    /// the meantime.
    pub fn rebuild(&self, lists: &[FilterList]) -> Result<(), EngineError> {
        let generation = self.start_rebuild();
        let mut filter = RequestFilter::new(self.options.filter.clone());
        filter.add_rules(parse_filter_lists(lists));
        self.install(generation, filter)
    }

    /// Same as [`Engine::rebuild`], yielding to the runtime after every batch of rule lines.
    /// Stops early with [`EngineError::Superseded`] once a newer rebuild has started; the
    /// served filter is then left to the newer rebuild.
    pub async fn rebuild_chunked(&self, lists: Vec<FilterList>) -> Result<(), EngineError> {
        let generation = self.start_rebuild();
        let batch_size = self.options.rebuild_batch_size.max(1);
        let mut filter = RequestFilter::new(self.options.filter.clone());

        for list in &lists {
            for batch in list.rules.chunks(batch_size) {
                filter.add_rules(parse_rules(batch, list.id, list.script_source));
                tokio::task::yield_now().await;
                self.check_superseded(generation)?;
            }
        }

        self.install(generation, filter)
    }

    /// Applies `edit` to a copy of the served filter and installs the copy. Rebuilds in
    /// progress are not cancelled, so their result replaces the edit once installed.
    pub fn update<F>(&self, edit: F)
    where
        F: FnOnce(&mut RequestFilter),
    {
        let _guard = self.install.lock().unwrap_or_else(|e| e.into_inner());
        let mut filter = RequestFilter::clone(&self.current.load());
        edit(&mut filter);
        self.current.store(Arc::new(filter));
    }
}

#[cfg(test)]
#[path = "../tests/unit/engine.rs"]
mod unit_tests;
