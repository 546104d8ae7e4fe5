//! Lazily loaded lookup lists for selects and filters
//!
//! Each option source is fetched at most once per page session. A fetch runs
//! as its own task so that callers which only peek at the cache ([`OptionsCache::get`])
//! never wait, and callers that need the list ([`OptionsCache::load`]) share
//! whichever fetch is already in flight.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::error::{CoreError, CoreResult};

/// One selectable lookup value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Asynchronous provider of a lookup list
#[async_trait]
pub trait OptionSource: Send + Sync {
    async fn fetch(&self) -> CoreResult<Vec<SelectOption>>;
}

/// Option source reference type
pub type OptionSourceRef = Arc<dyn OptionSource>;

/// Load state of one lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

enum CacheEntry {
    Loading(Arc<Notify>),
    Ready(Arc<Vec<SelectOption>>),
    Failed(CoreError),
}

struct CacheInner {
    sources: BTreeMap<String, OptionSourceRef>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

/// Memoizing cache over a fixed set of named option sources
#[derive(Clone)]
pub struct OptionsCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for OptionsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsCache")
            .field("sources", &self.inner.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl OptionsCache {
    pub fn new(sources: BTreeMap<String, OptionSourceRef>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                sources,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registered lookup names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.sources.keys().map(String::as_str)
    }

    pub fn has_source(&self, name: &str) -> bool {
        self.inner.sources.contains_key(name)
    }

    fn source(&self, name: &str) -> CoreResult<OptionSourceRef> {
        self.inner
            .sources
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownOptionSource { name: name.to_string() })
    }

    pub fn status(&self, name: &str) -> CoreResult<OptionStatus> {
        self.source(name)?;
        let entries = self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(match entries.get(name) {
            None => OptionStatus::Idle,
            Some(CacheEntry::Loading(_)) => OptionStatus::Loading,
            Some(CacheEntry::Ready(_)) => OptionStatus::Ready,
            Some(CacheEntry::Failed(_)) => OptionStatus::Failed,
        })
    }

    /// Cached list, or an empty list while the first fetch is started in the background
    pub fn get(&self, name: &str) -> CoreResult<Arc<Vec<SelectOption>>> {
        let source = self.source(name)?;
        let mut entries = self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(name) {
            Some(CacheEntry::Ready(list)) => return Ok(list.clone()),
            Some(_) => return Ok(Arc::new(Vec::new())),
            None => {}
        }

        // Outside a runtime nothing can be started; the next load will fetch
        if let Ok(handle) = Handle::try_current() {
            let notify = Arc::new(Notify::new());
            entries.insert(name.to_string(), CacheEntry::Loading(notify.clone()));
            drop(entries);
            self.spawn_fetch(&handle, name, source, notify);
        }
        Ok(Arc::new(Vec::new()))
    }

    /// Wait for the list, sharing an in-flight fetch if there is one
    pub async fn load(&self, name: &str) -> CoreResult<Arc<Vec<SelectOption>>> {
        let source = self.source(name)?;
        loop {
            let notify = {
                let mut entries = self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner);
                match entries.get(name) {
                    Some(CacheEntry::Ready(list)) => return Ok(list.clone()),
                    Some(CacheEntry::Failed(error)) => return Err(error.clone()),
                    Some(CacheEntry::Loading(notify)) => notify.clone(),
                    None => {
                        let notify = Arc::new(Notify::new());
                        entries.insert(name.to_string(), CacheEntry::Loading(notify.clone()));
                        drop(entries);
                        self.spawn_fetch(&Handle::current(), name, source.clone(), notify.clone());
                        notify
                    }
                }
            };

            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.status(name)? == OptionStatus::Loading {
                notified.await;
            }
        }
    }

    /// Forget a ready or failed list so the next access fetches again
    pub fn invalidate(&self, name: &str) -> CoreResult<()> {
        self.source(name)?;
        let mut entries = self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(entries.get(name), Some(CacheEntry::Ready(_)) | Some(CacheEntry::Failed(_))) {
            entries.remove(name);
            log::debug!("Invalidated option source '{}'", name);
        }
        Ok(())
    }

    /// Invalidate, then load again
    pub async fn refresh(&self, name: &str) -> CoreResult<Arc<Vec<SelectOption>>> {
        self.invalidate(name)?;
        self.load(name).await
    }

    /// Start fetching every registered source without waiting
    pub fn preload(&self) {
        for name in self.inner.sources.keys() {
            let _ = self.get(name);
        }
    }

    fn spawn_fetch(&self, handle: &Handle, name: &str, source: OptionSourceRef, notify: Arc<Notify>) {
        let inner = self.inner.clone();
        let name = name.to_string();
        log::debug!("Fetching option source '{}'", name);
        handle.spawn(async move {
            let entry = match source.fetch().await {
                Ok(list) => {
                    log::debug!("Loaded {} options for '{}'", list.len(), name);
                    CacheEntry::Ready(Arc::new(list))
                }
                Err(error) => {
                    let error = match error {
                        CoreError::LookupFailed { .. } => error,
                        other => CoreError::LookupFailed {
                            source_name: name.clone(),
                            message: other.to_string(),
                        },
                    };
                    log::warn!("Option source '{}' failed: {}", name, error);
                    CacheEntry::Failed(error)
                }
            };
            inner
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(name, entry);
            notify.notify_waiters();
        });
    }
}
