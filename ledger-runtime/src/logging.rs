//! Logging service with a runtime-adjustable level.
//!
//! The first [`LoggingService::install`] in a process sets the global fmt
//! subscriber behind a reloadable [`EnvFilter`]. Later installs share that
//! filter, so `setLogLevel` on any container changes what is logged.

use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::error::{Result, RuntimeError};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Clone)]
struct GlobalFilter {
    handle: FilterHandle,
    level: Arc<RwLock<String>>,
}

/// `None` when another subscriber was already global at first install.
static GLOBAL_FILTER: OnceLock<Option<GlobalFilter>> = OnceLock::new();

#[derive(Clone)]
pub struct LoggingService {
    level: Arc<RwLock<String>>,
    reload: Option<FilterHandle>,
}

impl LoggingService {
    /// Track a level without owning the global subscriber.
    pub fn new(level: &str) -> Self {
        Self {
            level: Arc::new(RwLock::new(level.to_string())),
            reload: None,
        }
    }

    /// Install the global subscriber, or join the one an earlier install set.
    /// Falls back to [`LoggingService::new`] when a foreign subscriber owns
    /// the process.
    pub fn install(level: &str) -> Result<Self> {
        let filter = parse_filter(level)?;
        let global = GLOBAL_FILTER.get_or_init(|| {
            let (filter_layer, handle) = reload::Layer::new(filter);
            tracing_subscriber::registry()
                .with(filter_layer)
                .with(fmt::layer())
                .try_init()
                .ok()
                .map(|()| GlobalFilter {
                    handle,
                    level: Arc::new(RwLock::new(level.to_string())),
                })
        });
        match global {
            Some(global) => Ok(Self {
                level: global.level.clone(),
                reload: Some(global.handle.clone()),
            }),
            None => {
                debug!("Global subscriber owned elsewhere; log level is recorded only");
                Ok(Self::new(level))
            }
        }
    }

    /// True when `set_level` reloads the process filter.
    pub fn is_installed(&self) -> bool {
        self.reload.is_some()
    }

    /// The filter the global subscriber is applying right now.
    pub fn active_filter(&self) -> Option<String> {
        self.reload
            .as_ref()
            .and_then(|handle| handle.with_current(|filter| filter.to_string()).ok())
    }

    pub async fn level(&self) -> String {
        self.level.read().await.clone()
    }

    pub async fn set_level(&self, level: &str) -> Result<()> {
        let filter = parse_filter(level)?;
        if let Some(handle) = &self.reload {
            handle
                .reload(filter)
                .map_err(|e| RuntimeError::Logging(e.to_string()))?;
        }
        *self.level.write().await = level.to_string();
        info!(level = %level, "Log level changed");
        Ok(())
    }
}

impl std::fmt::Debug for LoggingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingService")
            .field("installed", &self.reload.is_some())
            .finish()
    }
}

fn parse_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).map_err(|e| RuntimeError::Logging(format!("invalid level '{level}': {e}")))
}
