//! Tracker controller
//!
//! The one application-state object. It owns the configuration, the local
//! state file, the catalog loader and the remote store handle; the CLI and the
//! web server both drive it and nothing else reaches those pieces directly.

use crate::catalog::{Catalog, CatalogLoader, MangaSource, TrackedItem};
use crate::config::{env_token, Config};
use crate::error::{TrackerError, TrackerResult};
use crate::remote::{
    read_remote_json, update_remote_json, update_remote_json_array, ContentStore, Credentials,
    GitHubContentStore, JsonShape, UpdateOutcome, VersionTag,
};
use crate::state::{LocalStore, ReadMap, ReadState, ThemeSettings};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A source the user wants the scraper to start following
#[derive(Debug, Clone, Deserialize)]
pub struct NewSource {
    pub name: String,
    pub url: String,
    pub selector: String,
    #[serde(default)]
    pub use_xpath: bool,
}

/// Everything needed to draw the tracker
#[derive(Debug, Clone)]
pub struct TrackerView {
    pub catalog: Catalog,
    pub read: ReadState,
    pub theme: ThemeSettings,
}

/// One catalog item as the user currently sees it
#[derive(Debug, Clone, Serialize)]
pub struct MangaEntry {
    /// `isRead` holds the effective flag
    #[serde(flatten)]
    pub item: TrackedItem,
    pub pending: bool,
}

impl TrackerView {
    pub fn entries(&self) -> Vec<MangaEntry> {
        self.catalog
            .items
            .iter()
            .map(|item| MangaEntry {
                item: item.clone().read(self.read.is_read(item)),
                pending: self.read.is_pending(item.id),
            })
            .collect()
    }
}

/// Result of a flush
#[derive(Debug, Clone, Default)]
pub struct FlushOutcome {
    /// Entries committed by this flush
    pub flushed: ReadMap,
    /// Pending entries left afterwards (changed while the flush ran)
    pub remaining: ReadMap,
    /// Version of the read-status file after the write; `None` if nothing was sent
    pub version: Option<VersionTag>,
}

/// Application controller
pub struct Tracker {
    config: Config,
    local: LocalStore,
    loader: CatalogLoader,
    remote: Option<Arc<dyn ContentStore>>,
    token_override: Option<String>,
}

impl Tracker {
    /// Build a tracker backed by the configured GitHub repository
    ///
    /// Without `github.owner`/`github.repo` the tracker still works locally;
    /// remote operations then fail with a configuration error.
    pub fn open(config: Config) -> TrackerResult<Self> {
        let remote: Option<Arc<dyn ContentStore>> =
            match GitHubContentStore::new(config.github.store_config()) {
                Ok(store) => Some(Arc::new(store)),
                Err(TrackerError::Config(reason)) => {
                    tracing::debug!(%reason, "No remote repository configured");
                    None
                }
                Err(e) => return Err(e),
            };
        Self::build(config, remote)
    }

    /// Build a tracker on an explicit content store
    pub fn with_store(config: Config, store: Arc<dyn ContentStore>) -> TrackerResult<Self> {
        Self::build(config, Some(store))
    }

    fn build(config: Config, remote: Option<Arc<dyn ContentStore>>) -> TrackerResult<Self> {
        let local = LocalStore::open(config.state.dir_path())?;
        let loader = CatalogLoader::new(
            config.catalog.catalog_source(),
            config.catalog.timeout_secs,
        )?;

        Ok(Self {
            config,
            local,
            loader,
            remote,
            token_override: None,
        })
    }

    /// Use `token` ahead of every other token source
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token_override = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    fn remote(&self) -> TrackerResult<&dyn ContentStore> {
        self.remote.as_deref().ok_or_else(|| {
            TrackerError::Config("github.owner and github.repo must be set".into())
        })
    }

    /// Resolve the token: override, environment, local state, config file
    pub fn credentials(&self) -> TrackerResult<Credentials> {
        if let Some(token) = &self.token_override {
            return Ok(Credentials::new(token.as_str()));
        }
        if let Some(token) = env_token() {
            return Ok(Credentials::new(token));
        }
        if let Some(token) = self.local.token()? {
            return Ok(Credentials::new(token));
        }
        Ok(self
            .config
            .config_token()
            .map(Credentials::new)
            .unwrap_or_default())
    }

    // ============================================
    // Catalog and read state
    // ============================================

    pub async fn load_catalog(&self) -> Catalog {
        self.loader.load().await
    }

    pub async fn view(&self) -> TrackerResult<TrackerView> {
        let catalog = self.load_catalog().await;
        Ok(TrackerView {
            catalog,
            read: self.local.read_state()?,
            theme: self.local.theme()?,
        })
    }

    /// Record an explicit read flag for `id`
    pub fn mark(&self, id: u64, is_read: bool) -> TrackerResult<ReadMap> {
        let pending = self.local.record_change(id, is_read)?;
        tracing::debug!(id, is_read, pending = pending.len(), "Recorded read change");
        Ok(pending)
    }

    /// Flip the effective read flag of a catalog item
    pub async fn toggle(&self, id: u64) -> TrackerResult<bool> {
        let catalog = self.load_catalog().await;
        let item = catalog
            .get(id)
            .ok_or_else(|| TrackerError::NotFound(format!("manga {}", id)))?;

        let is_read = self.local.toggle(id, item.is_read)?;
        tracing::debug!(id, is_read, "Toggled read flag");
        Ok(is_read)
    }

    pub fn pending(&self) -> TrackerResult<ReadMap> {
        self.local.pending()
    }

    /// Commit pending read changes to the read-status file
    ///
    /// Pending entries are only cleared once the write has succeeded. On any
    /// error local state is left exactly as it was.
    pub async fn flush(&self) -> TrackerResult<FlushOutcome> {
        let pending = self.local.pending()?;
        if pending.is_empty() {
            tracing::info!("No pending read changes to commit");
            return Ok(FlushOutcome::default());
        }

        let store = self.remote()?;
        let credentials = self.credentials()?;
        let message = format!("Update read status for {} manga", pending.len());

        let outcome = update_remote_json(
            store,
            &self.config.github.read_status_path,
            JsonShape::Object,
            self.config.github.malformed_policy,
            &message,
            &credentials,
            |value| {
                if let Value::Object(map) = value {
                    for (id, is_read) in &pending {
                        map.insert(id.to_string(), Value::Bool(*is_read));
                    }
                }
                Ok(())
            },
        )
        .await?;

        let remaining = self.local.settle_flushed(&pending)?;
        tracing::info!(
            flushed = pending.len(),
            remaining = remaining.len(),
            version = %outcome.version,
            "Read status committed"
        );

        Ok(FlushOutcome {
            flushed: pending,
            remaining,
            version: Some(outcome.version),
        })
    }

    // ============================================
    // Source list
    // ============================================

    pub async fn list_sources(&self) -> TrackerResult<Vec<MangaSource>> {
        let store = self.remote()?;
        let credentials = self.credentials()?;
        let path = &self.config.github.sources_path;

        let (value, _) = read_remote_json(
            store,
            path,
            JsonShape::Array,
            self.config.github.malformed_policy,
            &credentials,
        )
        .await?;

        let records = match value {
            Value::Array(records) => records,
            _ => Vec::new(),
        };

        let mut sources = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<MangaSource>(record) {
                Ok(source) => sources.push(source),
                Err(e) => tracing::warn!(path = %path, index, error = %e, "Skipping unreadable source record"),
            }
        }
        Ok(sources)
    }

    /// Append a source with the next free id
    ///
    /// The id is computed from the file contents read in the same update, so
    /// two concurrent adds cannot both claim it: one of them conflicts.
    pub async fn add_source(&self, new: NewSource) -> TrackerResult<MangaSource> {
        let name = required("name", &new.name)?;
        let url = required("url", &new.url)?;
        let selector = required("selector", &new.selector)?;

        let store = self.remote()?;
        let credentials = self.credentials()?;
        let message = format!("Add manga: {}", name);

        let mut added = None;
        update_remote_json_array(
            store,
            &self.config.github.sources_path,
            self.config.github.malformed_policy,
            &message,
            &credentials,
            |records| {
                let next_id = records
                    .iter()
                    .filter_map(|r| r.get("id").and_then(Value::as_u64))
                    .max()
                    .map_or(1, |max| max + 1);

                let source = MangaSource {
                    id: next_id,
                    name,
                    url,
                    selector,
                    use_xpath: new.use_xpath,
                    is_active: true,
                };
                records.push(serde_json::to_value(&source)?);
                added = Some(source);
                Ok(())
            },
        )
        .await?;

        let source = added.ok_or_else(|| {
            TrackerError::Validation("source list update did not add a record".into())
        })?;
        tracing::info!(id = source.id, name = %source.name, "Source added");
        Ok(source)
    }

    /// Remove the source with `id`; nothing is written if it does not exist
    pub async fn remove_source(&self, id: u64) -> TrackerResult<UpdateOutcome> {
        let store = self.remote()?;
        let credentials = self.credentials()?;
        let path = &self.config.github.sources_path;
        let message = format!("Remove manga: {}", id);

        let outcome = update_remote_json_array(
            store,
            path,
            self.config.github.malformed_policy,
            &message,
            &credentials,
            |records| {
                let before = records.len();
                records.retain(|r| r.get("id").and_then(Value::as_u64) != Some(id));
                if records.len() == before {
                    return Err(TrackerError::NotFound(format!("source {} in {}", id, path)));
                }
                Ok(())
            },
        )
        .await?;

        tracing::info!(id, "Source removed");
        Ok(outcome)
    }

    // ============================================
    // Preferences
    // ============================================

    pub fn theme(&self) -> TrackerResult<ThemeSettings> {
        self.local.theme()
    }

    /// Update either theme; `None` leaves that one unchanged
    pub fn set_theme(
        &self,
        accent: Option<&str>,
        background: Option<&str>,
    ) -> TrackerResult<ThemeSettings> {
        if let Some(accent) = accent {
            self.local.set_accent_theme(accent)?;
        }
        if let Some(background) = background {
            self.local.set_background_theme(background)?;
        }
        self.local.theme()
    }

    pub fn set_token(&self, token: &str) -> TrackerResult<()> {
        self.local.set_token(token)?;
        tracing::info!("GitHub token stored");
        Ok(())
    }

    pub fn clear_token(&self) -> TrackerResult<()> {
        self.local.clear_token()?;
        tracing::info!("GitHub token cleared");
        Ok(())
    }
}

fn required(field: &str, value: &str) -> TrackerResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TrackerError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}
