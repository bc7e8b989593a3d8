//! Durable local state
//!
//! A single JSON object on disk, keyed like browser local storage. Nothing is
//! cached: every access reads the file under the mutex, so several processes
//! sharing a state directory see each other's changes. A mutation parses the
//! current file, applies the change, writes a temp file and renames it into
//! place before the lock is released. A failed write leaves the file untouched.

use super::types::{ReadMap, ReadState, ThemeSettings};
use crate::error::{TrackerError, TrackerResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const READ_STATUSES_KEY: &str = "readStatuses";
pub const PENDING_CHANGES_KEY: &str = "pendingReadChanges";
pub const ACCENT_THEME_KEY: &str = "mangaFetcherAccentTheme";
pub const BG_THEME_KEY: &str = "mangaFetcherBgTheme";
pub const TOKEN_KEY: &str = "githubToken";

const STATE_FILE: &str = "state.json";

/// Local key-value state persisted as one JSON file
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalStore {
    /// Open (or start) the state file inside `dir`
    pub fn open(dir: impl AsRef<Path>) -> TrackerResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let store = Self {
            path: dir.join(STATE_FILE),
            lock: Mutex::new(()),
        };
        let keys = store.load()?.len();
        tracing::debug!(path = %store.path.display(), keys, "Opened local state");

        Ok(store)
    }

    /// Location of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current contents of the state file; absent or blank means empty
    fn load(&self) -> TrackerResult<Map<String, Value>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(TrackerError::LocalParse(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(TrackerError::LocalParse(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Snapshot of the file taken under the lock
    fn snapshot(&self) -> TrackerResult<Map<String, Value>> {
        let _guard = self.lock();
        self.load()
    }

    /// Load, mutate and save as one unit
    fn update<T>(
        &self,
        f: impl FnOnce(&mut Map<String, Value>) -> TrackerResult<T>,
    ) -> TrackerResult<T> {
        let _guard = self.lock();
        let mut data = self.load()?;
        let result = f(&mut data)?;
        self.persist(&data)?;
        Ok(result)
    }

    fn persist(&self, data: &Map<String, Value>) -> TrackerResult<()> {
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));
        let bytes = serde_json::to_vec_pretty(data)?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    // ============================================
    // Read status
    // ============================================

    /// Read states confirmed by a successful flush
    pub fn confirmed(&self) -> TrackerResult<ReadMap> {
        get_or_default(&self.snapshot()?, READ_STATUSES_KEY)
    }

    /// Read states not yet committed to the remote
    pub fn pending(&self) -> TrackerResult<ReadMap> {
        get_or_default(&self.snapshot()?, PENDING_CHANGES_KEY)
    }

    /// Both maps from one consistent snapshot
    pub fn read_state(&self) -> TrackerResult<ReadState> {
        let data = self.snapshot()?;
        Ok(ReadState {
            confirmed: get_or_default(&data, READ_STATUSES_KEY)?,
            pending: get_or_default(&data, PENDING_CHANGES_KEY)?,
        })
    }

    /// Upsert a pending change; recording the same value twice is a no-op
    pub fn record_change(&self, id: u64, is_read: bool) -> TrackerResult<ReadMap> {
        self.update(|data| {
            let mut pending: ReadMap = get_or_default(data, PENDING_CHANGES_KEY)?;
            pending.insert(id, is_read);
            put(data, PENDING_CHANGES_KEY, &pending)?;
            Ok(pending)
        })
    }

    /// Flip the effective read flag of `id` and record the result as pending
    ///
    /// `fallback` is the catalog's own flag, used when neither map has the id.
    pub fn toggle(&self, id: u64, fallback: bool) -> TrackerResult<bool> {
        self.update(|data| {
            let confirmed: ReadMap = get_or_default(data, READ_STATUSES_KEY)?;
            let mut pending: ReadMap = get_or_default(data, PENDING_CHANGES_KEY)?;
            let current = pending
                .get(&id)
                .or_else(|| confirmed.get(&id))
                .copied()
                .unwrap_or(fallback);
            pending.insert(id, !current);
            put(data, PENDING_CHANGES_KEY, &pending)?;
            Ok(!current)
        })
    }

    /// Move flushed entries into the confirmed map
    ///
    /// A pending entry is only cleared if it still holds the value that was
    /// flushed; a change recorded while the flush was in flight survives.
    pub fn settle_flushed(&self, flushed: &ReadMap) -> TrackerResult<ReadMap> {
        self.update(|data| {
            let mut confirmed: ReadMap = get_or_default(data, READ_STATUSES_KEY)?;
            let mut pending: ReadMap = get_or_default(data, PENDING_CHANGES_KEY)?;

            for (id, value) in flushed {
                confirmed.insert(*id, *value);
                if pending.get(id) == Some(value) {
                    pending.remove(id);
                }
            }

            put(data, READ_STATUSES_KEY, &confirmed)?;
            if pending.is_empty() {
                data.remove(PENDING_CHANGES_KEY);
            } else {
                put(data, PENDING_CHANGES_KEY, &pending)?;
            }
            Ok(pending)
        })
    }

    // ============================================
    // Theme
    // ============================================

    pub fn theme(&self) -> TrackerResult<ThemeSettings> {
        let data = self.snapshot()?;
        let accent: Option<String> = get(&data, ACCENT_THEME_KEY)?;
        let background: Option<String> = get(&data, BG_THEME_KEY)?;
        let defaults = ThemeSettings::default();
        Ok(ThemeSettings {
            accent: accent.unwrap_or(defaults.accent),
            background: background.unwrap_or(defaults.background),
        })
    }

    pub fn set_accent_theme(&self, name: &str) -> TrackerResult<()> {
        let name = ThemeSettings::validate(name)?;
        self.update(|data| put(data, ACCENT_THEME_KEY, &name))
    }

    pub fn set_background_theme(&self, name: &str) -> TrackerResult<()> {
        let name = ThemeSettings::validate(name)?;
        self.update(|data| put(data, BG_THEME_KEY, &name))
    }

    // ============================================
    // Credentials
    // ============================================

    pub fn token(&self) -> TrackerResult<Option<String>> {
        let token: Option<String> = get(&self.snapshot()?, TOKEN_KEY)?;
        Ok(token.filter(|t| !t.trim().is_empty()))
    }

    pub fn set_token(&self, token: &str) -> TrackerResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TrackerError::Validation("token must not be empty".into()));
        }
        self.update(|data| put(data, TOKEN_KEY, &token))
    }

    pub fn clear_token(&self) -> TrackerResult<()> {
        self.update(|data| {
            data.remove(TOKEN_KEY);
            Ok(())
        })
    }
}

fn get<T: DeserializeOwned>(data: &Map<String, Value>, key: &str) -> TrackerResult<Option<T>> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| TrackerError::LocalParse(format!("{}: {}", key, e))),
    }
}

fn get_or_default<T: DeserializeOwned + Default>(
    data: &Map<String, Value>,
    key: &str,
) -> TrackerResult<T> {
    Ok(get(data, key)?.unwrap_or_default())
}

fn put<T: Serialize + ?Sized>(data: &mut Map<String, Value>, key: &str, value: &T) -> TrackerResult<()> {
    data.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_change_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        store.record_change(7, true).unwrap();
        let pending = store.record_change(7, true).unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending.get(&7), Some(&true));
    }

    #[test]
    fn test_last_write_wins() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        store.record_change(7, true).unwrap();
        store.record_change(7, false).unwrap();

        assert_eq!(store.pending().unwrap().get(&7), Some(&false));
    }

    #[test]
    fn test_toggle_uses_effective_state() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        assert!(!store.toggle(4, true).unwrap());
        assert!(store.toggle(4, true).unwrap());

        store.settle_flushed(&store.pending().unwrap()).unwrap();
        assert!(!store.toggle(4, false).unwrap());
        assert_eq!(store.pending().unwrap().get(&4), Some(&false));
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = LocalStore::open(dir.path()).unwrap();
            store.record_change(1, true).unwrap();
            store.set_accent_theme("crimson").unwrap();
            store.set_token("ghp_abc").unwrap();
        }

        let store = LocalStore::open(dir.path()).unwrap();
        assert_eq!(store.pending().unwrap().get(&1), Some(&true));
        assert_eq!(store.theme().unwrap().accent, "crimson");
        assert_eq!(store.theme().unwrap().background, "default");
        assert_eq!(store.token().unwrap().as_deref(), Some("ghp_abc"));
    }

    #[test]
    fn test_settle_flushed_moves_entries() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.record_change(1, true).unwrap();
        store.record_change(2, false).unwrap();

        let flushed = store.pending().unwrap();
        let remaining = store.settle_flushed(&flushed).unwrap();

        assert!(remaining.is_empty());
        assert!(store.pending().unwrap().is_empty());
        let confirmed = store.confirmed().unwrap();
        assert_eq!(confirmed.get(&1), Some(&true));
        assert_eq!(confirmed.get(&2), Some(&false));
    }

    #[test]
    fn test_settle_keeps_changes_made_during_flush() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.record_change(1, true).unwrap();
        let flushed = store.pending().unwrap();

        store.record_change(1, false).unwrap();
        store.record_change(2, true).unwrap();
        let remaining = store.settle_flushed(&flushed).unwrap();

        assert_eq!(remaining.get(&1), Some(&false));
        assert_eq!(remaining.get(&2), Some(&true));
        assert_eq!(store.confirmed().unwrap().get(&1), Some(&true));
    }

    #[test]
    fn test_handles_sharing_a_dir_keep_each_others_changes() {
        let dir = tempdir().unwrap();
        let cli = LocalStore::open(dir.path()).unwrap();
        let server = LocalStore::open(dir.path()).unwrap();

        cli.record_change(5, true).unwrap();
        server.record_change(6, true).unwrap();
        assert_eq!(cli.pending().unwrap().get(&6), Some(&true));

        cli.set_token("ghp_shared").unwrap();
        assert_eq!(server.token().unwrap().as_deref(), Some("ghp_shared"));

        let pending = LocalStore::open(dir.path()).unwrap().pending().unwrap();
        assert_eq!(pending.get(&5), Some(&true));
        assert_eq!(pending.get(&6), Some(&true));
    }

    #[test]
    fn test_malformed_state_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(STATE_FILE), "{not json").unwrap();

        let result = LocalStore::open(dir.path());
        assert!(matches!(result, Err(TrackerError::LocalParse(_))));
    }

    #[test]
    fn test_malformed_key_is_local_parse_error() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(STATE_FILE),
            r#"{"pendingReadChanges": "oops"}"#,
        )
        .unwrap();

        let store = LocalStore::open(dir.path()).unwrap();
        assert!(matches!(store.pending(), Err(TrackerError::LocalParse(_))));
    }

    #[test]
    fn test_keys_match_browser_storage() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.record_change(3, true).unwrap();
        store.set_background_theme("midnight").unwrap();

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["pendingReadChanges"]["3"], true);
        assert_eq!(raw["mangaFetcherBgTheme"], "midnight");
    }

    #[test]
    fn test_token_handling() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        assert!(store.set_token("   ").is_err());
        store.set_token(" ghp_x ").unwrap();
        assert_eq!(store.token().unwrap().as_deref(), Some("ghp_x"));
        store.clear_token().unwrap();
        assert_eq!(store.token().unwrap(), None);
    }

    #[test]
    fn test_invalid_theme_rejected() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.set_accent_theme("\"><script>"),
            Err(TrackerError::Validation(_))
        ));
    }
}
