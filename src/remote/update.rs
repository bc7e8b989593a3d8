//! Optimistic read-modify-write of remote JSON files
//!
//! Every update reads the file, applies one mutation in memory, and writes it
//! back naming the version it read. There is no lock: if another writer got
//! there first the write fails with [`TrackerError::VersionConflict`] and the
//! caller decides what to tell the user. Version tags are never cached between
//! calls.

use super::{ContentStore, Credentials, VersionTag};
use crate::catalog::json_kind;
use crate::error::{TrackerError, TrackerResult};
use serde::Deserialize;
use serde_json::Value;

/// Expected top-level shape of a remote JSON file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Array,
    Object,
}

impl JsonShape {
    fn empty(self) -> Value {
        match self {
            JsonShape::Array => Value::Array(Vec::new()),
            JsonShape::Object => Value::Object(serde_json::Map::new()),
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            JsonShape::Array => value.is_array(),
            JsonShape::Object => value.is_object(),
        }
    }
}

/// What to do when the remote file is not JSON of the expected shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Fail with `MalformedRemoteState` and leave the file alone
    #[default]
    Abort,
    /// Treat the file as empty and overwrite it (version check still applies)
    Reset,
}

/// Result of a successful update
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// Version of the file after the write
    pub version: VersionTag,
    /// Whether the write created the file
    pub created: bool,
    /// The value that was written
    pub value: Value,
}

/// Read a remote JSON file of the given shape
///
/// A missing file reads as the empty value of `shape` with no version.
pub async fn read_remote_json(
    store: &dyn ContentStore,
    path: &str,
    shape: JsonShape,
    policy: MalformedPolicy,
    credentials: &Credentials,
) -> TrackerResult<(Value, Option<VersionTag>)> {
    require_credentials(credentials)?;

    let resource = match store.get(path, credentials).await? {
        Some(resource) => resource,
        None => {
            tracing::debug!(store = store.name(), path, "Remote file absent, starting empty");
            return Ok((shape.empty(), None));
        }
    };

    match decode(path, &resource.content, shape) {
        Ok(value) => Ok((value, Some(resource.version))),
        Err(e) if policy == MalformedPolicy::Reset => {
            tracing::warn!(path, error = %e, "Resetting malformed remote file");
            Ok((shape.empty(), Some(resource.version)))
        }
        Err(e) => Err(e),
    }
}

/// Apply `mutate` to the JSON value stored at `path`
///
/// The mutation may abort the update by returning an error; nothing is
/// written in that case.
pub async fn update_remote_json<F>(
    store: &dyn ContentStore,
    path: &str,
    shape: JsonShape,
    policy: MalformedPolicy,
    message: &str,
    credentials: &Credentials,
    mutate: F,
) -> TrackerResult<UpdateOutcome>
where
    F: FnOnce(&mut Value) -> TrackerResult<()>,
{
    let (mut value, version) = read_remote_json(store, path, shape, policy, credentials).await?;

    mutate(&mut value)?;
    if !shape.matches(&value) {
        return Err(TrackerError::Validation(format!(
            "mutation of {} produced {}",
            path,
            json_kind(&value)
        )));
    }

    let content = encode_pretty(&value)?;
    let created = version.is_none();

    let new_version = store
        .put(path, &content, version.as_ref(), message, credentials)
        .await
        .map_err(|e| {
            tracing::warn!(store = store.name(), path, error = %e, "Remote write failed");
            e
        })?;

    tracing::info!(
        store = store.name(),
        path,
        created,
        version = %new_version,
        "Remote file updated"
    );

    Ok(UpdateOutcome {
        version: new_version,
        created,
        value,
    })
}

/// [`update_remote_json`] specialised to array-shaped files
pub async fn update_remote_json_array<F>(
    store: &dyn ContentStore,
    path: &str,
    policy: MalformedPolicy,
    message: &str,
    credentials: &Credentials,
    mutate: F,
) -> TrackerResult<UpdateOutcome>
where
    F: FnOnce(&mut Vec<Value>) -> TrackerResult<()>,
{
    update_remote_json(
        store,
        path,
        JsonShape::Array,
        policy,
        message,
        credentials,
        |value| match value {
            Value::Array(items) => mutate(items),
            other => Err(TrackerError::MalformedRemoteState {
                path: path.to_string(),
                reason: format!("expected an array, found {}", json_kind(other)),
            }),
        },
    )
    .await
}

/// Pretty-print with two-space indentation and a trailing newline
pub fn encode_pretty(value: &Value) -> TrackerResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn require_credentials(credentials: &Credentials) -> TrackerResult<()> {
    if credentials.is_empty() {
        return Err(TrackerError::Credential("no GitHub token configured".into()));
    }
    Ok(())
}

fn decode(path: &str, content: &[u8], shape: JsonShape) -> TrackerResult<Value> {
    let malformed = |reason: String| TrackerError::MalformedRemoteState {
        path: path.to_string(),
        reason,
    };

    let text = std::str::from_utf8(content).map_err(|e| malformed(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(shape.empty());
    }

    let value: Value = serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
    if !shape.matches(&value) {
        let expected = match shape {
            JsonShape::Array => "an array",
            JsonShape::Object => "an object",
        };
        return Err(malformed(format!(
            "expected {}, found {}",
            expected,
            json_kind(&value)
        )));
    }

    Ok(value)
}
