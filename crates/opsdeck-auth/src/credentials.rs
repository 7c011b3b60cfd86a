//! Credential storage for the session token pair
//!
//! Manages a JSON file holding the current access/refresh token pair (or
//! `null` while logged out). All writes use atomic temp-file + rename to
//! prevent corruption on crash. A tokio Mutex serializes concurrent writes
//! from login, logout, and request-time refresh.
//!
//! The credential file is the single source of truth for session tokens:
//! a pair being present is what makes the session authenticated on startup.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::endpoints::TokenPair;
use crate::error::{Error, Result};

/// Thread-safe token pair file manager.
///
/// The Mutex serializes all access. Reads acquire the lock briefly to clone
/// the in-memory pair, so request-time reads don't block on writes longer
/// than the clone takes.
pub struct CredentialStore {
    path: PathBuf,
    state: Mutex<Option<TokenPair>>,
}

impl CredentialStore {
    /// Load the token pair from the given file path.
    ///
    /// If the file doesn't exist, creates it as `null` (cold start, logged
    /// out). A pair found on disk makes the session optimistically
    /// authenticated; it is not revalidated until the first request.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let pair: Option<TokenPair> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), present = pair.is_some(), "loaded credentials");
            pair
        } else {
            info!(path = %path.display(), "credential file not found, starting logged out");
            // Create the file so future loads don't need the cold-start path
            write_atomic(&path, &None).await?;
            None
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Get a clone of the current token pair, if any.
    pub async fn get(&self) -> Option<TokenPair> {
        let state = self.state.lock().await;
        state.clone()
    }

    /// Whether a token pair is currently stored.
    pub async fn is_present(&self) -> bool {
        let state = self.state.lock().await;
        state.is_some()
    }

    /// Replace the stored pair and persist to disk.
    ///
    /// Used for both the initial pair from login/register and rotated pairs
    /// from refresh. The in-memory swap and the disk write happen under one
    /// lock acquisition, so a concurrent reader never observes a half-rotated
    /// pair.
    pub async fn store(&self, pair: TokenPair) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = Some(pair);
        debug!("stored token pair");
        write_atomic(&self.path, &state).await
    }

    /// Remove the stored pair and persist to disk.
    ///
    /// Idempotent: clearing an empty store rewrites `null` and succeeds.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let was_present = state.take().is_some();
        if was_present {
            debug!("cleared token pair");
        }
        write_atomic(&self.path, &state).await
    }
}

/// Write the token pair to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. This prevents corruption if the process crashes mid-write.
/// Sets file permissions to 0600 (owner read/write only) since the file
/// contains session tokens.
async fn write_atomic(path: &Path, data: &Option<TokenPair>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}
