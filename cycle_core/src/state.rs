//! User state persistence with file locking.
//!
//! The profile and reward progress live in a single JSON file that is
//! replaced atomically on every save. A sidecar `state.json.lock` serialises
//! access: readers share it, and `save`/`update` hold it exclusively, so an
//! `update` never overwrites a change that landed after its load.

use crate::{CycleProfile, Error, Result, UserState};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Lock file guarding the state file at `path`
pub fn state_lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Held lock on a state file's sidecar; unlocks on drop
struct StateLock(File);

impl StateLock {
    fn acquire(path: &Path, exclusive: bool) -> Result<Self> {
        let parent = state_dir(path)?;
        std::fs::create_dir_all(parent)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(state_lock_path(path))?;
        if exclusive {
            file.lock_exclusive()?;
        } else {
            file.lock_shared()?;
        }
        Ok(Self(file))
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = self.0.unlock();
    }
}

fn state_dir(path: &Path) -> Result<&Path> {
    path.parent()
        .ok_or_else(|| Error::State(format!("state path {:?} has no parent", path)))
}

/// Parse the state file, degrading to defaults when it is missing or bad
fn read_state(path: &Path) -> UserState {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No state file found, using default state");
            return UserState::default();
        }
        Err(e) => {
            tracing::warn!("Unable to read state file {:?}: {}. Using defaults.", path, e);
            return UserState::default();
        }
    };

    serde_json::from_str(&contents).unwrap_or_else(|e| {
        tracing::warn!("Failed to parse state file {:?}: {}. Using defaults.", path, e);
        UserState::default()
    })
}

/// Write to a temp file beside `path`, fsync, then rename over it
fn write_state(state: &UserState, path: &Path) -> Result<()> {
    let temp = NamedTempFile::new_in(state_dir(path)?)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, state)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Saved user state to {:?}", path);
    Ok(())
}

impl UserState {
    /// Load user state under a shared lock
    ///
    /// A missing or corrupted file yields the default state (with a warning
    /// for corruption) so the app can always start.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No state file found, using default state");
            return Ok(Self::default());
        }

        let _lock = match StateLock::acquire(path, false) {
            Ok(lock) => lock,
            Err(e) => {
                tracing::warn!("Unable to lock state file {:?}: {}. Using defaults.", path, e);
                return Ok(Self::default());
            }
        };
        let state = read_state(path);
        tracing::debug!("Loaded user state from {:?}", path);
        Ok(state)
    }

    /// Replace the state file atomically under an exclusive lock
    pub fn save(&self, path: &Path) -> Result<()> {
        let _lock = StateLock::acquire(path, true)?;
        write_state(self, path)
    }

    /// Load, modify and save while holding the exclusive lock throughout.
    ///
    /// Returns whatever `f` returns. Nothing is written if `f` fails.
    pub fn update<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut UserState) -> Result<T>,
    {
        let _lock = StateLock::acquire(path, true)?;
        let mut state = read_state(path);
        let value = f(&mut state)?;
        write_state(&state, path)?;
        Ok(value)
    }

    /// The stored profile, or a profile error telling the user to set one
    pub fn require_profile(&self) -> Result<&CycleProfile> {
        self.profile.as_ref().ok_or_else(|| {
            Error::Profile("no cycle profile saved yet; run `cyclefit profile set` first".into())
        })
    }

    /// Validate and store a new profile, replacing any previous one
    pub fn set_profile(&mut self, profile: CycleProfile) -> Result<()> {
        profile.validate()?;
        tracing::info!(
            "Profile set: period started {}, {}-day cycle",
            profile.last_period_date,
            profile.cycle_length
        );
        self.profile = Some(profile);
        Ok(())
    }
}
