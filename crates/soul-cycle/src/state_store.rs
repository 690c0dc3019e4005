//! Write-temp-then-rename persistence of [`SoulState`], with rotating
//! backups and orphan-sweep at startup (spec §4.8). The write path is
//! modeled directly on `agenticlaw-consciousness`'s
//! `VersionController::write_manifest`: serialize, write to a sibling
//! `.tmp` path, then `rename` over the canonical path so a reader never
//! observes a partially-written file.

use chrono::{DateTime, Utc};
use soul_core::{Result, SoulState};
use std::path::{Path, PathBuf};
use tracing::warn;

const STATE_FILE_NAME: &str = "soul-state.json";
const BACKUP_DIR_NAME: &str = "backups";
const BACKUP_SUFFIX: &str = ".soul-state.backup.json";
const TEMP_PREFIX: &str = ".soul-state.tmp-";
const MAX_BACKUPS: usize = 10;

fn state_path(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_FILE_NAME)
}

fn backup_dir(state_dir: &Path) -> PathBuf {
    state_dir.join(BACKUP_DIR_NAME)
}

/// Reads the persisted state. A missing file is the ordinary first-run
/// case. A present-but-unparseable file is reported via the returned
/// `corrupt` flag rather than an error — the caller treats this run as if
/// no prior state existed, but never overwrites the bad file until a new
/// state is deliberately written (spec §4.8: "never silently discard a
/// corrupt artifact without flagging it").
pub fn read_state(state_dir: &Path) -> (SoulState, bool) {
    let path = state_path(state_dir);
    if !path.exists() {
        return (SoulState::empty(), false);
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match serde_json::from_str::<SoulState>(&content) {
            Ok(state) => (state, false),
            Err(err) => {
                warn!(error = %err, path = %path.display(), "soul state file is corrupt, starting from empty state");
                (SoulState::empty(), true)
            }
        },
        Err(err) => {
            warn!(error = %err, path = %path.display(), "failed to read soul state file, starting from empty state");
            (SoulState::empty(), true)
        }
    }
}

/// Backs up any existing state file, then writes the new one atomically
/// and prunes old backups down to [`MAX_BACKUPS`].
pub fn write_state(state_dir: &Path, state: &SoulState) -> Result<()> {
    std::fs::create_dir_all(state_dir)?;
    let canonical = state_path(state_dir);

    if canonical.exists() {
        backup_existing(state_dir, &canonical)?;
    }

    let json = serde_json::to_string_pretty(state)?;
    let temp_path = state_dir.join(format!("{TEMP_PREFIX}{}-{}", std::process::id(), backup_timestamp(Utc::now())));
    std::fs::write(&temp_path, json)?;
    std::fs::rename(&temp_path, &canonical)?;
    Ok(())
}

fn backup_existing(state_dir: &Path, canonical: &Path) -> Result<()> {
    let dir = backup_dir(state_dir);
    std::fs::create_dir_all(&dir)?;

    let filename = format!("{}{BACKUP_SUFFIX}", backup_timestamp(Utc::now()));
    std::fs::copy(canonical, dir.join(filename))?;
    prune_backups(&dir)?;
    Ok(())
}

fn prune_backups(dir: &Path) -> Result<()> {
    let mut backups = list_backups(dir)?;
    if backups.len() <= MAX_BACKUPS {
        return Ok(());
    }
    backups.sort_by(|a, b| a.0.total_cmp(&b.0));
    let excess = backups.len() - MAX_BACKUPS;
    for (_, path) in backups.into_iter().take(excess) {
        if let Err(err) = std::fs::remove_file(&path) {
            warn!(error = %err, path = %path.display(), "failed to prune old state backup");
        }
    }
    Ok(())
}

fn list_backups(dir: &Path) -> Result<Vec<(f64, PathBuf)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut backups = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(timestamp) = parse_backup_timestamp(name) {
            backups.push((timestamp, entry.path()));
        }
    }
    Ok(backups)
}

/// Restores the most recent backup, if any exist. Used when the canonical
/// state file is corrupt and the caller wants to roll back rather than
/// start over from empty.
pub fn restore_latest_backup(state_dir: &Path) -> Result<Option<SoulState>> {
    let dir = backup_dir(state_dir);
    let mut backups = list_backups(&dir)?;
    backups.sort_by(|a, b| b.0.total_cmp(&a.0));

    let Some((_, path)) = backups.into_iter().next() else {
        return Ok(None);
    };
    let content = std::fs::read_to_string(&path)?;
    let state = serde_json::from_str(&content)?;
    Ok(Some(state))
}

/// Removes leftover `.soul-state.tmp-*` files from a previous run that
/// crashed between write and rename (spec §4.8: "orphaned temp files are
/// swept at manager startup").
pub fn sweep_orphaned_temp_files(state_dir: &Path) -> Result<()> {
    if !state_dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(state_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| n.starts_with(TEMP_PREFIX)) {
            if let Err(err) = std::fs::remove_file(entry.path()) {
                warn!(error = %err, path = %entry.path().display(), "failed to sweep orphaned temp file");
            }
        }
    }
    Ok(())
}

/// `<seconds>.<millis>` so the timestamp is both human-legible and parses
/// deterministically as an `f64` for newest-first ordering.
fn backup_timestamp(now: DateTime<Utc>) -> String {
    format!("{}.{:03}", now.timestamp(), now.timestamp_subsec_millis())
}

fn parse_backup_timestamp(filename: &str) -> Option<f64> {
    filename.strip_suffix(BACKUP_SUFFIX)?.parse::<f64>().ok()
}
