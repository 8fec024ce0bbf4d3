//! Periodic timestamped copies of the file-engine database.

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::backend::storage::StorageEngine;

/// Backups kept after pruning
pub const MAX_BACKUPS: usize = 20;

const BACKUP_PREFIX: &str = "transactions-";
const BACKUP_SUFFIX: &str = ".db";
const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
/// Length of a name rendered with [`STAMP_FORMAT`]
const STAMP_LEN: usize = 15;

#[derive(Clone)]
pub struct BackupService {
    engine: Arc<dyn StorageEngine>,
    dir: PathBuf,
    keep: usize,
}

impl BackupService {
    pub fn new(engine: Arc<dyn StorageEngine>, dir: PathBuf) -> Self {
        Self {
            engine,
            dir,
            keep: MAX_BACKUPS,
        }
    }

    pub fn with_keep(mut self, keep: usize) -> Self {
        self.keep = keep;
        self
    }

    /// Write one backup and prune old ones; returns the new file
    pub async fn run_once(&self) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let dest = self.next_backup_path();
        self.engine
            .backup_to(&dest)
            .await
            .with_context(|| format!("backing up to {}", dest.display()))?;

        let size = tokio::fs::metadata(&dest).await.map(|m| m.len()).unwrap_or(0);
        info!("Backup saved to {} ({} bytes)", dest.display(), size);

        let removed = self.prune().await?;
        if removed > 0 {
            info!("Pruned {} old backups", removed);
        }
        Ok(dest)
    }

    fn next_backup_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format(STAMP_FORMAT).to_string();
        let mut candidate = self.dir.join(format!("{BACKUP_PREFIX}{stamp}{BACKUP_SUFFIX}"));
        let mut n = 1;
        while candidate.exists() {
            candidate = self
                .dir
                .join(format!("{BACKUP_PREFIX}{stamp}-{n}{BACKUP_SUFFIX}"));
            n += 1;
        }
        candidate
    }

    /// Delete the oldest backups beyond the retention limit
    pub async fn prune(&self) -> Result<usize> {
        let mut backups = list_backups(&self.dir).await?;
        if backups.len() <= self.keep {
            return Ok(0);
        }

        backups.sort_by_cached_key(|path| backup_age_key(path));
        let excess = backups.len() - self.keep;
        for old in &backups[..excess] {
            tokio::fs::remove_file(old)
                .await
                .with_context(|| format!("removing {}", old.display()))?;
        }
        Ok(excess)
    }

    /// Back up on a fixed interval until the runtime shuts down
    pub fn spawn_periodic(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    warn!("Periodic backup failed: {:#}", e);
                }
            }
        })
    }
}

/// Orders backups oldest first: by timestamp, then by the `-N` collision suffix.
///
/// Plain name order would put `...-120000-1.db` before `...-120000.db`.
fn backup_age_key(path: &Path) -> (String, u32) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = name
        .strip_prefix(BACKUP_PREFIX)
        .and_then(|rest| rest.strip_suffix(BACKUP_SUFFIX))
        .unwrap_or(&name);
    match (stem.get(..STAMP_LEN), stem.get(STAMP_LEN..)) {
        (Some(stamp), Some(tail)) if tail.starts_with('-') => {
            (stamp.to_string(), tail[1..].parse().unwrap_or(0))
        }
        _ => (stem.to_string(), 0),
    }
}

/// Backup files in `dir`, in no particular order
async fn list_backups(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("listing {}", dir.display()))?;
    let mut backups = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_SUFFIX) {
            backups.push(entry.path());
        }
    }
    Ok(backups)
}
