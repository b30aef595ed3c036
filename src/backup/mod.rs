use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::models::ConfigBackup;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TIMESTAMP_LEN: usize = 15;
const MAX_SAME_SECOND: u32 = 1000;

/// Keeps pre-deployment backups on disk so a device can be restored later,
/// even from another process
pub struct BackupStore {
    backup_dir: PathBuf,
}

impl BackupStore {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Write a backup as `<hostname>_<timestamp>.json` and return its path.
    /// A second backup in the same second gets a `_<n>` suffix instead of
    /// replacing the first.
    pub async fn save(&self, hostname: &str, backup: &ConfigBackup) -> Result<PathBuf> {
        // Ensure backup directory exists
        tokio::fs::create_dir_all(&self.backup_dir)
            .await
            .with_context(|| format!("Failed to create backup dir {}", self.backup_dir.display()))?;

        let base = format!("{}_{}", safe_name(hostname), backup.timestamp.format(TIMESTAMP_FORMAT));
        let data = serde_json::to_string_pretty(backup)?;

        for n in 0..MAX_SAME_SECOND {
            let filename = match n {
                0 => format!("{}.json", base),
                n => format!("{}_{}.json", base, n),
            };
            let file_path = self.backup_dir.join(&filename);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&file_path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create backup {}", file_path.display()))
                }
            };

            file.write_all(data.as_bytes())
                .await
                .with_context(|| format!("Failed to write backup {}", file_path.display()))?;
            file.flush().await?;

            tracing::info!(
                "Saved backup for {} ({} bytes) to {}",
                backup.device_id,
                backup.config.len(),
                file_path.display()
            );
            return Ok(file_path);
        }

        anyhow::bail!("Too many backups for {} within one second", base)
    }

    pub async fn load(&self, path: impl AsRef<Path>) -> Result<ConfigBackup> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read backup {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("Failed to parse backup {}", path.display()))
    }

    /// Newest backup file for a hostname, if any
    pub async fn latest(&self, hostname: &str) -> Result<Option<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list {}", self.backup_dir.display()))
            }
        };

        let prefix = format!("{}_", safe_name(hostname));
        let mut newest: Option<((String, u32), PathBuf)> = None;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(key) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(parse_backup_key)
            else {
                continue;
            };
            if newest.as_ref().map_or(true, |(best, _)| key > *best) {
                newest = Some((key, entry.path()));
            }
        }

        Ok(newest.map(|(_, path)| path))
    }
}

/// Split `<timestamp>[_<n>]` into a sortable key. A longer hostname sharing
/// the prefix leaves something else behind and is rejected.
fn parse_backup_key(rest: &str) -> Option<(String, u32)> {
    let stamp = rest.get(..TIMESTAMP_LEN)?;
    chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;

    let seq = match &rest[TIMESTAMP_LEN..] {
        "" => 0,
        suffix => suffix.strip_prefix('_')?.parse().ok()?,
    };
    Some((stamp.to_string(), seq))
}

fn safe_name(hostname: &str) -> String {
    hostname.replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn backup_at(device_id: &str, secs: i64, config: &str) -> ConfigBackup {
        ConfigBackup {
            device_id: device_id.to_string(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            config: config.to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        let backup = backup_at("core-01", 1_700_000_000, "hostname core-01\n!\n");

        let path = store.save("core-01", &backup).await.unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "core-01_20231114_221320.json"
        );

        let loaded = store.load(&path).await.unwrap();
        assert_eq!(loaded, backup);
    }

    #[tokio::test]
    async fn test_hostname_slashes_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());

        let path = store
            .save("site/a/r1", &backup_at("r1", 1_700_000_000, "x"))
            .await
            .unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("site_a_r1_"));
        assert_eq!(path.parent().unwrap(), dir.path());
    }

    #[tokio::test]
    async fn test_latest_picks_newest_for_hostname() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());

        store.save("r1", &backup_at("r1", 1_700_000_000, "old")).await.unwrap();
        let newest = store.save("r1", &backup_at("r1", 1_700_086_400, "new")).await.unwrap();
        store.save("r1-edge", &backup_at("r1-edge", 1_800_000_000, "other")).await.unwrap();
        store.save("r1_core", &backup_at("r1_core", 1_800_000_000, "other")).await.unwrap();

        let latest = store.latest("r1").await.unwrap();
        assert_eq!(latest, Some(newest.clone()));
        assert_eq!(store.load(newest).await.unwrap().config, "new");
    }

    #[tokio::test]
    async fn test_same_second_saves_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());

        let first = store.save("r1", &backup_at("r1", 1_700_000_000, "first")).await.unwrap();
        let second = store.save("r1", &backup_at("r1", 1_700_000_000, "second")).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "r1_20231114_221320_1.json"
        );
        assert_eq!(store.load(&first).await.unwrap().config, "first");
        assert_eq!(store.load(&second).await.unwrap().config, "second");
        assert_eq!(store.latest("r1").await.unwrap(), Some(second));
    }

    #[test]
    fn test_parse_backup_key() {
        assert_eq!(parse_backup_key("20231114_221320"), Some(("20231114_221320".to_string(), 0)));
        assert_eq!(parse_backup_key("20231114_221320_12"), Some(("20231114_221320".to_string(), 12)));
        assert_eq!(parse_backup_key("core_20231114_221320"), None);
        assert_eq!(parse_backup_key("20231114_221320x"), None);
        assert_eq!(parse_backup_key("2023"), None);
    }

    #[tokio::test]
    async fn test_latest_without_backups() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("missing"));
        assert_eq!(store.latest("r1").await.unwrap(), None);

        let store = BackupStore::new(dir.path());
        tokio::fs::write(dir.path().join("notes.txt"), "hi").await.unwrap();
        assert_eq!(store.latest("r1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1_20240101_000000.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let err = BackupStore::new(dir.path()).load(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse backup"));
    }
}
