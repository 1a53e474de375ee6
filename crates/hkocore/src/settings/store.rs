//! Settings persistence
//!
//! [`SettingsStore`] is the contract; [`MemorySettingsStore`] keeps
//! everything in process and [`JsonFileSettingsStore`] keeps a single JSON
//! document on disk, writing it in batches.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::config;
use crate::core::{AppError, AppResult};
use crate::settings::model::{AppSettings, ChatSettings};

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn chat_settings(&self, chat_id: i64) -> AppResult<Option<ChatSettings>>;

    async fn save_chat_settings(&self, chat_id: i64, settings: ChatSettings) -> AppResult<()>;

    /// Every known chat, ordered by id.
    async fn all_chat_settings(&self) -> AppResult<BTreeMap<i64, ChatSettings>>;

    async fn app_settings(&self) -> AppResult<AppSettings>;

    async fn save_app_settings(&self, settings: AppSettings) -> AppResult<()>;

    /// Persists anything still buffered.
    async fn flush(&self) -> AppResult<()>;
}

/// On-disk layout of the settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Image {
    #[serde(rename = "chat_settings", default)]
    chats: BTreeMap<i64, ChatSettings>,
    #[serde(rename = "application", default)]
    app: AppSettings,
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    image: Mutex<Image>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn chat_settings(&self, chat_id: i64) -> AppResult<Option<ChatSettings>> {
        Ok(self.image.lock().await.chats.get(&chat_id).copied())
    }

    async fn save_chat_settings(&self, chat_id: i64, settings: ChatSettings) -> AppResult<()> {
        self.image.lock().await.chats.insert(chat_id, settings);
        Ok(())
    }

    async fn all_chat_settings(&self) -> AppResult<BTreeMap<i64, ChatSettings>> {
        Ok(self.image.lock().await.chats.clone())
    }

    async fn app_settings(&self) -> AppResult<AppSettings> {
        Ok(self.image.lock().await.app.clone())
    }

    async fn save_app_settings(&self, settings: AppSettings) -> AppResult<()> {
        self.image.lock().await.app = settings;
        Ok(())
    }

    async fn flush(&self) -> AppResult<()> {
        Ok(())
    }
}

/// When buffered changes are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    /// Write once more than this many changes are buffered.
    pub max_outstanding: usize,
    /// Write once the last write is at least this old.
    pub max_delay: Duration,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            max_outstanding: config::persistence::MAX_OUTSTANDING_CHANGES,
            max_delay: config::persistence::max_write_delay(),
        }
    }
}

struct FileState {
    image: Image,
    outstanding: usize,
    last_write: Instant,
}

pub struct JsonFileSettingsStore {
    path: PathBuf,
    policy: WritePolicy,
    state: Mutex<FileState>,
}

impl JsonFileSettingsStore {
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        Self::open_with_policy(path, WritePolicy::default()).await
    }

    /// Loads `path`. A missing or empty file starts an empty document; an
    /// unparseable one is copied aside to `<name>.<unix millis>` first.
    pub async fn open_with_policy(path: impl AsRef<Path>, policy: WritePolicy) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let image = match fs_err::tokio::metadata(&path).await {
            Ok(meta) if !meta.is_file() => {
                return Err(AppError::Storage(format!("{} is not a file", path.display())));
            }
            Ok(_) => Self::load(&path).await?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Settings file {} not found, starting empty", path.display());
                Image::default()
            }
            Err(e) => return Err(e.into()),
        };

        log::info!("Loaded settings for {} chats from {}", image.chats.len(), path.display());
        Ok(Self {
            path,
            policy,
            state: Mutex::new(FileState {
                image,
                outstanding: 0,
                last_write: Instant::now(),
            }),
        })
    }

    async fn load(path: &Path) -> AppResult<Image> {
        let raw = fs_err::tokio::read_to_string(path).await?;
        if raw.trim().is_empty() {
            return Ok(Image::default());
        }
        match serde_json::from_str(&raw) {
            Ok(image) => Ok(image),
            Err(e) => {
                let backup = backup_path(path);
                log::warn!(
                    "Unable to parse settings file {} ({}), backing it up to {}",
                    path.display(),
                    e,
                    backup.display()
                );
                fs_err::tokio::copy(path, &backup).await?;
                Ok(Image::default())
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of changes not yet on disk.
    pub async fn outstanding(&self) -> usize {
        self.state.lock().await.outstanding
    }

    async fn write(&self, state: &mut FileState) -> AppResult<()> {
        let json = serde_json::to_string_pretty(&state.image)?;
        let tmp = self.path.with_extension("tmp");
        fs_err::tokio::write(&tmp, json).await?;
        fs_err::tokio::rename(&tmp, &self.path).await?;

        log::debug!("Wrote {} settings changes to {}", state.outstanding, self.path.display());
        state.outstanding = 0;
        state.last_write = Instant::now();
        Ok(())
    }

    async fn record_change(&self, state: &mut FileState) -> AppResult<()> {
        state.outstanding += 1;
        if state.outstanding > self.policy.max_outstanding || state.last_write.elapsed() >= self.policy.max_delay {
            self.write(state).await?;
        }
        Ok(())
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let millis = chrono::Utc::now().timestamp_millis();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "settings".to_string());
    path.with_file_name(format!("{}.{}", name, millis))
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn chat_settings(&self, chat_id: i64) -> AppResult<Option<ChatSettings>> {
        Ok(self.state.lock().await.image.chats.get(&chat_id).copied())
    }

    async fn save_chat_settings(&self, chat_id: i64, settings: ChatSettings) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.image.chats.insert(chat_id, settings);
        self.record_change(&mut state).await
    }

    async fn all_chat_settings(&self) -> AppResult<BTreeMap<i64, ChatSettings>> {
        Ok(self.state.lock().await.image.chats.clone())
    }

    async fn app_settings(&self) -> AppResult<AppSettings> {
        Ok(self.state.lock().await.image.app.clone())
    }

    async fn save_app_settings(&self, settings: AppSettings) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.image.app = settings;
        self.record_change(&mut state).await
    }

    async fn flush(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.outstanding == 0 && fs_err::tokio::metadata(&self.path).await.is_ok() {
            return Ok(());
        }
        self.write(&mut state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Locale;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn lazy_policy() -> WritePolicy {
        WritePolicy {
            max_outstanding: 2,
            max_delay: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemorySettingsStore::new();
        assert_eq!(store.chat_settings(1).await.unwrap(), None);

        store
            .save_chat_settings(1, ChatSettings::with_locale(Locale::ZhHk))
            .await
            .unwrap();
        assert_eq!(store.chat_settings(1).await.unwrap().unwrap().locale, Locale::ZhHk);
        assert_eq!(store.all_chat_settings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty_and_flush_creates_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let store = JsonFileSettingsStore::open(&path).await.unwrap();
        assert!(store.all_chat_settings().await.unwrap().is_empty());
        store.flush().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_writes_are_batched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = JsonFileSettingsStore::open_with_policy(&path, lazy_policy())
            .await
            .unwrap();

        store.save_chat_settings(1, ChatSettings::default()).await.unwrap();
        store.save_chat_settings(2, ChatSettings::default()).await.unwrap();
        assert!(!path.exists());
        assert_eq!(store.outstanding().await, 2);

        store.save_chat_settings(3, ChatSettings::default()).await.unwrap();
        assert!(path.exists());
        assert_eq!(store.outstanding().await, 0);
    }

    #[tokio::test]
    async fn test_flush_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        {
            let store = JsonFileSettingsStore::open_with_policy(&path, lazy_policy())
                .await
                .unwrap();
            store
                .save_chat_settings(
                    -100123,
                    ChatSettings {
                        locale: Locale::ZhHk,
                        notifications_enabled: false,
                    },
                )
                .await
                .unwrap();
            let mut app = AppSettings::default();
            app.last_notified_warnings.insert(
                "WRAIN".to_string(),
                chrono::DateTime::parse_from_rfc3339("2024-05-01T10:00:00+08:00").unwrap(),
            );
            store.save_app_settings(app).await.unwrap();
            store.flush().await.unwrap();
        }

        let store = JsonFileSettingsStore::open(&path).await.unwrap();
        let chat = store.chat_settings(-100123).await.unwrap().unwrap();
        assert_eq!(chat.locale, Locale::ZhHk);
        assert!(!chat.notifications_enabled);
        assert!(store
            .app_settings()
            .await
            .unwrap()
            .last_notified_warnings
            .contains_key("WRAIN"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_backed_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileSettingsStore::open(&path).await.unwrap();
        assert!(store.all_chat_settings().await.unwrap().is_empty());

        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("settings.json."))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(std::fs::read_to_string(backups[0].path()).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_reads_legacy_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"chat_settings": {"42": {"botLocale": "EN_UK", "isNotificationEnabled": true}}}"#,
        )
        .unwrap();

        let store = JsonFileSettingsStore::open(&path).await.unwrap();
        assert_eq!(store.chat_settings(42).await.unwrap(), Some(ChatSettings::default()));
        assert_eq!(store.app_settings().await.unwrap(), AppSettings::default());
    }

    #[tokio::test]
    async fn test_directory_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = JsonFileSettingsStore::open(dir.path()).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }
}
