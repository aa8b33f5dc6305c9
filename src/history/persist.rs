//! 履歴の永続化 — JSON ファイルへの保存・読み込みと破損ファイルの隔離
//!
//! 保存形式は 2 種類:
//!
//! ```json
//! { "history": ["ls", "cd /tmp"] }
//! { "contexts": { "default": ["ls"], "sql": ["select 1"] } }
//! ```
//!
//! それ以外の形はすべて破損として扱い、`<file>.corrupted-<timestamp>` に退避する。
//! I/O エラーはログに記録するだけで呼び出し元には返さない。

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::DEFAULT_CONTEXT;

/// 永続化層が利用するファイルシステム操作。
pub trait FileSystem: Send {
    fn join(&self, dir: &Path, file_name: &str) -> PathBuf {
        dir.join(file_name)
    }
    fn dir_exists(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// `std::fs` による実装
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }
}

// ---------------------------------------------------------------------------
// スナップショット
// ---------------------------------------------------------------------------

/// 永続化対象となる履歴のコピー（コンテキスト名 → 古い順のエントリ）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySnapshot {
    contexts: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SingleContextFile {
    history: Vec<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MultiContextFile {
    contexts: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedHistory {
    Single(SingleContextFile),
    Multi(MultiContextFile),
}

impl HistorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// デフォルトコンテキストだけを持つスナップショット
    pub fn single(entries: Vec<String>) -> Self {
        let mut snapshot = Self::new();
        snapshot.insert(DEFAULT_CONTEXT, entries);
        snapshot
    }

    pub fn insert(&mut self, context: &str, entries: Vec<String>) {
        self.contexts.insert(context.to_string(), entries);
    }

    pub fn get(&self, context: &str) -> Option<&[String]> {
        self.contexts.get(context).map(Vec::as_slice)
    }

    pub fn contexts(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.contexts
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.values().all(Vec::is_empty)
    }

    /// JSON にシリアライズする。
    ///
    /// デフォルトコンテキストしか無い場合は単一コンテキスト形式で書き出す。
    pub fn to_json(&self) -> Result<String> {
        let single = self.contexts.keys().all(|name| name == DEFAULT_CONTEXT);
        let json = if single {
            let history = self.get(DEFAULT_CONTEXT).map(<[String]>::to_vec).unwrap_or_default();
            serde_json::to_string_pretty(&SingleContextFile { history })
        } else {
            serde_json::to_string_pretty(&MultiContextFile {
                contexts: self.contexts.clone(),
            })
        };
        json.context("failed to serialize history")
    }

    /// JSON をパースする。既知の 2 形式以外はエラー。
    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: PersistedHistory =
            serde_json::from_str(raw).context("history file has an unexpected shape")?;
        Ok(match parsed {
            PersistedHistory::Single(file) => Self::single(file.history),
            PersistedHistory::Multi(file) => Self {
                contexts: file.contexts,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// 永続化アダプタ
// ---------------------------------------------------------------------------

/// 履歴ファイルの保存・読み込みを担当する。
///
/// メモリ上の履歴への参照は保持しない。保存時にスナップショットを受け取り、
/// 読み込み時は新しいスナップショットを返す。
pub struct PersistenceAdapter {
    fs: Box<dyn FileSystem>,
}

impl Default for PersistenceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceAdapter {
    pub fn new() -> Self {
        Self::with_filesystem(Box::new(OsFileSystem))
    }

    pub fn with_filesystem(fs: Box<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// ディレクトリとファイル名から保存先パスを組み立てる。
    pub fn resolve_path(&self, dir: &Path, file_name: &str) -> PathBuf {
        self.fs.join(dir, file_name)
    }

    /// スナップショットを保存する。失敗してもログを残すだけでエラーは返さない。
    pub fn save(&self, path: &Path, snapshot: &HistorySnapshot) {
        match self.try_save(path, snapshot) {
            Ok(()) => debug!(path = %path.display(), "History saved"),
            Err(e) => warn!(
                path = %path.display(),
                error = %format!("{e:#}"),
                "Failed to save history, keeping it in memory only"
            ),
        }
    }

    fn try_save(&self, path: &Path, snapshot: &HistorySnapshot) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !self.fs.dir_exists(parent) {
                self.fs.create_dir_all(parent).with_context(|| {
                    format!("failed to create history directory: {}", parent.display())
                })?;
            }
        }

        let data = snapshot.to_json()?;

        // 一時ファイルに書いてから置き換え、書きかけのファイルを残さない
        let tmp = with_suffix(path, ".tmp");
        self.fs
            .write(&tmp, &data)
            .with_context(|| format!("failed to write temp file: {}", tmp.display()))?;
        self.fs.rename(&tmp, path).with_context(|| {
            format!("failed to replace {} with {}", path.display(), tmp.display())
        })?;
        Ok(())
    }

    /// スナップショットを読み込む。
    ///
    /// - ファイルが無い → 空
    /// - 読み込み失敗 → ログを残して空
    /// - パース失敗 → 破損ファイルを退避して空
    pub fn load(&self, path: &Path) -> HistorySnapshot {
        if !self.fs.exists(path) {
            debug!(path = %path.display(), "No history file, starting empty");
            return HistorySnapshot::new();
        }

        let raw = match self.fs.read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!(path = %path.display(), error = %e, "History file is not valid UTF-8");
                self.quarantine(path);
                return HistorySnapshot::new();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read history file");
                return HistorySnapshot::new();
            }
        };

        match HistorySnapshot::from_json(&raw) {
            Ok(snapshot) => {
                info!(
                    path = %path.display(),
                    contexts = snapshot.contexts.len(),
                    "History loaded"
                );
                snapshot
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %format!("{e:#}"),
                    "History file is corrupted"
                );
                self.quarantine(path);
                HistorySnapshot::new()
            }
        }
    }

    /// 破損ファイルを `<file>.corrupted-<timestamp>` に改名する。
    /// 改名に失敗しても呼び出し元の処理は継続する。
    fn quarantine(&self, path: &Path) -> Option<PathBuf> {
        let backup = corrupted_path(path, Utc::now());
        match self.fs.rename(path, &backup) {
            Ok(()) => {
                warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    "Corrupted history file moved aside"
                );
                Some(backup)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Failed to move corrupted history file aside"
                );
                None
            }
        }
    }
}

/// 破損ファイルの退避先パス（同じディレクトリ）
pub fn corrupted_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    with_suffix(path, &format!(".corrupted-{}", at.timestamp_millis()))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}
