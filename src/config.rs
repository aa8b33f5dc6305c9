//! 設定ファイル管理
//!
//! `~/.config/histline/config.toml` から TOML 形式の設定を読み込む。
//! ファイルが存在しない場合はテンプレートを生成し、デフォルト値を使用する。
//!
//! # 設定ファイル例
//!
//! ```toml
//! [history]
//! capacity = 500
//! blacklist = ["exit"]
//! persistent = true
//! storage_file_name = "history.json"
//!
//! [completion]
//! candidates = ["status", "start", "stop"]
//! path_commands = false
//!
//! [display]
//! max_column_width = 24
//! truncate = true
//! ellipsis = "…"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::history::DEFAULT_CONTEXT;

/// 履歴件数のデフォルト上限
pub const DEFAULT_CAPACITY: usize = 100;

/// 設定全体
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HistlineConfig {
    pub history: HistoryConfig,
    pub completion: CompletionConfig,
    pub display: DisplayConfig,
}

/// 履歴の設定
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HistoryConfig {
    /// 1 コンテキストあたりの最大保持件数（1 以上）
    pub capacity: usize,
    /// 履歴に残さない行（完全一致）
    pub blacklist: HashSet<String>,
    /// ファイルに保存するか
    pub persistent: bool,
    /// 保存先ディレクトリ
    pub storage_location: PathBuf,
    /// 保存ファイル名
    pub storage_file_name: String,
    /// プロンプトが使用するコンテキスト名
    pub context: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            blacklist: HashSet::new(),
            persistent: false,
            storage_location: data_dir(),
            storage_file_name: "history.json".to_string(),
            context: DEFAULT_CONTEXT.to_string(),
        }
    }
}

/// `HistoryStore::configure` に渡す部分更新。`None` のフィールドは変更しない。
#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    pub capacity: Option<usize>,
    pub blacklist: Option<HashSet<String>>,
    pub persistent: Option<bool>,
    pub storage_location: Option<PathBuf>,
    pub storage_file_name: Option<String>,
}

impl HistoryConfig {
    /// 部分更新を適用する。
    pub fn apply(&mut self, options: HistoryOptions) {
        if let Some(capacity) = options.capacity {
            self.capacity = capacity;
        }
        if let Some(blacklist) = options.blacklist {
            self.blacklist = blacklist;
        }
        if let Some(persistent) = options.persistent {
            self.persistent = persistent;
        }
        if let Some(location) = options.storage_location {
            self.storage_location = location;
        }
        if let Some(name) = options.storage_file_name {
            self.storage_file_name = name;
        }
    }

    /// 0 が指定された場合でも 1 件は保持する。
    pub fn effective_capacity(&self) -> usize {
        self.capacity.max(1)
    }
}

/// 補完の設定
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompletionConfig {
    /// 固定の補完候補
    pub candidates: Vec<String>,
    /// 先頭トークンで PATH 内のコマンド名も候補にするか
    pub path_commands: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            path_commands: true,
        }
    }
}

/// 補完メニュー表示の設定
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// 1 カラムの最大幅
    pub max_column_width: usize,
    /// 幅を超える候補を省略表示するか
    pub truncate: bool,
    /// 省略時の末尾記号
    pub ellipsis: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_column_width: 32,
            truncate: true,
            ellipsis: "...".to_string(),
        }
    }
}

/// データディレクトリのパスを返す。
/// `directories` クレートでプラットフォームに応じたパスを決定し、
/// 取得できない場合はカレントディレクトリの `.histline` にフォールバックする。
pub fn data_dir() -> PathBuf {
    ProjectDirs::from("", "", "histline")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".histline"))
}

impl HistlineConfig {
    /// 設定ファイルを読み込む。
    ///
    /// ファイルが無ければテンプレートを生成してデフォルト値を返す。
    /// 読み込み・パースに失敗した場合は警告を表示してデフォルト値を返す。
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// 指定パスから読み込む（テスト用にも使用）。
    pub fn load_from(path: &Path) -> Self {
        debug!(path = %path.display(), "Loading config file");

        if !path.exists() {
            Self::create_default_config(path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<HistlineConfig>(&content) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        capacity = config.history.capacity,
                        persistent = config.history.persistent,
                        candidates = config.completion.candidates.len(),
                        "Config loaded successfully"
                    );
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config file");
                    eprintln!("histline: warning: failed to parse config file: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config file");
                eprintln!("histline: warning: failed to read config file: {e}");
                Self::default()
            }
        }
    }

    /// 設定ファイルのパス `~/.config/histline/config.toml` を返す。
    /// `$HOME` が取得できない場合は `./.config/histline/config.toml`。
    pub fn config_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".config/histline/config.toml")
    }

    /// 設定ファイルが存在しない場合にテンプレートから生成する。
    /// 生成に失敗しても起動は継続する。
    fn create_default_config(path: &Path) {
        const TEMPLATE: &str = r#"# histline configuration

[history]
# capacity = 100
# blacklist = ["exit"]
persistent = true
# storage_location = "/path/to/dir"
# storage_file_name = "history.json"
# context = "default"

[completion]
# candidates = ["help", "history", "exit"]
# path_commands = true

[display]
# max_column_width = 32
# truncate = true
# ellipsis = "..."
"#;

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "Failed to create config directory");
                eprintln!("histline: warning: failed to create config directory: {e}");
                return;
            }
        }

        match std::fs::write(path, TEMPLATE) {
            Ok(()) => {
                info!(path = %path.display(), "Created default config file");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to create default config file");
                eprintln!("histline: warning: failed to create config file: {e}");
            }
        }
    }
}
