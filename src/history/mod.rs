//! HistoryStore — コンテキストごとの入力履歴
//!
//! 履歴はコンテキスト名ごとに独立した [`HistoryLog`] で管理する。
//! コンテキストを使わない呼び出し元は [`DEFAULT_CONTEXT`] を渡せばよい。
//! 永続化が有効な場合、`add` / `clear` のたびに同期的にファイルへ保存する。

mod log;
pub mod persist;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::config::{HistoryConfig, HistoryOptions};
pub use log::HistoryLog;
pub use persist::{FileSystem, HistorySnapshot, OsFileSystem, PersistenceAdapter};

/// コンテキストを指定しない場合に使われる名前
pub const DEFAULT_CONTEXT: &str = "default";

/// プロンプトとビルトインで共有する履歴ストア
pub type SharedHistory = Arc<Mutex<HistoryStore>>;

/// 共有ストアをロックする。パニックで毒された場合もそのまま使う。
pub fn lock(shared: &SharedHistory) -> MutexGuard<'_, HistoryStore> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// コンテキスト名 → 履歴ログ
pub struct HistoryStore {
    config: HistoryConfig,
    storage_path: PathBuf,
    logs: BTreeMap<String, HistoryLog>,
    persistence: PersistenceAdapter,
}

impl HistoryStore {
    /// 設定から履歴ストアを作成する。永続化が有効ならファイルから復元する。
    pub fn new(config: HistoryConfig) -> Self {
        Self::with_persistence(config, PersistenceAdapter::new())
    }

    /// 共有用に包む。
    pub fn into_shared(self) -> SharedHistory {
        Arc::new(Mutex::new(self))
    }

    /// 永続化アダプタを指定して作成する（テスト用にも使用）。
    pub fn with_persistence(config: HistoryConfig, persistence: PersistenceAdapter) -> Self {
        let storage_path =
            persistence.resolve_path(&config.storage_location, &config.storage_file_name);
        let mut store = Self {
            config,
            storage_path,
            logs: BTreeMap::new(),
            persistence,
        };
        if store.config.persistent {
            store.reload();
        }
        store
    }

    /// 保存ファイルから全コンテキストを読み直す。各コンテキストは上限件数に切り詰める。
    fn reload(&mut self) {
        let capacity = self.config.effective_capacity();
        let snapshot = self.persistence.load(&self.storage_path);
        self.logs = snapshot
            .contexts()
            .map(|(name, entries)| {
                (
                    name.to_string(),
                    HistoryLog::from_entries(entries.iter().cloned(), capacity),
                )
            })
            .collect();
        info!(
            path = %self.storage_path.display(),
            contexts = self.logs.len(),
            "History restored"
        );
    }

    /// 行を履歴に追加する。
    ///
    /// - ブラックリストに含まれる行は無視する
    /// - 直前と同じ行は追加しないが、カーソルはドラフト位置に戻す
    /// - 上限を超えたら古いものから捨てる
    pub fn add(&mut self, context: &str, line: &str) {
        if self.config.blacklist.contains(line) {
            debug!(context, "Blacklisted line not recorded");
            return;
        }

        let capacity = self.config.effective_capacity();
        let inserted = self.log_mut(context).push(line, capacity);
        debug!(context, inserted, "History entry added");

        self.persist();
    }

    /// 編集中の行を記録する。ドラフト位置に戻ったとき `get_next` がこの値を返す。
    pub fn set_draft(&mut self, context: &str, line: &str) {
        self.log_mut(context).set_draft(line);
    }

    /// 1 つ古いエントリを返す。これ以上戻れない場合は `None`。
    pub fn get_previous(&mut self, context: &str) -> Option<String> {
        self.logs.get_mut(context)?.previous()
    }

    /// 1 つ新しいエントリを返す。最新エントリの次はドラフト、その先は `None`。
    pub fn get_next(&mut self, context: &str) -> Option<String> {
        self.logs.get_mut(context)?.next()
    }

    /// 全エントリのコピーを古い順に返す。
    pub fn get_all(&self, context: &str) -> Vec<String> {
        self.logs
            .get(context)
            .map(HistoryLog::entries)
            .unwrap_or_default()
    }

    /// カーソル位置。未使用のコンテキストでは 0。
    pub fn cursor(&self, context: &str) -> usize {
        self.logs.get(context).map(HistoryLog::cursor).unwrap_or(0)
    }

    /// カーソルがドラフト位置にあるか（ナビゲーション中でないか）。
    pub fn is_at_draft(&self, context: &str) -> bool {
        self.logs.get(context).map_or(true, HistoryLog::at_draft)
    }

    /// 行を追加せずにカーソルをドラフト位置へ戻す（空行の確定やキャンセル時）。
    pub fn reset_navigation(&mut self, context: &str) {
        if let Some(log) = self.logs.get_mut(context) {
            log.reset_cursor();
        }
    }

    pub fn clear(&mut self, context: &str) {
        if let Some(log) = self.logs.get_mut(context) {
            log.clear();
        }
        info!(context, "History cleared");
        self.persist();
    }

    pub fn clear_all(&mut self) {
        for log in self.logs.values_mut() {
            log.clear();
        }
        info!("All history cleared");
        self.persist();
    }

    /// 実行時に設定を更新する。
    ///
    /// 保存先が変わっても読み直しはしない（メモリ上の履歴をそのまま使い続ける）。
    /// 上限を下げた場合は既存の履歴を古いものから切り詰める。
    pub fn configure(&mut self, options: HistoryOptions) {
        self.config.apply(options);
        self.storage_path = self
            .persistence
            .resolve_path(&self.config.storage_location, &self.config.storage_file_name);

        let capacity = self.config.effective_capacity();
        for log in self.logs.values_mut() {
            log.truncate_to(capacity);
        }
        info!(
            capacity,
            persistent = self.config.persistent,
            path = %self.storage_path.display(),
            "History reconfigured"
        );
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// 現在の設定から導出した保存先パス
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// 全コンテキストのスナップショット
    pub fn snapshot(&self) -> HistorySnapshot {
        let mut snapshot = HistorySnapshot::new();
        for (name, log) in &self.logs {
            snapshot.insert(name, log.entries());
        }
        snapshot
    }

    fn log_mut(&mut self, context: &str) -> &mut HistoryLog {
        self.logs.entry(context.to_string()).or_default()
    }

    fn persist(&self) {
        if self.config.persistent {
            self.persistence.save(&self.storage_path, &self.snapshot());
        }
    }
}
