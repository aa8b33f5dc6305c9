//! HistoryLog — 1 コンテキスト分の履歴とナビゲーションカーソル
//!
//! - `entries` は古い順。末尾が最新。
//! - `cursor` は `0..=entries.len()` の範囲。`entries.len()` はドラフト位置を表す。
//! - 直前と同じ行は追加しない（隣接重複のみ抑制）。

use std::collections::VecDeque;

/// 1 コンテキスト分の履歴ログ。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLog {
    entries: VecDeque<String>,
    cursor: usize,
    /// ナビゲーション開始前に編集中だった行
    draft: String,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みの行から履歴を復元する。
    ///
    /// `capacity` を超える分は古いものから捨てる。隣接重複は畳み込む。
    pub fn from_entries<I>(entries: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut log = Self::new();
        for entry in entries {
            if log.entries.back() != Some(&entry) {
                log.entries.push_back(entry);
            }
        }
        log.truncate_to(capacity);
        log.cursor = log.entries.len();
        log
    }

    /// 行を追加し、カーソルをドラフト位置に戻す。
    ///
    /// 戻り値: 実際に追加された場合 `true`（直前と同じ行なら `false`）。
    pub fn push(&mut self, line: &str, capacity: usize) -> bool {
        let inserted = if self.entries.back().map(String::as_str) == Some(line) {
            false
        } else {
            self.entries.push_back(line.to_string());
            self.truncate_to(capacity);
            true
        };
        self.cursor = self.entries.len();
        self.draft.clear();
        inserted
    }

    /// 古いエントリを先頭から捨て、`capacity` 件以下にする。
    /// カーソルは同じエントリを指し続けるよう、捨てた件数だけ前にずらす。
    pub fn truncate_to(&mut self, capacity: usize) {
        let excess = self.entries.len().saturating_sub(capacity);
        self.entries.drain(..excess);
        self.cursor = self.cursor.saturating_sub(excess).min(self.entries.len());
    }

    pub fn set_draft(&mut self, line: &str) {
        self.draft = line.to_string();
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// 1 つ古いエントリへ移動する。先頭にいる場合は `None`。
    pub fn previous(&mut self) -> Option<String> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).cloned()
    }

    /// 1 つ新しいエントリへ移動する。
    ///
    /// 最新エントリからさらに進むとドラフト位置に入り、保存済みのドラフトを返す。
    /// 既にドラフト位置にいる場合は `None`。
    pub fn next(&mut self) -> Option<String> {
        let len = self.entries.len();
        if self.cursor >= len {
            return None;
        }
        self.cursor += 1;
        if self.cursor == len {
            Some(self.draft.clone())
        } else {
            self.entries.get(self.cursor).cloned()
        }
    }

    /// エントリのコピーを古い順に返す。
    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// カーソルがドラフト位置（最新エントリの後ろ）にあるか。
    pub fn at_draft(&self) -> bool {
        self.cursor == self.entries.len()
    }

    /// ナビゲーションをやめてドラフト位置に戻る。
    pub fn reset_cursor(&mut self) {
        self.cursor = self.entries.len();
        self.draft.clear();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.draft.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(lines: &[&str], capacity: usize) -> HistoryLog {
        let mut log = HistoryLog::new();
        for line in lines {
            log.push(line, capacity);
        }
        log
    }

    #[test]
    fn push_moves_cursor_to_draft_position() {
        let log = log_of(&["a", "b"], 10);
        assert_eq!(log.cursor(), 2);
        assert!(log.at_draft());
    }

    #[test]
    fn push_suppresses_only_adjacent_duplicates() {
        let log = log_of(&["x", "x"], 10);
        assert_eq!(log.entries(), vec!["x"]);

        let log = log_of(&["x", "y", "x"], 10);
        assert_eq!(log.entries(), vec!["x", "y", "x"]);
    }

    #[test]
    fn duplicate_push_still_resets_cursor() {
        let mut log = log_of(&["a", "b"], 10);
        log.previous();
        log.previous();
        assert_eq!(log.cursor(), 0);

        assert!(!log.push("b", 10));
        assert_eq!(log.cursor(), 2);
    }

    #[test]
    fn push_evicts_oldest_beyond_capacity() {
        let log = log_of(&["1", "2", "3", "4", "5"], 3);
        assert_eq!(log.entries(), vec!["3", "4", "5"]);
        assert_eq!(log.cursor(), 3);
    }

    #[test]
    fn capacity_holds_after_every_push() {
        let mut log = HistoryLog::new();
        for i in 0..50 {
            log.push(&format!("cmd{}", i % 7), 4);
            assert!(log.len() <= 4);
            assert!(log.cursor() <= log.len());
        }
    }

    #[test]
    fn previous_stops_at_oldest() {
        let mut log = log_of(&["a"], 10);
        assert_eq!(log.previous().as_deref(), Some("a"));
        assert_eq!(log.previous(), None);
        assert_eq!(log.cursor(), 0);
    }

    #[test]
    fn next_returns_draft_then_none() {
        let mut log = log_of(&["a", "b"], 10);
        log.set_draft("typing");
        log.previous();
        assert_eq!(log.next().as_deref(), Some("typing"));
        assert_eq!(log.next(), None);
    }

    #[test]
    fn empty_log_navigation_is_noop() {
        let mut log = HistoryLog::new();
        assert_eq!(log.previous(), None);
        assert_eq!(log.next(), None);
        assert_eq!(log.cursor(), 0);
    }

    #[test]
    fn empty_string_entry_is_distinguishable_from_no_change() {
        let mut log = log_of(&[""], 10);
        assert_eq!(log.previous(), Some(String::new()));
        assert_eq!(log.previous(), None);
    }

    #[test]
    fn from_entries_keeps_newest_and_collapses_duplicates() {
        let entries = ["a", "a", "b", "c", "d"].iter().map(|s| s.to_string());
        let log = HistoryLog::from_entries(entries, 2);
        assert_eq!(log.entries(), vec!["c", "d"]);
        assert!(log.at_draft());
    }

    #[test]
    fn truncate_clamps_cursor() {
        let mut log = log_of(&["a", "b", "c"], 10);
        log.truncate_to(1);
        assert_eq!(log.entries(), vec!["c"]);
        assert_eq!(log.cursor(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut log = log_of(&["a", "b"], 10);
        log.set_draft("wip");
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.cursor(), 0);
        assert_eq!(log.draft(), "");
    }
}
