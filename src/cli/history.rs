//! HistlineHistory — reedline の History トレイトを [`HistoryStore`] 上に実装
//!
//! 1 つのコンテキストの履歴を reedline に見せる。ID は古い順の 0 始まりの位置。
//! ストアはビルトイン（`history clear` 等）と共有するので、
//! 呼び出しごとにロックして最新の状態を読む。

use reedline::{
    CommandLineSearch, History, HistoryItem, HistoryItemId, HistorySessionId, ReedlineError,
    SearchDirection, SearchQuery,
};
use tracing::debug;

use crate::history::{self, SharedHistory};

/// reedline の History トレイトを共有の [`HistoryStore`](crate::history::HistoryStore) 上に実装する。
///
/// 時刻・ホスト名・作業ディレクトリ・終了コードは記録しないため、
/// それらの検索条件は無視する。
pub struct HistlineHistory {
    store: SharedHistory,
    context: String,
}

impl HistlineHistory {
    pub fn new(store: SharedHistory, context: &str) -> Self {
        Self {
            store,
            context: context.to_string(),
        }
    }

    fn entries(&self) -> Vec<String> {
        history::lock(&self.store).get_all(&self.context)
    }

    fn unknown_id(id: HistoryItemId) -> ReedlineError {
        std::io::Error::other(format!("no history entry with id {}", id.0)).into()
    }

    fn to_item(index: usize, line: String) -> HistoryItem {
        let mut item = HistoryItem::from_command_line(line);
        item.id = Some(HistoryItemId::new(index as i64));
        item
    }

    /// コマンドラインの条件に合うか。
    fn matches(query: &SearchQuery, line: &str) -> bool {
        let included = match &query.filter.command_line {
            Some(CommandLineSearch::Prefix(p)) => line.starts_with(p.as_str()),
            Some(CommandLineSearch::Substring(s)) => line.contains(s.as_str()),
            Some(CommandLineSearch::Exact(e)) => line == e,
            None => true,
        };
        included && query.filter.not_command_line.as_deref() != Some(line)
    }
}

impl History for HistlineHistory {
    fn save(&mut self, h: HistoryItem) -> Result<HistoryItem, ReedlineError> {
        // 空のコマンドは保存しない
        if h.command_line.trim().is_empty() {
            return Ok(h);
        }

        let mut store = history::lock(&self.store);
        store.add(&self.context, &h.command_line);
        let last = store.get_all(&self.context).len().checked_sub(1);
        debug!(context = %self.context, "Line saved from editor");

        Ok(HistoryItem {
            id: last.map(|i| HistoryItemId::new(i as i64)),
            ..h
        })
    }

    fn load(&self, id: HistoryItemId) -> Result<HistoryItem, ReedlineError> {
        let index = usize::try_from(id.0).map_err(|_| Self::unknown_id(id))?;
        self.entries()
            .into_iter()
            .nth(index)
            .map(|line| Self::to_item(index, line))
            .ok_or_else(|| Self::unknown_id(id))
    }

    fn count(&self, query: SearchQuery) -> Result<i64, ReedlineError> {
        Ok(self.search(query)?.len() as i64)
    }

    /// `start_id` / `end_id` は検索方向に沿った排他的な境界として扱う。
    fn search(&self, query: SearchQuery) -> Result<Vec<HistoryItem>, ReedlineError> {
        let entries = self.entries();
        let (lower, upper) = match query.direction {
            SearchDirection::Forward => (query.start_id, query.end_id),
            SearchDirection::Backward => (query.end_id, query.start_id),
        };
        let first = lower.map_or(0, |id| id.0.saturating_add(1));
        let last = upper.map_or(entries.len() as i64, |id| id.0);
        let limit = query
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(0));

        let in_range = entries
            .into_iter()
            .enumerate()
            .filter(|(i, _)| (first..last).contains(&(*i as i64)))
            .filter(|(_, line)| Self::matches(&query, line));

        let items: Vec<HistoryItem> = match query.direction {
            SearchDirection::Forward => in_range.take(limit).collect::<Vec<_>>(),
            SearchDirection::Backward => {
                let mut all: Vec<_> = in_range.collect();
                all.reverse();
                all.truncate(limit);
                all
            }
        }
        .into_iter()
        .map(|(i, line)| Self::to_item(i, line))
        .collect();

        Ok(items)
    }

    /// 付随情報は持たないので、存在確認だけ行う。
    fn update(
        &mut self,
        id: HistoryItemId,
        _updater: &dyn Fn(HistoryItem) -> HistoryItem,
    ) -> Result<(), ReedlineError> {
        self.load(id).map(|_| ())
    }

    fn clear(&mut self) -> Result<(), ReedlineError> {
        history::lock(&self.store).clear(&self.context);
        Ok(())
    }

    fn delete(&mut self, h: HistoryItemId) -> Result<(), ReedlineError> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("deleting history entry {} is not supported", h.0),
        )
        .into())
    }

    fn sync(&mut self) -> std::io::Result<()> {
        // 追加・消去のたびにストアが保存するため no-op
        Ok(())
    }

    fn session(&self) -> Option<HistorySessionId> {
        None
    }
}
