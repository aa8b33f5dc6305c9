//! PromptSession — キー入力を履歴・補完の操作に振り分ける
//!
//! reedline と同じキー表現 ([`KeyCode`] と [`KeyModifiers`]) を 1 つずつ受け取り、
//! 編集中の行を更新して画面側がすべきこと（再描画・メニュー表示・確定など）を
//! [`KeyOutcome`] で返す。

use std::sync::{Arc, MutexGuard};

use anyhow::Result;
use reedline::{KeyCode, KeyModifiers};
use tracing::debug;

use crate::completion::{CandidateSource, CompleteOptions, CompletionEngine, CompletionResult};
use crate::history::{self, HistoryStore, SharedHistory};

/// キー処理の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// 行が変わったので再描画する
    Redraw,
    /// 何も起きなかった
    Unchanged,
    /// 補完候補が絞れないので一覧を表示する
    ShowMenu(Vec<String>),
    /// 行が確定した
    Submit(String),
    /// 入力中の行を破棄した
    Cancel,
    /// 入力終了
    Eof,
}

/// 1 つのプロンプトの入力状態
pub struct PromptSession {
    context: String,
    history: SharedHistory,
    engine: CompletionEngine,
    source: Arc<CandidateSource>,
    options: CompleteOptions,
    line: String,
}

impl PromptSession {
    pub fn new(context: &str, history: HistoryStore, source: CandidateSource) -> Self {
        Self::from_shared(context, history.into_shared(), Arc::new(source))
    }

    /// 履歴ストアと候補の供給元を他の部品（reedline アダプタ等）と共有して作る。
    pub fn from_shared(
        context: &str,
        history: SharedHistory,
        source: Arc<CandidateSource>,
    ) -> Self {
        Self {
            context: context.to_string(),
            history,
            engine: CompletionEngine::new(),
            source,
            options: CompleteOptions::default(),
            line: String::new(),
        }
    }

    pub fn with_options(mut self, options: CompleteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// 編集中の行
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn set_line(&mut self, line: &str) {
        self.line = line.to_string();
    }

    /// 履歴ストアをロックして返す。ガードを持ったまま `handle_key` を呼ばないこと。
    pub fn history(&self) -> MutexGuard<'_, HistoryStore> {
        history::lock(&self.history)
    }

    pub fn shared_history(&self) -> SharedHistory {
        Arc::clone(&self.history)
    }

    pub fn source(&self) -> Arc<CandidateSource> {
        Arc::clone(&self.source)
    }

    /// キーを 1 つ処理する。
    ///
    /// - Up / Ctrl-P: 1 つ古い履歴、Down / Ctrl-N: 1 つ新しい履歴
    /// - Tab: 補完、Enter: 確定
    /// - Ctrl-C: 行を破棄、Ctrl-D: 空行なら入力終了、Ctrl-U: 行を消去
    ///
    /// 補完候補の供給元が失敗した場合のみ `Err` を返す。行はそのまま残る。
    pub async fn handle_key(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<KeyOutcome> {
        let plain = modifiers == KeyModifiers::NONE || modifiers == KeyModifiers::SHIFT;
        let ctrl = modifiers == KeyModifiers::CONTROL;

        let outcome = match code {
            KeyCode::Up => self.recall_previous(),
            KeyCode::Char('p') if ctrl => self.recall_previous(),
            KeyCode::Down => self.recall_next(),
            KeyCode::Char('n') if ctrl => self.recall_next(),
            KeyCode::Tab => self.complete().await?,
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => match self.line.pop() {
                Some(_) => KeyOutcome::Redraw,
                None => KeyOutcome::Unchanged,
            },
            KeyCode::Char('u') if ctrl => {
                self.line.clear();
                KeyOutcome::Redraw
            }
            KeyCode::Char('c') if ctrl => {
                self.line.clear();
                self.history().reset_navigation(&self.context);
                KeyOutcome::Cancel
            }
            KeyCode::Char('d') if ctrl && self.line.is_empty() => KeyOutcome::Eof,
            KeyCode::Char(c) if plain => {
                self.line.push(c);
                KeyOutcome::Redraw
            }
            _ => KeyOutcome::Unchanged,
        };
        Ok(outcome)
    }

    fn recall_previous(&mut self) -> KeyOutcome {
        let recalled = {
            let mut history = history::lock(&self.history);
            // ドラフト位置から離れるときに編集中の行を退避する
            if history.is_at_draft(&self.context) {
                history.set_draft(&self.context, &self.line);
            }
            history.get_previous(&self.context)
        };
        self.replace_line(recalled)
    }

    fn recall_next(&mut self) -> KeyOutcome {
        let recalled = history::lock(&self.history).get_next(&self.context);
        self.replace_line(recalled)
    }

    fn replace_line(&mut self, recalled: Option<String>) -> KeyOutcome {
        match recalled {
            Some(line) => {
                self.line = line;
                KeyOutcome::Redraw
            }
            None => KeyOutcome::Unchanged,
        }
    }

    async fn complete(&mut self) -> Result<KeyOutcome> {
        let result = self
            .engine
            .complete(&self.line, &self.source, &self.options)
            .await?;

        Ok(match result {
            None => KeyOutcome::Unchanged,
            Some(CompletionResult::Ambiguous(items)) => KeyOutcome::ShowMenu(items),
            Some(CompletionResult::Unique(line) | CompletionResult::Extended(line)) => {
                if line == self.line {
                    KeyOutcome::Unchanged
                } else {
                    self.line = line;
                    KeyOutcome::Redraw
                }
            }
        })
    }

    /// 行を確定して履歴に追加する。空白だけの行は履歴に残さない。
    fn submit(&mut self) -> KeyOutcome {
        let line = std::mem::take(&mut self.line);
        let mut history = history::lock(&self.history);
        if line.trim().is_empty() {
            history.reset_navigation(&self.context);
        } else {
            history.add(&self.context, &line);
        }
        debug!(context = %self.context, "Line submitted");
        KeyOutcome::Submit(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HistoryConfig;
    use crate::history::DEFAULT_CONTEXT;

    fn session(source: CandidateSource) -> PromptSession {
        let history = HistoryStore::new(HistoryConfig {
            persistent: false,
            ..Default::default()
        });
        PromptSession::new(DEFAULT_CONTEXT, history, source)
    }

    async fn press(session: &mut PromptSession, code: KeyCode) -> KeyOutcome {
        session.handle_key(code, KeyModifiers::NONE).await.unwrap()
    }

    async fn ctrl(session: &mut PromptSession, c: char) -> KeyOutcome {
        session
            .handle_key(KeyCode::Char(c), KeyModifiers::CONTROL)
            .await
            .unwrap()
    }

    async fn type_line(session: &mut PromptSession, text: &str) {
        for c in text.chars() {
            press(session, KeyCode::Char(c)).await;
        }
    }

    async fn submit(session: &mut PromptSession, text: &str) -> KeyOutcome {
        type_line(session, text).await;
        press(session, KeyCode::Enter).await
    }

    #[tokio::test]
    async fn enter_submits_and_records_history() {
        let mut s = session(CandidateSource::list(Vec::<String>::new()));
        assert_eq!(submit(&mut s, "ls -la").await, KeyOutcome::Submit("ls -la".into()));
        assert_eq!(s.line(), "");
        assert_eq!(s.history().get_all(DEFAULT_CONTEXT), vec!["ls -la"]);
    }

    #[tokio::test]
    async fn blank_lines_are_not_recorded() {
        let mut s = session(CandidateSource::list(Vec::<String>::new()));
        submit(&mut s, "   ").await;
        assert!(s.history().get_all(DEFAULT_CONTEXT).is_empty());
    }

    #[tokio::test]
    async fn up_and_down_restore_the_draft() {
        let mut s = session(CandidateSource::list(Vec::<String>::new()));
        submit(&mut s, "one").await;
        submit(&mut s, "two").await;
        type_line(&mut s, "thr").await;

        assert_eq!(press(&mut s, KeyCode::Up).await, KeyOutcome::Redraw);
        assert_eq!(s.line(), "two");
        press(&mut s, KeyCode::Up).await;
        assert_eq!(s.line(), "one");
        assert_eq!(press(&mut s, KeyCode::Up).await, KeyOutcome::Unchanged);

        press(&mut s, KeyCode::Down).await;
        assert_eq!(s.line(), "two");
        press(&mut s, KeyCode::Down).await;
        assert_eq!(s.line(), "thr");
        assert_eq!(press(&mut s, KeyCode::Down).await, KeyOutcome::Unchanged);
    }

    #[tokio::test]
    async fn editing_a_recalled_line_keeps_original_draft() {
        let mut s = session(CandidateSource::list(Vec::<String>::new()));
        submit(&mut s, "old").await;
        type_line(&mut s, "new").await;

        press(&mut s, KeyCode::Up).await;
        press(&mut s, KeyCode::Char('!')).await;
        // ナビゲーション中の Up では退避しない
        press(&mut s, KeyCode::Up).await;
        press(&mut s, KeyCode::Down).await;
        assert_eq!(s.line(), "new");
    }

    #[tokio::test]
    async fn tab_completes_unique_candidate() {
        let mut s = session(CandidateSource::list(["status", "list"]));
        type_line(&mut s, "st").await;
        assert_eq!(press(&mut s, KeyCode::Tab).await, KeyOutcome::Redraw);
        assert_eq!(s.line(), "status");
    }

    #[tokio::test]
    async fn repeated_tab_extends_then_shows_menu() {
        let mut s = session(CandidateSource::list(["start", "stop"]));
        type_line(&mut s, "s").await;

        assert_eq!(press(&mut s, KeyCode::Tab).await, KeyOutcome::Redraw);
        assert_eq!(s.line(), "st");
        assert_eq!(
            press(&mut s, KeyCode::Tab).await,
            KeyOutcome::ShowMenu(vec!["start".into(), "stop".into()])
        );
        assert_eq!(s.line(), "st");
    }

    #[tokio::test]
    async fn tab_without_match_is_unchanged() {
        let mut s = session(CandidateSource::list(["start"]));
        type_line(&mut s, "zz").await;
        assert_eq!(press(&mut s, KeyCode::Tab).await, KeyOutcome::Unchanged);
        assert_eq!(s.line(), "zz");
    }

    #[tokio::test]
    async fn result_filter_is_applied_on_tab() {
        let mut s = session(CandidateSource::list(["status"]))
            .with_options(CompleteOptions::with_result_filter(|l| format!("{l} ")));
        type_line(&mut s, "sta").await;
        press(&mut s, KeyCode::Tab).await;
        assert_eq!(s.line(), "status ");
    }

    #[tokio::test]
    async fn supplier_error_surfaces_and_keeps_line() {
        let mut s = session(CandidateSource::from_fn(|_| anyhow::bail!("offline")));
        type_line(&mut s, "x").await;
        assert!(s.handle_key(KeyCode::Tab, KeyModifiers::NONE).await.is_err());
        assert_eq!(s.line(), "x");
    }

    #[tokio::test]
    async fn ctrl_c_cancels_and_ctrl_d_ends_on_empty_line() {
        let mut s = session(CandidateSource::list(Vec::<String>::new()));
        type_line(&mut s, "abc").await;
        assert_eq!(ctrl(&mut s, 'd').await, KeyOutcome::Unchanged);
        assert_eq!(ctrl(&mut s, 'c').await, KeyOutcome::Cancel);
        assert_eq!(s.line(), "");
        assert_eq!(ctrl(&mut s, 'd').await, KeyOutcome::Eof);
    }

    #[tokio::test]
    async fn backspace_and_ctrl_u_edit_the_line() {
        let mut s = session(CandidateSource::list(Vec::<String>::new()));
        assert_eq!(press(&mut s, KeyCode::Backspace).await, KeyOutcome::Unchanged);
        type_line(&mut s, "abc").await;
        press(&mut s, KeyCode::Backspace).await;
        assert_eq!(s.line(), "ab");
        ctrl(&mut s, 'u').await;
        assert_eq!(s.line(), "");
    }

    #[tokio::test]
    async fn ctrl_p_and_ctrl_n_navigate_like_arrows() {
        let mut s = session(CandidateSource::list(Vec::<String>::new()));
        submit(&mut s, "first").await;
        type_line(&mut s, "dr").await;

        assert_eq!(ctrl(&mut s, 'p').await, KeyOutcome::Redraw);
        assert_eq!(s.line(), "first");
        assert_eq!(ctrl(&mut s, 'n').await, KeyOutcome::Redraw);
        assert_eq!(s.line(), "dr");
    }

    #[tokio::test]
    async fn control_chords_are_not_inserted() {
        let mut s = session(CandidateSource::list(Vec::<String>::new()));
        assert_eq!(ctrl(&mut s, 'x').await, KeyOutcome::Unchanged);
        assert_eq!(
            s.handle_key(KeyCode::Char('A'), KeyModifiers::SHIFT)
                .await
                .unwrap(),
            KeyOutcome::Redraw
        );
        assert_eq!(press(&mut s, KeyCode::Esc).await, KeyOutcome::Unchanged);
        assert_eq!(s.line(), "A");
    }

    #[tokio::test]
    async fn shared_history_sees_submitted_lines() {
        let mut s = session(CandidateSource::list(Vec::<String>::new()));
        let shared = s.shared_history();
        submit(&mut s, "make").await;
        assert_eq!(history::lock(&shared).get_all(DEFAULT_CONTEXT), vec!["make"]);
    }
}
