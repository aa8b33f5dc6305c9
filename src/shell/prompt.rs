//! 履歴コンテキスト名を表示するプロンプト

use std::borrow::Cow;

use reedline::{Color, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus};

use super::color::bold_cyan;

/// `<context>> ` 形式のプロンプト。
///
/// 履歴検索中 (Ctrl-R) は検索語と一致状況を表示する。
pub struct HistlinePrompt {
    context: String,
}

impl HistlinePrompt {
    pub fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
        }
    }
}

impl Prompt for HistlinePrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(bold_cyan(&self.context))
    }

    fn get_prompt_color(&self) -> Color {
        Color::Cyan
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Owned(bold_cyan("> "))
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed(" :: ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "(failed) ",
        };
        Cow::Owned(format!("{prefix}(search: '{}') ", history_search.term))
    }
}
