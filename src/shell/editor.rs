//! reedline エディタの構築
//!
//! 補完メニュー、キーバインディング、履歴、オートサジェストを設定した
//! reedline エディタを構築する。

use std::sync::Arc;

use histline::cli::completer::HistlineCompleter;
use histline::cli::history::HistlineHistory;
use histline::completion::CandidateSource;
use histline::display::ColumnOptions;
use histline::history::SharedHistory;
use nu_ansi_term::{Color, Style};
use reedline::{
    default_emacs_keybindings, ColumnarMenu, DefaultHinter, Emacs, KeyCode, KeyModifiers,
    MenuBuilder, Reedline, ReedlineEvent, ReedlineMenu,
};

const COMPLETION_MENU: &str = "completion_menu";

/// 補完・履歴・キーバインディングを設定した reedline エディタを構築する。
///
/// 履歴は `history` の `context` を読み書きする。Up/Down と Ctrl-P/Ctrl-N は
/// Emacs モードの既定のバインディングで履歴をたどる。
pub fn build_editor(
    history: SharedHistory,
    context: &str,
    source: Arc<CandidateSource>,
    menu: &ColumnOptions,
) -> Reedline {
    let completer = Box::new(HistlineCompleter::new(source));
    let completion_menu = Box::new(
        ColumnarMenu::default()
            .with_name(COMPLETION_MENU)
            .with_column_width(Some(menu.max_column_width)),
    );

    // 同じコンテキストの履歴からグレーテキストで候補を表示
    let hinter = Box::new(
        DefaultHinter::default()
            .with_style(Style::new().fg(Color::DarkGray))
            .with_min_chars(2),
    );

    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu(COMPLETION_MENU.to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );

    Reedline::create()
        .with_history(Box::new(HistlineHistory::new(history, context)))
        .with_hinter(hinter)
        .with_completer(completer)
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_edit_mode(Box::new(Emacs::new(keybindings)))
}
