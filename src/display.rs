//! 表示用の整形ユーティリティ
//!
//! 補完メニューのカラム表示と、履歴一覧の番号ラベルを組み立てる。
//! 状態は持たず、文字列を返すだけ。

use std::sync::OnceLock;

use regex::Regex;

/// 番号ラベルの幅を決めるときの最小上限
const MIN_INDEX_LIMIT: usize = 100;

/// カラム間の空白
const COLUMN_GAP: usize = 2;

/// ターミナル幅が取れないときの既定値
pub const DEFAULT_TERMINAL_WIDTH: usize = 80;

/// ANSI のカラー / スタイル指定シーケンス（CSI ... 終端文字）
fn ansi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

/// 長さ計測用に ANSI エスケープシーケンスを取り除く。
pub fn strip_ansi_codes(text: &str) -> String {
    ansi_pattern().replace_all(text, "").into_owned()
}

/// 表示上の文字数（エスケープシーケンスを除く）
pub fn visible_len(text: &str) -> usize {
    strip_ansi_codes(text).chars().count()
}

/// 履歴番号を右寄せにする。幅は `max(limit, 100)` の桁数。
///
/// ```
/// assert_eq!(histline::display::format_index(7, 50), "  7");
/// assert_eq!(histline::display::format_index(42, 1000), "  42");
/// ```
pub fn format_index(index: usize, limit: usize) -> String {
    let width = limit.max(MIN_INDEX_LIMIT).to_string().len();
    format!("{index:>width$}")
}

/// カラム表示のオプション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOptions {
    /// 1 カラムの最大幅（間の空白を含む）。切り詰めが有効なときだけ使う。
    pub max_column_width: usize,
    /// `Some(marker)` なら幅を超える項目を切り詰めて `marker` を付ける
    pub ellipsis: Option<String>,
}

impl ColumnOptions {
    pub fn from_config(config: &crate::config::DisplayConfig) -> Self {
        Self {
            max_column_width: config.max_column_width,
            ellipsis: config.truncate.then(|| config.ellipsis.clone()),
        }
    }
}

/// 現在のターミナル幅を返す。取得できなければ 80。
pub fn terminal_width() -> usize {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    if ret == 0 && ws.ws_col > 0 {
        ws.ws_col as usize
    } else {
        DEFAULT_TERMINAL_WIDTH
    }
}

/// 現在のターミナル幅に合わせて項目を格子状に並べる。
pub fn format_columns(items: &[String], options: &ColumnOptions) -> String {
    format_columns_with_width(items, options, terminal_width())
}

/// 指定した幅に合わせて項目を格子状に並べる。
///
/// 左から右、上から下の順に並べ、各セルを共通のカラム幅で埋める。
/// 行末の空白は出力しない。
pub fn format_columns_with_width(
    items: &[String],
    options: &ColumnOptions,
    terminal_width: usize,
) -> String {
    if items.is_empty() {
        return String::new();
    }

    let longest = items.iter().map(|item| visible_len(item)).max().unwrap_or(0);
    // 切り詰めない場合は上限を無視し、最長の項目に合わせる
    let column_width = match options.ellipsis {
        Some(_) => (longest + COLUMN_GAP)
            .min(options.max_column_width.max(COLUMN_GAP + 1))
            .min(terminal_width.max(COLUMN_GAP + 1)),
        None => longest + COLUMN_GAP,
    };
    let content_width = column_width - COLUMN_GAP;
    let columns = (terminal_width / column_width).max(1);

    let mut lines = Vec::new();
    for row in items.chunks(columns) {
        let mut line = String::new();
        for item in row {
            let (cell, len) = fit_cell(item, content_width, options.ellipsis.as_deref());
            line.push_str(&cell);
            line.push_str(&" ".repeat(column_width.saturating_sub(len)));
        }
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

/// セルの文字列と表示幅を返す。
///
/// 切り詰めが必要な場合はエスケープシーケンスを除いた文字列を切り詰める。
fn fit_cell(item: &str, width: usize, ellipsis: Option<&str>) -> (String, usize) {
    let len = visible_len(item);
    let Some(marker) = ellipsis else {
        return (item.to_string(), len);
    };
    if len <= width {
        return (item.to_string(), len);
    }

    let marker_len = marker.chars().count();
    if marker_len >= width {
        let cut: String = marker.chars().take(width).collect();
        return (cut, width);
    }
    let kept: String = strip_ansi_codes(item)
        .chars()
        .take(width - marker_len)
        .collect();
    (format!("{kept}{marker}"), width)
}
