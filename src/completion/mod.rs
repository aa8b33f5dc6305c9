//! 補完エンジン — Tab キーで入力中の行を補完する
//!
//! 候補のうち入力中の行で始まるものを集め、
//! - 1 件だけ → その候補
//! - 複数件で共通の続きがある → 共通接頭辞まで伸ばした行
//! - 複数件で共通の続きが無い → 候補一覧（メニュー表示用）
//!
//! を返す。入力中の行は正規表現としては解釈せず、リテラルとして照合する。

mod source;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use regex::Regex;
use tracing::debug;

pub use source::CandidateSource;

/// 補完結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    /// 置き換え後の行（一意に決まった）
    Unique(String),
    /// 共通接頭辞まで伸ばした行（まだ候補が複数ある）
    Extended(String),
    /// 共通の続きが無い候補一覧
    Ambiguous(Vec<String>),
}

impl CompletionResult {
    /// 行を置き換える文字列。`Ambiguous` の場合は `None`。
    pub fn replacement(&self) -> Option<&str> {
        match self {
            Self::Unique(line) | Self::Extended(line) => Some(line),
            Self::Ambiguous(_) => None,
        }
    }
}

/// 選ばれた 1 件に適用する後処理
pub type ResultFilter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// 補完オプション
#[derive(Clone, Default)]
pub struct CompleteOptions {
    /// 置き換え文字列に適用するフィルタ。`None` なら恒等変換。
    pub result_filter: Option<ResultFilter>,
}

impl fmt::Debug for CompleteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompleteOptions")
            .field("result_filter", &self.result_filter.as_ref().map(|_| ".."))
            .finish()
    }
}

impl CompleteOptions {
    pub fn with_result_filter<F>(filter: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            result_filter: Some(Arc::new(filter)),
        }
    }

    fn filter(&self, line: &str) -> String {
        match &self.result_filter {
            Some(filter) => filter(line),
            None => line.to_string(),
        }
    }
}

/// 入力中の行をリテラルとして扱う前方一致パターンを作る。
fn literal_prefix_pattern(partial: &str) -> Option<Regex> {
    Regex::new(&format!("^{}", regex::escape(partial))).ok()
}

/// 候補から補完結果を計算する。状態を持たない純粋関数。
///
/// 共通接頭辞までの展開は `Unique` ではなく [`CompletionResult::Extended`] で返す。
/// どちらも置き換え後の行を持つので、行を置き換えるだけの呼び出し元は区別しなくてよい。
pub fn compute(partial: &str, candidates: &[String], options: &CompleteOptions) -> CompletionResult {
    // パターンが組めない極端な入力でも、前方一致の意味は変わらない
    let matches: Vec<&str> = match literal_prefix_pattern(partial) {
        Some(pattern) => candidates
            .iter()
            .map(String::as_str)
            .filter(|c| pattern.is_match(c))
            .collect(),
        None => candidates
            .iter()
            .map(String::as_str)
            .filter(|c| c.starts_with(partial))
            .collect(),
    };

    match matches.as_slice() {
        [] => CompletionResult::Unique(options.filter(partial)),
        [only] => CompletionResult::Unique(options.filter(only)),
        _ => {
            let extension = common_extension(partial.chars().count(), &matches);
            if extension.is_empty() {
                CompletionResult::Ambiguous(matches.iter().map(|m| m.to_string()).collect())
            } else {
                CompletionResult::Extended(options.filter(&format!("{partial}{extension}")))
            }
        }
    }
}

/// `start` 文字目以降で全候補が共有している文字列を返す。
///
/// いずれかの候補が尽きるか、候補間で文字が食い違った位置で止まる。
fn common_extension(start: usize, matches: &[&str]) -> String {
    let columns: Vec<Vec<char>> = matches.iter().map(|m| m.chars().collect()).collect();
    let max_len = columns.iter().map(Vec::len).max().unwrap_or(0);

    let mut buffer = String::new();
    for pos in start..max_len {
        let mut shared: Option<char> = None;
        for chars in &columns {
            let Some(&c) = chars.get(pos) else {
                return buffer;
            };
            match shared {
                Some(s) if s != c => return buffer,
                _ => shared = Some(c),
            }
        }
        if let Some(c) = shared {
            buffer.push(c);
        }
    }
    buffer
}

/// 補完リクエストを処理する。
///
/// リクエストには連番を振り、非同期の候補取得を待っている間に
/// 新しいリクエストが始まった場合は古い結果を捨てる。
#[derive(Debug, Default)]
pub struct CompletionEngine {
    latest: AtomicU64,
}

impl CompletionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 候補を取得して補完結果を返す。
    ///
    /// 戻り値:
    /// - `Ok(Some(result))` — 補完結果
    /// - `Ok(None)` — 待っている間に新しいリクエストが始まったため破棄
    /// - `Err(_)` — 候補の供給元が失敗した
    pub async fn complete(
        &self,
        partial: &str,
        source: &CandidateSource,
        options: &CompleteOptions,
    ) -> Result<Option<CompletionResult>> {
        let ticket = self.begin();
        let candidates = source.resolve(partial).await?;

        if self.latest.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "Discarding stale completion result");
            return Ok(None);
        }

        let result = compute(partial, &candidates, options);
        debug!(candidates = candidates.len(), result = ?result, "Completion computed");
        Ok(Some(result))
    }

    /// 同期版。呼び出し中に別リクエストが割り込むことはないので常に結果を返す。
    pub fn complete_blocking(
        &self,
        partial: &str,
        source: &CandidateSource,
        options: &CompleteOptions,
    ) -> Result<CompletionResult> {
        self.begin();
        let candidates = source.resolve_blocking(partial)?;
        Ok(compute(partial, &candidates, options))
    }

    fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }
}
