//! reedline 用の補完アダプタ
//!
//! カーソルより前の行全体を補完対象とし、結果を [`Suggestion`] に変換する。

use std::sync::Arc;

use reedline::{Completer, Span, Suggestion};
use tracing::warn;

use crate::completion::{CandidateSource, CompleteOptions, CompletionEngine, CompletionResult};

/// [`CompletionEngine`] を reedline の [`Completer`] として使う。
pub struct HistlineCompleter {
    engine: CompletionEngine,
    source: Arc<CandidateSource>,
    options: CompleteOptions,
}

impl HistlineCompleter {
    /// 供給元はビルトインの `complete` と共有できるよう `Arc` でも受け取る。
    pub fn new(source: impl Into<Arc<CandidateSource>>) -> Self {
        Self {
            engine: CompletionEngine::new(),
            source: source.into(),
            options: CompleteOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompleteOptions) -> Self {
        self.options = options;
        self
    }

    fn suggestion(value: String, span: Span) -> Suggestion {
        Suggestion {
            value,
            span,
            append_whitespace: false,
            ..Default::default()
        }
    }
}

impl Completer for HistlineCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let partial = line.get(..pos).unwrap_or(line);
        let span = Span::new(0, partial.len());

        let result = match self
            .engine
            .complete_blocking(partial, &self.source, &self.options)
        {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Candidate source failed");
                return Vec::new();
            }
        };

        match result {
            CompletionResult::Unique(value) | CompletionResult::Extended(value) => {
                // 変化がなければ候補を出さない
                if value == partial {
                    Vec::new()
                } else {
                    vec![Self::suggestion(value, span)]
                }
            }
            CompletionResult::Ambiguous(items) => items
                .into_iter()
                .map(|item| Self::suggestion(item, span))
                .collect(),
        }
    }
}
