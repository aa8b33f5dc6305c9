use clap::Parser;

use super::{BuiltinContext, CommandResult};
use crate::completion::{CompleteOptions, CompletionEngine, CompletionResult};
use crate::display::format_columns;

/// complete: 入力中の行の補完結果を表示する。
#[derive(Parser)]
#[command(name = "complete", about = "入力中の行の補完結果を表示する")]
struct CompleteArgs {
    /// 補完する行（複数の引数は空白でつなぐ）
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    words: Vec<String>,
}

/// complete: Tab キーと同じ補完を行い、結果を表示する。
/// - 一意に決まる / 共通接頭辞まで伸ばせる → 置き換え後の行
/// - 候補が絞れない → 候補一覧をカラム表示
pub(super) fn execute(args: &[&str], ctx: &mut BuiltinContext<'_>) -> CommandResult {
    let parsed = match super::parse_args::<CompleteArgs>("complete", args) {
        Ok(a) => a,
        Err(result) => return result,
    };
    let partial = parsed.words.join(" ");

    let engine = CompletionEngine::new();
    let result = match engine.complete_blocking(&partial, ctx.source, &CompleteOptions::default()) {
        Ok(result) => result,
        Err(e) => {
            return CommandResult::error(format!("histline: complete: {e}\n"), 1);
        }
    };

    match result {
        CompletionResult::Unique(line) | CompletionResult::Extended(line) => {
            CommandResult::success(format!("{line}\n"))
        }
        CompletionResult::Ambiguous(items) => {
            CommandResult::success(format!("{}\n", format_columns(&items, ctx.menu)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CandidateSource;
    use crate::config::HistoryConfig;
    use crate::display::ColumnOptions;
    use crate::history::{HistoryStore, DEFAULT_CONTEXT};

    fn run(source: CandidateSource, args: &[&str]) -> CommandResult {
        let mut history = HistoryStore::new(HistoryConfig {
            persistent: false,
            ..Default::default()
        });
        let menu = ColumnOptions {
            max_column_width: 32,
            ellipsis: None,
        };
        let mut ctx = BuiltinContext {
            history: &mut history,
            context: DEFAULT_CONTEXT,
            source: &source,
            menu: &menu,
        };
        execute(args, &mut ctx)
    }

    #[test]
    fn unique_candidate_prints_the_completed_line() {
        let result = run(CandidateSource::list(["git status", "ls"]), &["git", "st"]);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "git status\n");
    }

    #[test]
    fn common_prefix_prints_the_extended_line() {
        let result = run(CandidateSource::list(["foobar", "foobaz"]), &["f"]);
        assert_eq!(result.stdout, "fooba\n");
    }

    #[test]
    fn ambiguous_candidates_are_laid_out_in_columns() {
        let result = run(CandidateSource::list(["start", "stop", "status"]), &[]);
        assert_eq!(result.exit_code, 0);
        let lines: Vec<&str> = result.stdout.lines().collect();
        assert!(!lines.is_empty());
        for item in ["start", "stop", "status"] {
            assert!(result.stdout.contains(item));
        }
        assert!(!result.stdout.contains("startstop"));
    }

    #[test]
    fn hyphenated_words_are_completed_literally() {
        let result = run(CandidateSource::list(["ls -la", "ls -lh"]), &["ls", "-la"]);
        assert_eq!(result.stdout, "ls -la\n");
    }

    #[test]
    fn source_errors_are_reported() {
        let result = run(
            CandidateSource::from_fn(|_| anyhow::bail!("offline")),
            &["x"],
        );
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("offline"));
    }
}
