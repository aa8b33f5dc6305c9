use clap::Parser;

use super::{BuiltinContext, CommandResult};

/// ビルトインコマンドの名前と説明の一覧（アルファベット順）。
const BUILTIN_COMMANDS: &[(&str, &str)] = &[
    ("complete", "入力中の行の補完結果を表示する"),
    ("exit", "プロンプトを終了する"),
    ("help", "ビルトインコマンドのヘルプを表示する"),
    ("history", "入力履歴を表示・管理する"),
];

/// help: ビルトインコマンドのヘルプを表示する。
#[derive(Parser)]
#[command(name = "help", about = "ビルトインコマンドのヘルプを表示する")]
struct HelpArgs {
    /// ヘルプを表示するコマンド名
    command: Option<String>,
}

/// help: ビルトインコマンドのヘルプを表示する。
/// - 引数なし → 一覧とキー操作を表示
/// - `help <command>` → 指定コマンドの `--help` を表示
pub(super) fn execute(args: &[&str], ctx: &mut BuiltinContext<'_>) -> CommandResult {
    let parsed = match super::parse_args::<HelpArgs>("help", args) {
        Ok(a) => a,
        Err(result) => return result,
    };

    match parsed.command {
        None => list_builtins(),
        Some(cmd) => show_command_help(&cmd, ctx),
    }
}

fn list_builtins() -> CommandResult {
    let mut output = String::from("histline builtins:\n");
    for (name, desc) in BUILTIN_COMMANDS {
        output.push_str(&format!("  {name:<10}{desc}\n"));
    }
    output.push_str("\nkeys:\n");
    output.push_str("  Up/Down   履歴をたどる (Ctrl-P / Ctrl-N も可)\n");
    output.push_str("  Tab       補完する\n");
    output.push_str("  Ctrl-R    履歴を検索する\n");
    output.push_str("  Ctrl-C    入力中の行を破棄する\n");
    output.push_str("  Ctrl-D    空行で終了する\n");
    CommandResult::success(output)
}

fn show_command_help(cmd: &str, ctx: &mut BuiltinContext<'_>) -> CommandResult {
    if !super::is_builtin(cmd) {
        return CommandResult::error(format!("histline: help: no such builtin: {cmd}\n"), 1);
    }

    super::dispatch_builtin(cmd, &["--help"], ctx).unwrap_or_else(|| {
        CommandResult::error(format!("histline: help: {cmd}: unexpected error\n"), 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{LoopAction, BUILTIN_NAMES};
    use crate::completion::CandidateSource;
    use crate::config::HistoryConfig;
    use crate::display::ColumnOptions;
    use crate::history::{HistoryStore, DEFAULT_CONTEXT};

    fn run(args: &[&str]) -> CommandResult {
        let mut history = HistoryStore::new(HistoryConfig {
            persistent: false,
            ..Default::default()
        });
        let source = CandidateSource::list(Vec::<String>::new());
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
    fn help_no_args_lists_all_builtins() {
        let result = run(&[]);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.action, LoopAction::Continue);
        for name in BUILTIN_NAMES {
            assert!(result.stdout.contains(name));
        }
    }

    #[test]
    fn help_table_matches_registered_builtins() {
        let names: Vec<&str> = BUILTIN_COMMANDS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, BUILTIN_NAMES);
    }

    #[test]
    fn help_specific_command_shows_detail() {
        let result = run(&["history"]);
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("history"));
    }

    #[test]
    fn help_for_exit_does_not_exit() {
        let result = run(&["exit"]);
        assert_eq!(result.action, LoopAction::Continue);
    }

    #[test]
    fn help_unknown_command_returns_error() {
        let result = run(&["nonexistent"]);
        assert_ne!(result.exit_code, 0);
        assert!(result.stderr.contains("no such builtin"));
    }
}
