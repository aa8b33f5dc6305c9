//! ビルトインコマンド
//!
//! プロンプトで確定した行のうち、先頭トークンがビルトイン名のものをここで処理する。
//! 出力は [`CommandResult`] に詰めて返し、表示は呼び出し元が行う。

mod complete;
mod help;
mod history;

use clap::Parser;

use crate::completion::CandidateSource;
use crate::display::ColumnOptions;
use crate::history::HistoryStore;

/// ビルトイン名の一覧（補完候補にも使う）
pub const BUILTIN_NAMES: &[&str] = &["complete", "exit", "help", "history"];

/// REPL ループの制御アクション
#[derive(Debug, Clone, PartialEq)]
pub enum LoopAction {
    /// ループを続行する
    Continue,
    /// ループを終了する
    Exit,
}

/// ビルトイン実行の結果
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    /// 終了コード (0 = 成功)
    pub exit_code: i32,
    pub action: LoopAction,
}

impl CommandResult {
    /// 成功結果（Continue）を返すヘルパー
    pub fn success(stdout: String) -> Self {
        Self {
            stdout,
            stderr: String::new(),
            exit_code: 0,
            action: LoopAction::Continue,
        }
    }

    /// エラー結果（Continue）を返すヘルパー
    pub fn error(stderr: String, exit_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr,
            exit_code,
            action: LoopAction::Continue,
        }
    }

    /// 指定した終了コードで Exit アクションを返すヘルパー
    pub fn exit_with(exit_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code,
            action: LoopAction::Exit,
        }
    }
}

/// ビルトインに渡す実行環境
pub struct BuiltinContext<'a> {
    pub history: &'a mut HistoryStore,
    /// 履歴のコンテキスト名
    pub context: &'a str,
    /// `complete` が使う候補の供給元
    pub source: &'a CandidateSource,
    /// 候補一覧の表示オプション
    pub menu: &'a ColumnOptions,
}

/// clap の `try_parse_from` を使って引数をパースする共通ヘルパー。
///
/// - パース成功 → `Ok(T)`
/// - `--help` → `Err(CommandResult::success(...))`
/// - 引数エラー → `Err(CommandResult::error(..., 2))`
fn parse_args<T: clap::Parser>(cmd: &str, args: &[&str]) -> Result<T, CommandResult> {
    T::try_parse_from(std::iter::once(cmd).chain(args.iter().copied())).map_err(|e| {
        let msg = e.to_string();
        if e.use_stderr() {
            CommandResult::error(msg, 2)
        } else {
            CommandResult::success(msg)
        }
    })
}

/// 指定されたコマンド名がビルトインかどうかを判定する。
pub fn is_builtin(cmd: &str) -> bool {
    BUILTIN_NAMES.contains(&cmd)
}

/// ビルトインコマンドを振り分ける。ビルトインでない場合は `None`。
pub fn dispatch_builtin(
    cmd: &str,
    args: &[&str],
    ctx: &mut BuiltinContext<'_>,
) -> Option<CommandResult> {
    match cmd {
        "complete" => Some(complete::execute(args, ctx)),
        "exit" => Some(exit(args)),
        "help" => Some(help::execute(args, ctx)),
        "history" => Some(history::execute(args, ctx)),
        _ => None,
    }
}

/// exit: 終了コード (0-255) を指定してプロンプトを終了する。
#[derive(Parser)]
#[command(name = "exit", about = "プロンプトを終了する")]
struct ExitArgs {
    /// 終了コード。範囲外の値は 0〜255 に丸める
    #[arg(allow_negative_numbers = true)]
    code: Option<i64>,
}

/// 数値でない引数は使い方のエラーとして扱い、プロンプトは続行する。
fn exit(args: &[&str]) -> CommandResult {
    match parse_args::<ExitArgs>("exit", args) {
        Ok(parsed) => CommandResult::exit_with(parsed.code.unwrap_or(0).clamp(0, 255) as i32),
        Err(result) => result,
    }
}

/// 確定した行をトークンに分割し、ビルトインなら実行する。
///
/// 空行やビルトインでない行は `None` を返す。
pub fn try_builtin(input: &str, ctx: &mut BuiltinContext<'_>) -> Option<CommandResult> {
    let tokens = match shell_words::split(input.trim()) {
        Ok(tokens) => tokens,
        Err(e) => return Some(CommandResult::error(format!("histline: parse error: {e}\n"), 1)),
    };
    let (cmd, rest) = tokens.split_first()?;
    if !is_builtin(cmd) {
        return None;
    }
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    dispatch_builtin(cmd, &args, ctx)
}
