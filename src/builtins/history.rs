use clap::{Parser, Subcommand};

use super::{BuiltinContext, CommandResult};
use crate::display::format_index;

/// history: 入力履歴を表示・管理する。
#[derive(Parser)]
#[command(name = "history", about = "入力履歴を表示・管理する")]
struct HistoryArgs {
    #[command(subcommand)]
    command: Option<HistoryCommand>,

    /// 表示する件数 (デフォルト: 50)
    #[arg(short = 'n', long, default_value = "50")]
    count: usize,
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// 現在のコンテキストの履歴をクリアする
    Clear {
        /// 全コンテキストの履歴をクリアする
        #[arg(short = 'a', long)]
        all: bool,
    },
}

/// history: 入力履歴を表示・管理する。
/// - `history` → 直近 50 件を表示
/// - `history -n 100` → 直近 100 件を表示
/// - `history clear` → 現在のコンテキストをクリア
/// - `history clear --all` → 全コンテキストをクリア
pub(super) fn execute(args: &[&str], ctx: &mut BuiltinContext<'_>) -> CommandResult {
    let parsed = match super::parse_args::<HistoryArgs>("history", args) {
        Ok(a) => a,
        Err(result) => return result,
    };

    match parsed.command {
        Some(HistoryCommand::Clear { all: true }) => {
            ctx.history.clear_all();
            CommandResult::success("history cleared (all contexts)\n".to_string())
        }
        Some(HistoryCommand::Clear { all: false }) => {
            ctx.history.clear(ctx.context);
            CommandResult::success("history cleared\n".to_string())
        }
        None => list_history(ctx, parsed.count),
    }
}

/// 直近 N 件を古い順に、通し番号付きで表示する。
fn list_history(ctx: &BuiltinContext<'_>, count: usize) -> CommandResult {
    let entries = ctx.history.get_all(ctx.context);
    let limit = ctx.history.config().effective_capacity();
    let skip = entries.len().saturating_sub(count);

    let mut output = String::new();
    for (i, entry) in entries.iter().enumerate().skip(skip) {
        output.push_str(&format!("{}  {entry}\n", format_index(i + 1, limit)));
    }

    CommandResult::success(output)
}
