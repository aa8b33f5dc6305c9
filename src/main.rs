mod logging;
mod shell;

use std::path::PathBuf;

use clap::Parser;
use histline::builtins::BUILTIN_NAMES;
use histline::cli::commands::command_source;
use histline::config::{HistlineConfig, HistoryOptions};
use histline::display::ColumnOptions;
use histline::history::HistoryStore;
use histline::session::PromptSession;
use tracing::{error, info};

use shell::Shell;

/// 履歴と補完つきのプロンプト
#[derive(Parser)]
#[command(name = "histline", version, about = "Line prompt with history and completion")]
struct Cli {
    /// 履歴のコンテキスト名（設定ファイルの値より優先）
    #[arg(short, long)]
    context: Option<String>,

    /// 履歴をファイルに保存しない
    #[arg(long)]
    no_persist: bool,

    /// 保持する履歴の最大件数
    #[arg(long)]
    capacity: Option<usize>,

    /// 設定ファイルのパス
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// コマンドライン引数による履歴設定の上書き
    fn history_options(&self) -> HistoryOptions {
        HistoryOptions {
            capacity: self.capacity,
            persistent: self.no_persist.then_some(false),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ログシステムの初期化（guard は main 終了まで保持する必要がある）
    let guard = logging::init_logging();
    info!("histline started");

    let config = match &cli.config {
        Some(path) => HistlineConfig::load_from(path),
        None => HistlineConfig::load(),
    };

    let mut history_config = config.history.clone();
    history_config.apply(cli.history_options());
    let context = cli
        .context
        .clone()
        .unwrap_or_else(|| history_config.context.clone());

    let history = HistoryStore::new(history_config);
    let source = command_source(&config.completion, BUILTIN_NAMES);
    let session = PromptSession::new(&context, history, source);
    let mut shell = Shell::new(session, ColumnOptions::from_config(&config.display));

    let code = match shell.run().await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Prompt loop failed");
            eprintln!("histline: error: {e:#}");
            1
        }
    };

    info!(code, "histline exiting");
    drop(guard);
    std::process::exit(code);
}
