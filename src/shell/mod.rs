//! Shell モジュール — プロンプトループ
//!
//! ターミナルなら reedline で 1 行ずつ読み、確定した行をビルトインとして実行する。
//! 標準入力がターミナルでない場合は 1 行ずつ読んで [`PromptSession`] で確定させる。
//! どちらの経路も同じ履歴ストアと候補の供給元を使う。

mod color;
mod editor;
mod prompt;

use std::io::{self, IsTerminal, Write};

use anyhow::{Context as _, Result};
use histline::builtins::{try_builtin, BuiltinContext, CommandResult, LoopAction};
use histline::display::ColumnOptions;
use histline::session::{KeyOutcome, PromptSession};
use reedline::{KeyCode, KeyModifiers, Signal};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use prompt::HistlinePrompt;

/// プロンプトループの状態
pub struct Shell {
    session: PromptSession,
    menu: ColumnOptions,
}

impl Shell {
    pub fn new(session: PromptSession, menu: ColumnOptions) -> Self {
        Self { session, menu }
    }

    /// ループを実行し、終了コードを返す。
    pub async fn run(&mut self) -> Result<i32> {
        if !io::stdin().is_terminal() {
            info!("stdin is not a terminal, reading lines");
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            return self.run_lines(stdin, &mut io::stdout()).await;
        }
        self.run_editor()
    }

    /// reedline で対話的に読む。確定した行は reedline が履歴に保存済み。
    fn run_editor(&mut self) -> Result<i32> {
        let context = self.session.context().to_string();
        let mut editor = editor::build_editor(
            self.session.shared_history(),
            &context,
            self.session.source(),
            &self.menu,
        );
        let prompt = HistlinePrompt::new(&context);
        let mut out = io::stdout();

        loop {
            match editor.read_line(&prompt) {
                Ok(Signal::Success(line)) => {
                    if let Some(code) = self.execute(&line, &mut out)? {
                        return Ok(code);
                    }
                }
                Ok(Signal::CtrlC) => {
                    debug!("Ctrl-C received, line discarded");
                }
                Ok(Signal::CtrlD) => {
                    info!("Ctrl-D received, exiting");
                    return Ok(0);
                }
                Err(e) => return Err(e).context("line editor failed"),
            }
        }
    }

    /// 非ターミナル入力を 1 行ずつ処理する。
    async fn run_lines<R, W>(&mut self, input: R, out: &mut W) -> Result<i32>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
            self.session.set_line(&line);
            let submitted = self
                .session
                .handle_key(KeyCode::Enter, KeyModifiers::NONE)
                .await?;
            if let KeyOutcome::Submit(line) = submitted {
                if let Some(code) = self.execute(&line, out)? {
                    return Ok(code);
                }
            }
        }
        Ok(0)
    }

    /// 確定した行を処理する。終了する場合は終了コードを返す。
    fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Option<i32>> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let context = self.session.context().to_string();
        let source = self.session.source();
        let result = {
            let mut history = self.session.history();
            let mut ctx = BuiltinContext {
                history: &mut *history,
                context: &context,
                source: &source,
                menu: &self.menu,
            };
            try_builtin(line, &mut ctx)
        };

        let Some(result) = result else {
            debug!("Echoing submitted line");
            write_text(out, &format!("{} {line}\n", color::green("=>")))?;
            return Ok(None);
        };

        print_result(&result, out)?;
        Ok(match result.action {
            LoopAction::Exit => Some(result.exit_code),
            LoopAction::Continue => None,
        })
    }
}

fn print_result<W: Write>(result: &CommandResult, out: &mut W) -> Result<()> {
    if !result.stdout.is_empty() {
        write_text(out, &result.stdout)?;
    }
    if !result.stderr.is_empty() {
        write_text(out, &color::red(&result.stderr))?;
    }
    Ok(())
}

fn write_text<W: Write>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use histline::completion::CandidateSource;
    use histline::config::HistoryConfig;
    use histline::history::{HistoryStore, DEFAULT_CONTEXT};

    fn shell() -> Shell {
        let history = HistoryStore::new(HistoryConfig {
            persistent: false,
            ..Default::default()
        });
        let session =
            PromptSession::new(DEFAULT_CONTEXT, history, CandidateSource::list(["history"]));
        let menu = ColumnOptions {
            max_column_width: 32,
            ellipsis: None,
        };
        Shell::new(session, menu)
    }

    async fn run(input: &str) -> (i32, String) {
        let mut shell = shell();
        let mut out = Vec::new();
        let code = shell.run_lines(input.as_bytes(), &mut out).await.unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn lines_are_echoed_and_recorded() {
        let (code, out) = run("hello\n\nworld\nhistory\n").await;
        assert_eq!(code, 0);
        assert!(out.contains("hello"));
        assert!(out.contains("  1  hello\n  2  world\n  3  history\n"));
    }

    #[tokio::test]
    async fn exit_builtin_stops_the_loop() {
        let (code, out) = run("exit 3\nnever\n").await;
        assert_eq!(code, 3);
        assert!(!out.contains("never"));
    }

    #[tokio::test]
    async fn builtin_errors_are_printed() {
        let (_, out) = run("help nope\n").await;
        assert!(out.contains("no such builtin"));
    }

    #[tokio::test]
    async fn complete_builtin_uses_the_shared_source() {
        let (_, out) = run("complete hi\n").await;
        assert!(out.contains("history\n"));
    }

    #[tokio::test]
    async fn recorded_lines_are_visible_to_the_editor_history() {
        use reedline::{History, HistoryItemId};

        let mut shell = shell();
        let mut out = Vec::new();
        shell
            .run_lines("one\ntwo\n".as_bytes(), &mut out)
            .await
            .unwrap();

        let history = histline::cli::history::HistlineHistory::new(
            shell.session.shared_history(),
            DEFAULT_CONTEXT,
        );
        assert_eq!(history.load(HistoryItemId::new(1)).unwrap().command_line, "two");
    }
}
