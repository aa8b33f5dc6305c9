//! ログ初期化モジュール
//!
//! `tracing` + `tracing-subscriber` を使用して、ログを外部ファイルに出力する。
//! プロンプトの表示と混ざらないよう、ターミナルには書かない。
//! ログファイルは `<データディレクトリ>/logs/` にローカル日付で日次ローテーションする。

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{fmt, EnvFilter};

/// ログレベルを指定する環境変数
const LOG_ENV: &str = "HISTLINE_LOG";

const LOG_PREFIX: &str = "histline.log";

/// ログ行のタイムスタンプをローカル時刻で出力するタイマー
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// ローカル日付で日次ローテーションするファイルアペンダー。
///
/// 書き込み時に日付を確認し、変わっていれば新しいファイルを開く。
struct DailyAppender {
    dir: PathBuf,
    prefix: String,
    current_date: NaiveDate,
    file: File,
}

impl DailyAppender {
    fn new(dir: PathBuf, prefix: &str) -> std::io::Result<Self> {
        let today = Local::now().date_naive();
        let file = Self::open_log_file(&dir, prefix, today)?;
        Ok(Self {
            dir,
            prefix: prefix.to_string(),
            current_date: today,
            file,
        })
    }

    fn file_name(prefix: &str, date: NaiveDate) -> String {
        format!("{}.{}", prefix, date.format("%Y-%m-%d"))
    }

    /// 指定した日付のログファイルを開く（なければ作成）。
    fn open_log_file(dir: &Path, prefix: &str, date: NaiveDate) -> std::io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(Self::file_name(prefix, date)))
    }
}

impl Write for DailyAppender {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let today = Local::now().date_naive();
        if today != self.current_date {
            self.file = Self::open_log_file(&self.dir, &self.prefix, today)?;
            self.current_date = today;
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

/// ログの出力先ディレクトリ
fn log_dir() -> PathBuf {
    histline::config::data_dir().join("logs")
}

/// ログシステムを初期化する。
///
/// - ログレベルは `HISTLINE_LOG` 環境変数で制御（デフォルト: `info`）
/// - ログファイルは `histline.log.YYYY-MM-DD`
///
/// 返したガードは `main()` で保持し続ける必要がある（ドロップするとログ出力が停止する）。
/// ログファイルを用意できない場合は警告を出して `None` を返し、ログなしで続行する。
pub fn init_logging() -> Option<WorkerGuard> {
    let log_dir = log_dir();

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!(
            "histline: warning: failed to create log directory {}: {e}",
            log_dir.display()
        );
        return None;
    }

    let file_appender = match DailyAppender::new(log_dir.clone(), LOG_PREFIX) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!(
                "histline: warning: failed to open log file in {}: {e}",
                log_dir.display()
            );
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_timer(LocalTimer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .try_init();
    if let Err(e) = installed {
        eprintln!("histline: warning: failed to install logger: {e}");
        return None;
    }

    Some(guard)
}
