//! 補完候補の供給元
//!
//! - 先頭トークン: 設定の候補 + ビルトイン + PATH 内の実行可能コマンド
//! - それ以降: 設定の候補のみ（行全体で前方一致させる）
//!
//! PATH の走査は最初の補完要求で一度だけ、ブロッキングスレッド上で行う。

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::completion::CandidateSource;
use crate::config::CompletionConfig;

/// PATH 環境変数を走査し、実行可能ファイル名を収集する。
pub fn build_path_cache() -> BTreeSet<String> {
    let mut commands = BTreeSet::new();

    let Some(path_var) = env::var_os("PATH") else {
        return commands;
    };

    for dir in env::split_paths(&path_var) {
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if is_executable(&entry.path()) {
                    commands.insert(name.to_string());
                }
            }
        }
    }

    commands
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    fs::metadata(path).map(|meta| meta.is_file()).unwrap_or(false)
}

/// 設定とビルトイン名から非同期の候補供給元を作る。
pub fn command_source(config: &CompletionConfig, builtins: &[&str]) -> CandidateSource {
    let configured: Arc<Vec<String>> = Arc::new(config.candidates.clone());
    let builtins: Arc<Vec<String>> = Arc::new(builtins.iter().map(|b| b.to_string()).collect());
    let path_commands = config.path_commands;
    let cache: Arc<OnceCell<BTreeSet<String>>> = Arc::new(OnceCell::new());

    CandidateSource::from_async(move |partial: String| {
        let configured = Arc::clone(&configured);
        let builtins = Arc::clone(&builtins);
        let cache = Arc::clone(&cache);
        async move {
            let mut candidates: Vec<String> = configured.as_ref().clone();
            if partial.contains(char::is_whitespace) {
                return anyhow::Ok(candidates);
            }

            candidates.extend(builtins.iter().cloned());
            if path_commands {
                let commands = cache
                    .get_or_try_init(|| async {
                        tokio::task::spawn_blocking(build_path_cache)
                            .await
                            .context("PATH scan task failed")
                    })
                    .await?;
                debug!(count = commands.len(), "PATH commands available");
                candidates.extend(commands.iter().cloned());
            }

            candidates.sort();
            candidates.dedup();
            anyhow::Ok(candidates)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn config(candidates: &[&str], path_commands: bool) -> CompletionConfig {
        CompletionConfig {
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
            path_commands,
        }
    }

    fn write_file(dir: &TempDir, name: &str, mode: u32) {
        let path = dir.path().join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    #[serial]
    fn path_scan_collects_only_executables() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "runme", 0o755);
        write_file(&dir, "notes.txt", 0o644);

        let original = env::var_os("PATH");
        env::set_var("PATH", dir.path());
        let commands = build_path_cache();
        match original {
            Some(path) => env::set_var("PATH", path),
            None => env::remove_var("PATH"),
        }

        assert!(commands.contains("runme"));
        assert!(!commands.contains("notes.txt"));
    }

    #[tokio::test]
    async fn first_token_includes_builtins() {
        let source = command_source(&config(&["git status"], false), &["history", "exit"]);
        let candidates = source.resolve("h").await.unwrap();
        assert_eq!(candidates, vec!["exit", "git status", "history"]);
    }

    #[tokio::test]
    async fn later_tokens_use_configured_candidates_only() {
        let source = command_source(&config(&["git status", "git stash"], false), &["history"]);
        let candidates = source.resolve("git st").await.unwrap();
        assert_eq!(candidates, vec!["git status", "git stash"]);
    }
}
