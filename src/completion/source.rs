//! 補完候補の供給元
//!
//! 固定リスト・同期関数・非同期関数のいずれかから候補を取り出す。
//! 供給元のエラーは握りつぶさずに呼び出し元へ返す。

use std::future::Future;

use anyhow::{bail, Result};
use futures_util::future::{BoxFuture, FutureExt};
use tokio::runtime::{Handle, RuntimeFlavor};

type SyncSupplier = Box<dyn Fn(&str) -> Result<Vec<String>> + Send + Sync>;
type AsyncSupplier = Box<dyn Fn(String) -> BoxFuture<'static, Result<Vec<String>>> + Send + Sync>;

/// 補完候補の供給元
pub enum CandidateSource {
    /// 固定の候補リスト
    List(Vec<String>),
    /// 入力中の行を受け取って候補を返す関数
    Sync(SyncSupplier),
    /// 入力中の行を受け取って候補を返す非同期関数
    Async(AsyncSupplier),
}

impl std::fmt::Debug for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Sync(_) => f.write_str("Sync(..)"),
            Self::Async(_) => f.write_str("Async(..)"),
        }
    }
}

impl CandidateSource {
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<String>> + Send + Sync + 'static,
    {
        Self::Sync(Box::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<String>>> + Send + 'static,
    {
        Self::Async(Box::new(move |partial| f(partial).boxed()))
    }

    /// 候補を取り出す。非同期の供給元はここで待つ。
    pub async fn resolve(&self, partial: &str) -> Result<Vec<String>> {
        match self {
            Self::List(items) => Ok(items.clone()),
            Self::Sync(f) => f(partial),
            Self::Async(f) => f(partial.to_string()).await,
        }
    }

    /// 同期コンテキストから候補を取り出す。
    ///
    /// 非同期の供給元はマルチスレッドランタイム上でのみブロックして待てる。
    /// ランタイム外ではその場で current_thread ランタイムを作って実行する。
    pub fn resolve_blocking(&self, partial: &str) -> Result<Vec<String>> {
        match self {
            Self::List(items) => Ok(items.clone()),
            Self::Sync(f) => f(partial),
            Self::Async(f) => {
                let fut = f(partial.to_string());
                match Handle::try_current() {
                    Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                        tokio::task::block_in_place(|| handle.block_on(fut))
                    }
                    Ok(_) => bail!("async candidate source cannot block a current-thread runtime"),
                    Err(_) => tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()?
                        .block_on(fut),
                }
            }
        }
    }
}
