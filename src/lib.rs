//! histline — 行入力の履歴と補完のステートマシン
//!
//! - [`history`]: コンテキストごとの履歴・カーソル・ドラフトと永続化
//! - [`completion`]: 候補の取得と補完結果の計算
//! - [`display`]: 補完メニューと履歴一覧の整形
//! - [`session`]: キー入力を上記の操作に振り分ける
//! - [`builtins`]: プロンプトで使えるビルトインコマンド
//! - [`cli`]: reedline との接続と候補の供給元

pub mod builtins;
pub mod cli;
pub mod completion;
pub mod config;
pub mod display;
pub mod history;
pub mod session;
