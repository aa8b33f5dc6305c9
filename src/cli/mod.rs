pub mod commands;
pub mod completer;
pub mod history;
