//! Chat platform front ends

pub mod telegram;

pub use telegram::{Command, TelegramBot, TelegramSink};
