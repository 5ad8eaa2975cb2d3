//! Transport layer for WagerBot
//!
//! The core never talks to a chat platform directly. It sends through the
//! [`Transport`] trait; hosts plug in a platform client. The console host
//! uses [`ConsoleTransport`], which prints every call as a JSON line.

pub mod console;
pub mod traits;

pub use console::ConsoleTransport;
pub use traits::Transport;
