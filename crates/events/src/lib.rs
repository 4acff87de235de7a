//! Progress notification infrastructure for pixbatch.
//!
//! - [`ProgressNotifier`]: the contract the scheduler reports through.
//! - [`ProgressBus`]: in-process publish/subscribe backed by
//!   `tokio::sync::broadcast`.
//! - [`ChannelNotifier`]: single-consumer `mpsc` transport.
//! - [`wire`]: fixed 8-byte framing for crossing a process boundary.
//! - [`StatusBoard`]: observer-side table fed by progress events.

pub mod board;
pub mod bus;
pub mod channel;
pub mod notifier;
pub mod wire;

pub use board::StatusBoard;
pub use bus::{ProgressBus, ProgressEvent};
pub use channel::ChannelNotifier;
pub use notifier::{FnNotifier, NullNotifier, ProgressNotifier};
pub use wire::{FrameNotifier, FrameReader, ProgressFrame, WireError};
