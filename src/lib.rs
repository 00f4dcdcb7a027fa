//! # itch-lob
//!
//! A price-indexed L2 limit order book rebuilt from an ITCH 5.0 feed.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: The feed owns every book exclusively (no locks)
//! - **Price Indexed**: A price maps to its level by one multiply-shift, no
//!   tree walk or hardware divide
//! - **Near O(1) Top of Book**: Emptying the best level steps one tick
//!   inward; only sparse books pay for the bounded fallback scan
//! - **Explicit Decode**: Wire records are read field by field at fixed
//!   big-endian offsets
//!
//! ## Architecture
//!
//! ```text
//! [Receive Thread] --> [SPSC Byte Ring] --> [Feed (Pinned)] --> [Book per Locate]
//!                                                 |
//!                                          [Quote Updates]
//! ```

pub mod book;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod fastmod;
pub mod feed;
pub mod level;
pub mod messages;
pub mod order_index;
pub mod price;
pub mod source;

// Re-exports for convenience
pub use book::Book;
pub use command::{
    BookEvent, OrderAdd, OrderCanceled, OrderExecuted, OrderExecutedWithPrice, OrderRemoved,
    OrderReplaced, Quote, QuoteUpdate, Side,
};
pub use config::{BookConfig, FeedConfig, IndexRetention};
pub use engine::Engine;
pub use error::{BookError, ConfigError, FeedError, SourceError};
pub use fastmod::{FastDivisor, GranlundFastMod, LemireFastMod};
pub use feed::{Feed, FeedStats};
pub use level::Level;
pub use messages::{MessageHeader, MessageType, WireMessage};
pub use price::{Locate, OrderId, Price, Quantity};
pub use source::{ByteSource, FramedSource, ReaderSource};
#[cfg(feature = "runtime")]
pub use source::{ring_channel, RingSource};
