//! Error types for the book, the byte sources and the feed.

use std::io;

use thiserror::Error;

use crate::price::{Locate, OrderId, Price};

/// Book errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookError {
    /// A cancel/delete/execute/replace referenced an id that was never added.
    #[error("order {0} was never added to the book")]
    UnknownOrder(OrderId),
    /// An add or replace carried a price below zero.
    #[error("order {order_id} has negative price {price}")]
    NegativePrice { order_id: OrderId, price: Price },
}

/// Byte source errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// An OS-level operation failed while setting up or reading the source.
    #[error("{op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The producer went away and every buffered byte has been read.
    #[error("byte source closed")]
    Closed,

    /// A read would cross into the next length-prefixed frame.
    #[error("read of {requested} bytes crosses frame boundary ({remaining} bytes left in frame)")]
    Framing { requested: usize, remaining: usize },
}

impl SourceError {
    pub(crate) fn io(op: &'static str, source: io::Error) -> Self {
        SourceError::Io { op, source }
    }
}

/// Feed errors
///
/// None of these are recoverable mid-stream: either the byte stream is no
/// longer aligned on a record boundary or a book no longer matches the venue.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("unrecognised message type {0:#04x}")]
    UnknownMessageType(u8),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("locate {locate}: {source}")]
    Book {
        locate: Locate,
        #[source]
        source: BookError,
    },
}

impl FeedError {
    /// The source ran out of input.
    pub fn is_closed(&self) -> bool {
        matches!(self, FeedError::Source(SourceError::Closed))
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T, E = FeedError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_carries_operation() {
        let err = SourceError::io("open", io::Error::new(io::ErrorKind::NotFound, "no such file"));
        assert_eq!(err.to_string(), "open: no such file");
    }

    #[test]
    fn test_feed_error_display() {
        assert_eq!(
            FeedError::UnknownMessageType(b'Z').to_string(),
            "unrecognised message type 0x5a"
        );
        let err = FeedError::Book {
            locate: 7,
            source: BookError::UnknownOrder(42),
        };
        assert_eq!(err.to_string(), "locate 7: order 42 was never added to the book");
    }
}
