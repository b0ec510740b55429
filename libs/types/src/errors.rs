//! Error taxonomy for the engine
//!
//! Command errors cover everything a client can get wrong in a request line.
//! They are all surfaced on the wire as a single `INVALID INPUT` response;
//! the variants exist so logs and tests can tell the failures apart.

use thiserror::Error;

/// Client command validation errors
///
/// None of these reach the order book: validation happens entirely at the
/// session layer, before dispatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("missing {0} argument")]
    MissingArgument(&'static str),

    #[error("malformed number: {0}")]
    MalformedNumber(String),

    #[error("price must be positive: {0}")]
    NonPositivePrice(String),

    #[error("quantity must be positive: {0}")]
    NonPositiveQuantity(String),

    #[error("order id must be positive: {0}")]
    NonPositiveOrderId(String),
}
