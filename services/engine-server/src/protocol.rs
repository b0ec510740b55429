//! Wire protocol: command parsing and response formatting
//!
//! Commands are whitespace-separated ASCII lines. Validation is strict and
//! happens entirely here — a request that fails to parse never reaches the
//! book. All failures collapse to a single `INVALID INPUT` response on the
//! wire; the `CommandError` variants stay distinct for logging.

use rust_decimal::Decimal;
use std::str::FromStr;
use types::errors::CommandError;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::trade::Trade;

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Buy { price: Price, quantity: Quantity },
    Sell { price: Price, quantity: Quantity },
    Cancel { order_id: OrderId },
    Disconnect,
}

/// Parse a single request line
///
/// Trailing tokens beyond what a command consumes are ignored, matching the
/// permissive reader behavior of stream-based clients.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut parts = line.split_whitespace();
    let command = parts.next().ok_or(CommandError::Empty)?;

    match command {
        "BUY" | "SELL" => {
            let price_str = parts.next().ok_or(CommandError::MissingArgument("price"))?;
            let quantity_str = parts
                .next()
                .ok_or(CommandError::MissingArgument("quantity"))?;

            let price = parse_price(price_str)?;
            let quantity = parse_quantity(quantity_str)?;

            if command == "BUY" {
                Ok(Command::Buy { price, quantity })
            } else {
                Ok(Command::Sell { price, quantity })
            }
        }
        "CANCEL" => {
            let id_str = parts.next().ok_or(CommandError::MissingArgument("order id"))?;
            let raw: u64 = id_str
                .parse()
                .map_err(|_| CommandError::MalformedNumber(id_str.to_string()))?;
            if raw == 0 {
                return Err(CommandError::NonPositiveOrderId(id_str.to_string()));
            }
            Ok(Command::Cancel {
                order_id: OrderId::new(raw),
            })
        }
        "DC" => Ok(Command::Disconnect),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

fn parse_price(raw: &str) -> Result<Price, CommandError> {
    let decimal =
        Decimal::from_str(raw).map_err(|_| CommandError::MalformedNumber(raw.to_string()))?;
    Price::try_new(decimal).ok_or_else(|| CommandError::NonPositivePrice(raw.to_string()))
}

fn parse_quantity(raw: &str) -> Result<Quantity, CommandError> {
    let value: u64 = raw
        .parse()
        .map_err(|_| CommandError::MalformedNumber(raw.to_string()))?;
    Quantity::try_new(value).ok_or_else(|| CommandError::NonPositiveQuantity(raw.to_string()))
}

// ── Responses ───────────────────────────────────────────────────────
//
// Every message ends with a blank line; clients read until "\n\n".

/// Order confirmation plus one TRADE block per execution it triggered
pub fn confirmed(order_id: OrderId, trades: &[Trade]) -> String {
    let mut response = format!("CONFIRMED OrderID: {order_id}\n\n");
    for trade in trades {
        response.push_str(&format!("{trade}\n\n"));
    }
    response
}

pub fn cancelled(order_id: OrderId) -> String {
    format!("CANCELLED OrderID: {order_id}\n\n")
}

pub fn order_not_found(order_id: OrderId) -> String {
    format!("ORDER NOT FOUND: {order_id}\n\n")
}

pub fn invalid_input() -> String {
    "INVALID INPUT\n\n".to_string()
}

pub fn disconnecting() -> String {
    "Disconnecting...\n\n".to_string()
}

/// Banner sent once per connection, before any command is read
pub fn welcome_message() -> String {
    concat!(
        "====================================\n",
        "  HFT Matching Engine - Welcome!\n",
        "------------------------------------\n",
        "Available Commands:\n",
        "  BUY <price> <quantity>   - Place a buy order\n",
        "  SELL <price> <quantity>  - Place a sell order\n",
        "  CANCEL <orderId>         - Cancel an existing order\n",
        "  DC                       - Disconnect from server\n",
        "\n",
        "Example: BUY 100.50 25\n",
        "         SELL 101.00 10\n",
        "         CANCEL 5\n",
        "====================================\n\n",
    )
    .to_string()
}
