pub mod create_quote_command;

pub use create_quote_command::{CreateQuoteCommand, NewQuote, Place};
