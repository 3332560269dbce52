//! Command tree parsing and dispatch for free-text lines.
//!
//! `linecmd` parses lines such as chat messages (`!order pizza -s large`)
//! rather than process arguments. Commands form a tree; each line is
//! tokenized, its options parsed, and the result routed to the matching
//! command's actions, or answered with help or an error message through
//! the configured send function.
//!
//! ```rust,ignore
//! use linecmd::{Command, coerce};
//!
//! let mut bot = Command::<ChatMessage>::new();
//! bot.prefix("!").set_send(|msg: &ChatMessage, text: &str| msg.reply(text));
//! bot.command("order <pizza>")?
//!     .description("Order a pizza")
//!     .option("-s, --size <size>", "Pizza size")
//!     .option_with_default("-n, --count <n>", "How many", coerce::int(), 1)
//!     .action(|inv| {
//!         let size = inv.opts().str("size").unwrap_or("medium");
//!         inv.send(&format!("{} {size} pizza", inv.arg(0).unwrap_or_default()));
//!     });
//!
//! bot.parse("!order margherita -s large", &msg);
//! ```

mod argument;
pub mod coerce;
mod command;
mod config;
mod error;
pub mod help;
mod invocation;
pub mod loader;
mod option;
mod parser;
pub mod token;

pub use argument::{ArgSpec, ArgValue};
pub use command::{Command, WILDCARD};
pub use config::{ParseConfig, SendFn};
pub use error::{DeclareError, LoadError, ParseError};
pub use invocation::{Action, Invocation, OptionValues};
pub use loader::{HandlerSet, Loader};
pub use option::{Coerce, OptionDef, find_option};
pub use parser::ParseResult;
