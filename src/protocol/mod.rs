//! RESP Protocol Boundary
//!
//! Decoding of client requests into [`RequestCommand`]s and encoding of
//! [`RespValue`] replies. The command layer never touches wire bytes
//! itself; it only sees decoded commands and hands replies to a
//! [`ResponseSink`](crate::connection::ResponseSink).
//!
//! ## Modules
//!
//! - `command`: the decoded request
//! - `parser`: incremental request decoder
//! - `types`: reply values and their serialization
//!
//! ## Example
//!
//! ```
//! use kvbridge::protocol::{CommandDecoder, RespValue};
//!
//! let data = b"*2\r\n$5\r\nZCARD\r\n$5\r\nmyset\r\n";
//! let (command, consumed) = CommandDecoder::new().decode(data).unwrap().unwrap();
//! assert_eq!(command.name(), "ZCARD");
//! assert_eq!(consumed, data.len());
//!
//! assert_eq!(RespValue::integer(3).serialize(), b":3\r\n");
//! ```

pub mod command;
pub mod parser;
pub mod types;

pub use command::RequestCommand;
pub use parser::{CommandDecoder, ParseError, ParseResult};
pub use types::RespValue;
