//! # mavgen: MAVLink-style message code generator
//!
//! Reads XML message schemas and produces, per message, a byte-layout description
//! (pack, unpack and verify plans) and a one-byte compatibility code, the "extra CRC",
//! that senders and receivers fold into every packet checksum.
//!
//! ## Pipeline
//!
//! - [`parser`]: XML subset (pest grammar) to an [`Element`] tree
//! - [`compiler`]: `<message>` elements to [`MessageSpec`]s, fields reordered by
//!   [`PriorityClass`] for alignment, extra-CRC computed over the reordered layout
//! - [`table`]: message id to extra-CRC, each id written once
//! - [`codec`]: plans derived from a [`MessageSpec`], and a [`Codec`] that runs them
//! - [`frame`]: packet framing with the X.25 checksum finished by the extra-CRC
//! - [`render`] / [`generate`]: text artifacts and the directory-level driver
//!
//! ## Example schema
//!
//! ```text
//! <mavlink>
//!   <messages>
//!     <message id="0" name="HEARTBEAT">
//!       <field type="uint32_t" name="custom_mode">mode</field>
//!       <field type="uint8_t" name="type">type</field>
//!     </message>
//!   </messages>
//! </mavlink>
//! ```
//!
//! `custom_mode` keeps offset 0 (4-byte class), `type` lands at offset 4, and the
//! extra-CRC of this message is `0xAB`.

pub mod checksum;
pub mod codec;
pub mod compiler;
pub mod document;
pub mod error;
pub mod frame;
pub mod generate;
pub mod parser;
mod pool;
pub mod render;
pub mod table;
pub mod types;
pub mod value;

pub use checksum::X25;
pub use codec::{Codec, CodecError, Endianness, Verification};
pub use compiler::{compile_document, compile_message, compile_source, CompiledDocument};
pub use document::Element;
pub use error::{ParseError, SchemaError};
pub use frame::{decode_stream, encode_message, FrameDecodeResult, FrameError, Packet, PacketHeader};
pub use generate::{generate, GenerateError, GenerateOptions, GenerateReport};
pub use parser::parse;
pub use pool::default_workers;
pub use table::CompatibilityTable;
pub use types::{EnumBlock, EnumEntry, FieldSpec, MessageSpec, PrimitiveType, PriorityClass};
pub use value::Value;
