//! Compiled schema model: primitive types, fields, messages and enumerations.

use std::fmt;

/// Field types a message definition may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Double,
    Int64,
    Uint64,
    Int32,
    Uint32,
    Float,
    Int16,
    Uint16,
    Int8,
    Uint8,
    Char,
    /// `uint8_t_mavlink_version`: a `uint8_t` the sender fills with its protocol version.
    Uint8MavlinkVersion,
}

/// Sort bucket for field reordering. Wider types come first so every field
/// lands on its natural alignment. Value 2 is unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PriorityClass {
    Wide = 0,
    Word = 1,
    Half = 3,
    Byte = 4,
}

impl PriorityClass {
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 12] = [
        PrimitiveType::Double,
        PrimitiveType::Int64,
        PrimitiveType::Uint64,
        PrimitiveType::Int32,
        PrimitiveType::Uint32,
        PrimitiveType::Float,
        PrimitiveType::Int16,
        PrimitiveType::Uint16,
        PrimitiveType::Int8,
        PrimitiveType::Uint8,
        PrimitiveType::Char,
        PrimitiveType::Uint8MavlinkVersion,
    ];

    /// Look up a type by the name used in schema files (`uint16_t`, `float`, ...).
    pub fn from_schema_name(s: &str) -> Option<Self> {
        PrimitiveType::ALL.into_iter().find(|t| t.schema_name() == s)
    }

    pub fn schema_name(self) -> &'static str {
        match self {
            PrimitiveType::Double => "double",
            PrimitiveType::Int64 => "int64_t",
            PrimitiveType::Uint64 => "uint64_t",
            PrimitiveType::Int32 => "int32_t",
            PrimitiveType::Uint32 => "uint32_t",
            PrimitiveType::Float => "float",
            PrimitiveType::Int16 => "int16_t",
            PrimitiveType::Uint16 => "uint16_t",
            PrimitiveType::Int8 => "int8_t",
            PrimitiveType::Uint8 => "uint8_t",
            PrimitiveType::Char => "char",
            PrimitiveType::Uint8MavlinkVersion => "uint8_t_mavlink_version",
        }
    }

    /// Type name fed to the extra-CRC. The version marker hashes as `uint8_t`.
    pub fn crc_name(self) -> &'static str {
        self.wire_type().schema_name()
    }

    /// Abbreviated name used in rendered plans (`uint16`, `float`, `char`).
    pub fn short_name(self) -> &'static str {
        let name = self.wire_type().schema_name();
        name.strip_suffix("_t").unwrap_or(name)
    }

    /// The type as laid out on the wire.
    pub fn wire_type(self) -> PrimitiveType {
        match self {
            PrimitiveType::Uint8MavlinkVersion => PrimitiveType::Uint8,
            other => other,
        }
    }

    /// Byte width on the wire.
    pub fn width(self) -> usize {
        match self {
            PrimitiveType::Double | PrimitiveType::Int64 | PrimitiveType::Uint64 => 8,
            PrimitiveType::Int32 | PrimitiveType::Uint32 | PrimitiveType::Float => 4,
            PrimitiveType::Int16 | PrimitiveType::Uint16 => 2,
            PrimitiveType::Int8
            | PrimitiveType::Uint8
            | PrimitiveType::Char
            | PrimitiveType::Uint8MavlinkVersion => 1,
        }
    }

    pub fn priority(self) -> PriorityClass {
        match self {
            PrimitiveType::Double | PrimitiveType::Int64 | PrimitiveType::Uint64 => PriorityClass::Wide,
            PrimitiveType::Int32 | PrimitiveType::Uint32 | PrimitiveType::Float => PriorityClass::Word,
            PrimitiveType::Int16 | PrimitiveType::Uint16 => PriorityClass::Half,
            PrimitiveType::Int8
            | PrimitiveType::Uint8
            | PrimitiveType::Char
            | PrimitiveType::Uint8MavlinkVersion => PriorityClass::Byte,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_name())
    }
}

/// One field of a compiled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Lowercased name; unique within its message.
    pub name: String,
    /// Name as written in the schema. This is what the extra-CRC hashes.
    pub schema_name: String,
    pub primitive: PrimitiveType,
    /// 1 for scalars, the fixed element count for arrays.
    pub arity: u8,
    pub description: String,
}

impl FieldSpec {
    pub fn new(schema_name: &str, primitive: PrimitiveType, arity: u8, description: &str) -> Self {
        FieldSpec {
            name: schema_name.to_lowercase(),
            schema_name: schema_name.to_string(),
            primitive,
            arity,
            description: description.to_string(),
        }
    }

    pub fn is_array(&self) -> bool {
        self.arity > 1
    }

    /// Bytes this field occupies in the payload.
    pub fn footprint(&self) -> usize {
        self.primitive.width() * self.arity as usize
    }
}

/// A compiled message: wire-ordered fields, payload length and extra-CRC.
///
/// Built only by [`crate::compiler`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSpec {
    pub(crate) id: u8,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) payload_len: usize,
    pub(crate) crc_extra: u8,
}

impl MessageSpec {
    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Fields in wire order (after priority reordering).
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Compatibility code: the folded X.25 CRC over the message's name and field layout.
    pub fn crc_extra(&self) -> u8 {
        self.crc_extra
    }
}

/// One enumerator with its resolved numeric value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEntry {
    pub name: String,
    pub value: i64,
    pub description: Option<String>,
}

/// An `<enum>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumBlock {
    pub name: String,
    pub description: Option<String>,
    pub entries: Vec<EnumEntry>,
}
