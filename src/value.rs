//! Runtime values for packing/unpacking (codec representation).

use crate::types::PrimitiveType;

/// A single field value: one primitive, or a fixed-length array of them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Float(f32),
    Double(f64),
    Char(u8),
    List(Vec<Value>),
}

impl Value {
    /// Zero of the given wire type.
    pub fn zero(primitive: PrimitiveType) -> Value {
        match primitive.wire_type() {
            PrimitiveType::Double => Value::Double(0.0),
            PrimitiveType::Int64 => Value::I64(0),
            PrimitiveType::Uint64 => Value::U64(0),
            PrimitiveType::Int32 => Value::I32(0),
            PrimitiveType::Uint32 => Value::U32(0),
            PrimitiveType::Float => Value::Float(0.0),
            PrimitiveType::Int16 => Value::I16(0),
            PrimitiveType::Uint16 => Value::U16(0),
            PrimitiveType::Int8 => Value::I8(0),
            PrimitiveType::Char => Value::Char(0),
            PrimitiveType::Uint8 | PrimitiveType::Uint8MavlinkVersion => Value::U8(0),
        }
    }

    /// A `char[n]` value from text, NUL-padded (or truncated) to `n`.
    pub fn text(s: &str, n: usize) -> Value {
        let mut bytes: Vec<Value> = s.bytes().take(n).map(Value::Char).collect();
        bytes.resize(n, Value::Char(0));
        Value::List(bytes)
    }

    /// Text of a `char` array up to the first NUL.
    pub fn as_text(&self) -> Option<String> {
        let list = self.as_list()?;
        let bytes: Option<Vec<u8>> = list
            .iter()
            .map(|v| match v {
                Value::Char(c) => Some(*c),
                _ => None,
            })
            .take_while(|c| *c != Some(0))
            .collect();
        bytes.map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// Whether this scalar has the variant that `primitive` decodes to.
    pub fn is_a(&self, primitive: PrimitiveType) -> bool {
        matches!(
            (self, primitive.wire_type()),
            (Value::U8(_), PrimitiveType::Uint8)
                | (Value::U16(_), PrimitiveType::Uint16)
                | (Value::U32(_), PrimitiveType::Uint32)
                | (Value::U64(_), PrimitiveType::Uint64)
                | (Value::I8(_), PrimitiveType::Int8)
                | (Value::I16(_), PrimitiveType::Int16)
                | (Value::I32(_), PrimitiveType::Int32)
                | (Value::I64(_), PrimitiveType::Int64)
                | (Value::Float(_), PrimitiveType::Float)
                | (Value::Double(_), PrimitiveType::Double)
                | (Value::Char(_), PrimitiveType::Char)
        )
    }

    /// Number of elements held: 1 for a scalar, the list length otherwise.
    pub fn len(&self) -> usize {
        match self {
            Value::List(v) => v.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` (0-based). A scalar is its own element 0.
    pub fn element(&self, i: usize) -> Option<&Value> {
        match self {
            Value::List(v) => v.get(i),
            scalar if i == 0 => Some(scalar),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }
}
