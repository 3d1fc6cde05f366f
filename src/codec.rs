//! Pack/unpack/verify plans derived from a [`MessageSpec`], and a codec that runs them.
//!
//! The plans are the generator's output: one primitive write (or read) per scalar field and
//! one per array element, in wire order, with the byte offset each lands at. [`Codec`]
//! executes the same plans so that what is emitted and what is tested cannot drift apart.

use crate::types::{FieldSpec, MessageSpec, PrimitiveType};
use crate::value::Value;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    Big,
    #[default]
    Little,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown message: {0}")]
    UnknownMessage(String),
    #[error("Packing: field '{0}' does not hold its declared number of elements")]
    Packing(String),
    #[error("Type mismatch: field '{field}' expects {expected}")]
    TypeMismatch {
        field: String,
        expected: PrimitiveType,
    },
    #[error("Payload length: {message} expects {expected} bytes, got {actual}")]
    PayloadLength {
        message: String,
        expected: usize,
        actual: usize,
    },
}

/// One write of the pack plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackStep {
    Put {
        field: String,
        primitive: PrimitiveType,
        offset: usize,
    },
    /// Element `index` (1-based) of an array field.
    PutElement {
        field: String,
        primitive: PrimitiveType,
        index: usize,
        offset: usize,
    },
}

/// One read of the unpack plan. The cursor starts at 0 and each read advances it by the
/// primitive's width, so `offset` is where the read happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackStep {
    Get {
        field: String,
        primitive: PrimitiveType,
        offset: usize,
    },
    GetElement {
        field: String,
        primitive: PrimitiveType,
        index: usize,
        offset: usize,
    },
}

/// Length check for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyStep {
    pub field: String,
    pub arity: usize,
}

/// Result of running the verify plan. `Mismatch` names the first offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Ok,
    Mismatch(String),
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        matches!(self, Verification::Ok)
    }
}

macro_rules! step_accessors {
    ($ty:ident, $scalar:ident, $element:ident) => {
        impl $ty {
            pub fn field(&self) -> &str {
                match self {
                    $ty::$scalar { field, .. } | $ty::$element { field, .. } => field.as_str(),
                }
            }

            pub fn primitive(&self) -> PrimitiveType {
                match self {
                    $ty::$scalar { primitive, .. } | $ty::$element { primitive, .. } => *primitive,
                }
            }

            pub fn offset(&self) -> usize {
                match self {
                    $ty::$scalar { offset, .. } | $ty::$element { offset, .. } => *offset,
                }
            }

            /// 1-based element index for array steps.
            pub fn index(&self) -> Option<usize> {
                match self {
                    $ty::$scalar { .. } => None,
                    $ty::$element { index, .. } => Some(*index),
                }
            }
        }
    };
}

step_accessors!(PackStep, Put, PutElement);
step_accessors!(UnpackStep, Get, GetElement);

/// Every primitive slot of the payload: (field, 1-based index for arrays, offset).
fn wire_slots(spec: &MessageSpec) -> Vec<(&FieldSpec, Option<usize>, usize)> {
    let mut offset = 0;
    let mut out = Vec::new();
    for f in spec.fields() {
        let width = f.primitive.width();
        if f.is_array() {
            for i in 1..=f.arity as usize {
                out.push((f, Some(i), offset));
                offset += width;
            }
        } else {
            out.push((f, None, offset));
            offset += width;
        }
    }
    out
}

pub fn pack_plan(spec: &MessageSpec) -> Vec<PackStep> {
    wire_slots(spec)
        .into_iter()
        .map(|(f, index, offset)| {
            let field = f.name.clone();
            let primitive = f.primitive.wire_type();
            match index {
                None => PackStep::Put { field, primitive, offset },
                Some(index) => PackStep::PutElement { field, primitive, index, offset },
            }
        })
        .collect()
}

pub fn unpack_plan(spec: &MessageSpec) -> Vec<UnpackStep> {
    wire_slots(spec)
        .into_iter()
        .map(|(f, index, offset)| {
            let field = f.name.clone();
            let primitive = f.primitive.wire_type();
            match index {
                None => UnpackStep::Get { field, primitive, offset },
                Some(index) => UnpackStep::GetElement { field, primitive, index, offset },
            }
        })
        .collect()
}

pub fn verify_plan(spec: &MessageSpec) -> Vec<VerifyStep> {
    spec.fields()
        .iter()
        .map(|f| VerifyStep {
            field: f.name.clone(),
            arity: f.arity as usize,
        })
        .collect()
}

/// Runs the plans over field values keyed by (lowercase) field name.
#[derive(Debug)]
pub struct Codec {
    pub endianness: Endianness,
    messages: Vec<MessageSpec>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<u8, usize>,
}

impl Codec {
    /// Index `messages` by name and id. Where two share a name or id the first is used.
    pub fn new(messages: Vec<MessageSpec>, endianness: Endianness) -> Self {
        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();
        for (i, m) in messages.iter().enumerate() {
            by_name.entry(m.name().to_string()).or_insert(i);
            by_id.entry(m.id()).or_insert(i);
        }
        Codec {
            endianness,
            messages,
            by_name,
            by_id,
        }
    }

    pub fn messages(&self) -> &[MessageSpec] {
        &self.messages
    }

    pub fn message(&self, name: &str) -> Option<&MessageSpec> {
        self.by_name.get(name).map(|&i| &self.messages[i])
    }

    pub fn message_by_id(&self, id: u8) -> Option<&MessageSpec> {
        self.by_id.get(&id).map(|&i| &self.messages[i])
    }

    /// Check every field holds exactly its declared number of elements. A missing field
    /// holds none.
    pub fn verify(&self, spec: &MessageSpec, values: &HashMap<String, Value>) -> Verification {
        for step in verify_plan(spec) {
            let held = values.get(&step.field).map_or(0, Value::len);
            if held != step.arity {
                return Verification::Mismatch(step.field);
            }
        }
        Verification::Ok
    }

    /// Verify, then write every pack step. The result is exactly `payload_len` bytes.
    pub fn pack(&self, spec: &MessageSpec, values: &HashMap<String, Value>) -> Result<Vec<u8>, CodecError> {
        if let Verification::Mismatch(field) = self.verify(spec, values) {
            return Err(CodecError::Packing(field));
        }
        let mut out = Vec::with_capacity(spec.payload_len());
        for step in pack_plan(spec) {
            let element = step.index().map_or(0, |i| i - 1);
            let v = values
                .get(step.field())
                .and_then(|v| v.element(element))
                .ok_or_else(|| CodecError::Packing(step.field().to_string()))?;
            match self.endianness {
                Endianness::Little => write_primitive::<LittleEndian>(&mut out, &step, v)?,
                Endianness::Big => write_primitive::<BigEndian>(&mut out, &step, v)?,
            }
        }
        debug_assert_eq!(out.len(), spec.payload_len());
        Ok(out)
    }

    /// Read every unpack step from a payload of exactly `payload_len` bytes.
    pub fn unpack(&self, spec: &MessageSpec, payload: &[u8]) -> Result<HashMap<String, Value>, CodecError> {
        if payload.len() != spec.payload_len() {
            return Err(CodecError::PayloadLength {
                message: spec.name().to_string(),
                expected: spec.payload_len(),
                actual: payload.len(),
            });
        }
        let mut r = Cursor::new(payload);
        let mut out = HashMap::new();
        for step in unpack_plan(spec) {
            let v = match self.endianness {
                Endianness::Little => read_primitive::<LittleEndian>(&mut r, step.primitive())?,
                Endianness::Big => read_primitive::<BigEndian>(&mut r, step.primitive())?,
            };
            match step {
                UnpackStep::Get { field, .. } => {
                    out.insert(field, v);
                }
                UnpackStep::GetElement { field, .. } => {
                    if let Value::List(items) = out.entry(field).or_insert_with(|| Value::List(Vec::new())) {
                        items.push(v);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Pack a message looked up by name.
    pub fn encode_message(&self, message_name: &str, values: &HashMap<String, Value>) -> Result<Vec<u8>, CodecError> {
        let spec = self
            .message(message_name)
            .ok_or_else(|| CodecError::UnknownMessage(message_name.to_string()))?;
        self.pack(spec, values)
    }

    /// Unpack a message looked up by name.
    pub fn decode_message(&self, message_name: &str, payload: &[u8]) -> Result<HashMap<String, Value>, CodecError> {
        let spec = self
            .message(message_name)
            .ok_or_else(|| CodecError::UnknownMessage(message_name.to_string()))?;
        self.unpack(spec, payload)
    }
}

fn write_primitive<B: ByteOrder>(w: &mut Vec<u8>, step: &PackStep, v: &Value) -> Result<(), CodecError> {
    match (step.primitive(), v) {
        (PrimitiveType::Uint8, Value::U8(x)) => w.write_u8(*x)?,
        (PrimitiveType::Char, Value::Char(x)) => w.write_u8(*x)?,
        (PrimitiveType::Int8, Value::I8(x)) => w.write_i8(*x)?,
        (PrimitiveType::Uint16, Value::U16(x)) => w.write_u16::<B>(*x)?,
        (PrimitiveType::Int16, Value::I16(x)) => w.write_i16::<B>(*x)?,
        (PrimitiveType::Uint32, Value::U32(x)) => w.write_u32::<B>(*x)?,
        (PrimitiveType::Int32, Value::I32(x)) => w.write_i32::<B>(*x)?,
        (PrimitiveType::Float, Value::Float(x)) => w.write_f32::<B>(*x)?,
        (PrimitiveType::Uint64, Value::U64(x)) => w.write_u64::<B>(*x)?,
        (PrimitiveType::Int64, Value::I64(x)) => w.write_i64::<B>(*x)?,
        (PrimitiveType::Double, Value::Double(x)) => w.write_f64::<B>(*x)?,
        (expected, _) => {
            return Err(CodecError::TypeMismatch {
                field: step.field().to_string(),
                expected,
            })
        }
    }
    Ok(())
}

fn read_primitive<B: ByteOrder>(r: &mut Cursor<&[u8]>, primitive: PrimitiveType) -> Result<Value, CodecError> {
    Ok(match primitive.wire_type() {
        PrimitiveType::Uint8 | PrimitiveType::Uint8MavlinkVersion => Value::U8(r.read_u8()?),
        PrimitiveType::Char => Value::Char(r.read_u8()?),
        PrimitiveType::Int8 => Value::I8(r.read_i8()?),
        PrimitiveType::Uint16 => Value::U16(r.read_u16::<B>()?),
        PrimitiveType::Int16 => Value::I16(r.read_i16::<B>()?),
        PrimitiveType::Uint32 => Value::U32(r.read_u32::<B>()?),
        PrimitiveType::Int32 => Value::I32(r.read_i32::<B>()?),
        PrimitiveType::Float => Value::Float(r.read_f32::<B>()?),
        PrimitiveType::Uint64 => Value::U64(r.read_u64::<B>()?),
        PrimitiveType::Int64 => Value::I64(r.read_i64::<B>()?),
        PrimitiveType::Double => Value::Double(r.read_f64::<B>()?),
    })
}
