//! Compile `<message>` and `<enum>` elements into [`MessageSpec`]s and [`EnumBlock`]s.
//!
//! Fields are stably reordered by [`PriorityClass`](crate::types::PriorityClass) so every
//! field is naturally aligned, and the extra-CRC is computed over that reordered layout.
//! The reordered order is part of the protocol: hashing the declared order instead would
//! produce codes that no other implementation agrees with.

use crate::checksum::{accumulate, fold, X25_INIT};
use crate::document::Element;
use crate::error::{ParseError, SchemaError};
use crate::parser::parse;
use crate::pool::parallel_map;
use crate::table::{CompatibilityTable, MAX_MESSAGE_ID};
use crate::types::{EnumBlock, EnumEntry, FieldSpec, MessageSpec, PrimitiveType};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Everything compiled from one schema document.
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    pub name: String,
    /// Successfully compiled messages, in document order.
    pub messages: Vec<MessageSpec>,
    pub enums: Vec<EnumBlock>,
    pub table: CompatibilityTable,
    /// Messages and enum blocks that failed; they contribute nothing else.
    pub errors: Vec<SchemaError>,
}

/// Compile one `<message>` element.
pub fn compile_message(element: &Element) -> Result<MessageSpec, SchemaError> {
    let name = element.attr("name").ok_or_else(|| SchemaError::MissingAttribute {
        element: element.name.clone(),
        attribute: "name",
    })?;
    let raw_id = element.attr("id").ok_or_else(|| SchemaError::MissingAttribute {
        element: format!("{} {}", element.name, name),
        attribute: "id",
    })?;
    let digits = raw_id.trim();
    let id = Some(digits)
        .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|d| d.parse::<u8>().ok())
        .filter(|id| *id <= MAX_MESSAGE_ID)
        .ok_or_else(|| SchemaError::InvalidMessageId {
            message: name.to_string(),
            value: raw_id.to_string(),
            max: MAX_MESSAGE_ID,
        })?;
    let fields = element
        .children_named("field")
        .map(|f| compile_field(name, f))
        .collect::<Result<Vec<_>, _>>()?;
    build_message(id, name, element.child_text("description"), fields)
}

fn compile_field(message: &str, element: &Element) -> Result<FieldSpec, SchemaError> {
    let name = element.attr("name").ok_or_else(|| SchemaError::MissingAttribute {
        element: format!("field of {}", message),
        attribute: "name",
    })?;
    let type_spec = element.attr("type").ok_or_else(|| SchemaError::MissingAttribute {
        element: format!("field {}.{}", message, name),
        attribute: "type",
    })?;
    let (primitive, arity) = parse_type_spec(message, name, type_spec)?;
    Ok(FieldSpec::new(name, primitive, arity, &element.normalized_text()))
}

/// Split `type` or `type[N]` into the primitive and its arity.
fn parse_type_spec(
    message: &str,
    field: &str,
    type_spec: &str,
) -> Result<(PrimitiveType, u8), SchemaError> {
    let type_spec = type_spec.trim();
    let malformed = || SchemaError::MalformedArray {
        message: message.to_string(),
        field: field.to_string(),
        type_spec: type_spec.to_string(),
    };
    let (base, arity) = match type_spec.find('[') {
        None => (type_spec, 1u64),
        Some(open) => {
            let digits = type_spec[open + 1..].strip_suffix(']').ok_or_else(malformed)?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            // All digits; parse can only fail on overflow.
            let arity = digits.parse::<u64>().unwrap_or(u64::MAX);
            if arity == 0 {
                return Err(malformed());
            }
            (&type_spec[..open], arity)
        }
    };
    let primitive = PrimitiveType::from_schema_name(base).ok_or_else(|| SchemaError::UnknownType {
        message: message.to_string(),
        field: field.to_string(),
        type_name: base.to_string(),
    })?;
    let arity = u8::try_from(arity).map_err(|_| SchemaError::ArityOverflow {
        message: message.to_string(),
        field: field.to_string(),
        arity,
    })?;
    Ok((primitive, arity))
}

/// Assemble a message from declared fields: reject duplicate names, reorder by priority
/// class (stable), sum the payload length and compute the extra-CRC.
pub fn build_message(
    id: u8,
    name: &str,
    description: Option<String>,
    mut fields: Vec<FieldSpec>,
) -> Result<MessageSpec, SchemaError> {
    {
        let mut seen = HashSet::new();
        if let Some(dup) = fields.iter().find(|f| !seen.insert(f.name.as_str())) {
            return Err(SchemaError::DuplicateField {
                message: name.to_string(),
                field: dup.name.clone(),
            });
        }
    }
    fields.sort_by_key(|f| f.primitive.priority());
    let payload_len = fields.iter().map(FieldSpec::footprint).sum();
    let crc_extra = crc_extra(name, &fields);
    Ok(MessageSpec {
        id,
        name: name.to_string(),
        description,
        fields,
        payload_len,
        crc_extra,
    })
}

/// Bytes hashed for the extra-CRC, in order: `NAME `, then per field `type `, `name ` and,
/// for arrays, one byte holding the length.
pub fn crc_input(name: &str, fields: &[FieldSpec]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(name.to_uppercase().as_bytes());
    out.push(b' ');
    for f in fields {
        out.extend_from_slice(f.primitive.crc_name().as_bytes());
        out.push(b' ');
        out.extend_from_slice(f.schema_name.as_bytes());
        out.push(b' ');
        if f.is_array() {
            out.push(f.arity);
        }
    }
    out
}

/// Extra-CRC for a message whose `fields` are already in wire order.
pub fn crc_extra(name: &str, fields: &[FieldSpec]) -> u8 {
    fold(accumulate(X25_INIT, &crc_input(name, fields)))
}

/// Compile one `<enum>` block. Entries without a `value` take a counter that starts
/// at 0 and advances only when it is used.
pub fn compile_enum_block(element: &Element) -> Result<EnumBlock, SchemaError> {
    let enum_name = element.attr("name").ok_or_else(|| SchemaError::MissingAttribute {
        element: element.name.clone(),
        attribute: "name",
    })?;
    let mut counter: i64 = 0;
    let mut entries = Vec::new();
    for entry in element.children_named("entry") {
        let name = entry.attr("name").ok_or_else(|| SchemaError::MissingAttribute {
            element: format!("entry of {}", enum_name),
            attribute: "name",
        })?;
        let value = match entry.attr("value") {
            Some(raw) => parse_enum_value(raw).ok_or_else(|| SchemaError::InvalidEnumValue {
                enum_name: enum_name.to_string(),
                entry: name.to_string(),
                value: raw.to_string(),
            })?,
            None => {
                let v = counter;
                counter += 1;
                v
            }
        };
        entries.push(EnumEntry {
            name: name.to_uppercase(),
            value,
            description: entry.child_text("description"),
        });
    }
    Ok(EnumBlock {
        name: enum_name.to_string(),
        description: element.child_text("description"),
        entries,
    })
}

/// Compile every `<enum>` under an `<enums>` element, failing on the first bad block.
pub fn compile_enums(element: &Element) -> Result<Vec<EnumBlock>, SchemaError> {
    element.children_named("enum").map(compile_enum_block).collect()
}

fn parse_enum_value(raw: &str) -> Option<i64> {
    let s = raw.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Compile a whole document. Messages compile on up to `workers` threads and are then
/// registered in document order, so the first definition of an id always wins.
/// A failing message or enum block is recorded in `errors` and skipped.
pub fn compile_document(name: &str, root: &Element, workers: usize) -> CompiledDocument {
    let message_elements: Vec<&Element> = root
        .children_named("messages")
        .flat_map(|m| m.children_named("message"))
        .collect();
    let results = parallel_map(&message_elements, workers, |el| compile_message(el));

    let mut table = CompatibilityTable::new();
    let mut messages = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result.and_then(|spec| table.register_message(&spec).map(|_| spec)) {
            Ok(spec) => {
                debug!(
                    document = name,
                    id = spec.id(),
                    name = spec.name(),
                    payload_len = spec.payload_len(),
                    crc_extra = spec.crc_extra(),
                    "compiled message"
                );
                messages.push(spec);
            }
            Err(e) => {
                warn!(document = name, error = %e, "message skipped");
                errors.push(e);
            }
        }
    }

    let mut enums = Vec::new();
    for block in root
        .children_named("enums")
        .flat_map(|e| e.children_named("enum"))
    {
        match compile_enum_block(block) {
            Ok(b) => enums.push(b),
            Err(e) => {
                warn!(document = name, error = %e, "enum skipped");
                errors.push(e);
            }
        }
    }

    CompiledDocument {
        name: name.to_string(),
        messages,
        enums,
        table,
        errors,
    }
}

/// Parse and compile document source.
pub fn compile_source(name: &str, source: &str, workers: usize) -> Result<CompiledDocument, ParseError> {
    let root = parse(source)?;
    Ok(compile_document(name, &root, workers))
}
