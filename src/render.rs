//! Text artifacts: message descriptors with their plans, enum listings, the run-wide
//! extra-CRC table and the msgid dispatch listing.

use crate::codec::{pack_plan, unpack_plan, verify_plan, Endianness};
use crate::table::{CompatibilityTable, TABLE_SLOTS};
use crate::types::{EnumBlock, MessageSpec};
use std::fmt::Write;

const LINE_WIDTH: usize = 80;

fn endianness_label(e: Endianness) -> &'static str {
    match e {
        Endianness::Little => "little-endian",
        Endianness::Big => "big-endian",
    }
}

fn element_suffix(index: Option<usize>) -> String {
    index.map(|i| format!("[{}]", i)).unwrap_or_default()
}

/// Descriptor, field layout, and pack/unpack/verify plans for one message.
pub fn render_message(spec: &MessageSpec, endianness: Endianness) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "message {} id={} payload_len={} crc_extra={}",
        spec.name(),
        spec.id(),
        spec.payload_len(),
        spec.crc_extra()
    );
    if let Some(d) = spec.description() {
        let _ = writeln!(out, "description: {}", d);
    }

    out.push_str("\nfields:\n");
    let mut offset = 0;
    for f in spec.fields() {
        let ty = if f.is_array() {
            format!("{}[{}]", f.primitive, f.arity)
        } else {
            f.primitive.to_string()
        };
        let _ = write!(
            out,
            "  {:>3}  {:<28} {:<20} class={}",
            offset,
            ty,
            f.schema_name,
            f.primitive.priority().value()
        );
        if !f.description.is_empty() {
            let _ = write!(out, "  # {}", f.description);
        }
        out.push('\n');
        offset += f.footprint();
    }

    let _ = writeln!(out, "\npack ({}):", endianness_label(endianness));
    for step in pack_plan(spec) {
        let _ = writeln!(
            out,
            "  {:>3}  put_{} {}{}",
            step.offset(),
            step.primitive().short_name(),
            step.field(),
            element_suffix(step.index())
        );
    }

    out.push_str("\nunpack:\n");
    for step in unpack_plan(spec) {
        let _ = writeln!(
            out,
            "  {:>3}  {}{} = get_{}",
            step.offset(),
            step.field(),
            element_suffix(step.index()),
            step.primitive().short_name()
        );
    }

    out.push_str("\nverify:\n");
    for step in verify_plan(spec) {
        let _ = writeln!(out, "  len({}) == {}", step.field, step.arity);
    }
    out
}

/// Every enum block of a document with resolved values.
pub fn render_enums(document: &str, enums: &[EnumBlock]) -> String {
    let mut out = format!("enums of {}\n", document);
    for block in enums {
        let _ = writeln!(out, "\nenum {}", block.name);
        if let Some(d) = &block.description {
            let _ = writeln!(out, "  # {}", d);
        }
        let width = block.entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
        for e in &block.entries {
            let _ = write!(out, "  {:<width$} = {}", e.name, e.value, width = width);
            if let Some(d) = &e.description {
                let _ = write!(out, "  # {}", d);
            }
            out.push('\n');
        }
    }
    out
}

/// The table as a comma-separated list of 255 codes, wrapped at 80 columns.
pub fn render_crc_table(table: &CompatibilityTable) -> String {
    let mut out = format!("crc_extra[{}] = {{\n", TABLE_SLOTS);
    let mut line = String::from(" ");
    let codes = table.codes();
    for (i, code) in codes.iter().enumerate() {
        let item = if i + 1 == codes.len() {
            format!(" {}", code)
        } else {
            format!(" {},", code)
        };
        if line.len() + item.len() > LINE_WIDTH {
            out.push_str(&line);
            out.push('\n');
            line = String::from(" ");
        }
        line.push_str(&item);
    }
    out.push_str(&line);
    out.push_str("\n}\n");
    out
}

/// One line per registered id: `id name crc_extra`.
pub fn render_dispatch(table: &CompatibilityTable) -> String {
    let mut out = String::new();
    for (id, name, code) in table.entries() {
        let _ = writeln!(out, "{:>3} {:<32} {}", id, name, code);
    }
    out
}
