//! Schema fuzz target for the document compiler.
//!
//! For any UTF-8 input, `compile_source` must return instead of panicking, and every
//! message it accepts must satisfy:
//! - `payload_len` is the sum of the field footprints;
//! - fields are in ascending priority-class order (wide first);
//! - the document table holds the message's name and extra-CRC under its id;
//! - no two accepted messages share an id.
//!
//! Build with: cargo fuzz run schema_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let doc = match mavgen::compile_source("fuzz", s, 1) {
        Ok(doc) => doc,
        Err(_) => return,
    };
    let mut seen = std::collections::HashSet::new();
    for spec in &doc.messages {
        let fields = spec.fields();
        let total: usize = fields.iter().map(|f| f.footprint()).sum();
        assert_eq!(spec.payload_len(), total, "{}", spec.name());
        assert!(
            fields
                .windows(2)
                .all(|w| w[0].primitive.priority().value() <= w[1].primitive.priority().value()),
            "{} fields out of priority order",
            spec.name()
        );
        assert_eq!(doc.table.crc_extra(spec.id()), spec.crc_extra());
        assert_eq!(doc.table.message_name(spec.id()), Some(spec.name()));
        assert!(seen.insert(spec.id()), "id {} accepted twice", spec.id());
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run schema_fuzz");
}
