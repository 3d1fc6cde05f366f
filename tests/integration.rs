//! Integration tests: compile schemas, run the codec and packet framing, generate artifacts.

use mavgen::checksum::{accumulate, fold, X25_INIT};
use mavgen::compiler::crc_input;
use mavgen::frame::{self, Packet, PacketHeader, STX};
use mavgen::{
    compile_source, generate, Codec, CompatibilityTable, Endianness, GenerateOptions, MessageSpec, ParseError,
    SchemaError, Value,
};
use std::collections::HashMap;
use std::fs;

const COMMON: &str = r#"<?xml version="1.0"?>
<mavlink>
  <version>3</version>
  <enums>
    <enum name="MAV_AUTOPILOT">
      <description>Micro air vehicle autopilot classes.</description>
      <entry value="0" name="MAV_AUTOPILOT_GENERIC"><description>Generic autopilot</description></entry>
      <entry value="3" name="MAV_AUTOPILOT_ARDUPILOTMEGA"/>
      <entry name="MAV_AUTOPILOT_OPENPILOT"/>
    </enum>
  </enums>
  <messages>
    <message id="0" name="HEARTBEAT">
      <description>The heartbeat message shows that a system is present.</description>
      <field type="uint8_t" name="type">Type of the MAV</field>
      <field type="uint8_t" name="autopilot">Autopilot type</field>
      <field type="uint8_t" name="base_mode">System mode bitfield</field>
      <field type="uint32_t" name="custom_mode">Autopilot-specific flags</field>
      <field type="uint8_t" name="system_status">System status flag</field>
      <field type="uint8_t_mavlink_version" name="mavlink_version">MAVLink version</field>
    </message>
    <message id="4" name="PING">
      <field type="uint64_t" name="time_usec">Unix timestamp in microseconds</field>
      <field type="uint32_t" name="seq">PING sequence</field>
      <field type="uint8_t" name="target_system">0: request ping from all receiving systems</field>
      <field type="uint8_t" name="target_component">0: request ping from all receiving components</field>
    </message>
    <message id="22" name="PARAM_VALUE">
      <field type="char[16]" name="param_id">Onboard parameter id</field>
      <field type="float" name="param_value">Onboard parameter value</field>
      <field type="uint8_t" name="param_type">Onboard parameter type</field>
      <field type="uint16_t" name="param_count">Total number of onboard parameters</field>
      <field type="uint16_t" name="param_index">Index of this onboard parameter</field>
    </message>
  </messages>
</mavlink>
"#;

fn compiled() -> (Codec, CompatibilityTable) {
    let doc = compile_source("common", COMMON, 2).expect("parse");
    assert!(doc.errors.is_empty(), "{:?}", doc.errors);
    let table = doc.table.clone();
    (Codec::new(doc.messages, Endianness::Little), table)
}

fn heartbeat_values() -> HashMap<String, Value> {
    HashMap::from([
        ("type".to_string(), Value::U8(6)),
        ("autopilot".to_string(), Value::U8(8)),
        ("base_mode".to_string(), Value::U8(0)),
        ("custom_mode".to_string(), Value::U32(0)),
        ("system_status".to_string(), Value::U8(4)),
        ("mavlink_version".to_string(), Value::U8(3)),
    ])
}

fn ping_values(seq: u32) -> HashMap<String, Value> {
    HashMap::from([
        ("time_usec".to_string(), Value::U64(1_000_000)),
        ("seq".to_string(), Value::U32(seq)),
        ("target_system".to_string(), Value::U8(1)),
        ("target_component".to_string(), Value::U8(1)),
    ])
}

#[test]
fn test_published_extra_crcs() {
    let (codec, table) = compiled();
    let code = |name: &str| codec.message(name).map(MessageSpec::crc_extra);
    assert_eq!(code("HEARTBEAT"), Some(50));
    assert_eq!(code("PING"), Some(237));
    assert_eq!(code("PARAM_VALUE"), Some(220));
    assert_eq!(table.crc_extra(0), 50);
    assert_eq!(table.crc_extra(4), 237);
    assert_eq!(table.crc_extra(22), 220);
    assert_eq!(table.crc_extra(1), 0);
}

#[test]
fn test_stable_sort_by_priority_class() {
    let (codec, _) = compiled();
    let names = |m: &str| -> Vec<String> {
        codec.message(m).expect("message").fields().iter().map(|f| f.name.clone()).collect()
    };
    assert_eq!(
        names("HEARTBEAT"),
        ["custom_mode", "type", "autopilot", "base_mode", "system_status", "mavlink_version"]
    );
    assert_eq!(
        names("PARAM_VALUE"),
        ["param_value", "param_count", "param_index", "param_id", "param_type"]
    );
    for spec in codec.messages() {
        let classes: Vec<u8> = spec.fields().iter().map(|f| f.primitive.priority().value()).collect();
        assert!(classes.windows(2).all(|w| w[0] <= w[1]), "{}: {:?}", spec.name(), classes);
    }
}

#[test]
fn test_checksum_tracks_layout_changes() {
    let base = compile_source("a", COMMON, 1).expect("parse");
    let renamed = COMMON.replace(r#"name="target_component""#, r#"name="target_comp""#);
    let retyped = COMMON.replace(r#"type="uint32_t" name="seq""#, r#"type="int32_t" name="seq""#);
    let regrown = COMMON.replace("char[16]", "char[17]");
    let ping = |src: &str, name: &str| {
        compile_source("b", src, 1)
            .expect("parse")
            .messages
            .iter()
            .find(|m| m.name() == name)
            .map(MessageSpec::crc_extra)
    };
    let ping_base = base.messages.iter().find(|m| m.name() == "PING").map(MessageSpec::crc_extra);
    assert_ne!(ping(&renamed, "PING"), ping_base);
    assert_ne!(ping(&retyped, "PING"), ping_base);
    assert_ne!(ping(&regrown, "PARAM_VALUE"), ping(COMMON, "PARAM_VALUE"));
    // Same metadata, same code.
    assert_eq!(ping(COMMON, "PING"), ping_base);
}

#[test]
fn test_crc_input_is_folded_x25() {
    let (codec, _) = compiled();
    for spec in codec.messages() {
        let raw = accumulate(X25_INIT, &crc_input(spec.name(), spec.fields()));
        assert_eq!(fold(raw), spec.crc_extra());
    }
}

#[test]
fn test_pack_unpack_round_trip() {
    let (codec, _) = compiled();
    let spec = codec.message("PARAM_VALUE").expect("message");
    let values = HashMap::from([
        ("param_id".to_string(), Value::text("SYSID_THISMAV", 16)),
        ("param_value".to_string(), Value::Float(1.5)),
        ("param_type".to_string(), Value::U8(9)),
        ("param_count".to_string(), Value::U16(300)),
        ("param_index".to_string(), Value::U16(7)),
    ]);
    let payload = codec.pack(spec, &values).expect("pack");
    assert_eq!(payload.len(), spec.payload_len());
    assert_eq!(payload.len(), 25);
    assert_eq!(&payload[0..4], &1.5f32.to_le_bytes());
    assert_eq!(&payload[4..6], &300u16.to_le_bytes());
    assert_eq!(&payload[8..21], b"SYSID_THISMAV");
    let decoded = codec.unpack(spec, &payload).expect("unpack");
    assert_eq!(decoded, values);
    assert_eq!(decoded["param_id"].as_text().as_deref(), Some("SYSID_THISMAV"));
}

#[test]
fn test_frame_round_trip() {
    let (codec, table) = compiled();
    let header = PacketHeader { seq: 7, sysid: 1, compid: 1 };
    let bytes = frame::encode_message(&codec, &table, header, "HEARTBEAT", &heartbeat_values()).expect("encode");
    assert_eq!(bytes[0], STX);
    assert_eq!(bytes[1] as usize, 9);
    assert_eq!(bytes[5], 0);
    let (packet, used) = Packet::decode(&bytes, &table).expect("decode");
    assert_eq!(used, bytes.len());
    assert_eq!(packet.header, header);
    let values = codec.decode_message("HEARTBEAT", &packet.payload).expect("unpack");
    assert_eq!(values, heartbeat_values());
}

#[test]
fn test_frame_stream_drops_bad_packets() {
    let (codec, table) = compiled();
    let header = PacketHeader { seq: 0, sysid: 1, compid: 1 };
    let heartbeat = frame::encode_message(&codec, &table, header, "HEARTBEAT", &heartbeat_values()).expect("encode");
    let ping = frame::encode_message(&codec, &table, header, "PING", &ping_values(1)).expect("encode");
    let unknown = Packet { header, msgid: 200, payload: vec![1, 2, 3] }.encode(&table).expect("encode");
    let mut corrupt = frame::encode_message(&codec, &table, header, "PING", &ping_values(2)).expect("encode");
    corrupt[10] ^= 0x01;

    let mut stream = vec![0x00, 0x55];
    stream.extend_from_slice(&heartbeat);
    stream.extend_from_slice(&unknown);
    stream.extend_from_slice(&ping);
    stream.extend_from_slice(&corrupt);

    let result = frame::decode_stream(&codec, &table, &stream);
    let names: Vec<&str> = result.messages.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["HEARTBEAT", "PING"]);
    assert_eq!(result.messages[0].byte_range, (2, 2 + heartbeat.len()));
    assert_eq!(result.messages[1].values["seq"], Value::U32(1));

    assert_eq!(result.removed.len(), 2);
    assert_eq!(result.removed[0].msgid, 200);
    assert!(result.removed[0].reason.contains("unsupported"));
    assert_eq!(result.removed[1].msgid, 4);
    assert!(result.removed[1].reason.contains("checksum"));
}

#[test]
fn test_frame_checksum_uses_table_code() {
    let (codec, table) = compiled();
    let bytes = frame::encode_message(&codec, &table, PacketHeader::default(), "PING", &ping_values(3)).expect("encode");
    let mut stale = CompatibilityTable::new();
    stale.register(4, "PING", 236).expect("register");
    assert!(matches!(Packet::decode(&bytes, &stale), Err(frame::FrameError::ChecksumMismatch { .. })));
}

#[test]
fn test_generate_writes_artifacts() {
    let schemas = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");
    fs::write(schemas.path().join("common.xml"), COMMON).expect("write");
    fs::write(
        schemas.path().join("extra.xml"),
        r#"<mavlink><messages>
             <message id="4" name="PING_AGAIN"><field type="uint8_t" name="a">a</field></message>
             <message id="150" name="SENSOR_OFFSETS"><field type="int16_t" name="mag_ofs_x">x</field></message>
             <message id="151" name="BAD"><field type="uint8_t[0]" name="a">a</field></message>
           </messages></mavlink>"#,
    )
    .expect("write");
    fs::write(schemas.path().join("broken.xml"), "<mavlink><messages></mavlink>").expect("write");
    fs::write(schemas.path().join("readme.txt"), "not a schema").expect("write");

    let mut options = GenerateOptions::new(schemas.path(), out.path());
    options.workers = 3;
    let report = generate(&options).expect("generate");

    let names: Vec<&str> = report.documents.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["broken", "common", "extra"]);
    assert!(report.documents[0].parse_error.is_some());
    assert_eq!(report.documents[1].messages, ["HEARTBEAT", "PING", "PARAM_VALUE"]);
    assert_eq!(report.documents[1].enums, 1);
    assert_eq!(report.documents[2].messages, ["SENSOR_OFFSETS"]);
    let extra_errors = &report.documents[2].schema_errors;
    assert_eq!(extra_errors.len(), 2);
    assert!(extra_errors.iter().any(|e| matches!(e, SchemaError::MalformedArray { .. })));
    assert!(extra_errors.iter().any(|e| matches!(e, SchemaError::DuplicateMessageId { id: 4, .. })));
    assert_eq!(report.error_count(), 3);
    assert_eq!(report.message_count(), 4);
    assert_eq!(report.table.crc_extra(4), 237);

    let read = |rel: &str| fs::read_to_string(out.path().join(rel)).expect(rel);
    assert!(read("common/msg_heartbeat.txt").starts_with("message HEARTBEAT id=0 payload_len=9 crc_extra=50\n"));
    assert!(read("common/msg_ping.txt").contains("pack (little-endian):"));
    assert!(read("common/common.enums.txt").contains("MAV_AUTOPILOT_OPENPILOT     = 0"));
    assert!(read("extra/extra.enums.txt").starts_with("enums of extra\n"));
    assert!(!out.path().join("extra/msg_ping_again.txt").exists());
    assert!(!out.path().join("extra/msg_bad.txt").exists());
    assert!(!out.path().join("broken").exists());

    let table = read("main/crc_table.txt");
    assert!(table.starts_with("crc_extra[255] = {\n  50, 0, 0, 0, 237,"));
    let dispatch = read("main/dispatch.txt");
    let ids: Vec<&str> = dispatch.lines().filter_map(|l| l.split_whitespace().next()).collect();
    assert_eq!(ids, ["0", "4", "22", "150"]);
}

#[test]
fn test_generate_big_endian_layout() {
    let schemas = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");
    fs::write(schemas.path().join("common.xml"), COMMON).expect("write");
    let mut options = GenerateOptions::new(schemas.path(), out.path());
    options.endianness = Endianness::Big;
    let report = generate(&options).expect("generate");
    assert_eq!(report.error_count(), 0);
    let text = fs::read_to_string(out.path().join("common/msg_ping.txt")).expect("read");
    assert!(text.contains("pack (big-endian):"));
}

#[test]
fn test_generate_reports_non_utf8_document() {
    let schemas = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");
    let mut latin1 = b"<mavlink><messages><message id=\"1\" name=\"CAF".to_vec();
    latin1.extend_from_slice(&[0xE9]);
    latin1.extend_from_slice(b"\"/></messages></mavlink>");
    fs::write(schemas.path().join("a_latin1.xml"), latin1).expect("write");
    fs::write(schemas.path().join("good.xml"), COMMON).expect("write");

    let report = generate(&GenerateOptions::new(schemas.path(), out.path())).expect("generate");
    assert_eq!(report.documents.len(), 2);
    assert_eq!(report.documents[0].name, "a_latin1");
    assert!(matches!(report.documents[0].parse_error, Some(ParseError::Encoding(_))));
    assert!(report.documents[0].messages.is_empty());
    assert_eq!(report.documents[1].messages, ["HEARTBEAT", "PING", "PARAM_VALUE"]);
    assert_eq!(report.error_count(), 1);
    assert!(out.path().join("good/msg_heartbeat.txt").exists());
    assert!(out.path().join("main/crc_table.txt").exists());
    assert!(!out.path().join("a_latin1").exists());
}

#[test]
fn test_generate_rejects_case_only_name_collision() {
    let schemas = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");
    fs::write(
        schemas.path().join("d.xml"),
        r#"<mavlink><messages>
             <message id="0" name="PING"><field type="uint8_t" name="a">a</field></message>
             <message id="1" name="Ping"><field type="uint16_t" name="b">b</field></message>
           </messages></mavlink>"#,
    )
    .expect("write");

    let report = generate(&GenerateOptions::new(schemas.path(), out.path())).expect("generate");
    let doc = &report.documents[0];
    assert_eq!(doc.messages, ["PING"]);
    assert_eq!(
        doc.schema_errors,
        vec![SchemaError::ArtifactCollision {
            message: "Ping".to_string(),
            existing: "PING".to_string(),
            file: "msg_ping.txt".to_string(),
        }]
    );
    assert!(!report.table.is_set(1));
    let text = fs::read_to_string(out.path().join("d/msg_ping.txt")).expect("read");
    assert!(text.starts_with("message PING id=0 "));
}
