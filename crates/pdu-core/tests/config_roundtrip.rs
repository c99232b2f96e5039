//! Integration tests for the pdu-core config codec.
//!
//! These tests drive the public API the same way the agent does: parse text
//! fetched from a device, edit the model, serialize it, and parse it again.

use chrono::NaiveDate;
use pdu_core::{parse_config, serialize_config, serialize_config_at, DeviceConfig, WriterInfo};

/// A trimmed-down `config.ini` as served by a rack PDU.
const DEVICE_CONFIG: &str = "\
; Schneider Electric
; Network Management Card AOS v6.9.6
; Rack PDU APP v6.9.6
; (c) Copyright 2019 Schneider Electric. All rights reserved.

[NetworkTCP/IP]
SystemIP=10.0.0.5
SubnetMask=255.255.255.0
DefaultGateway=10.0.0.1
BootMode=manual

[NetworkFTPServer]
Access=enabled
Port=21

[SystemID]
Name=rack-12-pdu-a
Contact=old
Location=DC1 Row 4
Message=Authorized access only; contact=noc

[SystemDate/Time]
Mode=NTP
";

fn roundtrip(cfg: &DeviceConfig) -> DeviceConfig {
    let text = serialize_config(cfg, &WriterInfo::new("pdu-agent", "0.1.0"));
    parse_config(&text).expect("serialized config must parse")
}

#[test]
fn test_device_config_parses_all_sections_in_order() {
    let cfg = parse_config(DEVICE_CONFIG).expect("device config must parse");

    let names: Vec<&str> = cfg.sections().map(|(n, _)| n).collect();
    assert_eq!(
        names,
        vec!["NetworkTCP/IP", "NetworkFTPServer", "SystemID", "SystemDate/Time"]
    );
    assert_eq!(cfg.get("NetworkTCP/IP", "BootMode"), Some("manual"));
    assert_eq!(cfg.get("SystemID", "Location"), Some("DC1 Row 4"));
}

#[test]
fn test_value_with_equals_sign_survives_round_trip() {
    let cfg = parse_config(DEVICE_CONFIG).unwrap();
    assert_eq!(
        cfg.get("SystemID", "Message"),
        Some("Authorized access only; contact=noc")
    );

    let restored = roundtrip(&cfg);

    assert_eq!(
        restored.get("SystemID", "Message"),
        Some("Authorized access only; contact=noc")
    );
}

#[test]
fn test_unmodified_config_round_trips_with_stable_order() {
    // Arrange
    let cfg = parse_config(DEVICE_CONFIG).unwrap();

    // Act
    let first = serialize_config(&cfg, &WriterInfo::default());
    let second = serialize_config(&parse_config(&first).unwrap(), &WriterInfo::default());

    // Assert: everything after the regenerated header is byte-identical.
    let body = |s: &str| s.lines().skip(2).map(str::to_owned).collect::<Vec<_>>();
    assert_eq!(body(&first), body(&second));
    assert_eq!(cfg, parse_config(&second).unwrap());
}

#[test]
fn test_edited_config_round_trips() {
    // Arrange
    let mut cfg = parse_config(DEVICE_CONFIG).unwrap();

    // Act
    cfg.set("SystemID", "Contact", "new");
    cfg.set("SystemID", "Owner", "facilities");
    cfg.set("NetworkSNMP", "Access", "disabled");
    let restored = roundtrip(&cfg);

    // Assert
    assert_eq!(restored, cfg);
    assert_eq!(restored.get("SystemID", "Contact"), Some("new"));
    let keys: Vec<&str> = restored.section("SystemID").unwrap().iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["Name", "Contact", "Location", "Message", "Owner"]);
    assert_eq!(restored.sections().last().map(|(n, _)| n), Some("NetworkSNMP"));
}

#[test]
fn test_programmatic_config_round_trips() {
    let mut cfg = DeviceConfig::new();
    for s in 0..5 {
        for k in 0..10 {
            cfg.set(format!("Section{s}"), format!("Key{k}"), format!("value {s}.{k}"));
        }
    }

    assert_eq!(roundtrip(&cfg), cfg);
}

#[test]
fn test_comments_and_blank_lines_do_not_change_content() {
    // Arrange: interleave noise between every line of the fixture.
    let baseline = parse_config(DEVICE_CONFIG).unwrap();
    let noisy: String = DEVICE_CONFIG
        .lines()
        .flat_map(|line| ["; injected comment", "", line, "   ", ";[NotASection]"])
        .map(|l| format!("{l}\n"))
        .collect();

    // Act
    let parsed = parse_config(&noisy).unwrap();

    // Assert
    assert_eq!(parsed, baseline);
    assert!(!parsed.contains_section("NotASection"));
}

#[test]
fn test_sanity_gate_examples() {
    assert!(parse_config("[A]").is_err());

    let cfg = parse_config("[A]\nk=v").unwrap();
    let mut expected = DeviceConfig::new();
    expected.set("A", "k", "v");
    assert_eq!(cfg, expected);
}

#[test]
fn test_merge_of_non_adjacent_sections() {
    let cfg = parse_config("[A]\nx=1\n[B]\ny=1\n[A]\nx=2\nz=3\n").unwrap();

    assert_eq!(cfg.len(), 2);
    assert_eq!(cfg.get("A", "x"), Some("2"));
    assert_eq!(cfg.get("A", "z"), Some("3"));
}

#[test]
fn test_serialized_output_matches_upload_format() {
    // Arrange
    let cfg = parse_config("[SystemID]\nContact=old\n").unwrap();
    let mut edited = cfg.clone();
    edited.set("SystemID", "Contact", "new");
    let at = NaiveDate::from_ymd_opt(2024, 1, 31)
        .unwrap()
        .and_hms_opt(23, 59, 0)
        .unwrap();

    // Act
    let text = serialize_config_at(&edited, &WriterInfo::new("pdu-agent", "0.1.0"), at);

    // Assert
    assert_eq!(
        text,
        "; Config written at 01-31-2024 23:59:00\n\
         ; pdu-agent version 0.1.0\n\
         [SystemID]\n\
         Contact=new\n"
    );
}
