// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Standard field composition
//!
//! Caller fields beat tier fields, tier fields beat global standard fields,
//! and the generated type fields beat everything.

use gmsec::{Config, ConnectionManager, Field, LoopbackBus, Message, MessageKind};

fn values_of<'a>(msg: &'a Message, name: &'a str) -> Vec<&'a Field> {
    msg.fields().filter(|f| f.name() == name).collect()
}

#[test]
fn test_caller_field_beats_global() {
    let mgr = ConnectionManager::loopback(Config::new());
    mgr.set_standard_fields(&[Field::new("A", 1i16)]);

    let hb = mgr
        .create_heartbeat_message("GMSEC.TEST.HB", &[Field::new("A", 2i16)])
        .unwrap();
    let a = values_of(&hb, "A");
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].as_i64().unwrap(), 2);
}

#[test]
fn test_global_field_fills_gap() {
    let mgr = ConnectionManager::loopback(Config::new());
    mgr.set_standard_fields(&[Field::new("MISSION-ID", "M1"), Field::new("A", 1i16)]);

    let hb = mgr.create_heartbeat_message("GMSEC.TEST.HB", &[]).unwrap();
    assert_eq!(hb.get_string_value("MISSION-ID").unwrap(), "M1");
    assert_eq!(hb.get_i64_value("A").unwrap(), 1);
}

#[test]
fn test_tier_field_beats_global() {
    let mgr = ConnectionManager::loopback(Config::new());
    mgr.set_standard_fields(&[Field::new("SUBCLASS", "GLOBAL")]);
    mgr.set_logging_defaults("GMSEC.TEST.LOG", &[Field::new("SUBCLASS", "TIER")])
        .unwrap();

    let log = mgr.create_log_message("GMSEC.TEST.LOG", &[]).unwrap();
    assert_eq!(log.get_string_value("SUBCLASS").unwrap(), "TIER");

    let log = mgr
        .create_log_message("GMSEC.TEST.LOG", &[Field::new("SUBCLASS", "CALLER")])
        .unwrap();
    assert_eq!(log.get_string_value("SUBCLASS").unwrap(), "CALLER");
}

#[test]
fn test_generated_fields_win() {
    let mgr = ConnectionManager::loopback(Config::new());
    mgr.set_standard_fields(&[Field::new("MESSAGE-TYPE", "REQ")]);

    let hb = mgr
        .create_heartbeat_message(
            "GMSEC.TEST.HB",
            &[Field::new("MESSAGE-SUBTYPE", "LOG"), Field::new("COUNTER", 99u16)],
        )
        .unwrap();
    assert_eq!(hb.get_string_value("MESSAGE-TYPE").unwrap(), "MSG");
    assert_eq!(hb.get_string_value("MESSAGE-SUBTYPE").unwrap(), "C2CX");
    assert_eq!(hb.get_u64_value("COUNTER").unwrap(), 1);
}

#[test]
fn test_header_versions_follow_specification() {
    for (version, header) in [
        (gmsec::GMSEC_ISD_2014_00, 2010.0),
        (gmsec::GMSEC_ISD_2016_00, 2010.0),
        (gmsec::GMSEC_ISD_2018_00, 2018.0),
        (gmsec::GMSEC_ISD_2019_00, 2019.0),
    ] {
        let mgr = ConnectionManager::builder(Config::new())
            .specification_version(version)
            .build();
        let hb = mgr.create_heartbeat_message("GMSEC.TEST.HB", &[]).unwrap();
        assert_eq!(hb.get_f64_value("HEADER-VERSION").unwrap(), header, "{}", version);
    }
}

#[test]
fn test_add_standard_fields_replaces() {
    let mgr = ConnectionManager::loopback(Config::new());
    mgr.set_standard_fields(&[
        Field::new("MISSION-ID", "M1"),
        Field::unset("SKIPPED"),
    ]);
    assert_eq!(mgr.standard_fields().len(), 1);

    let mut msg = Message::new("GMSEC.TEST", MessageKind::Publish);
    msg.add("MISSION-ID", "OLD").unwrap();
    mgr.add_standard_fields(&mut msg).unwrap();
    assert_eq!(msg.get_string_value("MISSION-ID").unwrap(), "M1");
    assert!(!msg.has_field("SKIPPED"));
}

#[test]
fn test_standard_fields_reach_subscribers() {
    let bus = LoopbackBus::new();
    let sender = ConnectionManager::builder(Config::new()).loopback(&bus).build();
    let receiver = ConnectionManager::builder(Config::new()).loopback(&bus).build();
    sender.initialize().unwrap();
    receiver.initialize().unwrap();
    let _sub = receiver.subscribe("GMSEC.TEST.>").unwrap();

    sender.set_standard_fields(&[Field::new("FACILITY", "GSFC")]);
    let mut msg = Message::new("GMSEC.TEST.DATA", MessageKind::Publish);
    sender.add_standard_fields(&mut msg).unwrap();
    sender.publish(&msg).unwrap();

    let got = receiver.receive(1000).unwrap().expect("delivered");
    assert_eq!(got.get_string_value("FACILITY").unwrap(), "GSFC");
}
