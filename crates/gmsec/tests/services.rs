// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Standard message service integration tests
//!
//! Heartbeat, log, resource, simple-service and directive messages observed
//! from a second manager on the same loopback bus.

use gmsec::{
    Config, ConnectionManager, Error, Field, LoopbackBus, Message, MessageKind, ResourceSample,
    ResourceSampler, ResponseStatus, Result, ServiceParam, SimpleService, ValidationReport,
    GMSEC_ISD_2014_00,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct FixedSampler;

impl ResourceSampler for FixedSampler {
    fn sample(&self) -> Result<ResourceSample> {
        Ok(ResourceSample {
            cpu_total_util: 12.5,
            cpu_util: vec![10.0, 15.0],
            mem_physical_total: 8 << 30,
            mem_physical_avail: 6 << 30,
            ..ResourceSample::default()
        })
    }

    fn os_version(&self) -> String {
        "TestOS 1.0".into()
    }
}

fn identity() -> Vec<Field> {
    vec![
        Field::new("MISSION-ID", "MSN"),
        Field::new("FACILITY", "FAC"),
        Field::new("COMPONENT", "CMP"),
    ]
}

fn service_manager(bus: &LoopbackBus, validate: bool) -> ConnectionManager {
    let mgr = ConnectionManager::builder(Config::new())
        .validate(validate)
        .loopback(bus)
        .sampler(Arc::new(FixedSampler))
        .build();
    mgr.initialize().expect("initialize");
    mgr.set_standard_fields(&identity());
    mgr
}

fn listener(bus: &LoopbackBus, pattern: &str) -> ConnectionManager {
    let mgr = ConnectionManager::builder(Config::new()).loopback(bus).build();
    mgr.initialize().expect("initialize");
    mgr.subscribe(pattern).expect("subscribe");
    mgr
}

fn next(mgr: &ConnectionManager, timeout_ms: i32) -> Message {
    mgr.receive(timeout_ms)
        .expect("receive")
        .expect("message within timeout")
}

#[test]
fn test_heartbeat_counter_advances() {
    let bus = LoopbackBus::new();
    let mgr = service_manager(&bus, true);
    let observer = listener(&bus, "GMSEC.MSN.HB");

    mgr.start_heartbeat_service_at("GMSEC.MSN.HB", &[], 1).unwrap();
    assert!(mgr.heartbeat_service_running());

    let first = next(&observer, 3000);
    assert_eq!(first.schema_id().as_deref(), Some("MSG.C2CX.HB"));
    assert_eq!(first.get_u64_value("COUNTER").unwrap(), 1);
    assert_eq!(first.get_u64_value("PUB-RATE").unwrap(), 1);
    assert_eq!(first.get_string_value("MISSION-ID").unwrap(), "MSN");

    let second = next(&observer, 3000);
    assert_eq!(second.get_u64_value("COUNTER").unwrap(), 2);

    assert!(matches!(
        mgr.start_heartbeat_service("GMSEC.MSN.HB", &[]),
        Err(Error::HeartbeatServiceIsRunning)
    ));

    mgr.stop_heartbeat_service().unwrap();
    assert!(!mgr.heartbeat_service_running());
    assert!(matches!(
        mgr.stop_heartbeat_service(),
        Err(Error::HeartbeatServiceNotRunning(_))
    ));
}

#[test]
fn test_heartbeat_validation_failure_leaves_service_stopped() {
    let bus = LoopbackBus::new();
    let mgr = ConnectionManager::builder(Config::new())
        .validate(true)
        .loopback(&bus)
        .build();
    mgr.initialize().unwrap();

    let err = mgr.start_heartbeat_service("GMSEC.TEST.HB", &[]).unwrap_err();
    let report = err.validation_report().expect("validation error");
    assert!(report.mentions("COMPONENT"));
    assert!(!mgr.heartbeat_service_running());

    // Supplying the identity fields directly is enough.
    mgr.start_heartbeat_service_at("GMSEC.TEST.HB", &identity(), 30)
        .unwrap();
    mgr.stop_heartbeat_service().unwrap();
}

#[test]
fn test_resource_validation_failure_leaves_service_stopped() {
    let bus = LoopbackBus::new();
    let mgr = service_manager(&bus, true);
    mgr.specification()
        .register_message_validator(Arc::new(|m: &Message, r: &mut ValidationReport| {
            if m.schema_id().as_deref() == Some("MSG.C2CX.RSRC") {
                r.issue("resource messages are not accepted here");
            }
        }));
    let observer = listener(&bus, "GMSEC.TEST.RSRC");

    let err = mgr
        .start_resource_message_service("GMSEC.TEST.RSRC", 1, 1, 1)
        .unwrap_err();
    assert!(err.validation_report().is_some());
    assert!(!mgr.resource_service_running());
    assert!(!mgr.stop_resource_message_service());
    assert!(observer.receive(500).unwrap().is_none());
}

#[test]
fn test_heartbeat_live_field_update() {
    let bus = LoopbackBus::new();
    let mgr = service_manager(&bus, false);
    let observer = listener(&bus, "GMSEC.MSN.HB");

    mgr.start_heartbeat_service_at("GMSEC.MSN.HB", &[], 1).unwrap();
    assert!(!next(&observer, 3000).has_field("COMPONENT-STATUS"));

    assert!(!mgr.change_component_status(2).unwrap());
    assert!(mgr.change_component_status(3).unwrap());

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let hb = next(&observer, 3000);
        if hb.has_field("COMPONENT-STATUS") {
            assert_eq!(hb.get_i64_value("COMPONENT-STATUS").unwrap(), 3);
            break;
        }
        assert!(Instant::now() < deadline, "status never published");
    }
    mgr.stop_heartbeat_service().unwrap();
}

#[test]
fn test_legacy_heartbeat_types() {
    let mgr = ConnectionManager::builder(Config::new())
        .specification_version(GMSEC_ISD_2014_00)
        .build();
    let hb = mgr.create_heartbeat_message("GMSEC.MSN.HB", &[]).unwrap();
    assert_eq!(hb.get_field("COUNTER").unwrap().field_type(), gmsec::FieldType::I16);
    assert_eq!(hb.get_field("PUB-RATE").unwrap().field_type(), gmsec::FieldType::I16);
    assert!(hb.has_field("MSG-ID"));

    let current = ConnectionManager::builder(Config::new()).build();
    let hb = current.create_heartbeat_message("GMSEC.MSN.HB", &[]).unwrap();
    assert_eq!(hb.get_field("COUNTER").unwrap().field_type(), gmsec::FieldType::U16);
    assert_eq!(hb.get_u64_value("PUB-RATE").unwrap(), 30);
    assert!(!hb.has_field("MSG-ID"));
}

#[test]
fn test_heartbeat_requires_initialize() {
    let mgr = ConnectionManager::loopback(Config::new());
    assert!(matches!(
        mgr.start_heartbeat_service("GMSEC.MSN.HB", &[]),
        Err(Error::NotInitialized)
    ));
}

#[test]
fn test_publish_log() {
    let bus = LoopbackBus::new();
    let mgr = service_manager(&bus, true);
    let observer = listener(&bus, "GMSEC.MSN.LOG");

    mgr.set_logging_defaults("GMSEC.MSN.LOG", &[Field::new("SUBCLASS", "TEST")])
        .unwrap();
    mgr.publish_log("disk nearly full", 3).unwrap();

    let log = next(&observer, 1000);
    assert_eq!(log.schema_id().as_deref(), Some("MSG.LOG"));
    assert_eq!(log.get_string_value("MSG-TEXT").unwrap(), "disk nearly full");
    assert_eq!(log.get_i64_value("SEVERITY").unwrap(), 3);
    assert_eq!(log.get_string_value("SUBCLASS").unwrap(), "TEST");
    assert!(log.has_field("EVENT-TIME"));
}

#[test]
fn test_log_keeps_caller_event_time() {
    let mgr = ConnectionManager::loopback(Config::new());
    let msg = mgr
        .create_log_message("GMSEC.MSN.LOG", &[Field::new("EVENT-TIME", "2020-001-00:00:00.000")])
        .unwrap();
    assert_eq!(
        msg.get_string_value("EVENT-TIME").unwrap(),
        "2020-001-00:00:00.000"
    );
}

#[test]
fn test_resource_service() {
    let bus = LoopbackBus::new();
    let mgr = service_manager(&bus, true);
    let observer = listener(&bus, "GMSEC.MSN.RSRC");

    assert!(matches!(
        mgr.start_resource_message_service("GMSEC.MSN.RSRC", 0, 1, 10),
        Err(Error::ResourceSampling(_))
    ));

    mgr.start_resource_message_service("GMSEC.MSN.RSRC", 1, 1, 10)
        .unwrap();
    assert!(mgr.resource_service_running());
    assert!(matches!(
        mgr.start_resource_message_service("GMSEC.MSN.RSRC", 1, 1, 10),
        Err(Error::ResourceServiceIsRunning)
    ));

    let rsrc = next(&observer, 3000);
    assert_eq!(rsrc.schema_id().as_deref(), Some("MSG.C2CX.RSRC"));
    assert_eq!(rsrc.get_string_value("OPER-SYS").unwrap(), "TestOS 1.0");
    assert_eq!(rsrc.get_i64_value("NUM-OF-CPUS").unwrap(), 2);
    assert!((rsrc.get_f64_value("CPU.TOTAL.UTIL").unwrap() - 12.5).abs() < 1e-6);

    assert!(mgr.stop_resource_message_service());
    assert!(!mgr.resource_service_running());
    assert!(!mgr.stop_resource_message_service());
}

#[test]
fn test_simple_service_fire_and_forget() {
    let bus = LoopbackBus::new();
    let mgr = service_manager(&bus, true);
    let observer = listener(&bus, "GMSEC.MSN.REQ.SERV.>");

    let svc = SimpleService::new("GMSEC.MSN.REQ.SERV.PWR", "POWER-ON", Field::new("OP", 7i16))
        .with_param(ServiceParam::new("UNIT", Field::new("V", "A")))
        .with_param(ServiceParam::new("LEVEL", Field::new("V", 80u16)));
    mgr.request_simple_service(&svc).unwrap();

    let msg = next(&observer, 1000);
    assert_eq!(msg.kind(), MessageKind::Publish);
    assert_eq!(msg.schema_id().as_deref(), Some("REQ.SERV"));
    assert!(!msg.get_bool_value("RESPONSE").unwrap());
    assert_eq!(msg.get_i64_value("OPERATION-NUMBER").unwrap(), 7);
    assert_eq!(msg.get_string_value("OPERATION-NAME").unwrap(), "POWER-ON");
    assert_eq!(msg.get_i64_value("NUM-OF-PARAMS").unwrap(), 2);
    assert_eq!(msg.get_string_value("PARAM.1.NAME").unwrap(), "UNIT");
    assert_eq!(msg.get_string_value("PARAM.1.VALUE").unwrap(), "A");
    assert_eq!(msg.get_u64_value("PARAM.2.VALUE").unwrap(), 80);
}

#[test]
fn test_simple_service_out_of_range_operation() {
    let mgr = service_manager(&LoopbackBus::new(), false);
    let svc = SimpleService::new("GMSEC.MSN.REQ.SERV.X", "", Field::new("OP", 70_000i32));
    assert!(matches!(
        mgr.request_simple_service(&svc),
        Err(Error::ValueOutOfRange(_))
    ));
}

#[test]
fn test_directive_round_trip() {
    let bus = LoopbackBus::new();
    let commander = service_manager(&bus, true);
    let target = service_manager(&bus, true);
    target.subscribe("GMSEC.MSN.REQ.DIR.>").unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            let request = next(&target, 5000);
            assert_eq!(request.kind(), MessageKind::Request);
            assert_eq!(request.get_string_value("DIRECTIVE-STRING").unwrap(), "RESET");
            assert!(request.get_bool_value("RESPONSE").unwrap());
            target
                .acknowledge_directive_request(
                    "GMSEC.MSN.RESP.DIR.RESET",
                    &request,
                    ResponseStatus::SuccessfulCompletion,
                    &[],
                )
                .unwrap();
        });

        let reply = commander
            .request_directive_reply(
                "GMSEC.MSN.REQ.DIR.RESET",
                &Field::new("DIRECTIVE-STRING", "RESET"),
                &[],
                5000,
                -1,
            )
            .unwrap()
            .expect("acknowledgement");
        assert_eq!(reply.schema_id().as_deref(), Some("RESP.DIR"));
        assert_eq!(
            reply.get_i64_value("RESPONSE-STATUS").unwrap(),
            i64::from(ResponseStatus::SuccessfulCompletion.as_i16())
        );
    });
}

#[test]
fn test_simple_service_reply() {
    let bus = LoopbackBus::new();
    let client = service_manager(&bus, false);
    let server = service_manager(&bus, false);
    server.subscribe("GMSEC.MSN.REQ.SERV.>").unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            let request = next(&server, 5000);
            server
                .acknowledge_simple_service(
                    "GMSEC.MSN.RESP.SERV.PING",
                    &request,
                    ResponseStatus::AcknowledgmentSuccessful,
                    &[Field::new("DETAIL", "ok")],
                )
                .unwrap();
        });

        let svc = SimpleService::new("GMSEC.MSN.REQ.SERV.PING", "PING", Field::new("OP", 1i16));
        let reply = client
            .request_simple_service_reply(&svc, 5000, -1)
            .unwrap()
            .expect("acknowledgement");
        assert_eq!(reply.schema_id().as_deref(), Some("RESP.SERV"));
        assert_eq!(reply.get_string_value("DETAIL").unwrap(), "ok");
    });
}
