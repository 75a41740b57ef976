// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # gmsec - connection manager and message codec
//!
//! Structured, self-describing messages over a pluggable transport:
//! publish/subscribe, request/reply, standard message services (heartbeat,
//! log, resource, simple service, directive) and compliance checks against
//! a versioned message specification.
//!
//! ## Quick Start
//!
//! ```rust
//! use gmsec::{Config, ConnectionManager, Field, Message, MessageKind, Result};
//!
//! fn main() -> Result<()> {
//!     let mgr = ConnectionManager::loopback(Config::new());
//!     mgr.initialize()?;
//!
//!     let _sub = mgr.subscribe("GMSEC.MISSION.>")?;
//!
//!     let mut msg = Message::new("GMSEC.MISSION.SAT1.TLM", MessageKind::Publish);
//!     msg.add_field(Field::new("TEMPERATURE", 21.5f32))?;
//!     mgr.publish(&msg)?;
//!
//!     if let Some(received) = mgr.receive(1000)? {
//!         println!("{}", received.subject());
//!     }
//!     mgr.cleanup()
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        ConnectionManager                            |
//! |  publish/subscribe | request/reply | dispatch | heartbeat/resource |
//! +---------------------------------------------------------------------+
//! |  MessagePopulator (standard fields)  |  Specification (validation) |
//! +---------------------------------------------------------------------+
//! |                     Connection (transport trait)                    |
//! |            LoopbackBus (in-process) | custom factories              |
//! +---------------------------------------------------------------------+
//! |            Message / Field  <->  binary codec (big-endian)          |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionManager`] | Entry point: transport lifecycle, messaging, services |
//! | [`Message`] | Subject, kind and an ordered set of named fields |
//! | [`Field`] | Named, typed value |
//! | [`Encoder`] / [`Decoder`] | Binary wire format |
//! | [`Specification`] | Message compliance contract |
//! | [`Connection`] | Transport contract |

/// Binary encoding of messages.
pub mod codec;
/// Configuration options and crate-wide constants.
pub mod config;
/// Transport contract and the in-process loopback transport.
pub mod connection;
/// Error type.
pub mod error;
/// Typed field values.
pub mod field;
/// Connection manager, callbacks and standard message services.
pub mod manager;
/// Messages.
pub mod message;
/// Message specification and validation.
pub mod specification;
/// Subject syntax and pattern matching.
pub mod subject;

pub use codec::{CodecError, Decoder, Encoder, FieldSelector};
pub use config::Config;
pub use connection::{
    Connection, ConnectionEvent, ConnectionFactory, ConnectionState, LoopbackBus,
    LoopbackConnection, SubscriptionHandle,
};
pub use error::{Error, ErrorKind, Result};
pub use field::{Field, FieldType, FieldValue};
pub use manager::{
    ConnectionManager, ConnectionManagerBuilder, DiskSample, EventCallback, MessageCallback,
    NetPortSample, ReplyCallback, ResourceSample, ResourceSampler, ResponseStatus, ServiceParam,
    SimpleService, SubscriptionInfo, SystemSampler,
};
pub use message::{Message, MessageKind};
pub use specification::{
    FieldRuleSpecification, MessageValidator, SchemaLevel, Specification, ValidationReport,
    GMSEC_ISD_2014_00, GMSEC_ISD_2016_00, GMSEC_ISD_2018_00, GMSEC_ISD_2019_00, GMSEC_ISD_CURRENT,
};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
