//! ARIA REST: TOSCA parser packaged as a supervised HTTP microservice
//!
//! Wraps the ARIA TOSCA parser pipeline in a small REST API and a
//! pidfile-based daemon supervisor, featuring:
//! - Three parse depths (validate, model, instance) over one consumer chain
//! - Documents by URI, by direct upload or by a full options payload
//! - start/stop/restart/status process management with an atomic pidfile lock
//! - Optional registration with the Open-O Microservice Bus
//! - TOSCA Simple Profile and Cloudify DSL presenters

pub mod commands;
pub mod config;
pub mod daemon;
pub mod http;
pub mod msb;
pub mod pipeline;

pub use commands::DaemonAction;
pub use config::Config;
