//! Outbound HTTP for skirmish
//!
//! Every backend call a virtual player makes, and every fan-out call the run
//! coordinator makes, is a form-encoded POST answered with JSON. This crate
//! provides that one operation over a single shared connection pool, with an
//! offline mock mode for tests.

pub mod client;
pub mod config;
pub mod errors;
pub mod form;

pub use client::{HttpClient, HttpManager, HttpResponse};
pub use config::HttpConfig;
pub use errors::HttpError;
pub use form::form_pairs;
