//! End-to-End Integration Tests
//!
//! These tests drive the full proxy router in process: an SP's AuthnRequest
//! in, university selection, the university leg, and the re-signed Response
//! out to the SP.

mod common;
mod discovery_flow;
mod health;
mod idp_endpoints;
mod mdq;
mod sp_flow;
