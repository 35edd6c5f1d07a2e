//! Integration tests for the lift-call client
//!
//! This test suite validates:
//! - Call dispatch over a real WebSocket to a local fake gateway
//! - The call-then-cancel sequence driven by gateway session ids
//! - Local refusal of invalid calls (nothing reaches the gateway)
//! - OAuth2 client-credentials exchange against a local token endpoint

pub mod test_utils;

#[cfg(test)]
mod gateway_tests;
