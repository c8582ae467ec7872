//! Integration tests
//!
//! Components wired together against wiremock and an in-process socket server

mod api_test;
mod offline_test;
mod realtime_test;
