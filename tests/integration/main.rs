//! Integration test modules.

mod common;
mod engine_flow_test;
mod geocoding_http_test;
mod ranking_properties_test;
