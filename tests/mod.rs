//! Test suite for VitalSync
//!
//! This module organizes all tests

pub mod common;
pub mod integration;
