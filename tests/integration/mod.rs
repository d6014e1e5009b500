//! Integration tests for prepaint
//!
//! These tests verify that capture, storage, restore and attach work
//! together correctly.

#[path = "../common/mod.rs"]
pub mod common;

pub mod capture_flow;
pub mod pipeline;
pub mod storage;
