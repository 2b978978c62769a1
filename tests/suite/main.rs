//! Conformance suite for the contraction engine.

mod common;

mod contract_tests;
mod threading_tests;
