//! Test fixtures for route-tracker.
//!
//! Provides realistic test data: a real Klang Valley commuter corridor and
//! helpers to turn it into stops, geometries, and route instances.

pub mod klang_valley_route;

pub use klang_valley_route::*;
