//! Foundation module - core utilities and types

pub mod math;
