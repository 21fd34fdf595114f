//! Lab Value Converter (labconv) Library
//!
//! Converts lab test results between units, one value at a time or over CSV tables.

pub mod build_info;
pub mod config;
pub mod conversion;
pub mod mcp;
pub mod tools;
