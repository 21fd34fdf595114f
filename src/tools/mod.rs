//! labconv Tools module
//!
//! MCP tool implementations for the Lab Value Converter.

pub mod batch;
pub mod convert;
pub mod labs;
pub mod status;
