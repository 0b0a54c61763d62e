//! CLI command implementations

pub mod corpus;
pub mod mosaic;
pub mod render;
pub mod summarize;

mod reporting;
