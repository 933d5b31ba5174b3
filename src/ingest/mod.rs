//! Ingestion primitives: the delimited record parser

mod parser;

pub use parser::*;
