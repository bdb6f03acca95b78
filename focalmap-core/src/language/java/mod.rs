//! Java language support

pub mod parser;

pub use parser::JavaParser;
