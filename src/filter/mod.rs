//! Filter compilation, parsing and evaluation
//!
//! This module translates between editable predicate rows and CQL filter
//! text like `pop BETWEEN 10 AND 20 AND name = 'O\'Brien'`, and evaluates
//! parsed filters against feature properties.

mod ast;
pub mod cache;
mod compiler;
mod evaluator;
pub mod parser;
mod rows;


pub use ast::*;
pub use cache::*;
pub use compiler::*;
pub use evaluator::*;
pub use parser::{parse, parse_rows, to_rows};
pub use rows::*;
