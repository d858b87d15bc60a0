//! This crate contains a normal-order lambda calculus engine with a library
//! of named combinators.

pub mod box_tree_impl;
pub mod end_to_end;
pub mod lexical_analysis;
pub mod library;
pub mod test_harness;

pub use box_tree_impl::box_tree_ast::{ConstructionError, Expression, Term};
pub use box_tree_impl::box_tree_execution::{Normalization, Reductions};
pub use box_tree_impl::box_tree_parsing::{parse, ParseError, ParseErrorKind};
pub use box_tree_impl::box_tree_substitution::{pick_unused, DomainError};
pub use library::{Library, LibraryEntry, LibraryError, DEFAULT_LIBRARY};
pub use test_harness::{run_tests, TestCase, TestOutcome, TestReport};
