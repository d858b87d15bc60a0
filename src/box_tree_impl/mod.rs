//! Lambda expressions represented as a tree where each nested node is held
//! via a `Box` smart pointer.

pub mod box_tree_ast;
pub mod box_tree_execution;
pub mod box_tree_parsing;
pub mod box_tree_substitution;
