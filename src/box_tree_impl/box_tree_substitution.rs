//! Capture-avoiding substitution and deterministic fresh-name generation.

use std::collections::HashSet;

use thiserror::Error;

use crate::box_tree_impl::box_tree_ast::{Expression, Term};

/// Errors raised by operations that need a particular expression shape.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DomainError {
    #[error("Cannot apply an argument to an expression with no bound variables: {expression}")]
    NoBoundVariables { expression: String },
}

// The n-th candidate in the sequence a, b, ..., z, aa, ab, ..., az, ba, ...
fn candidate_name(mut index: usize) -> String {
    let mut letters = Vec::new();

    loop {
        letters.push(char::from(b'a' + (index % 26) as u8));
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }

    letters.iter().rev().collect()
}

/// Returns the first short lowercase name not contained in `exclude`. This is
/// a pure function of `exclude`, so identical reductions always pick
/// identical names.
pub fn pick_unused(exclude: &HashSet<&str>) -> String {
    let mut index = 0;

    loop {
        let candidate = candidate_name(index);
        if !exclude.contains(candidate.as_str()) {
            return candidate;
        }
        index += 1;
    }
}

impl Term {
    // Renames free occurrences of `old_name`. The caller guarantees that
    // `new_name` occurs nowhere in the term.
    fn replace_free(&self, old_name: &str, new_name: &str) -> Term {
        match self {
            Term::Var { var_name } if var_name == old_name => Term::var(new_name),
            Term::Var { .. } => self.clone(),
            Term::Nested { expr } if expr.binds(old_name) => self.clone(),
            Term::Nested { expr } => Term::Nested {
                expr: Box::new(Expression {
                    variables: expr.variables.clone(),
                    terms: expr
                        .terms
                        .iter()
                        .map(|term| term.replace_free(old_name, new_name))
                        .collect(),
                }),
            },
        }
    }

    fn substitute(&self, variable: &str, replacement: &Term, replacement_free: &HashSet<&str>) -> Term {
        match self {
            Term::Var { var_name } if var_name == variable => replacement.clone(),
            Term::Var { .. } => self.clone(),
            Term::Nested { expr } => Term::from(expr.substitute_helper(
                variable,
                replacement,
                replacement_free,
            )),
        }
    }
}

impl Expression {
    /// Alpha-renames the bound variable `bound_name` of this node to a fresh
    /// name that is absent from `exclude` and from every name used anywhere
    /// in this node.
    pub fn rename(&self, bound_name: &str, exclude: &HashSet<&str>) -> Expression {
        let mut avoid: HashSet<&str> = exclude.iter().copied().collect();
        avoid.extend(self.get_all_variables());
        let fresh = pick_unused(&avoid);

        let variables = self
            .variables
            .iter()
            .map(|variable| {
                if variable == bound_name {
                    fresh.clone()
                } else {
                    variable.clone()
                }
            })
            .collect();

        let terms = self
            .terms
            .iter()
            .map(|term| term.replace_free(bound_name, &fresh))
            .collect();

        Expression { variables, terms }
    }

    /// Replaces every free occurrence of `variable` with `replacement`.
    /// Binders that would capture a free variable of `replacement` are
    /// renamed first.
    pub fn substitute(&self, variable: &str, replacement: &Term) -> Expression {
        let replacement_free = replacement.get_free_variables();
        self.substitute_helper(variable, replacement, &replacement_free)
    }

    fn substitute_helper(
        &self,
        variable: &str,
        replacement: &Term,
        replacement_free: &HashSet<&str>,
    ) -> Expression {
        // Shadowed, or nothing to replace.
        if self.binds(variable) || !self.get_free_variables().contains(variable) {
            return self.clone();
        }

        let mut exclude: HashSet<&str> = replacement_free.iter().copied().collect();
        exclude.insert(variable);

        let mut renamed = self.clone();
        for bound_name in self
            .variables
            .iter()
            .filter(|bound_name| replacement_free.contains(bound_name.as_str()))
        {
            renamed = renamed.rename(bound_name, &exclude);
        }

        let terms = renamed
            .terms
            .iter()
            .map(|term| term.substitute(variable, replacement, replacement_free))
            .collect();

        Expression {
            variables: renamed.variables,
            terms,
        }
    }

    /// Substitutes `argument` for the first bound variable, leaving the
    /// remaining binders in place.
    pub fn apply(&self, argument: &Term) -> Result<Expression, DomainError> {
        let Some((first, rest)) = self.variables.split_first() else {
            return Err(DomainError::NoBoundVariables {
                expression: self.to_string(),
            });
        };

        let remainder = Expression {
            variables: rest.to_vec(),
            terms: self.terms.clone(),
        };

        Ok(remainder.substitute(first, argument))
    }
}
