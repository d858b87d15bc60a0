//! Data structures to represent lambda calculus expressions, and some utility
//! functions to inspect, normalize and display them.
//!
//! An `Expression` is a node holding zero or more bound variable names and a
//! non-empty, left-associative sequence of terms. With no variables the node
//! is a plain application chain; with variables it is a curried abstraction
//! over that chain. Every operation takes `&self` and builds a new tree.
use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::lexical_analysis::{run_lexical_analysis, TokenClass};

/// One element of an expression's application chain.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Term {
    Var { var_name: String },
    Nested { expr: Box<Expression> },
}

/// Represents a lambda-calculus expression.
///
/// The derived `PartialEq` is structural. Use [`Expression::equals`] for
/// alpha-equivalence.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Expression {
    pub(crate) variables: Vec<String>,
    pub(crate) terms: Vec<Term>,
}

/// Errors raised when building an expression by hand.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConstructionError {
    #[error("an expression needs at least one term")]
    EmptyTerms,

    #[error("bound variable \"{0}\" is repeated")]
    RepeatedVariable(String),

    #[error("\"{0}\" is not a single name token")]
    InvalidName(String),
}

impl Term {
    /// An atomic variable-name term.
    pub fn var(var_name: impl Into<String>) -> Self {
        Term::Var {
            var_name: var_name.into(),
        }
    }

    /// Free variables of this term.
    pub fn get_free_variables(&self) -> HashSet<&str> {
        match self {
            Term::Var { var_name } => HashSet::from([var_name.as_str()]),
            Term::Nested { expr } => expr.get_free_variables(),
        }
    }

    /// The nested expression, if this term is not atomic.
    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Term::Var { .. } => None,
            Term::Nested { expr } => Some(expr),
        }
    }
}

impl From<Expression> for Term {
    fn from(value: Expression) -> Self {
        return Term::Nested {
            expr: Box::new(value),
        };
    }
}

// A name is valid when the lexer would read it back as exactly one name.
fn check_name(name: &str) -> Result<(), ConstructionError> {
    let tokens = run_lexical_analysis(name);
    let is_single_name = tokens.len() == 1
        && tokens[0].token_class == TokenClass::Name
        && !tokens[0].is_lambda_marker()
        && tokens[0].token_text == name;

    if is_single_name {
        Ok(())
    } else {
        Err(ConstructionError::InvalidName(String::from(name)))
    }
}

impl Expression {
    /// An expression consisting of a single free variable.
    pub fn from_name(name: &str) -> Result<Self, ConstructionError> {
        check_name(name)?;
        Ok(Expression {
            variables: vec![],
            terms: vec![Term::var(name)],
        })
    }

    /// An application chain over `terms`.
    pub fn from_terms(terms: Vec<Term>) -> Result<Self, ConstructionError> {
        Self::abstraction(vec![], terms)
    }

    /// A curried abstraction binding `variables` over the chain `terms`.
    pub fn abstraction(variables: Vec<String>, terms: Vec<Term>) -> Result<Self, ConstructionError> {
        if terms.is_empty() {
            return Err(ConstructionError::EmptyTerms);
        }

        let mut seen = HashSet::new();
        for variable in &variables {
            check_name(variable)?;
            if !seen.insert(variable.as_str()) {
                return Err(ConstructionError::RepeatedVariable(variable.clone()));
            }
        }

        for term in &terms {
            if let Term::Var { var_name } = term {
                check_name(var_name)?;
            }
        }

        Ok(Expression { variables, terms })
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_abstraction(&self) -> bool {
        !self.variables.is_empty()
    }

    pub(crate) fn binds(&self, name: &str) -> bool {
        self.variables.iter().any(|variable| variable == name)
    }

    /// Computes the names occurring at least once without an enclosing
    /// binder.
    pub fn get_free_variables(&self) -> HashSet<&str> {
        let mut free_vars: HashSet<&str> = HashSet::new();

        for term in &self.terms {
            free_vars.extend(term.get_free_variables());
        }

        free_vars.retain(|name| !self.binds(name));
        return free_vars;
    }

    /// Finds all variable names used in the expression, bound or free.
    pub fn get_all_variables(&self) -> HashSet<&str> {
        let mut all_vars: HashSet<&str> = self.variables.iter().map(String::as_str).collect();

        for term in &self.terms {
            match term {
                Term::Var { var_name } => {
                    all_vars.insert(var_name.as_str());
                }
                Term::Nested { expr } => {
                    all_vars.extend(expr.get_all_variables());
                }
            }
        }

        return all_vars;
    }

    /// Removes redundant structure: variable-free wrappers around a single
    /// term are unwrapped, a leading application chain is spliced into its
    /// parent, and an abstraction whose whole body is another abstraction
    /// absorbs the inner binders when no names collide.
    pub fn simplify(&self) -> Expression {
        let mut terms: Vec<Term> = Vec::with_capacity(self.terms.len());

        for term in &self.terms {
            let simpler = match term {
                Term::Var { .. } => {
                    terms.push(term.clone());
                    continue;
                }
                Term::Nested { expr } => expr.simplify(),
            };

            // Application chains are left-associative, so a leading chain
            // belongs to this node's own term list.
            if simpler.variables.is_empty() && (terms.is_empty() || simpler.terms.len() == 1) {
                terms.extend(simpler.terms);
                continue;
            }

            terms.push(Term::from(simpler));
        }

        if self.variables.is_empty() && terms.len() == 1 {
            if let Term::Nested { expr } = &terms[0] {
                return (**expr).clone();
            }
        }

        if !self.variables.is_empty() && terms.len() == 1 {
            if let Term::Nested { expr } = &terms[0] {
                let collides = expr.variables.iter().any(|inner| self.binds(inner));
                if expr.is_abstraction() && !collides {
                    let mut variables = self.variables.clone();
                    variables.extend(expr.variables.iter().cloned());
                    return Expression {
                        variables,
                        terms: expr.terms.clone(),
                    };
                }
            }
        }

        return Expression {
            variables: self.variables.clone(),
            terms,
        };
    }

    /// Renames every bound variable to a position-determined name (`v1`,
    /// `v2`, ...) after simplifying. Free variables are untouched, and a
    /// canonical name that is already free in the expression is skipped.
    /// Canonical names never collide along a scope chain, so abstractions
    /// kept apart by a name collision are merged afterwards.
    pub fn canonicalize(&self) -> Expression {
        let simplified = self.simplify();
        let free_vars: HashSet<String> = simplified
            .get_free_variables()
            .into_iter()
            .map(String::from)
            .collect();

        simplified
            .canonicalize_helper(0, &HashMap::new(), &free_vars)
            .simplify()
    }

    fn canonicalize_helper(
        &self,
        start_index: usize,
        rename_map: &HashMap<String, String>,
        free_vars: &HashSet<String>,
    ) -> Expression {
        let mut index = start_index;
        let mut rename_map = rename_map.clone();
        let mut variables = Vec::with_capacity(self.variables.len());

        for variable in &self.variables {
            let canonical = loop {
                index += 1;
                let candidate = format!("v{}", index);
                if !free_vars.contains(&candidate) {
                    break candidate;
                }
            };
            rename_map.insert(variable.clone(), canonical.clone());
            variables.push(canonical);
        }

        let terms = self
            .terms
            .iter()
            .map(|term| match term {
                Term::Var { var_name } => match rename_map.get(var_name) {
                    Some(canonical) => Term::var(canonical.as_str()),
                    None => term.clone(),
                },
                Term::Nested { expr } => {
                    Term::from(expr.canonicalize_helper(index, &rename_map, free_vars))
                }
            })
            .collect();

        Expression { variables, terms }
    }

    /// True iff the two expressions are alpha-equivalent.
    pub fn equals(&self, other: &Expression) -> bool {
        self.canonicalize() == other.canonicalize()
    }
}

// Helper function to produce a string representation of an Expression.
fn expression_to_string_helper(expression: &Expression, string_so_far: &mut String) {
    if !expression.variables.is_empty() {
        string_so_far.push('λ');
        string_so_far.push_str(expression.variables.join(" ").as_str());
        string_so_far.push('.');
    }

    let term_count = expression.terms.len();

    for (index, term) in expression.terms.iter().enumerate() {
        if index > 0 {
            string_so_far.push(' ');
        }

        match term {
            Term::Var { var_name } => {
                string_so_far.push_str(var_name.as_str());
            }
            Term::Nested { expr } => {
                // An abstraction in last position extends to the end of
                // the chain anyway, so it can go without parentheses.
                let trailing_abstraction = index + 1 == term_count && expr.is_abstraction();
                let needs_parens = term_count > 1 && !trailing_abstraction;

                if needs_parens {
                    string_so_far.push('(');
                    expression_to_string_helper(expr, string_so_far);
                    string_so_far.push(')');
                } else {
                    expression_to_string_helper(expr, string_so_far);
                }
            }
        }
    }
}

// Converts an expression to a string.
pub fn expression_to_string(expression: &Expression) -> String {
    let mut out_string = String::new();
    expression_to_string_helper(expression, &mut out_string);
    return out_string;
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}", expression_to_string(self).as_str());
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Var { var_name } => write!(f, "{}", var_name),
            Term::Nested { expr } => write!(f, "({})", expr),
        }
    }
}
