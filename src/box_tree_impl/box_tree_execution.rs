//! Normal-order reduction of box-tree expressions.

use tracing::debug;

use crate::box_tree_impl::box_tree_ast::{Expression, Term};

/// Result of reducing an expression for at most a given number of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalization {
    pub expression: Expression,
    pub steps: usize,
    pub reached_normal_form: bool,
}

/// Iterator over successive normal-order reduction steps. Yields each new
/// expression and stops once a normal form has been produced. Expressions
/// without a normal form never stop, so callers bound it with `take`.
#[derive(Debug, Clone)]
pub struct Reductions {
    current: Option<Expression>,
}

impl Iterator for Reductions {
    type Item = Expression;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        let next = current.reduce_step()?.simplify();
        self.current = Some(next.clone());
        Some(next)
    }
}

impl Expression {
    /// True if the first term is an abstraction with an argument after it.
    fn is_directly_reducible(&self) -> bool {
        match self.terms.as_slice() {
            [Term::Nested { expr }, _, ..] => expr.is_abstraction(),
            _ => false,
        }
    }

    fn contains_redex(&self) -> bool {
        self.is_directly_reducible()
            || self
                .terms
                .iter()
                .filter_map(Term::as_expression)
                .any(Expression::contains_redex)
    }

    /// Performs the outermost, leftmost reduction available. Returns `None`
    /// when there is none. Expects a simplified expression.
    fn reduce_step(&self) -> Option<Expression> {
        // Direct: an abstraction applied to the term that follows it.
        if let [Term::Nested { expr: function }, argument, rest @ ..] = self.terms.as_slice() {
            if let Ok(applied) = function.apply(argument) {
                let mut terms = Vec::with_capacity(rest.len() + 1);
                terms.push(Term::from(applied));
                terms.extend(rest.iter().cloned());

                return Some(Expression {
                    variables: self.variables.clone(),
                    terms,
                });
            }
        }

        // Indirect: only the first reducible term is touched.
        for (index, term) in self.terms.iter().enumerate() {
            if let Term::Nested { expr } = term {
                if let Some(reduced) = expr.reduce_step() {
                    let mut terms = self.terms.clone();
                    terms[index] = Term::from(reduced);

                    return Some(Expression {
                        variables: self.variables.clone(),
                        terms,
                    });
                }
            }
        }

        None
    }

    /// Performs exactly one normal-order reduction step. An expression that
    /// is already in normal form comes back unchanged apart from
    /// simplification.
    pub fn reduce(&self) -> Expression {
        let simplified = self.simplify();

        match simplified.reduce_step() {
            Some(reduced) => reduced.simplify(),
            None => simplified,
        }
    }

    /// True iff no redex exists anywhere in the expression.
    pub fn is_normal(&self) -> bool {
        !self.simplify().contains_redex()
    }

    /// Successive reduction steps starting from this expression.
    pub fn reductions(&self) -> Reductions {
        Reductions {
            current: Some(self.simplify()),
        }
    }

    /// Reduces until a normal form is reached or `max_steps` steps have been
    /// taken, whichever comes first.
    pub fn normalize(&self, max_steps: usize) -> Normalization {
        self.normalize_with(max_steps, |_, _| {})
    }

    /// Like `normalize`, but hands every expression to `on_step` as it is
    /// produced, starting with the simplified input as step 0.
    pub fn normalize_with<F>(&self, max_steps: usize, mut on_step: F) -> Normalization
    where
        F: FnMut(usize, &Expression),
    {
        let mut expression = self.simplify();
        let mut steps = 0;
        on_step(steps, &expression);

        while steps < max_steps {
            let Some(reduced) = expression.reduce_step() else {
                break;
            };
            expression = reduced.simplify();
            steps += 1;
            debug!("step {}: {}", steps, expression);
            on_step(steps, &expression);
        }

        let reached_normal_form = !expression.contains_redex();
        Normalization {
            expression,
            steps,
            reached_normal_form,
        }
    }
}
