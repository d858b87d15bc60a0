//! Single-pass parser that builds box-tree expressions from a vector of
//! tokens.
//!
//! The parser keeps an explicit stack of enclosing nodes. Each entry records
//! whether it was opened by a parenthesis, in which case it must be closed by
//! a matching `)`, or by a lambda, in which case it closes together with
//! whatever encloses it.

use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

use crate::box_tree_impl::box_tree_ast::{Expression, Term};
use crate::lexical_analysis::{run_lexical_analysis, Token, TokenClass};

/// The ways a token sequence can fail to form an expression.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    InvalidNesting,
    EmptyParentheses,
    MissingTerminator,
    MismatchedParentheses,
    InvalidAbstractionNesting,
    EmptyAbstraction,
    InvalidTermination,
    InvalidRepetition,
    MissingTerminatingParenthesis,
    EmptyAbstractionBody,
    EmptyExpression,
}

impl Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::InvalidNesting => "Invalid nesting",
            Self::EmptyParentheses => "Empty parentheses",
            Self::MissingTerminator => "Missing terminator",
            Self::MismatchedParentheses => "Mismatched parentheses",
            Self::InvalidAbstractionNesting => "Invalid abstraction nesting",
            Self::EmptyAbstraction => "Empty abstraction",
            Self::InvalidTermination => "Invalid termination",
            Self::InvalidRepetition => "Invalid repetition",
            Self::MissingTerminatingParenthesis => "Missing terminating parenthesis",
            Self::EmptyAbstractionBody => "Empty abstraction body",
            Self::EmptyExpression => "Empty expression",
        };
        return write!(f, "{}", message);
    }
}

/// Represents a parsing error, along with the token texts of the input and
/// the index of the token where parsing stopped.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("{kind} at token {position}: {}", .tokens.join(" "))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub tokens: Vec<String>,
    pub position: usize,
}

impl ParseError {
    fn new(kind: ParseErrorKind, tokens: &[Token], position: usize) -> Self {
        ParseError {
            kind,
            tokens: tokens.iter().map(|token| token.token_text.clone()).collect(),
            position,
        }
    }
}

// A node whose closing token has not been seen yet.
#[derive(Debug, Default)]
struct PendingNode {
    variables: Vec<String>,
    terms: Vec<Term>,
    opened_by_paren: bool,
}

impl PendingNode {
    fn opened(opened_by_paren: bool) -> Self {
        PendingNode {
            opened_by_paren,
            ..Default::default()
        }
    }

    // Why this node cannot be closed yet, if anything.
    fn closing_error(&self) -> Option<ParseErrorKind> {
        if !self.terms.is_empty() {
            None
        } else if !self.variables.is_empty() {
            Some(ParseErrorKind::EmptyAbstractionBody)
        } else if self.opened_by_paren {
            Some(ParseErrorKind::EmptyParentheses)
        } else {
            Some(ParseErrorKind::EmptyExpression)
        }
    }

    fn into_expression(self) -> Expression {
        Expression {
            variables: self.variables,
            terms: self.terms,
        }
    }
}

/// Builds an expression from `tokens` (as produced by `run_lexical_analysis`).
pub fn parse_tokens(tokens: &[Token]) -> Result<Expression, ParseError> {
    let mut stack: Vec<PendingNode> = Vec::new();
    let mut current = PendingNode::opened(false);
    let mut declaring = false;
    let mut depth: usize = 0;

    for (position, token) in tokens.iter().enumerate() {
        let fail = |kind| ParseError::new(kind, tokens, position);

        if token.is_lambda_marker() {
            if declaring {
                return Err(fail(ParseErrorKind::InvalidAbstractionNesting));
            }
            declaring = true;

            // A lambda at the very start of a node takes that node over,
            // otherwise it opens a deeper one.
            if !current.terms.is_empty() || !current.variables.is_empty() {
                stack.push(std::mem::replace(&mut current, PendingNode::opened(false)));
            }
            continue;
        }

        match token.token_class {
            TokenClass::OpenParen => {
                if declaring {
                    return Err(fail(ParseErrorKind::InvalidNesting));
                }
                stack.push(std::mem::replace(&mut current, PendingNode::opened(true)));
                depth += 1;
            }

            TokenClass::CloseParen => {
                if declaring {
                    return Err(fail(ParseErrorKind::MissingTerminator));
                }
                // Emptiness is reported ahead of a missing `(`.
                if current.terms.is_empty() && current.variables.is_empty() {
                    return Err(fail(ParseErrorKind::EmptyParentheses));
                }
                if depth == 0 {
                    return Err(fail(ParseErrorKind::MismatchedParentheses));
                }

                // Close any lambda-opened nodes, then the parenthesis itself.
                loop {
                    if let Some(kind) = current.closing_error() {
                        return Err(fail(kind));
                    }
                    let Some(parent) = stack.pop() else {
                        return Err(fail(ParseErrorKind::MismatchedParentheses));
                    };
                    let closed = std::mem::replace(&mut current, parent);
                    let closes_paren = closed.opened_by_paren;
                    current.terms.push(Term::from(closed.into_expression()));

                    if closes_paren {
                        break;
                    }
                }
                depth -= 1;
            }

            TokenClass::Dot => {
                if !declaring {
                    return Err(fail(ParseErrorKind::InvalidTermination));
                }
                if current.variables.is_empty() {
                    return Err(fail(ParseErrorKind::EmptyAbstraction));
                }
                declaring = false;
            }

            TokenClass::Whitespace => {}

            TokenClass::Name | TokenClass::Lambda => {
                if declaring {
                    if current.variables.contains(&token.token_text) {
                        return Err(fail(ParseErrorKind::InvalidRepetition));
                    }
                    current.variables.push(token.token_text.clone());
                } else {
                    current.terms.push(Term::var(token.token_text.as_str()));
                }
            }
        }
    }

    let end = tokens.len();
    if depth > 0 {
        return Err(ParseError::new(
            ParseErrorKind::MissingTerminatingParenthesis,
            tokens,
            end,
        ));
    }
    if declaring {
        return Err(ParseError::new(ParseErrorKind::MissingTerminator, tokens, end));
    }

    // Whatever is left open was opened by a lambda.
    while let Some(parent) = stack.pop() {
        if let Some(kind) = current.closing_error() {
            return Err(ParseError::new(kind, tokens, end));
        }
        let closed = std::mem::replace(&mut current, parent);
        current.terms.push(Term::from(closed.into_expression()));
    }

    if let Some(kind) = current.closing_error() {
        return Err(ParseError::new(kind, tokens, end));
    }
    Ok(current.into_expression())
}

/// Tokenizes and parses `text`.
pub fn parse(text: &str) -> Result<Expression, ParseError> {
    parse_tokens(&run_lexical_analysis(text))
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn var(name: &str) -> Term {
        Term::var(name)
    }

    fn node(variables: &[&str], terms: Vec<Term>) -> Expression {
        Expression {
            variables: variables.iter().map(|v| String::from(*v)).collect(),
            terms,
        }
    }

    // Test if we can parse a simple abstraction.
    #[test]
    fn test_single_abstraction() {
        let generated_output = parse(r"\x. x").expect("parse returned unexpected parse error");
        assert_eq!(generated_output, node(&["x"], vec![var("x")]));
    }

    // Test if we parse function application as a flat, left-associative
    // term list.
    #[test]
    fn test_function_application_association() {
        let generated_output = parse("var_1 var_2 var_3").expect("parse error");
        assert_eq!(
            generated_output,
            node(&[], vec![var("var_1"), var("var_2"), var("var_3")])
        );
    }

    // Test if function application association respects parentheses.
    #[test]
    fn test_function_application_association_with_parentheses() {
        let generated_output = parse("var_1 (var_2 var_3)").expect("parse error");
        assert_eq!(
            generated_output,
            node(
                &[],
                vec![
                    var("var_1"),
                    Term::from(node(&[], vec![var("var_2"), var("var_3")]))
                ]
            )
        );
    }

    // Test if lambdas bind as much as possible of what follows them.
    #[test]
    fn test_lambda_binding() {
        let generated_output = parse(r"(\a. a \b. b) \c. c").expect("parse error");
        let expected_output = node(
            &[],
            vec![
                Term::from(node(
                    &["a"],
                    vec![var("a"), Term::from(node(&["b"], vec![var("b")]))],
                )),
                Term::from(node(&["c"], vec![var("c")])),
            ],
        );
        assert_eq!(generated_output, expected_output);
    }

    #[test]
    fn test_multiple_binders_and_lambda_spellings() {
        let expected = node(&["f", "a"], vec![var("f"), var("a")]);
        for text in [r"\f a.f a", "λf a.f a", "lambda f a.f a", "LAMBDA f a. f a"] {
            assert_eq!(parse(text).expect("parse error"), expected, "input {:?}", text);
        }
    }

    #[test]
    fn test_lambda_in_parens_takes_over_node() {
        let generated_output = parse(r"(\a.a) b").expect("parse error");
        assert_eq!(
            generated_output,
            node(&[], vec![Term::from(node(&["a"], vec![var("a")])), var("b")])
        );
    }

    #[test]
    fn test_close_paren_closes_enclosed_lambdas() {
        let generated_output = parse(r"(a \b.b c) d").expect("parse error");
        let inner = node(
            &[],
            vec![var("a"), Term::from(node(&["b"], vec![var("b"), var("c")]))],
        );
        assert_eq!(generated_output, node(&[], vec![Term::from(inner), var("d")]));
    }

    #[test]
    fn test_from_str() {
        let expression: Expression = r"\a.a".parse().expect("parse error");
        assert_eq!(expression, node(&["a"], vec![var("a")]));
    }

    #[rstest]
    #[case(r"\a.(b)", None)]
    #[case(r"\a (.a", Some(ParseErrorKind::InvalidNesting))]
    #[case("()", Some(ParseErrorKind::EmptyParentheses))]
    #[case(r"(\a b)", Some(ParseErrorKind::MissingTerminator))]
    #[case("a b)", Some(ParseErrorKind::MismatchedParentheses))]
    #[case("(a))", Some(ParseErrorKind::MismatchedParentheses))]
    #[case(")", Some(ParseErrorKind::EmptyParentheses))]
    #[case("a ())", Some(ParseErrorKind::EmptyParentheses))]
    #[case(r"\a \b.a", Some(ParseErrorKind::InvalidAbstractionNesting))]
    #[case(r"\.a", Some(ParseErrorKind::EmptyAbstraction))]
    #[case("a.b", Some(ParseErrorKind::InvalidTermination))]
    #[case(r"\a a.a", Some(ParseErrorKind::InvalidRepetition))]
    #[case("(a (b)", Some(ParseErrorKind::MissingTerminatingParenthesis))]
    #[case(r"\a.", Some(ParseErrorKind::EmptyAbstractionBody))]
    #[case(r"(x \a.)", Some(ParseErrorKind::EmptyAbstractionBody))]
    #[case(r"\a b", Some(ParseErrorKind::MissingTerminator))]
    #[case("", Some(ParseErrorKind::EmptyExpression))]
    fn test_parse_errors(#[case] text: &str, #[case] expected: Option<ParseErrorKind>) {
        let result = parse(text);
        assert_eq!(result.as_ref().err().map(|error| error.kind), expected, "{:?}", result);
    }

    #[test]
    fn test_parse_error_reports_tokens() {
        let error = parse("a b)").expect_err("should fail");
        assert_eq!(error.tokens, vec!["a", "b", ")"]);
        assert_eq!(error.position, 2);
        assert_eq!(error.to_string(), "Mismatched parentheses at token 2: a b )");
    }

    // Rendering then reparsing must give back an equivalent expression.
    #[test]
    fn test_round_trip() {
        let program_strs = [
            r"\a.a",
            r"(\a.a a) (\b.b) c",
            r"\n f x.f (n f x)",
            r"a (\b.b) (c d) \e.e f",
            r"(\f.(\a.f (a a)) (\a.f (a a))) g",
            r"\a.\a.a",
            "x",
            "((x y))",
        ];

        for program_str in program_strs {
            let original = parse(program_str).expect("parse error");
            let reparsed = parse(&original.to_string()).expect("rendered text should parse");
            assert!(
                reparsed.equals(&original),
                "{} reparsed as {}",
                original,
                reparsed
            );
        }
    }
}
