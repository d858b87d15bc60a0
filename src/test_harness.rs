//! Built-in reduction cases and a bounded runner that checks them.

use std::fmt::Display;

use tracing::{debug, error, info};

use crate::box_tree_impl::box_tree_ast::Expression;
use crate::box_tree_impl::box_tree_parsing::{parse, ParseError};

/// Step bound used when a caller does not supply one.
pub const DEFAULT_STEP_LIMIT: usize = 100;

/// A single case: source text, the normal form it should reach (if any), and
/// whether it is expected to reduce forever instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub source: String,
    pub expected: Option<String>,
    pub forever: bool,
    pub description: Vec<String>,
}

impl TestCase {
    /// A case that only has to reach some normal form.
    pub fn new(source: &str) -> Self {
        TestCase {
            source: String::from(source),
            expected: None,
            forever: false,
            description: vec![],
        }
    }

    pub fn expecting(mut self, expected: &str) -> Self {
        self.expected = Some(String::from(expected));
        self
    }

    pub fn forever(mut self) -> Self {
        self.forever = true;
        self
    }

    pub fn described(mut self, line: &str) -> Self {
        self.description.push(String::from(line));
        self
    }
}

/// How a case ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// The case behaved as expected.
    Success { expression: Expression, steps: usize },
    /// No normal form was reached within the step bound.
    StepLimitExceeded { expression: Expression },
    /// A normal form was reached but differs from the expected one.
    UnexpectedNormalForm { expected: Expression, found: Expression },
    /// The case was expected to reduce forever but reached a normal form.
    UnexpectedTermination { expression: Expression, steps: usize },
    /// The source or expected text did not parse.
    ParseFailure(ParseError),
}

impl TestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TestOutcome::Success { .. })
    }
}

impl Display for TestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success { expression, steps } => {
                write!(f, "Success after {} steps: {}", steps, expression)
            }
            Self::StepLimitExceeded { expression } => {
                write!(f, "ERROR: depth exceeded at {}", expression)
            }
            Self::UnexpectedNormalForm { expected, found } => {
                write!(f, "ERROR: expected {}, found {}", expected, found)
            }
            Self::UnexpectedTermination { expression, steps } => {
                write!(f, "ERROR: unexpected termination after {} steps: {}", steps, expression)
            }
            Self::ParseFailure(parse_error) => write!(f, "ERROR: {}", parse_error),
        }
    }
}

/// Outcome of one case, paired with the case itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub case: TestCase,
    pub outcome: TestOutcome,
}

/// Results of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    pub results: Vec<TestResult>,
}

impl TestReport {
    pub fn failures(&self) -> usize {
        self.results
            .iter()
            .filter(|result| !result.outcome.is_success())
            .count()
    }

    pub fn passed(&self) -> bool {
        self.failures() == 0
    }
}

impl Display for TestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for result in &self.results {
            for line in &result.case.description {
                writeln!(f, "{}", line)?;
            }
            writeln!(f, "{}", result.case.source)?;
            writeln!(f, "{}", result.outcome)?;
            writeln!(f)?;
        }

        match self.failures() {
            0 => write!(f, "Result: all {} passed", self.results.len()),
            failures => write!(f, "Result: {} failed", failures),
        }
    }
}

/// The built-in cases.
pub fn default_cases() -> Vec<TestCase> {
    vec![
        TestCase::new(r"(lambda a.a) a")
            .expecting("a")
            .described("Check a simple reduction."),
        TestCase::new(r"(lambda a.a) lambda b.b")
            .expecting("lambda b.b")
            .described("Check a simple reduction."),
        TestCase::new(r"(lambda a.a a) (lambda b.b) c")
            .expecting("c")
            .described("Check a multi-step reduction."),
        TestCase::new(r"(lambda a.a a) (lambda b.b) 12")
            .expecting("12")
            .described("Check a multi-step reduction."),
        TestCase::new(r"(lambda a.a a) (lambda a.a a)")
            .forever()
            .described("Check that infinite loops keep looping."),
        TestCase::new(r"(lambda a.b) ((lambda a.a a) (lambda a.a a))")
            .expecting("b")
            .described("Check that normal order evaluation works."),
        TestCase::new(r"(lambda a.(lambda a.a) a a) b")
            .expecting("b b")
            .described("Check that variables get shadowed."),
        TestCase::new(r"(lambda a.a) (lambda b.b)")
            .expecting("lambda c.c")
            .described("Check that variable names don't matter."),
        TestCase::new(r"lambda a.a b (lambda c.c d)")
            .expecting("lambda c.c b (lambda a.a d)")
            .described("Check that variable names don't matter."),
        TestCase::new(r"(lambda a.lambda b.a) b")
            .expecting("lambda c.b")
            .described("Check that a free variable is not captured by a binder of the same name."),
        TestCase::new(r"(lambda a b.a) b")
            .expecting("lambda c.b")
            .described("Check capture avoidance within a multi-variable abstraction."),
    ]
}

// Parses the case and reduces it for at most `max_steps` steps.
fn run_case(case: &TestCase, max_steps: usize) -> Result<TestOutcome, ParseError> {
    let expression = parse(&case.source)?;
    let expected = case.expected.as_deref().map(parse).transpose()?;

    info!("{}", expression);
    debug!("canonical: {}", expression.canonicalize());

    let normalization = expression.normalize(max_steps);
    let found = normalization.expression;

    let outcome = if case.forever {
        if normalization.reached_normal_form {
            TestOutcome::UnexpectedTermination {
                expression: found,
                steps: normalization.steps,
            }
        } else {
            TestOutcome::Success {
                expression: found,
                steps: normalization.steps,
            }
        }
    } else if !normalization.reached_normal_form {
        TestOutcome::StepLimitExceeded { expression: found }
    } else {
        match expected {
            Some(expected) if !expected.equals(&found) => {
                TestOutcome::UnexpectedNormalForm { expected, found }
            }
            _ => TestOutcome::Success {
                expression: found,
                steps: normalization.steps,
            },
        }
    };

    Ok(outcome)
}

/// Runs `cases` (the built-in cases when `None`) with the given step bound.
/// A failing case never stops the remaining ones.
pub fn run_tests_with_limit(cases: Option<&[TestCase]>, max_steps: usize) -> TestReport {
    let defaults;
    let cases = match cases {
        Some(cases) => cases,
        None => {
            defaults = default_cases();
            defaults.as_slice()
        }
    };

    let mut report = TestReport::default();

    for case in cases {
        for line in &case.description {
            info!("{}", line);
        }

        let outcome = run_case(case, max_steps).unwrap_or_else(TestOutcome::ParseFailure);
        if outcome.is_success() {
            info!("{}", outcome);
        } else {
            error!("{}", outcome);
        }

        report.results.push(TestResult {
            case: case.clone(),
            outcome,
        });
    }

    info!("{} of {} cases failed", report.failures(), report.results.len());
    report
}

/// Runs `cases` (the built-in cases when `None`) with the default step bound.
pub fn run_tests(cases: Option<&[TestCase]>) -> TestReport {
    run_tests_with_limit(cases, DEFAULT_STEP_LIMIT)
}
