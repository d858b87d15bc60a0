//! A table of named combinators, and rewriting between names and the
//! expressions they stand for.
//!
//! Entries keep their source text and parse it the first time it is needed.
//! The parsed expression (and its canonical form, used for reverse lookup)
//! is memoized in a `OnceCell`, so the default table can be a process-wide
//! static shared by every caller.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{trace, warn};

use crate::box_tree_impl::box_tree_ast::{Expression, Term};
use crate::box_tree_impl::box_tree_parsing::{parse, ParseError};

/// Errors raised while looking up library entries.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LibraryError {
    #[error("Library entry {name} does not parse: {source}")]
    InvalidEntry { name: String, source: ParseError },

    #[error("No library entry named {0}")]
    UnknownName(String),
}

// How forward rewriting looks names up, and whether an entry that fails to
// parse is an error or is skipped.
#[derive(Debug, Clone, Copy)]
struct ForwardMode {
    ignore_case: bool,
    strict: bool,
}

/// A named combinator.
#[derive(Debug)]
pub struct LibraryEntry {
    pub name: String,
    pub description: Option<String>,
    pub source: String,
    pub priority: Option<i32>,
    expression: OnceCell<Expression>,
    canonical: OnceCell<Expression>,
}

impl LibraryEntry {
    pub fn new(name: &str, description: Option<&str>, source: &str, priority: Option<i32>) -> Self {
        LibraryEntry {
            name: String::from(name),
            description: description.map(String::from),
            source: String::from(source),
            priority,
            expression: OnceCell::new(),
            canonical: OnceCell::new(),
        }
    }

    /// The parsed backing expression, parsed on first use.
    pub fn expression(&self) -> Result<&Expression, LibraryError> {
        self.expression.get_or_try_init(|| {
            trace!("parsing library entry {}", self.name);
            parse(&self.source).map_err(|source| LibraryError::InvalidEntry {
                name: self.name.clone(),
                source,
            })
        })
    }

    fn canonical(&self) -> Result<&Expression, LibraryError> {
        self.canonical
            .get_or_try_init(|| Ok(self.expression()?.canonicalize()))
    }
}

/// Name-indexed combinator table. Several names may refer to the same entry.
#[derive(Debug, Default)]
pub struct Library {
    entries: Vec<LibraryEntry>,
    // Every name in declaration order, with the entry it refers to.
    names: Vec<(String, usize)>,
    index: HashMap<String, usize>,
    index_ignore_case: HashMap<String, usize>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. A name that is already present is redefined in place,
    /// keeping its original declaration position.
    pub fn define(&mut self, entry: LibraryEntry) {
        let name = entry.name.clone();
        let entry_idx = self.entries.len();
        self.entries.push(entry);
        self.bind_name(&name, entry_idx);
    }

    /// Makes `alias` refer to the same entry as `target`.
    pub fn alias(&mut self, alias: &str, target: &str) -> Result<(), LibraryError> {
        let entry_idx = *self
            .index
            .get(target)
            .ok_or_else(|| LibraryError::UnknownName(String::from(target)))?;
        self.bind_name(alias, entry_idx);
        Ok(())
    }

    fn bind_name(&mut self, name: &str, entry_idx: usize) {
        let lowercase = name.to_lowercase();

        match self.index.insert(String::from(name), entry_idx) {
            Some(previous_idx) => {
                if let Some(slot) = self.names.iter_mut().find(|(existing, _)| existing == name) {
                    slot.1 = entry_idx;
                }
                if self.index_ignore_case.get(&lowercase) == Some(&previous_idx) {
                    self.index_ignore_case.insert(lowercase.clone(), entry_idx);
                }
            }
            None => self.names.push((String::from(name), entry_idx)),
        }

        self.index_ignore_case.entry(lowercase).or_insert(entry_idx);
    }

    /// Looks up an entry by exact name.
    pub fn get(&self, name: &str) -> Option<&LibraryEntry> {
        self.index.get(name).map(|&entry_idx| &self.entries[entry_idx])
    }

    /// Looks up an entry ignoring case; an exact match wins.
    pub fn get_ignore_case(&self, name: &str) -> Option<&LibraryEntry> {
        self.get(name).or_else(|| {
            self.index_ignore_case
                .get(&name.to_lowercase())
                .map(|&entry_idx| &self.entries[entry_idx])
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All names with their entries, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LibraryEntry)> {
        self.names
            .iter()
            .map(|(name, entry_idx)| (name.as_str(), &self.entries[*entry_idx]))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Parses every entry, reporting the first that fails.
    pub fn validate(&self) -> Result<(), LibraryError> {
        self.entries
            .iter()
            .try_for_each(|entry| entry.expression().map(|_| ()))
    }

    /// Applies library rewriting until no library name is left free, or
    /// `max_passes` passes have run.
    pub fn expand(
        &self,
        expression: &Expression,
        exclude: &HashSet<&str>,
        max_passes: usize,
    ) -> Result<Expression, LibraryError> {
        let mut expanded = expression.clone();

        for _ in 0..max_passes {
            let has_library_name = expanded
                .get_free_variables()
                .iter()
                .any(|name| self.contains(name) && !exclude.contains(name));
            if !has_library_name {
                break;
            }
            expanded = expanded.try_apply_library(Some(self), Some(exclude))?;
        }

        Ok(expanded)
    }

    // Backing expression for `name`. A lenient lookup logs an entry that
    // fails to parse and treats it as absent.
    fn resolve(&self, name: &str, mode: ForwardMode) -> Result<Option<&Expression>, LibraryError> {
        let entry = if mode.ignore_case {
            self.get_ignore_case(name)
        } else {
            self.get(name)
        };
        let Some(entry) = entry else {
            return Ok(None);
        };

        match entry.expression() {
            Ok(expression) => Ok(Some(expression)),
            Err(error) if !mode.strict => {
                warn!("{}", error);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    // Best entry name whose canonical form matches `candidate`, skipping any
    // that would be captured by the enclosing binders in `bound`. Entries
    // that fail to parse never match.
    fn find_match(&self, candidate: &Expression, bound: &HashSet<&str>) -> Option<&str> {
        let mut selection: Option<(&str, Option<i32>)> = None;

        for (name, entry) in self.iter() {
            if bound.contains(name) {
                continue;
            }
            let (Ok(canonical), Ok(expression)) = (entry.canonical(), entry.expression()) else {
                continue;
            };
            if canonical != candidate
                || expression
                    .get_free_variables()
                    .iter()
                    .any(|free| bound.contains(free))
            {
                continue;
            }

            let better = match selection {
                None => true,
                Some((_, best_priority)) => entry.priority > best_priority,
            };
            if better {
                selection = Some((name, entry.priority));
            }
        }

        selection.map(|(name, _)| name)
    }
}

fn church_numeral_source(n: usize) -> String {
    let mut body = String::from(if n > 0 { "f a" } else { "a" });
    for _ in 1..n {
        body = format!("f ({})", body);
    }
    format!("lambda f a.{}", body)
}

fn numeral_words() -> Vec<String> {
    let mut words: Vec<String> = [
        "ZERO", "ONE", "TWO", "THREE", "FOUR", "FIVE", "SIX", "SEVEN", "EIGHT", "NINE", "TEN",
        "ELEVEN", "TWELVE", "THIRTEEN", "FOURTEEN", "FIFTEEN", "SIXTEEN", "SEVENTEEN",
        "EIGHTEEN", "NINETEEN",
    ]
    .iter()
    .map(|word| String::from(*word))
    .collect();

    for tens in [
        "TWENTY", "THIRTY", "FORTY", "FIFTY", "SIXTY", "SEVENTY", "EIGHTY", "NINETY",
    ] {
        words.push(String::from(tens));
        for ones in 1..10 {
            let word = format!("{}{}", tens, words[ones]);
            words.push(word);
        }
    }

    words.push(String::from("ONEHUNDRED"));
    words
}

const IDENTITY: &str = "lambda a.a";
const KESTRAL: &str = "lambda a b.a";
const KITE: &str = "lambda a b.b";
const STARLING: &str = "lambda a b c.a c (b c)";
const CARDINAL: &str = "lambda a b c.a c b";
const BLUEBIRD: &str = "lambda a b c.a (b c)";
const VIREO: &str = "lambda a b f.f a b";
const FIXED_POINT: &str = "lambda f.(lambda a.f (a a)) (lambda a.f (a a))";
const IOTA: &str = r"\f.f (\a b c.a c (b c)) \d e.d";

const DIVIDE: &str = "lambda n.((lambda f.(lambda x.x x) (lambda x.f (x x))) \
     (lambda c.lambda n.lambda m.lambda f.lambda x.(lambda d.(lambda n.n \
     (lambda x.(lambda a.lambda b.b)) (lambda a.lambda b.a)) d \
     ((lambda f.lambda x.x) f x) (f (c d m f x))) ((lambda m.lambda n.n \
     (lambda n.lambda f.lambda x.n (lambda g.lambda h.h (g f)) (lambda u.x) \
     (lambda u.u)) m) n m))) ((lambda n.lambda f.lambda x. f (n f x)) n)";

/// Builds the default library: logic, pairs and lists, Church numeral
/// arithmetic, the fixed-point combinator and numerals 0 through 100.
pub fn build_default_library() -> Library {
    let mut library = Library::new();
    let mut define = |name: &str, description: Option<&str>, source: &str, priority| {
        library.define(LibraryEntry::new(name, description, source, priority));
    };

    define("TRUE", Some("Logical TRUE"), KESTRAL, Some(2));
    define("FALSE", Some("Logical FALSE"), KITE, Some(2));
    define("NOT", Some("Logical NOT"), CARDINAL, None);
    define("AND", Some("Logical AND"), "lambda p q.p q p", None);
    define("OR", Some("Logical OR"), "lambda p q.p p q", None);
    define("BOOLEQ?", Some("Boolean Equality"), "lambda p q.p q (NOT q)", None);
    define("PAIR", None, VIREO, None);
    define("HEAD", None, "lambda p.p TRUE", None);
    define("TAIL", None, "lambda p.p FALSE", None);
    define("IS-NIL?", None, "lambda p.p (lambda a b.FALSE)", None);
    define("NIL", None, "lambda a.TRUE", None);
    define("SUCCESSOR", Some("Successor"), "lambda n f a.f (n f a)", None);
    define("ZERO", Some("Church Numeral ZERO"), KITE, None);
    define("ADD", Some("Church Numeral Addition"), "lambda m n f a.m f (n f a)", None);
    define("MULTIPLY", Some("Church Numeral Multiplication"), BLUEBIRD, None);
    define("POWER", Some("Church Numeral Exponentiation"), "lambda m n f a.(n m) f a", None);
    define(
        "IS-ZERO?",
        Some("Church Numeral Zero Check"),
        "lambda n.n (lambda a.FALSE) TRUE",
        None,
    );
    define(
        "IS-EVEN?",
        Some("Church Numeral Even Check"),
        "lambda n.n (lambda a.NOT a) TRUE",
        None,
    );
    define(
        "IS-ODD?",
        Some("Church Numeral Odd Check"),
        "lambda n.n (lambda a.NOT a) FALSE",
        None,
    );
    define(
        "PREDECESSOR",
        Some("Church Numeral Decrement"),
        "lambda n f a.n (lambda g h.h (g f)) (lambda c.a) IDENTITY",
        None,
    );
    define(
        "SUBTRACT",
        Some("Church Numeral Subtraction"),
        "lambda m n.n PREDECESSOR m",
        None,
    );
    define(
        "MINUS",
        Some("Church Numeral Subtraction"),
        "lambda m n.n PREDECESSOR m",
        None,
    );
    define("DIVIDE", Some("Church Numeral Division"), DIVIDE, None);
    define(
        "LESSEQ?",
        Some("Church Numeral Less Than or Equal"),
        "lambda m n.IS-ZERO? (MINUS m n)",
        None,
    );
    define(
        "GREATEREQ?",
        Some("Church Numeral Greater Than or Equal"),
        "lambda m n.IS-ZERO? (MINUS n m)",
        None,
    );
    define(
        "LESS?",
        Some("Church Numeral Less Than"),
        "lambda m n.NOT (GREATEREQ? m n)",
        None,
    );
    define(
        "GREATER?",
        Some("Church Numeral Greater Than"),
        "lambda m n.NOT (LESSEQ? m n)",
        None,
    );
    define(
        "EQUAL?",
        Some("Church Numeral Equality"),
        "lambda m n.AND (LESSEQ? m n) (LESSEQ? n m)",
        None,
    );
    define("NTH", None, "lambda n l.n (lambda l.(IS-NIL? l) NIL (TAIL l)) l", None);
    define("FIX", Some("Fixed-point Combinator"), FIXED_POINT, None);
    define(
        "FSTEP",
        Some("Partial implementation of FACTORIAL"),
        "lambda f n.(IS-ZERO? n) ONE (MULTIPLY n (f (PREDECESSOR n)))",
        None,
    );
    define("FACTORIAL", Some("Church Numeral FACTORIAL"), "FIX FSTEP", None);
    define(
        "SUM",
        Some("Add up a list of numbers"),
        "FIX (lambda f l.(IS-NIL? l) ZERO (ADD (HEAD l) (f (TAIL l))))",
        None,
    );
    define(
        "MAP",
        Some("Apply a function to each list member"),
        "FIX (lambda f g l.(IS-NIL? l) NIL (PAIR (g (HEAD l)) (f g (TAIL l))))",
        None,
    );
    define("STARLING", Some("Starling"), STARLING, None);
    define("KESTRAL", Some("Kestral"), KESTRAL, None);
    define("IDENTITY", Some("Identity"), IDENTITY, None);
    define("IOTA", Some("Iota"), IOTA, None);

    for (n, word) in numeral_words().iter().enumerate() {
        let source = church_numeral_source(n);
        let word_description = format!("Church Numeral {}", word);
        let digit_description = format!("Church Numeral {}", n);
        let digits = n.to_string();
        define(word.as_str(), Some(word_description.as_str()), source.as_str(), None);
        define(digits.as_str(), Some(digit_description.as_str()), source.as_str(), Some(1));
    }

    for (alias, target) in [
        ("PLUS", "ADD"),
        ("+", "ADD"),
        ("TIMES", "MULTIPLY"),
        ("*", "MULTIPLY"),
        ("=", "EQUAL?"),
        ("-", "MINUS"),
        ("/", "DIVIDE"),
    ] {
        // Targets are all defined above.
        if let Err(error) = library.alias(alias, target) {
            tracing::error!("{}", error);
        }
    }

    library
}

lazy_static! {
    /// The process-wide default library.
    pub static ref DEFAULT_LIBRARY: Library = build_default_library();
}

impl Expression {
    /// Replaces every atomic term that names a library entry, and is neither
    /// bound locally nor listed in `exclude`, with that entry's expression.
    /// Enclosing binders that would capture a free name of an inserted entry
    /// are renamed first. Entries that fail to parse are logged and left as
    /// names. Uses the default library when `library` is `None`.
    pub fn apply_library(
        &self,
        library: Option<&Library>,
        exclude: Option<&HashSet<&str>>,
    ) -> Expression {
        let library = library.unwrap_or(&*DEFAULT_LIBRARY);
        let exclude = exclude.cloned().unwrap_or_default();
        let mode = ForwardMode {
            ignore_case: false,
            strict: false,
        };

        match self.apply_library_helper(library, &exclude, mode) {
            Ok(applied) => applied,
            Err(error) => {
                warn!("{}", error);
                self.clone()
            }
        }
    }

    /// Like `apply_library`, but reports entries that fail to parse.
    pub fn try_apply_library(
        &self,
        library: Option<&Library>,
        exclude: Option<&HashSet<&str>>,
    ) -> Result<Expression, LibraryError> {
        let library = library.unwrap_or(&*DEFAULT_LIBRARY);
        let exclude = exclude.cloned().unwrap_or_default();
        let mode = ForwardMode {
            ignore_case: false,
            strict: true,
        };
        self.apply_library_helper(library, &exclude, mode)
    }

    /// Forward rewriting with case-insensitive name matching, so that `true`
    /// and `True` both find `TRUE`.
    pub fn apply_library_ignore_case(
        &self,
        library: Option<&Library>,
        exclude: Option<&HashSet<&str>>,
    ) -> Result<Expression, LibraryError> {
        let library = library.unwrap_or(&*DEFAULT_LIBRARY);
        let exclude = exclude.cloned().unwrap_or_default();
        let mode = ForwardMode {
            ignore_case: true,
            strict: true,
        };
        self.apply_library_helper(library, &exclude, mode)
    }

    fn apply_library_helper(
        &self,
        library: &Library,
        exclude: &HashSet<&str>,
        mode: ForwardMode,
    ) -> Result<Expression, LibraryError> {
        // Free names of every entry this subtree pulls in. A binder of this
        // node with one of those names would capture it.
        let mut inserted_free: HashSet<String> = HashSet::new();
        for name in self.get_free_variables() {
            if exclude.contains(name) {
                continue;
            }
            if let Some(expression) = library.resolve(name, mode)? {
                inserted_free.extend(expression.get_free_variables().into_iter().map(String::from));
            }
        }

        let mut scope = self.clone();
        let mut avoid: HashSet<&str> = exclude.iter().copied().collect();
        avoid.extend(inserted_free.iter().map(String::as_str));
        for binder in self
            .variables
            .iter()
            .filter(|binder| inserted_free.contains(binder.as_str()))
        {
            scope = scope.rename(binder, &avoid);
        }

        let mut exclude: HashSet<&str> = exclude.iter().copied().collect();
        exclude.extend(scope.variables.iter().map(String::as_str));

        let mut terms = Vec::with_capacity(scope.terms.len());
        for term in &scope.terms {
            let rewritten = match term {
                Term::Nested { expr } => {
                    Term::from(expr.apply_library_helper(library, &exclude, mode)?)
                }
                Term::Var { var_name } if !exclude.contains(var_name.as_str()) => {
                    match library.resolve(var_name, mode)? {
                        Some(expression) => Term::from(expression.clone()),
                        None => term.clone(),
                    }
                }
                Term::Var { .. } => term.clone(),
            };
            terms.push(rewritten);
        }

        Ok(Expression {
            variables: scope.variables.clone(),
            terms,
        })
    }

    /// Replaces every subtree that is alpha-equivalent to a library entry
    /// with the entry's name, innermost subtrees first. When several names
    /// match, the highest priority wins, then the earliest declared. Uses
    /// the default library when `library` is `None`.
    pub fn reverse_library(&self, library: Option<&Library>) -> Expression {
        let library = library.unwrap_or(&*DEFAULT_LIBRARY);

        match self.reverse_library_helper(library, &HashSet::new()) {
            Term::Var { var_name } => Expression {
                variables: vec![],
                terms: vec![Term::Var { var_name }],
            },
            Term::Nested { expr } => *expr,
        }
    }

    fn reverse_library_helper(&self, library: &Library, bound: &HashSet<&str>) -> Term {
        let mut inner_bound: HashSet<&str> = bound.iter().copied().collect();
        inner_bound.extend(self.variables.iter().map(String::as_str));

        let terms = self
            .terms
            .iter()
            .map(|term| match term {
                Term::Nested { expr } => expr.reverse_library_helper(library, &inner_bound),
                Term::Var { .. } => term.clone(),
            })
            .collect();
        let rewritten = Expression {
            variables: self.variables.clone(),
            terms,
        };

        // The untouched subtree is tried first so entries whose definitions
        // contain smaller entries still match as a whole.
        for candidate in [self, &rewritten] {
            if let Some(name) = library.find_match(&candidate.canonicalize(), bound) {
                return Term::var(name);
            }
        }

        Term::from(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Expression {
        parse(text).expect("test input should parse")
    }

    #[test]
    fn test_default_library_parses() {
        assert_eq!(DEFAULT_LIBRARY.validate(), Ok(()));
        for name in ["+", "*", "=", "-", "/", "ZERO", "ONEHUNDRED", "0", "100", "FIX"] {
            assert!(DEFAULT_LIBRARY.contains(name), "missing {}", name);
        }
        assert!(!DEFAULT_LIBRARY.contains("101"));
    }

    #[test]
    fn test_numerals() {
        let three = DEFAULT_LIBRARY.get("THREE").expect("THREE");
        assert_eq!(three.source, "lambda f a.f (f (f a))");
        assert_eq!(DEFAULT_LIBRARY.get("3").expect("3").source, three.source);
        assert_eq!(DEFAULT_LIBRARY.get("ZERO").expect("ZERO").source, "lambda f a.a");
        assert_eq!(
            DEFAULT_LIBRARY.get("TWENTYTWO").expect("TWENTYTWO").source,
            church_numeral_source(22)
        );
        assert_eq!(
            DEFAULT_LIBRARY.get("NINETYNINE").expect("NINETYNINE").source,
            church_numeral_source(99)
        );
    }

    #[test]
    fn test_aliases_share_entries() {
        let add = DEFAULT_LIBRARY.get("ADD").expect("ADD");
        let plus = DEFAULT_LIBRARY.get("+").expect("+");
        assert!(std::ptr::eq(add, plus));
        assert!(std::ptr::eq(
            add.expression().expect("parses"),
            plus.expression().expect("parses")
        ));
    }

    #[test]
    fn test_memoized_expression_is_stable() {
        let entry = DEFAULT_LIBRARY.get("SUCCESSOR").expect("SUCCESSOR");
        let first = entry.expression().expect("parses").clone();
        let second = entry.expression().expect("parses");
        assert_eq!(&first, second);
        assert!(first.equals(&parsed(&entry.source)));
    }

    #[test]
    fn test_apply_library() {
        let applied = parsed("IDENTITY x").apply_library(None, None);
        assert!(applied.equals(&parsed(r"(\a.a) x")));

        let reduced = applied.normalize(10).expression;
        assert_eq!(reduced.to_string(), "x");
    }

    #[test]
    fn test_apply_library_skips_bound_and_excluded_names() {
        let applied = parsed(r"\TRUE.TRUE FALSE").apply_library(None, None);
        assert!(applied.equals(&parsed(r"\t.t (\a b.b)")));

        let exclude = HashSet::from(["FALSE"]);
        let excluded = parsed("TRUE FALSE").apply_library(None, Some(&exclude));
        assert!(excluded.equals(&parsed(r"(\a b.a) FALSE")));
    }

    #[test]
    fn test_apply_library_renames_capturing_binders() {
        // HEAD refers to the library's TRUE, not to the binder named TRUE.
        let library = &*DEFAULT_LIBRARY;
        for (program_str, expected_str) in [
            (r"\TRUE.HEAD x", r"\t.x (\a b.a)"),
            (r"\TRUE.(\y.HEAD y) TRUE", r"\t.t (\a b.a)"),
        ] {
            let expanded = library
                .expand(&parsed(program_str), &HashSet::new(), 10)
                .expect("library parses");
            assert!(!expanded.variables().iter().any(|name| name == "TRUE"));

            let normalization = expanded.normalize(50);
            assert!(normalization.reached_normal_form);
            assert!(
                normalization.expression.equals(&parsed(expected_str)),
                "{} expanded to {}, normalized to {}",
                program_str,
                expanded,
                normalization.expression
            );
        }
    }

    #[test]
    fn test_apply_library_keeps_binders_without_collision() {
        let applied = parsed(r"\x.HEAD x").apply_library(None, None);
        assert_eq!(applied.variables(), ["x"]);
        assert!(applied.equals(&parsed(r"\x.(\p.p TRUE) x")));
    }

    #[test]
    fn test_apply_library_case_sensitivity() {
        let exact = parsed("true").apply_library(None, None);
        assert_eq!(exact.to_string(), "true");

        let relaxed = parsed("true")
            .apply_library_ignore_case(None, None)
            .expect("library parses");
        assert!(relaxed.equals(&parsed(r"\a b.a")));
    }

    #[test]
    fn test_reverse_library_priorities() {
        let cases = vec![
            (r"\x y.x", "TRUE"),
            (r"\f a.a", "FALSE"),
            (r"\f a.f (f a)", "2"),
            (r"\m n f a.m f (n f a)", "ADD"),
            (r"\p.p (\a b.a)", "HEAD"),
        ];

        for (program_str, expected_name) in cases {
            let reversed = parsed(program_str).reverse_library(None);
            assert_eq!(reversed.to_string(), expected_name, "input {}", program_str);
        }
    }

    #[test]
    fn test_reverse_library_rewrites_subtrees() {
        let reversed = parsed(r"g (\a.a) (\f x.f x)").reverse_library(None);
        assert_eq!(reversed.to_string(), "g IDENTITY 1");
    }

    #[test]
    fn test_reverse_library_respects_shadowing() {
        // Writing TRUE inside a binder named TRUE would change the meaning.
        let reversed = parsed(r"\TRUE.TRUE (\a b.a)").reverse_library(None);
        assert_eq!(reversed.to_string(), "λTRUE.TRUE KESTRAL");
    }

    #[test]
    fn test_library_round_trip() {
        for (name, entry) in DEFAULT_LIBRARY.iter() {
            let backing = entry.expression().expect("parses");

            let reversed = backing.reverse_library(None);
            let reversed_name = reversed.to_string();
            let reversed_entry = DEFAULT_LIBRARY
                .get(&reversed_name)
                .unwrap_or_else(|| panic!("{} reversed to {}", name, reversed_name));
            assert!(
                reversed_entry.expression().expect("parses").equals(backing),
                "{} reversed to {}",
                name,
                reversed_name
            );

            let applied = Expression::from_name(name)
                .expect("library names are valid names")
                .apply_library(None, None);
            assert!(applied.equals(backing), "{} applied to {}", name, applied);
        }
    }

    #[test]
    fn test_reverse_prefers_name_declared_first() {
        for name in ["ADD", "MULTIPLY", "DIVIDE", "IDENTITY", "SUCCESSOR"] {
            let backing = DEFAULT_LIBRARY
                .get(name)
                .expect("present")
                .expression()
                .expect("parses");
            assert_eq!(backing.reverse_library(None).to_string(), name);
        }
    }

    #[test]
    fn test_expand_and_reduce_arithmetic() {
        let library = &*DEFAULT_LIBRARY;
        let expression = parsed("+ 2 3");
        let expanded = library
            .expand(&expression, &HashSet::new(), 10)
            .expect("library parses");
        assert!(expanded
            .get_free_variables()
            .iter()
            .all(|name| !library.contains(name)));

        let normalization = expanded.normalize(100);
        assert!(normalization.reached_normal_form);
        assert_eq!(
            normalization.expression.reverse_library(None).to_string(),
            "5"
        );
    }

    #[test]
    fn test_custom_library() {
        let mut library = Library::new();
        library.define(LibraryEntry::new("ID", None, r"\z.z", None));
        library.define(LibraryEntry::new("BROKEN", None, "(", None));
        library.alias("I", "ID").expect("ID is defined");

        assert_eq!(
            library.alias("J", "MISSING"),
            Err(LibraryError::UnknownName(String::from("MISSING")))
        );
        assert!(matches!(
            library.validate(),
            Err(LibraryError::InvalidEntry { ref name, .. }) if name == "BROKEN"
        ));

        let applied = parsed("I y").apply_library(Some(&library), None);
        assert!(applied.equals(&parsed(r"(\q.q) y")));
        assert_eq!(parsed(r"\k.k").reverse_library(Some(&library)).to_string(), "ID");
        assert_eq!(parsed("BROKEN").reverse_library(Some(&library)).to_string(), "BROKEN");

        // A broken entry stays a name without blocking the other rewrites.
        let partial = parsed("I BROKEN").apply_library(Some(&library), None);
        assert!(partial.equals(&parsed(r"(\q.q) BROKEN")));
        assert!(matches!(
            parsed("I BROKEN").try_apply_library(Some(&library), None),
            Err(LibraryError::InvalidEntry { ref name, .. }) if name == "BROKEN"
        ));
        assert!(parsed("BROKEN").try_apply_library(Some(&library), None).is_err());
    }
}
