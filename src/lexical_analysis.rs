//! Splits lambda calculus source text into tokens.

use lazy_static::lazy_static;
use regex::Regex;

/// The different classes of tokens that compose the language.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum TokenClass {
    OpenParen,
    CloseParen,
    Dot,
    Lambda,
    Name,
    Whitespace,
}

/// Represents a single token of the language.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Token {
    pub token_class: TokenClass,
    pub token_text: String,
}

impl Token {
    /// True for `\`, the lambda glyph, and the word "lambda" in any case.
    pub fn is_lambda_marker(&self) -> bool {
        match self.token_class {
            TokenClass::Lambda => true,
            TokenClass::Name => self.token_text.eq_ignore_ascii_case("lambda"),
            _ => false,
        }
    }
}

// Represents how to recognize a token class.
#[derive(Debug)]
struct TokenRule {
    token_class: TokenClass,
    regex: Regex,
}

// Vector of regex patterns that correspond to each token class. Every
// pattern is anchored so it only matches at the current position.
lazy_static! {
    static ref TOKEN_RULES: Vec<TokenRule> = vec![
        TokenRule {
            token_class: TokenClass::OpenParen,
            regex: Regex::new(r"^\(").expect("Unable to compile OpenParen rule regex."),
        },
        TokenRule {
            token_class: TokenClass::CloseParen,
            regex: Regex::new(r"^\)").expect("Unable to compile CloseParen rule regex."),
        },
        TokenRule {
            token_class: TokenClass::Dot,
            regex: Regex::new(r"^\.").expect("Unable to compile Dot rule regex."),
        },
        TokenRule {
            token_class: TokenClass::Lambda,
            regex: Regex::new(r"^[\\\x{03bb}]").expect("Unable to compile Lambda rule regex."),
        },
        TokenRule {
            token_class: TokenClass::Name,
            regex: Regex::new(r"^[^\s().\\\x{03bb}]+")
                .expect("Unable to compile Name rule regex."),
        },
        TokenRule {
            token_class: TokenClass::Whitespace,
            regex: Regex::new(r"^\s+").expect("Unable to compile Whitespace rule regex."),
        },
    ];
}

// Finds the rule that matches the most characters from the start of the input
// string. Every non-empty input matches at least one rule.
fn get_longest_matching_rule(input_str: &str) -> Option<(&'static TokenRule, usize)> {
    let mut longest: Option<(&'static TokenRule, usize)> = None;

    for token_rule in TOKEN_RULES.iter() {
        if let Some(match_obj) = token_rule.regex.find(input_str) {
            let is_longer = longest.map_or(true, |(_, len)| match_obj.len() > len);
            if is_longer {
                longest = Some((token_rule, match_obj.len()));
            }
        }
    }

    longest
}

// Given a string, returns a vector of all tokens that comprise that string,
// whitespace included.
fn make_token_stream(program_str: &str) -> Vec<Token> {
    let mut curr_idx: usize = 0;
    let mut out = Vec::new();

    while curr_idx < program_str.len() {
        let Some((token_rule, match_len)) = get_longest_matching_rule(&program_str[curr_idx..])
        else {
            break;
        };

        out.push(Token {
            token_class: token_rule.token_class,
            token_text: String::from(&program_str[curr_idx..curr_idx + match_len]),
        });
        curr_idx += match_len;
    }

    out
}

/// Tokenizes `program_str`, discarding whitespace. Never fails: malformed
/// text still produces tokens and the parser decides what to reject.
pub fn run_lexical_analysis(program_str: &str) -> Vec<Token> {
    make_token_stream(program_str)
        .into_iter()
        .filter(|token| token.token_class != TokenClass::Whitespace)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|token| token.token_text.as_str()).collect()
    }

    // Test if find_longest_matching_rule picks the right class.
    #[test]
    fn test_longest_matching_rule() {
        let cases = vec![
            ("(a", TokenClass::OpenParen, 1),
            ("abc def", TokenClass::Name, 3),
            ("   x", TokenClass::Whitespace, 3),
            ("λa.a", TokenClass::Lambda, 'λ'.len_utf8()),
            ("lambda a.a", TokenClass::Name, 6),
        ];

        for (input_str, expected_class, expected_len) in cases {
            let (rule, match_len) =
                get_longest_matching_rule(input_str).expect("no rule matched");
            assert_eq!(rule.token_class, expected_class, "input {:?}", input_str);
            assert_eq!(match_len, expected_len, "input {:?}", input_str);
        }
    }

    // Test that delimiters terminate a preceding name.
    #[test]
    fn test_delimiters_split_names() {
        let tokens = run_lexical_analysis(r"(\ab.ab c)d");
        assert_eq!(texts(&tokens), vec!["(", "\\", "ab", ".", "ab", "c", ")", "d"]);
    }

    #[test]
    fn test_whitespace_is_discarded() {
        let all = make_token_stream("a  b\n\tc");
        assert_eq!(all.len(), 5);

        let tokens = run_lexical_analysis("a  b\n\tc");
        assert_eq!(texts(&tokens), vec!["a", "b", "c"]);
        assert!(tokens
            .iter()
            .all(|token| token.token_class == TokenClass::Name));
    }

    #[test]
    fn test_unicode_lambda_and_symbols() {
        let tokens = run_lexical_analysis("λf a.+ IS-ZERO? 12");
        assert_eq!(
            texts(&tokens),
            vec!["λ", "f", "a", ".", "+", "IS-ZERO?", "12"]
        );
        assert!(tokens[0].is_lambda_marker());
    }

    #[test]
    fn test_lambda_word_is_case_insensitive() {
        let tokens = run_lexical_analysis("LaMbDa x.x lambdas");
        assert!(tokens[0].is_lambda_marker());
        assert!(!tokens[4].is_lambda_marker());
    }

    #[test]
    fn test_empty_input() {
        assert!(run_lexical_analysis("").is_empty());
        assert!(run_lexical_analysis("  \n ").is_empty());
    }
}
