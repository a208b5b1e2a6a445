//! User query parsing.
//!
//! Accepts a small boolean syntax and rewrites it into an FTS5 `MATCH`
//! expression in which every term is a quoted string, so user input can never
//! reach the FTS5 grammar unescaped.
//!
//! | Input            | Meaning                                  |
//! |------------------|------------------------------------------|
//! | `bus strategy`   | both words (implicit AND)                |
//! | `"bus strategy"` | exact phrase                             |
//! | `a OR b`         | either word                              |
//! | `a NOT b`        | `a` but not `b`                          |
//! | `(a OR b) c`     | grouping                                 |
//! | `strat*`         | prefix match                             |
//!
//! Operators are case-sensitive; lowercase `and`/`or`/`not` are plain words.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query is empty")]
    Empty,
    #[error("Unterminated quoted phrase")]
    UnterminatedQuote,
    #[error("Unbalanced parentheses")]
    UnbalancedParentheses,
    #[error("Empty group '()'")]
    EmptyGroup,
    #[error("Operator '{0}' is missing an operand")]
    MisplacedOperator(String),
    #[error("Query rejected by the search engine: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Term { text: String, prefix: bool },
    Phrase(String),
    And,
    Or,
    Not,
    Open,
    Close,
}

impl Token {
    /// Tokens after which an operand cannot directly follow without an
    /// operator (i.e. the end of an operand).
    fn ends_operand(&self) -> bool {
        matches!(self, Token::Term { .. } | Token::Phrase(_) | Token::Close)
    }

    fn starts_operand(&self) -> bool {
        matches!(self, Token::Term { .. } | Token::Phrase(_) | Token::Open)
    }

    fn operator_name(&self) -> Option<&'static str> {
        match self {
            Token::And => Some("AND"),
            Token::Or => Some("OR"),
            Token::Not => Some("NOT"),
            _ => None,
        }
    }
}

/// A validated FTS5 match expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchExpression {
    expression: String,
    terms: Vec<String>,
}

impl MatchExpression {
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// Quoted words, prefixes and phrases that count towards relevance, in
    /// query order and without duplicates. Negated operands are left out.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Restrict every phrase of the expression to the given columns.
    pub fn restrict_to<S: AsRef<str>>(&self, columns: &[S]) -> String {
        restrict(columns, &self.expression)
    }
}

/// `{cols} : (expression)` column filter.
pub fn restrict<S: AsRef<str>>(columns: &[S], expression: &str) -> String {
    let cols = columns
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{{{cols}}} : ({expression})")
}

/// Parse a user query into a [`MatchExpression`].
pub fn parse(query: &str) -> Result<MatchExpression, QueryError> {
    let tokens = tokenize(query)?;
    if tokens.is_empty() {
        return Err(QueryError::Empty);
    }
    let tokens = insert_implicit_and(tokens);
    validate(&tokens)?;
    Ok(MatchExpression {
        expression: render(&tokens),
        terms: scoring_terms(&tokens),
    })
}

fn tokenize(query: &str) -> Result<Vec<Token>, QueryError> {
    let mut tokens = Vec::new();
    let mut chars = query.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        match c {
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut phrase = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '"' {
                        closed = true;
                        break;
                    }
                    phrase.push(next);
                }
                if !closed {
                    return Err(QueryError::UnterminatedQuote);
                }
                if has_searchable_chars(&phrase) {
                    tokens.push(Token::Phrase(phrase.trim().to_string()));
                }
            }
            _ => {
                let mut word = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '(' | ')' | '"') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                if let Some(token) = word_token(&word) {
                    tokens.push(token);
                }
            }
        }
    }

    Ok(tokens)
}

fn word_token(word: &str) -> Option<Token> {
    match word {
        "AND" => return Some(Token::And),
        "OR" => return Some(Token::Or),
        "NOT" => return Some(Token::Not),
        _ => {}
    }

    let (text, prefix) = match word.strip_suffix('*') {
        Some(stem) => (stem.trim_end_matches('*'), true),
        None => (word, false),
    };

    // Pure punctuation tokenizes to nothing and would only confuse FTS5.
    has_searchable_chars(text).then(|| Token::Term {
        text: text.to_string(),
        prefix,
    })
}

fn has_searchable_chars(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

fn insert_implicit_and(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len() * 2);
    for token in tokens {
        if let Some(prev) = out.last() {
            if prev.ends_operand() && token.starts_operand() {
                out.push(Token::And);
            }
        }
        out.push(token);
    }
    out
}

fn validate(tokens: &[Token]) -> Result<(), QueryError> {
    let mut depth: usize = 0;

    for (i, token) in tokens.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| &tokens[p]);
        let next = tokens.get(i + 1);

        match token {
            Token::Open => {
                depth += 1;
                if next == Some(&Token::Close) {
                    return Err(QueryError::EmptyGroup);
                }
            }
            Token::Close => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(QueryError::UnbalancedParentheses)?;
            }
            Token::And | Token::Or | Token::Not => {
                let left_ok = prev.is_some_and(Token::ends_operand);
                let right_ok = next.is_some_and(Token::starts_operand);
                if !left_ok || !right_ok {
                    let name = token.operator_name().unwrap_or_default();
                    return Err(QueryError::MisplacedOperator(name.to_string()));
                }
            }
            Token::Term { .. } | Token::Phrase(_) => {}
        }
    }

    if depth != 0 {
        return Err(QueryError::UnbalancedParentheses);
    }
    Ok(())
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn render_token(token: &Token) -> String {
    match token {
        Token::Term { text, prefix: true } => format!("{}*", quote(text)),
        Token::Term {
            text,
            prefix: false,
        } => quote(text),
        Token::Phrase(text) => quote(text),
        Token::And => "AND".to_string(),
        Token::Or => "OR".to_string(),
        Token::Not => "NOT".to_string(),
        Token::Open => "(".to_string(),
        Token::Close => ")".to_string(),
    }
}

fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(render_token)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Operands outside the scope of any `NOT`, rendered like the expression.
fn scoring_terms(tokens: &[Token]) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    // Negation state of each open group.
    let mut groups: Vec<bool> = Vec::new();
    let mut negate_next = false;

    for token in tokens {
        let negated = negate_next || groups.last().copied().unwrap_or(false);
        match token {
            Token::Not => negate_next = true,
            Token::Open => {
                groups.push(negated);
                negate_next = false;
            }
            Token::Close => {
                groups.pop();
            }
            Token::Term { .. } | Token::Phrase(_) => {
                let rendered = render_token(token);
                if !negated && !terms.contains(&rendered) {
                    terms.push(rendered);
                }
                negate_next = false;
            }
            Token::And | Token::Or => {}
        }
    }

    terms
}
