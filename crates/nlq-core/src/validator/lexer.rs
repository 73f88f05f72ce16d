//! SQL statement scanner
//!
//! A lexical tokenizer for the validator's token-analysis and binder-sanity
//! passes. This is deliberately not a SQL parser: it only needs to separate
//! words, string literals, comments and bind parameters reliably enough for
//! security gating, and to notice gross malformation (unterminated strings,
//! unbalanced parentheses).

use crate::error::LexError;

/// One lexical token with its byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier or keyword.
    Word(String),
    /// Numeric literal.
    Number(String),
    /// Contents of a `'...'` string literal (quotes stripped).
    StringLiteral(String),
    /// Contents of a `--`, `#` or `/* */` comment (markers stripped).
    Comment(String),
    /// Named bind parameter, e.g. `:start_date` (colon stripped).
    BindParam(String),
    /// Any other single character.
    Symbol(char),
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize a statement, verifying strings, comments and parentheses are
/// well-formed along the way.
pub fn tokenize(sql: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut depth: i64 = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Line comments: -- and #
        if c == '-' && chars.get(i + 1) == Some(&'-') {
            let start = i + 2;
            let end = line_end(&chars, start);
            tokens.push(Token::Comment(collect(&chars, start, end)));
            i = end;
            continue;
        }
        if c == '#' {
            let start = i + 1;
            let end = line_end(&chars, start);
            tokens.push(Token::Comment(collect(&chars, start, end)));
            i = end;
            continue;
        }

        // Block comment
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let start = i + 2;
            let mut j = start;
            loop {
                if j + 1 >= chars.len() {
                    return Err(LexError::UnterminatedComment(i));
                }
                if chars[j] == '*' && chars[j + 1] == '/' {
                    break;
                }
                j += 1;
            }
            tokens.push(Token::Comment(collect(&chars, start, j)));
            i = j + 2;
            continue;
        }

        // String literal with '' escaping
        if c == '\'' {
            let start = i;
            let mut j = i + 1;
            let mut value = String::new();
            loop {
                match chars.get(j) {
                    None => return Err(LexError::UnterminatedString(start)),
                    Some('\'') if chars.get(j + 1) == Some(&'\'') => {
                        value.push('\'');
                        j += 2;
                    }
                    Some('\'') => {
                        j += 1;
                        break;
                    }
                    Some(&ch) => {
                        value.push(ch);
                        j += 1;
                    }
                }
            }
            tokens.push(Token::StringLiteral(value));
            i = j;
            continue;
        }

        // Quoted identifier - treated as a plain word
        if c == '"' {
            let start = i;
            let mut j = i + 1;
            let mut value = String::new();
            loop {
                match chars.get(j) {
                    None => return Err(LexError::UnterminatedString(start)),
                    Some('"') => {
                        j += 1;
                        break;
                    }
                    Some(&ch) => {
                        value.push(ch);
                        j += 1;
                    }
                }
            }
            tokens.push(Token::Word(value));
            i = j;
            continue;
        }

        // Named bind parameter
        if c == ':' && chars.get(i + 1).map(|&ch| is_word_start(ch)).unwrap_or(false) {
            let start = i + 1;
            let mut j = start;
            while j < chars.len() && is_word_char(chars[j]) {
                j += 1;
            }
            tokens.push(Token::BindParam(collect(&chars, start, j)));
            i = j;
            continue;
        }

        if c == '(' {
            depth += 1;
            tokens.push(Token::Symbol(c));
            i += 1;
            continue;
        }
        if c == ')' {
            depth -= 1;
            if depth < 0 {
                return Err(LexError::UnbalancedParen(i));
            }
            tokens.push(Token::Symbol(c));
            i += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            let mut j = i;
            while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                j += 1;
            }
            tokens.push(Token::Number(collect(&chars, start, j)));
            i = j;
            continue;
        }

        if is_word_start(c) {
            let start = i;
            let mut j = i;
            while j < chars.len() && is_word_char(chars[j]) {
                j += 1;
            }
            tokens.push(Token::Word(collect(&chars, start, j)));
            i = j;
            continue;
        }

        tokens.push(Token::Symbol(c));
        i += 1;
    }

    if depth != 0 {
        return Err(LexError::UnbalancedParen(chars.len()));
    }

    Ok(tokens)
}

fn line_end(chars: &[char], from: usize) -> usize {
    let mut j = from;
    while j < chars.len() && chars[j] != '\n' {
        j += 1;
    }
    j
}

fn collect(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end].iter().collect()
}
