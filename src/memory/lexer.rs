#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Ident(String),
    Number(String),
    Str(String),
    Symbol(&'static str),
}

impl Token {
    /// Case insensitive keyword test, identifiers double as keywords.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(word) if word.eq_ignore_ascii_case(keyword))
    }
}

const KEYWORDS: &[&str] = &[
    "select", "from", "where", "left", "join", "on", "and", "or", "like", "as", "insert", "into",
    "values", "update", "set", "delete",
];

pub(super) fn is_reserved(word: &str) -> bool {
    KEYWORDS.iter().any(|k| word.eq_ignore_ascii_case(k))
}

pub(super) fn lex(sql: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            _ if c.is_whitespace() => {
                chars.next();
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(word));
            }
            _ if c.is_ascii_digit() => {
                let mut number = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        number.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(number));
            }
            '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => text.push(c),
                        None => return Err("unterminated string literal".to_owned()),
                    }
                }
                tokens.push(Token::Str(text));
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Symbol("<="));
                    }
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::Symbol("<>"));
                    }
                    _ => tokens.push(Token::Symbol("<")),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Symbol(">="));
                } else {
                    tokens.push(Token::Symbol(">"));
                }
            }
            '=' | '(' | ')' | ',' | '.' | '?' => {
                chars.next();
                tokens.push(Token::Symbol(match c {
                    '=' => "=",
                    '(' => "(",
                    ')' => ")",
                    ',' => ",",
                    '.' => ".",
                    _ => "?",
                }));
            }
            other => return Err(format!("unexpected character {other:?}")),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_compound_operators() {
        let tokens = lex("a.x <= ? and y <> 'it''").unwrap_err();
        assert!(tokens.contains("unterminated"));
        let tokens = lex("a.x <= ? and y <> 'it'").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("a".into()),
                Token::Symbol("."),
                Token::Ident("x".into()),
                Token::Symbol("<="),
                Token::Symbol("?"),
                Token::Ident("and".into()),
                Token::Ident("y".into()),
                Token::Symbol("<>"),
                Token::Str("it".into()),
            ]
        );
    }
}
