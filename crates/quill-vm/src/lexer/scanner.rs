//! The scanner that produces tokens from source text.

use super::{Span, Token, TokenKind};

/// A scanner that tokenizes Quill source code.
#[derive(Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Returns the next token from the source.
    ///
    /// Once the input is exhausted every further call yields `Eof`.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.current_pos;

        let Some((_pos, ch)) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '<' => TokenKind::LessThan,
            '>' => TokenKind::GreaterThan,
            '=' => self.scan_equal(),
            '!' => self.scan_bang(),
            '"' => self.scan_string(),
            '0'..='9' => self.scan_number(start),
            _ if is_id_start(ch) => self.scan_identifier(start),
            _ => TokenKind::Invalid(ch),
        };

        Token::new(kind, Span::new(start, self.current_pos))
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_equal(&mut self) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            TokenKind::EqualEqual
        } else {
            TokenKind::Assign
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            TokenKind::NotEqual
        } else {
            TokenKind::Bang
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        let mut value = String::new();
        loop {
            match self.advance() {
                Some((_, '"')) => return TokenKind::String(value),
                Some((_, '\\')) => match self.advance() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, other)) => value.push(other),
                    None => return TokenKind::UnterminatedString,
                },
                Some((_, ch)) => value.push(ch),
                None => return TokenKind::UnterminatedString,
            }
        }
    }

    fn scan_number(&mut self, start: usize) -> TokenKind {
        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }
        TokenKind::Integer(self.source[start..self.current_pos].to_string())
    }

    fn scan_identifier(&mut self, start: usize) -> TokenKind {
        while let Some(ch) = self.peek() {
            if !is_id_continue(ch) {
                break;
            }
            self.advance();
        }

        let text = &self.source[start..self.current_pos];
        TokenKind::keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()))
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

fn is_id_start(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

fn is_id_continue(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Scanner::new(src).map(|t| t.kind).collect()
    }

    #[test]
    fn test_scan_let_statement() {
        assert_eq!(
            kinds("let five = 5;"),
            vec![
                TokenKind::Let,
                TokenKind::Identifier("five".into()),
                TokenKind::Assign,
                TokenKind::Integer("5".into()),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_scan_operators() {
        assert_eq!(
            kinds("!-/*5; 5 < 10 > 5; 10 == 10; 10 != 9;"),
            vec![
                TokenKind::Bang,
                TokenKind::Minus,
                TokenKind::Slash,
                TokenKind::Star,
                TokenKind::Integer("5".into()),
                TokenKind::Semicolon,
                TokenKind::Integer("5".into()),
                TokenKind::LessThan,
                TokenKind::Integer("10".into()),
                TokenKind::GreaterThan,
                TokenKind::Integer("5".into()),
                TokenKind::Semicolon,
                TokenKind::Integer("10".into()),
                TokenKind::EqualEqual,
                TokenKind::Integer("10".into()),
                TokenKind::Semicolon,
                TokenKind::Integer("10".into()),
                TokenKind::NotEqual,
                TokenKind::Integer("9".into()),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_scan_function_literal() {
        assert_eq!(
            kinds("fn(x, y) { x + y; }"),
            vec![
                TokenKind::Function,
                TokenKind::LeftParen,
                TokenKind::Identifier("x".into()),
                TokenKind::Comma,
                TokenKind::Identifier("y".into()),
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::Identifier("x".into()),
                TokenKind::Plus,
                TokenKind::Identifier("y".into()),
                TokenKind::Semicolon,
                TokenKind::RightBrace,
            ]
        );
    }

    #[test]
    fn test_scan_collections() {
        assert_eq!(
            kinds("[1, 2]; {\"foo\": \"bar\"}"),
            vec![
                TokenKind::LeftBracket,
                TokenKind::Integer("1".into()),
                TokenKind::Comma,
                TokenKind::Integer("2".into()),
                TokenKind::RightBracket,
                TokenKind::Semicolon,
                TokenKind::LeftBrace,
                TokenKind::String("foo".into()),
                TokenKind::Colon,
                TokenKind::String("bar".into()),
                TokenKind::RightBrace,
            ]
        );
    }

    #[test]
    fn test_scan_string_escapes() {
        assert_eq!(kinds(r#""a\nb\"c""#), vec![TokenKind::String("a\nb\"c".into())]);
    }

    #[test]
    fn test_scan_unterminated_string() {
        assert_eq!(kinds("\"abc"), vec![TokenKind::UnterminatedString]);
    }

    #[test]
    fn test_scan_skips_comments() {
        assert_eq!(
            kinds("// leading\n1 // trailing\n"),
            vec![TokenKind::Integer("1".into())]
        );
    }

    #[test]
    fn test_scan_invalid_character() {
        assert_eq!(kinds("@"), vec![TokenKind::Invalid('@')]);
    }

    #[test]
    fn test_token_spans() {
        let mut scanner = Scanner::new("let x");
        assert_eq!(scanner.next_token().span, Span::new(0, 3));
        assert_eq!(scanner.next_token().span, Span::new(4, 5));
        let eof = scanner.next_token();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.span, Span::new(5, 5));
    }
}
