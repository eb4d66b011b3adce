use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::syntax::token::{Token, TokenKind};

/// Single-pass lexer with one character of lookahead.
///
/// Tracks byte offset plus 1-based line/column. Skips whitespace and
/// `//` line comments. A fresh `Lexer` over the same source is back in
/// the initial state; there is no other reset mechanism.
pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Lex the next token, or fail on the first illegal character or
    /// unterminated string.
    pub fn next_token(&mut self) -> Result<Token, Diagnostic> {
        self.skip_whitespace_and_comments();

        if self.pos >= self.source.len() {
            return Ok(self.make_token(TokenKind::EndOfFile, None));
        }

        let ch = self.source[self.pos];

        if ch.is_ascii_digit() {
            return Ok(self.scan_number());
        }
        if is_ident_start(ch) {
            return Ok(self.scan_ident_or_keyword());
        }
        if ch == b'"' {
            return self.scan_string();
        }
        self.scan_punct()
    }

    /// Lex the whole source. Handy for tests; the parser pulls tokens
    /// one at a time instead.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::EndOfFile;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.advance();
            }
            if self.pos + 1 < self.source.len()
                && self.source[self.pos] == b'/'
                && self.source[self.pos + 1] == b'/'
            {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    fn scan_number(&mut self) -> Token {
        let (start, line, column) = self.mark();
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.advance();
        }

        if self.pos >= self.source.len() || self.source[self.pos] != b'.' {
            let text = self.text_from(start);
            return self.token_at(TokenKind::IntegerConstant, Some(text), start, line, column);
        }

        // The dot commits us to a float; the fractional digit run may
        // be empty, matching "1." style literals.
        self.advance();
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.advance();
        }
        let text = self.text_from(start);
        self.token_at(TokenKind::FloatConstant, Some(text), start, line, column)
    }

    fn scan_ident_or_keyword(&mut self) -> Token {
        let (start, line, column) = self.mark();
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.advance();
        }
        let text = self.text_from(start);
        match TokenKind::from_keyword(&text) {
            Some(kind) => self.token_at(kind, None, start, line, column),
            None => self.token_at(TokenKind::Identifier, Some(text), start, line, column),
        }
    }

    fn scan_string(&mut self) -> Result<Token, Diagnostic> {
        let (start, line, column) = self.mark();
        self.advance(); // opening quote

        let mut value = String::new();
        while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
            match self.source[self.pos] {
                b'"' => {
                    self.advance();
                    return Ok(self.token_at(
                        TokenKind::StringConstant,
                        Some(value),
                        start,
                        line,
                        column,
                    ));
                }
                b'\\' if self.pos + 1 < self.source.len() => {
                    let escaped = self.source[self.pos + 1];
                    self.advance();
                    self.advance();
                    match escaped {
                        b'n' => value.push('\n'),
                        b't' => value.push('\t'),
                        b'"' => value.push('"'),
                        b'\\' => value.push('\\'),
                        other => {
                            value.push('\\');
                            value.push(other as char);
                        }
                    }
                }
                other => {
                    value.push(other as char);
                    self.advance();
                }
            }
        }

        Err(Diagnostic::lexical(
            format!(
                "string doesn't have closing quotes on line {}, column {}",
                line, column
            ),
            Span::new(start as u32, self.pos as u32),
        ))
    }

    fn scan_punct(&mut self) -> Result<Token, Diagnostic> {
        let (start, line, column) = self.mark();

        // Longest match first: the two-character tokens.
        if self.pos + 1 < self.source.len() {
            let pair = &self.source[self.pos..self.pos + 2];
            let two = match pair {
                b"==" => Some(TokenKind::Equals),
                b"!=" => Some(TokenKind::NotEquals),
                b"<=" => Some(TokenKind::LessOrEquals),
                b">=" => Some(TokenKind::MoreOrEquals),
                b"->" => Some(TokenKind::Arrow),
                b"||" => Some(TokenKind::Or),
                b"&&" => Some(TokenKind::And),
                _ => None,
            };
            if let Some(kind) = two {
                self.advance();
                self.advance();
                return Ok(self.token_at(kind, None, start, line, column));
            }
        }

        let ch = self.source[self.pos];
        let kind = match ch {
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b'=' => TokenKind::Assign,
            b',' => TokenKind::Comma,
            b'(' => TokenKind::LeftParenthesis,
            b')' => TokenKind::RightParenthesis,
            b'{' => TokenKind::LeftCurly,
            b'}' => TokenKind::RightCurly,
            b'<' => TokenKind::LeftAngleBracket,
            b'>' => TokenKind::RightAngleBracket,
            b'[' => TokenKind::LeftSquareBracket,
            b']' => TokenKind::RightSquareBracket,
            b'-' => TokenKind::Minus,
            b'+' => TokenKind::Plus,
            b'*' => TokenKind::Mul,
            b'/' => TokenKind::Div,
            b'%' => TokenKind::Mod,
            b'!' => TokenKind::Negation,
            other => {
                let printable = if other.is_ascii_graphic() {
                    format!("{}", other as char)
                } else {
                    format!("#{}", other)
                };
                return Err(Diagnostic::lexical(
                    format!(
                        "can't parse char '{}' on line {}, column {}",
                        printable, line, column
                    ),
                    Span::new(start as u32, start as u32 + 1),
                ));
            }
        };
        self.advance();
        Ok(self.token_at(kind, None, start, line, column))
    }

    fn advance(&mut self) {
        if self.source[self.pos] == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn mark(&self) -> (usize, u32, u32) {
        (self.pos, self.line, self.column)
    }

    fn text_from(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.source[start..self.pos]).into_owned()
    }

    fn make_token(&self, kind: TokenKind, lexeme: Option<String>) -> Token {
        Token {
            kind,
            lexeme,
            offset: self.pos as u32,
            line: self.line,
            column: self.column,
        }
    }

    fn token_at(
        &self,
        kind: TokenKind,
        lexeme: Option<String>,
        offset: usize,
        line: u32,
        column: u32,
    ) -> Token {
        Token {
            kind,
            lexeme,
            offset: offset as u32,
            line,
            column,
        }
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn empty_source_is_eof() {
        assert_eq!(kinds(""), vec![TokenKind::EndOfFile]);
        assert_eq!(kinds("   \n\t  "), vec![TokenKind::EndOfFile]);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("func main var x1 _tmp"),
            vec![
                TokenKind::Func,
                TokenKind::Identifier,
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn integer_and_float_constants() {
        let tokens = Lexer::new("42 3.5 1.").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::IntegerConstant);
        assert_eq!(tokens[0].lexeme.as_deref(), Some("42"));
        assert_eq!(tokens[1].kind, TokenKind::FloatConstant);
        assert_eq!(tokens[1].lexeme.as_deref(), Some("3.5"));
        assert_eq!(tokens[2].kind, TokenKind::FloatConstant);
        assert_eq!(tokens[2].lexeme.as_deref(), Some("1."));
    }

    #[test]
    fn two_char_operators_win_over_singles() {
        assert_eq!(
            kinds("== != <= >= -> || && < > = ! -"),
            vec![
                TokenKind::Equals,
                TokenKind::NotEquals,
                TokenKind::LessOrEquals,
                TokenKind::MoreOrEquals,
                TokenKind::Arrow,
                TokenKind::Or,
                TokenKind::And,
                TokenKind::LeftAngleBracket,
                TokenKind::RightAngleBracket,
                TokenKind::Assign,
                TokenKind::Negation,
                TokenKind::Minus,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("var // the rest is ignored\nx"),
            vec![TokenKind::Var, TokenKind::Identifier, TokenKind::EndOfFile]
        );
    }

    #[test]
    fn string_escapes_are_decoded() {
        let tokens = Lexer::new(r#""a\nb\tc\"d""#).tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringConstant);
        assert_eq!(tokens[0].lexeme.as_deref(), Some("a\nb\tc\"d"));
    }

    #[test]
    fn unterminated_string_fails() {
        let err = Lexer::new("\"abc\nx\"").tokenize().unwrap_err();
        assert!(err.message.contains("closing quotes"));
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert!(err.message.contains("closing quotes"));
    }

    #[test]
    fn illegal_character_fails_with_position() {
        let err = Lexer::new("var x @").tokenize().unwrap_err();
        assert!(err.message.contains("can't parse char '@'"));
        assert!(err.message.contains("line 1, column 7"));
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let tokens = Lexer::new("var\n  x").tokenize().unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
        assert_eq!(tokens[1].offset, 6);
    }

    #[test]
    fn relex_of_joined_lexemes_is_stable() {
        let source = "func main ( ) -> Int : { var x : Int = 1 + 2.5 ; return x ; }";
        let first = Lexer::new(source).tokenize().unwrap();
        let joined: Vec<String> = first
            .iter()
            .filter(|t| t.kind != TokenKind::EndOfFile)
            .map(|t| match &t.lexeme {
                Some(lexeme) if t.kind == TokenKind::StringConstant => format!("\"{}\"", lexeme),
                Some(lexeme) => lexeme.clone(),
                None => token_text(t.kind).to_string(),
            })
            .collect();
        let second = Lexer::new(&joined.join(" ")).tokenize().unwrap();
        let first_kinds: Vec<_> = first.iter().map(|t| t.kind).collect();
        let second_kinds: Vec<_> = second.iter().map(|t| t.kind).collect();
        assert_eq!(first_kinds, second_kinds);
    }

    fn token_text(kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::Func => "func",
            TokenKind::Var => "var",
            TokenKind::Return => "return",
            TokenKind::Int => "Int",
            TokenKind::LeftParenthesis => "(",
            TokenKind::RightParenthesis => ")",
            TokenKind::Arrow => "->",
            TokenKind::Colon => ":",
            TokenKind::LeftCurly => "{",
            TokenKind::RightCurly => "}",
            TokenKind::Assign => "=",
            TokenKind::Plus => "+",
            TokenKind::Semicolon => ";",
            _ => unreachable!("not used in this test"),
        }
    }
}
