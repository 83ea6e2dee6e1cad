// Lexer: turns a source string into a flat token stream. Doesn't borrow the
// source past tokenization — each token owns whatever text it needs, which
// keeps the parser and compiler free of lifetime parameters.

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // single-char
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Semicolon,
    Plus,
    Minus,
    Star,
    Slash,
    // one or two char
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    // literals
    Identifier(String),
    Number(f64),
    String(String),
    // keywords
    And,
    Or,
    If,
    Else,
    For,
    While,
    Function,
    Var,
    Print,
    Return,
    True,
    False,
    Null,
    // sentinels
    Illegal(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    fn new(kind: TokenKind, line: usize) -> Self {
        Self { kind, line }
    }

    /// The text a diagnostic should quote for this token.
    pub fn lexeme(&self) -> String {
        match &self.kind {
            TokenKind::Identifier(s) => s.clone(),
            TokenKind::Number(n) => n.to_string(),
            TokenKind::String(s) => format!("\"{}\"", s),
            TokenKind::Illegal(s) => s.clone(),
            other => format!("{:?}", other),
        }
    }
}

fn keyword(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "function" => TokenKind::Function,
        "var" => TokenKind::Var,
        "print" => TokenKind::Print,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        _ => return None,
    })
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { chars: source.chars().peekable(), line: 1 }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&'/') {
                        while let Some(c) = self.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn number(&mut self, first: char) -> TokenKind {
        let mut text = String::new();
        text.push(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                text.push('.');
                self.advance();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }
        TokenKind::Number(text.parse().unwrap_or(0.0))
    }

    fn string(&mut self) -> TokenKind {
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return TokenKind::Illegal("unterminated string literal".to_string()),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        TokenKind::String(text)
    }

    fn identifier(&mut self, first: char) -> TokenKind {
        let mut text = String::new();
        text.push(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        keyword(&text).unwrap_or(TokenKind::Identifier(text))
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        let line = self.line;
        let c = match self.advance() {
            None => return Token::new(TokenKind::Eof, line),
            Some(c) => c,
        };

        let kind = match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '!' => if self.matches('=') { TokenKind::BangEqual } else { TokenKind::Bang },
            '=' => if self.matches('=') { TokenKind::EqualEqual } else { TokenKind::Equal },
            '<' => if self.matches('=') { TokenKind::LessEqual } else { TokenKind::Less },
            '>' => if self.matches('=') { TokenKind::GreaterEqual } else { TokenKind::Greater },
            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(c),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(c),
            other => TokenKind::Illegal(format!("unexpected character '{}'", other)),
        };

        Token::new(kind, line)
    }
}

/// Tokenizes the whole source eagerly; the parser consumes this as a slice
/// with two-token lookahead.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let is_eof = token.kind == TokenKind::Eof;
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn identifiers_do_not_include_digits() {
        let tokens = kinds("abc123");
        assert_eq!(tokens[0], TokenKind::Identifier("abc".to_string()));
        assert_eq!(tokens[1], TokenKind::Number(123.0));
    }

    #[test]
    fn recognizes_all_keywords() {
        let source = "and or if else for while function var print return true false null";
        let tokens = kinds(source);
        assert_eq!(
            &tokens[..tokens.len() - 1],
            &[
                TokenKind::And,
                TokenKind::Or,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::For,
                TokenKind::While,
                TokenKind::Function,
                TokenKind::Var,
                TokenKind::Print,
                TokenKind::Return,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
            ]
        );
    }

    #[test]
    fn line_comments_are_skipped() {
        let tokens = kinds("var x = 1; // trailing comment\nvar y = 2;");
        assert!(tokens.iter().any(|k| *k == TokenKind::Number(2.0)));
    }

    #[test]
    fn compound_operators_are_greedy() {
        let tokens = kinds("!= <= >= ==");
        assert_eq!(
            &tokens[..4],
            &[TokenKind::BangEqual, TokenKind::LessEqual, TokenKind::GreaterEqual, TokenKind::EqualEqual]
        );
    }

    #[test]
    fn unterminated_string_is_illegal() {
        let tokens = kinds("\"abc");
        assert!(matches!(tokens[0], TokenKind::Illegal(_)));
    }

    #[test]
    fn line_numbers_advance_past_newlines() {
        let tokens = tokenize("var x = 1;\nvar y = 2;");
        let y_token = tokens.iter().find(|t| t.kind == TokenKind::Var).map(|_| ()).is_some();
        assert!(y_token);
        assert!(tokens.iter().any(|t| t.line == 2));
    }
}
