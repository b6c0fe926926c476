use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Single-character tokens
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
    Less,
    Greater,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,

    // Literals
    Identifier,
    Integer,

    // Keywords
    Function,
    Let,
    True,
    False,
    If,
    Else,
    Return,

    Illegal,
    Eof,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::LeftParen => write!(f, "("),
            TokenType::RightParen => write!(f, ")"),
            TokenType::LeftBrace => write!(f, "{{"),
            TokenType::RightBrace => write!(f, "}}"),
            TokenType::Comma => write!(f, ","),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::Plus => write!(f, "+"),
            TokenType::Minus => write!(f, "-"),
            TokenType::Star => write!(f, "*"),
            TokenType::Slash => write!(f, "/"),
            TokenType::Less => write!(f, "<"),
            TokenType::Greater => write!(f, ">"),
            TokenType::Bang => write!(f, "!"),
            TokenType::BangEqual => write!(f, "!="),
            TokenType::Equal => write!(f, "="),
            TokenType::EqualEqual => write!(f, "=="),
            TokenType::Identifier => write!(f, "identifier"),
            TokenType::Integer => write!(f, "integer"),
            TokenType::Function => write!(f, "fn"),
            TokenType::Let => write!(f, "let"),
            TokenType::True => write!(f, "true"),
            TokenType::False => write!(f, "false"),
            TokenType::If => write!(f, "if"),
            TokenType::Else => write!(f, "else"),
            TokenType::Return => write!(f, "return"),
            TokenType::Illegal => write!(f, "illegal"),
            TokenType::Eof => write!(f, "end of file"),
        }
    }
}

/// A lexeme together with its kind and the 0-based position of its first
/// character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub line: usize,
    pub column: usize,
}

fn keyword(identifier: &str) -> Option<TokenType> {
    match identifier {
        "fn" => Some(TokenType::Function),
        "let" => Some(TokenType::Let),
        "true" => Some(TokenType::True),
        "false" => Some(TokenType::False),
        "if" => Some(TokenType::If),
        "else" => Some(TokenType::Else),
        "return" => Some(TokenType::Return),
        _ => None,
    }
}

/// What sits under the cursor.
///
/// Running off a line that is not the last one yields `EndOfLine`, which
/// moves the tokenizer to the next line. Running off the last line yields
/// `EndOfInput`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Byte(u8),
    EndOfLine,
    EndOfInput,
}

#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    lines: Vec<&'a str>,
    line: usize,
    position: usize,
    peek_position: usize,
    current: Cursor,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut tokenizer = Self {
            lines: source.split('\n').collect(),
            line: 0,
            position: 0,
            peek_position: 0,
            current: Cursor::EndOfInput,
        };
        tokenizer.advance();
        tokenizer
    }

    /// Produces the next token. Once the input is exhausted every further
    /// call returns an `Eof` token at the same position.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            let line = self.line;
            let column = self.position;
            let emit = |token_type, literal: &str| Token {
                token_type,
                literal: literal.to_string(),
                line,
                column,
            };

            let byte = match self.current {
                Cursor::EndOfLine => {
                    self.next_line();
                    continue;
                }
                Cursor::EndOfInput => return emit(TokenType::Eof, ""),
                Cursor::Byte(byte) => byte,
            };

            let token = match byte {
                b'=' if self.match_next(b'=') => emit(TokenType::EqualEqual, "=="),
                b'=' => emit(TokenType::Equal, "="),
                b'!' if self.match_next(b'=') => emit(TokenType::BangEqual, "!="),
                b'!' => emit(TokenType::Bang, "!"),
                b'+' => emit(TokenType::Plus, "+"),
                b'-' => emit(TokenType::Minus, "-"),
                b'*' => emit(TokenType::Star, "*"),
                b'/' => emit(TokenType::Slash, "/"),
                b'<' => emit(TokenType::Less, "<"),
                b'>' => emit(TokenType::Greater, ">"),
                b'(' => emit(TokenType::LeftParen, "("),
                b')' => emit(TokenType::RightParen, ")"),
                b'{' => emit(TokenType::LeftBrace, "{"),
                b'}' => emit(TokenType::RightBrace, "}"),
                b',' => emit(TokenType::Comma, ","),
                b';' => emit(TokenType::Semicolon, ";"),
                b if is_letter(b) => {
                    let literal = self.read_while(is_letter);
                    let token_type = keyword(literal).unwrap_or(TokenType::Identifier);
                    return emit(token_type, literal);
                }
                b if b.is_ascii_digit() => {
                    let literal = self.read_while(|b| b.is_ascii_digit());
                    return emit(TokenType::Integer, literal);
                }
                b => Token {
                    token_type: TokenType::Illegal,
                    literal: char::from(b).to_string(),
                    line,
                    column,
                },
            };

            self.advance();
            return token;
        }
    }

    fn advance(&mut self) {
        let line: &'a str = self.lines[self.line];
        self.current = match line.as_bytes().get(self.peek_position) {
            Some(&byte) => Cursor::Byte(byte),
            None if self.line + 1 == self.lines.len() => Cursor::EndOfInput,
            None => Cursor::EndOfLine,
        };
        self.position = self.peek_position;
        self.peek_position += 1;
    }

    fn peek(&self) -> Option<u8> {
        self.lines[self.line]
            .as_bytes()
            .get(self.peek_position)
            .copied()
    }

    /// Consumes the next byte if it is `expected`, leaving the cursor on it.
    fn match_next(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn next_line(&mut self) {
        if self.line + 1 < self.lines.len() {
            self.line += 1;
            self.position = 0;
            self.peek_position = 0;
        }
        self.advance();
    }

    fn read_while(&mut self, accept: impl Fn(u8) -> bool) -> &'a str {
        let start = self.position;
        while matches!(self.current, Cursor::Byte(b) if accept(b)) {
            self.advance();
        }
        let line: &'a str = self.lines[self.line];
        &line[start..self.position]
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current, Cursor::Byte(b' ' | b'\t' | b'\n' | b'\r')) {
            self.advance();
        }
    }
}

fn is_letter(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

/// Collects every token of `source`, up to and including the first `Eof`.
pub fn tokens(source: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(source);
    let mut tokens = Vec::new();

    loop {
        let token = tokenizer.next_token();
        let done = token.token_type == TokenType::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }

    tokens
}

#[cfg(test)]
mod test {
    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        tokens(source).into_iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn test_tokens() {
        let source = "1 + 2";
        let expected = vec![
            Token {
                token_type: TokenType::Integer,
                literal: "1".to_string(),
                line: 0,
                column: 0,
            },
            Token {
                token_type: TokenType::Plus,
                literal: "+".to_string(),
                line: 0,
                column: 2,
            },
            Token {
                token_type: TokenType::Integer,
                literal: "2".to_string(),
                line: 0,
                column: 4,
            },
            Token {
                token_type: TokenType::Eof,
                literal: "".to_string(),
                line: 0,
                column: 5,
            },
        ];
        assert_eq!(tokens(source), expected);
    }

    #[test]
    fn test_double_equal() {
        assert_eq!(types("=="), vec![TokenType::EqualEqual, TokenType::Eof]);
        assert_eq!(types("= "), vec![TokenType::Equal, TokenType::Eof]);
        assert_eq!(types("="), vec![TokenType::Equal, TokenType::Eof]);
        assert_eq!(
            types("a==b"),
            vec![
                TokenType::Identifier,
                TokenType::EqualEqual,
                TokenType::Identifier,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn test_bang() {
        assert_eq!(types("!="), vec![TokenType::BangEqual, TokenType::Eof]);
        assert_eq!(
            types("!!x"),
            vec![
                TokenType::Bang,
                TokenType::Bang,
                TokenType::Identifier,
                TokenType::Eof
            ]
        );
        assert_eq!(
            types("! ="),
            vec![TokenType::Bang, TokenType::Equal, TokenType::Eof]
        );
    }

    #[test]
    fn test_all_punctuation() {
        assert_eq!(
            types("+-*/<>(){},;"),
            vec![
                TokenType::Plus,
                TokenType::Minus,
                TokenType::Star,
                TokenType::Slash,
                TokenType::Less,
                TokenType::Greater,
                TokenType::LeftParen,
                TokenType::RightParen,
                TokenType::LeftBrace,
                TokenType::RightBrace,
                TokenType::Comma,
                TokenType::Semicolon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            types("fn let true false if else return iff _x"),
            vec![
                TokenType::Function,
                TokenType::Let,
                TokenType::True,
                TokenType::False,
                TokenType::If,
                TokenType::Else,
                TokenType::Return,
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
        assert_eq!(types("True"), vec![TokenType::Identifier, TokenType::Eof]);
    }

    #[test]
    fn test_identifier_stops_at_digit() {
        let tokens = tokens("abc123");
        assert_eq!(tokens[0].token_type, TokenType::Identifier);
        assert_eq!(tokens[0].literal, "abc");
        assert_eq!(tokens[1].token_type, TokenType::Integer);
        assert_eq!(tokens[1].literal, "123");
        assert_eq!(tokens[1].column, 3);
    }

    #[test]
    fn test_multiple_lines() {
        let tokens = tokens("a\nb");
        assert_eq!(tokens[0].literal, "a");
        assert_eq!((tokens[0].line, tokens[0].column), (0, 0));
        assert_eq!(tokens[1].literal, "b");
        assert_eq!((tokens[1].line, tokens[1].column), (1, 0));
        assert_eq!(tokens[2].token_type, TokenType::Eof);
        assert_eq!(tokens[2].line, 1);
    }

    #[test]
    fn test_empty_lines_advance_line_counter() {
        let tokens = tokens("x\n\n\n  y;\n");
        assert_eq!(tokens[1].literal, "y");
        assert_eq!((tokens[1].line, tokens[1].column), (3, 2));
        assert_eq!(tokens[2].token_type, TokenType::Semicolon);
        assert_eq!(tokens[3].token_type, TokenType::Eof);
        assert_eq!(tokens[3].line, 4);
    }

    #[test]
    fn test_token_at_end_of_line() {
        let tokens = tokens("x =\n= y");
        assert_eq!(
            tokens.iter().map(|t| t.token_type).collect::<Vec<_>>(),
            vec![
                TokenType::Identifier,
                TokenType::Equal,
                TokenType::Equal,
                TokenType::Identifier,
                TokenType::Eof
            ]
        );
        assert_eq!((tokens[2].line, tokens[2].column), (1, 0));
    }

    #[test]
    fn test_carriage_returns_are_whitespace() {
        assert_eq!(
            types("1\r\n2\r\n"),
            vec![TokenType::Integer, TokenType::Integer, TokenType::Eof]
        );
    }

    #[test]
    fn test_eof_is_idempotent() {
        let mut tokenizer = Tokenizer::new("x");
        assert_eq!(tokenizer.next_token().token_type, TokenType::Identifier);
        let eof = tokenizer.next_token();
        assert_eq!(eof.token_type, TokenType::Eof);
        for _ in 0..5 {
            assert_eq!(tokenizer.next_token(), eof);
        }
    }

    #[test]
    fn test_empty_source() {
        let mut tokenizer = Tokenizer::new("");
        assert_eq!(tokenizer.next_token().token_type, TokenType::Eof);
        assert_eq!(tokenizer.next_token().token_type, TokenType::Eof);
    }

    #[test]
    fn test_illegal() {
        let tokens = tokens("1 @ \"");
        assert_eq!(tokens[1].token_type, TokenType::Illegal);
        assert_eq!(tokens[1].literal, "@");
        assert_eq!(tokens[1].column, 2);
        assert_eq!(tokens[2].token_type, TokenType::Illegal);
        assert_eq!(tokens[2].literal, "\"");
        assert_eq!(tokens[3].token_type, TokenType::Eof);
    }
}
