//! Lexer (tokenizer) for snippet source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Indentation is significant: the lexer tracks an indentation stack and emits
//! [`TokenKind::Indent`] / [`TokenKind::Dedent`] pairs around nested blocks, and
//! a [`TokenKind::Newline`] at the end of every logical line. Newlines inside
//! brackets and after a trailing backslash are joined into one logical line.

use super::ast::SourceLocation;
use super::parse::SyntaxErrorKind;
use std::fmt;

/// Piece of an f-string as seen by the lexer. Field sources are parsed later
/// by the parser, which owns expression grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum FStringSegment {
    Literal(String),
    Field {
        source: String,
        conversion: Option<char>,
        spec: Option<String>,
    },
}

const I64_MIN_MAGNITUDE: u64 = i64::MIN.unsigned_abs();

/// All token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    /// `9223372036854775808`, representable only as the operand of a unary minus
    IntMinMagnitude,
    Float(f64),
    Str(String),
    FString(Vec<FStringSegment>),

    // Identifiers
    Name(String),

    // Keywords
    False,
    None,
    True,
    And,
    As,
    Assert,
    Break,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    Except,
    Finally,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lambda,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    Try,
    While,
    /// Keywords of the full language that snippets may not use (`class`, `with`, ...)
    Reserved(String),

    // Arithmetic
    Plus,       // +
    Minus,      // -
    Star,       // *
    DoubleStar, // **
    Slash,      // /
    DoubleSlash, // //
    Percent,    // %

    // Bitwise
    Amp,   // &
    Pipe,  // |
    Caret, // ^
    Tilde, // ~
    LtLt,  // <<
    GtGt,  // >>

    // Comparison
    Lt,    // <
    Gt,    // >
    Le,    // <=
    Ge,    // >=
    EqEq,  // ==
    NotEq, // !=

    // Assignment
    Eq,            // =
    PlusEq,        // +=
    MinusEq,       // -=
    StarEq,        // *=
    SlashEq,       // /=
    DoubleSlashEq, // //=
    PercentEq,     // %=
    DoubleStarEq,  // **=
    AmpEq,         // &=
    PipeEq,        // |=
    CaretEq,       // ^=
    LtLtEq,        // <<=
    GtGtEq,        // >>=

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LBrace,    // {
    RBrace,    // }
    Comma,     // ,
    Colon,     // :
    Dot,       // .
    Semicolon, // ;
    Arrow,     // ->

    // Layout
    Newline,
    Indent,
    Dedent,

    // End of file
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Int(n) => return write!(f, "integer {}", n),
            TokenKind::IntMinMagnitude => "integer 9223372036854775808",
            TokenKind::Float(n) => return write!(f, "float {}", n),
            TokenKind::Str(_) => "string literal",
            TokenKind::FString(_) => "f-string",
            TokenKind::Name(s) => return write!(f, "name '{}'", s),
            TokenKind::Reserved(s) => return write!(f, "'{}'", s),
            TokenKind::False => "'False'",
            TokenKind::None => "'None'",
            TokenKind::True => "'True'",
            TokenKind::And => "'and'",
            TokenKind::As => "'as'",
            TokenKind::Assert => "'assert'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Def => "'def'",
            TokenKind::Del => "'del'",
            TokenKind::Elif => "'elif'",
            TokenKind::Else => "'else'",
            TokenKind::Except => "'except'",
            TokenKind::Finally => "'finally'",
            TokenKind::For => "'for'",
            TokenKind::From => "'from'",
            TokenKind::Global => "'global'",
            TokenKind::If => "'if'",
            TokenKind::Import => "'import'",
            TokenKind::In => "'in'",
            TokenKind::Is => "'is'",
            TokenKind::Lambda => "'lambda'",
            TokenKind::Not => "'not'",
            TokenKind::Or => "'or'",
            TokenKind::Pass => "'pass'",
            TokenKind::Raise => "'raise'",
            TokenKind::Return => "'return'",
            TokenKind::Try => "'try'",
            TokenKind::While => "'while'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::DoubleStar => "'**'",
            TokenKind::Slash => "'/'",
            TokenKind::DoubleSlash => "'//'",
            TokenKind::Percent => "'%'",
            TokenKind::Amp => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Caret => "'^'",
            TokenKind::Tilde => "'~'",
            TokenKind::LtLt => "'<<'",
            TokenKind::GtGt => "'>>'",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::Le => "'<='",
            TokenKind::Ge => "'>='",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Eq => "'='",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::StarEq => "'*='",
            TokenKind::SlashEq => "'/='",
            TokenKind::DoubleSlashEq => "'//='",
            TokenKind::PercentEq => "'%='",
            TokenKind::DoubleStarEq => "'**='",
            TokenKind::AmpEq => "'&='",
            TokenKind::PipeEq => "'|='",
            TokenKind::CaretEq => "'^='",
            TokenKind::LtLtEq => "'<<='",
            TokenKind::GtGtEq => "'>>='",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Dot => "'.'",
            TokenKind::Semicolon => "';'",
            TokenKind::Arrow => "'->'",
            TokenKind::Newline => "newline",
            TokenKind::Indent => "indent",
            TokenKind::Dedent => "dedent",
            TokenKind::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// A token and the position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

/// Lexer error type
#[derive(Debug)]
pub struct LexError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    pub location: SourceLocation,
}

impl LexError {
    fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind: SyntaxErrorKind::Syntax,
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexer error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Lexer for snippet source
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    /// Open brackets and where they were opened
    brackets: Vec<(char, SourceLocation)>,
    at_line_start: bool,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.replace("\r\n", "\n").chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            brackets: Vec::new(),
            at_line_start: true,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens: Vec<Token> = Vec::new();

        loop {
            if self.at_line_start {
                self.at_line_start = false;
                if self.brackets.is_empty() && self.measure_indentation(&mut tokens)? {
                    continue;
                }
            }

            self.skip_inline_whitespace();

            let Some(ch) = self.peek() else {
                break;
            };

            if ch == '\n' {
                let loc = self.current_location();
                self.advance();
                if self.brackets.is_empty() {
                    tokens.push(Token::new(TokenKind::Newline, loc));
                    self.at_line_start = true;
                }
                continue;
            }

            tokens.push(self.next_token()?);
        }

        let loc = self.current_location();
        if let Some((open, open_loc)) = self.brackets.first() {
            return Err(LexError::syntax(
                format!("'{}' was never closed", open),
                *open_loc,
            ));
        }
        if tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Dedent))
        {
            tokens.push(Token::new(TokenKind::Newline, loc));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::new(TokenKind::Dedent, loc));
        }
        tokens.push(Token::new(TokenKind::Eof, loc));

        Ok(tokens)
    }

    /// Measure the indentation of a new logical line and emit INDENT/DEDENT tokens.
    ///
    /// Returns `true` when the line is blank or comment-only and was consumed whole.
    fn measure_indentation(&mut self, tokens: &mut Vec<Token>) -> Result<bool, LexError> {
        let mut width = 0usize;
        while let Some(ch) = self.peek() {
            match ch {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                '\x0c' => width = 0,
                _ => break,
            }
            self.advance();
        }

        match self.peek() {
            None => return Ok(false),
            Some('\n') => {
                self.advance();
                self.at_line_start = true;
                return Ok(true);
            }
            Some('#') => {
                self.skip_comment();
                if self.peek() == Some('\n') {
                    self.advance();
                }
                self.at_line_start = true;
                return Ok(true);
            }
            _ => {}
        }

        let loc = self.current_location();
        let current = self.indent_stack.last().copied().unwrap_or(0);

        if width > current {
            self.indent_stack.push(width);
            tokens.push(Token::new(TokenKind::Indent, loc));
        } else if width < current {
            while self.indent_stack.last().is_some_and(|&top| width < top) {
                self.indent_stack.pop();
                tokens.push(Token::new(TokenKind::Dedent, loc));
            }
            if self.indent_stack.last().copied().unwrap_or(0) != width {
                return Err(LexError {
                    kind: SyntaxErrorKind::Indentation,
                    message: "unindent does not match any outer indentation level".to_string(),
                    location: loc,
                });
            }
        }

        Ok(false)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self
            .advance()
            .ok_or_else(|| LexError::syntax("unexpected end of input", loc))?;

        // String prefixes: r"", f"", b"", rf"", ...
        if matches!(ch, 'r' | 'R' | 'f' | 'F' | 'b' | 'B' | 'u' | 'U') {
            if let Some(token) = self.try_prefixed_string(ch, loc)? {
                return Ok(token);
            }
        }

        let kind = match ch {
            '"' | '\'' => return self.string_literal(ch, false, false, loc),

            '0'..='9' => return self.number_literal(ch, loc),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                return self.number_literal(ch, loc)
            }

            c if c.is_alphabetic() || c == '_' => return Ok(self.identifier_or_keyword(c, loc)),

            '+' => self.with_eq(TokenKind::Plus, TokenKind::PlusEq),
            '-' => {
                if self.match_char('>') {
                    TokenKind::Arrow
                } else {
                    self.with_eq(TokenKind::Minus, TokenKind::MinusEq)
                }
            }
            '*' => {
                if self.match_char('*') {
                    self.with_eq(TokenKind::DoubleStar, TokenKind::DoubleStarEq)
                } else {
                    self.with_eq(TokenKind::Star, TokenKind::StarEq)
                }
            }
            '/' => {
                if self.match_char('/') {
                    self.with_eq(TokenKind::DoubleSlash, TokenKind::DoubleSlashEq)
                } else {
                    self.with_eq(TokenKind::Slash, TokenKind::SlashEq)
                }
            }
            '%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq),
            '&' => self.with_eq(TokenKind::Amp, TokenKind::AmpEq),
            '|' => self.with_eq(TokenKind::Pipe, TokenKind::PipeEq),
            '^' => self.with_eq(TokenKind::Caret, TokenKind::CaretEq),
            '~' => TokenKind::Tilde,
            '<' => {
                if self.match_char('<') {
                    self.with_eq(TokenKind::LtLt, TokenKind::LtLtEq)
                } else {
                    self.with_eq(TokenKind::Lt, TokenKind::Le)
                }
            }
            '>' => {
                if self.match_char('>') {
                    self.with_eq(TokenKind::GtGt, TokenKind::GtGtEq)
                } else {
                    self.with_eq(TokenKind::Gt, TokenKind::Ge)
                }
            }
            '=' => self.with_eq(TokenKind::Eq, TokenKind::EqEq),
            '!' => {
                if self.match_char('=') {
                    TokenKind::NotEq
                } else {
                    return Err(LexError::syntax("invalid syntax", loc));
                }
            }
            '(' => {
                self.brackets.push(('(', loc));
                TokenKind::LParen
            }
            '[' => {
                self.brackets.push(('[', loc));
                TokenKind::LBracket
            }
            '{' => {
                self.brackets.push(('{', loc));
                TokenKind::LBrace
            }
            ')' => {
                self.close_bracket(ch, loc)?;
                TokenKind::RParen
            }
            ']' => {
                self.close_bracket(ch, loc)?;
                TokenKind::RBracket
            }
            '}' => {
                self.close_bracket(ch, loc)?;
                TokenKind::RBrace
            }
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,

            _ => {
                return Err(LexError::syntax(
                    format!("invalid character '{}' (U+{:04X})", ch, ch as u32),
                    loc,
                ));
            }
        };

        Ok(Token::new(kind, loc))
    }

    /// Recognise `r"..."`, `f'...'`, `rb"..."` and friends. Returns `None` (without
    /// consuming anything beyond `first`) when the letters start an identifier instead.
    fn try_prefixed_string(
        &mut self,
        first: char,
        loc: SourceLocation,
    ) -> Result<Option<Token>, LexError> {
        let second = self.peek();
        let (prefix_len, quote) = match second {
            Some(q @ ('"' | '\'')) => (1, q),
            Some(c) if c.is_alphabetic() => match self.peek_ahead(1) {
                Some(q @ ('"' | '\'')) if is_prefix_pair(first, c) => (2, q),
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };

        let mut prefix = String::new();
        prefix.push(first.to_ascii_lowercase());
        if prefix_len == 2 {
            if let Some(c) = self.advance() {
                prefix.push(c.to_ascii_lowercase());
            }
        }
        self.advance(); // opening quote

        let raw = prefix.contains('r');
        let formatted = prefix.contains('f');
        self.string_literal(quote, raw, formatted, loc).map(Some)
    }

    /// Parse a string literal; the opening quote has already been consumed.
    fn string_literal(
        &mut self,
        quote: char,
        raw: bool,
        formatted: bool,
        loc: SourceLocation,
    ) -> Result<Token, LexError> {
        let triple = self.peek() == Some(quote) && self.peek_ahead(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut string = String::new();

        loop {
            let Some(ch) = self.advance() else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Err(LexError::syntax(message, loc));
            };

            if ch == quote {
                if !triple {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_ahead(1) == Some(quote) {
                    self.advance();
                    self.advance();
                    break;
                }
                string.push(ch);
                continue;
            }

            if ch == '\n' && !triple {
                return Err(LexError::syntax("unterminated string literal", loc));
            }

            if ch != '\\' {
                string.push(ch);
                continue;
            }

            let escaped = self
                .advance()
                .ok_or_else(|| LexError::syntax("unterminated string literal", loc))?;

            if raw {
                string.push('\\');
                string.push(escaped);
                continue;
            }

            match escaped {
                '\n' => {} // line continuation inside the literal
                'n' => string.push('\n'),
                't' => string.push('\t'),
                'r' => string.push('\r'),
                '0' => string.push('\0'),
                'a' => string.push('\x07'),
                'b' => string.push('\x08'),
                'f' => string.push('\x0c'),
                'v' => string.push('\x0b'),
                '\\' => string.push('\\'),
                '\'' => string.push('\''),
                '"' => string.push('"'),
                'x' => string.push(self.hex_escape(2, loc)?),
                'u' => string.push(self.hex_escape(4, loc)?),
                'U' => string.push(self.hex_escape(8, loc)?),
                other => {
                    string.push('\\');
                    string.push(other);
                }
            }
        }

        if formatted {
            let segments = split_fstring(&string)
                .map_err(|message| LexError::syntax(message, loc))?;
            return Ok(Token::new(TokenKind::FString(segments), loc));
        }

        Ok(Token::new(TokenKind::Str(string), loc))
    }

    fn hex_escape(&mut self, digits: usize, loc: SourceLocation) -> Result<char, LexError> {
        let mut hex = String::with_capacity(digits);
        for _ in 0..digits {
            match self.advance() {
                Some(c) if c.is_ascii_hexdigit() => hex.push(c),
                _ => {
                    return Err(LexError::syntax(
                        format!("truncated \\x{} escape", hex),
                        loc,
                    ));
                }
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| LexError::syntax(format!("invalid escape \\x{}", hex), loc))
    }

    /// Parse numeric literal: decimal, hex/octal/binary integers and floats
    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Result<Token, LexError> {
        if first == '0' {
            let radix = match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                let mut digits = String::new();
                while let Some(ch) = self.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        if ch != '_' {
                            digits.push(ch);
                        }
                        self.advance();
                    } else {
                        break;
                    }
                }
                if u64::from_str_radix(&digits, radix) == Ok(I64_MIN_MAGNITUDE) {
                    return Ok(Token::new(TokenKind::IntMinMagnitude, loc));
                }
                let value = i64::from_str_radix(&digits, radix).map_err(|_| {
                    LexError::syntax(format!("invalid integer literal '{}'", digits), loc)
                })?;
                return Ok(Token::new(TokenKind::Int(value), loc));
            }
        }

        let mut text = String::new();
        let mut is_float = first == '.';
        text.push(first);

        self.take_digits(&mut text);

        if !is_float && self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.advance();
            self.take_digits(&mut text);
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let sign_then_digit = matches!(self.peek_ahead(1), Some('+' | '-'))
                && self.peek_ahead(2).is_some_and(|c| c.is_ascii_digit());
            if sign_then_digit || self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if sign_then_digit {
                    if let Some(sign) = self.advance() {
                        text.push(sign);
                    }
                }
                self.take_digits(&mut text);
            }
        }

        if is_float {
            let value = text.parse::<f64>().map_err(|_| {
                LexError::syntax(format!("invalid float literal '{}'", text), loc)
            })?;
            return Ok(Token::new(TokenKind::Float(value), loc));
        }

        if text.parse::<u64>() == Ok(I64_MIN_MAGNITUDE) {
            return Ok(Token::new(TokenKind::IntMinMagnitude, loc));
        }
        let value = text.parse::<i64>().map_err(|_| {
            LexError::syntax(
                format!("integer literal '{}' does not fit in 64 bits", text),
                loc,
            )
        })?;
        Ok(Token::new(TokenKind::Int(value), loc))
    }

    fn take_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '_' && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match ident.as_str() {
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "and" => TokenKind::And,
            "as" => TokenKind::As,
            "assert" => TokenKind::Assert,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "def" => TokenKind::Def,
            "del" => TokenKind::Del,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "except" => TokenKind::Except,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "from" => TokenKind::From,
            "global" => TokenKind::Global,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            "lambda" => TokenKind::Lambda,
            "not" => TokenKind::Not,
            "or" => TokenKind::Or,
            "pass" => TokenKind::Pass,
            "raise" => TokenKind::Raise,
            "return" => TokenKind::Return,
            "try" => TokenKind::Try,
            "while" => TokenKind::While,
            "class" | "with" | "yield" | "nonlocal" | "async" | "await" => {
                TokenKind::Reserved(ident)
            }
            _ => TokenKind::Name(ident),
        };

        Token::new(kind, loc)
    }

    /// Skip spaces, tabs, comments and backslash line continuations
    fn skip_inline_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\x0c' | '\r') => {
                    self.advance();
                }
                Some('#') => self.skip_comment(),
                Some('\\') if self.peek_ahead(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                Some('\n') if !self.brackets.is_empty() => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    /// Skip a `#` comment up to (not including) the newline
    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn close_bracket(&mut self, close: char, loc: SourceLocation) -> Result<(), LexError> {
        let expected_open = match close {
            ')' => '(',
            ']' => '[',
            _ => '{',
        };
        match self.brackets.pop() {
            Some((open, _)) if open == expected_open => Ok(()),
            Some((open, _)) => Err(LexError::syntax(
                format!(
                    "closing parenthesis '{}' does not match opening parenthesis '{}'",
                    close, open
                ),
                loc,
            )),
            None => Err(LexError::syntax(format!("unmatched '{}'", close), loc)),
        }
    }

    fn with_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        if self.match_char('=') {
            with_eq
        } else {
            plain
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

fn is_prefix_pair(first: char, second: char) -> bool {
    let pair = [first.to_ascii_lowercase(), second.to_ascii_lowercase()];
    matches!(pair, ['r', 'f'] | ['f', 'r'] | ['r', 'b'] | ['b', 'r'])
}

/// Split the (already unescaped) body of an f-string into literal text and
/// `{expr!c:spec}` fields.
fn split_fstring(body: &str) -> Result<Vec<FStringSegment>, String> {
    let chars: Vec<char> = body.chars().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '}' {
            if chars.get(i + 1) == Some(&'}') {
                literal.push('}');
                i += 2;
                continue;
            }
            return Err("f-string: single '}' is not allowed".to_string());
        }

        if c != '{' {
            literal.push(c);
            i += 1;
            continue;
        }

        if chars.get(i + 1) == Some(&'{') {
            literal.push('{');
            i += 2;
            continue;
        }

        if !literal.is_empty() {
            segments.push(FStringSegment::Literal(std::mem::take(&mut literal)));
        }

        i += 1;
        let start = i;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut expr_end: Option<usize> = None;
        let mut conversion = None;
        let mut spec = None;

        loop {
            let Some(&c) = chars.get(i) else {
                return Err("f-string: expecting '}'".to_string());
            };

            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                i += 1;
                continue;
            }

            match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                '}' if depth > 0 => depth -= 1,
                '}' => {
                    expr_end.get_or_insert(i);
                    i += 1;
                    break;
                }
                '!' if depth == 0 && chars.get(i + 1) != Some(&'=') && expr_end.is_none() => {
                    expr_end = Some(i);
                    let conv = chars.get(i + 1).copied();
                    if !matches!(conv, Some('r' | 's' | 'a')) {
                        return Err("f-string: invalid conversion character".to_string());
                    }
                    conversion = conv;
                    i += 2;
                    continue;
                }
                ':' if depth == 0 => {
                    expr_end.get_or_insert(i);
                    let spec_start = i + 1;
                    let mut j = spec_start;
                    while j < chars.len() && chars[j] != '}' {
                        j += 1;
                    }
                    if j >= chars.len() {
                        return Err("f-string: expecting '}'".to_string());
                    }
                    spec = Some(chars[spec_start..j].iter().collect());
                    i = j + 1;
                    break;
                }
                _ => {}
            }
            i += 1;
        }

        let end = expr_end.unwrap_or(i);
        let source: String = chars[start..end].iter().collect();
        if source.trim().is_empty() {
            return Err("f-string: empty expression not allowed".to_string());
        }
        segments.push(FStringSegment::Field {
            source: source.trim().to_string(),
            conversion,
            spec,
        });
    }

    if !literal.is_empty() {
        segments.push(FStringSegment::Literal(literal));
    }

    Ok(segments)
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
    fn test_simple_tokens() {
        let tokens = kinds("x = 1 + 2.5");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Name("x".to_string()),
                TokenKind::Eq,
                TokenKind::Int(1),
                TokenKind::Plus,
                TokenKind::Float(2.5),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("** // //= **= != == <= >> <<= ->");
        assert_eq!(tokens[0], TokenKind::DoubleStar);
        assert_eq!(tokens[1], TokenKind::DoubleSlash);
        assert_eq!(tokens[2], TokenKind::DoubleSlashEq);
        assert_eq!(tokens[3], TokenKind::DoubleStarEq);
        assert_eq!(tokens[4], TokenKind::NotEq);
        assert_eq!(tokens[5], TokenKind::EqEq);
        assert_eq!(tokens[6], TokenKind::Le);
        assert_eq!(tokens[7], TokenKind::GtGt);
        assert_eq!(tokens[8], TokenKind::LtLtEq);
        assert_eq!(tokens[9], TokenKind::Arrow);
    }

    #[test]
    fn test_indent_and_dedent() {
        let tokens = kinds("if x:\n    y\nz\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::If,
                TokenKind::Name("x".to_string()),
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Name("y".to_string()),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Name("z".to_string()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_blank_lines_and_comments_do_not_affect_indentation() {
        let tokens = kinds("def f():\n\n    # comment\n    return 1\n");
        assert!(tokens.contains(&TokenKind::Indent));
        assert_eq!(
            tokens.iter().filter(|k| **k == TokenKind::Newline).count(),
            2
        );
    }

    #[test]
    fn test_brackets_join_lines() {
        let tokens = kinds("x = [1,\n     2]\n");
        assert!(!tokens.contains(&TokenKind::Indent));
        assert_eq!(
            tokens.iter().filter(|k| **k == TokenKind::Newline).count(),
            1
        );
    }

    #[test]
    fn test_bad_dedent_is_indentation_error() {
        let err = Lexer::new("if x:\n    y\n  z\n").tokenize().unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::Indentation);
        assert_eq!(err.location.line, 3);
    }

    #[test]
    fn test_string_literals() {
        let tokens = kinds(r#"'a\nb' "it's" r'\d' """tri
ple""""#);
        assert_eq!(tokens[0], TokenKind::Str("a\nb".to_string()));
        assert_eq!(tokens[1], TokenKind::Str("it's".to_string()));
        assert_eq!(tokens[2], TokenKind::Str("\\d".to_string()));
        assert_eq!(tokens[3], TokenKind::Str("tri\nple".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("x = 'abc\n").tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        assert_eq!(err.location, SourceLocation::new(1, 5));
    }

    #[test]
    fn test_fstring_segments() {
        let tokens = kinds("f'x={x!r:>5} {{y}} {d[\"k\"]}'");
        match &tokens[0] {
            TokenKind::FString(segments) => {
                assert_eq!(segments[0], FStringSegment::Literal("x=".to_string()));
                assert_eq!(
                    segments[1],
                    FStringSegment::Field {
                        source: "x".to_string(),
                        conversion: Some('r'),
                        spec: Some(">5".to_string()),
                    }
                );
                assert_eq!(segments[2], FStringSegment::Literal(" {y} ".to_string()));
                assert!(matches!(
                    &segments[3],
                    FStringSegment::Field { source, .. } if source == "d[\"k\"]"
                ));
            }
            other => panic!("Expected f-string, got {:?}", other),
        }
    }

    #[test]
    fn test_numbers() {
        let tokens = kinds("0xff 1_000 1e3 .5 0b101");
        assert_eq!(tokens[0], TokenKind::Int(255));
        assert_eq!(tokens[1], TokenKind::Int(1000));
        assert_eq!(tokens[2], TokenKind::Float(1000.0));
        assert_eq!(tokens[3], TokenKind::Float(0.5));
        assert_eq!(tokens[4], TokenKind::Int(5));
    }

    #[test]
    fn test_int_min_magnitude() {
        let tokens = kinds("9223372036854775807 9223372036854775808 0x8000000000000000");
        assert_eq!(tokens[0], TokenKind::Int(i64::MAX));
        assert_eq!(tokens[1], TokenKind::IntMinMagnitude);
        assert_eq!(tokens[2], TokenKind::IntMinMagnitude);
        assert!(Lexer::new("9223372036854775809").tokenize().is_err());
    }

    #[test]
    fn test_dedents_emitted_at_eof() {
        let tokens = kinds("while True:\n    pass");
        let tail: Vec<_> = tokens.iter().rev().take(3).collect();
        assert_eq!(*tail[0], TokenKind::Eof);
        assert_eq!(*tail[1], TokenKind::Dedent);
        assert_eq!(*tail[2], TokenKind::Newline);
    }
}
