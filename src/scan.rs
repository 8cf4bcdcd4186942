use crate::{
    token::{self, Token},
    Position, ScanError,
};

/// Scanner reads characters from the source code and groups them in to
/// a sequence of tokens.
#[derive(Debug)]
pub struct Scanner {
    src: Vec<char>,
    start: usize,
    current: usize,
    pos: Position,
}

impl Scanner {
    /// Create a new scanner
    pub fn new(src: &str) -> Self {
        let src = src.chars().collect();
        Self {
            src,
            start: 0,
            current: 0,
            pos: Default::default(),
        }
    }

    /// Consume and return the next token from source.
    ///
    /// # Examples
    ///
    /// ```
    /// use rproto::{Scanner, Type};
    ///
    /// let mut s = Scanner::new(r#"[ "a b" ]"#);
    /// assert_eq!(s.scan().unwrap().typ, Type::LBracket);
    /// assert_eq!(s.scan().unwrap().lexeme, "\"a b\"");
    /// assert_eq!(s.scan().unwrap().typ, Type::RBracket);
    /// assert_eq!(s.scan().unwrap().typ, Type::Eof);
    /// ```
    pub fn scan(&mut self) -> Result<Token, ScanError> {
        self.skip_whitespace()?;
        self.start = self.current;
        let pos = self.pos;
        if self.is_source_end() {
            return Ok(self.token(token::Type::Eof, pos));
        }
        if self.peek() == '"' {
            return self.text(pos);
        }
        while !self.is_source_end() && !self.peek().is_whitespace() {
            self.advance();
        }
        let typ = match &self.src[self.start..self.current] {
            ['['] => token::Type::LBracket,
            [']'] => token::Type::RBracket,
            _ => token::Type::Word,
        };
        Ok(self.token(typ, pos))
    }

    fn text(&mut self, pos: Position) -> Result<Token, ScanError> {
        self.advance();
        while self.peek() != '"' && !self.is_source_end() {
            self.advance();
        }

        if self.is_source_end() {
            return Err(ScanError::UnterminatedText(pos));
        }
        self.advance();
        Ok(self.token(token::Type::Text, pos))
    }

    fn token(&self, typ: token::Type, pos: Position) -> Token {
        Token {
            typ,
            lexeme: self.src[self.start..self.current].iter().cloned().collect(),
            pos,
        }
    }

    fn skip_whitespace(&mut self) -> Result<(), ScanError> {
        loop {
            match self.peek() {
                c if c.is_whitespace() => {
                    self.advance();
                }
                '!' if self.peek_next() == '[' && self.is_word_end(2) => self.comment()?,
                _ => return Ok(()),
            }
        }
    }

    /// Skip a bracket balanced `![ ... ]` comment.
    fn comment(&mut self) -> Result<(), ScanError> {
        let pos = self.pos;
        self.advance();
        self.advance();
        let mut depth = 1;
        while depth > 0 {
            if self.is_source_end() {
                return Err(ScanError::UnterminatedComment(pos));
            }
            match self.advance() {
                '[' => depth += 1,
                ']' => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    /// Whether the word starting at the current character ends after `len`
    /// characters.
    fn is_word_end(&self, len: usize) -> bool {
        self.src
            .get(self.current + len)
            .map_or(true, |c| c.is_whitespace())
    }

    fn peek(&self) -> char {
        if self.is_source_end() {
            '\0'
        } else {
            self.src[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.is_source_end() || self.current + 1 >= self.src.len() {
            '\0'
        } else {
            self.src[self.current + 1]
        }
    }

    fn advance(&mut self) -> char {
        let c = self.src[self.current];
        if c == '\n' {
            self.pos.next_line();
        } else {
            self.pos.next_column();
        }
        self.current += 1;
        c
    }

    fn is_source_end(&self) -> bool {
        self.current >= self.src.len()
    }
}
