/// A source token. We don't eagerly evaluate the value of a literal, numbers
/// and quoted texts stay words until the base fallback converts them at run
/// time.
#[derive(Debug)]
pub struct Token {
    /// Token type
    pub typ: Type,
    /// The string segment in source that represents this token.
    ///
    /// # Notes
    ///
    /// Quoted texts keep their quotes, the fallback strips them when the
    /// message is finally dispatched.
    pub lexeme: String,
    /// The position at which this token was found in source.
    pub pos: Position,
}

/// Token types
#[derive(Debug, PartialEq, Eq)]
pub enum Type {
    /// Standalone '[' opening a block
    LBracket,
    /// Standalone ']' closing a block
    RBracket,
    /// Any whitespace separated word
    Word,
    /// Double-quoted text, whitespace included
    Text,
    /// End of source
    Eof,
}

/// Position of the token in source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Current line in source file
    pub line: usize,
    /// Current column in source file
    pub column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {}:{}]", self.line, self.column)
    }
}

impl Position {
    /// Increment the line count by one and reset the column count
    pub fn next_line(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    /// Increment the column count by one
    pub fn next_column(&mut self) {
        self.column += 1;
    }
}
