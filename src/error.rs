use std::fmt;

use crate::Position;

/// Virtual machine errors
#[derive(Debug)]
pub enum RuntimeError {
    /// Too many frames or continuations
    StackOverflow,
    /// Pop on an empty stack
    StackUnderflow,
    /// A message that no scope answers and that the fallback can not turn
    /// into a value
    NotUnderstood(String),
    /// A value that is not a message reached a fallback hook
    NotAMessage(String),
    /// An opcode got an operand of the wrong kind
    TypeMismatch {
        /// The kind the opcode needs
        expected: &'static str,
        /// Rendering of the offending value
        found: String,
    },
}

/// Error while grouping tokens into blocks
#[derive(Debug)]
pub enum ParseError {
    /// A `]` without a matching `[`
    UnexpectedClose(Position),
    /// A `[` that is never closed
    UnclosedBlock(Position),
}

/// Error while scanning source code
#[derive(Debug, Clone)]
pub enum ScanError {
    /// A text literal is unterminated
    UnterminatedText(Position),
    /// A `![` comment is unterminated
    UnterminatedComment(Position),
}

/// Errors surfaced by the virtual machine
#[derive(Debug)]
pub enum Error {
    /// A scanning error happened
    Scan(ScanError),
    /// A parsing error happened
    Parse(ParseError),
    /// A runtime error happened
    Runtime(RuntimeError),
}

impl std::error::Error for RuntimeError {}
impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Self::StackOverflow => {
                write!(f, "Virtual machine's stack overflows.")
            }
            Self::StackUnderflow => {
                write!(f, "Virtual machine's stack underflows.")
            }
            Self::NotUnderstood(msg) => {
                write!(f, "Message '{}' is not understood.", msg)
            }
            Self::NotAMessage(val) => {
                write!(f, "Can not interpret {} as a message.", val)
            }
            Self::TypeMismatch { expected, found } => {
                write!(f, "Operand must be a {}, got {}.", expected, found)
            }
        }
    }
}

impl std::error::Error for ParseError {}
impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedClose(p) => write!(f, "{} Error at ']': Nothing to close.", p),
            Self::UnclosedBlock(p) => write!(f, "{} Error at '[': Block is never closed.", p),
        }
    }
}

impl std::error::Error for ScanError {}
impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedText(pos) => write!(f, "{} Error: Unterminated text.", pos),
            Self::UnterminatedComment(pos) => write!(f, "{} Error: Unterminated comment.", pos),
        }
    }
}

impl std::error::Error for Error {}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        match self {
            Self::Scan(err) => write!(f, "{}", err),
            Self::Parse(err) => write!(f, "{}", err),
            Self::Runtime(err) => write!(f, "{}", err),
        }
    }
}

impl From<ScanError> for Error {
    fn from(err: ScanError) -> Self {
        Self::Scan(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<RuntimeError> for Error {
    fn from(err: RuntimeError) -> Self {
        Self::Runtime(err)
    }
}
