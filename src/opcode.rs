use std::fmt;

/// OpCode identifies a primitive. Primitives are the only code that is not
/// made of messages and blocks.
///
/// # Notes
///
/// A primitive must not evaluate code: its handler may pop and push the
/// active data stack, allocate values and mutate interface tables, and that
/// is all. `Run` and `RunCurrent` look like primitives but the loop handles
/// them itself because they create frames.
///
/// Binary opcodes pop the receiver first (pushed by the body of the behavior
/// that dispatched them) and the operand second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Pop the top of the stack
    Drop,
    /// Duplicate the top of the stack
    Dup,
    /// Exchange the two topmost values
    Swap,
    /// Copy the second value over the top one
    Over,
    /// Rotate the third value to the top
    Rot,
    /// Push the receiver that owns the running continuation
    Me,
    /// Pop a target, a behavior and a name; install the behavior and a setter
    Define,
    /// Pop a target, a name and a value; install the value under the name
    SetSlot,
    /// Pop a block and bind its definition-time parameters
    Bind,
    /// Turn an unanswered message into a value
    Fallback,
    /// Push a fresh prototype object
    Proto,
    /// Pop a value and hand its rendering to the output
    Say,
    /// Stop the owner of the active frame
    Stop,
    /// Pop two values and push whether they are the same value
    Same,
    /// Add two numbers
    Add,
    /// Subtract the operand from the receiver
    Subtract,
    /// Multiply two numbers
    Multiply,
    /// Divide the receiver by the operand
    Divide,
    /// Remainder of the receiver divided by the operand
    Remainder,
    /// Whether the receiver is less than the operand
    Less,
    /// Whether the receiver is greater than the operand
    Greater,
    /// Whether two numbers or two texts are equal
    Equal,
    /// Receiver plus one
    Increment,
    /// Receiver minus one
    Decrement,
    /// Number to text
    Format,
    /// Receiver text followed by the operand text
    Concat,
    /// Number of characters of a text
    Length,
    /// Run a block in a new frame with a fresh data stack
    Run,
    /// Run a block in a new frame sharing the caller's stack and scope
    RunCurrent,
}

impl OpCode {
    /// Every opcode, in declaration order
    pub const ALL: [OpCode; 29] = [
        Self::Drop,
        Self::Dup,
        Self::Swap,
        Self::Over,
        Self::Rot,
        Self::Me,
        Self::Define,
        Self::SetSlot,
        Self::Bind,
        Self::Fallback,
        Self::Proto,
        Self::Say,
        Self::Stop,
        Self::Same,
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Remainder,
        Self::Less,
        Self::Greater,
        Self::Equal,
        Self::Increment,
        Self::Decrement,
        Self::Format,
        Self::Concat,
        Self::Length,
        Self::Run,
        Self::RunCurrent,
    ];

    /// Return true for the opcodes the loop intercepts
    pub fn creates_frame(self) -> bool {
        matches!(self, Self::Run | Self::RunCurrent)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Drop => "drop",
            Self::Dup => "dup",
            Self::Swap => "swap",
            Self::Over => "over",
            Self::Rot => "rot",
            Self::Me => "me",
            Self::Define => "define",
            Self::SetSlot => "set-slot",
            Self::Bind => "bind",
            Self::Fallback => "fallback",
            Self::Proto => "proto",
            Self::Say => "say",
            Self::Stop => "stop",
            Self::Same => "same?",
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Remainder => "remainder",
            Self::Less => "less",
            Self::Greater => "greater",
            Self::Equal => "equal",
            Self::Increment => "increment",
            Self::Decrement => "decrement",
            Self::Format => "format",
            Self::Concat => "concat",
            Self::Length => "length",
            Self::Run => "run",
            Self::RunCurrent => "run/current",
        };
        write!(f, "{}", name)
    }
}
