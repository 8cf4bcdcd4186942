use std::fmt;

use rustc_hash::FxHashMap;

use crate::{Name, OpCode};

/// A reference to a value living in the [`Heap`](crate::Heap).
///
/// Handles are cheap to copy and compare. Two handles are equal exactly when
/// they name the same value, values are never equal by content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub(crate) u32);

impl Handle {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The dispatch table of a value, mapping message names to behavior blocks
pub type Interface = FxHashMap<Name, Handle>;

/// What a value is, along with its payload.
#[derive(Debug, Clone)]
pub enum Kind {
    /// An immutable number
    Number(f64),
    /// An immutable text
    Text(String),
    /// A message token, dispatched against the scope chain when executed
    Message(Name),
    /// A sequence of values, executed item by item
    Block,
    /// A primitive opcode
    Primitive(OpCode),
    /// A plain object, pushed as is when executed
    Object,
}

/// Every runtime entity has this one shape; the kind decides which fields
/// are meaningful.
#[derive(Debug, Clone)]
pub struct Value {
    /// Tag and payload
    pub kind: Kind,
    /// Identity ordinal, strictly increasing over the lifetime of a heap
    pub ordinal: u64,
    /// Body of a block, or the substituted content of a bound message
    pub content: Vec<Handle>,
    /// Messages this value answers when it is a receiver
    pub interface: Interface,
    /// Run when this value becomes a receiver through a block-marker
    pub on_entry: Option<Handle>,
    /// Run when no scope entry answers a message
    pub fallback: Option<Handle>,
    /// Set by `stop`, checked by the loop against the owner of a frame
    pub stopped: bool,
    /// An inert message, the site that declared a parameter
    pub null_message: bool,
}

impl Value {
    /// Create a value of the given kind with every other field empty.
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            ordinal: 0,
            content: Vec::new(),
            interface: Interface::default(),
            on_entry: None,
            fallback: None,
            stopped: false,
            null_message: false,
        }
    }

    /// Create a block with the given body.
    pub fn block(content: Vec<Handle>) -> Self {
        Self {
            content,
            ..Self::new(Kind::Block)
        }
    }

    /// Return true if this is a block
    pub fn is_block(&self) -> bool {
        matches!(self.kind, Kind::Block)
    }

    /// Return true if this is a message
    pub fn is_message(&self) -> bool {
        matches!(self.kind, Kind::Message(_))
    }

    /// The number payload, if any
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            Kind::Number(n) => Some(n),
            _ => None,
        }
    }

    /// The text payload, if any
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            Kind::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the kind, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            Kind::Number(_) => "number",
            Kind::Text(_) => "text",
            Kind::Message(_) => "message",
            Kind::Block => "block",
            Kind::Primitive(_) => "primitive",
            Kind::Object => "object",
        }
    }
}

/// Number formatted the way `say` prints it, integral values lose their
/// fractional part.
#[derive(Debug, Clone, Copy)]
pub struct NumberFmt(pub f64);

impl fmt::Display for NumberFmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        if n.is_finite() && n.trunc().eq(&n) {
            write!(f, "{:.0}", n)
        } else {
            write!(f, "{}", n)
        }
    }
}
