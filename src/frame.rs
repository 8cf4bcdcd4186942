use crate::Handle;

/// A suspended position inside a block.
#[derive(Debug, Clone, Copy)]
pub struct ScopedMessage {
    /// The block being walked
    pub block: Handle,
    /// Index of the next item, only ever moves forward
    pub cursor: usize,
    /// Where message lookups from this block start on the scope chain
    pub scope_index: usize,
    /// Whether finishing this block pops one scope entry
    pub scope_pop: bool,
}

impl ScopedMessage {
    /// Start at the beginning of a block.
    pub fn new(block: Handle, scope_index: usize, scope_pop: bool) -> Self {
        Self {
            block,
            cursor: 0,
            scope_index,
            scope_pop,
        }
    }
}

/// Explicit execution state of one `run`, replacing the host call stack.
///
/// The data stack and the scope chain are indices into the pools of the
/// virtual machine: an isolated frame owns the topmost entry of both pools,
/// a shared frame points at its caller's.
#[derive(Debug)]
pub struct Frame {
    /// The block this frame runs; stopping it unwinds the frame
    pub owner: Handle,
    /// Index of the data stack in the stack pool
    pub stack: usize,
    /// Index of the scope chain in the scope pool
    pub scope: usize,
    /// Pending continuations, innermost last
    pub conts: Vec<ScopedMessage>,
    /// Whether the frame owns its stack and scope chain, and merges its
    /// leftover stack into its caller's when done
    pub isolated: bool,
}

impl Frame {
    /// The innermost pending continuation
    pub fn cont(&self) -> &ScopedMessage {
        self.conts
            .last()
            .expect("A frame is popped as soon as its last continuation is.")
    }
}
