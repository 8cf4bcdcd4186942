use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    bind, intern, parse, Error, Frame, Handle, Heap, Kind, Library, Name, OpCode, RuntimeError,
    ScopedMessage, GC_THRESHOLD,
};

/// We're limiting the number of nested frames, each `run` adds one
pub const MAX_FRAMES: usize = 1024;

/// We're limiting the number of pending continuations of one frame, deep
/// recursion through messages grows this
pub const MAX_CONTINUATIONS: usize = 1 << 16;

/// What a message search does when it meets a does-not-understand hook
/// before finding the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// The nearest hook handles the message and the search stops
    FirstOnly,
    /// Every hook met on the way is scheduled and the search goes on until
    /// the message is found or the chain ends
    Accumulate,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::FirstOnly
    }
}

/// Virtual machine settings
#[derive(Debug, Clone)]
pub struct Config {
    /// How fallback hooks take part in message search
    pub fallback: FallbackPolicy,
    /// Maximum number of nested frames
    pub max_frames: usize,
    /// Maximum number of pending continuations in one frame
    pub max_continuations: usize,
    /// Allocations between two collections, at least
    pub gc_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::default(),
            max_frames: MAX_FRAMES,
            max_continuations: MAX_CONTINUATIONS,
            gc_threshold: GC_THRESHOLD,
        }
    }
}

/// Where `say` sends its lines
pub trait Output: fmt::Debug {
    /// Receive one rendered value
    fn say(&mut self, line: &str);
}

impl Output for std::io::Stdout {
    fn say(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// An output keeping every line, cloned handles share the same lines.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Rc<RefCell<Vec<String>>>);

impl Transcript {
    /// Lines said so far
    pub fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl Output for Transcript {
    fn say(&mut self, line: &str) {
        self.0.borrow_mut().push(line.to_string());
    }
}

/// What the loop does with the next item of a block
enum Step {
    Enter,
    Primitive(OpCode),
    Dispatch(Name),
    Push,
    Skip,
}

/// A virtual machine walking message trees
#[derive(Debug)]
pub struct VM {
    pub(crate) heap: Heap,
    pub(crate) lib: Library,
    config: Config,
    pub(crate) out: Box<dyn Output>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) stacks: Vec<Vec<Handle>>,
    pub(crate) scopes: Vec<Vec<Handle>>,
}

impl Default for VM {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl VM {
    /// Create a virtual machine printing to stdout.
    pub fn new(config: Config) -> Self {
        let mut heap = Heap::new(config.gc_threshold);
        let lib = Library::new(&mut heap);
        Self {
            heap,
            lib,
            config,
            out: Box::new(std::io::stdout()),
            frames: Vec::new(),
            stacks: Vec::new(),
            scopes: Vec::new(),
        }
    }

    /// Send the lines of `say` somewhere else.
    pub fn with_output<O: Output + 'static>(mut self, out: O) -> Self {
        self.out = Box::new(out);
        self
    }

    /// The heap holding every value
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable access to the heap, to prepare values before a run
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// The shared vocabulary
    pub fn library(&self) -> &Library {
        &self.lib
    }

    /// Human readable form of a value
    pub fn render(&self, h: Handle) -> String {
        self.heap.render(h)
    }

    /// Allocate a number answering the arithmetic messages, to seed the
    /// stack of a run.
    pub fn number(&mut self, n: f64) -> Handle {
        self.lib.number(&mut self.heap, n)
    }

    /// Allocate a text answering the text messages.
    pub fn text(&mut self, s: &str) -> Handle {
        self.lib.text(&mut self.heap, s)
    }

    /// Parse source code and allocate it as the toplevel block.
    pub fn load(&mut self, src: &str) -> Result<Handle, Error> {
        Ok(parse(src)?.load(&mut self.heap))
    }

    /// Parse and run source code, returning the data stack left over.
    ///
    /// # Examples
    ///
    /// ```
    /// use rproto::VM;
    ///
    /// let mut vm = VM::default();
    /// let stack = vm.interpret("3 5 [ - ]").unwrap();
    /// assert_eq!(vm.heap().number(stack[0]), Some(2.0));
    /// ```
    pub fn interpret(&mut self, src: &str) -> Result<Vec<Handle>, Error> {
        let block = self.load(src)?;
        Ok(self.run(block, Vec::new())?)
    }

    /// Run a block to exhaustion, or until it is stopped, on top of the
    /// given data stack and against a fresh base object.
    ///
    /// Handles in the returned stack stay valid until the next run collects.
    pub fn run(
        &mut self,
        block: Handle,
        stack: Vec<Handle>,
    ) -> Result<Vec<Handle>, RuntimeError> {
        self.frames.clear();
        self.stacks.clear();
        self.scopes.clear();

        let base = self.lib.base(&mut self.heap);
        self.stacks.push(stack);
        self.scopes.push(vec![base]);
        self.heap[block].stopped = false;
        let result = bind::activate(&mut self.heap, block, &mut self.stacks[0]).and_then(|entry| {
            self.frames.push(Frame {
                owner: block,
                stack: 0,
                scope: 0,
                conts: vec![ScopedMessage::new(entry, 0, false)],
                isolated: true,
            });
            self.execute()
        });
        if result.is_err() {
            self.frames.clear();
            self.stacks.clear();
            self.scopes.clear();
        }
        result
    }

    /// Reclaim every value the running frames and the library can not
    /// reach. Outside of a run only the library survives.
    pub fn collect_garbage(&mut self) -> usize {
        let frames = self
            .frames
            .iter()
            .flat_map(|f| std::iter::once(f.owner).chain(f.conts.iter().map(|c| c.block)));
        let roots: Vec<Handle> = self
            .lib
            .roots()
            .chain(frames)
            .chain(self.stacks.iter().flatten().copied())
            .chain(self.scopes.iter().flatten().copied())
            .collect();
        self.heap.collect(roots)
    }

    /// Drive the frame stack until the toplevel frame finishes.
    fn execute(&mut self) -> Result<Vec<Handle>, RuntimeError> {
        loop {
            if self.heap.should_collect() {
                self.collect_garbage();
            }

            let frame = self
                .frames
                .last_mut()
                .expect("Should have returned when there's no frame left");
            if self.heap[frame.owner].stopped {
                if let Some(result) = self.unwind() {
                    return Ok(result);
                }
                continue;
            }

            let cont = frame
                .conts
                .last_mut()
                .expect("A frame is popped as soon as its last continuation is.");
            let content = &self.heap[cont.block].content;
            if cont.cursor == content.len() {
                let done = frame.conts.pop().expect("Checked above");
                if done.scope_pop {
                    self.scopes[frame.scope].pop();
                }
                if frame.conts.is_empty() {
                    if let Some(result) = self.finish_frame() {
                        return Ok(result);
                    }
                }
                continue;
            }
            let item = content[cont.cursor];
            cont.cursor += 1;
            let scope_index = cont.scope_index;

            #[cfg(debug_assertions)]
            self.trace(item);

            let value = &self.heap[item];
            let step = match value.kind {
                Kind::Block => Step::Enter,
                Kind::Primitive(op) => Step::Primitive(op),
                Kind::Message(_) if value.null_message => Step::Skip,
                Kind::Message(name) => Step::Dispatch(name),
                _ => Step::Push,
            };
            match step {
                Step::Enter => self.enter_marker(item)?,
                Step::Primitive(op) if op.creates_frame() => self.spawn(op)?,
                Step::Primitive(op) => self.primitive(op)?,
                Step::Dispatch(name) => self.dispatch(item, name, scope_index)?,
                Step::Push => self.push(item),
                Step::Skip => {}
            }
        }
    }

    /// A literal block in the content: the top of the stack becomes the
    /// receiver of the block.
    fn enter_marker(&mut self, marker: Handle) -> Result<(), RuntimeError> {
        let receiver = self.pop()?;
        let scope = self.scope_mut();
        scope.push(receiver);
        let index = scope.len() - 1;
        match self.heap[receiver].on_entry {
            Some(hook) => {
                self.enter(hook, index, true)?;
                self.push(marker);
            }
            None => self.enter(marker, index, true)?,
        }
        Ok(())
    }

    /// Walk the scope chain outward from `scope_index` looking for a
    /// receiver that answers the message.
    fn dispatch(
        &mut self,
        message: Handle,
        name: Name,
        scope_index: usize,
    ) -> Result<(), RuntimeError> {
        let scope = self.frame().scope;
        let mut answered = false;
        for i in (0..=scope_index).rev() {
            let receiver = self.scopes[scope][i];
            if let Some(behavior) = self.heap.lookup(receiver, name) {
                self.enter(behavior, i, false)?;
                answered = true;
                break;
            }
            if let Some(hook) = self.heap[receiver].fallback {
                self.push(message);
                self.enter(hook, i, false)?;
                answered = true;
                if self.config.fallback == FallbackPolicy::FirstOnly {
                    break;
                }
            }
        }
        if answered {
            Ok(())
        } else {
            Err(RuntimeError::NotUnderstood(intern::str(name)))
        }
    }

    /// Push a continuation over a block, binding its activation-time
    /// parameters against the active data stack first.
    fn enter(
        &mut self,
        block: Handle,
        scope_index: usize,
        scope_pop: bool,
    ) -> Result<(), RuntimeError> {
        let frame = self
            .frames
            .last_mut()
            .expect("There's always a frame while running.");
        if frame.conts.len() >= self.config.max_continuations {
            return Err(RuntimeError::StackOverflow);
        }
        let bound = bind::activate(&mut self.heap, block, &mut self.stacks[frame.stack])?;
        frame.conts.push(ScopedMessage::new(bound, scope_index, scope_pop));
        Ok(())
    }

    /// Start a new frame for `run` or `run/current`. The frame starts from
    /// the innermost receiver of the caller's chain.
    fn spawn(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        let block = self.pop()?;
        if !self.heap[block].is_block() {
            return Err(RuntimeError::TypeMismatch {
                expected: "block",
                found: self.render(block),
            });
        }
        if self.frames.len() >= self.config.max_frames {
            return Err(RuntimeError::StackOverflow);
        }
        self.heap[block].stopped = false;
        let (stack, scope) = {
            let caller = self.frame();
            (caller.stack, caller.scope)
        };
        let innermost = self.scopes[scope].len() - 1;
        let bound = bind::activate(&mut self.heap, block, &mut self.stacks[stack])?;
        let frame = if op == OpCode::Run {
            let chain = self.scopes[scope].clone();
            self.stacks.push(Vec::new());
            self.scopes.push(chain);
            Frame {
                owner: block,
                stack: self.stacks.len() - 1,
                scope: self.scopes.len() - 1,
                conts: vec![ScopedMessage::new(bound, innermost, false)],
                isolated: true,
            }
        } else {
            Frame {
                owner: block,
                stack,
                scope,
                conts: vec![ScopedMessage::new(bound, innermost, false)],
                isolated: false,
            }
        };
        log::debug!(
            "{} {} at depth {}",
            op,
            self.render(block),
            self.frames.len() + 1
        );
        self.frames.push(frame);
        Ok(())
    }

    /// Abandon the active frame because its owner was stopped.
    fn unwind(&mut self) -> Option<Vec<Handle>> {
        let frame = self
            .frames
            .last_mut()
            .expect("There's always a frame while running.");
        log::debug!("stopping {}", self.heap.render(frame.owner));
        self.heap[frame.owner].stopped = false;
        let scope = frame.scope;
        for cont in frame.conts.drain(..) {
            if cont.scope_pop {
                self.scopes[scope].pop();
            }
        }
        self.finish_frame()
    }

    /// Pop the active frame, merging its stack into its caller's when it was
    /// isolated. Returns the final stack once the toplevel frame is done.
    fn finish_frame(&mut self) -> Option<Vec<Handle>> {
        let frame = self
            .frames
            .pop()
            .expect("There's always a frame while running.");
        log::debug!(
            "finished {} at depth {}",
            self.heap.render(frame.owner),
            self.frames.len() + 1
        );
        if !frame.isolated {
            return None;
        }
        let leftover = self.stacks.pop().expect("An isolated frame owns a stack.");
        self.scopes.pop();
        match self.frames.last() {
            Some(caller) => {
                self.stacks[caller.stack].extend(leftover);
                None
            }
            None => Some(leftover),
        }
    }

    pub(crate) fn frame(&self) -> &Frame {
        self.frames
            .last()
            .expect("There's always a frame while running.")
    }

    /// The receiver owning the running continuation.
    pub(crate) fn receiver(&self) -> Handle {
        let frame = self.frame();
        self.scopes[frame.scope][frame.cont().scope_index]
    }

    fn scope_mut(&mut self) -> &mut Vec<Handle> {
        let scope = self.frame().scope;
        &mut self.scopes[scope]
    }

    pub(crate) fn stack_mut(&mut self) -> &mut Vec<Handle> {
        let stack = self.frame().stack;
        &mut self.stacks[stack]
    }

    pub(crate) fn push(&mut self, val: Handle) {
        self.stack_mut().push(val);
    }

    pub(crate) fn pop(&mut self) -> Result<Handle, RuntimeError> {
        self.stack_mut().pop().ok_or(RuntimeError::StackUnderflow)
    }

    #[cfg(debug_assertions)]
    fn trace(&self, item: Handle) {
        if log::log_enabled!(log::Level::Trace) {
            let frame = self.frame();
            let stack: Vec<_> = self.stacks[frame.stack]
                .iter()
                .map(|h| self.render(*h))
                .collect();
            log::trace!(
                "{:>3} {:>3} {:<16} [ {} ]",
                self.frames.len(),
                frame.conts.len(),
                self.render(item),
                stack.join(" ")
            );
        }
    }
}
