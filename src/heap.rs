use std::ops::{Index, IndexMut};

use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::{intern, Handle, Kind, Name, NumberFmt, Value};

/// Number of allocations before the first collection is considered
pub const GC_THRESHOLD: usize = 1 << 14;

/// An arena of values addressed by [`Handle`].
///
/// Values refer to each other through handles only, so cyclic graphs (an
/// object whose interface returns the object itself, linked nodes pointing
/// up and down) need no special care. Unreachable values are reclaimed by
/// [`Heap::collect`], a mark & sweep over the handles the caller names as
/// roots.
#[derive(Debug)]
pub struct Heap {
    slots: Vec<Option<Value>>,
    free: Vec<u32>,
    next_ordinal: u64,
    live: usize,
    since_collect: usize,
    threshold: usize,
    initial_threshold: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(GC_THRESHOLD)
    }
}

impl Heap {
    /// Create an empty heap that asks for a collection after `threshold`
    /// allocations.
    pub fn new(threshold: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            next_ordinal: 0,
            live: 0,
            since_collect: 0,
            threshold,
            initial_threshold: threshold,
        }
    }

    /// Move a value into the heap, stamping it with the next identity ordinal.
    pub fn alloc(&mut self, mut value: Value) -> Handle {
        self.next_ordinal += 1;
        value.ordinal = self.next_ordinal;
        self.live += 1;
        self.since_collect += 1;
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx as usize] = Some(value);
                Handle(idx)
            }
            None => {
                self.slots.push(Some(value));
                Handle(self.slots.len() as u32 - 1)
            }
        }
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.live
    }

    /// Return true if nothing was allocated or everything was reclaimed
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Find the behavior the receiver's own interface holds for a name.
    pub fn lookup(&self, receiver: Handle, name: Name) -> Option<Handle> {
        self[receiver].interface.get(&name).copied()
    }

    /// The number payload of a value, if it is a number
    pub fn number(&self, h: Handle) -> Option<f64> {
        self[h].as_number()
    }

    /// The text payload of a value, if it is a text
    pub fn text(&self, h: Handle) -> Option<&str> {
        self[h].as_text()
    }

    /// Human readable form of a value, as `say` prints it.
    pub fn render(&self, h: Handle) -> String {
        let value = &self[h];
        match &value.kind {
            Kind::Number(n) => NumberFmt(*n).to_string(),
            Kind::Text(s) => s.clone(),
            Kind::Message(name) => intern::str(*name),
            Kind::Block if value.content.is_empty() => "[ ]".to_string(),
            Kind::Block => format!(
                "[ {} ]",
                value.content.iter().map(|item| self.render(*item)).join(" ")
            ),
            Kind::Primitive(op) => format!("<primitive {}>", op),
            Kind::Object => format!("<object #{}>", value.ordinal),
        }
    }

    /// Return true once enough allocations happened since the last
    /// collection.
    pub fn should_collect(&self) -> bool {
        self.since_collect >= self.threshold
    }

    /// Every handle reachable from the roots, roots included.
    pub fn trace<I>(&self, roots: I) -> FxHashSet<Handle>
    where
        I: IntoIterator<Item = Handle>,
    {
        let mut marked = FxHashSet::default();
        let mut gray: Vec<Handle> = roots.into_iter().collect();
        while let Some(h) = gray.pop() {
            if !marked.insert(h) {
                continue;
            }
            let value = &self[h];
            gray.extend(value.content.iter().copied());
            gray.extend(value.interface.values().copied());
            gray.extend(value.on_entry);
            gray.extend(value.fallback);
        }
        marked
    }

    /// Reclaim every value that the roots can not reach and return how many
    /// were freed.
    pub fn collect<I>(&mut self, roots: I) -> usize
    where
        I: IntoIterator<Item = Handle>,
    {
        let marked = self.trace(roots);
        let mut freed = 0;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !marked.contains(&Handle(idx as u32)) {
                *slot = None;
                self.free.push(idx as u32);
                freed += 1;
            }
        }
        self.live -= freed;
        self.since_collect = 0;
        self.threshold = self.initial_threshold.max(self.live * 2);
        log::debug!("collected {} values, {} live", freed, self.live);
        freed
    }
}

impl Index<Handle> for Heap {
    type Output = Value;

    fn index(&self, h: Handle) -> &Self::Output {
        self.slots[h.index()]
            .as_ref()
            .expect("Handles are only held while reachable.")
    }
}

impl IndexMut<Handle> for Heap {
    fn index_mut(&mut self, h: Handle) -> &mut Self::Output {
        self.slots[h.index()]
            .as_mut()
            .expect("Handles are only held while reachable.")
    }
}
