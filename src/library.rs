use crate::{intern, parse, Handle, Heap, Kind, Name, NumberFmt, OpCode, Value};

/// Source of the `stack` word, written in the language itself.
const STACK_SOURCE: &str = include_str!("stack.rp");

/// Prototypes and vocabulary shared by every run of a virtual machine.
///
/// Everything here is built out of ordinary values: booleans are two objects
/// whose interfaces pick a passthrough or a mute object, numbers and texts
/// carry interfaces that embed their own value in front of a primitive. Base
/// objects and prototypes get their behaviors by copying handles, there is
/// no lookup through a parent.
#[derive(Debug)]
pub struct Library {
    prims: Vec<Handle>,
    words: Vec<(Name, Handle)>,
    fallback: Handle,
    define: Handle,
    me: Handle,
    run: Handle,
    run_current: Handle,
    truth: [Handle; 2],
    names: Names,
    roots: Vec<Handle>,
}

/// Interned names the builders use over and over.
#[derive(Debug)]
struct Names {
    define: Name,
    me: Name,
    run: Name,
    run_current: Name,
    number_ops: Vec<(Name, OpCode)>,
    text_ops: Vec<(Name, OpCode)>,
    as_string: Name,
}

impl Names {
    fn new() -> Self {
        let ops = |table: &[(&str, OpCode)]| {
            table
                .iter()
                .map(|(name, op)| (intern::id(name), *op))
                .collect()
        };
        Self {
            define: intern::id(";"),
            me: intern::id("me"),
            run: intern::id("run"),
            run_current: intern::id("run/current"),
            number_ops: ops(&[
                ("+", OpCode::Add),
                ("-", OpCode::Subtract),
                ("*", OpCode::Multiply),
                ("/", OpCode::Divide),
                ("%", OpCode::Remainder),
                ("<", OpCode::Less),
                (">", OpCode::Greater),
                ("=", OpCode::Equal),
                ("1+", OpCode::Increment),
                ("1-", OpCode::Decrement),
                ("as-string", OpCode::Format),
            ]),
            text_ops: ops(&[
                ("+", OpCode::Concat),
                ("=", OpCode::Equal),
                ("length", OpCode::Length),
            ]),
            as_string: intern::id("as-string"),
        }
    }
}

impl Library {
    /// Allocate the shared vocabulary in the heap.
    pub fn new(heap: &mut Heap) -> Self {
        let mut roots = Vec::new();
        let mut keep = |h: Handle| {
            roots.push(h);
            h
        };

        let prims: Vec<_> = OpCode::ALL
            .iter()
            .map(|op| keep(heap.alloc(Value::new(Kind::Primitive(*op)))))
            .collect();
        let prim = |op: OpCode| prims[op as usize];
        let mut block =
            |heap: &mut Heap, content: Vec<Handle>| keep(heap.alloc(Value::block(content)));

        let define = block(heap, vec![prim(OpCode::Me), prim(OpCode::Define)]);
        let me = block(heap, vec![prim(OpCode::Me)]);
        let run = block(heap, vec![prim(OpCode::Me), prim(OpCode::Run)]);
        let run_current = block(heap, vec![prim(OpCode::Me), prim(OpCode::RunCurrent)]);
        let fallback = block(heap, vec![prim(OpCode::Fallback)]);

        let nothing = heap.alloc(Value::new(Kind::Object));
        let f = heap.alloc(Value::new(Kind::Object));
        let t = heap.alloc(Value::new(Kind::Object));

        let mut console = Value::new(Kind::Object);
        console
            .interface
            .insert(intern::id("say"), block(heap, vec![prim(OpCode::Say)]));
        let console = heap.alloc(console);

        let mut definer = Value::new(Kind::Object);
        definer.on_entry = Some(block(heap, vec![prim(OpCode::Bind)]));
        let definer = heap.alloc(definer);

        let stack = parse(STACK_SOURCE)
            .expect("The stack word is valid source.")
            .load(heap);

        let mut words = Vec::new();
        for op in &[
            OpCode::Drop,
            OpCode::Dup,
            OpCode::Swap,
            OpCode::Over,
            OpCode::Rot,
            OpCode::Proto,
            OpCode::Stop,
            OpCode::Same,
            OpCode::Run,
            OpCode::RunCurrent,
        ] {
            words.push((intern::id(op.to_string()), block(heap, vec![prim(*op)])));
        }
        for (name, value) in &[
            ("true", t),
            ("false", f),
            ("nothing", nothing),
            ("console", console),
            (":", definer),
        ] {
            words.push((intern::id(name), block(heap, vec![*value])));
        }
        words.push((intern::id(";"), define));
        words.push((intern::id("me"), me));
        words.push((intern::id("stack"), keep(stack)));

        let lib = Self {
            prims,
            words,
            fallback,
            define,
            me,
            run,
            run_current,
            truth: [f, t],
            names: Names::new(),
            roots,
        };
        lib.booleans(heap);
        lib
    }

    /// Fill the interfaces of `true` and `false`.
    fn booleans(&self, heap: &mut Heap) {
        let [f, t] = self.truth;
        let passthrough = heap.alloc(Value::new(Kind::Object));
        let mut mute = Value::new(Kind::Object);
        mute.on_entry = Some(heap.alloc(Value::block(vec![self.prim(OpCode::Drop)])));
        let mute = heap.alloc(mute);

        for &(this, other, value) in &[(t, f, true), (f, t, false)] {
            let (then, otherwise) = if value {
                (passthrough, mute)
            } else {
                (mute, passthrough)
            };
            let drop = self.prim(OpCode::Drop);
            let shown = self.text(heap, &value.to_string());
            let table = vec![
                ("if", vec![then]),
                ("else", vec![otherwise]),
                ("and", if value { vec![] } else { vec![drop, f] }),
                ("or", if value { vec![drop, t] } else { vec![] }),
                ("not", vec![other]),
                ("as-bool", vec![this]),
                ("as-string", vec![shown]),
            ];
            for (name, body) in table {
                let body = heap.alloc(Value::block(body));
                heap[this].interface.insert(intern::id(name), body);
            }
        }
    }

    /// Handles that must survive every collection.
    pub fn roots(&self) -> impl Iterator<Item = Handle> + '_ {
        self.roots.iter().copied().chain(self.truth.iter().copied())
    }

    /// The shared value of a primitive opcode
    pub fn prim(&self, op: OpCode) -> Handle {
        self.prims[op as usize]
    }

    /// The `true` or `false` object
    pub fn boolean(&self, value: bool) -> Handle {
        self.truth[value as usize]
    }

    /// A fresh base object, the root of every scope chain.
    pub fn base(&self, heap: &mut Heap) -> Handle {
        let mut base = Value::new(Kind::Object);
        base.interface.extend(self.words.iter().copied());
        base.fallback = Some(self.fallback);
        heap.alloc(base)
    }

    /// A blank object answering `;` and `me`.
    pub fn proto(&self, heap: &mut Heap) -> Handle {
        let mut proto = Value::new(Kind::Object);
        proto.interface.insert(self.names.define, self.define);
        proto.interface.insert(self.names.me, self.me);
        heap.alloc(proto)
    }

    /// A block that can be run as a value, answering `run` and
    /// `run/current`.
    pub fn closure(&self, heap: &mut Heap, content: Vec<Handle>) -> Handle {
        let mut closure = Value::block(content);
        closure.interface.insert(self.names.run, self.run);
        closure
            .interface
            .insert(self.names.run_current, self.run_current);
        heap.alloc(closure)
    }

    /// A number whose interface embeds the number itself.
    pub fn number(&self, heap: &mut Heap, n: f64) -> Handle {
        let h = heap.alloc(Value::new(Kind::Number(n)));
        self.embed(heap, h, &self.names.number_ops);
        h
    }

    /// A text whose interface embeds the text itself.
    pub fn text(&self, heap: &mut Heap, s: &str) -> Handle {
        let h = heap.alloc(Value::new(Kind::Text(s.to_string())));
        self.embed(heap, h, &self.names.text_ops);
        let identity = heap.alloc(Value::block(vec![h]));
        heap[h].interface.insert(self.names.as_string, identity);
        h
    }

    /// Number rendered as a text
    pub fn format(&self, heap: &mut Heap, n: f64) -> Handle {
        self.text(heap, &NumberFmt(n).to_string())
    }

    fn embed(&self, heap: &mut Heap, receiver: Handle, ops: &[(Name, OpCode)]) {
        for &(name, op) in ops {
            let body = heap.alloc(Value::block(vec![receiver, self.prim(op)]));
            heap[receiver].interface.insert(name, body);
        }
    }

    /// Blocks are behaviors already, anything else becomes a block that
    /// pushes it.
    pub fn constant(&self, heap: &mut Heap, value: Handle) -> Handle {
        if heap[value].is_block() {
            value
        } else {
            heap.alloc(Value::block(vec![value]))
        }
    }

    /// Install `name` and its setter `name:` into the target's interface.
    pub fn define(&self, heap: &mut Heap, target: Handle, name: &str, behavior: Handle) {
        let behavior = self.constant(heap, behavior);
        let label = self.text(heap, name);
        let setter = heap.alloc(Value::block(vec![
            label,
            self.prim(OpCode::Me),
            self.prim(OpCode::SetSlot),
        ]));
        let interface = &mut heap[target].interface;
        interface.insert(intern::id(name), behavior);
        interface.insert(intern::id(format!("{}:", name)), setter);
    }
}
