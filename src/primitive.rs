use crate::{bind, intern, Handle, Kind, OpCode, RuntimeError, VM};

impl VM {
    /// Execute a primitive that does not create a frame.
    pub(crate) fn primitive(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        match op {
            OpCode::Drop => {
                self.pop()?;
            }
            OpCode::Dup => {
                let v = self.pop()?;
                self.push(v);
                self.push(v);
            }
            OpCode::Swap => {
                let top = self.pop()?;
                let below = self.pop()?;
                self.push(top);
                self.push(below);
            }
            OpCode::Over => {
                let top = self.pop()?;
                let below = self.pop()?;
                self.push(below);
                self.push(top);
                self.push(below);
            }
            OpCode::Rot => {
                let c = self.pop()?;
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(b);
                self.push(c);
                self.push(a);
            }
            OpCode::Me => {
                let receiver = self.receiver();
                self.push(receiver);
            }
            OpCode::Define => {
                let target = self.pop()?;
                let behavior = self.pop()?;
                let name = self.pop_text()?;
                self.lib.define(&mut self.heap, target, &name, behavior);
            }
            OpCode::SetSlot => {
                let target = self.pop()?;
                let name = self.pop_text()?;
                let value = self.pop()?;
                let behavior = self.lib.constant(&mut self.heap, value);
                self.heap[target]
                    .interface
                    .insert(intern::id(name), behavior);
            }
            OpCode::Bind => {
                let block = self.pop()?;
                if !self.heap[block].is_block() {
                    return Err(self.mismatch("block", block));
                }
                let stack = self.frame().stack;
                let content = bind::define(&mut self.heap, block, &mut self.stacks[stack])?;
                let closure = self.lib.closure(&mut self.heap, content);
                self.push(closure);
            }
            OpCode::Fallback => {
                let message = self.pop()?;
                let literals = self.literal(message)?;
                for v in literals {
                    self.push(v);
                }
            }
            OpCode::Proto => {
                let proto = self.lib.proto(&mut self.heap);
                self.push(proto);
            }
            OpCode::Say => {
                let v = self.pop()?;
                let line = self.render(v);
                self.out.say(&line);
            }
            OpCode::Stop => {
                let owner = self.frame().owner;
                self.heap[owner].stopped = true;
            }
            OpCode::Same => {
                let a = self.pop()?;
                let b = self.pop()?;
                self.push_bool(a == b);
            }
            OpCode::Add => self.arithmetic(|r, o| r + o)?,
            OpCode::Subtract => self.arithmetic(|r, o| r - o)?,
            OpCode::Multiply => self.arithmetic(|r, o| r * o)?,
            OpCode::Divide => self.arithmetic(|r, o| r / o)?,
            OpCode::Remainder => self.arithmetic(|r, o| r % o)?,
            OpCode::Less => self.comparison(|r, o| r < o)?,
            OpCode::Greater => self.comparison(|r, o| r > o)?,
            OpCode::Equal => {
                let receiver = self.pop()?;
                // the receiver decides which kind the operand must have
                let equal = match self.heap[receiver].kind.clone() {
                    Kind::Number(r) => r == self.pop_number()?,
                    Kind::Text(r) => r == self.pop_text()?,
                    _ => return Err(self.mismatch("number", receiver)),
                };
                self.push_bool(equal);
            }
            OpCode::Increment => {
                let n = self.pop_number()?;
                self.push_number(n + 1.0);
            }
            OpCode::Decrement => {
                let n = self.pop_number()?;
                self.push_number(n - 1.0);
            }
            OpCode::Format => {
                let n = self.pop_number()?;
                let text = self.lib.format(&mut self.heap, n);
                self.push(text);
            }
            OpCode::Concat => {
                let receiver = self.pop_text()?;
                let operand = self.pop_text()?;
                let text = self.lib.text(&mut self.heap, &(receiver + &operand));
                self.push(text);
            }
            OpCode::Length => {
                let text = self.pop_text()?;
                self.push_number(text.chars().count() as f64);
            }
            OpCode::Run | OpCode::RunCurrent => {
                unreachable!("Frames are created by the loop.")
            }
        }
        Ok(())
    }

    /// What the base fallback turns an unanswered message into.
    fn literal(&mut self, message: Handle) -> Result<Vec<Handle>, RuntimeError> {
        let value = &self.heap[message];
        let name = match value.kind {
            Kind::Message(name) => name,
            _ => return Err(RuntimeError::NotAMessage(self.render(message))),
        };
        if !value.content.is_empty() {
            return Ok(value.content.clone());
        }

        let text = intern::str(name);
        if let Some(n) = parse_number(&text) {
            return Ok(vec![self.lib.number(&mut self.heap, n)]);
        }
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            let inner = &text[1..text.len() - 1];
            return Ok(vec![self.lib.text(&mut self.heap, inner)]);
        }
        Err(RuntimeError::NotUnderstood(text))
    }

    fn arithmetic<F>(&mut self, f: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(f64, f64) -> f64,
    {
        let receiver = self.pop_number()?;
        let operand = self.pop_number()?;
        self.push_number(f(receiver, operand));
        Ok(())
    }

    fn comparison<F>(&mut self, f: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(f64, f64) -> bool,
    {
        let receiver = self.pop_number()?;
        let operand = self.pop_number()?;
        self.push_bool(f(receiver, operand));
        Ok(())
    }

    fn pop_number(&mut self) -> Result<f64, RuntimeError> {
        let v = self.pop()?;
        self.heap
            .number(v)
            .ok_or_else(|| self.mismatch("number", v))
    }

    fn pop_text(&mut self) -> Result<String, RuntimeError> {
        let v = self.pop()?;
        match self.heap.text(v) {
            Some(s) => Ok(s.to_string()),
            None => Err(self.mismatch("text", v)),
        }
    }

    fn push_number(&mut self, n: f64) {
        let v = self.lib.number(&mut self.heap, n);
        self.push(v);
    }

    fn push_bool(&mut self, b: bool) {
        let v = self.lib.boolean(b);
        self.push(v);
    }

    fn mismatch(&self, expected: &'static str, found: Handle) -> RuntimeError {
        RuntimeError::TypeMismatch {
            expected,
            found: format!("{} {}", self.heap[found].kind_name(), self.render(found)),
        }
    }
}

/// A number literal has at least one digit and parses as a float.
fn parse_number(text: &str) -> Option<f64> {
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| !n.is_nan())
}
