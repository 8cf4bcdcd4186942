//! Parameter binding turns blocks into closures.
//!
//! A parameter is declared by a message carrying a sigil. `@name` is bound
//! once, when `:` defines the block; `@@name` is bound every time the block
//! is entered. Binding never touches the block it is given: it allocates a
//! copy in which the declaring message is inert and every other `name`
//! carries the bound value as content, which the base fallback pushes when
//! the message finds no receiver.

use crate::{intern, Handle, Heap, Kind, Name, RuntimeError, Value};

const ACTIVATION_SIGIL: &str = "@@";
const DEFINITION_SIGIL: &str = "@";

/// When a parameter receives its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTime {
    /// Once, when the block is defined with `:`
    Definition,
    /// On every entry into the block
    Activation,
}

/// Split a message text into the binding time and the name it declares.
///
/// ```
/// use rproto::{declaration, BindingTime};
///
/// assert_eq!(declaration("@@n"), Some((BindingTime::Activation, "n")));
/// assert_eq!(declaration("@x"), Some((BindingTime::Definition, "x")));
/// assert_eq!(declaration("@@"), None);
/// assert_eq!(declaration("x"), None);
/// ```
pub fn declaration(text: &str) -> Option<(BindingTime, &str)> {
    let (time, name) = if let Some(name) = text.strip_prefix(ACTIVATION_SIGIL) {
        (BindingTime::Activation, name)
    } else if let Some(name) = text.strip_prefix(DEFINITION_SIGIL) {
        (BindingTime::Definition, name)
    } else {
        return None;
    };
    if name.is_empty() {
        None
    } else {
        Some((time, name))
    }
}

/// Bind the definition-time parameters of a block against the stack and
/// return the body of the closure.
///
/// Declarations are collected through nested blocks too, in first-seen
/// order, and each distinct name pops one value.
pub fn define(
    heap: &mut Heap,
    block: Handle,
    stack: &mut Vec<Handle>,
) -> Result<Vec<Handle>, RuntimeError> {
    let mut names = Vec::new();
    declared(heap, block, BindingTime::Definition, true, &mut names);
    let bindings = pop_bindings(names, stack)?;
    let bound = rewrite(heap, block, &bindings, BindingTime::Definition).unwrap_or(block);
    Ok(heap[bound].content.clone())
}

/// Bind the activation-time parameters declared at the top level of a block
/// against the stack. Returns the block itself when it declares none.
pub fn activate(
    heap: &mut Heap,
    block: Handle,
    stack: &mut Vec<Handle>,
) -> Result<Handle, RuntimeError> {
    let mut names = Vec::new();
    declared(heap, block, BindingTime::Activation, false, &mut names);
    if names.is_empty() {
        return Ok(block);
    }
    let bindings = pop_bindings(names, stack)?;
    Ok(rewrite(heap, block, &bindings, BindingTime::Activation).unwrap_or(block))
}

fn pop_bindings(
    names: Vec<Name>,
    stack: &mut Vec<Handle>,
) -> Result<Vec<(Name, Handle)>, RuntimeError> {
    names
        .into_iter()
        .map(|name| Ok((name, stack.pop().ok_or(RuntimeError::StackUnderflow)?)))
        .collect()
}

/// The parameter a message declares, if it is a live declaration.
fn declared_by(heap: &Heap, item: Handle) -> Option<(BindingTime, Name)> {
    let value = &heap[item];
    match value.kind {
        Kind::Message(name) if !value.null_message && value.content.is_empty() => {
            let (time, param) = intern::with_str(name, |text| {
                declaration(text).map(|(time, param)| (time, param.to_string()))
            })?;
            Some((time, intern::id(param)))
        }
        _ => None,
    }
}

fn declared(heap: &Heap, block: Handle, time: BindingTime, nested: bool, names: &mut Vec<Name>) {
    for &item in &heap[block].content {
        if heap[item].is_block() {
            if nested {
                declared(heap, item, time, nested, names);
            }
        } else if let Some((t, name)) = declared_by(heap, item) {
            if t == time && !names.contains(&name) {
                names.push(name);
            }
        }
    }
}

/// Copy the block with the bindings applied, or `None` if nothing in it
/// refers to them.
fn rewrite(
    heap: &mut Heap,
    block: Handle,
    bindings: &[(Name, Handle)],
    time: BindingTime,
) -> Option<Handle> {
    if bindings.is_empty() {
        return None;
    }
    let mut changed = false;
    let mut content = heap[block].content.clone();
    for item in content.iter_mut() {
        let replacement = if heap[*item].is_block() {
            rewrite_nested(heap, *item, bindings, time)
        } else {
            rewrite_message(heap, *item, bindings, time)
        };
        if let Some(new) = replacement {
            *item = new;
            changed = true;
        }
    }
    if changed {
        Some(heap.alloc(Value::block(content)))
    } else {
        None
    }
}

fn rewrite_nested(
    heap: &mut Heap,
    block: Handle,
    bindings: &[(Name, Handle)],
    time: BindingTime,
) -> Option<Handle> {
    if time == BindingTime::Definition {
        return rewrite(heap, block, bindings, time);
    }
    // an inner block redeclaring a name binds it itself on entry
    let mut shadowed = Vec::new();
    declared(heap, block, BindingTime::Activation, false, &mut shadowed);
    let visible: Vec<_> = bindings
        .iter()
        .filter(|(name, _)| !shadowed.contains(name))
        .copied()
        .collect();
    rewrite(heap, block, &visible, time)
}

fn rewrite_message(
    heap: &mut Heap,
    item: Handle,
    bindings: &[(Name, Handle)],
    time: BindingTime,
) -> Option<Handle> {
    if let Some((t, name)) = declared_by(heap, item) {
        if t == time && bindings.iter().any(|(bound, _)| *bound == name) {
            let mut inert = heap[item].clone();
            inert.null_message = true;
            inert.interface.clear();
            return Some(heap.alloc(inert));
        }
        return None;
    }
    let value = &heap[item];
    let name = match value.kind {
        Kind::Message(name) if !value.null_message && value.content.is_empty() => name,
        _ => return None,
    };
    let (_, bound) = bindings.iter().find(|(param, _)| *param == name)?;
    let mut occurrence = Value::new(Kind::Message(name));
    occurrence.content.push(*bound);
    Some(heap.alloc(occurrence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn load(heap: &mut Heap, src: &str) -> Handle {
        parse(src).expect("parse").load(heap)
    }

    fn number(heap: &mut Heap, n: f64) -> Handle {
        heap.alloc(Value::new(Kind::Number(n)))
    }

    fn texts(heap: &Heap, block: Handle) -> Vec<String> {
        heap[block].content.iter().map(|h| heap.render(*h)).collect()
    }

    #[test]
    fn definition_binds_first_seen_from_the_top_of_the_stack() {
        let mut heap = Heap::default();
        let block = load(&mut heap, "@x @y y x [ x ]");
        let one = number(&mut heap, 1.0);
        let two = number(&mut heap, 2.0);
        let mut stack = vec![one, two];

        let body = define(&mut heap, block, &mut stack).unwrap();
        assert!(stack.is_empty());
        assert!(heap[body[0]].null_message);
        assert!(heap[body[1]].null_message);
        assert_eq!(heap[body[2]].content, vec![one]);
        assert_eq!(heap[body[3]].content, vec![two]);
        let nested = heap[body[4]].content[0];
        assert_eq!(heap[nested].content, vec![two]);
    }

    #[test]
    fn definition_leaves_activation_parameters_alone() {
        let mut heap = Heap::default();
        let block = load(&mut heap, "@x @@y x y");
        let three = number(&mut heap, 3.0);
        let mut stack = vec![three];

        let body = define(&mut heap, block, &mut stack).unwrap();
        assert!(!heap[body[1]].null_message);
        assert!(heap[body[3]].content.is_empty());
        assert_eq!(heap[body[2]].content, vec![three]);
    }

    #[test]
    fn the_parsed_block_is_never_mutated() {
        let mut heap = Heap::default();
        let block = load(&mut heap, "@@n n");
        let before = texts(&heap, block);
        let four = number(&mut heap, 4.0);

        let bound = activate(&mut heap, block, &mut vec![four]).unwrap();
        assert_ne!(bound, block);
        assert_eq!(texts(&heap, block), before);
        assert!(heap[heap[block].content[1]].content.is_empty());
    }

    #[test]
    fn activation_without_parameters_is_the_identity() {
        let mut heap = Heap::default();
        let block = load(&mut heap, "dup [ @@inner ]");
        let mut stack = Vec::new();
        assert_eq!(activate(&mut heap, block, &mut stack).unwrap(), block);
    }

    #[test]
    fn activation_is_shadowed_by_inner_declarations() {
        let mut heap = Heap::default();
        let block = load(&mut heap, "@@n n [ n ] [ @@n n ]");
        let five = number(&mut heap, 5.0);

        let bound = activate(&mut heap, block, &mut vec![five]).unwrap();
        let content = heap[bound].content.clone();
        let plain = heap[content[2]].content[0];
        assert_eq!(heap[plain].content, vec![five]);
        let shadowing = heap[content[3]].content.clone();
        assert!(!heap[shadowing[0]].null_message);
        assert!(heap[shadowing[1]].content.is_empty());
    }

    #[test]
    fn only_sigils_declare() {
        let mut heap = Heap::default();
        let block = load(&mut heap, "n @@n @m");
        let content = heap[block].content.clone();
        assert_eq!(declared_by(&heap, content[0]), None);
        assert_eq!(
            declared_by(&heap, content[1]),
            Some((BindingTime::Activation, intern::id("n")))
        );
        assert_eq!(
            declared_by(&heap, content[2]),
            Some((BindingTime::Definition, intern::id("m")))
        );
    }

    #[test]
    fn missing_arguments_underflow() {
        let mut heap = Heap::default();
        let block = load(&mut heap, "@@a @@b a b");
        let one = number(&mut heap, 1.0);
        assert!(matches!(
            activate(&mut heap, block, &mut vec![one]),
            Err(RuntimeError::StackUnderflow)
        ));
    }
}
