use std::fmt;

use itertools::Itertools;

use crate::{intern, scan::Scanner, token, Error, Handle, Heap, Kind, ParseError, Value};

/// A parsed source tree. Parsing knows nothing about the heap, the virtual
/// machine loads a tree into values right before running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A word or a quoted text, kept verbatim
    Message(String),
    /// A bracketed sequence of nodes
    Block(Vec<Node>),
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(text) => write!(f, "{}", text),
            Self::Block(nodes) if nodes.is_empty() => write!(f, "[ ]"),
            Self::Block(nodes) => write!(f, "[ {} ]", nodes.iter().join(" ")),
        }
    }
}

impl Node {
    /// The nodes of a block, or nothing for a message.
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Message(_) => &[],
            Self::Block(nodes) => nodes,
        }
    }

    /// Allocate the tree as message and block values.
    pub fn load(&self, heap: &mut Heap) -> Handle {
        match self {
            Self::Message(text) => heap.alloc(Value::new(Kind::Message(intern::id(text)))),
            Self::Block(nodes) => {
                let content = nodes.iter().map(|node| node.load(heap)).collect();
                heap.alloc(Value::block(content))
            }
        }
    }
}

/// Parse the given source code into the toplevel block.
///
/// Serializing the result and parsing it again yields the same tree.
///
/// # Examples
///
/// ```
/// use rproto::{parse, Node};
///
/// let tree = parse("3 5 [ - ] ![ five minus three ]").unwrap();
/// assert_eq!(tree.to_string(), "[ 3 5 [ - ] ]");
/// assert_eq!(parse(&tree.to_string()).unwrap(), Node::Block(vec![tree]));
/// ```
pub fn parse(src: &str) -> Result<Node, Error> {
    let mut s = Scanner::new(src);
    let mut open = Vec::new();
    let mut current = Vec::new();
    loop {
        let tok = s.scan()?;
        match tok.typ {
            token::Type::LBracket => {
                open.push((tok.pos, current));
                current = Vec::new();
            }
            token::Type::RBracket => {
                let (_, mut outer) = open.pop().ok_or(ParseError::UnexpectedClose(tok.pos))?;
                outer.push(Node::Block(current));
                current = outer;
            }
            token::Type::Word | token::Type::Text => current.push(Node::Message(tok.lexeme)),
            token::Type::Eof => {
                if let Some((pos, _)) = open.pop() {
                    return Err(ParseError::UnclosedBlock(pos).into());
                }
                break Ok(Node::Block(current));
            }
        }
    }
}
