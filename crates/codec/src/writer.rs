//! Deterministic JSON text writer
//!
//! Documents are built as a `Node` tree whose object members keep the order
//! the caller chose, then written pretty-printed with two-space indentation
//! and a trailing newline. The same tree always produces the same bytes.

use crate::escape::quote;

/// JSON node with caller-ordered object members
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Object members in output order
    Object(Vec<(String, Node)>),
    /// Array elements
    Array(Vec<Node>),
    /// String (escaped on output)
    String(String),
    /// Number, already in its text form
    Number(String),
    /// Boolean
    Bool(bool),
}

impl Node {
    /// String node
    pub fn string(s: impl Into<String>) -> Node {
        Node::String(s.into())
    }

    /// Unsigned number node
    pub fn uint(v: u64) -> Node {
        Node::Number(v.to_string())
    }

    /// Signed number node
    pub fn int(v: i64) -> Node {
        Node::Number(v.to_string())
    }
}

/// Write a document
pub fn write_document(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node, 0);
    out.push('\n');
    out
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    match node {
        Node::Object(members) if members.is_empty() => out.push_str("{}"),
        Node::Object(members) => {
            out.push('{');
            for (i, (name, value)) in members.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline(out, depth + 1);
                out.push_str(&quote(name));
                out.push_str(": ");
                write_node(out, value, depth + 1);
            }
            newline(out, depth);
            out.push('}');
        }
        Node::Array(items) if items.is_empty() => out.push_str("[]"),
        Node::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline(out, depth + 1);
                write_node(out, item, depth + 1);
            }
            newline(out, depth);
            out.push(']');
        }
        Node::String(s) => out.push_str(&quote(s)),
        Node::Number(n) => out.push_str(n),
        Node::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
    }
}

fn newline(out: &mut String, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str("  ");
    }
}
