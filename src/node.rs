//! The decoder's output: a tree of [`DecodedNode`]s.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Display};

/// A tagged placeholder value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    /// A null (smart) pointer or empty callable.
    Null,
    /// A disengaged `optional`.
    Uninitialized,
    /// The value's memory could not be read.
    NotAccessible,
}

/// The summary shown next to a node's label.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Nothing to show (the item count or children speak for themselves).
    Empty,
    /// Decoded text, e.g. string contents or a symbol name.
    Text(String),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UInt(u64),
    /// A floating point number.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// A raw address.
    Pointer(u64),
    /// A tagged placeholder.
    Special(Special),
    /// No decoder and no built-in rendering: the host should display the
    /// value of `type_name` at `addr` with its generic view.
    Raw {
        /// Type of the value.
        type_name: String,
        /// Address of the value.
        addr: u64,
    },
    /// Contiguous elements to be shown as a single array (e.g. plotted),
    /// rather than as individual children.
    Array {
        /// Element type.
        type_name: String,
        /// Address of the first element.
        addr: u64,
        /// Number of elements.
        count: u64,
    },
    /// The node's layout failed a sanity check and was not decoded.
    Degraded(String),
}

impl Display for Special {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Special::Null => write!(f, "(null)"),
            Special::Uninitialized => write!(f, "<uninitialized>"),
            Special::NotAccessible => write!(f, "<not accessible>"),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Pointer(p) => write!(f, "{:#x}", p),
            Value::Special(s) => write!(f, "{}", s),
            Value::Raw { type_name, addr } => write!(f, "@{:#x} ({})", addr, type_name),
            Value::Array {
                type_name,
                addr,
                count,
            } => write!(f, "{}[{}] @{:#x}", type_name, count, addr),
            Value::Degraded(why) => write!(f, "<corrupted: {}>", why),
        }
    }
}

/// Number of logical elements in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCount {
    /// The exact element count.
    Exact(u64),
    /// Counting stopped at this cap; the container holds at least this many.
    AtLeast(u64),
}

impl ItemCount {
    /// The (lower bound of the) count.
    pub fn get(self) -> u64 {
        match self {
            ItemCount::Exact(n) | ItemCount::AtLeast(n) => n,
        }
    }

    /// Whether counting was cut short.
    pub fn is_truncated(self) -> bool {
        matches!(self, ItemCount::AtLeast(_))
    }
}

impl Display for ItemCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemCount::Exact(1) => write!(f, "<1 item>"),
            ItemCount::Exact(n) => write!(f, "<{} items>", n),
            ItemCount::AtLeast(n) => write!(f, "<more than {} items>", n),
        }
    }
}

/// The emitted children of an expanded node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Children {
    /// Children in display order.
    pub nodes: Vec<DecodedNode>,
    /// Set when emission stopped at a cap before every element was shown.
    pub truncated: bool,
}

/// One rendered element of the result tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNode {
    /// The label shown in the name column (`[0]`, `first`, `real`...).
    pub label: String,
    /// A better type name to display instead of the declared one.
    pub type_name: Option<String>,
    /// For map-like elements, the summary of the key.
    pub key: Option<Value>,
    /// The summary value.
    pub value: Value,
    /// Number of elements, for containers.
    pub item_count: Option<ItemCount>,
    /// Whether the node can be expanded at all.
    pub expandable: bool,
    /// The children, if the node was expanded.
    pub children: Option<Children>,
}

impl DecodedNode {
    /// An empty, non-expandable node.
    pub fn new(label: impl Into<String>) -> DecodedNode {
        DecodedNode {
            label: label.into(),
            type_name: None,
            key: None,
            value: Value::Empty,
            item_count: None,
            expandable: false,
            children: None,
        }
    }

    /// A leaf node showing `value`.
    pub fn leaf(label: impl Into<String>, value: Value) -> DecodedNode {
        DecodedNode {
            value,
            ..DecodedNode::new(label)
        }
    }

    /// The emitted children (empty if the node was not expanded).
    pub fn children(&self) -> &[DecodedNode] {
        match &self.children {
            Some(c) => &c.nodes,
            None => &[],
        }
    }

    /// Find a direct child by label.
    pub fn child(&self, label: &str) -> Option<&DecodedNode> {
        self.children().iter().find(|c| c.label == label)
    }

    /// The text a front-end would show in the value column.
    pub fn summary(&self) -> String {
        use alloc::string::ToString;

        match (&self.value, self.item_count) {
            (Value::Empty, Some(count)) => count.to_string(),
            (value, _) => value.to_string(),
        }
    }
}
