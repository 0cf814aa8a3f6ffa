use std::{collections::HashMap, fmt};

use crate::matching::Match;

pub type NodeId = usize;

/// A scope variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(v) => {
                let items: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

/// An entry in a scope's history: a saved match, or a child scope at the
/// point where it was opened.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Match(Match),
    Scope(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeNode {
    name: String,
    parent: Option<NodeId>,
    depth: usize,
    history: Vec<Element>,
    vars: HashMap<String, Value>,
}

impl ScopeNode {
    fn new(name: String, parent: Option<NodeId>, depth: usize) -> Self {
        Self {
            name,
            parent,
            depth,
            history: vec![],
            vars: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// 0 for the root
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn history(&self) -> &[Element] {
        &self.history
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn vars(&self) -> &HashMap<String, Value> {
        &self.vars
    }

    /// saved matches of this node only
    pub fn own_matches(&self) -> impl Iterator<Item = &Match> {
        self.history.iter().filter_map(|e| match e {
            Element::Match(m) => Some(m),
            Element::Scope(_) => None,
        })
    }
}

/// The scope stack of a parse, kept as an arena. Parents own their children
/// through history entries, children refer back by index.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
}

impl ScopeTree {
    pub const ROOT: NodeId = 0;

    pub fn new(root: impl Into<String>) -> Self {
        Self {
            nodes: vec![ScopeNode::new(root.into(), None, 0)],
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    /// Ids are only ever handed out by this tree, so lookups cannot miss.
    pub fn node(&self, id: NodeId) -> &ScopeNode {
        &self.nodes[id]
    }

    pub fn get(&self, id: NodeId) -> Option<&ScopeNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn add_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes
            .push(ScopeNode::new(name.to_string(), Some(parent), depth));
        self.nodes[parent].history.push(Element::Scope(id));
        id
    }

    pub(crate) fn push_match(&mut self, id: NodeId, m: Match) {
        self.nodes[id].history.push(Element::Match(m));
    }

    pub(crate) fn rename(&mut self, id: NodeId, name: &str) {
        self.nodes[id].name = name.to_string();
    }

    pub(crate) fn vars_mut(&mut self, id: NodeId) -> &mut HashMap<String, Value> {
        &mut self.nodes[id].vars
    }

    /// child scopes in the order they were opened
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id].history.iter().filter_map(|e| match e {
            Element::Scope(c) => Some(*c),
            Element::Match(_) => None,
        })
    }

    /// `level` steps up from `id`; 0 is `id` itself
    pub fn ancestor(&self, id: NodeId, level: usize) -> Option<NodeId> {
        let mut id = id;
        for _ in 0..level {
            id = self.get(id)?.parent?;
        }
        Some(id)
    }

    /// scope names from the root down to `id`
    pub fn stack_trace(&self, id: NodeId) -> Vec<String> {
        let mut trace = vec![];
        let mut cur = Some(id);
        while let Some(n) = cur.and_then(|i| self.get(i)) {
            trace.push(n.name.clone());
            cur = n.parent;
        }
        trace.reverse();
        trace
    }

    pub fn scopes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.name == name)
            .map(|(i, _)| i)
    }

    /// saved matches of `id` and its descendants, in history order
    pub fn matches(&self, id: NodeId) -> Vec<&Match> {
        let mut out = vec![];
        // depth-first, expanding child scopes in place
        let mut pending: Vec<std::slice::Iter<'_, Element>> = vec![];
        if let Some(n) = self.get(id) {
            pending.push(n.history.iter());
        }
        while let Some(it) = pending.last_mut() {
            match it.next() {
                Some(Element::Match(m)) => out.push(m),
                Some(Element::Scope(c)) => pending.push(self.nodes[*c].history.iter()),
                None => {
                    pending.pop();
                }
            }
        }
        out
    }

    /// every saved match node, at any depth of the match trees, carrying `tag`
    pub fn by_tag(&self, tag: &str) -> Vec<&Match> {
        self.matches(Self::ROOT)
            .into_iter()
            .flat_map(|m| m.flatten())
            .filter(|m| m.tag() == Some(tag))
            .collect()
    }

    fn write_node(&self, f: &mut fmt::Formatter, id: NodeId, indent: usize) -> fmt::Result {
        let node = &self.nodes[id];
        writeln!(f, "{:indent$}[{}]", "", node.name, indent = indent * 2)?;
        for e in &node.history {
            match e {
                Element::Match(m) => writeln!(f, "{:indent$}{m}", "", indent = indent * 2 + 2)?,
                Element::Scope(c) => self.write_node(f, *c, indent + 1)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for ScopeTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_node(f, Self::ROOT, 0)
    }
}
