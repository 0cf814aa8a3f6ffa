use std::{collections::HashMap, fmt, sync::Arc};

use crate::buffer::{Buffer, Position};

/// Which combinator produced a composite match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Sequence,
    Set,
    Repetition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchKind {
    /// A regex leaf. `groups` holds the capture groups after group 0.
    Leaf {
        pattern: Arc<str>,
        groups: Vec<Option<String>>,
    },
    Composite {
        origin: Origin,
        children: Vec<Match>,
    },
}

/// One node of a match tree.
///
/// `end >= start`, and the span of every child lies within its parent's span.
/// `text` is the buffer content over the span (possibly rewritten by a
/// rule's text transforms).
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub start: Position,
    pub end: Position,
    pub tag: Option<String>,
    pub text: String,
    pub kind: MatchKind,
}

impl Match {
    pub(crate) fn leaf(
        start: Position,
        end: Position,
        pattern: Arc<str>,
        text: String,
        groups: Vec<Option<String>>,
    ) -> Self {
        debug_assert!(end >= start);
        Self {
            start,
            end,
            tag: None,
            text,
            kind: MatchKind::Leaf { pattern, groups },
        }
    }

    pub(crate) fn composite(
        start: Position,
        end: Position,
        origin: Origin,
        text: String,
        children: Vec<Match>,
    ) -> Self {
        debug_assert!(end >= start);
        debug_assert!(children.iter().all(|c| c.start >= start && c.end <= end));
        Self {
            start,
            end,
            tag: None,
            text,
            kind: MatchKind::Composite { origin, children },
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, MatchKind::Leaf { .. })
    }

    /// zero width
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn children(&self) -> &[Match] {
        match &self.kind {
            MatchKind::Leaf { .. } => &[],
            MatchKind::Composite { children, .. } => children,
        }
    }

    pub fn child(&self, i: usize) -> Option<&Match> {
        self.children().get(i)
    }

    /// Regex group `i` of a leaf, group 0 being the whole text.
    pub fn group(&self, i: usize) -> Option<&str> {
        match (&self.kind, i) {
            (MatchKind::Leaf { .. }, 0) => Some(self.text.as_str()),
            (MatchKind::Leaf { groups, .. }, i) => groups.get(i - 1)?.as_deref(),
            _ => None,
        }
    }

    /// the regex of a leaf
    pub fn pattern(&self) -> Option<&str> {
        match &self.kind {
            MatchKind::Leaf { pattern, .. } => Some(&**pattern),
            MatchKind::Composite { .. } => None,
        }
    }

    /// All nodes in pre-order, self first. A new traversal on every call.
    pub fn flatten(&self) -> Flatten<'_> {
        Flatten { stack: vec![self] }
    }

    pub fn by_name(&self, tag: &str) -> Vec<&Match> {
        self.flatten().filter(|m| m.tag() == Some(tag)).collect()
    }

    /// tag -> every node with that tag, in traversal order
    pub fn captures(&self) -> HashMap<&str, Vec<&Match>> {
        let mut out: HashMap<&str, Vec<&Match>> = HashMap::new();
        for m in self.flatten() {
            if let Some(tag) = m.tag() {
                out.entry(tag).or_default().push(m);
            }
        }
        out
    }

    /// tag -> last node with that tag
    pub fn last_captures(&self) -> HashMap<&str, &Match> {
        self.flatten()
            .filter_map(|m| m.tag().map(|t| (t, m)))
            .collect()
    }

    /// the matched span in its source line, underlined
    pub fn describe(&self, buf: &Buffer, width: usize) -> String {
        buf.describe(self.start, self.end, width)
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(tag) = &self.tag {
            write!(f, "{tag}: ")?;
        }
        write!(f, "{} - {} {:?}", self.start, self.end, self.text)
    }
}

pub struct Flatten<'m> {
    stack: Vec<&'m Match>,
}

impl<'m> Iterator for Flatten<'m> {
    type Item = &'m Match;

    fn next(&mut self) -> Option<&'m Match> {
        let m = self.stack.pop()?;
        self.stack.extend(m.children().iter().rev());
        Some(m)
    }
}
