use std::{collections::BTreeSet, fmt, ops, sync::Arc};

use regex_automata::{meta, util::syntax};

use crate::{
    cursor::Cursor,
    error::{no_match, ParseError, Recoverable},
    logging::Loggable,
    matching::{Match, Origin},
    multiplicity::Multiplicity,
};

/// A regex matched at the cursor, or the zero-width "always" leaf.
#[derive(Debug, Clone)]
pub struct Leaf {
    regex: Option<meta::Regex>,
    pattern: Arc<str>,
    name: Option<String>,
}

impl Leaf {
    pub fn new(pattern: &str) -> Result<Self, ParseError> {
        Self::build(pattern, false)
    }

    pub fn nocase(pattern: &str) -> Result<Self, ParseError> {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, nocase: bool) -> Result<Self, ParseError> {
        let regex = meta::Regex::builder()
            .syntax(syntax::Config::new().case_insensitive(nocase))
            .build(pattern)?;
        Ok(Self {
            regex: Some(regex),
            pattern: Arc::from(pattern),
            name: None,
        })
    }

    pub fn always() -> Self {
        Self {
            regex: None,
            pattern: Arc::from(""),
            name: None,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn attempt(&self, cur: &mut Cursor<'_>) -> Result<Match, ParseError> {
        let start = cur.pos();
        cur.log_inputs("leaf", &*self.pattern);
        let found = match &self.regex {
            None => Some((String::new(), vec![])),
            Some(re) => cur.match_regex(re).and_then(|caps| {
                let line = cur.line()?.text();
                let text = line.get(caps.get_match()?.range())?.to_string();
                let groups = (1..caps.group_len())
                    .map(|i| caps.get_group(i).and_then(|g| line.get(g.range())).map(String::from))
                    .collect();
                Some((text, groups))
            }),
        };
        let Some((text, groups)) = found else {
            let e = no_match("leaf", start);
            cur.log_failure("leaf", &*self.pattern, &e);
            return Err(e);
        };
        cur.skip_bytes(text.len());
        cur.log_success("leaf", &*self.pattern);
        Ok(Match::leaf(
            start,
            cur.pos(),
            Arc::clone(&self.pattern),
            text,
            groups,
        ))
    }
}

/// Children matched in order. Failures at `skippable` indices are tolerated,
/// up to a skip budget per attempt.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    items: Vec<Expr>,
    skip: BTreeSet<usize>,
    max_skip: Option<usize>,
    name: Option<String>,
}

impl Sequence {
    pub fn new<I: IntoIterator<Item = Expr>>(items: I) -> Self {
        Self {
            items: items.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn skippable<I: IntoIterator<Item = usize>>(mut self, indices: I) -> Self {
        self.skip.extend(indices);
        self
    }

    pub fn skip_all(self) -> Self {
        let n = self.items.len();
        self.skippable(0..n)
    }

    /// Overrides the default skip budget.
    pub fn max_skip(mut self, n: usize) -> Self {
        self.max_skip = Some(n);
        self
    }

    pub fn items(&self) -> &[Expr] {
        &self.items
    }

    /// How many skippable children may fail in one attempt. Without an
    /// explicit `max_skip` this is `min(#skippable, len - 1)`.
    pub fn skip_budget(&self) -> usize {
        self.max_skip.unwrap_or_else(|| {
            let skippable = self.skip.range(..self.items.len()).count();
            skippable.min(self.items.len().saturating_sub(1))
        })
    }

    fn is_plain(&self) -> bool {
        self.name.is_none() && self.skip.is_empty() && self.max_skip.is_none()
    }

    fn attempt(&self, cur: &mut Cursor<'_>) -> Result<Match, ParseError> {
        let start = cur.pos();
        cur.log_inputs("sequence", self.items.len());
        let budget = self.skip_budget();
        let mut skipped = 0;
        let mut children = Vec::with_capacity(self.items.len());
        for (i, item) in self.items.iter().enumerate() {
            match item.attempt(cur) {
                Ok(m) => children.push(m),
                Err(e) if e.is_recoverable() && skipped < budget && self.skip.contains(&i) => {
                    skipped += 1;
                }
                Err(e) => {
                    cur.set_pos(start);
                    cur.log_failure("sequence", i, &e);
                    return Err(if e.is_recoverable() {
                        no_match("sequence", start)
                    } else {
                        e
                    });
                }
            }
        }
        let text = cur.text_from(start);
        Ok(Match::composite(
            start,
            cur.pos(),
            Origin::Sequence,
            text,
            children,
        ))
    }
}

/// Unordered matching: the first remaining member that matches is taken and
/// removed, until none match or `max` is reached. Succeeds with at least
/// `min` members matched.
#[derive(Debug, Clone)]
pub struct Set {
    items: Vec<Expr>,
    min: usize,
    max: Option<usize>,
    name: Option<String>,
}

impl Set {
    pub fn new<I: IntoIterator<Item = Expr>>(items: I) -> Self {
        Self {
            items: items.into_iter().collect(),
            min: 1,
            max: None,
            name: None,
        }
    }

    /// raises `max` if needed
    pub fn min(mut self, n: usize) -> Self {
        self.min = n;
        if matches!(self.max, Some(max) if max < n) {
            self.max = Some(n);
        }
        self
    }

    /// lowers `min` if needed
    pub fn max(mut self, n: usize) -> Self {
        self.max = Some(n);
        self.min = self.min.min(n);
        self
    }

    pub fn items(&self) -> &[Expr] {
        &self.items
    }

    pub fn bounds(&self) -> (usize, Option<usize>) {
        (self.min, self.max)
    }

    fn attempt(&self, cur: &mut Cursor<'_>) -> Result<Match, ParseError> {
        let start = cur.pos();
        cur.log_inputs("set", (self.min, self.max));
        let max = self.max.unwrap_or(usize::MAX);
        let mut remaining: Vec<&Expr> = self.items.iter().collect();
        let mut children = Vec::new();
        while children.len() < max {
            let mut hit = None;
            for (k, item) in remaining.iter().enumerate() {
                match item.attempt(cur) {
                    Ok(m) => {
                        hit = Some((k, m));
                        break;
                    }
                    Err(e) if e.is_recoverable() => {}
                    Err(e) => {
                        cur.set_pos(start);
                        return Err(e);
                    }
                }
            }
            match hit {
                Some((k, m)) => {
                    remaining.remove(k);
                    children.push(m);
                }
                None => break,
            }
        }
        if children.len() < self.min {
            cur.set_pos(start);
            let e = no_match("set", start);
            cur.log_failure("set", children.len(), &e);
            return Err(e);
        }
        let text = cur.text_from(start);
        Ok(Match::composite(start, cur.pos(), Origin::Set, text, children))
    }
}

/// A child expression matched greedily, up to the multiplicity's upper bound,
/// optionally with a separator between repetitions.
#[derive(Debug, Clone)]
pub struct Repetition {
    item: Expr,
    mul: Multiplicity,
    sep: Option<Expr>,
    name: Option<String>,
}

impl Repetition {
    pub fn new(item: Expr, mul: Multiplicity) -> Self {
        Self {
            item,
            mul,
            sep: None,
            name: None,
        }
    }

    /// matched between repetitions, not recorded in the match tree
    pub fn separator(mut self, sep: Expr) -> Self {
        self.sep = Some(sep);
        self
    }

    pub fn multiplicity(&self) -> &Multiplicity {
        &self.mul
    }

    fn attempt(&self, cur: &mut Cursor<'_>) -> Result<Match, ParseError> {
        let start = cur.pos();
        cur.log_inputs("repetition", self.mul.to_string());
        let upper = self.mul.upper_bound();
        let mut children = Vec::new();
        loop {
            if matches!(upper, Some(u) if children.len() >= u) {
                break;
            }
            let before = cur.pos();
            if let (Some(sep), false) = (&self.sep, children.is_empty()) {
                match sep.attempt(cur) {
                    Ok(_) => {}
                    Err(e) if e.is_recoverable() => break,
                    Err(e) => {
                        cur.set_pos(start);
                        return Err(e);
                    }
                }
            }
            match self.item.attempt(cur) {
                Ok(m) => {
                    children.push(m);
                    // a zero-width item would repeat forever
                    if cur.pos() == before {
                        break;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    cur.set_pos(before);
                    break;
                }
                Err(e) => {
                    cur.set_pos(start);
                    return Err(e);
                }
            }
        }
        if !self.mul.accepts(children.len()) {
            cur.set_pos(start);
            let e = no_match("repetition", start);
            cur.log_failure("repetition", children.len(), &e);
            return Err(e);
        }
        let text = cur.text_from(start);
        Ok(Match::composite(
            start,
            cur.pos(),
            Origin::Repetition,
            text,
            children,
        ))
    }
}

/// A token expression. Each attempt matches once at the cursor and, on
/// failure, leaves the cursor exactly where it was.
#[derive(Debug, Clone)]
pub enum Expr {
    Leaf(Leaf),
    Sequence(Sequence),
    Set(Set),
    Repetition(Box<Repetition>),
}

impl Expr {
    pub fn regex(pattern: &str) -> Result<Self, ParseError> {
        Leaf::new(pattern).map(Self::Leaf)
    }

    pub fn regex_nocase(pattern: &str) -> Result<Self, ParseError> {
        Leaf::nocase(pattern).map(Self::Leaf)
    }

    /// matches `text` verbatim
    pub fn literal(text: &str) -> Result<Self, ParseError> {
        Self::regex(&regex::escape(text))
    }

    /// zero-width, matches anywhere
    pub fn always() -> Self {
        Self::Leaf(Leaf::always())
    }

    pub fn seq<I: IntoIterator<Item = Expr>>(items: I) -> Self {
        Self::Sequence(Sequence::new(items))
    }

    /// at least one member
    pub fn any<I: IntoIterator<Item = Expr>>(items: I) -> Self {
        Self::Set(Set::new(items))
    }

    /// every member, in any order
    pub fn all<I: IntoIterator<Item = Expr>>(items: I) -> Self {
        let set = Set::new(items);
        let n = set.items.len();
        Self::Set(set.min(n))
    }

    /// exactly one member
    pub fn one_of<I: IntoIterator<Item = Expr>>(items: I) -> Self {
        Self::Set(Set::new(items).max(1))
    }

    pub fn two_of<I: IntoIterator<Item = Expr>>(items: I) -> Self {
        Self::Set(Set::new(items).min(2).max(2))
    }

    pub fn repeat(self, mul: Multiplicity) -> Self {
        Self::Repetition(Box::new(Repetition::new(self, mul)))
    }

    pub fn optional(self) -> Self {
        self.repeat(Multiplicity::optional())
    }

    pub fn zero_or_more(self) -> Self {
        self.repeat(Multiplicity::zero_or_more())
    }

    pub fn one_or_more(self) -> Self {
        self.repeat(Multiplicity::one_or_more())
    }

    pub fn two_or_more(self) -> Self {
        self.repeat(Multiplicity::two_or_more())
    }

    /// Matches of this expression carry `tag`.
    pub fn named(mut self, tag: impl Into<String>) -> Self {
        let tag = Some(tag.into());
        match &mut self {
            Self::Leaf(x) => x.name = tag,
            Self::Sequence(x) => x.name = tag,
            Self::Set(x) => x.name = tag,
            Self::Repetition(x) => x.name = tag,
        }
        self
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Leaf(x) => x.name.as_deref(),
            Self::Sequence(x) => x.name.as_deref(),
            Self::Set(x) => x.name.as_deref(),
            Self::Repetition(x) => x.name.as_deref(),
        }
    }

    pub fn attempt(&self, cur: &mut Cursor<'_>) -> Result<Match, ParseError> {
        let mut m = match self {
            Self::Leaf(x) => x.attempt(cur),
            Self::Sequence(x) => x.attempt(cur),
            Self::Set(x) => x.attempt(cur),
            Self::Repetition(x) => x.attempt(cur),
        }?;
        m.tag = self.name().map(String::from);
        Ok(m)
    }

    /// First match at or after the cursor, which is left after the match.
    pub fn find(&self, cur: &mut Cursor<'_>) -> Option<Match> {
        self.find_iter(cur).next()
    }

    /// Successive matches, moving one char on whenever there is no match.
    pub fn find_iter<'e, 'c, 'b>(&'e self, cur: &'c mut Cursor<'b>) -> FindIter<'e, 'c, 'b> {
        FindIter { expr: self, cur }
    }

    pub fn or(self, other: Expr) -> Expr {
        match self {
            Self::Set(mut s) if s.name.is_none() && s.min == 1 && s.max.is_none() => {
                s.items.push(other);
                Self::Set(s)
            }
            this => Self::Set(Set::new([this, other])),
        }
    }

    pub fn and(self, other: Expr) -> Expr {
        match self {
            Self::Set(mut s)
                if s.name.is_none() && s.max.is_none() && s.min == s.items.len() =>
            {
                s.items.push(other);
                s.min += 1;
                Self::Set(s)
            }
            this => Self::Set(Set::new([this, other]).min(2)),
        }
    }

    pub fn xor(self, other: Expr) -> Expr {
        match self {
            Self::Set(mut s) if s.name.is_none() && s.max == Some(1) && s.min == 1 => {
                s.items.push(other);
                Self::Set(s)
            }
            this => Self::Set(Set::new([this, other]).max(1)),
        }
    }

    pub fn then(self, other: Expr) -> Expr {
        match self {
            Self::Sequence(mut s) if s.is_plain() => {
                s.items.push(other);
                Self::Sequence(s)
            }
            this => Self::Sequence(Sequence::new([this, other])),
        }
    }
}

impl TryFrom<&str> for Expr {
    type Error = ParseError;

    fn try_from(pattern: &str) -> Result<Self, Self::Error> {
        Self::regex(pattern)
    }
}

impl From<Leaf> for Expr {
    fn from(x: Leaf) -> Self {
        Self::Leaf(x)
    }
}

impl From<Sequence> for Expr {
    fn from(x: Sequence) -> Self {
        Self::Sequence(x)
    }
}

impl From<Set> for Expr {
    fn from(x: Set) -> Self {
        Self::Set(x)
    }
}

impl From<Repetition> for Expr {
    fn from(x: Repetition) -> Self {
        Self::Repetition(Box::new(x))
    }
}

impl ops::BitOr for Expr {
    type Output = Expr;
    fn bitor(self, rhs: Expr) -> Expr {
        self.or(rhs)
    }
}

impl ops::BitAnd for Expr {
    type Output = Expr;
    fn bitand(self, rhs: Expr) -> Expr {
        self.and(rhs)
    }
}

impl ops::BitXor for Expr {
    type Output = Expr;
    fn bitxor(self, rhs: Expr) -> Expr {
        self.xor(rhs)
    }
}

impl ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        self.then(rhs)
    }
}

fn join(items: &[Expr]) -> String {
    items
        .iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Leaf(x) if x.regex.is_none() => write!(f, "<always>"),
            Self::Leaf(x) => write!(f, "{}", x.pattern),
            Self::Sequence(x) => write!(f, "[{}]", join(&x.items)),
            Self::Set(x) => write!(f, "{{{}}}", join(&x.items)),
            Self::Repetition(x) => write!(f, "({}){{{}}}", x.item, x.mul),
        }
    }
}

pub struct FindIter<'e, 'c, 'b> {
    expr: &'e Expr,
    cur: &'c mut Cursor<'b>,
}

impl<'e, 'c, 'b> Iterator for FindIter<'e, 'c, 'b> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        while !self.cur.at_end() {
            match self.expr.attempt(self.cur) {
                Ok(m) => {
                    if m.is_empty() {
                        self.cur.advance(1);
                    }
                    return Some(m);
                }
                Err(_) => {
                    self.cur.advance(1);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Buffer, Position};
    use test_log::test;

    fn re(p: &str) -> Expr {
        Expr::regex(p).unwrap()
    }

    #[test]
    fn test_leaf() {
        let buf = Buffer::from_lines(["cats dogs"]);
        let mut cur = buf.cursor();
        let word = re(r"[a-z]+").named("word");
        let m = word.attempt(&mut cur).unwrap();
        assert_eq!(m.text, "cats");
        assert_eq!(m.tag(), Some("word"));
        assert_eq!((m.start, m.end), (Position::new(0, 0), Position::new(0, 4)));
        assert_eq!(buf.between(m.start, m.end), m.text);

        // failure leaves the cursor alone, and is repeatable
        let before = cur.pos();
        let e1 = word.attempt(&mut cur).unwrap_err();
        assert_eq!(cur.pos(), before);
        let e2 = word.attempt(&mut cur).unwrap_err();
        assert_eq!(e1.to_string(), e2.to_string());
        assert!(e1.is_recoverable());
    }

    #[test]
    fn test_leaf_groups_and_case() {
        let buf = Buffer::from_lines(["## Title"]);
        let mut cur = buf.cursor();
        let m = re(r"^(#+)\s*").attempt(&mut cur).unwrap();
        assert_eq!(m.group(1), Some("##"));
        assert_eq!(cur.pos(), Position::new(0, 3));
        let m = Expr::regex_nocase("title").unwrap().attempt(&mut cur).unwrap();
        assert_eq!(m.text, "Title");
        assert!(cur.at_line_end());
        assert!(Expr::regex("(unclosed").is_err());
    }

    #[test]
    fn test_always() {
        let buf = Buffer::from_lines(["x"]);
        let mut cur = buf.cursor();
        let m = Expr::always().attempt(&mut cur).unwrap();
        assert!(m.is_empty());
        assert_eq!(cur.pos(), Position::new(0, 0));
    }

    #[test]
    fn test_sequence() {
        let buf = Buffer::from_lines(["key = value;"]);
        let seq = re(r"\w+") + re(r"\s*=\s*") + re(r"\w+");
        assert_eq!(seq.to_string(), r"[\w+, \s*=\s*, \w+]");
        let mut cur = buf.cursor();
        let m = seq.attempt(&mut cur).unwrap();
        assert_eq!(m.text, "key = value");
        assert_eq!(m.children().len(), 3);
        assert_eq!(cur.pos(), Position::new(0, 11));

        let strict = Expr::seq([re(r"\w+"), re(":"), re(r"\w+")]);
        let mut cur = buf.cursor();
        assert!(strict.attempt(&mut cur).is_err());
        assert_eq!(cur.pos(), Position::new(0, 0));
    }

    #[test]
    fn test_sequence_skip() {
        let buf = Buffer::from_lines(["ac", "c"]);
        let items = || [re("a"), re("b"), re("c")];

        let seq: Expr = Sequence::new(items()).skippable([0, 1]).into();
        let m = seq.attempt(&mut buf.cursor()).unwrap();
        assert_eq!(m.text, "ac");
        assert_eq!(m.children().len(), 2);

        // budget min(2, 3 - 1) = 2 lets both "a" and "b" be skipped
        let mut cur = buf.cursor_at((1, 0));
        let m = seq.attempt(&mut cur).unwrap();
        assert_eq!(m.text, "c");

        let tight: Expr = Sequence::new(items()).skippable([0, 1]).max_skip(1).into();
        let mut cur = buf.cursor_at((1, 0));
        assert!(tight.attempt(&mut cur).is_err());
        assert_eq!(cur.pos(), Position::new(1, 0));

        let none: Expr = Sequence::new(items()).skippable([1]).max_skip(0).into();
        assert!(none.attempt(&mut buf.cursor()).is_err());
    }

    #[test]
    fn test_set() {
        let buf = Buffer::from_lines(["bab"]);
        let (a, b) = (re("a"), re("b"));

        // each member at most once: "b", "a", then "b" is used up
        let m = Expr::all([a.clone(), b.clone()]).attempt(&mut buf.cursor()).unwrap();
        assert_eq!(m.text, "ba");
        assert_eq!(m.children()[0].text, "b");

        let m = Expr::one_of([a.clone(), b.clone()]).attempt(&mut buf.cursor()).unwrap();
        assert_eq!(m.text, "b");

        let m = Expr::two_of([a.clone(), b.clone(), re("c")])
            .attempt(&mut buf.cursor())
            .unwrap();
        assert_eq!(m.text, "ba");

        let mut cur = buf.cursor();
        assert!(Expr::all([a.clone(), b.clone(), re("c")]).attempt(&mut cur).is_err());
        assert_eq!(cur.pos(), Position::new(0, 0));

        let only_b: Expr = Set::new([b.clone()]).min(2).into();
        assert!(only_b.attempt(&mut buf.cursor()).is_err());

        let mut cur = buf.cursor_at((0, 1));
        let m = Expr::any([b, a]).attempt(&mut cur).unwrap();
        assert_eq!(m.text, "ab");
    }

    #[test]
    fn test_repetition() -> Result<(), ParseError> {
        let buf = Buffer::from_lines(["abababab", "ab", "abab"]);
        let rep = re("ab").repeat("2-3".parse()?);

        let mut cur = buf.cursor();
        let m = rep.attempt(&mut cur)?;
        assert_eq!(m.children().len(), 3);
        assert_eq!(m.text, "ababab");
        assert_eq!(cur.pos(), Position::new(0, 6));

        let mut cur = buf.cursor_at((1, 0));
        assert!(rep.attempt(&mut cur).is_err());
        assert_eq!(cur.pos(), Position::new(1, 0));

        let mut cur = buf.cursor_at((2, 0));
        assert_eq!(rep.attempt(&mut cur)?.children().len(), 2);

        let mut cur = buf.cursor_at((1, 0));
        assert!(re("x").optional().attempt(&mut cur)?.is_empty());
        assert!(re("x").one_or_more().attempt(&mut cur).is_err());
        assert_eq!(re("ab").zero_or_more().attempt(&mut cur)?.text, "ab");
        Ok(())
    }

    #[test]
    fn test_repetition_separator() -> Result<(), ParseError> {
        let buf = Buffer::from_lines(["1, 2,3 ,x"]);
        let list: Expr = Repetition::new(re(r"\d"), Multiplicity::one_or_more())
            .separator(re(r"\s*,\s*"))
            .into();
        let mut cur = buf.cursor();
        let m = list.attempt(&mut cur)?;
        let digits: Vec<&str> = m.children().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(digits, vec!["1", "2", "3"]);
        // the dangling separator is not consumed
        assert_eq!(cur.pos(), Position::new(0, 6));
        Ok(())
    }

    #[test]
    fn test_repetition_zero_width() -> Result<(), ParseError> {
        let buf = Buffer::from_lines(["abc"]);
        let m = Expr::always().zero_or_more().attempt(&mut buf.cursor())?;
        assert_eq!(m.children().len(), 1);
        Ok(())
    }

    #[test]
    fn test_composition() {
        let set = re("a") | re("b") | re("c");
        match &set {
            Expr::Set(s) => assert_eq!((s.items().len(), s.bounds()), (3, (1, None))),
            _ => panic!("expected a set"),
        }
        let and = re("a") & re("b") & re("c");
        match &and {
            Expr::Set(s) => assert_eq!((s.items().len(), s.bounds()), (3, (3, None))),
            _ => panic!("expected a set"),
        }
        let xor = re("a") ^ re("b") ^ re("c");
        match &xor {
            Expr::Set(s) => assert_eq!((s.items().len(), s.bounds()), (3, (1, Some(1)))),
            _ => panic!("expected a set"),
        }
        // a named combinator is not widened
        let nested = re("a").then(re("b")).named("ab") + re("c");
        match &nested {
            Expr::Sequence(s) => assert_eq!(s.items().len(), 2),
            _ => panic!("expected a sequence"),
        }
        assert_eq!(nested.to_string(), "[[a, b], c]");
        assert_eq!(set.to_string(), "{a, b, c}");
        assert_eq!(re("x").repeat("2-3".parse().unwrap()).to_string(), "(x){2-3}");
    }

    #[test]
    fn test_find_iter() {
        let buf = Buffer::from_lines(["One morning, when", "Gregor Samsa"]);
        let word = re(r"\w+");
        let mut cur = buf.cursor();
        let words: Vec<String> = word.find_iter(&mut cur).map(|m| m.text).collect();
        assert_eq!(words, vec!["One", "morning", "when", "Gregor", "Samsa"]);
        assert!(cur.at_end());

        let mut cur = buf.cursor();
        let m = re("Samsa").find(&mut cur).unwrap();
        assert_eq!(m.start, Position::new(1, 7));
    }

    #[test]
    fn test_captures_through_tree() {
        let buf = Buffer::from_lines(["x=1"]);
        let pair = re(r"\w").named("key") + re("=") + re(r"\d").named("value");
        let m = pair.attempt(&mut buf.cursor()).unwrap();
        let caps = m.last_captures();
        assert_eq!(caps["key"].text, "x");
        assert_eq!(caps["value"].text, "1");
    }
}
