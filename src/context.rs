use std::collections::HashMap;

use log::{debug, error};

use crate::{
    buffer::Buffer,
    cursor::Cursor,
    error::{Diagnostic, ParseError, Recoverable},
    event::{Event, Hub},
    matching::Match,
    parser::{self, ParserConfig},
    scope::Grammar,
    tree::{NodeId, ScopeTree, Value},
    LOG_TARGET,
};

/// The live state of one parse: the scope tree and the current scope in it,
/// scope variables, strictness overrides and the last saved match. Borrows
/// the grammar, config and event hub of the parser running it.
pub struct Context<'p> {
    grammar: &'p Grammar,
    config: &'p ParserConfig,
    hub: &'p mut Hub,
    tree: ScopeTree,
    current: NodeId,
    strictness: HashMap<String, bool>,
    last_save: Option<Match>,
}

impl<'p> Context<'p> {
    /// A fresh tree rooted at "main", with the configured start scope opened
    /// under it when that is not "main" itself.
    pub fn new(
        grammar: &'p Grammar,
        config: &'p ParserConfig,
        hub: &'p mut Hub,
    ) -> Result<Self, ParseError> {
        let mut ctx = Self {
            grammar,
            config,
            hub,
            tree: ScopeTree::new(Grammar::MAIN),
            current: ScopeTree::ROOT,
            strictness: HashMap::new(),
            last_save: None,
        };
        if config.start != Grammar::MAIN {
            let start = config.start.clone();
            ctx.open(&start)?;
        }
        Ok(ctx)
    }

    pub fn grammar(&self) -> &'p Grammar {
        self.grammar
    }

    pub fn config(&self) -> &'p ParserConfig {
        self.config
    }

    pub fn tree(&self) -> &ScopeTree {
        &self.tree
    }

    pub fn into_tree(self) -> ScopeTree {
        self.tree
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn scope_name(&self) -> &str {
        self.tree.node(self.current).name()
    }

    /// 0 at the root
    pub fn depth(&self) -> usize {
        self.tree.node(self.current).depth()
    }

    pub fn stack_trace(&self) -> Vec<String> {
        self.tree.stack_trace(self.current)
    }

    pub(crate) fn publish(&mut self, event: &Event<'_>) {
        self.hub.publish(event);
    }

    /// Tries the rules of the current scope in order; the first to match
    /// wins. `Ok(false)` when nothing matched in a relaxed scope.
    pub fn match_at(&mut self, cur: &mut Cursor<'_>) -> Result<bool, ParseError> {
        let name = self.scope_name().to_string();
        let grammar = self.grammar;
        let scope = grammar
            .scope(&name)
            .ok_or_else(|| self.scope_error(format!("no rules for scope \"{name}\"")))?;
        let start = cur.pos();
        for (idx, rule) in scope.rules().iter().enumerate() {
            match rule.match_at(cur, self) {
                Ok(m) => {
                    debug!(
                        target: LOG_TARGET,
                        "match in scope \"{name}\" (rule {idx}) {} - {}",
                        m.start,
                        m.end
                    );
                    if self.config.record_all && !m.is_empty() {
                        self.save(&m);
                    }
                    self.hub.publish(&Event::Match {
                        scope: &name,
                        rule: idx,
                        matched: &m,
                    });
                    return Ok(true);
                }
                Err(e) if e.is_recoverable() => cur.set_pos(start),
                Err(e) => return Err(e),
            }
        }
        if self.is_strict(&name) {
            return Err(self.error(cur, format!("no matching rule in strict scope \"{name}\"")));
        }
        Ok(false)
    }

    /// Records a match in the current scope's history. A save equal to the
    /// previous one is dropped, so a match saved by a rule and again by
    /// `record_all` is recorded once.
    pub fn save(&mut self, m: &Match) {
        if self.last_save.as_ref() == Some(m) {
            return;
        }
        self.last_save = Some(m.clone());
        debug!(target: LOG_TARGET, "save {m} in scope \"{}\"", self.scope_name());
        self.tree.push_match(self.current, m.clone());
        let name = self.scope_name().to_string();
        self.hub.publish(&Event::Save {
            scope: &name,
            matched: m,
        });
    }

    /// Pushes a child scope and makes it current.
    pub fn open(&mut self, name: &str) -> Result<(), ParseError> {
        if !self.grammar.contains(name) {
            return Err(self.scope_error(format!("cannot open unknown scope \"{name}\"")));
        }
        self.current = self.tree.add_child(self.current, name);
        let depth = self.depth();
        debug!(target: LOG_TARGET, "open scope \"{name}\" at depth {depth}");
        self.hub.publish(&Event::Open { scope: name, depth });
        Ok(())
    }

    /// Pops `n` scopes. The root is never closed.
    pub fn close(&mut self, n: usize) -> Result<(), ParseError> {
        let depth = self.depth();
        if n > depth {
            return Err(self.scope_error(format!("cannot close {n} scope(s) at depth {depth}")));
        }
        for _ in 0..n {
            let name = self.scope_name().to_string();
            let depth = self.depth();
            debug!(target: LOG_TARGET, "close scope \"{name}\" at depth {depth}");
            self.hub.publish(&Event::Close {
                scope: &name,
                depth,
            });
            if let Some(parent) = self.tree.node(self.current).parent() {
                self.current = parent;
            }
        }
        Ok(())
    }

    /// Renames the current scope, which then follows the rules of `name`.
    pub fn swap(&mut self, name: &str) -> Result<(), ParseError> {
        if self.depth() == 0 {
            return Err(self.scope_error("cannot swap the root scope"));
        }
        if !self.grammar.contains(name) {
            return Err(self.scope_error(format!("cannot swap to unknown scope \"{name}\"")));
        }
        let from = self.scope_name().to_string();
        debug!(target: LOG_TARGET, "swap scope \"{from}\" for \"{name}\"");
        self.hub.publish(&Event::Swap { from: &from, to: name });
        self.tree.rename(self.current, name);
        Ok(())
    }

    /// `close(n)` then `open(name)`
    pub fn next(&mut self, name: &str, n: usize) -> Result<(), ParseError> {
        self.close(n)?;
        self.open(name)
    }

    fn ancestor(&self, level: usize) -> Result<NodeId, ParseError> {
        self.tree.ancestor(self.current, level).ok_or_else(|| {
            self.scope_error(format!(
                "no ancestor {level} levels up from depth {}",
                self.depth()
            ))
        })
    }

    /// Variable `name` of the scope `level` steps up from the current one.
    pub fn get(&self, name: &str, level: usize) -> Option<&Value> {
        let id = self.tree.ancestor(self.current, level)?;
        self.tree.node(id).var(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>, level: usize) -> Result<(), ParseError> {
        let id = self.ancestor(level)?;
        self.tree.vars_mut(id).insert(name.to_string(), value.into());
        Ok(())
    }

    /// Adds `by` to an integer variable, a missing one counting as 0.
    pub fn add(&mut self, name: &str, by: i64, level: usize) -> Result<(), ParseError> {
        let id = self.ancestor(level)?;
        let current = match self.tree.node(id).var(name) {
            None => 0,
            Some(Value::Int(i)) => *i,
            Some(other) => {
                return Err(self.scope_error(format!(
                    "variable \"{name}\" is not an integer: {other}"
                )))
            }
        };
        self.tree
            .vars_mut(id)
            .insert(name.to_string(), Value::Int(current + by));
        Ok(())
    }

    pub fn increment(&mut self, name: &str, level: usize) -> Result<(), ParseError> {
        self.add(name, 1, level)
    }

    pub fn decrement(&mut self, name: &str, level: usize) -> Result<(), ParseError> {
        self.add(name, -1, level)
    }

    /// Pushes onto a list variable, a missing one starting empty.
    pub fn append(&mut self, name: &str, value: impl Into<Value>, level: usize) -> Result<(), ParseError> {
        let id = self.ancestor(level)?;
        if let Some(other) = self.tree.node(id).var(name).filter(|v| v.as_list().is_none()) {
            return Err(self.scope_error(format!("variable \"{name}\" is not a list: {other}")));
        }
        let entry = self
            .tree
            .vars_mut(id)
            .entry(name.to_string())
            .or_insert_with(|| Value::List(vec![]));
        if let Value::List(items) = entry {
            items.push(value.into());
        }
        Ok(())
    }

    /// Overrides the grammar's strictness of a scope for the rest of this
    /// parse.
    pub fn set_strict(&mut self, name: &str, strict: bool) -> Result<(), ParseError> {
        if !self.grammar.contains(name) {
            return Err(self.scope_error(format!("unknown scope \"{name}\"")));
        }
        self.strictness.insert(name.to_string(), strict);
        Ok(())
    }

    pub fn is_strict(&self, name: &str) -> bool {
        self.strictness
            .get(name)
            .copied()
            .unwrap_or_else(|| self.grammar.scope(name).map_or(false, |s| s.is_strict()))
    }

    pub(crate) fn diagnostic(&self, cur: &Cursor<'_>, message: String) -> Box<Diagnostic> {
        Box::new(Diagnostic {
            message,
            pos: cur.pos(),
            excerpt: cur.describe(60),
            trace: self.stack_trace(),
        })
    }

    /// A fatal error at the cursor, carrying the scope stack.
    pub fn error(&self, cur: &Cursor<'_>, message: impl Into<String>) -> ParseError {
        let d = self.diagnostic(cur, message.into());
        error!(target: LOG_TARGET, "{d}");
        ParseError::Fatal(d)
    }

    fn scope_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Scope {
            message: message.into(),
            trace: self.stack_trace(),
        }
    }

    /// Parses other text with the same grammar and config, for instance the
    /// contents of a match. The nested parse has its own tree and no event
    /// subscribers.
    pub fn sub_parse<I, S>(&self, lines: I) -> Result<ScopeTree, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let buf = Buffer::from_lines(lines);
        let mut hub = Hub::default();
        parser::drive(self.grammar, self.config, &mut hub, &mut buf.cursor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::Expr,
        rule::Rule,
        scope::{always, rule},
    };
    use test_log::test;

    fn grammar() -> Grammar {
        Grammar::builder()
            .scope("main", [rule(r"\w+").with(("tag", "word")), rule(r"\s+")])
            .scope("quote", [rule(r"\w+"), always().with("close")])
            .scope("list", [rule(r"\w+")])
            .strict("list")
            .build()
            .unwrap()
    }

    #[test]
    fn test_scope_stack() -> Result<(), ParseError> {
        let g = grammar();
        let config = ParserConfig::default();
        let mut hub = Hub::default();
        let mut ctx = Context::new(&g, &config, &mut hub)?;

        assert_eq!((ctx.scope_name(), ctx.depth()), ("main", 0));
        assert!(matches!(ctx.close(1), Err(ParseError::Scope { .. })));
        assert!(ctx.swap("quote").is_err());
        assert!(ctx.open("nowhere").is_err());

        ctx.open("quote")?;
        ctx.open("list")?;
        assert_eq!(ctx.stack_trace(), vec!["main", "quote", "list"]);
        ctx.next("quote", 1)?;
        assert_eq!(ctx.stack_trace(), vec!["main", "quote", "quote"]);
        ctx.swap("list")?;
        assert_eq!(ctx.scope_name(), "list");
        assert!(ctx.close(3).is_err());
        ctx.close(2)?;
        assert_eq!(ctx.depth(), 0);

        let tree = ctx.into_tree();
        let quote = tree.children(tree.root()).next().unwrap();
        assert_eq!(tree.children(quote).count(), 2);
        Ok(())
    }

    #[test]
    fn test_variables() -> Result<(), ParseError> {
        let g = grammar();
        let config = ParserConfig::default();
        let mut hub = Hub::default();
        let mut ctx = Context::new(&g, &config, &mut hub)?;

        ctx.set("indent", 4, 0)?;
        ctx.open("quote")?;
        assert_eq!(ctx.get("indent", 0), None);
        assert_eq!(ctx.get("indent", 1), Some(&Value::Int(4)));
        ctx.increment("indent", 1)?;
        ctx.increment("count", 0)?;
        ctx.decrement("count", 0)?;
        ctx.decrement("count", 0)?;
        assert_eq!(ctx.get("indent", 1), Some(&Value::Int(5)));
        assert_eq!(ctx.get("count", 0), Some(&Value::Int(-1)));
        assert!(ctx.set("x", 1, 2).is_err());

        ctx.append("items", "a", 0)?;
        ctx.append("items", 2, 0)?;
        assert_eq!(
            ctx.get("items", 0).and_then(Value::as_list).map(<[Value]>::len),
            Some(2)
        );
        ctx.set("name", "q", 0)?;
        assert!(ctx.append("name", "x", 0).is_err());
        assert!(ctx.increment("name", 0).is_err());
        Ok(())
    }

    #[test]
    fn test_match_and_save() -> Result<(), ParseError> {
        let g = grammar();
        let config = ParserConfig::default();
        let mut hub = Hub::default();
        let mut ctx = Context::new(&g, &config, &mut hub)?;
        let buf = Buffer::from_lines(["cats  !"]);
        let mut cur = buf.cursor();

        assert!(ctx.match_at(&mut cur)?);
        assert!(ctx.match_at(&mut cur)?);
        // relaxed scope: nothing matches "!"
        assert!(!ctx.match_at(&mut cur)?);
        assert_eq!(cur.pos().col, 6);

        let tree = ctx.tree();
        let saved = tree.matches(tree.root());
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].tag(), Some("word"));
        Ok(())
    }

    #[test]
    fn test_save_each_child() -> Result<(), ParseError> {
        let parts = Expr::seq([Expr::regex(r"\w+")?, Expr::regex("=")?, Expr::regex(r"\w+")?]);
        let assign = Rule::new(parts).callback(|_, ctx, m| {
            for child in m.children() {
                ctx.save(child);
            }
            Ok(())
        });
        let g = Grammar::builder().scope_rules("main", [assign]).build()?;
        let buf = Buffer::from_lines(["a=b"]);

        let config = ParserConfig::default().with_record_all(false);
        let mut hub = Hub::default();
        let mut ctx = Context::new(&g, &config, &mut hub)?;
        assert!(ctx.match_at(&mut buf.cursor())?);
        let saved: Vec<&str> = ctx.tree().matches(ScopeTree::ROOT).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(saved, vec!["a", "=", "b"]);

        // the whole match follows the children, and a repeat save of it is dropped
        let config = ParserConfig::default();
        let mut hub = Hub::default();
        let mut ctx = Context::new(&g, &config, &mut hub)?;
        assert!(ctx.match_at(&mut buf.cursor())?);
        let whole = ctx.tree().matches(ScopeTree::ROOT).last().map(|m| (*m).clone());
        assert_eq!(whole.as_ref().map(|m| m.text.as_str()), Some("a=b"));
        if let Some(m) = whole {
            ctx.save(&m);
        }
        assert_eq!(ctx.tree().matches(ScopeTree::ROOT).len(), 4);
        Ok(())
    }

    #[test]
    fn test_strict_failure() -> Result<(), ParseError> {
        let g = grammar();
        let config = ParserConfig::default();
        let mut hub = Hub::default();
        let mut ctx = Context::new(&g, &config, &mut hub)?;
        let buf = Buffer::from_lines(["!"]);
        let mut cur = buf.cursor();

        ctx.open("list")?;
        let e = ctx.match_at(&mut cur).unwrap_err();
        let d = e.diagnostic().unwrap();
        assert_eq!(d.trace, vec!["main", "list"]);
        assert_eq!(d.pos, cur.pos());

        ctx.set_strict("list", false)?;
        assert!(!ctx.match_at(&mut cur)?);
        ctx.set_strict("main", true)?;
        assert!(ctx.is_strict("main"));
        assert!(!g.scope("main").unwrap().is_strict());
        Ok(())
    }

    #[test]
    fn test_sub_parse() -> Result<(), ParseError> {
        let g = grammar();
        let config = ParserConfig::default();
        let mut hub = Hub::default();
        let ctx = Context::new(&g, &config, &mut hub)?;
        let tree = ctx.sub_parse(["one two", "three"])?;
        let words: Vec<&str> = tree.by_tag("word").iter().map(|m| m.text.as_str()).collect();
        assert_eq!(words, vec!["one", "two", "three"]);
        assert_eq!(ctx.tree().len(), 1);
        Ok(())
    }
}
