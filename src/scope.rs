use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{
    error::ParseError,
    expr::Expr,
    registry::{Compiler, Instruction, Registry},
    rule::Rule,
    tree::Value,
    LOG_TARGET,
};

/// A named, ordered list of rules. In a strict scope, failing every rule
/// aborts the parse.
#[derive(Debug, Clone)]
pub struct Scope {
    name: String,
    rules: Vec<Rule>,
    strict: bool,
}

impl Scope {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

/// What a rule matches.
#[derive(Debug, Clone)]
pub enum Pattern {
    Expr(Expr),
    Regex(String),
    Always,
}

impl From<Expr> for Pattern {
    fn from(e: Expr) -> Self {
        Self::Expr(e)
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Self::Regex(s.to_string())
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::Regex(s)
    }
}

/// A rule in a grammar description: a pattern and its instructions.
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pattern: Pattern,
    instructions: Vec<Instruction>,
}

impl RuleSpec {
    pub fn new(pattern: impl Into<Pattern>) -> Self {
        Self {
            pattern: pattern.into(),
            instructions: vec![],
        }
    }

    pub fn with(mut self, instruction: impl Into<Instruction>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    fn expr(&self) -> Result<Expr, ParseError> {
        match &self.pattern {
            Pattern::Expr(e) => Ok(e.clone()),
            Pattern::Regex(re) => Expr::regex(re),
            Pattern::Always => Ok(Expr::always()),
        }
    }
}

pub fn rule(pattern: impl Into<Pattern>) -> RuleSpec {
    RuleSpec::new(pattern)
}

/// a rule matching anywhere without consuming
pub fn always() -> RuleSpec {
    RuleSpec::new(Pattern::Always)
}

#[derive(Debug, Clone)]
enum Entry {
    Spec(RuleSpec),
    Built(Rule),
}

/// Scope name to scope. Immutable once built; share it through an `Arc`.
#[derive(Debug, Clone)]
pub struct Grammar {
    scopes: HashMap<String, Scope>,
}

impl Grammar {
    pub const MAIN: &'static str = "main";

    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct GrammarBuilder {
    order: Vec<String>,
    entries: HashMap<String, Vec<Entry>>,
    strict: HashSet<String>,
    registry: Registry,
}

impl GrammarBuilder {
    fn entries(&mut self, name: &str) -> &mut Vec<Entry> {
        if !self.entries.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.entries.entry(name.to_string()).or_default()
    }

    /// Adds rules described by patterns and instructions. Repeated calls for
    /// one name append to the same scope.
    pub fn scope<I>(mut self, name: &str, rules: I) -> Self
    where
        I: IntoIterator<Item = RuleSpec>,
    {
        let entries = self.entries(name);
        entries.extend(rules.into_iter().map(Entry::Spec));
        self
    }

    /// Adds ready-made rules.
    pub fn scope_rules<I>(mut self, name: &str, rules: I) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        let entries = self.entries(name);
        entries.extend(rules.into_iter().map(Entry::Built));
        self
    }

    pub fn strict(mut self, name: &str) -> Self {
        self.strict.insert(name.to_string());
        self
    }

    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn validator<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&str, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.registry.register_validator(name, f);
        self
    }

    pub fn processor<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&str, &[Value]) -> String + Send + Sync + 'static,
    {
        self.registry.register_processor(name, f);
        self
    }

    pub fn build(mut self) -> Result<Grammar, ParseError> {
        if !self.entries.contains_key(Grammar::MAIN) {
            return Err(ParseError::grammar("grammar has no \"main\" scope"));
        }
        let names: HashSet<String> = self.order.iter().cloned().collect();
        if let Some(unknown) = self.strict.iter().find(|s| !names.contains(*s)) {
            return Err(ParseError::grammar(format!(
                "strict flag on unknown scope \"{unknown}\""
            )));
        }
        let compiler = Compiler {
            registry: &self.registry,
            scopes: &names,
        };
        let mut scopes = HashMap::new();
        for name in &self.order {
            let entries = self.entries.remove(name).unwrap_or_default();
            let mut rules = Vec::with_capacity(entries.len());
            for (i, entry) in entries.into_iter().enumerate() {
                let rule = match entry {
                    Entry::Built(r) => r,
                    Entry::Spec(spec) => compiler
                        .compile(spec.expr()?, &spec.instructions)
                        .map_err(|e| match e {
                            ParseError::Grammar(msg) => {
                                ParseError::Grammar(format!("scope \"{name}\", rule {i}: {msg}"))
                            }
                            e => e,
                        })?,
                };
                rules.push(rule);
            }
            let scope = Scope {
                name: name.clone(),
                rules,
                strict: self.strict.contains(name),
            };
            scopes.insert(name.clone(), scope);
        }
        debug!(target: LOG_TARGET, "grammar built ({} scopes)", scopes.len());
        Ok(Grammar { scopes })
    }
}
