use std::{collections::HashMap, collections::HashSet, fmt, sync::Arc};

use once_cell::sync::Lazy;
use strum_macros::{Display, EnumString, EnumVariantNames};

use crate::{
    context::Context,
    cursor::Cursor,
    error::ParseError,
    expr::Expr,
    matching::Match,
    rule::{Callback, PostCheck, PreCheck, Rule, Transform},
    tree::Value,
};

/// A named check on matched text, with extra arguments from the grammar.
pub type Validator = Arc<dyn Fn(&str, &[Value]) -> bool + Send + Sync>;

/// A named rewrite of matched text, with extra arguments from the grammar.
pub type Processor = Arc<dyn Fn(&str, &[Value]) -> String + Send + Sync>;

/// The instruction set usable in grammar descriptions, with its aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum Mnemonic {
    #[strum(serialize = "error", serialize = "raise", serialize = "err")]
    Error,
    #[strum(serialize = "replace", serialize = "rep", serialize = "sub")]
    Replace,
    #[strum(serialize = "increment", serialize = "inc")]
    Increment,
    #[strum(serialize = "decrement", serialize = "dec")]
    Decrement,
    #[strum(serialize = "define", serialize = "def", serialize = "let")]
    Define,
    Append,
    #[strum(serialize = "tag", serialize = "label")]
    Tag,
    #[strum(serialize = "pre", serialize = "check", serialize = "chk")]
    Pre,
    #[strum(serialize = "post", serialize = "validate", serialize = "valid")]
    Post,
    #[strum(serialize = "proc", serialize = "apply", serialize = "do")]
    Proc,
    #[strum(serialize = "call", serialize = "cb")]
    Call,
    Save,
    Strict,
    Relax,
    #[strum(serialize = "open", serialize = "push")]
    Open,
    #[strum(serialize = "close", serialize = "pop")]
    Close,
    #[strum(serialize = "swap", serialize = "swp")]
    Swap,
    #[strum(serialize = "next", serialize = "nxt")]
    Next,
    #[strum(serialize = "advance", serialize = "adv")]
    Advance,
    #[strum(serialize = "reverse", serialize = "rev")]
    Reverse,
    Goto,
}

/// An instruction argument: plain data, or a host function.
#[derive(Clone)]
pub enum Arg {
    Text(String),
    Int(i64),
    Pre(PreCheck),
    Post(PostCheck),
    Transform(Transform),
    Call(Callback),
}

impl Arg {
    pub fn pre<F>(f: F) -> Self
    where
        F: Fn(&Cursor<'_>, &Context<'_>) -> bool + Send + Sync + 'static,
    {
        Self::Pre(Arc::new(f))
    }

    pub fn post<F>(f: F) -> Self
    where
        F: Fn(&Cursor<'_>, &Context<'_>, &Match) -> bool + Send + Sync + 'static,
    {
        Self::Post(Arc::new(f))
    }

    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self::Transform(Arc::new(f))
    }

    pub fn call<F>(f: F) -> Self
    where
        F: Fn(&mut Cursor<'_>, &mut Context<'_>, &Match) -> Result<(), ParseError>
            + Send
            + Sync
            + 'static,
    {
        Self::Call(Arc::new(f))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Int(_) => "integer",
            Self::Pre(_) => "pre-check",
            Self::Post(_) => "post-check",
            Self::Transform(_) => "transform",
            Self::Call(_) => "callback",
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Int(i) => write!(f, "{i}"),
            other => write!(f, "<{}>", other.kind()),
        }
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Arg {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Arg {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<usize> for Arg {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

/// One step of a rule description, e.g. `"save"`, `("tag", "word")` or
/// `("next", "list", 1)`. The mnemonic is resolved when the grammar is built.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub mnemonic: String,
    pub args: Vec<Arg>,
}

impl Instruction {
    pub fn new(mnemonic: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            args,
        }
    }
}

impl From<&str> for Instruction {
    fn from(mnemonic: &str) -> Self {
        Self::new(mnemonic, vec![])
    }
}

impl<A: Into<Arg>> From<(&str, A)> for Instruction {
    fn from((mnemonic, a): (&str, A)) -> Self {
        Self::new(mnemonic, vec![a.into()])
    }
}

impl<A: Into<Arg>, B: Into<Arg>> From<(&str, A, B)> for Instruction {
    fn from((mnemonic, a, b): (&str, A, B)) -> Self {
        Self::new(mnemonic, vec![a.into(), b.into()])
    }
}

impl<A: Into<Arg>, B: Into<Arg>, C: Into<Arg>> From<(&str, A, B, C)> for Instruction {
    fn from((mnemonic, a, b, c): (&str, A, B, C)) -> Self {
        Self::new(mnemonic, vec![a.into(), b.into(), c.into()])
    }
}

fn int_arg(args: &[Value], i: usize) -> Option<usize> {
    args.get(i)?.as_int().and_then(|n| usize::try_from(n).ok())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

static VALIDATORS: Lazy<HashMap<&'static str, Validator>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, Validator> = HashMap::new();
    m.insert("nonempty", Arc::new(|s: &str, _: &[Value]| !s.trim().is_empty()));
    m.insert("int", Arc::new(|s: &str, _: &[Value]| s.trim().parse::<i64>().is_ok()));
    m.insert("float", Arc::new(|s: &str, _: &[Value]| s.trim().parse::<f64>().is_ok()));
    m.insert(
        "word",
        Arc::new(|s: &str, _: &[Value]| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')),
    );
    m.insert(
        "upper",
        Arc::new(|s: &str, _: &[Value]| s.chars().any(char::is_alphabetic) && !s.chars().any(char::is_lowercase)),
    );
    m.insert(
        "lower",
        Arc::new(|s: &str, _: &[Value]| s.chars().any(char::is_alphabetic) && !s.chars().any(char::is_uppercase)),
    );
    m.insert(
        "len",
        Arc::new(|s: &str, a: &[Value]| int_arg(a, 0).map_or(false, |n| char_len(s) == n)),
    );
    m.insert(
        "min_len",
        Arc::new(|s: &str, a: &[Value]| int_arg(a, 0).map_or(false, |n| char_len(s) >= n)),
    );
    m.insert(
        "max_len",
        Arc::new(|s: &str, a: &[Value]| int_arg(a, 0).map_or(false, |n| char_len(s) <= n)),
    );
    m.insert(
        "one_of",
        Arc::new(|s: &str, a: &[Value]| a.iter().any(|v| v.as_text() == Some(s))),
    );
    m
});

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

static PROCESSORS: Lazy<HashMap<&'static str, Processor>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, Processor> = HashMap::new();
    m.insert("strip", Arc::new(|s: &str, _: &[Value]| s.trim().to_string()));
    m.insert("lower", Arc::new(|s: &str, _: &[Value]| s.to_lowercase()));
    m.insert("upper", Arc::new(|s: &str, _: &[Value]| s.to_uppercase()));
    m.insert("unescape", Arc::new(|s: &str, _: &[Value]| unescape(s)));
    m.insert(
        "collapse",
        Arc::new(|s: &str, _: &[Value]| s.split_whitespace().collect::<Vec<_>>().join(" ")),
    );
    // chars [start, end), end defaulting to the text end
    m.insert(
        "slice",
        Arc::new(|s: &str, a: &[Value]| {
            let start = int_arg(a, 0).unwrap_or(0);
            let end = int_arg(a, 1).unwrap_or(usize::MAX);
            s.chars()
                .skip(start)
                .take(end.saturating_sub(start))
                .collect()
        }),
    );
    m
});

/// Named validators and processors for grammar descriptions, and the
/// compiler turning instruction lists into [`Rule`]s.
#[derive(Clone)]
pub struct Registry {
    validators: HashMap<String, Validator>,
    processors: HashMap<String, Processor>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            validators: VALIDATORS
                .iter()
                .map(|(k, v)| (k.to_string(), Arc::clone(v)))
                .collect(),
            processors: PROCESSORS
                .iter()
                .map(|(k, v)| (k.to_string(), Arc::clone(v)))
                .collect(),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut v: Vec<&String> = self.validators.keys().collect();
        let mut p: Vec<&String> = self.processors.keys().collect();
        v.sort();
        p.sort();
        f.debug_struct("Registry")
            .field("validators", &v)
            .field("processors", &p)
            .finish()
    }
}

/// What instruction compilation needs to know about the grammar being built.
pub(crate) struct Compiler<'a> {
    pub registry: &'a Registry,
    pub scopes: &'a HashSet<String>,
}

impl Registry {
    pub fn register_validator<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&str, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.validators.insert(name.into(), Arc::new(f));
        self
    }

    pub fn register_processor<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&str, &[Value]) -> String + Send + Sync + 'static,
    {
        self.processors.insert(name.into(), Arc::new(f));
        self
    }

    pub fn validator(&self, name: &str) -> Option<&Validator> {
        self.validators.get(name)
    }

    pub fn processor(&self, name: &str) -> Option<&Processor> {
        self.processors.get(name)
    }
}

struct Args<'i> {
    mnemonic: Mnemonic,
    args: &'i [Arg],
}

impl<'i> Args<'i> {
    fn err(&self, msg: impl fmt::Display) -> ParseError {
        ParseError::grammar(format!("instruction '{}' {msg} (got {:?})", self.mnemonic, self.args))
    }

    fn count(&self, min: usize, max: usize) -> Result<(), ParseError> {
        if self.args.len() < min || self.args.len() > max {
            return Err(self.err(format!("takes {min} to {max} arguments")));
        }
        Ok(())
    }

    fn text(&self, i: usize) -> Result<String, ParseError> {
        match self.args.get(i) {
            Some(Arg::Text(s)) => Ok(s.clone()),
            _ => Err(self.err(format!("expects text as argument {}", i + 1))),
        }
    }

    fn int_or(&self, i: usize, default: i64) -> Result<i64, ParseError> {
        match self.args.get(i) {
            None => Ok(default),
            Some(Arg::Int(n)) => Ok(*n),
            Some(_) => Err(self.err(format!("expects an integer as argument {}", i + 1))),
        }
    }

    fn level(&self, i: usize) -> Result<usize, ParseError> {
        usize::try_from(self.int_or(i, 0)?).map_err(|_| self.err("expects a non-negative level"))
    }

    fn value(&self, i: usize) -> Result<Value, ParseError> {
        match self.args.get(i) {
            Some(Arg::Text(s)) => Ok(Value::Text(s.clone())),
            Some(Arg::Int(n)) => Ok(Value::Int(*n)),
            _ => Err(self.err(format!("expects text or an integer as argument {}", i + 1))),
        }
    }

    fn values_from(&self, i: usize) -> Result<Vec<Value>, ParseError> {
        (i..self.args.len()).map(|k| self.value(k)).collect()
    }
}

fn call<F>(f: F) -> Callback
where
    F: Fn(&mut Cursor<'_>, &mut Context<'_>, &Match) -> Result<(), ParseError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

fn save() -> Callback {
    call(|_, ctx, m| {
        ctx.save(m);
        Ok(())
    })
}

impl<'a> Compiler<'a> {
    fn scope(&self, a: &Args, i: usize) -> Result<String, ParseError> {
        let name = a.text(i)?;
        if !self.scopes.contains(&name) {
            return Err(a.err(format!("refers to unknown scope '{name}'")));
        }
        Ok(name)
    }

    /// Builds a rule from an expression and its instructions, validating
    /// every mnemonic, argument and name on the way.
    pub fn compile(&self, expr: Expr, instructions: &[Instruction]) -> Result<Rule, ParseError> {
        let mut rule = Rule::new(expr);
        for ins in instructions {
            let mnemonic: Mnemonic = ins
                .mnemonic
                .parse()
                .map_err(|_| ParseError::grammar(format!("unknown instruction '{}'", ins.mnemonic)))?;
            let a = Args {
                mnemonic,
                args: &ins.args,
            };
            self.apply(&mut rule, &a)?;
        }
        Ok(rule)
    }

    fn apply(&self, rule: &mut Rule, a: &Args) -> Result<(), ParseError> {
        match a.mnemonic {
            Mnemonic::Error => {
                a.count(0, 1)?;
                let msg = match a.args.first() {
                    Some(_) => a.text(0)?,
                    None => "error instruction".to_string(),
                };
                rule.callbacks
                    .push(call(move |cur, ctx, _| Err(ctx.error(cur, msg.clone()))));
            }
            Mnemonic::Replace => {
                a.count(1, 1)?;
                let text = a.text(0)?;
                rule.transforms.push(Arc::new(move |_: &str| text.clone()));
                rule.tag = Some("rep".to_string());
                rule.callbacks.push(save());
            }
            Mnemonic::Increment | Mnemonic::Decrement => {
                a.count(1, 2)?;
                let (name, level) = (a.text(0)?, a.level(1)?);
                let by = if a.mnemonic == Mnemonic::Increment { 1 } else { -1 };
                rule.callbacks
                    .push(call(move |_, ctx, _| ctx.add(&name, by, level)));
            }
            Mnemonic::Define => {
                a.count(2, 3)?;
                let (name, value, level) = (a.text(0)?, a.value(1)?, a.level(2)?);
                rule.callbacks
                    .push(call(move |_, ctx, _| ctx.set(&name, value.clone(), level)));
            }
            Mnemonic::Append => {
                a.count(2, 3)?;
                let (name, value, level) = (a.text(0)?, a.value(1)?, a.level(2)?);
                rule.callbacks
                    .push(call(move |_, ctx, _| ctx.append(&name, value.clone(), level)));
            }
            Mnemonic::Tag => {
                a.count(1, 1)?;
                rule.tag = Some(a.text(0)?);
                rule.callbacks.push(save());
            }
            Mnemonic::Pre => match a.args {
                [Arg::Pre(f)] => rule.pre.push(Arc::clone(f)),
                _ => return Err(a.err("expects a single pre-check function")),
            },
            Mnemonic::Post => match a.args.first() {
                Some(Arg::Post(f)) => {
                    a.count(1, 1)?;
                    rule.post.push(Arc::clone(f));
                }
                Some(Arg::Text(name)) => {
                    let v = self
                        .registry
                        .validator(name)
                        .cloned()
                        .ok_or_else(|| a.err(format!("uses unknown validator '{name}'")))?;
                    let extra = a.values_from(1)?;
                    rule.post.push(Arc::new(
                        move |_: &Cursor<'_>, _: &Context<'_>, m: &Match| v(&m.text, &extra),
                    ));
                }
                _ => return Err(a.err("expects a post-check function or validator name")),
            },
            Mnemonic::Proc => match a.args.first() {
                Some(Arg::Transform(f)) => {
                    a.count(1, 1)?;
                    rule.transforms.push(Arc::clone(f));
                }
                Some(Arg::Text(name)) => {
                    let p = self
                        .registry
                        .processor(name)
                        .cloned()
                        .ok_or_else(|| a.err(format!("uses unknown processor '{name}'")))?;
                    let extra = a.values_from(1)?;
                    rule.transforms.push(Arc::new(move |t: &str| p(t, &extra)));
                }
                _ => return Err(a.err("expects a transform function or processor name")),
            },
            Mnemonic::Call => match a.args {
                [Arg::Call(f)] => rule.callbacks.push(Arc::clone(f)),
                _ => return Err(a.err("expects a single callback function")),
            },
            Mnemonic::Save => {
                a.count(0, 0)?;
                rule.callbacks.push(save());
            }
            Mnemonic::Strict | Mnemonic::Relax => {
                a.count(1, 1)?;
                let name = self.scope(a, 0)?;
                let strict = a.mnemonic == Mnemonic::Strict;
                rule.callbacks
                    .push(call(move |_, ctx, _| ctx.set_strict(&name, strict)));
            }
            Mnemonic::Open => {
                a.count(1, 1)?;
                let name = self.scope(a, 0)?;
                rule.callbacks.push(call(move |_, ctx, _| ctx.open(&name)));
            }
            Mnemonic::Close => {
                a.count(0, 1)?;
                let n = a.level(0)?.max(1);
                rule.callbacks.push(call(move |_, ctx, _| ctx.close(n)));
            }
            Mnemonic::Swap => {
                a.count(1, 1)?;
                let name = self.scope(a, 0)?;
                rule.callbacks.push(call(move |_, ctx, _| ctx.swap(&name)));
            }
            Mnemonic::Next => {
                a.count(1, 2)?;
                let name = self.scope(a, 0)?;
                let n = a.level(1)?.max(1);
                rule.callbacks
                    .push(call(move |_, ctx, _| ctx.next(&name, n)));
            }
            Mnemonic::Advance | Mnemonic::Reverse => {
                a.count(1, 1)?;
                let n = a.level(0)?;
                if a.mnemonic == Mnemonic::Advance {
                    rule.callbacks.push(call(move |cur, _, _| {
                        cur.advance(n);
                        Ok(())
                    }));
                } else {
                    rule.callbacks.push(call(move |cur, _, _| {
                        cur.retreat(n);
                        Ok(())
                    }));
                }
            }
            Mnemonic::Goto => {
                a.count(1, 1)?;
                let target = a.text(0)?;
                let cb = match target.as_str() {
                    "bol" => call(|cur, _, _| {
                        cur.goto_bol();
                        Ok(())
                    }),
                    "eol" => call(|cur, _, _| {
                        cur.goto_eol();
                        Ok(())
                    }),
                    "eof" => call(|cur, _, _| {
                        cur.goto_eof();
                        Ok(())
                    }),
                    "nextline" => call(|cur, _, _| {
                        cur.next_line();
                        Ok(())
                    }),
                    _ => return Err(a.err(format!("has unknown target '{target}'"))),
                };
                rule.callbacks.push(cb);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::VariantNames;
    use test_log::test;

    fn scopes() -> HashSet<String> {
        ["main", "quote"].iter().map(|s| s.to_string()).collect()
    }

    fn compile(instructions: &[Instruction]) -> Result<Rule, ParseError> {
        let registry = Registry::default();
        let scopes = scopes();
        let c = Compiler {
            registry: &registry,
            scopes: &scopes,
        };
        c.compile(Expr::always(), instructions)
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Mnemonic::from_str("let").unwrap(), Mnemonic::Define);
        assert_eq!(Mnemonic::from_str("swp").unwrap(), Mnemonic::Swap);
        assert_eq!(Mnemonic::from_str("do").unwrap(), Mnemonic::Proc);
        assert_eq!(Mnemonic::from_str("append").unwrap(), Mnemonic::Append);
        assert!(Mnemonic::from_str("frobnicate").is_err());
        assert_eq!(Mnemonic::Goto.to_string(), "goto");
        assert!(Mnemonic::VARIANTS.contains(&"goto"));
    }

    #[test]
    fn test_compile() -> Result<(), ParseError> {
        let r = compile(&[("tag".into()), ("tag", "word").into(), "save".into()]);
        assert!(r.is_err());

        let r = compile(&[("tag", "word").into(), ("open", "quote").into(), "close".into()])?;
        assert_eq!(r.tag.as_deref(), Some("word"));
        assert_eq!(r.callbacks.len(), 3);

        let r = compile(&[("rep", "&amp;").into()])?;
        assert_eq!(r.tag.as_deref(), Some("rep"));
        assert_eq!(r.transforms.len(), 1);

        let r = compile(&[("post", "len", 3).into(), ("proc", "upper").into()])?;
        assert_eq!((r.post.len(), r.transforms.len()), (1, 1));
        Ok(())
    }

    #[test]
    fn test_compile_errors() {
        let bad: Vec<Vec<Instruction>> = vec![
            vec!["frobnicate".into()],
            vec![("open", "nowhere").into()],
            vec![("next", "main", "x").into()],
            vec![("post", "no_such_validator").into()],
            vec![("proc", "no_such_processor").into()],
            vec![("goto", "moon").into()],
            vec![("save", 1).into()],
            vec![("pre", "text").into()],
            vec![("inc", "n", -1).into()],
        ];
        for instructions in bad {
            let e = compile(&instructions).unwrap_err();
            assert!(matches!(e, ParseError::Grammar(_)), "{e}");
        }
    }

    #[test]
    fn test_builtins() {
        let r = Registry::default();
        let v = |name: &str, s: &str, args: &[Value]| (r.validator(name).unwrap())(s, args);
        assert!(v("int", " 42", &[]));
        assert!(!v("int", "4.2", &[]));
        assert!(v("float", "4.2", &[]));
        assert!(v("word", "snake_case1", &[]));
        assert!(v("upper", "ABC-1", &[]));
        assert!(!v("lower", "aBc", &[]));
        assert!(v("len", "héllo", &[Value::Int(5)]));
        assert!(!v("min_len", "ab", &[Value::Int(3)]));
        assert!(v("one_of", "b", &["a".into(), "b".into()]));
        assert!(!v("nonempty", "  ", &[]));

        let p = |name: &str, s: &str, args: &[Value]| (r.processor(name).unwrap())(s, args);
        assert_eq!(p("strip", "  x ", &[]), "x");
        assert_eq!(p("collapse", " a \t b  c", &[]), "a b c");
        assert_eq!(p("unescape", r"a\*b\n", &[]), "a*b\n");
        assert_eq!(p("slice", "abcdef", &[Value::Int(1), Value::Int(3)]), "bc");
        assert_eq!(p("slice", "abcdef", &[Value::Int(4)]), "ef");
    }

    #[test]
    fn test_register() {
        let mut r = Registry::default();
        r.register_validator("even", |s, _| s.len() % 2 == 0)
            .register_processor("twice", |s, _| s.repeat(2));
        assert!((r.validator("even").unwrap())("ab", &[]));
        assert_eq!((r.processor("twice").unwrap())("ab", &[]), "abab");
    }
}
