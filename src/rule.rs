use std::{fmt, sync::Arc};

use crate::{
    context::Context, cursor::Cursor, error::ParseError, expr::Expr, logging::Loggable,
    matching::Match,
};

/// Decides from the parse state alone whether a rule is tried at all.
pub type PreCheck = Arc<dyn Fn(&Cursor<'_>, &Context<'_>) -> bool + Send + Sync>;

/// Accepts or rejects a match, the cursor standing after it.
pub type PostCheck = Arc<dyn Fn(&Cursor<'_>, &Context<'_>, &Match) -> bool + Send + Sync>;

pub type Transform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Runs after a rule matched. May move the cursor, change the scope stack,
/// save the match, or fail the parse.
pub type Callback =
    Arc<dyn Fn(&mut Cursor<'_>, &mut Context<'_>, &Match) -> Result<(), ParseError> + Send + Sync>;

/// An expression plus the checks, tag, text transforms and callbacks applied
/// when it matches.
#[derive(Clone)]
pub struct Rule {
    pub(crate) expr: Expr,
    pub(crate) pre: Vec<PreCheck>,
    pub(crate) post: Vec<PostCheck>,
    pub(crate) tag: Option<String>,
    pub(crate) transforms: Vec<Transform>,
    pub(crate) callbacks: Vec<Callback>,
}

impl Rule {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            pre: vec![],
            post: vec![],
            tag: None,
            transforms: vec![],
            callbacks: vec![],
        }
    }

    /// zero-width, matches anywhere
    pub fn always() -> Self {
        Self::new(Expr::always())
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn pre<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cursor<'_>, &Context<'_>) -> bool + Send + Sync + 'static,
    {
        self.pre.push(Arc::new(f));
        self
    }

    pub fn post<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cursor<'_>, &Context<'_>, &Match) -> bool + Send + Sync + 'static,
    {
        self.post.push(Arc::new(f));
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(f));
        self
    }

    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Cursor<'_>, &mut Context<'_>, &Match) -> Result<(), ParseError>
            + Send
            + Sync
            + 'static,
    {
        self.callbacks.push(Arc::new(f));
        self
    }

    /// Pre-checks, then the expression, then post-checks. On success the tag
    /// and text transforms are applied and the callbacks run in order.
    ///
    /// A rejected or failed rule leaves the cursor where it was. Callback
    /// errors are returned as they are.
    pub fn match_at(&self, cur: &mut Cursor<'_>, ctx: &mut Context<'_>) -> Result<Match, ParseError> {
        let start = cur.pos();
        if !self.pre.iter().all(|f| f(&*cur, &*ctx)) {
            let e = ParseError::PreCheck { pos: start };
            cur.log_failure("rule", &self.tag, &e);
            return Err(e);
        }
        let mut m = self.expr.attempt(cur)?;
        if !self.post.iter().all(|f| f(&*cur, &*ctx, &m)) {
            cur.set_pos(start);
            let e = ParseError::PostCheck { pos: start };
            cur.log_failure("rule", &self.tag, &e);
            return Err(e);
        }
        if let Some(tag) = &self.tag {
            m.tag = Some(tag.clone());
        }
        for t in &self.transforms {
            m.text = t(&m.text);
        }
        for cb in &self.callbacks {
            cb(cur, ctx, &m)?;
        }
        Ok(m)
    }
}

impl From<Expr> for Rule {
    fn from(expr: Expr) -> Self {
        Self::new(expr)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Rule")
            .field("expr", &self.expr.to_string())
            .field("tag", &self.tag)
            .field("pre", &self.pre.len())
            .field("post", &self.post.len())
            .field("transforms", &self.transforms.len())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
