use std::{path::Path, sync::Arc};

use log::{debug, error, info};

use crate::{
    buffer::{Buffer, Position},
    context::Context,
    cursor::Cursor,
    error::ParseError,
    event::{Channel, Event, Hub},
    scope::Grammar,
    tree::ScopeTree,
    LOG_TARGET,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// scope opened under the root before parsing, unless it is "main"
    pub start: String,
    /// scope the parse must end in
    pub end: Option<String>,
    /// iterations allowed at an unchanged position before giving up
    pub max_stall: usize,
    /// save every winning, non-empty match, not just explicitly saved ones
    pub record_all: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            start: Grammar::MAIN.to_string(),
            end: None,
            max_stall: 1000,
            record_all: true,
        }
    }
}

impl ParserConfig {
    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = start.into();
        self
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn with_max_stall(mut self, max_stall: usize) -> Self {
        self.max_stall = max_stall;
        self
    }

    pub fn with_record_all(mut self, record_all: bool) -> Self {
        self.record_all = record_all;
        self
    }
}

/// Counts consecutive loop iterations that leave the cursor in place.
#[derive(Debug)]
struct Fuse {
    pos: Position,
    count: usize,
    max: usize,
}

impl Fuse {
    fn new(pos: Position, max: usize) -> Self {
        Self { pos, count: 0, max }
    }

    /// false once the cursor has stalled for too long
    fn update(&mut self, pos: Position) -> bool {
        if pos == self.pos {
            self.count += 1;
            self.count < self.max
        } else {
            self.pos = pos;
            self.count = 0;
            true
        }
    }
}

/// Runs a grammar over a cursor until the end of the buffer.
pub(crate) fn drive(
    grammar: &Grammar,
    config: &ParserConfig,
    hub: &mut Hub,
    cur: &mut Cursor<'_>,
) -> Result<ScopeTree, ParseError> {
    info!(target: LOG_TARGET, "parse from {} ({} lines)", cur.pos(), cur.buffer().len());
    let mut ctx = Context::new(grammar, config, hub)?;
    let mut fuse = Fuse::new(cur.pos(), config.max_stall);
    while !cur.at_end() {
        if cur.at_line_start() {
            ctx.publish(&Event::BeginOfLine(cur.pos()));
        }
        // at line end the next line is the way forward
        if !ctx.match_at(cur)? && !cur.at_line_end() {
            cur.advance(1);
        }
        if cur.at_line_end() {
            ctx.publish(&Event::EndOfLine(cur.pos()));
            cur.next_line();
        }
        if !fuse.update(cur.pos()) {
            let msg = format!(
                "cursor stuck for {} iterations in scope \"{}\"",
                config.max_stall,
                ctx.scope_name()
            );
            let d = ctx.diagnostic(cur, msg);
            error!(target: LOG_TARGET, "{d}");
            return Err(ParseError::Stuck(d));
        }
    }
    if let Some(end) = &config.end {
        if ctx.scope_name() != end {
            let msg = format!(
                "parse should end in scope \"{end}\" but ended in \"{}\"",
                ctx.scope_name()
            );
            return Err(ctx.error(cur, msg));
        }
    }
    let tree = ctx.into_tree();
    info!(target: LOG_TARGET, "parse done ({} scopes)", tree.len());
    Ok(tree)
}

/// A grammar ready to run, plus the subscribers notified during each parse.
#[derive(Debug)]
pub struct Parser {
    grammar: Arc<Grammar>,
    config: ParserConfig,
    hub: Hub,
}

impl Parser {
    pub fn new(grammar: impl Into<Arc<Grammar>>) -> Self {
        Self {
            grammar: grammar.into(),
            config: ParserConfig::default(),
            hub: Hub::default(),
        }
    }

    /// Fails if the start or end scope is not in the grammar.
    pub fn with_config(
        grammar: impl Into<Arc<Grammar>>,
        config: ParserConfig,
    ) -> Result<Self, ParseError> {
        let grammar = grammar.into();
        for name in std::iter::once(&config.start).chain(config.end.as_ref()) {
            if !grammar.contains(name) {
                return Err(ParseError::grammar(format!("unknown scope \"{name}\"")));
            }
        }
        debug!(target: LOG_TARGET, "parser configured: {config:?}");
        Ok(Self {
            grammar,
            config,
            hub: Hub::default(),
        })
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn subscribe<F>(&mut self, channel: Channel, f: F) -> &mut Self
    where
        F: FnMut(&Event<'_>) + 'static,
    {
        self.hub.subscribe(channel, f);
        self
    }

    /// Parses from the cursor to the end of its buffer. The cursor is left
    /// at the end.
    pub fn parse(&mut self, cur: &mut Cursor<'_>) -> Result<ScopeTree, ParseError> {
        drive(&self.grammar, &self.config, &mut self.hub, cur)
    }

    pub fn parse_buffer(&mut self, buf: &Buffer) -> Result<ScopeTree, ParseError> {
        self.parse(&mut buf.cursor())
    }

    pub fn parse_str(&mut self, text: &str) -> Result<ScopeTree, ParseError> {
        self.parse_buffer(&Buffer::from_text(text))
    }

    pub fn parse_lines<I, S>(&mut self, lines: I) -> Result<ScopeTree, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parse_buffer(&Buffer::from_lines(lines))
    }

    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<ScopeTree, ParseError> {
        self.parse_buffer(&Buffer::from_file(path)?)
    }
}
