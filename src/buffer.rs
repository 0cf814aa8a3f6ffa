use std::{fmt, fs, path::Path};

use log::info;

use crate::{cursor::Cursor, error::ParseError, LOG_TARGET};

/// (line index, column) into a [`Buffer`]. Columns are byte offsets into the
/// line text, always on a char boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    #[inline]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl From<(usize, usize)> for Position {
    fn from((line, col): (usize, usize)) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    None,
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }
}

fn split_ending(raw: &str) -> (&str, LineEnding) {
    if let Some(s) = raw.strip_suffix("\r\n") {
        (s, LineEnding::CrLf)
    } else if let Some(s) = raw.strip_suffix('\n') {
        (s, LineEnding::Lf)
    } else if let Some(s) = raw.strip_suffix('\r') {
        (s, LineEnding::Cr)
    } else {
        (raw, LineEnding::None)
    }
}

/// One line of source text, stored without its line ending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    text: String,
    index: usize,
    offset: usize,
    ending: LineEnding,
    last: bool,
}

impl Line {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// byte offset of the line start within the whole source
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn ending(&self) -> LineEnding {
        self.ending
    }

    pub fn is_last(&self) -> bool {
        self.last
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_white(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn uses_crlf(&self) -> bool {
        self.ending == LineEnding::CrLf
    }

    /// leading whitespace
    pub fn indent(&self) -> &str {
        let body = self.text.trim_start();
        &self.text[..self.text.len() - body.len()]
    }

    /// trailing whitespace
    pub fn trailing(&self) -> &str {
        &self.text[self.text.trim_end().len()..]
    }

    /// text including the original line ending
    pub fn full(&self) -> String {
        format!("{}{}", self.text, self.ending.as_str())
    }
}

/// Immutable, line-indexed text. Built once, read by any number of cursors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    lines: Vec<Line>,
    reversed: bool,
}

impl Buffer {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::read_lines(lines, false)
    }

    /// Each line is stored with its characters reversed, so that grammars can
    /// look behind by matching forwards.
    pub fn from_lines_reversed<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::read_lines(lines, true)
    }

    pub fn from_text(text: &str) -> Self {
        Self::read_lines(text.split_inclusive('\n'), false)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        info!(target: LOG_TARGET, "reading buffer from file {}", path.display());
        let text = fs::read_to_string(path)?;
        Ok(Self::from_text(&text))
    }

    fn read_lines<I, S>(lines: I, reversed: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut offset = 0;
        let mut out = Vec::new();
        for (index, raw) in lines.into_iter().enumerate() {
            let raw = raw.as_ref();
            let (text, ending) = split_ending(raw);
            let text = if reversed {
                text.chars().rev().collect()
            } else {
                text.to_string()
            };
            out.push(Line {
                text,
                index,
                offset,
                ending,
                last: false,
            });
            offset += raw.len();
        }
        if let Some(last) = out.last_mut() {
            last.last = true;
        }
        info!(target: LOG_TARGET, "buffer initialized ({} lines)", out.len());
        Self {
            lines: out,
            reversed,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// total source length in bytes, line endings included
    pub fn byte_len(&self) -> usize {
        self.lines
            .last()
            .map(|l| l.offset + l.text.len() + l.ending.as_str().len())
            .unwrap_or_default()
    }

    /// end of the last line
    pub fn last_pos(&self) -> Position {
        match self.lines.last() {
            Some(l) => Position::new(self.lines.len() - 1, l.len()),
            None => Position::default(),
        }
    }

    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(self, Position::default())
    }

    pub fn cursor_at(&self, pos: impl Into<Position>) -> Cursor<'_> {
        Cursor::new(self, pos.into())
    }

    fn clamp(&self, pos: Position) -> Position {
        match self.lines.get(pos.line) {
            Some(l) => Position::new(pos.line, floor_boundary(&l.text, pos.col.min(l.len()))),
            None => self.last_pos(),
        }
    }

    fn slice(&self, line: usize, from: usize, to: usize) -> &str {
        self.lines
            .get(line)
            .and_then(|l| l.text.get(from..to.max(from)))
            .unwrap_or_default()
    }

    /// text of the line before `pos`
    pub fn before(&self, pos: Position) -> &str {
        let pos = self.clamp(pos);
        self.slice(pos.line, 0, pos.col)
    }

    /// text of the line from `pos` onwards
    pub fn after(&self, pos: Position) -> &str {
        let pos = self.clamp(pos);
        let len = self.lines.get(pos.line).map(Line::len).unwrap_or_default();
        self.slice(pos.line, pos.col, len)
    }

    pub fn lines_between(&self, from: Position, to: Position) -> Vec<&str> {
        let (from, to) = (self.clamp(from), self.clamp(to));
        if self.is_empty() || to < from {
            return vec![];
        }
        let mut out = Vec::with_capacity(to.line - from.line + 1);
        let mut col = from.col;
        for line in from.line..to.line {
            let len = self.lines[line].len();
            out.push(self.slice(line, col, len));
            col = 0;
        }
        out.push(self.slice(to.line, col, to.col));
        out
    }

    pub fn between(&self, from: Position, to: Position) -> String {
        self.between_with(from, to, "\n")
    }

    pub fn between_with(&self, from: Position, to: Position, sep: &str) -> String {
        self.lines_between(from, to).join(sep)
    }

    /// excerpt of the line around `pos`, with a caret marker line
    pub fn describe_at(&self, pos: Position, width: usize) -> String {
        self.render(pos, pos, width)
    }

    /// excerpt of the line around a span, with a dash marker under it.
    /// Spans over several lines are shown up to the end of the first line.
    pub fn describe(&self, from: Position, to: Position, width: usize) -> String {
        self.render(from, to, width)
    }

    fn render(&self, from: Position, to: Position, width: usize) -> String {
        let from = self.clamp(from);
        let Some(line) = self.lines.get(from.line) else {
            return String::new();
        };
        let text = line.text();
        let to_col = if to.line == from.line {
            floor_boundary(text, to.col.clamp(from.col, text.len()))
        } else {
            text.len()
        };
        let (b, e) = if width == 0 {
            (0, text.len())
        } else {
            (
                floor_boundary(text, from.col.saturating_sub(width)),
                ceil_boundary(text, to_col.saturating_add(width).min(text.len())),
            )
        };
        let excerpt = &text[b..e];
        let lead = text[b..from.col].chars().count();
        let marker = if to_col > from.col {
            let span = text[from.col..to_col].chars().count();
            format!("{}{}", " ".repeat(lead), "-".repeat(span))
        } else {
            format!("{}^", " ".repeat(lead))
        };
        format!("{excerpt}\n{marker}")
    }
}

pub(crate) fn floor_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
