use std::fmt;

use regex::Regex;
use regex_automata::{meta, util::captures::Captures, Anchored, Input};

use crate::buffer::{floor_boundary, Buffer, Line, Position};
use crate::util;

/// A position into a [`Buffer`] plus the movement operations used by the
/// matching code. Cheap to copy; the buffer is only ever read.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'b> {
    buf: &'b Buffer,
    pos: Position,
}

// same buffer, same place
impl<'b> PartialEq for Cursor<'b> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.buf, other.buf) && self.pos == other.pos
    }
}

impl<'b> fmt::Display for Cursor<'b> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.pos, util::preview(self.rest(), 33))
    }
}

impl<'b> Cursor<'b> {
    pub fn new(buf: &'b Buffer, pos: Position) -> Self {
        let mut cur = Self { buf, pos };
        cur.set_pos(pos);
        cur
    }

    #[inline]
    pub fn buffer(&self) -> &'b Buffer {
        self.buf
    }

    #[inline]
    pub fn pos(&self) -> Position {
        self.pos
    }

    /// Positions past the end of a line are pulled back to the line end,
    /// positions past the last line become end-of-buffer. A column inside a
    /// char moves back to the start of that char.
    pub fn set_pos(&mut self, pos: Position) {
        self.pos = match self.buf.line(pos.line) {
            Some(line) => {
                let col = floor_boundary(line.text(), pos.col.min(line.len()));
                Position::new(pos.line, col)
            }
            None => self.eof_pos(),
        };
    }

    #[inline]
    fn eof_pos(&self) -> Position {
        Position::new(self.buf.len(), 0)
    }

    pub fn line(&self) -> Option<&'b Line> {
        self.buf.line(self.pos.line)
    }

    /// remaining text of the current line
    pub fn rest(&self) -> &'b str {
        self.line()
            .and_then(|l| l.text().get(self.pos.col..))
            .unwrap_or_default()
    }

    #[inline]
    pub fn at_line_start(&self) -> bool {
        !self.at_end() && self.pos.col == 0
    }

    #[inline]
    pub fn at_line_end(&self) -> bool {
        self.line().map_or(false, |l| self.pos.col >= l.len())
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos.line >= self.buf.len()
    }

    /// Anchored match at the cursor against the rest of the line. The whole
    /// line stays visible to the regex, so `^` only matches at column 0 and
    /// `\b` sees the char before the cursor. The cursor does not move.
    pub fn match_regex(&self, re: &meta::Regex) -> Option<Captures> {
        let text = self.line()?.text();
        let input = Input::new(text)
            .span(self.pos.col..text.len())
            .anchored(Anchored::Yes);
        let mut caps = re.create_captures();
        re.search_captures(&input, &mut caps);
        caps.is_match().then_some(caps)
    }

    /// First match at or after the cursor on the current line.
    pub fn search(&self, re: &Regex) -> Option<regex::Match<'b>> {
        let text = self.line()?.text();
        re.find_at(text, self.pos.col)
    }

    /// Move forward within the line by a byte length obtained from a match.
    pub(crate) fn skip_bytes(&mut self, n: usize) {
        if let Some(line) = self.line() {
            self.pos.col = (self.pos.col + n).min(line.len());
        }
    }

    /// Move forward `n` chars. A line break counts as one char; moving past
    /// the last line puts the cursor at end-of-buffer.
    pub fn advance(&mut self, mut n: usize) -> &mut Self {
        while n > 0 {
            let Some(line) = self.line() else {
                break;
            };
            let rest = &line.text()[self.pos.col..];
            match rest.char_indices().nth(n) {
                Some((i, _)) => {
                    self.pos.col += i;
                    n = 0;
                }
                None => {
                    let count = rest.chars().count();
                    if n <= count {
                        self.pos.col = line.len();
                        n = 0;
                    } else {
                        n -= count + 1;
                        self.next_line();
                    }
                }
            }
        }
        self
    }

    /// Move backward `n` chars, crossing line starts.
    pub fn retreat(&mut self, mut n: usize) -> &mut Self {
        if n > 0 && self.at_end() && !self.buf.is_empty() {
            self.pos = self.buf.last_pos();
            n -= 1;
        }
        while n > 0 {
            let Some(line) = self.line() else {
                break;
            };
            let before = &line.text()[..self.pos.col];
            let count = before.chars().count();
            if n <= count {
                let i = before
                    .char_indices()
                    .nth(count - n)
                    .map_or(0, |(i, _)| i);
                self.pos.col = i;
                n = 0;
            } else if self.pos.line == 0 {
                self.pos.col = 0;
                n = 0;
            } else {
                n -= count + 1;
                self.pos.line -= 1;
                self.pos.col = self.buf.line(self.pos.line).map_or(0, Line::len);
            }
        }
        self
    }

    pub fn next_line(&mut self) -> &mut Self {
        self.pos = if self.pos.line + 1 < self.buf.len() {
            Position::new(self.pos.line + 1, 0)
        } else {
            self.eof_pos()
        };
        self
    }

    pub fn goto_bol(&mut self) -> &mut Self {
        if !self.at_end() {
            self.pos.col = 0;
        }
        self
    }

    pub fn goto_eol(&mut self) -> &mut Self {
        if let Some(line) = self.line() {
            self.pos.col = line.len();
        }
        self
    }

    pub fn goto_eof(&mut self) -> &mut Self {
        self.pos = self.eof_pos();
        self
    }

    /// up to `n` chars ahead of the cursor on the current line
    pub fn ahead(&self, n: usize) -> &'b str {
        let rest = self.rest();
        let end = rest.char_indices().nth(n).map_or(rest.len(), |(i, _)| i);
        &rest[..end]
    }

    /// up to `n` chars behind the cursor on the current line
    pub fn behind(&self, n: usize) -> &'b str {
        let Some(line) = self.line() else {
            return "";
        };
        let before = &line.text()[..self.pos.col];
        let count = before.chars().count();
        let start = before
            .char_indices()
            .nth(count.saturating_sub(n))
            .map_or(before.len(), |(i, _)| i);
        &before[start..]
    }

    /// buffer text between `from` and the cursor
    pub fn text_from(&self, from: Position) -> String {
        self.buf.between(from, self.pos)
    }

    pub fn describe(&self, width: usize) -> String {
        self.buf.describe_at(self.pos, width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex_automata::util::syntax;
    use test_log::test;

    fn anchored(pattern: &str) -> meta::Regex {
        meta::Regex::new(pattern).unwrap()
    }

    const TEXT: [&str; 5] = [
        "Hello world\n",
        "  With spaces before\n",
        "\tAnd tabs before and after\t\n",
        "\r\n",
        "Last line \r ",
    ];

    #[test]
    fn test_match_anchored() {
        let buf = Buffer::from_lines(TEXT);
        let mut cur = buf.cursor();
        let hello = meta::Regex::builder()
            .syntax(syntax::Config::new().case_insensitive(true))
            .build("hello")
            .unwrap();
        assert!(cur.match_regex(&hello).is_some());
        assert!(cur.match_regex(&anchored("world")).is_none());
        let world = Regex::new("world").unwrap();
        assert_eq!(cur.search(&world).map(|m| m.start()), Some(6));

        cur.set_pos(Position::new(2, 5));
        assert_eq!(cur.behind(4), "And ");
        assert!(cur.search(&Regex::new("And").unwrap()).is_none());
        let tabs = cur.match_regex(&anchored("tabs")).unwrap();
        assert_eq!(tabs.get_match().map(|m| m.range()), Some(5..9));
        // ^ is a line start, not a cursor start
        assert!(cur.match_regex(&anchored("^tabs")).is_none());
        // the char before the cursor is still seen
        assert!(cur.match_regex(&anchored(r"\btabs")).is_some());
        cur.set_pos(Position::new(2, 6));
        assert!(cur.match_regex(&anchored(r"\babs")).is_none());
        assert!(cur.match_regex(&anchored("t")).is_none());
        cur.set_pos(Position::new(2, 5));
        assert_eq!(cur.pos(), Position::new(2, 5));
    }

    #[test]
    fn test_line_flags() {
        let buf = Buffer::from_lines(TEXT);
        let mut cur = buf.cursor_at((3, 0));
        assert!(cur.at_line_start());
        assert!(cur.at_line_end());
        assert!(cur.line().unwrap().is_empty());
        cur.next_line();
        assert!(cur.line().unwrap().is_last());
        cur.next_line();
        assert!(cur.at_end());
        assert!(!cur.at_line_start());
        assert!(!cur.at_line_end());
    }

    #[test]
    fn test_advance() {
        let buf = Buffer::from_lines(["ab", "", "cd"]);
        let mut cur = buf.cursor();
        cur.advance(1);
        assert_eq!(cur.pos(), Position::new(0, 1));
        cur.advance(1);
        assert_eq!(cur.pos(), Position::new(0, 2));
        assert!(cur.at_line_end());
        // the line break counts as one char
        cur.advance(1);
        assert_eq!(cur.pos(), Position::new(1, 0));
        cur.advance(2);
        assert_eq!(cur.pos(), Position::new(2, 1));
        cur.advance(10);
        assert!(cur.at_end());

        cur.retreat(1);
        assert_eq!(cur.pos(), Position::new(2, 2));
        cur.retreat(3);
        assert_eq!(cur.pos(), Position::new(1, 0));
        cur.retreat(2);
        assert_eq!(cur.pos(), Position::new(0, 1));
        cur.retreat(9);
        assert_eq!(cur.pos(), Position::new(0, 0));
    }

    #[test]
    fn test_multibyte() {
        let buf = Buffer::from_lines(["héllo"]);
        let mut cur = buf.cursor();
        cur.advance(2);
        assert_eq!(cur.pos(), Position::new(0, 3));
        assert_eq!(cur.ahead(2), "ll");
        assert_eq!(cur.behind(5), "hé");
        assert_eq!(cur.text_from(Position::new(0, 0)), "hé");

        // a column inside 'é' moves back to its start
        let mut cur = buf.cursor_at((0, 2));
        assert_eq!(cur.pos(), Position::new(0, 1));
        assert_eq!(cur.rest(), "éllo");
        cur.advance(1);
        assert_eq!(cur.pos(), Position::new(0, 3));
        cur.set_pos(Position::new(0, 2));
        assert_eq!(cur.behind(1), "h");
        cur.retreat(1);
        assert_eq!(cur.pos(), Position::new(0, 0));
    }

    #[test]
    fn test_goto() {
        let buf = Buffer::from_lines(["one", "two"]);
        let mut cur = buf.cursor();
        cur.goto_eol();
        assert_eq!(cur.pos(), Position::new(0, 3));
        cur.goto_bol();
        assert_eq!(cur.pos(), Position::new(0, 0));
        cur.goto_eof();
        assert!(cur.at_end());
        assert_eq!(cur.rest(), "");
        cur.set_pos(Position::new(1, 99));
        assert_eq!(cur.pos(), Position::new(1, 3));
    }
}
