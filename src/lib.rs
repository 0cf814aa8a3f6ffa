#![warn(clippy::all)]
#![warn(clippy::correctness)]
#![warn(clippy::style)]
#![warn(clippy::complexity)]
#![warn(clippy::perf)]

//! Line-oriented pattern matching with scoped rules.
//!
//! A [`Grammar`](prelude::sl::Grammar) maps scope names to ordered rule
//! lists. The [`Parser`](prelude::sl::Parser) walks a cursor through a
//! buffer, and at each position the rules of the current scope are tried in
//! order. Rule instructions open, close and swap scopes, so the result is a
//! tree of scopes holding the saved matches.
//!
//!```rust
//! use scopeline::prelude::*;
//!
//! let grammar = sl::Grammar::builder()
//!     .scope("main", [sl::rule(r"^>\s*.*").with(("open", "quote"))])
//!     .scope("quote", [sl::rule(r"^>.*"), sl::always().with("close")])
//!     .build()?;
//! let tree = sl::Parser::new(grammar).parse_lines(["> hi", "> there", "bye"])?;
//! let quote = tree.scopes_named("quote").next().unwrap();
//! assert_eq!(tree.matches(quote).len(), 2);
//! # Ok::<(), sl::ParseError>(())
//!```

mod buffer;
mod contrib;
mod context;
mod cursor;
mod error;
mod event;
mod expr;
mod logging;
mod matching;
mod multiplicity;
mod parser;
mod registry;
mod rule;
mod scope;
mod tree;
mod util;

pub mod prelude;

pub(crate) const LOG_TARGET: &str = "sl"; // env!("CARGO_PKG_NAME");
