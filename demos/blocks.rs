//! A Markdown-like block grammar: headings, rules, fenced code, nested lists,
//! paragraphs, and blockquotes whose contents are parsed again with the same
//! grammar.
//!
//! RUST_LOG=debug cargo run --example blocks

use scopeline::prelude::sl::{
    always, rule, Arg, Context, Cursor, Expr, Grammar, Match, ParseError, Parser, Rule, Value,
};

const TEXT: &str = "\
# Scopes

Text is read line by line,
and blocks open scopes.

---

- lists nest
  - by indent
  - like this
- and unwind

> quoted text is
> parsed *again*
> - with lists too

```rust
let tree = parser.parse_str(text)?;
```
";

fn group(m: &Match, i: usize) -> String {
    m.group(i).unwrap_or_default().to_string()
}

fn is_block_start(rest: &str) -> bool {
    let t = rest.trim_start();
    t.is_empty() || ["#", ">", "```", "- ", "* "].iter().any(|p| t.starts_with(p))
}

fn indent_of(ctx: &Context<'_>) -> i64 {
    ctx.get("indent", 0).and_then(Value::as_int).unwrap_or(0)
}

fn open_list(ctx: &mut Context<'_>, indent: i64) -> Result<(), ParseError> {
    ctx.open("list")?;
    ctx.set("indent", indent, 0)
}

/// A list marker indented deeper opens a nested list, a shallower one closes
/// lists until the indent fits.
fn list_marker(_: &mut Cursor<'_>, ctx: &mut Context<'_>, m: &Match) -> Result<(), ParseError> {
    let indent = group(m, 1).len() as i64;
    if indent > indent_of(ctx) {
        return open_list(ctx, indent);
    }
    while indent < indent_of(ctx) && ctx.scope_name() == "list" && ctx.depth() > 1 {
        ctx.close(1)?;
    }
    Ok(())
}

fn close_lists(_: &mut Cursor<'_>, ctx: &mut Context<'_>, _: &Match) -> Result<(), ParseError> {
    while ctx.scope_name() == "list" {
        ctx.close(1)?;
    }
    Ok(())
}

fn quote_line(_: &mut Cursor<'_>, ctx: &mut Context<'_>, m: &Match) -> Result<(), ParseError> {
    ctx.append("lines", group(m, 1), 0)
}

/// Parses the collected quote lines, keeps the nested tree as text, and
/// leaves the quote.
fn end_quote(_: &mut Cursor<'_>, ctx: &mut Context<'_>, _: &Match) -> Result<(), ParseError> {
    let lines: Vec<String> = ctx
        .get("lines", 0)
        .and_then(Value::as_list)
        .map(|v| v.iter().filter_map(Value::as_text).map(String::from).collect())
        .unwrap_or_default();
    let nested = ctx.sub_parse(&lines)?;
    ctx.set("nested", nested.to_string(), 0)?;
    ctx.close(1)
}

fn grammar() -> Result<Grammar, ParseError> {
    Grammar::builder()
        .scope(
            "main",
            [
                rule(r"^(#{1,6})\s+(.*)").with(("tag", "heading")),
                rule(r"^(-{3,}|\*{3,})\s*$").with(("tag", "hr")),
                rule(r"^```(\w*)").with(("open", "code")).with(("call", Arg::call(
                    |_, ctx, m| ctx.set("lang", group(m, 1), 0),
                ))),
                rule(r"^>\s?(.*)")
                    .with(("open", "quote"))
                    .with(("call", Arg::call(quote_line))),
                rule(r"^(\s*)[-*]\s+").with(("call", Arg::call(|_, ctx, m| {
                    open_list(ctx, group(m, 1).len() as i64)
                }))),
                rule(r"\S.*").with(("open", "para")).with(("tag", "text")),
            ],
        )
        .scope_rules(
            "para",
            [Rule::always()
                .pre(|cur, _| cur.at_line_start() && is_block_start(cur.rest()))
                .callback(|_, ctx, _| ctx.close(1))],
        )
        .scope(
            "para",
            [
                rule(r"\S.*").with(("tag", "text")).with(("proc", "collapse")),
                always().with("close"),
            ],
        )
        .scope(
            "code",
            [
                rule(r"^```\s*$").with("close"),
                rule(r".*").with(("tag", "code")),
            ],
        )
        .strict("code")
        .scope_rules(
            "quote",
            [
                Rule::new(Expr::regex(r"^>\s?(.*)")?)
                    .callback(quote_line),
                Rule::always().callback(end_quote),
            ],
        )
        .scope_rules(
            "list",
            [
                Rule::new(Expr::regex(r"^(\s*)[-*]\s+")?)
                    .callback(list_marker),
                Rule::new(Expr::regex(r"\S.*")?).tag("item"),
                Rule::always().callback(close_lists),
            ],
        )
        .build()
}

fn main() -> Result<(), ParseError> {
    env_logger::init();
    let mut parser = Parser::new(grammar()?);
    let tree = parser.parse_str(TEXT)?;
    println!("{tree}");
    for id in tree.scopes_named("quote") {
        if let Some(nested) = tree.node(id).var("nested") {
            println!("quote #{id} contents:\n{nested}");
        }
    }
    Ok(())
}
