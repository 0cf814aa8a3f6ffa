use scopeline::prelude::sl::{always, rule, Grammar, ParseError};

/// Headings, quotes, fenced code and lists, the kind of structure the
/// bench document is made of.
pub fn block_grammar() -> Result<Grammar, ParseError> {
    Grammar::builder()
        .scope(
            "main",
            [
                rule(r"^(#{1,6})\s+(.*)").with(("tag", "heading")),
                rule(r"^```").with(("open", "code")),
                rule(r"^>\s?").with(("open", "quote")),
                rule(r"^\s*[-*]\s+").with(("open", "list")),
                rule(r"\S.*").with(("tag", "text")),
            ],
        )
        .scope(
            "code",
            [
                rule(r"^```").with("close"),
                rule(r".+").with(("tag", "code")),
            ],
        )
        .scope(
            "quote",
            [
                rule(r"^>\s?"),
                rule(r"\S.*").with(("tag", "text")),
                always().with("close"),
            ],
        )
        .scope(
            "list",
            [
                rule(r"^\s*[-*]\s+"),
                rule(r"\S.*").with(("tag", "item")).with(("inc", "items", 1)),
                always().with("close"),
            ],
        )
        .strict("code")
        .build()
}

pub fn document(sections: usize) -> Vec<String> {
    let mut lines = vec![];
    for i in 0..sections {
        lines.push(format!("## Section {i}"));
        lines.push("Some introductory text for this section.".to_string());
        lines.push(String::new());
        lines.push("> a quoted remark".to_string());
        lines.push("> spanning two lines".to_string());
        lines.push(String::new());
        lines.push("- first item".to_string());
        lines.push("- second item".to_string());
        lines.push(String::new());
        lines.push("```".to_string());
        lines.push(format!("let x = {i};"));
        lines.push("```".to_string());
    }
    lines
}
