/// Escaped, fixed-width rendering of the text under a cursor, for trace logs.
pub fn preview(s: &str, width: usize) -> String {
    let head: String = s.chars().take(width).collect();
    let s = head.escape_debug().to_string();
    let s = s.replace("\\\"", "\"");
    let s = s.replace("\\\'", "\'");
    let s: String = s.chars().take(width).collect();
    format!("{:<w$}", "|".to_string() + &s + "|", w = width + 2)
}
