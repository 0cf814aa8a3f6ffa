// Ready-made expressions for common tokens.

use crate::{error::ParseError, expr::Expr};

pub fn word() -> Result<Expr, ParseError> {
    Expr::regex(r"\w+")
}

pub fn int() -> Result<Expr, ParseError> {
    Expr::regex(r"-?\d+")
}

pub fn float() -> Result<Expr, ParseError> {
    Expr::regex(r"-?\d*\.\d+([eE][-+]?\d+)?")
}

pub fn hex() -> Result<Expr, ParseError> {
    Expr::regex(r"0[xX][0-9a-fA-F]+")
}

/// hex, float or int, tried in that order
pub fn number() -> Result<Expr, ParseError> {
    Ok(Expr::one_of([hex()?, float()?, int()?]))
}

pub fn boolean() -> Result<Expr, ParseError> {
    Ok(Expr::one_of([Expr::literal("true")?, Expr::literal("false")?]))
}

/// one or more chars of a regex character class body, e.g. `"a-z_"`
pub fn chars(class: &str) -> Result<Expr, ParseError> {
    Expr::regex(&format!("[{class}]+"))
}

pub fn white() -> Result<Expr, ParseError> {
    chars(r" \t")
}

pub fn link() -> Result<Expr, ParseError> {
    Expr::regex(r"(http|ftp)s?://([a-z0-9.-]+\.)+[a-z]{2,}(/\S*)?")
}

pub fn email() -> Result<Expr, ParseError> {
    Expr::regex_nocase(r"[a-z0-9][a-z0-9._%+-]*@([a-z0-9-]+\.)+[a-z]{2,}")
}

/// Text between `left` and a single-char `right` boundary, capture group 1
/// holding the inside. With `escape`, a backslash-escaped `right` does not
/// end the text.
pub fn fenced(left: &str, right: char, escape: bool, empty: bool) -> Result<Expr, ParseError> {
    let l = regex::escape(left);
    let r = regex::escape(&right.to_string());
    let mul = if empty { "*" } else { "+" };
    let pattern = if escape {
        format!(r"{l}((\\{r}|[^{r}]){mul}){r}")
    } else {
        format!(r"{l}([^{r}]{mul}){r}")
    };
    Expr::regex(&pattern)
}

pub fn sq_string() -> Result<Expr, ParseError> {
    fenced("'", '\'', true, true)
}

pub fn dq_string() -> Result<Expr, ParseError> {
    fenced("\"", '"', true, true)
}

pub fn string() -> Result<Expr, ParseError> {
    Ok(Expr::one_of([sq_string()?, dq_string()?]))
}
