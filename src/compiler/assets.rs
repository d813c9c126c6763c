//! Asset reference rewriting.
//!
//! Declaration values may call the `image-url("...")` and `font-url("...")`
//! helpers; both rewrite to a plain CSS `url(...)` under the configured
//! publishing prefixes. Helper names inside string literals are left alone,
//! as are calls whose argument is not a single string literal.

use super::StyleOptions;
use super::scan::Scanner;
use crate::config::join_url;

/// Whether a character can continue an identifier.
fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Rewrite asset helper calls in one declaration value.
pub fn rewrite_asset_urls(value: &str, opts: &StyleOptions) -> String {
    let mut sc = Scanner::new(value);
    let mut out = String::new();
    let mut prev_ident = false;

    while let Some(c) = sc.peek() {
        if c == '"' || c == '\'' {
            let start = sc.pos();
            match sc.take_string() {
                Ok(s) => out.push_str(s),
                Err(_) => {
                    // Malformed tail; pass it through untouched
                    out.push_str(sc.slice(start, value.len()));
                    break;
                }
            }
            prev_ident = false;
            continue;
        }

        if !prev_ident && (c.is_alphabetic() || c == '-' || c == '_') {
            let start = sc.pos();
            while sc.peek().is_some_and(is_ident_char) {
                sc.bump();
            }
            let ident = sc.slice(start, sc.pos());

            if is_helper(ident)
                && sc.peek() == Some('(')
                && let Some(rewritten) = try_rewrite_call(&mut sc, ident, opts)
            {
                out.push_str(&rewritten);
                prev_ident = false;
                continue;
            }

            out.push_str(ident);
            prev_ident = true;
            continue;
        }

        sc.bump();
        out.push(c);
        prev_ident = is_ident_char(c);
    }

    out
}

fn is_helper(ident: &str) -> bool {
    ident.eq_ignore_ascii_case("image-url") || ident.eq_ignore_ascii_case("font-url")
}

/// Attempt to consume `("name")` after a helper identifier.
///
/// Leaves the scanner untouched when the call shape does not match.
fn try_rewrite_call(sc: &mut Scanner, ident: &str, opts: &StyleOptions) -> Option<String> {
    let mut probe = sc.clone();
    probe.bump(); // '('
    probe.skip_ws();

    let raw = match probe.peek() {
        Some('"') | Some('\'') => probe.take_string().ok()?,
        _ => return None,
    };
    probe.skip_ws();
    if probe.peek() != Some(')') {
        return None;
    }
    probe.bump();
    *sc = probe;

    let name = &raw[1..raw.len() - 1];
    let prefix = if ident.eq_ignore_ascii_case("image-url") {
        &opts.images_path
    } else {
        &opts.fonts_path
    };
    Some(format!("url(\"{}\")", join_url(prefix, name)))
}

// =============================================================================
// Tests
// =============================================================================
