//! The deterministic stylesheet transformation.
//!
//! Parses flattened source into a small node tree, rewrites asset helper
//! calls in declaration values, and emits either readable (indented) or
//! compact (whitespace-eliding) CSS.
//!
//! Comment semantics:
//!
//! | Kind       | Readable                          | Compact |
//! |------------|-----------------------------------|---------|
//! | `/*! */`   | kept                              | kept    |
//! | `/* */`    | kept                              | dropped |
//! | `// ...`   | kept as `/* */` unless suppressed | dropped |
//!
//! Comments appearing mid-prelude or mid-value collapse to a single space.

use super::scan::{CommentKind, Scanner};
use super::{CompileErrorKind, StyleOptions, assets};
use crate::config::OutputStyle;

// ============================================================================
// Node Tree
// ============================================================================

/// One parsed stylesheet construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Standalone comment.
    Comment { kind: CommentKind, text: String },
    /// `property: value` (value empty for bare hacks like `*zoom`).
    Declaration { prop: String, value: String },
    /// Semicolon-terminated at-directive, e.g. `@charset "utf-8"`.
    AtStatement { text: String },
    /// `prelude { body }`, arbitrarily nested.
    Block { prelude: String, body: Vec<Node> },
}

// ============================================================================
// Public API
// ============================================================================

/// Transform stylesheet source into output CSS bytes.
///
/// Pure: identical `content` under identical `opts` always produces
/// byte-identical output, which is what makes hash-gated writes sound.
pub fn transform(content: &str, opts: &StyleOptions) -> Result<Vec<u8>, CompileErrorKind> {
    let mut sc = Scanner::new(content);
    let mut nodes = parse_nodes(&mut sc, 0, 1)?;
    rewrite_asset_refs(&mut nodes, opts);

    let out = match opts.output {
        OutputStyle::Readable => emit_readable(&nodes, opts),
        OutputStyle::Compact => emit_compact(&nodes),
    };
    Ok(out.into_bytes())
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse nodes until `}` (when `depth > 0`) or end of input.
fn parse_nodes(
    sc: &mut Scanner,
    depth: usize,
    open_line: u32,
) -> Result<Vec<Node>, CompileErrorKind> {
    let mut nodes = Vec::new();
    let mut buf = String::new();

    loop {
        let Some(c) = sc.peek() else {
            if depth > 0 {
                return Err(CompileErrorKind::UnclosedBlock(open_line));
            }
            flush_statement(&mut buf, &mut nodes, depth, sc.line())?;
            return Ok(nodes);
        };

        if sc.at_comment() {
            let comment = sc.take_comment()?;
            if buf.trim().is_empty() {
                buf.clear();
                nodes.push(Node::Comment {
                    kind: comment.kind,
                    text: comment_text(comment.kind, comment.text),
                });
            } else {
                // Mid-prelude or mid-value comment acts as whitespace
                push_collapsed(&mut buf, ' ');
            }
            continue;
        }

        match c {
            '"' | '\'' => buf.push_str(sc.take_string()?),
            '(' => copy_group(sc, &mut buf)?,
            '{' => {
                let line = sc.line();
                sc.bump();
                let prelude = take_trimmed(&mut buf);
                if prelude.is_empty() {
                    return Err(CompileErrorKind::MissingSelector(line));
                }
                let body = parse_nodes(sc, depth + 1, line)?;
                nodes.push(Node::Block { prelude, body });
            }
            '}' => {
                if depth == 0 {
                    return Err(CompileErrorKind::UnexpectedCloseBrace(sc.line()));
                }
                let line = sc.line();
                sc.bump();
                flush_statement(&mut buf, &mut nodes, depth, line)?;
                return Ok(nodes);
            }
            ';' => {
                let line = sc.line();
                sc.bump();
                flush_statement(&mut buf, &mut nodes, depth, line)?;
            }
            _ => {
                sc.bump();
                push_collapsed(&mut buf, c);
            }
        }
    }
}

/// Copy a parenthesized group verbatim (whitespace collapsed), so `;`,
/// `{` and `}` inside `url(...)`-style values stay literal.
fn copy_group(sc: &mut Scanner, buf: &mut String) -> Result<(), CompileErrorKind> {
    let open_line = sc.line();
    let mut depth = 0u32;

    loop {
        let Some(c) = sc.peek() else {
            return Err(CompileErrorKind::UnbalancedParen(open_line));
        };
        match c {
            '"' | '\'' => buf.push_str(sc.take_string()?),
            '(' => {
                depth += 1;
                sc.bump();
                buf.push('(');
            }
            ')' => {
                depth -= 1;
                sc.bump();
                buf.push(')');
                if depth == 0 {
                    return Ok(());
                }
            }
            _ => {
                sc.bump();
                push_collapsed(buf, c);
            }
        }
    }
}

/// Append a character, collapsing whitespace runs to a single space.
fn push_collapsed(buf: &mut String, c: char) {
    if c.is_whitespace() {
        if !buf.is_empty() && !buf.ends_with(' ') {
            buf.push(' ');
        }
    } else {
        buf.push(c);
    }
}

fn take_trimmed(buf: &mut String) -> String {
    let text = buf.trim().to_string();
    buf.clear();
    text
}

/// Turn accumulated text into an at-statement or declaration node.
fn flush_statement(
    buf: &mut String,
    nodes: &mut Vec<Node>,
    depth: usize,
    line: u32,
) -> Result<(), CompileErrorKind> {
    let text = take_trimmed(buf);
    if text.is_empty() {
        return Ok(());
    }
    if text.starts_with('@') {
        nodes.push(Node::AtStatement { text });
        return Ok(());
    }
    if depth == 0 {
        return Err(CompileErrorKind::TopLevelDeclaration(line));
    }

    let (prop, value) = split_declaration(&text);
    nodes.push(Node::Declaration { prop, value });
    Ok(())
}

/// Split a declaration at the first `:` outside strings and parentheses.
fn split_declaration(text: &str) -> (String, String) {
    let mut depth = 0u32;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => {
                return (
                    text[..i].trim_end().to_string(),
                    text[i + 1..].trim_start().to_string(),
                );
            }
            _ => {}
        }
    }
    (text.to_string(), String::new())
}

/// Normalize comment text for emission. Bang comments stay verbatim.
fn comment_text(kind: CommentKind, text: &str) -> String {
    match kind {
        CommentKind::Bang => text.to_string(),
        _ => text.trim().to_string(),
    }
}

// ============================================================================
// Asset Rewriting Pass
// ============================================================================

fn rewrite_asset_refs(nodes: &mut [Node], opts: &StyleOptions) {
    for node in nodes {
        match node {
            Node::Declaration { value, .. } => {
                *value = assets::rewrite_asset_urls(value, opts);
            }
            Node::Block { body, .. } => rewrite_asset_refs(body, opts),
            _ => {}
        }
    }
}

// ============================================================================
// Readable Emission
// ============================================================================

fn emit_readable(nodes: &[Node], opts: &StyleOptions) -> String {
    let mut out = String::new();
    emit_readable_into(nodes, opts, 0, &mut out);
    out
}

fn emit_readable_into(nodes: &[Node], opts: &StyleOptions, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let mut first = true;

    for node in nodes {
        if let Node::Comment { kind, .. } = node
            && *kind == CommentKind::Line
            && opts.suppress_comments
        {
            continue;
        }
        if depth == 0 && !first {
            out.push('\n');
        }
        first = false;

        match node {
            Node::Comment { kind, text } => match kind {
                CommentKind::Bang => out.push_str(&format!("{indent}/*!{text}*/\n")),
                _ => out.push_str(&format!("{indent}/* {text} */\n")),
            },
            Node::AtStatement { text } => out.push_str(&format!("{indent}{text};\n")),
            Node::Declaration { prop, value } => {
                if value.is_empty() {
                    out.push_str(&format!("{indent}{prop};\n"));
                } else {
                    out.push_str(&format!("{indent}{prop}: {value};\n"));
                }
            }
            Node::Block { prelude, body } => {
                out.push_str(&format!("{indent}{prelude} {{\n"));
                emit_readable_into(body, opts, depth + 1, out);
                out.push_str(&format!("{indent}}}\n"));
            }
        }
    }
}

// ============================================================================
// Compact Emission
// ============================================================================

fn emit_compact(nodes: &[Node]) -> String {
    let mut out = String::new();
    emit_compact_into(nodes, false, &mut out);
    out
}

fn emit_compact_into(nodes: &[Node], in_block: bool, out: &mut String) {
    // Only bang comments survive compaction
    let kept: Vec<&Node> = nodes
        .iter()
        .filter(|n| !matches!(n, Node::Comment { kind, .. } if *kind != CommentKind::Bang))
        .collect();

    for (i, node) in kept.iter().enumerate() {
        let last = i + 1 == kept.len();
        match node {
            Node::Comment { text, .. } => {
                out.push_str("/*!");
                out.push_str(text);
                out.push_str("*/");
            }
            Node::AtStatement { text } => {
                out.push_str(&tighten(text));
                out.push(';');
            }
            Node::Declaration { prop, value } => {
                out.push_str(&tighten(prop));
                if !value.is_empty() {
                    out.push(':');
                    out.push_str(&tighten(value));
                }
                if !(in_block && last) {
                    out.push(';');
                }
            }
            Node::Block { prelude, body } => {
                out.push_str(&tighten(prelude));
                out.push('{');
                emit_compact_into(body, true, out);
                out.push('}');
            }
        }
    }
}

/// Drop spaces adjacent to commas and after colons, outside strings.
fn tighten(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            ' ' => {
                let prev = out.chars().last();
                let next = chars.get(i + 1).copied();
                let elide =
                    matches!(prev, Some(',') | Some(':')) || matches!(next, Some(','));
                if !elide {
                    out.push(' ');
                }
            }
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
