//! Markdown sanitizing for untrusted task content.
//!
//! Angle brackets inside code (fenced blocks and inline spans) are
//! entity-escaped so that code samples display literally and raw tags in
//! them cannot slip past the markdown renderer's HTML skipping. Text
//! outside code is left alone.

use std::sync::LazyLock;

use regex::Regex;

const FENCE: &str = "```";

/// Matching triple-backtick pairs, shortest match first.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").unwrap());

/// Escape `<` and `>` inside fenced and inline code spans.
///
/// An inline span opens with a run of N backticks and closes at the next
/// run of exactly N. An unterminated fence and everything after it is
/// returned unchanged, as is a backtick run with no closing partner. `&` is never touched, so existing
/// entities such as `&lt;` survive a second pass as-is.
pub fn sanitize(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut cursor = 0;

    for caps in FENCE_RE.captures_iter(markdown) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&sanitize_inline(&markdown[cursor..whole.start()]));
        out.push_str(FENCE);
        out.push_str(&escape_brackets(body.as_str()));
        out.push_str(FENCE);
        cursor = whole.end();
    }

    let rest = &markdown[cursor..];
    match rest.find(FENCE) {
        Some(open) => {
            out.push_str(&sanitize_inline(&rest[..open]));
            out.push_str(&rest[open..]);
        }
        None => out.push_str(&sanitize_inline(rest)),
    }
    out
}

fn sanitize_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('`') {
        let ticks = backtick_run(&rest[open..]);
        let body = &rest[open + ticks..];
        out.push_str(&rest[..open + ticks]);
        match closing_run(body, ticks) {
            Some(close) => {
                out.push_str(&escape_brackets(&body[..close]));
                out.push_str(&body[close..close + ticks]);
                rest = &body[close + ticks..];
            }
            None => rest = body,
        }
    }
    out.push_str(rest);
    out
}

fn backtick_run(text: &str) -> usize {
    text.bytes().take_while(|&b| b == b'`').count()
}

/// Offset of the next run of exactly `ticks` backticks.
fn closing_run(text: &str, ticks: usize) -> Option<usize> {
    let mut offset = 0;
    while let Some(found) = text[offset..].find('`') {
        let start = offset + found;
        let len = backtick_run(&text[start..]);
        if len == ticks {
            return Some(start);
        }
        offset = start + len;
    }
    None
}

fn escape_brackets(code: &str) -> String {
    code.replace('<', "&lt;").replace('>', "&gt;")
}
