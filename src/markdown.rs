//! Minimal terminal markdown renderer.
//!
//! Input is expected to have gone through [`crate::sanitize::sanitize`].
//! Code (fenced and inline) is shown literally with the escaped entities
//! decoded back for display. Raw HTML lines are dropped.

use std::sync::LazyLock;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use regex::Regex;

const COLOR_HEADING: Color = Color::Cyan;
const COLOR_CODE: Color = Color::Yellow;
const COLOR_QUOTE: Color = Color::Gray;
const COLOR_MUTED: Color = Color::DarkGray;

const RULE_WIDTH: usize = 40;

/// A line consisting only of an HTML tag (opening, closing or comment).
static HTML_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:</?[A-Za-z][^>]*>|<!--.*-->)\s*$").unwrap());

static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)[.)]\s+(.*)$").unwrap());

/// Render markdown into styled terminal lines.
pub fn render(markdown: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut in_fence = false;

    for raw in markdown.lines() {
        let trimmed = raw.trim_start();

        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            if in_fence {
                let lang = trimmed.trim_start_matches('`').trim();
                if !lang.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!("  [{}]", lang),
                        Style::default().fg(COLOR_MUTED),
                    )));
                }
            }
            continue;
        }

        if in_fence {
            lines.push(Line::from(Span::styled(
                format!("  {}", decode_entities(raw)),
                Style::default().fg(COLOR_CODE),
            )));
            continue;
        }

        if HTML_LINE_RE.is_match(trimmed) {
            continue;
        }

        if trimmed.is_empty() {
            lines.push(Line::default());
            continue;
        }

        if let Some(line) = heading(trimmed) {
            lines.push(line);
            continue;
        }

        if is_rule(trimmed) {
            lines.push(Line::from(Span::styled(
                "─".repeat(RULE_WIDTH),
                Style::default().fg(COLOR_MUTED),
            )));
            continue;
        }

        let indent = " ".repeat(raw.len() - trimmed.len());

        if let Some(item) = ["- ", "* ", "+ "].iter().find_map(|m| trimmed.strip_prefix(m)) {
            let mut spans = vec![Span::raw(format!("{}• ", indent))];
            spans.extend(inline(item, Style::default()));
            lines.push(Line::from(spans));
            continue;
        }

        if let Some(caps) = NUMBERED_RE.captures(trimmed) {
            let mut spans = vec![Span::raw(format!("{}{}. ", indent, &caps[1]))];
            spans.extend(inline(&caps[2], Style::default()));
            lines.push(Line::from(spans));
            continue;
        }

        if let Some(quoted) = trimmed.strip_prefix('>') {
            let style = Style::default().fg(COLOR_QUOTE).add_modifier(Modifier::ITALIC);
            let mut spans = vec![Span::styled("│ ", Style::default().fg(COLOR_MUTED))];
            spans.extend(inline(quoted.trim_start(), style));
            lines.push(Line::from(spans));
            continue;
        }

        lines.push(Line::from(inline(raw, Style::default())));
    }

    lines
}

/// Flatten rendered lines to plain strings.
pub fn to_plain(lines: &[Line<'_>]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
        .collect()
}

fn heading(line: &str) -> Option<Line<'static>> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let text = line[level..].strip_prefix(' ')?;
    let mut style = Style::default().fg(COLOR_HEADING).add_modifier(Modifier::BOLD);
    if level == 1 {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    Some(Line::from(inline(text.trim(), style)))
}

fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ["-", "*", "_"]
            .iter()
            .any(|m| compact.chars().all(|c| c.to_string() == *m))
}

/// Split a line into plain, `code` and **bold** spans.
fn inline(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let next_code = rest.find('`');
        let next_bold = rest.find("**");
        match (next_code, next_bold) {
            (Some(start), bold) if bold.is_none_or(|b| start < b) => {
                let Some(len) = rest[start + 1..].find('`') else {
                    spans.push(Span::styled(rest.to_string(), base));
                    break;
                };
                if start > 0 {
                    spans.push(Span::styled(rest[..start].to_string(), base));
                }
                let code = &rest[start + 1..start + 1 + len];
                spans.push(Span::styled(decode_entities(code), base.fg(COLOR_CODE)));
                rest = &rest[start + len + 2..];
            }
            (_, Some(start)) => {
                let Some(len) = rest[start + 2..].find("**") else {
                    spans.push(Span::styled(rest.to_string(), base));
                    break;
                };
                if start > 0 {
                    spans.push(Span::styled(rest[..start].to_string(), base));
                }
                let bold = &rest[start + 2..start + 2 + len];
                spans.push(Span::styled(bold.to_string(), base.add_modifier(Modifier::BOLD)));
                rest = &rest[start + len + 4..];
            }
            _ => {
                spans.push(Span::styled(rest.to_string(), base));
                break;
            }
        }
    }

    spans
}

/// Undo the escaping applied to code. `&amp;` goes last so `&amp;lt;`
/// stays `&lt;`.
fn decode_entities(code: &str) -> String {
    code.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
