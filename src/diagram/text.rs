//! Plain-text rendering of Mermaid-style diagram descriptions.
//!
//! This is not a layout engine. Flowcharts collapse to one edge per line
//! with node labels resolved, sequence diagrams to one message per line,
//! and every other kind prints its trimmed body under a header line.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{DiagramRenderer, DiagramTheme};

const KNOWN_KINDS: &[&str] = &[
    "graph",
    "flowchart",
    "sequenceDiagram",
    "classDiagram",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "gantt",
    "pie",
    "journey",
    "mindmap",
    "timeline",
    "gitGraph",
];

/// Flowchart link operators with an optional `|label|`.
static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(<-->|-\.->|-->|==>|--[ox]|---|-\.-)\s*(?:\|([^|]*)\|\s*)?").unwrap()
});

/// A node reference: `id`, optionally followed by a bracketed shape label.
static NODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z0-9_]+)\s*(?:[\[\(\{>]+\s*"?([^\]\)\}"]*)"?\s*[\]\)\}]+)?\s*;?$"#)
        .unwrap()
});

/// `A->>B: text` and the other sequence arrows.
static MESSAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\s:>-]+)\s*(-->>|->>|-->|->|--x|-x|--\)|-\))\s*([^:]+?)\s*:\s*(.*)$").unwrap()
});

const STYLE_DIRECTIVES: &[&str] = &["style ", "classDef ", "class ", "linkStyle ", "click "];

#[derive(Debug, Default, Clone, Copy)]
pub struct TextDiagramRenderer;

impl TextDiagramRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl DiagramRenderer for TextDiagramRenderer {
    fn initialize(&self, _theme: DiagramTheme) -> Result<(), String> {
        Ok(())
    }

    fn render(&self, source: &str, _theme: DiagramTheme) -> Result<Vec<String>, String> {
        let lines: Vec<&str> = source
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("%%"))
            .collect();

        let Some((header, body)) = lines.split_first() else {
            return Err("diagram source is empty".to_string());
        };

        let mut words = header.split_whitespace();
        let kind = words.next().unwrap_or_default();
        if !KNOWN_KINDS.contains(&kind) {
            return Err(format!("unrecognized diagram type '{}'", kind));
        }
        let rest: Vec<&str> = words.collect();

        match kind {
            "graph" | "flowchart" => Ok(render_flowchart(&rest, body)),
            "sequenceDiagram" => Ok(render_sequence(body)),
            _ => {
                let mut out = vec![header.to_string()];
                out.extend(body.iter().map(|l| format!("  {}", l)));
                Ok(out)
            }
        }
    }
}

fn render_flowchart(header_rest: &[&str], body: &[&str]) -> Vec<String> {
    let mut out = vec![match header_rest.first() {
        Some(direction) => format!("flowchart {}", direction),
        None => "flowchart".to_string(),
    }];

    // Labels may be declared after their first use.
    let mut labels: HashMap<String, String> = HashMap::new();
    for line in body {
        let (nodes, _) = split_links(line);
        for node in nodes {
            if let Some((id, Some(label))) = parse_node(node) {
                labels.insert(id.to_string(), label.to_string());
            }
        }
    }
    let name = |node: &str| -> String {
        match parse_node(node) {
            Some((id, _)) => labels.get(id).cloned().unwrap_or_else(|| id.to_string()),
            None => node.trim().to_string(),
        }
    };

    for line in body {
        if STYLE_DIRECTIVES.iter().any(|d| line.starts_with(d)) || *line == "end" {
            continue;
        }
        if let Some(title) = line.strip_prefix("subgraph ") {
            out.push(format!("  ▸ {}", title.trim()));
            continue;
        }

        let (nodes, links) = split_links(line);
        if links.is_empty() {
            if parse_node(line).is_none() {
                out.push(format!("  {}", line));
            }
            continue;
        }
        for (i, (op, label)) in links.iter().enumerate() {
            let glyph = match *op {
                "---" | "-.-" => "—",
                "<-->" => "↔",
                _ => "→",
            };
            let mut edge = format!("  {} {} {}", name(nodes[i]), glyph, name(nodes[i + 1]));
            if let Some(label) = label.filter(|l| !l.trim().is_empty()) {
                edge.push_str(&format!(" ({})", label.trim()));
            }
            out.push(edge);
        }
    }
    out
}

/// Split a flowchart line into node tokens and the links between them.
fn split_links(line: &str) -> (Vec<&str>, Vec<(&str, Option<&str>)>) {
    let mut nodes = Vec::new();
    let mut links = Vec::new();
    let mut cursor = 0;
    for caps in ARROW_RE.captures_iter(line) {
        let (Some(whole), Some(op)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        nodes.push(&line[cursor..whole.start()]);
        links.push((op.as_str(), caps.get(2).map(|m| m.as_str())));
        cursor = whole.end();
    }
    nodes.push(&line[cursor..]);
    (nodes, links)
}

fn parse_node(token: &str) -> Option<(&str, Option<&str>)> {
    let caps = NODE_RE.captures(token.trim())?;
    let id = caps.get(1)?.as_str();
    let label = caps.get(2).map(|m| m.as_str().trim()).filter(|l| !l.is_empty());
    Some((id, label))
}

fn render_sequence(body: &[&str]) -> Vec<String> {
    let mut out = vec!["sequenceDiagram".to_string()];
    for line in body {
        match MESSAGE_RE.captures(line) {
            Some(caps) => {
                let glyph = if caps[2].starts_with("--") { "⇢" } else { "→" };
                out.push(format!("  {} {} {}: {}", &caps[1], glyph, &caps[3], &caps[4]));
            }
            None => out.push(format!("  {}", line)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str) -> Result<Vec<String>, String> {
        TextDiagramRenderer::new().render(source, DiagramTheme::Dark)
    }

    #[test]
    fn test_flowchart_edges_use_labels() {
        let out = render("graph TD\n  A[Start] --> B{Ok?}\n  B -->|yes| C[Done]").unwrap();
        assert_eq!(
            out,
            vec![
                "flowchart TD".to_string(),
                "  Start → Ok?".to_string(),
                "  Ok? → Done (yes)".to_string(),
            ]
        );
    }

    #[test]
    fn test_flowchart_label_declared_later() {
        let out = render("flowchart LR\nA --> B\nB[Backend]").unwrap();
        assert_eq!(out[1], "  A → Backend");
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_flowchart_chains_and_undirected_links() {
        let out = render("graph LR\nA --> B --- C").unwrap();
        assert_eq!(out[1..], ["  A → B".to_string(), "  B — C".to_string()]);
    }

    #[test]
    fn test_flowchart_skips_styles_and_marks_subgraphs() {
        let out = render(
            "graph TD\nsubgraph Auth\nA --> B\nend\nstyle A fill:#f9f\nclassDef hot fill:#f00",
        )
        .unwrap();
        assert_eq!(out[1..], ["  ▸ Auth".to_string(), "  A → B".to_string()]);
    }

    #[test]
    fn test_sequence_messages() {
        let out = render("sequenceDiagram\nparticipant U\nU->>S: login\nS-->>U: token").unwrap();
        assert_eq!(
            out,
            vec![
                "sequenceDiagram".to_string(),
                "  participant U".to_string(),
                "  U → S: login".to_string(),
                "  S ⇢ U: token".to_string(),
            ]
        );
    }

    #[test]
    fn test_other_kinds_print_body() {
        let out = render("pie title Bugs\n\"auth\" : 3\n%% comment\n\"ui\" : 1").unwrap();
        assert_eq!(out[0], "pie title Bugs");
        assert_eq!(out[1..], ["  \"auth\" : 3".to_string(), "  \"ui\" : 1".to_string()]);
    }

    #[test]
    fn test_unknown_header_is_error() {
        let err = render("bogusDiagram\nA --> B").unwrap_err();
        assert!(err.contains("bogusDiagram"));
    }

    #[test]
    fn test_empty_source_is_error() {
        assert!(render("").is_err());
        assert!(render("  \n %% only a comment\n").is_err());
    }
}
