// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Article body rendering.
//!
//! Bodies are written in a small line-oriented markup dialect:
//!
//! - `# `, `## `, `### ` open headings of level one through three.
//! - `* ` opens a list item, `> ` a block quote.
//! - A line of just ```` ``` ```` opens or closes a code block, whose lines
//!   are kept verbatim.
//! - Consecutive lines starting with `|` form a table. The second of them
//!   holds column alignment: `:---:` centers, `---:` aligns right, and
//!   anything else aligns left.
//! - A blank line breaks paragraphs. Every other line is a paragraph.
//!
//! Outside of code, `**bold**`, `*italic*`, and `[text](url)` spans are
//! resolved in that order, each only within text the previous ones left
//! plain.

use std::fmt::{Display, Formatter, Result as FmtResult};

const FENCE: &str = "```";

/// Horizontal alignment of a table column.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    fn from_rule(cell: &str) -> Self {
        let cell = cell.trim();
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) if cell.len() > 1 => Self::Center,
            (_, true) => Self::Right,
            _ => Self::Left,
        }
    }
}

/// Span of text inside a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(String),
    Italic(String),
    Link { text: String, url: String },
}

impl Display for Inline {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Text(text) | Self::Bold(text) | Self::Italic(text) => fmt.write_str(text),
            Self::Link { text, url } => write!(fmt, "{text} <{url}>"),
        }
    }
}

/// Row of table cells.
pub type Row = Vec<Vec<Inline>>;

/// Block of an article body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, spans: Vec<Inline> },
    ListItem(Vec<Inline>),
    Quote(Vec<Inline>),
    Code(String),
    Table {
        header: Row,
        align: Vec<Align>,
        rows: Vec<Row>,
    },
    Paragraph(Vec<Inline>),
    Break,
}

/// Parse article body into blocks.
pub fn parse(body: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut lines = body.lines().peekable();

    while let Some(line) = lines.next() {
        if line.trim() == FENCE {
            let mut code = Vec::new();
            for line in lines.by_ref() {
                if line.trim() == FENCE {
                    break;
                }
                code.push(line);
            }
            blocks.push(Block::Code(code.join("\n")));
            continue;
        }

        if line.trim_start().starts_with('|') {
            let mut table = vec![line];
            while let Some(next) = lines.next_if(|next| next.trim_start().starts_with('|')) {
                table.push(next);
            }
            blocks.push(parse_table(&table));
            continue;
        }

        let block = if let Some(text) = line.strip_prefix("### ") {
            heading(3, text)
        } else if let Some(text) = line.strip_prefix("## ") {
            heading(2, text)
        } else if let Some(text) = line.strip_prefix("# ") {
            heading(1, text)
        } else if let Some(text) = line.strip_prefix("* ") {
            Block::ListItem(parse_inline(text))
        } else if let Some(text) = line.strip_prefix("> ") {
            Block::Quote(parse_inline(text))
        } else if line.trim().is_empty() {
            Block::Break
        } else {
            Block::Paragraph(parse_inline(line))
        };
        blocks.push(block);
    }

    blocks
}

fn heading(level: u8, text: &str) -> Block {
    Block::Heading {
        level,
        spans: parse_inline(text),
    }
}

fn parse_table(lines: &[&str]) -> Block {
    let header = split_cells(lines[0])
        .into_iter()
        .map(parse_inline)
        .collect::<Row>();

    let mut align: Vec<Align> = lines
        .get(1)
        .map(|rule| split_cells(rule).into_iter().map(Align::from_rule).collect())
        .unwrap_or_else(Vec::new);
    align.resize(header.len(), Align::Left);

    let rows = lines
        .iter()
        .skip(2)
        .map(|line| split_cells(line).into_iter().map(parse_inline).collect())
        .collect();

    Block::Table {
        header,
        align,
        rows,
    }
}

fn split_cells(line: &str) -> Vec<&str> {
    let line = line.trim();
    let line = line.strip_prefix('|').unwrap_or(line);
    let line = line.strip_suffix('|').unwrap_or(line);
    line.split('|').map(str::trim).collect()
}

/// Parse inline spans of one line.
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    for (bold, segment) in split_marked(text, "**") {
        if bold {
            spans.push(Inline::Bold(segment.to_string()));
            continue;
        }

        for (italic, segment) in split_marked(segment, "*") {
            if italic {
                spans.push(Inline::Italic(segment.to_string()));
            } else {
                split_links(segment, &mut spans);
            }
        }
    }

    spans
}

/// Split text into plain and marked segments delimited by `mark` pairs.
fn split_marked<'a>(text: &'a str, mark: &str) -> Vec<(bool, &'a str)> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(mark) {
        let after = &rest[open + mark.len()..];
        let Some(close) = after.find(mark).filter(|&close| close > 0) else {
            break;
        };

        if open > 0 {
            segments.push((false, &rest[..open]));
        }
        segments.push((true, &after[..close]));
        rest = &after[close + mark.len()..];
    }

    if !rest.is_empty() {
        segments.push((false, rest));
    }

    segments
}

fn split_links(text: &str, spans: &mut Vec<Inline>) {
    let mut rest = text;

    loop {
        let link = rest.find('[').and_then(|open| {
            let middle = open + rest[open..].find("](")?;
            let close = middle + rest[middle..].find(')')?;
            Some((open, middle, close))
        });

        let Some((open, middle, close)) = link else {
            break;
        };

        if open > 0 {
            spans.push(Inline::Text(rest[..open].to_string()));
        }
        spans.push(Inline::Link {
            text: rest[open + 1..middle].to_string(),
            url: rest[middle + 2..close].to_string(),
        });
        rest = &rest[close + 1..];
    }

    if !rest.is_empty() {
        spans.push(Inline::Text(rest.to_string()));
    }
}

fn plain(spans: &[Inline]) -> String {
    spans.iter().map(ToString::to_string).collect()
}

impl Display for Block {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Heading { level, spans } => {
                let text = plain(spans);
                match level {
                    1 => write!(fmt, "{text}\n{}", "=".repeat(text.chars().count())),
                    2 => write!(fmt, "{text}\n{}", "-".repeat(text.chars().count())),
                    _ => write!(fmt, "{text}"),
                }
            }
            Self::ListItem(spans) => write!(fmt, "  • {}", plain(spans)),
            Self::Quote(spans) => write!(fmt, "  │ {}", plain(spans)),
            Self::Code(code) => {
                let lines = code
                    .lines()
                    .map(|line| format!("    {line}"))
                    .collect::<Vec<_>>();
                fmt.write_str(&lines.join("\n"))
            }
            Self::Table {
                header,
                align,
                rows,
            } => write_table(fmt, header, align, rows),
            Self::Paragraph(spans) => fmt.write_str(&plain(spans)),
            Self::Break => Ok(()),
        }
    }
}

fn write_table(fmt: &mut Formatter<'_>, header: &Row, align: &[Align], rows: &[Row]) -> FmtResult {
    let render = |row: &Row| row.iter().map(|cell| plain(cell)).collect::<Vec<_>>();
    let header = render(header);
    let rows = rows.iter().map(render).collect::<Vec<_>>();

    let mut widths = header.iter().map(|cell| cell.chars().count()).collect::<Vec<_>>();
    for row in &rows {
        for (column, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            match widths.get_mut(column) {
                Some(known) => *known = (*known).max(width),
                None => widths.push(width),
            }
        }
    }

    let line = |cells: &[String]| {
        widths
            .iter()
            .enumerate()
            .map(|(column, &width)| {
                let cell = cells.get(column).map_or("", String::as_str);
                match align.get(column).copied().unwrap_or_default() {
                    Align::Left => format!("{cell:<width$}"),
                    Align::Center => format!("{cell:^width$}"),
                    Align::Right => format!("{cell:>width$}"),
                }
            })
            .collect::<Vec<_>>()
            .join(" | ")
    };

    writeln!(fmt, "{}", line(header.as_slice()).trim_end())?;
    let rule = widths
        .iter()
        .map(|&width| "-".repeat(width))
        .collect::<Vec<_>>()
        .join("-+-");
    write!(fmt, "{rule}")?;
    for row in &rows {
        write!(fmt, "\n{}", line(row.as_slice()).trim_end())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use simple_test_case::test_case;

    fn text(text: &str) -> Inline {
        Inline::Text(text.into())
    }

    #[test]
    fn parse_every_block() {
        let body = indoc! {"
            # Title
            ## Section
            ### Detail
            * item
            > quoted

            ```
            fn main() {}
              # not a heading
            ```
            plain
        "};

        assert_eq!(
            parse(body),
            vec![
                Block::Heading {
                    level: 1,
                    spans: vec![text("Title")]
                },
                Block::Heading {
                    level: 2,
                    spans: vec![text("Section")]
                },
                Block::Heading {
                    level: 3,
                    spans: vec![text("Detail")]
                },
                Block::ListItem(vec![text("item")]),
                Block::Quote(vec![text("quoted")]),
                Block::Break,
                Block::Code("fn main() {}\n  # not a heading".into()),
                Block::Paragraph(vec![text("plain")]),
            ]
        );
    }

    #[test]
    fn parse_table_alignment() {
        let body = indoc! {"
            | Name | Score | Note |
            |:----:|------:|------|
            | ada | 10 | **top** |
            after
        "};

        let blocks = parse(body);
        assert_eq!(
            blocks[0],
            Block::Table {
                header: vec![vec![text("Name")], vec![text("Score")], vec![text("Note")]],
                align: vec![Align::Center, Align::Right, Align::Left],
                rows: vec![vec![
                    vec![text("ada")],
                    vec![text("10")],
                    vec![Inline::Bold("top".into())]
                ]],
            }
        );
        assert_eq!(blocks[1], Block::Paragraph(vec![text("after")]));
    }

    #[test_case("**a** and *b*", vec![
        Inline::Bold("a".into()),
        Inline::Text(" and ".into()),
        Inline::Italic("b".into()),
    ]; "bold before italic")]
    #[test_case("see [docs](https://x.io) now", vec![
        Inline::Text("see ".into()),
        Inline::Link { text: "docs".into(), url: "https://x.io".into() },
        Inline::Text(" now".into()),
    ]; "link")]
    #[test_case("**[x](y)**", vec![Inline::Bold("[x](y)".into())]; "bold wins over link")]
    #[test_case("2 * 3 = 6", vec![Inline::Text("2 * 3 = 6".into())]; "lone star")]
    #[test_case("a ** b", vec![Inline::Text("a ** b".into())]; "unclosed bold")]
    #[test]
    fn inline_priority(line: &str, expect: Vec<Inline>) {
        assert_eq!(parse_inline(line), expect);
    }

    #[test]
    fn display_table() {
        let blocks = parse("| a | b |\n|---|--:|\n| long | 1 |");
        assert_eq!(
            blocks[0].to_string(),
            "a    | b\n-----+--\nlong | 1"
        );
    }
}
