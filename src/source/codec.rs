// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Record encoding and decoding.
//!
//! Articles are stored as TypeScript object literals. Free text that an
//! author types, i.e., title, subtitle, and body, goes into template literals
//! so that multi-line bodies stay readable in the source file. Everything
//! else is a double-quoted string, number, or array of strings.
//!
//! # Record Layout
//!
//! ```text
//!   {
//!     id: "scaling-laws",
//!     title: `Scaling Laws`,
//!     subtitle: `Notes on compute`,
//!     author: "Dan",
//!     date: "Oct 18, 2026",
//!     readTime: 4,
//!     tags: ["AI","Systems"],
//!     image: "",
//!     content: `
//! # Body
//!     `
//!   }
//! ```
//!
//! Encoded records carry no trailing separator. The splice engine decides
//! whether a comma is needed.

use crate::article::Article;

use std::fmt::Write as _;

/// Encode article into record text.
pub fn encode(article: &Article) -> String {
    let mut out = String::new();
    out.push_str("  {\n");
    let _ = writeln!(out, "    id: {},", quote(&article.id));
    let _ = writeln!(out, "    title: `{}`,", escape_template(&article.title));
    let _ = writeln!(out, "    subtitle: `{}`,", escape_template(&article.subtitle));
    let _ = writeln!(out, "    author: {},", quote(&article.author));
    let _ = writeln!(out, "    date: {},", quote(&article.date));
    let _ = writeln!(out, "    readTime: {},", article.read_time);
    let tags = article
        .tags
        .iter()
        .map(|tag| quote(tag))
        .collect::<Vec<_>>()
        .join(",");
    let _ = writeln!(out, "    tags: [{tags}],");
    let _ = writeln!(
        out,
        "    image: {},",
        quote(article.image.as_deref().unwrap_or_default())
    );
    let _ = writeln!(out, "    content: `\n{}\n    `", escape_template(&article.content));
    out.push_str("  }");
    out
}

/// Decode record text back into an article.
///
/// Accepts hand-written records too: keys in any order, single or double
/// quotes, comments, and unknown keys, which are skipped.
///
/// # Errors
///
/// - Return [`CodecError::Syntax`] if the text is not an object literal.
/// - Return [`CodecError::MissingId`] if the record has no id.
/// - Return [`CodecError::InvalidField`] if a known key holds the wrong kind
///   of value.
pub fn decode(text: &str) -> Result<Article> {
    let mut cursor = Cursor::new(text);
    cursor.skip_trivia();
    cursor.expect(b'{')?;

    let mut article = Article::default();
    let mut has_id = false;
    loop {
        cursor.skip_separators();
        if cursor.eat(b'}') {
            break;
        }

        let key = cursor.key()?;
        cursor.skip_trivia();
        cursor.expect(b':')?;
        cursor.skip_trivia();
        let value = cursor.value(key == "content")?;

        match key.as_str() {
            "id" => {
                article.id = value.into_text(&key)?;
                has_id = true;
            }
            "title" => article.title = value.into_text(&key)?,
            "subtitle" => article.subtitle = value.into_text(&key)?,
            "author" => article.author = value.into_text(&key)?,
            "date" => article.date = value.into_text(&key)?,
            "readTime" => article.read_time = value.into_number(&key)?,
            "tags" => article.tags = value.into_list(&key)?,
            "image" => {
                article.image = match value {
                    Value::Absent => None,
                    value => Some(value.into_text(&key)?).filter(|image| !image.is_empty()),
                }
            }
            "content" => article.content = value.into_text(&key)?,
            _ => {}
        }
    }

    if !has_id {
        return Err(CodecError::MissingId);
    }

    Ok(article)
}

/// Escape text for a template literal.
///
/// Backslash goes first, so that the escapes added for backtick and `$` are
/// not escaped twice.
pub fn escape_template(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace('$', "\\$")
}

/// Render text as a double-quoted string literal.
///
/// JSON string syntax is a subset of JavaScript's, so the JSON rendering is
/// used as is.
fn quote(text: &str) -> String {
    serde_json::Value::String(text.to_owned()).to_string()
}

#[derive(Debug)]
enum Value {
    Text(String),
    Number(String),
    List(Vec<String>),
    Absent,
    Other,
}

impl Value {
    fn into_text(self, key: &str) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            _ => Err(CodecError::InvalidField(key.to_string())),
        }
    }

    fn into_number(self, key: &str) -> Result<u32> {
        match self {
            Self::Number(number) => number
                .parse()
                .map_err(|_| CodecError::InvalidField(key.to_string())),
            _ => Err(CodecError::InvalidField(key.to_string())),
        }
    }

    fn into_list(self, key: &str) -> Result<Vec<String>> {
        match self {
            Self::List(list) => Ok(list),
            _ => Err(CodecError::InvalidField(key.to_string())),
        }
    }
}

struct Cursor<'a> {
    text: &'a str,
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, offset: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.offset).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.offset += 1;
            return true;
        }

        false
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.eat(byte) {
            return Ok(());
        }

        Err(self.syntax(format!("expected {:?}", byte as char)))
    }

    fn syntax(&self, reason: impl Into<String>) -> CodecError {
        CodecError::Syntax {
            offset: self.offset,
            reason: reason.into(),
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = &self.text[self.offset..];
            let trimmed = rest.trim_start();
            self.offset += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                self.offset += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if trimmed.starts_with("/*") {
                self.offset += trimmed.find("*/").map_or(trimmed.len(), |pos| pos + 2);
            } else {
                return;
            }
        }
    }

    fn skip_separators(&mut self) {
        loop {
            self.skip_trivia();
            if !self.eat(b',') {
                return;
            }
        }
    }

    fn key(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => self.string(quote),
            Some(_) => {
                let ident = self.ident();
                if ident.is_empty() {
                    return Err(self.syntax("expected key"));
                }
                Ok(ident.to_string())
            }
            None => Err(self.syntax("record is never closed")),
        }
    }

    fn ident(&mut self) -> &'a str {
        let rest = &self.text[self.offset..];
        let len = rest
            .find(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '$'))
            .unwrap_or(rest.len());
        self.offset += len;
        &rest[..len]
    }

    fn value(&mut self, is_body: bool) -> Result<Value> {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => Ok(Value::Text(self.string(quote)?)),
            Some(b'`') => Ok(Value::Text(self.template(is_body)?)),
            Some(b'[') => self.list(),
            Some(b'{') => {
                self.skip_object()?;
                Ok(Value::Other)
            }
            Some(byte) if byte.is_ascii_digit() || byte == b'-' => {
                let rest = &self.text[self.offset..];
                let len = rest
                    .find(|ch: char| !(ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+' | 'e' | 'E')))
                    .unwrap_or(rest.len());
                self.offset += len;
                Ok(Value::Number(rest[..len].to_string()))
            }
            Some(_) => match self.ident() {
                "" => Err(self.syntax("expected value")),
                "null" | "undefined" => Ok(Value::Absent),
                _ => Ok(Value::Other),
            },
            None => Err(self.syntax("expected value")),
        }
    }

    /// Raw body of the literal at the cursor, without its quotes.
    fn literal(&mut self, quote: u8) -> Result<&'a str> {
        let open = self.offset;
        self.offset += 1;
        let bytes = self.text.as_bytes();
        while let Some(&byte) = bytes.get(self.offset) {
            match byte {
                b'\\' => self.offset += 2,
                byte if byte == quote => {
                    self.offset += 1;
                    return Ok(&self.text[open + 1..self.offset - 1]);
                }
                _ => self.offset += 1,
            }
        }

        Err(CodecError::Syntax {
            offset: open,
            reason: "literal is never closed".into(),
        })
    }

    fn string(&mut self, quote: u8) -> Result<String> {
        let open = self.offset;
        let raw = self.literal(quote)?;
        unescape(raw).ok_or(CodecError::Syntax {
            offset: open,
            reason: "invalid escape sequence".into(),
        })
    }

    fn template(&mut self, is_body: bool) -> Result<String> {
        let open = self.offset;
        let mut raw = self.literal(b'`')?;

        // INVARIANT: Article bodies are wrapped in one leading newline and one
        //   trailing indented newline. Strip exactly those.
        if is_body {
            if let Some(rest) = raw.strip_prefix('\n') {
                raw = rest;
            }
            if let Some(pos) = raw.rfind('\n') {
                if raw[pos + 1..].bytes().all(|b| b == b' ' || b == b'\t') {
                    raw = &raw[..pos];
                }
            }
        }

        unescape(raw).ok_or(CodecError::Syntax {
            offset: open,
            reason: "invalid escape sequence".into(),
        })
    }

    fn list(&mut self) -> Result<Value> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                Some(b']') => {
                    self.offset += 1;
                    return Ok(Value::List(items));
                }
                Some(quote @ (b'"' | b'\'' | b'`')) => items.push(self.string(quote)?),
                Some(_) => return Err(self.syntax("expected string inside list")),
                None => return Err(self.syntax("list is never closed")),
            }
        }
    }

    fn skip_object(&mut self) -> Result<()> {
        let mut depth = 0usize;
        while let Some(byte) = self.peek() {
            match byte {
                b'"' | b'\'' | b'`' => {
                    self.literal(byte)?;
                    continue;
                }
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.offset += 1;
                        return Ok(());
                    }
                }
                _ => {}
            }
            self.offset += 1;
        }

        Err(self.syntax("object is never closed"))
    }
}

/// Resolve escape sequences of a string or template literal body.
///
/// Covers JavaScript escapes that JSON lacks, e.g., `\u{1f600}`, `\v`, and line
/// continuations, so hand-written records decode too.
fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            'u' => {
                let code = if chars.peek() == Some(&'{') {
                    chars.next();
                    let hex = chars.by_ref().take_while(|&c| c != '}').collect::<String>();
                    u32::from_str_radix(&hex, 16).ok()?
                } else {
                    hex4(&mut chars)?
                };

                // INVARIANT: Join UTF-16 surrogate pairs, e.g., "\ud83d\ude00".
                let code = if (0xD800..0xDC00).contains(&code) {
                    if chars.next()? != '\\' || chars.next()? != 'u' {
                        return None;
                    }
                    let low = hex4(&mut chars)?;
                    0x10000 + ((code - 0xD800) << 10) + (low.checked_sub(0xDC00)?)
                } else {
                    code
                };
                out.push(char::from_u32(code)?);
            }
            // Line continuation.
            '\n' => {}
            other => out.push(other),
        }
    }

    Some(out)
}

fn hex4(chars: &mut impl Iterator<Item = char>) -> Option<u32> {
    let hex = chars.take(4).collect::<String>();
    if hex.len() != 4 {
        return None;
    }
    u32::from_str_radix(&hex, 16).ok()
}

/// Record codec error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Record text is not a well-formed object literal.
    #[error("invalid record syntax at byte {offset}: {reason}")]
    Syntax { offset: usize, reason: String },

    /// Record has no id key.
    #[error("record has no id")]
    MissingId,

    /// Known key holds the wrong kind of value.
    #[error("record field {0:?} has an invalid value")]
    InvalidField(String),
}

/// Friendly result alias :3
pub type Result<T, E = CodecError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn sample() -> Article {
        Article {
            id: "scaling-laws".into(),
            title: "Scaling `Laws`".into(),
            subtitle: "Costs ${money}".into(),
            author: "Dan \"DAN\" Smith".into(),
            date: "Oct 18, 2026".into(),
            read_time: 4,
            tags: vec!["AI".into(), "Sys\"tems".into()],
            image: Some("https://example.org/a.png".into()),
            content: "# Intro\n\nA path: C:\\temp\\new\nCode: `x` costs $5 {\n".into(),
        }
    }

    #[test]
    fn encode_record_layout() {
        let article = Article {
            id: "a".into(),
            title: "T".into(),
            subtitle: "".into(),
            author: "Dan".into(),
            date: "Oct 18, 2026".into(),
            read_time: 1,
            tags: vec!["x".into()],
            image: None,
            content: "Hello".into(),
        };

        let expect = indoc! {r#"
              {
                id: "a",
                title: `T`,
                subtitle: ``,
                author: "Dan",
                date: "Oct 18, 2026",
                readTime: 1,
                tags: ["x"],
                image: "",
                content: `
            Hello
                `
              }"#};
        assert_eq!(encode(&article), expect);
    }

    #[test]
    fn decode_reverses_encode() -> anyhow::Result<()> {
        let article = sample();
        assert_eq!(decode(&encode(&article))?, article);

        let mut trailing = sample();
        trailing.content = "ends with indent\n    ".into();
        assert_eq!(decode(&encode(&trailing))?, trailing);

        Ok(())
    }

    #[test]
    fn escape_template_backslash_first() {
        assert_eq!(escape_template(r"\`$"), r"\\\`\$");
    }

    #[test]
    fn decode_hand_written_record() -> anyhow::Result<()> {
        let text = indoc! {r#"
            {
              // pinned by hand
              id: 'hand',
              authorImage: "https://example.org/me.png",
              title: "Line\nbreak \u00e9 \ud83d\ude00",
              meta: { nested: { deep: "}" } },
              tags: ['a', "b",],
              readTime: 2,
              image: null,
              published: true,
            }
        "#};

        let article = decode(text)?;
        assert_eq!(article.id, "hand");
        assert_eq!(article.title, "Line\nbreak é 😀");
        assert_eq!(article.tags, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(article.read_time, 2);
        assert_eq!(article.image, None);

        Ok(())
    }

    #[test]
    fn decode_rejects_bad_records() {
        assert_eq!(decode("{ title: `x` }"), Err(CodecError::MissingId));
        assert_eq!(
            decode("{ id: \"a\", readTime: \"soon\" }"),
            Err(CodecError::InvalidField("readTime".into()))
        );
        assert!(matches!(
            decode("{ id: \"a\", title: `open"),
            Err(CodecError::Syntax { .. })
        ));
        assert!(matches!(decode("[]"), Err(CodecError::Syntax { .. })));
    }

    #[test]
    fn quote_escapes_control_characters() -> anyhow::Result<()> {
        let author = "a\"b\\\n\u{1}";
        assert_eq!(quote(author), r#""a\"b\\\n\u0001""#);

        let article = Article {
            id: "ctl".into(),
            author: author.into(),
            ..sample()
        };
        assert_eq!(decode(&encode(&article))?, article);

        Ok(())
    }
}
