// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Article records and drafts.
//!
//! An __article__ is the unit of storage and mutation. Every article is kept
//! as one record inside the site's source file. A __draft__ is what the author
//! writes locally: a markdown body with an optional TOML front matter block.
//! Turning a draft into an article fills in the derived fields, i.e., the
//! slug id, the read time, the normalized tags, and the creation date.
//!
//! # Draft Layout
//!
//! ```text
//! +++
//! title = "Scaling Laws"
//! subtitle = "Notes on compute"
//! tags = ["AI", "Systems"]
//! image = "https://example.org/cover.png"
//! +++
//! # Body starts here
//! ```
//!
//! Front matter is optional. Without it, the whole file is the body.

use chrono::NaiveDate;
use serde::Deserialize;
use std::str::FromStr;

const FRONT_MATTER_FENCE: &str = "+++";
const WORDS_PER_MINUTE: usize = 200;

/// A published article.
///
/// # Invariants
///
/// - `id` never changes once assigned.
/// - `image` is [`None`] rather than an empty string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Article {
    /// Stable slug, unique within the source file.
    pub id: String,

    /// Headline.
    pub title: String,

    /// Line shown under the headline.
    pub subtitle: String,

    /// Display name of whoever created the article.
    pub author: String,

    /// Human-readable creation date, e.g., "Oct 18, 2026".
    pub date: String,

    /// Estimated minutes to read the body.
    pub read_time: u32,

    /// Ordered, trimmed, non-empty tags.
    pub tags: Vec<String>,

    /// Cover image URL or data URI.
    pub image: Option<String>,

    /// Raw markdown-like body.
    pub content: String,
}

/// Locally written article that has not been published yet.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub subtitle: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub content: String,
}

impl Draft {
    /// Identifier a new article made from this draft should get.
    ///
    /// Slug of the title, or `paper-<millis>` when the title has no slug.
    pub fn base_id(&self, now_millis: i64) -> String {
        let slug = slugify(&self.title);
        if slug.is_empty() {
            format!("paper-{now_millis}")
        } else {
            slug
        }
    }

    /// Build an article out of this draft.
    ///
    /// Identity fields are given by the caller, since they differ between a
    /// fresh publish and an edit of an existing article. Read time and tags
    /// are always derived from the draft.
    pub fn into_article(
        self,
        id: impl Into<String>,
        author: impl Into<String>,
        date: impl Into<String>,
        default_tag: &str,
    ) -> Article {
        Article {
            id: id.into(),
            read_time: read_time(&self.content),
            tags: normalize_tags(self.tags, default_tag),
            image: self.image.filter(|image| !image.trim().is_empty()),
            title: self.title,
            subtitle: self.subtitle,
            author: author.into(),
            date: date.into(),
            content: self.content,
        }
    }
}

impl FromStr for Draft {
    type Err = DraftError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let Some((front, body)) = split_front_matter(data) else {
            return Ok(Self {
                content: data.to_string(),
                ..Default::default()
            });
        };

        let front: FrontMatter = toml::de::from_str(front)?;
        Ok(Self {
            title: front.title.unwrap_or_default(),
            subtitle: front.subtitle.unwrap_or_default(),
            tags: front.tags.unwrap_or_default(),
            image: front.image,
            content: body.to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    title: Option<String>,
    subtitle: Option<String>,
    tags: Option<Vec<String>>,
    image: Option<String>,
}

fn split_front_matter(data: &str) -> Option<(&str, &str)> {
    let mut lines = data.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != FRONT_MATTER_FENCE {
        return None;
    }

    let mut offset = first.len();
    for line in lines {
        if line.trim_end() == FRONT_MATTER_FENCE {
            let front = &data[first.len()..offset];
            let body = &data[offset + line.len()..];
            return Some((front, body));
        }
        offset += line.len();
    }

    None
}

/// Derive slug from a title.
///
/// Lowercases the title, collapses every run of characters outside
/// `[a-z0-9]` into a single `-`, and trims leading and trailing `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Estimated read time in minutes, never less than one.
pub fn read_time(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

/// Trim tags, drop empty ones, and fall back to `default_tag` if none remain.
pub fn normalize_tags(
    tags: impl IntoIterator<Item = impl AsRef<str>>,
    default_tag: &str,
) -> Vec<String> {
    let tags = tags
        .into_iter()
        .map(|tag| tag.as_ref().trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<_>>();

    if tags.is_empty() {
        vec![default_tag.to_string()]
    } else {
        tags
    }
}

/// Split a comma separated tag listing, e.g., `"AI, Systems"`.
pub fn split_tags(listing: &str) -> Vec<String> {
    listing
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Format a creation date the way articles display it, e.g., "Oct 18, 2026".
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Draft parsing error types.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// Front matter is not valid TOML.
    #[error("invalid draft front matter")]
    FrontMatter(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use simple_test_case::test_case;

    #[test_case("Hello World", "hello-world"; "plain words")]
    #[test_case("  Scaling Laws: Part 2!  ", "scaling-laws-part-2"; "punctuation runs")]
    #[test_case("--AGI--", "agi"; "leading and trailing dashes")]
    #[test_case("Émigré café", "migr-caf"; "non ascii letters")]
    #[test_case("!!!", ""; "nothing left")]
    #[test]
    fn slugify_titles(title: &str, expect: &str) {
        assert_eq!(slugify(title), expect);
    }

    #[test_case("", 1; "empty body")]
    #[test_case("one two three", 1; "short body")]
    #[test_case(&"word ".repeat(200), 1; "exactly one minute")]
    #[test_case(&"word ".repeat(201), 2; "rounds up")]
    #[test]
    fn read_time_rounds_up(content: &str, expect: u32) {
        assert_eq!(read_time(content), expect);
    }

    #[test]
    fn tags_are_normalized() {
        assert_eq!(
            normalize_tags([" AI ", "", "Systems", "   "], "Research"),
            vec!["AI".to_string(), "Systems".to_string()]
        );
        assert_eq!(
            normalize_tags(Vec::<String>::new(), "Research"),
            vec!["Research".to_string()]
        );
        assert_eq!(split_tags("AI, ,Systems,"), vec!["AI", "Systems"]);
    }

    #[test]
    fn base_id_falls_back_to_timestamp() {
        let draft = Draft {
            title: "???".into(),
            ..Default::default()
        };
        assert_eq!(draft.base_id(1700000000000), "paper-1700000000000");

        let draft = Draft {
            title: "Attention Is All".into(),
            ..Default::default()
        };
        assert_eq!(draft.base_id(1700000000000), "attention-is-all");
    }

    #[test]
    fn format_date_like_en_us() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 8).unwrap();
        assert_eq!(format_date(date), "Oct 8, 2026");
    }

    #[test]
    fn parse_draft_with_front_matter() -> anyhow::Result<()> {
        let result: Draft = indoc! {r#"
            +++
            title = "Scaling Laws"
            subtitle = "Notes on compute"
            tags = ["AI", "Systems"]
            +++
            # Intro

            Body text.
        "#}
        .parse()?;

        let expect = Draft {
            title: "Scaling Laws".into(),
            subtitle: "Notes on compute".into(),
            tags: vec!["AI".into(), "Systems".into()],
            image: None,
            content: "# Intro\n\nBody text.\n".into(),
        };
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn parse_draft_without_front_matter() -> anyhow::Result<()> {
        let result: Draft = "just a body\n+++\n".parse()?;
        assert_eq!(result.content, "just a body\n+++\n");
        assert_eq!(result.title, "");

        Ok(())
    }

    #[test]
    fn draft_into_article_derives_fields() {
        let draft = Draft {
            title: "T".into(),
            tags: vec![" ".into()],
            image: Some("".into()),
            content: "short".into(),
            ..Default::default()
        };

        let article = draft.into_article("t", "Dan", "Oct 18, 2026", "Research");
        assert_eq!(article.read_time, 1);
        assert_eq!(article.tags, vec!["Research".to_string()]);
        assert_eq!(article.image, None);
        assert_eq!(article.author, "Dan");
    }
}
