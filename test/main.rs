// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use danpapers::{
    article::Article,
    remote::{
        memory::MemoryRemote, Credential, Identity, Location, RemoteFile, RemoteStore, Result,
        VersionToken,
    },
    source::{
        codec::encode,
        splice::{apply, Marker, SpliceOp},
    },
};

use indoc::indoc;

pub(crate) const EMPTY_SOURCE: &str = "export const ARTICLES = [\n];";

pub(crate) const HEADER: &str = indoc! {r#"
    // Hand-written, keep the records array last.
    import type { Article } from './types';

    export const SITE_TITLE = "Dan Papers";

    export const ARTICLES: Article[] = [
"#};

pub(crate) const FOOTER: &str = indoc! {r#"
    ];

    export const FEATURED = ARTICLES.slice(0, 3);
"#};

pub(crate) fn marker() -> Marker {
    Marker::new("ARTICLES").unwrap()
}

pub(crate) fn article(id: &str, title: &str, content: &str) -> Article {
    Article {
        id: id.into(),
        title: title.into(),
        subtitle: format!("On {title}"),
        author: "Ada".into(),
        date: "Oct 18, 2026".into(),
        read_time: 1,
        tags: vec!["Research".into()],
        image: None,
        content: content.into(),
    }
}

/// Articles whose bodies try hard to confuse a brace scanner.
pub(crate) fn tricky_articles() -> Vec<Article> {
    vec![
        article("plain", "Plain", "Just words."),
        article(
            "code-braces",
            "Code { braces }",
            "```\nfn main() { if x { println!(\"}}\"); } }\n```",
        ),
        article(
            "template-noise",
            "Costs $5 `now`",
            "Use `${value}` and \\n literally, then a lone \\ at the end \\",
        ),
        Article {
            tags: vec!["AI".into(), "Systems \"quoted\"".into()],
            image: Some("data:image/png;base64,iVBORw0KGgo=".into()),
            ..article("unicode", "Émigré, naïve", "Ünïcödé {}, 'single' and \"double\".")
        },
        article("unbalanced-text", "Half open {", "}} closes nothing {{{ opens nothing"),
    ]
}

/// Source file holding `articles` in order, surrounded by hand-written code.
pub(crate) fn source_with(articles: &[Article]) -> String {
    let mut text = format!("{HEADER}{FOOTER}");
    for article in articles.iter().rev() {
        let op = SpliceOp::InsertAfterMarker {
            marker: marker(),
            record: encode(article),
        };
        text = apply(&text, &op).unwrap();
    }

    text
}

pub(crate) fn identity(login: &str, name: &str) -> Identity {
    Identity {
        login: login.into(),
        display_name: name.into(),
    }
}

/// Remote store where another writer commits right after every read.
pub(crate) struct Interfering {
    pub(crate) inner: MemoryRemote,
}

impl RemoteStore for Interfering {
    async fn read(&self, credential: &Credential, location: &Location) -> Result<RemoteFile> {
        let file = self.inner.read(credential, location).await?;
        self.inner
            .bump(file.content.replace("Dan Papers", "Dan's Papers"));
        Ok(file)
    }

    async fn write(
        &self,
        credential: &Credential,
        location: &Location,
        content: &str,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken> {
        self.inner
            .write(credential, location, content, expected, message)
            .await
    }

    async fn identify(&self, credential: &Credential) -> Result<Identity> {
        self.inner.identify(credential).await
    }
}
