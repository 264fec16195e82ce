// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Local working set of articles.
//!
//! Dan Papers keeps an in-memory copy of the articles it knows about, in the
//! same order as the records array of the source file. The copy exists for
//! immediate feedback only. It is never consulted for conflict detection:
//! the remote version token alone decides whether a commit may land.
//!
//! The commit orchestrator is the only thing that mutates the working set,
//! and only after the remote host confirmed the write.

use crate::article::Article;

/// Ordered collection of articles mirroring the remote records array.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArticleStore {
    articles: Vec<Article>,
}

impl ArticleStore {
    /// Construct new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct new store from records in file order.
    pub fn from_records(articles: impl IntoIterator<Item = Article>) -> Self {
        Self {
            articles: articles.into_iter().collect(),
        }
    }

    /// All articles, newest first.
    pub fn list(&self) -> &[Article] {
        &self.articles
    }

    /// Article with target id.
    pub fn get(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|article| article.id == id)
    }

    /// Insert or replace an article.
    ///
    /// Replacing keeps the article in place. New articles go first, matching
    /// where the splice engine inserts them into the records array.
    pub fn upsert(&mut self, article: Article) {
        match self.articles.iter_mut().find(|known| known.id == article.id) {
            Some(known) => *known = article,
            None => self.articles.insert(0, article),
        }
    }

    /// Remove article with target id, returning it if it was known.
    pub fn remove(&mut self, id: &str) -> Option<Article> {
        let index = self.articles.iter().position(|article| article.id == id)?;
        Some(self.articles.remove(index))
    }

    /// Replace every article at once, e.g., after a fresh read.
    pub fn reset(&mut self, articles: impl IntoIterator<Item = Article>) {
        self.articles = articles.into_iter().collect();
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}
