// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Authorization policy.
//!
//! Decide whether a caller may edit or delete an article. There is a single
//! gate covering both: whoever may edit an article may also delete it. Rules
//! are checked in order, and the first one that applies wins:
//!
//! 1. Admins may touch every article.
//! 2. Authors may touch their own articles. The article's author is matched
//!    against both the caller's display name and login, ignoring case.
//! 3. Articles of the site owner are admin-only.
//! 4. Nobody else may touch anything.
//!
//! Publishing new articles is not gated by this policy.

use crate::{config::PolicySettings, remote::Identity};

use tracing::debug;

/// Identified caller of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub identity: Identity,
    pub is_admin: bool,
}

impl Caller {
    /// Login of caller.
    pub fn login(&self) -> &str {
        &self.identity.login
    }

    /// Name shown on articles published by caller.
    pub fn display_name(&self) -> &str {
        &self.identity.display_name
    }
}

/// Authorization policy of a site.
#[derive(Debug, Default, Clone)]
pub struct Policy {
    admins: Vec<String>,
    site_owner: Option<String>,
}

impl Policy {
    /// Construct new policy.
    pub fn new(
        admins: impl IntoIterator<Item = impl Into<String>>,
        site_owner: Option<String>,
    ) -> Self {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
            site_owner,
        }
    }

    /// Construct new policy from site configuration.
    pub fn from_settings(settings: &PolicySettings) -> Self {
        Self::new(settings.admins.iter().cloned(), settings.site_owner.clone())
    }

    /// Check if `login` is on the admin allow-list.
    pub fn is_admin(&self, login: &str) -> bool {
        self.admins.iter().any(|admin| same_name(admin, login))
    }

    /// Attach admin status to an identity.
    pub fn caller(&self, identity: Identity) -> Caller {
        let is_admin = self.is_admin(&identity.login);
        Caller { identity, is_admin }
    }

    /// Decide whether `caller` may edit or delete an article by `author`.
    ///
    /// # Errors
    ///
    /// - Return [`Denied::OwnerContent`] if the article belongs to the site
    ///   owner and caller is no admin.
    /// - Return [`Denied::NotAuthor`] if caller is neither admin nor author.
    pub fn authorize(&self, caller: &Caller, author: &str) -> Result<(), Denied> {
        if caller.is_admin {
            debug!("{} is admin", caller.login());
            return Ok(());
        }

        if same_name(author, caller.display_name()) || same_name(author, caller.login()) {
            debug!("{} is author", caller.login());
            return Ok(());
        }

        if self
            .site_owner
            .as_deref()
            .is_some_and(|owner| same_name(owner, author))
        {
            return Err(Denied::OwnerContent {
                login: caller.login().to_string(),
            });
        }

        Err(Denied::NotAuthor {
            login: caller.login().to_string(),
            author: author.to_string(),
        })
    }
}

fn same_name(lhs: &str, rhs: &str) -> bool {
    let lhs = lhs.trim();
    !lhs.is_empty() && lhs.to_lowercase() == rhs.trim().to_lowercase()
}

/// Reason a caller was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Denied {
    /// Site owner articles are admin-only.
    #[error("{login} cannot modify site owner articles, they are admin-only")]
    OwnerContent { login: String },

    /// Caller did not write the article.
    #[error("{login} cannot modify articles written by {author}")]
    NotAuthor { login: String, author: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    fn policy() -> Policy {
        Policy::new(["dan"], Some("Dan Papers".into()))
    }

    fn caller(login: &str, name: &str) -> Caller {
        policy().caller(Identity {
            login: login.into(),
            display_name: name.into(),
        })
    }

    #[test_case("dan", "Dan", "Someone Else"; "admin edits anyone")]
    #[test_case("DAN", "Dan", "Dan Papers"; "admin login ignores case")]
    #[test_case("ada", "Ada Lovelace", "ada lovelace"; "author by display name")]
    #[test_case("ada", "Ada Lovelace", "ADA"; "author by login")]
    #[test]
    fn allowed(login: &str, name: &str, author: &str) {
        assert_eq!(policy().authorize(&caller(login, name), author), Ok(()));
    }

    #[test]
    fn site_owner_content_is_admin_only() {
        let result = policy().authorize(&caller("ada", "Ada"), "dan papers");
        assert_eq!(
            result,
            Err(Denied::OwnerContent {
                login: "ada".into()
            })
        );
    }

    #[test]
    fn strangers_are_denied() {
        let result = policy().authorize(&caller("ada", "Ada"), "Grace");
        assert_eq!(
            result,
            Err(Denied::NotAuthor {
                login: "ada".into(),
                author: "Grace".into()
            })
        );

        let result = Policy::default().authorize(&caller("ada", "Ada"), "");
        assert!(matches!(result, Err(Denied::NotAuthor { .. })));
    }

    #[test]
    fn caller_admin_status() {
        assert!(caller("dan", "Dan").is_admin);
        assert!(!caller("ada", "Ada").is_admin);
    }
}
