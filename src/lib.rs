// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dan Papers publishing engine.
//!
//! Dan Papers publishes research articles by committing them straight into a
//! TypeScript source file hosted on GitHub. That file is both a hand-written
//! piece of the site and its only data store, so every publish, edit, or
//! delete surgically splices a single record in or out of it, leaving the
//! rest of the file byte-for-byte alone.
//!
//! # Layout
//!
//! - [`source`] encodes records and splices them into source text.
//! - [`publish`] sequences read, authorization, splice, and conditional write
//!   into one commit.
//! - [`policy`] decides who may edit or delete whose articles.
//! - [`remote`] talks to the host of the source file.
//! - [`store`] mirrors committed articles locally.
//! - [`session`] keeps the credential of the logged in user.
//! - [`render`] turns article bodies into terminal text.

pub mod article;
pub mod config;
pub mod path;
pub mod policy;
pub mod publish;
pub mod remote;
pub mod render;
pub mod session;
pub mod source;
pub mod store;
