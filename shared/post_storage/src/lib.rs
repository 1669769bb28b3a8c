//! Document store layer for Instabytes posts
//!
//! This crate owns the single MongoDB connection and every read/write against
//! the `posts` collection. The HTTP backend only talks to storage through the
//! [`post::PostRepository`] trait.

pub mod connection;
pub mod post;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
