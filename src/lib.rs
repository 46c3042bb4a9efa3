//! Client engine for a course-management backend.
//!
//! The interesting pieces are the [`reconcile::ReconciliationEngine`], which
//! merges group membership, roster membership, assignment stats and grades
//! into one consistent per-student view, and the
//! [`notify::NotificationCenter`], which filters a live notification feed
//! through user preferences. Everything talks to the backend through the
//! [`api::CourseApi`] seam so tests can substitute an in-memory fake.

pub mod api;
pub mod config;
pub mod export;
pub mod models;
pub mod notify;
pub mod reconcile;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;
