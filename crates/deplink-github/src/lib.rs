//! Shared helpers for the deplink dependency bot.
//! This crate provides the GitHub wire and entity model, dependency reference
//! extraction, status-comment rendering/parsing, label planning, and transport
//! retry helpers consumed by the runtime crate. Nothing here performs I/O.

pub mod entity;
pub mod github_transport_helpers;
pub mod label_plan;
pub mod reference_extraction;
pub mod status_comment;
