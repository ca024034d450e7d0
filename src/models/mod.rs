//! Data models for portfolio content.
//!
//! This module contains the data structures returned by the content API:
//!
//! - `Project`, `ProjectCategory`: portfolio project records
//! - `Skill`, `SkillCategory`: skill records and their grouping
//! - `SkillWithProjects`: a skill joined with its related projects
//!
//! Field names follow the backend's camelCase JSON; the subsystem only
//! depends on record identity, not field-level content semantics.

pub mod project;
pub mod skill;

pub use project::{parse_project_id, Project, ProjectCategory};
pub use skill::{Skill, SkillCategory, SkillWithProjects};
