//! Bundled fallback content, served while the backend is unreachable.
//!
//! The datasets ship inside the binary (`include_str!`) so they version
//! with the build, and are parsed once on first use. A parse failure
//! degrades to empty datasets rather than failing the caller.

use std::sync::OnceLock;

use serde::Deserialize;
use tracing::warn;

use crate::models::{Project, ProjectCategory, Skill, SkillCategory, SkillWithProjects};

static FALLBACK: OnceLock<FallbackData> = OnceLock::new();

const FALLBACK_JSON: &str = include_str!("../data/fallback_content.json");

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FallbackData {
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    skills: Vec<Skill>,
    #[serde(default)]
    skill_categories: Vec<SkillCategory>,
    #[serde(default)]
    project_categories: Vec<ProjectCategory>,
}

fn data() -> &'static FallbackData {
    FALLBACK.get_or_init(|| match serde_json::from_str(FALLBACK_JSON) {
        Ok(data) => data,
        Err(e) => {
            warn!(error = %e, "Failed to parse bundled fallback content, serving empty datasets");
            FallbackData::default()
        }
    })
}

pub fn projects() -> Vec<Project> {
    data().projects.clone()
}

pub fn skills() -> Vec<Skill> {
    data().skills.clone()
}

pub fn skill_categories() -> Vec<SkillCategory> {
    data().skill_categories.clone()
}

pub fn project_categories() -> Vec<ProjectCategory> {
    data().project_categories.clone()
}

/// The bundled stand-in for the skills-with-projects join: each skill is
/// paired with the bundled projects that list it as a technology.
pub fn skills_with_projects() -> Vec<SkillWithProjects> {
    let data = data();
    data.skills
        .iter()
        .map(|skill| SkillWithProjects {
            skill: skill.clone(),
            projects: data
                .projects
                .iter()
                .filter(|p| p.uses_technology(&skill.name))
                .cloned()
                .collect(),
        })
        .collect()
}

/// Look up a bundled project by id, for detail views in fallback mode.
pub fn project_by_id(id: i64) -> Option<Project> {
    data().projects.iter().find(|p| p.id == id).cloned()
}
