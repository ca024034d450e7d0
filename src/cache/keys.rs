//! Resource keys for the cached content families.

pub const PROJECTS: &str = "projects";
pub const SKILLS: &str = "skills";
pub const SKILL_CATEGORIES: &str = "skillCategories";
pub const PROJECT_CATEGORIES: &str = "projectCategories";
pub const SKILLS_WITH_PROJECTS: &str = "skillsWithProjects";

/// All non-parametric resource keys, in display order.
pub const ALL: [&str; 5] = [
    PROJECTS,
    SKILLS,
    SKILL_CATEGORIES,
    PROJECT_CATEGORIES,
    SKILLS_WITH_PROJECTS,
];

/// Retry-state key for the parametric project-detail family.
pub fn project_detail(id: i64) -> String {
    format!("projectDetail:{}", id)
}
