use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "categoryId", default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
    #[serde(rename = "liveUrl", default)]
    pub live_url: Option<String>,
    #[serde(rename = "githubUrl", default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(rename = "sortOrder", default)]
    pub sort_order: Option<i32>,
}

impl Project {
    /// Whether this project lists the given technology (case-insensitive).
    pub fn uses_technology(&self, name: &str) -> bool {
        self.technologies
            .iter()
            .any(|t| t.eq_ignore_ascii_case(name))
    }
}

/// Parse a project id carried through a URL segment. Malformed input is
/// "not found" (`None`), never an error.
pub fn parse_project_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(rename = "sortOrder", default)]
    pub sort_order: Option<i32>,
}
