use serde::{Deserialize, Serialize};

use super::Project;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: i64,
    pub name: String,
    #[serde(rename = "categoryId", default)]
    pub category_id: Option<i64>,
    /// Proficiency from 0 to 100, when the backend provides one.
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(rename = "iconName", default)]
    pub icon_name: Option<String>,
    #[serde(rename = "sortOrder", default)]
    pub sort_order: Option<i32>,
}

impl Skill {
    pub fn level_label(&self) -> &'static str {
        match self.level {
            Some(level) if level >= 80 => "Expert",
            Some(level) if level >= 50 => "Proficient",
            Some(_) => "Familiar",
            None => "Unrated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub id: i64,
    pub name: String,
    #[serde(rename = "sortOrder", default)]
    pub sort_order: Option<i32>,
}

/// A skill joined with the projects that exercise it, as returned by
/// the `/skills/with-projects` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillWithProjects {
    #[serde(flatten)]
    pub skill: Skill,
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_label_bands() {
        let mut skill = Skill {
            id: 1,
            name: "Rust".to_string(),
            category_id: None,
            level: Some(90),
            icon_name: None,
            sort_order: None,
        };
        assert_eq!(skill.level_label(), "Expert");
        skill.level = Some(60);
        assert_eq!(skill.level_label(), "Proficient");
        skill.level = Some(10);
        assert_eq!(skill.level_label(), "Familiar");
        skill.level = None;
        assert_eq!(skill.level_label(), "Unrated");
    }

    #[test]
    fn test_skill_with_projects_flattens() {
        let json = r#"{
            "id": 3,
            "name": "TypeScript",
            "categoryId": 1,
            "projects": [{"id": 7, "title": "Portfolio"}]
        }"#;
        let parsed: SkillWithProjects = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.skill.name, "TypeScript");
        assert_eq!(parsed.projects.len(), 1);
        assert_eq!(parsed.projects[0].id, 7);
    }
}
