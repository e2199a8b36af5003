//! Dashboard HTTP API response types

use serde::{Deserialize, Deserializer};

/// Missing and `null` fields both decode as the default value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// data type for api /api/roadmap
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct Roadmap {
    /// career phases, in order
    #[serde(default, deserialize_with = "null_as_default")]
    pub phases: Vec<RoadmapPhase>,
}

/// One phase of a career roadmap
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct RoadmapPhase {
    /// phase title
    #[serde(default, deserialize_with = "null_as_default")]
    pub phase: String,
    /// skills to develop in this phase
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    /// projects to complete in this phase
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects: Vec<String>,
}

/// data type for api /api/interview-questions
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct InterviewQuestions {
    /// question list
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<InterviewQuestion>,
}

/// A single interview preparation question
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct InterviewQuestion {
    /// topic, e.g. "Technical" or "Behavioral"
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    /// free form difficulty label
    #[serde(default, deserialize_with = "null_as_default")]
    pub difficulty: String,
    /// question text
    #[serde(default, deserialize_with = "null_as_default")]
    pub question: String,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roadmap_missing_lists_default_to_empty() {
        let roadmap: Roadmap = serde_json::from_value(json!({
            "phases": [
                { "phase": "Foundations", "skills": ["Rust", "SQL"] },
                { "phase": "Portfolio", "projects": ["CLI tool"] },
            ]
        }))
        .unwrap();

        assert_eq!(roadmap.phases.len(), 2);
        assert_eq!(roadmap.phases[0].skills, vec!["Rust", "SQL"]);
        assert!(roadmap.phases[0].projects.is_empty());
        assert!(roadmap.phases[1].skills.is_empty());
        assert_eq!(roadmap.phases[1].projects, vec!["CLI tool"]);
    }

    #[test]
    fn test_roadmap_without_phases() {
        let roadmap: Roadmap = serde_json::from_value(json!({})).unwrap();
        assert!(roadmap.phases.is_empty());
    }

    #[test]
    fn test_null_fields_default() {
        let roadmap: Roadmap = serde_json::from_value(json!({ "phases": null })).unwrap();
        assert!(roadmap.phases.is_empty());

        let roadmap: Roadmap = serde_json::from_value(json!({
            "phases": [{ "skills": null, "projects": ["Blog"] }]
        }))
        .unwrap();
        assert_eq!(
            roadmap.phases,
            vec![RoadmapPhase {
                phase: String::new(),
                skills: vec![],
                projects: vec!["Blog".to_string()],
            }]
        );

        let questions: InterviewQuestions = serde_json::from_value(json!({
            "questions": [{ "category": "Behavioral", "difficulty": null }]
        }))
        .unwrap();
        assert_eq!(questions.questions[0].category, "Behavioral");
        assert!(questions.questions[0].difficulty.is_empty());
        assert!(questions.questions[0].question.is_empty());
    }

    #[test]
    fn test_interview_questions_decode() {
        let questions: InterviewQuestions = serde_json::from_value(json!({
            "questions": [{
                "category": "Technical",
                "difficulty": "Medium",
                "question": "Explain ownership.",
                "hint": "ignored",
            }]
        }))
        .unwrap();

        assert_eq!(
            questions.questions,
            vec![InterviewQuestion {
                category: "Technical".to_string(),
                difficulty: "Medium".to_string(),
                question: "Explain ownership.".to_string(),
            }]
        );
    }
}
