// src/models/exam.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    config::{DEFAULT_DIFFICULTY_POINTS, MINUTES_PER_QUESTION},
    models::question::{Question, QuestionInput, align_option_images, is_well_formed},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExamStatus {
    #[default]
    Active,
    Archived,
}

fn default_difficulty_points() -> u32 {
    DEFAULT_DIFFICULTY_POINTS
}

fn default_pass_percentage() -> u32 {
    50
}

/// Represents an exam document.
///
/// `questions` keeps authoring order; presentation order is decided per
/// session. Several fields carry defaults so that exams shared from older
/// clients still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub title: String,
    #[serde(default = "default_pass_percentage")]
    pub pass_percentage: u32,
    #[serde(default = "default_difficulty_points")]
    pub difficulty_points: u32,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub target_classes: Vec<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub status: ExamStatus,
}

impl Exam {
    /// Duration is never set by hand: two minutes per question.
    pub fn derived_duration(question_count: usize) -> u32 {
        question_count as u32 * MINUTES_PER_QUESTION
    }

    /// Difficulty points with the legacy "0 means unset" rule applied.
    pub fn max_points(&self) -> u32 {
        if self.difficulty_points == 0 {
            DEFAULT_DIFFICULTY_POINTS
        } else {
            self.difficulty_points
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ExamStatus::Active
    }

    /// Whether a student of `class_group` should see this exam.
    pub fn is_visible_to(&self, class_group: &str) -> bool {
        self.is_active() && self.target_classes.iter().any(|c| c == class_group)
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Holds an exam that did not come through the editor (a share link)
    /// to the same rules `save_exam` enforces. `Err` names the first
    /// broken rule.
    pub fn into_authored(mut self) -> Result<Self, String> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err("exam has no title".to_string());
        }
        if self.questions.is_empty() {
            return Err("exam has no questions".to_string());
        }
        if let Some(q) = self.questions.iter().find(|q| !is_well_formed(q)) {
            return Err(format!("question '{}' is malformed", q.id));
        }
        if self.pass_percentage > 100 {
            return Err(format!("pass percentage {} is out of range", self.pass_percentage));
        }

        self.target_classes = self
            .target_classes
            .iter()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        if self.target_classes.is_empty() {
            return Err("exam targets no class".to_string());
        }

        if self.id.trim().is_empty() {
            self.id = uuid::Uuid::new_v4().to_string();
        }
        for q in &mut self.questions {
            q.option_images = q.option_images.take().map(align_option_images);
        }
        self.duration_minutes = Self::derived_duration(self.questions.len());
        Ok(self)
    }
}

/// DTO for creating or updating an exam.
///
/// When `id` matches an existing exam it is updated in place, otherwise a
/// new exam is created. Duration is recomputed on every save.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveExamRequest {
    pub id: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Please enter an exam title."))]
    pub title: String,
    #[validate(range(max = 100, message = "Pass percentage must be between 0 and 100."))]
    pub pass_percentage: Option<u32>,
    #[validate(range(min = 1, max = 10000))]
    pub difficulty_points: Option<u32>,
    #[validate(
        length(min = 1, message = "An exam needs at least one question."),
        nested
    )]
    pub questions: Vec<QuestionInput>,
    #[validate(length(min = 1, message = "Assign the exam to at least one class."))]
    pub target_classes: Vec<String>,
    pub status: Option<ExamStatus>,
}

/// DTO for archiving or re-activating an exam.
#[derive(Debug, Deserialize)]
pub struct UpdateExamStatusRequest {
    pub status: ExamStatus,
}

/// Exam card on the student dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamCard {
    pub id: String,
    pub title: String,
    pub question_count: usize,
    pub duration_minutes: u32,
    pub max_points: u32,
    /// A completed exam cannot be entered again.
    pub completed: bool,
}

/// Exam summary in the teacher's list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub id: String,
    pub title: String,
    pub question_count: usize,
    pub duration_minutes: u32,
    pub pass_percentage: u32,
    pub target_classes: Vec<String>,
    pub status: ExamStatus,
    pub created_at: i64,
    pub participant_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_minimal_shared_exam() {
        let json = r#"{"id":"e1","title":"Fractions"}"#;
        let exam: Exam = serde_json::from_str(json).unwrap();
        assert_eq!(exam.difficulty_points, 100);
        assert_eq!(exam.pass_percentage, 50);
        assert_eq!(exam.status, ExamStatus::Active);
        assert!(exam.questions.is_empty());
    }

    #[test]
    fn test_visibility_requires_active_and_target_class() {
        let mut exam: Exam =
            serde_json::from_str(r#"{"id":"e1","title":"T","targetClasses":["5A"]}"#).unwrap();
        assert!(exam.is_visible_to("5A"));
        assert!(!exam.is_visible_to("5B"));
        exam.status = ExamStatus::Archived;
        assert!(!exam.is_visible_to("5A"));
    }

    fn shared(json: serde_json::Value) -> Exam {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_into_authored_rederives_duration() {
        let exam = shared(serde_json::json!({
            "id": "e1",
            "title": " Kesirler ",
            "durationMinutes": 999,
            "targetClasses": [" 5a ", ""],
            "questions": [
                { "id": "q1", "text": "1/2 + 1/2", "options": ["0", "1", "2", "3"],
                  "correctAnswerIndex": 1, "optionImages": ["x"] }
            ]
        }))
        .into_authored()
        .unwrap();

        assert_eq!(exam.title, "Kesirler");
        assert_eq!(exam.duration_minutes, 2);
        assert_eq!(exam.target_classes, vec!["5A".to_string()]);
        assert_eq!(exam.questions[0].option_images.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn test_into_authored_rejects_broken_exams() {
        let base = serde_json::json!({
            "id": "e1",
            "title": "Bad",
            "targetClasses": ["5A"],
            "questions": [
                { "id": "q1", "text": "?", "options": ["a", "b", "c", "d"], "correctAnswerIndex": 0 }
            ]
        });
        assert!(shared(base.clone()).into_authored().is_ok());

        let mut two_options = base.clone();
        two_options["questions"][0]["options"] = serde_json::json!(["a", "b"]);
        assert!(shared(two_options).into_authored().is_err());

        let mut bad_index = base.clone();
        bad_index["questions"][0]["correctAnswerIndex"] = serde_json::json!(200);
        assert!(shared(bad_index).into_authored().is_err());

        let mut no_classes = base.clone();
        no_classes["targetClasses"] = serde_json::json!([]);
        assert!(shared(no_classes).into_authored().is_err());

        let mut no_questions = base;
        no_questions["questions"] = serde_json::json!([]);
        assert!(shared(no_questions).into_authored().is_err());
    }

    #[test]
    fn test_derived_duration_and_points() {
        assert_eq!(Exam::derived_duration(7), 14);
        let mut exam: Exam = serde_json::from_str(r#"{"id":"e1","title":"T"}"#).unwrap();
        exam.difficulty_points = 0;
        assert_eq!(exam.max_points(), 100);
    }
}
