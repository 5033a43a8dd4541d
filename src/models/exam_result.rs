// src/models/exam_result.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One submitted attempt. Created once per (student, exam) pair and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: String,
    pub exam_id: String,
    pub student_id: String,
    /// Integer percent, 0..=100.
    pub score: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub is_passed: bool,
    pub completed_at: i64,
    /// XP awarded for this attempt.
    pub points_earned: u32,
    /// Question id -> chosen option index. Skipped questions are absent.
    #[serde(default)]
    pub answers: HashMap<String, usize>,
}

/// Summary shown after submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub exam_title: String,
    pub score: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub points_earned: u32,
    pub is_passed: bool,
}

impl ResultSummary {
    pub fn new(exam_title: &str, result: &ExamResult) -> Self {
        Self {
            exam_title: exam_title.to_string(),
            score: result.score,
            correct_count: result.correct_count,
            wrong_count: result.wrong_count,
            points_earned: result.points_earned,
            is_passed: result.is_passed,
        }
    }
}
