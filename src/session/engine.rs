// src/session/engine.rs
//
// One student's run through one exam: shuffled presentation, countdown,
// answers keyed by question id, a confirmation step before the final
// submit, and exactly one scored result.

use std::collections::HashMap;

use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        exam_result::{ExamResult, ResultSummary},
        question::PublicQuestion,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Timer running, navigation enabled.
    InProgress,
    /// Finish dialog shown; the timer keeps running.
    Confirming,
    /// Terminal. Timer stopped, result computed.
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NoQuestions,
    AlreadySubmitted,
    UnknownQuestion(String),
    InvalidOption { option_index: usize, option_count: usize },
    AtFirstQuestion,
    AtLastQuestion,
    NotAtLastQuestion,
    NotConfirming,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NoQuestions => write!(f, "Exam has no questions"),
            SessionError::AlreadySubmitted => write!(f, "Exam session already submitted"),
            SessionError::UnknownQuestion(id) => write!(f, "Question {} is not part of this exam", id),
            SessionError::InvalidOption { option_index, option_count } => write!(
                f,
                "Option {} out of range (question has {} options)",
                option_index, option_count
            ),
            SessionError::AtFirstQuestion => write!(f, "Already at the first question"),
            SessionError::AtLastQuestion => write!(f, "Already at the last question; finish the exam instead"),
            SessionError::NotAtLastQuestion => write!(f, "The exam can only be finished from the last question"),
            SessionError::NotConfirming => write!(f, "Finish has not been requested"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AlreadySubmitted => AppError::Conflict(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

/// Scores a set of answers against an exam.
///
/// Matching is by question id, so the presentation order never matters.
/// Unanswered questions count as wrong. Percent and XP are rounded half up.
pub fn score_exam(
    exam: &Exam,
    answers: &HashMap<String, usize>,
    student_id: &str,
    completed_at: i64,
) -> ExamResult {
    let total = exam.questions.len() as u32;
    let correct = exam
        .questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_answer_index))
        .count() as u32;

    let score = round_ratio(correct, total, 100);
    let points_earned = round_ratio(correct, total, exam.max_points());

    ExamResult {
        id: Uuid::new_v4().to_string(),
        exam_id: exam.id.clone(),
        student_id: student_id.to_string(),
        score,
        correct_count: correct,
        wrong_count: total - correct,
        is_passed: score >= exam.pass_percentage,
        completed_at,
        points_earned,
        answers: answers.clone(),
    }
}

/// round(part / whole * scale), half up, in integer arithmetic.
fn round_ratio(part: u32, whole: u32, scale: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let (part, whole, scale) = (part as u64, whole as u64, scale as u64);
    ((2 * part * scale + whole) / (2 * whole)) as u32
}

/// Formats seconds as `m:ss`.
pub fn format_remaining(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug, Clone)]
pub struct ExamSession {
    id: Uuid,
    exam: Exam,
    student_id: String,
    /// Indices into `exam.questions`, fixed at start.
    order: Vec<usize>,
    cursor: usize,
    answers: HashMap<String, usize>,
    remaining_seconds: u64,
    state: SessionState,
    result: Option<ExamResult>,
}

/// What the client renders for the current step of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub exam_id: String,
    pub exam_title: String,
    pub state: SessionState,
    /// 1-based position in the presentation order.
    pub position: usize,
    pub total_questions: usize,
    pub question: Option<PublicQuestion>,
    pub selected_option: Option<usize>,
    pub answered_count: usize,
    pub remaining_seconds: u64,
    pub remaining_display: String,
    pub can_go_back: bool,
    pub is_last: bool,
    pub summary: Option<ResultSummary>,
}

impl ExamSession {
    /// Starts a session. The presentation order is shuffled here and never
    /// again for the lifetime of the session.
    pub fn start<R: Rng + ?Sized>(
        exam: Exam,
        student_id: &str,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        if exam.questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        let mut order: Vec<usize> = (0..exam.questions.len()).collect();
        order.shuffle(rng);

        let minutes = if exam.duration_minutes == 0 {
            Exam::derived_duration(exam.questions.len())
        } else {
            exam.duration_minutes
        };

        Ok(Self {
            id: Uuid::new_v4(),
            exam,
            student_id: student_id.to_string(),
            order,
            cursor: 0,
            answers: HashMap::new(),
            remaining_seconds: minutes as u64 * 60,
            state: SessionState::InProgress,
            result: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn result(&self) -> Option<&ExamResult> {
        self.result.as_ref()
    }

    pub fn answers(&self) -> &HashMap<String, usize> {
        &self.answers
    }

    /// Question ids in presentation order.
    pub fn presentation_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&i| self.exam.questions[i].id.as_str())
            .collect()
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.state == SessionState::Submitted {
            return Err(SessionError::AlreadySubmitted);
        }
        Ok(())
    }

    fn is_last(&self) -> bool {
        self.cursor + 1 == self.order.len()
    }

    /// Records (or overwrites) the answer for a question.
    pub fn select_answer(&mut self, question_id: &str, option_index: usize) -> Result<(), SessionError> {
        self.ensure_open()?;
        let question = self
            .exam
            .question(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;
        if option_index >= question.options.len() {
            return Err(SessionError::InvalidOption {
                option_index,
                option_count: question.options.len(),
            });
        }
        self.answers.insert(question_id.to_string(), option_index);
        Ok(())
    }

    /// Leaves a question unanswered again.
    pub fn clear_answer(&mut self, question_id: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.exam.question(question_id).is_none() {
            return Err(SessionError::UnknownQuestion(question_id.to_string()));
        }
        self.answers.remove(question_id);
        Ok(())
    }

    pub fn next(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.is_last() {
            return Err(SessionError::AtLastQuestion);
        }
        self.cursor += 1;
        Ok(())
    }

    pub fn previous(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.cursor == 0 {
            return Err(SessionError::AtFirstQuestion);
        }
        self.cursor -= 1;
        Ok(())
    }

    /// Opens the finish confirmation. Only offered on the last question.
    pub fn request_finish(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if !self.is_last() {
            return Err(SessionError::NotAtLastQuestion);
        }
        self.state = SessionState::Confirming;
        Ok(())
    }

    pub fn cancel_finish(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.state != SessionState::Confirming {
            return Err(SessionError::NotConfirming);
        }
        self.state = SessionState::InProgress;
        Ok(())
    }

    /// Confirmed submission.
    pub fn confirm_finish(&mut self, now: i64) -> Result<ExamResult, SessionError> {
        self.ensure_open()?;
        if self.state != SessionState::Confirming {
            return Err(SessionError::NotConfirming);
        }
        Ok(self.submit(now))
    }

    /// Advances the countdown by one second. When it reaches zero the
    /// session submits itself, skipping confirmation, and the result is
    /// returned. Returns `None` on every other call, including all calls
    /// after submission.
    pub fn tick(&mut self, now: i64) -> Option<ExamResult> {
        if self.state == SessionState::Submitted {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            tracing::info!(session_id = %self.id, exam_id = %self.exam.id, "Time is up, submitting");
            return Some(self.submit(now));
        }
        None
    }

    fn submit(&mut self, now: i64) -> ExamResult {
        let result = score_exam(&self.exam, &self.answers, &self.student_id, now);
        self.state = SessionState::Submitted;
        self.result = Some(result.clone());
        result
    }

    pub fn view(&self) -> SessionView {
        let submitted = self.state == SessionState::Submitted;
        let question = (!submitted).then(|| &self.exam.questions[self.order[self.cursor]]);

        SessionView {
            session_id: self.id,
            exam_id: self.exam.id.clone(),
            exam_title: self.exam.title.clone(),
            state: self.state,
            position: self.cursor + 1,
            total_questions: self.order.len(),
            question: question.map(PublicQuestion::from),
            selected_option: question.and_then(|q| self.answers.get(&q.id).copied()),
            answered_count: self.answers.len(),
            remaining_seconds: self.remaining_seconds,
            remaining_display: format_remaining(self.remaining_seconds),
            can_go_back: !submitted && self.cursor > 0,
            is_last: self.is_last(),
            summary: self
                .result
                .as_ref()
                .map(|r| ResultSummary::new(&self.exam.title, r)),
        }
    }
}
