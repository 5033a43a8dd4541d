// src/store/mod.rs

pub mod local;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        exam_result::ExamResult,
        question::Question,
        user::{Student, Teacher},
    },
    share,
    utils::text::normalize_text,
};

pub use local::LocalStore;
pub use postgres::PgStore;

/// The persistence gateway. Handlers, the session engine and analytics only
/// ever see this trait; the concrete backend is picked at startup.
#[async_trait]
pub trait ExamStore: Send + Sync {
    /// Creates the singleton teacher if none exists yet.
    async fn initialize(&self, default_teacher: Teacher) -> Result<(), AppError>;

    async fn get_students(&self) -> Result<Vec<Student>, AppError>;
    async fn get_exams(&self) -> Result<Vec<Exam>, AppError>;
    async fn get_results(&self) -> Result<Vec<ExamResult>, AppError>;
    async fn get_question_pool(&self) -> Result<Vec<Question>, AppError>;
    async fn get_teacher(&self) -> Result<Teacher, AppError>;

    /// Upsert keyed by `school_no`.
    async fn save_student(&self, student: Student) -> Result<(), AppError>;

    /// Upsert keyed by `id`. Questions whose normalized text is not yet in
    /// the pool are appended to it.
    async fn save_exam(&self, exam: Exam) -> Result<(), AppError>;

    /// Append-only. A second result for the same student and exam is a
    /// `Conflict`.
    async fn save_result(&self, result: ExamResult) -> Result<(), AppError>;

    async fn delete_exam(&self, id: &str) -> Result<(), AppError>;
    async fn delete_student(&self, school_no: &str) -> Result<(), AppError>;

    async fn find_exam(&self, id: &str) -> Result<Option<Exam>, AppError> {
        Ok(self.get_exams().await?.into_iter().find(|e| e.id == id))
    }

    async fn find_student_by_school_no(&self, school_no: &str) -> Result<Option<Student>, AppError> {
        Ok(self
            .get_students()
            .await?
            .into_iter()
            .find(|s| s.school_no == school_no))
    }

    async fn find_student_by_id(&self, id: &str) -> Result<Option<Student>, AppError> {
        Ok(self.get_students().await?.into_iter().find(|s| s.id == id))
    }

    async fn find_result(&self, id: &str) -> Result<Option<ExamResult>, AppError> {
        Ok(self.get_results().await?.into_iter().find(|r| r.id == id))
    }

    async fn results_for_student(&self, student_id: &str) -> Result<Vec<ExamResult>, AppError> {
        Ok(self
            .get_results()
            .await?
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect())
    }

    async fn results_for_exam(&self, exam_id: &str) -> Result<Vec<ExamResult>, AppError> {
        Ok(self
            .get_results()
            .await?
            .into_iter()
            .filter(|r| r.exam_id == exam_id)
            .collect())
    }

    /// Decodes a share-link payload and stores the exam.
    /// Returns the title, or `None` when the payload does not decode or the
    /// exam breaks an authoring rule.
    async fn import_exam_from_link(&self, payload: &str) -> Result<Option<String>, AppError> {
        let exam = match share::decode_exam(payload) {
            Ok(exam) => exam,
            Err(e) => {
                tracing::warn!("Failed to import exam from link: {}", e);
                return Ok(None);
            }
        };
        let exam = match exam.into_authored() {
            Ok(exam) => exam,
            Err(reason) => {
                tracing::warn!("Refused shared exam: {}", reason);
                return Ok(None);
            }
        };
        let title = exam.title.clone();
        self.save_exam(exam).await?;
        tracing::info!("Imported shared exam '{}'", title);
        Ok(Some(title))
    }
}

/// Appends to `pool` every question of `exam` whose normalized text is new.
/// Shared by both backends so their de-duplication rule cannot drift.
pub(crate) fn merge_into_pool(pool: &mut Vec<Question>, exam: &Exam) -> usize {
    let mut added = 0;
    for q in &exam.questions {
        let key = normalize_text(&q.text);
        if key.is_empty() || pool.iter().any(|p| normalize_text(&p.text) == key) {
            continue;
        }
        pool.push(q.clone());
        added += 1;
    }
    added
}
