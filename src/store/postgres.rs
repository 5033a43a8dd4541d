// src/store/postgres.rs
//
// Hosted document store: one table per collection, each document kept
// whole in a JSONB `data` column next to the columns used as keys.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions, types::Json};

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        exam_result::ExamResult,
        question::Question,
        user::{Student, Teacher},
    },
    store::ExamStore,
    utils::text::normalize_text,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with retry and applies migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let mut retry_count = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count > 5 {
                        return Err(AppError::InternalServerError(format!(
                            "Failed to connect to database after 5 retries: {}",
                            e
                        )));
                    }
                    tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };
        tracing::info!("Database connected...");

        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        tracing::info!("Migrations applied successfully.");

        Ok(Self::new(pool))
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("{}: {:?}", context, e);
        AppError::InternalServerError(e.to_string())
    }
}

#[async_trait]
impl ExamStore for PgStore {
    async fn initialize(&self, default_teacher: Teacher) -> Result<(), AppError> {
        let inserted = sqlx::query(
            "INSERT INTO teachers (id, data) SELECT $1, $2 WHERE NOT EXISTS (SELECT 1 FROM teachers)",
        )
        .bind(&default_teacher.id)
        .bind(Json(&default_teacher))
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to seed teacher"))?;

        if inserted.rows_affected() > 0 {
            tracing::info!("Seeding teacher account: {}", default_teacher.username);
        }
        Ok(())
    }

    async fn get_students(&self) -> Result<Vec<Student>, AppError> {
        let rows: Vec<Json<Student>> =
            sqlx::query_scalar("SELECT data FROM students ORDER BY created_at, school_no")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to list students"))?;
        Ok(rows.into_iter().map(|Json(s)| s).collect())
    }

    async fn get_exams(&self) -> Result<Vec<Exam>, AppError> {
        let rows: Vec<Json<Exam>> = sqlx::query_scalar("SELECT data FROM exams ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list exams"))?;
        Ok(rows.into_iter().map(|Json(e)| e).collect())
    }

    async fn get_results(&self) -> Result<Vec<ExamResult>, AppError> {
        let rows: Vec<Json<ExamResult>> =
            sqlx::query_scalar("SELECT data FROM exam_results ORDER BY completed_at, id")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to list results"))?;
        Ok(rows.into_iter().map(|Json(r)| r).collect())
    }

    async fn get_question_pool(&self) -> Result<Vec<Question>, AppError> {
        let rows: Vec<Json<Question>> = sqlx::query_scalar("SELECT data FROM question_pool ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list question pool"))?;
        Ok(rows.into_iter().map(|Json(q)| q).collect())
    }

    async fn get_teacher(&self) -> Result<Teacher, AppError> {
        let row: Option<Json<Teacher>> = sqlx::query_scalar("SELECT data FROM teachers LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load teacher"))?;
        row.map(|Json(t)| t)
            .ok_or(AppError::NotFound("Teacher account not initialized".to_string()))
    }

    async fn save_student(&self, student: Student) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO students (school_no, id, data, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (school_no) DO UPDATE SET
                id = EXCLUDED.id,
                data = EXCLUDED.data
            "#,
        )
        .bind(&student.school_no)
        .bind(&student.id)
        .bind(Json(&student))
        .bind(student.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to save student"))?;
        Ok(())
    }

    async fn save_exam(&self, exam: Exam) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO exams (id, data, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data
            "#,
        )
        .bind(&exam.id)
        .bind(Json(&exam))
        .bind(exam.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to save exam"))?;

        for q in &exam.questions {
            let key = normalize_text(&q.text);
            if key.is_empty() {
                continue;
            }
            sqlx::query(
                "INSERT INTO question_pool (text_key, data) VALUES ($1, $2) ON CONFLICT (text_key) DO NOTHING",
            )
            .bind(key)
            .bind(Json(q))
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to add question to pool"))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_result(&self, result: ExamResult) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO exam_results (id, exam_id, student_id, data, completed_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&result.id)
        .bind(&result.exam_id)
        .bind(&result.student_id)
        .bind(Json(&result))
        .bind(result.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("This exam has already been submitted".to_string())
            }
            _ => {
                tracing::error!("Failed to save result: {:?}", e);
                AppError::InternalServerError(e.to_string())
            }
        })?;
        Ok(())
    }

    async fn delete_exam(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete exam"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }
        Ok(())
    }

    async fn delete_student(&self, school_no: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM students WHERE school_no = $1")
            .bind(school_no)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete student"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Student not found".to_string()));
        }
        Ok(())
    }

    async fn find_exam(&self, id: &str) -> Result<Option<Exam>, AppError> {
        let row: Option<Json<Exam>> = sqlx::query_scalar("SELECT data FROM exams WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load exam"))?;
        Ok(row.map(|Json(e)| e))
    }

    async fn find_student_by_school_no(&self, school_no: &str) -> Result<Option<Student>, AppError> {
        let row: Option<Json<Student>> =
            sqlx::query_scalar("SELECT data FROM students WHERE school_no = $1")
                .bind(school_no)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to load student"))?;
        Ok(row.map(|Json(s)| s))
    }

    async fn results_for_exam(&self, exam_id: &str) -> Result<Vec<ExamResult>, AppError> {
        let rows: Vec<Json<ExamResult>> = sqlx::query_scalar(
            "SELECT data FROM exam_results WHERE exam_id = $1 ORDER BY completed_at",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list exam results"))?;
        Ok(rows.into_iter().map(|Json(r)| r).collect())
    }

    async fn results_for_student(&self, student_id: &str) -> Result<Vec<ExamResult>, AppError> {
        let rows: Vec<Json<ExamResult>> = sqlx::query_scalar(
            "SELECT data FROM exam_results WHERE student_id = $1 ORDER BY completed_at",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list student results"))?;
        Ok(rows.into_iter().map(|Json(r)| r).collect())
    }
}
