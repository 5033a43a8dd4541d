// src/store/local.rs
//
// Local key-value document store. Every collection is one JSON document
// under a fixed key, optionally mirrored to a snapshot file after each write.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        exam_result::ExamResult,
        question::Question,
        user::{Student, Teacher},
    },
    store::{ExamStore, merge_into_pool},
    utils::hash::{hash_password, is_password_hash},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Collections {
    #[serde(rename = "eduexam_students", default)]
    students: Vec<Student>,
    #[serde(rename = "eduexam_teacher", default)]
    teacher: Option<Teacher>,
    #[serde(rename = "eduexam_exams", default)]
    exams: Vec<Exam>,
    #[serde(rename = "eduexam_results", default)]
    results: Vec<ExamResult>,
    #[serde(rename = "eduexam_pool", default)]
    pool: Vec<Question>,
}

pub struct LocalStore {
    data: RwLock<Collections>,
    snapshot: Option<PathBuf>,
}

impl LocalStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(Collections::default()),
            snapshot: None,
        }
    }

    /// Opens (or starts) a snapshot-backed store.
    ///
    /// Snapshots written by older clients kept passwords in plaintext; those
    /// are hashed while loading so nothing else ever compares plaintext.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let mut collections = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if !raw.trim().is_empty() => serde_json::from_str::<Collections>(&raw)
                .map_err(|e| {
                    AppError::InternalServerError(format!(
                        "Corrupt data file {}: {}",
                        path.display(),
                        e
                    ))
                })?,
            Ok(_) => Collections::default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No data file at {}, starting empty", path.display());
                Collections::default()
            }
            Err(e) => return Err(AppError::InternalServerError(e.to_string())),
        };

        let mut migrated = 0;
        for student in &mut collections.students {
            if !is_password_hash(&student.password_hash) {
                student.password_hash = hash_password(&student.password_hash)?;
                migrated += 1;
            }
        }
        if let Some(teacher) = collections.teacher.as_mut() {
            if !is_password_hash(&teacher.password_hash) {
                teacher.password_hash = hash_password(&teacher.password_hash)?;
                migrated += 1;
            }
        }

        let store = Self {
            data: RwLock::new(collections),
            snapshot: Some(path),
        };
        if migrated > 0 {
            tracing::warn!("Hashed {} plaintext credential(s) from data file", migrated);
            {
                let data = store.data.read().await;
                store.persist(&data).await?;
            }
        }
        Ok(store)
    }

    /// Applies `f` to the collections. With a snapshot file the change is
    /// made on a copy and only becomes visible once the file is written, so
    /// memory never holds something the file does not.
    async fn update<T: Send>(
        &self,
        f: impl FnOnce(&mut Collections) -> Result<T, AppError> + Send,
    ) -> Result<T, AppError> {
        let mut data = self.data.write().await;
        if self.snapshot.is_none() {
            return f(&mut *data);
        }
        let mut next = data.clone();
        let out = f(&mut next)?;
        self.persist(&next).await?;
        *data = next;
        Ok(out)
    }

    async fn persist(&self, data: &Collections) -> Result<(), AppError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let raw = serde_json::to_vec_pretty(data)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        tokio::fs::write(path, raw).await.map_err(|e| {
            tracing::error!("Failed to write data file {}: {:?}", path.display(), e);
            AppError::InternalServerError(e.to_string())
        })
    }
}

#[async_trait]
impl ExamStore for LocalStore {
    async fn initialize(&self, default_teacher: Teacher) -> Result<(), AppError> {
        self.update(|data| {
            if data.teacher.is_none() {
                tracing::info!("Seeding teacher account: {}", default_teacher.username);
                data.teacher = Some(default_teacher);
            }
            Ok(())
        })
        .await
    }

    async fn get_students(&self) -> Result<Vec<Student>, AppError> {
        Ok(self.data.read().await.students.clone())
    }

    async fn get_exams(&self) -> Result<Vec<Exam>, AppError> {
        Ok(self.data.read().await.exams.clone())
    }

    async fn get_results(&self) -> Result<Vec<ExamResult>, AppError> {
        Ok(self.data.read().await.results.clone())
    }

    async fn get_question_pool(&self) -> Result<Vec<Question>, AppError> {
        Ok(self.data.read().await.pool.clone())
    }

    async fn get_teacher(&self) -> Result<Teacher, AppError> {
        self.data
            .read()
            .await
            .teacher
            .clone()
            .ok_or(AppError::NotFound("Teacher account not initialized".to_string()))
    }

    async fn save_student(&self, student: Student) -> Result<(), AppError> {
        self.update(|data| {
            match data.students.iter_mut().find(|s| s.school_no == student.school_no) {
                Some(existing) => *existing = student,
                None => data.students.push(student),
            }
            Ok(())
        })
        .await
    }

    async fn save_exam(&self, exam: Exam) -> Result<(), AppError> {
        self.update(|data| {
            merge_into_pool(&mut data.pool, &exam);
            match data.exams.iter_mut().find(|e| e.id == exam.id) {
                Some(existing) => *existing = exam,
                None => data.exams.push(exam),
            }
            Ok(())
        })
        .await
    }

    async fn save_result(&self, result: ExamResult) -> Result<(), AppError> {
        self.update(|data| {
            if data
                .results
                .iter()
                .any(|r| r.student_id == result.student_id && r.exam_id == result.exam_id)
            {
                return Err(AppError::Conflict(
                    "This exam has already been submitted".to_string(),
                ));
            }
            data.results.push(result);
            Ok(())
        })
        .await
    }

    async fn delete_exam(&self, id: &str) -> Result<(), AppError> {
        self.update(|data| {
            let before = data.exams.len();
            data.exams.retain(|e| e.id != id);
            if data.exams.len() == before {
                return Err(AppError::NotFound("Exam not found".to_string()));
            }
            Ok(())
        })
        .await
    }

    async fn delete_student(&self, school_no: &str) -> Result<(), AppError> {
        self.update(|data| {
            let before = data.students.len();
            data.students.retain(|s| s.school_no != school_no);
            if data.students.len() == before {
                return Err(AppError::NotFound("Student not found".to_string()));
            }
            Ok(())
        })
        .await
    }
}
