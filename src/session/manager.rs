// src/session/manager.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{sync::Mutex, task::AbortHandle, time::Instant};
use uuid::Uuid;

use crate::{
    config::{FINISHED_SESSION_TTL_SECS, SESSION_SWEEP_INTERVAL_SECS},
    error::AppError,
    models::{exam_result::ExamResult, user::Student},
    session::engine::{ExamSession, SessionState, SessionView},
    store::ExamStore,
    utils::now_millis,
};

struct ActiveSession {
    session: ExamSession,
    /// The result reached the store.
    saved: bool,
    /// The store refused the result because one already exists.
    rejected: bool,
    /// A save is currently running for this session.
    in_flight: bool,
    /// When the store settled the result, either way.
    finished_at: Option<Instant>,
    ticker: Option<AbortHandle>,
}

impl ActiveSession {
    /// Submitted and settled by the store. Only the summary screen is left.
    fn is_finished(&self) -> bool {
        self.session.state() == SessionState::Submitted && (self.saved || self.rejected)
    }

    fn belongs_to(&self, student_id: &str, exam_id: &str) -> bool {
        self.session.student_id() == student_id && self.session.exam().id == exam_id
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            view: self.session.view(),
            saved: self.saved,
            rejected: self.rejected,
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub view: SessionView,
    pub saved: bool,
    pub rejected: bool,
}

/// Owns every live exam session, drives their countdowns and hands
/// finished attempts to the store.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn ExamStore>,
    sessions: Arc<Mutex<HashMap<Uuid, ActiveSession>>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self {
            store,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drops finished sessions whose summary has outlived the TTL, plus
    /// every finished session of `student_id` when given.
    async fn evict_finished(&self, student_id: Option<&str>) -> usize {
        let ttl = Duration::from_secs(FINISHED_SESSION_TTL_SECS);
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|id, active| {
            let evict = active.is_finished()
                && (student_id == Some(active.session.student_id())
                    || active.finished_at.is_some_and(|at| at.elapsed() >= ttl));
            if evict {
                tracing::debug!(session_id = %id, "Evicting finished exam session");
            }
            !evict
        });
        before - sessions.len()
    }

    /// Periodically evicts finished sessions nobody came back to close.
    pub fn spawn_sweeper(&self) -> AbortHandle {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                let evicted = manager.evict_finished(None).await;
                if evicted > 0 {
                    tracing::info!("Evicted {} finished exam session(s)", evicted);
                }
            }
        })
        .abort_handle()
    }

    /// Starts an exam for a student, or resumes the session they already
    /// have for it. A submitted attempt whose result has not reached the
    /// store yet counts as such a session, so it cannot be retaken.
    pub async fn start(&self, exam_id: &str, student: &Student) -> Result<SessionSnapshot, AppError> {
        self.evict_finished(Some(student.id.as_str())).await;
        {
            let sessions = self.sessions.lock().await;
            if let Some(existing) = sessions
                .values()
                .find(|a| a.belongs_to(&student.id, exam_id) && !a.is_finished())
            {
                tracing::info!(
                    session_id = %existing.session.id(),
                    "Student {} re-entered exam {}",
                    student.school_no,
                    exam_id
                );
                return Ok(existing.snapshot());
            }
        }

        let exam = self
            .store
            .find_exam(exam_id)
            .await?
            .ok_or(AppError::NotFound("Exam not found".to_string()))?;

        if !exam.is_visible_to(&student.class_group) {
            return Err(AppError::Forbidden(
                "This exam is not available for your class".to_string(),
            ));
        }
        if self
            .store
            .results_for_student(&student.id)
            .await?
            .iter()
            .any(|r| r.exam_id == exam.id)
        {
            return Err(AppError::Conflict(
                "You have already completed this exam".to_string(),
            ));
        }

        let session = ExamSession::start(exam, &student.id, &mut rand::thread_rng())?;
        let id = session.id();

        let mut sessions = self.sessions.lock().await;
        // Lost a race with a concurrent start for the same exam.
        if let Some(existing) = sessions.values().find(|a| a.belongs_to(&student.id, exam_id)) {
            if existing.is_finished() {
                return Err(AppError::Conflict(
                    "You have already completed this exam".to_string(),
                ));
            }
            return Ok(existing.snapshot());
        }

        let mut active = ActiveSession {
            session,
            saved: false,
            rejected: false,
            in_flight: false,
            finished_at: None,
            ticker: None,
        };
        active.ticker = Some(self.spawn_ticker(id));
        let snapshot = active.snapshot();
        sessions.insert(id, active);

        tracing::info!(
            session_id = %id,
            "Student {} started exam {}",
            student.school_no,
            exam_id
        );
        Ok(snapshot)
    }

    fn spawn_ticker(&self, id: Uuid) -> AbortHandle {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let expired = {
                    let mut sessions = manager.sessions.lock().await;
                    let Some(active) = sessions.get_mut(&id) else {
                        break;
                    };
                    let result = active.session.tick(now_millis());
                    if result.is_some() {
                        active.ticker = None;
                        active.in_flight = true;
                    }
                    result
                };
                if let Some(result) = expired {
                    manager.persist(id, result).await;
                    break;
                }
            }
        })
        .abort_handle()
    }

    async fn persist(&self, id: Uuid, result: ExamResult) {
        let result_id = result.id.clone();
        let outcome = self.store.save_result(result).await;

        let mut sessions = self.sessions.lock().await;
        let Some(active) = sessions.get_mut(&id) else {
            return;
        };
        active.in_flight = false;
        match outcome {
            Ok(()) => {
                active.saved = true;
                active.finished_at = Some(Instant::now());
                tracing::info!(session_id = %id, result_id = %result_id, "Exam result saved");
            }
            Err(AppError::Conflict(msg)) => {
                active.rejected = true;
                active.finished_at = Some(Instant::now());
                tracing::warn!(session_id = %id, "Exam result rejected: {}", msg);
            }
            Err(e) => {
                tracing::error!(session_id = %id, "Failed to save exam result: {:?}", e);
            }
        }
    }

    async fn with_session<T>(
        &self,
        id: Uuid,
        student_id: &str,
        f: impl FnOnce(&mut ActiveSession) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut sessions = self.sessions.lock().await;
        let active = sessions
            .get_mut(&id)
            .ok_or(AppError::NotFound("Exam session not found".to_string()))?;
        if active.session.student_id() != student_id {
            return Err(AppError::Forbidden(
                "This exam session belongs to another student".to_string(),
            ));
        }
        f(active)
    }

    pub async fn view(&self, id: Uuid, student_id: &str) -> Result<SessionSnapshot, AppError> {
        self.with_session(id, student_id, |a| Ok(a.snapshot())).await
    }

    /// `None` clears the answer.
    pub async fn select_answer(
        &self,
        id: Uuid,
        student_id: &str,
        question_id: &str,
        option_index: Option<usize>,
    ) -> Result<SessionSnapshot, AppError> {
        self.with_session(id, student_id, |a| {
            match option_index {
                Some(index) => a.session.select_answer(question_id, index)?,
                None => a.session.clear_answer(question_id)?,
            }
            Ok(a.snapshot())
        })
        .await
    }

    pub async fn next(&self, id: Uuid, student_id: &str) -> Result<SessionSnapshot, AppError> {
        self.with_session(id, student_id, |a| {
            a.session.next()?;
            Ok(a.snapshot())
        })
        .await
    }

    pub async fn previous(&self, id: Uuid, student_id: &str) -> Result<SessionSnapshot, AppError> {
        self.with_session(id, student_id, |a| {
            a.session.previous()?;
            Ok(a.snapshot())
        })
        .await
    }

    pub async fn request_finish(&self, id: Uuid, student_id: &str) -> Result<SessionSnapshot, AppError> {
        self.with_session(id, student_id, |a| {
            a.session.request_finish()?;
            Ok(a.snapshot())
        })
        .await
    }

    pub async fn cancel_finish(&self, id: Uuid, student_id: &str) -> Result<SessionSnapshot, AppError> {
        self.with_session(id, student_id, |a| {
            a.session.cancel_finish()?;
            Ok(a.snapshot())
        })
        .await
    }

    /// Confirmed submission. On a session that is already submitted but
    /// whose result never reached the store, retries the save instead.
    pub async fn confirm(&self, id: Uuid, student_id: &str) -> Result<SessionSnapshot, AppError> {
        let to_save = self
            .with_session(id, student_id, |a| {
                if a.session.state() == SessionState::Submitted {
                    if a.saved || a.rejected || a.in_flight {
                        return Ok(None);
                    }
                    a.in_flight = true;
                    return Ok(a.session.result().cloned());
                }
                let result = a.session.confirm_finish(now_millis())?;
                a.stop_ticker();
                a.in_flight = true;
                Ok(Some(result))
            })
            .await?;

        let attempted = to_save.is_some();
        if let Some(result) = to_save {
            self.persist(id, result).await;
        }

        let snapshot = self.view(id, student_id).await?;
        if attempted && !snapshot.saved && !snapshot.rejected {
            return Err(AppError::ServiceUnavailable(
                "Your answers were scored but could not be saved. Please try again.".to_string(),
            ));
        }
        Ok(snapshot)
    }

    /// Leaves an exam before submitting. The attempt is discarded.
    pub async fn abandon(&self, id: Uuid, student_id: &str) -> Result<(), AppError> {
        self.remove(id, student_id, false).await
    }

    /// Leaves the summary screen of a submitted exam.
    pub async fn close(&self, id: Uuid, student_id: &str) -> Result<(), AppError> {
        self.remove(id, student_id, true).await
    }

    async fn remove(&self, id: Uuid, student_id: &str, require_submitted: bool) -> Result<(), AppError> {
        let mut sessions = self.sessions.lock().await;
        let active = sessions
            .get_mut(&id)
            .ok_or(AppError::NotFound("Exam session not found".to_string()))?;
        if active.session.student_id() != student_id {
            return Err(AppError::Forbidden(
                "This exam session belongs to another student".to_string(),
            ));
        }

        let submitted = active.session.state() == SessionState::Submitted;
        if require_submitted && !submitted {
            return Err(AppError::BadRequest(
                "The exam has not been submitted yet".to_string(),
            ));
        }
        if submitted && !active.saved && !active.rejected {
            return Err(AppError::Conflict(
                "The result has not been saved yet".to_string(),
            ));
        }

        active.stop_ticker();
        sessions.remove(&id);
        tracing::info!(session_id = %id, "Exam session closed");
        Ok(())
    }

    /// Drops every session of a student, e.g. on logout. Submitted sessions
    /// whose result is still unsaved are kept so the save can be retried.
    pub async fn abandon_for_student(&self, student_id: &str) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, active| {
            let keep = active.session.student_id() != student_id
                || (active.session.state() == SessionState::Submitted
                    && !active.saved
                    && !active.rejected);
            if !keep {
                active.stop_ticker();
            }
            keep
        });
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            exam::{Exam, ExamStatus},
            question::Question,
            user::Role,
        },
        store::LocalStore,
    };
    use async_trait::async_trait;

    fn exam(id: &str, question_count: usize, classes: &[&str]) -> Exam {
        Exam {
            id: id.to_string(),
            title: format!("Exam {id}"),
            pass_percentage: 50,
            difficulty_points: 100,
            duration_minutes: Exam::derived_duration(question_count),
            questions: (0..question_count)
                .map(|i| Question {
                    id: format!("{id}-q{i}"),
                    text: format!("Question {i} of {id}"),
                    options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                    correct_answer_index: 0,
                    image_url: None,
                    option_images: None,
                })
                .collect(),
            target_classes: classes.iter().map(|c| c.to_string()).collect(),
            created_at: 0,
            status: ExamStatus::Active,
        }
    }

    fn student(id: &str, class_group: &str) -> Student {
        Student {
            id: id.to_string(),
            role: Role::Student,
            name: "Ali".to_string(),
            surname: "Kaya".to_string(),
            username: format!("no-{id}"),
            school_no: format!("no-{id}"),
            class_group: class_group.to_string(),
            password_hash: String::new(),
            created_at: 0,
        }
    }

    async fn setup(exams: Vec<Exam>) -> (Arc<LocalStore>, SessionManager) {
        let store = Arc::new(LocalStore::in_memory());
        for e in exams {
            store.save_exam(e).await.unwrap();
        }
        let manager = SessionManager::new(store.clone());
        (store, manager)
    }

    async fn finish(manager: &SessionManager, id: Uuid, student_id: &str) -> SessionSnapshot {
        while manager.next(id, student_id).await.is_ok() {}
        manager.request_finish(id, student_id).await.unwrap();
        manager.confirm(id, student_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_reentry_returns_same_session() {
        let (_, manager) = setup(vec![exam("e1", 3, &["5A"])]).await;
        let s = student("s1", "5A");

        let first = manager.start("e1", &s).await.unwrap();
        manager
            .select_answer(first.view.session_id, "s1", "e1-q0", Some(2))
            .await
            .unwrap();
        let again = manager.start("e1", &s).await.unwrap();

        assert_eq!(first.view.session_id, again.view.session_id);
        assert_eq!(again.view.answered_count, 1);
        assert_eq!(manager.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_start_checks_eligibility() {
        let mut archived = exam("e2", 1, &["5A"]);
        archived.status = ExamStatus::Archived;
        let (_, manager) = setup(vec![exam("e1", 1, &["5A"]), archived]).await;

        assert!(matches!(
            manager.start("e1", &student("s1", "6B")).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            manager.start("e2", &student("s1", "5A")).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            manager.start("missing", &student("s1", "5A")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_confirm_saves_once_and_blocks_retake() {
        let (store, manager) = setup(vec![exam("e1", 2, &["5A"])]).await;
        let s = student("s1", "5A");

        let started = manager.start("e1", &s).await.unwrap();
        let id = started.view.session_id;
        manager.select_answer(id, "s1", "e1-q0", Some(0)).await.unwrap();
        manager.select_answer(id, "s1", "e1-q1", Some(0)).await.unwrap();

        let done = finish(&manager, id, "s1").await;
        assert!(done.saved);
        assert_eq!(done.view.summary.as_ref().unwrap().score, 100);

        // Confirming again is a no-op, not a second result.
        manager.confirm(id, "s1").await.unwrap();
        assert_eq!(store.get_results().await.unwrap().len(), 1);

        manager.close(id, "s1").await.unwrap();
        assert!(matches!(
            manager.start("e1", &s).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_other_student_cannot_touch_session() {
        let (_, manager) = setup(vec![exam("e1", 2, &["5A"])]).await;
        let started = manager.start("e1", &student("s1", "5A")).await.unwrap();
        let id = started.view.session_id;

        assert!(matches!(manager.view(id, "s2").await, Err(AppError::Forbidden(_))));
        assert!(matches!(manager.abandon(id, "s2").await, Err(AppError::Forbidden(_))));
        assert!(matches!(
            manager.view(Uuid::new_v4(), "s1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_abandon_discards_attempt() {
        let (store, manager) = setup(vec![exam("e1", 2, &["5A"])]).await;
        let s = student("s1", "5A");
        let started = manager.start("e1", &s).await.unwrap();
        let id = started.view.session_id;

        assert!(matches!(manager.close(id, "s1").await, Err(AppError::BadRequest(_))));
        manager.abandon(id, "s1").await.unwrap();
        assert_eq!(manager.active_count().await, 0);
        assert!(store.get_results().await.unwrap().is_empty());

        // A fresh session can be started after abandoning.
        let again = manager.start("e1", &s).await.unwrap();
        assert_ne!(again.view.session_id, id);
        assert_eq!(manager.abandon_for_student("s1").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_expiry_auto_submits() {
        let (store, manager) = setup(vec![exam("e1", 1, &["5A"])]).await;
        let started = manager.start("e1", &student("s1", "5A")).await.unwrap();
        let id = started.view.session_id;
        manager.select_answer(id, "s1", "e1-q0", Some(0)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        let midway = manager.view(id, "s1").await.unwrap();
        assert_eq!(midway.view.state, SessionState::InProgress);
        // The tick due at the same instant may not have run yet.
        assert!((60..=61).contains(&midway.view.remaining_seconds));

        tokio::time::sleep(Duration::from_secs(65)).await;
        let done = manager.view(id, "s1").await.unwrap();
        assert_eq!(done.view.state, SessionState::Submitted);
        assert_eq!(done.view.remaining_seconds, 0);
        assert!(done.saved);

        let results = store.get_results().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_stops_the_timer() {
        let (store, manager) = setup(vec![exam("e1", 1, &["5A"])]).await;
        let started = manager.start("e1", &student("s1", "5A")).await.unwrap();
        let id = started.view.session_id;

        tokio::time::sleep(Duration::from_secs(10)).await;
        let done = finish(&manager, id, "s1").await;
        let frozen = done.view.remaining_seconds;

        tokio::time::sleep(Duration::from_secs(300)).await;
        let later = manager.view(id, "s1").await.unwrap();
        assert_eq!(later.view.remaining_seconds, frozen);
        assert_eq!(store.get_results().await.unwrap().len(), 1);
    }

    /// Store whose result writes fail until switched on.
    struct FlakyStore {
        inner: LocalStore,
        healthy: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl ExamStore for FlakyStore {
        async fn initialize(&self, t: crate::models::user::Teacher) -> Result<(), AppError> {
            self.inner.initialize(t).await
        }
        async fn get_students(&self) -> Result<Vec<Student>, AppError> {
            self.inner.get_students().await
        }
        async fn get_exams(&self) -> Result<Vec<Exam>, AppError> {
            self.inner.get_exams().await
        }
        async fn get_results(&self) -> Result<Vec<ExamResult>, AppError> {
            self.inner.get_results().await
        }
        async fn get_question_pool(&self) -> Result<Vec<Question>, AppError> {
            self.inner.get_question_pool().await
        }
        async fn get_teacher(&self) -> Result<crate::models::user::Teacher, AppError> {
            self.inner.get_teacher().await
        }
        async fn save_student(&self, s: Student) -> Result<(), AppError> {
            self.inner.save_student(s).await
        }
        async fn save_exam(&self, e: Exam) -> Result<(), AppError> {
            self.inner.save_exam(e).await
        }
        async fn save_result(&self, r: ExamResult) -> Result<(), AppError> {
            if !self.healthy.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(AppError::InternalServerError("store offline".to_string()));
            }
            self.inner.save_result(r).await
        }
        async fn delete_exam(&self, id: &str) -> Result<(), AppError> {
            self.inner.delete_exam(id).await
        }
        async fn delete_student(&self, school_no: &str) -> Result<(), AppError> {
            self.inner.delete_student(school_no).await
        }
    }

    #[tokio::test]
    async fn test_failed_save_is_kept_and_retried() {
        let store = Arc::new(FlakyStore {
            inner: LocalStore::in_memory(),
            healthy: std::sync::atomic::AtomicBool::new(false),
        });
        store.save_exam(exam("e1", 1, &["5A"])).await.unwrap();
        let manager = SessionManager::new(store.clone());

        let started = manager.start("e1", &student("s1", "5A")).await.unwrap();
        let id = started.view.session_id;
        manager.request_finish(id, "s1").await.unwrap();

        assert!(matches!(
            manager.confirm(id, "s1").await,
            Err(AppError::ServiceUnavailable(_))
        ));
        let pending = manager.view(id, "s1").await.unwrap();
        assert_eq!(pending.view.state, SessionState::Submitted);
        assert!(!pending.saved);
        assert!(matches!(manager.close(id, "s1").await, Err(AppError::Conflict(_))));
        assert_eq!(manager.abandon_for_student("s1").await, 0);

        store.healthy.store(true, std::sync::atomic::Ordering::SeqCst);
        let retried = manager.confirm(id, "s1").await.unwrap();
        assert!(retried.saved);
        assert_eq!(store.get_results().await.unwrap().len(), 1);
        manager.close(id, "s1").await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_result_is_marked_rejected() {
        let (store, manager) = setup(vec![exam("e1", 1, &["5A"])]).await;
        let started = manager.start("e1", &student("s1", "5A")).await.unwrap();
        let id = started.view.session_id;

        // Another device already submitted this exam.
        let mut existing = crate::session::engine::score_exam(
            &store.find_exam("e1").await.unwrap().unwrap(),
            &HashMap::new(),
            "s1",
            0,
        );
        existing.id = "elsewhere".to_string();
        store.save_result(existing).await.unwrap();

        manager.request_finish(id, "s1").await.unwrap();
        let done = manager.confirm(id, "s1").await.unwrap();
        assert!(done.rejected);
        assert!(!done.saved);
        assert_eq!(store.get_results().await.unwrap().len(), 1);
    }

    fn flaky_store() -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: LocalStore::in_memory(),
            healthy: std::sync::atomic::AtomicBool::new(false),
        })
    }

    #[tokio::test]
    async fn test_unsaved_attempt_cannot_be_retaken() {
        let store = flaky_store();
        store.save_exam(exam("e1", 1, &["5A"])).await.unwrap();
        let manager = SessionManager::new(store.clone());
        let s = student("s1", "5A");

        let first = manager.start("e1", &s).await.unwrap();
        let id = first.view.session_id;
        manager.select_answer(id, "s1", "e1-q0", Some(3)).await.unwrap();
        manager.request_finish(id, "s1").await.unwrap();
        assert!(manager.confirm(id, "s1").await.is_err());

        // Starting again hands back the pending attempt instead of a new one.
        let again = manager.start("e1", &s).await.unwrap();
        assert_eq!(again.view.session_id, id);
        assert_eq!(again.view.state, SessionState::Submitted);
        assert!(!again.saved);
        assert_eq!(manager.active_count().await, 1);

        store.healthy.store(true, std::sync::atomic::Ordering::SeqCst);
        let retried = manager.confirm(id, "s1").await.unwrap();
        assert!(retried.saved);
        assert!(!retried.rejected);

        let results = store.get_results().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 0);

        assert!(matches!(manager.start("e1", &s).await, Err(AppError::Conflict(_))));
        assert_eq!(manager.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_next_start_evicts_finished_sessions() {
        let (_, manager) = setup(vec![exam("e1", 1, &["5A"]), exam("e2", 1, &["5A"])]).await;
        let s = student("s1", "5A");
        let other = student("s2", "5A");

        let first = manager.start("e1", &s).await.unwrap();
        finish(&manager, first.view.session_id, "s1").await;
        let theirs = manager.start("e1", &other).await.unwrap();
        finish(&manager, theirs.view.session_id, "s2").await;
        assert_eq!(manager.active_count().await, 2);

        // Only the caller's own finished sessions go before the TTL.
        manager.start("e2", &s).await.unwrap();
        assert_eq!(manager.active_count().await, 2);
        assert!(matches!(
            manager.view(first.view.session_id, "s1").await,
            Err(AppError::NotFound(_))
        ));
        assert!(manager.view(theirs.view.session_id, "s2").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_abandoned_summaries() {
        let (store, manager) = setup(vec![exam("e1", 1, &["5A"])]).await;
        let sweeper = manager.spawn_sweeper();
        let started = manager.start("e1", &student("s1", "5A")).await.unwrap();
        let id = started.view.session_id;

        // Auto-submitted and saved, but the tab was never reopened.
        tokio::time::sleep(Duration::from_secs(125)).await;
        assert!(manager.view(id, "s1").await.unwrap().saved);
        assert_eq!(manager.active_count().await, 1);

        tokio::time::sleep(Duration::from_secs(
            FINISHED_SESSION_TTL_SECS + 2 * SESSION_SWEEP_INTERVAL_SECS,
        ))
        .await;
        assert_eq!(manager.active_count().await, 0);
        assert_eq!(store.get_results().await.unwrap().len(), 1);
        sweeper.abort();
    }
}
