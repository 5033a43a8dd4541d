// src/analytics.rs
//
// Read-side reductions over results, exams and students. Nothing here
// mutates or touches storage; handlers load the collections and pass
// slices in.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::{
    config::XP_MILESTONE,
    models::{exam::Exam, exam_result::ExamResult, user::Student},
};

/// Placeholder for results whose student has since been deleted.
pub const UNKNOWN_STUDENT: &str = "Bilinmiyor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_success_rate(rate: u32) -> Self {
        if rate > 70 {
            Difficulty::Easy
        } else if rate > 30 {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "KOLAY",
            Difficulty::Medium => "ORTA",
            Difficulty::Hard => "ZOR",
        }
    }
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((200 * part + whole) / (2 * whole)) as u32
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStat {
    pub question_id: String,
    /// 1-based, authoring order.
    pub index: usize,
    pub text: String,
    pub correct_count: usize,
    pub respondent_count: usize,
    pub success_rate: u32,
    pub difficulty: Difficulty,
}

impl QuestionStat {
    pub fn wrong_count(&self) -> usize {
        self.respondent_count - self.correct_count
    }
}

/// Per-question success over every result of `exam`. A respondent who
/// skipped a question counts against it. Empty when nobody took the exam.
pub fn question_stats(exam: &Exam, results: &[ExamResult]) -> Vec<QuestionStat> {
    let results: Vec<&ExamResult> = results.iter().filter(|r| r.exam_id == exam.id).collect();
    if results.is_empty() {
        return Vec::new();
    }
    let respondents = results.len();

    exam.questions
        .iter()
        .enumerate()
        .map(|(idx, q)| {
            let correct = results
                .iter()
                .filter(|r| r.answers.get(&q.id) == Some(&q.correct_answer_index))
                .count();
            let rate = percent(correct, respondents);
            QuestionStat {
                question_id: q.id.clone(),
                index: idx + 1,
                text: q.text.clone(),
                correct_count: correct,
                respondent_count: respondents,
                success_rate: rate,
                difficulty: Difficulty::from_success_rate(rate),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRollup {
    pub student_id: String,
    pub full_name: String,
    pub school_no: String,
    pub total_correct: u32,
    pub total_wrong: u32,
    pub total_xp: u32,
    pub exams_taken: usize,
}

/// Totals for every student of a class across all attempted exams,
/// best first by total correct answers.
pub fn class_rollup(class_group: &str, students: &[Student], results: &[ExamResult]) -> Vec<StudentRollup> {
    let mut rows: Vec<StudentRollup> = students
        .iter()
        .filter(|s| s.class_group == class_group)
        .map(|s| {
            let mine = results.iter().filter(|r| r.student_id == s.id);
            let mut row = StudentRollup {
                student_id: s.id.clone(),
                full_name: s.full_name(),
                school_no: s.school_no.clone(),
                total_correct: 0,
                total_wrong: 0,
                total_xp: 0,
                exams_taken: 0,
            };
            for r in mine {
                row.total_correct += r.correct_count;
                row.total_wrong += r.wrong_count;
                row.total_xp += r.points_earned;
                row.exams_taken += 1;
            }
            row
        })
        .collect();

    // Stable, so ties keep roster order.
    rows.sort_by(|a, b| b.total_correct.cmp(&a.total_correct));
    rows
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub result_id: String,
    pub student_id: String,
    pub full_name: String,
    pub school_no: Option<String>,
    pub class_group: Option<String>,
    pub score: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub points_earned: u32,
    pub is_passed: bool,
    pub completed_at: i64,
}

/// Every result of `exam`, best score first.
pub fn exam_leaderboard(exam: &Exam, results: &[ExamResult], students: &[Student]) -> Vec<LeaderboardRow> {
    let by_id: HashMap<&str, &Student> = students.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut rows: Vec<LeaderboardRow> = results
        .iter()
        .filter(|r| r.exam_id == exam.id)
        .map(|r| {
            let student = by_id.get(r.student_id.as_str());
            LeaderboardRow {
                result_id: r.id.clone(),
                student_id: r.student_id.clone(),
                full_name: student
                    .map(|s| s.full_name())
                    .unwrap_or_else(|| UNKNOWN_STUDENT.to_string()),
                school_no: student.map(|s| s.school_no.clone()),
                class_group: student.map(|s| s.class_group.clone()),
                score: r.score,
                correct_count: r.correct_count,
                wrong_count: r.wrong_count,
                points_earned: r.points_earned,
                is_passed: r.is_passed,
                completed_at: r.completed_at,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.score.cmp(&a.score));
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Rank {
    #[serde(rename = "Çaylak")]
    Caylak,
    Asistan,
    Uzman,
    #[serde(rename = "Üstat")]
    Ustat,
    Efsane,
    #[serde(rename = "Şampiyon")]
    Sampiyon,
}

impl Rank {
    const LADDER: [(u32, Rank); 6] = [
        (0, Rank::Caylak),
        (500, Rank::Asistan),
        (1000, Rank::Uzman),
        (1500, Rank::Ustat),
        (2000, Rank::Efsane),
        (2500, Rank::Sampiyon),
    ];

    pub fn for_xp(xp: u32) -> Self {
        Self::LADDER
            .iter()
            .rev()
            .find(|(threshold, _)| xp >= *threshold)
            .map(|(_, rank)| *rank)
            .unwrap_or(Rank::Caylak)
    }

    /// The next rank and the XP it starts at.
    pub fn next(&self) -> Option<(Rank, u32)> {
        let pos = Self::LADDER.iter().position(|(_, r)| r == self)?;
        Self::LADDER.get(pos + 1).map(|(xp, r)| (*r, *xp))
    }

    pub fn title(&self) -> &'static str {
        match self {
            Rank::Caylak => "Çaylak",
            Rank::Asistan => "Asistan",
            Rank::Uzman => "Uzman",
            Rank::Ustat => "Üstat",
            Rank::Efsane => "Efsane",
            Rank::Sampiyon => "Şampiyon",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub result_id: String,
    pub exam_id: String,
    pub exam_title: String,
    pub score: u32,
    pub points_earned: u32,
    pub is_passed: bool,
    pub completed_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub student_id: String,
    pub full_name: String,
    pub class_group: String,
    pub total_xp: u32,
    pub rank: Rank,
    pub next_rank: Option<Rank>,
    pub xp_to_next_rank: Option<u32>,
    /// One star per completed milestone.
    pub stars: u32,
    /// Percent of the way to the next milestone.
    pub milestone_progress: u32,
    pub exams_taken: usize,
    pub average_score: u32,
    /// Newest first.
    pub history: Vec<HistoryEntry>,
}

pub fn student_progress(student: &Student, results: &[ExamResult], exams: &[Exam]) -> StudentProgress {
    let mut mine: Vec<&ExamResult> = results.iter().filter(|r| r.student_id == student.id).collect();
    mine.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    let total_xp: u32 = mine.iter().map(|r| r.points_earned).sum();
    let total_score: usize = mine.iter().map(|r| r.score as usize).sum();
    let rank = Rank::for_xp(total_xp);
    let next = rank.next();

    let titles: HashMap<&str, &str> = exams.iter().map(|e| (e.id.as_str(), e.title.as_str())).collect();

    StudentProgress {
        student_id: student.id.clone(),
        full_name: student.full_name(),
        class_group: student.class_group.clone(),
        total_xp,
        rank,
        next_rank: next.map(|(r, _)| r),
        xp_to_next_rank: next.map(|(_, xp)| xp - total_xp),
        stars: total_xp / XP_MILESTONE,
        milestone_progress: (total_xp % XP_MILESTONE) * 100 / XP_MILESTONE,
        exams_taken: mine.len(),
        average_score: if mine.is_empty() {
            0
        } else {
            percent(total_score, mine.len() * 100)
        },
        history: mine
            .iter()
            .map(|r| HistoryEntry {
                result_id: r.id.clone(),
                exam_id: r.exam_id.clone(),
                exam_title: titles
                    .get(r.exam_id.as_str())
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                score: r.score,
                points_earned: r.points_earned,
                is_passed: r.is_passed,
                completed_at: r.completed_at,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub student_count: usize,
    pub exam_count: usize,
    pub active_exam_count: usize,
    pub result_count: usize,
    /// Sorted, distinct.
    pub classes: Vec<String>,
}

pub fn overview(students: &[Student], exams: &[Exam], results: &[ExamResult]) -> Overview {
    Overview {
        student_count: students.len(),
        exam_count: exams.len(),
        active_exam_count: exams.iter().filter(|e| e.is_active()).count(),
        result_count: results.len(),
        classes: class_groups(students),
    }
}

/// Distinct class groups of the roster, sorted.
pub fn class_groups(students: &[Student]) -> Vec<String> {
    students
        .iter()
        .map(|s| s.class_group.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
