// src/reports/mod.rs
//
// Teacher-facing printable reports. Builders turn analytics output into a
// small document model; `pdf::render` lays it out.

pub mod pdf;

use chrono::{DateTime, Utc};

use crate::{
    analytics::{LeaderboardRow, QuestionStat, StudentRollup},
    models::{exam::Exam, exam_result::ExamResult, user::Student},
    utils::text::{file_stem, truncate_chars},
};

pub use pdf::render;

/// Question text in tables is cut to this many characters.
pub const QUESTION_PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone)]
pub struct Column {
    pub title: String,
    /// Width in millimetres.
    pub width: f32,
}

impl Column {
    fn new(title: &str, width: f32) -> Self {
        Self {
            title: title.to_string(),
            width,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub title: String,
    pub subtitle: Vec<String>,
    /// Label / value pairs printed under the title.
    pub details: Vec<(String, String)>,
    pub table: Option<Table>,
    /// Free text blocks after the table, one per entry.
    pub paragraphs: Vec<String>,
    /// Download name without extension.
    pub file_name: String,
}

fn date_line(now: DateTime<Utc>) -> String {
    format!("Rapor Tarihi: {}", now.format("%d.%m.%Y"))
}

/// Option label: A, B, C, ... then the 1-based number past Z.
fn option_letter(index: usize) -> String {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| char::from(b'A' + i).to_string())
        .unwrap_or_else(|| (index + 1).to_string())
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|d| d.format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Printable exam sheet: numbered questions, lettered options, no answer key.
pub fn exam_paper(exam: &Exam) -> Report {
    let paragraphs = exam
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let mut block = format!("{}. {}", i + 1, q.text);
            for (o, option) in q.options.iter().enumerate() {
                block.push('\n');
                block.push_str(&format!("   {}) {}", option_letter(o), option));
            }
            block
        })
        .collect();

    Report {
        title: exam.title.to_uppercase(),
        subtitle: vec![
            format!("Sure: {} dakika", exam.duration_minutes),
            format!("Soru Sayisi: {}", exam.questions.len()),
        ],
        details: vec![
            ("Ad Soyad".to_string(), String::new()),
            ("Okul No".to_string(), String::new()),
            ("Sinif".to_string(), String::new()),
        ],
        table: None,
        paragraphs,
        file_name: format!("{}_Sinav_Kagidi", file_stem(&exam.title)),
    }
}

/// Results of one exam, best score first.
pub fn exam_results(exam: &Exam, leaderboard: &[LeaderboardRow], now: DateTime<Utc>) -> Report {
    let rows = leaderboard
        .iter()
        .enumerate()
        .map(|(i, r)| {
            vec![
                (i + 1).to_string(),
                r.full_name.clone(),
                r.school_no.clone().unwrap_or_else(|| "-".to_string()),
                r.correct_count.to_string(),
                r.wrong_count.to_string(),
                format!("%{}", r.score),
                format!("{} XP", r.points_earned),
            ]
        })
        .collect();

    Report {
        title: format!("{} SONUCLARI", exam.title.to_uppercase()),
        subtitle: vec![date_line(now)],
        details: vec![("Katilim Sayisi".to_string(), leaderboard.len().to_string())],
        table: Some(Table {
            columns: vec![
                Column::new("Sira", 12.0),
                Column::new("Ogrenci", 58.0),
                Column::new("No", 22.0),
                Column::new("D", 14.0),
                Column::new("Y", 14.0),
                Column::new("Puan", 22.0),
                Column::new("XP", 40.0),
            ],
            rows,
        }),
        paragraphs: Vec::new(),
        file_name: format!("{}_Sonuclar", file_stem(&exam.title)),
    }
}

/// Per-question success rates of one exam.
pub fn question_analysis(exam: &Exam, stats: &[QuestionStat], now: DateTime<Utc>) -> Report {
    let participants = stats.first().map(|s| s.respondent_count).unwrap_or(0);
    let rows = stats
        .iter()
        .map(|s| {
            vec![
                s.index.to_string(),
                truncate_chars(&s.text, QUESTION_PREVIEW_CHARS),
                s.correct_count.to_string(),
                s.wrong_count().to_string(),
                format!("%{}", s.success_rate),
                s.difficulty.label().to_string(),
            ]
        })
        .collect();

    Report {
        title: format!("{} - SORU BASARI ANALIZI", exam.title),
        subtitle: vec![
            format!("Toplam Katilim: {} Ogrenci", participants),
            date_line(now),
        ],
        details: Vec::new(),
        table: Some(Table {
            columns: vec![
                Column::new("No", 10.0),
                Column::new("Soru Metni (Ilk 60 Karakter)", 100.0),
                Column::new("Dogru", 16.0),
                Column::new("Yanlis", 16.0),
                Column::new("Basari", 18.0),
                Column::new("Zorluk", 22.0),
            ],
            rows,
        }),
        paragraphs: Vec::new(),
        file_name: format!("{}_Soru_Analizi", file_stem(&exam.title)),
    }
}

/// Class roster ranked by total correct answers.
pub fn class_report(class_group: &str, rollup: &[StudentRollup], now: DateTime<Utc>) -> Report {
    let rows = rollup
        .iter()
        .enumerate()
        .map(|(i, s)| {
            vec![
                (i + 1).to_string(),
                s.full_name.clone(),
                s.school_no.clone(),
                s.exams_taken.to_string(),
                s.total_correct.to_string(),
                s.total_wrong.to_string(),
                format!("{} XP", s.total_xp),
            ]
        })
        .collect();

    Report {
        title: format!("{} SINIFI GENEL BASARI RAPORU", class_group),
        subtitle: vec![date_line(now)],
        details: vec![("Ogrenci Sayisi".to_string(), rollup.len().to_string())],
        table: Some(Table {
            columns: vec![
                Column::new("Sira", 12.0),
                Column::new("Ogrenci", 62.0),
                Column::new("No", 24.0),
                Column::new("Sinav", 16.0),
                Column::new("D", 16.0),
                Column::new("Y", 16.0),
                Column::new("XP", 36.0),
            ],
            rows,
        }),
        paragraphs: Vec::new(),
        file_name: format!("{}_Sinif_Analizi", file_stem(class_group)),
    }
}

/// One student's result on one exam, with the answer they gave to every
/// question.
pub fn report_card(student: Option<&Student>, exam: &Exam, result: &ExamResult) -> Report {
    let name = student
        .map(|s| s.full_name())
        .unwrap_or_else(|| crate::analytics::UNKNOWN_STUDENT.to_string());

    let rows = exam
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let given = result.answers.get(&q.id).copied();
            let verdict = match given {
                None => "Bos",
                Some(a) if a == q.correct_answer_index => "Dogru",
                Some(_) => "Yanlis",
            };
            vec![
                (i + 1).to_string(),
                truncate_chars(&q.text, QUESTION_PREVIEW_CHARS),
                given.map(option_letter).unwrap_or_else(|| "-".to_string()),
                option_letter(q.correct_answer_index),
                verdict.to_string(),
            ]
        })
        .collect();

    Report {
        title: "OGRENCI KARNESI".to_string(),
        subtitle: vec![exam.title.clone()],
        details: vec![
            ("Ogrenci".to_string(), name.clone()),
            (
                "Okul No".to_string(),
                student.map(|s| s.school_no.clone()).unwrap_or_else(|| "-".to_string()),
            ),
            (
                "Sinif".to_string(),
                student.map(|s| s.class_group.clone()).unwrap_or_else(|| "-".to_string()),
            ),
            ("Puan".to_string(), format!("%{}", result.score)),
            ("Dogru / Yanlis".to_string(), format!("{} / {}", result.correct_count, result.wrong_count)),
            ("Kazanilan XP".to_string(), result.points_earned.to_string()),
            (
                "Durum".to_string(),
                if result.is_passed { "GECTI" } else { "KALDI" }.to_string(),
            ),
            ("Tarih".to_string(), format_millis(result.completed_at)),
        ],
        table: Some(Table {
            columns: vec![
                Column::new("No", 10.0),
                Column::new("Soru", 110.0),
                Column::new("Cevap", 18.0),
                Column::new("Dogru", 18.0),
                Column::new("Sonuc", 26.0),
            ],
            rows,
        }),
        paragraphs: Vec::new(),
        file_name: format!("{}_{}_Karne", file_stem(&name), file_stem(&exam.title)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analytics::{exam_leaderboard, question_stats},
        models::{exam::ExamStatus, question::Question},
    };
    use std::collections::HashMap;

    fn exam() -> Exam {
        Exam {
            id: "e1".to_string(),
            title: "Türkçe Dil Bilgisi".to_string(),
            pass_percentage: 50,
            difficulty_points: 100,
            duration_minutes: 4,
            questions: vec![
                Question {
                    id: "q1".to_string(),
                    text: "x".repeat(80),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_answer_index: 2,
                    image_url: None,
                    option_images: None,
                },
                Question {
                    id: "q2".to_string(),
                    text: "Kısa soru".to_string(),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_answer_index: 0,
                    image_url: None,
                    option_images: None,
                },
            ],
            target_classes: vec!["5A".to_string()],
            created_at: 0,
            status: ExamStatus::Active,
        }
    }

    fn result() -> ExamResult {
        ExamResult {
            id: "r1".to_string(),
            exam_id: "e1".to_string(),
            student_id: "gone".to_string(),
            score: 50,
            correct_count: 1,
            wrong_count: 1,
            is_passed: true,
            completed_at: 1_700_000_000_000,
            points_earned: 50,
            answers: HashMap::from([("q1".to_string(), 2)]),
        }
    }

    #[test]
    fn test_question_analysis_truncates_text() {
        let stats = question_stats(&exam(), &[result()]);
        let report = question_analysis(&exam(), &stats, Utc::now());
        let table = report.table.unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1].chars().count(), QUESTION_PREVIEW_CHARS + 3);
        assert!(table.rows[0][1].ends_with("..."));
        assert_eq!(table.rows[1][1], "Kısa soru");
        assert_eq!(report.file_name, "Turkce_Dil_Bilgisi_Soru_Analizi");
    }

    #[test]
    fn test_report_card_marks_answers() {
        let report = report_card(None, &exam(), &result());
        let table = report.table.unwrap();
        assert_eq!(table.rows[0][2], "C");
        assert_eq!(table.rows[0][4], "Dogru");
        assert_eq!(table.rows[1][2], "-");
        assert_eq!(table.rows[1][4], "Bos");
        assert!(report.details.iter().any(|(k, v)| k == "Durum" && v == "GECTI"));
    }

    #[test]
    fn test_report_card_survives_out_of_range_indices() {
        let mut exam = exam();
        exam.questions[0].correct_answer_index = 200;
        let mut result = result();
        result.answers.insert("q2".to_string(), 30);

        let report = report_card(None, &exam, &result);
        let table = report.table.unwrap();
        assert_eq!(table.rows[0][3], "201");
        assert_eq!(table.rows[1][2], "31");
        assert_eq!(option_letter(25), "Z");
    }

    #[test]
    fn test_exam_results_ranks_rows() {
        let exam = exam();
        let rows = exam_leaderboard(&exam, &[result()], &[]);
        let report = exam_results(&exam, &rows, Utc::now());
        let table = report.table.unwrap();
        assert_eq!(table.rows[0][0], "1");
        assert_eq!(table.rows[0][5], "%50");
    }

    #[test]
    fn test_exam_paper_lists_options() {
        let report = exam_paper(&exam());
        assert_eq!(report.paragraphs.len(), 2);
        assert!(report.paragraphs[1].starts_with("2. Kısa soru"));
        assert!(report.paragraphs[1].contains("D) d"));
        assert!(report.table.is_none());
    }
}
