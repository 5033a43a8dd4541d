// src/roster.rs
//
// CSV roster import: `schoolNo, name, surname, classGroup[, password]`,
// comma or semicolon separated. Best effort: bad lines are skipped and
// reported, good lines still go through.

use serde::Serialize;

/// One student row parsed from the roster file.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    pub school_no: String,
    pub name: String,
    pub surname: String,
    pub class_group: String,
    /// Defaults to the school number.
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    Header,
    TooFewFields,
    EmptyKey,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    pub line: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct ParsedRoster {
    pub rows: Vec<RosterRow>,
    pub skipped: Vec<SkippedLine>,
}

/// Outcome reported back to the teacher.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<SkippedLine>,
}

fn is_header(fields: &[&str]) -> bool {
    let first = fields[0].to_lowercase();
    let second = fields[1].to_lowercase();
    first.contains("no") || matches!(second.as_str(), "ad" | "adı" | "isim" | "name")
}

pub fn parse_roster(text: &str) -> ParsedRoster {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut parsed = ParsedRoster::default();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let delimiter = if line.contains(';') { ';' } else { ',' };
        let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();

        if fields.len() < 4 {
            tracing::warn!(line = line_no, "Skipping roster line with too few fields");
            parsed.skipped.push(SkippedLine { line: line_no, reason: SkipReason::TooFewFields });
            continue;
        }
        if is_header(&fields) {
            parsed.skipped.push(SkippedLine { line: line_no, reason: SkipReason::Header });
            continue;
        }
        if fields[0].is_empty() || fields[3].is_empty() {
            tracing::warn!(line = line_no, "Skipping roster line without school number or class");
            parsed.skipped.push(SkippedLine { line: line_no, reason: SkipReason::EmptyKey });
            continue;
        }

        let password = fields
            .get(4)
            .filter(|p| !p.is_empty())
            .unwrap_or(&fields[0])
            .to_string();

        parsed.rows.push(RosterRow {
            school_no: fields[0].to_string(),
            name: fields[1].to_string(),
            surname: fields[2].to_string(),
            class_group: fields[3].to_uppercase(),
            password,
        });
    }

    parsed
}
