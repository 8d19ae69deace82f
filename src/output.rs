//! Writes each fetched roster as a JSON record file and an xlsx spreadsheet.
//!
//! Layout: `<json_root>/<track>/<term>/<stem>.json` and
//! `<excel_root>/<track>/<term>/<stem>.xlsx`. Files are replaced whole on
//! every run, never merged.

use crate::portal::models::{RosterEntry, Section};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Column labels of the spreadsheet header row.
pub const SPREADSHEET_HEADERS: [&str; 10] = [
    "NIM",
    "Nama Peserta",
    "Angka",
    "Huruf",
    "Kehadiran",
    "Projek",
    "Quiz",
    "Tugas",
    "UTS",
    "UAS",
];

const SHEET_NAME: &str = "Sheet1";

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("i/o error writing {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize roster")]
    Json(#[from] serde_json::Error),
    #[error("failed to build spreadsheet")]
    Xlsx(#[from] XlsxError),
}

/// Roots under which artifacts are materialized.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    json_root: PathBuf,
    excel_root: PathBuf,
}

impl OutputLayout {
    pub fn new(json_root: impl Into<PathBuf>, excel_root: impl Into<PathBuf>) -> Self {
        Self {
            json_root: json_root.into(),
            excel_root: excel_root.into(),
        }
    }

    /// Directories for one track and term. Nothing is created yet.
    pub fn dirs(&self, track_name: &str, term_code: &str) -> ArtifactDirs {
        let track = sanitize_component(track_name);
        let term = sanitize_component(term_code);
        ArtifactDirs {
            json: self.json_root.join(&track).join(&term),
            excel: self.excel_root.join(&track).join(&term),
        }
    }
}

/// Record and spreadsheet directories for one track/term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDirs {
    pub json: PathBuf,
    pub excel: PathBuf,
}

impl ArtifactDirs {
    pub async fn create(&self) -> Result<(), WriteError> {
        for dir in [&self.json, &self.excel] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| WriteError::Io {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    pub fn record_path(&self, stem: &str) -> PathBuf {
        self.json.join(format!("{stem}.json"))
    }

    pub fn spreadsheet_path(&self, stem: &str) -> PathBuf {
        self.excel.join(format!("{stem}.xlsx"))
    }
}

/// Outcome of writing one artifact pair. The two halves fail independently.
#[derive(Debug)]
pub struct WriteReport {
    pub record: Result<PathBuf, WriteError>,
    pub spreadsheet: Result<PathBuf, WriteError>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.record.is_ok() && self.spreadsheet.is_ok()
    }
}

/// Make `raw` safe to use as a single path component.
///
/// `/` becomes `-` and `:` is dropped; other characters rejected by common
/// filesystems become `-`.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ':' && !c.is_control())
        .map(|c| match c {
            '/' | '\\' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// File stem for a section: name, class label and instructor.
pub fn section_stem(section: &Section) -> String {
    sanitize_component(&format!(
        "{} R{} {}",
        section.name, section.class, section.instructor
    ))
}

/// Stems for `sections` in order, disambiguating duplicates with the section id.
///
/// Comparison ignores case so case-insensitive filesystems cannot collide.
pub fn assign_stems(sections: &[&Section]) -> Vec<String> {
    let mut used = HashSet::new();
    sections
        .iter()
        .map(|section| {
            let base = section_stem(section);
            let mut stem = base.clone();
            let mut n = 1;
            while !used.insert(stem.to_lowercase()) {
                stem = if n == 1 {
                    format!("{base} ({})", sanitize_component(&section.id))
                } else {
                    format!("{base} ({}-{n})", sanitize_component(&section.id))
                };
                n += 1;
            }
            stem
        })
        .collect()
}

/// Write the record file and the spreadsheet for one roster.
///
/// Blocking; call from a blocking context.
pub fn write_artifact(dirs: &ArtifactDirs, stem: &str, roster: &[RosterEntry]) -> WriteReport {
    let record_path = dirs.record_path(stem);
    let spreadsheet_path = dirs.spreadsheet_path(stem);
    WriteReport {
        record: write_record(&record_path, roster).map(|_| record_path),
        spreadsheet: write_spreadsheet(&spreadsheet_path, roster).map(|_| spreadsheet_path),
    }
}

/// Pretty-printed JSON, two-space indent, trailing newline.
pub fn write_record(path: &Path, roster: &[RosterEntry]) -> Result<(), WriteError> {
    let mut bytes = serde_json::to_vec_pretty(roster)?;
    bytes.push(b'\n');
    replace_file(path, |tmp| {
        std::fs::write(tmp, &bytes).map_err(|source| WriteError::Io {
            path: tmp.to_path_buf(),
            source,
        })
    })
}

/// One header row, then one row per entry in server order.
pub fn write_spreadsheet(path: &Path, roster: &[RosterEntry]) -> Result<(), WriteError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, label) in SPREADSHEET_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *label, &bold)?;
    }

    for (i, entry) in roster.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, value) in spreadsheet_row(entry).iter().enumerate() {
            sheet.write_string(row, col as u16, *value)?;
        }
    }

    replace_file(path, |tmp| workbook.save(tmp).map_err(WriteError::from))
}

fn spreadsheet_row(entry: &RosterEntry) -> [&str; 10] {
    [
        entry.registration.as_str(),
        entry.name.as_str(),
        entry.score.as_str(),
        entry.letter.as_str(),
        entry.attendance.as_str(),
        entry.project.as_str(),
        entry.quiz.as_str(),
        entry.assignment.as_str(),
        entry.midterm.as_str(),
        entry.final_exam.as_str(),
    ]
}

/// Produce the file at a sibling temp path, then move it over `path`.
fn replace_file(
    path: &Path,
    write: impl FnOnce(&Path) -> Result<(), WriteError>,
) -> Result<(), WriteError> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    if let Err(e) = write(&tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}
