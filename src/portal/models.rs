//! Data shapes exchanged with the portal and the local track catalog.

use serde::{Deserialize, Deserializer, Serialize};

/// Value of [`Section::printable`] marking published grades.
pub const PRINTABLE: &str = "1";

/// An organizational unit (department / study programme).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "jrsid", default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "kodejrs", deserialize_with = "lenient_string")]
    pub code: String,
    #[serde(rename = "namajrs", deserialize_with = "lenient_string")]
    pub name: String,
}

/// A selectable academic period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    #[serde(rename = "keterangan", deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(rename = "smtthnakd", deserialize_with = "lenient_string")]
    pub code: String,
}

/// One offering of a course, as listed by the recap endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "jid", default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "namamk", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "kelas", default, deserialize_with = "lenient_string")]
    pub class: String,
    #[serde(rename = "namadosen", default, deserialize_with = "lenient_string")]
    pub instructor: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sks: String,
    #[serde(rename = "nama_kelas", default, deserialize_with = "lenient_string")]
    pub class_name: String,
    #[serde(rename = "namahari", default, deserialize_with = "lenient_string")]
    pub day: String,
    #[serde(rename = "jamkuliah", default, deserialize_with = "lenient_string")]
    pub hours: String,
    #[serde(rename = "jmlpeserta", default, deserialize_with = "lenient_string")]
    pub participants: String,
    #[serde(rename = "cetak", default, deserialize_with = "lenient_string")]
    pub printable: String,
    /// Opaque key the roster endpoint expects as `param`.
    #[serde(rename = "infomk", default, deserialize_with = "lenient_string")]
    pub roster_key: String,
}

impl Section {
    pub fn is_printable(&self) -> bool {
        self.printable.trim() == PRINTABLE
    }
}

/// Response of the section recap endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SectionList {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total: usize,
    #[serde(default)]
    pub rows: Vec<Section>,
}

/// One student's grades within a section.
///
/// Field order here is the field order of the written record file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(rename = "nim", deserialize_with = "lenient_string")]
    pub registration: String,
    #[serde(rename = "nama", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "hadir", default, deserialize_with = "lenient_string")]
    pub attendance: String,
    #[serde(rename = "projek", default, deserialize_with = "lenient_string")]
    pub project: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quiz: String,
    #[serde(rename = "tugas", default, deserialize_with = "lenient_string")]
    pub assignment: String,
    #[serde(rename = "uts", default, deserialize_with = "lenient_string")]
    pub midterm: String,
    #[serde(rename = "uas", default, deserialize_with = "lenient_string")]
    pub final_exam: String,
    #[serde(rename = "nil_angka", default, deserialize_with = "lenient_string")]
    pub score: String,
    #[serde(rename = "nil_huruf", default, deserialize_with = "lenient_string")]
    pub letter: String,
}

/// Accept a JSON string, number, bool or null as text. Null becomes empty.
fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    use serde::de::Error;
    match serde_json::Value::deserialize(de)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(if b { "1" } else { "0" }.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a scalar, got {}",
            kind(&other)
        ))),
    }
}

/// Accept a count either as a number or as a numeric string.
fn lenient_count<'de, D: Deserializer<'de>>(de: D) -> Result<usize, D::Error> {
    use serde::de::Error;
    match serde_json::Value::deserialize(de)? {
        serde_json::Value::Null => Ok(0),
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(|v| v as usize)
            .ok_or_else(|| D::Error::custom(format!("expected a count, got {n}"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected a count, got {s:?}"))),
        other => Err(D::Error::custom(format!(
            "expected a count, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
        _ => "scalar",
    }
}
