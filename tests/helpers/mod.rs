//! Mock SIAKAD portal shared by the integration tests.
#![allow(dead_code)]

use serde_json::{Value, json};
use siakad::portal::PortalClient;
use siakad::portal::sections::{CONTEXT_PATH, RECAP_PATH, ROSTER_PATH};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TERM: &str = "20241";

/// Path part of an endpoint constant such as `/x.php?act=y`.
pub fn path_of(endpoint: &str) -> &str {
    endpoint.split('?').next().unwrap_or(endpoint)
}

/// `act` query value of an endpoint constant.
pub fn act_of(endpoint: &str) -> &str {
    endpoint.split("act=").nth(1).unwrap_or("")
}

pub fn client(server: &MockServer) -> PortalClient {
    PortalClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

pub fn section(id: &str, name: &str, class: &str, instructor: &str, printable: bool, key: &str) -> Value {
    json!({
        "jid": id,
        "namamk": name,
        "kelas": class,
        "namadosen": instructor,
        "sks": 3,
        "nama_kelas": format!("Kelas {class}"),
        "namahari": "Senin",
        "jamkuliah": "08:00-10:30",
        "jmlpeserta": "2",
        "cetak": if printable { "1" } else { "0" },
        "infomk": key,
    })
}

pub fn roster(prefix: &str) -> Value {
    json!([
        {
            "nim": format!("{prefix}01"), "nama": "Andi Saputra", "hadir": "14",
            "projek": "80", "quiz": "75", "tugas": "85", "uts": "70", "uas": "78",
            "nil_angka": 78.5, "nil_huruf": "B+"
        },
        {
            "nim": format!("{prefix}02"), "nama": "Siti Rahma", "hadir": 16,
            "projek": null, "quiz": "90", "tugas": "92", "uts": "88", "uas": "91",
            "nil_angka": "90.1", "nil_huruf": "A"
        }
    ])
}

pub async fn mount_context(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(CONTEXT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(server)
        .await;
}

pub async fn mount_sections(server: &MockServer, total: usize, rows: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path(path_of(RECAP_PATH)))
        .and(query_param("act", act_of(RECAP_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total": total, "rows": rows })))
        .mount(server)
        .await;
}

pub async fn mount_roster(server: &MockServer, key: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(path_of(ROSTER_PATH)))
        .and(query_param("act", act_of(ROSTER_PATH)))
        .and(body_string_contains(format!("param={key}&")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Decoded form fields of a captured request.
pub fn form_fields(request: &Request) -> Vec<(String, String)> {
    url::form_urlencoded::parse(&request.body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}
