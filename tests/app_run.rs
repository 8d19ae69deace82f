mod helpers;

use figment::Figment;
use figment::providers::Serialized;
use helpers::{TERM, act_of, mount_roster, mount_sections, path_of, roster, section};
use serde_json::json;
use siakad::app::{App, Selection};
use siakad::config::Config;
use siakad::portal::auth::SUCCESS_MARKER;
use siakad::portal::catalog::TERMS_PATH;
use siakad::portal::sections::CONTEXT_PATH;
use std::collections::HashMap;
use std::path::Path;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, root: &Path) -> Config {
    let track_file = root.join("jurusan.json");
    std::fs::write(
        &track_file,
        r#"[{"jrsid":"1","kodejrs":"55201","namajrs":"Teknik Informatika"},
            {"jrsid":"2","kodejrs":"57201","namajrs":"Sistem Informasi"},
            {"jrsid":"3","kodejrs":"","namajrs":"Tanpa Kode"}]"#,
    )
    .unwrap();

    let under = |p: &str| root.join(p).display().to_string();
    let values: HashMap<&str, String> = HashMap::from([
        ("base_url", server.uri()),
        ("user_siakad", "dosen01".to_string()),
        ("password_siakad", "rahasia".to_string()),
        ("session_file", under("cookie.txt")),
        ("track_file", track_file.display().to_string()),
        ("json_dir", under("nilai_json")),
        ("excel_dir", under("nilai_excel")),
        ("ip_echo_url", format!("{}/ip", server.uri())),
    ]);
    Config::from_figment(Figment::new().merge(Serialized::defaults(values))).unwrap()
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "PHPSESSID=initial; path=/"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(200).set_body_string("10.1.2.3"))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ceklogin.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "PHPSESSID=fresh; path=/")
                .set_body_string(format!("{{{SUCCESS_MARKER}}}")),
        )
        .mount(server)
        .await;
}

async fn mount_terms(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(path_of(TERMS_PATH)))
        .and(query_param("act", act_of(TERMS_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"keterangan": "Ganjil 2024/2025", "smtthnakd": TERM}
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_failed_track_does_not_stop_the_run() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_login(&server).await;
    mount_terms(&server).await;

    Mock::given(method("POST"))
        .and(path(CONTEXT_PATH))
        .and(body_string_contains("ps=55201"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CONTEXT_PATH))
        .and(body_string_contains("ps=57201"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    mount_sections(
        &server,
        2,
        vec![
            section("51", "Analisis Sistem", "A", "Lina", true, "K51"),
            section("52", "Manajemen Proyek", "A", "Mira", false, "K52"),
        ],
    )
    .await;
    mount_roster(&server, "K51", roster("2501")).await;

    let config = config(&server, dir.path());
    let app = App::new(config).unwrap().quiet();
    let selection = Selection {
        term: Some(TERM.to_string()),
        all_tracks: true,
        ..Default::default()
    };
    let summary = app.run(&selection).await.unwrap();

    assert_eq!(summary.term, TERM);
    assert_eq!(summary.failed_tracks, vec!["Teknik Informatika".to_string()]);
    assert_eq!(summary.tracks.len(), 1);
    assert_eq!(summary.done(), 1);
    assert_eq!(summary.skipped(), 1);

    let record = dir
        .path()
        .join("nilai_json")
        .join("Sistem Informasi")
        .join(TERM)
        .join("Analisis Sistem RA Lina.json");
    assert!(record.exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("cookie.txt")).unwrap(),
        "PHPSESSID=fresh"
    );
}

#[tokio::test]
async fn test_unknown_term_is_fatal() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_login(&server).await;
    mount_terms(&server).await;
    Mock::given(method("POST"))
        .and(path(CONTEXT_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = App::new(config(&server, dir.path())).unwrap().quiet();
    let selection = Selection {
        term: Some("19991".to_string()),
        all_tracks: true,
        ..Default::default()
    };
    assert!(app.run(&selection).await.is_err());
}

#[tokio::test]
async fn test_rejected_login_is_fatal() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(path_of(TERMS_PATH)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = App::new(config(&server, dir.path())).unwrap().quiet();
    let selection = Selection {
        term: Some(TERM.to_string()),
        all_tracks: true,
        ..Default::default()
    };
    let err = app.run(&selection).await.unwrap_err();
    assert!(format!("{err:#}").contains("Authentication failed"), "{err:#}");
}
