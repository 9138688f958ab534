use std::path::Path;
use std::sync::Arc;

use kzattend::client::{
    Client, ClientConfig, Credentials, MarkOutcome, ScanSession, SessionStore, SystemStatus,
};
use kzattend::http::{build_router, AppState};
use kzattend::models::{Role, Student, Subject, User};
use kzattend::store::CollectionStore;
use tempfile::{tempdir, TempDir};

struct Harness {
    _data: TempDir,
    profile: TempDir,
    client: Client,
}

async fn start_server(data_dir: &Path) -> String {
    let store = Arc::new(CollectionStore::open(data_dir).expect("open store"));
    let app = build_router(AppState::new(store));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    format!("http://{addr}")
}

async fn harness() -> Harness {
    let data = tempdir().expect("data dir");
    let profile = tempdir().expect("profile dir");
    let base = start_server(data.path()).await;
    let mut config = ClientConfig::load_or_default(profile.path());
    config.save_api_config(&base, "").expect("save config");
    let client = Client::new(&config, SessionStore::new(profile.path()));
    Harness {
        _data: data,
        profile,
        client,
    }
}

fn student(id: &str, class_id: &str) -> Student {
    Student {
        id: id.to_string(),
        last_name: "Nguyen".to_string(),
        first_name: "An".to_string(),
        dob: "2004-01-01".to_string(),
        class_id: class_id.to_string(),
    }
}

#[tokio::test]
async fn scan_happy_path_then_duplicate() {
    let h = harness().await;
    h.client
        .import_students(&[student("SV001", "K1"), student("SV002", "K1")])
        .await
        .expect("import");

    let first = h.client.mark_attendance("A1", "SV001").await;
    assert_eq!(first, MarkOutcome::Success(student("SV001", "K1")));
    let rows = h.client.get_attendance(Some("A1")).await.expect("ledger");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].student_id, "SV001");
    let original_id = rows[0].id.clone();

    let again = h.client.mark_attendance("A1", "SV001").await;
    assert_eq!(again.status(), "already_present");
    assert_eq!(again.student().map(|s| s.id.as_str()), Some("SV001"));
    let rows = h.client.get_attendance(Some("A1")).await.expect("ledger");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, original_id);
}

#[tokio::test]
async fn unknown_code_leaves_ledger_untouched() {
    let h = harness().await;
    h.client
        .import_students(&[student("SV001", "K1")])
        .await
        .expect("import");
    let outcome = h.client.mark_attendance("A1", "ZZZ-NOT-REAL").await;
    assert_eq!(outcome, MarkOutcome::StudentNotFound);
    let lower = h.client.mark_attendance("A1", "sv001").await;
    assert_eq!(lower, MarkOutcome::StudentNotFound);
    assert!(h.client.get_attendance(None).await.expect("ledger").is_empty());
}

#[tokio::test]
async fn unreachable_server_is_an_error_outcome() {
    let profile = tempdir().expect("profile dir");
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let mut config = ClientConfig::load_or_default(profile.path());
    config
        .save_api_config(&format!("http://{addr}"), "")
        .expect("save config");
    let client = Client::new(&config, SessionStore::new(profile.path()));

    assert_eq!(client.mark_attendance("A1", "SV001").await.status(), "error");
    assert!(matches!(
        client.check_status().await,
        SystemStatus::Unreachable { .. }
    ));
}

#[tokio::test]
async fn scan_session_throttles_repeated_decodes() {
    let h = harness().await;
    h.client
        .import_students(&[student("SV001", "K1"), student("SV002", "K1")])
        .await
        .expect("import");

    let mut session = ScanSession::new(&h.client, "A1");
    let first = session.handle_scan("SV001").await;
    assert_eq!(first.map(|o| o.status()), Some("success"));
    assert!(session.handle_scan("SV002").await.is_none());
    assert_eq!(h.client.get_attendance(Some("A1")).await.expect("ledger").len(), 1);
}

#[tokio::test]
async fn activities_inherit_class_from_subject() {
    let h = harness().await;
    let class = h.client.create_class_named("  CNTT-K1 ").await.expect("class");
    assert_eq!(class.id, "CNTT-K1");
    let subject = h
        .client
        .create_subject_named("Networks", &class.id)
        .await
        .expect("subject");
    let activity = h
        .client
        .create_activity_for_subject(&subject, "Week 1", None)
        .await
        .expect("activity");
    assert_eq!(activity.class_id, class.id);
    assert!(!activity.date_time.is_empty());

    let stored = h.client.get_activities().await.expect("activities");
    let subjects: Vec<Subject> = h.client.get_subjects().await.expect("subjects");
    for a in &stored {
        let s = subjects
            .iter()
            .find(|s| s.id == a.subject_id)
            .expect("subject exists");
        assert_eq!(a.class_id, s.class_id);
    }

    h.client.update_class(&class.id, "Renamed").await.expect("rename");
    let classes = h.client.get_classes().await.expect("classes");
    assert_eq!(classes[0].id, "CNTT-K1");
    assert_eq!(classes[0].name, "Renamed");

    h.client.delete_class(&class.id).await.expect("delete");
    assert!(h.client.get_classes().await.expect("classes").is_empty());
    assert_eq!(h.client.get_activities().await.expect("activities").len(), 1);
}

#[tokio::test]
async fn dashboard_and_activity_stats() {
    let h = harness().await;
    let class = h.client.create_class_named("K1").await.expect("class");
    let subject = h
        .client
        .create_subject_named("Math", &class.id)
        .await
        .expect("subject");
    let activity = h
        .client
        .create_activity_for_subject(&subject, "Week 1", Some("2024-09-01T08:00"))
        .await
        .expect("activity");
    h.client
        .import_students(&[
            student("SV001", "K1"),
            student("SV002", "K1"),
            student("SV003", "K1"),
            student("SV004", "K1"),
            student("SV900", "K9"),
        ])
        .await
        .expect("import");
    h.client.mark_attendance(&activity.id, "SV001").await;
    h.client.mark_attendance(&activity.id, "SV900").await;

    let summary = h.client.dashboard_summary().await.expect("summary");
    assert_eq!((summary.classes, summary.students, summary.activities), (1, 5, 1));

    let stats = h
        .client
        .activity_stats(&activity.id)
        .await
        .expect("stats")
        .expect("activity exists");
    assert_eq!(stats.total_students, 4);
    assert_eq!(stats.present_count, 1);
    assert_eq!(stats.absent_count, 3);
    assert_eq!(stats.present_rate, 25.0);
    assert!(h.client.activity_stats("missing").await.expect("stats").is_none());
}

#[tokio::test]
async fn login_uses_user_store_and_session() {
    let h = harness().await;
    let monitor = User {
        username: "mon1".to_string(),
        password: "secret".to_string(),
        name: "Class Monitor".to_string(),
        role: Role::Monitor,
    };
    h.client.create_user(&monitor).await.expect("create user");

    assert!(!h.client.login("mon1", "wrong").await);
    assert!(!h.client.is_logged_in());
    assert!(!h.client.login("admin", "admin123").await);

    assert!(h.client.login("mon1", "secret").await);
    assert_eq!(h.client.current_user(), Some(monitor));
    h.client.logout().expect("logout");
    assert!(!h.client.is_logged_in());

    h.client.delete_user("mon1").await.expect("delete user");
    assert!(h.client.get_users().await.expect("users").is_empty());
}

#[tokio::test]
async fn break_glass_login_is_opt_in() {
    let h = harness().await;
    let config = ClientConfig::load_or_default(h.profile.path()).with_break_glass(Credentials {
        username: "admin".to_string(),
        password: "admin123".to_string(),
    });
    let client = Client::new(&config, SessionStore::new(h.profile.path()));
    assert!(client.login("admin", "admin123").await);
    let user = client.current_user().expect("session");
    assert_eq!(user.role, Role::Admin);
    assert_eq!(user.password, "");
}

#[tokio::test]
async fn incomplete_stored_records_do_not_break_lists() {
    let h = harness().await;
    let monitor = User {
        username: "mon1".to_string(),
        password: "pw".to_string(),
        name: "Class Monitor".to_string(),
        role: Role::Monitor,
    };
    h.client.create_user(&monitor).await.expect("create user");
    h.client.create_class_named("K1").await.expect("create class");

    let raw = reqwest::Client::new();
    for (endpoint, body) in [
        ("users", serde_json::json!({"username": "x", "password": "y"})),
        ("users", serde_json::json!({})),
        ("classes", serde_json::json!({"id": "K9"})),
        ("activities", serde_json::json!({"name": "orphan"})),
    ] {
        let res = raw
            .post(format!("{}/{endpoint}", h.client.base_url()))
            .json(&body)
            .send()
            .await
            .expect("raw post");
        assert!(res.status().is_success());
    }

    assert!(h.client.login("mon1", "pw").await);
    assert_eq!(h.client.current_user(), Some(monitor));
    assert!(!h.client.login("", "").await);

    let classes = h.client.get_classes().await.expect("classes");
    assert_eq!(classes.len(), 2);
    assert_eq!(classes[1].name, "");

    let summary = h.client.dashboard_summary().await.expect("dashboard");
    assert_eq!((summary.classes, summary.students, summary.activities), (2, 0, 1));
}
