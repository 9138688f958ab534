//! Data access for the attendance front end.
//!
//! Every screen goes through [`Client`]: it owns the base URL, turns
//! non-2xx replies into errors carrying the status code, and implements the
//! scan-to-ledger workflow. Nothing is cached; each call re-fetches.

mod config;
mod scan;
mod stats;

pub use config::{ClientConfig, Credentials, SessionStore, DEFAULT_API_URL};
pub use scan::{ScanGate, ScanSession, SCAN_WINDOW};
pub use stats::activity_stats;

use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::{
    Activity, ActivityStats, AttendanceRecord, ClassGroup, Role, Student, Subject, User,
};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("API Error: {0}")]
    Status(u16),

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result of one scan against one activity.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkOutcome {
    Success(Student),
    /// Already recorded for this activity; nothing was written.
    AlreadyPresent(Student),
    StudentNotFound,
    Error(String),
}

impl MarkOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            MarkOutcome::Success(_) => "success",
            MarkOutcome::AlreadyPresent(_) => "already_present",
            MarkOutcome::StudentNotFound => "student_not_found",
            MarkOutcome::Error(_) => "error",
        }
    }

    pub fn student(&self) -> Option<&Student> {
        match self {
            MarkOutcome::Success(s) | MarkOutcome::AlreadyPresent(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemStatus {
    Connected { mode: String },
    Unreachable { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub classes: usize,
    pub students: usize,
    pub activities: usize,
}

pub struct Client {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
    break_glass: Option<Credentials>,
}

impl Client {
    pub fn new(config: &ClientConfig, session: SessionStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_url().to_string(),
            session,
            break_glass: config.break_glass.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        let mut req = self
            .http
            .request(method, format!("{}/{}", self.base_url, endpoint));
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            return Err(ClientError::Status(res.status().as_u16()));
        }
        let value: Value = res.json().await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn send(&self, method: Method, endpoint: &str, body: Value) -> Result<(), ClientError> {
        self.fetch::<Value>(method, endpoint, &[], Some(body)).await?;
        Ok(())
    }

    pub async fn check_status(&self) -> SystemStatus {
        match self.fetch::<Value>(Method::GET, "status", &[], None).await {
            Ok(v) => SystemStatus::Connected {
                mode: v
                    .get("mode")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            Err(e) => SystemStatus::Unreachable {
                reason: e.to_string(),
            },
        }
    }

    pub async fn get_users(&self) -> Result<Vec<User>, ClientError> {
        self.fetch(Method::GET, "users", &[], None).await
    }

    pub async fn create_user(&self, user: &User) -> Result<(), ClientError> {
        self.send(Method::POST, "users", serde_json::to_value(user)?)
            .await
    }

    pub async fn delete_user(&self, username: &str) -> Result<(), ClientError> {
        self.send(Method::DELETE, "users", json!({ "username": username }))
            .await
    }

    /// Checks credentials against the user store and records the session on
    /// success. The break-glass pair, when configured, is accepted without a
    /// round trip and stored with a blank password.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        let user = if let Some(bg) = self
            .break_glass
            .as_ref()
            .filter(|bg| bg.username == username && bg.password == password)
        {
            warn!(username = %bg.username, "break-glass login used");
            Some(User {
                username: bg.username.clone(),
                password: String::new(),
                name: "Super Admin".to_string(),
                role: Role::Admin,
            })
        } else {
            match self.get_users().await {
                Ok(users) => users
                    .into_iter()
                    .find(|u| {
                        !u.username.is_empty() && u.username == username && u.password == password
                    }),
                Err(e) => {
                    error!(error = %e, "login lookup failed");
                    None
                }
            }
        };

        let Some(user) = user else {
            return false;
        };
        match self.session.save(&user) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %format!("{e:#}"), "failed to persist session");
                false
            }
        }
    }

    pub fn logout(&self) -> anyhow::Result<()> {
        self.session.clear()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.load()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    pub async fn get_classes(&self) -> Result<Vec<ClassGroup>, ClientError> {
        self.fetch(Method::GET, "classes", &[], None).await
    }

    pub async fn create_class(&self, class: &ClassGroup) -> Result<(), ClientError> {
        self.send(Method::POST, "classes", serde_json::to_value(class)?)
            .await
    }

    /// The trimmed name doubles as the class id.
    pub async fn create_class_named(&self, name: &str) -> Result<ClassGroup, ClientError> {
        let name = name.trim();
        let class = ClassGroup {
            id: name.to_string(),
            name: name.to_string(),
            description: None,
        };
        self.create_class(&class).await?;
        Ok(class)
    }

    /// Renames in place; the id never changes.
    pub async fn update_class(&self, id: &str, name: &str) -> Result<(), ClientError> {
        self.send(Method::PUT, "classes", json!({ "id": id, "name": name }))
            .await
    }

    /// Only the class entry goes; its students, subjects and activities stay.
    pub async fn delete_class(&self, id: &str) -> Result<(), ClientError> {
        self.send(Method::DELETE, "classes", json!({ "id": id }))
            .await
    }

    pub async fn get_subjects(&self) -> Result<Vec<Subject>, ClientError> {
        self.fetch(Method::GET, "subjects", &[], None).await
    }

    pub async fn create_subject(&self, subject: &Subject) -> Result<(), ClientError> {
        self.send(Method::POST, "subjects", serde_json::to_value(subject)?)
            .await
    }

    pub async fn create_subject_named(
        &self,
        name: &str,
        class_id: &str,
    ) -> Result<Subject, ClientError> {
        let subject = Subject {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            class_id: class_id.to_string(),
        };
        self.create_subject(&subject).await?;
        Ok(subject)
    }

    pub async fn get_activities(&self) -> Result<Vec<Activity>, ClientError> {
        self.fetch(Method::GET, "activities", &[], None).await
    }

    pub async fn create_activity(&self, activity: &Activity) -> Result<(), ClientError> {
        self.send(Method::POST, "activities", serde_json::to_value(activity)?)
            .await
    }

    /// Takes the class from the subject so the two can never disagree.
    /// Without a date the activity is stamped with the current time.
    pub async fn create_activity_for_subject(
        &self,
        subject: &Subject,
        name: &str,
        date_time: Option<&str>,
    ) -> Result<Activity, ClientError> {
        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            date_time: date_time
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            subject_id: subject.id.clone(),
            class_id: subject.class_id.clone(),
        };
        self.create_activity(&activity).await?;
        Ok(activity)
    }

    pub async fn get_students(&self, class_id: Option<&str>) -> Result<Vec<Student>, ClientError> {
        match class_id {
            Some(class_id) => {
                self.fetch(Method::GET, "students", &[("classId", class_id)], None)
                    .await
            }
            None => self.fetch(Method::GET, "students", &[], None).await,
        }
    }

    /// Students whose id is already enrolled are skipped by the server.
    pub async fn import_students(&self, students: &[Student]) -> Result<(), ClientError> {
        self.send(Method::POST, "students", serde_json::to_value(students)?)
            .await
    }

    pub async fn get_attendance(
        &self,
        activity_id: Option<&str>,
    ) -> Result<Vec<AttendanceRecord>, ClientError> {
        match activity_id {
            Some(activity_id) => {
                self.fetch(
                    Method::GET,
                    "attendance",
                    &[("activityId", activity_id)],
                    None,
                )
                .await
            }
            None => self.fetch(Method::GET, "attendance", &[], None).await,
        }
    }

    /// Resolves a scanned code to a student and records them present for
    /// the activity. Never retries; any failure is reported as
    /// [`MarkOutcome::Error`].
    pub async fn mark_attendance(&self, activity_id: &str, scanned_code: &str) -> MarkOutcome {
        match self.try_mark_attendance(activity_id, scanned_code).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(activity_id, error = %e, "mark attendance failed");
                MarkOutcome::Error(e.to_string())
            }
        }
    }

    async fn try_mark_attendance(
        &self,
        activity_id: &str,
        scanned_code: &str,
    ) -> Result<MarkOutcome, ClientError> {
        let students = self.get_students(None).await?;
        let Some(student) = students.into_iter().find(|s| s.id == scanned_code) else {
            return Ok(MarkOutcome::StudentNotFound);
        };

        let attendance = self.get_attendance(Some(activity_id)).await?;
        if attendance.iter().any(|a| a.student_id == student.id) {
            return Ok(MarkOutcome::AlreadyPresent(student));
        }

        let record = AttendanceRecord {
            id: Uuid::new_v4().to_string(),
            activity_id: activity_id.to_string(),
            student_id: student.id.clone(),
            timestamp: Utc::now().to_rfc3339(),
        };
        self.send(Method::POST, "attendance", serde_json::to_value(&record)?)
            .await?;
        Ok(MarkOutcome::Success(student))
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ClientError> {
        let (classes, students, activities) = tokio::try_join!(
            self.get_classes(),
            self.get_students(None),
            self.get_activities()
        )?;
        Ok(DashboardSummary {
            classes: classes.len(),
            students: students.len(),
            activities: activities.len(),
        })
    }

    /// `None` when no activity has this id.
    pub async fn activity_stats(
        &self,
        activity_id: &str,
    ) -> Result<Option<ActivityStats>, ClientError> {
        let activities = self.get_activities().await?;
        let Some(activity) = activities.into_iter().find(|a| a.id == activity_id) else {
            return Ok(None);
        };
        let roster = self.get_students(Some(&activity.class_id)).await?;
        let records = self.get_attendance(Some(&activity.id)).await?;
        Ok(Some(activity_stats(&activity, &roster, &records)))
    }
}
