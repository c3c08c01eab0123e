#![allow(dead_code)]
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tower::ServiceExt;

use notes_portal_backend::{
    app::build_router,
    config::Config,
    models::{
        login_audit::{LoginAuditEntry, NewLoginAudit},
        student::Student,
    },
    repositories::student::{first_match, CredentialStore, StoreError, StudentMatch},
    services::audit_log::{materialize, AuditError, AuditLogger},
    state::AppState,
    types::{LoginAuditId, StudentId},
    utils::{
        jwt::{create_teacher_token, encode_claims, TeacherClaims},
        pin::{Argon2PinVerifier, PinVerifier},
    },
};

pub const TEST_JWT_SECRET: &str = "a_secure_token_that_is_long_enough_123";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        bind_address: "127.0.0.1:0".into(),
        db_max_connections: 1,
        jwt_secret: TEST_JWT_SECRET.into(),
        jwt_expiration_hours: 1,
        cors_allow_origins: vec!["http://localhost:8000".into()],
        request_timeout_seconds: 10,
        // oneshot requests carry no peer address for the limiter to key on.
        rate_limit_login_enabled: false,
        rate_limit_login_max_requests: 10,
        rate_limit_login_window_seconds: 60,
        pin_hash_memory_kib: 1024,
        pin_hash_iterations: 1,
        pin_hash_parallelism: 1,
        audit_log_retention_days: 365,
        audit_log_retention_forever: false,
    }
}

pub fn cheap_verifier() -> Arc<Argon2PinVerifier> {
    Arc::new(Argon2PinVerifier::new(1024, 1, 1).expect("build verifier"))
}

/// Credential store backed by a vector. Rows are not deduplicated so tests can
/// seed duplicate display names.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    students: Mutex<Vec<Student>>,
    lookups: AtomicUsize,
    fail_lookups: AtomicBool,
}

impl InMemoryCredentialStore {
    pub fn insert(&self, student: Student) {
        self.students.lock().unwrap().push(student);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, id: StudentId) -> Option<Student> {
        self.students
            .lock()
            .unwrap()
            .iter()
            .find(|student| student.id == id)
            .cloned()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_display_name(&self, display_name: &str) -> Result<StudentMatch, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut rows: Vec<Student> = self
            .students
            .lock()
            .unwrap()
            .iter()
            .filter(|student| student.display_name == display_name)
            .cloned()
            .collect();
        rows.sort_by_key(|student| student.created_at);
        first_match(rows)
    }

    async fn find_by_id(&self, id: StudentId) -> Result<Student, StoreError> {
        self.get(id).ok_or(StoreError::NotFound)
    }

    async fn update_hash(&self, id: StudentId, new_hash: &str) -> Result<(), StoreError> {
        let mut students = self.students.lock().unwrap();
        let student = students
            .iter_mut()
            .find(|student| student.id == id)
            .ok_or(StoreError::NotFound)?;
        student.pin_hash = new_hash.to_string();
        student.pin_updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn create(&self, student: &Student) -> Result<Student, StoreError> {
        let mut students = self.students.lock().unwrap();
        if students
            .iter()
            .any(|existing| existing.display_name == student.display_name)
        {
            return Err(StoreError::Conflict);
        }
        students.push(student.clone());
        Ok(student.clone())
    }

    async fn list(&self) -> Result<Vec<Student>, StoreError> {
        let mut students = self.students.lock().unwrap().clone();
        students.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(students)
    }
}

/// Audit logger that keeps entries in memory and can be told to fail writes.
#[derive(Default)]
pub struct InMemoryAuditLogger {
    entries: Mutex<Vec<LoginAuditEntry>>,
    fail_writes: AtomicBool,
    attempted_writes: AtomicUsize,
    write_delay_ms: AtomicU64,
}

impl InMemoryAuditLogger {
    pub fn entries(&self) -> Vec<LoginAuditEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every write sleep for `delay` before completing.
    pub fn delay_writes(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn attempted_writes(&self) -> usize {
        self.attempted_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditLogger for InMemoryAuditLogger {
    async fn record(&self, entry: NewLoginAudit) -> Result<LoginAuditId, AuditError> {
        self.attempted_writes.fetch_add(1, Ordering::SeqCst);
        let delay_ms = self.write_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AuditError::Persistence(sqlx::Error::PoolClosed));
        }
        let entry = materialize(entry);
        let id = entry.id;
        self.entries.lock().unwrap().push(entry);
        Ok(id)
    }

    async fn list_for_student(
        &self,
        student_id: StudentId,
        limit: i64,
    ) -> Result<Vec<LoginAuditEntry>, AuditError> {
        let mut entries: Vec<LoginAuditEntry> = self
            .entries()
            .into_iter()
            .filter(|entry| entry.student_id == Some(student_id))
            .collect();
        entries.reverse();
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }
}

pub struct TestApp {
    pub router: Router,
    pub students: Arc<InMemoryCredentialStore>,
    pub audit_log: Arc<InMemoryAuditLogger>,
    pub pin_verifier: Arc<Argon2PinVerifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let students = Arc::new(InMemoryCredentialStore::default());
        let audit_log = Arc::new(InMemoryAuditLogger::default());
        let pin_verifier = cheap_verifier();
        let state = AppState::new(
            config,
            students.clone(),
            audit_log.clone(),
            pin_verifier.clone(),
        );
        Self {
            router: build_router(state),
            students,
            audit_log,
            pin_verifier,
        }
    }

    /// Seeds a student whose PIN digest is produced by the app's verifier.
    pub fn seed_student(&self, display_name: &str, pin: &str) -> Student {
        let student = Student::new(
            display_name.to_string(),
            self.pin_verifier.hash(pin).expect("hash pin"),
        );
        self.students.insert(student.clone());
        student
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("call app");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        (status, bytes)
    }

    pub async fn login(&self, body: Value) -> (StatusCode, Value) {
        self.login_raw(body.to_string()).await
    }

    pub async fn login_raw(&self, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/student/login")
            .header("content-type", "application/json")
            .header("user-agent", "integration-test")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(body))
            .expect("build login request");
        let (status, bytes) = self.send(request).await;
        (status, parse_json(&bytes))
    }
}

pub fn parse_json(bytes: &Bytes) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}

pub fn teacher_token(email: &str) -> String {
    create_teacher_token(email.to_string(), TEST_JWT_SECRET, 1).expect("issue token")
}

pub fn token_with_role(email: &str, role: &str) -> String {
    let mut claims = TeacherClaims::new(email.to_string(), 1);
    claims.role = role.to_string();
    encode_claims(&claims, TEST_JWT_SECRET).expect("encode claims")
}

/// Asserts the serialized value carries no PIN digest at any depth.
pub fn assert_no_pin_hash(value: &Value) {
    let rendered = value.to_string();
    assert!(!rendered.contains("pinHash"), "pinHash leaked: {rendered}");
    assert!(!rendered.contains("pin_hash"), "pin_hash leaked: {rendered}");
    assert!(!rendered.contains("$argon2"), "digest leaked: {rendered}");
}
