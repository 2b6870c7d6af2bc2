// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use lms_backend::{
    config::Config,
    models::user::{NewUser, Role, User},
    routes,
    state::AppState,
    store::{MemoryStore, Store},
    utils::jwt::sign_jwt,
};
use tempfile::TempDir;

const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub struct TestApp {
    /// Base URL (e.g., "http://127.0.0.1:12345").
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub upload_dir: TempDir,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port, backed by the in-process store and a
/// fresh upload directory.
pub async fn spawn_app() -> TestApp {
    let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");
    let store = Arc::new(MemoryStore::new());

    let config = Config {
        database_url: String::new(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        upload_dir: upload_dir.path().to_path_buf(),
        port: 0,
        rust_log: "error".to_string(),
        admin_email: None,
        admin_name: None,
    };

    let state = AppState::new(store.clone(), config);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        store,
        upload_dir,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn create_user(&self, name: &str, role: Role) -> User {
        let email = format!(
            "{}.{}@example.edu",
            name.to_lowercase().replace(' ', "."),
            &uuid::Uuid::new_v4().to_string()[..8]
        );
        self.store
            .create_user(NewUser {
                name: name.to_string(),
                email,
                role,
                enrollment_number: None,
            })
            .await
            .expect("Failed to seed user")
    }

    pub fn token(&self, user: &User) -> String {
        sign_jwt(user.id, user.role, JWT_SECRET, 600).expect("Failed to sign token")
    }

    /// Writes a blob into the upload directory and returns its stored path.
    pub fn store_blob(&self, stored_name: &str, contents: &[u8]) -> String {
        std::fs::write(self.upload_dir.path().join(stored_name), contents)
            .expect("Failed to write blob");
        stored_name.to_string()
    }

    pub async fn create_course(&self, owner: &User, code: &str, name: &str) -> serde_json::Value {
        let response = self
            .client
            .post(self.url("/api/courses"))
            .bearer_auth(self.token(owner))
            .json(&serde_json::json!({
                "course_code": code,
                "course_name": name,
                "subject": "Computer Science"
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    pub async fn create_module(
        &self,
        owner: &User,
        course_id: i64,
        order: i32,
        name: &str,
        files: serde_json::Value,
    ) -> serde_json::Value {
        let response = self
            .client
            .post(self.url("/api/modules"))
            .bearer_auth(self.token(owner))
            .json(&serde_json::json!({
                "course_id": course_id,
                "module_name": name,
                "module_order": order,
                "files": files
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    pub async fn create_task(&self, owner: &User, module_id: i64, name: &str) -> serde_json::Value {
        let response = self
            .client
            .post(self.url("/api/tasks"))
            .bearer_auth(self.token(owner))
            .json(&serde_json::json!({
                "module_id": module_id,
                "task_name": name,
                "problem_statement": format!("Solve {}", name),
                "test_cases": [
                    { "input": "1", "expected_output": "1", "is_sample": true }
                ]
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    pub async fn enroll(&self, caller: &User, course_id: i64, email: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/enrollments"))
            .bearer_auth(self.token(caller))
            .json(&serde_json::json!({
                "course_id": course_id,
                "student_email": email
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn set_status(&self, caller: &User, enrollment_id: i64, status: &str) -> reqwest::Response {
        self.client
            .put(self.url(&format!("/api/enrollments/{}", enrollment_id)))
            .bearer_auth(self.token(caller))
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Entry names of a ZIP archive in central-directory order.
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).expect("Not a ZIP archive");
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Reads one entry of a ZIP archive as UTF-8.
pub fn read_entry(bytes: &[u8], name: &str) -> String {
    use std::io::Read;

    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).expect("Not a ZIP archive");
    let mut contents = String::new();
    archive
        .by_name(name)
        .unwrap_or_else(|_| panic!("missing entry {}", name))
        .read_to_string(&mut contents)
        .unwrap();
    contents
}
