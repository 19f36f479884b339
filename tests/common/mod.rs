use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;
use http_body_util::BodyExt;
use jobboard::auth::{jwt::JwtService, password};
use jobboard::config::{AppConfig, DEFAULT_MAX_UPLOAD_BYTES};
use jobboard::db::{self, PgPool, MIGRATIONS};
use jobboard::enums::Role;
use jobboard::models::NewUser;
use jobboard::routes;
use jobboard::schema::{job_applications, jobs, users};
use jobboard::state::AppState;
use jobboard::storage::ObjectStorage;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const PASSWORD: &str = "secret123";

#[allow(dead_code)]
#[derive(Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
        content_disposition: Option<String>,
    ) -> Result<()> {
        let stored = StoredObject {
            key: key.to_string(),
            bytes,
            content_type,
            content_disposition,
        };
        let mut guard = self.objects.lock().await;
        guard.insert(stored.key.clone(), stored);
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("https://fake-storage/{key}")
    }
}

impl FakeStorage {
    #[allow(dead_code)]
    pub async fn keys(&self) -> Vec<String> {
        let guard = self.objects.lock().await;
        guard.keys().cloned().collect()
    }

    #[allow(dead_code)]
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        let guard = self.objects.lock().await;
        guard.get(key).cloned()
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    storage: Arc<FakeStorage>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url,
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cors_allowed_origin: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            aws_endpoint_url: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "us-east-1".to_string(),
            s3_bucket: "test-bucket".to_string(),
            s3_public_base_url: None,
        };

        let pool = db::init_pool(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let storage = Arc::new(FakeStorage::default());
        let storage_for_state: Arc<dyn ObjectStorage> = storage.clone();
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool, config, storage_for_state, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            storage,
        })
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    #[allow(dead_code)]
    pub fn storage(&self) -> Arc<FakeStorage> {
        self.storage.clone()
    }

    /// Inserts a user straight into the database, bypassing registration rules.
    #[allow(dead_code)]
    pub async fn insert_user(&self, full_name: &str, email: &str, phone: &str, role: Role) -> Result<Uuid> {
        let full_name = full_name.to_string();
        let email = email.to_string();
        let phone_number = phone.to_string();
        self.with_conn(move |conn| {
            let user = NewUser {
                id: Uuid::new_v4(),
                full_name,
                email,
                phone_number,
                password_hash: password::hash_password(PASSWORD)?,
                role,
            };
            diesel::insert_into(users::table)
                .values(&user)
                .execute(conn)
                .context("failed to insert user")?;
            Ok(user.id)
        })
        .await
    }

    /// Registers through the API and returns `(user id, token)`.
    #[allow(dead_code)]
    pub async fn register(&self, full_name: &str, email: &str, phone: &str, role: &str) -> Result<(Uuid, String)> {
        let response = self
            .post_json(
                "/api/user/register",
                &json!({
                    "fullName": full_name,
                    "email": email,
                    "password": PASSWORD,
                    "phoneNumber": phone,
                    "role": role,
                }),
                None,
            )
            .await?;
        let (status, body) = json_body(response).await?;
        ensure!(status == StatusCode::CREATED, "register failed with {status}: {body}");
        let id = body["user"]["id"]
            .as_str()
            .ok_or_else(|| anyhow!("register response missing user id"))?
            .parse()?;
        let token = body["token"]
            .as_str()
            .ok_or_else(|| anyhow!("register response missing token"))?
            .to_string();
        Ok((id, token))
    }

    #[allow(dead_code)]
    pub async fn login_token(&self, email: &str) -> Result<String> {
        let response = self
            .post_json(
                "/api/user/login",
                &json!({ "email": email, "password": PASSWORD }),
                None,
            )
            .await?;
        let (status, body) = json_body(response).await?;
        ensure!(status == StatusCode::OK, "login failed with status {status}");
        body["token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("login response missing token"))
    }

    /// Posts a job as the recruiter behind `token` and returns its id.
    #[allow(dead_code)]
    pub async fn create_job(&self, token: &str, title: &str, job_type: &str) -> Result<Uuid> {
        let response = self
            .post_json(
                "/api/jobs",
                &json!({
                    "title": title,
                    "company": "Acme",
                    "location": "Remote",
                    "description": format!("{title} role"),
                    "jobType": job_type,
                }),
                Some(token),
            )
            .await?;
        let (status, body) = json_body(response).await?;
        ensure!(status == StatusCode::CREATED, "create job failed with {status}: {body}");
        Ok(body["job"]["id"]
            .as_str()
            .ok_or_else(|| anyhow!("job response missing id"))?
            .parse()?)
    }

    #[allow(dead_code)]
    pub async fn job_applicants(&self, job_id: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(move |conn| {
            jobs::table
                .find(job_id)
                .select(jobs::applicants)
                .first::<Vec<Uuid>>(conn)
                .context("failed to load applicants")
        })
        .await
    }

    /// Overwrites the stored applicant list without touching application rows.
    #[allow(dead_code)]
    pub async fn set_job_applicants(&self, job_id: Uuid, applicants: Vec<Uuid>) -> Result<()> {
        self.with_conn(move |conn| {
            diesel::update(jobs::table.find(job_id))
                .set(jobs::applicants.eq(applicants))
                .execute(conn)
                .context("failed to overwrite applicants")?;
            Ok(())
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn application_count(&self, job_id: Uuid) -> Result<i64> {
        self.with_conn(move |conn| {
            job_applications::table
                .filter(job_applications::job_id.eq(job_id))
                .count()
                .get_result(conn)
                .context("failed to count applications")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PUT, path, payload, token).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send_empty(Method::GET, path, token).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send_empty(Method::DELETE, path, token).await
    }

    async fn send_empty(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn upload(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
        token: &str,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend(data);
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

/// Status plus parsed JSON body of a response.
pub async fn json_body(response: hyper::Response<Body>) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let bytes = body_to_vec(response.into_body()).await?;
    let value = serde_json::from_slice(&bytes)
        .with_context(|| format!("response with status {status} is not JSON"))?;
    Ok((status, value))
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute("TRUNCATE TABLE job_applications, jobs, users CASCADE;")
        .context("failed to truncate tables")?;
    Ok(())
}
