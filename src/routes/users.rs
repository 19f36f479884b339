use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::to_iso;
use crate::access::Action;
use crate::applications;
use crate::auth::{password, Actor};
use crate::enums::{ApplicationStatus, JobStatus, Role};
use crate::error::{AppError, AppResult};
use crate::models::{Job, NewUser, User};
use crate::schema::{jobs, users};
use crate::state::AppState;
use crate::validation::{self, MAX_FIELD_LEN, MAX_NAME_LEN};

const PHONE_CONSTRAINT: &str = "users_phone_number_key";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub role: Role,
    pub profile_photo: Option<String>,
    pub resume: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            phone_number: user.phone_number,
            role: user.role,
            profile_photo: user.profile_photo,
            resume: user.resume,
            is_active: user.is_active,
            created_at: to_iso(user.created_at),
            updated_at: to_iso(user.updated_at),
        }
    }
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

impl From<&User> for PersonSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct UserEnvelope {
    pub success: bool,
    pub user: UserResponse,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let full_name = validation::required("fullName", payload.full_name.as_deref(), MAX_NAME_LEN)?;
    let email = validation::required("email", payload.email.as_deref(), MAX_FIELD_LEN)?;
    let password = validation::required("password", payload.password.as_deref(), MAX_FIELD_LEN)?;
    let phone_number = validation::required("phoneNumber", payload.phone_number.as_deref(), 15)?;
    let role = validation::required("role", payload.role.as_deref(), 16)?;

    let email = validation::normalize_email(&email)?;
    validation::validate_password(&password)?;
    let phone_number = validation::normalize_phone(&phone_number)?;
    let role = Role::from_str(&role).map_err(|err| AppError::bad_request(err.to_string()))?;
    if !role.is_self_registrable() {
        return Err(AppError::bad_request("role must be seeker or recruiter"));
    }

    let mut conn = state.db()?;

    let email_taken = users::table
        .filter(users::email.eq(&email))
        .select(users::id)
        .first::<Uuid>(&mut conn)
        .optional()?
        .is_some();
    if email_taken {
        return Err(AppError::conflict("user already exists"));
    }

    let new_user = NewUser {
        id: Uuid::new_v4(),
        full_name,
        email,
        phone_number,
        password_hash: password::hash_password(&password)?,
        role,
    };

    diesel::insert_into(users::table)
        .values(&new_user)
        .execute(&mut conn)
        .map_err(unique_user_violation)?;

    let user: User = users::table.find(new_user.id).first(&mut conn)?;
    info!(user_id = %user.id, role = %user.role, "user registered");

    let response = issue_session(&state, user, "user registered successfully")?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(AppError::bad_request("email and password are required"));
    };
    let expected_role = payload
        .role
        .as_deref()
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(Role::from_str)
        .transpose()
        .map_err(|err| AppError::bad_request(err.to_string()))?;

    let mut conn = state.db()?;
    let user: Option<User> = users::table
        .filter(users::email.eq(email.trim().to_lowercase()))
        .first(&mut conn)
        .optional()?;

    let password = password.trim();
    let Some(user) = user else {
        password::burn_verification(password);
        return Err(AppError::unauthorized("invalid email or password"));
    };

    let valid = password::verify_password(password, &user.password_hash)
        .map_err(|_| AppError::unauthorized("invalid email or password"))?;
    if !valid {
        return Err(AppError::unauthorized("invalid email or password"));
    }

    if let Some(expected) = expected_role {
        if expected != user.role {
            return Err(AppError::unauthorized(
                "role mismatch, please log in with the correct role",
            ));
        }
    }

    if !user.is_active {
        return Err(AppError::forbidden("account is deactivated"));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_session(&state, user, "login successful")?))
}

pub async fn me(actor: Actor) -> Json<UserEnvelope> {
    Json(UserEnvelope {
        success: true,
        user: actor.user.into(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = users)]
struct ProfileChangeset {
    full_name: Option<String>,
    phone_number: Option<String>,
    updated_at: NaiveDateTime,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
}

pub async fn update_profile(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let full_name = payload
        .full_name
        .map(|name| validation::required("fullName", Some(name.as_str()), MAX_NAME_LEN))
        .transpose()?;
    let phone_number = payload
        .phone_number
        .map(|phone| validation::normalize_phone(&phone))
        .transpose()?;

    let mut conn = state.db()?;
    let changeset = ProfileChangeset {
        full_name,
        phone_number,
        updated_at: Utc::now().naive_utc(),
    };
    let user: User = diesel::update(users::table.find(actor.id()))
        .set(&changeset)
        .get_result(&mut conn)
        .map_err(unique_user_violation)?;

    Ok(Json(ProfileResponse {
        success: true,
        message: "profile updated successfully".to_string(),
        user: user.into(),
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Photo,
    Resume,
}

impl UploadKind {
    fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(str::trim) {
            Some("photo") => Ok(UploadKind::Photo),
            Some("resume") => Ok(UploadKind::Resume),
            _ => Err(AppError::bad_request(
                "invalid file type, expected photo or resume",
            )),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            UploadKind::Photo => "photo",
            UploadKind::Resume => "resume",
        }
    }

    fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Photo => &["png", "jpg", "jpeg", "gif", "webp"],
            UploadKind::Resume => &["pdf", "doc", "docx"],
        }
    }
}

#[derive(Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file_url: String,
    pub user: UserResponse,
}

pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    actor: Actor,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let kind = UploadKind::parse(query.kind.as_deref())?;

    let mut upload: Option<(String, Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|err| {
            error!(error = %err, "failed to read uploaded file");
            AppError::bad_request(format!("failed to read file bytes: {err}"))
        })?;
        upload = Some((file_name, content_type, data.to_vec()));
    }

    let Some((file_name, content_type, bytes)) = upload else {
        return Err(AppError::bad_request("no file uploaded"));
    };
    if bytes.is_empty() {
        return Err(AppError::bad_request("uploaded file must not be empty"));
    }
    if bytes.len() > state.config.max_upload_bytes {
        return Err(AppError::bad_request(format!(
            "file exceeds the {} byte limit",
            state.config.max_upload_bytes
        )));
    }

    let extension = file_extension(&file_name)
        .filter(|ext| kind.allowed_extensions().contains(&ext.as_str()))
        .ok_or_else(|| {
            AppError::bad_request(format!(
                "{} must be one of: {}",
                kind.as_str(),
                kind.allowed_extensions().join(", ")
            ))
        })?;

    let key = object_key(actor.id(), kind, &file_name, Utc::now().timestamp_millis());
    let content_type = content_type.or_else(|| {
        Some(
            mime_guess::from_ext(&extension)
                .first_or_octet_stream()
                .to_string(),
        )
    });
    let disposition = match kind {
        UploadKind::Resume => inline_content_disposition(&file_name),
        UploadKind::Photo => None,
    };

    state
        .storage
        .put_object(&key, bytes, content_type, disposition)
        .await?;
    let file_url = state.storage.object_url(&key);

    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let target = users::table.find(actor.id());
    let user: User = match kind {
        UploadKind::Photo => diesel::update(target)
            .set((
                users::profile_photo.eq(Some(&file_url)),
                users::updated_at.eq(now),
            ))
            .get_result(&mut conn)?,
        UploadKind::Resume => diesel::update(target)
            .set((users::resume.eq(Some(&file_url)), users::updated_at.eq(now)))
            .get_result(&mut conn)?,
    };

    info!(user_id = %user.id, kind = kind.as_str(), key = %key, "file uploaded");

    let label = match kind {
        UploadKind::Photo => "profile photo",
        UploadKind::Resume => "resume",
    };
    Ok(Json(UploadResponse {
        success: true,
        message: format!("{label} uploaded successfully"),
        file_url,
        user: user.into(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedJobSummary {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub status: ApplicationStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedJobSummary {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub status: JobStatus,
    pub applicant_count: usize,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub success: bool,
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_jobs: Option<Vec<AppliedJobSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_jobs: Option<Vec<PostedJobSummary>>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<DashboardResponse>> {
    actor.authorize(Action::ViewDashboard)?;
    let mut conn = state.db()?;

    let (applied_jobs, posted_jobs) = match actor.role() {
        Role::Seeker => {
            let applied = applications::applications_of(&mut conn, actor.id())?
                .into_iter()
                .map(|(application, job)| AppliedJobSummary {
                    id: job.id,
                    title: job.title,
                    company: job.company,
                    location: job.location,
                    salary: job.salary,
                    status: application.status,
                })
                .collect();
            (Some(applied), None)
        }
        Role::Recruiter => {
            let posted: Vec<Job> = jobs::table
                .filter(jobs::posted_by.eq(actor.id()))
                .order(jobs::created_at.desc())
                .load(&mut conn)?;
            let posted = posted
                .into_iter()
                .map(|job| PostedJobSummary {
                    id: job.id,
                    applicant_count: job.applicants.len(),
                    title: job.title,
                    company: job.company,
                    location: job.location,
                    status: job.status,
                    created_at: to_iso(job.created_at),
                })
                .collect();
            (None, Some(posted))
        }
        Role::Admin => (None, None),
    };

    Ok(Json(DashboardResponse {
        success: true,
        user: actor.user.into(),
        applied_jobs,
        posted_jobs,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationJobSummary {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub description: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyApplicationResponse {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub applied_at: String,
    pub created_at: String,
    pub job: ApplicationJobSummary,
    pub recruiter: Option<PersonSummary>,
}

#[derive(Serialize)]
pub struct MyApplicationsResponse {
    pub success: bool,
    pub applications: Vec<MyApplicationResponse>,
}

pub async fn my_applications(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<MyApplicationsResponse>> {
    actor.authorize(Action::ListOwnApplications)?;
    let mut conn = state.db()?;
    let applications = load_applications_of(&mut conn, actor.id())?;
    Ok(Json(MyApplicationsResponse {
        success: true,
        applications,
    }))
}

pub(crate) fn load_applications_of(
    conn: &mut PgConnection,
    applicant_id: Uuid,
) -> AppResult<Vec<MyApplicationResponse>> {
    let rows = applications::applications_of(conn, applicant_id)?;

    let recruiter_ids: Vec<Uuid> = rows.iter().map(|(app, _)| app.recruiter_id).collect();
    let recruiters = load_people(conn, &recruiter_ids)?;

    Ok(rows
        .into_iter()
        .map(|(application, job)| MyApplicationResponse {
            id: application.id,
            status: application.status,
            applied_at: to_iso(application.applied_at),
            created_at: to_iso(application.created_at),
            recruiter: recruiters.get(&application.recruiter_id).cloned(),
            job: ApplicationJobSummary {
                id: job.id,
                title: job.title,
                company: job.company,
                location: job.location,
                salary: job.salary,
                description: job.description,
            },
        })
        .collect())
}

/// Batch-loads name/email summaries keyed by user id.
pub(crate) fn load_people(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> AppResult<HashMap<Uuid, PersonSummary>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let people: Vec<User> = users::table
        .filter(users::id.eq_any(ids))
        .load(conn)?;
    Ok(people
        .iter()
        .map(|user| (user.id, PersonSummary::from(user)))
        .collect())
}

fn issue_session(state: &AppState, user: User, message: &str) -> AppResult<AuthResponse> {
    let token = state.jwt.generate_token(user.id, user.role)?;
    Ok(AuthResponse {
        success: true,
        message: message.to_string(),
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expires_in_seconds(),
        user: user.into(),
    })
}

fn unique_user_violation(err: DieselError) -> AppError {
    match &err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name() == Some(PHONE_CONSTRAINT) =>
        {
            AppError::conflict("phone number already registered")
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            AppError::conflict("user already exists")
        }
        _ => AppError::from(err),
    }
}

fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.trim().to_ascii_lowercase();
    (!ext.is_empty()).then_some(ext)
}

fn object_key(user_id: Uuid, kind: UploadKind, file_name: &str, millis: i64) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => ch,
            _ => '_',
        })
        .collect();
    format!("uploads/{user_id}/{}/{millis}_{sanitized}", kind.as_str())
}

fn inline_content_disposition(filename: &str) -> Option<String> {
    if filename.is_empty() {
        return None;
    }

    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();

    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    Some(format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    ))
}
