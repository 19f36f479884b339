use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::jobs::{with_posters, ApplicantResponse, JobResponse, MessageResponse};
use super::to_iso;
use super::users::UserResponse;
use crate::access::Action;
use crate::applications;
use crate::auth::AdminActor;
use crate::enums::{ApplicationStatus, JobStatus, Role};
use crate::error::{AppError, AppResult};
use crate::filters::{AdminJobFilter, AdminJobQuery, UserFilter, UserListQuery};
use crate::models::{Job, JobApplication, User};
use crate::schema::{job_applications, jobs, users};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub job_seekers: i64,
    pub recruiters: i64,
    pub total_jobs: i64,
    pub active_jobs: i64,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub stats: DashboardStats,
}

pub async fn dashboard(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
) -> AppResult<Json<DashboardResponse>> {
    admin.authorize(Action::ViewStats)?;
    let mut conn = state.db()?;

    let count_role = |conn: &mut PgConnection, role: Role| -> QueryResult<i64> {
        users::table
            .filter(users::role.eq(role))
            .count()
            .get_result(conn)
    };

    let stats = DashboardStats {
        total_users: users::table.count().get_result(&mut conn)?,
        job_seekers: count_role(&mut conn, Role::Seeker)?,
        recruiters: count_role(&mut conn, Role::Recruiter)?,
        total_jobs: jobs::table.count().get_result(&mut conn)?,
        active_jobs: jobs::table
            .filter(jobs::status.eq(JobStatus::Active))
            .count()
            .get_result(&mut conn)?,
    };

    Ok(Json(DashboardResponse {
        success: true,
        stats,
    }))
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub count: usize,
    pub users: Vec<UserResponse>,
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<UserListResponse>> {
    admin.authorize(Action::ManageUsers)?;
    let filter = UserFilter::from_query(query)?;

    let mut conn = state.db()?;
    let users: Vec<User> = filter
        .apply(users::table.into_boxed())
        .order(users::created_at.desc())
        .load(&mut conn)?;

    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(UserListResponse {
        success: true,
        count: users.len(),
        users,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserStatusRequest {
    pub is_active: Option<bool>,
}

#[derive(Serialize)]
pub struct UserStatusResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
}

pub async fn update_user_status(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserStatusRequest>,
) -> AppResult<Json<UserStatusResponse>> {
    admin.authorize(Action::ManageUsers)?;
    let Some(is_active) = payload.is_active else {
        return Err(AppError::bad_request("isActive must be a boolean"));
    };
    if user_id == admin.id() && !is_active {
        return Err(AppError::bad_request("admins cannot deactivate their own account"));
    }

    let mut conn = state.db()?;
    let user: User = diesel::update(users::table.find(user_id))
        .set((
            users::is_active.eq(is_active),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    info!(admin_id = %admin.id(), user_id = %user.id, is_active, "user status changed");

    let message = if is_active {
        "user activated"
    } else {
        "user deactivated"
    };
    Ok(Json(UserStatusResponse {
        success: true,
        message: message.to_string(),
        user: user.into(),
    }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    admin.authorize(Action::ManageUsers)?;
    if user_id == admin.id() {
        return Err(AppError::bad_request("admins cannot delete their own account"));
    }

    let mut conn = state.db()?;
    if !applications::delete_user(&mut conn, user_id)? {
        return Err(AppError::not_found("user not found"));
    }

    info!(admin_id = %admin.id(), user_id = %user_id, "user deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: "user deleted successfully".to_string(),
    }))
}

#[derive(Serialize)]
pub struct AdminJobListResponse {
    pub success: bool,
    pub count: usize,
    pub jobs: Vec<JobResponse>,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
    Query(query): Query<AdminJobQuery>,
) -> AppResult<Json<AdminJobListResponse>> {
    admin.authorize(Action::ManageJobs)?;
    let filter = AdminJobFilter::from_query(query)?;

    let mut conn = state.db()?;
    let jobs: Vec<Job> = filter
        .apply(jobs::table.into_boxed())
        .order(jobs::created_at.desc())
        .load(&mut conn)?;
    let jobs = with_posters(&mut conn, jobs)?;

    Ok(Json(AdminJobListResponse {
        success: true,
        count: jobs.len(),
        jobs,
    }))
}

#[derive(Serialize)]
pub struct JobStatusResponse {
    pub success: bool,
    pub message: String,
    pub job: JobResponse,
}

pub async fn toggle_job_status(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<JobStatusResponse>> {
    admin.authorize(Action::ManageJobs)?;
    let mut conn = state.db()?;

    let job: Job = conn.transaction::<_, AppError, _>(|conn| {
        let current: JobStatus = jobs::table
            .find(job_id)
            .select(jobs::status)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("job not found"))?;

        Ok(diesel::update(jobs::table.find(job_id))
            .set((
                jobs::status.eq(current.toggled()),
                jobs::updated_at.eq(Utc::now().naive_utc()),
            ))
            .get_result(conn)?)
    })?;

    info!(admin_id = %admin.id(), job_id = %job.id, status = %job.status, "job status toggled");

    Ok(Json(JobStatusResponse {
        success: true,
        message: format!("job is now {}", job.status),
        job: job.into(),
    }))
}

pub async fn delete_job(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    admin.authorize(Action::ManageJobs)?;
    let mut conn = state.db()?;

    let deleted = diesel::delete(jobs::table.find(job_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found("job not found"));
    }

    info!(admin_id = %admin.id(), job_id = %job_id, "job deleted by admin");
    Ok(Json(MessageResponse {
        success: true,
        message: "job deleted successfully".to_string(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminApplicationResponse {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub applied_at: String,
    pub created_at: String,
    pub job: JobRef,
    pub applicant: ApplicantResponse,
}

#[derive(Serialize)]
pub struct AdminApplicationListResponse {
    pub success: bool,
    pub count: usize,
    pub applications: Vec<AdminApplicationResponse>,
}

pub async fn list_applications(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
) -> AppResult<Json<AdminApplicationListResponse>> {
    admin.authorize(Action::ManageApplications)?;
    let mut conn = state.db()?;

    let rows: Vec<(JobApplication, String, User)> = job_applications::table
        .inner_join(jobs::table)
        .inner_join(users::table)
        .order(job_applications::created_at.desc())
        .select((job_applications::all_columns, jobs::title, users::all_columns))
        .load(&mut conn)?;

    let applications: Vec<AdminApplicationResponse> = rows
        .into_iter()
        .map(|(application, title, applicant)| AdminApplicationResponse {
            id: application.id,
            status: application.status,
            applied_at: to_iso(application.applied_at),
            created_at: to_iso(application.created_at),
            job: JobRef {
                id: application.job_id,
                title,
            },
            applicant: ApplicantResponse {
                id: applicant.id,
                full_name: applicant.full_name,
                email: applicant.email,
                phone_number: applicant.phone_number,
                resume: applicant.resume,
            },
        })
        .collect();

    Ok(Json(AdminApplicationListResponse {
        success: true,
        count: applications.len(),
        applications,
    }))
}

pub async fn delete_application(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
    Path(application_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    admin.authorize(Action::ManageApplications)?;
    let mut conn = state.db()?;

    let application = applications::delete_application(&mut conn, application_id)?;

    info!(
        admin_id = %admin.id(),
        application_id = %application.id,
        job_id = %application.job_id,
        "application deleted by admin"
    );
    Ok(Json(MessageResponse {
        success: true,
        message: "application deleted successfully".to_string(),
    }))
}
