use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::to_iso;
use super::users::{load_applications_of, load_people, MyApplicationsResponse, PersonSummary};
use crate::access::Action;
use crate::applications;
use crate::auth::Actor;
use crate::enums::{ApplicationStatus, JobCategory, JobStatus, JobType};
use crate::error::{AppError, AppResult};
use crate::filters::{JobFilter, JobListQuery};
use crate::models::{Job, NewJob};
use crate::schema::jobs;
use crate::state::AppState;
use crate::utils::patch::Patch;
use crate::validation::{self, MAX_FIELD_LEN, MAX_SALARY_LEN};

const MAX_DESCRIPTION_LEN: usize = 10_000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub description: String,
    pub job_type: JobType,
    pub category: JobCategory,
    pub status: JobStatus,
    pub posted_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<PersonSummary>,
    pub applicants: Vec<Uuid>,
    pub applicant_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl JobResponse {
    pub fn new(job: Job, poster: Option<PersonSummary>) -> Self {
        Self {
            id: job.id,
            title: job.title,
            company: job.company,
            location: job.location,
            salary: job.salary,
            description: job.description,
            job_type: job.job_type,
            category: job.category,
            status: job.status,
            posted_by: job.posted_by,
            poster,
            applicant_count: job.applicants.len(),
            applicants: job.applicants,
            created_at: to_iso(job.created_at),
            updated_at: to_iso(job.updated_at),
        }
    }
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self::new(job, None)
    }
}

#[derive(Serialize)]
pub struct JobListResponse {
    pub success: bool,
    pub count: usize,
    pub jobs: Vec<JobResponse>,
}

#[derive(Serialize)]
pub struct JobEnvelope {
    pub success: bool,
    pub message: String,
    pub job: JobResponse,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Attaches poster name/email to each job with one extra query.
pub(crate) fn with_posters(conn: &mut PgConnection, jobs: Vec<Job>) -> AppResult<Vec<JobResponse>> {
    let poster_ids: Vec<Uuid> = jobs.iter().map(|job| job.posted_by).collect();
    let posters = load_people(conn, &poster_ids)?;
    Ok(jobs
        .into_iter()
        .map(|job| {
            let poster = posters.get(&job.posted_by).cloned();
            JobResponse::new(job, poster)
        })
        .collect())
}

fn filtered_jobs(conn: &mut PgConnection, query: JobListQuery) -> AppResult<Vec<Job>> {
    let filter = JobFilter::from_query(query)?;
    let jobs = filter
        .apply(jobs::table.into_boxed())
        .order(jobs::created_at.desc())
        .load(conn)?;
    Ok(jobs)
}

fn find_job(conn: &mut PgConnection, job_id: Uuid) -> AppResult<Job> {
    jobs::table
        .find(job_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("job not found"))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> AppResult<Json<JobListResponse>> {
    let mut conn = state.db()?;
    let jobs = filtered_jobs(&mut conn, query)?;
    let jobs = with_posters(&mut conn, jobs)?;
    Ok(Json(JobListResponse {
        success: true,
        count: jobs.len(),
        jobs,
    }))
}

pub async fn search_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> AppResult<Json<JobListResponse>> {
    let mut conn = state.db()?;
    let jobs: Vec<JobResponse> = filtered_jobs(&mut conn, query)?
        .into_iter()
        .map(JobResponse::from)
        .collect();
    Ok(Json(JobListResponse {
        success: true,
        count: jobs.len(),
        jobs,
    }))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<JobEnvelope>> {
    let mut conn = state.db()?;
    let job = find_job(&mut conn, job_id)?;
    let job = with_posters(&mut conn, vec![job])?
        .pop()
        .ok_or_else(|| AppError::not_found("job not found"))?;
    Ok(Json(JobEnvelope {
        success: true,
        message: "job found".to_string(),
        job,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub job_type: Option<String>,
    pub category: Option<String>,
}

pub async fn create_job(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateJobRequest>,
) -> AppResult<(StatusCode, Json<JobEnvelope>)> {
    actor.authorize(Action::CreateJob)?;

    let new_job = NewJob {
        id: Uuid::new_v4(),
        title: validation::required("title", payload.title.as_deref(), MAX_FIELD_LEN)?,
        company: validation::required("company", payload.company.as_deref(), MAX_FIELD_LEN)?,
        location: validation::required("location", payload.location.as_deref(), MAX_FIELD_LEN)?,
        description: validation::required(
            "description",
            payload.description.as_deref(),
            MAX_DESCRIPTION_LEN,
        )?,
        salary: optional_salary(payload.salary)?,
        job_type: parse_optional::<JobType>(payload.job_type)?.unwrap_or_default(),
        category: parse_optional::<JobCategory>(payload.category)?.unwrap_or_default(),
        posted_by: actor.id(),
    };

    let mut conn = state.db()?;
    let job: Job = diesel::insert_into(jobs::table)
        .values(&new_job)
        .get_result(&mut conn)?;

    info!(job_id = %job.id, recruiter_id = %actor.id(), "job posted");

    Ok((
        StatusCode::CREATED,
        Json(JobEnvelope {
            success: true,
            message: "job posted successfully".to_string(),
            job: job.into(),
        }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub salary: Patch<String>,
    pub job_type: Option<String>,
    pub category: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = jobs)]
struct JobChangeset {
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    description: Option<String>,
    salary: Option<Option<String>>,
    job_type: Option<JobType>,
    category: Option<JobCategory>,
    updated_at: NaiveDateTime,
}

impl JobChangeset {
    fn from_request(payload: UpdateJobRequest) -> AppResult<Self> {
        let text = |field: &str, value: Option<String>, max_len: usize| {
            value
                .map(|raw| validation::required(field, Some(raw.as_str()), max_len))
                .transpose()
        };
        let salary = match payload.salary.into_change() {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) => Some(optional_salary(Some(raw))?),
        };
        Ok(Self {
            title: text("title", payload.title, MAX_FIELD_LEN)?,
            company: text("company", payload.company, MAX_FIELD_LEN)?,
            location: text("location", payload.location, MAX_FIELD_LEN)?,
            description: text("description", payload.description, MAX_DESCRIPTION_LEN)?,
            salary,
            job_type: parse_optional(payload.job_type)?,
            category: parse_optional(payload.category)?,
            updated_at: Utc::now().naive_utc(),
        })
    }
}

pub async fn update_job(
    State(state): State<AppState>,
    actor: Actor,
    Path(job_id): Path<Uuid>,
    Json(payload): Json<UpdateJobRequest>,
) -> AppResult<Json<JobEnvelope>> {
    actor.authorize(Action::UpdateJob)?;
    let changeset = JobChangeset::from_request(payload)?;

    let mut conn = state.db()?;
    let job = find_job(&mut conn, job_id)?;
    actor.authorize_owned(Action::UpdateJob, job.posted_by)?;

    let job: Job = diesel::update(jobs::table.find(job_id))
        .set(&changeset)
        .get_result(&mut conn)?;

    info!(job_id = %job.id, recruiter_id = %actor.id(), "job updated");

    Ok(Json(JobEnvelope {
        success: true,
        message: "job updated successfully".to_string(),
        job: job.into(),
    }))
}

pub async fn delete_job(
    State(state): State<AppState>,
    actor: Actor,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    actor.authorize(Action::DeleteJob)?;

    let mut conn = state.db()?;
    let job = find_job(&mut conn, job_id)?;
    actor.authorize_owned(Action::DeleteJob, job.posted_by)?;

    diesel::delete(jobs::table.find(job_id)).execute(&mut conn)?;
    info!(job_id = %job_id, recruiter_id = %actor.id(), "job deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: "job deleted successfully".to_string(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub recruiter_id: Uuid,
    pub status: ApplicationStatus,
    pub applied_at: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct ApplyResponse {
    pub success: bool,
    pub message: String,
    pub application: ApplicationResponse,
}

pub async fn apply_to_job(
    State(state): State<AppState>,
    actor: Actor,
    Path(job_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<ApplyResponse>)> {
    actor.authorize(Action::ApplyToJob)?;

    let mut conn = state.db()?;
    let application = applications::apply_to_job(&mut conn, job_id, actor.id())?;

    info!(
        job_id = %job_id,
        applicant_id = %actor.id(),
        application_id = %application.id,
        "application submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApplyResponse {
            success: true,
            message: "application submitted successfully".to_string(),
            application: ApplicationResponse {
                id: application.id,
                job_id: application.job_id,
                applicant_id: application.applicant_id,
                recruiter_id: application.recruiter_id,
                status: application.status,
                applied_at: to_iso(application.applied_at),
                created_at: to_iso(application.created_at),
            },
        }),
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub resume: Option<String>,
}

#[derive(Serialize)]
pub struct ApplicantsResponse {
    pub success: bool,
    pub count: usize,
    pub applicants: Vec<ApplicantResponse>,
}

pub async fn list_applicants(
    State(state): State<AppState>,
    actor: Actor,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<ApplicantsResponse>> {
    actor.authorize(Action::ListApplicants)?;

    let mut conn = state.db()?;
    let job = find_job(&mut conn, job_id)?;
    actor.authorize_owned(Action::ListApplicants, job.posted_by)?;

    let applicants: Vec<ApplicantResponse> = applications::applicants_for_job(&mut conn, job_id)?
        .into_iter()
        .map(|user| ApplicantResponse {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            phone_number: user.phone_number,
            resume: user.resume,
        })
        .collect();

    Ok(Json(ApplicantsResponse {
        success: true,
        count: applicants.len(),
        applicants,
    }))
}

pub async fn applied_jobs(
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

fn optional_salary(raw: Option<String>) -> AppResult<Option<String>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_SALARY_LEN {
        return Err(AppError::bad_request(format!(
            "salary must be at most {MAX_SALARY_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

fn parse_optional<T>(raw: Option<String>) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.parse::<T>().map_err(|err| AppError::bad_request(err.to_string())))
        .transpose()
}
