//! Writes that must keep `jobs.applicants` and `job_applications` in step.
//!
//! Every function here runs in a single transaction and locks the affected job
//! rows, so the embedded applicant list and the application rows never commit
//! independently of each other.

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use uuid::Uuid;

use crate::enums::ApplicationStatus;
use crate::error::AppError;
use crate::models::{Job, JobApplication, NewJobApplication, User};
use crate::schema::{job_applications, jobs, users};

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("job not found")]
    JobNotFound,
    #[error("application not found")]
    ApplicationNotFound,
    #[error("user not found")]
    ApplicantNotFound,
    #[error("already applied for this job")]
    AlreadyApplied,
    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

impl From<ApplicationError> for AppError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::JobNotFound
            | ApplicationError::ApplicationNotFound
            | ApplicationError::ApplicantNotFound => {
                AppError::not_found(value.to_string())
            }
            ApplicationError::AlreadyApplied => AppError::conflict(value.to_string()),
            ApplicationError::Database(err) => AppError::from(err),
        }
    }
}

/// Records `applicant_id` as an applicant of `job_id`.
///
/// The job row is locked for the duration, and the unique
/// `(job_id, applicant_id)` index backs up the pre-check against racing
/// submissions from other connections.
pub fn apply_to_job(
    conn: &mut PgConnection,
    job_id: Uuid,
    applicant_id: Uuid,
) -> ApplicationResult<JobApplication> {
    conn.transaction::<_, ApplicationError, _>(|conn| {
        let job: Job = jobs::table
            .find(job_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or(ApplicationError::JobNotFound)?;

        let existing = job_applications::table
            .filter(job_applications::job_id.eq(job_id))
            .filter(job_applications::applicant_id.eq(applicant_id))
            .select(job_applications::id)
            .first::<Uuid>(conn)
            .optional()?;
        if existing.is_some() {
            return Err(ApplicationError::AlreadyApplied);
        }

        let new_application = NewJobApplication {
            id: Uuid::new_v4(),
            job_id,
            applicant_id,
            recruiter_id: job.posted_by,
            status: ApplicationStatus::default(),
        };

        match diesel::insert_into(job_applications::table)
            .values(&new_application)
            .execute(conn)
        {
            Ok(_) => {}
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                return Err(ApplicationError::AlreadyApplied);
            }
            // The applicant was deleted while this insert waited on its row.
            Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => {
                return Err(ApplicationError::ApplicantNotFound);
            }
            Err(err) => return Err(err.into()),
        }

        let mut applicants = job.applicants;
        if !applicants.contains(&applicant_id) {
            applicants.push(applicant_id);
        }
        diesel::update(jobs::table.find(job_id))
            .set((
                jobs::applicants.eq(applicants),
                jobs::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;

        Ok(job_applications::table
            .find(new_application.id)
            .first(conn)?)
    })
}

/// Deletes one application and drops its applicant from the job's list.
pub fn delete_application(
    conn: &mut PgConnection,
    application_id: Uuid,
) -> ApplicationResult<JobApplication> {
    conn.transaction::<_, ApplicationError, _>(|conn| {
        let application: JobApplication = job_applications::table
            .find(application_id)
            .first(conn)
            .optional()?
            .ok_or(ApplicationError::ApplicationNotFound)?;

        let job: Option<Job> = jobs::table
            .find(application.job_id)
            .for_update()
            .first(conn)
            .optional()?;

        diesel::delete(job_applications::table.find(application_id)).execute(conn)?;

        if let Some(job) = job {
            remove_applicant(conn, job, application.applicant_id)?;
        }

        Ok(application)
    })
}

/// Hard-deletes a user. Their postings and applications go with them through
/// the foreign keys; their id is pulled out of every other job's list first.
/// Returns `false` when no such user exists.
///
/// The user row is locked before the jobs are selected. An application insert
/// that is still in flight holds a key-share lock on the same row, so this
/// waits for it to commit and then sees its applicant entry.
pub fn delete_user(conn: &mut PgConnection, user_id: Uuid) -> ApplicationResult<bool> {
    conn.transaction::<_, ApplicationError, _>(|conn| {
        let user: Option<User> = users::table
            .find(user_id)
            .for_update()
            .first(conn)
            .optional()?;
        if user.is_none() {
            return Ok(false);
        }

        let applied_jobs: Vec<Job> = jobs::table
            .filter(jobs::applicants.contains(vec![user_id]))
            .for_update()
            .load(conn)?;

        for job in applied_jobs {
            remove_applicant(conn, job, user_id)?;
        }

        let deleted = diesel::delete(users::table.find(user_id)).execute(conn)?;
        Ok(deleted > 0)
    })
}

fn remove_applicant(conn: &mut PgConnection, job: Job, applicant_id: Uuid) -> QueryResult<()> {
    let remaining: Vec<Uuid> = job
        .applicants
        .into_iter()
        .filter(|id| *id != applicant_id)
        .collect();
    diesel::update(jobs::table.find(job.id))
        .set((
            jobs::applicants.eq(remaining),
            jobs::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;
    Ok(())
}

/// Applicants of a job, derived from the application rows rather than the
/// job's embedded list. Rows whose applicant no longer exists drop out of the
/// join.
pub fn applicants_for_job(conn: &mut PgConnection, job_id: Uuid) -> QueryResult<Vec<User>> {
    job_applications::table
        .inner_join(users::table)
        .filter(job_applications::job_id.eq(job_id))
        .order(job_applications::applied_at.asc())
        .select(users::all_columns)
        .load(conn)
}

/// Every application of one seeker with its job, newest first.
pub fn applications_of(
    conn: &mut PgConnection,
    applicant_id: Uuid,
) -> QueryResult<Vec<(JobApplication, Job)>> {
    job_applications::table
        .inner_join(jobs::table)
        .filter(job_applications::applicant_id.eq(applicant_id))
        .order(job_applications::created_at.desc())
        .select((job_applications::all_columns, jobs::all_columns))
        .load(conn)
}
