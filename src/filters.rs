//! Listing filters, parsed from query strings and validated before any query
//! is built. Empty parameters count as absent.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::Deserialize;

use crate::enums::{JobCategory, JobStatus, JobType, Role};
use crate::error::{AppError, AppResult};
use crate::schema::{jobs, users};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListQuery {
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

/// Public listing filter. Without `status` both active and inactive
/// postings are returned.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JobFilter {
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub category: Option<JobCategory>,
    pub status: Option<JobStatus>,
}

impl JobFilter {
    pub fn from_query(query: JobListQuery) -> AppResult<Self> {
        Ok(Self {
            keyword: non_empty(query.keyword),
            location: non_empty(query.location),
            job_type: parse_enum(query.job_type)?,
            category: parse_enum(query.category)?,
            status: parse_enum(query.status)?,
        })
    }

    pub fn apply<'a>(&self, mut query: jobs::BoxedQuery<'a, Pg>) -> jobs::BoxedQuery<'a, Pg> {
        if let Some(keyword) = &self.keyword {
            let pattern = contains_pattern(keyword);
            query = query.filter(
                jobs::title
                    .ilike(pattern.clone())
                    .or(jobs::company.ilike(pattern.clone()))
                    .or(jobs::description.ilike(pattern)),
            );
        }
        if let Some(location) = &self.location {
            query = query.filter(jobs::location.ilike(contains_pattern(location)));
        }
        if let Some(job_type) = self.job_type {
            query = query.filter(jobs::job_type.eq(job_type));
        }
        if let Some(category) = self.category {
            query = query.filter(jobs::category.eq(category));
        }
        if let Some(status) = self.status {
            query = query.filter(jobs::status.eq(status));
        }
        query
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub role: Option<String>,
    pub is_active: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub created: DateRange,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn from_query(query: UserListQuery) -> AppResult<Self> {
        let is_active = match non_empty(query.is_active).as_deref() {
            None => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => {
                return Err(AppError::bad_request(format!(
                    "isActive must be true or false, got '{other}'"
                )))
            }
        };
        Ok(Self {
            role: parse_enum(query.role)?,
            is_active,
            created: DateRange::parse(query.start_date, query.end_date)?,
            search: non_empty(query.search),
        })
    }

    pub fn apply<'a>(&self, mut query: users::BoxedQuery<'a, Pg>) -> users::BoxedQuery<'a, Pg> {
        if let Some(role) = self.role {
            query = query.filter(users::role.eq(role));
        }
        if let Some(is_active) = self.is_active {
            query = query.filter(users::is_active.eq(is_active));
        }
        if let Some(start) = self.created.start {
            query = query.filter(users::created_at.ge(start));
        }
        if let Some(end) = self.created.end {
            query = query.filter(users::created_at.le(end));
        }
        if let Some(search) = &self.search {
            let pattern = contains_pattern(search);
            query = query.filter(
                users::full_name
                    .ilike(pattern.clone())
                    .or(users::email.ilike(pattern)),
            );
        }
        query
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminJobQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AdminJobFilter {
    pub search: Option<String>,
    pub status: Option<JobStatus>,
    pub created: DateRange,
}

impl AdminJobFilter {
    pub fn from_query(query: AdminJobQuery) -> AppResult<Self> {
        Ok(Self {
            search: non_empty(query.search),
            status: parse_enum(query.status)?,
            created: DateRange::parse(query.start_date, query.end_date)?,
        })
    }

    pub fn apply<'a>(&self, mut query: jobs::BoxedQuery<'a, Pg>) -> jobs::BoxedQuery<'a, Pg> {
        if let Some(search) = &self.search {
            let pattern = contains_pattern(search);
            query = query.filter(
                jobs::title
                    .ilike(pattern.clone())
                    .or(jobs::company.ilike(pattern)),
            );
        }
        if let Some(status) = self.status {
            query = query.filter(jobs::status.eq(status));
        }
        if let Some(start) = self.created.start {
            query = query.filter(jobs::created_at.ge(start));
        }
        if let Some(end) = self.created.end {
            query = query.filter(jobs::created_at.le(end));
        }
        query
    }
}

/// Inclusive creation-time window. A bare `YYYY-MM-DD` end date covers the
/// whole day.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn parse(start: Option<String>, end: Option<String>) -> AppResult<Self> {
        let start = non_empty(start)
            .map(|value| parse_date_bound("startDate", &value, false))
            .transpose()?;
        let end = non_empty(end)
            .map(|value| parse_date_bound("endDate", &value, true))
            .transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AppError::bad_request("startDate must not be after endDate"));
            }
        }
        Ok(Self { start, end })
    }
}

fn parse_date_bound(field: &str, value: &str, end_of_day: bool) -> AppResult<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_utc());
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AppError::bad_request(format!(
            "{field} must be a YYYY-MM-DD date or an RFC 3339 timestamp"
        ))
    })?;
    let bound = if end_of_day {
        date.and_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    bound.ok_or_else(|| AppError::bad_request(format!("{field} is out of range")))
}

fn parse_enum<T>(value: Option<String>) -> AppResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    non_empty(value)
        .map(|raw| raw.parse::<T>().map_err(|err| AppError::bad_request(err.to_string())))
        .transpose()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

/// Escapes LIKE metacharacters so user input only ever matches literally.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn contains_pattern(raw: &str) -> String {
    format!("%{}%", escape_like(raw))
}
