mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use common::{acquire_db_lock, TestApp};
use diesel::prelude::*;
use jobboard::applications::{self, ApplicationError};

const APPLY_ATTEMPTS: usize = 8;

#[tokio::test]
async fn concurrent_applies_record_exactly_one_application() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (_, recruiter) = app
        .register("Rex", "rex@example.com", "0200000000", "recruiter")
        .await?;
    let (seeker_id, _) = app
        .register("Sia", "sia@example.com", "0100000000", "seeker")
        .await?;
    let job_id = app.create_job(&recruiter, "Tester", "Full-Time").await?;

    let pool = app.state.pool.clone();
    let outcomes = tokio::task::spawn_blocking(move || {
        // Threads line up before taking a connection; the pool is smaller
        // than the number of attempts.
        let barrier = Arc::new(Barrier::new(APPLY_ATTEMPTS));
        let handles: Vec<_> = (0..APPLY_ATTEMPTS)
            .map(|_| {
                let pool = pool.clone();
                let barrier = barrier.clone();
                thread::spawn(move || -> Result<Result<(), ApplicationError>> {
                    barrier.wait();
                    let mut conn = pool.get().map_err(|err| anyhow!("no connection: {err}"))?;
                    Ok(applications::apply_to_job(&mut conn, job_id, seeker_id).map(|_| ()))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow!("apply thread panicked"))
                    .and_then(|outcome| outcome)
            })
            .collect::<Result<Vec<_>>>()
    })
    .await??;

    let created = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(created, 1);
    for outcome in &outcomes {
        assert!(
            matches!(outcome, Ok(()) | Err(ApplicationError::AlreadyApplied)),
            "unexpected outcome: {outcome:?}"
        );
    }
    assert_eq!(app.application_count(job_id).await?, 1);
    assert_eq!(app.job_applicants(job_id).await?, vec![seeker_id]);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn deleting_a_user_waits_for_an_in_flight_application() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (_, recruiter) = app
        .register("Rex", "rex@example.com", "0200000000", "recruiter")
        .await?;
    let (seeker_id, _) = app
        .register("Sia", "sia@example.com", "0100000000", "seeker")
        .await?;
    let job_id = app.create_job(&recruiter, "Tester", "Full-Time").await?;

    let apply_pool = app.state.pool.clone();
    let apply = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = apply_pool
            .get()
            .map_err(|err| anyhow!("no connection: {err}"))?;
        // Hold the application uncommitted while the deletion starts.
        conn.transaction::<_, ApplicationError, _>(|conn| {
            applications::apply_to_job(conn, job_id, seeker_id)?;
            thread::sleep(Duration::from_millis(1500));
            Ok(())
        })?;
        Ok(())
    });

    let delete_pool = app.state.pool.clone();
    let delete = tokio::task::spawn_blocking(move || -> Result<bool> {
        thread::sleep(Duration::from_millis(300));
        let mut conn = delete_pool
            .get()
            .map_err(|err| anyhow!("no connection: {err}"))?;
        Ok(applications::delete_user(&mut conn, seeker_id)?)
    });

    let (applied, deleted) = tokio::join!(apply, delete);
    applied??;
    assert!(deleted??);

    assert!(app.job_applicants(job_id).await?.is_empty());
    assert_eq!(app.application_count(job_id).await?, 0);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn applying_as_a_missing_user_is_not_found() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (_, recruiter) = app
        .register("Rex", "rex@example.com", "0200000000", "recruiter")
        .await?;
    let job_id = app.create_job(&recruiter, "Tester", "Full-Time").await?;

    let pool = app.state.pool.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut conn = pool.get().map_err(|err| anyhow!("no connection: {err}"))?;
        Ok(applications::apply_to_job(&mut conn, job_id, uuid::Uuid::new_v4()))
    })
    .await??;

    assert!(matches!(outcome, Err(ApplicationError::ApplicantNotFound)));
    assert!(app.job_applicants(job_id).await?.is_empty());
    assert_eq!(app.application_count(job_id).await?, 0);

    app.cleanup().await?;
    Ok(())
}
