mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, json_body, TestApp};

#[tokio::test]
async fn seeker_applies_and_recruiter_sees_applicant() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (bob_id, bob) = app
        .register("Bob", "bob@example.com", "0100000000", "recruiter")
        .await?;
    let (alice_id, alice) = app
        .register("Alice", "alice@example.com", "0200000000", "seeker")
        .await?;
    let job_id = app.create_job(&bob, "Platform Engineer", "Full-Time").await?;

    let (status, body) = json_body(
        app.post_json(&format!("/api/jobs/{job_id}/apply"), &(), Some(&alice))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["application"]["status"], "Under Review");
    assert_eq!(body["application"]["recruiterId"], bob_id.to_string());
    assert_eq!(app.job_applicants(job_id).await?, vec![alice_id]);

    let (status, body) = json_body(
        app.get(&format!("/api/jobs/{job_id}/applicants"), Some(&bob))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["applicants"][0]["id"], alice_id.to_string());
    assert_eq!(body["applicants"][0]["email"], "alice@example.com");

    let (status, body) =
        json_body(app.get("/api/user/applications", Some(&alice)).await?).await?;
    assert_eq!(status, StatusCode::OK);
    let applications = body["applications"].as_array().unwrap();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0]["job"]["title"], "Platform Engineer");
    assert_eq!(applications[0]["recruiter"]["fullName"], "Bob");

    let (status, body) = json_body(app.get("/api/jobs/applied/me", Some(&alice)).await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applications"][0]["job"]["id"], job_id.to_string());

    let (_, body) = json_body(app.get("/api/user/dashboard", Some(&alice)).await?).await?;
    assert_eq!(body["appliedJobs"][0]["title"], "Platform Engineer");
    assert_eq!(body["appliedJobs"][0]["status"], "Under Review");

    let (_, body) = json_body(app.get("/api/user/dashboard", Some(&bob)).await?).await?;
    assert_eq!(body["postedJobs"][0]["applicantCount"], 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn applying_twice_conflicts_and_leaves_state_unchanged() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (_, recruiter) = app
        .register("Rex", "rex@example.com", "0300000000", "recruiter")
        .await?;
    let (seeker_id, seeker) = app
        .register("Sia", "sia@example.com", "0400000000", "seeker")
        .await?;
    let job_id = app.create_job(&recruiter, "QA", "Part-Time").await?;
    let path = format!("/api/jobs/{job_id}/apply");

    let (status, _) = json_body(app.post_json(&path, &(), Some(&seeker)).await?).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = json_body(app.post_json(&path, &(), Some(&seeker)).await?).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "already applied for this job");

    assert_eq!(app.job_applicants(job_id).await?, vec![seeker_id]);
    assert_eq!(app.application_count(job_id).await?, 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn application_rules_by_role_and_ownership() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (_, owner) = app
        .register("Olga", "olga@example.com", "0500000000", "recruiter")
        .await?;
    let (_, other) = app
        .register("Otto", "otto@example.com", "0600000000", "recruiter")
        .await?;
    let (_, seeker) = app
        .register("Sven", "sven@example.com", "0700000000", "seeker")
        .await?;
    let job_id = app.create_job(&owner, "Analyst", "Full-Time").await?;

    let (status, _) = json_body(
        app.post_json(&format!("/api/jobs/{job_id}/apply"), &(), Some(&other))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.application_count(job_id).await?, 0);

    let missing = uuid::Uuid::new_v4();
    let (status, body) = json_body(
        app.post_json(&format!("/api/jobs/{missing}/apply"), &(), Some(&seeker))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "job not found");

    let (status, _) = json_body(
        app.get(&format!("/api/jobs/{job_id}/applicants"), Some(&other))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = json_body(
        app.get(&format!("/api/jobs/{job_id}/applicants"), Some(&seeker))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = json_body(app.get("/api/jobs/applied/me", Some(&owner)).await?).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "recruiter accounts are not allowed to list applications"
    );

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn deleting_a_job_removes_its_applications() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (_, recruiter) = app
        .register("Ria", "ria@example.com", "0800000000", "recruiter")
        .await?;
    let (_, seeker) = app
        .register("Sol", "sol@example.com", "0900000000", "seeker")
        .await?;
    let job_id = app.create_job(&recruiter, "Support", "Full-Time").await?;
    json_body(
        app.post_json(&format!("/api/jobs/{job_id}/apply"), &(), Some(&seeker))
            .await?,
    )
    .await?;

    let (status, _) =
        json_body(app.delete(&format!("/api/jobs/{job_id}"), Some(&recruiter)).await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.application_count(job_id).await?, 0);

    let (_, body) = json_body(app.get("/api/user/applications", Some(&seeker)).await?).await?;
    assert_eq!(body["applications"].as_array().unwrap().len(), 0);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn applicant_listing_reads_application_rows() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (_, recruiter) = app
        .register("Rita", "rita@example.com", "0110000000", "recruiter")
        .await?;
    let (seeker_id, seeker) = app
        .register("Sami", "sami@example.com", "0120000000", "seeker")
        .await?;
    let job_id = app.create_job(&recruiter, "Editor", "Part-Time").await?;

    let (status, _) = json_body(
        app.post_json(&format!("/api/jobs/{job_id}/apply"), &(), Some(&seeker))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    // A stale or tampered array must not leak into the listing.
    app.set_job_applicants(job_id, vec![uuid::Uuid::new_v4(), uuid::Uuid::new_v4()])
        .await?;

    let (status, body) = json_body(
        app.get(&format!("/api/jobs/{job_id}/applicants"), Some(&recruiter))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["applicants"].as_array().unwrap().len(), 1);
    assert_eq!(body["applicants"][0]["id"], seeker_id.to_string());

    app.cleanup().await?;
    Ok(())
}
