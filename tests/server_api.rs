mod common;

use anyhow::{Context, Result};

use caseboard::model::{Status, TestCase, TestCaseUpdate};

fn update(name: &str, priority: &str) -> TestCaseUpdate {
    TestCaseUpdate {
        test_case_name: name.to_string(),
        description: String::new(),
        status: Status::Unset,
        estimate_time: 10.0,
        module: "core".to_string(),
        priority: priority.to_string(),
        last_updated: "2026-01-01T00:00:00Z".to_string(),
    }
}

#[test]
fn create_read_update_roundtrip() -> Result<()> {
    let guard = common::spawn_server()?;
    let client = reqwest::blocking::Client::new();

    let health = client
        .get(format!("{}/healthz", guard.base_url))
        .send()
        .context("GET /healthz")?;
    assert!(health.status().is_success());

    // Empty store reads as an empty collection.
    let cases: Vec<TestCase> = client
        .get(format!("{}/testcases", guard.base_url))
        .send()
        .context("GET /testcases")?
        .json()
        .context("parse empty list")?;
    assert!(cases.is_empty());

    // Create two; the store hands out sequential numeric-string ids.
    for (name, prio) in [("login", "High"), ("logout", "Low")] {
        let resp = client
            .post(format!("{}/testcases", guard.base_url))
            .json(&update(name, prio))
            .send()
            .context("POST /testcases")?;
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    }

    let cases: Vec<TestCase> = client
        .get(format!("{}/testcases", guard.base_url))
        .send()?
        .json()
        .context("parse list")?;
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].id.as_str(), "1");
    assert_eq!(cases[1].id.as_str(), "2");
    assert_eq!(cases[0].test_case_name, "login");

    // Whole-record replace by id.
    let mut body = update("logout", "Critical");
    body.status = Status::Pass;
    let resp = client
        .put(format!("{}/testcases/2", guard.base_url))
        .json(&body)
        .send()
        .context("PUT /testcases/2")?;
    assert!(resp.status().is_success());

    let cases: Vec<TestCase> = client
        .get(format!("{}/testcases", guard.base_url))
        .send()?
        .json()?;
    assert_eq!(cases[1].priority, "Critical");
    assert_eq!(cases[1].status, Status::Pass);
    // Untouched row is untouched.
    assert_eq!(cases[0].priority, "High");

    Ok(())
}

#[test]
fn update_unknown_id_is_404() -> Result<()> {
    let guard = common::spawn_server()?;
    let client = reqwest::blocking::Client::new();

    let resp = client
        .put(format!("{}/testcases/99", guard.base_url))
        .json(&update("ghost", "Low"))
        .send()
        .context("PUT unknown id")?;
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    Ok(())
}

#[test]
fn mutations_survive_restart() -> Result<()> {
    let mut guard = common::spawn_server()?;
    let client = reqwest::blocking::Client::new();

    let resp = client
        .post(format!("{}/testcases", guard.base_url))
        .json(&update("boot", "Medium"))
        .send()?;
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let mut body = update("boot", "High");
    body.description = "cold boot".to_string();
    client
        .put(format!("{}/testcases/1", guard.base_url))
        .json(&body)
        .send()?
        .error_for_status()
        .context("PUT before restart")?;

    guard.restart()?;

    let cases: Vec<TestCase> = client
        .get(format!("{}/testcases", guard.base_url))
        .send()
        .context("GET after restart")?
        .json()?;
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].priority, "High");
    assert_eq!(cases[0].description, "cold boot");

    Ok(())
}
