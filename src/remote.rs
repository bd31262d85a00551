use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::model::{RecordId, TestCase, TestCaseUpdate};

/// Seam to the remote record store. The sync engine only ever needs the two
/// operations of the store's HTTP contract, and tests substitute a recording
/// mock here.
///
/// Both operations are single best-effort attempts: failures are surfaced to
/// the caller, never retried internally.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn fetch_all(&self) -> Result<Vec<TestCase>>;
    async fn update(&self, id: &RecordId, update: &TestCaseUpdate) -> Result<()>;
}

/// HTTP client for the record store.
pub struct StoreClient {
    base_url: String,
    client: reqwest::Client,
}

impl StoreClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("caseboard")
            .build()
            .context("build reqwest client")?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl RecordStore for StoreClient {
    async fn fetch_all(&self) -> Result<Vec<TestCase>> {
        let resp = self
            .client
            .get(self.url("/testcases"))
            .send()
            .await
            .context("fetch test cases")?;

        let cases: Vec<TestCase> = resp
            .error_for_status()
            .context("fetch test cases status")?
            .json()
            .await
            .context("parse test cases")?;
        Ok(cases)
    }

    async fn update(&self, id: &RecordId, update: &TestCaseUpdate) -> Result<()> {
        let resp = self
            .client
            .put(self.url(&format!("/testcases/{}", id)))
            .json(update)
            .send()
            .await
            .with_context(|| format!("update test case {}", id))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            anyhow::bail!("test case {} not found on remote store", id);
        }

        resp.error_for_status()
            .with_context(|| format!("update test case {} status", id))?;
        Ok(())
    }
}
