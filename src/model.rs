use serde::{Deserialize, Serialize};

/// Store-assigned identifier for a test case. Opaque to the editor; the
/// reference server hands out numeric strings, but nothing here relies on it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

/// Pass/fail state of a case. The wire values are the ones the original
/// select control submits: empty string for unset, "true"/"false" otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "")]
    Unset,
    #[serde(rename = "true")]
    Pass,
    #[serde(rename = "false")]
    Fail,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Unset => "SELECT",
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
        }
    }

    /// Next state in the UI cycling order.
    pub fn cycled(self) -> Status {
        match self {
            Status::Unset => Status::Pass,
            Status::Pass => Status::Fail,
            Status::Fail => Status::Unset,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCase {
    pub id: RecordId,
    pub test_case_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: Status,

    /// Estimate in minutes; rendered without a unit suffix.
    #[serde(default)]
    pub estimate_time: f64,

    #[serde(default)]
    pub module: String,

    #[serde(default)]
    pub priority: String,

    #[serde(default)]
    pub last_updated: String,
}

/// Body of `PUT /testcases/{id}`: every field except the id, which addresses
/// the target. Whole-record replace, no partial-field semantics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCaseUpdate {
    pub test_case_name: String,
    pub description: String,
    pub status: Status,
    pub estimate_time: f64,
    pub module: String,
    pub priority: String,
    pub last_updated: String,
}

impl From<&TestCase> for TestCaseUpdate {
    fn from(case: &TestCase) -> Self {
        TestCaseUpdate {
            test_case_name: case.test_case_name.clone(),
            description: case.description.clone(),
            status: case.status,
            estimate_time: case.estimate_time,
            module: case.module.clone(),
            priority: case.priority.clone(),
            last_updated: case.last_updated.clone(),
        }
    }
}

/// A single-field edit, typed per field so the buffer never has to parse.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldEdit {
    TestCaseName(String),
    Description(String),
    Status(Status),
    EstimateTime(f64),
    Module(String),
    Priority(String),
}

impl FieldEdit {
    pub(crate) fn apply_to(self, case: &mut TestCase) {
        match self {
            FieldEdit::TestCaseName(v) => case.test_case_name = v,
            FieldEdit::Description(v) => case.description = v,
            FieldEdit::Status(v) => case.status = v,
            FieldEdit::EstimateTime(v) => case.estimate_time = v,
            FieldEdit::Module(v) => case.module = v,
            FieldEdit::Priority(v) => case.priority = v,
        }
    }
}

pub fn now_ts() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "<time>".to_string())
}
