use anyhow::{Result, bail};

use crate::model::{FieldEdit, RecordId, TestCase, now_ts};

/// In-memory, UI-authoritative copy of all test cases.
///
/// Populated once by the bulk fetch, then mutated field-by-field via `apply`.
/// Row order is stable for the lifetime of the session; editing never
/// reorders records.
#[derive(Debug, Default)]
pub struct EditBuffer {
    cases: Vec<TestCase>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire buffer with the result of a bulk read.
    ///
    /// Duplicate ids would make `apply`/`snapshot` ambiguous, so they are
    /// rejected here rather than silently deduplicated.
    pub fn load(&mut self, cases: Vec<TestCase>) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for case in &cases {
            if !seen.insert(case.id.clone()) {
                bail!("duplicate test case id {} in bulk read", case.id);
            }
        }
        self.cases = cases;
        Ok(())
    }

    /// Apply one field edit and recompute `last_updated`.
    ///
    /// This is the optimistic-update path: it is synchronous and the caller
    /// renders the returned record immediately, before any write-back runs.
    /// Ids originate from the buffer itself, so a miss is a defensive fault.
    pub fn apply(&mut self, id: &RecordId, edit: FieldEdit) -> Result<&TestCase> {
        let Some(case) = self.cases.iter_mut().find(|c| &c.id == id) else {
            bail!("test case {} not found in buffer", id);
        };
        edit.apply_to(case);
        case.last_updated = now_ts();
        Ok(case)
    }

    /// Current buffered state for `id`. Read at write-back time so the
    /// transmitted record reflects every edit made during the debounce
    /// window, not the state when the timer was first started.
    pub fn snapshot(&self, id: &RecordId) -> Option<&TestCase> {
        self.cases.iter().find(|c| &c.id == id)
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    fn case(id: &str, name: &str) -> TestCase {
        TestCase {
            id: RecordId::from(id),
            test_case_name: name.to_string(),
            description: String::new(),
            status: Status::Unset,
            estimate_time: 0.0,
            module: String::new(),
            priority: "Low".to_string(),
            last_updated: String::new(),
        }
    }

    #[test]
    fn apply_then_snapshot_returns_applied_value() {
        let mut buf = EditBuffer::new();
        buf.load(vec![case("1", "boot"), case("2", "login")]).unwrap();

        let updated = buf
            .apply(&RecordId::from("2"), FieldEdit::Priority("High".to_string()))
            .unwrap();
        assert_eq!(updated.priority, "High");
        assert!(!updated.last_updated.is_empty());

        let snap = buf.snapshot(&RecordId::from("2")).unwrap();
        assert_eq!(snap.priority, "High");
    }

    #[test]
    fn apply_does_not_reorder_rows() {
        let mut buf = EditBuffer::new();
        buf.load(vec![case("1", "a"), case("2", "b"), case("3", "c")])
            .unwrap();

        buf.apply(&RecordId::from("3"), FieldEdit::Module("core".to_string()))
            .unwrap();
        buf.apply(&RecordId::from("1"), FieldEdit::Module("net".to_string()))
            .unwrap();

        let ids: Vec<&str> = buf.cases().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn apply_unknown_id_fails() {
        let mut buf = EditBuffer::new();
        buf.load(vec![case("1", "a")]).unwrap();

        let err = buf
            .apply(&RecordId::from("9"), FieldEdit::Description("x".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn load_rejects_duplicate_ids() {
        let mut buf = EditBuffer::new();
        let err = buf.load(vec![case("1", "a"), case("1", "b")]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn empty_bulk_read_yields_empty_buffer() {
        let mut buf = EditBuffer::new();
        buf.load(Vec::new()).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn load_replaces_previous_contents() {
        let mut buf = EditBuffer::new();
        buf.load(vec![case("1", "a"), case("2", "b")]).unwrap();
        buf.load(vec![case("3", "c")]).unwrap();
        assert_eq!(buf.len(), 1);
        assert!(buf.snapshot(&RecordId::from("1")).is_none());
        assert!(buf.snapshot(&RecordId::from("3")).is_some());
    }
}
