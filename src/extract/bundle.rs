use std::path::Path;

use super::types::{
    ActionTestSummary, ExtractError, ExtractResult, InvocationRecord, TestPlanSummary,
};

/// Read access to one result bundle
///
/// Lookups return `Ok(None)` when the bundle has no such object and an error
/// only when the bundle itself cannot be queried. Implementations:
/// - [`XcResultFile`](super::XcResultFile) queries a bundle on disk through `xcresulttool`
/// - tests provide in-memory bundles
pub trait ResultBundle {
    /// Location of the bundle, for diagnostics
    fn path(&self) -> &Path;

    /// Root invocation record
    fn invocation_record(&self) -> ExtractResult<Option<InvocationRecord>>;

    /// Test plan run summaries stored under `id`
    fn test_plan_run_summaries(&self, id: &str) -> ExtractResult<Option<Vec<TestPlanSummary>>>;

    /// Detailed activity log stored under `id`
    fn action_test_summary(&self, id: &str) -> ExtractResult<Option<ActionTestSummary>>;

    /// Raw payload bytes stored under `id`
    fn payload(&self, id: &str) -> ExtractResult<Option<Vec<u8>>>;

    /// Id of the test plan run summaries referenced by the first action
    fn test_plan_summaries_id(&self) -> ExtractResult<Option<String>> {
        Ok(self
            .invocation_record()?
            .and_then(|record| record.actions.into_iter().next())
            .and_then(|action| action.tests_ref)
            .map(|reference| reference.id))
    }

    /// Every test plan configuration run recorded in the bundle
    ///
    /// Fails with [`ExtractError::NoTestPlanFound`] when the bundle does not
    /// reference any test plan; an unresolvable reference yields no summaries.
    fn test_plan_summaries(&self) -> ExtractResult<Vec<TestPlanSummary>> {
        let id = self
            .test_plan_summaries_id()?
            .ok_or_else(|| ExtractError::NoTestPlanFound {
                path: self.path().to_path_buf(),
            })?;
        Ok(self.test_plan_run_summaries(&id)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::types::{ActionRecord, Reference};
    use std::path::PathBuf;

    struct RecordOnly {
        path: PathBuf,
        record: Option<InvocationRecord>,
        summaries: Option<Vec<TestPlanSummary>>,
    }

    impl ResultBundle for RecordOnly {
        fn path(&self) -> &Path {
            &self.path
        }

        fn invocation_record(&self) -> ExtractResult<Option<InvocationRecord>> {
            Ok(self.record.clone())
        }

        fn test_plan_run_summaries(&self, id: &str) -> ExtractResult<Option<Vec<TestPlanSummary>>> {
            assert_eq!(id, "0~plan");
            Ok(self.summaries.clone())
        }

        fn action_test_summary(&self, _id: &str) -> ExtractResult<Option<ActionTestSummary>> {
            Ok(None)
        }

        fn payload(&self, _id: &str) -> ExtractResult<Option<Vec<u8>>> {
            Ok(None)
        }
    }

    fn bundle(actions: Vec<ActionRecord>, summaries: Option<Vec<TestPlanSummary>>) -> RecordOnly {
        RecordOnly {
            path: PathBuf::from("Run1.xcresult"),
            record: Some(InvocationRecord { actions }),
            summaries,
        }
    }

    #[test]
    fn test_summaries_id_from_first_action() {
        let b = bundle(
            vec![
                ActionRecord { tests_ref: Some(Reference::new("0~plan")) },
                ActionRecord { tests_ref: Some(Reference::new("0~other")) },
            ],
            None,
        );
        assert_eq!(b.test_plan_summaries_id().unwrap().as_deref(), Some("0~plan"));
    }

    #[test]
    fn test_no_test_plan_when_first_action_has_no_tests() {
        let b = bundle(
            vec![
                ActionRecord { tests_ref: None },
                ActionRecord { tests_ref: Some(Reference::new("0~plan")) },
            ],
            None,
        );
        let err = b.test_plan_summaries().unwrap_err();
        assert!(matches!(err, ExtractError::NoTestPlanFound { .. }));
    }

    #[test]
    fn test_no_test_plan_without_record() {
        let b = RecordOnly {
            path: PathBuf::from("Run1.xcresult"),
            record: None,
            summaries: None,
        };
        assert!(matches!(
            b.test_plan_summaries(),
            Err(ExtractError::NoTestPlanFound { .. })
        ));
    }

    #[test]
    fn test_unresolved_summaries_are_empty() {
        let b = bundle(vec![ActionRecord { tests_ref: Some(Reference::new("0~plan")) }], None);
        assert!(b.test_plan_summaries().unwrap().is_empty());
    }
}
