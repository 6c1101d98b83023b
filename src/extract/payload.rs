use super::bundle::ResultBundle;
use super::types::{ExtractError, ExtractResult, Field, ItemContext, LeafTest};
use crate::config::ATTACHMENT_CONTAINER_ACTIVITY;

/// Payload id of the screenshot attached to the test summary `summary_id`
///
/// Takes the first attachment-container activity, then its first attachment
/// carrying a payload reference.
pub fn screenshot_payload_id(
    bundle: &dyn ResultBundle,
    summary_id: &str,
    context: &ItemContext,
) -> ExtractResult<String> {
    let summary = bundle
        .action_test_summary(summary_id)?
        .ok_or_else(|| ExtractError::missing(context.clone(), Field::TestSummary))?;

    let container = summary
        .activity_summaries
        .into_iter()
        .find(|activity| activity.activity_type == ATTACHMENT_CONTAINER_ACTIVITY)
        .ok_or_else(|| ExtractError::missing(context.clone(), Field::AttachmentContainer))?;

    container
        .attachments
        .into_iter()
        .find_map(|attachment| attachment.payload_ref)
        .map(|reference| reference.id)
        .ok_or_else(|| ExtractError::missing(context.clone(), Field::PayloadRef))
}

/// Fetch the screenshot bytes captured by `test`
pub fn resolve_payload(
    bundle: &dyn ResultBundle,
    test: &LeafTest,
    context: &ItemContext,
) -> ExtractResult<Vec<u8>> {
    let summary_id = test
        .summary_ref
        .as_ref()
        .map(|reference| reference.id.as_str())
        .ok_or_else(|| ExtractError::missing(context.clone(), Field::SummaryRef))?;

    let payload_id = screenshot_payload_id(bundle, summary_id, context)?;

    bundle
        .payload(&payload_id)?
        .ok_or_else(|| ExtractError::PayloadFetch {
            context: context.clone(),
        })
}
