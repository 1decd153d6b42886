use anyhow::Result;
use chrono::Utc;
use faqbase::audit::AnalyticsEntry;
use faqbase::{Channel, CoreError, FaqPatch, MatchMethod, NewFaqInput, PublishTarget};
use uuid::Uuid;

use crate::support::{draft_input, Workspace};

fn foreign_brand_input() -> NewFaqInput {
    NewFaqInput {
        question: "Pre-sales discount policy?".to_string(),
        canonical_answer: "Ask the sales desk.".to_string(),
        brands: vec!["brand-b".to_string()],
        channels: vec![Channel::PreSales],
        ..NewFaqInput::default()
    }
}

#[test]
fn editors_cannot_touch_faqs_outside_their_brands() -> Result<()> {
    let ws = Workspace::new();
    let faq = ws.service.create_faq(foreign_brand_input(), &ws.admin)?;

    let read = ws.service.get_faq(&faq.qaid, &ws.editor);
    assert!(matches!(read, Err(CoreError::PermissionDenied(_))));

    let patch = FaqPatch {
        canonical_answer: Some("Changed.".to_string()),
        ..FaqPatch::default()
    };
    let edit = ws.service.update_faq(&faq.id, patch, &ws.editor);
    assert!(matches!(edit, Err(CoreError::PermissionDenied(_))));

    let publish = ws
        .service
        .request_publish(&faq.qaid, PublishTarget::Sit, &ws.editor);
    assert!(matches!(publish, Err(CoreError::PermissionDenied(_))));
    Ok(())
}

#[test]
fn editors_cannot_create_faqs_for_unassigned_brands() {
    let ws = Workspace::new();
    let denied = ws.service.create_faq(foreign_brand_input(), &ws.editor);
    assert!(matches!(denied, Err(CoreError::PermissionDenied(_))));
}

#[test]
fn list_faqs_is_filtered_by_brand_assignment() -> Result<()> {
    let ws = Workspace::new();
    ws.service.create_faq(foreign_brand_input(), &ws.admin)?;
    ws.service
        .create_faq(draft_input("How do I reset my password?", "Use the link."), &ws.editor)?;

    assert_eq!(ws.service.list_faqs(&ws.editor)?.len(), 1);
    assert_eq!(ws.service.list_faqs(&ws.admin)?.len(), 2);
    Ok(())
}

#[test]
fn channel_subset_invariant_is_enforced() {
    let ws = Workspace::new();
    // brand-a does not allow Pre-sales.
    let mut input = draft_input("How do I pay?", "Open billing.");
    input.channels = vec![Channel::Chat, Channel::PreSales];
    let result = ws.service.create_faq(input, &ws.editor);
    assert!(matches!(result, Err(CoreError::Validation { .. })));
}

#[test]
fn missing_required_fields_are_field_level_errors() {
    let ws = Workspace::new();
    let no_question = ws
        .service
        .create_faq(draft_input("", "An answer."), &ws.editor);
    match no_question {
        Err(CoreError::Validation { field, reason }) => {
            assert_eq!(field, "question");
            assert!(!reason.is_empty());
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let mut no_brands = draft_input("A question?", "An answer.");
    no_brands.brands.clear();
    no_brands.channels.clear();
    let result = ws.service.create_faq(no_brands, &ws.editor);
    assert!(matches!(result, Err(CoreError::Validation { .. })));
}

#[test]
fn analytics_are_admin_only_to_read() -> Result<()> {
    let ws = Workspace::new();
    let entry = AnalyticsEntry {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        query_text: "reset password".to_string(),
        served_qaid: "QA1001".to_string(),
        match_method: MatchMethod::Exact,
        match_score: 1.0,
        brand: "brand-a".to_string(),
        channel: Channel::Chat,
    };
    ws.service.record_served_query(&entry)?;

    let denied = ws.service.list_analytics(&ws.editor);
    assert!(matches!(denied, Err(CoreError::PermissionDenied(_))));

    let entries = ws.service.list_analytics(&ws.admin)?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].served_qaid, "QA1001");
    Ok(())
}

#[test]
fn config_updates_require_admin() {
    let ws = Workspace::new();
    let mut service = faqbase::FaqService::open(ws.root()).unwrap();
    let denied = service.update_config(faqbase::AppConfig::default(), &ws.editor);
    assert!(matches!(denied, Err(CoreError::PermissionDenied(_))));
}
