use anyhow::Result;
use faqbase::audit::{verify_contiguous, AuditAction, DiffTag};
use faqbase::{ChangeType, CoreError, Environment, FaqPatch, PublishTarget};

use crate::support::{draft_input, Workspace};

/// Creates an FAQ, edits it, and walks it to PROD. Returns its QAID.
fn faq_in_prod(ws: &Workspace) -> Result<String> {
    let faq = ws.service.create_faq(
        draft_input("How do I reset my password?", "Use the reset link."),
        &ws.editor,
    )?;
    let patch = FaqPatch {
        canonical_answer: Some("Go to the login page.\nClick \"Forgot Password\".".to_string()),
        ..FaqPatch::default()
    };
    ws.service.update_faq(&faq.id, patch, &ws.editor)?;
    ws.service
        .request_publish(&faq.qaid, PublishTarget::Sit, &ws.editor)?;
    let request = ws
        .service
        .request_publish(&faq.qaid, PublishTarget::Prod, &ws.editor)?;
    ws.service.approve_publish(&request.id, &ws.admin)?;
    Ok(faq.qaid)
}

#[test]
fn every_mutation_appends_exactly_one_contiguous_version() -> Result<()> {
    let ws = Workspace::new();
    let qaid = faq_in_prod(&ws)?;
    let faq = ws.service.get_faq(&qaid, &ws.admin)?;

    let change_types: Vec<ChangeType> = faq.versions.iter().map(|v| v.change_type).collect();
    assert_eq!(
        change_types,
        vec![
            ChangeType::Created,
            ChangeType::Updated,
            ChangeType::Published,
            ChangeType::Published,
        ]
    );
    assert!(verify_contiguous(&faq));
    Ok(())
}

#[test]
fn rollback_restores_content_and_grows_history() -> Result<()> {
    let ws = Workspace::new();
    let qaid = faq_in_prod(&ws)?;
    let faq = ws.service.get_faq(&qaid, &ws.admin)?;
    let original = faq.versions[0].clone();
    let history_before = faq.versions.len();

    let rolled = ws.service.rollback(&qaid, &original.id, &ws.admin)?;
    assert_eq!(rolled.canonical_answer, original.canonical_answer);
    assert_eq!(rolled.question, original.question);
    assert_eq!(rolled.status, Environment::Prod);
    assert_eq!(rolled.versions.len(), history_before + 1);
    assert_eq!(
        rolled.versions.last().unwrap().change_type,
        ChangeType::Reverted
    );
    assert!(verify_contiguous(&rolled));
    Ok(())
}

#[test]
fn rollback_is_admin_only_and_prod_only() -> Result<()> {
    let ws = Workspace::new();
    let faq = ws.service.create_faq(
        draft_input("How do I reset my password?", "Use the reset link."),
        &ws.editor,
    )?;
    let version_id = faq.versions[0].id;

    let denied = ws.service.rollback(&faq.qaid, &version_id, &ws.editor);
    assert!(matches!(denied, Err(CoreError::PermissionDenied(_))));

    let not_prod = ws.service.rollback(&faq.qaid, &version_id, &ws.admin);
    assert!(matches!(not_prod, Err(CoreError::Conflict(_))));
    Ok(())
}

#[test]
fn prod_faqs_reject_direct_edits() -> Result<()> {
    let ws = Workspace::new();
    let qaid = faq_in_prod(&ws)?;
    let faq = ws.service.get_faq(&qaid, &ws.admin)?;
    let patch = FaqPatch {
        canonical_answer: Some("Sneaky live edit.".to_string()),
        ..FaqPatch::default()
    };
    let result = ws.service.update_faq(&faq.id, patch, &ws.admin);
    assert!(matches!(result, Err(CoreError::Conflict(_))));
    Ok(())
}

#[test]
fn diff_between_versions_is_computed_on_demand() -> Result<()> {
    let ws = Workspace::new();
    let qaid = faq_in_prod(&ws)?;
    let faq = ws.service.get_faq(&qaid, &ws.admin)?;

    let diff = ws
        .service
        .diff_versions(&qaid, &faq.versions[0].id, &faq.versions[1].id, &ws.admin)?;
    assert_eq!(diff.from_version, 1);
    assert_eq!(diff.to_version, 2);
    assert!(diff.question.iter().all(|l| l.tag == DiffTag::Context));
    assert!(diff.answer.iter().any(|l| l.tag == DiffTag::Removed));
    assert!(diff.answer.iter().any(|l| l.tag == DiffTag::Added));
    Ok(())
}

#[test]
fn list_versions_returns_history_in_order() -> Result<()> {
    let ws = Workspace::new();
    let qaid = faq_in_prod(&ws)?;
    let versions = ws.service.list_versions(&qaid, &ws.editor)?;
    let numbers: Vec<u32> = versions.iter().map(|v| v.version).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    Ok(())
}

#[test]
fn audit_trail_records_every_mutation() -> Result<()> {
    let ws = Workspace::new();
    let qaid = faq_in_prod(&ws)?;
    let events = ws.service.list_audit_events(&qaid, &ws.admin)?;
    let actions: Vec<AuditAction> = events.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Created,
            AuditAction::Updated,
            AuditAction::PublishApproved,
            AuditAction::PublishRequested,
            AuditAction::PublishApproved,
        ]
    );
    Ok(())
}
