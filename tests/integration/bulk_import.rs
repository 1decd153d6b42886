use anyhow::Result;
use faqbase::bulk::{summarize, BulkRow, RowStatus};
use faqbase::{ChangeType, Channel, CoreError, Environment};

use crate::support::{draft_input, Workspace};

fn bulk_row(question: &str, answer: &str) -> BulkRow {
    BulkRow {
        question: question.to_string(),
        answer: answer.to_string(),
        brands: vec!["brand-a".to_string()],
        channels: vec![Channel::Chat],
        ..BulkRow::default()
    }
}

#[test]
fn six_row_batch_classifies_and_commits_only_accepted_rows() -> Result<()> {
    let ws = Workspace::new();
    ws.service.create_faq(
        draft_input("What are your business hours?", "Nine to five, weekdays."),
        &ws.editor,
    )?;
    ws.service.create_faq(
        draft_input("How to cancel subscription?", "Open account settings."),
        &ws.editor,
    )?;

    let rows = vec![
        bulk_row("How to reset password?", "Use the reset link."),
        bulk_row("What are your business hours?", "Open weekdays nine to five."),
        bulk_row("How to cancel subscription?", "Open account settings."),
        bulk_row("Product pricing information", "See the pricing page."),
        bulk_row("", "An answer with no question"),
        bulk_row("How to contact support team?", "Email support."),
    ];

    let results = ws.service.validate_bulk_batch(&rows, &ws.editor)?;
    assert_eq!(results.len(), 6);
    let summary = summarize(&results);
    assert_eq!(summary.errors, 1);

    let error_row = &results[4];
    assert_eq!(error_row.row, 5);
    assert_eq!(error_row.status, RowStatus::Error);
    assert_eq!(error_row.qaid, None);
    assert!(!error_row.reason.as_deref().unwrap_or("").is_empty());

    // Exact-question rows point at the existing records.
    assert_eq!(results[2].status, RowStatus::Duplicate);
    assert!(results[2].suggested_qaid.is_some());

    let accepted_rows: Vec<BulkRow> = results
        .iter()
        .filter(|r| r.status == RowStatus::Accepted)
        .map(|r| rows[r.row - 1].clone())
        .collect();
    let created = ws.service.commit_bulk_import(&accepted_rows, &ws.editor)?;
    assert_eq!(created.len(), summary.accepted);

    for qaid in &created {
        let faq = ws.service.get_faq(qaid, &ws.editor)?;
        assert_eq!(faq.status, Environment::Draft);
        assert_eq!(faq.versions.len(), 1);
        assert_eq!(faq.versions[0].version, 1);
        assert_eq!(faq.versions[0].change_type, ChangeType::Created);
    }
    Ok(())
}

#[test]
fn validation_is_side_effect_free_and_repeatable() -> Result<()> {
    let ws = Workspace::new();
    ws.service.create_faq(
        draft_input("How do I reset my password?", "Use the link."),
        &ws.editor,
    )?;
    let rows = vec![
        bulk_row("How do I update billing info?", "Open the billing page."),
        bulk_row("How do I reset my password?", "Use the link."),
    ];

    let before = ws.service.list_faqs(&ws.admin)?.len();
    let first = ws.service.validate_bulk_batch(&rows, &ws.editor)?;
    let second = ws.service.validate_bulk_batch(&rows, &ws.editor)?;
    assert_eq!(ws.service.list_faqs(&ws.admin)?.len(), before);

    let tuples = |results: &[faqbase::bulk::RowResult]| {
        results
            .iter()
            .map(|r| (r.row, r.status, r.qaid.clone(), r.suggested_qaid.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(tuples(&first), tuples(&second));
    assert_eq!(first[1].status, RowStatus::Duplicate);
    Ok(())
}

#[test]
fn committed_rows_reuse_no_qaid() -> Result<()> {
    let ws = Workspace::new();
    let first = ws
        .service
        .commit_bulk_import(&[bulk_row("How to pay?", "Open billing.")], &ws.editor)?;
    let second = ws
        .service
        .commit_bulk_import(&[bulk_row("How to export data?", "Use the export tab.")], &ws.editor)?;
    assert_ne!(first[0], second[0]);
    Ok(())
}

#[test]
fn commit_rejects_rows_without_brands_even_for_admins() -> Result<()> {
    let ws = Workspace::new();
    let mut row = bulk_row("How do I change my plan?", "Open the plans page.");
    row.brands = Vec::new();
    row.channels = Vec::new();

    let result = ws.service.commit_bulk_import(&[row], &ws.admin);
    assert!(matches!(
        result,
        Err(CoreError::Validation { ref field, .. }) if field == "brands"
    ));
    assert!(ws.service.list_faqs(&ws.admin)?.is_empty());
    Ok(())
}

#[test]
fn commit_denies_rows_outside_assigned_brands() -> Result<()> {
    let ws = Workspace::new();
    let mut row = bulk_row("Pre-sales discount policy?", "Ask the sales desk.");
    row.brands = vec!["brand-b".to_string()];
    row.channels = vec![Channel::PreSales];

    let result = ws.service.commit_bulk_import(&[row.clone()], &ws.editor);
    assert!(matches!(result, Err(CoreError::PermissionDenied(_))));
    assert!(ws.service.list_faqs(&ws.admin)?.is_empty());

    let created = ws.service.commit_bulk_import(&[row], &ws.admin)?;
    assert_eq!(created.len(), 1);
    Ok(())
}
