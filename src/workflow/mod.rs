//! Publish lifecycle state machine: Draft -> SIT -> PROD.
//!
//! Draft -> SIT is auto-approved or request-gated depending on the workflow
//! policy; SIT -> PROD always requires an explicit admin approval. Approval
//! re-checks the FAQ's status against the request's recorded origin at commit
//! time, so a record that moved on since filing is rejected with a Conflict
//! instead of being silently overwritten.
//!
//! Callers are expected to hold the per-QAID record lock around every
//! function here that mutates; see `store::RecordLocks`.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::audit::{append_version, AuditAction, AuditEvent, AuditLog};
use crate::error::{CoreError, CoreResult};
use crate::store::{
    AppConfig, ChangeType, Environment, Faq, FaqStore, PublishRequest, PublishTarget,
    RequestStatus, User,
};

/// Files a publish request for one FAQ, or applies the transition directly
/// when policy allows Draft -> SIT without approval.
pub fn request_publish(
    store: &FaqStore,
    config: &AppConfig,
    qaid: &str,
    target: PublishTarget,
    requester: &User,
) -> CoreResult<PublishRequest> {
    let mut faq = store
        .get_faq(qaid)?
        .ok_or_else(|| CoreError::not_found("FAQ", qaid))?;

    let pending_exists = store
        .list_publish_requests()?
        .iter()
        .any(|r| r.qaid == qaid && r.environment == target && r.status == RequestStatus::Pending);
    if pending_exists {
        return Err(CoreError::DuplicateRequest {
            qaid: qaid.to_string(),
            target,
        });
    }

    if faq.status != target.expected_origin() {
        return Err(CoreError::conflict(format!(
            "{} is {}, cannot request publish to {}",
            qaid, faq.status, target
        )));
    }

    let auto_approve = target == PublishTarget::Sit && !config.workflow.sit_requires_approval;
    let now = Utc::now();
    let mut request = PublishRequest {
        id: Uuid::new_v4(),
        qaid: qaid.to_string(),
        requested_by: requester.id.clone(),
        requested_at: now,
        environment: target,
        origin_status: faq.status,
        status: RequestStatus::Pending,
        approved_by: None,
        approved_at: None,
    };

    if auto_approve {
        faq.status = target.as_environment();
        append_version(&mut faq, ChangeType::Published, &requester.id);
        store.put_faq(&faq)?;
        request.status = RequestStatus::Approved;
        request.approved_by = Some(requester.id.clone());
        request.approved_at = Some(now);
        store.append_publish_request(&request)?;
        AuditLog::for_store(store).append_event(&AuditEvent::new(
            qaid,
            AuditAction::PublishApproved,
            &requester.id,
            json!({ "requestId": request.id, "environment": target, "autoApproved": true }),
        ))?;
    } else {
        store.append_publish_request(&request)?;
        AuditLog::for_store(store).append_event(&AuditEvent::new(
            qaid,
            AuditAction::PublishRequested,
            &requester.id,
            json!({ "requestId": request.id, "environment": target }),
        ))?;
    }

    Ok(request)
}

/// Approves a pending request and applies its transition.
///
/// Fails with Conflict — mutating nothing, leaving the request Pending —
/// when the FAQ's current status no longer matches the status recorded at
/// filing time.
pub fn approve(store: &FaqStore, request_id: &Uuid, approver: &User) -> CoreResult<Faq> {
    let mut request = store
        .get_publish_request(request_id)?
        .ok_or_else(|| CoreError::not_found("publish request", request_id.to_string()))?;
    if request.status != RequestStatus::Pending {
        return Err(CoreError::conflict(format!(
            "publish request {} is already {:?}",
            request_id, request.status
        )));
    }

    let mut faq = store
        .get_faq(&request.qaid)?
        .ok_or_else(|| CoreError::not_found("FAQ", request.qaid.clone()))?;
    if faq.status != request.origin_status {
        return Err(CoreError::conflict(format!(
            "{} moved from {} to {} since the request was filed",
            request.qaid, request.origin_status, faq.status
        )));
    }

    faq.status = request.environment.as_environment();
    append_version(&mut faq, ChangeType::Published, &approver.id);
    store.put_faq(&faq)?;

    request.status = RequestStatus::Approved;
    request.approved_by = Some(approver.id.clone());
    request.approved_at = Some(Utc::now());
    store.upsert_publish_request(&request)?;

    AuditLog::for_store(store).append_event(&AuditEvent::new(
        &request.qaid,
        AuditAction::PublishApproved,
        &approver.id,
        json!({ "requestId": request.id, "environment": request.environment }),
    ))?;

    Ok(faq)
}

/// Rejects a pending request. Terminal; the FAQ's status is untouched.
pub fn reject(store: &FaqStore, request_id: &Uuid, approver: &User) -> CoreResult<PublishRequest> {
    let mut request = store
        .get_publish_request(request_id)?
        .ok_or_else(|| CoreError::not_found("publish request", request_id.to_string()))?;
    if request.status != RequestStatus::Pending {
        return Err(CoreError::conflict(format!(
            "publish request {} is already {:?}",
            request_id, request.status
        )));
    }

    request.status = RequestStatus::Rejected;
    request.approved_by = Some(approver.id.clone());
    request.approved_at = Some(Utc::now());
    store.upsert_publish_request(&request)?;

    AuditLog::for_store(store).append_event(&AuditEvent::new(
        &request.qaid,
        AuditAction::PublishRejected,
        &approver.id,
        json!({ "requestId": request.id, "environment": request.environment }),
    ))?;

    Ok(request)
}

/// Restores a prior version's content into a live PROD FAQ.
///
/// The restore appends a `Reverted` version; history never shrinks and the
/// FAQ's status stays PROD.
pub fn rollback(
    store: &FaqStore,
    qaid: &str,
    target_version_id: &Uuid,
    approver: &User,
) -> CoreResult<Faq> {
    let mut faq = store
        .get_faq(qaid)?
        .ok_or_else(|| CoreError::not_found("FAQ", qaid))?;
    if faq.status != Environment::Prod {
        return Err(CoreError::conflict(format!(
            "{} is {}, only PROD FAQs can be rolled back",
            qaid, faq.status
        )));
    }

    let snapshot = faq
        .version_by_id(target_version_id)
        .ok_or_else(|| CoreError::not_found("version", target_version_id.to_string()))?
        .clone();

    faq.question = snapshot.question.clone();
    faq.canonical_answer = snapshot.canonical_answer.clone();
    append_version(&mut faq, ChangeType::Reverted, &approver.id);
    store.put_faq(&faq)?;

    AuditLog::for_store(store).append_event(&AuditEvent::new(
        qaid,
        AuditAction::RolledBack,
        &approver.id,
        json!({ "restoredVersion": snapshot.version, "restoredVersionId": snapshot.id }),
    ))?;

    Ok(faq)
}
