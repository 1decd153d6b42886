//! Operation-style contract consumed by the presentation layer.
//!
//! `FaqService` owns the store, the workspace configuration, and the
//! per-QAID lock registry. Every operation takes the acting principal
//! explicitly; there is no process-wide session state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit::{
    append_version, diff_versions, AnalyticsEntry, AnalyticsLog, AuditAction, AuditEvent,
    AuditLog, VersionDiff,
};
use crate::bulk::{self, BulkRow, RowResult};
use crate::error::{CoreError, CoreResult};
use crate::matching::{self, DuplicateCandidate};
use crate::store::{
    AppConfig, Brand, ChangeType, Channel, Environment, Faq, FaqStore, FaqVersion,
    PublishRequest, PublishTarget, RecordGuard, RecordLocks, User,
};
use crate::workflow;

/// Input for creating a new FAQ in Draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFaqInput {
    pub question: String,
    pub canonical_answer: String,
    pub brands: Vec<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ticket_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub similar_utterances: Vec<String>,
}

/// Partial update applied to a Draft or SIT FAQ. Unset fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqPatch {
    pub question: Option<String>,
    pub canonical_answer: Option<String>,
    pub brands: Option<Vec<String>>,
    pub channels: Option<Vec<Channel>>,
    pub tags: Option<Vec<String>>,
    pub ticket_parameters: Option<BTreeMap<String, String>>,
    pub similar_utterances: Option<Vec<String>>,
}

/// Facade over the FAQ store, matcher, workflow engine, and audit logs.
pub struct FaqService {
    store: FaqStore,
    config: AppConfig,
    locks: RecordLocks,
}

impl FaqService {
    /// Opens the service over a store rooted at an explicit path.
    pub fn open(root: &Path) -> CoreResult<Self> {
        let store = FaqStore::open(root)?;
        let config = store.load_config()?;
        Ok(Self {
            store,
            config,
            locks: RecordLocks::new(),
        })
    }

    /// Opens the service at the default workspace root.
    pub fn open_default() -> CoreResult<Self> {
        let store = FaqStore::open_default()?;
        let config = store.load_config()?;
        Ok(Self {
            store,
            config,
            locks: RecordLocks::new(),
        })
    }

    pub fn store(&self) -> &FaqStore {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Replaces the workspace configuration (admin settings screen).
    pub fn update_config(&mut self, config: AppConfig, principal: &User) -> CoreResult<()> {
        require_admin(principal, "update configuration")?;
        self.store.save_config(&config)?;
        self.config = config;
        Ok(())
    }

    // --- FAQ authoring ---

    pub fn create_faq(&self, input: NewFaqInput, principal: &User) -> CoreResult<Faq> {
        if input.question.trim().is_empty() {
            return Err(CoreError::validation("question", "Question field is required"));
        }
        if input.canonical_answer.trim().is_empty() {
            return Err(CoreError::validation("canonicalAnswer", "Answer field is required"));
        }
        if input.brands.is_empty() {
            return Err(CoreError::validation("brands", "At least one brand is required"));
        }
        self.check_channel_subset(&input.brands, &input.channels)?;
        if !principal.can_access_brands(&input.brands) {
            return Err(CoreError::permission_denied(format!(
                "{} is not assigned to any of the selected brands",
                principal.id
            )));
        }

        let qaid = self.store.mint_qaid()?;
        let handle = self.locks.handle(&qaid);
        let _guard = RecordGuard::acquire(&handle);

        let mut faq = Faq {
            id: Uuid::new_v4(),
            qaid: qaid.clone(),
            question: input.question,
            canonical_answer: input.canonical_answer,
            brands: input.brands,
            channels: input.channels,
            status: Environment::Draft,
            tags: input.tags,
            ticket_parameters: input.ticket_parameters,
            similar_utterances: input.similar_utterances,
            last_updated: Utc::now(),
            created_by: principal.id.clone(),
            versions: Vec::new(),
        };
        append_version(&mut faq, ChangeType::Created, &principal.id);
        self.store.put_faq(&faq)?;
        AuditLog::for_store(&self.store).append_event(&AuditEvent::new(
            &qaid,
            AuditAction::Created,
            &principal.id,
            json!({ "faqId": faq.id }),
        ))?;
        info!(qaid = %qaid, user = %principal.id, "created FAQ");
        Ok(faq)
    }

    pub fn update_faq(&self, id: &Uuid, patch: FaqPatch, principal: &User) -> CoreResult<Faq> {
        let current = self
            .store
            .get_faq_by_id(id)?
            .ok_or_else(|| CoreError::not_found("FAQ", id.to_string()))?;
        let handle = self.locks.handle(&current.qaid);
        let _guard = RecordGuard::acquire(&handle);

        // Re-read under the lock; a concurrent writer may have advanced it.
        let mut faq = self
            .store
            .get_faq(&current.qaid)?
            .ok_or_else(|| CoreError::not_found("FAQ", id.to_string()))?;
        if !principal.can_access_brands(&faq.brands) {
            return Err(CoreError::permission_denied(format!(
                "{} is not assigned to any brand of {}",
                principal.id, faq.qaid
            )));
        }
        if faq.status == Environment::Prod {
            return Err(CoreError::conflict(format!(
                "{} is live in PROD; content changes require a rollback",
                faq.qaid
            )));
        }

        if let Some(question) = patch.question {
            if question.trim().is_empty() {
                return Err(CoreError::validation("question", "Question field is required"));
            }
            faq.question = question;
        }
        if let Some(answer) = patch.canonical_answer {
            if answer.trim().is_empty() {
                return Err(CoreError::validation("canonicalAnswer", "Answer field is required"));
            }
            faq.canonical_answer = answer;
        }
        if let Some(brands) = patch.brands {
            if brands.is_empty() {
                return Err(CoreError::validation("brands", "At least one brand is required"));
            }
            faq.brands = brands;
        }
        if let Some(channels) = patch.channels {
            faq.channels = channels;
        }
        if let Some(tags) = patch.tags {
            faq.tags = tags;
        }
        if let Some(params) = patch.ticket_parameters {
            faq.ticket_parameters = params;
        }
        if let Some(utterances) = patch.similar_utterances {
            faq.similar_utterances = utterances;
        }
        self.check_channel_subset(&faq.brands, &faq.channels)?;
        if !principal.can_access_brands(&faq.brands) {
            return Err(CoreError::permission_denied(format!(
                "{} cannot move {} to brands outside their assignment",
                principal.id, faq.qaid
            )));
        }

        append_version(&mut faq, ChangeType::Updated, &principal.id);
        self.store.put_faq(&faq)?;
        AuditLog::for_store(&self.store).append_event(&AuditEvent::new(
            &faq.qaid,
            AuditAction::Updated,
            &principal.id,
            json!({ "version": faq.current_version() }),
        ))?;
        debug!(qaid = %faq.qaid, version = faq.current_version(), "updated FAQ");
        Ok(faq)
    }

    // --- Duplicate matching ---

    /// Ranked duplicate candidates for a draft question/answer.
    /// Non-admin principals only see FAQs within their assigned brands.
    pub fn find_duplicates(
        &self,
        question: &str,
        answer: &str,
        brands: Option<&[String]>,
        principal: &User,
    ) -> CoreResult<Vec<DuplicateCandidate>> {
        let faqs = self.visible_faqs(principal)?;
        Ok(matching::find_duplicates(
            &faqs,
            question,
            answer,
            brands,
            &self.config.matching,
        ))
    }

    // --- Bulk import ---

    /// Classifies each row as accepted/duplicate/error. Pure with respect to
    /// the store; re-running it commits nothing.
    pub fn validate_bulk_batch(
        &self,
        rows: &[BulkRow],
        principal: &User,
    ) -> CoreResult<Vec<RowResult>> {
        let faqs = self.visible_faqs(principal)?;
        let brands = self.store.list_brands()?;
        let next = self.store.peek_qaid_number()?;
        debug!(rows = rows.len(), user = %principal.id, "validating bulk batch");
        Ok(bulk::validate_batch(
            &faqs,
            &brands,
            rows,
            &self.config.matching,
            next,
        ))
    }

    /// Commits accepted rows as new Draft FAQs, one `Created` version each.
    /// Returns the minted QAIDs in row order.
    pub fn commit_bulk_import(
        &self,
        rows: &[BulkRow],
        principal: &User,
    ) -> CoreResult<Vec<String>> {
        // Validate the whole batch up front so a bad row never leaves a
        // partially committed import behind.
        for row in rows {
            if row.question.trim().is_empty() || row.answer.trim().is_empty() {
                return Err(CoreError::validation(
                    "question",
                    "Only accepted rows may be committed",
                ));
            }
            if row.brands.is_empty() {
                return Err(CoreError::validation("brands", "At least one brand is required"));
            }
            self.check_channel_subset(&row.brands, &row.channels)?;
            if !principal.can_access_brands(&row.brands) {
                return Err(CoreError::permission_denied(format!(
                    "{} is not assigned to the brands of an imported row",
                    principal.id
                )));
            }
        }

        let audit = AuditLog::for_store(&self.store);
        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            let qaid = self.store.mint_qaid()?;
            let handle = self.locks.handle(&qaid);
            let _guard = RecordGuard::acquire(&handle);
            let mut faq = bulk::row_to_faq(row, qaid.clone(), &principal.id);
            append_version(&mut faq, ChangeType::Created, &principal.id);
            self.store.put_faq(&faq)?;
            audit.append_event(&AuditEvent::new(
                &qaid,
                AuditAction::BulkImported,
                &principal.id,
                json!({ "faqId": faq.id }),
            ))?;
            created.push(qaid);
        }
        info!(count = created.len(), user = %principal.id, "committed bulk import");
        Ok(created)
    }

    // --- Publish workflow ---

    pub fn request_publish(
        &self,
        qaid: &str,
        target: PublishTarget,
        principal: &User,
    ) -> CoreResult<PublishRequest> {
        let faq = self
            .store
            .get_faq(qaid)?
            .ok_or_else(|| CoreError::not_found("FAQ", qaid))?;
        if !principal.can_access_brands(&faq.brands) {
            return Err(CoreError::permission_denied(format!(
                "{} is not assigned to any brand of {}",
                principal.id, qaid
            )));
        }
        let handle = self.locks.handle(qaid);
        let _guard = RecordGuard::acquire(&handle);
        workflow::request_publish(&self.store, &self.config, qaid, target, principal)
    }

    pub fn approve_publish(&self, request_id: &Uuid, principal: &User) -> CoreResult<Faq> {
        require_admin(principal, "approve publish requests")?;
        let request = self
            .store
            .get_publish_request(request_id)?
            .ok_or_else(|| CoreError::not_found("publish request", request_id.to_string()))?;
        let handle = self.locks.handle(&request.qaid);
        let _guard = RecordGuard::acquire(&handle);
        workflow::approve(&self.store, request_id, principal)
    }

    pub fn reject_publish(&self, request_id: &Uuid, principal: &User) -> CoreResult<PublishRequest> {
        require_admin(principal, "reject publish requests")?;
        let request = self
            .store
            .get_publish_request(request_id)?
            .ok_or_else(|| CoreError::not_found("publish request", request_id.to_string()))?;
        let handle = self.locks.handle(&request.qaid);
        let _guard = RecordGuard::acquire(&handle);
        workflow::reject(&self.store, request_id, principal)
    }

    pub fn rollback(
        &self,
        qaid: &str,
        target_version_id: &Uuid,
        principal: &User,
    ) -> CoreResult<Faq> {
        require_admin(principal, "roll back a PROD FAQ")?;
        let handle = self.locks.handle(qaid);
        let _guard = RecordGuard::acquire(&handle);
        workflow::rollback(&self.store, qaid, target_version_id, principal)
    }

    /// Pending and settled requests visible to the principal.
    pub fn list_publish_requests(&self, principal: &User) -> CoreResult<Vec<PublishRequest>> {
        let requests = self.store.list_publish_requests()?;
        if principal.is_admin() {
            return Ok(requests);
        }
        let visible: BTreeSet<String> = self
            .visible_faqs(principal)?
            .into_iter()
            .map(|f| f.qaid)
            .collect();
        Ok(requests
            .into_iter()
            .filter(|r| visible.contains(&r.qaid))
            .collect())
    }

    // --- Versions & audit ---

    pub fn get_faq(&self, qaid: &str, principal: &User) -> CoreResult<Faq> {
        let faq = self
            .store
            .get_faq(qaid)?
            .ok_or_else(|| CoreError::not_found("FAQ", qaid))?;
        if !principal.can_access_brands(&faq.brands) {
            return Err(CoreError::permission_denied(format!(
                "{} is not assigned to any brand of {}",
                principal.id, qaid
            )));
        }
        Ok(faq)
    }

    pub fn list_faqs(&self, principal: &User) -> CoreResult<Vec<Faq>> {
        self.visible_faqs(principal)
    }

    pub fn list_versions(&self, qaid: &str, principal: &User) -> CoreResult<Vec<FaqVersion>> {
        Ok(self.get_faq(qaid, principal)?.versions)
    }

    /// On-demand diff between two versions of one FAQ.
    pub fn diff_versions(
        &self,
        qaid: &str,
        from_version_id: &Uuid,
        to_version_id: &Uuid,
        principal: &User,
    ) -> CoreResult<VersionDiff> {
        let faq = self.get_faq(qaid, principal)?;
        let from = faq
            .version_by_id(from_version_id)
            .ok_or_else(|| CoreError::not_found("version", from_version_id.to_string()))?;
        let to = faq
            .version_by_id(to_version_id)
            .ok_or_else(|| CoreError::not_found("version", to_version_id.to_string()))?;
        Ok(diff_versions(from, to))
    }

    pub fn list_audit_events(&self, qaid: &str, principal: &User) -> CoreResult<Vec<AuditEvent>> {
        self.get_faq(qaid, principal)?;
        Ok(AuditLog::for_store(&self.store).events_for(qaid)?)
    }

    // --- Analytics ---

    /// Appends one served-query record. Write-once; no principal gate, the
    /// matching runtime calls this on its own behalf.
    pub fn record_served_query(&self, entry: &AnalyticsEntry) -> CoreResult<()> {
        AnalyticsLog::for_store(&self.store).record(entry)?;
        Ok(())
    }

    pub fn list_analytics(&self, principal: &User) -> CoreResult<Vec<AnalyticsEntry>> {
        require_admin(principal, "read analytics")?;
        Ok(AnalyticsLog::for_store(&self.store).load()?)
    }

    // --- Directories ---

    pub fn list_brands(&self) -> CoreResult<Vec<Brand>> {
        Ok(self.store.list_brands()?)
    }

    pub fn save_brands(&self, brands: &[Brand], principal: &User) -> CoreResult<()> {
        require_admin(principal, "edit the brand directory")?;
        Ok(self.store.save_brands(brands)?)
    }

    pub fn save_users(&self, users: &[User], principal: &User) -> CoreResult<()> {
        require_admin(principal, "edit the user directory")?;
        Ok(self.store.save_users(users)?)
    }

    // --- Internals ---

    fn visible_faqs(&self, principal: &User) -> CoreResult<Vec<Faq>> {
        let faqs = self.store.list_faqs()?;
        if principal.is_admin() {
            return Ok(faqs);
        }
        Ok(faqs
            .into_iter()
            .filter(|f| principal.can_access_brands(&f.brands))
            .collect())
    }

    /// Enforces the invariant that an FAQ's channels are a subset of the
    /// union of its brands' allowed channels.
    fn check_channel_subset(&self, brands: &[String], channels: &[Channel]) -> CoreResult<()> {
        let directory = self.store.list_brands()?;
        let mut allowed: BTreeSet<Channel> = BTreeSet::new();
        for brand_id in brands {
            let brand = directory
                .iter()
                .find(|b| &b.id == brand_id)
                .ok_or_else(|| {
                    CoreError::validation("brands", format!("Unknown brand: {brand_id}"))
                })?;
            allowed.extend(brand.channels.iter().copied());
        }
        for channel in channels {
            if !allowed.contains(channel) {
                return Err(CoreError::validation(
                    "channels",
                    format!("Channel {channel} is not allowed for the selected brands"),
                ));
            }
        }
        Ok(())
    }
}

fn require_admin(principal: &User, action: &str) -> CoreResult<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(CoreError::permission_denied(format!(
            "only admins may {action}"
        )))
    }
}
