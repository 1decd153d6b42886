mod config;
mod locks;
mod sequence;

pub use config::{
    ensure_workspace_structure, workspace_root, AppConfig, MatchPolicy, MatchingSettings,
    WorkflowSettings, WorkspacePaths, CONFIG_FILE_NAME,
};
pub use locks::{RecordGuard, RecordLocks};
pub use sequence::{format_qaid, QaidSequence, FIRST_QAID_NUMBER};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

/// Support channel an FAQ can be served on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Chat,
    Email,
    Voice,
    #[serde(rename = "Pre-sales")]
    PreSales,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Chat => write!(f, "Chat"),
            Channel::Email => write!(f, "Email"),
            Channel::Voice => write!(f, "Voice"),
            Channel::PreSales => write!(f, "Pre-sales"),
        }
    }
}

/// Lifecycle environment of an FAQ: authoring, staging/test, live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Draft,
    #[serde(rename = "SIT")]
    Sit,
    #[serde(rename = "PROD")]
    Prod,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Draft => write!(f, "Draft"),
            Environment::Sit => write!(f, "SIT"),
            Environment::Prod => write!(f, "PROD"),
        }
    }
}

/// Environment a publish request targets. Draft is never a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishTarget {
    #[serde(rename = "SIT")]
    Sit,
    #[serde(rename = "PROD")]
    Prod,
}

impl PublishTarget {
    /// The environment an approved request moves the FAQ into.
    pub fn as_environment(self) -> Environment {
        match self {
            PublishTarget::Sit => Environment::Sit,
            PublishTarget::Prod => Environment::Prod,
        }
    }

    /// The status an FAQ must currently hold for this target to apply.
    pub fn expected_origin(self) -> Environment {
        match self {
            PublishTarget::Sit => Environment::Draft,
            PublishTarget::Prod => Environment::Sit,
        }
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishTarget::Sit => write!(f, "SIT"),
            PublishTarget::Prod => write!(f, "PROD"),
        }
    }
}

/// Kind of mutation a version snapshot records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Created,
    Updated,
    Published,
    Reverted,
}

/// Immutable snapshot of an FAQ's content at one version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqVersion {
    pub id: Uuid,
    /// Monotonically increasing per FAQ, contiguous from 1.
    pub version: u32,
    pub question: String,
    pub canonical_answer: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub change_type: ChangeType,
    /// FAQ status at the time the snapshot was taken.
    pub environment: Environment,
    /// SHA-256 over the question + answer snapshot.
    pub content_hash: String,
}

/// An FAQ record with its embedded version history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    pub id: Uuid,
    /// Stable external identifier. Globally unique, never reused,
    /// immutable once assigned.
    pub qaid: String,
    pub question: String,
    pub canonical_answer: String,
    pub brands: Vec<String>,
    pub channels: Vec<Channel>,
    pub status: Environment,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ticket_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub similar_utterances: Vec<String>,
    pub last_updated: DateTime<Utc>,
    pub created_by: String,
    #[serde(default)]
    pub versions: Vec<FaqVersion>,
}

impl Faq {
    pub fn current_version(&self) -> u32 {
        self.versions.last().map(|v| v.version).unwrap_or(0)
    }

    pub fn version_by_id(&self, version_id: &Uuid) -> Option<&FaqVersion> {
        self.versions.iter().find(|v| &v.id == version_id)
    }
}

/// A brand with its ordered list of allowed channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: String,
    pub name: String,
    pub channels: Vec<Channel>,
}

/// Console role. Admins approve publishes, roll back, and see everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// The acting principal for every core operation. There is no
/// process-wide "current role"; callers always pass the user explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub assigned_brands: Vec<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this user may touch an FAQ with the given brand set.
    pub fn can_access_brands(&self, brands: &[String]) -> bool {
        self.is_admin() || brands.iter().any(|b| self.assigned_brands.contains(b))
    }
}

/// Lifecycle of a publish request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A request to move an FAQ into SIT or PROD, gated on admin approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub id: Uuid,
    pub qaid: String,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub environment: PublishTarget,
    /// FAQ status at filing time; approval re-checks against it.
    pub origin_status: Environment,
    pub status: RequestStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// File-backed repository for FAQ records and the brand/user directories.
///
/// One JSON document per FAQ (versions embedded), JSON arrays for the
/// directories, and JSONL logs for the append-friendly collections.
/// The QAID sequence file and the publish request log are shared across
/// all records, so their read-modify-write cycles are serialized through
/// dedicated store-wide mutexes rather than the per-QAID record locks.
pub struct FaqStore {
    paths: WorkspacePaths,
    sequence_lock: Mutex<()>,
    requests_lock: Mutex<()>,
}

impl FaqStore {
    /// Opens (and creates if needed) a store rooted at an explicit path.
    pub fn open(root: &Path) -> Result<Self> {
        let paths = ensure_workspace_structure(root)?;
        Ok(Self {
            paths,
            sequence_lock: Mutex::new(()),
            requests_lock: Mutex::new(()),
        })
    }

    /// Opens the store at the default workspace root
    /// (`FAQBASE_HOME` or the OS data directory).
    pub fn open_default() -> Result<Self> {
        let root = workspace_root()?;
        Self::open(&root)
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        config::load_or_default(&self.paths.root)
    }

    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        config::save(&self.paths.root, config)
    }

    // --- FAQ records ---

    /// All FAQ records, sorted by QAID for deterministic iteration.
    pub fn list_faqs(&self) -> Result<Vec<Faq>> {
        let mut faqs = Vec::new();
        for entry in fs::read_dir(&self.paths.faqs_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                let faq: Faq = serde_json::from_slice(&fs::read(&path)?)
                    .with_context(|| format!("Failed to parse FAQ record {:?}", path))?;
                faqs.push(faq);
            }
        }
        faqs.sort_by(|a, b| a.qaid.cmp(&b.qaid));
        Ok(faqs)
    }

    pub fn get_faq(&self, qaid: &str) -> Result<Option<Faq>> {
        let path = self.paths.faq_record(qaid);
        if !path.exists() {
            return Ok(None);
        }
        let faq: Faq = serde_json::from_slice(&fs::read(&path)?)
            .with_context(|| format!("Failed to parse FAQ record {:?}", path))?;
        Ok(Some(faq))
    }

    pub fn get_faq_by_id(&self, id: &Uuid) -> Result<Option<Faq>> {
        Ok(self.list_faqs()?.into_iter().find(|f| &f.id == id))
    }

    pub fn put_faq(&self, faq: &Faq) -> Result<()> {
        let path = self.paths.faq_record(&faq.qaid);
        fs::write(&path, serde_json::to_vec_pretty(faq)?)
            .with_context(|| format!("Failed to write FAQ record {:?}", path))?;
        Ok(())
    }

    // --- Directories ---

    pub fn list_brands(&self) -> Result<Vec<Brand>> {
        read_json_array(&self.paths.brands_file())
    }

    pub fn save_brands(&self, brands: &[Brand]) -> Result<()> {
        write_json_array(&self.paths.brands_file(), brands)
    }

    pub fn get_brand(&self, brand_id: &str) -> Result<Option<Brand>> {
        Ok(self.list_brands()?.into_iter().find(|b| b.id == brand_id))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        read_json_array(&self.paths.users_file())
    }

    pub fn save_users(&self, users: &[User]) -> Result<()> {
        write_json_array(&self.paths.users_file(), users)
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.list_users()?.into_iter().find(|u| u.id == user_id))
    }

    // --- QAID sequence ---

    /// Next QAID number that would be assigned, without persisting anything.
    pub fn peek_qaid_number(&self) -> Result<u64> {
        let _guard = self.sequence_lock.lock().unwrap_or_else(|e| e.into_inner());
        QaidSequence::new(self.paths.qaid_sequence_file()).peek()
    }

    /// Mints one QAID and advances the persisted counter.
    ///
    /// The sequence lock makes the load-increment-write cycle atomic, so
    /// concurrent creates can never share a QAID or see a torn file.
    pub fn mint_qaid(&self) -> Result<String> {
        let _guard = self.sequence_lock.lock().unwrap_or_else(|e| e.into_inner());
        QaidSequence::new(self.paths.qaid_sequence_file()).mint()
    }

    // --- Publish requests (JSONL, rewritten on update) ---

    pub fn list_publish_requests(&self) -> Result<Vec<PublishRequest>> {
        let _guard = self.requests_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.read_publish_requests()
    }

    fn read_publish_requests(&self) -> Result<Vec<PublishRequest>> {
        let path = self.paths.publish_requests_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read {:?}", path))?;
        let mut requests = Vec::new();
        for line in data.lines().filter(|l| !l.trim().is_empty()) {
            let request: PublishRequest = serde_json::from_str(line)
                .with_context(|| "Failed to parse publish request record")?;
            requests.push(request);
        }
        Ok(requests)
    }

    pub fn get_publish_request(&self, request_id: &Uuid) -> Result<Option<PublishRequest>> {
        let _guard = self.requests_lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self
            .read_publish_requests()?
            .into_iter()
            .find(|r| &r.id == request_id))
    }

    pub fn append_publish_request(&self, request: &PublishRequest) -> Result<()> {
        let _guard = self.requests_lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.paths.publish_requests_file();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(serde_json::to_string(request)?.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    /// Rewrites the request log with one request replaced (or appended).
    /// The whole list-then-rewrite runs under the requests lock; the log is
    /// shared across QAIDs, so the per-record locks cannot cover it.
    pub fn upsert_publish_request(&self, request: &PublishRequest) -> Result<()> {
        let _guard = self.requests_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut requests = self.read_publish_requests()?;
        if let Some(existing) = requests.iter_mut().find(|r| r.id == request.id) {
            *existing = request.clone();
        } else {
            requests.push(request.clone());
        }
        let path = self.paths.publish_requests_file();
        let mut file = fs::File::create(&path)?;
        for request in &requests {
            file.write_all(serde_json::to_string(request)?.as_bytes())?;
            file.write_all(b"\n")?;
        }
        Ok(())
    }
}

fn read_json_array<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read(path).with_context(|| format!("Unable to read {:?}", path))?;
    let items = serde_json::from_slice(&data)
        .with_context(|| format!("Failed to parse {:?}", path))?;
    Ok(items)
}

fn write_json_array<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(items)?)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
