//! Scripted collaborators for tests and the demo binary
//!
//! Deterministic stand-ins for every external contract: prompts that answer
//! from a script, services that reply from queued responses (defaulting to
//! success), recorders for the fire-and-forget hooks, a digest-based key
//! crypto engine, and an in-process context launcher that runs the remote
//! half of the session handoff on a spawned task.

use crate::core::error::AdminError;
use crate::core::notify::{Notification, Notifier};
use crate::core::traits::{
    ApiResponse, ApiResult, DerivedKey, EncryptedKeyBlob, EventLog, KeyCrypto, KeySalt,
    MemberDirectory, MemberId, Navigator, OrganizationService, OrgPrivateKey, Role, SessionToken,
};
use crate::handoff::{
    ChannelEndpoint, ContextLauncher, Envelope, LaunchedContext, Message, Origin, receive_session,
};
use crate::orchestration::confirmation::{ConfirmationPrompt, ConfirmationRequest, Decision};
use crate::security::{Credential, CredentialPrompt, PromptReply};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Prompts
// ============================================================================

enum CredentialScript {
    Submit {
        password: String,
        second_factor: Option<String>,
    },
    Cancel,
}

/// Credential prompt that answers from a fixed script
pub struct ScriptedCredentialPrompt {
    script: CredentialScript,
    delay: Option<Duration>,
    requests: AtomicU32,
}

impl ScriptedCredentialPrompt {
    pub fn submitting(password: &str, second_factor: Option<&str>) -> Self {
        Self {
            script: CredentialScript::Submit {
                password: password.to_string(),
                second_factor: second_factor.map(str::to_string),
            },
            delay: None,
            requests: AtomicU32::new(0),
        }
    }

    pub fn cancelling() -> Self {
        Self {
            script: CredentialScript::Cancel,
            delay: None,
            requests: AtomicU32::new(0),
        }
    }

    /// Hold the prompt open for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialPrompt for ScriptedCredentialPrompt {
    async fn request(&self, _requires_second_factor: bool) -> PromptReply {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            CredentialScript::Submit {
                password,
                second_factor,
            } => PromptReply::Submitted(Credential::new(password.clone(), second_factor.clone())),
            CredentialScript::Cancel => PromptReply::Cancelled,
        }
    }
}

/// Confirmation prompt that always answers the same way and records what it
/// was asked
pub struct ScriptedConfirmationPrompt {
    decision: Decision,
    delay: Option<Duration>,
    seen: Arc<Mutex<Vec<ConfirmationRequest>>>,
}

impl ScriptedConfirmationPrompt {
    pub fn confirming() -> Self {
        Self {
            decision: Decision::Confirmed,
            delay: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn cancelling() -> Self {
        Self {
            decision: Decision::Cancelled,
            delay: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle onto the recorded requests, usable after the prompt moved into
    /// a workflow
    pub fn seen_handle(&self) -> Arc<Mutex<Vec<ConfirmationRequest>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl ConfirmationPrompt for ScriptedConfirmationPrompt {
    async fn confirm(&self, request: &ConfirmationRequest) -> Decision {
        self.seen.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.decision
    }
}

// ============================================================================
// Services
// ============================================================================

fn pop<T>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    queue.lock().unwrap().pop_front()
}

/// Member directory answering from queued replies
///
/// Every method defaults to an application success when no reply is queued;
/// each call is appended to an inspectable log.
pub struct ScriptedDirectory {
    role_replies: Mutex<VecDeque<ApiResult<()>>>,
    auth_replies: Mutex<VecDeque<ApiResult<SessionToken>>>,
    privatize_replies: Mutex<VecDeque<ApiResult<()>>>,
    delete_replies: Mutex<VecDeque<ApiResult<()>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDirectory {
    pub fn new() -> Self {
        Self {
            role_replies: Mutex::new(VecDeque::new()),
            auth_replies: Mutex::new(VecDeque::new()),
            privatize_replies: Mutex::new(VecDeque::new()),
            delete_replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_role_reply(&self, reply: ApiResult<()>) {
        self.role_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_auth_reply(&self, reply: ApiResult<SessionToken>) {
        self.auth_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_privatize_reply(&self, reply: ApiResult<()>) {
        self.privatize_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_delete_reply(&self, reply: ApiResult<()>) {
        self.delete_replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for ScriptedDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemberDirectory for ScriptedDirectory {
    async fn change_role(&self, id: MemberId, role: Role) -> ApiResult<()> {
        let role_name = match role {
            Role::Admin => "admin",
            Role::Member => "member",
        };
        self.record(format!("change_role({}, {})", id, role_name));
        pop(&self.role_replies).unwrap_or_else(|| Ok(ApiResponse::success(())))
    }

    async fn authenticate_as(
        &self,
        id: MemberId,
        _credential: &Credential,
    ) -> ApiResult<SessionToken> {
        self.record(format!("authenticate_as({})", id));
        pop(&self.auth_replies).unwrap_or_else(|| {
            Ok(ApiResponse::success(SessionToken::new(format!(
                "st-{}",
                uuid::Uuid::new_v4()
            ))))
        })
    }

    async fn privatize(&self, id: MemberId) -> ApiResult<()> {
        self.record(format!("privatize({})", id));
        pop(&self.privatize_replies).unwrap_or_else(|| Ok(ApiResponse::success(())))
    }

    async fn delete(&self, id: MemberId) -> ApiResult<()> {
        self.record(format!("delete({})", id));
        pop(&self.delete_replies).unwrap_or_else(|| Ok(ApiResponse::success(())))
    }
}

/// Organization service recording backup key submissions
pub struct ScriptedOrganizationService {
    display_replies: Mutex<VecDeque<ApiResult<()>>>,
    backup_replies: Mutex<VecDeque<ApiResult<()>>>,
    backup_submissions: Mutex<Vec<(String, String)>>,
}

impl ScriptedOrganizationService {
    pub fn new() -> Self {
        Self {
            display_replies: Mutex::new(VecDeque::new()),
            backup_replies: Mutex::new(VecDeque::new()),
            backup_submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn push_display_reply(&self, reply: ApiResult<()>) {
        self.display_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_backup_reply(&self, reply: ApiResult<()>) {
        self.backup_replies.lock().unwrap().push_back(reply);
    }

    /// Every `(encrypted blob, salt)` pair submitted so far
    pub fn backup_submissions(&self) -> Vec<(String, String)> {
        self.backup_submissions.lock().unwrap().clone()
    }
}

impl Default for ScriptedOrganizationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrganizationService for ScriptedOrganizationService {
    async fn update_display_name(&self, _name: &str) -> ApiResult<()> {
        pop(&self.display_replies).unwrap_or_else(|| Ok(ApiResponse::success(())))
    }

    async fn update_backup_key(
        &self,
        key: &EncryptedKeyBlob,
        salt: &KeySalt,
        _credential: &Credential,
    ) -> ApiResult<()> {
        self.backup_submissions
            .lock()
            .unwrap()
            .push((key.0.clone(), salt.0.clone()));
        pop(&self.backup_replies).unwrap_or_else(|| Ok(ApiResponse::success(())))
    }
}

// ============================================================================
// Key crypto
// ============================================================================

/// Digest-based key crypto with injectable failures
///
/// Salts come from the thread RNG; derivation and re-encryption are SHA-256
/// digests over their inputs, deterministic given password and salt.
pub struct DigestKeyCrypto {
    derivation_fails: AtomicBool,
    reencryption_fails: AtomicBool,
}

impl DigestKeyCrypto {
    pub fn new() -> Self {
        Self {
            derivation_fails: AtomicBool::new(false),
            reencryption_fails: AtomicBool::new(false),
        }
    }

    pub fn fail_derivation(&self) {
        self.derivation_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_reencryption(&self) {
        self.reencryption_fails.store(true, Ordering::SeqCst);
    }
}

impl Default for DigestKeyCrypto {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyCrypto for DigestKeyCrypto {
    fn generate_salt(&self) -> KeySalt {
        KeySalt(hex::encode(rand::random::<[u8; 16]>()))
    }

    async fn derive_key(
        &self,
        password: &SecretString,
        salt: &KeySalt,
    ) -> Result<DerivedKey, AdminError> {
        if self.derivation_fails.load(Ordering::SeqCst) {
            return Err(AdminError::KeyOperation {
                message: "key derivation failed".to_string(),
            });
        }

        let mut hasher = Sha256::new();
        hasher.update(password.expose_secret().as_bytes());
        hasher.update(salt.0.as_bytes());
        Ok(DerivedKey::new(hex::encode(hasher.finalize())))
    }

    async fn reencrypt_private_key(
        &self,
        private_key: &OrgPrivateKey,
        key: &DerivedKey,
    ) -> Result<EncryptedKeyBlob, AdminError> {
        if self.reencryption_fails.load(Ordering::SeqCst) {
            return Err(AdminError::KeyOperation {
                message: "private key re-encryption failed".to_string(),
            });
        }

        let mut hasher = Sha256::new();
        hasher.update(private_key.expose().as_bytes());
        hasher.update(key.expose().as_bytes());
        Ok(EncryptedKeyBlob(format!(
            "enc:{}",
            hex::encode(hasher.finalize())
        )))
    }
}

// ============================================================================
// Recorders
// ============================================================================

/// Notifier capturing every notification
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

/// Event log counting refresh requests
pub struct RecordingEventLog {
    refreshes: AtomicU32,
}

impl RecordingEventLog {
    pub fn new() -> Self {
        Self {
            refreshes: AtomicU32::new(0),
        }
    }

    pub fn refreshes(&self) -> u32 {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl Default for RecordingEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog for RecordingEventLog {
    fn refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Navigator recording visited views
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self {
            visits: Mutex::new(Vec::new()),
        }
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Default for RecordingNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for RecordingNavigator {
    fn go(&self, view: &str) {
        self.visits.lock().unwrap().push(view.to_string());
    }
}

// ============================================================================
// Context launcher
// ============================================================================

enum RemoteBehavior {
    /// Announce ready (after the configured delay) and receive the session
    Ready,
    /// Never announce ready
    Silent,
    /// Announce ready with a forged declared origin, then stay silent
    ForgedOrigin(Origin),
}

/// In-process context launcher
///
/// Spawns the remote half of the handoff as a tokio task so tests exercise
/// the real handshake over a real channel pair.
pub struct LocalContextLauncher {
    behavior: RemoteBehavior,
    ready_delay: Duration,
    targets: Mutex<Vec<String>>,
    delivered: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicU32>,
}

impl LocalContextLauncher {
    pub fn new() -> Self {
        Self {
            behavior: RemoteBehavior::Ready,
            ready_delay: Duration::ZERO,
            targets: Mutex::new(Vec::new()),
            delivered: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicU32::new(0)),
        }
    }

    /// A context that never announces ready
    pub fn silent() -> Self {
        Self {
            behavior: RemoteBehavior::Silent,
            ..Self::new()
        }
    }

    /// A context whose ready message declares `origin` instead of its own
    pub fn with_forged_origin(origin: Origin) -> Self {
        Self {
            behavior: RemoteBehavior::ForgedOrigin(origin),
            ..Self::new()
        }
    }

    /// Delay between the spawn and the ready announcement
    pub fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.ready_delay = delay;
        self
    }

    /// Targets every spawned context was navigated to
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }

    /// Session tokens received by spawned contexts
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }

    /// How many spawned contexts were closed by the initiator
    pub fn closed(&self) -> u32 {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for LocalContextLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextLauncher for LocalContextLauncher {
    async fn launch(&self, origin: &Origin, target: &str) -> Result<LaunchedContext, AdminError> {
        self.targets.lock().unwrap().push(target.to_string());

        let (initiator_end, mut remote_end) = ChannelEndpoint::pair(origin.clone(), origin.clone());
        let delay = self.ready_delay;

        match &self.behavior {
            RemoteBehavior::Ready => {
                let delivered = Arc::clone(&self.delivered);
                tokio::spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    if let Ok(payload) = receive_session(&mut remote_end).await {
                        delivered
                            .lock()
                            .unwrap()
                            .push(payload.session_token.expose().to_string());
                    }
                });
            }
            RemoteBehavior::Silent => {
                tokio::spawn(async move {
                    // the waiting view never comes up; keep the endpoint
                    // alive so the channel stays open
                    let _endpoint = remote_end;
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                });
            }
            RemoteBehavior::ForgedOrigin(forged) => {
                let forged = forged.clone();
                tokio::spawn(async move {
                    let _ = remote_end
                        .send_raw(Envelope {
                            origin: forged,
                            message: Message::Ready,
                        })
                        .await;
                    let _endpoint = remote_end;
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                });
            }
        }

        let closed = Arc::clone(&self.closed);
        Ok(LaunchedContext::new(initiator_end, move || {
            closed.fetch_add(1, Ordering::SeqCst);
        }))
    }
}
