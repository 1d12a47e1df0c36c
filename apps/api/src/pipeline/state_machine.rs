//! Estimation session state machine.
//!
//! ```text
//! Idle ──submit──▶ AnalyzingMarket ──market resolved──▶ Estimating ──estimate resolved──▶ Complete
//!  ▲                     │                                  │                              │
//!  │                     └──────────── failed / cancelled ──┴──────────▶ Error             │
//!  └──────────────────────────────── reset ◀───────────────────────────────────────────────┘
//! ```
//!
//! Every run carries the session `epoch` it started in. `reset`, `cancel`, and a new
//! `submit` bump the epoch, so late results from an abandoned run are dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::transcript::ChatTranscript;
use crate::models::chat::ChatMessage;
use crate::models::estimate::EstimationResult;
use crate::models::upload::{FileSummary, UploadedFile};
use crate::models::wage::WageData;

pub const DEFAULT_ERROR_MESSAGE: &str = "An unexpected error occurred during estimation.";
pub const MISSING_INPUT_MESSAGE: &str = "Please upload diagrams or enter requirements.";
pub const CANCELLED_MESSAGE: &str = "Estimation cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Idle,
    AnalyzingMarket,
    Estimating,
    Complete,
    Error,
}

impl PipelineStatus {
    pub fn is_running(self) -> bool {
        matches!(
            self,
            PipelineStatus::AnalyzingMarket | PipelineStatus::Estimating
        )
    }

    /// Submission is only possible from `Idle` and `Error`.
    pub fn accepts_submit(self) -> bool {
        matches!(self, PipelineStatus::Idle | PipelineStatus::Error)
    }
}

/// Why a session operation was refused. None of these change state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("{}", MISSING_INPUT_MESSAGE)]
    MissingInput,

    #[error("An estimation is already running for this session")]
    Busy,

    #[error("This session already has an estimate; reset it to start over")]
    AlreadyComplete,

    #[error("No estimation is running")]
    NotRunning,

    #[error("Session input cannot change while an estimate is running or displayed")]
    InputLocked,

    #[error("Country must not be empty")]
    BlankCountry,

    #[error("No file at position {0}")]
    FileNotFound(usize),

    #[error("Attachments would total {total} bytes; the limit per session is {limit}")]
    AttachmentsTooLarge { total: usize, limit: usize },

    #[error("Chat is available once an estimate is complete")]
    NoEstimate,

    #[error("A chat reply is still pending")]
    ChatBusy,

    #[error("Message must not be empty")]
    BlankMessage,
}

/// Everything a pipeline run needs, detached from the session lock.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub epoch: u64,
    pub country: String,
    pub requirements: String,
    pub files: Vec<UploadedFile>,
    pub cancel: CancellationToken,
}

/// A pending chat exchange, detached from the session lock.
#[derive(Debug, Clone)]
pub struct ChatTicket {
    pub epoch: u64,
    pub question: String,
    /// Transcript before `question` was appended.
    pub history: Vec<ChatMessage>,
    pub context: EstimationResult,
}

/// Client-facing view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub status: PipelineStatus,
    pub country: String,
    pub requirements: String,
    pub files: Vec<FileSummary>,
    pub wage_data: Option<WageData>,
    pub result: Option<EstimationResult>,
    pub error_message: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub can_submit: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct EstimationSession {
    id: Uuid,
    status: PipelineStatus,
    country: String,
    requirements: String,
    files: Vec<UploadedFile>,
    wage_data: Option<WageData>,
    result: Option<EstimationResult>,
    error_message: Option<String>,
    chat: ChatTranscript,
    chat_pending: bool,
    epoch: u64,
    cancel: Option<CancellationToken>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EstimationSession {
    pub fn new(id: Uuid, country: &str) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: PipelineStatus::Idle,
            country: country.to_string(),
            requirements: String::new(),
            files: Vec::new(),
            wage_data: None,
            result: None,
            error_message: None,
            chat: ChatTranscript::default(),
            chat_pending: false,
            epoch: 0,
            cancel: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn result(&self) -> Option<&EstimationResult> {
        self.result.as_ref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.chat.messages()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        if self.status.accepts_submit() {
            Ok(())
        } else {
            Err(SessionError::InputLocked)
        }
    }

    // ── Input ───────────────────────────────────────────────────────────────

    pub fn set_country(&mut self, country: &str) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let country = country.trim();
        if country.is_empty() {
            return Err(SessionError::BlankCountry);
        }
        self.country = country.to_string();
        self.touch();
        Ok(())
    }

    pub fn set_requirements(&mut self, requirements: &str) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.requirements = requirements.to_string();
        self.touch();
        Ok(())
    }

    /// Attaches `files` as a batch. Refused as a whole if the session's attachments
    /// would exceed `max_total_bytes`.
    pub fn add_files(
        &mut self,
        files: Vec<UploadedFile>,
        max_total_bytes: usize,
    ) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let total = self
            .files
            .iter()
            .chain(files.iter())
            .map(UploadedFile::size)
            .sum::<usize>();
        if total > max_total_bytes {
            return Err(SessionError::AttachmentsTooLarge {
                total,
                limit: max_total_bytes,
            });
        }
        self.files.extend(files);
        self.touch();
        Ok(())
    }

    pub fn file(&self, index: usize) -> Result<&UploadedFile, SessionError> {
        self.files.get(index).ok_or(SessionError::FileNotFound(index))
    }

    pub fn remove_file(&mut self, index: usize) -> Result<UploadedFile, SessionError> {
        self.ensure_editable()?;
        if index >= self.files.len() {
            return Err(SessionError::FileNotFound(index));
        }
        let removed = self.files.remove(index);
        self.touch();
        Ok(removed)
    }

    // ── Pipeline transitions ────────────────────────────────────────────────

    /// `Idle | Error → AnalyzingMarket`. Requires a file or non-blank requirements.
    pub fn submit(&mut self) -> Result<RunTicket, SessionError> {
        match self.status {
            s if s.is_running() => return Err(SessionError::Busy),
            PipelineStatus::Complete => return Err(SessionError::AlreadyComplete),
            _ => {}
        }
        if self.files.is_empty() && self.requirements.trim().is_empty() {
            return Err(SessionError::MissingInput);
        }

        let cancel = CancellationToken::new();
        self.epoch += 1;
        self.status = PipelineStatus::AnalyzingMarket;
        self.error_message = None;
        self.wage_data = None;
        self.cancel = Some(cancel.clone());
        self.touch();
        info!("Session {} run {}: analyzing market for {}", self.id, self.epoch, self.country);

        Ok(RunTicket {
            epoch: self.epoch,
            country: self.country.clone(),
            requirements: self.requirements.clone(),
            files: self.files.clone(),
            cancel,
        })
    }

    fn is_current(&self, epoch: u64, expected: PipelineStatus) -> bool {
        if self.epoch == epoch && self.status == expected {
            return true;
        }
        warn!(
            "Session {}: dropping stale transition for run {} (current run {}, status {:?})",
            self.id, epoch, self.epoch, self.status
        );
        false
    }

    /// `AnalyzingMarket → Estimating`. Returns false for a stale run.
    pub fn market_resolved(&mut self, epoch: u64, wage: WageData) -> bool {
        if !self.is_current(epoch, PipelineStatus::AnalyzingMarket) {
            return false;
        }
        info!(
            "Session {} run {}: estimating with {} rates{}",
            self.id,
            epoch,
            wage.currency_code,
            if wage.is_fallback() { " (fallback)" } else { "" }
        );
        self.wage_data = Some(wage);
        self.status = PipelineStatus::Estimating;
        self.touch();
        true
    }

    /// `Estimating → Complete`. Starts a fresh chat for the new result.
    pub fn estimate_resolved(&mut self, epoch: u64, result: EstimationResult) -> bool {
        if !self.is_current(epoch, PipelineStatus::Estimating) {
            return false;
        }
        info!("Session {} run {}: complete ({})", self.id, epoch, result.project_name);
        self.result = Some(result);
        self.chat.clear();
        self.status = PipelineStatus::Complete;
        self.cancel = None;
        self.touch();
        true
    }

    /// `AnalyzingMarket | Estimating → Error`. A blank message becomes the default text.
    pub fn estimate_failed(&mut self, epoch: u64, message: &str) -> bool {
        if self.epoch != epoch || !self.status.is_running() {
            warn!(
                "Session {}: dropping stale failure for run {}: {message}",
                self.id, epoch
            );
            return false;
        }
        let message = if message.trim().is_empty() {
            DEFAULT_ERROR_MESSAGE
        } else {
            message
        };
        warn!("Session {} run {}: failed: {message}", self.id, epoch);
        self.error_message = Some(message.to_string());
        self.status = PipelineStatus::Error;
        self.cancel = None;
        self.touch();
        true
    }

    /// Aborts the in-flight run: `AnalyzingMarket | Estimating → Error`.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        if !self.status.is_running() {
            return Err(SessionError::NotRunning);
        }
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.epoch += 1;
        self.error_message = Some(CANCELLED_MESSAGE.to_string());
        self.status = PipelineStatus::Error;
        self.touch();
        info!("Session {}: run cancelled", self.id);
        Ok(())
    }

    /// Back to `Idle` with files, requirements, result, and chat cleared. Refused while running.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.status.is_running() {
            return Err(SessionError::Busy);
        }
        self.epoch += 1;
        self.status = PipelineStatus::Idle;
        self.files.clear();
        self.requirements.clear();
        self.result = None;
        self.wage_data = None;
        self.error_message = None;
        self.chat.clear();
        self.chat_pending = false;
        self.touch();
        Ok(())
    }

    /// Cancels whatever is running; used when the session is dropped.
    pub fn abandon(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.epoch += 1;
    }

    // ── Chat ────────────────────────────────────────────────────────────────

    pub fn begin_chat(&mut self, message: &str) -> Result<ChatTicket, SessionError> {
        if message.trim().is_empty() {
            return Err(SessionError::BlankMessage);
        }
        let context = match (&self.status, &self.result) {
            (PipelineStatus::Complete, Some(result)) => result.clone(),
            _ => return Err(SessionError::NoEstimate),
        };
        if self.chat_pending {
            return Err(SessionError::ChatBusy);
        }
        let history = self.chat.messages().to_vec();
        self.chat.push_question(message);
        self.chat_pending = true;
        self.touch();
        Ok(ChatTicket {
            epoch: self.epoch,
            question: message.to_string(),
            history,
            context,
        })
    }

    /// Records the reply if the estimate it was about is still displayed.
    /// The question is already in the transcript from `begin_chat`.
    pub fn finish_chat(
        &mut self,
        ticket: &ChatTicket,
        outcome: Result<String, String>,
    ) -> Option<ChatMessage> {
        if self.epoch != ticket.epoch || self.status != PipelineStatus::Complete {
            warn!("Session {}: discarding chat reply for a replaced estimate", self.id);
            return None;
        }
        self.chat_pending = false;
        let reply = self.chat.record_reply(outcome).clone();
        self.touch();
        Some(reply)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            status: self.status,
            country: self.country.clone(),
            requirements: self.requirements.clone(),
            files: self.files.iter().map(UploadedFile::summary).collect(),
            wage_data: self.wage_data.clone(),
            result: self.result.clone(),
            error_message: self.error_message.clone(),
            messages: self.chat.messages().to_vec(),
            can_submit: self.status.accepts_submit(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
