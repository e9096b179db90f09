/// Ticker input slots and the validation pass that turns them into a submission
///
/// A pass is single-flight: [`ValidationSession::begin_pass`] takes the session lock and hands
/// out an owned [`ValidationPass`], and only [`ValidationSession::finish_pass`] (or
/// [`ValidationSession::release_pass`]) gives it back. [`ValidationSession::submit`] also gives it
/// back if its future is dropped mid-pass. While the lock is held every input edit and new
/// submission is refused.

use crate::shared::{
    error::SessionError,
    registry::SymbolRegistry,
    validator::{normalize, SymbolValidator, ValidationOutcome},
};
use std::{
    fmt,
    time::{Duration, Instant},
};
use tracing::{debug, info};

/// Number of ticker input slots
pub const SLOT_COUNT: usize = 5;

/// Minimum number of non-blank slots for a submission
pub const MIN_TICKERS: usize = 2;

/// Destination of an accepted symbol list
pub trait SymbolSink {
    /// Fire-and-forget delivery of canonical symbols in slot order
    fn send_symbols(&self, symbols: &[String]);
}

/// Per-slot validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    Rejected,
}

impl fmt::Display for SlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotError::Rejected => f.write_str("invalid ticker"),
        }
    }
}

/// One fixed ticker input position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerSlot {
    raw: String,
    normalized: String,
    error: Option<SlotError>,
}

impl TickerSlot {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Trimmed, uppercased input
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn error(&self) -> Option<SlotError> {
        self.error
    }

    pub fn is_blank(&self) -> bool {
        self.normalized.is_empty()
    }

    fn set(&mut self, raw: String) {
        self.normalized = normalize(&raw);
        self.raw = raw;
        self.error = None;
    }
}

/// Transient success notification
#[derive(Debug, Clone)]
pub struct Notice {
    message: String,
    created: Instant,
    ttl: Duration,
}

impl Notice {
    fn new(message: String, ttl: Duration) -> Self {
        Self {
            message,
            created: Instant::now(),
            ttl,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_expired(&self) -> bool {
        self.created.elapsed() >= self.ttl
    }
}

/// Candidates of one validation pass, detached from the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPass {
    id: u64,
    candidates: Vec<(usize, String)>,
}

impl ValidationPass {
    /// Normalized candidates in slot order
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|(_, symbol)| symbol.as_str())
    }

    /// Validate every candidate in slot order, each lookup resolved before the next starts
    pub async fn run<R>(self, validator: &SymbolValidator<R>) -> PassReport
    where
        R: SymbolRegistry,
    {
        let mut outcomes = Vec::with_capacity(self.candidates.len());
        for (slot, symbol) in self.candidates {
            let outcome = validator.validate(&symbol).await;
            debug!(slot, %symbol, ?outcome, "slot validated");
            outcomes.push((slot, outcome));
        }

        PassReport {
            id: self.id,
            outcomes,
        }
    }
}

/// Per-slot outcomes of a completed [`ValidationPass`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    id: u64,
    outcomes: Vec<(usize, ValidationOutcome)>,
}

impl PassReport {
    pub fn outcomes(&self) -> &[(usize, ValidationOutcome)] {
        &self.outcomes
    }

    pub fn rejected_slots(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_rejected())
            .map(|(slot, _)| *slot)
            .collect()
    }

    /// Canonical symbols in slot order
    pub fn canonical(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|(_, outcome)| outcome.canonical().map(str::to_string))
            .collect()
    }
}

/// Result of applying a [`PassReport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassResult {
    /// Every candidate accepted, list handed to the sink
    Submitted(Vec<String>),
    /// At least one slot rejected, nothing sent
    Rejected(Vec<usize>),
}

/// Releases the session lock when dropped, including when a pending `submit` is cancelled
struct PassLock<'a>(&'a mut Option<u64>);

impl Drop for PassLock<'_> {
    fn drop(&mut self) {
        if let Some(pass) = self.0.take() {
            debug!(pass, "validation pass released");
        }
    }
}

/// The five ticker slots plus the single-flight validation lock
#[derive(Debug)]
pub struct ValidationSession {
    slots: [TickerSlot; SLOT_COUNT],
    active_pass: Option<u64>,
    next_pass: u64,
    error: Option<SessionError>,
    notice: Option<Notice>,
    notice_ttl: Duration,
}

impl Default for ValidationSession {
    fn default() -> Self {
        Self {
            slots: Default::default(),
            active_pass: None,
            next_pass: 0,
            error: None,
            notice: None,
            notice_ttl: Duration::from_secs(3),
        }
    }
}

impl ValidationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how long success notices stay visible
    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    /// Fill slots in order from `tickers`, ignoring anything past the last slot
    pub fn with_tickers(mut self, tickers: &[String]) -> Self {
        for (slot, ticker) in self.slots.iter_mut().zip(tickers) {
            slot.set(ticker.clone());
        }
        self
    }

    pub fn slots(&self) -> &[TickerSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&TickerSlot> {
        self.slots.get(index)
    }

    /// Check if a validation pass holds the lock
    pub fn is_busy(&self) -> bool {
        self.active_pass.is_some()
    }

    /// Session-level error of the last submission attempt
    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Current success notice, if it has not expired
    pub fn notice(&self) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|notice| !notice.is_expired())
            .map(Notice::message)
    }

    /// Replace the text of slot `index`, clearing its error
    pub fn set_input(&mut self, index: usize, raw: impl Into<String>) -> Result<(), SessionError> {
        self.slot_mut(index)?.set(raw.into());
        Ok(())
    }

    pub fn push_char(&mut self, index: usize, c: char) -> Result<(), SessionError> {
        let slot = self.slot_mut(index)?;
        let mut raw = std::mem::take(&mut slot.raw);
        raw.push(c);
        slot.set(raw);
        Ok(())
    }

    pub fn pop_char(&mut self, index: usize) -> Result<(), SessionError> {
        let slot = self.slot_mut(index)?;
        let mut raw = std::mem::take(&mut slot.raw);
        raw.pop();
        slot.set(raw);
        Ok(())
    }

    pub fn clear_slot(&mut self, index: usize) -> Result<(), SessionError> {
        self.set_input(index, String::new())
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut TickerSlot, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        self.slots
            .get_mut(index)
            .ok_or(SessionError::SlotOutOfRange(index))
    }

    /// Take the session lock and snapshot the non-blank slots
    ///
    /// Fewer than [`MIN_TICKERS`] non-blank slots fails with a session-level error, without
    /// taking the lock or touching slot errors.
    pub fn begin_pass(&mut self) -> Result<ValidationPass, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }

        self.notice = None;
        let candidates: Vec<(usize, String)> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_blank())
            .map(|(index, slot)| (index, slot.normalized.clone()))
            .collect();

        if candidates.len() < MIN_TICKERS {
            let error = SessionError::InsufficientTickers {
                found: candidates.len(),
            };
            self.error = Some(error.clone());
            return Err(error);
        }

        self.error = None;
        let id = self.next_pass;
        self.next_pass += 1;
        self.active_pass = Some(id);

        Ok(ValidationPass { id, candidates })
    }

    /// Apply the report of the active pass and release the lock
    ///
    /// Returns `None` for a report that does not belong to the active pass.
    pub fn finish_pass<S>(&mut self, report: PassReport, sink: &S) -> Option<PassResult>
    where
        S: SymbolSink + ?Sized,
    {
        if self.active_pass != Some(report.id) {
            debug!(pass = report.id, "discarding stale validation report");
            return None;
        }
        Some(self.apply_report(report, sink))
    }

    /// Release the lock without applying a report, e.g. when the pass task was lost
    pub fn release_pass(&mut self) {
        self.active_pass = None;
    }

    /// Run a complete pass: lock, validate sequentially, then submit or annotate
    pub async fn submit<R, S>(
        &mut self,
        validator: &SymbolValidator<R>,
        sink: &S,
    ) -> Result<PassResult, SessionError>
    where
        R: SymbolRegistry,
        S: SymbolSink + ?Sized,
    {
        let pass = self.begin_pass()?;
        let lock = PassLock(&mut self.active_pass);
        let report = pass.run(validator).await;
        drop(lock);
        Ok(self.apply_report(report, sink))
    }

    fn apply_report<S>(&mut self, report: PassReport, sink: &S) -> PassResult
    where
        S: SymbolSink + ?Sized,
    {
        self.active_pass = None;

        for slot in self.slots.iter_mut() {
            slot.error = None;
        }

        let rejected = report.rejected_slots();
        if !rejected.is_empty() {
            for index in &rejected {
                if let Some(slot) = self.slots.get_mut(*index) {
                    slot.error = Some(SlotError::Rejected);
                }
            }
            info!(?rejected, "validation pass rejected");
            return PassResult::Rejected(rejected);
        }

        let symbols = report.canonical();
        sink.send_symbols(&symbols);
        self.notice = Some(Notice::new(
            format!("Tracking {}", symbols.join(", ")),
            self.notice_ttl,
        ));

        PassResult::Submitted(symbols)
    }
}
