//! Lifecycle phases and hook execution.

use crate::error::{CoreError, CoreResult};
use crate::options::Options;
use crate::record::Record;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A point in the record lifecycle where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// After a record is loaded by a finder.
    AfterFind,
    /// Before validations run.
    BeforeValidation,
    /// After validations pass.
    AfterValidation,
    /// Before every save.
    BeforeSave,
    /// Before saving a new record.
    BeforeCreate,
    /// Before saving a persisted record.
    BeforeUpdate,
    /// Before a destroy.
    BeforeDestroy,
    /// After every save.
    AfterSave,
    /// After saving a new record.
    AfterCreate,
    /// After saving a persisted record.
    AfterUpdate,
    /// After a destroy.
    AfterDestroy,
}

impl Phase {
    /// Every phase.
    pub const ALL: [Phase; 11] = [
        Phase::AfterFind,
        Phase::BeforeValidation,
        Phase::AfterValidation,
        Phase::BeforeSave,
        Phase::BeforeCreate,
        Phase::BeforeUpdate,
        Phase::BeforeDestroy,
        Phase::AfterSave,
        Phase::AfterCreate,
        Phase::AfterUpdate,
        Phase::AfterDestroy,
    ];

    /// Snake-case phase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::AfterFind => "after_find",
            Phase::BeforeValidation => "before_validation",
            Phase::AfterValidation => "after_validation",
            Phase::BeforeSave => "before_save",
            Phase::BeforeCreate => "before_create",
            Phase::BeforeUpdate => "before_update",
            Phase::BeforeDestroy => "before_destroy",
            Phase::AfterSave => "after_save",
            Phase::AfterCreate => "after_create",
            Phase::AfterUpdate => "after_update",
            Phase::AfterDestroy => "after_destroy",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook tells the lifecycle to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookOutcome {
    /// Keep going.
    #[default]
    Continue,
    /// Stop the chain.
    Abort,
}

/// A registered record method that may mutate the record.
pub type HookFn = Arc<dyn Fn(&mut Record) -> HookOutcome + Send + Sync>;

/// A named method attached to a phase.
#[derive(Debug, Clone)]
pub struct Callback {
    method: String,
    options: Options,
}

impl Callback {
    /// Creates a callback.
    pub fn new(method: impl Into<String>, options: Options) -> Self {
        Self {
            method: method.into(),
            options,
        }
    }

    /// The method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The gating options.
    pub fn options(&self) -> &Options {
        &self.options
    }
}

/// Runs the hooks of `phase` in registration order.
///
/// Hooks whose options do not match are skipped. The first `Abort` stops
/// the chain and is returned.
pub(crate) fn run_phase(record: &mut Record, phase: Phase) -> CoreResult<HookOutcome> {
    run_hooks(record, phase, true)
}

/// Runs every matching hook of `phase`, ignoring their outcomes.
pub(crate) fn run_each(record: &mut Record, phase: Phase) -> CoreResult<()> {
    run_hooks(record, phase, false).map(|_| ())
}

fn run_hooks(record: &mut Record, phase: Phase, stop_on_abort: bool) -> CoreResult<HookOutcome> {
    let schema = Arc::clone(record.schema());
    for callback in schema.callbacks(phase) {
        if !callback.options.matched(record) {
            continue;
        }
        let hook = schema
            .hook(&callback.method)
            .ok_or_else(|| CoreError::unknown_method(&callback.method))?;
        if hook(record) == HookOutcome::Abort && stop_on_abort {
            debug!(
                table = schema.table_name(),
                phase = phase.as_str(),
                method = callback.method.as_str(),
                "hook aborted"
            );
            return Ok(HookOutcome::Abort);
        }
    }
    Ok(HookOutcome::Continue)
}
