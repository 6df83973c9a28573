// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level scheduling loop (§4.1). One [`DispatcherLoop::tick`] call
//! performs, in order, the steps the distilled spec numbers: merge
//! external state, drain control commands, ingest inbox plans, tick the
//! global bus's bridges, advance every active plan, and persist state.
//! [`DispatcherLoop::run`] wraps `tick` in the cooperative sleep described
//! in §5 and §4.1 step 6: wake on control-log growth or a timeout,
//! whichever comes first.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use prloom_bridge::{BridgeRegistry, BridgeRuntime};
use prloom_bus::BusManager;
use prloom_core::interfaces::{AgentAdapter, PlanDoc, ReviewProvider, Vcs};
use prloom_core::{Clock, Config, IdGen, PlanId, PlanStatus};
use prloom_hooks::HookRegistry;
use prloom_runners::CompletionWatcher;

use crate::advance::{advance_one, AdvanceDeps, AdvanceOutcome};
use crate::apply::apply_command;
use crate::control::read_control_commands;
use crate::inbox::InboxStore;
use crate::ingest::{ingest_one, IngestDeps};
use crate::layout::RepoLayout;
use crate::lock::RepoLock;
use crate::state_store::{merge_external_state, DispatcherState};
use crate::DispatcherError;

/// Default max sleep between ticks when nothing wakes the loop early (§4.1
/// step 6: "Sleep until ... a timeout (default 5 s)").
pub const DEFAULT_TICK_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll granularity while waiting for the control log to grow (§4.1 step
/// 6: "polling every 250 ms"; §5 suspension point 1).
pub const CONTROL_POLL_PERIOD: Duration = Duration::from_millis(250);

/// Tally of what one [`DispatcherLoop::tick`] did, for logging/tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub commands_applied: usize,
    pub plans_ingested: usize,
    pub plans_skipped_empty: usize,
    pub plans_advanced: usize,
    pub plans_deleted: usize,
}

/// Constructor arguments for [`DispatcherLoop::new`], bundled so the
/// signature stays readable (mirrors [`crate::advance::AdvanceDeps`]).
pub struct DispatcherLoopDeps<C: Clock, G: IdGen + 'static> {
    pub layout: RepoLayout,
    pub clock: C,
    pub vcs: Arc<dyn Vcs>,
    pub review_provider: Arc<dyn ReviewProvider>,
    pub plan_doc: Arc<dyn PlanDoc>,
    pub adapter: Arc<dyn AgentAdapter>,
    pub watcher: Arc<dyn CompletionWatcher>,
    pub hooks: HookRegistry,
    pub global_bridges: BridgeRegistry,
    pub config: Config,
    pub agent_timeout: Duration,
    pub scratch_root: PathBuf,
    pub id_gen: G,
}

/// One long-running instance of the dispatcher loop against one repo
/// (§2 "Dispatcher Loop": "the top-level scheduler"). Holds the per-repo
/// exclusive lock (§5) for as long as it's alive.
pub struct DispatcherLoop<C: Clock, G: IdGen + 'static> {
    layout: RepoLayout,
    clock: C,
    vcs: Arc<dyn Vcs>,
    review_provider: Arc<dyn ReviewProvider>,
    plan_doc: Arc<dyn PlanDoc>,
    adapter: Arc<dyn AgentAdapter>,
    watcher: Arc<dyn CompletionWatcher>,
    hooks: HookRegistry,
    global_bridges: BridgeRegistry,
    config: Config,
    agent_timeout: Duration,
    scratch_root: PathBuf,
    inbox: InboxStore<G>,
    state: DispatcherState,
    control_offset: u64,
    last_bus_tick_epoch_ms: Option<u64>,
    _lock: RepoLock,
}

impl<C: Clock, G: IdGen + 'static> DispatcherLoop<C, G> {
    /// Acquire the repo lock (§5 "no other writer is permitted to exist"),
    /// load `state.json`, and build a loop ready to tick. Fails outright if
    /// another dispatcher instance already holds the lock.
    pub fn new(deps: DispatcherLoopDeps<C, G>) -> Result<Self, DispatcherError> {
        let lock = RepoLock::acquire(&deps.layout.repo_lock())?;
        let state = DispatcherState::load(&deps.layout.state_json())?;
        let control_offset = state.control_cursor;
        let inbox = InboxStore::new(deps.layout.clone(), deps.plan_doc.clone(), deps.id_gen);

        Ok(Self {
            layout: deps.layout,
            clock: deps.clock,
            vcs: deps.vcs,
            review_provider: deps.review_provider,
            plan_doc: deps.plan_doc,
            adapter: deps.adapter,
            watcher: deps.watcher,
            hooks: deps.hooks,
            global_bridges: deps.global_bridges,
            config: deps.config,
            agent_timeout: deps.agent_timeout,
            scratch_root: deps.scratch_root,
            inbox,
            state,
            control_offset,
            last_bus_tick_epoch_ms: None,
            _lock: lock,
        })
    }

    pub fn state(&self) -> &DispatcherState {
        &self.state
    }

    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    /// Run one tick (§4.1 steps 1-5). Per-plan failures never escape this
    /// far (§7: they become `PlanState::last_error`); only failures of the
    /// loop itself — lock, state IO, global bus IO, control-log IO —
    /// surface as `Err`.
    pub async fn tick(&mut self) -> Result<TickReport, DispatcherError> {
        let now = self.clock.epoch_ms();
        let mut report = TickReport::default();

        // 1. Merge external state changes.
        let disk = DispatcherState::load(&self.layout.state_json())?;
        merge_external_state(&mut self.state, disk);

        // 2. Drain control commands, in append order (§5 "Ordering
        // guarantees").
        let (commands, new_offset) = read_control_commands(&self.layout.control_log(), self.control_offset)?;
        self.control_offset = new_offset;
        self.state.control_cursor = new_offset;
        for command in &commands {
            apply_command(&mut self.state, &self.inbox, command, now)?;
            report.commands_applied += 1;
        }

        // 3. Ingest inbox plans, before advancement so a freshly-ingested
        // plan can be advanced the same tick it arrives.
        self.ingest_queued_plans(&mut report).await?;

        // Bus tick: the repo-global bus's registered bridges (§4.5). A
        // plan's own bus is ticked inside `advance_one` (§4.1's control
        // flow: "Dispatcher Loop -> (optionally) Bus tick -> for each
        // active plan"). Gated by `bus.tickIntervalMs` (§6) rather than
        // run every tick, since bridges do network/subprocess IO.
        let global_bus = BusManager::open(self.layout.global_bus_root())?;
        let due = match self.last_bus_tick_epoch_ms {
            Some(last) => now.saturating_sub(last) >= self.config.bus.tick_interval_ms,
            None => true,
        };
        if due {
            if let Err(e) = BridgeRuntime::tick(&global_bus, &self.global_bridges, now).await {
                tracing::warn!(error = %e, "global bus tick failed; retrying next tick");
            }
            self.last_bus_tick_epoch_ms = Some(now);
        }

        // 4. Advance each active plan.
        self.advance_all(&global_bus, now, &mut report).await?;

        global_bus.persist()?;

        // 5. Persist state.
        self.state.persist(&self.layout.state_json())?;

        Ok(report)
    }

    async fn ingest_queued_plans(&mut self, report: &mut TickReport) -> Result<(), DispatcherError> {
        let ids = self.inbox.list_ids()?;
        for id in ids {
            let meta = match self.inbox.read_meta(&id) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(plan_id = %id, error = %e, "unreadable inbox metadata; skipping");
                    continue;
                }
            };
            if meta.status != PlanStatus::Queued {
                continue;
            }

            let ingest_deps = IngestDeps {
                layout: &self.layout,
                vcs: &self.vcs,
                review_provider: &self.review_provider,
                plan_doc: &self.plan_doc,
                base_branch: &self.config.base_branch,
            };

            match ingest_one(&ingest_deps, &id, &meta).await {
                Ok(Some(ingested)) => {
                    self.state.insert_plan(&ingested.id, ingested.state);
                    self.inbox.remove(&id)?;
                    report.plans_ingested += 1;
                }
                Ok(None) => {
                    // §4.1 step 3: zero-TODO plans are skipped and logged,
                    // not blocked, to avoid an immediate "done" loop. Left
                    // in the inbox so a designer agent can add TODOs later.
                    report.plans_skipped_empty += 1;
                }
                Err(e) => {
                    tracing::warn!(plan_id = %id, error = %e, "inbox ingestion failed; will retry next tick");
                }
            }
        }
        Ok(())
    }

    async fn advance_all(
        &mut self,
        global_bus: &BusManager,
        now: u64,
        report: &mut TickReport,
    ) -> Result<(), DispatcherError> {
        let mut ids: Vec<PlanId> = self.state.plans.keys().map(|k| PlanId::new(k.clone())).collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let mut to_delete = Vec::new();
        for id in ids {
            let Some(mut ps) = self.state.plans.remove(id.as_str()) else {
                continue;
            };

            let deps = AdvanceDeps {
                layout: &self.layout,
                vcs: &self.vcs,
                review_provider: &self.review_provider,
                plan_doc: &self.plan_doc,
                adapter: &self.adapter,
                watcher: &self.watcher,
                hooks: &self.hooks,
                global_bus,
                config: &self.config,
                agent_timeout: self.agent_timeout,
                scratch_root: &self.scratch_root,
            };

            match advance_one(&deps, &id, &mut ps, now).await {
                Ok(AdvanceOutcome::Continue) => {
                    self.state.plans.insert(id.as_str().to_string(), ps);
                    report.plans_advanced += 1;
                }
                Ok(AdvanceOutcome::Delete) => {
                    to_delete.push(id);
                }
                Err(e) => {
                    // §5 "Cancellation/timeouts": the loop catches
                    // per-plan failures and continues, turning them into
                    // `lastError` rather than aborting the tick.
                    tracing::warn!(plan_id = %id, error = %e, "plan advancement failed; blocking plan");
                    ps.blocked = true;
                    ps.last_error = Some(e.to_string());
                    self.state.plans.insert(id.as_str().to_string(), ps);
                }
            }
        }

        for id in to_delete {
            self.state.remove_plan(&id);
            report.plans_deleted += 1;
        }

        Ok(())
    }

    /// Run forever, ticking and then sleeping until either the control log
    /// grows past the cursor or `timeout` elapses (§4.1 step 6).
    pub async fn run(&mut self, timeout: Duration) -> Result<(), DispatcherError> {
        loop {
            self.tick().await?;
            self.wait_for_wake(timeout).await;
        }
    }

    async fn wait_for_wake(&self, timeout: Duration) {
        let control_path = self.layout.control_log();
        let start_len = file_len(&control_path);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() >= deadline {
                return;
            }
            if file_len(&control_path) > start_len {
                return;
            }
            tokio::time::sleep(CONTROL_POLL_PERIOD).await;
        }
    }
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
#[path = "run_loop_tests.rs"]
mod tests;
