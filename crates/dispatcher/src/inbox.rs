// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The inbox (§6 `prloom/.local/inbox/<id>.{md,json}`): plans that have not
//! yet been ingested into a worktree. Also implements [`PlanRegistry`], the
//! seam `prloom-bridge`'s built-in `prloom-core` bridge uses to create or
//! update a plan from an `upsert_plan` action (§4.5).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use prloom_bridge::{PlanRegistry, UpsertPlanPayload};
use prloom_bridge::BridgeError;
use prloom_bus::atomic::{read_json_or_default, write_json_atomic};
use prloom_core::interfaces::plan_doc::PlanDoc;
use prloom_core::{IdGen, PlanDocument, PlanId, PlanSourceIdentity, PlanStatus, Todo};

use crate::layout::RepoLayout;
use crate::DispatcherError;

/// `<id>.json` next to `<id>.md` in the inbox (§6). `status` is only ever
/// `Draft` or `Queued` while an entry lives here; other values are a
/// caller bug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxMeta {
    pub status: PlanStatus,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub source: Option<PlanSourceIdentity>,
    #[serde(default)]
    pub hidden: bool,
}

impl InboxMeta {
    /// A freshly bridge-materialized entry lands as `draft` when `hidden`
    /// (a designer agent may still be shaping it) and `queued` otherwise
    /// (§3 entity table).
    pub fn for_new_plan(source: PlanSourceIdentity, hidden: bool) -> Self {
        Self {
            status: if hidden { PlanStatus::Draft } else { PlanStatus::Queued },
            agent: None,
            preset: None,
            source: Some(source),
            hidden,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SourceIndex {
    entries: Vec<SourceIndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SourceIndexEntry {
    source: PlanSourceIdentity,
    plan_id: PlanId,
}

/// Generic over the id generator because [`IdGen`] extends `Clone`, which
/// makes it non-object-safe — `UuidIdGen` in production, `SequentialIdGen`
/// in tests.
pub struct InboxStore<G: IdGen> {
    layout: RepoLayout,
    plan_doc: Arc<dyn PlanDoc>,
    id_gen: G,
}

impl<G: IdGen> InboxStore<G> {
    pub fn new(layout: RepoLayout, plan_doc: Arc<dyn PlanDoc>, id_gen: G) -> Self {
        Self { layout, plan_doc, id_gen }
    }

    pub fn read_meta(&self, id: &PlanId) -> Result<InboxMeta, DispatcherError> {
        let bytes = std::fs::read(self.layout.inbox_plan_meta(id))?;
        serde_json::from_slice(&bytes).map_err(DispatcherError::from)
    }

    pub fn write_meta(&self, id: &PlanId, meta: &InboxMeta) -> Result<(), DispatcherError> {
        let path = self.layout.inbox_plan_meta(id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(meta)?;
        std::fs::write(path, bytes).map_err(DispatcherError::from)
    }

    /// Every plan id currently sitting in the inbox (§4.1 step 3 scans this
    /// set each tick).
    pub fn list_ids(&self) -> Result<Vec<PlanId>, DispatcherError> {
        let dir = self.layout.inbox_dir();
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Ok(Vec::new());
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(PlanId::new(stem));
                }
            }
        }
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    /// `activate` control command (§4.1 command table): `draft → queued`.
    pub fn activate(&self, id: &PlanId) -> Result<(), DispatcherError> {
        let mut meta = self.read_meta(id)?;
        meta.status = PlanStatus::Queued;
        self.write_meta(id, &meta)
    }

    /// Ingestion's final step (§4.1 step 3: "remove the inbox entry").
    pub fn remove(&self, id: &PlanId) -> Result<(), DispatcherError> {
        let md = self.layout.inbox_plan_md(id);
        let meta = self.layout.inbox_plan_meta(id);
        for path in [md, meta] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn load_source_index(&self) -> Result<SourceIndex, DispatcherError> {
        read_json_or_default(&self.layout.source_index_json()).map_err(DispatcherError::from)
    }

    fn save_source_index(&self, index: &SourceIndex) -> Result<(), DispatcherError> {
        write_json_atomic(&self.layout.source_index_json(), index).map_err(DispatcherError::from)
    }
}

#[async_trait]
impl<G: IdGen + 'static> PlanRegistry for InboxStore<G> {
    async fn find_plan_by_source(&self, source: &PlanSourceIdentity) -> Result<Option<PlanId>, BridgeError> {
        let index = self.load_source_index().map_err(|e| BridgeError::PlanRegistry(e.to_string()))?;
        Ok(index.entries.iter().find(|e| &e.source == source).map(|e| e.plan_id.clone()))
    }

    async fn upsert_plan(
        &self,
        existing: Option<PlanId>,
        payload: UpsertPlanPayload,
    ) -> Result<PlanId, BridgeError> {
        let to_err = |e: DispatcherError| BridgeError::PlanRegistry(e.to_string());

        let todos = payload
            .todos
            .iter()
            .enumerate()
            .map(|(i, text)| Todo::new(i, text.clone()))
            .collect();
        let doc = PlanDocument::new(payload.title, payload.body, todos);

        let plan_id = match &existing {
            Some(id) => id.clone(),
            None => PlanId::new(self.id_gen.next()),
        };

        let md_path = self.layout.inbox_plan_md(&plan_id);
        if let Some(parent) = md_path.parent() {
            std::fs::create_dir_all(parent).map_err(DispatcherError::from).map_err(to_err)?;
        }
        self.plan_doc
            .create(&md_path, &doc)
            .await
            .map_err(|e| BridgeError::PlanRegistry(e.to_string()))?;

        if existing.is_none() {
            let meta = InboxMeta::for_new_plan(payload.source.clone(), payload.hidden);
            self.write_meta(&plan_id, &meta).map_err(to_err)?;

            let mut index = self.load_source_index().map_err(to_err)?;
            index.entries.push(SourceIndexEntry { source: payload.source, plan_id: plan_id.clone() });
            self.save_source_index(&index).map_err(to_err)?;
        }

        Ok(plan_id)
    }
}

#[cfg(test)]
#[path = "inbox_tests.rs"]
mod tests;
