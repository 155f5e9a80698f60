//! Fingerprint-gated merge of a remote manifest into local items.
//!
//! Replacement content is applied only when the remote entry was computed
//! from the same original content the local item still has. Derived
//! metadata is refreshed regardless.

use std::collections::HashMap;

use crate::fingerprint::content_fingerprint;
use crate::item::{DerivedFields, LocalItem};
use crate::manifest::{ManifestError, ManifestItem, RemoteManifest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Remote carries replacement content but no record of its original.
    Unverifiable,
    /// The local source changed since the remote result was computed.
    Diverged { local: String, remote: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemDecision {
    Applied,
    Skipped(SkipReason),
    PassThrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReconciliation {
    pub item_id: String,
    pub decision: ItemDecision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileDiagnostic {
    /// The manifest could not be read as a list of items; nothing was merged.
    MalformedManifest(ManifestError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub merged_items: Vec<LocalItem>,
    pub skipped_item_ids: Vec<String>,
    pub resolved_document_identity: Option<String>,
    /// One entry per local item, in input order.
    pub decisions: Vec<ItemReconciliation>,
    pub diagnostic: Option<ReconcileDiagnostic>,
}

impl ReconcileOutcome {
    pub fn applied_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| d.decision == ItemDecision::Applied)
            .count()
    }
}

/// Merge `manifest` into `local_items`. Pure and deterministic.
pub fn reconcile(local_items: &[LocalItem], manifest: &RemoteManifest) -> ReconcileOutcome {
    let resolved_document_identity = manifest.document_identity();

    let remote_items = match manifest.items() {
        Ok(items) => items,
        Err(err) => {
            return ReconcileOutcome {
                merged_items: local_items.to_vec(),
                skipped_item_ids: Vec::new(),
                resolved_document_identity,
                decisions: local_items
                    .iter()
                    .map(|item| ItemReconciliation {
                        item_id: item.item_id.clone(),
                        decision: ItemDecision::PassThrough,
                    })
                    .collect(),
                diagnostic: Some(ReconcileDiagnostic::MalformedManifest(err)),
            };
        }
    };
    let by_id: HashMap<&str, &ManifestItem> = remote_items
        .iter()
        .map(|item| (item.item_id.as_str(), item))
        .collect();

    let mut merged_items = Vec::with_capacity(local_items.len());
    let mut skipped_item_ids = Vec::new();
    let mut decisions = Vec::with_capacity(local_items.len());

    for local in local_items {
        let (merged, decision) = match by_id.get(local.item_id.as_str()) {
            Some(remote) => merge_item(local, remote),
            None => (local.clone(), ItemDecision::PassThrough),
        };
        if matches!(decision, ItemDecision::Skipped(_)) {
            skipped_item_ids.push(local.item_id.clone());
        }
        decisions.push(ItemReconciliation {
            item_id: local.item_id.clone(),
            decision,
        });
        merged_items.push(merged);
    }

    ReconcileOutcome {
        merged_items,
        skipped_item_ids,
        resolved_document_identity,
        decisions,
        diagnostic: None,
    }
}

fn merge_item(local: &LocalItem, remote: &ManifestItem) -> (LocalItem, ItemDecision) {
    let mut merged = local.clone();
    let decision = content_decision(local, remote);

    if decision == ItemDecision::Applied {
        if let Some(refined) = &remote.refined_content {
            merged.edited_content = refined.clone();
            merged.refresh_metrics();
        }
        if let Some(remote_fp) = remote_fingerprint(remote) {
            merged.content_fingerprint = remote_fp;
        }
    }

    merged.derived = merge_derived(&local.derived, remote);
    (merged, decision)
}

fn content_decision(local: &LocalItem, remote: &ManifestItem) -> ItemDecision {
    if !remote.has_replacement() {
        return ItemDecision::PassThrough;
    }
    match remote_fingerprint(remote) {
        None => ItemDecision::Skipped(SkipReason::Unverifiable),
        Some(remote_fp) if remote_fp == local.content_fingerprint => ItemDecision::Applied,
        Some(remote_fp) => ItemDecision::Skipped(SkipReason::Diverged {
            local: local.content_fingerprint.clone(),
            remote: remote_fp,
        }),
    }
}

fn remote_fingerprint(remote: &ManifestItem) -> Option<String> {
    remote
        .original_content
        .as_deref()
        .map(content_fingerprint)
        .or_else(|| remote.original_fingerprint.clone())
}

fn merge_derived(local: &DerivedFields, remote: &ManifestItem) -> DerivedFields {
    DerivedFields {
        insights: remote
            .insights
            .clone()
            .map(|insights| insights.clamped())
            .or_else(|| local.insights.clone()),
        audio: remote.audio.clone().or_else(|| local.audio.clone()),
        metrics: remote
            .metrics
            .clone()
            .map(|metrics| metrics.clamped())
            .or_else(|| local.metrics.clone()),
    }
}
