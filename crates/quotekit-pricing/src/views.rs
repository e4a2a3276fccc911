//! Projections of a priced project for the shop (internal) and the customer
//! (external).

use crate::{AppliedFinish, PricingOutcome, SkippedItem};
use quotekit_core::model::{CostLineItem, ProjectSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalQuote {
    pub project_name: String,
    pub company: String,
    pub finish: Option<AppliedFinish>,
    pub lines: Vec<CostLineItem>,
    pub skipped: Vec<SkippedItem>,
    pub total_volume: f64,
    pub total_weight: f64,
    pub total_cost: f64,
}

/// Customer-facing line. Weight, density and per-pound price stay internal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalLine {
    pub component: String,
    pub material: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalQuote {
    pub project_name: String,
    pub company: String,
    pub finish: Option<String>,
    pub lines: Vec<ExternalLine>,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project_name: String,
    pub total_components: usize,
    pub total_weight: f64,
    pub total_cost: f64,
    /// Material name -> number of priced lines using it.
    pub material_distribution: BTreeMap<String, usize>,
}

pub fn internal_view(spec: &ProjectSpec, outcome: &PricingOutcome) -> InternalQuote {
    InternalQuote {
        project_name: spec.project_name.clone(),
        company: outcome.company_name.clone(),
        finish: outcome.finish.clone(),
        lines: outcome.line_items.clone(),
        skipped: outcome.skipped.clone(),
        total_volume: outcome.total_volume,
        total_weight: outcome.total_weight,
        total_cost: outcome.total_cost,
    }
}

pub fn external_view(spec: &ProjectSpec, outcome: &PricingOutcome) -> ExternalQuote {
    let lines = outcome
        .line_items
        .iter()
        .map(|item| ExternalLine {
            component: item.component.clone(),
            material: item.material.clone(),
            quantity: item.quantity,
            // Finish included, so unit_price * quantity == subtotal.
            unit_price: item.subtotal / f64::from(item.quantity.max(1)),
            subtotal: item.subtotal,
        })
        .collect();

    ExternalQuote {
        project_name: spec.project_name.clone(),
        company: outcome.company_name.clone(),
        finish: outcome.finish.as_ref().map(|f| f.name.clone()),
        lines,
        total_cost: outcome.total_cost,
    }
}

pub fn summarize(spec: &ProjectSpec, outcome: &PricingOutcome) -> ProjectSummary {
    let mut material_distribution = BTreeMap::new();
    for item in &outcome.line_items {
        *material_distribution.entry(item.material.clone()).or_insert(0) += 1;
    }

    ProjectSummary {
        project_name: spec.project_name.clone(),
        total_components: spec.components.len(),
        total_weight: outcome.total_weight,
        total_cost: outcome.total_cost,
        material_distribution,
    }
}
