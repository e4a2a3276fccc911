use itertools::izip;
use quotekit_core::error::{MalformedProjectError, StoreError};
use quotekit_core::model::{CompanyPriceTable, CostLineItem, FieldValue, ProjectSpec};
use quotekit_core::store::PriceStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod views;

/// Why a row of the project was left out of the quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// A column value could not be read as the number it should be.
    InvalidValue { field: String, message: String },
    /// The company has no active price for the material.
    UnpricedMaterial { material_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub index: usize,
    pub component: String,
    pub reason: SkipReason,
}

/// The finish requested for the project and the multiplier actually applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFinish {
    pub name: String,
    pub multiplier: f64,
    /// False when the company has no active price for the finish and 1.0 was used.
    pub priced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingOutcome {
    pub company_id: i64,
    pub company_name: String,
    pub line_items: Vec<CostLineItem>,
    pub skipped: Vec<SkippedItem>,
    pub finish: Option<AppliedFinish>,
    pub total_volume: f64,
    pub total_weight: f64,
    pub total_cost: f64,
}

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Malformed(#[from] MalformedProjectError),
}

/// Coerced numeric columns of one project row.
struct RowValues {
    material_id: i64,
    quantity: u32,
    volume: f64,
}

fn coerce_row(
    material: &FieldValue,
    quantity: &FieldValue,
    volume: &FieldValue,
) -> Result<RowValues, SkipReason> {
    let invalid = |field: &str, message: String| SkipReason::InvalidValue {
        field: field.to_string(),
        message,
    };

    let volume = volume
        .to_f64()
        .map_err(|e| invalid("volume", e.to_string()))?;
    if volume < 0.0 {
        return Err(invalid("volume", format!("volume {volume} is negative")));
    }

    let quantity = quantity
        .to_i64()
        .map_err(|e| invalid("quantity", e.to_string()))?;
    let quantity = u32::try_from(quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| invalid("quantity", format!("quantity {quantity} is not a positive count")))?;

    let material_id = material
        .to_i64()
        .map_err(|e| invalid("material", e.to_string()))?;

    Ok(RowValues {
        material_id,
        quantity,
        volume,
    })
}

/// Prices every row of `spec` against one company's price table.
///
/// Misaligned columns fail the whole call. Rows with unreadable values or an
/// unpriced material are reported in `skipped` and contribute nothing to the
/// totals. A finish without an active price is applied as 1.0.
pub fn price_project(
    spec: &ProjectSpec,
    table: &CompanyPriceTable,
) -> Result<PricingOutcome, MalformedProjectError> {
    let rows = spec.check_aligned()?;

    let finish = spec.finish_name().map(|name| match table.finish_multiplier(name) {
        Some(multiplier) => AppliedFinish {
            name: name.to_string(),
            multiplier,
            priced: true,
        },
        None => {
            log::warn!(
                "no active price for finish {name:?} at company {}; using multiplier 1.0",
                table.company.name
            );
            AppliedFinish {
                name: name.to_string(),
                multiplier: 1.0,
                priced: false,
            }
        }
    });
    let multiplier = finish.as_ref().map_or(1.0, |f| f.multiplier);

    let mut line_items = Vec::with_capacity(rows);
    let mut skipped = Vec::new();
    let mut total_volume = 0.0;
    let mut total_weight = 0.0;
    let mut total_cost = 0.0;

    for (index, (component, material, quantity, volume)) in izip!(
        &spec.components,
        &spec.materials,
        &spec.quantities,
        &spec.volumes
    )
    .enumerate()
    {
        let row = match coerce_row(material, quantity, volume) {
            Ok(row) => row,
            Err(reason) => {
                log::warn!("skipping component {component:?} (row {index}): {reason:?}");
                skipped.push(SkippedItem {
                    index,
                    component: component.clone(),
                    reason,
                });
                continue;
            }
        };

        let Some(priced) = table.material(row.material_id) else {
            log::warn!(
                "company {} ({}) has no active price for material {}; skipping component {component:?}",
                table.company.name,
                table.company.id,
                row.material_id
            );
            skipped.push(SkippedItem {
                index,
                component: component.clone(),
                reason: SkipReason::UnpricedMaterial {
                    material_id: row.material_id,
                },
            });
            continue;
        };

        let weight = row.volume * priced.density;
        let unit_cost = weight * priced.price_per_lb;
        let quantity = f64::from(row.quantity);
        let subtotal = unit_cost * quantity * multiplier;

        total_volume += row.volume * quantity;
        total_weight += weight * quantity;
        total_cost += subtotal;

        line_items.push(CostLineItem {
            component: component.clone(),
            material: priced.name.clone(),
            quantity: row.quantity,
            volume: row.volume,
            weight,
            price_per_lb: priced.price_per_lb,
            unit_cost,
            finish_multiplier: multiplier,
            subtotal,
        });
    }

    log::info!(
        "priced {} of {rows} components for {} (total {total_cost:.2})",
        line_items.len(),
        table.company.name
    );

    Ok(PricingOutcome {
        company_id: table.company.id,
        company_name: table.company.name.clone(),
        line_items,
        skipped,
        finish,
        total_volume,
        total_weight,
        total_cost,
    })
}

/// Quotes against a live store. Each call reads one fresh price snapshot;
/// nothing is cached between calls.
pub struct PricingEngine<S: PriceStore> {
    store: S,
}

impl<S: PriceStore> PricingEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn quote(&self, company_id: i64, spec: &ProjectSpec) -> Result<PricingOutcome, QuoteError> {
        // Reject misaligned input before touching the store.
        spec.check_aligned()?;
        let table = self.store.price_table(company_id)?;
        Ok(price_project(spec, &table)?)
    }
}
