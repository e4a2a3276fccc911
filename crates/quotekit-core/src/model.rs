use crate::error::{CoercionError, MalformedProjectError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared length unit of a geometry source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    Unknown,
    Inches,
    Millimeters,
    Centimeters,
    Meters,
}

impl Units {
    /// Scale from this unit to meters. Unknown sources are taken to be in meters.
    pub fn meters_per_unit(self) -> f64 {
        match self {
            Units::Unknown | Units::Meters => 1.0,
            Units::Centimeters => 0.01,
            Units::Millimeters => 0.001,
            Units::Inches => 0.0254,
        }
    }
}

/// One deduplicated solid body as reported by the geometry extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    /// Cubic inches, rounded to 7 decimals.
    pub volume: f64,
    pub vertex_count: usize,
    pub face_count: usize,
    pub quantity: u32,
    /// Advisory only; never used for pricing.
    pub material_hint: Option<String>,
}

/// A `DESCRIPTIVE_REPRESENTATION_ITEM('name','value')` record found in a
/// STEP file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptiveItem {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialAnnotations {
    pub items: Vec<DescriptiveItem>,
}

impl MaterialAnnotations {
    /// Body names flagged with `material` through a descriptive item.
    pub fn flagged_bodies(&self, material: &str) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| item.value == material && item.name != material)
            .map(|item| item.name.as_str())
            .collect()
    }

    /// Coarse hint for a body. An item named after the material itself marks
    /// the whole file.
    pub fn hint_for(&self, body_name: &str, material: &str) -> Option<String> {
        let file_wide = self.items.iter().any(|item| item.name == material);
        let flagged = self
            .items
            .iter()
            .any(|item| item.name == body_name && item.value == material);
        (file_wide || flagged).then(|| material.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default = "active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub material_type: String,
    #[serde(default)]
    pub name: Option<String>,
    /// lb/in³
    pub density: f64,
    #[serde(default = "active")]
    pub is_active: bool,
}

impl Material {
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => humanize(&self.material_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finish {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyMaterialPrice {
    pub company_id: i64,
    pub material_id: i64,
    pub price_per_lb: f64,
    #[serde(default = "active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyFinishPrice {
    pub company_id: i64,
    pub finish_id: i64,
    pub price_multiplier: f64,
    #[serde(default = "active")]
    pub is_active: bool,
}

fn active() -> bool {
    true
}

/// A material a company can be quoted for, joined with its active price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedMaterial {
    pub material_id: i64,
    pub name: String,
    pub density: f64,
    pub price_per_lb: f64,
}

/// Snapshot of one company's active price lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyPriceTable {
    pub company: Company,
    pub materials: BTreeMap<i64, PricedMaterial>,
    /// Finish name -> price multiplier.
    pub finishes: BTreeMap<String, f64>,
}

impl CompanyPriceTable {
    pub fn new(company: Company) -> Self {
        Self {
            company,
            materials: BTreeMap::new(),
            finishes: BTreeMap::new(),
        }
    }

    pub fn material(&self, material_id: i64) -> Option<&PricedMaterial> {
        self.materials.get(&material_id)
    }

    pub fn finish_multiplier(&self, finish: &str) -> Option<f64> {
        self.finishes.get(finish).copied()
    }
}

/// A single cell of a submitted project row. Form posts deliver text, JSON
/// clients may send numbers; both are coerced at pricing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn to_f64(&self) -> Result<f64, CoercionError> {
        let value = match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.coercion_error("a number"))
    }

    pub fn to_i64(&self) -> Result<i64, CoercionError> {
        let value = match self {
            FieldValue::Int(v) => Some(*v),
            // i64::MAX as f64 rounds up to 2^63, which is out of range.
            FieldValue::Float(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
            {
                Some(*v as i64)
            }
            FieldValue::Float(_) => None,
            FieldValue::Text(s) => s.trim().parse::<i64>().ok(),
        };
        value.ok_or_else(|| self.coercion_error("an integer"))
    }

    fn coercion_error(&self, expected: &'static str) -> CoercionError {
        CoercionError {
            value: self.to_string(),
            expected,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// Pricing input: four index-aligned columns plus a project-wide finish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSpec {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default)]
    pub finish: Option<String>,
    pub components: Vec<String>,
    pub materials: Vec<FieldValue>,
    pub quantities: Vec<FieldValue>,
    pub volumes: Vec<FieldValue>,
}

fn default_project_name() -> String {
    "New Project".to_string()
}

impl ProjectSpec {
    /// Row count, or the lengths of all four columns when they disagree.
    pub fn check_aligned(&self) -> Result<usize, MalformedProjectError> {
        let n = self.components.len();
        if self.materials.len() != n || self.quantities.len() != n || self.volumes.len() != n {
            return Err(MalformedProjectError {
                components: n,
                materials: self.materials.len(),
                quantities: self.quantities.len(),
                volumes: self.volumes.len(),
            });
        }
        Ok(n)
    }

    /// The finish to apply, ignoring blank form values.
    pub fn finish_name(&self) -> Option<&str> {
        self.finish
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// One priced row of a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLineItem {
    pub component: String,
    pub material: String,
    pub quantity: u32,
    pub volume: f64,
    pub weight: f64,
    pub price_per_lb: f64,
    pub unit_cost: f64,
    pub finish_multiplier: f64,
    pub subtotal: f64,
}

/// `stainless_steel` -> `Stainless Steel`.
pub fn humanize(identifier: &str) -> String {
    identifier
        .split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
