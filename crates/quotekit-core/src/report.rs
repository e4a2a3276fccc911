use crate::geom::round_to;
use crate::model::Component;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

pub const MATERIAL_NOT_SPECIFIED: &str = "Not specified";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: String,
    pub message: String,
}

/// One row of the extraction table handed to the UI and archived as CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRow {
    #[serde(rename = "Component")]
    pub component: String,
    #[serde(rename = "Volume (in³)")]
    pub volume: f64,
    #[serde(rename = "Material")]
    pub material: String,
    #[serde(rename = "Vertices")]
    pub vertices: usize,
    #[serde(rename = "Faces")]
    pub faces: usize,
    #[serde(rename = "Quantity")]
    pub quantity: u32,
}

impl From<&Component> for ComponentRow {
    fn from(c: &Component) -> Self {
        Self {
            component: c.name.clone(),
            volume: c.volume,
            material: c
                .material_hint
                .clone()
                .unwrap_or_else(|| MATERIAL_NOT_SPECIFIED.to_string()),
            vertices: c.vertex_count,
            faces: c.face_count,
            quantity: c.quantity,
        }
    }
}

pub fn component_table(components: &[Component]) -> Vec<ComponentRow> {
    components.iter().map(ComponentRow::from).collect()
}

pub fn write_csv<W: Write>(rows: &[ComponentRow], out: W) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// `<prefix><timestamp>.csv`; the timestamp is formatted by the caller.
pub fn archive_file_name(prefix: &str, timestamp: &str) -> String {
    format!("{prefix}{timestamp}.csv")
}

/// Re-assigns the material of every row named `component`. Returns how many
/// rows changed.
pub fn assign_material(rows: &mut [ComponentRow], component: &str, material: &str) -> usize {
    let mut changed = 0;
    for row in rows.iter_mut().filter(|r| r.component == component) {
        if row.material != material {
            row.material = material.to_string();
            changed += 1;
        }
    }
    changed
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialVolumes {
    pub by_material: BTreeMap<String, f64>,
    pub total: f64,
}

/// Total `volume × quantity` per material, rounded to 2 decimals.
pub fn volume_by_material(rows: &[ComponentRow]) -> MaterialVolumes {
    let mut raw: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        *raw.entry(row.material.clone()).or_default() += row.volume * f64::from(row.quantity);
    }
    let by_material: BTreeMap<String, f64> =
        raw.into_iter().map(|(k, v)| (k, round_to(v, 2))).collect();
    let total = by_material.values().sum();
    MaterialVolumes { by_material, total }
}
