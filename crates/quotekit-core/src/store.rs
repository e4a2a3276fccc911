use crate::error::StoreError;
use crate::model::{
    Company, CompanyFinishPrice, CompanyMaterialPrice, CompanyPriceTable, Finish, Material,
    PricedMaterial,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Read access to company price lists. Every call reads current data; callers
/// take one snapshot per operation.
pub trait PriceStore {
    fn company(&self, company_id: i64) -> Result<Company, StoreError>;

    /// Active material and finish prices for one company.
    fn price_table(&self, company_id: i64) -> Result<CompanyPriceTable, StoreError>;

    fn available_materials(&self, company_id: i64) -> Result<Vec<PricedMaterial>, StoreError> {
        Ok(self.price_table(company_id)?.materials.into_values().collect())
    }

    fn available_finishes(&self, company_id: i64) -> Result<Vec<(String, f64)>, StoreError> {
        Ok(self.price_table(company_id)?.finishes.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceCatalog {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub finishes: Vec<Finish>,
    #[serde(default)]
    pub material_prices: Vec<CompanyMaterialPrice>,
    #[serde(default)]
    pub finish_prices: Vec<CompanyFinishPrice>,
}

impl PriceCatalog {
    /// Checks references and the one-active-price-per-pair rule.
    pub fn validate(&self) -> Result<(), StoreError> {
        let companies: HashSet<i64> = self.companies.iter().map(|c| c.id).collect();
        let materials: HashSet<i64> = self.materials.iter().map(|m| m.id).collect();
        let finishes: HashSet<i64> = self.finishes.iter().map(|f| f.id).collect();

        let mut seen = HashSet::new();
        for row in &self.material_prices {
            if !companies.contains(&row.company_id) {
                return Err(StoreError::UnknownCompany(row.company_id));
            }
            if !materials.contains(&row.material_id) {
                return Err(StoreError::UnknownMaterial(row.material_id));
            }
            if row.is_active && !seen.insert((row.company_id, row.material_id)) {
                return Err(StoreError::DuplicateActivePrice {
                    company: row.company_id,
                    kind: "material",
                    id: row.material_id,
                });
            }
        }

        let mut seen = HashSet::new();
        for row in &self.finish_prices {
            if !companies.contains(&row.company_id) {
                return Err(StoreError::UnknownCompany(row.company_id));
            }
            if !finishes.contains(&row.finish_id) {
                return Err(StoreError::UnknownFinish(row.finish_id));
            }
            if row.is_active && !seen.insert((row.company_id, row.finish_id)) {
                return Err(StoreError::DuplicateActivePrice {
                    company: row.company_id,
                    kind: "finish",
                    id: row.finish_id,
                });
            }
        }

        Ok(())
    }
}

/// In-process store backed by a validated catalog.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    catalog: PriceCatalog,
}

impl MemoryStore {
    pub fn new(catalog: PriceCatalog) -> Result<Self, StoreError> {
        catalog.validate()?;
        Ok(Self { catalog })
    }

    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn from_json_path(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Replaces the company's price for a material. An active row deactivates
    /// any other active row for the same pair.
    pub fn set_material_price(&mut self, row: CompanyMaterialPrice) -> Result<(), StoreError> {
        self.company(row.company_id)?;
        if !self.catalog.materials.iter().any(|m| m.id == row.material_id) {
            return Err(StoreError::UnknownMaterial(row.material_id));
        }
        self.catalog
            .material_prices
            .retain(|p| !(p.company_id == row.company_id && p.material_id == row.material_id));
        self.catalog.material_prices.push(row);
        Ok(())
    }

    pub fn set_finish_price(&mut self, row: CompanyFinishPrice) -> Result<(), StoreError> {
        self.company(row.company_id)?;
        if !self.catalog.finishes.iter().any(|f| f.id == row.finish_id) {
            return Err(StoreError::UnknownFinish(row.finish_id));
        }
        self.catalog
            .finish_prices
            .retain(|p| !(p.company_id == row.company_id && p.finish_id == row.finish_id));
        self.catalog.finish_prices.push(row);
        Ok(())
    }
}

impl PriceStore for MemoryStore {
    fn company(&self, company_id: i64) -> Result<Company, StoreError> {
        self.catalog
            .companies
            .iter()
            .find(|c| c.id == company_id)
            .cloned()
            .ok_or(StoreError::UnknownCompany(company_id))
    }

    fn price_table(&self, company_id: i64) -> Result<CompanyPriceTable, StoreError> {
        let mut table = CompanyPriceTable::new(self.company(company_id)?);

        for row in &self.catalog.material_prices {
            if row.company_id != company_id || !row.is_active {
                continue;
            }
            let Some(material) = self.catalog.materials.iter().find(|m| m.id == row.material_id)
            else {
                continue;
            };
            if !material.is_active {
                log::debug!(
                    "material {} is inactive; not offered to company {}",
                    material.id,
                    table.company.name
                );
                continue;
            }
            table.materials.insert(
                material.id,
                PricedMaterial {
                    material_id: material.id,
                    name: material.display_name(),
                    density: material.density,
                    price_per_lb: row.price_per_lb,
                },
            );
        }

        for row in &self.catalog.finish_prices {
            if row.company_id != company_id || !row.is_active {
                continue;
            }
            if let Some(finish) = self.catalog.finishes.iter().find(|f| f.id == row.finish_id) {
                table.finishes.insert(finish.name.clone(), row.price_multiplier);
            }
        }

        Ok(table)
    }
}
