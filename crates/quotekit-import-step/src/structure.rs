use crate::entities::{Param, RawEntity};
use quotekit_core::model::Units;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Assembly nesting deeper than this is treated as malformed and cut off.
const MAX_ASSEMBLY_DEPTH: usize = 32;

/// A closed shell bounding a cavity of a solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoidShell {
    pub shell: u64,
    /// Set when the shell is referenced through an `ORIENTED_CLOSED_SHELL`
    /// with orientation `.F.`.
    pub reversed: bool,
}

/// What the raw records say about one solid body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolidInfo {
    pub outer: u64,
    pub voids: Vec<VoidShell>,
    /// Product name, solid name or representation name, whichever is found first.
    pub label: Option<String>,
    /// Number of times the owning part is placed in the assembly tree.
    pub occurrences: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelStructure {
    /// Solids keyed by entity id, in file order.
    pub solids: BTreeMap<u64, SolidInfo>,
    pub units: Units,
    pub has_assembly: bool,
}

struct RawSolid {
    name: String,
    outer: u64,
    voids: Vec<u64>,
}

#[derive(Default)]
struct Links {
    solids: HashMap<u64, RawSolid>,
    // oriented shell -> (closed shell, orientation)
    oriented_shells: HashMap<u64, (u64, bool)>,
    // representation -> (name, item refs)
    reps: HashMap<u64, (String, Vec<u64>)>,
    rep_links: HashMap<u64, Vec<u64>>,
    // representation -> product definition shape
    rep_to_pds: HashMap<u64, u64>,
    pds_to_pd: HashMap<u64, u64>,
    pd_to_formation: HashMap<u64, u64>,
    formation_to_product: HashMap<u64, u64>,
    product_names: HashMap<u64, String>,
    // child product definition -> parent product definitions, one per usage
    usages: HashMap<u64, Vec<u64>>,
}

pub fn analyze_structure(entities: &[RawEntity]) -> ModelStructure {
    let mut links = Links::default();

    for e in entities {
        match e.keyword.as_str() {
            "MANIFOLD_SOLID_BREP" | "BREP_WITH_VOIDS" => {
                if let Some(outer) = e.ref_param(1) {
                    links.solids.insert(
                        e.id,
                        RawSolid {
                            name: e.str_param(0).unwrap_or_default().to_string(),
                            outer,
                            voids: e.params.get(2).map(|p| p.refs()).unwrap_or_default(),
                        },
                    );
                }
            }
            "ORIENTED_CLOSED_SHELL" => {
                if let Some(shell) = e.ref_param(2) {
                    let forward =
                        !matches!(e.params.get(3), Some(Param::Other(flag)) if flag == ".F.");
                    links.oriented_shells.insert(e.id, (shell, forward));
                }
            }
            "SHAPE_REPRESENTATION_RELATIONSHIP" => {
                if let (Some(a), Some(b)) = (e.ref_param(2), e.ref_param(3)) {
                    links.rep_links.entry(a).or_default().push(b);
                    links.rep_links.entry(b).or_default().push(a);
                }
            }
            "SHAPE_DEFINITION_REPRESENTATION" => {
                if let (Some(pds), Some(rep)) = (e.ref_param(0), e.ref_param(1)) {
                    links.rep_to_pds.insert(rep, pds);
                }
            }
            "PRODUCT_DEFINITION_SHAPE" => {
                if let Some(pd) = e.ref_param(2) {
                    links.pds_to_pd.insert(e.id, pd);
                }
            }
            "PRODUCT_DEFINITION" | "PRODUCT_DEFINITION_WITH_ASSOCIATED_DOCUMENTS" => {
                if let Some(formation) = e.ref_param(2) {
                    links.pd_to_formation.insert(e.id, formation);
                }
            }
            "PRODUCT_DEFINITION_FORMATION"
            | "PRODUCT_DEFINITION_FORMATION_WITH_SPECIFIED_SOURCE" => {
                if let Some(product) = e.ref_param(2) {
                    links.formation_to_product.insert(e.id, product);
                }
            }
            "PRODUCT" => {
                let name = e
                    .str_param(1)
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| e.str_param(0));
                if let Some(name) = name {
                    links.product_names.insert(e.id, name.trim().to_string());
                }
            }
            "NEXT_ASSEMBLY_USAGE_OCCURRENCE" => {
                if let (Some(parent), Some(child)) = (e.ref_param(3), e.ref_param(4)) {
                    links.usages.entry(child).or_default().push(parent);
                }
            }
            kw if kw.ends_with("SHAPE_REPRESENTATION") => {
                let name = e.str_param(0).unwrap_or_default().to_string();
                let items = e.params.get(1).map(|p| p.refs()).unwrap_or_default();
                links.reps.insert(e.id, (name, items));
            }
            _ => {}
        }
    }

    let mut solid_to_rep: HashMap<u64, u64> = HashMap::new();
    for (&rep, (_, items)) in &links.reps {
        for item in items {
            if links.solids.contains_key(item) {
                solid_to_rep.entry(*item).or_insert(rep);
            }
        }
    }

    let mut occurrence_memo: HashMap<u64, usize> = HashMap::new();
    let mut solids = BTreeMap::new();
    for (&solid, raw) in &links.solids {
        let rep = solid_to_rep.get(&solid).copied();
        let pd = rep.and_then(|rep| product_definition_for(rep, &links));
        let product_name = pd
            .and_then(|pd| links.pd_to_formation.get(&pd))
            .and_then(|f| links.formation_to_product.get(f))
            .and_then(|p| links.product_names.get(p))
            .cloned();
        let rep_name = rep
            .and_then(|rep| links.reps.get(&rep))
            .map(|(name, _)| name.clone());

        let label = [product_name, Some(raw.name.clone()), rep_name]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty());

        let occurrences = match pd {
            Some(pd) => count_occurrences(pd, &links, &mut occurrence_memo, &mut Vec::new()),
            None => 1,
        };

        let voids = raw
            .voids
            .iter()
            .map(|&id| match links.oriented_shells.get(&id) {
                Some(&(shell, forward)) => VoidShell {
                    shell,
                    reversed: !forward,
                },
                None => VoidShell {
                    shell: id,
                    reversed: false,
                },
            })
            .collect();

        solids.insert(
            solid,
            SolidInfo {
                outer: raw.outer,
                voids,
                label,
                occurrences,
            },
        );
    }

    let has_assembly = !links.usages.is_empty();
    let units = detect_length_unit(entities);
    log::info!(
        "STEP structure: {} solids, {} products, {} assembly usages, units {:?}",
        links.solids.len(),
        links.product_names.len(),
        links.usages.values().map(Vec::len).sum::<usize>(),
        units
    );

    ModelStructure {
        solids,
        units,
        has_assembly,
    }
}

/// Walks shape-representation relationships from a solid's representation to
/// the first one that is attached to a product definition.
fn product_definition_for(rep: u64, links: &Links) -> Option<u64> {
    let mut seen = HashSet::from([rep]);
    let mut queue = VecDeque::from([rep]);
    while let Some(r) = queue.pop_front() {
        if let Some(pd) = links.rep_to_pds.get(&r).and_then(|pds| links.pds_to_pd.get(pds)) {
            return Some(*pd);
        }
        for next in links.rep_links.get(&r).into_iter().flatten() {
            if seen.insert(*next) {
                queue.push_back(*next);
            }
        }
    }
    None
}

/// Placements of a product definition: one for a root, otherwise the sum over
/// every usage of the placements of its parent.
fn count_occurrences(
    pd: u64,
    links: &Links,
    memo: &mut HashMap<u64, usize>,
    stack: &mut Vec<u64>,
) -> usize {
    if let Some(&n) = memo.get(&pd) {
        return n;
    }
    let Some(parents) = links.usages.get(&pd) else {
        return 1;
    };
    if stack.len() > MAX_ASSEMBLY_DEPTH || stack.contains(&pd) {
        log::warn!("assembly cycle or excessive nesting at product definition #{pd}");
        return 1;
    }

    stack.push(pd);
    let n = parents
        .iter()
        .map(|&parent| count_occurrences(parent, links, memo, stack))
        .sum::<usize>()
        .max(1);
    stack.pop();

    memo.insert(pd, n);
    n
}

/// Length unit of the model: the one assigned by the global unit context,
/// else a conversion-based unit, else the first SI length unit. SI units that
/// only back an inch conversion come before it in many files.
pub fn detect_length_unit(entities: &[RawEntity]) -> Units {
    let by_id: HashMap<u64, &RawEntity> = entities.iter().map(|e| (e.id, e)).collect();

    for e in entities {
        let Some(assigned) = global_unit_refs(&e.body) else {
            continue;
        };
        let unit = assigned
            .iter()
            .filter_map(|id| by_id.get(id))
            .find_map(|unit| classify_length_unit(&unit.body));
        if let Some(unit) = unit {
            return unit;
        }
    }

    let mut first_si = None;
    for e in entities {
        let body = e.body.to_ascii_uppercase();
        match classify_length_unit(&body) {
            Some(unit) if body.contains("CONVERSION_BASED_UNIT(") => return unit,
            Some(unit) => {
                first_si.get_or_insert(unit);
            }
            None => {}
        }
    }
    first_si.unwrap_or(Units::Unknown)
}

fn classify_length_unit(body: &str) -> Option<Units> {
    let body = body.to_ascii_uppercase();
    if !body.contains("LENGTH_UNIT()") {
        return None;
    }
    if body.contains("CONVERSION_BASED_UNIT('INCH'") {
        return Some(Units::Inches);
    }
    if body.contains("CONVERSION_BASED_UNIT(") {
        log::warn!("unsupported conversion-based length unit: {body}");
        return None;
    }
    if body.contains("SI_UNIT(.MILLI.,.METRE.)") {
        return Some(Units::Millimeters);
    }
    if body.contains("SI_UNIT(.CENTI.,.METRE.)") {
        return Some(Units::Centimeters);
    }
    if body.contains("SI_UNIT($,.METRE.)") {
        return Some(Units::Meters);
    }
    None
}

/// Unit references listed by a `GLOBAL_UNIT_ASSIGNED_CONTEXT((...))` record.
fn global_unit_refs(body: &str) -> Option<Vec<u64>> {
    const MARKER: &str = "GLOBAL_UNIT_ASSIGNED_CONTEXT(";
    let at = body.to_ascii_uppercase().find(MARKER)?;
    let rest = &body[at + MARKER.len()..];

    let mut depth = 1usize;
    let mut end = rest.len();
    for (i, c) in rest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    end = i;
                    break;
                }
            }
            _ => {}
        }
    }

    let refs = rest[..end]
        .split(|c: char| !c.is_ascii_digit() && c != '#')
        .filter_map(|token| token.strip_prefix('#'))
        .filter_map(|digits| digits.parse().ok())
        .collect();
    Some(refs)
}
