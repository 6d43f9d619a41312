//! Authoritative inventory state.
//!
//! All tables live behind a single `tokio::sync::RwLock`. Every mutating
//! operation takes the write lock for its whole read-validate-write sequence,
//! so concurrent requests against the same part's stock are applied one after
//! another and multi-row edits (swap, merge, find-or-create-and-link) are
//! atomic.

mod aliases;
mod assemblies;
mod orders;
mod parts;
mod seed;

pub use aliases::LinkOutcome;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::errors::ServiceError;
use crate::ledger::alias::names_match;
use crate::ledger::quantities::{required, AllocationSummary, MAX_QUANTITY};
use crate::models::{AliasGroup, Assembly, BomLine, Part};

#[derive(Clone, Debug)]
struct LineRecord {
    reference: Option<String>,
    quantity_per: i64,
    allocated_quantity: i64,
}

#[derive(Clone, Copy, Debug)]
struct OrderRecord {
    part_id: i64,
    order_date: NaiveDate,
    quantity_ordered: i64,
}

#[derive(Clone, Copy, Debug)]
struct LinkRecord {
    alias_id: i64,
    part_id: i64,
}

#[derive(Debug, Default)]
struct Tables {
    parts: BTreeMap<i64, Part>,
    assemblies: BTreeMap<i64, Assembly>,
    /// Keyed by `(assembly_id, part_id)`.
    bom: BTreeMap<(i64, i64), LineRecord>,
    aliases: BTreeMap<i64, AliasGroup>,
    links: BTreeMap<i64, LinkRecord>,
    orders: BTreeMap<i64, OrderRecord>,
    next_part_id: i64,
    next_assembly_id: i64,
    next_alias_id: i64,
    next_link_id: i64,
    next_order_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn part(&self, part_id: i64) -> Result<&Part, ServiceError> {
        self.parts
            .get(&part_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Part {} not found", part_id)))
    }

    fn part_mut(&mut self, part_id: i64) -> Result<&mut Part, ServiceError> {
        self.parts
            .get_mut(&part_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Part {} not found", part_id)))
    }

    fn part_by_name(&self, name: &str) -> Option<&Part> {
        self.parts.values().find(|part| part.name_matches(name))
    }

    fn assembly(&self, assembly_id: i64) -> Result<&Assembly, ServiceError> {
        self.assemblies
            .get(&assembly_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Assembly {} not found", assembly_id)))
    }

    fn line(&self, assembly_id: i64, part_id: i64) -> Result<&LineRecord, ServiceError> {
        self.bom.get(&(assembly_id, part_id)).ok_or_else(|| {
            ServiceError::NotFound(format!(
                "Part {} is not on the BOM of assembly {}",
                part_id, assembly_id
            ))
        })
    }

    fn alias(&self, alias_id: i64) -> Result<&AliasGroup, ServiceError> {
        self.aliases
            .get(&alias_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Alias {} not found", alias_id)))
    }

    fn alias_by_name(&self, name: &str) -> Option<&AliasGroup> {
        self.aliases
            .values()
            .find(|group| names_match(&group.alias_name, name))
    }

    /// The link id and group of the part's single alias membership.
    fn link_of_part(&self, part_id: i64) -> Option<(i64, LinkRecord)> {
        self.links
            .iter()
            .find(|(_, link)| link.part_id == part_id)
            .map(|(id, link)| (*id, *link))
    }

    fn insert_link(&mut self, alias_id: i64, part_id: i64) -> i64 {
        let link_id = next_id(&mut self.next_link_id);
        self.links.insert(link_id, LinkRecord { alias_id, part_id });
        link_id
    }

    fn bom_line(&self, part_id: i64, record: &LineRecord) -> BomLine {
        let part = self.parts.get(&part_id);
        let alias = self
            .link_of_part(part_id)
            .and_then(|(_, link)| self.aliases.get(&link.alias_id));
        BomLine {
            part_id,
            part_name: part.map(|p| p.part_name.clone()).unwrap_or_default(),
            reference: record.reference.clone(),
            quantity_per: record.quantity_per,
            allocated_quantity: record.allocated_quantity,
            quantity: part.map(|p| p.quantity).unwrap_or_default(),
            package: part.and_then(|p| p.package.clone()),
            alias_id: alias.map(|a| a.id),
            alias_name: alias.map(|a| a.alias_name.clone()),
        }
    }

    fn lines_of(&self, assembly_id: i64) -> impl Iterator<Item = (i64, &LineRecord)> + '_ {
        self.bom
            .range((assembly_id, i64::MIN)..=(assembly_id, i64::MAX))
            .map(|((_, part_id), record)| (*part_id, record))
    }

    fn summary(&self, assembly: &Assembly) -> AllocationSummary {
        AllocationSummary::from_lines(
            assembly.quantity_to_build,
            self.lines_of(assembly.id)
                .map(|(_, record)| (record.quantity_per, record.allocated_quantity)),
        )
    }

    /// Free stock plus every allocation of the part, across all assemblies.
    fn holdings(&self, part_id: i64) -> i64 {
        let free = self.parts.get(&part_id).map_or(0, |p| p.quantity);
        self.bom
            .iter()
            .filter(|((_, line_part), _)| *line_part == part_id)
            .fold(free, |acc, (_, line)| acc.saturating_add(line.allocated_quantity))
    }

    /// Refuses a change that would push the part's holdings above [`MAX_QUANTITY`].
    fn check_holdings(&self, part_id: i64, added: i64) -> Result<(), ServiceError> {
        let holdings = self.holdings(part_id);
        if holdings.saturating_add(added) > MAX_QUANTITY {
            return Err(ServiceError::ValidationError(format!(
                "Part {} would hold more than {} units (currently {})",
                part_id, MAX_QUANTITY, holdings
            )));
        }
        Ok(())
    }

    /// Returns units to the part's free stock.
    fn credit_stock(&mut self, part_id: i64, amount: i64) {
        if let Some(part) = self.parts.get_mut(&part_id) {
            part.quantity = part.quantity.saturating_add(amount);
        }
    }

    /// Caps every line's allocation at its requirement, returning the excess
    /// to free stock. Needed after `quantity_to_build` or `quantity_per` shrink.
    fn release_excess(&mut self, assembly_id: i64) -> i64 {
        let Some(quantity_to_build) = self
            .assemblies
            .get(&assembly_id)
            .map(|a| a.quantity_to_build)
        else {
            return 0;
        };
        let mut released = Vec::new();
        for ((_, part_id), line) in self
            .bom
            .range_mut((assembly_id, i64::MIN)..=(assembly_id, i64::MAX))
        {
            let excess = line.allocated_quantity - required(quantity_to_build, line.quantity_per);
            if excess > 0 {
                line.allocated_quantity -= excess;
                released.push((*part_id, excess));
            }
        }

        let mut total: i64 = 0;
        for (part_id, excess) in released {
            self.credit_stock(part_id, excess);
            total = total.saturating_add(excess);
        }
        if total > 0 {
            tracing::info!(assembly_id, released = total, "Excess allocation returned to stock");
        }
        total
    }

    /// Re-derives and stores the assembly status after a BOM mutation.
    fn recalculate_status(&mut self, assembly_id: i64) {
        let Some(assembly) = self.assemblies.get(&assembly_id) else {
            return;
        };
        let status = self.summary(assembly).status();
        if let Some(assembly) = self.assemblies.get_mut(&assembly_id) {
            if assembly.status != status {
                tracing::debug!(assembly_id, %status, "assembly status changed");
                assembly.status = status;
            }
            assembly.update_date = Some(chrono::Utc::now());
        }
    }
}

/// Cloneable handle to the shared inventory tables.
#[derive(Clone, Default)]
pub struct InventoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}
