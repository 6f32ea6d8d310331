use serde::Serialize;
use thiserror::Error;

use crate::item::Item;
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BillError {
    #[error("Invalid item index {index} (bill has {len} items)")]
    OutOfRange { index: i64, len: usize },
    #[error("Item name is empty")]
    EmptyName,
    #[error("Item price must be positive, got {0}")]
    NonPositivePrice(Money),
    #[error("Item quantity must be at least 1")]
    ZeroQuantity,
    #[error("Amount is too large")]
    AmountOverflow,
}

/// One person's total in a split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonShare {
    pub person: String,
    pub amount: Money,
}

/// People and items for the bill being split. Callers serialize access.
#[derive(Debug, Default)]
pub struct BillState {
    persons: Vec<String>,
    items: Vec<Item>,
}

impl BillState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── People ────────────────────────────────────────────────────────────────

    /// Duplicates are kept.
    pub fn add_person(&mut self, name: impl Into<String>) -> &[String] {
        self.persons.push(name.into());
        &self.persons
    }

    pub fn persons(&self) -> &[String] {
        &self.persons
    }

    /// Drop every occurrence of `name`, from the registry and from assignments.
    pub fn remove_person(&mut self, name: &str) -> &[String] {
        self.persons.retain(|p| p != name);
        for item in &mut self.items {
            item.unassign(name);
        }
        &self.persons
    }

    // ── Items ─────────────────────────────────────────────────────────────────

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn replace_items(&mut self, items: Vec<Item>) {
        self.items = items;
    }

    pub fn push_item(&mut self, item: Item) -> &[Item] {
        self.items.push(item);
        &self.items
    }

    pub fn remove_item(&mut self, index: i64) -> Result<Item, BillError> {
        let idx = self.check_index(index)?;
        Ok(self.items.remove(idx))
    }

    /// Replace `items[index].assigned_to` with `selected`.
    pub fn assign_item(&mut self, index: i64, selected: Vec<String>) -> Result<&Item, BillError> {
        let idx = self.check_index(index)?;
        let item = &mut self.items[idx];
        item.set_assignees(selected);
        Ok(item)
    }

    fn check_index(&self, index: i64) -> Result<usize, BillError> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.items.len())
            .ok_or(BillError::OutOfRange {
                index,
                len: self.items.len(),
            })
    }

    // ── Split ─────────────────────────────────────────────────────────────────

    /// Per-person totals. Each assigned item's line total is divided evenly
    /// among its assignees. Registered people come first (zero if unassigned),
    /// followed by names that only appear in assignments.
    pub fn split_summary(&self) -> Result<Vec<PersonShare>, BillError> {
        let mut shares: Vec<PersonShare> = Vec::new();
        let slot = |shares: &mut Vec<PersonShare>, name: &str| -> usize {
            match shares.iter().position(|s| s.person == name) {
                Some(i) => i,
                None => {
                    shares.push(PersonShare {
                        person: name.to_string(),
                        amount: Money::zero(),
                    });
                    shares.len() - 1
                }
            }
        };

        for person in &self.persons {
            slot(&mut shares, person);
        }

        for item in &self.items {
            let assignees = item.assigned_to();
            if assignees.is_empty() {
                continue;
            }
            let each = item
                .line_total()
                .checked_split(assignees.len())
                .ok_or(BillError::AmountOverflow)?;
            for person in assignees {
                let i = slot(&mut shares, person);
                shares[i].amount = shares[i]
                    .amount
                    .checked_add(each)
                    .ok_or(BillError::AmountOverflow)?;
            }
        }

        for share in &mut shares {
            share.amount = share.amount.rounded();
        }
        Ok(shares)
    }
}
