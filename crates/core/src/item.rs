use serde::Serialize;

use crate::bill::BillError;
use crate::money::Money;

/// A purchasable line on a bill. Only `assigned_to` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    name: String,
    price: Money,
    quantity: u32,
    assigned_to: Vec<String>,
    #[serde(skip)]
    line_total: Money,
}

impl Item {
    /// Build an item from an already-normalized name.
    pub fn new(name: impl Into<String>, price: Money, quantity: u32) -> Result<Self, BillError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BillError::EmptyName);
        }
        if !price.is_positive() {
            return Err(BillError::NonPositivePrice(price));
        }
        if quantity == 0 {
            return Err(BillError::ZeroQuantity);
        }
        let line_total = price
            .checked_times(quantity)
            .ok_or(BillError::AmountOverflow)?;
        Ok(Item {
            name,
            price,
            quantity,
            assigned_to: Vec::new(),
            line_total,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn assigned_to(&self) -> &[String] {
        &self.assigned_to
    }

    /// `price × quantity`.
    pub fn line_total(&self) -> Money {
        self.line_total
    }

    /// Replace the assignment wholesale, dropping repeated names.
    pub(crate) fn set_assignees(&mut self, persons: Vec<String>) {
        let mut unique: Vec<String> = Vec::with_capacity(persons.len());
        for p in persons {
            if !unique.contains(&p) {
                unique.push(p);
            }
        }
        self.assigned_to = unique;
    }

    pub(crate) fn unassign(&mut self, person: &str) {
        self.assigned_to.retain(|p| p != person);
    }
}

/// Clean a raw item label: keep letters, digits, whitespace and hyphens, then
/// title-case each whitespace-separated word.
pub fn normalize_name(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    kept.split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
