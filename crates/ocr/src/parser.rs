use std::sync::OnceLock;

use regex::{Captures, Regex};
use splitbill_core::{normalize_name, BillError, Item, Money};
use thiserror::Error;
use tracing::debug;

/// Lines mentioning any of these are summary or footer lines, not items.
pub const IGNORE_KEYWORDS: &[&str] = &[
    "total", "sub total", "tax", "cash", "change", "balance", "card", "payment", "invoice",
    "date", "time", "thank", "welcome",
];

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Leading count: `2 `, `2x `.
re!(re_leading_quantity,
    r"(?i)^(\d+)\s*x?\s+");
// Explicit multiplier anywhere (`2x`, `x2`), never touching a decimal point.
re!(re_multiplier,
    r"(?i)(?:^|\s)(\d+)\s*x\b|(?:^|\s)x\s*(\d+)(?:\s|$)");
re!(re_currency_price,
    r"[$€£¥₹](\d+(?:\.\d{2})?)");
re!(re_bare_price,
    r"(?:^|\s)(\d+\.\d{2})\b");

fn re_ignore() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        let mut words: Vec<&str> = IGNORE_KEYWORDS.to_vec();
        // Longer phrases first so "sub total" is tried before "total".
        words.sort_by_key(|w| std::cmp::Reverse(w.len()));
        let alternation = words
            .iter()
            .map(|w| {
                w.split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s*")
            })
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)\b(?:{alternation})")).expect("invalid regex")
    })
}

// ── Rejections ────────────────────────────────────────────────────────────────

/// Why a recognized line produced no item.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineReject {
    #[error("blank line")]
    Blank,
    #[error("summary line ({0})")]
    Ignored(String),
    #[error("unreadable quantity '{0}'")]
    BadQuantity(String),
    #[error("no price found")]
    NoPrice,
    #[error("unreadable price '{0}'")]
    BadPrice(String),
    #[error(transparent)]
    Invalid(#[from] BillError),
}

/// A price located in a line: its value and the exact text it was read from.
#[derive(Debug, Clone, PartialEq)]
struct PriceMatch {
    value: Money,
    text: String,
}

// ── Public parsing API ────────────────────────────────────────────────────────

pub struct ReceiptParser;

impl ReceiptParser {
    /// Extract items from newline-joined recognized text, in line order.
    /// Lines that do not look like items are skipped.
    pub fn parse(text: &str) -> Vec<Item> {
        text.lines().filter_map(Self::try_parse_line).collect()
    }

    pub fn try_parse_line(line: &str) -> Option<Item> {
        match Self::parse_line(line) {
            Ok(item) => Some(item),
            Err(LineReject::Blank) => None,
            Err(reason) => {
                debug!(line, %reason, "line skipped");
                None
            }
        }
    }

    /// Run the rule chain on one line:
    /// ignore filter → quantity → price → name → validation.
    pub fn parse_line(line: &str) -> Result<Item, LineReject> {
        let line = line.trim();
        if line.is_empty() {
            return Err(LineReject::Blank);
        }

        reject_summary_line(line)?;
        let (quantity, rest) = extract_quantity(line)?;
        let price = extract_price(&rest)?;
        let name = derive_name(&rest, &price.text);

        Ok(Item::new(name, price.value, quantity)?)
    }
}

// ── Rules ─────────────────────────────────────────────────────────────────────

fn reject_summary_line(line: &str) -> Result<(), LineReject> {
    match re_ignore().find(line) {
        Some(m) => Err(LineReject::Ignored(m.as_str().to_lowercase())),
        None => Ok(()),
    }
}

/// Returns the quantity (default 1) and the line with the quantity text removed.
fn extract_quantity(line: &str) -> Result<(u32, String), LineReject> {
    let Some(caps) = re_leading_quantity()
        .captures(line)
        .or_else(|| re_multiplier().captures(line))
    else {
        return Ok((1, line.to_string()));
    };
    let Some(whole) = caps.get(0) else {
        return Ok((1, line.to_string()));
    };

    let digits = first_group(&caps).unwrap_or_default();
    let quantity: u32 = digits
        .parse()
        .map_err(|_| LineReject::BadQuantity(digits.to_string()))?;

    let rest = format!("{} {}", &line[..whole.start()], &line[whole.end()..]);
    Ok((quantity, rest.trim().to_string()))
}

/// Currency-prefixed amounts win over bare two-decimal numbers.
fn extract_price(line: &str) -> Result<PriceMatch, LineReject> {
    if let Some(caps) = re_currency_price().captures(line) {
        let (Some(whole), Some(amount)) = (caps.get(0), caps.get(1)) else {
            return Err(LineReject::NoPrice);
        };
        return price_match(amount.as_str(), whole.as_str());
    }

    if let Some(caps) = re_bare_price().captures(line) {
        let Some(amount) = caps.get(1) else {
            return Err(LineReject::NoPrice);
        };
        return price_match(amount.as_str(), amount.as_str());
    }

    Err(LineReject::NoPrice)
}

fn price_match(amount: &str, text: &str) -> Result<PriceMatch, LineReject> {
    let value = Money::parse(amount).ok_or_else(|| LineReject::BadPrice(amount.to_string()))?;
    Ok(PriceMatch {
        value,
        text: text.to_string(),
    })
}

/// The name is whatever precedes the last occurrence of the price text. When
/// the price leads the line, whatever follows it is used instead.
fn derive_name(line: &str, price_text: &str) -> String {
    let Some(pos) = line.rfind(price_text) else {
        return normalize_name(line);
    };

    let before = normalize_name(&line[..pos]);
    if !before.is_empty() {
        return before;
    }
    normalize_name(&line[pos + price_text.len()..])
}

fn first_group<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.iter().skip(1).flatten().next().map(|m| m.as_str())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn one(line: &str) -> Item {
        ReceiptParser::parse_line(line).unwrap_or_else(|e| panic!("'{line}' rejected: {e}"))
    }

    // ── Worked examples ───────────────────────────────────────────────────────

    #[test]
    fn trailing_multiplier_and_bare_price() {
        let item = one("Coffee 2x 3.50");
        assert_eq!(item.name(), "Coffee");
        assert_eq!(item.quantity(), 2);
        assert_eq!(item.price(), Money::from_cents(350));
    }

    #[test]
    fn leading_currency_price_uses_trailing_name() {
        let item = one("$12.99 Large Pizza");
        assert_eq!(item.name(), "Large Pizza");
        assert_eq!(item.quantity(), 1);
        assert_eq!(item.price(), Money::from_cents(1299));
    }

    #[test]
    fn subtotal_is_ignored() {
        assert_eq!(
            ReceiptParser::parse_line("SUBTOTAL 45.00"),
            Err(LineReject::Ignored("subtotal".into()))
        );
    }

    // ── Ignore filter ─────────────────────────────────────────────────────────

    #[test]
    fn every_keyword_is_ignored_case_insensitively() {
        for kw in IGNORE_KEYWORDS {
            let line = format!("{} 9.99", kw.to_uppercase());
            assert!(
                matches!(ReceiptParser::parse_line(&line), Err(LineReject::Ignored(_))),
                "{line} was not ignored"
            );
        }
    }

    #[test]
    fn spaced_sub_total_is_ignored() {
        assert!(ReceiptParser::try_parse_line("Sub  Total   $45.00").is_none());
    }

    // ── Quantity ──────────────────────────────────────────────────────────────

    #[test]
    fn leading_quantity_forms() {
        for line in ["2 Burger 5.00", "2x Burger 5.00", "2 X Burger 5.00", "x2 Burger 5.00"] {
            let item = one(line);
            assert_eq!(item.quantity(), 2, "{line}");
            assert_eq!(item.name(), "Burger", "{line}");
            assert_eq!(item.price(), Money::from_cents(500), "{line}");
        }
    }

    #[test]
    fn multiplier_after_price() {
        let item = one("Burger 5.00 x 2");
        assert_eq!((item.name(), item.quantity()), ("Burger", 2));
        assert_eq!(item.price(), Money::from_cents(500));

        let item = one("Tea 2.50 x 3");
        assert_eq!((item.name(), item.quantity()), ("Tea", 3));
        assert_eq!(item.price(), Money::from_cents(250));
    }

    #[test]
    fn price_digits_are_never_a_quantity() {
        let item = one("Soup 4.00 x");
        assert_eq!(item.quantity(), 1);
        assert_eq!(item.price(), Money::from_cents(400));

        let item = one("Pie x 3.75");
        assert_eq!(item.quantity(), 1);
        assert_eq!(item.price(), Money::from_cents(375));
    }

    #[test]
    fn leading_count_wins_over_later_multiplier() {
        let item = one("3 Bagel x2 2.25");
        assert_eq!(item.quantity(), 3);
        assert_eq!(item.price(), Money::from_cents(225));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert_eq!(
            ReceiptParser::parse_line("0x Soda 1.00"),
            Err(LineReject::Invalid(BillError::ZeroQuantity))
        );
    }

    #[test]
    fn oversized_quantity_is_rejected_not_fatal() {
        let text = "99999999999x Soda 1.00\nTea 2.00";
        let items = ReceiptParser::parse(text);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name(), "Tea");
    }

    #[test]
    fn decimal_price_is_not_taken_as_quantity() {
        let item = one("2.50 Fries");
        assert_eq!(item.quantity(), 1);
        assert_eq!(item.price(), Money::from_cents(250));
        assert_eq!(item.name(), "Fries");
    }

    // ── Price ─────────────────────────────────────────────────────────────────

    #[test]
    fn currency_price_takes_precedence_over_bare_decimal() {
        let item = one("Burger Meal $8.50 10.00");
        assert_eq!(item.price(), Money::from_cents(850));
        assert_eq!(item.name(), "Burger Meal");
    }

    #[test]
    fn other_currency_symbols() {
        assert_eq!(one("Croissant €2.40").price(), Money::from_cents(240));
        assert_eq!(one("Masala Dosa ₹120").price(), Money::from_cents(12000));
        assert_eq!(one("Scone £3").price(), Money::from_cents(300));
    }

    #[test]
    fn digits_inside_a_name_are_not_a_price() {
        assert_eq!(ReceiptParser::parse_line("SKU12.34"), Err(LineReject::NoPrice));
    }

    #[test]
    fn line_without_price_is_skipped() {
        assert_eq!(ReceiptParser::parse_line("Fresh Bread"), Err(LineReject::NoPrice));
    }

    #[test]
    fn zero_price_is_rejected() {
        assert!(matches!(
            ReceiptParser::parse_line("Free Refill 0.00"),
            Err(LineReject::Invalid(BillError::NonPositivePrice(_)))
        ));
    }

    // ── Name ──────────────────────────────────────────────────────────────────

    #[test]
    fn name_is_cleaned_and_title_cased() {
        let item = one("ORGANIC*MILK (1L) 4.29");
        assert_eq!(item.name(), "Organicmilk 1l");
    }

    #[test]
    fn name_may_contain_numbers_before_price() {
        let item = one("Pepsi 330ml 4.00 4.00");
        assert_eq!(item.name(), "Pepsi 330ml 400");
        assert_eq!(item.price(), Money::from_cents(400));
    }

    #[test]
    fn price_only_line_has_no_name() {
        assert_eq!(
            ReceiptParser::parse_line("   12.50  "),
            Err(LineReject::Invalid(BillError::EmptyName))
        );
    }

    // ── Whole text ────────────────────────────────────────────────────────────

    #[test]
    fn parse_keeps_line_order_and_skips_noise() {
        let text = "WELCOME TO CAFE\n\
                    Coffee 2x 3.50\n\
                    \n\
                    @@##!!\n\
                    $12.99 Large Pizza\r\n\
                    Tax 1.20\n\
                    TOTAL 19.99\n\
                    Thank you";
        let items = ReceiptParser::parse(text);
        let names: Vec<&str> = items.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["Coffee", "Large Pizza"]);
    }

    #[test]
    fn parsing_is_repeatable() {
        let text = "Tea 1.50\n3 Bagel 2.25\nCARD 9.99";
        assert_eq!(ReceiptParser::parse(text), ReceiptParser::parse(text));
    }

    #[test]
    fn accepted_items_are_always_valid() {
        let lines = [
            "Tea 1.50", "x3 Donut $1.10", "- 2.00", "Gum 0.00", "A 0.01", "  $5 Wrap  ",
            "Salad 2 x 4.75", "42", "1 1.00", "Water $0", "Soup 3.5",
        ];
        for line in lines {
            if let Some(item) = ReceiptParser::try_parse_line(line) {
                assert!(item.price().is_positive(), "{line}");
                assert!(!item.name().is_empty(), "{line}");
                assert!(item.quantity() >= 1, "{line}");
            }
        }
    }

    #[test]
    fn garbage_does_not_panic() {
        let _ = ReceiptParser::parse("!@#$%^&*()\n\0\x01\x02\n$$$.\nx\n9x");
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(ReceiptParser::parse("").is_empty());
    }
}
