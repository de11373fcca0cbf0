//! Static store catalog
//!
//! Store hours by weekday, product prices, and stock flags. Built once at
//! startup and shared read-only (`Arc<Catalog>`) by every connection.
//!
//! Every lookup is total: unknown keys produce a sentinel sentence that is
//! shown to the customer as-is, never an error.

use rust_decimal::Decimal;
use std::collections::HashMap;

/// Immutable store catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    hours: HashMap<String, String>,
    prices: HashMap<String, Decimal>,
    stock: HashMap<String, bool>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Hours for a single weekday
    pub fn hours(&self, day: &str) -> String {
        let day = normalize(day);
        match self.hours.get(&day) {
            Some(hours) => format!("The store hours for {day} are {hours}"),
            None => format!("Sorry, I couldn't find store hours for {day}"),
        }
    }

    /// Multi-line hours report for every known day in `days`, in request order.
    /// Unknown days are skipped.
    pub fn hours_for<S: AsRef<str>>(&self, days: &[S]) -> String {
        let lines: Vec<String> = days
            .iter()
            .map(|day| normalize(day.as_ref()))
            .filter_map(|day| {
                self.hours
                    .get(&day)
                    .map(|hours| format!("{}: {hours}", capitalize(&day)))
            })
            .collect();

        if lines.is_empty() {
            return "Sorry, I couldn't find store hours for any of the specified days".to_string();
        }

        format!(
            "Here are the store hours for the requested days:\n{}",
            lines.join("\n")
        )
    }

    pub fn price(&self, product: &str) -> String {
        let product = normalize(product);
        match self.prices.get(&product) {
            Some(price) => format!("The price of {product} is ${price}"),
            None => format!("Sorry, I couldn't find the price for {product}"),
        }
    }

    /// Stock status. Out-of-stock and unknown products get distinct phrasings.
    pub fn stock(&self, product: &str) -> String {
        let product = normalize(product);
        match self.stock.get(&product) {
            Some(true) => format!("Yes, we do have {product} in stock!"),
            Some(false) => format!(
                "I'm sorry, but we're currently out of stock for {product}. We expect to have more in next week."
            ),
            None => format!(
                "I'm not sure about the availability of {product}. Let me check with our inventory team."
            ),
        }
    }
}

impl Default for Catalog {
    /// The Vapor store catalog
    fn default() -> Self {
        Catalog::builder()
            .hours("monday", "9:00 AM - 6:00 PM")
            .hours("tuesday", "9:00 AM - 6:00 PM")
            .hours("wednesday", "9:00 AM - 6:00 PM")
            .hours("thursday", "9:00 AM - 8:00 PM")
            .hours("friday", "9:00 AM - 8:00 PM")
            .hours("saturday", "10:00 AM - 5:00 PM")
            .hours("sunday", "Closed")
            .price("vape", Decimal::new(9999, 2))
            .price("cartridge", Decimal::new(69999, 2))
            .price("flavor", Decimal::new(19999, 2))
            .price("hookah", Decimal::new(29999, 2))
            .stock("vape", true)
            .stock("cartridge", true)
            .stock("flavor", false) // Temporarily out of stock
            .stock("hookah", true)
            .build()
    }
}

/// Builder for [`Catalog`]. Keys are normalized on insert.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    hours: HashMap<String, String>,
    prices: HashMap<String, Decimal>,
    stock: HashMap<String, bool>,
}

impl CatalogBuilder {
    pub fn hours(mut self, day: &str, hours: impl Into<String>) -> Self {
        self.hours.insert(normalize(day), hours.into());
        self
    }

    pub fn price(mut self, product: &str, price: Decimal) -> Self {
        self.prices.insert(normalize(product), price);
        self
    }

    pub fn stock(mut self, product: &str, in_stock: bool) -> Self {
        self.stock.insert(normalize(product), in_stock);
        self
    }

    pub fn build(self) -> Catalog {
        Catalog {
            hours: self.hours,
            prices: self.prices,
            stock: self.stock,
        }
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
