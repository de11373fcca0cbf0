//! Catalog lookup tools offered to the model
//!
//! Three tools, keyed by [`ToolName`]. Each maps to a plain handler function
//! over the shared [`Catalog`]. Arguments are read leniently: a missing or
//! mistyped field degrades to whatever the catalog answers for an empty
//! input, never to an error. Only an unknown tool name fails.

use crate::catalog::Catalog;
use crate::llm::ToolDefinition;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("unsupported tool: {0}")]
    Unsupported(String),
}

/// Tools the model may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    LookupHours,
    LookupPrice,
    LookupStock,
}

type Handler = fn(&Catalog, &Value) -> String;

impl ToolName {
    pub const ALL: [ToolName; 3] = [
        ToolName::LookupHours,
        ToolName::LookupPrice,
        ToolName::LookupStock,
    ];

    /// Canonical wire name
    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::LookupHours => "lookup_hours",
            ToolName::LookupPrice => "lookup_price",
            ToolName::LookupStock => "lookup_stock",
        }
    }

    fn handler(self) -> Handler {
        match self {
            ToolName::LookupHours => lookup_hours,
            ToolName::LookupPrice => lookup_price,
            ToolName::LookupStock => lookup_stock,
        }
    }

    fn description(self) -> &'static str {
        match self {
            ToolName::LookupHours => "Get the store hours for one or more days of the week",
            ToolName::LookupPrice => "Get the price of a specific product",
            ToolName::LookupStock => "Check if a product is in stock",
        }
    }

    fn input_schema(self) -> Value {
        match self {
            ToolName::LookupHours => json!({
                "type": "object",
                "required": ["days"],
                "properties": {
                    "days": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of days of the week"
                    }
                }
            }),
            ToolName::LookupPrice => json!({
                "type": "object",
                "required": ["product"],
                "properties": {
                    "product": {
                        "type": "string",
                        "description": "The name of the product"
                    }
                }
            }),
            ToolName::LookupStock => json!({
                "type": "object",
                "required": ["product"],
                "properties": {
                    "product": {
                        "type": "string",
                        "description": "The name of the product to check availability for"
                    }
                }
            }),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    /// Accepts the canonical names plus the names older prompts used.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "lookup_hours" | "lookup_hours_multiple" | "get_store_hours_multiple" => {
                Ok(ToolName::LookupHours)
            }
            "lookup_price" | "get_product_price" => Ok(ToolName::LookupPrice),
            "lookup_stock" | "check_inventory" => Ok(ToolName::LookupStock),
            other => Err(ToolError::Unsupported(other.to_string())),
        }
    }
}

fn lookup_hours(catalog: &Catalog, args: &Value) -> String {
    if let Some(days) = args.get("days").and_then(Value::as_array) {
        let days: Vec<&str> = days.iter().filter_map(Value::as_str).collect();
        return catalog.hours_for(&days);
    }
    match args.get("day").and_then(Value::as_str) {
        Some(day) => catalog.hours(day),
        None => catalog.hours_for::<&str>(&[]),
    }
}

fn lookup_price(catalog: &Catalog, args: &Value) -> String {
    catalog.price(product_arg(args))
}

fn lookup_stock(catalog: &Catalog, args: &Value) -> String {
    catalog.stock(product_arg(args))
}

fn product_arg(args: &Value) -> &str {
    args.get("product").and_then(Value::as_str).unwrap_or_default()
}

/// Executes catalog tools. Stateless apart from the shared catalog.
#[derive(Debug, Clone)]
pub struct StoreTools {
    catalog: Arc<Catalog>,
}

impl StoreTools {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Get all tool definitions for the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolName::ALL.iter().map(|t| t.definition()).collect()
    }

    /// Execute a tool by name
    pub fn execute(&self, name: &str, arguments: &Value) -> Result<String, ToolError> {
        let tool: ToolName = name.parse()?;
        Ok((tool.handler())(&self.catalog, arguments))
    }
}
