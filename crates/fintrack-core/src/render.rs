//! Column rendering for entity tables

use fintrack_config::DisplayConfig;
use fintrack_utils::{display_currency, display_datetime, display_decimals, display_percentage};
use serde::Serialize;

use crate::models::{AttributeValue, Entity};
use crate::types::{Column, EntityKind};

/// Cell text for values that cannot be displayed
pub const OUT_OF_RANGE: &str = "n/a";

/// Number formatting used by the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFormat {
    pub currency_symbol: String,
    pub decimal_places: u32,
    pub thousands_separator: String,
    pub share_decimals: u32,
    pub percentage_decimals: u32,
}

impl Default for DisplayFormat {
    fn default() -> Self {
        Self::from(&DisplayConfig::default())
    }
}

impl From<&DisplayConfig> for DisplayFormat {
    fn from(config: &DisplayConfig) -> Self {
        Self {
            currency_symbol: config.currency_symbol.clone(),
            decimal_places: config.decimal_places,
            thousands_separator: config.thousands_separator.clone(),
            share_decimals: config.share_decimals,
            percentage_decimals: config.percentage_decimals,
        }
    }
}

/// One formatted table cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub column: Column,
    pub text: String,
}

/// Stateless renderer turning records into formatted cells
#[derive(Debug, Clone, Default)]
pub struct AttributeRenderer {
    format: DisplayFormat,
}

impl AttributeRenderer {
    pub fn new(format: DisplayFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &DisplayFormat {
        &self.format
    }

    /// Header labels for `kind`, in the same order as its cells
    pub fn headers(&self, kind: EntityKind) -> Vec<&'static str> {
        kind.columns().iter().map(|c| c.label()).collect()
    }

    /// One cell per checklist column the record has, in checklist order
    pub fn cells(&self, entity: &Entity) -> Vec<Cell> {
        Column::CHECKLIST
            .iter()
            .filter_map(|&column| {
                entity.attribute(column).map(|value| Cell {
                    column,
                    text: self.format_value(column, value),
                })
            })
            .collect()
    }

    /// Format a single attribute according to its column
    pub fn format_value(&self, column: Column, value: AttributeValue<'_>) -> String {
        let f = &self.format;
        match value {
            AttributeValue::Text(text) => text.to_string(),
            AttributeValue::Reference(reference) => reference.label(column).to_string(),
            AttributeValue::Date(date) => display_datetime(date),
            AttributeValue::Number(n) => match column {
                Column::Shares => display_decimals(n, f.share_decimals),
                Column::ExpenseRatio => match display_percentage(n, f.percentage_decimals) {
                    Ok(percent) => format!("{}%", percent),
                    Err(error) => {
                        log::warn!("Cannot display {}: {}", column.label(), error);
                        OUT_OF_RANGE.to_string()
                    }
                },
                _ => display_currency(n, &f.currency_symbol, f.decimal_places, &f.thousands_separator),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, EntityRef, Expense, Fund, Holding};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn holding() -> Entity {
        let mut fund = EntityRef::named("f-1", "Total Market");
        fund.ticker_symbol = Some("VTSAX".to_string());
        Entity::Holding(Holding {
            uuid: "h-1".to_string(),
            account: EntityRef::named("a-1", "Brokerage"),
            fund,
            shares: dec("12.5"),
            value: dec("1265.625"),
            expense_ratio: dec("0.0004"),
            effective_expense: dec("0.50625"),
        })
    }

    #[test]
    fn test_holding_cells_in_checklist_order() {
        let renderer = AttributeRenderer::default();
        let cells = renderer.cells(&holding());
        let texts: Vec<&str> = cells.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Brokerage", "VTSAX", "12.500", "$1,265.63", "0.040%", "$0.51"]
        );
        let columns: Vec<Column> = cells.iter().map(|c| c.column).collect();
        assert_eq!(columns, EntityKind::Holding.columns());
    }

    #[test]
    fn test_oversized_ratio_renders_placeholder() {
        let fund = Entity::Fund(Fund {
            uuid: "f-9".to_string(),
            name: "Broken".to_string(),
            ticker_symbol: "BRKN".to_string(),
            share_price: dec("1"),
            expense_ratio: Decimal::MAX,
        });
        let texts: Vec<String> = AttributeRenderer::default().cells(&fund).into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["Broken", "BRKN", "$1.00", OUT_OF_RANGE]);
    }

    #[test]
    fn test_missing_attributes_emit_no_cell() {
        let renderer = AttributeRenderer::default();
        let category = Entity::ExpenseCategory(Category {
            uuid: "c-1".to_string(),
            name: "Groceries".to_string(),
            description: String::new(),
        });
        let cells = renderer.cells(&category);
        assert_eq!(cells.len(), 2);
        assert!(cells.iter().all(|c| c.column != Column::Amount && c.column != Column::Date));
        assert_eq!(cells[1].text, "");
    }

    #[test]
    fn test_expense_date_and_currency() {
        let renderer = AttributeRenderer::default();
        let expense = Entity::Expense(Expense {
            uuid: "e-1".to_string(),
            name: "Rent".to_string(),
            category: EntityRef::named("c-1", "Housing"),
            description: "January".to_string(),
            date: Utc.with_ymd_and_hms(2023, 1, 5, 0, 0, 0).unwrap(),
            amount: dec("-1500"),
        });
        let texts: Vec<String> = renderer.cells(&expense).into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["Rent", "Housing", "January", "01/05/2023", "-$1,500.00"]);
    }

    #[test]
    fn test_headers_match_columns() {
        let renderer = AttributeRenderer::default();
        assert_eq!(
            renderer.headers(EntityKind::Fund),
            vec!["Name", "Ticker Symbol", "Share Price", "Expense Ratio"]
        );
    }

    #[test]
    fn test_custom_display_format() {
        let renderer = AttributeRenderer::new(DisplayFormat {
            currency_symbol: "€".to_string(),
            decimal_places: 0,
            thousands_separator: ".".to_string(),
            share_decimals: 1,
            percentage_decimals: 2,
        });
        let cells = renderer.cells(&holding());
        assert_eq!(cells[2].text, "12.5");
        assert_eq!(cells[3].text, "€1.266");
        assert_eq!(cells[4].text, "0.04%");
    }
}
