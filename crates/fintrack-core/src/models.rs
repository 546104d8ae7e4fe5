//! Record models, one variant per entity kind

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::form::FormValues;
use crate::types::{Column, EntityKind};

/// Reference to another record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Set on fund references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker_symbol: Option<String>,
}

impl EntityRef {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: None,
            ticker_symbol: None,
        }
    }

    pub fn named(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(uuid)
        }
    }

    /// Label shown in a table cell: ticker for funds, name otherwise
    pub fn label(&self, column: Column) -> &str {
        let preferred = if column == Column::Fund {
            self.ticker_symbol.as_deref().or(self.name.as_deref())
        } else {
            self.name.as_deref()
        };
        preferred.unwrap_or(&self.uuid)
    }
}

/// Account information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub uuid: String,
    pub name: String,
    pub category: EntityRef,
    #[serde(default)]
    pub description: String,
    /// Current balance
    pub amount: Decimal,
}

/// Account or expense category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Expense record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub uuid: String,
    pub name: String,
    pub category: EntityRef,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    pub amount: Decimal,
}

/// Contribution made into an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub uuid: String,
    pub name: String,
    pub account: EntityRef,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    pub amount: Decimal,
}

/// Fund information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fund {
    pub uuid: String,
    pub name: String,
    pub ticker_symbol: String,
    pub share_price: Decimal,
    /// Annual expense ratio as a fraction (0.0004 = 0.04%)
    #[serde(default)]
    pub expense_ratio: Decimal,
}

/// Fund shares held in an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub uuid: String,
    pub account: EntityRef,
    pub fund: EntityRef,
    pub shares: Decimal,
    /// shares × fund share price, computed by the backend
    #[serde(default)]
    pub value: Decimal,
    /// Copied from the fund by the backend
    #[serde(default)]
    pub expense_ratio: Decimal,
    /// value × expense ratio, computed by the backend
    #[serde(default)]
    pub effective_expense: Decimal,
}

/// A record of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Entity {
    Account(Account),
    AccountCategory(Category),
    Expense(Expense),
    ExpenseCategory(Category),
    Contribution(Contribution),
    Fund(Fund),
    Holding(Holding),
}

/// Raw attribute value of a record, before formatting
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue<'a> {
    Text(&'a str),
    Reference(&'a EntityRef),
    Date(&'a DateTime<Utc>),
    Number(Decimal),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Account(_) => EntityKind::Account,
            Entity::AccountCategory(_) => EntityKind::AccountCategory,
            Entity::Expense(_) => EntityKind::Expense,
            Entity::ExpenseCategory(_) => EntityKind::ExpenseCategory,
            Entity::Contribution(_) => EntityKind::Contribution,
            Entity::Fund(_) => EntityKind::Fund,
            Entity::Holding(_) => EntityKind::Holding,
        }
    }

    pub fn uuid(&self) -> &str {
        match self {
            Entity::Account(a) => &a.uuid,
            Entity::AccountCategory(c) | Entity::ExpenseCategory(c) => &c.uuid,
            Entity::Expense(e) => &e.uuid,
            Entity::Contribution(c) => &c.uuid,
            Entity::Fund(f) => &f.uuid,
            Entity::Holding(h) => &h.uuid,
        }
    }

    pub(crate) fn set_uuid(&mut self, uuid: String) {
        match self {
            Entity::Account(a) => a.uuid = uuid,
            Entity::AccountCategory(c) | Entity::ExpenseCategory(c) => c.uuid = uuid,
            Entity::Expense(e) => e.uuid = uuid,
            Entity::Contribution(c) => c.uuid = uuid,
            Entity::Fund(f) => f.uuid = uuid,
            Entity::Holding(h) => h.uuid = uuid,
        }
    }

    /// Name used as option label; holdings fall back to their fund
    pub fn display_name(&self) -> &str {
        match self {
            Entity::Account(a) => &a.name,
            Entity::AccountCategory(c) | Entity::ExpenseCategory(c) => &c.name,
            Entity::Expense(e) => &e.name,
            Entity::Contribution(c) => &c.name,
            Entity::Fund(f) => &f.name,
            Entity::Holding(h) => h.fund.label(Column::Fund),
        }
    }

    /// Value of `column`, or `None` when the column does not apply to this kind
    pub fn attribute(&self, column: Column) -> Option<AttributeValue<'_>> {
        use AttributeValue::*;
        match (self, column) {
            (Entity::Account(a), Column::Name) => Some(Text(&a.name)),
            (Entity::Account(a), Column::Category) => Some(Reference(&a.category)),
            (Entity::Account(a), Column::Description) => Some(Text(&a.description)),
            (Entity::Account(a), Column::Amount) => Some(Number(a.amount)),

            (Entity::AccountCategory(c) | Entity::ExpenseCategory(c), Column::Name) => Some(Text(&c.name)),
            (Entity::AccountCategory(c) | Entity::ExpenseCategory(c), Column::Description) => {
                Some(Text(&c.description))
            }

            (Entity::Expense(e), Column::Name) => Some(Text(&e.name)),
            (Entity::Expense(e), Column::Category) => Some(Reference(&e.category)),
            (Entity::Expense(e), Column::Description) => Some(Text(&e.description)),
            (Entity::Expense(e), Column::Date) => Some(Date(&e.date)),
            (Entity::Expense(e), Column::Amount) => Some(Number(e.amount)),

            (Entity::Contribution(c), Column::Name) => Some(Text(&c.name)),
            (Entity::Contribution(c), Column::Account) => Some(Reference(&c.account)),
            (Entity::Contribution(c), Column::Description) => Some(Text(&c.description)),
            (Entity::Contribution(c), Column::Date) => Some(Date(&c.date)),
            (Entity::Contribution(c), Column::Amount) => Some(Number(c.amount)),

            (Entity::Fund(f), Column::Name) => Some(Text(&f.name)),
            (Entity::Fund(f), Column::TickerSymbol) => Some(Text(&f.ticker_symbol)),
            (Entity::Fund(f), Column::SharePrice) => Some(Number(f.share_price)),
            (Entity::Fund(f), Column::ExpenseRatio) => Some(Number(f.expense_ratio)),

            (Entity::Holding(h), Column::Account) => Some(Reference(&h.account)),
            (Entity::Holding(h), Column::Fund) => Some(Reference(&h.fund)),
            (Entity::Holding(h), Column::Shares) => Some(Number(h.shares)),
            (Entity::Holding(h), Column::Value) => Some(Number(h.value)),
            (Entity::Holding(h), Column::ExpenseRatio) => Some(Number(h.expense_ratio)),
            (Entity::Holding(h), Column::EffectiveExpense) => Some(Number(h.effective_expense)),

            _ => None,
        }
    }

    /// Every reference of the record, with its column
    pub fn references(&self) -> Vec<(Column, &EntityRef)> {
        match self {
            Entity::Account(a) => vec![(Column::Category, &a.category)],
            Entity::Expense(e) => vec![(Column::Category, &e.category)],
            Entity::Contribution(c) => vec![(Column::Account, &c.account)],
            Entity::Holding(h) => vec![(Column::Account, &h.account), (Column::Fund, &h.fund)],
            Entity::AccountCategory(_) | Entity::ExpenseCategory(_) | Entity::Fund(_) => vec![],
        }
    }

    /// Mutable access to every reference of the record
    pub fn references_mut(&mut self) -> Vec<(Column, &mut EntityRef)> {
        match self {
            Entity::Account(a) => vec![(Column::Category, &mut a.category)],
            Entity::Expense(e) => vec![(Column::Category, &mut e.category)],
            Entity::Contribution(c) => vec![(Column::Account, &mut c.account)],
            Entity::Holding(h) => vec![
                (Column::Account, &mut h.account),
                (Column::Fund, &mut h.fund),
            ],
            Entity::AccountCategory(_) | Entity::ExpenseCategory(_) | Entity::Fund(_) => vec![],
        }
    }

    /// Field mapping of the record, as sent to and from forms
    pub fn to_values(&self) -> CoreResult<FormValues> {
        match self {
            Entity::Account(a) => object(a),
            Entity::AccountCategory(c) | Entity::ExpenseCategory(c) => object(c),
            Entity::Expense(e) => object(e),
            Entity::Contribution(c) => object(c),
            Entity::Fund(f) => object(f),
            Entity::Holding(h) => object(h),
        }
    }

    /// Build a record of `kind` from a field mapping
    pub fn from_values(kind: EntityKind, values: FormValues) -> CoreResult<Entity> {
        let value = Value::Object(values);
        Ok(match kind {
            EntityKind::Account => Entity::Account(record(value)?),
            EntityKind::AccountCategory => Entity::AccountCategory(record(value)?),
            EntityKind::Expense => Entity::Expense(record(value)?),
            EntityKind::ExpenseCategory => Entity::ExpenseCategory(record(value)?),
            EntityKind::Contribution => Entity::Contribution(record(value)?),
            EntityKind::Fund => Entity::Fund(record(value)?),
            EntityKind::Holding => Entity::Holding(record(value)?),
        })
    }
}

fn object<T: Serialize>(record: &T) -> CoreResult<FormValues> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::InternalError {
            message: format!("record serialized to non-object: {}", other),
        }),
    }
}

fn record<T: DeserializeOwned>(value: Value) -> CoreResult<T> {
    serde_json::from_value(value).map_err(|e| CoreError::InvalidFormat { message: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn fund() -> Entity {
        Entity::Fund(Fund {
            uuid: "f-1".to_string(),
            name: "Total Market".to_string(),
            ticker_symbol: "VTSAX".to_string(),
            share_price: dec("101.25"),
            expense_ratio: dec("0.0004"),
        })
    }

    #[test]
    fn test_attribute_only_for_kind_columns() {
        let entity = fund();
        for column in Column::CHECKLIST {
            assert_eq!(
                entity.attribute(column).is_some(),
                EntityKind::Fund.has_column(column),
                "column {}",
                column
            );
        }
    }

    #[test]
    fn test_tagged_serialization() {
        let value = serde_json::to_value(fund()).unwrap();
        assert_eq!(value["kind"], "fund");
        assert_eq!(value["tickerSymbol"], "VTSAX");
        let back: Entity = serde_json::from_value(value).unwrap();
        assert_eq!(back, fund());
    }

    #[test]
    fn test_from_values_builds_kind() {
        let values = json!({
            "uuid": "e-1",
            "name": "Groceries",
            "category": { "uuid": "c-1" },
            "date": "2023-01-05T00:00:00.000Z",
            "amount": "42.10"
        });
        let Value::Object(map) = values else { unreachable!() };
        let entity = Entity::from_values(EntityKind::Expense, map).unwrap();
        assert_eq!(entity.kind(), EntityKind::Expense);
        assert_eq!(entity.uuid(), "e-1");
        match entity.attribute(Column::Amount) {
            Some(AttributeValue::Number(n)) => assert_eq!(n, dec("42.10")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_from_values_rejects_missing_fields() {
        let Value::Object(map) = json!({ "uuid": "a-1", "name": "Checking" }) else { unreachable!() };
        let err = Entity::from_values(EntityKind::Account, map).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));
    }

    #[test]
    fn test_reference_label() {
        let mut reference = EntityRef::named("f-1", "Total Market");
        assert_eq!(reference.label(Column::Fund), "Total Market");
        reference.ticker_symbol = Some("VTSAX".to_string());
        assert_eq!(reference.label(Column::Fund), "VTSAX");
        assert_eq!(reference.label(Column::Account), "Total Market");
        assert_eq!(EntityRef::new("x").label(Column::Category), "x");
    }
}
