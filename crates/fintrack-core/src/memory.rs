//! In-memory record store implementing the backend contract
//!
//! The ledger keeps every kind in one map so references can be resolved
//! across kinds: each reference carries the current name (and ticker symbol
//! for funds) of its target, and holdings carry values derived from their
//! fund. Derived data is recomputed after every mutation.

use async_trait::async_trait;
use fintrack_utils::parse_date;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use crate::backend::{BackendFactory, BackendRef, EntityBackend};
use crate::error::{CoreError, CoreResult};
use crate::filter::Filter;
use crate::form::FormValues;
use crate::models::{AttributeValue, Entity, EntityRef};
use crate::options::{OptionSource, OptionSourceRef, SelectOption};
use crate::types::{Column, EntityKind};

type Records = BTreeMap<EntityKind, Vec<Entity>>;

/// Shared in-memory store for every entity kind
#[derive(Clone, Default)]
pub struct MemoryLedger {
    records: Arc<RwLock<Records>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from existing records, keeping their identifiers
    pub fn from_entities(entities: Vec<Entity>) -> CoreResult<Self> {
        let mut records = Records::new();
        let mut seen = BTreeSet::new();
        for mut entity in entities {
            if entity.uuid().is_empty() {
                entity.set_uuid(Uuid::new_v4().to_string());
            }
            if !seen.insert(entity.uuid().to_string()) {
                return Err(CoreError::InvalidFormat {
                    message: format!("duplicate uuid {}", entity.uuid()),
                });
            }
            records.entry(entity.kind()).or_default().push(entity);
        }

        let index = Index::build(&records);
        for entity in records.values_mut().flatten() {
            index.resolve(entity).map_err(|e| CoreError::InvalidFormat { message: e.to_string() })?;
        }

        Ok(Self {
            records: Arc::new(RwLock::new(records)),
        })
    }

    /// Load records from a JSON array of tagged entities
    pub async fn load_seed(path: &Path) -> CoreResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let entities: Vec<Entity> = serde_json::from_str(&content)?;
        let ledger = Self::from_entities(entities)?;
        log::info!("Loaded {} records from {}", ledger.total(), path.display());
        Ok(ledger)
    }

    pub fn list(&self, kind: EntityKind) -> Vec<Entity> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(&kind).cloned().unwrap_or_default()
    }

    pub fn get(&self, kind: EntityKind, uuid: &str) -> Option<Entity> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(&kind)?.iter().find(|e| e.uuid() == uuid).cloned()
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(&kind).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.values().map(Vec::len).sum()
    }

    /// Records of `kind` matching every criterion of `filter`
    pub fn query(&self, kind: EntityKind, filter: &Filter) -> CoreResult<Vec<Entity>> {
        let mut criteria = Vec::with_capacity(filter.len());
        for (name, wanted) in filter {
            let column: Column = name
                .parse()
                .ok()
                .filter(|c| kind.has_column(*c))
                .ok_or_else(|| CoreError::Rejected {
                    message: format!("{} cannot be filtered by '{}'", kind.entity_plural(), name),
                })?;
            criteria.push((column, wanted));
        }

        Ok(self
            .list(kind)
            .into_iter()
            .filter(|entity| {
                criteria.iter().all(|(column, wanted)| {
                    entity
                        .attribute(*column)
                        .map_or(false, |value| matches_any(value, wanted))
                })
            })
            .collect())
    }

    /// Create a record with a fresh identifier; any given identifier is ignored
    pub fn insert(&self, kind: EntityKind, mut values: FormValues) -> CoreResult<Entity> {
        let uuid = Uuid::new_v4().to_string();
        values.insert("uuid".to_string(), Value::String(uuid));
        let mut entity = build(kind, values)?;

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        Index::build(&records).resolve(&mut entity)?;
        records.entry(kind).or_default().push(entity.clone());
        log::debug!("Created {} {}", kind, entity.uuid());
        Ok(entity)
    }

    /// Replace the record named by the `uuid` in `values`
    pub fn replace(&self, kind: EntityKind, values: FormValues) -> CoreResult<Entity> {
        let uuid = match values.get("uuid") {
            Some(Value::String(uuid)) if !uuid.is_empty() => uuid.clone(),
            _ => {
                return Err(CoreError::Rejected {
                    message: "update requires a uuid".to_string(),
                })
            }
        };
        let mut entity = build(kind, values)?;

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let position = records
            .get(&kind)
            .and_then(|list| list.iter().position(|e| e.uuid() == uuid))
            .ok_or_else(|| CoreError::EntityNotFound { uuid: uuid.clone() })?;
        Index::build(&records).resolve(&mut entity)?;
        let mut updated = records.clone();
        if let Some(list) = updated.get_mut(&kind) {
            list[position] = entity;
        }
        relink(&mut updated)?;
        *records = updated;

        log::debug!("Updated {} {}", kind, uuid);
        records
            .get(&kind)
            .and_then(|list| list.get(position))
            .cloned()
            .ok_or(CoreError::EntityNotFound { uuid })
    }

    /// Remove a record that nothing references any more
    pub fn remove(&self, kind: EntityKind, uuid: &str) -> CoreResult<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let referrers = records
            .values()
            .flatten()
            .filter(|entity| {
                let source = entity.kind();
                entity.references().into_iter().any(|(column, reference)| {
                    source.reference_target(column) == Some(kind) && reference.uuid == uuid
                })
            })
            .count();
        if referrers > 0 {
            return Err(CoreError::Rejected {
                message: format!(
                    "{} {} is still referenced by {} record(s)",
                    kind.entity_name(),
                    uuid,
                    referrers
                ),
            });
        }

        let list = records.entry(kind).or_default();
        let before = list.len();
        list.retain(|e| e.uuid() != uuid);
        if list.len() == before {
            return Err(CoreError::EntityNotFound { uuid: uuid.to_string() });
        }
        log::debug!("Deleted {} {}", kind, uuid);
        Ok(())
    }
}

impl BackendFactory for MemoryLedger {
    fn backend(&self, kind: EntityKind) -> BackendRef {
        Arc::new(MemoryBackend::new(kind, self.clone()))
    }

    fn option_source(&self, kind: EntityKind) -> OptionSourceRef {
        Arc::new(KindOptions {
            kind,
            ledger: self.clone(),
        })
    }
}

fn build(kind: EntityKind, values: FormValues) -> CoreResult<Entity> {
    Entity::from_values(kind, values).map_err(|e| CoreError::Rejected { message: e.to_string() })
}

fn matches_any(value: AttributeValue<'_>, wanted: &BTreeSet<String>) -> bool {
    match value {
        AttributeValue::Text(text) => wanted.contains(text),
        AttributeValue::Reference(reference) => {
            wanted.contains(&reference.uuid)
                || reference.name.as_deref().map_or(false, |n| wanted.contains(n))
                || reference.ticker_symbol.as_deref().map_or(false, |t| wanted.contains(t))
        }
        AttributeValue::Date(date) => wanted
            .iter()
            .any(|w| parse_date(w).map_or(false, |d| d == date.date_naive())),
        AttributeValue::Number(number) => wanted
            .iter()
            .any(|w| w.trim().parse::<Decimal>().map_or(false, |n| n == number)),
    }
}

/// Re-resolve references and holding values after a mutation
/// Refresh labels and holding values after a record changed; all or nothing
fn relink(records: &mut Records) -> CoreResult<()> {
    let index = Index::build(records);
    for entity in records.values_mut().flatten() {
        index.resolve(entity)?;
    }
    Ok(())
}

struct Target {
    name: String,
    ticker_symbol: Option<String>,
    share_price: Decimal,
    expense_ratio: Decimal,
}

/// Snapshot of every record's label and fund pricing
struct Index(HashMap<(EntityKind, String), Target>);

impl Index {
    fn build(records: &Records) -> Self {
        let mut targets = HashMap::new();
        for entity in records.values().flatten() {
            let target = match entity {
                Entity::Fund(fund) => Target {
                    name: fund.name.clone(),
                    ticker_symbol: Some(fund.ticker_symbol.clone()),
                    share_price: fund.share_price,
                    expense_ratio: fund.expense_ratio,
                },
                other => Target {
                    name: other.display_name().to_string(),
                    ticker_symbol: None,
                    share_price: Decimal::ZERO,
                    expense_ratio: Decimal::ZERO,
                },
            };
            targets.insert((entity.kind(), entity.uuid().to_string()), target);
        }
        Self(targets)
    }

    fn target(&self, kind: EntityKind, uuid: &str) -> CoreResult<&Target> {
        self.0
            .get(&(kind, uuid.to_string()))
            .ok_or_else(|| CoreError::Rejected {
                message: format!("unknown {} '{}'", kind.entity_name().to_lowercase(), uuid),
            })
    }

    fn resolve(&self, entity: &mut Entity) -> CoreResult<()> {
        let kind = entity.kind();
        for (column, reference) in entity.references_mut() {
            let Some(target_kind) = kind.reference_target(column) else {
                continue;
            };
            let target = self.target(target_kind, &reference.uuid)?;
            *reference = EntityRef {
                uuid: std::mem::take(&mut reference.uuid),
                name: Some(target.name.clone()),
                ticker_symbol: target.ticker_symbol.clone(),
            };
        }

        if let Entity::Holding(holding) = entity {
            let fund = self.target(EntityKind::Fund, &holding.fund.uuid)?;
            let uuid = holding.uuid.clone();
            let overflow = || CoreError::Rejected {
                message: format!("holding {} is too large to value", uuid),
            };
            holding.value = holding.shares.checked_mul(fund.share_price).ok_or_else(overflow)?;
            holding.expense_ratio = fund.expense_ratio;
            holding.effective_expense = holding.value.checked_mul(fund.expense_ratio).ok_or_else(overflow)?;
        }
        Ok(())
    }
}

/// Backend for one kind over a shared ledger
#[derive(Clone)]
pub struct MemoryBackend {
    kind: EntityKind,
    ledger: MemoryLedger,
}

impl MemoryBackend {
    pub fn new(kind: EntityKind, ledger: MemoryLedger) -> Self {
        Self { kind, ledger }
    }
}

#[async_trait]
impl EntityBackend for MemoryBackend {
    async fn get_entities(&self, filter: &Filter) -> CoreResult<Vec<Entity>> {
        self.ledger.query(self.kind, filter)
    }

    async fn create_entity(&self, values: FormValues) -> CoreResult<Entity> {
        self.ledger.insert(self.kind, values)
    }

    async fn update_entity(&self, values: FormValues) -> CoreResult<Entity> {
        self.ledger.replace(self.kind, values)
    }

    async fn delete_entity(&self, uuid: &str) -> CoreResult<()> {
        self.ledger.remove(self.kind, uuid)
    }
}

/// Lookup listing every record of one kind: uuid as value, name or ticker as label
struct KindOptions {
    kind: EntityKind,
    ledger: MemoryLedger,
}

#[async_trait]
impl OptionSource for KindOptions {
    async fn fetch(&self) -> CoreResult<Vec<SelectOption>> {
        Ok(self
            .ledger
            .list(self.kind)
            .iter()
            .map(|entity| {
                let label = match entity {
                    Entity::Fund(fund) => fund.ticker_symbol.as_str(),
                    other => other.display_name(),
                };
                SelectOption::new(entity.uuid(), label)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::values_from_json;
    use serde_json::json;

    fn values(value: Value) -> FormValues {
        values_from_json(value).unwrap()
    }

    fn seeded() -> MemoryLedger {
        let entities: Vec<Entity> = serde_json::from_value(json!([
            { "kind": "accountCategory", "uuid": "ac-1", "name": "Retirement" },
            { "kind": "account", "uuid": "a-1", "name": "IRA", "category": { "uuid": "ac-1" }, "amount": "1000" },
            { "kind": "account", "uuid": "a-2", "name": "401k", "category": { "uuid": "ac-1" }, "amount": "2500.50" },
            { "kind": "fund", "uuid": "f-1", "name": "Total Market", "tickerSymbol": "VTSAX",
              "sharePrice": "100", "expenseRatio": "0.0004" },
            { "kind": "holding", "uuid": "h-1", "account": { "uuid": "a-1" }, "fund": { "uuid": "f-1" }, "shares": "2.5" },
            { "kind": "expenseCategory", "uuid": "ec-1", "name": "Food" },
            { "kind": "expense", "uuid": "e-1", "name": "Groceries", "category": { "uuid": "ec-1" },
              "date": "2023-01-05T00:00:00Z", "amount": "42.10" }
        ]))
        .unwrap();
        MemoryLedger::from_entities(entities).unwrap()
    }

    fn holding(ledger: &MemoryLedger) -> crate::models::Holding {
        match ledger.get(EntityKind::Holding, "h-1") {
            Some(Entity::Holding(h)) => h,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_seed_resolves_references_and_holding_values() {
        let ledger = seeded();
        let holding = holding(&ledger);
        assert_eq!(holding.account.name.as_deref(), Some("IRA"));
        assert_eq!(holding.fund.ticker_symbol.as_deref(), Some("VTSAX"));
        assert_eq!(holding.value, "250".parse::<Decimal>().unwrap());
        assert_eq!(holding.effective_expense, "0.1".parse::<Decimal>().unwrap());
        assert_eq!(ledger.total(), 7);
    }

    #[test]
    fn test_insert_assigns_fresh_uuid() {
        let ledger = seeded();
        let created = ledger
            .insert(
                EntityKind::Account,
                values(json!({ "uuid": "mine", "name": "Brokerage", "category": { "uuid": "ac-1" }, "amount": 0 })),
            )
            .unwrap();
        assert_ne!(created.uuid(), "mine");
        assert!(Uuid::parse_str(created.uuid()).is_ok());
        assert_eq!(ledger.count(EntityKind::Account), 3);
    }

    #[test]
    fn test_insert_rejects_unknown_reference_and_bad_values() {
        let ledger = seeded();
        let err = ledger
            .insert(
                EntityKind::Account,
                values(json!({ "name": "X", "category": { "uuid": "nope" }, "amount": 0 })),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Rejected { .. }));

        let err = ledger.insert(EntityKind::Fund, values(json!({ "name": "X" }))).unwrap_err();
        assert!(matches!(err, CoreError::Rejected { .. }));
        assert_eq!(ledger.count(EntityKind::Account), 2);
    }

    #[test]
    fn test_oversized_holding_is_rejected() {
        let ledger = seeded();
        let err = ledger
            .insert(
                EntityKind::Holding,
                values(json!({ "account": { "uuid": "a-2" }, "fund": { "uuid": "f-1" },
                               "shares": "79228162514264337593543950335" })),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Rejected { .. }));
        assert_eq!(ledger.count(EntityKind::Holding), 1);
    }

    #[test]
    fn test_fund_price_that_overflows_holdings_is_rejected() {
        let ledger = seeded();
        let err = ledger
            .replace(
                EntityKind::Fund,
                values(json!({ "uuid": "f-1", "name": "Total Market", "tickerSymbol": "VTSAX",
                               "sharePrice": "79228162514264337593543950335", "expenseRatio": "0.0004" })),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Rejected { .. }));
        assert_eq!(holding(&ledger).value, "250".parse::<Decimal>().unwrap());
        match ledger.get(EntityKind::Fund, "f-1") {
            Some(Entity::Fund(fund)) => assert_eq!(fund.share_price, "100".parse::<Decimal>().unwrap()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_fund_price_change_updates_holdings() {
        let ledger = seeded();
        ledger
            .replace(
                EntityKind::Fund,
                values(json!({ "uuid": "f-1", "name": "Total Market", "tickerSymbol": "VTSAX",
                               "sharePrice": "200", "expenseRatio": "0.001" })),
            )
            .unwrap();
        let holding = holding(&ledger);
        assert_eq!(holding.value, "500".parse::<Decimal>().unwrap());
        assert_eq!(holding.effective_expense, "0.5".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_replace_unknown_uuid() {
        let ledger = seeded();
        let err = ledger
            .replace(EntityKind::AccountCategory, values(json!({ "uuid": "missing", "name": "X" })))
            .unwrap_err();
        assert_eq!(err, CoreError::EntityNotFound { uuid: "missing".to_string() });

        let err = ledger
            .replace(EntityKind::AccountCategory, values(json!({ "name": "X" })))
            .unwrap_err();
        assert!(matches!(err, CoreError::Rejected { .. }));
    }

    #[test]
    fn test_remove_referenced_record_is_rejected() {
        let ledger = seeded();
        assert!(matches!(
            ledger.remove(EntityKind::Fund, "f-1"),
            Err(CoreError::Rejected { .. })
        ));
        ledger.remove(EntityKind::Holding, "h-1").unwrap();
        ledger.remove(EntityKind::Fund, "f-1").unwrap();
        assert!(ledger.get(EntityKind::Fund, "f-1").is_none());
        assert_eq!(
            ledger.remove(EntityKind::Fund, "f-1"),
            Err(CoreError::EntityNotFound { uuid: "f-1".to_string() })
        );
    }

    #[test]
    fn test_query_filters_with_and_semantics() {
        let ledger = seeded();
        let mut filter = Filter::new();
        filter.insert("category".to_string(), ["ac-1".to_string()].into());
        assert_eq!(ledger.query(EntityKind::Account, &filter).unwrap().len(), 2);

        filter.insert("name".to_string(), ["IRA".to_string()].into());
        let found = ledger.query(EntityKind::Account, &filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uuid(), "a-1");

        let mut by_label = Filter::new();
        by_label.insert("category".to_string(), ["Retirement".to_string()].into());
        assert_eq!(ledger.query(EntityKind::Account, &by_label).unwrap().len(), 2);

        let mut by_date = Filter::new();
        by_date.insert("date".to_string(), ["01/05/2023".to_string()].into());
        assert_eq!(ledger.query(EntityKind::Expense, &by_date).unwrap().len(), 1);
    }

    #[test]
    fn test_query_rejects_foreign_column() {
        let ledger = seeded();
        let mut filter = Filter::new();
        filter.insert("fund".to_string(), ["f-1".to_string()].into());
        assert!(ledger.query(EntityKind::Account, &filter).is_err());
    }

    #[tokio::test]
    async fn test_backend_and_options_through_factory() {
        let ledger = seeded();
        let backend = ledger.backend(EntityKind::Fund);
        let funds = backend.get_entities(&Filter::new()).await.unwrap();
        assert_eq!(funds.len(), 1);

        let options = ledger.option_source(EntityKind::Fund).fetch().await.unwrap();
        assert_eq!(options, vec![SelectOption::new("f-1", "VTSAX")]);

        let accounts = ledger.option_source(EntityKind::Account).fetch().await.unwrap();
        assert_eq!(accounts[1], SelectOption::new("a-2", "401k"));
    }

    #[test]
    fn test_duplicate_seed_uuid() {
        let entities: Vec<Entity> = serde_json::from_value(json!([
            { "kind": "accountCategory", "uuid": "x", "name": "A" },
            { "kind": "expenseCategory", "uuid": "x", "name": "B" }
        ]))
        .unwrap();
        assert!(MemoryLedger::from_entities(entities).is_err());
    }
}
