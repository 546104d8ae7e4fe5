//! Basic types for the entity engine: record kinds and display columns

use serde::{Deserialize, Serialize};

/// Record kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    /// Bank, brokerage or retirement accounts
    Account,
    /// Grouping of accounts (checking, retirement...)
    AccountCategory,
    /// One-off spending records
    Expense,
    /// Grouping of expenses (groceries, rent...)
    ExpenseCategory,
    /// Money paid into an account
    Contribution,
    /// Investable fund with a share price
    Fund,
    /// Shares of a fund held in an account
    Holding,
}

impl EntityKind {
    /// Every kind, in navigation order
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Account,
        EntityKind::AccountCategory,
        EntityKind::Expense,
        EntityKind::ExpenseCategory,
        EntityKind::Contribution,
        EntityKind::Fund,
        EntityKind::Holding,
    ];

    /// URL slug of the page listing this kind
    pub fn slug(&self) -> &'static str {
        match self {
            EntityKind::Account => "accounts",
            EntityKind::AccountCategory => "account-categories",
            EntityKind::Expense => "expenses",
            EntityKind::ExpenseCategory => "expense-categories",
            EntityKind::Contribution => "contributions",
            EntityKind::Fund => "funds",
            EntityKind::Holding => "holdings",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.slug() == slug)
    }

    /// Singular display name
    pub fn entity_name(&self) -> &'static str {
        match self {
            EntityKind::Account => "Account",
            EntityKind::AccountCategory => "Account Category",
            EntityKind::Expense => "Expense",
            EntityKind::ExpenseCategory => "Expense Category",
            EntityKind::Contribution => "Contribution",
            EntityKind::Fund => "Fund",
            EntityKind::Holding => "Holding",
        }
    }

    /// Plural display name
    pub fn entity_plural(&self) -> &'static str {
        match self {
            EntityKind::Account => "Accounts",
            EntityKind::AccountCategory => "Account Categories",
            EntityKind::Expense => "Expenses",
            EntityKind::ExpenseCategory => "Expense Categories",
            EntityKind::Contribution => "Contributions",
            EntityKind::Fund => "Funds",
            EntityKind::Holding => "Holdings",
        }
    }

    /// Columns shown for this kind, always a subsequence of [`Column::CHECKLIST`]
    pub fn columns(&self) -> &'static [Column] {
        use Column::*;
        match self {
            EntityKind::Account => &[Name, Category, Description, Amount],
            EntityKind::AccountCategory | EntityKind::ExpenseCategory => &[Name, Description],
            EntityKind::Expense => &[Name, Category, Description, Date, Amount],
            EntityKind::Contribution => &[Name, Account, Description, Date, Amount],
            EntityKind::Fund => &[Name, TickerSymbol, SharePrice, ExpenseRatio],
            EntityKind::Holding => &[Account, Fund, Shares, Value, ExpenseRatio, EffectiveExpense],
        }
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns().contains(&column)
    }

    /// Columns the backend derives for this kind; they never appear in forms
    pub fn is_computed(&self, column: Column) -> bool {
        matches!(
            (self, column),
            (EntityKind::Holding, Column::Value)
                | (EntityKind::Holding, Column::ExpenseRatio)
                | (EntityKind::Holding, Column::EffectiveExpense)
        )
    }

    /// Columns a form for this kind lets the user edit
    pub fn editable_columns(&self) -> Vec<Column> {
        self.columns()
            .iter()
            .copied()
            .filter(|c| !self.is_computed(*c))
            .collect()
    }

    /// Kind a reference column of this kind points at
    pub fn reference_target(&self, column: Column) -> Option<EntityKind> {
        match (self, column) {
            (EntityKind::Account, Column::Category) => Some(EntityKind::AccountCategory),
            (EntityKind::Expense, Column::Category) => Some(EntityKind::ExpenseCategory),
            (EntityKind::Contribution, Column::Account) => Some(EntityKind::Account),
            (EntityKind::Holding, Column::Account) => Some(EntityKind::Account),
            (EntityKind::Holding, Column::Fund) => Some(EntityKind::Fund),
            _ => None,
        }
    }

    /// Field names accepted in this kind's form values
    pub fn accepts_field(&self, field: &str) -> bool {
        field == "uuid" || self.columns().iter().any(|c| c.field() == field)
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account" => Ok(EntityKind::Account),
            "accountCategory" => Ok(EntityKind::AccountCategory),
            "expense" => Ok(EntityKind::Expense),
            "expenseCategory" => Ok(EntityKind::ExpenseCategory),
            "contribution" => Ok(EntityKind::Contribution),
            "fund" => Ok(EntityKind::Fund),
            "holding" => Ok(EntityKind::Holding),
            _ => Self::from_slug(s).ok_or_else(|| format!("Invalid entity kind: {}", s)),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Account => write!(f, "account"),
            EntityKind::AccountCategory => write!(f, "accountCategory"),
            EntityKind::Expense => write!(f, "expense"),
            EntityKind::ExpenseCategory => write!(f, "expenseCategory"),
            EntityKind::Contribution => write!(f, "contribution"),
            EntityKind::Fund => write!(f, "fund"),
            EntityKind::Holding => write!(f, "holding"),
        }
    }
}

/// Table column enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Column {
    Name,
    Account,
    Category,
    Fund,
    Description,
    TickerSymbol,
    Date,
    Amount,
    SharePrice,
    Shares,
    Value,
    ExpenseRatio,
    EffectiveExpense,
}

impl Column {
    /// Fixed column order of every table
    pub const CHECKLIST: [Column; 13] = [
        Column::Name,
        Column::Account,
        Column::Category,
        Column::Fund,
        Column::Description,
        Column::TickerSymbol,
        Column::Date,
        Column::Amount,
        Column::SharePrice,
        Column::Shares,
        Column::Value,
        Column::ExpenseRatio,
        Column::EffectiveExpense,
    ];

    /// Field name in records and form values
    pub fn field(&self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Account => "account",
            Column::Category => "category",
            Column::Fund => "fund",
            Column::Description => "description",
            Column::TickerSymbol => "tickerSymbol",
            Column::Date => "date",
            Column::Amount => "amount",
            Column::SharePrice => "sharePrice",
            Column::Shares => "shares",
            Column::Value => "value",
            Column::ExpenseRatio => "expenseRatio",
            Column::EffectiveExpense => "effectiveExpense",
        }
    }

    /// Table header label
    pub fn label(&self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Account => "Account",
            Column::Category => "Category",
            Column::Fund => "Fund",
            Column::Description => "Description",
            Column::TickerSymbol => "Ticker Symbol",
            Column::Date => "Date",
            Column::Amount => "Amount",
            Column::SharePrice => "Share Price",
            Column::Shares => "Shares",
            Column::Value => "Value",
            Column::ExpenseRatio => "Expense Ratio",
            Column::EffectiveExpense => "Effective Expense",
        }
    }

    /// Column holds a reference to another record
    pub fn is_reference(&self) -> bool {
        matches!(self, Column::Account | Column::Category | Column::Fund)
    }

    /// Column holds a decimal number
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Column::Amount
                | Column::SharePrice
                | Column::Shares
                | Column::Value
                | Column::ExpenseRatio
                | Column::EffectiveExpense
        )
    }
}

impl std::str::FromStr for Column {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::CHECKLIST
            .iter()
            .copied()
            .find(|c| c.field() == s)
            .ok_or_else(|| format!("Invalid column: {}", s))
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_follow_checklist_order() {
        for kind in EntityKind::ALL {
            let positions: Vec<usize> = kind
                .columns()
                .iter()
                .map(|c| Column::CHECKLIST.iter().position(|x| x == c).unwrap())
                .collect();
            let mut sorted = positions.clone();
            sorted.sort();
            assert_eq!(positions, sorted, "{} columns out of order", kind);
        }
    }

    #[test]
    fn test_slug_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_slug(kind.slug()), Some(kind));
            assert_eq!(kind.to_string().parse::<EntityKind>().unwrap(), kind);
        }
        assert_eq!(EntityKind::from_slug("budgets"), None);
    }

    #[test]
    fn test_holding_computed_columns_not_editable() {
        let editable = EntityKind::Holding.editable_columns();
        assert_eq!(editable, vec![Column::Account, Column::Fund, Column::Shares]);
        assert!(EntityKind::Fund.editable_columns().contains(&Column::ExpenseRatio));
    }

    #[test]
    fn test_reference_targets() {
        assert_eq!(
            EntityKind::Expense.reference_target(Column::Category),
            Some(EntityKind::ExpenseCategory)
        );
        assert_eq!(
            EntityKind::Account.reference_target(Column::Category),
            Some(EntityKind::AccountCategory)
        );
        assert_eq!(EntityKind::Fund.reference_target(Column::Name), None);
    }

    #[test]
    fn test_column_from_field() {
        assert_eq!("tickerSymbol".parse::<Column>().unwrap(), Column::TickerSymbol);
        assert!("ticker".parse::<Column>().is_err());
    }

    #[test]
    fn test_accepts_field() {
        assert!(EntityKind::Account.accepts_field("uuid"));
        assert!(EntityKind::Account.accepts_field("category"));
        assert!(!EntityKind::Account.accepts_field("date"));
    }
}
