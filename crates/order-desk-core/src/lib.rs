use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Customer,
    Item,
    Order,
}

impl Entity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Item => "item",
            Self::Order => "order",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "customer" => Some(Self::Customer),
            "item" => Some(Self::Item),
            "order" => Some(Self::Order),
            _ => None,
        }
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum DeskError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },
    #[error("validation error: {0}")]
    Validation(String),
}

impl DeskError {
    #[must_use]
    pub fn not_found(entity: Entity, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct CustomerId(pub i64);

impl Display for CustomerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl Display for OrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Catalog entry. Distinct from [`ItemReference`], which carries only the
/// identifier used when composing an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub name: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct ItemReference {
    pub id: ItemId,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub cust_id: CustomerId,
    pub notes: Option<String>,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct CustomerDraft {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl CustomerPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemDraft {
    pub name: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub price: Option<f64>,
}

impl ItemPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct OrderDraft {
    pub cust_id: CustomerId,
    #[serde(default)]
    pub items: Vec<ItemReference>,
    pub notes: Option<String>,
}

/// Partial update for one order. Absent fields are left untouched; a present
/// `items` list fully replaces the existing associations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct OrderPatch {
    pub cust_id: Option<CustomerId>,
    pub items: Option<Vec<ItemReference>>,
    pub notes: Option<String>,
}

impl OrderPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cust_id.is_none() && self.items.is_none() && self.notes.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CustomerSummary {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemSummary {
    pub name: Option<String>,
    pub price: Option<f64>,
}

/// Read projection of one order joined with its customer and items.
///
/// `customer` is `None` when the referenced customer row has since been
/// deleted; associated items whose catalog row is gone are omitted from
/// `items`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderView {
    pub id: OrderId,
    pub cust_id: CustomerId,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub notes: Option<String>,
    pub customer: Option<CustomerSummary>,
    pub items: Vec<ItemSummary>,
}
