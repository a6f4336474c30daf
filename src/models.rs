//! Row types for the four bakery tables and their insert candidates.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rusqlite::types::{ToSql, ToSqlOutput};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{numeric, password};

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    /// Already normalised by [`numeric::normalize`].
    Numeric(Decimal),
}

impl Value {
    /// Normalises `value` to NUMERIC(12, 2) before binding it.
    pub fn numeric(value: Decimal) -> Result<Self> {
        numeric::normalize(value).map(Value::Numeric)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Null => Ok(ToSqlOutput::from(rusqlite::types::Null)),
            Value::Integer(v) => v.to_sql(),
            Value::Text(v) => v.to_sql(),
            Value::Boolean(v) => v.to_sql(),
            Value::Timestamp(v) => v.to_sql(),
            Value::Numeric(v) => Ok(ToSqlOutput::from(v.to_string())),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// An entity that has not been inserted yet.
///
/// `COLUMNS` excludes the generated `id`. `values` returns one value per
/// column, in the same order.
pub trait NewRecord {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Bindings for one row. `now` is used for `created_at`/`updated_at`.
    fn values(&self, now: DateTime<Utc>) -> Result<Vec<Value>>;
}

/// `INSERT INTO table (cols...) VALUES` followed by `rows` placeholder groups.
pub(crate) fn insert_sql<T: NewRecord>(rows: usize) -> String {
    let group = format!("({})", vec!["?"; T::COLUMNS.len()].join(", "));
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        T::TABLE,
        T::COLUMNS.join(", "),
        vec![group; rows].join(", ")
    )
}

/// Serialize-only: the password hash is never written out, so a `User`
/// cannot be rebuilt from its serialized form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email_addr: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub(crate) const SELECT: &'static str =
        "SELECT id, username, email_addr, phone, password_hash, created_at, updated_at FROM users";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email_addr: row.get(2)?,
            phone: row.get(3)?,
            password_hash: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        password::verify_password(candidate, &self.password_hash)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User(username={}, email_addr={}, phone={})",
            self.username, self.email_addr, self.phone
        )
    }
}

/// A user to insert. The password is hashed on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email_addr: String,
    pub phone: String,
    password_hash: String,
}

impl NewUser {
    pub fn new(username: &str, email_addr: &str, phone: &str, password: &str) -> Result<Self> {
        Ok(Self {
            username: username.to_string(),
            email_addr: email_addr.to_string(),
            phone: phone.to_string(),
            password_hash: password::hash_password(password)?,
        })
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

impl NewRecord for NewUser {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "username",
        "email_addr",
        "phone",
        "password_hash",
        "created_at",
        "updated_at",
    ];

    fn values(&self, now: DateTime<Utc>) -> Result<Vec<Value>> {
        Ok(vec![
            self.username.as_str().into(),
            self.email_addr.as_str().into(),
            self.phone.as_str().into(),
            self.password_hash.as_str().into(),
            Value::Timestamp(now),
            Value::Timestamp(now),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub shipped: bool,
}

impl Order {
    pub(crate) const SELECT: &'static str = "SELECT id, user_id, shipped FROM orders";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            shipped: row.get(2)?,
        })
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.user_id {
            Some(user_id) => write!(f, "Order(user_id={user_id}, shipped={})", self.shipped),
            None => write!(f, "Order(user_id=None, shipped={})", self.shipped),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewOrder {
    pub user_id: Option<i64>,
    pub shipped: bool,
}

impl NewOrder {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            shipped: false,
        }
    }
}

impl NewRecord for NewOrder {
    const TABLE: &'static str = "orders";
    const COLUMNS: &'static [&'static str] = &["user_id", "shipped"];

    fn values(&self, _now: DateTime<Utc>) -> Result<Vec<Value>> {
        Ok(vec![self.user_id.into(), self.shipped.into()])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub id: i64,
    pub cookie_name: String,
    pub cookie_recipe_url: Option<String>,
    pub cookie_sku: Option<String>,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cookie {
    pub(crate) const SELECT: &'static str = "SELECT id, cookie_name, cookie_recipe_url, cookie_sku, \
         quantity, unit_cost, created_at, updated_at FROM cookies";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            cookie_name: row.get(1)?,
            cookie_recipe_url: row.get(2)?,
            cookie_sku: row.get(3)?,
            quantity: row.get(4)?,
            unit_cost: numeric::column(row, 5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cookie(cookie_name={:?}, cookie_recipe_url={}, cookie_sku={}, quantity={}, unit_cost={})",
            self.cookie_name,
            OptionalText(self.cookie_recipe_url.as_deref()),
            OptionalText(self.cookie_sku.as_deref()),
            self.quantity,
            self.unit_cost
        )
    }
}

/// Quoted text, or a bare `None` when absent.
struct OptionalText<'a>(Option<&'a str>);

impl fmt::Display for OptionalText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(text) => write!(f, "{text:?}"),
            None => f.write_str("None"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCookie {
    pub cookie_name: String,
    pub cookie_recipe_url: Option<String>,
    pub cookie_sku: Option<String>,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

impl NewCookie {
    pub fn new(
        cookie_name: &str,
        cookie_recipe_url: &str,
        cookie_sku: &str,
        quantity: i64,
        unit_cost: Decimal,
    ) -> Self {
        Self {
            cookie_name: cookie_name.to_string(),
            cookie_recipe_url: Some(cookie_recipe_url.to_string()),
            cookie_sku: Some(cookie_sku.to_string()),
            quantity,
            unit_cost,
        }
    }

    pub fn with_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = unit_cost;
        self
    }
}

impl NewRecord for NewCookie {
    const TABLE: &'static str = "cookies";
    const COLUMNS: &'static [&'static str] = &[
        "cookie_name",
        "cookie_recipe_url",
        "cookie_sku",
        "quantity",
        "unit_cost",
        "created_at",
        "updated_at",
    ];

    fn values(&self, now: DateTime<Utc>) -> Result<Vec<Value>> {
        Ok(vec![
            self.cookie_name.as_str().into(),
            self.cookie_recipe_url.clone().into(),
            self.cookie_sku.clone().into(),
            self.quantity.into(),
            Value::numeric(self.unit_cost)?,
            Value::Timestamp(now),
            Value::Timestamp(now),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    pub order_id: Option<i64>,
    pub cookie_id: Option<i64>,
    pub quantity: i64,
    pub extended_cost: Decimal,
}

impl LineItem {
    pub(crate) const SELECT: &'static str =
        "SELECT id, order_id, cookie_id, quantity, extended_cost FROM line_items";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            order_id: row.get(1)?,
            cookie_id: row.get(2)?,
            quantity: row.get(3)?,
            extended_cost: numeric::column(row, 4)?,
        })
    }
}

impl fmt::Display for LineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LineItem(order_id={:?}, cookie_id={:?}, quantity={}, extended_cost={})",
            self.order_id, self.cookie_id, self.quantity, self.extended_cost
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub order_id: Option<i64>,
    pub cookie_id: Option<i64>,
    pub quantity: i64,
    pub extended_cost: Decimal,
}

impl NewLineItem {
    pub fn new(order_id: i64, cookie_id: i64, quantity: i64, extended_cost: Decimal) -> Self {
        Self {
            order_id: Some(order_id),
            cookie_id: Some(cookie_id),
            quantity,
            extended_cost,
        }
    }

    /// A line whose extended cost is `quantity * unit_cost`.
    pub fn priced(order_id: i64, cookie: &Cookie, quantity: i64) -> Self {
        Self::new(order_id, cookie.id, quantity, cookie.unit_cost * Decimal::from(quantity))
    }
}

impl NewRecord for NewLineItem {
    const TABLE: &'static str = "line_items";
    const COLUMNS: &'static [&'static str] = &["order_id", "cookie_id", "quantity", "extended_cost"];

    fn values(&self, _now: DateTime<Utc>) -> Result<Vec<Value>> {
        Ok(vec![
            self.order_id.into(),
            self.cookie_id.into(),
            self.quantity.into(),
            Value::numeric(self.extended_cost)?,
        ])
    }
}

/// `cookie_name` and `quantity` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieStock {
    pub cookie_name: String,
    pub quantity: i64,
}

/// One row of the order/user/line item/cookie join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: i64,
    pub username: String,
    pub phone: String,
    pub cookie_name: String,
    pub quantity: i64,
    pub extended_cost: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn insert_sql_repeats_placeholder_groups() {
        assert_eq!(
            insert_sql::<NewOrder>(2),
            "INSERT INTO orders (user_id, shipped) VALUES (?, ?), (?, ?)"
        );
    }

    #[test]
    fn values_line_up_with_columns() {
        let now = Utc::now();
        let cookie = NewCookie::new("molasses", "http://x", "MOL01", 1, dec!(0.8));
        let values = cookie.values(now).unwrap();
        assert_eq!(values.len(), NewCookie::COLUMNS.len());
        assert_eq!(values[4], Value::Numeric(dec!(0.80)));
        assert_eq!(values[5], Value::Timestamp(now));

        let order = NewOrder::default().values(now).unwrap();
        assert_eq!(order, vec![Value::Null, Value::Boolean(false)]);
    }

    #[test]
    fn out_of_range_cost_is_rejected_before_binding() {
        let item = NewLineItem::new(1, 1, 1, dec!(12345678901));
        assert!(item.values(Utc::now()).is_err());
    }

    #[test]
    fn priced_line_multiplies_exactly() {
        let cookie = Cookie {
            id: 7,
            cookie_name: "dark chocolate chip".to_string(),
            cookie_recipe_url: None,
            cookie_sku: None,
            quantity: 1,
            unit_cost: dec!(0.75),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let line = NewLineItem::priced(3, &cookie, 3);
        assert_eq!(line.extended_cost, dec!(2.25));
        assert_eq!(line.cookie_id, Some(7));
    }

    #[test]
    fn cookie_display_shows_missing_fields_as_none() {
        let mut cookie = Cookie {
            id: 1,
            cookie_name: "peanut butter".to_string(),
            cookie_recipe_url: None,
            cookie_sku: None,
            quantity: 24,
            unit_cost: dec!(0.25),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(
            cookie.to_string(),
            "Cookie(cookie_name=\"peanut butter\", cookie_recipe_url=None, cookie_sku=None, quantity=24, unit_cost=0.25)"
        );

        cookie.cookie_sku = Some(String::new());
        assert!(cookie.to_string().contains("cookie_recipe_url=None, cookie_sku=\"\","));
    }

    #[test]
    fn serialized_user_omits_password_hash() {
        let user = User {
            id: 1,
            username: "cookiemon".to_string(),
            email_addr: "mon@cookie.com".to_string(),
            phone: "111-111-1111".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["username"], "cookiemon");
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2id"));
    }

    #[test]
    fn new_user_never_keeps_plaintext() {
        let user = NewUser::new("cookiemon", "mon@cookie.com", "111-111-1111", "password").unwrap();
        assert!(user.password_hash().starts_with("$argon2id$"));
        let values = user.values(Utc::now()).unwrap();
        assert!(!values.contains(&Value::Text("password".to_string())));
    }
}
