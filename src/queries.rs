//! Reads. Lookups that may find nothing return `Option`, never an error.

use rusqlite::{Connection, OptionalExtension, Statement};

use crate::error::{Result, StoreError};
use crate::models::{Cookie, CookieStock, LineItem, Order, OrderLine, User};
use crate::numeric;

/// Every cookie, in insertion (id) order.
pub fn all_cookies(conn: &Connection) -> Result<Vec<Cookie>> {
    let mut stmt = conn.prepare_cached(&format!("{} ORDER BY id", Cookie::SELECT))?;
    let cookies = stmt
        .query_map([], Cookie::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(cookies)
}

/// Every cookie, lowest quantity first. Equal quantities come back in id order.
pub fn cookies_by_quantity(conn: &Connection) -> Result<Vec<Cookie>> {
    let mut stmt = conn.prepare_cached(&format!("{} ORDER BY quantity ASC, id ASC", Cookie::SELECT))?;
    let cookies = stmt
        .query_map([], Cookie::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(cookies)
}

/// Only the name and quantity of every cookie.
pub fn cookie_stock(conn: &Connection) -> Result<Vec<CookieStock>> {
    let mut stmt = conn.prepare_cached("SELECT cookie_name, quantity FROM cookies ORDER BY id")?;
    let stock = stmt
        .query_map([], |row| {
            Ok(CookieStock {
                cookie_name: row.get(0)?,
                quantity: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(stock)
}

/// The first cookie (lowest id) with exactly this name.
pub fn find_cookie_by_name(conn: &Connection, name: &str) -> Result<Option<Cookie>> {
    let cookie = conn
        .prepare_cached(&format!(
            "{} WHERE cookie_name = ?1 ORDER BY id LIMIT 1",
            Cookie::SELECT
        ))?
        .query_row([name], Cookie::from_row)
        .optional()?;
    Ok(cookie)
}

/// Reads cookies one row at a time without collecting them.
///
/// The stream is single-pass: [`CookieStream::rows`] may be called once.
pub struct CookieStream<'c> {
    stmt: Statement<'c>,
    consumed: bool,
}

impl<'c> CookieStream<'c> {
    pub fn new(conn: &'c Connection) -> Result<Self> {
        let stmt = conn.prepare(&format!("{} ORDER BY id", Cookie::SELECT))?;
        Ok(Self {
            stmt,
            consumed: false,
        })
    }

    pub fn rows(&mut self) -> Result<impl Iterator<Item = Result<Cookie>> + '_> {
        if self.consumed {
            return Err(StoreError::StreamConsumed);
        }
        self.consumed = true;
        let rows = self.stmt.query_map([], Cookie::from_row)?;
        Ok(rows.map(|row| row.map_err(StoreError::from)))
    }
}

pub fn get_cookie(conn: &Connection, id: i64) -> Result<Option<Cookie>> {
    let cookie = conn
        .prepare_cached(&format!("{} WHERE id = ?1", Cookie::SELECT))?
        .query_row([id], Cookie::from_row)
        .optional()?;
    Ok(cookie)
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .prepare_cached(&format!("{} WHERE id = ?1", User::SELECT))?
        .query_row([id], User::from_row)
        .optional()?;
    Ok(user)
}

pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let user = conn
        .prepare_cached(&format!("{} WHERE username = ?1", User::SELECT))?
        .query_row([username], User::from_row)
        .optional()?;
    Ok(user)
}

pub fn all_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare_cached(&format!("{} ORDER BY id", User::SELECT))?;
    let users = stmt
        .query_map([], User::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

pub fn get_order(conn: &Connection, id: i64) -> Result<Option<Order>> {
    let order = conn
        .prepare_cached(&format!("{} WHERE id = ?1", Order::SELECT))?
        .query_row([id], Order::from_row)
        .optional()?;
    Ok(order)
}

pub fn get_line_item(conn: &Connection, id: i64) -> Result<Option<LineItem>> {
    let item = conn
        .prepare_cached(&format!("{} WHERE id = ?1", LineItem::SELECT))?
        .query_row([id], LineItem::from_row)
        .optional()?;
    Ok(item)
}

/// Orders placed by `user_id`, oldest first.
pub fn orders_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Order>> {
    let mut stmt = conn.prepare_cached(&format!("{} WHERE user_id = ?1 ORDER BY id", Order::SELECT))?;
    let orders = stmt
        .query_map([user_id], Order::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(orders)
}

/// Line items of `order_id`, in id order.
pub fn line_items_for_order(conn: &Connection, order_id: i64) -> Result<Vec<LineItem>> {
    let mut stmt =
        conn.prepare_cached(&format!("{} WHERE order_id = ?1 ORDER BY id", LineItem::SELECT))?;
    let items = stmt
        .query_map([order_id], LineItem::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

pub fn user_for_order(conn: &Connection, order: &Order) -> Result<Option<User>> {
    match order.user_id {
        Some(user_id) => get_user(conn, user_id),
        None => Ok(None),
    }
}

pub fn cookie_for_line_item(conn: &Connection, item: &LineItem) -> Result<Option<Cookie>> {
    match item.cookie_id {
        Some(cookie_id) => get_cookie(conn, cookie_id),
        None => Ok(None),
    }
}

/// Row order for [`order_lines_for_username`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinOrdering {
    /// Whatever order SQLite produces.
    #[default]
    Unspecified,
    ByOrderThenLine,
}

/// Every line item of every order placed by `username`, joined with the
/// user's contact details and the cookie's name.
///
/// Inner joins throughout: orders without a user, lines without an order and
/// lines without a cookie are left out. An unknown user gives an empty result.
pub fn order_lines_for_username(
    conn: &Connection,
    username: &str,
    ordering: JoinOrdering,
) -> Result<Vec<OrderLine>> {
    let mut sql = String::from(
        "SELECT o.id, u.username, u.phone, c.cookie_name, li.quantity, li.extended_cost \
         FROM orders o \
         JOIN users u ON o.user_id = u.id \
         JOIN line_items li ON li.order_id = o.id \
         JOIN cookies c ON li.cookie_id = c.id \
         WHERE u.username = ?1",
    );
    if ordering == JoinOrdering::ByOrderThenLine {
        sql.push_str(" ORDER BY o.id, li.id");
    }
    let mut stmt = conn.prepare_cached(&sql)?;
    let lines = stmt
        .query_map([username], |row| {
            Ok(OrderLine {
                order_id: row.get(0)?,
                username: row.get(1)?,
                phone: row.get(2)?,
                cookie_name: row.get(3)?,
                quantity: row.get(4)?,
                extended_cost: numeric::column(row, 5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCookie, NewLineItem, NewOrder};
    use crate::operations::insert;
    use crate::Store;
    use rust_decimal_macros::dec;

    #[test]
    fn stream_can_only_be_read_once() {
        let store = Store::open_in_memory().unwrap();
        insert(store.conn(), &NewCookie::new("molasses", "u", "MOL01", 1, dec!(0.80))).unwrap();

        let mut stream = CookieStream::new(store.conn()).unwrap();
        let names: Vec<String> = stream
            .rows()
            .unwrap()
            .map(|c| c.unwrap().cookie_name)
            .collect();
        assert_eq!(names, vec!["molasses".to_string()]);
        assert!(matches!(stream.rows(), Err(StoreError::StreamConsumed)));
    }

    #[test]
    fn navigation_helpers_follow_foreign_keys() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn();
        let cookie_id = insert(conn, &NewCookie::new("sugar", "u", "SUG01", 5, dec!(0.40))).unwrap();
        let order_id = insert(conn, &NewOrder::default()).unwrap();
        let cookie = get_cookie(conn, cookie_id).unwrap().unwrap();
        let pair = insert(conn, &NewLineItem::priced(order_id, &cookie, 2)).unwrap();
        let single = insert(conn, &NewLineItem::priced(order_id, &cookie, 1)).unwrap();

        let order = get_order(conn, order_id).unwrap().unwrap();
        assert!(!order.shipped);
        assert_eq!(user_for_order(conn, &order).unwrap(), None);

        let items = line_items_for_order(conn, order_id).unwrap();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![pair, single]);
        assert_eq!(items[0].extended_cost, dec!(0.80));
        assert_eq!(cookie_for_line_item(conn, &items[1]).unwrap(), Some(cookie));
    }

    #[test]
    fn missing_rows_are_none() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn();
        assert_eq!(get_cookie(conn, 1).unwrap(), None);
        assert_eq!(get_user(conn, 1).unwrap(), None);
        assert_eq!(get_order(conn, 1).unwrap(), None);
        assert_eq!(get_line_item(conn, 1).unwrap(), None);
        assert_eq!(find_cookie_by_name(conn, "snickerdoodle").unwrap(), None);
        assert_eq!(find_user_by_username(conn, "nobody").unwrap(), None);
    }
}
