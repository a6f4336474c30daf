//! Writes: inserts, updates and deletes.
//!
//! Every function takes the connection explicitly. Passing `store.conn()`
//! runs in autocommit mode; passing a [`crate::UnitOfWork`] makes the write
//! part of that transaction.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, params_from_iter, Connection};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::models::{insert_sql, Cookie, NewCookie, NewRecord, User, Value};
use crate::{numeric, password, queries};

/// SQLite's historical default for `SQLITE_MAX_VARIABLE_NUMBER`.
const MAX_BOUND_PARAMS: usize = 999;

/// Inserts one row and returns its generated id.
pub fn insert<T: NewRecord>(conn: &Connection, record: &T) -> Result<i64> {
    let values = record.values(Utc::now())?;
    let mut stmt = conn.prepare_cached(&insert_sql::<T>(1))?;
    stmt.execute(params_from_iter(values.iter()))?;
    let id = conn.last_insert_rowid();
    debug!(table = T::TABLE, id, "inserted row");
    Ok(id)
}

/// Inserts a cookie. Shorthand for [`insert`].
pub fn add_cookie(conn: &Connection, cookie: &NewCookie) -> Result<i64> {
    insert(conn, cookie)
}

/// Inserts `records` in order inside one savepoint and returns their ids.
///
/// Each row is flushed as it is inserted, so its id is known before the
/// savepoint is released. If any insert fails the whole batch is rolled
/// back and the error is returned.
pub fn insert_batch<T: NewRecord>(conn: &Connection, records: &[T]) -> Result<Vec<i64>> {
    let ids: Vec<i64> = in_savepoint(conn, |conn| {
        records.iter().map(|record| insert(conn, record)).collect()
    })?;
    info!(table = T::TABLE, rows = ids.len(), "batch inserted");
    Ok(ids)
}

/// Inserts `records` with multi-row `INSERT` statements and returns how many
/// rows were written. Generated ids are not reported; query for them if needed.
///
/// Rows are grouped so no statement binds more than 999 parameters, and all
/// statements run inside one savepoint: a constraint violation anywhere
/// leaves none of the rows behind. `T::COLUMNS` must not be empty.
pub fn bulk_insert<T: NewRecord>(conn: &Connection, records: &[T]) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }
    let now = Utc::now();
    // Validate every row before touching the database.
    let rows = records
        .iter()
        .map(|record| record.values(now))
        .collect::<Result<Vec<Vec<Value>>>>()?;

    let rows_per_statement = (MAX_BOUND_PARAMS / T::COLUMNS.len().max(1)).max(1);
    let written = in_savepoint(conn, |conn| {
        let mut written = 0;
        for chunk in rows.chunks(rows_per_statement) {
            let mut stmt = conn.prepare_cached(&insert_sql::<T>(chunk.len()))?;
            written += stmt.execute(params_from_iter(chunk.iter().flatten()))?;
        }
        Ok(written)
    })?;
    info!(table = T::TABLE, rows = written, "bulk inserted");
    Ok(written)
}

/// Loads the first cookie named `name`, applies `change` to it and saves it.
///
/// Fails with [`StoreError::NotFound`] when no cookie has that name.
pub fn update_cookie_by_name<F>(conn: &Connection, name: &str, change: F) -> Result<Cookie>
where
    F: FnOnce(&mut Cookie),
{
    in_savepoint(conn, |conn| {
        let mut cookie = queries::find_cookie_by_name(conn, name)?
            .ok_or_else(|| StoreError::not_found("cookie", format!("cookie_name = {name:?}")))?;
        change(&mut cookie);
        update_cookie(conn, &mut cookie)?;
        Ok(cookie)
    })
}

/// Writes every mutable field of `cookie` back to its row and refreshes
/// `updated_at`.
pub fn update_cookie(conn: &Connection, cookie: &mut Cookie) -> Result<()> {
    let unit_cost = numeric::normalize(cookie.unit_cost)?;
    let updated_at = touch(cookie.updated_at);
    let changed = conn.prepare_cached(
        "UPDATE cookies SET cookie_name = ?1, cookie_recipe_url = ?2, cookie_sku = ?3, \
         quantity = ?4, unit_cost = ?5, updated_at = ?6 WHERE id = ?7",
    )?
    .execute(params![
        cookie.cookie_name,
        cookie.cookie_recipe_url,
        cookie.cookie_sku,
        cookie.quantity,
        Value::Numeric(unit_cost),
        updated_at,
        cookie.id,
    ])?;
    if changed == 0 {
        return Err(StoreError::not_found("cookie", cookie.id));
    }
    cookie.unit_cost = unit_cost;
    cookie.updated_at = updated_at;
    debug!(id = cookie.id, quantity = cookie.quantity, "cookie updated");
    Ok(())
}

/// Writes the contact fields of `user` back to its row and refreshes `updated_at`.
pub fn update_user(conn: &Connection, user: &mut User) -> Result<()> {
    let updated_at = touch(user.updated_at);
    let changed = conn.execute(
        "UPDATE users SET username = ?1, email_addr = ?2, phone = ?3, updated_at = ?4 WHERE id = ?5",
        params![user.username, user.email_addr, user.phone, updated_at, user.id],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found("user", user.id));
    }
    user.updated_at = updated_at;
    debug!(id = user.id, "user updated");
    Ok(())
}

/// Replaces the stored password hash of `user` with a hash of `new_password`.
pub fn set_user_password(conn: &Connection, user: &mut User, new_password: &str) -> Result<()> {
    let hash = password::hash_password(new_password)?;
    let updated_at = touch(user.updated_at);
    let changed = conn.execute(
        "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
        params![hash, updated_at, user.id],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found("user", user.id));
    }
    user.password_hash = hash;
    user.updated_at = updated_at;
    debug!(id = user.id, "user password changed");
    Ok(())
}

pub fn mark_order_shipped(conn: &Connection, order_id: i64) -> Result<()> {
    let changed = conn.execute("UPDATE orders SET shipped = 1 WHERE id = ?1", [order_id])?;
    if changed == 0 {
        return Err(StoreError::not_found("order", order_id));
    }
    debug!(id = order_id, "order shipped");
    Ok(())
}

pub fn delete_user(conn: &Connection, id: i64) -> Result<bool> {
    delete_by_id(conn, "users", id)
}

pub fn delete_order(conn: &Connection, id: i64) -> Result<bool> {
    delete_by_id(conn, "orders", id)
}

pub fn delete_cookie(conn: &Connection, id: i64) -> Result<bool> {
    delete_by_id(conn, "cookies", id)
}

pub fn delete_line_item(conn: &Connection, id: i64) -> Result<bool> {
    delete_by_id(conn, "line_items", id)
}

fn delete_by_id(conn: &Connection, table: &'static str, id: i64) -> Result<bool> {
    let removed = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])? > 0;
    debug!(table, id, removed, "delete");
    Ok(removed)
}

/// The next `updated_at` value: now, or one microsecond past `previous` if
/// the clock has not moved beyond it.
fn touch(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Runs `f` inside a SAVEPOINT. Works both in autocommit mode, where the
/// savepoint acts as a transaction, and nested inside an open transaction.
fn in_savepoint<T, F>(conn: &Connection, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T>,
{
    conn.execute_batch("SAVEPOINT bakery_write")?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch("RELEASE bakery_write")?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) =
                conn.execute_batch("ROLLBACK TO bakery_write; RELEASE bakery_write")
            {
                warn!(error = %rollback, "failed to roll back savepoint");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewOrder;
    use crate::Store;
    use rust_decimal_macros::dec;

    fn cookie(name: &str, quantity: i64) -> NewCookie {
        NewCookie::new(name, "http://some.aweso.me/cookie/recipe.html", "CC01", quantity, dec!(0.50))
    }

    #[test]
    fn touch_is_strictly_increasing() {
        let future = Utc::now() + Duration::hours(1);
        assert!(touch(future) > future);
        let past = Utc::now() - Duration::hours(1);
        assert!(touch(past) > past);
    }

    #[test]
    fn bulk_insert_splits_into_statements() {
        let store = Store::open_in_memory().unwrap();
        // 7 columns -> 142 rows per statement
        let cookies: Vec<NewCookie> = (0..300).map(|i| cookie(&format!("c{i}"), i)).collect();
        assert_eq!(bulk_insert(store.conn(), &cookies).unwrap(), 300);
        assert_eq!(queries::all_cookies(store.conn()).unwrap().len(), 300);
    }

    #[test]
    fn bulk_insert_of_nothing_is_a_no_op() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(bulk_insert::<NewCookie>(store.conn(), &[]).unwrap(), 0);
    }

    #[test]
    fn failed_batch_inside_unit_of_work_keeps_earlier_writes() {
        let mut store = Store::open_in_memory().unwrap();
        let uow = store.begin().unwrap();
        insert(&*uow, &cookie("sugar", 3)).unwrap();
        let err = insert_batch(&*uow, &[NewOrder::default(), NewOrder::for_user(99)]).unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));
        uow.commit().unwrap();

        assert_eq!(queries::all_cookies(store.conn()).unwrap().len(), 1);
        let orders: i64 = store
            .conn()
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orders, 0);
    }

    struct NoColumns;

    impl NewRecord for NoColumns {
        const TABLE: &'static str = "orders";
        const COLUMNS: &'static [&'static str] = &[];

        fn values(&self, _now: DateTime<Utc>) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn bulk_insert_without_columns_errors_instead_of_panicking() {
        let store = Store::open_in_memory().unwrap();
        assert!(bulk_insert(store.conn(), &[NoColumns]).is_err());
    }

    #[test]
    fn mark_missing_order_shipped_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = mark_order_shipped(store.conn(), 1).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "order", .. }));
    }
}
