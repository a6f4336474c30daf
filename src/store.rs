use std::ops::Deref;

use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::schema::{self, Schema};

/// Owns the single SQLite connection used by the application.
///
/// Reads go through [`Store::conn`]; anything that must be all-or-nothing
/// goes through [`Store::begin`], which needs `&mut self`, so a store can
/// never have two open units of work at once.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    connection: Connection,
}

impl Store {
    /// Opens the database described by `config` and creates the bakery
    /// schema if it is missing. Foreign keys are always enforced.
    pub fn open(config: StoreConfig) -> Result<Self> {
        Self::open_with_schema(config, &schema::bakery_schema())
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(StoreConfig::in_memory())
    }

    pub fn open_with_schema(config: StoreConfig, schema: &Schema) -> Result<Self> {
        info!(path = %config.database_path.display(), "opening sqlite store");
        let connection = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.database_path)?
        };
        connection.busy_timeout(config.busy_timeout())?;
        connection.pragma_update(None, "foreign_keys", true)?;

        let mut store = Self { config, connection };
        schema::initialize_schema(&mut store.connection, schema)?;
        Ok(store)
    }

    /// The connection, in autocommit mode.
    pub fn conn(&self) -> &Connection {
        &self.connection
    }

    /// Starts a unit of work. It rolls back when dropped without [`UnitOfWork::commit`].
    pub fn begin(&mut self) -> Result<UnitOfWork<'_>> {
        let tx = self.connection.transaction()?;
        debug!("unit of work started");
        Ok(UnitOfWork { tx })
    }

    /// Closes the connection, reporting any error SQLite raises while doing so.
    pub fn close(self) -> Result<()> {
        info!(path = %self.config.database_path.display(), "closing sqlite store");
        self.connection.close().map_err(|(_, err)| err.into())
    }
}

/// An open transaction on a [`Store`].
///
/// Derefs to [`Connection`], so every operation and query accepts it.
/// Writes are flushed to the database as they run (generated ids are
/// available immediately) but only become durable on [`commit`](Self::commit).
pub struct UnitOfWork<'s> {
    tx: Transaction<'s>,
}

impl UnitOfWork<'_> {
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        debug!("unit of work committed");
        Ok(())
    }

    pub fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        debug!("unit of work rolled back");
        Ok(())
    }
}

impl Deref for UnitOfWork<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn foreign_keys_are_always_on() {
        let store = Store::open_in_memory().unwrap();
        let on: bool = store
            .conn()
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert!(on);
    }

    #[test]
    fn dropped_unit_of_work_rolls_back() {
        let mut store = Store::open_in_memory().unwrap();
        {
            let uow = store.begin().unwrap();
            uow.execute("INSERT INTO orders (shipped) VALUES (0)", []).unwrap();
            assert_eq!(order_count(&uow), 1);
        }
        assert_eq!(order_count(store.conn()), 0);

        let uow = store.begin().unwrap();
        uow.execute("INSERT INTO orders (shipped) VALUES (0)", []).unwrap();
        uow.commit().unwrap();
        assert_eq!(order_count(store.conn()), 1);
    }
}
