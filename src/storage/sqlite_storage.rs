use crate::{
    config::DatabaseConfig,
    domain::{
        Card, CardId, ContainerKey, EntityKind, IndexRange, ItemRef, List, ListId, Slot, User,
        UserId,
    },
    error::{BoardError, Result},
    storage::{Storage, StorageTx, TxMode, TxWork},
};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    activated INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- No ON DELETE CASCADE: the engine deletes children explicitly
CREATE TABLE IF NOT EXISTS lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    title TEXT NOT NULL,
    "index" INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    list_id INTEGER NOT NULL REFERENCES lists(id),
    title TEXT NOT NULL,
    "index" INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lists_user_index ON lists(user_id, "index");
CREATE INDEX IF NOT EXISTS idx_cards_list_index ON cards(list_id, "index");
"#;

const USER_COLUMNS: &str = "id, email, activated, created_at, updated_at";
const LIST_COLUMNS: &str = r#"id, user_id, title, "index", created_at, updated_at"#;
const CARD_COLUMNS: &str = r#"id, list_id, title, "index", created_at, updated_at"#;

/// SQLite storage backend
///
/// A single connection guarded by an async mutex. Write transactions are
/// opened `IMMEDIATE`, so two range shifts never interleave.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens the database described by `config` and applies the schema
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let conn = match &config.path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let conn = Connection::open(path)?;
                if config.wal {
                    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                }
                info!(path = %path.display(), "opened sqlite database");
                conn
            }
            None => Connection::open_in_memory()?,
        };

        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a fresh in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&DatabaseConfig::default())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    async fn transaction<'a>(&'a self, mode: TxMode, work: TxWork<'a>) -> Result<()> {
        let mut conn = self.conn.lock().await;
        run_transaction(&mut conn, mode, work)
    }
}

fn run_transaction(conn: &mut Connection, mode: TxMode, work: TxWork<'_>) -> Result<()> {
    let behavior = match mode {
        TxMode::ReadOnly => TransactionBehavior::Deferred,
        TxMode::ReadWrite => TransactionBehavior::Immediate,
    };
    let tx = conn.transaction_with_behavior(behavior)?;

    let mut scope = SqliteTx { tx: &tx, mode };
    // Dropping `tx` on error rolls back
    work(&mut scope)?;

    match mode {
        TxMode::ReadWrite => tx.commit()?,
        TxMode::ReadOnly => tx.rollback()?,
    }
    Ok(())
}

/// Table and parent column holding a container's rows
fn container_table(container: ContainerKey) -> (&'static str, &'static str, i64) {
    match container {
        ContainerKey::User(id) => ("lists", "user_id", id.get()),
        ContainerKey::List(id) => ("cards", "list_id", id.get()),
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::new(row.get(0)?),
        email: row.get(1)?,
        activated: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn list_from_row(row: &Row<'_>) -> rusqlite::Result<List> {
    Ok(List {
        id: ListId::new(row.get(0)?),
        user_id: UserId::new(row.get(1)?),
        title: row.get(2)?,
        index: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: CardId::new(row.get(0)?),
        list_id: ListId::new(row.get(1)?),
        title: row.get(2)?,
        index: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

struct SqliteTx<'a> {
    tx: &'a Transaction<'a>,
    mode: TxMode,
}

impl SqliteTx<'_> {
    fn writable(&self) -> Result<()> {
        match self.mode {
            TxMode::ReadWrite => Ok(()),
            TxMode::ReadOnly => Err(BoardError::StorageError(
                "write attempted in a read-only transaction".to_string(),
            )),
        }
    }

    fn expect_one(&self, affected: usize, kind: EntityKind, id: i64) -> Result<()> {
        if affected == 0 {
            return Err(BoardError::not_found(kind, id));
        }
        Ok(())
    }
}

impl StorageTx for SqliteTx<'_> {
    fn insert_user(&mut self, email: &str) -> Result<User> {
        self.writable()?;
        let now = Utc::now();
        self.tx.execute(
            "INSERT INTO users (email, activated, created_at, updated_at) VALUES (?1, 0, ?2, ?2)",
            params![email, now],
        )?;
        Ok(User {
            id: UserId::new(self.tx.last_insert_rowid()),
            email: email.to_string(),
            activated: false,
            created_at: now,
            updated_at: now,
        })
    }

    fn user(&mut self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        Ok(self
            .tx
            .query_row(&sql, params![id.get()], user_from_row)
            .optional()?)
    }

    fn user_by_email(&mut self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
        Ok(self
            .tx
            .query_row(&sql, params![email], user_from_row)
            .optional()?)
    }

    fn activate_user(&mut self, id: UserId) -> Result<()> {
        self.writable()?;
        let affected = self.tx.execute(
            "UPDATE users SET activated = 1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now(), id.get()],
        )?;
        self.expect_one(affected, EntityKind::User, id.get())
    }

    fn delete_user(&mut self, id: UserId) -> Result<()> {
        self.writable()?;
        let affected = self
            .tx
            .execute("DELETE FROM users WHERE id = ?1", params![id.get()])?;
        self.expect_one(affected, EntityKind::User, id.get())
    }

    fn insert_list(&mut self, user: UserId, title: &str, index: i64) -> Result<List> {
        self.writable()?;
        let now = Utc::now();
        self.tx.execute(
            r#"INSERT INTO lists (user_id, title, "index", created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)"#,
            params![user.get(), title, index, now],
        )?;
        Ok(List {
            id: ListId::new(self.tx.last_insert_rowid()),
            user_id: user,
            title: title.to_string(),
            index,
            created_at: now,
            updated_at: now,
        })
    }

    fn insert_card(&mut self, list: ListId, title: &str, index: i64) -> Result<Card> {
        self.writable()?;
        let now = Utc::now();
        self.tx.execute(
            r#"INSERT INTO cards (list_id, title, "index", created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)"#,
            params![list.get(), title, index, now],
        )?;
        Ok(Card {
            id: CardId::new(self.tx.last_insert_rowid()),
            list_id: list,
            title: title.to_string(),
            index,
            created_at: now,
            updated_at: now,
        })
    }

    fn list(&mut self, id: ListId) -> Result<Option<List>> {
        let sql = format!("SELECT {} FROM lists WHERE id = ?1", LIST_COLUMNS);
        Ok(self
            .tx
            .query_row(&sql, params![id.get()], list_from_row)
            .optional()?)
    }

    fn card(&mut self, id: CardId) -> Result<Option<Card>> {
        let sql = format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS);
        Ok(self
            .tx
            .query_row(&sql, params![id.get()], card_from_row)
            .optional()?)
    }

    fn lists_of(&mut self, user: UserId) -> Result<Vec<List>> {
        let sql = format!(
            r#"SELECT {} FROM lists WHERE user_id = ?1 ORDER BY "index" ASC, id ASC"#,
            LIST_COLUMNS
        );
        let mut stmt = self.tx.prepare(&sql)?;
        let lists = stmt
            .query_map(params![user.get()], list_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lists)
    }

    fn cards_of(&mut self, list: ListId) -> Result<Vec<Card>> {
        let sql = format!(
            r#"SELECT {} FROM cards WHERE list_id = ?1 ORDER BY "index" ASC, id ASC"#,
            CARD_COLUMNS
        );
        let mut stmt = self.tx.prepare(&sql)?;
        let cards = stmt
            .query_map(params![list.get()], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    fn set_title(&mut self, item: ItemRef, title: &str) -> Result<()> {
        self.writable()?;
        let table = match item {
            ItemRef::List(_) => "lists",
            ItemRef::Card(_) => "cards",
        };
        let sql = format!(
            "UPDATE {} SET title = ?1, updated_at = ?2 WHERE id = ?3",
            table
        );
        let affected = self
            .tx
            .execute(&sql, params![title, Utc::now(), item.id()])?;
        self.expect_one(affected, item.kind(), item.id())
    }

    fn count(&mut self, container: ContainerKey) -> Result<i64> {
        let (table, parent, parent_id) = container_table(container);
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", table, parent);
        Ok(self.tx.query_row(&sql, params![parent_id], |row| row.get(0))?)
    }

    fn shift_range(
        &mut self,
        container: ContainerKey,
        range: IndexRange,
        delta: i64,
    ) -> Result<usize> {
        self.writable()?;
        let (table, parent, parent_id) = container_table(container);
        let sql = format!(
            r#"UPDATE {table} SET "index" = "index" + ?1, updated_at = ?2
               WHERE {parent} = ?3 AND "index" >= ?4 AND "index" <= ?5"#
        );
        let shifted = self.tx.execute(
            &sql,
            params![delta, Utc::now(), parent_id, range.start(), range.end()],
        )?;
        debug!(%container, %range, delta, shifted, "shifted index range");
        Ok(shifted)
    }

    fn place(&mut self, item: ItemRef, slot: Slot) -> Result<()> {
        self.writable()?;
        let (table, parent, parent_id) = container_table(slot.container);
        if !item.fits(&slot.container) {
            return Err(BoardError::InvalidArgument(format!(
                "{} cannot be placed in {}",
                item, slot.container
            )));
        }
        let sql = format!(
            r#"UPDATE {table} SET {parent} = ?1, "index" = ?2, updated_at = ?3 WHERE id = ?4"#
        );
        let affected = self.tx.execute(
            &sql,
            params![parent_id, slot.index, Utc::now(), item.id()],
        )?;
        self.expect_one(affected, item.kind(), item.id())
    }

    fn destroy(&mut self, item: ItemRef) -> Result<()> {
        self.writable()?;
        let affected = match item {
            ItemRef::List(id) => {
                self.tx
                    .execute("DELETE FROM cards WHERE list_id = ?1", params![id.get()])?;
                self.tx
                    .execute("DELETE FROM lists WHERE id = ?1", params![id.get()])?
            }
            ItemRef::Card(id) => self
                .tx
                .execute("DELETE FROM cards WHERE id = ?1", params![id.get()])?,
        };
        self.expect_one(affected, item.kind(), item.id())
    }
}
