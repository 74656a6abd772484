use async_trait::async_trait;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::model::Player;
use crate::storage::{
    AssignmentRow, HandicapUpdate, RosterRow, RosterStore, StorageError, normalize_row,
};

const SCHEMA: &str = include_str!("../sql/schema/sqlite/00_game_player.sql");
const GET_ROSTER: &str = include_str!("../sql/functions/sqlite/01_sp_get_roster.sql");
const SET_ASSIGNMENT: &str = include_str!("../sql/functions/sqlite/02_sp_set_assignment.sql");
const SET_HANDICAPS: &str = include_str!("../sql/functions/sqlite/03_sp_set_handicaps.sql");
const DEL_PLAYER: &str = include_str!("../sql/functions/sqlite/04_sp_del_player.sql");
const INS_PLAYER: &str = include_str!("../sql/functions/sqlite/05_sp_ins_player.sql");

/// Roster store backed by one sqlite connection. Calls run on the blocking
/// pool so the async side never waits on disk.
#[derive(Clone)]
pub struct SqliteRosterStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRosterStore {
    /// Open (or create) the database file and make sure the table exists.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the file cannot be opened or the schema fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// # Errors
    ///
    /// Will return `Err` if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, work: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| StorageError::new(format!("connection lock poisoned: {e}")))?;
            work(&mut guard)
        })
        .await
        .map_err(|e| StorageError::new(format!("blocking task failed: {e}")))?
    }

    /// Run a startup script, e.g. to seed a demo roster.
    ///
    /// # Errors
    ///
    /// Will return `Err` if any statement in the script fails.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), StorageError> {
        let sql = sql.to_string();
        self.run(move |conn| Ok(conn.execute_batch(&sql)?)).await
    }

    /// Insert players into a game, refreshing name and index of existing ones.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an insert fails; nothing is written then.
    pub async fn seed_players(
        &self,
        game_id: &str,
        players: &[Player],
    ) -> Result<(), StorageError> {
        let game_id = game_id.to_string();
        let players: Vec<(String, String, Option<f64>)> = players
            .iter()
            .map(|p| (p.ghin.clone(), p.name.clone(), p.handicap_index.map(f64::from)))
            .collect();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(INS_PLAYER)?;
                for (ghin, name, index) in &players {
                    stmt.execute(params![game_id, ghin, name, index])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

fn read_roster(conn: &Connection, game_id: &str) -> Result<Vec<Player>, StorageError> {
    let mut stmt = conn.prepare(GET_ROSTER)?;
    let rows = stmt.query_map(params![game_id], |row| {
        Ok(RosterRow {
            ghin: row.get(0)?,
            name: row.get(1)?,
            handicap_index: row.get(2)?,
            course_handicap: row.get(3)?,
            playing_handicap: row.get(4)?,
            shots_off: row.get(5)?,
            pairing_id: row.get(6)?,
            pairing_pos: row.get(7)?,
            flight_id: row.get(8)?,
            flight_pos: row.get(9)?,
            tee_time: row.get(10)?,
            start_hole: row.get(11)?,
            start_hole_suffix: row.get(12)?,
        })
    })?;

    let mut players = Vec::new();
    for row in rows {
        match normalize_row(row?) {
            Ok(player) => players.push(player),
            Err(e) => warn!(game_id, error = %e, "skipping unreadable roster row"),
        }
    }
    Ok(players)
}

#[async_trait]
impl RosterStore for SqliteRosterStore {
    async fn load_roster(&self, game_id: &str) -> Result<Vec<Player>, StorageError> {
        let game_id = game_id.to_string();
        self.run(move |conn| read_roster(conn, &game_id)).await
    }

    async fn save_assignments(
        &self,
        game_id: &str,
        rows: &[AssignmentRow],
    ) -> Result<Vec<Player>, StorageError> {
        let game_id = game_id.to_string();
        let rows = rows.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(SET_ASSIGNMENT)?;
                for r in &rows {
                    let changed = stmt.execute(params![
                        game_id,
                        r.ghin,
                        r.pairing_id,
                        r.pairing_pos,
                        r.flight_id,
                        r.flight_pos,
                        r.tee_time,
                        r.start_hole,
                        r.start_hole_suffix,
                    ])?;
                    if changed == 0 {
                        warn!(
                            game_id = %game_id,
                            ghin = %r.ghin,
                            "assignment for a player not on the roster"
                        );
                    }
                }
            }
            // read back before commit so a bad read rolls the write back
            let canonical = read_roster(&tx, &game_id)?;
            tx.commit()?;
            debug!(game_id = %game_id, rows = rows.len(), "assignments saved");
            Ok(canonical)
        })
        .await
    }

    async fn remove_player(&self, game_id: &str, ghin: &str) -> Result<(), StorageError> {
        let game_id = game_id.to_string();
        let ghin = ghin.to_string();
        self.run(move |conn| {
            let removed = conn.execute(DEL_PLAYER, params![game_id, ghin])?;
            if removed == 0 {
                return Err(StorageError::new(format!(
                    "player {ghin} is not on the roster of game {game_id}"
                )));
            }
            Ok(())
        })
        .await
    }

    async fn store_handicaps(
        &self,
        game_id: &str,
        updates: &[HandicapUpdate],
    ) -> Result<(), StorageError> {
        if updates.is_empty() {
            return Ok(());
        }
        let game_id = game_id.to_string();
        let updates = updates.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(SET_HANDICAPS)?;
                for u in &updates {
                    stmt.execute(params![
                        game_id,
                        u.ghin,
                        u.course_handicap,
                        u.playing_handicap,
                        u.shots_off,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
