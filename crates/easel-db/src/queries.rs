use crate::Database;
use crate::models::{RoomMemberRow, RoomRow, SnapshotRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: Option<&str>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (email, password, full_name) VALUES (?1, ?2, ?3)",
                rusqlite::params![email, password_hash, full_name],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", &email))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &id))
    }

    // -- Rooms --

    pub fn create_room(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
        owner_id: i64,
        max_users: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO rooms (id, name, description, owner_id, max_users)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, name, description, owner_id, max_users],
            )?;
            Ok(())
        })
    }

    /// Fetch a room regardless of active flag.
    pub fn get_room(&self, id: &str) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| query_room(conn, id, false))
    }

    /// Fetch a room only if it has not been soft-deleted.
    pub fn get_active_room(&self, id: &str) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| query_room(conn, id, true))
    }

    pub fn add_room_member(&self, user_id: i64, room_id: &str, role: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO room_members (user_id, room_id, role) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, room_id, role],
            )?;
            Ok(())
        })
    }

    pub fn get_active_membership(
        &self,
        user_id: i64,
        room_id: &str,
    ) -> Result<Option<RoomMemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, room_id, role, is_active, joined_at
                 FROM room_members
                 WHERE user_id = ?1 AND room_id = ?2 AND is_active = 1",
            )?;
            let row = stmt
                .query_row(rusqlite::params![user_id, room_id], map_member_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn count_active_members(&self, room_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM room_members WHERE room_id = ?1 AND is_active = 1",
                [room_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Soft-remove a membership. Returns false when none was active.
    pub fn deactivate_membership(&self, user_id: i64, room_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE room_members SET is_active = 0
                 WHERE user_id = ?1 AND room_id = ?2 AND is_active = 1",
                rusqlite::params![user_id, room_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Soft-delete a room together with all of its memberships.
    pub fn deactivate_room(&self, room_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE rooms SET is_active = 0 WHERE id = ?1", [room_id])?;
            conn.execute(
                "UPDATE room_members SET is_active = 0 WHERE room_id = ?1",
                [room_id],
            )?;
            Ok(())
        })
    }

    /// Active rooms for a user, with the role they hold in each.
    pub fn rooms_for_user(&self, user_id: i64) -> Result<Vec<(RoomRow, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.name, r.description, r.owner_id, r.is_active,
                        r.max_users, r.created_at, m.role
                 FROM room_members m
                 JOIN rooms r ON r.id = m.room_id
                 WHERE m.user_id = ?1 AND m.is_active = 1
                 ORDER BY m.joined_at",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok((
                        RoomRow {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            description: row.get(2)?,
                            owner_id: row.get(3)?,
                            is_active: row.get(4)?,
                            max_users: row.get(5)?,
                            created_at: row.get(6)?,
                        },
                        row.get::<_, String>(7)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn room_members(&self, room_id: &str) -> Result<Vec<RoomMemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, room_id, role, is_active, joined_at
                 FROM room_members
                 WHERE room_id = ?1 AND is_active = 1
                 ORDER BY joined_at",
            )?;
            let rows = stmt
                .query_map([room_id], map_member_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Canvas snapshots --

    /// Append a new snapshot version. Always inserts; the explicit
    /// "save as version" and "clear" paths both land here.
    pub fn append_snapshot(&self, room_id: &str, state_json: &str) -> Result<SnapshotRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO canvas_snapshots (room_id, state_json) VALUES (?1, ?2)",
                rusqlite::params![room_id, state_json],
            )?;
            let id = conn.last_insert_rowid();
            query_snapshot_by_id(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("snapshot {} vanished after insert", id))
        })
    }

    /// High-frequency autosave path: overwrite the newest snapshot for
    /// the room in place (same id, same created_at), or insert the
    /// first one. Intentionally distinct from `append_snapshot` so
    /// incremental saves do not grow history unbounded. Two writers
    /// racing here resolve by commit order, last one wins.
    pub fn upsert_latest_snapshot(&self, room_id: &str, state_json: &str) -> Result<SnapshotRow> {
        self.with_conn(|conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM canvas_snapshots WHERE room_id = ?1
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                    [room_id],
                    |row| row.get(0),
                )
                .optional()?;

            let id = match existing {
                Some(id) => {
                    conn.execute(
                        "UPDATE canvas_snapshots SET state_json = ?1 WHERE id = ?2",
                        rusqlite::params![state_json, id],
                    )?;
                    id
                }
                None => {
                    conn.execute(
                        "INSERT INTO canvas_snapshots (room_id, state_json) VALUES (?1, ?2)",
                        rusqlite::params![room_id, state_json],
                    )?;
                    conn.last_insert_rowid()
                }
            };

            query_snapshot_by_id(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("snapshot {} vanished after upsert", id))
        })
    }

    /// Newest snapshot for a room, or None when the room has no
    /// history yet. Callers map None to the sentinel empty state.
    pub fn latest_snapshot(&self, room_id: &str) -> Result<Option<SnapshotRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, room_id, state_json, created_at
                 FROM canvas_snapshots WHERE room_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT 1",
            )?;
            let row = stmt.query_row([room_id], map_snapshot_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_snapshot(&self, id: i64) -> Result<Option<SnapshotRow>> {
        self.with_conn(|conn| query_snapshot_by_id(conn, id))
    }

    /// All snapshots for a room, newest first.
    pub fn list_snapshots(&self, room_id: &str) -> Result<Vec<SnapshotRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, room_id, state_json, created_at
                 FROM canvas_snapshots WHERE room_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([room_id], map_snapshot_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(
    conn: &Connection,
    predicate: &str,
    param: &dyn rusqlite::types::ToSql,
) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, email, password, full_name, is_active, created_at FROM users WHERE {}",
        predicate
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_row([param], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                full_name: row.get(3)?,
                is_active: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn query_room(conn: &Connection, id: &str, active_only: bool) -> Result<Option<RoomRow>> {
    let sql = if active_only {
        "SELECT id, name, description, owner_id, is_active, max_users, created_at
         FROM rooms WHERE id = ?1 AND is_active = 1"
    } else {
        "SELECT id, name, description, owner_id, is_active, max_users, created_at
         FROM rooms WHERE id = ?1"
    };
    let mut stmt = conn.prepare(sql)?;
    let row = stmt
        .query_row([id], |row| {
            Ok(RoomRow {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                owner_id: row.get(3)?,
                is_active: row.get(4)?,
                max_users: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn query_snapshot_by_id(conn: &Connection, id: i64) -> Result<Option<SnapshotRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, room_id, state_json, created_at FROM canvas_snapshots WHERE id = ?1",
    )?;
    let row = stmt.query_row([id], map_snapshot_row).optional()?;
    Ok(row)
}

fn map_snapshot_row(row: &rusqlite::Row<'_>) -> std::result::Result<SnapshotRow, rusqlite::Error> {
    Ok(SnapshotRow {
        id: row.get(0)?,
        room_id: row.get(1)?,
        state_json: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_member_row(
    row: &rusqlite::Row<'_>,
) -> std::result::Result<RoomMemberRow, rusqlite::Error> {
    Ok(RoomMemberRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        room_id: row.get(2)?,
        role: row.get(3)?,
        is_active: row.get(4)?,
        joined_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
