use chrono::{DateTime, Utc};
use redb::{Database as RedbDatabase, ReadTransaction, ReadableTable, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::models::{List, Session, Task, User};
use super::tables::*;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Redb(#[from] redb::Error),
    #[error("Database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
}

/// Outcome of an ownership-scoped lookup.
///
/// `NotOwned` and `NotFound` both map to 404 at the API boundary, but stay
/// distinct internally so diagnostics can tell a cross-user probe from a
/// dangling id.
#[derive(Debug)]
pub enum ResourceLookup<T> {
    Found(T),
    NotFound,
    NotOwned,
}

#[derive(Clone)]
pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("taskboard.redb");
        let db = RedbDatabase::create(db_path)?;

        // Create tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(LISTS)?;
            let _ = write_txn.open_table(USER_LISTS)?;
            let _ = write_txn.open_table(TASKS)?;
            let _ = write_txn.open_table(LIST_TASKS)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    // ========================================================================
    // User operations
    // ========================================================================

    /// Insert a brand-new user, claiming its email address.
    ///
    /// The uniqueness check and both inserts happen inside one write
    /// transaction; redb serializes writers, so two concurrent signups for
    /// the same email cannot both succeed.
    ///
    /// Returns false (and writes nothing) if the email is already taken.
    pub fn create_user(&self, user: &User) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let created = {
            let mut index_table = write_txn.open_table(USER_EMAILS)?;
            let taken = index_table.get(user.email.as_str())?.is_some();

            if taken {
                false
            } else {
                index_table.insert(user.email.as_str(), user.id.as_str())?;
                let mut table = write_txn.open_table(USERS)?;
                let data = bincode::serialize(user)?;
                table.insert(user.id.as_str(), data.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(created)
    }

    /// Upsert a full user document (including its session list) and keep the
    /// email index current. For new accounts use [`Database::create_user`],
    /// which refuses to reuse a claimed email.
    pub fn put_user(&self, user: &User) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            let data = bincode::serialize(user)?;
            table.insert(user.id.as_str(), data.as_slice())?;

            let mut index_table = write_txn.open_table(USER_EMAILS)?;
            index_table.insert(user.email.as_str(), user.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a user by id
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(user_id)? {
            Some(data) => {
                let user: User = bincode::deserialize(data.value())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Get a user by email (exact match)
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index_table = read_txn.open_table(USER_EMAILS)?;

        let user_id: String = match index_table.get(email)? {
            Some(id) => id.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(USERS)?;
        match table.get(user_id.as_str())? {
            Some(data) => {
                let user: User = bincode::deserialize(data.value())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Append a session to a user's session list.
    ///
    /// The read-modify-write happens inside a single write transaction; redb
    /// serializes writers, so two concurrent appends for the same user both
    /// land in the list (no lost updates).
    ///
    /// Returns false if the user does not exist.
    pub fn append_session(
        &self,
        user_id: &str,
        session: &Session,
    ) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let appended = {
            let mut table = write_txn.open_table(USERS)?;
            let user: Option<User> = match table.get(user_id)? {
                Some(data) => Some(bincode::deserialize(data.value())?),
                None => None,
            };

            match user {
                Some(mut user) => {
                    user.sessions.push(session.clone());
                    let data = bincode::serialize(&user)?;
                    table.insert(user_id, data.as_slice())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(appended)
    }

    /// Remove a session from a user's session list.
    ///
    /// Returns true if a session with the given token was removed.
    pub fn remove_session(&self, user_id: &str, token: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(USERS)?;
            let user: Option<User> = match table.get(user_id)? {
                Some(data) => Some(bincode::deserialize(data.value())?),
                None => None,
            };

            match user {
                Some(mut user) => {
                    let before = user.sessions.len();
                    user.sessions.retain(|s| s.token != token);
                    let removed = user.sessions.len() != before;
                    if removed {
                        let data = bincode::serialize(&user)?;
                        table.insert(user_id, data.as_slice())?;
                    }
                    removed
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Drop sessions whose expiry is at or before `now` from every user
    /// document. Returns the number of sessions removed.
    pub fn prune_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let mut pruned = 0u64;
        {
            let table = write_txn.open_table(USERS)?;
            let mut stale: Vec<User> = Vec::new();
            for result in table.iter()? {
                let (_, value) = result?;
                let user: User = bincode::deserialize(value.value())?;
                if user.sessions.iter().any(|s| s.expires_at <= now) {
                    stale.push(user);
                }
            }
            drop(table);

            let mut table = write_txn.open_table(USERS)?;
            for mut user in stale {
                let before = user.sessions.len();
                user.sessions.retain(|s| s.expires_at > now);
                pruned += (before - user.sessions.len()) as u64;
                let data = bincode::serialize(&user)?;
                table.insert(user.id.as_str(), data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(pruned)
    }

    // ========================================================================
    // List operations
    // ========================================================================

    /// Upsert a list and keep the owner index current
    pub fn put_list(&self, list: &List) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(LISTS)?;
            let data = bincode::serialize(list)?;
            table.insert(list.id.as_str(), data.as_slice())?;

            let mut index_table = write_txn.open_table(USER_LISTS)?;
            let mut list_ids: Vec<String> = index_table
                .get(list.user_id.as_str())?
                .map(|v| bincode::deserialize(v.value()).unwrap_or_default())
                .unwrap_or_default();

            if !list_ids.contains(&list.id) {
                list_ids.push(list.id.clone());
                let index_data = bincode::serialize(&list_ids)?;
                index_table.insert(list.user_id.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a list, checking that it belongs to `user_id`
    pub fn find_list_for_user(
        &self,
        list_id: &str,
        user_id: &str,
    ) -> Result<ResourceLookup<List>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(LISTS)?;

        match table.get(list_id)? {
            Some(data) => {
                let list: List = bincode::deserialize(data.value())?;
                if list.user_id == user_id {
                    Ok(ResourceLookup::Found(list))
                } else {
                    Ok(ResourceLookup::NotOwned)
                }
            }
            None => Ok(ResourceLookup::NotFound),
        }
    }

    /// Get all lists owned by a user
    pub fn get_lists_by_user(&self, user_id: &str) -> Result<Vec<List>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index_table = read_txn.open_table(USER_LISTS)?;
        let lists_table = read_txn.open_table(LISTS)?;

        let list_ids: Vec<String> = match index_table.get(user_id)? {
            Some(data) => bincode::deserialize(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut lists = Vec::new();
        for list_id in list_ids {
            if let Some(data) = lists_table.get(list_id.as_str())? {
                let list: List = bincode::deserialize(data.value())?;
                lists.push(list);
            }
        }

        Ok(lists)
    }

    /// Delete a list together with every task in it, all inside one write
    /// transaction: either the list, its index entries, and its tasks are
    /// all gone, or nothing is.
    ///
    /// Returns the removed list and the number of tasks deleted with it.
    pub fn delete_list_with_tasks(
        &self,
        list_id: &str,
    ) -> Result<Option<(List, u64)>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let list: Option<List> = {
            let table = write_txn.open_table(LISTS)?;
            let found = match table.get(list_id)? {
                Some(data) => Some(bincode::deserialize(data.value())?),
                None => None,
            };
            found
        };

        let mut deleted_tasks = 0u64;
        if let Some(ref list) = list {
            {
                let mut table = write_txn.open_table(LISTS)?;
                table.remove(list_id)?;
            }

            let list_ids: Option<Vec<String>> = {
                let index_table = write_txn.open_table(USER_LISTS)?;
                let found = match index_table.get(list.user_id.as_str())? {
                    Some(data) => Some(bincode::deserialize(data.value())?),
                    None => None,
                };
                found
            };

            if let Some(mut ids) = list_ids {
                ids.retain(|id| id != list_id);
                let mut index_table = write_txn.open_table(USER_LISTS)?;
                if ids.is_empty() {
                    index_table.remove(list.user_id.as_str())?;
                } else {
                    let new_index_data = bincode::serialize(&ids)?;
                    index_table.insert(list.user_id.as_str(), new_index_data.as_slice())?;
                }
            }

            let task_ids: Vec<String> = {
                let index_table = write_txn.open_table(LIST_TASKS)?;
                let found = match index_table.get(list_id)? {
                    Some(data) => bincode::deserialize(data.value())?,
                    None => Vec::new(),
                };
                found
            };

            let mut tasks_table = write_txn.open_table(TASKS)?;
            for task_id in &task_ids {
                if tasks_table.remove(task_id.as_str())?.is_some() {
                    deleted_tasks += 1;
                }
            }

            let mut index_table = write_txn.open_table(LIST_TASKS)?;
            index_table.remove(list_id)?;
        }

        write_txn.commit()?;
        Ok(list.map(|l| (l, deleted_tasks)))
    }

    // ========================================================================
    // Task operations
    // ========================================================================

    /// Upsert a task and keep the list index current
    pub fn put_task(&self, task: &Task) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(TASKS)?;
            let data = bincode::serialize(task)?;
            table.insert(task.id.as_str(), data.as_slice())?;

            let mut index_table = write_txn.open_table(LIST_TASKS)?;
            let mut task_ids: Vec<String> = index_table
                .get(task.list_id.as_str())?
                .map(|v| bincode::deserialize(v.value()).unwrap_or_default())
                .unwrap_or_default();

            if !task_ids.contains(&task.id) {
                task_ids.push(task.id.clone());
                let index_data = bincode::serialize(&task_ids)?;
                index_table.insert(task.list_id.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a task by id
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(TASKS)?;

        match table.get(task_id)? {
            Some(data) => {
                let task: Task = bincode::deserialize(data.value())?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// Get all tasks in a list
    pub fn get_tasks_by_list(&self, list_id: &str) -> Result<Vec<Task>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index_table = read_txn.open_table(LIST_TASKS)?;
        let tasks_table = read_txn.open_table(TASKS)?;

        let task_ids: Vec<String> = match index_table.get(list_id)? {
            Some(data) => bincode::deserialize(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut tasks = Vec::new();
        for task_id in task_ids {
            if let Some(data) = tasks_table.get(task_id.as_str())? {
                let task: Task = bincode::deserialize(data.value())?;
                tasks.push(task);
            }
        }

        Ok(tasks)
    }

    /// Delete a task, returning the removed document
    pub fn delete_task(&self, task_id: &str) -> Result<Option<Task>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let task: Option<Task> = {
            let table = write_txn.open_table(TASKS)?;
            let found = match table.get(task_id)? {
                Some(data) => Some(bincode::deserialize(data.value())?),
                None => None,
            };
            found
        };

        if let Some(ref task) = task {
            {
                let mut table = write_txn.open_table(TASKS)?;
                table.remove(task_id)?;
            }

            let task_ids: Option<Vec<String>> = {
                let index_table = write_txn.open_table(LIST_TASKS)?;
                let found = match index_table.get(task.list_id.as_str())? {
                    Some(data) => Some(bincode::deserialize(data.value())?),
                    None => None,
                };
                found
            };

            if let Some(mut ids) = task_ids {
                ids.retain(|id| id != task_id);
                let mut index_table = write_txn.open_table(LIST_TASKS)?;
                if ids.is_empty() {
                    index_table.remove(task.list_id.as_str())?;
                } else {
                    let new_index_data = bincode::serialize(&ids)?;
                    index_table.insert(task.list_id.as_str(), new_index_data.as_slice())?;
                }
            }
        }

        write_txn.commit()?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_session, make_user, setup_db};

    #[test]
    fn test_put_and_get_user() {
        let (db, _temp) = setup_db();

        let user = make_user("u1", "a@x.com");
        db.put_user(&user).unwrap();

        let fetched = db.get_user("u1").unwrap().unwrap();
        assert_eq!(fetched.email, "a@x.com");

        let by_email = db.get_user_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(by_email.id, "u1");

        assert!(db.get_user_by_email("A@X.COM").unwrap().is_none());
    }

    #[test]
    fn test_create_user_refuses_claimed_email() {
        let (db, _temp) = setup_db();

        assert!(db.create_user(&make_user("u1", "a@x.com")).unwrap());
        assert!(!db.create_user(&make_user("u2", "a@x.com")).unwrap());

        // The email still resolves to the first account, and the loser
        // left no user document behind
        let by_email = db.get_user_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(by_email.id, "u1");
        assert!(db.get_user("u2").unwrap().is_none());

        assert!(db.create_user(&make_user("u2", "b@x.com")).unwrap());
    }

    #[test]
    fn test_append_session_to_missing_user() {
        let (db, _temp) = setup_db();

        let session = make_session("tok-1");
        assert!(!db.append_session("nobody", &session).unwrap());
    }

    #[test]
    fn test_append_and_remove_session() {
        let (db, _temp) = setup_db();

        db.put_user(&make_user("u1", "a@x.com")).unwrap();
        db.append_session("u1", &make_session("tok-1")).unwrap();
        db.append_session("u1", &make_session("tok-2")).unwrap();

        let user = db.get_user("u1").unwrap().unwrap();
        assert_eq!(user.sessions.len(), 2);
        assert_eq!(user.sessions[0].token, "tok-1");

        assert!(db.remove_session("u1", "tok-1").unwrap());
        assert!(!db.remove_session("u1", "tok-1").unwrap());

        let user = db.get_user("u1").unwrap().unwrap();
        assert_eq!(user.sessions.len(), 1);
        assert_eq!(user.sessions[0].token, "tok-2");
    }

    #[test]
    fn test_concurrent_session_appends_are_not_lost() {
        let (db, _temp) = setup_db();
        db.put_user(&make_user("u1", "a@x.com")).unwrap();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let db = db.clone();
                scope.spawn(move || {
                    db.append_session("u1", &make_session(&format!("tok-{i}")))
                        .unwrap();
                });
            }
        });

        let user = db.get_user("u1").unwrap().unwrap();
        assert_eq!(user.sessions.len(), 8);
    }

    #[test]
    fn test_prune_expired_sessions() {
        let (db, _temp) = setup_db();
        db.put_user(&make_user("u1", "a@x.com")).unwrap();

        let mut stale = make_session("tok-old");
        stale.expires_at = chrono::Utc::now() - chrono::Duration::hours(1);
        db.append_session("u1", &stale).unwrap();
        db.append_session("u1", &make_session("tok-new")).unwrap();

        let pruned = db.prune_expired_sessions(chrono::Utc::now()).unwrap();
        assert_eq!(pruned, 1);

        let user = db.get_user("u1").unwrap().unwrap();
        assert_eq!(user.sessions.len(), 1);
        assert_eq!(user.sessions[0].token, "tok-new");
    }

    #[test]
    fn test_list_ownership_lookup() {
        let (db, _temp) = setup_db();

        let list = List {
            created_at: chrono::Utc::now(),
            id: "l1".to_string(),
            title: "groceries".to_string(),
            user_id: "u1".to_string(),
        };
        db.put_list(&list).unwrap();

        assert!(matches!(
            db.find_list_for_user("l1", "u1").unwrap(),
            ResourceLookup::Found(_)
        ));
        assert!(matches!(
            db.find_list_for_user("l1", "u2").unwrap(),
            ResourceLookup::NotOwned
        ));
        assert!(matches!(
            db.find_list_for_user("missing", "u1").unwrap(),
            ResourceLookup::NotFound
        ));
    }

    #[test]
    fn test_delete_list_cascades_index() {
        let (db, _temp) = setup_db();

        for id in ["l1", "l2"] {
            db.put_list(&List {
                created_at: chrono::Utc::now(),
                id: id.to_string(),
                title: format!("list {id}"),
                user_id: "u1".to_string(),
            })
            .unwrap();
        }

        assert_eq!(db.get_lists_by_user("u1").unwrap().len(), 2);

        let removed = db.delete_list_with_tasks("l1").unwrap();
        assert_eq!(removed.unwrap().0.id, "l1");
        assert_eq!(db.get_lists_by_user("u1").unwrap().len(), 1);

        assert!(db.delete_list_with_tasks("missing").unwrap().is_none());
    }

    #[test]
    fn test_delete_list_removes_its_tasks() {
        let (db, _temp) = setup_db();

        db.put_list(&List {
            created_at: chrono::Utc::now(),
            id: "l1".to_string(),
            title: "groceries".to_string(),
            user_id: "u1".to_string(),
        })
        .unwrap();

        for id in ["t1", "t2", "t3"] {
            db.put_task(&Task {
                completed: false,
                created_at: chrono::Utc::now(),
                id: id.to_string(),
                list_id: "l1".to_string(),
                title: format!("task {id}"),
            })
            .unwrap();
        }

        assert_eq!(db.get_tasks_by_list("l1").unwrap().len(), 3);

        let (removed, task_count) = db.delete_list_with_tasks("l1").unwrap().unwrap();
        assert_eq!(removed.id, "l1");
        assert_eq!(task_count, 3);

        assert_eq!(db.get_tasks_by_list("l1").unwrap().len(), 0);
        assert!(db.get_task("t1").unwrap().is_none());
        assert!(db.get_lists_by_user("u1").unwrap().is_empty());
    }
}
