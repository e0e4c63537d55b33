use redb::TableDefinition;

/// Users: user_id -> User (bincode), session list embedded in the document
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Secondary index: email -> user_id (emails are unique, matched exactly)
pub const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");

/// Lists: list_id -> List (bincode)
pub const LISTS: TableDefinition<&str, &[u8]> = TableDefinition::new("lists");

/// Secondary index: user_id -> Vec<list_id> (for listing by owner)
pub const USER_LISTS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_lists");

/// Tasks: task_id -> Task (bincode)
pub const TASKS: TableDefinition<&str, &[u8]> = TableDefinition::new("tasks");

/// Secondary index: list_id -> Vec<task_id>
pub const LIST_TASKS: TableDefinition<&str, &[u8]> = TableDefinition::new("list_tasks");
