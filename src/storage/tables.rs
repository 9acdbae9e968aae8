use redb::TableDefinition;

/// File records: uuid -> FileRecord (msgpack)
pub const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Listing index: "{user_id}/{parent_id or 0}" -> msgpack Vec of file UUIDs in insertion order
pub const FOLDER_FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("folder_files");

/// User records: uuid -> UserRecord (msgpack)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Email index: email -> user uuid
pub const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");

/// Sessions: token -> SessionRecord (msgpack)
pub const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Job queue: sequence -> JobEntry (msgpack), FIFO by key
pub const JOBS: TableDefinition<u64, &[u8]> = TableDefinition::new("jobs");
