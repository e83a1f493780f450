use redb::TableDefinition;

/// Users table: user_id -> UserRecord (serialized)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Username index: lowercased username -> user_id
pub const USERNAMES: TableDefinition<&str, &str> = TableDefinition::new("usernames");

/// Email index: lowercased email -> user_id
pub const EMAILS: TableDefinition<&str, &str> = TableDefinition::new("emails");

/// Linked OAuth identities: "provider:provider_user_id" -> user_id
pub const OAUTH_IDENTITIES: TableDefinition<&str, &str> = TableDefinition::new("oauth_identities");

/// Sessions table: peppered hash of the session token -> SessionRecord (serialized)
pub const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Snippets table: snippet_id -> SnippetRecord (serialized)
pub const SNIPPETS: TableDefinition<&str, &[u8]> = TableDefinition::new("snippets");

/// User snippets index: user_id -> Vec<snippet_id>
pub const USER_SNIPPETS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_snippets");

/// Folders table: folder_id -> FolderRecord (serialized)
pub const FOLDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("folders");

/// User folders index: user_id -> Vec<folder_id>
pub const USER_FOLDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_folders");

/// Snippet/folder association: snippet_id -> Vec<folder_id>
pub const SNIPPET_FOLDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("snippet_folders");

/// Share tokens: share_token -> snippet_id
pub const SHARES: TableDefinition<&str, &str> = TableDefinition::new("shares");
