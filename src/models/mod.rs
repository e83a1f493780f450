pub mod event;
pub mod folder;
pub mod session;
pub mod snippet;
pub mod user;

pub use event::{ChangeEvent, ChangeNotice};
pub use folder::{Folder, FolderRecord};
pub use session::SessionRecord;
pub use snippet::{
    normalize_tags, validate_content, validate_description, validate_title, Language, ShareRef,
    SharedSnippet, Snippet, SnippetRecord,
};
pub use user::{User, UserRecord};
