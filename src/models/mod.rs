//! Data models for the Local Library catalog

pub mod author;
pub mod book;
pub mod enums;
pub mod identity;
pub mod instance;
pub mod page;
pub mod reference;

// Re-export commonly used types
pub use author::{Author, AuthorDetail, AuthorForm};
pub use book::{Book, BookDetail, BookForm};
pub use enums::LoanStatus;
pub use identity::{Identity, Permission};
pub use instance::{BookInstance, InstanceFilter, InstanceOrder, RenewBookForm, RenewalPage};
pub use page::{Page, PageQuery, PageRequest};
pub use reference::{Genre, Language};
