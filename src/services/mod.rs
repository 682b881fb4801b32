pub mod mailer;
pub mod storage;

pub use mailer::{LogMailer, MailError, MailMessage, Mailer, SmtpMailer};
pub use storage::{FileStorage, StorageError, StoredFile};
