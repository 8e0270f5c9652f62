mod dispatcher;
mod mailer;
pub mod templates;

pub use dispatcher::{Notifier, RetryPolicy};
pub use mailer::{LogMailer, MailError, Mailer, RecordingMailer, SmtpMailer, mailer_from_config};
pub use templates::OutgoingEmail;
