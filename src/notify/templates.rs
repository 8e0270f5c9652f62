#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

pub const RESET_SUBJECT: &str = "Reset your password";
pub const INVITATION_SUBJECT: &str = "Invitation to join Loyalty App";

pub fn reset_link(public_url: &str, token: &str) -> String {
    format!(
        "{}/reset-password?token={}",
        public_url.trim_end_matches('/'),
        token
    )
}

pub fn reset_password_email(to: &str, reset_url: &str) -> OutgoingEmail {
    let url = escape_html(reset_url);
    let html = format!(
        "<h1>Reset your password</h1>\
         <p>A password reset was requested for your account.</p>\
         <p>Follow the link below to choose a new password:</p>\
         <p><a href=\"{url}\">{url}</a></p>\
         <p>This link expires in 1 hour.</p>\
         <p>If you did not ask for this, you can ignore this email.</p>"
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: RESET_SUBJECT.to_string(),
        html,
    }
}

pub fn share_invitation_email(to: &str, temp_password: &str, app_url: &str) -> OutgoingEmail {
    let email = escape_html(to);
    let password = escape_html(temp_password);
    let login_url = escape_html(&format!("{}/login", app_url.trim_end_matches('/')));
    let html = format!(
        "<h1>Welcome to Loyalty App!</h1>\
         <p>Someone shared loyalty cards with you.</p>\
         <p>Sign in at <a href=\"{login_url}\">{login_url}</a> with:</p>\
         <p>Email: {email}</p>\
         <p>Temporary password: {password}</p>\
         <p>Please change your password after your first sign-in.</p>"
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: INVITATION_SUBJECT.to_string(),
        html,
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
