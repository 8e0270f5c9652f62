use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::{
    user_service::UserService,
    validation::{optional_text, require_email, required_text},
};
use crate::{
    auth::{
        jwt::{JwtKeys, issue_session},
        password::{hash_password, verify_password},
        reset::issue_reset_token,
    },
    db::{
        dao::{NewUser, UserDao, user_dao::EMAIL_TAKEN},
        entities::user,
    },
    error::AppError,
    notify::{Notifier, templates},
};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";
pub const FORGOT_PASSWORD_REPLY: &str =
    "If an account exists for this email, a reset link has been sent.";

/// Public profile; never carries the password hash or reset fields.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<user::Model> for Profile {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
        }
    }
}

pub struct Registration<'a> {
    pub email: Option<&'a str>,
    pub password: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

pub struct ProfileChanges<'a> {
    pub email: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

#[derive(Debug)]
pub struct LoggedIn {
    pub profile: Profile,
    pub token: String,
}

#[derive(Debug)]
pub struct ProfileUpdated {
    pub profile: Profile,
    /// Fresh session token when the email changed.
    pub token: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    users: UserService,
    user_dao: UserDao,
    jwt: JwtKeys,
    notifier: Notifier,
    public_url: String,
}

impl AccountService {
    pub fn new(
        user_dao: UserDao,
        jwt: JwtKeys,
        notifier: Notifier,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            users: UserService::new(user_dao.clone()),
            user_dao,
            jwt,
            notifier,
            public_url: public_url.into(),
        }
    }

    pub async fn register(&self, input: Registration<'_>) -> Result<(), AppError> {
        const MISSING: &str = "Email, password, first name and last name are required";
        let email = required_text(input.email, MISSING)?;
        let password = input
            .password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| AppError::bad_request(MISSING))?;
        let first_name = required_text(input.first_name, MISSING)?;
        let last_name = required_text(input.last_name, MISSING)?;
        let email = require_email(Some(&email))?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict(EMAIL_TAKEN));
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .create_user(NewUser {
                email: &email,
                password_hash: &password_hash,
                first_name: Some(&first_name),
                last_name: Some(&last_name),
            })
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(())
    }

    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<LoggedIn, AppError> {
        let email = required_text(email, "Email and password are required")?;
        let password = password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| AppError::bad_request("Email and password are required"))?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "login rejected");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        let now = Utc::now().fixed_offset();
        self.users.set_last_login(&user.id, &now).await?;

        let token = issue_session(&self.jwt, &user.id, &user.email)?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok(LoggedIn {
            profile: user.into(),
            token,
        })
    }

    pub async fn me(&self, user_id: &Uuid) -> Result<Profile, AppError> {
        self.active_user(user_id).await.map(Profile::from)
    }

    pub async fn update_profile(
        &self,
        user_id: &Uuid,
        changes: ProfileChanges<'_>,
    ) -> Result<ProfileUpdated, AppError> {
        let email = require_email(changes.email)?;
        let current = self.active_user(user_id).await?;

        let email_changed = email != current.email;
        if email_changed && self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict(EMAIL_TAKEN));
        }

        let updated = self
            .user_dao
            .update_profile(
                user_id,
                &email,
                optional_text(changes.first_name),
                optional_text(changes.last_name),
            )
            .await?;

        let token = if email_changed {
            Some(issue_session(&self.jwt, &updated.id, &updated.email)?)
        } else {
            None
        };

        tracing::info!(user_id = %updated.id, email_changed, "profile updated");
        Ok(ProfileUpdated {
            profile: updated.into(),
            token,
        })
    }

    pub async fn delete_account(&self, user_id: &Uuid) -> Result<(), AppError> {
        self.user_dao.delete_account(user_id).await?;
        tracing::info!(user_id = %user_id, "account deleted");
        Ok(())
    }

    /// Answers identically whether or not the account exists.
    pub async fn forgot_password(&self, email: Option<&str>) -> Result<(), AppError> {
        let email = required_text(email, "Email is required")?;

        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let issued = issue_reset_token(Utc::now().fixed_offset());
        self.user_dao
            .store_reset_token(&user.id, &issued.token, &issued.expires_at)
            .await?;

        let link = templates::reset_link(&self.public_url, &issued.token);
        self.notifier
            .enqueue(templates::reset_password_email(&user.email, &link));
        tracing::info!(user_id = %user.id, "password reset issued");
        Ok(())
    }

    pub async fn reset_password(
        &self,
        token: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<(), AppError> {
        let token = required_text(token, "Token and new password are required")?;
        let new_password = new_password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| AppError::bad_request("Token and new password are required"))?;

        let password_hash = hash_password(new_password)?;
        let consumed = self
            .user_dao
            .consume_reset_token(&token, &password_hash, &Utc::now().fixed_offset())
            .await?;

        match consumed {
            Some(user_id) => {
                tracing::info!(user_id = %user_id, "password reset completed");
                Ok(())
            }
            None => Err(AppError::bad_request(INVALID_RESET_TOKEN)),
        }
    }

    async fn active_user(&self, user_id: &Uuid) -> Result<user::Model, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::not_found("User not found"))
    }
}
