use serde::Serialize;
use uuid::Uuid;

use super::{
    card_service::CARD_NOT_FOUND,
    user_service::UserService,
    validation::require_email,
    views::{ShareView, UserIndex},
};
use crate::{
    auth::password::{generate_temporary_password, hash_password},
    db::dao::{CardDao, GrantOutcome, ShareDao, ShareRecipient},
    error::AppError,
    notify::{Notifier, templates},
};

pub const CARDS_NOT_FOUND: &str = "One or more cards not found";
pub const ALREADY_SHARED: &str = "Cards already shared with this user";
pub const SHARE_NOT_FOUND: &str = "Share not found";
pub const SELF_SHARE: &str = "You cannot share cards with yourself";
pub const INVITATION_NOT_SENT: &str =
    "Cards were shared but the invitation email could not be sent";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShareOutcome {
    pub success: bool,
    pub is_new_user: bool,
    pub shared: usize,
    pub already_shared: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RevokeOutcome {
    pub revoked: u64,
}

pub enum RevokeTarget<'a> {
    Share(Uuid),
    Recipient {
        card_ids: &'a [Uuid],
        email: Option<&'a str>,
    },
}

#[derive(Clone)]
pub struct ShareService {
    card_dao: CardDao,
    share_dao: ShareDao,
    users: UserService,
    notifier: Notifier,
    public_url: String,
}

impl ShareService {
    pub fn new(
        card_dao: CardDao,
        share_dao: ShareDao,
        users: UserService,
        notifier: Notifier,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            card_dao,
            share_dao,
            users,
            notifier,
            public_url: public_url.into(),
        }
    }

    /// Shares a batch of owned cards with `email`, creating a provisional
    /// account when nobody holds that address yet.
    pub async fn share_cards(
        &self,
        owner_id: &Uuid,
        email: Option<&str>,
        card_ids: &[Uuid],
    ) -> Result<ShareOutcome, AppError> {
        let email = require_email(email)?;
        let card_ids = dedup_ids(card_ids);
        if card_ids.is_empty() {
            return Err(AppError::bad_request("Select at least one card to share"));
        }

        let owned = self.card_dao.find_owned_by_ids(owner_id, &card_ids).await?;
        if owned.len() != card_ids.len() {
            return Err(AppError::not_found(CARDS_NOT_FOUND));
        }

        let mut provisional = match self.users.find_by_email(&email).await? {
            Some(existing) if existing.id == *owner_id => {
                return Err(AppError::bad_request(SELF_SHARE));
            }
            Some(_) => None,
            None => Some(ProvisionalCredentials::generate()?),
        };

        let (recipient, provisioned, created, existing) = loop {
            let target = ShareRecipient {
                email: &email,
                provisional_hash: provisional.as_ref().map(|creds| creds.password_hash.as_str()),
            };
            match self.share_dao.grant(owner_id, &card_ids, target).await? {
                GrantOutcome::NotOwned => return Err(AppError::not_found(CARDS_NOT_FOUND)),
                GrantOutcome::SelfShare => return Err(AppError::bad_request(SELF_SHARE)),
                // the address was deleted after the lookup above
                GrantOutcome::RecipientMissing if provisional.is_none() => {
                    provisional = Some(ProvisionalCredentials::generate()?);
                }
                GrantOutcome::RecipientMissing => {
                    return Err(AppError::internal("recipient could not be provisioned"));
                }
                GrantOutcome::Granted {
                    recipient,
                    provisioned,
                    created,
                    existing,
                } => break (recipient, provisioned, created, existing),
            }
        };

        let is_new_user = provisioned;
        if created == 0 && !is_new_user {
            return Err(AppError::conflict(ALREADY_SHARED));
        }
        if is_new_user {
            tracing::info!(user_id = %recipient.id, "provisional account created");
        }
        tracing::info!(
            owner_id = %owner_id,
            recipient_id = %recipient.id,
            created,
            existing,
            is_new_user,
            "cards shared"
        );

        let temp_password = provisional
            .filter(|_| is_new_user)
            .map(|creds| creds.password);

        let mut warning = None;
        if let Some(temp_password) = temp_password {
            let invitation =
                templates::share_invitation_email(&recipient.email, &temp_password, &self.public_url);
            if let Err(err) = self.notifier.deliver(&invitation).await {
                tracing::warn!(recipient_id = %recipient.id, error = %err, "invitation email failed");
                warning = Some(INVITATION_NOT_SENT.to_string());
            }
        }

        Ok(ShareOutcome {
            success: true,
            is_new_user,
            shared: created,
            already_shared: existing,
            warning,
        })
    }

    pub async fn list_shares(
        &self,
        owner_id: &Uuid,
        card_id: Option<Uuid>,
    ) -> Result<Vec<ShareView>, AppError> {
        let card_id = card_id.ok_or_else(|| AppError::bad_request("cardId is required"))?;
        self.card_dao
            .find_owned(owner_id, &card_id)
            .await?
            .ok_or_else(|| AppError::not_found(CARD_NOT_FOUND))?;

        let shares = self.share_dao.list_for_cards(&[card_id]).await?;
        let recipients: Vec<Uuid> = shares.iter().map(|share| share.shared_with).collect();
        let index = UserIndex::new(self.users.find_many(&recipients).await?);
        Ok(index.share_views(&shares))
    }

    pub async fn revoke(
        &self,
        owner_id: &Uuid,
        target: RevokeTarget<'_>,
    ) -> Result<RevokeOutcome, AppError> {
        let revoked = match target {
            RevokeTarget::Share(share_id) => self.share_dao.revoke_by_id(owner_id, &share_id).await?,
            RevokeTarget::Recipient { card_ids, email } => {
                let email = require_email(email)?;
                let card_ids = dedup_ids(card_ids);
                if card_ids.is_empty() {
                    return Err(AppError::bad_request("Select at least one card"));
                }
                let recipient = self
                    .users
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| AppError::not_found(SHARE_NOT_FOUND))?;
                self.share_dao
                    .revoke_for_recipient(owner_id, &card_ids, &recipient.id)
                    .await?
            }
        };

        if revoked == 0 {
            return Err(AppError::not_found(SHARE_NOT_FOUND));
        }
        tracing::info!(owner_id = %owner_id, revoked, "shares revoked");
        Ok(RevokeOutcome { revoked })
    }
}

/// Temporary password for an account created on first share, with its hash.
struct ProvisionalCredentials {
    password: String,
    password_hash: String,
}

impl ProvisionalCredentials {
    fn generate() -> Result<Self, AppError> {
        let password = generate_temporary_password();
        let password_hash = hash_password(&password)?;
        Ok(Self {
            password,
            password_hash,
        })
    }
}

fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::{
        ALREADY_SHARED, CARDS_NOT_FOUND, INVITATION_NOT_SENT, RevokeTarget, SHARE_NOT_FOUND,
        dedup_ids,
    };
    use crate::{
        db::entities::{loyalty_card, user},
        error::AppError,
        notify::{RecordingMailer, templates::INVITATION_SUBJECT},
        test_helpers::{card_row, share_row, test_services, user_row},
    };

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup_ids(&[a, b, a, b]), vec![a, b]);
    }

    #[tokio::test]
    async fn share_rejects_cards_the_caller_does_not_own() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<loyalty_card::Model>::new()])
            .into_connection();
        let shares = test_services(db, RecordingMailer::new()).share();

        let err = shares
            .share_cards(&Uuid::new_v4(), Some("bob@example.com"), &[Uuid::new_v4()])
            .await
            .expect_err("not owned");
        assert_eq!(err.message(), CARDS_NOT_FOUND);
    }

    #[tokio::test]
    async fn share_rejects_empty_batch_and_bad_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let shares = test_services(db, RecordingMailer::new()).share();
        let owner = Uuid::new_v4();

        let empty = shares
            .share_cards(&owner, Some("bob@example.com"), &[])
            .await
            .expect_err("no cards");
        let bad_email = shares
            .share_cards(&owner, Some("bob"), &[Uuid::new_v4()])
            .await
            .expect_err("bad email");

        assert!(matches!(empty, AppError::BadRequest(_)));
        assert!(matches!(bad_email, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn share_with_self_is_rejected() {
        let alice = Uuid::new_v4();
        let card = card_row(Uuid::new_v4(), alice, "Lidl");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[card.clone()]])
            .append_query_results([[user_row(alice, "alice@example.com")]])
            .into_connection();
        let shares = test_services(db, RecordingMailer::new()).share();

        let err = shares
            .share_cards(&alice, Some("alice@example.com"), &[card.id])
            .await
            .expect_err("self share");
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn share_with_new_user_provisions_account_and_sends_invitation() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let card = card_row(Uuid::new_v4(), alice, "Carrefour");
        let mailer = RecordingMailer::new();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[card.clone()]])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[card.clone()]])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[user_row(bob, "bob@example.com")]])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let shares = test_services(db, mailer.clone()).share();

        let outcome = shares
            .share_cards(&alice, Some("bob@example.com"), &[card.id, card.id])
            .await
            .expect("share should succeed");

        assert!(outcome.success);
        assert!(outcome.is_new_user);
        assert_eq!(outcome.shared, 1);
        assert_eq!(outcome.already_shared, 0);
        assert!(outcome.warning.is_none());

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "bob@example.com");
        assert_eq!(sent[0].subject, INVITATION_SUBJECT);
        assert!(sent[0].html.contains("Temporary password"));
    }

    #[tokio::test]
    async fn failed_invitation_becomes_a_warning() {
        let alice = Uuid::new_v4();
        let card = card_row(Uuid::new_v4(), alice, "Lidl");
        let mailer = RecordingMailer::failing(10);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[card.clone()]])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[card.clone()]])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[user_row(Uuid::new_v4(), "bob@example.com")]])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let shares = test_services(db, mailer.clone()).share();

        let outcome = shares
            .share_cards(&alice, Some("bob@example.com"), &[card.id])
            .await
            .expect("share still succeeds");

        assert_eq!(outcome.warning.as_deref(), Some(INVITATION_NOT_SENT));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn sharing_only_existing_pairs_is_a_conflict() {
        let alice = Uuid::new_v4();
        let bob = user_row(Uuid::new_v4(), "bob@example.com");
        let card = card_row(Uuid::new_v4(), alice, "Lidl");
        let mailer = RecordingMailer::new();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[card.clone()]])
            .append_query_results([[bob.clone()]])
            .append_query_results([[card.clone()]])
            .append_query_results([[bob]])
            .append_exec_results([exec(0)])
            .into_connection();
        let shares = test_services(db, mailer.clone()).share();

        let err = shares
            .share_cards(&alice, Some("bob@example.com"), &[card.id])
            .await
            .expect_err("already shared");

        assert_eq!(err.message(), ALREADY_SHARED);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn card_deleted_before_grant_leaves_no_provisional_account() {
        let alice = Uuid::new_v4();
        let card = card_row(Uuid::new_v4(), alice, "Lidl");
        let mailer = RecordingMailer::new();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[card.clone()]])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<loyalty_card::Model>::new()])
            .into_connection();
        let shares = test_services(db.clone(), mailer.clone()).share();

        let err = shares
            .share_cards(&alice, Some("bob@example.com"), &[card.id])
            .await
            .expect_err("card vanished");

        assert_eq!(err.message(), CARDS_NOT_FOUND);
        assert!(mailer.sent().is_empty());
        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("INSERT"));
        assert!(log.contains("ROLLBACK"));
    }

    #[tokio::test]
    async fn list_shares_is_owner_only() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<loyalty_card::Model>::new()])
            .into_connection();
        let shares = test_services(db, RecordingMailer::new()).share();

        let missing_id = shares
            .list_shares(&Uuid::new_v4(), None)
            .await
            .expect_err("cardId required");
        let foreign = shares
            .list_shares(&Uuid::new_v4(), Some(Uuid::new_v4()))
            .await
            .expect_err("not owner");

        assert!(matches!(missing_id, AppError::BadRequest(_)));
        assert!(matches!(foreign, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_shares_returns_recipients() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let card = card_row(Uuid::new_v4(), alice, "Lidl");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[card.clone()]])
            .append_query_results([[share_row(card.id, bob, alice)]])
            .append_query_results([[user_row(bob, "bob@example.com")]])
            .into_connection();
        let shares = test_services(db, RecordingMailer::new()).share();

        let listed = shares
            .list_shares(&alice, Some(card.id))
            .await
            .expect("owner can list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].shared_with_user.id, bob);
    }

    #[tokio::test]
    async fn revoke_reports_missing_share() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0)])
            .into_connection();
        let shares = test_services(db, RecordingMailer::new()).share();

        let err = shares
            .revoke(&Uuid::new_v4(), RevokeTarget::Share(Uuid::new_v4()))
            .await
            .expect_err("nothing to revoke");
        assert_eq!(err.message(), SHARE_NOT_FOUND);
    }

    #[tokio::test]
    async fn revoke_by_recipient_email() {
        let bob = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user_row(bob, "bob@example.com")]])
            .append_exec_results([exec(2)])
            .into_connection();
        let shares = test_services(db, RecordingMailer::new()).share();
        let cards = [Uuid::new_v4(), Uuid::new_v4()];

        let outcome = shares
            .revoke(
                &Uuid::new_v4(),
                RevokeTarget::Recipient {
                    card_ids: &cards,
                    email: Some("bob@example.com"),
                },
            )
            .await
            .expect("revoke should succeed");
        assert_eq!(outcome.revoked, 2);
    }
}
