//! Account management: registration, email confirmation, login tokens and
//! password reset.

use crate::{
    auth::{
        auth_token, hash_password, password_reset_token, user, verify_password, AuthUser,
        UserRole,
    },
    errors::{AccountError, ServiceError},
    notifications::{self, Notifier},
};
use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const AUTH_TOKEN_LENGTH: usize = 40;
const RESET_TOKEN_LENGTH: usize = 32;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 150))]
    pub last_name: String,
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 40))]
    pub company: String,
    #[serde(default)]
    #[validate(length(max = 40))]
    pub position: String,
    #[serde(default)]
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    #[validate(must_match = "password")]
    pub password_repeat: String,
    /// `shop` or `buyer`; buyers by default
    #[serde(default, rename = "type")]
    pub account_type: Option<UserRole>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[serde(default)]
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PasswordResetConfirm {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub token: String,
    #[serde(default)]
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Public part of a freshly registered account
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredAccount {
    pub id: i32,
    pub email: String,
    pub role: UserRole,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn random_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    notifier: Arc<dyn Notifier>,
    reset_token_ttl: Duration,
}

impl AccountService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        notifier: Arc<dyn Notifier>,
        reset_token_ttl: Duration,
    ) -> Self {
        Self {
            db,
            notifier,
            reset_token_ttl,
        }
    }

    /// Creates an inactive account and emails its confirmation token.
    ///
    /// The account is only committed once the email has been handed to the
    /// notifier, so a delivery failure leaves the address free to register
    /// again.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisteredAccount, AccountError> {
        request.validate()?;
        let email = normalize_email(&request.email);

        let txn = self.db.begin().await?;
        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&txn)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "a user with email {} already exists",
                email
            )));
        }

        let password_hash = hash_password(&request.password)?;
        let token = Uuid::new_v4().simple().to_string();
        let created = user::ActiveModel {
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            first_name: Set(request.first_name.trim().to_string()),
            last_name: Set(request.last_name.trim().to_string()),
            company: Set(request.company.trim().to_string()),
            position: Set(request.position.trim().to_string()),
            role: Set(request.account_type.unwrap_or_default()),
            is_active: Set(false),
            confirmation_token: Set(Some(token.clone())),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_write(e, "user"))?;

        self.notifier
            .send(notifications::registration_confirmation(&email, &token))
            .await?;
        txn.commit().await?;

        info!(user_id = created.id, role = created.role.as_str(), "account registered");
        Ok(RegisteredAccount {
            id: created.id,
            email: created.email,
            role: created.role,
        })
    }

    /// Activates the account when `token` matches the one issued for `email`.
    /// The token is cleared, so a second confirmation fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn confirm(&self, request: ConfirmRequest) -> Result<(), AccountError> {
        let email = normalize_email(&request.email);
        let token = request.token.trim();
        if email.is_empty() || token.is_empty() {
            return Err(ServiceError::ValidationError(
                "email and token are required".to_string(),
            ));
        }

        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", email)))?;

        if account.confirmation_token.as_deref() != Some(token) {
            return Err(ServiceError::ValidationError(
                "invalid confirmation token".to_string(),
            ));
        }

        let user_id = account.id;
        let mut active: user::ActiveModel = account.into();
        active.is_active = Set(true);
        active.confirmation_token = Set(None);
        active.update(&*self.db).await?;

        info!(user_id, "account confirmed");
        Ok(())
    }

    /// Checks credentials and returns the account's bearer token, creating it
    /// on first login.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<String, AccountError> {
        let email = normalize_email(&request.email);
        if email.is_empty() || request.password.is_empty() {
            return Err(ServiceError::ValidationError(
                "email and password are required".to_string(),
            ));
        }

        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await?;
        let account = match account {
            Some(account) if verify_password(&request.password, &account.password_hash) => account,
            _ => {
                warn!("login failed");
                return Err(ServiceError::Unauthorized(
                    "invalid email or password".to_string(),
                ));
            }
        };
        if !account.is_active {
            return Err(ServiceError::Forbidden("account is not active".to_string()));
        }

        let existing = auth_token::Entity::find()
            .filter(auth_token::Column::UserId.eq(account.id))
            .one(&*self.db)
            .await?;
        if let Some(found) = existing {
            return Ok(found.token);
        }

        let issued = auth_token::ActiveModel {
            user_id: Set(account.id),
            token: Set(random_token(AUTH_TOKEN_LENGTH)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_write(e, "auth token"))?;

        info!(user_id = account.id, "auth token issued");
        Ok(issued.token)
    }

    /// Resolves a bearer token to its account.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AccountError> {
        let found = auth_token::Entity::find()
            .filter(auth_token::Column::Token.eq(token))
            .find_also_related(user::Entity)
            .one(&*self.db)
            .await?;

        match found {
            Some((_, Some(account))) if account.is_active => Ok(AuthUser::from(&account)),
            Some((_, Some(_))) => Err(ServiceError::Forbidden("account is not active".to_string())),
            _ => Err(ServiceError::Unauthorized("invalid token".to_string())),
        }
    }

    /// Issues a single-use reset token and emails it.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn request_password_reset(
        &self,
        request: PasswordResetRequest,
    ) -> Result<(), AccountError> {
        request.validate()?;
        let email = normalize_email(&request.email);

        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", email)))?;

        let now = Utc::now();
        let token = random_token(RESET_TOKEN_LENGTH);
        let txn = self.db.begin().await?;
        password_reset_token::ActiveModel {
            user_id: Set(account.id),
            token: Set(token.clone()),
            expires_at: Set(now + self.reset_token_ttl),
            created_at: Set(now),
            used_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_write(e, "reset token"))?;

        self.notifier
            .send(notifications::password_reset(&email, &token))
            .await?;
        txn.commit().await?;

        info!(user_id = account.id, "password reset requested");
        Ok(())
    }

    /// Sets a new password using a reset token. Unknown, expired and already
    /// used tokens are rejected alike.
    #[instrument(skip(self, request))]
    pub async fn confirm_password_reset(
        &self,
        request: PasswordResetConfirm,
    ) -> Result<(), AccountError> {
        request.validate()?;
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let reset = password_reset_token::Entity::find()
            .filter(password_reset_token::Column::Token.eq(request.token.trim()))
            .one(&txn)
            .await?
            .filter(|reset| reset.is_redeemable(now))
            .ok_or_else(|| {
                ServiceError::ValidationError("invalid or expired reset token".to_string())
            })?;

        let account = user::Entity::find_by_id(reset.user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", reset.user_id)))?;

        let user_id = account.id;
        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(hash_password(&request.password)?);
        active.update(&txn).await?;

        let mut used: password_reset_token::ActiveModel = reset.into();
        used.used_at = Set(Some(now));
        used.update(&txn).await?;

        txn.commit().await?;
        info!(user_id, "password reset completed");
        Ok(())
    }
}
