//! Customer session and address book.
//!
//! The signed-in customer and their bearer token are persisted together
//! through [`Persistence`]. Form input is validated before any request is
//! made.

use std::sync::{Arc, PoisonError, RwLock};

use mystery_box_core::{AddressId, AddressInput, Customer, CustomerInput, Email, FieldError};
use secrecy::SecretString;
use thiserror::Error;
use tracing::instrument;

use crate::api::{ApiError, CommerceBackend, NewCustomer};
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::persistence::{Persistence, PersistenceError, StoredSession};

/// Errors raised by account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Input rejected before reaching the backend.
    #[error("Invalid input: {}", join_messages(.0))]
    Validation(Vec<FieldError>),

    #[error("Not signed in")]
    NotSignedIn,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The signed-in customer, if any.
#[derive(Clone)]
pub struct AccountStore {
    inner: Arc<AccountInner>,
}

struct AccountInner {
    backend: Arc<dyn CommerceBackend>,
    persistence: Persistence,
    session: RwLock<Option<StoredSession>>,
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStore")
            .field("signed_in", &self.is_signed_in())
            .finish_non_exhaustive()
    }
}

impl AccountStore {
    /// Restore any persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(
        backend: Arc<dyn CommerceBackend>,
        persistence: Persistence,
    ) -> Result<Self, PersistenceError> {
        let session = persistence.session()?;
        if let Some(session) = &session {
            set_sentry_user(&session.customer.id, Some(session.customer.email.as_str()));
        }
        Ok(Self {
            inner: Arc::new(AccountInner {
                backend,
                persistence,
                session: RwLock::new(session),
            }),
        })
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.read_session().is_some()
    }

    /// The signed-in customer as last fetched.
    #[must_use]
    pub fn current_customer(&self) -> Option<Customer> {
        self.read_session().map(|s| s.customer)
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Sign in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed email or empty password, otherwise
    /// the backend's rejection (typically `Unauthorized`).
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Customer, AccountError> {
        let mut errors = Vec::new();
        let email = Email::parse(email)
            .map_err(|e| errors.push(FieldError::new("email", e.to_string())))
            .ok();
        if password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        let Some(email) = email.filter(|_| errors.is_empty()) else {
            return Err(AccountError::Validation(errors));
        };

        self.sign_in(&email, password).await
    }

    /// Create an account, then sign in with it.
    ///
    /// # Errors
    ///
    /// Returns `Validation` listing every invalid field, otherwise the
    /// backend's rejection (for example an email already in use).
    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn register(&self, input: &CustomerInput) -> Result<Customer, AccountError> {
        let email = input.validate().map_err(AccountError::Validation)?;

        let payload = NewCustomer {
            email: email.to_string(),
            password: input.password.clone(),
            first_name: input.first_name.trim().to_owned(),
            last_name: input.last_name.trim().to_owned(),
            phone: input.phone.clone().filter(|p| !p.trim().is_empty()),
        };
        self.inner.backend.create_customer(&payload).await?;
        tracing::info!("Registered customer");

        self.sign_in(&email, &input.password).await
    }

    /// End the session locally, and on the backend when reachable.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local session cannot be cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AccountError> {
        let Some(session) = self.read_session() else {
            return Ok(());
        };

        if let Err(e) = self.inner.backend.delete_session(&session.token).await {
            tracing::warn!(error = %e, "Backend sign-out failed, clearing local session anyway");
        }
        self.forget_session()?;
        add_breadcrumb("account", "Signed out", None);
        Ok(())
    }

    /// Re-fetch the signed-in customer. An expired token ends the session.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without a session, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn refresh_customer(&self) -> Result<Customer, AccountError> {
        let token = self.token()?;
        match self.inner.backend.get_customer(&token).await {
            Ok(customer) => self.store_customer(customer),
            Err(e @ ApiError::Unauthorized(_)) => {
                tracing::info!("Session expired");
                self.forget_session()?;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// # Errors
    ///
    /// Returns `Validation` listing every missing field, `NotSignedIn`
    /// without a session, otherwise the backend error.
    #[instrument(skip_all)]
    pub async fn add_address(&self, input: &AddressInput) -> Result<Customer, AccountError> {
        input.validate().map_err(AccountError::Validation)?;
        let token = self.token()?;
        let customer = self.inner.backend.add_address(&token, input).await?;
        self.store_customer(customer)
    }

    /// # Errors
    ///
    /// Returns `Validation` listing every missing field, `NotSignedIn`
    /// without a session, otherwise the backend error.
    #[instrument(skip(self, input))]
    pub async fn update_address(
        &self,
        id: &AddressId,
        input: &AddressInput,
    ) -> Result<Customer, AccountError> {
        input.validate().map_err(AccountError::Validation)?;
        let token = self.token()?;
        let customer = self.inner.backend.update_address(&token, id, input).await?;
        self.store_customer(customer)
    }

    /// # Errors
    ///
    /// Returns `NotSignedIn` without a session, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn delete_address(&self, id: &AddressId) -> Result<Customer, AccountError> {
        let token = self.token()?;
        let customer = self.inner.backend.delete_address(&token, id).await?;
        self.store_customer(customer)
    }

    /// Mark an address as the default, clearing any previous default.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without a session, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn set_default_address(&self, id: &AddressId) -> Result<Customer, AccountError> {
        let token = self.token()?;
        let customer = self.inner.backend.set_default_address(&token, id).await?;
        self.store_customer(customer)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn sign_in(&self, email: &Email, password: &str) -> Result<Customer, AccountError> {
        let token = self
            .inner
            .backend
            .create_session(email.as_str(), password)
            .await?;
        let customer = self.inner.backend.get_customer(&token).await?;

        let session = StoredSession { customer, token };
        self.inner.persistence.set_session(&session)?;
        set_sentry_user(&session.customer.id, Some(session.customer.email.as_str()));
        add_breadcrumb("account", "Signed in", None);
        tracing::info!(customer_id = %session.customer.id, "Signed in");

        let customer = session.customer.clone();
        *self.write_session() = Some(session);
        Ok(customer)
    }

    fn token(&self) -> Result<SecretString, AccountError> {
        self.read_session()
            .map(|s| s.token)
            .ok_or(AccountError::NotSignedIn)
    }

    fn store_customer(&self, customer: Customer) -> Result<Customer, AccountError> {
        self.inner.persistence.set_customer(&customer)?;
        if let Some(session) = self.write_session().as_mut() {
            session.customer = customer.clone();
        }
        Ok(customer)
    }

    fn forget_session(&self) -> Result<(), AccountError> {
        self.inner.persistence.clear_session()?;
        *self.write_session() = None;
        clear_sentry_user();
        Ok(())
    }

    fn read_session(&self) -> Option<StoredSession> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write_session(&self) -> std::sync::RwLockWriteGuard<'_, Option<StoredSession>> {
        self.inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
