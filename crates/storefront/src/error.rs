//! Unified error handling with Sentry integration.
//!
//! Each module owns its error enum; [`AppError`] wraps them for callers that
//! need a single type, classifies them into an [`ErrorKind`] and renders the
//! message a shopper should see.

use mystery_box_core::FieldError;
use thiserror::Error;

use crate::account::AccountError;
use crate::api::ApiError;
use crate::cart::CartError;
use crate::config::ConfigError;
use crate::persistence::PersistenceError;
use crate::wishlist::WishlistError;

/// Shown for connectivity failures.
pub const CONNECTIVITY_MESSAGE: &str =
    "Unable to reach the store. Check your connection and try again.";

/// Shown when no better message is available.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Backend messages at or above this length are not shown to shoppers.
const MAX_DISPLAY_MESSAGE_LEN: usize = 200;

/// How an error should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The backend could not be reached or failed on its side.
    Connectivity,
    /// Input rejected before any network call.
    Validation,
    /// The backend refused the request for a domain reason.
    Business,
    /// A local fault (storage, configuration, unexpected response).
    Internal,
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Wishlist error: {0}")]
    Wishlist(#[from] WishlistError),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    /// Bad command-line or form input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        if let Some(api) = self.api_error() {
            return api_kind(api);
        }
        match self {
            Self::Cart(CartError::InvalidQuantity(_))
            | Self::Account(AccountError::Validation(_))
            | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::Cart(CartError::NoCart)
            | Self::Account(AccountError::NotSignedIn)
            | Self::Wishlist(
                WishlistError::NotInWishlist(_) | WishlistError::Cart(CartError::NoCart),
            ) => ErrorKind::Business,
            Self::Wishlist(WishlistError::Cart(CartError::InvalidQuantity(_))) => {
                ErrorKind::Validation
            }
            _ => ErrorKind::Internal,
        }
    }

    /// The message to show a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Connectivity => CONNECTIVITY_MESSAGE.to_owned(),
            ErrorKind::Validation => match self.field_errors() {
                Some(errors) => errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
                None => self.innermost_message(),
            },
            ErrorKind::Business => match self.api_error() {
                Some(api) => api
                    .server_message()
                    .filter(|m| is_displayable(m))
                    .map_or_else(|| GENERIC_MESSAGE.to_owned(), str::to_owned),
                None => self.innermost_message(),
            },
            ErrorKind::Internal => GENERIC_MESSAGE.to_owned(),
        }
    }

    /// Log the error, capturing connectivity and internal faults to Sentry.
    ///
    /// Capturing is a no-op when Sentry has not been initialised.
    pub fn report(&self) {
        let kind = self.kind();
        match kind {
            ErrorKind::Connectivity | ErrorKind::Internal => {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    error = %self,
                    kind = ?kind,
                    sentry_event_id = %event_id,
                    "Storefront error"
                );
            }
            ErrorKind::Validation | ErrorKind::Business => {
                tracing::info!(error = %self, kind = ?kind, "Request rejected");
            }
        }
    }

    fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e)
            | Self::Cart(CartError::Api(e))
            | Self::Account(AccountError::Api(e))
            | Self::Wishlist(WishlistError::Cart(CartError::Api(e))) => Some(e),
            _ => None,
        }
    }

    fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::Account(AccountError::Validation(errors)) => Some(errors),
            _ => None,
        }
    }

    /// Display text of the wrapped error without this type's prefix.
    fn innermost_message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Api(e) => e.to_string(),
            Self::Persistence(e) => e.to_string(),
            Self::Cart(e) => e.to_string(),
            Self::Wishlist(e) => e.to_string(),
            Self::Account(e) => e.to_string(),
            Self::InvalidInput(m) | Self::Internal(m) => m.clone(),
        }
    }
}

const fn api_kind(error: &ApiError) -> ErrorKind {
    match error {
        ApiError::Connection(_) | ApiError::EmptyResponse(_) => ErrorKind::Connectivity,
        ApiError::Status { status, .. } if *status >= 500 => ErrorKind::Connectivity,
        ApiError::NotFound(_) | ApiError::Unauthorized(_) | ApiError::Status { .. } => {
            ErrorKind::Business
        }
        ApiError::Decode(_) | ApiError::Setup(_) => ErrorKind::Internal,
    }
}

/// Whether a backend message is fit to show as-is.
fn is_displayable(message: &str) -> bool {
    let trimmed = message.trim();
    !trimmed.is_empty() && trimmed.len() < MAX_DISPLAY_MESSAGE_LEN && !trimmed.starts_with('<')
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in customer.
pub fn set_sentry_user(customer_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a shopper action.
///
/// Breadcrumbs appear in Sentry reports to show the trail of actions leading
/// up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("variant_id", "variant_123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data.unwrap_or_default() {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
