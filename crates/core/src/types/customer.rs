//! Customer accounts and addresses.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{AddressId, CustomerId};

/// Metadata key the backend uses to flag a customer's default address.
pub const DEFAULT_ADDRESS_KEY: &str = "is_default";

/// A validation problem with one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Form field name (`"first_name"`, `"email"`, ...).
    pub field: &'static str,
    /// Message suitable for inline display.
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// A "`label` is required" error.
    #[must_use]
    pub fn required(field: &'static str, label: &str) -> Self {
        Self::new(field, format!("{label} is required"))
    }
}

/// A saved customer address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address_1: Option<String>,
    #[serde(default)]
    pub address_2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Address {
    /// Whether this address carries the default flag in its metadata.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(DEFAULT_ADDRESS_KEY))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// One-line rendering for lists.
    #[must_use]
    pub fn summary(&self) -> String {
        [
            self.address_1.as_deref(),
            self.city.as_deref(),
            self.postal_code.as_deref(),
            self.country_code.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// A storefront customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub has_account: bool,
    #[serde(default)]
    pub shipping_addresses: Vec<Address>,
    #[serde(default)]
    pub billing_address_id: Option<AddressId>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Customer {
    /// The address flagged as default, if any.
    #[must_use]
    pub fn default_address(&self) -> Option<&Address> {
        self.shipping_addresses.iter().find(|a| a.is_default())
    }

    /// Display name, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.to_owned(),
            (None, None) => self.email.to_string(),
        }
    }
}

/// Address form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub address_1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub postal_code: String,
    pub country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl AddressInput {
    /// Check every required field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns the list of field errors if any required field is blank or the
    /// country code is not a two-letter code.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let required = [
            ("first_name", "First name", &self.first_name),
            ("last_name", "Last name", &self.last_name),
            ("address_1", "Address", &self.address_1),
            ("city", "City", &self.city),
            ("postal_code", "Postal code", &self.postal_code),
            ("country_code", "Country", &self.country_code),
        ];

        let mut errors: Vec<FieldError> = required
            .into_iter()
            .filter(|(_, _, value)| value.trim().is_empty())
            .map(|(field, label, _)| FieldError::required(field, label))
            .collect();

        let country = self.country_code.trim();
        if !country.is_empty()
            && (country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()))
        {
            errors.push(FieldError::new(
                "country_code",
                "Country must be a two-letter code",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Registration form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl CustomerInput {
    /// Minimum accepted password length.
    pub const MIN_PASSWORD_LENGTH: usize = 8;

    /// Validate the form, returning the parsed email on success.
    ///
    /// # Errors
    ///
    /// Returns every field error found.
    pub fn validate(&self) -> Result<Email, Vec<FieldError>> {
        let mut errors = Vec::new();

        let email = Email::parse(&self.email)
            .map_err(|e| errors.push(FieldError::new("email", e.to_string())))
            .ok();

        if self.password.chars().count() < Self::MIN_PASSWORD_LENGTH {
            errors.push(FieldError::new(
                "password",
                format!(
                    "Password must be at least {} characters",
                    Self::MIN_PASSWORD_LENGTH
                ),
            ));
        }
        if self.first_name.trim().is_empty() {
            errors.push(FieldError::required("first_name", "First name"));
        }
        if self.last_name.trim().is_empty() {
            errors.push(FieldError::required("last_name", "Last name"));
        }

        match email {
            Some(email) if errors.is_empty() => Ok(email),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address_input() -> AddressInput {
        AddressInput {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            address_1: "1 Main St".into(),
            city: "Springfield".into(),
            postal_code: "12345".into(),
            country_code: "us".into(),
            ..AddressInput::default()
        }
    }

    #[test]
    fn test_address_input_valid() {
        assert!(address_input().validate().is_ok());
    }

    #[test]
    fn test_address_input_reports_every_missing_field() {
        let input = AddressInput {
            city: "  ".into(),
            postal_code: String::new(),
            ..address_input()
        };
        let errors = input.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["city", "postal_code"]);
        assert_eq!(errors[0].message, "City is required");
    }

    #[test]
    fn test_address_input_country_code() {
        let input = AddressInput {
            country_code: "USA".into(),
            ..address_input()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors[0].field, "country_code");
    }

    #[test]
    fn test_customer_input_validation() {
        let input = CustomerInput {
            email: "not-an-email".into(),
            password: "short".into(),
            first_name: "Jane".into(),
            last_name: String::new(),
            phone: None,
        };
        let fields: Vec<_> = input
            .validate()
            .unwrap_err()
            .iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["email", "password", "last_name"]);
    }

    #[test]
    fn test_default_address_from_metadata() {
        let customer: Customer = serde_json::from_value(serde_json::json!({
            "id": "cus_1",
            "email": "jane@example.com",
            "first_name": "Jane",
            "shipping_addresses": [
                { "id": "addr_1", "city": "Austin" },
                { "id": "addr_2", "city": "Boston", "metadata": { "is_default": true } }
            ]
        }))
        .unwrap();

        assert_eq!(customer.default_address().unwrap().id.as_str(), "addr_2");
        assert_eq!(customer.display_name(), "Jane");
    }

    #[test]
    fn test_address_summary_skips_blanks() {
        let address: Address = serde_json::from_value(serde_json::json!({
            "id": "addr_1",
            "address_1": "1 Main St",
            "city": "",
            "postal_code": "12345",
            "country_code": "us"
        }))
        .unwrap();
        assert_eq!(address.summary(), "1 Main St, 12345, us");
    }
}
