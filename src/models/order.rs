use serde::Serialize;
use serde_json::Value;

const MIN_NAME_CHARS: usize = 2;
const MIN_PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields: name, phone, address")]
    MissingFields,

    #[error("Name must be at least 2 characters long")]
    InvalidName,

    #[error("Please enter a valid phone number")]
    InvalidPhone,

    #[error("Please enter a valid email address")]
    InvalidEmail,
}

/// A customer order that has passed validation. Text fields are trimmed and
/// the email, when present, is lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSubmission {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub comment: String,
    pub email: Option<String>,
}

impl OrderSubmission {
    /// Validate an untyped request body.
    ///
    /// Checks run in a fixed order: required fields, name, phone, email.
    pub fn validate(raw: &Value, require_email: bool) -> Result<Self, ValidationError> {
        let name = required_str(raw, "name");
        let phone = required_str(raw, "phone");
        let address = required_str(raw, "address");
        let email = required_str(raw, "email");

        let (Some(name), Some(phone), Some(address)) = (name, phone, address) else {
            return Err(ValidationError::MissingFields);
        };
        if require_email && email.is_none() {
            return Err(ValidationError::MissingFields);
        }

        let name = name.trim();
        if name.chars().count() < MIN_NAME_CHARS {
            return Err(ValidationError::InvalidName);
        }

        if digit_count(phone) < MIN_PHONE_DIGITS {
            return Err(ValidationError::InvalidPhone);
        }

        let email = match email {
            Some(email) => {
                let email = email.trim();
                if !is_plausible_email(email) {
                    return Err(ValidationError::InvalidEmail);
                }
                Some(email.to_lowercase())
            }
            None => None,
        };

        let comment = raw
            .get("comment")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();

        Ok(OrderSubmission {
            name: name.to_string(),
            phone: phone.trim().to_string(),
            address: address.trim().to_string(),
            comment: comment.to_string(),
            email,
        })
    }

    pub fn has_comment(&self) -> bool {
        !self.comment.is_empty()
    }
}

/// A field that is present, a string, and not blank.
fn required_str<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn digit_count(phone: &str) -> usize {
    phone.chars().filter(char::is_ascii_digit).count()
}

/// `local@domain.tld`: no whitespace, one `@`, and a dot inside the domain
/// with text on both sides.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
