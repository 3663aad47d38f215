use serde::{Deserialize, Serialize};

use super::{require_non_empty, ValidationError};

/// Contact details for a booking confirmation mail
///
/// The mail consumer reads `Email` and `Phone_number` keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRequest {
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Phone_number")]
    pub phone_number: String,
}

/// Body of `POST /api/mail`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendMailRequest {
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
}

impl TryFrom<SendMailRequest> for MailRequest {
    type Error = ValidationError;

    fn try_from(request: SendMailRequest) -> Result<Self, Self::Error> {
        require_non_empty("email", &request.email)?;
        if !request.email.contains('@') {
            return Err(ValidationError::Invalid {
                field: "email",
                reason: format!("'{}' is not an email address", request.email),
            });
        }

        Ok(Self {
            email: request.email,
            phone_number: request.phone_number,
        })
    }
}
