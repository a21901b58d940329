use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::ApiError;

/// Newsletter signup body. Fields are optional at the wire level so the 400
/// can name what is missing instead of failing deserialization.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewsletterForm {
    pub email: Option<String>,
    pub firstname: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewsletterSubmission {
    pub email: String,
    pub firstname: String,
}

impl NewsletterForm {
    pub fn validated(self) -> Result<NewsletterSubmission, ApiError> {
        match (non_empty(self.email), non_empty(self.firstname)) {
            (Some(email), Some(firstname)) => Ok(NewsletterSubmission { email, firstname }),
            _ => Err(ApiError::Validation(
                "Email and firstname are required".into(),
            )),
        }
    }
}

/// Quiz result submission.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuizForm {
    pub firstname: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "quizType")]
    pub quiz_type: Option<String>,
    /// Raw answer payload, forwarded to the spreadsheet as-is.
    #[schema(value_type = Object)]
    pub answers: Option<Value>,
    pub result: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuizSubmission {
    pub firstname: String,
    pub email: String,
    pub quiz_type: String,
    pub answers: Option<Value>,
    pub result: Option<String>,
}

impl QuizForm {
    pub fn validated(self) -> Result<QuizSubmission, ApiError> {
        match (
            non_empty(self.firstname),
            non_empty(self.email),
            non_empty(self.quiz_type),
        ) {
            (Some(firstname), Some(email), Some(quiz_type)) => Ok(QuizSubmission {
                firstname,
                email,
                quiz_type,
                answers: self.answers,
                result: self.result.filter(|s| !s.is_empty()),
            }),
            _ => Err(ApiError::Validation("Missing required fields".into())),
        }
    }
}

/// Application form from the offers page.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ApplicationForm {
    pub firstname: Option<String>,
    pub email: Option<String>,
    pub offer: Option<String>,
    pub challenge: Option<String>,
    pub business: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApplicationSubmission {
    pub firstname: String,
    pub email: String,
    pub offer: String,
    pub challenge: String,
    pub business: Option<String>,
}

impl ApplicationForm {
    pub fn validated(self) -> Result<ApplicationSubmission, ApiError> {
        match (
            non_empty(self.firstname),
            non_empty(self.email),
            non_empty(self.offer),
            non_empty(self.challenge),
        ) {
            (Some(firstname), Some(email), Some(offer), Some(challenge)) => {
                Ok(ApplicationSubmission {
                    firstname,
                    email,
                    offer,
                    challenge,
                    business: self.business.filter(|s| !s.is_empty()),
                })
            }
            _ => Err(ApiError::Validation("Missing required fields".into())),
        }
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}
