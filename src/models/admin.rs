use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::ApiError;

/// Create-customer request. `admin_email` is the caller's claimed identity,
/// checked against the allow-list before anything is mutated.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateCustomerForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub program: Option<String>,
    #[serde(rename = "adminEmail")]
    pub admin_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCustomerRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub program: String,
    pub admin_email: String,
}

impl CreateCustomerForm {
    pub fn validated(self) -> Result<CreateCustomerRequest, ApiError> {
        match (
            non_empty(self.email),
            non_empty(self.password),
            non_empty(self.name),
            non_empty(self.program),
            non_empty(self.admin_email),
        ) {
            (Some(email), Some(password), Some(name), Some(program), Some(admin_email)) => {
                Ok(CreateCustomerRequest {
                    email,
                    password,
                    name,
                    program,
                    admin_email,
                })
            }
            _ => Err(ApiError::Validation("Missing required fields".into())),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResetPasswordForm {
    pub email: Option<String>,
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
    #[serde(rename = "adminEmail")]
    pub admin_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
    pub admin_email: String,
}

impl ResetPasswordForm {
    pub fn validated(self) -> Result<ResetPasswordRequest, ApiError> {
        match (
            non_empty(self.email),
            non_empty(self.new_password),
            non_empty(self.admin_email),
        ) {
            (Some(email), Some(new_password), Some(admin_email)) => Ok(ResetPasswordRequest {
                email,
                new_password,
                admin_email,
            }),
            _ => Err(ApiError::Validation(
                "Email, newPassword and adminEmail are required".into(),
            )),
        }
    }
}

/// Row written to the customers table, linked to the auth identity.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerRow {
    pub email: String,
    pub name: String,
    pub program: String,
    pub active: bool,
    pub auth_user_id: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerReply {
    pub success: bool,
    #[schema(value_type = Object)]
    pub customer: Value,
    pub message: String,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_customer_requires_every_field() {
        let form = CreateCustomerForm {
            email: Some("new@example.com".into()),
            password: Some("hunter22".into()),
            name: Some("New Customer".into()),
            program: None,
            admin_email: Some("admin@example.com".into()),
        };
        assert!(form.validated().is_err());
    }

    #[test]
    fn reset_password_names_its_required_fields() {
        let form = ResetPasswordForm {
            email: Some("a@b.at".into()),
            new_password: None,
            admin_email: None,
        };
        let err = form.validated().unwrap_err();
        assert!(
            matches!(err, ApiError::Validation(msg) if msg == "Email, newPassword and adminEmail are required")
        );
    }
}
