use tracing::{error, warn};

use crate::{
    AppState,
    error::ApiError,
    models::{
        admin::{CreateCustomerForm, CustomerReply, CustomerRow, ResetPasswordForm},
        common::SubmissionReply,
    },
    services::supabase::SupabaseAdmin,
};

/// Create a member-area customer: allow-list gate, then auth identity, then
/// the linked customer row. When the row insert fails the identity is
/// deleted again; an auth identity without a customer row must not survive.
pub async fn create_customer(
    state: &AppState,
    form: CreateCustomerForm,
) -> Result<CustomerReply, ApiError> {
    let request = form.validated()?;
    let directory = state.directory.as_ref().ok_or(ApiError::Configuration)?;

    require_admin(directory.as_ref(), &request.admin_email).await?;

    let auth_user = directory
        .create_user(&request.email, &request.password, &request.name)
        .await?;

    let row = CustomerRow {
        email: request.email,
        name: request.name,
        program: request.program,
        active: true,
        auth_user_id: auth_user.id.clone(),
    };

    match directory.insert_customer(&row).await {
        Ok(customer) => Ok(CustomerReply {
            success: true,
            customer,
            message: "Customer created successfully".into(),
        }),
        Err(insert_err) => {
            if let Err(rollback_err) = directory.delete_user(&auth_user.id).await {
                error!(
                    user_id = %auth_user.id,
                    error = %rollback_err,
                    "rollback failed, auth identity is orphaned"
                );
            }
            Err(insert_err.into())
        }
    }
}

/// Reset a member's password: allow-list gate, locate the identity by email,
/// update it.
pub async fn reset_password(
    state: &AppState,
    form: ResetPasswordForm,
) -> Result<SubmissionReply, ApiError> {
    let request = form.validated()?;
    if request.new_password.chars().count() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    let directory = state.directory.as_ref().ok_or(ApiError::Configuration)?;

    require_admin(directory.as_ref(), &request.admin_email).await?;

    let users = directory.list_users().await?;
    let user = users
        .into_iter()
        .find(|u| u.email.as_deref() == Some(request.email.as_str()))
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    directory
        .update_password(&user.id, &request.new_password)
        .await?;

    Ok(SubmissionReply::ok("Password updated successfully"))
}

/// Allow-list gate. A failed lookup counts as "not an admin": the mutation
/// must not proceed on an unverifiable identity.
async fn require_admin(directory: &SupabaseAdmin, email: &str) -> Result<(), ApiError> {
    let is_admin = match directory.is_admin(email).await {
        Ok(is_admin) => is_admin,
        Err(err) => {
            warn!(error = %err, "admin allow-list lookup failed");
            false
        }
    };
    if is_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Unauthorized: Not an admin".into()))
    }
}
