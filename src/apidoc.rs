use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "form-relay",
        version = "0.1.0",
        description = "Relays marketing-site form submissions and booking webhooks to marketing, scheduling, messaging and directory providers."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local dev")
    ),
    tags(
        (name = "forms", description = "Website form endpoints"),
        (name = "bookings", description = "Booking webhook and feed check"),
        (name = "admin", description = "Allow-list gated member administration")
    ),
    // Handlers (paths)
    paths(
        crate::routes::forms::newsletter,
        crate::routes::forms::quiz,
        crate::routes::forms::application,
        crate::routes::bookings::tidycal_webhook,
        crate::routes::bookings::check_bookings,
        crate::routes::admin::create_customer,
        crate::routes::admin::reset_password,
    ),
    // Schemas used in requests/responses
    components(
        schemas(
            crate::models::forms::NewsletterForm,
            crate::models::forms::QuizForm,
            crate::models::forms::ApplicationForm,
            crate::models::admin::CreateCustomerForm,
            crate::models::admin::ResetPasswordForm,
            crate::models::admin::CustomerReply,
            crate::models::common::SubmissionReply,
            crate::models::common::CheckReply,
            crate::models::common::ErrorMessage
        )
    )
)]
pub struct ApiDoc;
