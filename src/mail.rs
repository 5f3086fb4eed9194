//! Outgoing mail for the OTP verification flows.
//!
//! Credentials come from the environment. A mail server whose host ends in
//! `.local` switches to test mode and dumps the mail to the log instead of
//! opening an smtp connection. Without the `mail` feature the whole module
//! degrades to log-only delivery.

use crate::env;
use crate::error::ServiceResult;
use crate::models::User;

struct MailCredentials {
    pub sender: String,
    pub sender_name: String,
    pub server: String,
    pub user: String,
    pub pass: String,
}

impl MailCredentials {
    fn load_from_environment() -> Self {
        MailCredentials {
            sender: env::MAIL_SENDER.clone(),
            sender_name: env::MAIL_SENDER_NAME.clone(),
            server: env::MAIL_SERVER.clone(),
            user: env::MAIL_USER.clone(),
            pass: env::MAIL_PASS.clone(),
        }
    }
}

#[cfg(feature = "mail")]
async fn send_standard_mail(user: &User, subject: &str, message: String) -> ServiceResult<()> {
    use lettre::message::Mailbox;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

    use crate::error::ServiceError;

    let credentials = MailCredentials::load_from_environment();

    let internal = |err: String| ServiceError::InternalServerError(err);

    let email = Message::builder()
        .from(Mailbox::new(
            Some(credentials.sender_name.clone()),
            credentials
                .sender
                .parse()
                .map_err(|_| internal("Invalid mail sender address.".to_string()))?,
        ))
        .to(Mailbox::new(
            Some(user.username.clone()),
            user.email
                .parse()
                .map_err(|_| internal("Invalid mail receiver address.".to_string()))?,
        ))
        .subject(subject)
        .body(message)
        .map_err(|err| internal(err.to_string()))?;

    if credentials.server.ends_with(".local") {
        // dump the mail to the log
        log::info!("{}", String::from_utf8_lossy(&email.formatted()));
    } else {
        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&credentials.server)
                .map_err(|err| internal(err.to_string()))?
                .credentials(Credentials::new(credentials.user, credentials.pass))
                .build();

        mailer
            .send(email)
            .await
            .map_err(|err| internal(err.to_string()))?;
    }

    Ok(())
}

#[cfg(not(feature = "mail"))]
async fn send_standard_mail(user: &User, subject: &str, message: String) -> ServiceResult<()> {
    let credentials = MailCredentials::load_from_environment();

    log::info!(
        "mail support is disabled, would send from '{}' to '{}' with subject '{}':\n{}",
        credentials.sender,
        user.email,
        subject,
        message
    );

    Ok(())
}

/// Send the password reset OTP requested via the forgot password flow.
pub async fn send_password_reset_mail(user: &User, otp_code: i32, link: &str) -> ServiceResult<()> {
    let mail_text = format!(
        "Hello {user},

a password reset was requested for your account. Use the following code to confirm the reset:

    {otp_code}

{link}

If you did not request a reset you can ignore this mail, your password stays unchanged.

----
This mail has been automatically generated. Please do not reply.",
        user = user.username,
    );

    send_standard_mail(user, "[pos] Reset your password", mail_text).await
}

/// Send the OTP that authorizes an admin to change a cashier's password.
pub async fn send_cashier_password_change_mail(
    admin: &User,
    otp_code: i32,
    link: &str,
) -> ServiceResult<()> {
    let mail_text = format!(
        "Hello {user},

you requested to change a cashier's password. Use the following code to confirm the change:

    {otp_code}

{link}

----
This mail has been automatically generated. Please do not reply.",
        user = admin.username,
    );

    send_standard_mail(admin, "[pos] Verify to change cashier password", mail_text).await
}
