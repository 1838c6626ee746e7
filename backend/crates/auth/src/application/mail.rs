//! Outgoing email bodies

use platform::email::OutgoingEmail;

use crate::application::config::AuthConfig;

pub fn password_reset(config: &AuthConfig, to: &str, display_name: &str, token: &str) -> OutgoingEmail {
    let link = config.reset_link(token);
    let minutes = config.reset_token_ttl.num_minutes();
    OutgoingEmail {
        to: to.to_string(),
        subject: "Reset Your Password".to_string(),
        body: format!(
            "Hi {display_name},\n\n\
             We received a request to reset your password. Open the link below to choose a new one:\n\n\
             {link}\n\n\
             This link expires in {minutes} minutes and can be used once.\n\
             If you did not request a password reset, you can ignore this email.\n\n\
             {}",
            config.project_name
        ),
    }
}

pub fn welcome(config: &AuthConfig, to: &str, display_name: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Welcome to {}", config.project_name),
        body: format!(
            "Hi {display_name},\n\n\
             Your account has been created. You can now log in with your username and password.\n\n\
             {}",
            config.project_name
        ),
    }
}
