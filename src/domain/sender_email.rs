use validator::validate_email;

/// Address reminders are sent from. Comes from configuration, so it is checked
/// strictly at startup.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SenderEmail(String);

impl SenderEmail {
    pub fn parse(email: String) -> Result<SenderEmail, String> {
        let is_valid_email = validate_email(&email);

        if !is_valid_email {
            return Err(format!("{} email is not valid", email));
        }

        Ok(Self(email))
    }
}

impl AsRef<str> for SenderEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
