/// Recipient address read from the spreadsheet. The only requirement is that the
/// cell is not empty; the mail provider rejects anything it cannot deliver.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(email: String) -> Result<SubscriberEmail, String> {
        if email.is_empty() {
            return Err(String::from("subscriber email is empty"));
        }

        Ok(Self(email))
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
