//! Sign-in form flow: PIN entry, submit readiness and failure wording.

use crate::error::SessionError;
use crate::session::SessionManager;
use crate::store::TokenSet;

/// Required PIN length.
pub const PIN_LENGTH: usize = 6;

const INCORRECT_CREDENTIALS_MESSAGE: &str = "Incorrect username or PIN. Please try again.";
const GENERIC_FAILURE_MESSAGE: &str = "Login failed. Please try again.";

/// Keep ASCII digits only, at most [`PIN_LENGTH`] of them.
pub fn sanitize_pin(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(PIN_LENGTH)
        .collect()
}

/// User-facing message for a failed sign-in.
pub fn sign_in_failure_message(err: &SessionError) -> String {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("incorrect") || lowered.contains("unauthorized") {
        INCORRECT_CREDENTIALS_MESSAGE.to_string()
    } else if message.trim().is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        message
    }
}

/// State of the sign-in form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    identifier: String,
    pin: String,
}

impl SignInForm {
    pub fn new(identifier: impl Into<String>, pin: &str) -> Self {
        Self {
            identifier: identifier.into(),
            pin: sanitize_pin(pin),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn set_identifier(&mut self, identifier: impl Into<String>) {
        self.identifier = identifier.into();
    }

    pub fn set_pin(&mut self, raw: &str) {
        self.pin = sanitize_pin(raw);
    }

    pub fn can_submit(&self) -> bool {
        !self.identifier.trim().is_empty() && self.pin.len() == PIN_LENGTH
    }

    /// Log in and persist the session.
    ///
    /// Returns the user-facing failure message on error. An incomplete form
    /// never reaches the network.
    pub async fn submit(&self, session: &SessionManager) -> Result<TokenSet, String> {
        if !self.can_submit() {
            return Err(format!(
                "Enter your username or email and a {PIN_LENGTH}-digit PIN."
            ));
        }
        let grant = session
            .login(self.identifier.trim(), &self.pin)
            .await
            .map_err(|err| sign_in_failure_message(&err))?;
        session
            .establish(&grant)
            .map_err(|err| sign_in_failure_message(&err))
    }
}
