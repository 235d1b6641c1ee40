// openw-cli/src/console.rs
use inquire::{
    validator::Validation, Confirm, CustomUserError, Password, PasswordDisplayMode, Text,
};
use log::warn;

use crate::wallet::constants::PASSWORD_MIN_LENGTH;
use crate::wallet::error::{Error, Result};

/// Interactive input and output used by the session flows.
pub trait Console {
    fn confirm(&mut self, message: &str) -> Result<bool>;

    /// Free text, trimmed. With `required` an empty answer is asked again.
    fn input_text(&mut self, message: &str, required: bool) -> Result<String>;

    /// Masked password entry, at most `max_attempts` tries to pass the
    /// length check.
    fn input_password(&mut self, confirm: bool, max_attempts: usize) -> Result<String>;

    fn notice(&mut self, line: &str);
}

pub struct TerminalConsole;

impl Console for TerminalConsole {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        Ok(Confirm::new(message).with_default(false).prompt()?)
    }

    fn input_text(&mut self, message: &str, required: bool) -> Result<String> {
        let mut prompt = Text::new(message);
        if required {
            prompt = prompt.with_validator(|input: &str| -> Result<Validation, CustomUserError> {
                if input.trim().is_empty() {
                    Ok(Validation::Invalid("This field cannot be empty.".into()))
                } else {
                    Ok(Validation::Valid)
                }
            });
        }
        Ok(prompt.prompt()?.trim().to_string())
    }

    fn input_password(&mut self, confirm: bool, max_attempts: usize) -> Result<String> {
        read_password_with_retries(
            |_| {
                let mut prompt = Password::new("Enter wallet password:")
                    .with_display_mode(PasswordDisplayMode::Masked);
                if !confirm {
                    prompt = prompt.without_confirmation();
                }
                Ok(prompt.prompt()?)
            },
            max_attempts,
        )
    }

    fn notice(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Calls `read` until it yields a password of at least
/// [`PASSWORD_MIN_LENGTH`] characters, giving up after `max_attempts`.
pub fn read_password_with_retries<F>(mut read: F, max_attempts: usize) -> Result<String>
where
    F: FnMut(usize) -> Result<String>,
{
    for attempt in 1..=max_attempts {
        let password = read(attempt)?;
        if password.chars().count() >= PASSWORD_MIN_LENGTH {
            return Ok(password);
        }
        warn!(
            "Password shorter than {} characters (attempt {}/{}).",
            PASSWORD_MIN_LENGTH, attempt, max_attempts
        );
        println!(
            "Password must be at least {} characters long.",
            PASSWORD_MIN_LENGTH
        );
    }
    Err(Error::PasswordRejected(max_attempts))
}
