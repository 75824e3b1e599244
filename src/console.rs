//! Terminal implementations of the interactive contracts
//!
//! Prompts read from stdin, notifications and navigation print to the
//! terminal. Used by the CLI; tests use the scripted implementations
//! instead.

use crate::core::notify::{Notification, Notifier};
use crate::core::traits::{EventLog, Navigator};
use crate::orchestration::confirmation::{ConfirmationPrompt, ConfirmationRequest, Decision};
use crate::security::{Credential, CredentialPrompt, PromptReply};
use async_trait::async_trait;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

async fn read_answer(prompt: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    let mut reader = BufReader::new(io::stdin());
    let mut answer = String::new();
    reader.read_line(&mut answer).await?;

    Ok(answer.trim().to_string())
}

/// Credential prompt on the terminal
///
/// An empty password line counts as a dismissal.
pub struct TerminalCredentialPrompt;

#[async_trait]
impl CredentialPrompt for TerminalCredentialPrompt {
    async fn request(&self, requires_second_factor: bool) -> PromptReply {
        let password = match read_answer("🔑 Password (empty to cancel): ").await {
            Ok(password) => password,
            Err(_) => return PromptReply::Cancelled,
        };
        if password.is_empty() {
            return PromptReply::Cancelled;
        }

        let second_factor = if requires_second_factor {
            match read_answer("🔑 Two-factor code: ").await {
                Ok(code) if !code.is_empty() => Some(code),
                _ => return PromptReply::Cancelled,
            }
        } else {
            None
        };

        PromptReply::Submitted(Credential::new(password, second_factor))
    }
}

/// Confirmation prompt on the terminal
pub struct TerminalConfirmationPrompt;

#[async_trait]
impl ConfirmationPrompt for TerminalConfirmationPrompt {
    async fn confirm(&self, request: &ConfirmationRequest) -> Decision {
        println!("\n⚠️  {}", request.title);
        println!("{}", request.message);

        match read_answer("Proceed? (yes/no): ").await {
            Ok(answer) => {
                let answer = answer.to_lowercase();
                if answer == "yes" || answer == "y" {
                    Decision::Confirmed
                } else {
                    Decision::Cancelled
                }
            }
            Err(_) => Decision::Cancelled,
        }
    }
}

/// Notifier printing to the terminal
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        if notification.is_success() {
            println!("✅ {}", notification.message);
        } else {
            eprintln!("❌ {}", notification.message);
        }
    }
}

/// Navigator printing the redirect target
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn go(&self, view: &str) {
        println!("→ {}", view);
    }
}

/// Event log hook that only records the request in the log output
pub struct ConsoleEventLog;

impl EventLog for ConsoleEventLog {
    fn refresh(&self) {
        tracing::info!("event log refresh requested");
    }
}
