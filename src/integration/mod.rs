pub use build::BuildServer;
pub use chat::{ChatPlatform, RocketChat};
pub use git::{GitHost, Gitea};
pub use identity::{AuthServer, IdentityProvider, UserInfo};

use thiserror::Error;

mod build;
mod chat;
mod git;
mod identity;

/// Failure talking to an external system. `system` is the short name used
/// in operator-facing messages ("git", "chat", "build").
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("request to {system} failed: {source}")]
    Transport {
        system: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{system} returned {status}: {body}")]
    Status {
        system: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{system} rejected the call: {message}")]
    Rejected { system: &'static str, message: String },
}

impl IntegrationError {
    pub(crate) fn transport(system: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { system, source }
    }

    pub(crate) fn rejected(system: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected {
            system,
            message: message.into(),
        }
    }
}
