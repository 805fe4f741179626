//! Reads the applicant's details and the GitHub Actions context out of the environment.

use std::env::{VarError, var};
use std::fmt;

use tracing::warn;

use crate::error::SubmitError;

pub const DEFAULT_SERVER_URL: &str = "https://github.com";
pub const DEFAULT_SUBMISSION_URL: &str = "https://b12.io/apply/submission";

/// Secret used when `B12_SIGNING_SECRET` is unset. Override at build time with
/// `B12_DEFAULT_SIGNING_SECRET`.
pub const DEFAULT_SIGNING_SECRET: &str = match option_env!("B12_DEFAULT_SIGNING_SECRET") {
    Some(secret) => secret,
    None => "hello-b12",
};

/// Fallback values for the optional variables.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub server_url: String,
    pub submission_url: String,
    pub signing_secret: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            submission_url: DEFAULT_SUBMISSION_URL.into(),
            signing_secret: DEFAULT_SIGNING_SECRET.into(),
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub name: String,
    pub email: String,
    pub resume_link: String,
    pub repository_link: String,
    pub server_url: String,
    pub repository: String,
    pub run_id: String,
    pub submission_url: String,
    signing_secret: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, SubmitError> {
        Self::from_lookup(|key| var(key), &Defaults::default())
    }

    /// Builds the settings from an arbitrary key lookup. Blank values count as unset,
    /// but values are otherwise passed through untouched since they end up signed.
    pub fn from_lookup<F>(lookup: F, defaults: &Defaults) -> Result<Self, SubmitError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let optional = |variable: &'static str| match lookup(variable) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(SubmitError::InvalidConfiguration { variable }),
        };
        let required = |variable: &'static str| -> Result<String, SubmitError> {
            optional(variable)?.ok_or(SubmitError::MissingConfiguration { variable })
        };

        // The Actions context is checked first: without it there is no run to link to.
        let repository = required("GITHUB_REPOSITORY")?;
        let run_id = required("GITHUB_RUN_ID")?;

        let name = required("B12_NAME")?;
        let email = required("B12_EMAIL")?;
        let resume_link = required("B12_RESUME_LINK")?;

        let server_url =
            optional("GITHUB_SERVER_URL")?.unwrap_or_else(|| defaults.server_url.clone());
        let repository_link = optional("B12_REPOSITORY_LINK")?
            .unwrap_or_else(|| format!("{server_url}/{repository}"));
        let submission_url =
            optional("B12_SUBMISSION_URL")?.unwrap_or_else(|| defaults.submission_url.clone());

        let signing_secret = match optional("B12_SIGNING_SECRET")? {
            Some(secret) => secret,
            None => {
                warn!("B12_SIGNING_SECRET not set, falling back to the default signing secret");
                defaults.signing_secret.clone()
            }
        };

        Ok(Self {
            name,
            email,
            resume_link,
            repository_link,
            server_url,
            repository,
            run_id,
            submission_url,
            signing_secret,
        })
    }

    pub fn action_run_link(&self) -> String {
        format!(
            "{}/{}/actions/runs/{}",
            self.server_url, self.repository, self.run_id
        )
    }

    pub fn signing_secret(&self) -> &[u8] {
        self.signing_secret.as_bytes()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("resume_link", &self.resume_link)
            .field("repository_link", &self.repository_link)
            .field("server_url", &self.server_url)
            .field("repository", &self.repository)
            .field("run_id", &self.run_id)
            .field("submission_url", &self.submission_url)
            .finish_non_exhaustive()
    }
}
