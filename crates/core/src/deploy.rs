//! Branch and pull-request to deployment target mapping used by the
//! push-to-deploy pipeline.
//!
//! | Trigger            | App name         | Host                          |
//! |--------------------|------------------|-------------------------------|
//! | push to `main`     | `santa`          | `santa.<base-domain>`         |
//! | push to `staging`  | `santa-staging`  | `santa-staging.<base-domain>` |
//! | push to `develop`  | `santa-dev`      | `santa-dev.<base-domain>`     |
//! | pull request #N    | `santa-pr-N`     | `santa-pr-N.<base-domain>`    |

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const APP_PREFIX: &str = "santa";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeploymentTrigger {
    Push { branch: String },
    PullRequest { number: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub app_name: String,
    pub url: String,
}

impl DeploymentTrigger {
    pub fn push(branch: impl Into<String>) -> Self {
        Self::Push { branch: branch.into() }
    }

    /// App name on the PaaS, or `None` for branches that are never deployed.
    pub fn app_name(&self) -> Option<String> {
        match self {
            Self::Push { branch } => {
                let branch = branch.trim().trim_start_matches("refs/heads/");
                match branch {
                    "main" => Some(APP_PREFIX.to_string()),
                    "staging" => Some(format!("{APP_PREFIX}-staging")),
                    "develop" => Some(format!("{APP_PREFIX}-dev")),
                    _ => None,
                }
            }
            Self::PullRequest { number } => Some(format!("{APP_PREFIX}-pr-{number}")),
        }
    }

    pub fn resolve(&self, base_domain: &str) -> Result<Option<DeploymentTarget>, DomainError> {
        let domain = normalize_base_domain(base_domain);
        if domain.is_empty() {
            return Err(DomainError::InvariantViolation(
                "deployment base domain must not be empty".to_string(),
            ));
        }

        Ok(self.app_name().map(|app_name| DeploymentTarget {
            url: format!("https://{app_name}.{domain}"),
            app_name,
        }))
    }
}

fn normalize_base_domain(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_start_matches('.').trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::{DeploymentTarget, DeploymentTrigger};
    use crate::errors::DomainError;

    fn target(app_name: &str, url: &str) -> Option<DeploymentTarget> {
        Some(DeploymentTarget { app_name: app_name.to_string(), url: url.to_string() })
    }

    #[test]
    fn long_lived_branches_map_to_fixed_apps() {
        assert_eq!(
            DeploymentTrigger::push("main").resolve("apps.example.com"),
            Ok(target("santa", "https://santa.apps.example.com"))
        );
        assert_eq!(
            DeploymentTrigger::push("staging").resolve("apps.example.com"),
            Ok(target("santa-staging", "https://santa-staging.apps.example.com"))
        );
        assert_eq!(
            DeploymentTrigger::push("develop").resolve("apps.example.com"),
            Ok(target("santa-dev", "https://santa-dev.apps.example.com"))
        );
    }

    #[test]
    fn pull_requests_get_preview_apps() {
        assert_eq!(
            DeploymentTrigger::PullRequest { number: 42 }.resolve("apps.example.com"),
            Ok(target("santa-pr-42", "https://santa-pr-42.apps.example.com"))
        );
    }

    #[test]
    fn feature_branches_are_not_deployed() {
        assert_eq!(DeploymentTrigger::push("feature/sleigh").resolve("apps.example.com"), Ok(None));
    }

    #[test]
    fn full_refs_and_decorated_domains_are_normalized() {
        assert_eq!(
            DeploymentTrigger::push("refs/heads/main").resolve("https://.apps.example.com/"),
            Ok(target("santa", "https://santa.apps.example.com"))
        );
    }

    #[test]
    fn empty_base_domain_is_rejected() {
        assert!(matches!(
            DeploymentTrigger::push("main").resolve("  "),
            Err(DomainError::InvariantViolation(_))
        ));
    }
}
