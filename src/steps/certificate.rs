//! TLS certificate step via certbot's Apache plugin

use anyhow::{Context, Result};
use converge::{CommandSpec, Step, StepContext};
use std::path::PathBuf;

const LIVE_DIR: &str = "/etc/letsencrypt/live";

#[derive(Debug, Clone)]
pub struct Certificate {
    /// Names on the certificate; the first one names the lineage
    pub names: Vec<String>,
    pub email: Option<String>,
}

impl Certificate {
    pub fn new(names: &[String], email: Option<&str>) -> Self {
        Self {
            names: names.to_vec(),
            email: email.map(str::to_string),
        }
    }

    /// Where certbot stores the chain for the primary name
    pub fn fullchain_path(&self) -> PathBuf {
        let primary = self.names.first().map_or("", String::as_str);
        PathBuf::from(LIVE_DIR).join(primary).join("fullchain.pem")
    }

    fn certbot(&self) -> CommandSpec {
        let mut spec = CommandSpec::new("certbot").args([
            "--apache",
            "--non-interactive",
            "--agree-tos",
            "--redirect",
        ]);
        for name in &self.names {
            spec = spec.args(["-d", name.as_str()]);
        }
        match &self.email {
            Some(email) => spec.args(["-m", email.as_str()]),
            None => spec.arg("--register-unsafely-without-email"),
        }
    }
}

impl Step for Certificate {
    fn name(&self) -> &str {
        "certificate"
    }

    fn description(&self) -> String {
        format!("Obtain a TLS certificate for {}", self.names.join(", "))
    }

    fn is_satisfied(&self, ctx: &StepContext) -> bool {
        // The live directory is root-only.
        ctx.check_root(
            CommandSpec::new("test")
                .arg("-f")
                .arg(self.fullchain_path().to_string_lossy()),
        )
    }

    fn apply(&self, ctx: &StepContext) -> Result<()> {
        ctx.exec_root(self.certbot())
            .context("certbot could not obtain a certificate")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["example.com".to_string(), "www.example.com".to_string()]
    }

    #[test]
    fn test_certbot_requests_every_name() {
        let cert = Certificate::new(&names(), None);
        assert_eq!(
            cert.certbot().to_string(),
            "certbot --apache --non-interactive --agree-tos --redirect \
             -d example.com -d www.example.com --register-unsafely-without-email"
        );
    }

    #[test]
    fn test_certbot_with_email() {
        let cert = Certificate::new(&names(), Some("ops@example.com"));
        let spec = cert.certbot();
        assert!(spec.to_string().ends_with("-m ops@example.com"));
        assert!(!spec.mentions("--register-unsafely-without-email"));
    }

    #[test]
    fn test_fullchain_path() {
        let cert = Certificate::new(&names(), None);
        assert_eq!(
            cert.fullchain_path(),
            PathBuf::from("/etc/letsencrypt/live/example.com/fullchain.pem")
        );
    }
}
