//! Firewall step - accept web traffic and persist the rules

use anyhow::{Context, Result};
use converge::{CommandSpec, Step, StepContext};

/// Inbound TCP ports the web server needs
pub const WEB_PORTS: &[u16] = &[80, 443];

#[derive(Debug, Clone)]
pub struct FirewallPorts {
    pub ports: Vec<u16>,
}

impl FirewallPorts {
    pub fn new(ports: &[u16]) -> Self {
        Self {
            ports: ports.to_vec(),
        }
    }

    fn rule(port: u16) -> Vec<String> {
        let port = port.to_string();
        [
            "INPUT", "-p", "tcp", "-m", "state", "--state", "NEW", "--dport", port.as_str(), "-j", "ACCEPT",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
    }

    fn is_open(ctx: &StepContext, port: u16) -> bool {
        ctx.check_root(CommandSpec::new("iptables").arg("-C").args(Self::rule(port)))
    }
}

impl Step for FirewallPorts {
    fn name(&self) -> &str {
        "firewall"
    }

    fn description(&self) -> String {
        let ports: Vec<String> = self.ports.iter().map(u16::to_string).collect();
        format!("Accept inbound TCP on ports {}", ports.join(", "))
    }

    fn is_satisfied(&self, ctx: &StepContext) -> bool {
        self.ports.iter().all(|&p| Self::is_open(ctx, p))
    }

    fn apply(&self, ctx: &StepContext) -> Result<()> {
        for &port in &self.ports {
            if Self::is_open(ctx, port) {
                continue;
            }
            ctx.exec_root(CommandSpec::new("iptables").arg("-I").args(Self::rule(port)))
                .with_context(|| format!("Failed to open port {port}"))?;
        }

        ctx.exec_root(CommandSpec::new("netfilter-persistent").arg("save"))
            .context("Failed to persist firewall rules")?;
        Ok(())
    }
}
