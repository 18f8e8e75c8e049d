//! The provisioning catalog for the Ubuntu web stack
//!
//! Steps run in exactly the order returned by [`catalog`]. Later steps
//! assume earlier ones converged: services need their packages, the
//! certificate needs a running Apache, Poetry needs pipx.

mod certificate;
mod database;
mod firewall;
mod packages;
mod profile;
mod service;
mod user_tool;

use certificate::Certificate;
use converge::BoxedStep;
use database::MysqlDatabase;
use firewall::{FirewallPorts, WEB_PORTS};
use packages::{AptPackages, STACK_PACKAGES};
use profile::ShellProfile;
use service::SystemdService;
use user_tool::UserTool;

use crate::config::Settings;

/// Step names and one-line summaries, in execution order
pub const OVERVIEW: &[(&str, &str)] = &[
    ("packages", "Install Apache, MySQL, Certbot, pip/venv, pipx, iptables-persistent"),
    ("firewall", "Accept inbound HTTP/HTTPS and persist the rules"),
    ("apache", "Enable and start apache2"),
    ("mysql", "Enable and start mysql"),
    ("database", "Create the application database and user"),
    ("certificate", "Obtain a TLS certificate for DOMAIN and www.DOMAIN"),
    ("oci-cli", "Install the OCI CLI for the current user"),
    ("poetry", "Install Poetry with pipx"),
    ("shell-profile", "Put ~/bin and ~/.local/bin on PATH in ~/.bashrc"),
];

/// Build the ordered step list for these settings
pub fn catalog(settings: &Settings) -> Vec<BoxedStep> {
    vec![
        Box::new(AptPackages::new(STACK_PACKAGES)),
        Box::new(FirewallPorts::new(WEB_PORTS)),
        Box::new(SystemdService::new("apache", "apache2")),
        Box::new(SystemdService::new("mysql", "mysql")),
        Box::new(MysqlDatabase::new(
            &settings.db_name,
            &settings.db_user,
            settings.db_pass.clone(),
        )),
        Box::new(Certificate::new(
            &settings.certificate_names(),
            settings.email.as_deref(),
        )),
        Box::new(UserTool::oci_cli(&settings.home)),
        Box::new(UserTool::poetry(&settings.home)),
        Box::new(ShellProfile::bashrc(&settings.home)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::ScriptedPrompter;
    use crate::config::{DB_PASS, DOMAIN, FileValues, resolve};
    use crate::progress::Reporter;
    use converge::{
        CommandError, CommandOutput, CommandRunner, CommandSpec, Elevation, OutputMode,
        StepContext, StepOutcome, run,
    };
    use std::cell::RefCell;
    use std::collections::{BTreeSet, HashMap};
    use std::path::{Path, PathBuf};

    /// In-memory model of an Ubuntu host that understands the catalog's commands
    #[derive(Default)]
    struct HostState {
        packages: BTreeSet<String>,
        open_ports: BTreeSet<String>,
        active_units: BTreeSet<String>,
        database_ready: bool,
        files: BTreeSet<String>,
    }

    struct FakeHost {
        home: PathBuf,
        state: RefCell<HostState>,
        log: RefCell<Vec<(CommandSpec, OutputMode)>>,
        /// Program whose actions exit non-zero
        failing: Option<&'static str>,
    }

    impl FakeHost {
        fn new(home: &Path) -> Self {
            Self {
                home: home.to_path_buf(),
                state: RefCell::new(HostState::default()),
                log: RefCell::new(Vec::new()),
                failing: None,
            }
        }

        fn failing(mut self, program: &'static str) -> Self {
            self.failing = Some(program);
            self
        }

        fn commands(&self) -> Vec<CommandSpec> {
            self.log.borrow().iter().map(|(s, _)| s.clone()).collect()
        }

        fn actions(&self) -> Vec<String> {
            self.log
                .borrow()
                .iter()
                .filter(|(_, mode)| *mode == OutputMode::Inherit)
                .map(|(s, _)| s.to_string())
                .collect()
        }

        /// Strip `sudo` and `env K=V` wrappers
        fn strip_wrappers(spec: &CommandSpec) -> (String, Vec<String>) {
            let mut parts: Vec<String> = std::iter::once(spec.program.clone())
                .chain(spec.args.iter().cloned())
                .collect();
            if parts[0] == "sudo" {
                parts.remove(0);
                if parts[0] == "env" {
                    parts.remove(0);
                    while parts[0].contains('=') {
                        parts.remove(0);
                    }
                }
            }
            let program = parts.remove(0);
            (program, parts)
        }

        fn answer(&self, program: &str, args: &[String], stdin: Option<&str>) -> bool {
            let mut state = self.state.borrow_mut();
            let last = args.last().cloned().unwrap_or_default();
            match program {
                "dpkg-query" => state.packages.contains(&last),
                "apt-get" => {
                    if args.first().is_some_and(|a| a == "install") {
                        for pkg in args.iter().skip(1).filter(|a| !a.starts_with('-')) {
                            state.packages.insert(pkg.clone());
                        }
                    }
                    true
                }
                "iptables" => {
                    let port = args
                        .iter()
                        .position(|a| a == "--dport")
                        .map(|i| args[i + 1].clone())
                        .unwrap_or_default();
                    match args[0].as_str() {
                        "-C" => state.open_ports.contains(&port),
                        _ => {
                            state.open_ports.insert(port);
                            true
                        }
                    }
                }
                "netfilter-persistent" => true,
                "systemctl" => match args[0].as_str() {
                    "is-active" | "is-enabled" => state.active_units.contains(&last),
                    _ => {
                        state.active_units.insert(last);
                        true
                    }
                },
                "mysql" => {
                    if stdin.is_some_and(|sql| sql.contains("CREATE DATABASE")) {
                        state.database_ready = true;
                    }
                    true
                }
                "test" => state.files.contains(&last),
                "certbot" => {
                    let primary = args
                        .iter()
                        .position(|a| a == "-d")
                        .map(|i| args[i + 1].clone())
                        .unwrap_or_default();
                    state
                        .files
                        .insert(format!("/etc/letsencrypt/live/{primary}/fullchain.pem"));
                    true
                }
                "bash" => {
                    let oci = self.home.join("bin").join("oci");
                    state.files.insert(oci.to_string_lossy().to_string());
                    true
                }
                "pipx" => {
                    let bin = self.home.join(".local").join("bin").join(&last);
                    state.files.insert(bin.to_string_lossy().to_string());
                    true
                }
                other => panic!("fake host does not know {other}"),
            }
        }
    }

    impl CommandRunner for FakeHost {
        fn run(
            &self,
            spec: &CommandSpec,
            mode: OutputMode,
        ) -> Result<CommandOutput, CommandError> {
            self.log.borrow_mut().push((spec.clone(), mode));
            let (program, args) = Self::strip_wrappers(spec);

            if mode == OutputMode::Inherit && self.failing == Some(program.as_str()) {
                return Ok(CommandOutput::failed(1));
            }

            let success = self.answer(&program, &args, spec.stdin.as_deref());
            let stdout = match program.as_str() {
                "dpkg-query" if success => "install ok installed".to_string(),
                "mysql" if self.state.borrow().database_ready => "2\n".to_string(),
                "mysql" => "0\n".to_string(),
                _ => String::new(),
            };
            if success {
                Ok(CommandOutput::ok(&stdout))
            } else {
                Ok(CommandOutput::failed(1))
            }
        }
    }

    fn settings_from(pairs: &[(&str, &str)], home: &Path) -> Settings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mut prompter = ScriptedPrompter::default();
        let settings = resolve(
            |key| env.get(key).cloned(),
            &FileValues::default(),
            &mut prompter,
            home.to_path_buf(),
        )
        .unwrap();
        assert!(prompter.asked.is_empty(), "unexpected prompts: {:?}", prompter.asked);
        settings
    }

    fn default_settings(home: &Path) -> Settings {
        settings_from(&[(DB_PASS, "secret123"), (DOMAIN, "example.com")], home)
    }

    #[test]
    fn test_catalog_matches_overview() {
        let home = tempfile::tempdir().unwrap();
        let steps = catalog(&default_settings(home.path()));
        let names: Vec<&str> = steps.iter().map(|s| s.name()).collect();
        let expected: Vec<&str> = OVERVIEW.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_fresh_host_converges_then_skips() {
        let home = tempfile::tempdir().unwrap();
        let host = FakeHost::new(home.path());
        let steps = catalog(&default_settings(home.path()));
        let ctx = StepContext::new(&host, Elevation::Direct);

        let first = run(&steps, &ctx, &mut converge::NoProgress);
        assert!(first.is_success(), "{:?}", first.failure());
        assert_eq!(first.applied(), OVERVIEW.len());
        assert_eq!(first.names(), OVERVIEW.iter().map(|(n, _)| *n).collect::<Vec<_>>());

        let actions_after_first = host.actions().len();
        let second = run(&steps, &ctx, &mut converge::NoProgress);
        assert!(second.is_success());
        assert!(
            second
                .results
                .iter()
                .all(|r| r.outcome == StepOutcome::Skipped)
        );
        assert_eq!(host.actions().len(), actions_after_first);
    }

    #[test]
    fn test_failure_stops_later_steps() {
        let home = tempfile::tempdir().unwrap();
        let host = FakeHost::new(home.path()).failing("systemctl");
        let steps = catalog(&default_settings(home.path()));
        let ctx = StepContext::new(&host, Elevation::Direct);

        let report = run(&steps, &ctx, &mut converge::NoProgress);
        assert!(!report.is_success());
        assert_eq!(report.names(), vec!["packages", "firewall", "apache"]);
        assert!(matches!(
            report.results[2].outcome,
            StepOutcome::Failed { .. }
        ));

        let commands = host.commands();
        assert!(!commands.iter().any(|c| c.program == "mysql"));
        assert!(!commands.iter().any(|c| c.program == "certbot"));
        assert!(!home.path().join(".bashrc").exists());
    }

    #[test]
    fn test_password_never_in_output_or_arguments() {
        let home = tempfile::tempdir().unwrap();
        let host = FakeHost::new(home.path());
        let steps = catalog(&default_settings(home.path()));
        let ctx = StepContext::new(&host, Elevation::Sudo);

        let mut reporter = Reporter::new(Vec::new(), false);
        let report = run(&steps, &ctx, &mut reporter);
        assert!(report.is_success());

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(!output.contains("secret123"));
        for spec in host.commands() {
            assert!(!spec.mentions("secret123"), "leaked in {spec}");
            assert!(!spec.to_string().contains("secret123"));
            assert!(!format!("{spec:?}").contains("secret123"));
        }

        // it still reaches MySQL, through stdin
        assert!(
            host.commands()
                .iter()
                .filter_map(|c| c.stdin.as_deref())
                .any(|sql| sql.contains("IDENTIFIED BY 'secret123'"))
        );
    }

    #[test]
    fn test_domain_from_environment_drives_certbot() {
        let home = tempfile::tempdir().unwrap();
        let host = FakeHost::new(home.path());
        let steps = catalog(&default_settings(home.path()));
        let ctx = StepContext::new(&host, Elevation::Direct);
        run(&steps, &ctx, &mut converge::NoProgress);

        let certbot = host
            .commands()
            .into_iter()
            .find(|c| c.program == "certbot")
            .unwrap();
        let requested: Vec<&str> = certbot
            .args
            .windows(2)
            .filter(|w| w[0] == "-d")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(requested, vec!["example.com", "www.example.com"]);
    }

    #[test]
    fn test_database_defaults() {
        let home = tempfile::tempdir().unwrap();
        let host = FakeHost::new(home.path());
        let steps = catalog(&default_settings(home.path()));
        let ctx = StepContext::new(&host, Elevation::Direct);
        run(&steps, &ctx, &mut converge::NoProgress);

        let script = host
            .commands()
            .into_iter()
            .filter_map(|c| c.stdin)
            .find(|sql| sql.contains("CREATE DATABASE"))
            .unwrap();
        assert!(script.contains("CREATE DATABASE IF NOT EXISTS `project_db`"));
        assert!(script.contains("'project_user'@'localhost'"));
    }

    #[test]
    fn test_only_system_commands_are_elevated() {
        let home = tempfile::tempdir().unwrap();
        let host = FakeHost::new(home.path());
        let steps = catalog(&default_settings(home.path()));
        let ctx = StepContext::new(&host, Elevation::Sudo);
        run(&steps, &ctx, &mut converge::NoProgress);

        for spec in host.commands() {
            let (program, _) = FakeHost::strip_wrappers(&spec);
            let elevated = spec.program == "sudo";
            match program.as_str() {
                "apt-get" | "iptables" | "netfilter-persistent" | "systemctl" | "mysql"
                | "certbot" => assert!(elevated, "{spec} should be elevated"),
                "dpkg-query" | "bash" | "pipx" => assert!(!elevated, "{spec} should not be"),
                _ => {}
            }
        }

        let install = host
            .commands()
            .into_iter()
            .find(|c| c.mentions("install") && c.mentions("apt-get"))
            .unwrap();
        assert!(
            install
                .to_string()
                .starts_with("sudo env DEBIAN_FRONTEND=noninteractive apt-get install -y")
        );
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let home = tempfile::tempdir().unwrap();
        let host = FakeHost::new(home.path());
        let steps = catalog(&default_settings(home.path()));
        let ctx = StepContext::new(&host, Elevation::Direct).with_dry_run(true);

        let report = run(&steps, &ctx, &mut converge::NoProgress);
        assert!(report.is_success());
        assert_eq!(report.planned(), OVERVIEW.len());
        assert!(host.actions().is_empty());
        assert!(!home.path().join(".bashrc").exists());
    }

    #[test]
    fn test_partially_provisioned_host() {
        let home = tempfile::tempdir().unwrap();
        let host = FakeHost::new(home.path());
        {
            let mut state = host.state.borrow_mut();
            state.packages = STACK_PACKAGES.iter().map(|p| (*p).to_string()).collect();
            state.active_units.insert("apache2".to_string());
        }
        let steps = catalog(&default_settings(home.path()));
        let ctx = StepContext::new(&host, Elevation::Direct);

        let report = run(&steps, &ctx, &mut converge::NoProgress);
        assert!(report.is_success());
        assert_eq!(report.results[0].outcome, StepOutcome::Skipped);
        assert_eq!(report.results[1].outcome, StepOutcome::Applied);
        assert_eq!(report.results[2].outcome, StepOutcome::Skipped);
        assert_eq!(report.results[3].outcome, StepOutcome::Applied);
        assert!(!host.actions().iter().any(|a| a.contains("apt-get")));
    }
}
