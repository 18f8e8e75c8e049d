//! MySQL database and user step
//!
//! All SQL is written to the client's stdin, so the password never shows up
//! in an argument list or a log line. Identifiers are validated when the
//! settings are resolved and are safe to interpolate.

use anyhow::{Context, Result};
use converge::{CommandSpec, Step, StepContext};

use crate::config::Secret;

const DB_HOST: &str = "localhost";

/// An application database with a dedicated, fully privileged user
#[derive(Debug, Clone)]
pub struct MysqlDatabase {
    pub name: String,
    pub user: String,
    pub password: Secret,
}

impl MysqlDatabase {
    pub fn new(name: &str, user: &str, password: Secret) -> Self {
        Self {
            name: name.to_string(),
            user: user.to_string(),
            password,
        }
    }

    /// Counts the database and the user; 2 means both exist
    fn existence_query(&self) -> String {
        format!(
            "SELECT (SELECT COUNT(*) FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = {name}) \
             + (SELECT COUNT(*) FROM mysql.user WHERE User = {user} AND Host = {host});\n",
            name = sql_literal(&self.name),
            user = sql_literal(&self.user),
            host = sql_literal(DB_HOST),
        )
    }

    fn provision_script(&self) -> String {
        let account = format!("{}@{}", sql_literal(&self.user), sql_literal(DB_HOST));
        format!(
            "CREATE DATABASE IF NOT EXISTS `{db}`;\n\
             CREATE USER IF NOT EXISTS {account} IDENTIFIED BY {pass};\n\
             GRANT ALL PRIVILEGES ON `{db}`.* TO {account};\n\
             FLUSH PRIVILEGES;\n",
            db = self.name,
            pass = sql_literal(self.password.expose()),
        )
    }
}

/// Quote a value as a single-quoted MySQL string literal
pub fn sql_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\'' => quoted.push_str("''"),
            '\\' => quoted.push_str("\\\\"),
            '\0' => quoted.push_str("\\0"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

impl Step for MysqlDatabase {
    fn name(&self) -> &str {
        "database"
    }

    fn description(&self) -> String {
        format!("Create MySQL database {} and user {}", self.name, self.user)
    }

    fn is_satisfied(&self, ctx: &StepContext) -> bool {
        ctx.capture_root(
            CommandSpec::new("mysql")
                .args(["-N", "-B"])
                .stdin(self.existence_query()),
        )
        .is_some_and(|out| out.trim() == "2")
    }

    fn apply(&self, ctx: &StepContext) -> Result<()> {
        ctx.exec_root(CommandSpec::new("mysql").stdin(self.provision_script()))
            .with_context(|| format!("Failed to provision database {}", self.name))?;
        Ok(())
    }
}
