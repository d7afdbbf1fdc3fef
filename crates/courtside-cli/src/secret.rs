//! Site logins and the secret references they may hold.
//!
//! The `id` and `password` of a `[nowon]` or `[dobong]` section are either
//! plain text or a reference resolved when the command runs:
//!
//! - `pass::path/in/store`: first line of `pass show path/in/store`
//! - `env::VAR_NAME`: the value of `$VAR_NAME`

use std::fmt;
use std::process::Command;

use courtside_core::{Credential, Region};

const MASK: &str = "********";

/// A login value as written in `config.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secret<'a> {
    Plain(&'a str),
    Pass(&'a str),
    Env(&'a str),
}

impl<'a> Secret<'a> {
    pub fn parse(raw: &'a str) -> Self {
        if let Some(path) = raw.strip_prefix("pass::") {
            Self::Pass(path)
        } else if let Some(var) = raw.strip_prefix("env::") {
            Self::Env(var)
        } else {
            Self::Plain(raw)
        }
    }

    /// Returns true if the value lives outside the config file.
    pub fn is_reference(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }

    fn resolve(&self) -> Result<String, String> {
        match *self {
            Self::Plain(value) => Ok(value.to_string()),
            Self::Env(var) => {
                std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
            }
            Self::Pass(path) => first_line_of_pass(path),
        }
    }
}

fn first_line_of_pass(path: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;
    if !output.status.success() {
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` printed nothing", path))
}

/// The login field a value fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Password,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Id => "id",
            Self::Password => "password",
        })
    }
}

/// A login value that could not be turned into a usable credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretError {
    pub region: Region,
    pub field: Field,
    pub reason: String,
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot resolve {}.{} (region {}): {}",
            self.region.provider_name(),
            self.field,
            self.region,
            self.reason
        )
    }
}

impl std::error::Error for SecretError {}

/// Resolves the configured `id` and `password` of `region` into a credential.
///
/// A value that resolves to nothing is an error; the site would reject the
/// login anyway and the message is clearer here.
pub fn resolve_login(region: Region, id: &str, password: &str) -> Result<Credential, SecretError> {
    let resolve = |field: Field, raw: &str| -> Result<String, SecretError> {
        let value = Secret::parse(raw).resolve().map_err(|reason| SecretError {
            region,
            field,
            reason,
        })?;
        if value.trim().is_empty() {
            return Err(SecretError {
                region,
                field,
                reason: "resolved to an empty value".to_string(),
            });
        }
        Ok(value)
    };
    let id = resolve(Field::Id, id)?;
    let password = resolve(Field::Password, password)?;
    Ok(Credential::new(region, id, password))
}

/// A password as it may be shown: references verbatim, plain text masked.
pub fn redact(raw: &str) -> String {
    if Secret::parse(raw).is_reference() {
        raw.to_string()
    } else {
        MASK.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefixes() {
        assert_eq!(Secret::parse("hunter2"), Secret::Plain("hunter2"));
        assert_eq!(Secret::parse("pass::courtside/nowon"), Secret::Pass("courtside/nowon"));
        assert_eq!(Secret::parse("env::NOWON_PW"), Secret::Env("NOWON_PW"));
        assert!(!Secret::parse("hunter2").is_reference());
    }

    #[test]
    fn plain_login_resolves() {
        let credential = resolve_login(Region::A, "kim", "pw-a").unwrap();
        assert_eq!(credential.region, Region::A);
        assert_eq!(credential.id, "kim");
        assert_eq!(credential.password(), "pw-a");
    }

    #[test]
    fn env_password_resolves() {
        unsafe {
            std::env::set_var("_COURTSIDE_SECRET_DOBONG", "from-env");
        }
        let credential = resolve_login(Region::B, "lee", "env::_COURTSIDE_SECRET_DOBONG");
        unsafe {
            std::env::remove_var("_COURTSIDE_SECRET_DOBONG");
        }
        assert_eq!(credential.unwrap().password(), "from-env");
    }

    #[test]
    fn missing_env_var_names_the_site_field() {
        let err = resolve_login(Region::B, "lee", "env::_COURTSIDE_SECRET_UNSET_12345").unwrap_err();
        assert_eq!(err.field, Field::Password);
        let shown = err.to_string();
        assert!(shown.starts_with("cannot resolve dobong.password (region B)"));
        assert!(shown.contains("_COURTSIDE_SECRET_UNSET_12345"));
    }

    #[test]
    fn empty_id_is_rejected() {
        let err = resolve_login(Region::A, "  ", "pw").unwrap_err();
        assert_eq!(err.field, Field::Id);
        assert_eq!(err.reason, "resolved to an empty value");
    }

    #[test]
    fn unknown_pass_entry_errors() {
        let err = resolve_login(Region::A, "kim", "pass::nonexistent/courtside/12345").unwrap_err();
        assert_eq!(err.field, Field::Password);
    }

    #[test]
    fn redact_keeps_only_references() {
        assert_eq!(redact("hunter2"), MASK);
        assert_eq!(redact("env::NOWON_PW"), "env::NOWON_PW");
        assert_eq!(redact("pass::courtside/nowon"), "pass::courtside/nowon");
    }
}
