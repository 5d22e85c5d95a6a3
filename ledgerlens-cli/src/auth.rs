use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::config::Provider;
use crate::state::ensure_ledgerlens_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AuthState {
    pub api_key: Option<String>,
}

fn auth_path() -> Result<PathBuf> {
    Ok(ensure_ledgerlens_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_auth(auth: &AuthState) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn paste_api_key() -> Result<()> {
    let mut auth = load_auth()?;
    let key = prompt_secret("Paste Azure OpenAI / OpenAI API key")?;
    if key.is_empty() {
        bail!("no key entered");
    }
    auth.api_key = Some(key);
    save_auth(&auth)?;
    println!("Saved API key to {}", auth_path()?.display());
    Ok(())
}

/// Environment variables consulted before `auth.json`, in order.
fn env_keys(provider: Provider) -> [&'static str; 2] {
    match provider {
        Provider::Azure => ["LEDGERLENS_API_KEY", "AZURE_OPENAI_API_KEY"],
        Provider::OpenAI => ["LEDGERLENS_API_KEY", "OPENAI_API_KEY"],
    }
}

/// Resolve the key: `LEDGERLENS_API_KEY`, then the provider's own variable,
/// then the stored key.
pub fn resolve_api_key(
    provider: Provider,
    env: impl Fn(&str) -> Option<String>,
    stored: &AuthState,
) -> Result<String> {
    env_keys(provider)
        .iter()
        .find_map(|k| env(k).filter(|v| !v.trim().is_empty()))
        .or_else(|| stored.api_key.clone().filter(|v| !v.trim().is_empty()))
        .with_context(|| {
            format!(
                "no API key; set {} or run: ledgerlens auth paste-api-key",
                env_keys(provider).join(" / ")
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(key: Option<&str>) -> AuthState {
        AuthState {
            api_key: key.map(str::to_string),
        }
    }

    #[test]
    fn test_env_wins_over_stored() {
        let key = resolve_api_key(
            Provider::Azure,
            |k| (k == "AZURE_OPENAI_API_KEY").then(|| "from-env".to_string()),
            &stored(Some("from-file")),
        )
        .unwrap();
        assert_eq!(key, "from-env");
    }

    #[test]
    fn test_generic_variable_first() {
        let key = resolve_api_key(
            Provider::OpenAI,
            |k| match k {
                "LEDGERLENS_API_KEY" => Some("generic".to_string()),
                "OPENAI_API_KEY" => Some("specific".to_string()),
                _ => None,
            },
            &stored(None),
        )
        .unwrap();
        assert_eq!(key, "generic");
    }

    #[test]
    fn test_falls_back_to_stored() {
        let key = resolve_api_key(Provider::OpenAI, |_| None, &stored(Some("sk-file"))).unwrap();
        assert_eq!(key, "sk-file");
    }

    #[test]
    fn test_missing_key_mentions_command() {
        let err = resolve_api_key(Provider::Azure, |_| None, &stored(Some("  "))).unwrap_err();
        assert!(err.to_string().contains("ledgerlens auth paste-api-key"));
    }
}
