use anyhow::{bail, Context, Result};
use ledgerlens_core::{GenerationParams, NormalizeOptions, PipelineConfig, PromptBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::state::ensure_ledgerlens_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub analysis: AnalysisSection,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Azure OpenAI: `model` is the deployment name.
    Azure,
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSection {
    pub provider: Provider,
    pub model: String,
    /// Azure resource endpoint, or the OpenAI-compatible API root.
    pub base_url: String,
    /// Azure only.
    pub api_version: String,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: Provider::Azure,
            model: String::new(),
            base_url: String::new(),
            api_version: "2024-02-01".to_string(),
            temperature: 0.0,
            max_tokens: 2000,
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSection {
    /// Maximum transactions per chunk.
    pub window_size: usize,
    pub institution: String,
    pub statement_language: String,
    pub delimiter: char,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        let prompts = PromptBuilder::default();
        Self {
            window_size: ledgerlens_core::DEFAULT_WINDOW.get(),
            institution: prompts.institution,
            statement_language: prompts.statement_language,
            delimiter: ';',
        }
    }
}

impl Config {
    /// Fill endpoint settings from the environment.
    ///
    /// `AZURE_OPENAI_ENDPOINT` / `AZURE_OPENAI_DEPLOYMENT` win over the file
    /// when the provider is Azure.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if self.llm.provider == Provider::Azure {
            if let Some(endpoint) = env("AZURE_OPENAI_ENDPOINT").filter(|v| !v.trim().is_empty()) {
                self.llm.base_url = endpoint;
            }
            let deployment = env("AZURE_OPENAI_DEPLOYMENT").filter(|v| !v.trim().is_empty());
            if let Some(deployment) = deployment {
                self.llm.model = deployment;
            }
        }
    }

    pub fn window(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.analysis.window_size)
            .context("analysis.window_size must be at least 1")
    }

    pub fn delimiter(&self) -> Result<u8> {
        let c = self.analysis.delimiter;
        if !c.is_ascii() {
            bail!("analysis.delimiter must be a single ASCII character, got {c:?}");
        }
        Ok(c as u8)
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            window: self.window()?,
            normalize: NormalizeOptions {
                delimiter: self.delimiter()?,
                ..NormalizeOptions::default()
            },
        })
    }

    pub fn prompt_builder(&self) -> Result<PromptBuilder> {
        Ok(PromptBuilder {
            institution: self.analysis.institution.clone(),
            statement_language: self.analysis.statement_language.clone(),
            sample_limit: self.window()?.get(),
        })
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_ledgerlens_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let mut cfg = load_config()?;
    cfg.apply_env(|k| std::env::var(k).ok());
    println!("# {}", config_path()?.display());
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}
