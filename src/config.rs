//! Configuração do job-poller carregada a partir de `job-poller.toml`.
//!
//! A struct [`PollerConfig`] contém os parâmetros da execução: intervalo de
//! espera entre consultas, prazo total da execução e nível de log do
//! histórico. Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `JOB_POLLER_TIMEOUT_SECONDS` tem precedência sobre o arquivo,
//! e as flags da CLI ([`Overrides`]) têm precedência sobre ambos.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::history::LogLevel;
use crate::workflow::WorkflowDefinition;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "job-poller.toml";

/// Variável de ambiente que sobrescreve `timeout_seconds`.
pub const TIMEOUT_ENV: &str = "JOB_POLLER_TIMEOUT_SECONDS";

/// Valores vindos das flags da CLI; têm precedência sobre arquivo e ambiente.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub wait_seconds: Option<u64>,
    pub timeout_seconds: Option<u64>,
    pub log_level: Option<LogLevel>,
}

/// Configuração de nível superior carregada de `job-poller.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollerConfig {
    /// Segundos de espera no estado `Wait` antes de consultar o job novamente.
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: u64,

    /// Prazo total da execução, em segundos.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Quais eventos do histórico da execução são registrados.
    #[serde(default)]
    pub log_level: LogLevel,
}

// Valor padrão para a espera: 2 segundos.
fn default_wait_seconds() -> u64 {
    2
}

// Valor padrão para o prazo total: 30 segundos.
fn default_timeout_seconds() -> u64 {
    30
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            wait_seconds: default_wait_seconds(),
            timeout_seconds: default_timeout_seconds(),
            log_level: LogLevel::default(),
        }
    }
}

impl PollerConfig {
    /// Carrega a configuração de `path`, ou de `job-poller.toml` no diretório
    /// atual quando nenhum caminho é informado, e aplica as sobrescritas.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::resolve(path, std::env::var(TIMEOUT_ENV).ok(), overrides)
    }

    /// Precedência: arquivo, depois a variável de ambiente, depois as flags
    /// da CLI. A validação só roda no fim, sobre o resultado final.
    pub fn resolve(
        path: Option<&Path>,
        env_timeout: Option<String>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        // A flag da CLI vence; a variável de ambiente nem é lida nesse caso.
        if overrides.timeout_seconds.is_none() {
            config.apply_timeout_override(env_timeout)?;
        }
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(wait) = overrides.wait_seconds {
            self.wait_seconds = wait;
        }
        if let Some(timeout) = overrides.timeout_seconds {
            self.timeout_seconds = timeout;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str::<PollerConfig>(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Aplica o valor da variável de ambiente, se presente e não vazio.
    pub fn apply_timeout_override(&mut self, value: Option<String>) -> Result<()> {
        if let Some(raw) = value
            && !raw.trim().is_empty()
        {
            self.timeout_seconds = raw
                .trim()
                .parse()
                .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.wait_seconds == 0 {
            bail!("wait_seconds must be greater than zero");
        }
        if self.timeout_seconds == 0 {
            bail!("timeout_seconds must be greater than zero");
        }
        Ok(())
    }

    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Monta a definição canônica do workflow com os intervalos configurados.
    pub fn definition(&self) -> WorkflowDefinition {
        WorkflowDefinition::job_poller(self.wait(), self.timeout())
    }
}
