//! Configuração do Mutirão carregada a partir de `mutirao.toml`.
//!
//! A struct [`MutiraoConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `MUTIRAO_LOG_FILE` tem precedência sobre o arquivo.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Configuração de nível superior carregada de `mutirao.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct MutiraoConfig {
    /// Caminho do arquivo de log append-only. Sem arquivo quando ausente.
    #[serde(default)]
    pub log_file: Option<String>,

    /// Intervalo de sondagem, em milissegundos, usado pelo drain do
    /// registro ao aguardar jobs em execução.
    #[serde(default = "default_drain_poll_ms")]
    pub drain_poll_ms: u64,
}

// Valor padrão para o intervalo de sondagem do drain: 100ms.
fn default_drain_poll_ms() -> u64 {
    100
}

impl Default for MutiraoConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            drain_poll_ms: default_drain_poll_ms(),
        }
    }
}

impl MutiraoConfig {
    /// Carrega a configuração de `mutirao.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        let path = Path::new("mutirao.toml");
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<MutiraoConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração.
        if let Ok(log_file) = std::env::var("MUTIRAO_LOG_FILE")
            && !log_file.is_empty()
        {
            config.log_file = Some(log_file);
        }

        Ok(config)
    }

    /// Intervalo de sondagem do drain como [`Duration`].
    pub fn drain_poll(&self) -> Duration {
        Duration::from_millis(self.drain_poll_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = MutiraoConfig::default();
        assert!(config.log_file.is_none());
        assert_eq!(config.drain_poll_ms, 100);
        assert_eq!(config.drain_poll(), Duration::from_millis(100));
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            log_file = "jobs.log"
        "#;
        let config: MutiraoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_file.as_deref(), Some("jobs.log"));
        assert_eq!(config.drain_poll_ms, 100);
    }

    #[test]
    fn deserialize_full_toml() {
        let toml_str = r#"
            log_file = "/tmp/mutirao.log"
            drain_poll_ms = 25
        "#;
        let config: MutiraoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.drain_poll(), Duration::from_millis(25));
    }
}
