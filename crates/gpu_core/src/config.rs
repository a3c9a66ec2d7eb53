//! Configuração via TOML.
//!
//! Um único `config.toml` ao lado do executável; ausência ou erro de
//! parse cai nos valores padrão sem abortar.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Configuração do poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Intervalo entre ciclos de coleta em segundos
    pub interval_secs: f64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 0.5,
        }
    }
}

impl PollerConfig {
    /// Intervalo de coleta como [`Duration`].
    ///
    /// Só é seguro após `validate()` passar (intervalo finito e positivo).
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub poller: PollerConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // `contains` é falso para NaN, então NaN/inf também caem aqui
        if !(0.1..=60.0).contains(&self.poller.interval_secs) {
            errors.push(format!(
                "Intervalo do poller inválido: {} (0.1–60.0)",
                self.poller.interval_secs
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
        assert_eq!(config.poller.interval_secs, 0.5);
    }

    #[test]
    fn roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.poller.interval_secs, parsed.poller.interval_secs);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[poller]
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.poller.interval_secs, 0.5);
    }

    #[test]
    fn rejects_non_finite_interval() {
        let config: AppConfig = toml::from_str("[poller]\ninterval_secs = nan").unwrap();
        assert_eq!(config.validate().len(), 1);

        let config: AppConfig = toml::from_str("[poller]\ninterval_secs = inf").unwrap();
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn interval_converts_to_duration() {
        let config: AppConfig = toml::from_str("[poller]\ninterval_secs = 2.5").unwrap();
        assert_eq!(config.poller.interval(), Duration::from_millis(2500));
    }

    #[test]
    fn rejects_out_of_range_interval() {
        let config: AppConfig = toml::from_str("[poller]\ninterval_secs = 0.0").unwrap();
        assert_eq!(config.validate().len(), 1);

        let config: AppConfig = toml::from_str("[poller]\ninterval_secs = 120.0").unwrap();
        assert_eq!(config.validate().len(), 1);
    }
}
