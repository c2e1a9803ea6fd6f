use std::path::PathBuf;

use config::{Config, ConfigError};
use gl_feed::FeedConfig;
use gl_gimbal::{GimbalConfig, InterpreterConfig};
use gl_llm::LlmConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GimbalLlmConfig {
    pub llm: LlmConfig,
    pub gimbal: GimbalConfig,
    pub interpreter: InterpreterConfig,
    pub feed: FeedConfig,
}

/// Unprefixed variables that older setups export.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("LLM_PROVIDER", "llm.provider"),
    ("OLLAMA_URL", "llm.ollama.url"),
    ("OPENAI_API_KEY", "llm.openai.api_key"),
];

impl GimbalLlmConfig {
    /// Reads the optional config file, then `GIMBAL_*` variables (nested keys
    /// separated by `__`, e.g. `GIMBAL_LLM__PROVIDER`), then the legacy
    /// variables.
    pub fn read_from_path(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::read_with_env(path, |key| std::env::var(key).ok())
    }

    fn read_with_env<F: Fn(&str) -> Option<String>>(
        path: Option<PathBuf>,
        env: F,
    ) -> Result<Self, ConfigError> {
        let mut c = Config::new();

        if let Some(path) = path {
            c.merge(config::File::from(path))?;
        }

        c.merge(config::Environment::with_prefix("GIMBAL").separator("__"))?;

        for (var, key) in LEGACY_ENV {
            if let Some(value) = env(var).filter(|v| !v.is_empty()) {
                let value = if *key == "llm.provider" {
                    value.to_lowercase()
                } else {
                    value
                };
                c.set(key, value)?;
            }
        }

        c.try_into()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use gl_llm::LlmProvider;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_without_file() {
        let config = GimbalLlmConfig::read_with_env(None, no_env).unwrap();

        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.llm.ollama.url, "http://localhost:11434");
        assert_eq!(config.gimbal.default_speed, 5);
        assert_eq!(config.interpreter.default_magnitude, 15.0);
        assert_eq!(config.feed.tick_ms, 16);
    }

    #[test]
    fn file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("gimbal-llm-test-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[llm]
provider = "openai"
timeout_ms = 5000

[llm.openai]
model = "gpt-4o-mini"

[gimbal]
manual_step = 5.0

[gimbal.limits]
pan = 90.0

[interpreter]
slow_speed = 1
"#
        )
        .unwrap();

        let config = GimbalLlmConfig::read_with_env(Some(path.clone()), no_env);
        let _ = std::fs::remove_file(&path);
        let config = config.unwrap();

        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert_eq!(config.llm.timeout_ms, 5000);
        assert_eq!(config.llm.openai.model, "gpt-4o-mini");
        assert_eq!(config.gimbal.manual_step, 5.0);
        assert_eq!(config.gimbal.limits.limit(gl_gimbal::Axis::Pan), 90.0);
        assert_eq!(config.gimbal.limits.limit(gl_gimbal::Axis::Tilt), 90.0);
        assert_eq!(config.interpreter.slow_speed, 1);
        assert_eq!(config.interpreter.fast_speed, 8);
    }

    #[test]
    fn legacy_variables_are_honoured() {
        let env = |key: &str| match key {
            "LLM_PROVIDER" => Some("OpenAI".to_owned()),
            "OPENAI_API_KEY" => Some("sk-legacy".to_owned()),
            _ => None,
        };

        let config = GimbalLlmConfig::read_with_env(None, env).unwrap();

        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert_eq!(config.llm.openai.api_key.as_deref(), Some("sk-legacy"));
    }
}
