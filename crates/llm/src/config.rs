use serde::Deserialize;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Local Ollama server.
    Ollama,

    /// Any OpenAI-compatible chat completions endpoint.
    #[serde(alias = "open_ai")]
    OpenAi,

    /// No model at all; the operator's text is interpreted directly.
    Offline,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        OllamaConfig {
            url: "http://localhost:11434".into(),
            model: "llama3.2:1b".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-3.5-turbo".into(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub ollama: OllamaConfig,
    pub openai: OpenAiConfig,

    /// How long to wait for a reply before giving up on a request.
    pub timeout_ms: u64,

    pub temperature: Option<f32>,

    /// Replaces the built-in system prompt.
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            provider: LlmProvider::Ollama,
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
            timeout_ms: 30_000,
            temperature: Some(0.0),
            system_prompt: None,
        }
    }
}

impl LlmConfig {
    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::DEFAULT_SYSTEM_PROMPT)
    }
}
