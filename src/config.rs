use crate::models::{StrategyKind, TestCase};
use crate::pacing::Pacer;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connection settings for the OpenAI-compatible chat completion gateway
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// API base URL; `/chat/completions` is appended
    pub api_endpoint: String,
    /// Environment variable name containing the API key
    pub env_var_api_key: String,
    /// Environment variable holding the Cloudflare Access client id, if any
    pub env_var_access_client_id: Option<String>,
    /// Environment variable holding the Cloudflare Access client secret, if any
    pub env_var_access_client_secret: Option<String>,
    /// Temperature for response generation (0.0 to 1.0)
    pub temperature: f64,
    /// Maximum tokens for response generation
    pub max_tokens: u32,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://llm.saemiro.com/v1".to_string(),
            env_var_api_key: "LITELLM_API_KEY".to_string(),
            env_var_access_client_id: Some("CF_ACCESS_CLIENT_ID".to_string()),
            env_var_access_client_secret: Some("CF_ACCESS_CLIENT_SECRET".to_string()),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_ms: 60_000,
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Model identifiers bound to the strategies
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// General-purpose model used by the RAG and vanilla strategies
    pub general: String,
    /// Domain fine-tuned model
    pub fine_tuned: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            general: "claude-wrapper".to_string(),
            fine_tuned: "cafe24-crm-llama".to_string(),
        }
    }
}

impl ModelsConfig {
    pub fn model_for(&self, kind: StrategyKind) -> &str {
        match kind {
            StrategyKind::OntologyRag | StrategyKind::Vanilla => &self.general,
            StrategyKind::FineTuned => &self.fine_tuned,
        }
    }
}

/// Retrieval settings for the ontology + RAG strategy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Vector store collection queried for context
    pub collection: String,
    /// Context handed to the model when no live retrieval backend is wired
    pub context: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            collection: "cafe24_api_docs".to_string(),
            context: "[RAG Context: Cafe24 API documentation context would be retrieved here]"
                .to_string(),
        }
    }
}

/// Root configuration for one A/B/C experiment
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory receiving the results and report JSON files
    pub output_dir: PathBuf,
    /// Fixed delay between consecutive gateway calls, in milliseconds
    pub pacing_ms: u64,
    /// Minimum-interval pacing in requests per second; overrides `pacing_ms` when set
    pub rate_limit_rps: Option<f64>,
    /// Strategies to run, in execution order
    pub strategies: Vec<StrategyKind>,
    pub gateway: GatewayConfig,
    pub models: ModelsConfig,
    pub retrieval: RetrievalConfig,
    pub test_cases: Vec<TestCase>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("experiments"),
            pacing_ms: 1000,
            rate_limit_rps: None,
            strategies: StrategyKind::ALL.to_vec(),
            gateway: GatewayConfig::default(),
            models: ModelsConfig::default(),
            retrieval: RetrievalConfig::default(),
            test_cases: default_test_cases(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;

        Ok(config)
    }

    /// Reject settings that deserialize but cannot drive an experiment
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for kind in &self.strategies {
            if !seen.insert(kind) {
                bail!("Strategy {} is listed more than once", kind);
            }
        }

        self.pacer()?;
        Ok(())
    }

    /// Pacing policy for the experiment driver
    pub fn pacer(&self) -> Result<Pacer> {
        match self.rate_limit_rps {
            Some(rps) => Pacer::per_second(rps)
                .with_context(|| format!("rate_limit_rps = {} does not give a usable interval", rps)),
            None => Ok(Pacer::fixed(Duration::from_millis(self.pacing_ms))),
        }
    }
}

/// Credentials resolved from the environment variables named in [`GatewayConfig`]
#[derive(Debug, Clone, Default)]
pub struct GatewayCredentials {
    pub api_key: String,
    pub access_client_id: Option<String>,
    pub access_client_secret: Option<String>,
}

impl GatewayCredentials {
    /// Read credentials; the API key is mandatory, Access headers are optional
    pub fn from_env(config: &GatewayConfig) -> Result<Self> {
        let api_key = std::env::var(&config.env_var_api_key)
            .with_context(|| format!("Environment variable {} not found", config.env_var_api_key))?;

        let optional = |name: &Option<String>| name.as_ref().and_then(|n| std::env::var(n).ok());

        Ok(Self {
            api_key,
            access_client_id: optional(&config.env_var_access_client_id),
            access_client_secret: optional(&config.env_var_access_client_secret),
        })
    }
}

/// CRM API questions used when the configuration defines none
pub fn default_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::new(
            "customer_lookup",
            "Cafe24 고객 조회 API를 사용해서 특정 고객의 정보를 가져오는 방법을 알려줘.",
            &["customers", "GET", "member_id", "API endpoint"],
        ),
        TestCase::new(
            "order_status",
            "주문 상태를 변경하는 API 호출 코드를 Python으로 작성해줘.",
            &["orders", "PUT", "order_id", "status", "requests"],
        ),
        TestCase::new(
            "product_inventory",
            "상품 재고를 업데이트하는 API 사용법을 설명해줘.",
            &["products", "variants", "stock", "quantity"],
        ),
        TestCase::new(
            "customer_segment",
            "VIP 고객 세그먼트를 생성하는 방법을 알려줘.",
            &["segment", "criteria", "customers", "filter"],
        ),
        TestCase::new(
            "campaign_create",
            "이메일 캠페인을 생성하고 발송하는 API 흐름을 설명해줘.",
            &["campaign", "email", "recipients", "template"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::PacingPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_parsing() {
        let toml_content = r#"
output_dir = "/tmp/abc"
pacing_ms = 250
strategies = ["vanilla", "ontology_rag"]

[gateway]
api_endpoint = "http://localhost:4000/v1"
env_var_api_key = "TEST_GATEWAY_KEY"
temperature = 0.2
max_tokens = 200
timeout_ms = 5000

[models]
general = "gpt-4o"
fine_tuned = "crm-ft"

[retrieval]
collection = "docs"
context = "orders live under /api/v2/admin/orders"

[[test_cases]]
id = "order_status"
prompt = "Change an order status"
expected_elements = ["orders", "PUT"]

[[test_cases]]
id = "no_expectations"
prompt = "Say hi"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/abc"));
        assert_eq!(
            config.pacer().unwrap().policy(),
            PacingPolicy::FixedDelay(Duration::from_millis(250))
        );
        assert_eq!(
            config.strategies,
            vec![StrategyKind::Vanilla, StrategyKind::OntologyRag]
        );
        assert_eq!(config.gateway.api_endpoint, "http://localhost:4000/v1");
        assert_eq!(config.gateway.temperature, 0.2);
        assert_eq!(config.gateway.max_tokens, 200);
        assert_eq!(config.gateway.timeout(), Duration::from_secs(5));
        // Unset optional fields inside a present table keep their defaults
        assert_eq!(
            config.gateway.env_var_access_client_id.as_deref(),
            Some("CF_ACCESS_CLIENT_ID")
        );
        assert_eq!(config.models.model_for(StrategyKind::Vanilla), "gpt-4o");
        assert_eq!(config.models.model_for(StrategyKind::FineTuned), "crm-ft");
        assert_eq!(config.retrieval.collection, "docs");
        assert_eq!(config.test_cases.len(), 2);
        assert_eq!(config.test_cases[0].expected_elements, vec!["orders", "PUT"]);
        assert!(config.test_cases[1].expected_elements.is_empty());
    }

    #[test]
    fn test_config_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "").unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pacing_ms, 1000);
        assert_eq!(
            config.pacer().unwrap().policy(),
            PacingPolicy::FixedDelay(Duration::from_secs(1))
        );
        assert_eq!(config.strategies, StrategyKind::ALL.to_vec());
        assert_eq!(config.gateway.temperature, 0.7);
        assert_eq!(config.gateway.max_tokens, 1000);
        assert_eq!(config.gateway.timeout(), Duration::from_secs(60));
        assert_eq!(config.models.model_for(StrategyKind::OntologyRag), "claude-wrapper");
        assert_eq!(config.models.model_for(StrategyKind::FineTuned), "cafe24-crm-llama");
        assert_eq!(config.test_cases.len(), 5);
    }

    #[test]
    fn test_rate_limit_overrides_fixed_pacing() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "pacing_ms = 500\nrate_limit_rps = 4.0\n").unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(
            config.pacer().unwrap().policy(),
            PacingPolicy::MinInterval(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_zero_pacing_disables_delay() {
        let config = Config {
            pacing_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.pacer().unwrap().policy(), PacingPolicy::Unpaced);
    }

    #[test]
    fn test_config_missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/abc.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_config_rejects_unknown_strategy() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "strategies = [\"few_shot\"]").unwrap();

        assert!(Config::from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_default_test_case_ids_are_unique() {
        let cases = default_test_cases();
        let mut ids: Vec<_> = cases.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), cases.len());
        assert!(cases.iter().all(|c| !c.expected_elements.is_empty()));
    }

    #[test]
    fn test_credentials_missing_api_key() {
        let config = GatewayConfig {
            env_var_api_key: "CRM_ABC_EVAL_SURELY_UNSET_KEY".to_string(),
            ..GatewayConfig::default()
        };

        let result = GatewayCredentials::from_env(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_config_rejects_duplicate_strategies() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "strategies = [\"vanilla\", \"fine_tuned\", \"vanilla\"]").unwrap();

        let err = Config::from_file(temp_file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("more than once"));
    }

    #[test]
    fn test_config_rejects_unusable_rate_limit() {
        for rate in ["nan", "1e-300"] {
            let mut temp_file = NamedTempFile::new().unwrap();
            write!(temp_file, "rate_limit_rps = {}", rate).unwrap();

            let err = Config::from_file(temp_file.path()).unwrap_err();
            assert!(format!("{:#}", err).contains("rate_limit_rps"), "{} was accepted", rate);
        }
    }

    #[test]
    fn test_default_test_cases_keep_korean_prompts() {
        let cases = default_test_cases();
        assert_eq!(cases[1].id, "order_status");
        assert_eq!(cases[1].prompt, "주문 상태를 변경하는 API 호출 코드를 Python으로 작성해줘.");
    }
}
