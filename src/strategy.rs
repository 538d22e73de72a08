use crate::config::Config;
use crate::error::ProviderError;
use crate::gateway::{Gateway, system_message, user_message};
use crate::models::{Generation, StrategyKind};
use crate::retrieval::Retriever;
use async_openai::types::ChatCompletionRequestMessage;
use async_trait::async_trait;
use std::sync::Arc;

const DOMAIN_EXPERT_PROMPT: &str = "당신은 Cafe24 CRM API 전문가입니다.";

const GENERIC_ASSISTANT_PROMPT: &str = "당신은 도움이 되는 AI 어시스턴트입니다.";

const CRM_ONTOLOGY: &str = "CRM 온톨로지:
- Customer: 고객 정보 (PLACES → Order, HAS_ADDRESS → Address)
- Order: 주문 정보 (CONTAINS → OrderItem, PAID_BY → Payment)
- Product: 상품 정보 (BELONGS_TO → Category)
- Campaign: 마케팅 캠페인 (TARGETS → CustomerSegment)";

/// Anything that turns a prompt into an answer for one strategy slot
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn generate(&self, prompt: &str) -> Result<Generation, ProviderError>;
}

/// Gateway-backed implementation of one [`StrategyKind`]
pub struct Strategy {
    kind: StrategyKind,
    model: String,
    max_tokens: u32,
    collection: String,
    gateway: Arc<Gateway>,
    retriever: Arc<dyn Retriever>,
}

impl Strategy {
    pub fn new(
        kind: StrategyKind,
        config: &Config,
        gateway: Arc<Gateway>,
        retriever: Arc<dyn Retriever>,
    ) -> Self {
        Self {
            kind,
            model: config.models.model_for(kind).to_string(),
            max_tokens: config.gateway.max_tokens,
            collection: config.retrieval.collection.clone(),
            gateway,
            retriever,
        }
    }

    /// Build the configured strategies in configuration order
    pub fn from_config(
        config: &Config,
        gateway: Arc<Gateway>,
        retriever: Arc<dyn Retriever>,
    ) -> Vec<Strategy> {
        config
            .strategies
            .iter()
            .map(|&kind| Strategy::new(kind, config, gateway.clone(), retriever.clone()))
            .collect()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn messages_for(&self, prompt: &str) -> Result<Vec<ChatCompletionRequestMessage>, ProviderError> {
        let system = match self.kind {
            StrategyKind::OntologyRag => {
                let context = self.retriever.retrieve_context(prompt, &self.collection).await;
                ontology_rag_system_prompt(&context)
            }
            StrategyKind::FineTuned => DOMAIN_EXPERT_PROMPT.to_string(),
            StrategyKind::Vanilla => GENERIC_ASSISTANT_PROMPT.to_string(),
        };

        Ok(vec![system_message(system)?, user_message(prompt)?])
    }
}

#[async_trait]
impl AnswerProvider for Strategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn generate(&self, prompt: &str) -> Result<Generation, ProviderError> {
        let messages = self.messages_for(prompt).await?;
        let completion = self
            .gateway
            .call_model(&self.model, messages, self.max_tokens)
            .await?;

        Ok(Generation {
            text: completion.content,
            latency_ms: completion.latency_ms,
            token_count: completion.token_count,
        })
    }
}

/// System prompt embedding retrieved context and the CRM ontology
fn ontology_rag_system_prompt(context: &str) -> String {
    let context = if context.trim().is_empty() {
        "(추가 컨텍스트 없음)"
    } else {
        context
    };

    format!(
        "{}\n다음 컨텍스트를 참고하여 답변하세요:\n\n{}\n\n{}",
        DOMAIN_EXPERT_PROMPT, context, CRM_ONTOLOGY
    )
}
