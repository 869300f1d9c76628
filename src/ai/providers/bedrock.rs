//! AWS Bedrock InvokeModel
//!
//! Bedrock hosts several model families behind one endpoint and each one
//! wants its own payload. The family is read off the model id (ARNs and
//! cross-region prefixes are stripped first); unknown ids get a generic
//! `{prompt, max_tokens, temperature, top_p}` body and a warning.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::warn;

use super::sigv4::{self, uri_encode, SigningParams};
use super::{optional_u64, parse_json, required_str, to_body, ProviderAdapter};
use crate::ai::config::{Credentials, ProviderConfig};
use crate::ai::error::AiError;
use crate::ai::http_client::WireRequest;
use crate::ai::types::TokenUsage;

const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const SIGNING_SERVICE: &str = "bedrock";
const DEFAULT_TOP_P: f64 = 0.9;

/// `arn:aws:bedrock:<region>:<account>:<resource-type>/<id>`
static MODEL_ARN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^arn:aws[a-z-]*:bedrock:[^:]*:[^:]*:[a-z-]+/(.+)$").expect("valid ARN pattern")
});

/// Cross-region inference profile prefixes (`us.anthropic.claude-...`)
static REGION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(us|eu|apac|us-gov|global)\.").expect("valid prefix pattern"));

/// Payload families Bedrock accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Anthropic Messages-style
    Anthropic,
    AmazonTitan,
    AmazonNova,
    Llama2,
    /// Llama 3 and later (header-token prompt template)
    Llama3,
    Mistral,
    /// Cohere Command R / R+ (chat shape)
    CohereCommandR,
    /// Cohere Command (text generation shape)
    CohereCommand,
    Ai21Jamba,
    Ai21Jurassic,
    Stability,
    /// Unrecognized id, generic body
    Generic,
}

/// Strip an ARN down to the trailing model or profile id
pub fn strip_model_arn(model_id: &str) -> &str {
    MODEL_ARN
        .captures(model_id)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(model_id)
}

/// Resolve the payload family for a model id or ARN
pub fn model_family(model_id: &str) -> ModelFamily {
    let id = strip_model_arn(model_id).to_lowercase();
    let id = REGION_PREFIX.replace(&id, "");

    if id.starts_with("anthropic.") {
        ModelFamily::Anthropic
    } else if id.starts_with("amazon.titan") {
        ModelFamily::AmazonTitan
    } else if id.starts_with("amazon.nova") {
        ModelFamily::AmazonNova
    } else if id.starts_with("meta.llama2") {
        ModelFamily::Llama2
    } else if id.starts_with("meta.llama") {
        ModelFamily::Llama3
    } else if id.starts_with("mistral.") {
        ModelFamily::Mistral
    } else if id.starts_with("cohere.command-r") {
        ModelFamily::CohereCommandR
    } else if id.starts_with("cohere.command") {
        ModelFamily::CohereCommand
    } else if id.starts_with("ai21.jamba") {
        ModelFamily::Ai21Jamba
    } else if id.starts_with("ai21.") {
        ModelFamily::Ai21Jurassic
    } else if id.starts_with("stability.") {
        ModelFamily::Stability
    } else {
        ModelFamily::Generic
    }
}

/// Request body for `model_id`; pure apart from the fallback warning
pub fn bedrock_body(model_id: &str, prompt: &str, config: &ProviderConfig) -> Value {
    let system = config.system_prompt.as_deref();
    let max_tokens = config.max_tokens;
    let temperature = config.temperature;

    match model_family(model_id) {
        ModelFamily::Anthropic => {
            let mut body = json!({
                "anthropic_version": BEDROCK_ANTHROPIC_VERSION,
                "max_tokens": max_tokens,
                "temperature": temperature,
                "messages": [
                    {"role": "user", "content": [{"type": "text", "text": prompt}]}
                ]
            });
            if let Some(system) = system {
                body["system"] = json!(system);
            }
            body
        }
        ModelFamily::AmazonTitan => json!({
            "inputText": with_system_preamble(system, prompt),
            "textGenerationConfig": {
                "maxTokenCount": max_tokens,
                "temperature": temperature,
                "topP": DEFAULT_TOP_P
            }
        }),
        ModelFamily::AmazonNova => {
            let mut body = json!({
                "schemaVersion": "messages-v1",
                "messages": [{"role": "user", "content": [{"text": prompt}]}],
                "inferenceConfig": {"maxTokens": max_tokens, "temperature": temperature}
            });
            if let Some(system) = system {
                body["system"] = json!([{"text": system}]);
            }
            body
        }
        ModelFamily::Llama2 => {
            let text = match system {
                Some(system) => format!("<s>[INST] <<SYS>>\n{}\n<</SYS>>\n\n{} [/INST]", system, prompt),
                None => format!("<s>[INST] {} [/INST]", prompt),
            };
            json!({
                "prompt": text,
                "max_gen_len": max_tokens,
                "temperature": temperature,
                "top_p": DEFAULT_TOP_P
            })
        }
        ModelFamily::Llama3 => {
            let mut text = String::from("<|begin_of_text|>");
            if let Some(system) = system {
                text.push_str(&format!(
                    "<|start_header_id|>system<|end_header_id|>\n\n{}<|eot_id|>",
                    system
                ));
            }
            text.push_str(&format!(
                "<|start_header_id|>user<|end_header_id|>\n\n{}<|eot_id|><|start_header_id|>assistant<|end_header_id|>\n\n",
                prompt
            ));
            json!({
                "prompt": text,
                "max_gen_len": max_tokens,
                "temperature": temperature,
                "top_p": DEFAULT_TOP_P
            })
        }
        ModelFamily::Mistral => json!({
            "prompt": format!("<s>[INST] {} [/INST]", with_system_preamble(system, prompt)),
            "max_tokens": max_tokens,
            "temperature": temperature,
            "top_p": DEFAULT_TOP_P
        }),
        ModelFamily::CohereCommandR => {
            let mut body = json!({
                "message": prompt,
                "max_tokens": max_tokens,
                "temperature": temperature
            });
            if let Some(system) = system {
                body["preamble"] = json!(system);
            }
            body
        }
        ModelFamily::CohereCommand => json!({
            "prompt": with_system_preamble(system, prompt),
            "max_tokens": max_tokens,
            "temperature": temperature
        }),
        ModelFamily::Ai21Jamba => {
            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(json!({"role": "system", "content": system}));
            }
            messages.push(json!({"role": "user", "content": prompt}));
            json!({
                "messages": messages,
                "max_tokens": max_tokens,
                "temperature": temperature
            })
        }
        ModelFamily::Ai21Jurassic => json!({
            "prompt": with_system_preamble(system, prompt),
            "maxTokens": max_tokens,
            "temperature": temperature
        }),
        ModelFamily::Stability => json!({
            "prompt": prompt,
            "mode": "text-to-image",
            "output_format": "png"
        }),
        ModelFamily::Generic => {
            warn!(
                model = model_id,
                "Unrecognized Bedrock model family, using generic prompt body"
            );
            json!({
                "prompt": with_system_preamble(system, prompt),
                "max_tokens": max_tokens,
                "temperature": temperature,
                "top_p": DEFAULT_TOP_P
            })
        }
    }
}

fn with_system_preamble(system: Option<&str>, prompt: &str) -> String {
    match system {
        Some(system) => format!("{}\n\n{}", system, prompt),
        None => prompt.to_string(),
    }
}

/// Bedrock adapter; the response family is fixed at construction
pub struct BedrockAdapter {
    family: ModelFamily,
}

impl BedrockAdapter {
    pub fn new(model_id: &str) -> Self {
        Self {
            family: model_family(model_id),
        }
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    fn parse_family(family: ModelFamily, value: &Value) -> Result<(String, TokenUsage), AiError> {
        match family {
            ModelFamily::Anthropic => {
                let text = value
                    .get("content")
                    .and_then(Value::as_array)
                    .map(|blocks| {
                        blocks
                            .iter()
                            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                            .filter_map(|b| b.get("text").and_then(Value::as_str))
                            .collect::<Vec<_>>()
                            .join("")
                    })
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| AiError::ResponseFormat("missing content[].text".to_string()))?;
                Ok((
                    text,
                    TokenUsage::new(
                        optional_u64(value, "/usage/input_tokens"),
                        optional_u64(value, "/usage/output_tokens"),
                        None,
                    ),
                ))
            }
            ModelFamily::AmazonTitan => Ok((
                required_str(value, "/results/0/outputText")?.to_string(),
                TokenUsage::new(
                    optional_u64(value, "/inputTextTokenCount"),
                    optional_u64(value, "/results/0/tokenCount"),
                    None,
                ),
            )),
            ModelFamily::AmazonNova => Ok((
                required_str(value, "/output/message/content/0/text")?.to_string(),
                TokenUsage::new(
                    optional_u64(value, "/usage/inputTokens"),
                    optional_u64(value, "/usage/outputTokens"),
                    optional_u64(value, "/usage/totalTokens"),
                ),
            )),
            ModelFamily::Llama2 | ModelFamily::Llama3 => Ok((
                required_str(value, "/generation")?.to_string(),
                TokenUsage::new(
                    optional_u64(value, "/prompt_token_count"),
                    optional_u64(value, "/generation_token_count"),
                    None,
                ),
            )),
            ModelFamily::Mistral => Ok((
                required_str(value, "/outputs/0/text")?.to_string(),
                TokenUsage::default(),
            )),
            ModelFamily::CohereCommandR => Ok((
                required_str(value, "/text")?.to_string(),
                TokenUsage::new(
                    optional_u64(value, "/meta/billed_units/input_tokens"),
                    optional_u64(value, "/meta/billed_units/output_tokens"),
                    None,
                ),
            )),
            ModelFamily::CohereCommand => Ok((
                required_str(value, "/generations/0/text")?.to_string(),
                TokenUsage::default(),
            )),
            ModelFamily::Ai21Jamba => Ok((
                required_str(value, "/choices/0/message/content")?.to_string(),
                TokenUsage::new(
                    optional_u64(value, "/usage/prompt_tokens"),
                    optional_u64(value, "/usage/completion_tokens"),
                    optional_u64(value, "/usage/total_tokens"),
                ),
            )),
            ModelFamily::Ai21Jurassic => Ok((
                required_str(value, "/completions/0/data/text")?.to_string(),
                TokenUsage::default(),
            )),
            ModelFamily::Stability => {
                let image = required_str(value, "/images/0")
                    .or_else(|_| required_str(value, "/artifacts/0/base64"))?;
                Ok((image.to_string(), TokenUsage::default()))
            }
            ModelFamily::Generic => {
                const CANDIDATES: [&str; 6] = [
                    "/completion",
                    "/generation",
                    "/outputs/0/text",
                    "/text",
                    "/outputText",
                    "/results/0/outputText",
                ];
                CANDIDATES
                    .iter()
                    .find_map(|p| value.pointer(p).and_then(Value::as_str))
                    .map(|text| (text.to_string(), TokenUsage::default()))
                    .ok_or_else(|| AiError::ResponseFormat("no known text field in response".to_string()))
            }
        }
    }
}

impl ProviderAdapter for BedrockAdapter {
    fn name(&self) -> &'static str {
        "bedrock"
    }

    fn build_request(&self, prompt: &str, config: &ProviderConfig) -> Result<WireRequest, AiError> {
        let body = to_body(&bedrock_body(&config.model, prompt, config))?;
        let url = format!(
            "{}/model/{}/invoke",
            config.endpoint.trim_end_matches('/'),
            uri_encode(&config.model)
        );
        let request = WireRequest::post_json(url, body).with_header("accept", "application/json");

        match &config.credentials {
            Credentials::ApiKey { key } => Ok(request.with_header("authorization", format!("Bearer {}", key))),
            Credentials::Aws {
                access_key_id,
                secret_access_key,
                session_token,
                region,
            } => {
                let mut request = request;
                let params = SigningParams {
                    access_key_id,
                    secret_access_key,
                    session_token: session_token.as_deref(),
                    region,
                    service: SIGNING_SERVICE,
                };
                sigv4::sign(&mut request, &params, Utc::now())?;
                Ok(request)
            }
            Credentials::None => Err(AiError::InvalidRequest(
                "no AWS credentials configured for bedrock".to_string(),
            )),
        }
    }

    fn parse_response(&self, body: &[u8]) -> Result<(String, TokenUsage), AiError> {
        let value = parse_json(body)?;
        Self::parse_family(self.family, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Collects formatted log output
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn config(model: &str) -> ProviderConfig {
        ProviderConfig::for_provider("bedrock")
            .unwrap()
            .with_model(model)
            .with_credentials(Credentials::api_key("bedrock-key"))
            .with_system_prompt(Some("SYS".to_string()))
    }

    #[test]
    fn test_arn_stripping() {
        assert_eq!(
            strip_model_arn("arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-v2:1"),
            "anthropic.claude-v2:1"
        );
        assert_eq!(
            strip_model_arn("arn:aws:bedrock:us-west-2:123456789012:inference-profile/us.meta.llama3-2-90b-instruct-v1:0"),
            "us.meta.llama3-2-90b-instruct-v1:0"
        );
        assert_eq!(strip_model_arn("amazon.titan-text-express-v1"), "amazon.titan-text-express-v1");
    }

    #[test]
    fn test_family_detection() {
        let cases = [
            ("anthropic.claude-3-5-sonnet-20240620-v1:0", ModelFamily::Anthropic),
            ("us.anthropic.claude-3-7-sonnet-20250219-v1:0", ModelFamily::Anthropic),
            ("amazon.titan-text-express-v1", ModelFamily::AmazonTitan),
            ("amazon.nova-pro-v1:0", ModelFamily::AmazonNova),
            ("meta.llama2-13b-chat-v1", ModelFamily::Llama2),
            ("meta.llama3-70b-instruct-v1:0", ModelFamily::Llama3),
            ("eu.meta.llama3-2-3b-instruct-v1:0", ModelFamily::Llama3),
            ("mistral.mistral-large-2402-v1:0", ModelFamily::Mistral),
            ("cohere.command-r-plus-v1:0", ModelFamily::CohereCommandR),
            ("cohere.command-text-v14", ModelFamily::CohereCommand),
            ("ai21.jamba-1-5-large-v1:0", ModelFamily::Ai21Jamba),
            ("ai21.j2-ultra-v1", ModelFamily::Ai21Jurassic),
            ("stability.sd3-large-v1:0", ModelFamily::Stability),
            (
                "arn:aws:bedrock:us-east-1::foundation-model/mistral.mixtral-8x7b-instruct-v0:1",
                ModelFamily::Mistral,
            ),
            ("acme.unknown-model-v1", ModelFamily::Generic),
        ];
        for (id, expected) in cases {
            assert_eq!(model_family(id), expected, "model id {}", id);
        }
    }

    #[test]
    fn test_unknown_model_uses_generic_body() {
        let body = bedrock_body("acme.unknown-model-v1", "review", &config("acme.unknown-model-v1"));
        let mut keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["max_tokens", "prompt", "temperature", "top_p"]);
        assert_eq!(body["prompt"], "SYS\n\nreview");
        assert_eq!(body["max_tokens"], 4000);
    }

    #[test]
    fn test_unknown_model_logs_warning() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let id = "acme.unknown-model-v1";
        let body = tracing::subscriber::with_default(subscriber, || bedrock_body(id, "review", &config(id)));

        assert_eq!(body["top_p"], DEFAULT_TOP_P);
        let output = logs.contents();
        assert!(output.contains("WARN"), "{}", output);
        assert!(output.contains("Unrecognized Bedrock model family"), "{}", output);
        assert!(output.contains(id), "{}", output);
    }

    #[test]
    fn test_known_model_logs_nothing() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let id = "mistral.mistral-large-2402-v1:0";
        tracing::subscriber::with_default(subscriber, || bedrock_body(id, "review", &config(id)));

        assert!(!logs.contents().contains("Unrecognized Bedrock model family"));
    }

    #[test]
    fn test_anthropic_body() {
        let id = "anthropic.claude-3-haiku-20240307-v1:0";
        let body = bedrock_body(id, "hi", &config(id));
        assert_eq!(body["anthropic_version"], BEDROCK_ANTHROPIC_VERSION);
        assert_eq!(body["system"], "SYS");
        assert_eq!(body["messages"][0]["content"][0]["text"], "hi");
    }

    #[test]
    fn test_llama_templates_differ() {
        let llama2 = bedrock_body("meta.llama2-13b-chat-v1", "hi", &config("meta.llama2-13b-chat-v1"));
        let llama3 = bedrock_body("meta.llama3-8b-instruct-v1:0", "hi", &config("meta.llama3-8b-instruct-v1:0"));
        assert!(llama2["prompt"].as_str().unwrap().contains("<<SYS>>"));
        assert!(llama3["prompt"].as_str().unwrap().contains("<|start_header_id|>system"));
        assert_eq!(llama3["max_gen_len"], 4000);
    }

    #[test]
    fn test_titan_and_nova_bodies() {
        let titan = bedrock_body("amazon.titan-text-express-v1", "hi", &config("amazon.titan-text-express-v1"));
        assert_eq!(titan["textGenerationConfig"]["maxTokenCount"], 4000);
        let nova = bedrock_body("amazon.nova-lite-v1:0", "hi", &config("amazon.nova-lite-v1:0"));
        assert_eq!(nova["system"][0]["text"], "SYS");
        assert_eq!(nova["inferenceConfig"]["maxTokens"], 4000);
    }

    #[test]
    fn test_request_url_and_bearer() {
        let id = "anthropic.claude-v2:1";
        let adapter = BedrockAdapter::new(id);
        let request = adapter.build_request("hi", &config(id)).unwrap();
        assert_eq!(
            request.url,
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-v2%3A1/invoke"
        );
        assert_eq!(request.header("authorization"), Some("Bearer bedrock-key"));

        let again = adapter.build_request("hi", &config(id)).unwrap();
        assert_eq!(request, again);
    }

    #[test]
    fn test_request_is_signed_with_aws_keys() {
        let id = "amazon.nova-pro-v1:0";
        let config = config(id).with_credentials(Credentials::Aws {
            access_key_id: "AKID".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
            region: "us-east-1".to_string(),
        });
        let request = BedrockAdapter::new(id).build_request("hi", &config).unwrap();
        let auth = request.header("authorization").unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKID/"));
        assert!(auth.contains("/us-east-1/bedrock/aws4_request"));
        assert!(request.header("x-amz-date").is_some());
    }

    #[test]
    fn test_missing_credentials() {
        let id = "amazon.nova-pro-v1:0";
        let config = config(id).with_credentials(Credentials::None);
        assert!(matches!(
            BedrockAdapter::new(id).build_request("hi", &config),
            Err(AiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_parse_per_family() {
        let anthropic = BedrockAdapter::new("anthropic.claude-v2");
        let (text, usage) = anthropic
            .parse_response(br#"{"content":[{"type":"text","text":"ok"}],"usage":{"input_tokens":3,"output_tokens":1}}"#)
            .unwrap();
        assert_eq!(text, "ok");
        assert_eq!(usage.total_tokens, Some(4));

        let llama = BedrockAdapter::new("meta.llama3-8b-instruct-v1:0");
        let (text, usage) = llama
            .parse_response(br#"{"generation":"fine","prompt_token_count":5,"generation_token_count":2}"#)
            .unwrap();
        assert_eq!(text, "fine");
        assert_eq!(usage.prompt_tokens, Some(5));

        let titan = BedrockAdapter::new("amazon.titan-text-lite-v1");
        let (text, _) = titan
            .parse_response(br#"{"inputTextTokenCount":4,"results":[{"tokenCount":2,"outputText":"hey"}]}"#)
            .unwrap();
        assert_eq!(text, "hey");

        let generic = BedrockAdapter::new("acme.thing");
        let (text, _) = generic.parse_response(br#"{"completion":"generic"}"#).unwrap();
        assert_eq!(text, "generic");
    }

    #[test]
    fn test_parse_wrong_shape_is_format_error() {
        let nova = BedrockAdapter::new("amazon.nova-pro-v1:0");
        assert!(matches!(
            nova.parse_response(br#"{"generation":"x"}"#),
            Err(AiError::ResponseFormat(_))
        ));
    }
}
