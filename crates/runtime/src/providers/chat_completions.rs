//! OpenAI-compatible chat completions backend (ZhipuAI GLM by default).

use super::Provider;
use crate::llm::{Arguments, AssistantOutcome, Message, ModelError, ToolCallRequest};
use crate::tools::{ParameterSchema, ToolSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
pub const DEFAULT_MODEL: &str = "glm-4.5-flash";

/// Key under which undecodable tool arguments are passed through verbatim.
pub const FALLBACK_ARGUMENT_KEY: &str = "__arg1";

const NO_RESPONSE_TEXT: &str = "无法获取响应";
const FAILURE_PREFIX: &str = "API调用失败";

/// How much tool detail the adapter exchanges with the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolFidelity {
    /// Advertise each tool with its registered parameter schema.
    #[default]
    Full,
    /// Advertise every tool with an empty parameter schema.
    Schemaless,
}

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ApiThinking>,
}

#[derive(Debug, Serialize)]
struct ApiThinking {
    #[serde(rename = "type")]
    mode: &'static str,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: &'static str,
    function: ApiFunctionCall,
}

#[derive(Debug, Serialize)]
struct ApiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseToolCall {
    #[serde(default)]
    id: String,
    function: ApiResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ApiResponseFunction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`ChatCompletionsProvider`].
#[derive(Debug, Clone)]
pub struct ChatCompletionsProviderBuilder {
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    fidelity: ToolFidelity,
    disable_thinking: bool,
}

impl ChatCompletionsProviderBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: 0.1,
            fidelity: ToolFidelity::Full,
            disable_thinking: true,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn fidelity(mut self, fidelity: ToolFidelity) -> Self {
        self.fidelity = fidelity;
        self
    }

    pub fn disable_thinking(mut self, disable: bool) -> Self {
        self.disable_thinking = disable;
        self
    }

    pub fn build(self) -> ChatCompletionsProvider {
        ChatCompletionsProvider {
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", self.base_url.trim_end_matches('/')),
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            fidelity: self.fidelity,
            disable_thinking: self.disable_thinking,
        }
    }
}

/// Chat completions adapter.
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    fidelity: ToolFidelity,
    disable_thinking: bool,
}

impl ChatCompletionsProvider {
    pub fn builder(api_key: impl Into<String>) -> ChatCompletionsProviderBuilder {
        ChatCompletionsProviderBuilder::new(api_key)
    }

    fn message_to_api(msg: &Message) -> ApiMessage {
        let (tool_calls, tool_call_id) = match msg {
            Message::Assistant { tool_calls, .. } => (
                tool_calls.iter().map(Self::call_to_api).collect(),
                None,
            ),
            Message::Tool { tool_call_id, .. } => (Vec::new(), Some(tool_call_id.clone())),
            Message::System { .. } | Message::User { .. } => (Vec::new(), None),
        };

        ApiMessage {
            role: msg.role().as_str(),
            content: msg.content().to_string(),
            tool_calls,
            tool_call_id,
        }
    }

    fn call_to_api(call: &ToolCallRequest) -> ApiToolCall {
        ApiToolCall {
            id: call.id.clone(),
            call_type: "function",
            function: ApiFunctionCall {
                name: call.name.clone(),
                arguments: Value::Object(call.arguments.clone()).to_string(),
            },
        }
    }

    fn tool_to_api(&self, spec: &ToolSpec) -> ApiTool {
        let parameters = match self.fidelity {
            ToolFidelity::Full => spec.parameters.to_json_schema(),
            ToolFidelity::Schemaless => ParameterSchema::empty().to_json_schema(),
        };
        ApiTool {
            tool_type: "function",
            function: ApiFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters,
            },
        }
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolSpec]) -> ApiRequest {
        let tools: Vec<ApiTool> = tools.iter().map(|spec| self.tool_to_api(spec)).collect();
        let tool_choice = (!tools.is_empty()).then_some("auto");

        ApiRequest {
            model: self.model.clone(),
            messages: messages.iter().map(Self::message_to_api).collect(),
            tools,
            tool_choice,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            thinking: self
                .disable_thinking
                .then_some(ApiThinking { mode: "disabled" }),
        }
    }

    fn response_to_outcome(response: ApiResponse) -> AssistantOutcome {
        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "model usage"
            );
        }

        let Some(choice) = response.choices.into_iter().next() else {
            warn!("provider response had no choices");
            return AssistantOutcome::Final(NO_RESPONSE_TEXT.to_string());
        };

        let content = choice.message.content.unwrap_or_default();
        let calls: Vec<ToolCallRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments: decode_arguments(call.function.arguments),
            })
            .collect();

        if calls.is_empty() {
            AssistantOutcome::Final(content)
        } else {
            AssistantOutcome::ToolCalls {
                text: (!content.is_empty()).then_some(content),
                calls,
            }
        }
    }

    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ModelError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))
    }
}

impl Provider for ChatCompletionsProvider {
    async fn generate(&self, messages: &[Message], tools: &[ToolSpec]) -> AssistantOutcome {
        let request = self.build_request(messages, tools);
        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion"
        );

        match self.send(&request).await {
            Ok(response) => Self::response_to_outcome(response),
            Err(e) => {
                warn!(error = %e, "model call failed");
                AssistantOutcome::Final(format!("{FAILURE_PREFIX}: {e}"))
            }
        }
    }
}

/// Decode a tool call's argument payload into a parameter map.
///
/// Providers normally send a JSON-encoded object as a string. Anything that
/// does not decode to an object is kept verbatim under
/// [`FALLBACK_ARGUMENT_KEY`] so the call can still be dispatched.
fn decode_arguments(raw: Value) -> Arguments {
    match raw {
        Value::Object(map) => map,
        Value::Null => Arguments::new(),
        Value::String(text) if text.trim().is_empty() => Arguments::new(),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            _ => fallback_arguments(text),
        },
        other => fallback_arguments(other.to_string()),
    }
}

fn fallback_arguments(raw: String) -> Arguments {
    warn!(raw = %raw, "tool arguments are not a JSON object; passing through");
    let mut arguments = Arguments::new();
    arguments.insert(FALLBACK_ARGUMENT_KEY.to_string(), Value::String(raw));
    arguments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ParameterSpec;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn provider(fidelity: ToolFidelity) -> ChatCompletionsProvider {
        ChatCompletionsProvider::builder("test-key")
            .fidelity(fidelity)
            .build()
    }

    fn record_spec() -> ToolSpec {
        let properties = BTreeMap::from([
            ("date".to_string(), ParameterSpec::string("日期")),
            ("eat".to_string(), ParameterSpec::string("食物")),
            ("money".to_string(), ParameterSpec::string("金额")),
        ]);
        ToolSpec::new(
            "record_thing",
            "记录用户在某日吃了什么花了多少钱",
            ParameterSchema::new(properties, ["date", "eat", "money"]).unwrap(),
        )
    }

    fn parse(body: Value) -> AssistantOutcome {
        let response: ApiResponse = serde_json::from_value(body).unwrap();
        ChatCompletionsProvider::response_to_outcome(response)
    }

    #[test]
    fn roles_map_one_to_one() {
        let call = ToolCallRequest::new(
            "call_1",
            "record_thing",
            json!({"date": "2025-03-02"}).as_object().cloned().unwrap(),
        );
        let messages = vec![
            Message::system("be brief"),
            Message::user("hi"),
            Message::assistant_with_calls("", vec![call]),
            Message::tool("call_1", r#"{"status":"success"}"#),
            Message::assistant("done"),
        ];
        let request = provider(ToolFidelity::Full).build_request(&messages, &[]);
        let value = serde_json::to_value(&request).unwrap();

        let roles: Vec<&str> = value["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, ["system", "user", "assistant", "tool", "assistant"]);

        let assistant = &value["messages"][2];
        assert_eq!(assistant["tool_calls"][0]["id"], "call_1");
        assert_eq!(assistant["tool_calls"][0]["type"], "function");
        let raw = assistant["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .unwrap();
        let args: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(args, json!({"date": "2025-03-02"}));

        assert_eq!(value["messages"][3]["tool_call_id"], "call_1");
        assert!(value["messages"][1].get("tool_call_id").is_none());
        assert!(value["messages"][1].get("tool_calls").is_none());
    }

    #[test]
    fn full_fidelity_advertises_registered_schema() {
        let request =
            provider(ToolFidelity::Full).build_request(&[Message::user("x")], &[record_spec()]);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["tool_choice"], "auto");
        let function = &value["tools"][0]["function"];
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(function["name"], "record_thing");
        assert_eq!(function["parameters"]["required"], json!(["date", "eat", "money"]));
        assert_eq!(function["parameters"]["properties"]["money"]["description"], "金额");
        assert_eq!(value["thinking"]["type"], "disabled");
    }

    #[test]
    fn tool_without_schema_gets_empty_parameters() {
        let spec = ToolSpec::empty("get_total_spending", "获取总消费金额");
        let request = provider(ToolFidelity::Full).build_request(&[Message::user("x")], &[spec]);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value["tools"][0]["function"]["parameters"],
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn schemaless_fidelity_drops_parameters() {
        let request = provider(ToolFidelity::Schemaless)
            .build_request(&[Message::user("x")], &[record_spec()]);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["tools"][0]["function"]["name"], "record_thing");
        assert_eq!(
            value["tools"][0]["function"]["parameters"],
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn no_tools_means_no_tool_choice() {
        let request = provider(ToolFidelity::Full).build_request(&[Message::user("x")], &[]);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
    }

    #[test]
    fn plain_response_is_final_verbatim() {
        let outcome = parse(json!({
            "choices": [{"message": {"role": "assistant", "content": "  你好！\n"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2}
        }));
        assert_eq!(outcome, AssistantOutcome::Final("  你好！\n".into()));
    }

    #[test]
    fn tool_calls_are_decoded() {
        let outcome = parse(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {
                        "name": "record_thing",
                        "arguments": "{\"date\":\"2025-03-02\",\"eat\":\"蛋糕\",\"money\":\"998\"}"
                    }
                }]
            }}]
        }));

        let AssistantOutcome::ToolCalls { text, calls } = outcome else {
            panic!("expected tool calls");
        };
        assert_eq!(text, None);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "record_thing");
        assert_eq!(calls[0].arguments["eat"], "蛋糕");
        assert_eq!(calls[0].arguments["money"], "998");
    }

    #[test]
    fn undecodable_arguments_fall_back_to_raw_text() {
        let outcome = parse(json!({
            "choices": [{"message": {
                "content": "let me check",
                "tool_calls": [{
                    "id": "call_2",
                    "function": {"name": "get_records_by_date", "arguments": "2025-03-02"}
                }]
            }}]
        }));

        let AssistantOutcome::ToolCalls { text, calls } = outcome else {
            panic!("expected tool calls");
        };
        assert_eq!(text.as_deref(), Some("let me check"));
        assert_eq!(calls[0].arguments.len(), 1);
        assert_eq!(calls[0].arguments[FALLBACK_ARGUMENT_KEY], "2025-03-02");
    }

    #[test]
    fn object_arguments_are_accepted_directly() {
        let args = decode_arguments(json!({"date": "2025-03-02"}));
        assert_eq!(args["date"], "2025-03-02");
        assert!(decode_arguments(json!("")).is_empty());
        assert!(decode_arguments(Value::Null).is_empty());
        assert_eq!(decode_arguments(json!("[1,2]"))[FALLBACK_ARGUMENT_KEY], "[1,2]");
    }

    #[test]
    fn empty_choices_yield_final_notice() {
        assert_eq!(
            parse(json!({"choices": []})),
            AssistantOutcome::Final(NO_RESPONSE_TEXT.into())
        );
    }

    #[tokio::test]
    async fn unreachable_provider_becomes_final_text() {
        let provider = ChatCompletionsProvider::builder("test-key")
            .base_url("http://127.0.0.1:9")
            .build();
        let outcome = provider.generate(&[Message::user("hi")], &[]).await;

        let AssistantOutcome::Final(text) = outcome else {
            panic!("expected final outcome");
        };
        assert!(text.starts_with(FAILURE_PREFIX));
    }

    /// Serve one canned HTTP response on a local port and return its base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Drain the request so the client is not cut off mid-write.
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn final_text(base_url: &str) -> String {
        let provider = ChatCompletionsProvider::builder("test-key")
            .base_url(base_url)
            .build();
        match provider.generate(&[Message::user("x")], &[]).await {
            AssistantOutcome::Final(text) => text,
            other => panic!("expected final outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_becomes_final_text() {
        let base_url = serve_once("500 Internal Server Error", "boom").await;
        let text = final_text(&base_url).await;

        assert!(text.starts_with(FAILURE_PREFIX));
        assert!(text.contains("500"));
        assert!(text.contains("boom"));
    }

    #[tokio::test]
    async fn malformed_body_becomes_final_text() {
        let base_url = serve_once("200 OK", "{not json").await;
        let text = final_text(&base_url).await;

        assert!(text.starts_with(FAILURE_PREFIX));
    }

    #[test]
    fn fidelity_deserializes_lowercase() {
        let full: ToolFidelity = serde_json::from_value(json!("full")).unwrap();
        let schemaless: ToolFidelity = serde_json::from_value(json!("schemaless")).unwrap();
        assert_eq!(full, ToolFidelity::Full);
        assert_eq!(schemaless, ToolFidelity::Schemaless);
        assert!(serde_json::from_value::<ToolFidelity>(json!("Full")).is_err());
        assert!(serde_json::from_value::<ToolFidelity>(json!("rich")).is_err());
    }
}
