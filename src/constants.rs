//! Constants used throughout kubechat
//!
//! Centralizes fixed strings and default values so the prompt template,
//! the HTTP layer and the configuration defaults agree on them.

/// Answer returned to the caller whenever the completion model fails
pub const APOLOGY_MESSAGE: &str = "Sorry, I encountered an error while processing your request.";

/// Marker rendered in place of any slice the control plane refused to return
pub const UNAVAILABLE_MARKER: &str = "[unavailable]";

/// Rendered for a node that reports no address
pub const NOT_AVAILABLE: &str = "N/A";

/// Instruction header placed at the top of every rendered prompt
pub const DEFAULT_INSTRUCTION: &str = "You are a Kubernetes assistant. Answer the query using only the cluster information below, without any explanations. Answer in just one word when possible. Provide only the necessary information without technical identifiers, suffixes, or justifications. Return only the answer.";

/// System message sent ahead of the rendered prompt
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a Kubernetes assistant. Answer the query based on the given information without any explanations.";

/// Default completion model
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default OpenAI-compatible API base URL
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Environment variable holding the completion API key
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Default HTTP listen address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 8000;

/// Timeout for a single control-plane call
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

/// Timeout for establishing a control-plane connection
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Timeout for one completion request
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;

/// Maximum concurrent per-pod container lookups
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 8;

/// Upper bound for request bodies accepted by `POST /query`
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
