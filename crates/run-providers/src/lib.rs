mod chat;
mod local_echo;
mod openai_compatible;
mod provider;
mod registry;

pub use chat::{ChatMessage, ChatResponse, ImageAttachment, Role, ToolCall, ToolSchema};
pub use local_echo::LocalEchoProvider;
pub use openai_compatible::OpenAICompatibleProvider;
pub use provider::{ModelInfo, Provider, ProviderCallError, ProviderInfo};
pub use registry::ProviderRegistry;
