pub mod chat_chunk;
pub mod chat_request;
pub mod conversation_turn;
pub mod image_attachment;
pub mod model_descriptor;

pub use chat_chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta, ErrorObject};
pub use chat_request::{ChatCompletionRequest, ChatMessage, ContentPart, ImageUrl, MessageContent};
pub use conversation_turn::{ConversationTurn, Role};
pub use image_attachment::{ImageAttachment, PNG_DATA_URI_PREFIX};
pub use model_descriptor::ModelDescriptor;
