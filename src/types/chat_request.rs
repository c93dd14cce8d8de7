use serde::{Deserialize, Serialize};

use crate::types::{ImageAttachment, ModelDescriptor, Role};

/// A typed part of structured message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },

    /// An image referenced by URL, here always a base64 data URI.
    ImageUrl {
        /// The image reference.
        image_url: ImageUrl,
    },
}

/// Image reference inside an `image_url` content part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUrl {
    /// The URL, e.g. `data:image/png;base64,...`.
    pub url: String,
}

/// The content of a request message: either a string or an array of parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageContent {
    /// A simple string content.
    Text(String),

    /// Text plus attachments.
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Returns the image URL carried by this content, if any.
    pub fn image_url(&self) -> Option<&str> {
        match self {
            MessageContent::Text(_) => None,
            MessageContent::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::ImageUrl { image_url } => Some(image_url.url.as_str()),
                ContentPart::Text { .. } => None,
            }),
        }
    }

    /// Returns the text carried by this content.
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ImageUrl { .. } => None,
            }),
        }
    }
}

/// A single message in a chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// The role of the message.
    pub role: Role,

    /// The content of the message.
    pub content: MessageContent,
}

/// Body of a `chat/completions` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatCompletionRequest {
    /// The API model id.
    pub model: String,

    /// The messages for this turn.
    pub messages: Vec<ChatMessage>,

    /// Always true; replies are consumed incrementally.
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Build the request for one user turn.
    ///
    /// The image is embedded only when `model` advertises image input; for
    /// text-only models it is ignored even when present.
    pub fn for_turn(
        model: &ModelDescriptor,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Self {
        let content = match image {
            Some(image) if model.supports_image_input => MessageContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_uri(),
                    },
                },
            ]),
            _ => MessageContent::Text(prompt.to_string()),
        };
        Self {
            model: model.api_model_id.clone(),
            messages: vec![ChatMessage {
                role: Role::User,
                content,
            }],
            stream: true,
        }
    }

    /// Returns the image URL of the outgoing payload, if any.
    pub fn image_url(&self) -> Option<&str> {
        self.messages
            .iter()
            .find_map(|message| message.content.image_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn molmo() -> ModelDescriptor {
        ModelDescriptor::new("Molmo 2 8B", "allenai/molmo-2-8b:free", "MOLMO_KEY")
            .with_image_input(true)
    }

    fn mimo() -> ModelDescriptor {
        ModelDescriptor::new("MiMo", "mistralai/mistral-7b-instruct:free", "MIMO_KEY")
    }

    #[test]
    fn plain_text_request() {
        let request = ChatCompletionRequest::for_turn(&mimo(), "Bonjour", None);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "model": "mistralai/mistral-7b-instruct:free",
                "messages": [{"role": "user", "content": "Bonjour"}],
                "stream": true
            })
        );
    }

    #[test]
    fn text_only_model_drops_image() {
        let image = ImageAttachment::from_png_bytes(tiny_png()).unwrap();
        let request = ChatCompletionRequest::for_turn(&mimo(), "What is this?", Some(&image));
        assert_eq!(request.image_url(), None);
        assert_eq!(
            request.messages[0].content,
            MessageContent::Text("What is this?".to_string())
        );
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("image_url"));
        assert!(!json.contains("base64"));
    }

    #[test]
    fn image_model_embeds_data_uri() {
        let image = ImageAttachment::from_png_bytes(tiny_png()).unwrap();
        let request = ChatCompletionRequest::for_turn(&molmo(), "Describe it", Some(&image));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["messages"][0]["content"],
            json!([
                {"type": "text", "text": "Describe it"},
                {"type": "image_url", "image_url": {"url": image.data_uri()}}
            ])
        );
        assert_eq!(request.messages[0].content.text(), Some("Describe it"));
    }

    #[test]
    fn image_model_without_image_sends_text() {
        let request = ChatCompletionRequest::for_turn(&molmo(), "hi", None);
        assert_eq!(request.messages[0].content, MessageContent::Text("hi".to_string()));
    }

    fn tiny_png() -> Vec<u8> {
        crate::types::image_attachment::tests::tiny_png()
    }
}
