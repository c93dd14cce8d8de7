//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns conversation
//! state and drives one streaming turn at a time.

use std::path::Path;

use crate::accumulating_stream::accumulate;
use crate::client::OpenRouter;
use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::models::ModelCatalog;
use crate::observability::{SESSION_CONFIGURATION_ERRORS, SESSION_MODEL_SWITCHES, SESSION_TURNS};
use crate::render::Renderer;
use crate::session::SessionState;
use crate::transport::CompletionTransport;
use crate::types::{ChatCompletionRequest, ConversationTurn, ImageAttachment, ModelDescriptor};

/// A chat session that owns conversation state and talks to a transport.
pub struct ChatSession<T: CompletionTransport = OpenRouter> {
    transport: T,
    credentials: CredentialStore,
    catalog: ModelCatalog,
    state: SessionState,
    completed_turns: u64,
    failed_turns: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The selected model.
    pub model: ModelDescriptor,
    /// The number of turns in the transcript.
    pub message_count: usize,
    /// Whether an image is attached.
    pub image_attached: bool,
    /// Whether the attached image will be sent with the next prompt.
    pub image_will_be_sent: bool,
    /// Replies that completed and were recorded.
    pub completed_turns: u64,
    /// Turns that failed, for any reason.
    pub failed_turns: u64,
}

impl<T: CompletionTransport> ChatSession<T> {
    /// Creates a session on the catalog's default model.
    pub fn new(transport: T, catalog: ModelCatalog, credentials: CredentialStore) -> Self {
        let state = SessionState::new(catalog.default_model().clone());
        Self {
            transport,
            credentials,
            catalog,
            state,
            completed_turns: 0,
            failed_turns: 0,
        }
    }

    /// Sends a user prompt and streams the reply.
    ///
    /// This method:
    /// 1. Resolves the selected model's API key, failing with a configuration
    ///    error before anything else happens if it is missing
    /// 2. Adds the user turn to the transcript
    /// 3. Sends a streaming request, with the attached image if the model accepts one
    /// 4. Renders fragments as they arrive
    /// 5. Adds the complete reply as an assistant turn
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the API key cannot be resolved, or a
    /// completion error if the request or stream fails.  On a completion
    /// error the user turn stays in the transcript and no assistant turn is
    /// added.
    pub async fn send_streaming(
        &mut self,
        prompt: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<String> {
        let credential = match self.credentials.resolve(self.state.selected_model()) {
            Ok(credential) => credential,
            Err(err) => {
                SESSION_CONFIGURATION_ERRORS.click();
                return Err(err);
            }
        };

        SESSION_TURNS.click();
        self.state.append(ConversationTurn::user(prompt));
        let request = ChatCompletionRequest::for_turn(
            self.state.selected_model(),
            prompt,
            self.state.outgoing_image(),
        );

        renderer.start_response(self.state.selected_model());
        let outcome = match self
            .transport
            .open_stream(credential.expose(), request)
            .await
        {
            Ok(stream) => accumulate(stream, renderer).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(text) => {
                self.state.append(ConversationTurn::assistant(text.clone()));
                self.completed_turns += 1;
                Ok(text)
            }
            Err(err) => {
                self.failed_turns += 1;
                Err(err)
            }
        }
    }

    /// Checks that the selected model's API key resolves.
    pub fn check_credentials(&self) -> Result<()> {
        self.credentials
            .resolve(self.state.selected_model())
            .map(|_| ())
    }

    /// Switches to the named model.
    ///
    /// A different model clears the transcript and the attached image.
    /// Returns whether the model changed; unknown names are a configuration
    /// error and leave the session untouched.
    pub fn switch_model(&mut self, name: &str) -> Result<bool> {
        let model = self.catalog.require(name)?.clone();
        let changed = self.state.switch_model(model);
        if changed {
            SESSION_MODEL_SWITCHES.click();
        }
        Ok(changed)
    }

    /// Clears the conversation history and the attached image.
    pub fn clear(&mut self) {
        self.state.clear();
    }

    /// Attaches an image to subsequent prompts.
    pub fn attach_image(&mut self, image: ImageAttachment) {
        self.state.attach_image(image);
    }

    /// Reads, re-encodes, and attaches an image file.
    pub fn attach_image_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let image = ImageAttachment::from_path(path)?;
        self.state.attach_image(image);
        Ok(())
    }

    /// Removes the attached image.  Returns true if there was one.
    pub fn detach_image(&mut self) -> bool {
        self.state.detach_image()
    }

    /// Returns the current model.
    pub fn model(&self) -> &ModelDescriptor {
        self.state.selected_model()
    }

    /// Returns the model catalog.
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Returns the transcript in submission order.
    pub fn transcript(&self) -> &[ConversationTurn] {
        self.state.turns()
    }

    /// Returns the number of turns in the conversation.
    pub fn message_count(&self) -> usize {
        self.state.len()
    }

    /// Returns the underlying session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.state.selected_model().clone(),
            message_count: self.state.len(),
            image_attached: self.state.pending_image().is_some(),
            image_will_be_sent: self.state.outgoing_image().is_some(),
            completed_turns: self.completed_turns,
            failed_turns: self.failed_turns,
        }
    }
}
