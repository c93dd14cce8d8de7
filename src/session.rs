//! Per-session conversation state.
//!
//! A [`SessionState`] is owned by whoever drives a session's turns and is
//! mutated only by that flow; nothing here is shared between sessions.

use crate::types::{ConversationTurn, ImageAttachment, ModelDescriptor};

/// The transcript, selected model, and pending image of one session.
#[derive(Debug, Clone)]
pub struct SessionState {
    transcript: Vec<ConversationTurn>,
    selected_model: ModelDescriptor,
    pending_image: Option<ImageAttachment>,
}

impl SessionState {
    /// Start an empty session on `model`.
    pub fn new(model: ModelDescriptor) -> Self {
        Self {
            transcript: Vec::new(),
            selected_model: model,
            pending_image: None,
        }
    }

    /// Append a turn at the end of the transcript.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.transcript.push(turn);
    }

    /// Drop every turn and the pending image.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.pending_image = None;
    }

    /// The transcript in submission order.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.transcript
    }

    /// Number of turns in the transcript.
    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    /// True when the transcript is empty.
    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    /// The currently selected model.
    pub fn selected_model(&self) -> &ModelDescriptor {
        &self.selected_model
    }

    /// Select `model`, clearing the session when it differs from the current one.
    ///
    /// Switching to a different model always leaves an empty transcript and no
    /// pending image.  Re-selecting the current model changes nothing.  Returns
    /// true if the model changed.
    pub fn switch_model(&mut self, model: ModelDescriptor) -> bool {
        if model == self.selected_model {
            return false;
        }
        self.selected_model = model;
        self.clear();
        true
    }

    /// Attach an image to subsequent turns, replacing any previous one.
    pub fn attach_image(&mut self, image: ImageAttachment) {
        self.pending_image = Some(image);
    }

    /// Remove the pending image.  Returns true if there was one.
    pub fn detach_image(&mut self) -> bool {
        self.pending_image.take().is_some()
    }

    /// The attached image, regardless of model support.
    pub fn pending_image(&self) -> Option<&ImageAttachment> {
        self.pending_image.as_ref()
    }

    /// The image to send with the next turn: only if the model accepts images.
    pub fn outgoing_image(&self) -> Option<&ImageAttachment> {
        if self.selected_model.supports_image_input {
            self.pending_image.as_ref()
        } else {
            None
        }
    }
}
