//! Integration tests for the multichat library.
//! The network tests require an API key in the environment to run.

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use futures::{StreamExt, stream};

    use multichat::chat::{ChatSession, Renderer};
    use multichat::{
        ChatCompletionRequest, CompletionTransport, ConversationTurn, CredentialStore,
        FragmentStream, ModelCatalog, ModelDescriptor, OpenRouter, Result,
        process_sse, text_fragments,
    };

    /// Serves canned SSE bodies through the real stream parser.
    struct CannedSse {
        bodies: Mutex<Vec<Vec<&'static str>>>,
        requests: Mutex<Vec<ChatCompletionRequest>>,
    }

    impl CannedSse {
        fn new(bodies: Vec<Vec<&'static str>>) -> Self {
            Self {
                bodies: Mutex::new(bodies),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl CompletionTransport for CannedSse {
        async fn open_stream(
            &self,
            _api_key: &str,
            request: ChatCompletionRequest,
        ) -> Result<FragmentStream> {
            self.requests.lock().unwrap().push(request);
            let chunks = self.bodies.lock().unwrap().remove(0);
            let bytes = stream::iter(
                chunks
                    .into_iter()
                    .map(|chunk| Ok::<_, std::io::Error>(Bytes::from_static(chunk.as_bytes()))),
            );
            Ok(Box::pin(text_fragments(process_sse(bytes))))
        }
    }

    #[derive(Default)]
    struct Transcript {
        shown: String,
    }

    impl Renderer for Transcript {
        fn print_text(&mut self, fragment: &str, accumulated: &str) {
            self.shown.push_str(fragment);
            assert!(accumulated.ends_with(fragment));
            assert!(self.shown.ends_with(accumulated));
        }

        fn finish_response(&mut self, _text: &str) {
            self.shown.push('\n');
        }

        fn print_error(&mut self, _error: &str) {}

        fn print_info(&mut self, _info: &str) {}
    }

    fn credentials() -> CredentialStore {
        CredentialStore::new()
            .without_environment()
            .with_secret("MOLMO_KEY", "sk-molmo")
            .with_secret("MIMO_KEY", "sk-mimo")
    }

    #[tokio::test]
    async fn test_sse_conversation() {
        let transport = CannedSse::new(vec![
            vec![
                ": OPENROUTER PROCESSING\n\n",
                "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n",
                "\ndata: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n",
                "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\" world\"}}]}\n\n",
                "data: [DONE]\n\n",
            ],
            vec![
                "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Par\"}}]}\n\n",
                "data: {\"error\":{\"message\":\"Provider returned error\",\"code\":502}}\n\n",
            ],
        ]);
        let mut session = ChatSession::new(transport, ModelCatalog::builtin(), credentials());
        let mut renderer = Transcript::default();

        let reply = session
            .send_streaming("Say hello", &mut renderer)
            .await
            .unwrap();
        assert_eq!(reply, "Hello world");

        let err = session
            .send_streaming("And again", &mut renderer)
            .await
            .unwrap_err();
        assert!(err.is_completion());
        assert_eq!(err.status_code(), Some(502));
        assert!(err.to_string().contains("Provider returned error"));

        assert_eq!(
            session.transcript(),
            &[
                ConversationTurn::user("Say hello"),
                ConversationTurn::assistant("Hello world"),
                ConversationTurn::user("And again"),
            ]
        );
        assert_eq!(renderer.shown, "Hello world\nPar");

        let requests = session.transport().requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.stream));
        assert!(requests.iter().all(|r| r.image_url().is_none()));
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let transport = CannedSse::new(Vec::new());
        let catalog = ModelCatalog::new(vec![ModelDescriptor::new(
            "Local",
            "local/model",
            "MULTICHAT_TEST_UNSET_KEY",
        )])
        .unwrap();
        let mut session = ChatSession::new(
            transport,
            catalog,
            CredentialStore::new().without_environment(),
        );
        let mut renderer = Transcript::default();
        let err = session
            .send_streaming("hello", &mut renderer)
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.configuration_key(), Some("MULTICHAT_TEST_UNSET_KEY"));
        assert!(session.transcript().is_empty());
        assert!(session.transport().requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_streaming_response() {
        // This test requires MIMO_KEY to be set
        let api_key = std::env::var("MIMO_KEY").ok();
        if api_key.is_none() {
            eprintln!("Skipping test: MIMO_KEY not set");
            return;
        }

        let client = OpenRouter::new().expect("Failed to create client");
        let mut session = ChatSession::new(client, ModelCatalog::builtin(), CredentialStore::new());
        session.switch_model("MiMo").expect("MiMo is built in");
        let mut renderer = Transcript::default();

        let reply = session.send_streaming("Count to 3", &mut renderer).await;
        assert!(reply.is_ok(), "Stream request should succeed: {reply:?}");
        assert_eq!(session.message_count(), 2);
    }

    #[tokio::test]
    async fn test_raw_fragment_stream() {
        let api_key = match std::env::var("MIMO_KEY") {
            Ok(key) => key,
            Err(_) => {
                eprintln!("Skipping test: MIMO_KEY not set");
                return;
            }
        };

        let client = OpenRouter::new().expect("Failed to create client");
        let catalog = ModelCatalog::builtin();
        let model = catalog.require("MiMo").unwrap();
        let request = ChatCompletionRequest::for_turn(model, "Say 'test passed'", None);
        let mut fragments = client
            .stream(&api_key, request)
            .await
            .expect("Stream request should succeed");
        let mut text = String::new();
        while let Some(fragment) = fragments.next().await {
            text.push_str(&fragment.expect("fragment"));
        }
        assert!(!text.is_empty());
    }
}
