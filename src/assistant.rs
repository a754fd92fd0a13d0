use crate::config::prompt::build_assistant_prompt;
use crate::i18n::Language;
use crate::llm::chat::{ ChatClient, InvokeRequest };
use crate::models::chat::{ Conversation, ConversationTurn };

use log::{ debug, info, warn };
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssistantError {
    #[error("Question is empty")]
    EmptyQuestion,
    #[error("A question is already being answered")]
    Busy,
    #[error("No suggested question at index {0}")]
    UnknownSuggestion(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

struct SessionInner {
    conversation: Conversation,
    state: SessionState,
    language: Language,
    draft: String,
    voice_consumed: bool,
}

impl SessionInner {
    fn accept(&mut self, text: &str, language: Language) -> Result<PendingQuestion, AssistantError> {
        if text.trim().is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }
        if self.state == SessionState::AwaitingResponse {
            return Err(AssistantError::Busy);
        }
        self.conversation.push(ConversationTurn::user(text));
        self.state = SessionState::AwaitingResponse;
        Ok(PendingQuestion { question: text.to_string(), language })
    }
}

/// A question whose user turn is already in the conversation and whose
/// answer is still owed. Only the session hands these out.
#[derive(Debug)]
pub struct PendingQuestion {
    question: String,
    language: Language,
}

impl PendingQuestion {
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

/// One user's conversation with the legal assistant.
///
/// The lock is never held across the gateway call, so the session can
/// be read (history, draft) while a question is pending.
pub struct AssistantSession {
    id: Uuid,
    client: Arc<dyn ChatClient>,
    inner: Mutex<SessionInner>,
}

impl AssistantSession {
    pub fn new(client: Arc<dyn ChatClient>, language: Language) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            inner: Mutex::new(SessionInner {
                conversation: Conversation::new(),
                state: SessionState::Idle,
                language,
                draft: String::new(),
                voice_consumed: false,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn language(&self) -> Language {
        self.inner.lock().await.language
    }

    pub async fn set_language(&self, language: Language) {
        self.inner.lock().await.language = language;
    }

    pub async fn draft(&self) -> String {
        self.inner.lock().await.draft.clone()
    }

    pub async fn set_draft(&self, text: &str) {
        self.inner.lock().await.draft = text.to_string();
    }

    /// Copies a suggested question of the session language into the draft.
    pub async fn use_suggestion(&self, index: usize) -> Result<String, AssistantError> {
        let mut inner = self.inner.lock().await;
        let question = inner.language
            .suggested_questions()
            .get(index)
            .ok_or(AssistantError::UnknownSuggestion(index))?;
        inner.draft = question.to_string();
        Ok(inner.draft.clone())
    }

    pub async fn turns(&self) -> Vec<ConversationTurn> {
        self.inner.lock().await.conversation.turns().to_vec()
    }

    pub async fn render(&self) -> String {
        self.inner.lock().await.conversation.render()
    }

    /// Appends the user turn and moves to `AwaitingResponse`. The text is
    /// stored as given; only a blank question is refused.
    pub async fn accept_question(
        &self,
        text: &str,
        language: Language
    ) -> Result<PendingQuestion, AssistantError> {
        let mut inner = self.inner.lock().await;
        let pending = inner.accept(text, language);
        if let Err(AssistantError::Busy) = pending {
            debug!("Session {}: rejected submission while awaiting response", self.id);
        }
        pending
    }

    /// Accepts the draft in the session language and clears it.
    pub async fn accept_draft(&self) -> Result<PendingQuestion, AssistantError> {
        let mut inner = self.inner.lock().await;
        let draft = inner.draft.clone();
        let language = inner.language;
        let pending = inner.accept(&draft, language)?;
        inner.draft.clear();
        Ok(pending)
    }

    /// Accepts the transcript from a `voice` query parameter. The parameter
    /// counts as consumed only once a submission was accepted, so a `Busy`
    /// rejection can be retried. Later calls return `Ok(None)`.
    pub async fn accept_voice(
        &self,
        transcript: &str
    ) -> Result<Option<PendingQuestion>, AssistantError> {
        let mut inner = self.inner.lock().await;
        if inner.voice_consumed || transcript.trim().is_empty() {
            return Ok(None);
        }
        let language = inner.language;
        let pending = inner.accept(transcript, language)?;
        inner.voice_consumed = true;
        info!("Session {}: auto-submitting voice question", self.id);
        Ok(Some(pending))
    }

    /// Asks the gateway and appends exactly one assistant turn: the reply,
    /// or the localised disclaimer on failure.
    pub async fn answer(&self, pending: PendingQuestion) -> ConversationTurn {
        let request = InvokeRequest::text(
            build_assistant_prompt(&pending.question, pending.language)
        ).with_internet_context();
        let content = match self.client.invoke(&request).await {
            Ok(result) => result.into_text(),
            Err(e) => {
                warn!("Session {}: gateway call failed: {}", self.id, e);
                pending.language.failure_message().to_string()
            }
        };

        let turn = ConversationTurn::assistant(content);
        let mut inner = self.inner.lock().await;
        inner.conversation.push(turn.clone());
        inner.state = SessionState::Idle;
        debug!("Session {}: {} turns", self.id, inner.conversation.len());
        turn
    }

    pub async fn submit_question(
        &self,
        text: &str,
        language: Language
    ) -> Result<ConversationTurn, AssistantError> {
        let pending = self.accept_question(text, language).await?;
        Ok(self.answer(pending).await)
    }

    pub async fn submit_draft(&self) -> Result<ConversationTurn, AssistantError> {
        let pending = self.accept_draft().await?;
        Ok(self.answer(pending).await)
    }

    pub async fn auto_submit_voice(
        &self,
        transcript: &str
    ) -> Result<Option<ConversationTurn>, AssistantError> {
        match self.accept_voice(transcript).await? {
            Some(pending) => Ok(Some(self.answer(pending).await)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::prompt::ANSWER_RUBRIC;
    use crate::llm::chat::mock::MockChatClient;
    use crate::llm::chat::InvokeResult;
    use crate::models::chat::Role;
    use std::time::Duration;

    fn session(client: MockChatClient) -> (Arc<AssistantSession>, Arc<MockChatClient>) {
        let client = Arc::new(client);
        (Arc::new(AssistantSession::new(client.clone(), Language::En)), client)
    }

    #[tokio::test]
    async fn reply_is_appended_verbatim() {
        let (session, client) = session(MockChatClient::text("Article 21 guarantees life and liberty."));
        let turn = session.submit_question("What is Article 21?", Language::En).await.unwrap();
        assert_eq!(turn.content, "Article 21 guarantees life and liberty.");

        let turns = session.turns().await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "What is Article 21?");
        assert_eq!(turns[1].role, Role::Assistant);

        let requests = client.requests.lock().unwrap();
        assert!(requests[0].prompt.contains("User question: What is Article 21?"));
        assert!(requests[0].prompt.contains(ANSWER_RUBRIC));
        assert!(requests[0].add_context_from_internet);
        assert_eq!(session.state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn failure_appends_localised_disclaimer() {
        let (session, _) = session(MockChatClient::failing());
        let turn = session.submit_question("अनुच्छेद 21 क्या है?", Language::Hi).await.unwrap();
        assert_eq!(
            turn.content,
            "क्षमा करें, मुझे कानूनी जानकारी प्राप्त करने में समस्या हो रही है। कृपया फिर से कोशिश करें।"
        );
        assert_eq!(session.turns().await.len(), 2);
        assert_eq!(session.state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn blank_question_appends_nothing() {
        let (session, client) = session(MockChatClient::text("unused"));
        assert_eq!(session.submit_question("   ", Language::En).await, Err(AssistantError::EmptyQuestion));
        assert!(session.turns().await.is_empty());
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn second_submission_while_pending_is_busy() {
        let client = MockChatClient::replying(
            vec![Ok(InvokeResult::Text("first".into())), Ok(InvokeResult::Text("second".into()))]
        ).with_delay(Duration::from_millis(200));
        let (session, _) = session(client);

        let pending = {
            let session = session.clone();
            tokio::spawn(async move { session.submit_question("first question", Language::En).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.state().await, SessionState::AwaitingResponse);
        let before_reply = session.turns().await;
        assert_eq!(before_reply.len(), 1);
        assert_eq!(before_reply[0].role, Role::User);
        assert_eq!(before_reply[0].content, "first question");
        assert_eq!(
            session.submit_question("second question", Language::En).await,
            Err(AssistantError::Busy)
        );

        pending.await.unwrap().unwrap();
        let turns = session.turns().await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "first");
    }

    #[tokio::test]
    async fn voice_transcript_submits_once() {
        let (session, client) = session(
            MockChatClient::replying(
                vec![Ok(InvokeResult::Text("GST refunds are filed via RFD-01.".into()))]
            )
        );
        session.set_language(Language::Ta).await;

        let turn = session.auto_submit_voice("GST refund process").await.unwrap();
        assert!(turn.is_some());
        assert_eq!(session.auto_submit_voice("GST refund process").await, Ok(None));

        let turns = session.turns().await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "GST refund process");
        assert_eq!(client.request_count(), 1);
        assert!(client.requests.lock().unwrap()[0].prompt.starts_with("Please respond in தமிழ் language. "));

        assert_eq!(session.draft().await, "");
        assert_eq!(session.submit_draft().await, Err(AssistantError::EmptyQuestion));
    }

    #[tokio::test]
    async fn question_is_stored_and_prompted_untrimmed() {
        let (session, client) = session(MockChatClient::text("ok"));
        session.submit_question("  What is Article 21?\n", Language::En).await.unwrap();
        assert_eq!(session.turns().await[0].content, "  What is Article 21?\n");
        let requests = client.requests.lock().unwrap();
        assert!(requests[0].prompt.contains("User question:   What is Article 21?\n"));
    }

    #[tokio::test]
    async fn voice_rejected_while_busy_can_be_retried() {
        let client = MockChatClient::replying(
            vec![Ok(InvokeResult::Text("manual".into())), Ok(InvokeResult::Text("voice".into()))]
        ).with_delay(Duration::from_millis(100));
        let (session, _) = session(client);

        let pending = {
            let session = session.clone();
            tokio::spawn(async move { session.submit_question("typed question", Language::En).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(session.auto_submit_voice("GST refund process").await, Err(AssistantError::Busy));
        pending.await.unwrap().unwrap();

        let turn = session.auto_submit_voice("GST refund process").await.unwrap();
        assert_eq!(turn.map(|t| t.content), Some("voice".to_string()));
        assert_eq!(session.auto_submit_voice("GST refund process").await, Ok(None));

        let voice_turns = session
            .turns().await
            .into_iter()
            .filter(|t| t.role == Role::User && t.content == "GST refund process")
            .count();
        assert_eq!(voice_turns, 1);
    }

    #[tokio::test]
    async fn voice_leaves_typed_draft_alone() {
        let (session, _) = session(MockChatClient::text("ok"));
        session.set_draft("half typed").await;
        session.auto_submit_voice("Bail conditions").await.unwrap();
        assert_eq!(session.draft().await, "half typed");
        assert_eq!(session.turns().await[0].content, "Bail conditions");
    }

    #[tokio::test]
    async fn accepted_draft_is_cleared_before_the_reply() {
        let (session, client) = session(MockChatClient::text("ok").with_delay(Duration::from_millis(50)));
        session.set_draft("Tenant rights in Delhi").await;
        let pending = session.accept_draft().await.unwrap();
        assert_eq!(pending.question(), "Tenant rights in Delhi");
        assert_eq!(session.draft().await, "");
        assert_eq!(session.turns().await.len(), 1);

        session.answer(pending).await;
        assert_eq!(session.turns().await.len(), 2);
        assert_eq!(client.request_count(), 1);
    }

    #[tokio::test]
    async fn suggestion_fills_draft_in_session_language() {
        let (session, _) = session(MockChatClient::text("ok"));
        session.set_language(Language::Hi).await;
        let draft = session.use_suggestion(0).await.unwrap();
        assert_eq!(draft, Language::Hi.suggested_questions()[0]);
        assert_eq!(session.draft().await, draft);
        assert_eq!(session.use_suggestion(99).await, Err(AssistantError::UnknownSuggestion(99)));

        session.submit_draft().await.unwrap();
        assert_eq!(session.draft().await, "");
    }

    #[tokio::test]
    async fn render_does_not_mutate() {
        let (session, _) = session(MockChatClient::text("Yes."));
        session.submit_question("Is a verbal contract valid?", Language::En).await.unwrap();
        let first = session.render().await;
        assert_eq!(first, session.render().await);
        assert_eq!(session.turns().await.len(), 2);
    }
}
