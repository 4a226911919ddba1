use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::cache::SessionCache;
use crate::database::models::{ArchivedTurn, NewArchivedTurn};
use crate::database::repository::{HistoryStore, MemberDirectory};
use crate::models::chat::{ChatTurn, Conversation, MemberId, ProductId};
use crate::services::inference_service::{IndexResponse, InferenceError};
use crate::utils::error::ChatError;

/// Trait for the remote question-answering service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn ask(
        &self,
        product_id: ProductId,
        question: &str,
        history: &[ChatTurn],
    ) -> Result<String, InferenceError>;

    async fn index_document(
        &self,
        product_id: ProductId,
        file_url: &str,
    ) -> Result<IndexResponse, InferenceError>;
}

/// Owns the lifecycle of product conversations.
///
/// Holds no conversation state itself: every call re-reads the session
/// cache, works on its own copy and writes it back whole. Two exchanges
/// racing on the same (member, product) pair are last-write-wins.
pub struct ConversationManager {
    cache: SessionCache,
    inference: Arc<dyn InferenceProvider>,
    history: Arc<dyn HistoryStore>,
    directory: Arc<dyn MemberDirectory>,
}

impl ConversationManager {
    pub fn new(
        cache: SessionCache,
        inference: Arc<dyn InferenceProvider>,
        history: Arc<dyn HistoryStore>,
        directory: Arc<dyn MemberDirectory>,
    ) -> Self {
        Self {
            cache,
            inference,
            history,
            directory,
        }
    }

    /// One question/answer exchange. Returns the whole conversation, the
    /// new question and its answer being the last two turns.
    ///
    /// If the inference call fails the question stays cached without an
    /// answer and the failure is returned.
    pub async fn process_chat(
        &self,
        member_id: MemberId,
        product_id: ProductId,
        question: String,
    ) -> Result<Conversation, ChatError> {
        self.ensure_exists(member_id, product_id).await?;

        let mut history = self
            .cache
            .append(member_id, product_id, ChatTurn::user(question.clone()))
            .await;
        debug!(member_id, product_id, turns = history.len(), "History loaded");

        // The history already ends with the question; the service expects that.
        let answer = match self.inference.ask(product_id, &question, &history).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(member_id, product_id, "Inference failed, question kept without answer: {}", e);
                return Err(e.into());
            }
        };

        // Only reached while the request is alive: a dropped request future
        // never gets here, so nothing is cached for a vanished caller.
        history.push(ChatTurn::assistant(answer));
        self.cache.save(member_id, product_id, &history).await;

        info!(member_id, product_id, turns = history.len(), "Chat exchange completed");
        Ok(history)
    }

    /// Archive the cached conversation, replacing any previous archive of
    /// the pair. The cache entry is left untouched.
    pub async fn end_chat(&self, member_id: MemberId, product_id: ProductId) -> Result<usize, ChatError> {
        self.ensure_exists(member_id, product_id).await?;

        let conversation = self.cache.load(member_id, product_id).await;
        let turns: Vec<NewArchivedTurn> = conversation.iter().map(NewArchivedTurn::from).collect();

        if turns.is_empty() {
            let removed = self
                .history
                .delete_by_member_and_product(member_id, product_id)
                .await?;
            info!(member_id, product_id, removed, "Empty conversation, archive cleared");
            return Ok(0);
        }

        self.history.replace(member_id, product_id, &turns).await?;

        info!(member_id, product_id, archived = turns.len(), "Chat archived");
        Ok(turns.len())
    }

    /// Drop the live conversation; the archive is not touched
    pub async fn clear_session(&self, member_id: MemberId, product_id: ProductId) -> Result<(), ChatError> {
        self.ensure_exists(member_id, product_id).await?;
        self.cache.delete(member_id, product_id).await;
        Ok(())
    }

    pub async fn get_histories(
        &self,
        member_id: MemberId,
        product_id: ProductId,
    ) -> Result<Vec<ArchivedTurn>, ChatError> {
        self.ensure_exists(member_id, product_id).await?;
        self.history.find_by_member_and_product(member_id, product_id).await
    }

    /// Products the member has archived conversations for, most recently
    /// archived first
    pub async fn recent_products(&self, member_id: MemberId) -> Result<Vec<ProductId>, ChatError> {
        self.ensure_member(member_id).await?;

        let products = self.history.recent_products(member_id).await?;
        debug!(member_id, count = products.len(), "Recent products");
        Ok(products)
    }

    pub async fn index_product_document(
        &self,
        product_id: ProductId,
        file_url: &str,
    ) -> Result<IndexResponse, ChatError> {
        if !self.directory.product_exists(product_id).await? {
            return Err(ChatError::ProductNotFound(product_id));
        }

        let response = self.inference.index_document(product_id, file_url).await?;
        info!(
            product_id,
            store_path = response.store_path.as_deref().unwrap_or("-"),
            "Document indexed"
        );
        Ok(response)
    }

    async fn ensure_member(&self, member_id: MemberId) -> Result<(), ChatError> {
        if !self.directory.member_exists(member_id).await? {
            return Err(ChatError::MemberNotFound(member_id));
        }
        Ok(())
    }

    async fn ensure_exists(&self, member_id: MemberId, product_id: ProductId) -> Result<(), ChatError> {
        self.ensure_member(member_id).await?;
        if !self.directory.product_exists(product_id).await? {
            return Err(ChatError::ProductNotFound(product_id));
        }
        Ok(())
    }
}
