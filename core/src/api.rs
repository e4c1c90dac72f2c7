//! Named wrappers over [`Dispatcher::send`] for the backend's resources.
//!
//! Each one fixes the `run` string and passes the fields through; none of
//! them touch the session.

use serde_json::{Map, Value};

use crate::dispatcher::Dispatcher;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::Request;

/// `run` prefix of the chat actions.
pub const CHAT_PREFIX: &str = "simplest-firebase-chat.";

impl<T: Transport> Dispatcher<T> {
    async fn run_with(&self, run: &str, key: &str, value: impl Into<Value>) -> Result<Value, ApiError> {
        self.send(&Request::new(run).field(key, value)).await
    }

    // --- files ---

    pub async fn file_delete(&self, idx: impl Into<Value>) -> Result<Value, ApiError> {
        self.run_with("file.delete", "idx", idx).await
    }

    /// Fields: `idx`, `width`, `height`, `quality`, `mode`, `taxonomy`,
    /// `relation`, `code`.
    pub async fn file_image_resize(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call("file.image-resize", fields).await
    }

    // --- sites ---

    pub async fn sites(&self) -> Result<Value, ApiError> {
        self.send(&Request::new("site.list")).await
    }

    pub async fn site_create(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call("site.create", fields).await
    }

    pub async fn site_domain_apply(&self, idx_site: &str, domain: &str) -> Result<Value, ApiError> {
        let request = Request::new("site.domain-apply")
            .field("idx_site", idx_site)
            .field("domain", domain);
        self.send(&request).await
    }

    pub async fn site_domain_delete(&self, domain: &str) -> Result<Value, ApiError> {
        self.run_with("site.domain-delete", "domain", domain).await
    }

    pub async fn site_sort_categories(&self, idx: impl Into<Value>, orders: Value) -> Result<Value, ApiError> {
        let request = Request::new("site.sort-categories")
            .field("idx", idx)
            .field("orders", orders);
        self.send(&request).await
    }

    /// Data for one named component of a site page.
    pub async fn site_component(&self, idx: impl Into<Value>, component: &str) -> Result<Value, ApiError> {
        self.run_with(&format!("site.components/{component}"), "idx", idx)
            .await
    }

    // --- categories ---

    pub async fn category(&self, category: impl Into<Value>) -> Result<Value, ApiError> {
        self.run_with("category.get", "category", category).await
    }

    pub async fn category_list(&self) -> Result<Value, ApiError> {
        self.send(&Request::new("category.list")).await
    }

    pub async fn category_create(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call("category.create", fields).await
    }

    pub async fn category_update(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call("category.update", fields).await
    }

    pub async fn category_delete(&self, idx: impl Into<Value>) -> Result<Value, ApiError> {
        self.run_with("category.delete", "idx", idx).await
    }

    // --- posts ---

    pub async fn post_list(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call("post.list", fields).await
    }

    pub async fn post_create(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call("post.create", fields).await
    }

    pub async fn post_get(&self, idx: impl Into<Value>) -> Result<Value, ApiError> {
        self.run_with("post.get", "idx", idx).await
    }

    pub async fn post_update(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call("post.update", fields).await
    }

    pub async fn post_delete(&self, idx: impl Into<Value>) -> Result<Value, ApiError> {
        self.run_with("post.delete", "idx", idx).await
    }

    // --- comments ---

    pub async fn comment_create(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call("comment.create", fields).await
    }

    pub async fn comment_update(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call("comment.update", fields).await
    }

    pub async fn comment_delete(&self, idx: impl Into<Value>) -> Result<Value, ApiError> {
        self.run_with("comment.delete", "idx", idx).await
    }

    // --- chat ---

    pub async fn chat_room(&self, idx: impl Into<Value>) -> Result<Value, ApiError> {
        self.run_with(&format!("{CHAT_PREFIX}room"), "idx", idx).await
    }

    pub async fn chat_rooms(&self) -> Result<Value, ApiError> {
        self.send(&Request::new(format!("{CHAT_PREFIX}rooms"))).await
    }

    pub async fn chat_create_room(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call(&format!("{CHAT_PREFIX}create-room"), fields).await
    }

    pub async fn chat_send_message(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call(&format!("{CHAT_PREFIX}send-message"), fields).await
    }

    pub async fn chat_all_messages(&self, room_name: &str) -> Result<Value, ApiError> {
        self.run_with(&format!("{CHAT_PREFIX}all-message"), "name", room_name)
            .await
    }

    // --- push notifications ---

    pub async fn push_token_save(&self, token: &str) -> Result<Value, ApiError> {
        self.run_with("push-notification.token-save", "token", token).await
    }

    pub async fn push_send(&self, fields: Map<String, Value>) -> Result<Value, ApiError> {
        self.call("push-notification.send", fields).await
    }
}
