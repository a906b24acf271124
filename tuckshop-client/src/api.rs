use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use thiserror::Error;
use tokio::sync::Notify;

use crate::{
    Ack, Item, LoginRequest, LoginResult, NewOrderRequest, Order, OrderDecisionRequest,
    OrderStatus, PopularMenu, Role,
};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The view that started the call went away before it finished
    #[error("Request was cancelled")]
    Cancelled,
    #[error("Server responded with {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Cancels in-flight calls when the view that started them is torn down.
/// Every asynchronous call takes one, and a cancelled call resolves without
/// touching any caller state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [cancel](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);

        // Register before the check so a concurrent cancel can't slip past
        notified.as_mut().enable();

        if self.is_cancelled() {
            return;
        }

        notified.await;
    }
}

/// A thin typed wrapper over the tuckshop REST surface. The session token
/// from a login sticks to the client and rides along on later calls.
pub struct ApiClient {
    base: String,
    http: Client,
    token: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            http: Client::new(),
            token: Mutex::new(None),
        }
    }

    pub async fn login(
        &self,
        cancel: &CancelToken,
        request: LoginRequest,
    ) -> Result<LoginResult, ClientError> {
        let url = format!("{}/auth", self.base);
        let result: LoginResult = self.send(cancel, self.http.post(url).json(&request)).await?;

        *self.token.lock() = Some(result.token.clone());
        Ok(result)
    }

    pub async fn items(&self, cancel: &CancelToken) -> Result<Vec<Item>, ClientError> {
        let url = format!("{}/items", self.base);
        self.send(cancel, self.http.get(url)).await
    }

    /// Lists orders, optionally narrowed to one requester
    pub async fn orders(
        &self,
        cancel: &CancelToken,
        student_name: Option<&str>,
    ) -> Result<Vec<Order>, ClientError> {
        let url = format!("{}/orders", self.base);
        let mut request = self.http.get(url);

        if let Some(name) = student_name {
            request = request.query(&[("studentName", name)]);
        }

        self.send(cancel, request).await
    }

    pub async fn place_order(
        &self,
        cancel: &CancelToken,
        new_order: &NewOrderRequest,
    ) -> Result<Order, ClientError> {
        let url = format!("{}/orders", self.base);
        self.send(cancel, self.http.post(url).json(new_order)).await
    }

    /// Accept or reject a pending order, staff only
    pub async fn decide_order(
        &self,
        cancel: &CancelToken,
        order_id: i32,
        status: OrderStatus,
    ) -> Result<Order, ClientError> {
        let url = format!("{}/orders/{order_id}", self.base);
        let body = OrderDecisionRequest { status };

        self.send(cancel, self.http.patch(url).json(&body)).await
    }

    pub async fn cancel_order(
        &self,
        cancel: &CancelToken,
        order_id: i32,
    ) -> Result<Ack, ClientError> {
        let url = format!("{}/orders/{order_id}", self.base);
        self.send(cancel, self.http.delete(url)).await
    }

    pub async fn popular_menus(&self, cancel: &CancelToken) -> Result<Vec<PopularMenu>, ClientError> {
        let url = format!("{}/orders/popular", self.base);
        self.send(cancel, self.http.get(url)).await
    }

    pub async fn cheers_today(
        &self,
        cancel: &CancelToken,
        target: Option<Role>,
    ) -> Result<Vec<crate::Cheer>, ClientError> {
        let url = format!("{}/cheer/today", self.base);
        let mut request = self.http.get(url);

        if let Some(target) = target {
            let value = match target {
                Role::Student => "student",
                Role::Teacher => "teacher",
            };
            request = request.query(&[("target", value)]);
        }

        self.send(cancel, request).await
    }

    fn authorization(&self) -> Option<String> {
        self.token.lock().clone()
    }

    async fn send<T>(&self, cancel: &CancelToken, request: RequestBuilder) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let request = match self.authorization() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status();

        if !status.is_success() {
            let message = tokio::select! {
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                text = response.text() => text.unwrap_or_default(),
            };

            return Err(ClientError::Api { status, message });
        }

        let value = tokio::select! {
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            value = response.json::<T>() => value?,
        };

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_tokens_resolve_immediately() {
        let token = CancelToken::new();
        token.cancel();

        assert!(token.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn cancelling_wakes_waiters() {
        let token = CancelToken::new();
        let waiting = token.clone();

        let waiter = tokio::spawn(async move { waiting.cancelled().await });

        token.cancel();
        waiter.await.expect("waiter resolves");
    }

    #[tokio::test]
    async fn cancelled_calls_resolve_to_cancelled() {
        // Nothing listens on this address, the cancel must win regardless
        let api = ApiClient::new("http://127.0.0.1:9");
        let token = CancelToken::new();
        token.cancel();

        let result = api.items(&token).await;
        assert!(matches!(result, Err(ClientError::Cancelled)));
    }
}
