//! Built-in `Greeter` business object.
//!
//! Small enough to read in one sitting; shows an anonymous function, an
//! authenticated one, one that reads the caller's session, and one that
//! ends it.

use std::sync::Arc;

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_dispatch::{BusinessObject, CallContext, FunctionTable};
use warden_session::SessionCache;

pub struct Greeter {
    sessions: SessionCache,
}

#[derive(Debug, Deserialize)]
pub struct HelloArgs {
    pub user_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HelloReply {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WhoamiReply {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub one_time: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutReply {
    pub revoked: bool,
}

impl Greeter {
    pub fn new(sessions: SessionCache) -> Self {
        Self { sessions }
    }

    async fn hello(self: Arc<Self>, _ctx: CallContext, args: HelloArgs) -> anyhow::Result<HelloReply> {
        let name = args.user_name.trim();
        if name.is_empty() {
            bail!("user_name must not be empty");
        }
        Ok(HelloReply {
            message: format!("Hello, {name}"),
        })
    }

    async fn whoami(self: Arc<Self>, ctx: CallContext, _args: Value) -> anyhow::Result<WhoamiReply> {
        let session = ctx.require_session()?;
        Ok(WhoamiReply {
            user_id: session.user_id.clone(),
            expires_at: session.expires_at,
            one_time: session.one_time,
        })
    }

    /// Revoke the caller's own session.
    async fn logout(self: Arc<Self>, ctx: CallContext, _args: Value) -> anyhow::Result<LogoutReply> {
        let token = ctx.require_session()?.token;
        let revoked = self.sessions.remove(&token).await?;
        Ok(LogoutReply { revoked })
    }

    async fn ping(self: Arc<Self>, _ctx: CallContext, _args: Value) -> anyhow::Result<&'static str> {
        Ok("pong")
    }
}

impl BusinessObject for Greeter {
    const OWNER_TYPE: &'static str = "Greeter";

    fn declare(table: &mut FunctionTable<Self>) {
        table
            .authenticated("Hello", Greeter::hello)
            .authenticated("Whoami", Greeter::whoami)
            .authenticated("Logout", Greeter::logout)
            .anonymous("Ping", Greeter::ping);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_dispatch::{CallArguments, DispatchError, Dispatcher, FunctionRegistry};
    use warden_session::{AccessTokenValidator, CacheConfig};

    fn setup() -> (Dispatcher, Arc<Greeter>, SessionCache) {
        let cache = SessionCache::in_memory(CacheConfig::new());
        let registry = FunctionRegistry::builder()
            .object::<Greeter>()
            .build()
            .unwrap();
        let dispatcher = Dispatcher::new(Arc::new(registry), AccessTokenValidator::new(cache.clone()));
        (dispatcher, Arc::new(Greeter::new(cache.clone())), cache)
    }

    #[tokio::test]
    async fn test_hello_amy() {
        let (dispatcher, greeter, cache) = setup();
        let session = cache.create("001", None, false).await.unwrap();

        let result = dispatcher
            .dispatch(
                &greeter,
                CallArguments::new("Hello", json!({"user_name": "Amy"})),
                session.token,
            )
            .await;
        let reply: HelloReply = result.decode().unwrap().unwrap();
        assert_eq!(reply.message, "Hello, Amy");
    }

    #[tokio::test]
    async fn test_hello_rejects_blank_name() {
        let (dispatcher, greeter, cache) = setup();
        let session = cache.create("001", None, false).await.unwrap();

        let result = dispatcher
            .dispatch(
                &greeter,
                CallArguments::new("Hello", json!({"user_name": "  "})),
                session.token,
            )
            .await;
        assert_eq!(
            result.error(),
            Some(&DispatchError::HandlerFailure("user_name must not be empty".to_string()))
        );
    }

    #[tokio::test]
    async fn test_whoami_and_logout() {
        let (dispatcher, greeter, cache) = setup();
        let session = cache.create("001", None, false).await.unwrap();

        let whoami = dispatcher
            .dispatch(&greeter, CallArguments::new("Whoami", Value::Null), session.token)
            .await;
        let reply: WhoamiReply = whoami.decode().unwrap().unwrap();
        assert_eq!(reply.user_id, "001");
        assert!(!reply.one_time);

        let logout = dispatcher
            .dispatch(&greeter, CallArguments::new("Logout", Value::Null), session.token)
            .await;
        let reply: LogoutReply = logout.decode().unwrap().unwrap();
        assert!(reply.revoked);

        let after = dispatcher
            .dispatch(&greeter, CallArguments::new("Whoami", Value::Null), session.token)
            .await;
        assert_eq!(after.error(), Some(&DispatchError::SessionNotFoundOrExpired));
    }
}
