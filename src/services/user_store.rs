// src/services/user_store.rs
use crate::errors::FondayError;
use crate::models::{OAuthProfile, OAuthProvider, UserAccount};
use chrono::Utc;
use redis::{AsyncCommands, Client};
use uuid::Uuid;

const SESSION_TTL_SECS: usize = 86_400;
const OAUTH_STATE_TTL_SECS: usize = 600;

/// Redis-backed store for user records, provider-id indexes, login sessions
/// and short-lived OAuth state tokens.
pub struct UserStore {
    client: Client,
}

impl UserStore {
    pub async fn new(redis_url: &str) -> Result<Self, FondayError> {
        let client = Client::open(redis_url).map_err(|e| FondayError::Store(e.to_string()))?;

        // Test connection
        let mut conn = client
            .get_async_connection()
            .await
            .map_err(|e| FondayError::Store(e.to_string()))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| FondayError::Store(e.to_string()))?;

        Ok(Self { client })
    }

    async fn conn(&self) -> Result<redis::aio::Connection, FondayError> {
        self.client
            .get_async_connection()
            .await
            .map_err(|e| FondayError::Store(e.to_string()))
    }

    /// The identity contract: reuse the record indexed by the provider id,
    /// create one on first login. Records are never deleted.
    pub async fn lookup_or_create_user(
        &self,
        provider: OAuthProvider,
        profile: &OAuthProfile,
    ) -> Result<UserAccount, FondayError> {
        if let Some(user) = self.get_user_by_provider_id(provider, &profile.id).await? {
            return Ok(user);
        }
        self.create_user(provider, profile).await
    }

    pub async fn get_user(&self, user_id: &Uuid) -> Result<Option<UserAccount>, FondayError> {
        let mut conn = self.conn().await?;

        let key = format!("user:{}", user_id);
        let value: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| FondayError::Store(e.to_string()))?;

        value
            .map(|v| serde_json::from_str(&v).map_err(|e| FondayError::Serialization(e.to_string())))
            .transpose()
    }

    async fn get_user_by_provider_id(
        &self,
        provider: OAuthProvider,
        provider_id: &str,
    ) -> Result<Option<UserAccount>, FondayError> {
        let mut conn = self.conn().await?;

        let key = format!("user:{}:{}", provider.tag(), provider_id);
        let user_id: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| FondayError::Store(e.to_string()))?;

        match user_id {
            Some(id) => {
                let id = id
                    .parse::<Uuid>()
                    .map_err(|e| FondayError::Store(format!("corrupt user index: {}", e)))?;
                self.get_user(&id).await
            }
            None => Ok(None),
        }
    }

    async fn create_user(
        &self,
        provider: OAuthProvider,
        profile: &OAuthProfile,
    ) -> Result<UserAccount, FondayError> {
        let mut conn = self.conn().await?;

        // Display name when free, otherwise the provider-tagged fallback
        // keeps the username unique.
        let fallback = format!("{}_{}", provider.tag(), profile.id);
        let mut username = profile
            .display_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| fallback.clone());
        let taken: bool = conn
            .exists(format!("user:name:{}", username))
            .await
            .map_err(|e| FondayError::Store(e.to_string()))?;
        if taken {
            username = fallback;
        }

        let user = UserAccount {
            id: Uuid::new_v4(),
            username,
            password: None,
            google_id: (provider == OAuthProvider::Google).then(|| profile.id.clone()),
            kakao_id: (provider == OAuthProvider::Kakao).then(|| profile.id.clone()),
            email: profile.email.clone(),
            avatar: profile.avatar.clone(),
            created_at: Utc::now(),
        };

        let value =
            serde_json::to_string(&user).map_err(|e| FondayError::Serialization(e.to_string()))?;

        conn.set::<_, _, ()>(format!("user:{}", user.id), value)
            .await
            .map_err(|e| FondayError::Store(e.to_string()))?;
        conn.set::<_, _, ()>(format!("user:name:{}", user.username), user.id.to_string())
            .await
            .map_err(|e| FondayError::Store(e.to_string()))?;
        conn.set::<_, _, ()>(
            format!("user:{}:{}", provider.tag(), profile.id),
            user.id.to_string(),
        )
        .await
        .map_err(|e| FondayError::Store(e.to_string()))?;

        Ok(user)
    }

    pub async fn create_session(&self, user_id: &Uuid) -> Result<String, FondayError> {
        let mut conn = self.conn().await?;

        let session_id = Uuid::new_v4().to_string();

        // Sessions expire after 24 hours
        conn.set_ex::<_, _, ()>(
            format!("session:{}", session_id),
            user_id.to_string(),
            SESSION_TTL_SECS,
        )
        .await
        .map_err(|e| FondayError::Store(e.to_string()))?;

        Ok(session_id)
    }

    pub async fn session_user(&self, session_id: &str) -> Result<Option<UserAccount>, FondayError> {
        let mut conn = self.conn().await?;

        let user_id: Option<String> = conn
            .get(format!("session:{}", session_id))
            .await
            .map_err(|e| FondayError::Store(e.to_string()))?;

        match user_id {
            Some(id) => {
                let id = id
                    .parse::<Uuid>()
                    .map_err(|e| FondayError::Store(format!("corrupt session: {}", e)))?;
                self.get_user(&id).await
            }
            None => Ok(None),
        }
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), FondayError> {
        let mut conn = self.conn().await?;

        conn.del::<_, ()>(format!("session:{}", session_id))
            .await
            .map_err(|e| FondayError::Store(e.to_string()))?;

        Ok(())
    }

    pub async fn put_oauth_state(&self, state: &str) -> Result<(), FondayError> {
        let mut conn = self.conn().await?;

        conn.set_ex::<_, _, ()>(format!("oauth:state:{}", state), "1", OAUTH_STATE_TTL_SECS)
            .await
            .map_err(|e| FondayError::Store(e.to_string()))?;

        Ok(())
    }

    /// Consumes the state token. A token is valid exactly once.
    pub async fn take_oauth_state(&self, state: &str) -> Result<bool, FondayError> {
        let mut conn = self.conn().await?;

        let removed: i64 = conn
            .del(format!("oauth:state:{}", state))
            .await
            .map_err(|e| FondayError::Store(e.to_string()))?;

        Ok(removed > 0)
    }
}
