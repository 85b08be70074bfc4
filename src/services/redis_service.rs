// src/services/redis_service.rs
use crate::errors::SnapcodeError;
use crate::models::GenerationRecord;
use redis::{AsyncCommands, Client};
use uuid::Uuid;

/// Generations expire after a day.
const GENERATION_TTL_SECS: usize = 86400;
const RECENT_KEY: &str = "generations:recent";
const RECENT_LIMIT: isize = 50;

pub struct RedisService {
    client: Client,
}

pub(crate) fn generation_key(id: &Uuid) -> String {
    format!("generation:{}", id)
}

impl RedisService {
    /// Opens the client and checks the server answers.
    pub async fn new(redis_url: &str) -> Result<Self, SnapcodeError> {
        let service = Self::open(redis_url)?;

        let mut conn = service.connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| SnapcodeError::Redis(e.to_string()))?;

        Ok(service)
    }

    /// Opens the client without connecting.
    pub fn open(redis_url: &str) -> Result<Self, SnapcodeError> {
        let client = Client::open(redis_url).map_err(|e| SnapcodeError::Redis(e.to_string()))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::Connection, SnapcodeError> {
        self.client
            .get_async_connection()
            .await
            .map_err(|e| SnapcodeError::Redis(e.to_string()))
    }

    pub async fn store_generation(&self, record: &GenerationRecord) -> Result<(), SnapcodeError> {
        let mut conn = self.connection().await?;

        let value = serde_json::to_string(record)
            .map_err(|e| SnapcodeError::Serialization(e.to_string()))?;

        conn.set_ex::<_, _, ()>(generation_key(&record.id), value, GENERATION_TTL_SECS)
            .await
            .map_err(|e| SnapcodeError::Redis(e.to_string()))?;

        conn.lpush::<_, _, ()>(RECENT_KEY, record.id.to_string())
            .await
            .map_err(|e| SnapcodeError::Redis(e.to_string()))?;
        conn.ltrim::<_, ()>(RECENT_KEY, 0, RECENT_LIMIT - 1)
            .await
            .map_err(|e| SnapcodeError::Redis(e.to_string()))?;

        Ok(())
    }

    pub async fn get_generation(&self, id: &Uuid) -> Result<GenerationRecord, SnapcodeError> {
        let mut conn = self.connection().await?;

        let value: Option<String> = conn
            .get(generation_key(id))
            .await
            .map_err(|e| SnapcodeError::Redis(e.to_string()))?;
        let value = value
            .ok_or_else(|| SnapcodeError::NotFound(format!("Generation {}", id)))?;

        serde_json::from_str(&value).map_err(|e| SnapcodeError::Serialization(e.to_string()))
    }

    /// Ids of the latest generations, newest first. Expired ids may still appear.
    pub async fn recent_generations(&self) -> Result<Vec<Uuid>, SnapcodeError> {
        let mut conn = self.connection().await?;

        let ids: Vec<String> = conn
            .lrange(RECENT_KEY, 0, RECENT_LIMIT - 1)
            .await
            .map_err(|e| SnapcodeError::Redis(e.to_string()))?;

        Ok(ids
            .iter()
            .filter_map(|id| Uuid::parse_str(id).ok())
            .collect())
    }
}
