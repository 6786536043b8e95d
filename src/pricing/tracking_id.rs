use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde_json::json;

use super::remote::{RemoteProcedureClient, RemoteProcedureError, GENERATE_TRACKING_NUMBER};

/// Uppercase letters and digits without the easily confused 0, O, 1 and I
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const RANDOM_LEN: usize = 8;

#[async_trait]
pub trait TrackingIdGenerator: Send + Sync {
    async fn generate(&self) -> Result<String, RemoteProcedureError>;
}

/// `{prefix}{yymmdd}{8 random}`, e.g. `CL240301K7QX2MPA`
#[derive(Debug, Clone)]
pub struct PrefixedTrackingIdGenerator {
    prefix: String,
}

impl PrefixedTrackingIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().to_ascii_uppercase(),
        }
    }

    pub fn next_id(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..RANDOM_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        format!("{}{}{}", self.prefix, Utc::now().format("%y%m%d"), suffix)
    }
}

#[async_trait]
impl TrackingIdGenerator for PrefixedTrackingIdGenerator {
    async fn generate(&self) -> Result<String, RemoteProcedureError> {
        Ok(self.next_id())
    }
}

/// Generator backed by the `generate_tracking_number` remote procedure
#[derive(Debug, Clone)]
pub struct RemoteTrackingIdGenerator {
    client: RemoteProcedureClient,
}

impl RemoteTrackingIdGenerator {
    pub fn new(client: RemoteProcedureClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TrackingIdGenerator for RemoteTrackingIdGenerator {
    async fn generate(&self) -> Result<String, RemoteProcedureError> {
        let value: String = self.client.call(GENERATE_TRACKING_NUMBER, &json!({})).await?;
        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(RemoteProcedureError::Decode {
                procedure: GENERATE_TRACKING_NUMBER.to_string(),
                message: "empty tracking number".into(),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_ids_carry_prefix_date_and_suffix() {
        let generator = PrefixedTrackingIdGenerator::new("cl");
        let id = generator.next_id();
        let today = Utc::now().format("%y%m%d").to_string();

        assert!(id.starts_with("CL"));
        assert_eq!(&id[2..8], today);
        assert_eq!(id.len(), 2 + 6 + RANDOM_LEN);
        assert!(id[8..].bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn consecutive_ids_differ() {
        let generator = PrefixedTrackingIdGenerator::new("CL");
        assert_ne!(generator.next_id(), generator.next_id());
    }
}
