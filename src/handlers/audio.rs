//! Audio replies keyed by message text.
//!
//! A message whose text matches a file under the audio directory gets that
//! file sent back. The provider-assigned file id is remembered together with
//! a content hash, so an unchanged file is re-sent by id instead of being
//! uploaded again.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use super::UpdateHandler;
use crate::event::InboundEvent;
use crate::outbound::{ChatActivity, Outbound};
use crate::outbound::transport::AudioPayload;
use crate::store::{AudioRecord, AudioStore};

/// Sends audio files matching the message text.
pub struct AudioHandler {
    audio: Arc<dyn AudioStore>,
    transport: Arc<dyn Outbound>,
    audio_dir: PathBuf,
}

impl AudioHandler {
    /// Create the handler serving files from `audio_dir`.
    #[must_use]
    pub fn new(audio: Arc<dyn AudioStore>, transport: Arc<dyn Outbound>, audio_dir: PathBuf) -> Self {
        Self {
            audio,
            transport,
            audio_dir,
        }
    }
}

fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[async_trait]
impl UpdateHandler for AudioHandler {
    async fn handle(&self, event: &InboundEvent, text: &str) -> Result<bool> {
        let Some(chat_id) = event.chat_id() else {
            return Ok(false);
        };

        let key = text.trim().to_lowercase();
        if key.is_empty() {
            return Ok(false);
        }

        let path = self.audio_dir.join(format!("{key}.mp3"));
        let Ok(bytes) = tokio::fs::read(&path).await else {
            return Ok(false);
        };
        let hash = content_hash(&bytes);

        self.transport
            .send_chat_action(chat_id, ChatActivity::RecordVoice)
            .await?;

        let known = self.audio.get_by_key(&key).await?;
        if let Some(record) = &known {
            if record.file_hash == hash {
                self.transport
                    .send_audio(chat_id, AudioPayload::CachedId(record.file_id.clone()))
                    .await?;
                return Ok(true);
            }
            // Content changed since the upload, so the cached id is stale.
            self.audio.remove_by_key(&record.key).await?;
        }

        let uploaded = self
            .transport
            .send_audio(
                chat_id,
                AudioPayload::Upload {
                    file_name: format!("{key}.mp3"),
                    bytes,
                },
            )
            .await?;

        if let Some(file_id) = uploaded {
            self.audio
                .add(AudioRecord {
                    key,
                    file_id,
                    file_hash: hash,
                    created_at: Utc::now(),
                })
                .await?;
        }
        Ok(true)
    }
}
