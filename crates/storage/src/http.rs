use async_trait::async_trait;
use progress_core::model::{
    ChapterMarker, LessonId, PreferenceRecord, PreferenceUpdate, ProgressRecord, ProgressUpdate,
    sort_chapters,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::StoreConfig;
use crate::envelope::{ChaptersData, PreferencesData, ProgressData, decode_envelope, decode_listing};
use crate::repository::{CourseListing, ProgressStore, StoreError};

/// Progress store backed by the course platform's JSON API.
///
/// One request per call: no retries and no caching.
#[derive(Clone)]
pub struct HttpProgressStore {
    client: Client,
    config: StoreConfig,
}

impl HttpProgressStore {
    /// # Errors
    ///
    /// Returns `StoreError::Transport` if the HTTP client cannot be built.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.api_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<(u16, Vec<u8>), StoreError> {
        let response = self.authorized(request).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok((status, body.to_vec()))
    }

    async fn send_enveloped<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, StoreError> {
        let (status, body) = self.send(request).await?;
        decode_envelope(status, &body)
    }
}

#[async_trait]
impl ProgressStore for HttpProgressStore {
    async fn get_progress(
        &self,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        let url = self.config.endpoint(&format!("progress/{lesson_id}"));
        tracing::debug!(%lesson_id, "fetching lesson progress");
        match self.send_enveloped::<ProgressData>(self.client.get(url)).await {
            Ok(data) => Ok(data.progress),
            // Unwatched lessons come back as 404 from some deployments.
            Err(StoreError::Status(404)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn upsert_progress(
        &self,
        lesson_id: LessonId,
        update: &ProgressUpdate,
    ) -> Result<ProgressRecord, StoreError> {
        let url = self.config.endpoint(&format!("progress/{lesson_id}"));
        let data: ProgressData = self
            .send_enveloped(self.client.put(url).json(update))
            .await?;
        data.progress
            .ok_or_else(|| StoreError::Malformed("upsert returned no progress".to_string()))
    }

    async fn get_preferences(&self) -> Result<PreferenceRecord, StoreError> {
        let url = self.config.endpoint("preferences");
        let data: PreferencesData = self.send_enveloped(self.client.get(url)).await?;
        Ok(data.preferences.sanitized())
    }

    async fn upsert_preferences(
        &self,
        update: &PreferenceUpdate,
    ) -> Result<PreferenceRecord, StoreError> {
        let url = self.config.endpoint("preferences");
        let data: PreferencesData = self
            .send_enveloped(self.client.put(url).json(update))
            .await?;
        Ok(data.preferences.sanitized())
    }

    async fn get_chapters(&self, lesson_id: LessonId) -> Result<Vec<ChapterMarker>, StoreError> {
        let url = self.config.endpoint(&format!("lessons/{lesson_id}/chapters"));
        let data: ChaptersData = self.send_enveloped(self.client.get(url)).await?;
        let mut chapters = data.chapters;
        sort_chapters(&mut chapters);
        Ok(chapters)
    }
}

#[async_trait]
impl CourseListing for HttpProgressStore {
    async fn get_dashboard_listing(&self) -> Result<Value, StoreError> {
        let url = self.config.endpoint("dashboard/progress");
        let (status, body) = self.send(self.client.get(url)).await?;
        decode_listing(status, &body)
    }
}
