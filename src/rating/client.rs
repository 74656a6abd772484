use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::PairingError;
use crate::model::TeeSetContext;
use crate::rating::{CourseHandicapResult, GolferEntry, PlayingHandicapResult, RatingService};

const FAN_OUT: usize = 4;

#[derive(Serialize)]
struct RatingRequest<'a> {
    tee_set: &'a TeeSetContext,
    golfers: &'a [GolferEntry],
}

/// Rating service reached over HTTP. `base_url` is the service root; the two
/// passes post to `course-handicaps` and `playing-handicaps` below it.
#[derive(Clone)]
pub struct HttpRatingService {
    client: Client,
    base_url: String,
}

impl HttpRatingService {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

async fn post_golfers<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    tee_set: &TeeSetContext,
    golfers: &[GolferEntry],
) -> Result<Vec<T>, PairingError> {
    let resp = client
        .post(url)
        .json(&RatingRequest { tee_set, golfers })
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.json::<Vec<T>>().await?)
}

#[async_trait]
impl RatingService for HttpRatingService {
    async fn course_handicaps(
        &self,
        tee_set: &TeeSetContext,
        golfers: &[GolferEntry],
    ) -> Result<Vec<CourseHandicapResult>, PairingError> {
        if golfers.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = golfers.len().div_ceil(FAN_OUT);
        let url = self.url("course-handicaps");
        let mut futures = Vec::with_capacity(FAN_OUT);
        for chunk in golfers.chunks(chunk_size) {
            let client = self.client.clone();
            let url = url.clone();
            let tee_set = tee_set.clone();
            let chunk = chunk.to_vec();
            futures.push(tokio::task::spawn(async move {
                post_golfers::<CourseHandicapResult>(&client, &url, &tee_set, &chunk).await
            }));
        }

        let mut combined = Vec::with_capacity(golfers.len());
        for joined in futures::future::join_all(futures).await {
            let results = joined
                .map_err(|e| PairingError::ExternalService(format!("rating task failed: {e}")))??;
            combined.extend(results);
        }
        debug!(golfers = golfers.len(), results = combined.len(), "course handicaps fetched");
        Ok(combined)
    }

    async fn playing_handicaps(
        &self,
        tee_set: &TeeSetContext,
        group: &[GolferEntry],
    ) -> Result<Vec<PlayingHandicapResult>, PairingError> {
        post_golfers(&self.client, &self.url("playing-handicaps"), tee_set, group).await
    }
}
