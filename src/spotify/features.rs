use async_trait::async_trait;
use serde_json::Value;

use crate::{
    Error,
    batch::{BatchChunker, BatchSource, Enrichment},
    paging::Aggregate,
    types::{AudioFeatures, AudioFeaturesResponse, FeaturedTrack, TrackRecord},
};

use super::SpotifyClient;

/// `GET /audio-features?ids=…` for one chunk of ids.
struct AudioFeatureBatches<'a> {
    client: &'a SpotifyClient,
}

#[async_trait]
impl BatchSource for AudioFeatureBatches<'_> {
    async fn fetch_batch(&self, ids: &[String]) -> Result<Vec<Value>, Error> {
        let url = self.client.url("audio-features");
        let response: AudioFeaturesResponse = self
            .client
            .get_json(&url, &[("ids", ids.join(","))])
            .await?;
        Ok(response.audio_features)
    }
}

fn features(value: Value) -> Result<Option<AudioFeatures>, Error> {
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| Error::Format(format!("audio features: {}", e)))
}

impl SpotifyClient {
    fn chunker(&self) -> BatchChunker {
        BatchChunker::default().with_policy(self.policy())
    }

    /// Audio features for `ids`, concatenated in chunk order. Unknown ids
    /// keep their slot as `None`; a failed chunk contributes nothing, so use
    /// [`get_audio_features_by_id`](Self::get_audio_features_by_id) when the
    /// results have to be matched back to tracks.
    pub async fn get_audio_features(
        &self,
        ids: &[String],
    ) -> Result<Aggregate<Option<AudioFeatures>>, Error> {
        let source = AudioFeatureBatches { client: self };
        self.chunker().collect(&source, ids, features).await
    }

    /// Audio features for `ids`, keyed by track id.
    pub async fn get_audio_features_by_id(
        &self,
        ids: &[String],
    ) -> Result<Enrichment<AudioFeatures>, Error> {
        let source = AudioFeatureBatches { client: self };
        self.chunker()
            .collect_keyed(&source, ids, features, |f: &AudioFeatures| f.id.clone())
            .await
    }

    /// Joins every track with its audio features. Unavailable tracks and
    /// tracks whose chunk failed get no features; the failures are carried
    /// over into the result.
    pub async fn enrich_tracks(
        &self,
        tracks: Vec<TrackRecord>,
    ) -> Result<Aggregate<FeaturedTrack>, Error> {
        let ids: Vec<String> = tracks.iter().filter_map(|t| t.id.clone()).collect();
        let enrichment = self.get_audio_features_by_id(&ids).await?;

        let items = enrichment
            .attach(tracks, |t| t.id.as_deref())
            .into_iter()
            .map(|(track, features)| FeaturedTrack { track, features })
            .collect();

        Ok(Aggregate {
            items,
            failures: enrichment.failures,
        })
    }
}
