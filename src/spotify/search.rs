use serde_json::Value;

use crate::{
    Error, format,
    types::{SearchResponse, TrackRecord},
};

use super::SpotifyClient;

impl SpotifyClient {
    /// Best match for a title and artist, formatted. `None` when the search
    /// has no result.
    pub async fn search_track(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<TrackRecord>, Error> {
        match self.search_track_raw(title, artist).await? {
            Some(item) => format::format_track(&item).map(Some),
            None => Ok(None),
        }
    }

    /// Best match for a title and artist as returned by the provider.
    pub async fn search_track_raw(&self, title: &str, artist: &str) -> Result<Option<Value>, Error> {
        let url = self.url("search");
        let query = [
            ("q", format!("track:{} artist:{}", title, artist)),
            ("type", "track".to_string()),
            ("limit", "1".to_string()),
        ];
        let response: SearchResponse = self.get_json(&url, &query).await?;
        Ok(response.tracks.items.into_iter().next())
    }
}
