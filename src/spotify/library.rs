use serde_json::Value;

use crate::{
    Error, format,
    paging::{Aggregate, LIBRARY_PAGE_SIZE, TRACK_LISTING_PAGE_SIZE},
    types::{PlaylistSummary, SavedAlbumSummary, TrackRecord},
};

use super::SpotifyClient;

impl SpotifyClient {
    /// Every track of a playlist, formatted. `max_pages` caps the walk at that
    /// many pages of 100.
    pub async fn get_playlist_tracks(
        &self,
        playlist_id: &str,
        max_pages: Option<usize>,
    ) -> Result<Aggregate<TrackRecord>, Error> {
        self.get_playlist_tracks_with(playlist_id, max_pages, format::format_track_item)
            .await
    }

    pub async fn get_playlist_tracks_with<O, F>(
        &self,
        playlist_id: &str,
        max_pages: Option<usize>,
        formatter: F,
    ) -> Result<Aggregate<O>, Error>
    where
        F: Fn(&Value) -> Result<O, Error>,
    {
        let source = self.pages(format!("playlists/{}/tracks", playlist_id));
        self.paginator(TRACK_LISTING_PAGE_SIZE)
            .with_max_pages(max_pages)
            .collect(&source, |item| formatter(&item))
            .await
    }

    /// Every track of an album. Album listings hold simplified tracks, so the
    /// records carry no album, artwork or year.
    pub async fn get_album_tracks(&self, album_id: &str) -> Result<Aggregate<TrackRecord>, Error> {
        self.get_album_tracks_with(album_id, format::format_track)
            .await
    }

    pub async fn get_album_tracks_with<O, F>(
        &self,
        album_id: &str,
        formatter: F,
    ) -> Result<Aggregate<O>, Error>
    where
        F: Fn(&Value) -> Result<O, Error>,
    {
        let source = self.pages(format!("albums/{}/tracks", album_id));
        self.paginator(TRACK_LISTING_PAGE_SIZE)
            .collect(&source, |item| formatter(&item))
            .await
    }

    /// Playlists owned or followed by the authorized user.
    pub async fn get_user_playlists(&self) -> Result<Aggregate<PlaylistSummary>, Error> {
        self.get_user_playlists_with(format::playlist_summary).await
    }

    pub async fn get_user_playlists_with<O, F>(&self, formatter: F) -> Result<Aggregate<O>, Error>
    where
        F: Fn(&Value) -> Result<O, Error>,
    {
        let source = self.pages("me/playlists");
        self.paginator(LIBRARY_PAGE_SIZE)
            .collect(&source, |item| formatter(&item))
            .await
    }

    /// Albums saved in the user's library.
    pub async fn get_user_albums(&self) -> Result<Aggregate<SavedAlbumSummary>, Error> {
        self.get_user_albums_with(format::saved_album_summary).await
    }

    pub async fn get_user_albums_with<O, F>(&self, formatter: F) -> Result<Aggregate<O>, Error>
    where
        F: Fn(&Value) -> Result<O, Error>,
    {
        let source = self.pages("me/albums");
        self.paginator(LIBRARY_PAGE_SIZE)
            .collect(&source, |item| formatter(&item))
            .await
    }

    /// Tracks the user has liked.
    pub async fn get_liked_tracks(&self) -> Result<Aggregate<TrackRecord>, Error> {
        self.get_liked_tracks_with(format::format_track_item).await
    }

    pub async fn get_liked_tracks_with<O, F>(&self, formatter: F) -> Result<Aggregate<O>, Error>
    where
        F: Fn(&Value) -> Result<O, Error>,
    {
        let source = self.pages("me/tracks");
        self.paginator(LIBRARY_PAGE_SIZE)
            .collect(&source, |item| formatter(&item))
            .await
    }
}
