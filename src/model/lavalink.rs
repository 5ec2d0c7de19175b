use serde::{
    Serialize,
    Deserialize
};
use super::track::TrackRef;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Tracks {
    #[serde(default)]
    pub playlist_info: PlaylistInfo,
    pub load_type: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
    pub exception: Option<Exception>
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Track {
    pub track: String,
    pub info: Option<TrackInfo>
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub identifier: String,
    pub is_seekable: bool,
    pub author: String,
    pub length: u64,
    pub is_stream: bool,
    pub position: u64,
    pub title: String,
    pub uri: String
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Exception {
    pub message: String,
    pub severity: String
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct PlaylistInfo {
    pub name: Option<String>,
    #[serde(rename = "selectedTrack")]
    pub selected_track: Option<i64>
}

impl From<Track> for TrackRef {
    fn from(track: Track) -> TrackRef {
        match track.info {
            Some(info) => {
                let thumbnail = if info.uri.contains("youtube.com") || info.uri.contains("youtu.be") {
                    Some(format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", info.identifier))
                } else {
                    None
                };

                TrackRef {
                    locator: track.track,
                    title: info.title,
                    duration_seconds: info.length / 1000,
                    thumbnail_url: thumbnail,
                    requester_id: None,
                }
            },
            None => TrackRef::new(track.track, "Unknown")
        }
    }
}
