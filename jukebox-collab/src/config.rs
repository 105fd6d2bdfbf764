/// The configuration of the collab system
#[derive(Debug, Clone)]
pub struct Config {
    /// How many characters a generated room code has
    pub room_code_length: usize,
    /// The like threshold used when a room is created without one
    pub default_like_threshold: u32,
    /// Base url of the Spotify Web API
    pub spotify_api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // 36^6 codes, short enough to read out loud
            room_code_length: 6,
            default_like_threshold: 3,
            spotify_api_url: "https://api.spotify.com/v1".to_string(),
        }
    }
}
