//! Video meeting links for the active conversation.

use reqwest::Url;

use crate::error::{ChatError, Result};
use crate::store::ActiveConversation;
use crate::validation::sanitize_room_id;

const DEFAULT_MEETING_NAME: &str = "Video Call";

/// Build `<base>/videocall?roomID=room_<key>&meetingName=<name>` for a
/// conversation. The key is reduced to `[A-Za-z0-9_]` so every participant
/// derives the same room.
pub fn meeting_link(base_url: &str, key: &str, name: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ChatError::Configuration(format!("meeting base url: {}", e)))?;
    // Append to the base path as given, including any context path
    url.path_segments_mut()
        .map_err(|_| ChatError::Configuration(format!("meeting base url: {} has no path", base_url)))?
        .pop_if_empty()
        .push("videocall");

    let room_id = sanitize_room_id(&format!("room_{}", key));
    let name = name.trim();
    let name = if name.is_empty() {
        DEFAULT_MEETING_NAME
    } else {
        name
    };
    url.query_pairs_mut()
        .append_pair("roomID", &room_id)
        .append_pair("meetingName", name);
    Ok(url)
}

/// Meeting link for whatever conversation is active, if any.
pub fn link_for_active(base_url: &str, active: Option<&ActiveConversation>) -> Option<Result<Url>> {
    active.map(|a| meeting_link(base_url, a.key.as_str(), &a.name))
}
