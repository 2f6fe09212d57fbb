//! Input validation for chat composition and group creation

/// Minimum number of invited members for a new group
pub const MIN_GROUP_MEMBERS: usize = 2;

/// Validates outgoing message text. Whitespace-only text is treated as empty.
pub fn validate_message(msg: &str) -> Result<(), String> {
    if msg.trim().is_empty() {
        return Err("Message cannot be empty".to_string());
    }
    Ok(())
}

/// Validates a group name (required, trimmed)
pub fn validate_group_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Group name is required".to_string());
    }
    if name.contains(|c: char| c.is_control()) {
        return Err("Group name contains invalid characters".to_string());
    }
    Ok(())
}

/// Validates the member selection for a new group
pub fn validate_group_members(member_ids: &[String]) -> Result<(), String> {
    let distinct: std::collections::HashSet<&str> = member_ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .collect();
    if distinct.len() < MIN_GROUP_MEMBERS {
        return Err(format!(
            "Select at least {} members for a group",
            MIN_GROUP_MEMBERS
        ));
    }
    Ok(())
}

/// Validates a user id used to open a direct chat
pub fn validate_user_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("User id cannot be empty".to_string());
    }
    if id.contains(|c: char| c.is_whitespace() || c.is_control()) {
        return Err("User id cannot contain whitespace".to_string());
    }
    Ok(())
}

/// Reduces an identifier to `[A-Za-z0-9_]`, replacing everything else with `_`
pub fn sanitize_room_id(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
