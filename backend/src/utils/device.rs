use crate::models::session::DeviceType;

/// Classifies a client from an explicit hint or, failing that, its user agent.
pub fn classify_device(hint: Option<&str>, user_agent: Option<&str>) -> DeviceType {
    if let Some(device) = hint.and_then(|raw| raw.trim().parse::<DeviceType>().ok()) {
        return device;
    }

    let Some(agent) = user_agent.map(|ua| ua.to_ascii_lowercase()) else {
        return DeviceType::Unknown;
    };

    if ["electron", "tauri"].iter().any(|marker| agent.contains(marker)) {
        DeviceType::Desktop
    } else if ["mobile", "android", "iphone", "ipad", "okhttp", "cfnetwork"]
        .iter()
        .any(|marker| agent.contains(marker))
    {
        DeviceType::Mobile
    } else if agent.starts_with("mozilla/") {
        DeviceType::Web
    } else {
        DeviceType::Unknown
    }
}
