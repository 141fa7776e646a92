/// Device classification for delivery routing

/// User-agent fragments that mark a handheld device
pub const MOBILE_KEYWORDS: &[&str] = &[
    "mobile",
    "android",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "windows phone",
];

/// Narrowest non-handheld viewport in CSS pixels
pub const MOBILE_MAX_WIDTH: u32 = 768;

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub user_agent: String,
    /// Viewport width in CSS pixels
    pub width: u32,
    /// Whether the device reports touch input
    pub touch: bool,
}

impl DeviceProfile {
    pub fn desktop(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            width: 1280,
            touch: false,
        }
    }

    /// Handheld by user agent, or a narrow touch screen
    pub fn is_mobile(&self) -> bool {
        let ua = self.user_agent.to_ascii_lowercase();
        MOBILE_KEYWORDS.iter().any(|k| ua.contains(k)) || (self.width <= MOBILE_MAX_WIDTH && self.touch)
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::desktop(crate::platform::DEFAULT_USER_AGENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(ua: &str, width: u32, touch: bool) -> DeviceProfile {
        DeviceProfile { user_agent: ua.to_string(), width, touch }
    }

    #[test]
    fn user_agent_keywords_mark_mobile() {
        assert!(profile("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)", 1280, false).is_mobile());
        assert!(profile("Mozilla/5.0 (Linux; Android 14) Mobile", 1280, false).is_mobile());
        assert!(profile("Mozilla/5.0 (Windows Phone 10.0)", 1280, false).is_mobile());
        assert!(!DeviceProfile::default().is_mobile());
    }

    #[test]
    fn narrow_touch_screen_is_mobile() {
        assert!(profile("Mozilla/5.0 (X11; Linux x86_64)", 768, true).is_mobile());
        assert!(!profile("Mozilla/5.0 (X11; Linux x86_64)", 769, true).is_mobile());
        assert!(!profile("Mozilla/5.0 (X11; Linux x86_64)", 600, false).is_mobile());
    }
}
