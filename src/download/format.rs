//! Download profiles offered in the format menu.

/// Kind of attachment a download is delivered as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Sent with `sendVideo`
    Video,
    /// Sent with `sendAudio`
    Audio,
}

/// One of the fixed download profiles the user can pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatChoice {
    /// Video capped at 360 pixels high
    Video360,
    /// Video capped at 720 pixels high
    Video720,
    /// Best available audio-only stream
    Audio,
}

impl FormatChoice {
    /// All choices in menu order
    pub const ALL: [Self; 3] = [Self::Video360, Self::Video720, Self::Audio];

    /// Value carried in the inline button's callback data
    #[must_use]
    pub const fn callback_data(self) -> &'static str {
        match self {
            Self::Video360 => "360",
            Self::Video720 => "720",
            Self::Audio => "mp3",
        }
    }

    /// Parse callback data back into a choice. Unknown data yields `None`.
    #[must_use]
    pub fn from_callback_data(data: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|choice| choice.callback_data() == data)
    }

    /// Button label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Video360 => "360p",
            Self::Video720 => "720p",
            Self::Audio => "Audio",
        }
    }

    /// Height ceiling for video profiles
    #[must_use]
    pub const fn max_height(self) -> Option<u32> {
        match self {
            Self::Video360 => Some(360),
            Self::Video720 => Some(720),
            Self::Audio => None,
        }
    }

    /// yt-dlp `-f` format selector
    #[must_use]
    pub fn format_selector(self) -> String {
        match self.max_height() {
            Some(height) => format!("best[height<={height}]"),
            None => "bestaudio/best".to_string(),
        }
    }

    /// How the downloaded file is delivered
    #[must_use]
    pub const fn media_kind(self) -> MediaKind {
        match self {
            Self::Video360 | Self::Video720 => MediaKind::Video,
            Self::Audio => MediaKind::Audio,
        }
    }
}
