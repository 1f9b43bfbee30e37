use santa_core::config::MediaConfig;

use crate::swml::{Language, PromptSection};

pub const SANTA_VOICE: &str = "elevenlabs.uDsPstFWFBUXjIBimV7s";
pub const BACKGROUND_FILE_VOLUME: i64 = -10;
pub const DEFAULT_HOST: &str = "localhost:5000";

pub const POST_PROMPT: &str = "Summarize the conversation, including all the gifts discussed, \
the child's preferences, their selected gift if any, and any special mentions about their \
Christmas wishes.";

pub const SPEECH_HINTS: &[&str] = &[
    "toy",
    "toys",
    "game",
    "games",
    "doll",
    "dolls",
    "lego",
    "puzzle",
    "bicycle",
    "bike",
    "scooter",
    "christmas",
    "present",
    "gift",
    "santa",
    "elves",
    "nice",
    "naughty",
    "list",
    "workshop",
    "north pole",
    "yes",
    "no",
    "please",
    "thank you",
    "option one",
    "option two",
    "option three",
    "first",
    "second",
    "third",
];

pub fn language() -> Language {
    Language {
        name: "English".to_string(),
        code: "en-US".to_string(),
        voice: SANTA_VOICE.to_string(),
    }
}

pub fn prompt_sections(christmas_year: &str) -> Vec<PromptSection> {
    vec![
        PromptSection::new(
            "Personality",
            format!(
                "You are Santa Claus, speaking directly to a child who has called you at the North Pole. \
You're jolly, warm, and magical. You love to hear what children want for Christmas and help them \
choose the perfect gift. Use phrases like \"Ho ho ho!\", \"Merry Christmas!\", and refer to your \
workshop, elves, and reindeer. Keep responses cheerful but concise - remember you're having \
a phone conversation with an excited child. It is the Christmas {christmas_year} season."
            ),
        ),
        PromptSection::new(
            "Conversation Flow",
            "Follow these conversation states:

1. GREETING: Welcome the child warmly, ask their name, and find out what they'd like for Christmas
2. COLLECTING_WISHES: Listen to what gifts they're interested in, ask clarifying questions if needed
3. SEARCHING_GIFTS: Let them know you're checking your workshop and Amazon's catalog
4. PRESENTING_OPTIONS: Present up to 3 gift options enthusiastically
5. CONFIRMING_SELECTION: Help them choose ONE gift (gently explain they can only pick one)
6. SENDING_GIFT: Confirm you'll send the gift details to their parents

Always maintain the magic of Christmas and never break character.",
        ),
        PromptSection::new(
            "Speech Patterns",
            "Use natural speech patterns including:
- \"Ho ho ho!\" when greeting or expressing joy
- \"Let me check my list...\" when searching
- \"Oh my!\" when surprised
- \"Wonderful choice!\" when they select something
- \"The elves will love making this!\" when confirming

Add natural pauses with filler words like \"hmm\", \"let's see\", \"ah yes\" to sound more natural.",
        ),
        PromptSection::new(
            "Available Tools",
            "You have access to these magical tools to help children:

1. search_gifts - Use this when a child tells you what they want for Christmas.
   This searches both Santa's workshop and Amazon's catalog.
   Example: If a child says \"I want Legos\", use search_gifts with query=\"lego sets\"

2. select_gift - Use this after presenting options to confirm which gift they chose.
   This records their selection and shows it on the screen.

3. check_nice_list - Use this when a child asks if they're on the nice list or
   when you want to check their behavior status. Always use their name.

IMPORTANT: You MUST use these tools during the conversation!
- When a child mentions what they want → use search_gifts
- After they pick from options → use select_gift
- When checking nice list → use check_nice_list",
        ),
    ]
}

/// Media URLs handed to the AI verb. They point back at this server's static
/// files, so they follow whatever host the platform reached us on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaUrls {
    pub base_url: String,
    pub video_idle: String,
    pub video_talking: String,
    pub background: String,
}

impl MediaUrls {
    pub fn from_request(
        host: Option<&str>,
        forwarded_proto: Option<&str>,
        overrides: &MediaConfig,
    ) -> Self {
        let base_url = request_base_url(host, forwarded_proto);
        Self {
            video_idle: overrides
                .video_idle_url
                .clone()
                .unwrap_or_else(|| format!("{base_url}/santa_idle.mp4")),
            video_talking: overrides
                .video_talking_url
                .clone()
                .unwrap_or_else(|| format!("{base_url}/santa_talking.mp4")),
            background: format!("{base_url}/background.mp3"),
            base_url,
        }
    }
}

/// `<scheme>://<host>` as seen by the caller. Behind a proxy the scheme comes
/// from `x-forwarded-proto` and defaults to https; local hosts are always http.
pub fn request_base_url(host: Option<&str>, forwarded_proto: Option<&str>) -> String {
    let host = host.map(str::trim).filter(|value| !value.is_empty()).unwrap_or(DEFAULT_HOST);
    let is_local = host.contains("localhost") || host.contains("127.0.0.1");
    let scheme = if is_local {
        "http"
    } else {
        forwarded_proto
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("https")
    };
    format!("{scheme}://{host}")
}

#[cfg(test)]
mod tests {
    use santa_core::config::MediaConfig;

    use super::{prompt_sections, request_base_url, MediaUrls};

    #[test]
    fn local_hosts_always_use_http() {
        assert_eq!(request_base_url(None, None), "http://localhost:5000");
        assert_eq!(request_base_url(Some("127.0.0.1:5000"), Some("https")), "http://127.0.0.1:5000");
    }

    #[test]
    fn public_hosts_default_to_https_and_honor_forwarded_proto() {
        assert_eq!(request_base_url(Some("santa.example.com"), None), "https://santa.example.com");
        assert_eq!(
            request_base_url(Some("santa.example.com"), Some("http, https")),
            "http://santa.example.com"
        );
    }

    #[test]
    fn media_urls_follow_request_host() {
        let urls =
            MediaUrls::from_request(Some("santa.example.com"), None, &MediaConfig::default());

        assert_eq!(urls.video_idle, "https://santa.example.com/santa_idle.mp4");
        assert_eq!(urls.video_talking, "https://santa.example.com/santa_talking.mp4");
        assert_eq!(urls.background, "https://santa.example.com/background.mp3");
    }

    #[test]
    fn configured_video_urls_win_over_request_host() {
        let overrides = MediaConfig {
            video_idle_url: Some("https://cdn.example.com/idle.mp4".to_string()),
            ..MediaConfig::default()
        };
        let urls = MediaUrls::from_request(Some("santa.example.com"), None, &overrides);

        assert_eq!(urls.video_idle, "https://cdn.example.com/idle.mp4");
        assert_eq!(urls.video_talking, "https://santa.example.com/santa_talking.mp4");
    }

    #[test]
    fn prompt_mentions_every_tool_and_the_season() {
        let sections = prompt_sections("2031");
        let titles: Vec<_> = sections.iter().map(|section| section.title.as_str()).collect();

        assert_eq!(titles, ["Personality", "Conversation Flow", "Speech Patterns", "Available Tools"]);
        assert!(sections[0].body.contains("Christmas 2031"));
        for tool in ["search_gifts", "select_gift", "check_nice_list"] {
            assert!(sections[3].body.contains(tool), "tools section should mention {tool}");
        }
    }
}
