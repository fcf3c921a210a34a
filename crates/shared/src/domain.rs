use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(InvitationId);
id_newtype!(MediaId);
id_newtype!(UploadId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    #[default]
    Wedding,
    Engagement,
    Henna,
    Birthday,
    Circumcision,
    BabyShower,
}

impl EventCategory {
    pub const ALL: [EventCategory; 6] = [
        EventCategory::Wedding,
        EventCategory::Engagement,
        EventCategory::Henna,
        EventCategory::Birthday,
        EventCategory::Circumcision,
        EventCategory::BabyShower,
    ];

    /// Display label shown to users.
    pub fn label(self) -> &'static str {
        match self {
            EventCategory::Wedding => "Düğün",
            EventCategory::Engagement => "Nişan",
            EventCategory::Henna => "Kına",
            EventCategory::Birthday => "Doğum Günü",
            EventCategory::Circumcision => "Sünnet",
            EventCategory::BabyShower => "Baby Shower",
        }
    }
}

/// Background music offered by the invitation page.
///
/// Deserialization is lossy: any value outside the known set becomes
/// [`MusicTrack::RomanticPiano`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MusicTrack {
    #[default]
    RomanticPiano,
    WeddingMarch,
    AcousticGuitar,
    ClassicalStrings,
    SoftJazz,
}

impl MusicTrack {
    pub const ALL: [MusicTrack; 5] = [
        MusicTrack::RomanticPiano,
        MusicTrack::WeddingMarch,
        MusicTrack::AcousticGuitar,
        MusicTrack::ClassicalStrings,
        MusicTrack::SoftJazz,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MusicTrack::RomanticPiano => "romantic-piano",
            MusicTrack::WeddingMarch => "wedding-march",
            MusicTrack::AcousticGuitar => "acoustic-guitar",
            MusicTrack::ClassicalStrings => "classical-strings",
            MusicTrack::SoftJazz => "soft-jazz",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|track| track.as_str() == raw)
    }

    pub fn parse_or_default(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_default()
    }

    pub fn asset_path(self) -> String {
        format!("/audio/{}.mp3", self.as_str())
    }
}

impl fmt::Display for MusicTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MusicTrack {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MusicTrack {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .map(MusicTrack::parse_or_default)
            .unwrap_or_default())
    }
}

/// Optional visual elements a category may enable by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalElement {
    Subtitle,
    Avatar,
    Note,
    Date,
    Venue,
    Countdown,
    ReminderButton,
    ScrollIndicator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementVisibility {
    pub show_subtitle: bool,
    pub show_avatar: bool,
    pub show_note: bool,
    pub show_date: bool,
    pub show_venue: bool,
    pub show_countdown: bool,
    pub show_reminder_button: bool,
    pub show_scroll_indicator: bool,
}

impl ElementVisibility {
    pub fn from_elements(elements: &[OptionalElement], supports_avatar: bool) -> Self {
        let has = |element: OptionalElement| elements.contains(&element);
        Self {
            show_subtitle: has(OptionalElement::Subtitle),
            show_avatar: has(OptionalElement::Avatar) && supports_avatar,
            show_note: has(OptionalElement::Note),
            show_date: has(OptionalElement::Date),
            show_venue: has(OptionalElement::Venue),
            show_countdown: has(OptionalElement::Countdown),
            show_reminder_button: has(OptionalElement::ReminderButton),
            show_scroll_indicator: has(OptionalElement::ScrollIndicator),
        }
    }
}

/// The in-progress invitation as authored in the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvitationFormData {
    pub template_id: String,
    pub category: EventCategory,
    pub primary_name: String,
    pub secondary_name: String,
    pub title: String,
    pub subtitle: String,
    pub note: String,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
    pub venue_name: String,
    pub venue_address: String,
    pub venue_map_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub gallery_urls: Vec<String>,
    pub avatar_url: Option<String>,
    pub music_track: MusicTrack,
    pub music_enabled: bool,
    pub font_family: String,
    pub primary_color: String,
    pub text_color: String,
    pub show_subtitle: bool,
    pub show_avatar: bool,
    pub show_note: bool,
    pub show_date: bool,
    pub show_venue: bool,
    pub show_countdown: bool,
    pub show_reminder_button: bool,
    pub show_scroll_indicator: bool,
    pub rsvp_enabled: bool,
}

impl Default for InvitationFormData {
    fn default() -> Self {
        Self {
            template_id: String::new(),
            category: EventCategory::Wedding,
            primary_name: String::new(),
            secondary_name: String::new(),
            title: String::new(),
            subtitle: String::new(),
            note: String::new(),
            event_date: None,
            event_time: None,
            venue_name: String::new(),
            venue_address: String::new(),
            venue_map_url: None,
            cover_image_url: None,
            gallery_urls: Vec::new(),
            avatar_url: None,
            music_track: MusicTrack::RomanticPiano,
            music_enabled: true,
            font_family: "playfair-display".into(),
            primary_color: "#b76e79".into(),
            text_color: "#ffffff".into(),
            show_subtitle: true,
            show_avatar: false,
            show_note: true,
            show_date: true,
            show_venue: true,
            show_countdown: true,
            show_reminder_button: true,
            show_scroll_indicator: true,
            rsvp_enabled: false,
        }
    }
}

impl InvitationFormData {
    pub fn visibility(&self) -> ElementVisibility {
        ElementVisibility {
            show_subtitle: self.show_subtitle,
            show_avatar: self.show_avatar,
            show_note: self.show_note,
            show_date: self.show_date,
            show_venue: self.show_venue,
            show_countdown: self.show_countdown,
            show_reminder_button: self.show_reminder_button,
            show_scroll_indicator: self.show_scroll_indicator,
        }
    }

    /// Shallow, last-write-wins merge of every field present in `patch`.
    pub fn merged(&self, patch: &FormDataPatch) -> Self {
        let mut next = self.clone();
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = &patch.$field {
                        next.$field = value.clone();
                    }
                )*
            };
        }
        merge!(
            template_id,
            category,
            primary_name,
            secondary_name,
            title,
            subtitle,
            note,
            event_date,
            event_time,
            venue_name,
            venue_address,
            venue_map_url,
            cover_image_url,
            gallery_urls,
            avatar_url,
            music_track,
            music_enabled,
            font_family,
            primary_color,
            text_color,
            show_subtitle,
            show_avatar,
            show_note,
            show_date,
            show_venue,
            show_countdown,
            show_reminder_button,
            show_scroll_indicator,
            rsvp_enabled,
        );
        next
    }
}

/// Partial update of [`InvitationFormData`]. Absent fields are left alone;
/// nullable fields accept an explicit `null` to clear them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormDataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<EventCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_date: Option<Option<NaiveDate>>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_time: Option<Option<NaiveTime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_address: Option<String>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub venue_map_url: Option<Option<String>>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub cover_image_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery_urls: Option<Vec<String>>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music_track: Option<MusicTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_subtitle: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_avatar: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_note: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_date: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_venue: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_countdown: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_reminder_button: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_scroll_indicator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsvp_enabled: Option<bool>,
}

impl FormDataPatch {
    pub fn with_visibility(mut self, visibility: ElementVisibility) -> Self {
        self.show_subtitle = Some(visibility.show_subtitle);
        self.show_avatar = Some(visibility.show_avatar);
        self.show_note = Some(visibility.show_note);
        self.show_date = Some(visibility.show_date);
        self.show_venue = Some(visibility.show_venue);
        self.show_countdown = Some(visibility.show_countdown);
        self.show_reminder_button = Some(visibility.show_reminder_button);
        self.show_scroll_indicator = Some(visibility.show_scroll_indicator);
        self
    }
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Search/social overrides set at publish time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeoOverrides {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// A published invitation document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: InvitationId,
    pub slug: String,
    pub owner_id: UserId,
    #[serde(flatten)]
    pub form: InvitationFormData,
    pub seo: SeoOverrides,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    Password,
    Google,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub provider: AuthProvider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Cover,
    Gallery,
    Avatar,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
