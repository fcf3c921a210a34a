//! Composition of the live invitation preview from form data.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use url::Url;

use crate::{
    domain::{InvitationFormData, MusicTrack},
    format::{format_event_date_long, format_event_time},
    templates::{category_config, template_or_default, Template},
};

const GOOGLE_CALENDAR_URL: &str = "https://calendar.google.com/calendar/render";
const DEFAULT_EVENT_HOURS: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    /// Time left until `target`, clamped at zero once it has passed.
    pub fn until(target: NaiveDateTime, now: NaiveDateTime) -> Self {
        let remaining = (target - now).num_seconds().max(0);
        Self {
            days: remaining / 86_400,
            hours: (remaining % 86_400) / 3_600,
            minutes: (remaining % 3_600) / 60,
            seconds: remaining % 60,
        }
    }

    pub fn is_over(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VenueBlock {
    pub name: String,
    pub address: String,
    pub map_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSource {
    pub track: MusicTrack,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvitationPreview {
    pub template: &'static Template,
    pub font_family: String,
    pub primary_color: String,
    pub text_color: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub avatar_url: Option<String>,
    pub note: Option<String>,
    pub slides: Vec<String>,
    pub date_line: Option<String>,
    pub time_line: Option<String>,
    pub venue: Option<VenueBlock>,
    pub countdown: Option<Countdown>,
    pub reminder_url: Option<String>,
    pub audio: Option<AudioSource>,
    pub show_scroll_indicator: bool,
    pub rsvp_enabled: bool,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Title shown for a form, falling back to the category's generated title.
pub fn display_title(form: &InvitationFormData) -> String {
    non_empty(&form.title).unwrap_or_else(|| {
        (category_config(form.category).default_title)(&form.primary_name, &form.secondary_name)
    })
}

/// Event start as a naive local timestamp; midnight when no time was given.
pub fn event_start(form: &InvitationFormData) -> Option<NaiveDateTime> {
    let date = form.event_date?;
    match form.event_time {
        Some(time) => Some(date.and_time(time)),
        None => date.and_hms_opt(0, 0, 0),
    }
}

/// Cover first, then gallery images, without duplicates.
pub fn slides(form: &InvitationFormData) -> Vec<String> {
    let mut slides: Vec<String> = Vec::new();
    for url in form.cover_image_url.iter().chain(form.gallery_urls.iter()) {
        let url = url.trim();
        if !url.is_empty() && !slides.iter().any(|existing| existing == url) {
            slides.push(url.to_string());
        }
    }
    slides
}

/// Google Calendar "add event" link for the invitation.
pub fn reminder_url(form: &InvitationFormData) -> Option<String> {
    let date = form.event_date?;
    let dates = match form.event_time {
        Some(time) => {
            let start = date.and_time(time);
            let end = start + Duration::hours(DEFAULT_EVENT_HOURS);
            format!(
                "{}/{}",
                start.format("%Y%m%dT%H%M%S"),
                end.format("%Y%m%dT%H%M%S")
            )
        }
        None => {
            let next_day = date.succ_opt().unwrap_or(date);
            format!("{}/{}", date.format("%Y%m%d"), next_day.format("%Y%m%d"))
        }
    };
    let location = [form.venue_name.trim(), form.venue_address.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let url = Url::parse_with_params(
        GOOGLE_CALENDAR_URL,
        &[
            ("action", "TEMPLATE"),
            ("text", display_title(form).as_str()),
            ("dates", dates.as_str()),
            ("location", location.as_str()),
            ("details", form.note.trim()),
        ],
    )
    .ok()?;
    Some(url.into())
}

pub fn compose_preview(form: &InvitationFormData, now: NaiveDateTime) -> InvitationPreview {
    let start = event_start(form);

    InvitationPreview {
        template: template_or_default(&form.template_id),
        font_family: form.font_family.clone(),
        primary_color: form.primary_color.clone(),
        text_color: form.text_color.clone(),
        title: display_title(form),
        subtitle: form
            .show_subtitle
            .then(|| non_empty(&form.subtitle))
            .flatten(),
        avatar_url: form
            .show_avatar
            .then(|| form.avatar_url.as_deref().and_then(non_empty))
            .flatten(),
        note: form.show_note.then(|| non_empty(&form.note)).flatten(),
        slides: slides(form),
        date_line: form
            .show_date
            .then(|| form.event_date.map(format_event_date_long))
            .flatten(),
        time_line: form
            .show_date
            .then(|| form.event_time.map(format_event_time))
            .flatten(),
        venue: form
            .show_venue
            .then(|| {
                non_empty(&form.venue_name).map(|name| VenueBlock {
                    name,
                    address: form.venue_address.trim().to_string(),
                    map_url: form.venue_map_url.clone(),
                })
            })
            .flatten(),
        countdown: form
            .show_countdown
            .then(|| start.map(|target| Countdown::until(target, now)))
            .flatten(),
        reminder_url: form
            .show_reminder_button
            .then(|| reminder_url(form))
            .flatten(),
        audio: form.music_enabled.then(|| AudioSource {
            track: form.music_track,
            src: form.music_track.asset_path(),
        }),
        show_scroll_indicator: form.show_scroll_indicator,
        rsvp_enabled: form.rsvp_enabled,
    }
}

#[cfg(test)]
#[path = "tests/preview_tests.rs"]
mod tests;
