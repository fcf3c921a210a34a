use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

pub const FALLBACK_SLUG: &str = "invitation";

/// Top-level path segments used by the site itself. Share links live at
/// `/{slug}`, so a slug may never take one of these.
pub const RESERVED_SLUGS: [&str; 9] = [
    "api",
    "auth",
    "healthz",
    "invitations",
    "me",
    "media",
    "success",
    "templates",
    "uploads",
];

const MONTHS_TR: [&str; 12] = [
    "Ocak", "Şubat", "Mart", "Nisan", "Mayıs", "Haziran", "Temmuz", "Ağustos", "Eylül", "Ekim",
    "Kasım", "Aralık",
];

fn transliterate(c: char) -> Option<char> {
    let mapped = match c {
        'ç' | 'Ç' => 'c',
        'ğ' | 'Ğ' => 'g',
        'ı' | 'I' | 'İ' | 'î' | 'Î' => 'i',
        'ö' | 'Ö' => 'o',
        'ş' | 'Ş' => 's',
        'ü' | 'Ü' | 'û' | 'Û' => 'u',
        'â' | 'Â' => 'a',
        c if c.is_ascii_alphanumeric() => c.to_ascii_lowercase(),
        _ => return None,
    };
    Some(mapped)
}

/// Lowercase ASCII, Turkish letters folded, every other run of characters
/// collapsed into a single `-`, no leading or trailing dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        match transliterate(c) {
            Some(c) => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c);
            }
            None => pending_dash = true,
        }
    }
    slug
}

/// Slug for an invitation page built from the participants' names.
///
/// `generate_slug("Ayşe", "Mehmet")` is `"ayse-mehmet"`; when neither name
/// yields any characters the slug is [`FALLBACK_SLUG`].
pub fn generate_slug(primary_name: &str, secondary_name: &str) -> String {
    let parts: Vec<String> = [primary_name, secondary_name]
        .into_iter()
        .map(slugify)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        parts.join("-")
    }
}

pub fn is_reserved_slug(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}

/// `base` for the first attempt, then `base-2`, `base-3`, ...
pub fn numbered_slug(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{base}-{attempt}")
    }
}

pub fn month_name(month: u32) -> &'static str {
    MONTHS_TR
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("")
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Pazartesi",
        Weekday::Tue => "Salı",
        Weekday::Wed => "Çarşamba",
        Weekday::Thu => "Perşembe",
        Weekday::Fri => "Cuma",
        Weekday::Sat => "Cumartesi",
        Weekday::Sun => "Pazar",
    }
}

/// `15 Ekim 2026`
pub fn format_event_date(date: NaiveDate) -> String {
    format!("{} {} {}", date.day(), month_name(date.month()), date.year())
}

/// `15 Ekim 2026 Perşembe`
pub fn format_event_date_long(date: NaiveDate) -> String {
    format!(
        "{} {}",
        format_event_date(date),
        weekday_name(date.weekday())
    )
}

pub fn format_event_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[cfg(test)]
#[path = "tests/format_tests.rs"]
mod tests;
