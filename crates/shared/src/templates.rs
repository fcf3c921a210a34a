//! Static invitation template catalog and per-category defaults.
//!
//! Every template belongs to an [`EventCategory`]. The category decides the
//! default texts and which optional elements start visible; the template
//! itself only contributes visuals and whether it has room for an avatar.

use serde::Serialize;

use crate::domain::{ElementVisibility, EventCategory, FormDataPatch, OptionalElement};

/// Category used when a template id is not in the catalog.
pub const FALLBACK_CATEGORY: EventCategory = EventCategory::Wedding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub category: EventCategory,
    pub name: &'static str,
    pub overlay_color: &'static str,
    pub overlay_opacity: f32,
    pub text_align: TextAlign,
    pub preview_image: &'static str,
    pub supports_avatar: bool,
}

pub struct CategoryConfig {
    pub category: EventCategory,
    pub default_title: fn(&str, &str) -> String,
    pub default_subtitle: &'static str,
    pub default_note: &'static str,
    pub elements: &'static [OptionalElement],
}

static TEMPLATES: &[Template] = &[
    Template {
        id: "wedding-classic",
        category: EventCategory::Wedding,
        name: "Klasik Beyaz",
        overlay_color: "#000000",
        overlay_opacity: 0.35,
        text_align: TextAlign::Center,
        preview_image: "/templates/wedding-classic.jpg",
        supports_avatar: false,
    },
    Template {
        id: "wedding-floral",
        category: EventCategory::Wedding,
        name: "Çiçek Bahçesi",
        overlay_color: "#3b2a2f",
        overlay_opacity: 0.25,
        text_align: TextAlign::Center,
        preview_image: "/templates/wedding-floral.jpg",
        supports_avatar: true,
    },
    Template {
        id: "wedding-minimal",
        category: EventCategory::Wedding,
        name: "Sade Zarafet",
        overlay_color: "#ffffff",
        overlay_opacity: 0.15,
        text_align: TextAlign::Left,
        preview_image: "/templates/wedding-minimal.jpg",
        supports_avatar: false,
    },
    Template {
        id: "engagement-rose",
        category: EventCategory::Engagement,
        name: "Gül Kurusu",
        overlay_color: "#5a1f2b",
        overlay_opacity: 0.4,
        text_align: TextAlign::Center,
        preview_image: "/templates/engagement-rose.jpg",
        supports_avatar: true,
    },
    Template {
        id: "engagement-golden",
        category: EventCategory::Engagement,
        name: "Altın Işıltı",
        overlay_color: "#1c1408",
        overlay_opacity: 0.45,
        text_align: TextAlign::Center,
        preview_image: "/templates/engagement-golden.jpg",
        supports_avatar: false,
    },
    Template {
        id: "henna-crimson",
        category: EventCategory::Henna,
        name: "Kırmızı Tül",
        overlay_color: "#4a0d0d",
        overlay_opacity: 0.5,
        text_align: TextAlign::Center,
        preview_image: "/templates/henna-crimson.jpg",
        supports_avatar: false,
    },
    Template {
        id: "birthday-confetti",
        category: EventCategory::Birthday,
        name: "Konfeti",
        overlay_color: "#12123a",
        overlay_opacity: 0.3,
        text_align: TextAlign::Center,
        preview_image: "/templates/birthday-confetti.jpg",
        supports_avatar: true,
    },
    Template {
        id: "birthday-balloon",
        category: EventCategory::Birthday,
        name: "Balonlar",
        overlay_color: "#ffffff",
        overlay_opacity: 0.2,
        text_align: TextAlign::Left,
        preview_image: "/templates/birthday-balloon.jpg",
        supports_avatar: false,
    },
    Template {
        id: "circumcision-royal",
        category: EventCategory::Circumcision,
        name: "Şehzade",
        overlay_color: "#0d1f4a",
        overlay_opacity: 0.4,
        text_align: TextAlign::Center,
        preview_image: "/templates/circumcision-royal.jpg",
        supports_avatar: true,
    },
    Template {
        id: "baby-shower-cloud",
        category: EventCategory::BabyShower,
        name: "Pamuk Bulut",
        overlay_color: "#ffffff",
        overlay_opacity: 0.25,
        text_align: TextAlign::Center,
        preview_image: "/templates/baby-shower-cloud.jpg",
        supports_avatar: true,
    },
];

const ALL_ELEMENTS: &[OptionalElement] = &[
    OptionalElement::Subtitle,
    OptionalElement::Note,
    OptionalElement::Date,
    OptionalElement::Venue,
    OptionalElement::Countdown,
    OptionalElement::ReminderButton,
    OptionalElement::ScrollIndicator,
];

static CATEGORY_CONFIGS: &[CategoryConfig] = &[
    CategoryConfig {
        category: EventCategory::Wedding,
        default_title: couple_title_or_wedding,
        default_subtitle: "Evleniyoruz",
        default_note: "Bu mutlu günümüzde sizleri de aramızda görmekten onur duyarız.",
        elements: ALL_ELEMENTS,
    },
    CategoryConfig {
        category: EventCategory::Engagement,
        default_title: couple_title_or_engagement,
        default_subtitle: "Nişanlanıyoruz",
        default_note: "Hayatımızın bu özel adımında yanımızda olmanızı isteriz.",
        elements: &[
            OptionalElement::Subtitle,
            OptionalElement::Avatar,
            OptionalElement::Note,
            OptionalElement::Date,
            OptionalElement::Venue,
            OptionalElement::Countdown,
            OptionalElement::ReminderButton,
            OptionalElement::ScrollIndicator,
        ],
    },
    CategoryConfig {
        category: EventCategory::Henna,
        default_title: henna_title,
        default_subtitle: "Kına Gecemize Davetlisiniz",
        default_note: "Kınamızı birlikte yakmak için sizi de bekliyoruz.",
        elements: &[
            OptionalElement::Subtitle,
            OptionalElement::Note,
            OptionalElement::Date,
            OptionalElement::Venue,
            OptionalElement::Countdown,
            OptionalElement::ScrollIndicator,
        ],
    },
    CategoryConfig {
        category: EventCategory::Birthday,
        default_title: birthday_title,
        default_subtitle: "Birlikte kutlayalım",
        default_note: "Pasta, müzik ve bolca kahkaha için sizi de bekliyoruz.",
        elements: &[
            OptionalElement::Subtitle,
            OptionalElement::Avatar,
            OptionalElement::Note,
            OptionalElement::Date,
            OptionalElement::Venue,
            OptionalElement::Countdown,
            OptionalElement::ReminderButton,
        ],
    },
    CategoryConfig {
        category: EventCategory::Circumcision,
        default_title: circumcision_title,
        default_subtitle: "Sünnet Düğünümüze Davetlisiniz",
        default_note: "Şehzademizin bu mutlu gününde sizleri de aramızda görmek isteriz.",
        elements: &[
            OptionalElement::Subtitle,
            OptionalElement::Avatar,
            OptionalElement::Note,
            OptionalElement::Date,
            OptionalElement::Venue,
            OptionalElement::ReminderButton,
            OptionalElement::ScrollIndicator,
        ],
    },
    CategoryConfig {
        category: EventCategory::BabyShower,
        default_title: baby_shower_title,
        default_subtitle: "Minik bir mucize yolda",
        default_note: "Bebeğimizi beklerken bu sevinci sizinle paylaşmak istiyoruz.",
        elements: &[
            OptionalElement::Subtitle,
            OptionalElement::Avatar,
            OptionalElement::Note,
            OptionalElement::Date,
            OptionalElement::Venue,
            OptionalElement::Countdown,
        ],
    },
];

fn joined_names(primary: &str, secondary: &str) -> Option<String> {
    match (primary.trim(), secondary.trim()) {
        ("", "") => None,
        (one, "") | ("", one) => Some(one.to_string()),
        (a, b) => Some(format!("{a} & {b}")),
    }
}

fn first_name(primary: &str, secondary: &str) -> Option<String> {
    [primary.trim(), secondary.trim()]
        .into_iter()
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

fn couple_title_or_wedding(primary: &str, secondary: &str) -> String {
    joined_names(primary, secondary).unwrap_or_else(|| "Düğünümüze Davetlisiniz".into())
}

fn couple_title_or_engagement(primary: &str, secondary: &str) -> String {
    joined_names(primary, secondary).unwrap_or_else(|| "Nişanımıza Davetlisiniz".into())
}

fn henna_title(primary: &str, secondary: &str) -> String {
    first_name(primary, secondary)
        .map(|name| format!("Kına Gecesi · {name}"))
        .unwrap_or_else(|| "Kına Gecesi".into())
}

fn birthday_title(primary: &str, secondary: &str) -> String {
    first_name(primary, secondary)
        .map(|name| format!("{name} Doğum Günü Partisi"))
        .unwrap_or_else(|| "Doğum Günü Partisi".into())
}

fn circumcision_title(primary: &str, secondary: &str) -> String {
    first_name(primary, secondary)
        .map(|name| format!("{name} Sünnet Düğünü"))
        .unwrap_or_else(|| "Sünnet Düğünü".into())
}

fn baby_shower_title(primary: &str, secondary: &str) -> String {
    first_name(primary, secondary)
        .map(|name| format!("{name} Baby Shower"))
        .unwrap_or_else(|| "Baby Shower".into())
}

pub fn all_templates() -> &'static [Template] {
    TEMPLATES
}

pub fn find_template(template_id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|template| template.id == template_id)
}

/// Template visuals for `template_id`, or the first template of the fallback
/// category when the id is unknown.
pub fn template_or_default(template_id: &str) -> &'static Template {
    find_template(template_id).unwrap_or(&TEMPLATES[0])
}

pub fn templates_for_category(category: EventCategory) -> impl Iterator<Item = &'static Template> {
    TEMPLATES
        .iter()
        .filter(move |template| template.category == category)
}

pub fn category_config(category: EventCategory) -> &'static CategoryConfig {
    CATEGORY_CONFIGS
        .iter()
        .find(|config| config.category == category)
        .unwrap_or(&CATEGORY_CONFIGS[0])
}

/// Initial content and visibility derived from a template choice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDefaults {
    pub template_id: String,
    pub category: EventCategory,
    pub title: String,
    pub subtitle: String,
    pub note: String,
    pub visibility: ElementVisibility,
}

impl TemplateDefaults {
    pub fn into_patch(self) -> FormDataPatch {
        FormDataPatch {
            template_id: Some(self.template_id),
            category: Some(self.category),
            title: Some(self.title),
            subtitle: Some(self.subtitle),
            note: Some(self.note),
            ..FormDataPatch::default()
        }
        .with_visibility(self.visibility)
    }
}

/// Derives the defaults for a template choice. Never fails: an unknown id
/// resolves against [`FALLBACK_CATEGORY`] with no avatar support.
pub fn resolve_template_defaults(
    template_id: &str,
    primary_name: &str,
    secondary_name: &str,
) -> TemplateDefaults {
    let template = find_template(template_id);
    let category = template
        .map(|template| template.category)
        .unwrap_or(FALLBACK_CATEGORY);
    let supports_avatar = template.is_some_and(|template| template.supports_avatar);
    let config = category_config(category);

    TemplateDefaults {
        template_id: template_id.to_string(),
        category,
        title: (config.default_title)(primary_name, secondary_name),
        subtitle: config.default_subtitle.to_string(),
        note: config.default_note.to_string(),
        visibility: ElementVisibility::from_elements(config.elements, supports_avatar),
    }
}

#[cfg(test)]
#[path = "tests/templates_tests.rs"]
mod tests;
