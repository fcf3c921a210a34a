use shared::{
    domain::EventCategory,
    protocol::TemplateSummary,
    templates::{all_templates, resolve_template_defaults, templates_for_category, TemplateDefaults},
};

pub fn list_templates(category: Option<EventCategory>) -> Vec<TemplateSummary> {
    match category {
        Some(category) => templates_for_category(category)
            .map(TemplateSummary::from)
            .collect(),
        None => all_templates().iter().map(TemplateSummary::from).collect(),
    }
}

pub fn template_defaults(
    template_id: &str,
    primary_name: &str,
    secondary_name: &str,
) -> TemplateDefaults {
    resolve_template_defaults(template_id, primary_name, secondary_name)
}
