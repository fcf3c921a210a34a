//! Wizard step handlers.
//!
//! A [`WizardSession`] owns the [`WizardStore`] and a persistence backend.
//! The store accepts any step change; the handlers here are what keep the
//! flow linear (template, details, preview, payment).

use chrono::{Local, NaiveDateTime};
use shared::{
    domain::{FormDataPatch, InvitationFormData, MediaKind, SeoOverrides},
    preview::{compose_preview, InvitationPreview},
    protocol::{MediaUploaded, PublishRequest, PublishedInvitation},
    templates::resolve_template_defaults,
    wizard::{WizardState, WizardStep, WizardStore},
};
use tracing::{info, warn};

use crate::{
    backend::{InvitationBackend, MediaUpload, UploadProgress},
    error::ClientError,
};

pub const SUCCESS_PATH: &str = "/success";

/// Result of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub published: PublishedInvitation,
    pub success_location: String,
}

pub fn success_location(slug: &str) -> String {
    format!("{SUCCESS_PATH}?slug={slug}")
}

pub struct WizardSession<B: InvitationBackend> {
    store: WizardStore,
    backend: B,
    seo: SeoOverrides,
}

impl<B: InvitationBackend> WizardSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            store: WizardStore::new(),
            backend,
            seo: SeoOverrides::default(),
        }
    }

    pub fn state(&self) -> &WizardState {
        self.store.state()
    }

    pub fn form_data(&self) -> &InvitationFormData {
        self.store.form_data()
    }

    pub fn store_mut(&mut self) -> &mut WizardStore {
        &mut self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn set_seo_overrides(&mut self, seo: SeoOverrides) {
        self.seo = seo;
    }

    fn expect_step(&self, expected: WizardStep) -> Result<(), ClientError> {
        let actual = self.store.step();
        if actual != expected {
            return Err(ClientError::WrongStep { expected, actual });
        }
        Ok(())
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        self.store.set_loading(false);
        self.store.set_error(Some(err.to_string()));
        err
    }

    /// Applies the template's defaults to the form and moves to details.
    pub fn choose_template(&mut self, template_id: &str) -> Result<(), ClientError> {
        self.expect_step(WizardStep::Template)?;
        let form = self.store.form_data();
        let defaults =
            resolve_template_defaults(template_id, &form.primary_name, &form.secondary_name);
        info!(template_id, category = ?defaults.category, "template chosen");
        self.store.update_form_data(defaults.into_patch());
        self.store.next_step();
        Ok(())
    }

    /// Merges the event details. Missing names or date leave the wizard on
    /// the details step with the problem recorded in the store.
    pub fn submit_details(&mut self, details: FormDataPatch) -> Result<(), ClientError> {
        self.expect_step(WizardStep::Details)?;

        let current = self.store.form_data().clone();
        let candidate = current.merged(&details);
        if let Some(problem) = details_problem(&candidate) {
            return Err(self.fail(ClientError::Validation(problem.to_string())));
        }

        let mut patch = details;
        // keep the generated title in step with the names unless it was edited
        if patch.title.is_none() {
            let previous = resolve_template_defaults(
                &current.template_id,
                &current.primary_name,
                &current.secondary_name,
            );
            if current.title.trim().is_empty() || current.title == previous.title {
                let fresh = resolve_template_defaults(
                    &candidate.template_id,
                    &candidate.primary_name,
                    &candidate.secondary_name,
                );
                patch.title = Some(fresh.title);
            }
        }

        self.store.update_form_data(patch);
        self.store.next_step();
        Ok(())
    }

    /// Merges text, colour, music and visibility choices on the preview step.
    pub fn customize(&mut self, patch: FormDataPatch) -> Result<(), ClientError> {
        self.expect_step(WizardStep::Preview)?;
        self.store.update_form_data(patch);
        Ok(())
    }

    pub fn preview(&self) -> InvitationPreview {
        self.preview_at(Local::now().naive_local())
    }

    pub fn preview_at(&self, now: NaiveDateTime) -> InvitationPreview {
        compose_preview(self.store.form_data(), now)
    }

    /// Uploads an image and stores its public URL in the matching form
    /// field. Gallery images are appended. Only allowed while editing
    /// details or customizing the preview.
    pub async fn attach_media(
        &mut self,
        kind: MediaKind,
        filename: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
        progress: UploadProgress<'_>,
    ) -> Result<MediaUploaded, ClientError> {
        let actual = self.store.step();
        if !matches!(actual, WizardStep::Details | WizardStep::Preview) {
            return Err(ClientError::WrongStep {
                expected: WizardStep::Preview,
                actual,
            });
        }
        self.store.set_loading(true);
        let upload = MediaUpload {
            kind,
            filename,
            mime_type,
            bytes,
        };
        let uploaded = match self.backend.upload_media(upload, progress).await {
            Ok(uploaded) => uploaded,
            Err(err) => {
                warn!(error = %err, "media upload failed");
                return Err(self.fail(err));
            }
        };

        let url = uploaded.url.clone();
        let patch = match kind {
            MediaKind::Cover => FormDataPatch {
                cover_image_url: Some(Some(url)),
                ..FormDataPatch::default()
            },
            MediaKind::Avatar => FormDataPatch {
                avatar_url: Some(Some(url)),
                ..FormDataPatch::default()
            },
            MediaKind::Gallery => {
                let mut gallery = self.store.form_data().gallery_urls.clone();
                gallery.push(url);
                FormDataPatch {
                    gallery_urls: Some(gallery),
                    ..FormDataPatch::default()
                }
            }
        };
        self.store.update_form_data(patch);
        self.store.set_loading(false);
        Ok(uploaded)
    }

    pub fn proceed_to_payment(&mut self) -> Result<(), ClientError> {
        self.expect_step(WizardStep::Preview)?;
        self.store.next_step();
        Ok(())
    }

    pub fn back(&mut self) {
        self.store.previous_step();
    }

    /// Stub checkout: nothing is charged. Publishing needs a signed-in user;
    /// the caller is expected to route to sign-in on `AuthenticationRequired`.
    pub async fn complete_payment(&mut self) -> Result<Checkout, ClientError> {
        self.expect_step(WizardStep::Payment)?;
        if !self.backend.is_authenticated().await {
            return Err(self.fail(ClientError::AuthenticationRequired));
        }

        self.store.set_loading(true);
        let request = PublishRequest {
            form: self.store.form_data().clone(),
            seo: self.seo.clone(),
        };
        let published = match self.backend.publish(&request).await {
            Ok(published) => published,
            Err(err) => return Err(self.fail(err)),
        };

        self.store.set_invitation_id(Some(published.invitation_id));
        self.store.set_loading(false);
        self.store.set_error(None);
        Ok(Checkout {
            success_location: success_location(&published.slug),
            published,
        })
    }

    pub fn start_over(&mut self) {
        self.store.reset();
        self.seo = SeoOverrides::default();
    }
}

fn details_problem(form: &InvitationFormData) -> Option<&'static str> {
    if form.primary_name.trim().is_empty() {
        return Some("Lütfen isim girin.");
    }
    if form.event_date.is_none() {
        return Some("Lütfen etkinlik tarihini seçin.");
    }
    None
}

#[cfg(test)]
#[path = "tests/steps_tests.rs"]
mod tests;
