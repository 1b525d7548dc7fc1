use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{
    BackendError, BlendParams, ColorBackend, ExtractRequest, ExtractionResult, LineArtParams,
    PosterizeParams,
};
use crate::config::Settings;
use crate::media::MediaAsset;

/// Blocking multipart client for the extraction service.
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl HttpBackend {
    pub fn new(settings: &Settings) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            base_url: settings.api_url.clone(),
            client,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/api/{}/", self.base_url, name)
    }

    /// A form carrying the asset as its `file` part.
    fn upload_form(asset: &MediaAsset) -> Result<Form, BackendError> {
        let bytes = std::fs::read(&asset.path).map_err(|source| BackendError::Upload {
            path: asset.path.clone(),
            source,
        })?;
        let part = Part::bytes(bytes)
            .file_name(asset.file_name())
            .mime_str(asset.mime)?;
        Ok(Form::new().part("file", part))
    }

    fn post(&self, name: &str, form: Form) -> Result<Response, BackendError> {
        let url = self.endpoint(name);
        debug!(%url, "posting multipart request");
        let response = self.client.post(&url).multipart(form).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| "Unknown error".to_string());
        warn!(%url, status = status.as_u16(), %message, "backend rejected request");
        Err(BackendError::Server {
            status: status.as_u16(),
            message,
        })
    }

    fn post_bytes(&self, name: &str, form: Form) -> Result<Vec<u8>, BackendError> {
        let bytes = self.post(name, form)?.bytes()?;
        Ok(bytes.to_vec())
    }

    fn post_text(&self, name: &str, form: Form) -> Result<String, BackendError> {
        Ok(self.post(name, form)?.text()?)
    }
}

fn with_posterize(form: Form, params: &PosterizeParams) -> Form {
    form.text("pixelSize", params.pixel_size.to_string())
        .text("numColors", params.num_colors.to_string())
}

fn with_line_art(form: Form, params: &LineArtParams) -> Form {
    form.text("threshold", params.threshold.to_string())
        .text("blurRadius", params.blur_radius.to_string())
}

impl ColorBackend for HttpBackend {
    fn extract(
        &self,
        asset: &MediaAsset,
        request: &ExtractRequest,
    ) -> Result<ExtractionResult, BackendError> {
        let mut form =
            Self::upload_form(asset)?.text("numColors", request.num_colors.to_string());
        if asset.is_video() {
            if let Some(trim) = request.trim {
                form = form
                    .text("startTime", trim.start.to_string())
                    .text("endTime", trim.end.to_string());
            }
        }

        let body = self.post("upload", form)?.text()?;
        let result: ExtractionResult = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "extraction response did not match the expected shape");
            BackendError::Malformed(e.to_string())
        })?;
        info!(
            colors = result.colors.len(),
            reserve = result.reserve_colors.len(),
            video = result.is_video,
            "extraction finished"
        );
        Ok(result)
    }

    fn posterize(
        &self,
        asset: &MediaAsset,
        params: &PosterizeParams,
    ) -> Result<Vec<u8>, BackendError> {
        self.post_bytes("posterize", with_posterize(Self::upload_form(asset)?, params))
    }

    fn posterize_svg(
        &self,
        asset: &MediaAsset,
        params: &PosterizeParams,
    ) -> Result<String, BackendError> {
        self.post_text("posterize-svg", with_posterize(Self::upload_form(asset)?, params))
    }

    fn line_art(&self, asset: &MediaAsset, params: &LineArtParams) -> Result<Vec<u8>, BackendError> {
        self.post_bytes("line-art", with_line_art(Self::upload_form(asset)?, params))
    }

    fn line_art_svg(
        &self,
        asset: &MediaAsset,
        params: &LineArtParams,
    ) -> Result<String, BackendError> {
        self.post_text("line-art-svg", with_line_art(Self::upload_form(asset)?, params))
    }

    fn blend_art(&self, asset: &MediaAsset, params: &BlendParams) -> Result<Vec<u8>, BackendError> {
        let form = with_posterize(Self::upload_form(asset)?, &params.posterize);
        self.post_bytes("blend-art", with_line_art(form, &params.line_art))
    }
}
