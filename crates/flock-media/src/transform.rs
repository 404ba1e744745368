//! URL-embedded transformations.
//!
//! The CDN applies transformations encoded in the path:
//! `{endpoint}/tr:w-300,h-200:l-text,i-Flock,l-end/{path}`. Parameters of
//! one step are joined by `,`, chained steps by `:`.

use serde::Deserialize;

use crate::MediaClient;

/// Aspect ratio chosen in the compose dialog. Applied to images at upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectSetting {
    #[default]
    Original,
    Wide,
    Square,
}

impl AspectSetting {
    pub fn pre_transformation(self) -> &'static str {
        match self {
            Self::Original => "w-600",
            Self::Wide => "w-600,ar-16-9",
            Self::Square => "w-600,ar-1-1",
        }
    }
}

/// One transformation step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transformation {
    width: Option<u32>,
    height: Option<u32>,
    quality: Option<u8>,
    aspect_ratio: Option<(u32, u32)>,
    blur: Option<u8>,
    raw: Option<String>,
}

impl Transformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(mut self, w: u32) -> Self {
        self.width = Some(w);
        self
    }

    pub fn height(mut self, h: u32) -> Self {
        self.height = Some(h);
        self
    }

    pub fn quality(mut self, q: u8) -> Self {
        self.quality = Some(q.min(100));
        self
    }

    pub fn aspect_ratio(mut self, w: u32, h: u32) -> Self {
        self.aspect_ratio = Some((w, h));
        self
    }

    pub fn blur(mut self, radius: u8) -> Self {
        self.blur = Some(radius);
        self
    }

    /// Verbatim parameter string, e.g. an overlay layer.
    pub fn raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    fn render(&self) -> String {
        let mut parts = Vec::new();
        if let Some(w) = self.width {
            parts.push(format!("w-{w}"));
        }
        if let Some(h) = self.height {
            parts.push(format!("h-{h}"));
        }
        if let Some((w, h)) = self.aspect_ratio {
            parts.push(format!("ar-{w}-{h}"));
        }
        if let Some(q) = self.quality {
            parts.push(format!("q-{q}"));
        }
        if let Some(bl) = self.blur {
            parts.push(format!("bl-{bl}"));
        }
        if let Some(raw) = &self.raw {
            parts.push(raw.clone());
        }
        parts.join(",")
    }
}

impl MediaClient {
    /// Delivery URL for `path` with the given transformation chain.
    /// `path` may also be an absolute URL previously returned by an upload.
    pub fn url(&self, path: &str, steps: &[Transformation]) -> String {
        let path = self.relative_path(path);
        let chain = steps
            .iter()
            .map(Transformation::render)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(":");

        if chain.is_empty() {
            format!("{}/{}", self.config.url_endpoint, path)
        } else {
            format!("{}/tr:{}/{}", self.config.url_endpoint, chain, path)
        }
    }

    /// Low-quality blurred placeholder shown while the full image loads.
    pub fn lqip_url(&self, path: &str) -> String {
        self.url(path, &[Transformation::new().quality(20).blur(6)])
    }

    /// Full-HD delivery with the watermark text overlay.
    pub fn video_url(&self, path: &str) -> String {
        let overlay = format!(
            "l-text,i-{},fs-100,co-white,l-end",
            self.config.video_watermark
        );
        self.url(
            path,
            &[
                Transformation::new().width(1920).height(1080).quality(90),
                Transformation::new().raw(overlay),
            ],
        )
    }

    fn relative_path<'p>(&self, path: &'p str) -> &'p str {
        path.strip_prefix(self.config.url_endpoint.as_str())
            .unwrap_or(path)
            .trim_start_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_client;

    #[test]
    fn resize_step() {
        let media = test_client("http://unused");
        let url = media.url("posts/cat.jpg", &[Transformation::new().width(300).height(200)]);
        assert_eq!(url, "https://ik.imagekit.io/flock/tr:w-300,h-200/posts/cat.jpg");
    }

    #[test]
    fn no_steps_means_plain_url() {
        let media = test_client("http://unused");
        assert_eq!(media.url("/a.png", &[]), "https://ik.imagekit.io/flock/a.png");
    }

    #[test]
    fn absolute_urls_are_rebased() {
        let media = test_client("http://unused");
        let url = media.lqip_url("https://ik.imagekit.io/flock/posts/cat.jpg");
        assert_eq!(url, "https://ik.imagekit.io/flock/tr:q-20,bl-6/posts/cat.jpg");
    }

    #[test]
    fn video_chain_has_overlay_layer() {
        let media = test_client("http://unused");
        assert_eq!(
            media.video_url("clip.mp4"),
            "https://ik.imagekit.io/flock/tr:w-1920,h-1080,q-90:l-text,i-Flock,fs-100,co-white,l-end/clip.mp4"
        );
    }

    #[test]
    fn aspect_pre_transformations() {
        assert_eq!(AspectSetting::Original.pre_transformation(), "w-600");
        assert_eq!(AspectSetting::Wide.pre_transformation(), "w-600,ar-16-9");
        assert_eq!(AspectSetting::Square.pre_transformation(), "w-600,ar-1-1");
    }
}
