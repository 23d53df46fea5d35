use serde::Serialize;

/// Output size used for every live stream.
const STREAM_WIDTH: u32 = 1280;
const STREAM_HEIGHT: u32 = 720;

/// Placeholder shown over the local tile while the camera is off.
const PROFILE_IMAGE_ASSET: &str = "profile.png";

/// Options passed to the widget's `startLiveStreaming` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamOptions {
    pub rtmp_url: String,
    pub width: u32,
    pub height: u32,
    pub layout: LiveStreamLayout,
}

impl LiveStreamOptions {
    pub fn new(rtmp_url: impl Into<String>, show_overlay: bool) -> Self {
        Self {
            rtmp_url: rtmp_url.into(),
            width: STREAM_WIDTH,
            height: STREAM_HEIGHT,
            layout: LiveStreamLayout::with_overlay(show_overlay),
        }
    }
}

/// Fixed composition layout; only the overlay flag varies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveStreamLayout {
    pub preset: String,
    pub composition_params: CompositionParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionParams {
    pub mode: String,
    #[serde(rename = "showImageOverlay")]
    pub show_image_overlay: bool,
    #[serde(rename = "image.assetName")]
    pub image_asset: String,
}

impl LiveStreamLayout {
    pub fn with_overlay(show_overlay: bool) -> Self {
        Self {
            preset: "custom".to_string(),
            composition_params: CompositionParams {
                mode: "single".to_string(),
                show_image_overlay: show_overlay,
                image_asset: PROFILE_IMAGE_ASSET.to_string(),
            },
        }
    }

    pub fn shows_overlay(&self) -> bool {
        self.composition_params.show_image_overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_serializes_with_widget_keys() {
        let layout = LiveStreamLayout::with_overlay(true);
        let json = serde_json::to_value(&layout).unwrap();
        assert_eq!(json["preset"], "custom");
        assert_eq!(json["composition_params"]["showImageOverlay"], true);
        assert_eq!(json["composition_params"]["image.assetName"], "profile.png");
    }

    #[test]
    fn options_use_camel_case_rtmp_url() {
        let opts = LiveStreamOptions::new("rtmps://live.example.com/app/key", false);
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["rtmpUrl"], "rtmps://live.example.com/app/key");
        assert_eq!(json["width"], 1280);
        assert!(!opts.layout.shows_overlay());
    }
}
