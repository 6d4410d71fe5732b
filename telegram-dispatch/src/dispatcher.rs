//! Media dispatcher: converts the optional inputs into workspace files, then delivers them one by
//! one (or the caption alone when there is no media).

use std::path::PathBuf;
use std::sync::Arc;

use dispatch_core::{
    DeliveryOptions, DispatchError, DispatchRequest, MediaItem, MediaKind, Result, TextOptions,
    Transport, SUCCESS_MESSAGE,
};
use media_codec::{
    encode_image, encode_mp4, encode_wav, AudioClip, ImageEncodeOptions, ImageTensor,
    VideoEncodeOptions, VideoTensor,
};
use reqwest::Client;
use tracing::{error, info, instrument, warn};

use crate::api::HttpTransport;
use crate::config::DispatchConfig;
use crate::fetch::{download_to, url_extension};
use crate::workspace::Workspace;

/// Media produced upstream for one dispatch. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct DispatchInputs {
    pub image: Option<ImageTensor>,
    pub video: Option<VideoTensor>,
    pub audio: Option<AudioClip>,
    /// Remote video; empty strings count as absent.
    pub video_url: Option<String>,
    /// Local file copied as-is; empty paths count as absent.
    pub file_path: Option<PathBuf>,
    /// Rendering context embedded in PNG output.
    pub prompt: Option<serde_json::Value>,
}

/// One conversion per input kind, run in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConversionStep {
    Image,
    Video,
    Audio,
    RemoteVideo,
    LocalFile,
}

const CONVERSION_ORDER: [ConversionStep; 5] = [
    ConversionStep::Image,
    ConversionStep::Video,
    ConversionStep::Audio,
    ConversionStep::RemoteVideo,
    ConversionStep::LocalFile,
];

/// Delivers pipeline media to one chat through a [`Transport`].
pub struct MediaDispatcher {
    transport: Arc<dyn Transport>,
    http: Client,
    chat_id: String,
    image_options: ImageEncodeOptions,
    video_options: VideoEncodeOptions,
    file_prefix: String,
    temp_root: Option<PathBuf>,
}

impl MediaDispatcher {
    pub fn new(transport: Arc<dyn Transport>, chat_id: impl Into<String>) -> Self {
        Self {
            transport,
            http: Client::new(),
            chat_id: chat_id.into(),
            image_options: ImageEncodeOptions::default(),
            video_options: VideoEncodeOptions::default(),
            file_prefix: "Pipeline".to_string(),
            temp_root: None,
        }
    }

    /// Builds a dispatcher with an [`HttpTransport`] and the encoder settings from `config`. One HTTP
    /// client serves both the Bot API calls and remote downloads.
    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        let http = config.http_client()?;
        let transport = HttpTransport::new(config.bot_token.clone())
            .with_api_url(config.telegram_api_url.clone())
            .with_client(http.clone());
        Ok(Self::new(Arc::new(transport), config.chat_id.clone())
            .with_image_options(config.image)
            .with_video_options(config.video.clone())
            .with_file_prefix(config.file_prefix.clone())
            .with_temp_root(config.workspace_dir.clone())
            .with_http_client(http))
    }

    pub fn with_image_options(mut self, options: ImageEncodeOptions) -> Self {
        self.image_options = options;
        self
    }

    pub fn with_video_options(mut self, options: VideoEncodeOptions) -> Self {
        self.video_options = options;
        self
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Directory workspaces are created in; `None` means the system temp dir.
    pub fn with_temp_root(mut self, root: Option<PathBuf>) -> Self {
        self.temp_root = root;
        self
    }

    /// Client used for remote video downloads.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Converts inputs, sends them in order and removes the workspace.
    ///
    /// Returns [`SUCCESS_MESSAGE`]. A failed remote download only drops that item; any other error
    /// stops the sequence and is returned (the workspace is still removed).
    #[instrument(skip_all, fields(chat_id = %self.chat_id))]
    pub async fn dispatch(
        &self,
        inputs: &DispatchInputs,
        text: &TextOptions,
        delivery: DeliveryOptions,
    ) -> Result<String> {
        let workspace = Workspace::create_in(&self.file_prefix, self.temp_root.as_deref())?;
        let items = self.prepare(inputs, &workspace).await?;
        let request = DispatchRequest::new(self.chat_id.clone(), text, delivery);

        if items.is_empty() {
            info!("No media to send; sending text only");
            self.transport.send_message(&request).await?;
        } else {
            for item in &items {
                info!(kind = %item.kind, path = %item.path.display(), "Sending media item");
                self.transport.send_media(&request, item).await?;
            }
        }

        workspace.close();
        info!(items = items.len(), "Dispatch finished");
        Ok(SUCCESS_MESSAGE.to_string())
    }

    /// Runs every conversion step in order, collecting the items produced.
    pub async fn prepare(
        &self,
        inputs: &DispatchInputs,
        workspace: &Workspace,
    ) -> Result<Vec<MediaItem>> {
        let mut items = Vec::new();
        for step in CONVERSION_ORDER {
            if let Some(item) = self.convert(step, inputs, workspace).await? {
                items.push(item);
            }
        }
        Ok(items)
    }

    async fn convert(
        &self,
        step: ConversionStep,
        inputs: &DispatchInputs,
        workspace: &Workspace,
    ) -> Result<Option<MediaItem>> {
        match step {
            ConversionStep::Image => match &inputs.image {
                Some(image) => self.convert_image(image, inputs.prompt.as_ref(), workspace).map(Some),
                None => Ok(None),
            },
            ConversionStep::Video => match &inputs.video {
                Some(video) => self.convert_video(video, workspace).await.map(Some),
                None => Ok(None),
            },
            ConversionStep::Audio => match &inputs.audio {
                Some(audio) => convert_audio(audio, workspace).map(Some),
                None => Ok(None),
            },
            ConversionStep::RemoteVideo => {
                match inputs.video_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
                    Some(url) => Ok(self.fetch_remote_video(url, workspace).await),
                    None => Ok(None),
                }
            }
            ConversionStep::LocalFile => match inputs
                .file_path
                .as_deref()
                .filter(|p| !p.as_os_str().is_empty())
            {
                Some(path) => copy_local_file(path, workspace).await,
                None => Ok(None),
            },
        }
    }

    fn convert_image(
        &self,
        image: &ImageTensor,
        prompt: Option<&serde_json::Value>,
        workspace: &Workspace,
    ) -> Result<MediaItem> {
        let path = workspace.media_path("img", self.image_options.format.extension());
        encode_image(image, &self.image_options, prompt, &path)
            .map_err(|e| DispatchError::Encode(e.to_string()))?;
        Ok(MediaItem::new(MediaKind::Photo, path))
    }

    async fn convert_video(&self, video: &VideoTensor, workspace: &Workspace) -> Result<MediaItem> {
        let path = workspace.media_path("video", "mp4");
        encode_mp4(video, &self.video_options, &path)
            .await
            .map_err(|e| DispatchError::Encode(e.to_string()))?;
        Ok(MediaItem::new(MediaKind::Video, path))
    }

    /// Download failures are logged and yield no item.
    async fn fetch_remote_video(&self, url: &str, workspace: &Workspace) -> Option<MediaItem> {
        let path = workspace.media_path("video_url", &url_extension(url));
        match download_to(&self.http, url, &path).await {
            Ok(bytes) => {
                info!(bytes, path = %path.display(), "Remote video downloaded");
                Some(MediaItem::new(MediaKind::Video, path))
            }
            Err(e) => {
                error!(url, error = %e, "Failed to download video from URL; skipping");
                None
            }
        }
    }
}

fn convert_audio(audio: &AudioClip, workspace: &Workspace) -> Result<MediaItem> {
    let path = workspace.media_path("audio", "wav");
    encode_wav(audio, &path).map_err(|e| DispatchError::Encode(e.to_string()))?;
    Ok(MediaItem::new(MediaKind::Audio, path))
}

/// Copies an existing regular file, keeping its name; the kind follows the extension.
async fn copy_local_file(path: &std::path::Path, workspace: &Workspace) -> Result<Option<MediaItem>> {
    let is_file = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    let file_name = match path.file_name() {
        Some(name) if is_file => name,
        _ => {
            warn!(path = %path.display(), "file_path is not an existing file; skipping");
            return Ok(None);
        }
    };
    let dest = workspace.copy_path(file_name);
    tokio::fs::copy(path, &dest).await?;
    Ok(Some(MediaItem::new(MediaKind::from_path(path), dest)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records (method, caption, file existed at send time).
    #[derive(Default)]
    struct RecordingTransport {
        calls: Mutex<Vec<(String, String, bool)>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send_message(&self, request: &DispatchRequest) -> Result<()> {
            self.calls.lock().unwrap().push((
                "sendMessage".to_string(),
                request.caption.clone(),
                false,
            ));
            Ok(())
        }

        async fn send_media(&self, request: &DispatchRequest, item: &MediaItem) -> Result<()> {
            let method = item.kind.method();
            self.calls.lock().unwrap().push((
                method.to_string(),
                request.caption.clone(),
                item.path.is_file(),
            ));
            if self.fail_on == Some(method) {
                return Err(DispatchError::Api {
                    method: method.to_string(),
                    status: 400,
                    body: "Bad Request".to_string(),
                });
            }
            Ok(())
        }
    }

    fn image() -> ImageTensor {
        ImageTensor::new(2, 2, 3, vec![0.25; 12]).unwrap()
    }

    #[tokio::test]
    async fn test_conversion_order() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = MediaDispatcher::new(transport.clone(), "1");
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("notes.txt");
        std::fs::write(&doc, "hello").unwrap();

        let inputs = DispatchInputs {
            image: Some(image()),
            audio: Some(AudioClip::mono(vec![0.0, 0.1, 0.2], None).unwrap()),
            file_path: Some(doc),
            ..Default::default()
        };
        let status = dispatcher
            .dispatch(&inputs, &TextOptions::new("done"), DeliveryOptions::default())
            .await
            .unwrap();

        assert_eq!(status, SUCCESS_MESSAGE);
        let calls = transport.calls.lock().unwrap();
        let methods: Vec<&str> = calls.iter().map(|c| c.0.as_str()).collect();
        assert_eq!(methods, vec!["sendPhoto", "sendAudio", "sendDocument"]);
        assert!(calls.iter().all(|c| c.1 == "done" && c.2));
    }

    #[tokio::test]
    async fn test_empty_strings_count_as_absent() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = MediaDispatcher::new(transport.clone(), "1");
        let inputs = DispatchInputs {
            video_url: Some("  ".to_string()),
            file_path: Some(PathBuf::new()),
            ..Default::default()
        };
        dispatcher
            .dispatch(&inputs, &TextOptions::new("x").bold(true), DeliveryOptions::default())
            .await
            .unwrap();
        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "sendMessage");
        assert_eq!(calls[0].1, "**x**");
    }

    #[tokio::test]
    async fn test_missing_local_file_is_skipped() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = MediaDispatcher::new(transport.clone(), "1");
        let inputs = DispatchInputs {
            file_path: Some(PathBuf::from("/definitely/not/here.mp3")),
            ..Default::default()
        };
        dispatcher
            .dispatch(&inputs, &TextOptions::new("x"), DeliveryOptions::default())
            .await
            .unwrap();
        assert_eq!(transport.calls.lock().unwrap()[0].0, "sendMessage");
    }

    #[tokio::test]
    async fn test_send_error_stops_sequence_and_cleans_up() {
        let transport = Arc::new(RecordingTransport {
            fail_on: Some("sendPhoto"),
            ..Default::default()
        });
        let dispatcher = MediaDispatcher::new(transport.clone(), "1");
        let inputs = DispatchInputs {
            image: Some(image()),
            audio: Some(AudioClip::mono(vec![0.0; 8], Some(8000)).unwrap()),
            ..Default::default()
        };
        let err = dispatcher
            .dispatch(&inputs, &TextOptions::new("x"), DeliveryOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Api { status: 400, .. }));
        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1, "audio must not be sent after the photo failed");
        assert!(calls[0].2);
    }

    #[tokio::test]
    async fn test_prepare_writes_files_into_workspace() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = MediaDispatcher::new(transport, "1")
            .with_file_prefix("Run")
            .with_image_options(ImageEncodeOptions {
                format: media_codec::ImageFormat::Jpeg,
                ..Default::default()
            });
        let workspace = Workspace::create("Run").unwrap();
        let inputs = DispatchInputs {
            image: Some(image()),
            ..Default::default()
        };

        let items = dispatcher.prepare(&inputs, &workspace).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, MediaKind::Photo);
        assert!(items[0].path.starts_with(workspace.path()));
        let name = items[0].file_name();
        assert!(name.starts_with("Run_") && name.ends_with("_img.jpeg"));
        assert!(items[0].path.is_file());
    }
}
