use crate::api_contracts::{
    google_error_message, VideoInsertResponse, VideoResource, VideoSnippet, VideoStatus,
};
use crate::error::RelayError;
use crate::providers::PublishProvider;
use crate::upload_manager::VideoMetadata;
use async_trait::async_trait;
use tracing::{debug, info};

/// "People & Blogs", the category every relayed video is filed under
const CATEGORY_ID: &str = "22";

/// YouTube Data v3 client for `videos.insert`
pub struct YouTubeClient {
    base_url: String,
    client: reqwest::Client,
}

impl YouTubeClient {
    pub fn new(base_url: &str) -> Self {
        let user_agent = format!("DriveTubeUploader/{}", env!("CARGO_PKG_VERSION"));
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .user_agent(&user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn insert_url(&self) -> String {
        format!("{}/upload/youtube/v3/videos", self.base_url)
    }
}

fn video_resource(metadata: &VideoMetadata) -> VideoResource {
    VideoResource {
        snippet: VideoSnippet {
            title: metadata.title.clone(),
            description: metadata.description.clone().unwrap_or_default(),
            tags: metadata.tags.clone(),
            category_id: CATEGORY_ID.to_string(),
        },
        status: VideoStatus {
            privacy_status: metadata.visibility,
            self_declared_made_for_kids: false,
        },
    }
}

/// Build a `multipart/related` body: the JSON resource, then the media.
fn multipart_body(boundary: &str, resource_json: &[u8], video: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(video.len() + resource_json.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(resource_json);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: video/*\r\n\r\n");
    body.extend_from_slice(video);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[async_trait]
impl PublishProvider for YouTubeClient {
    async fn publish(
        &self,
        access_token: &str,
        video: Vec<u8>,
        metadata: &VideoMetadata,
    ) -> Result<String, RelayError> {
        let resource_json = serde_json::to_vec(&video_resource(metadata))?;
        let boundary = format!("drivetube-{}", nanoid::nanoid!(16));
        let size = video.len();
        let body = multipart_body(&boundary, &resource_json, &video);
        drop(video);

        debug!(bytes = size, title = %metadata.title, "sending videos.insert");

        let response = self
            .client
            .post(self.insert_url())
            .bearer_auth(access_token)
            .query(&[("uploadType", "multipart"), ("part", "snippet,status")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| RelayError::PublishRejected {
                status: e.status().map(|s| s.as_u16()),
                message: format!("Network error: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RelayError::PublishRejected {
                status: Some(status.as_u16()),
                message: google_error_message(&error_text),
            });
        }

        let inserted: VideoInsertResponse = response.json().await.map_err(|e| {
            RelayError::PublishRejected {
                status: None,
                message: format!("Failed to parse response: {}", e),
            }
        })?;

        if inserted.id.trim().is_empty() {
            return Err(RelayError::PublishRejected {
                status: None,
                message: "YouTube returned no video id".to_string(),
            });
        }

        info!(video_id = %inserted.id, bytes = size, "video published");
        Ok(inserted.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload_manager::Visibility;
    use mockito::{Matcher, Server};

    fn metadata() -> VideoMetadata {
        VideoMetadata::new(
            "Trip",
            Some("Summer".to_string()),
            vec!["travel".to_string()],
            Visibility::Unlisted,
        )
    }

    #[test]
    fn test_video_resource_fills_fixed_fields() {
        let meta = VideoMetadata::new("Trip", None, vec![], Visibility::Private);
        let resource = video_resource(&meta);
        assert_eq!(resource.snippet.category_id, "22");
        assert_eq!(resource.snippet.description, "");
        assert!(!resource.status.self_declared_made_for_kids);
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body("b0", br#"{"a":1}"#, b"VIDEO");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--b0\r\nContent-Type: application/json"));
        assert!(text.contains("{\"a\":1}\r\n--b0\r\nContent-Type: video/*\r\n\r\nVIDEO"));
        assert!(text.ends_with("\r\n--b0--\r\n"));
    }

    #[tokio::test]
    async fn test_publish_returns_video_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/youtube/v3/videos")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".into(), "multipart".into()),
                Matcher::UrlEncoded("part".into(), "snippet,status".into()),
            ]))
            .match_header("authorization", "Bearer ya29.yt")
            .match_header(
                "content-type",
                Matcher::Regex(r"^multipart/related; boundary=drivetube-.+$".to_string()),
            )
            .match_body(Matcher::Regex(r#""title":"Trip""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"kind":"youtube#video","id":"dQw4w9WgXcQ"}"#)
            .create_async()
            .await;

        let client = YouTubeClient::new(&server.url());
        let id = client
            .publish("ya29.yt", b"fake video".to_vec(), &metadata())
            .await
            .unwrap();

        assert_eq!(id, "dQw4w9WgXcQ");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_publish_forbidden_requires_reauth() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload/youtube/v3/videos")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"Request had insufficient authentication scopes."}}"#)
            .create_async()
            .await;

        let client = YouTubeClient::new(&server.url());
        let err = client
            .publish("ya29.yt", b"fake video".to_vec(), &metadata())
            .await
            .unwrap_err();

        assert!(err.requires_reauthorization());
        assert!(err.to_string().contains("insufficient authentication scopes"));
    }

    #[tokio::test]
    async fn test_publish_quota_rejection_is_not_reauth() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload/youtube/v3/videos")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"code":400,"message":"The user has exceeded the number of videos they may upload."}}"#)
            .create_async()
            .await;

        let client = YouTubeClient::new(&server.url());
        let err = client
            .publish("ya29.yt", b"v".to_vec(), &metadata())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::PublishRejected { status: Some(400), .. }));
        assert!(!err.requires_reauthorization());
    }
}
