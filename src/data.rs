use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Sample streams compiled into the binary.
pub const BUNDLED_STREAMS: &str = include_str!("../assets/streams.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(rename = "profilePictureURL", alias = "avatarRef")]
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub username: String,
    #[serde(rename = "profilePictureURL", alias = "avatarRef")]
    pub avatar: String,
    pub text: String,
}

impl Comment {
    pub fn from_user(user: &User, text: impl Into<String>) -> Self {
        Self {
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoData {
    #[serde(rename = "videoURL", alias = "videoRef")]
    pub video: String,
    #[serde(rename = "viewerCount")]
    pub viewer_count: u64,
    #[serde(alias = "likeCount")]
    pub likes: u64,
    pub comments: Vec<Comment>,
    pub user: User,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("stream data not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read stream data at {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed stream data")]
    Malformed(#[from] serde_json::Error),
}

pub trait StreamService: Send + Sync {
    fn load_streams(&self) -> Result<Vec<VideoData>, LoadError>;
}

/// Reads streams from a JSON file on disk.
pub struct FileStreamService {
    path: PathBuf,
}

impl FileStreamService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StreamService for FileStreamService {
    fn load_streams(&self) -> Result<Vec<VideoData>, LoadError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(self.path.clone()))
            }
            Err(source) => {
                return Err(LoadError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        parse_streams(&raw)
    }
}

#[derive(Default)]
pub struct BundledStreamService;

impl StreamService for BundledStreamService {
    fn load_streams(&self) -> Result<Vec<VideoData>, LoadError> {
        parse_streams(BUNDLED_STREAMS)
    }
}

pub fn parse_streams(raw: &str) -> Result<Vec<VideoData>, LoadError> {
    Ok(serde_json::from_str(raw)?)
}

/// Loads streams and keeps the first one. Failures are logged and yield
/// `None`; the screen then shows its default state with an empty feed.
pub fn load_first(service: &dyn StreamService) -> Option<VideoData> {
    match service.load_streams() {
        Ok(streams) => {
            let count = streams.len();
            let first = streams.into_iter().next();
            match &first {
                Some(stream) => info!(
                    streams = count,
                    host = %stream.user.username,
                    comments = stream.comments.len(),
                    "stream data loaded"
                ),
                None => warn!("stream data contains no streams"),
            }
            first
        }
        Err(LoadError::NotFound(path)) => {
            warn!(path = %path.display(), "stream data not found; starting with an empty feed");
            None
        }
        Err(err) => {
            error!(error = ?err, "failed to load stream data");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"[
        {
            "videoURL": "stream.mp4",
            "viewerCount": 1200,
            "likes": 87,
            "comments": [
                {"username": "ana", "profilePictureURL": "ana.png", "text": "hi!"}
            ],
            "user": {"username": "host", "profilePictureURL": "host.png"}
        }
    ]"#;

    #[test]
    fn parses_original_field_names() {
        let streams = parse_streams(SAMPLE).unwrap();
        assert_eq!(streams.len(), 1);
        let stream = &streams[0];
        assert_eq!(stream.video, "stream.mp4");
        assert_eq!(stream.viewer_count, 1200);
        assert_eq!(stream.likes, 87);
        assert_eq!(stream.user.avatar, "host.png");
        assert_eq!(stream.comments[0].text, "hi!");
    }

    #[test]
    fn accepts_alias_field_names() {
        let raw = r#"[{
            "videoRef": "v.mp4",
            "viewerCount": 1,
            "likeCount": 2,
            "comments": [{"username": "a", "avatarRef": "a.png", "text": "t"}],
            "user": {"username": "h", "avatarRef": "h.png"}
        }]"#;
        let streams = parse_streams(raw).unwrap();
        assert_eq!(streams[0].likes, 2);
        assert_eq!(streams[0].comments[0].avatar, "a.png");
    }

    #[test]
    fn malformed_payload_is_rejected_whole() {
        let raw = r#"[{"videoURL": "v.mp4", "viewerCount": "many"}]"#;
        assert!(matches!(parse_streams(raw), Err(LoadError::Malformed(_))));
    }

    #[test]
    fn bundled_streams_parse() {
        let streams = BundledStreamService.load_streams().unwrap();
        assert!(!streams.is_empty());
        assert!(streams[0].comments.len() > 3);
    }

    #[test]
    fn missing_file_reports_not_found() {
        let dir = tempdir().unwrap();
        let service = FileStreamService::new(dir.path().join("missing.json"));
        assert!(matches!(
            service.load_streams(),
            Err(LoadError::NotFound(_))
        ));
        assert!(load_first(&service).is_none());
    }

    #[test]
    fn load_first_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("streams.json");
        fs::write(&path, SAMPLE).unwrap();
        let stream = load_first(&FileStreamService::new(&path)).unwrap();
        assert_eq!(stream.user.username, "host");
    }

    #[test]
    fn load_first_degrades_on_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("streams.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load_first(&FileStreamService::new(&path)).is_none());
    }

    #[test]
    fn comment_from_user_copies_identity() {
        let user = User {
            username: "me".into(),
            avatar: "me.png".into(),
        };
        let comment = Comment::from_user(&user, "hello");
        assert_eq!(comment.username, "me");
        assert_eq!(comment.avatar, "me.png");
        assert_eq!(comment.text, "hello");
    }
}
