use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub attachments: AttachmentsConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub token: String,
    pub note_store_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AttachmentsConfig {
    /// Relative attachment paths are resolved against this folder.
    #[serde(default)]
    pub upload_folder: Option<PathBuf>,
    /// Server attachments are downloaded below this folder before opening.
    #[serde(default = "default_download_folder")]
    pub download_folder: PathBuf,
    #[serde(default = "default_download_prefix")]
    pub download_prefix: String,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            upload_folder: None,
            download_folder: default_download_folder(),
            download_prefix: default_download_prefix(),
        }
    }
}

fn default_download_folder() -> PathBuf {
    PathBuf::from("./attachments")
}
fn default_download_prefix() -> String {
    "notesync-".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditorConfig {
    /// Warn on save that saving does not publish.
    #[serde(default = "default_save_tips")]
    pub save_tips: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            save_tips: default_save_tips(),
        }
    }
}

fn default_save_tips() -> bool {
    true
}

const SHARD_MARKER: &str = "/shard";

impl Config {
    /// Browser URL for a note, derived from the note store URL's host part.
    pub fn note_web_url(&self, guid: &str) -> Result<String> {
        let url = &self.service.note_store_url;
        let Some(idx) = url.find(SHARD_MARKER) else {
            bail!("service.note_store_url has no '{}' segment: {}", SHARD_MARKER, url);
        };
        Ok(format!(
            "{}/Home.action#n={}&ses=4&sh=2&sds=5&",
            &url[..idx],
            guid
        ))
    }

    /// `true` when the token or note store URL is blank.
    pub fn missing_credentials(&self) -> bool {
        self.service.token.trim().is_empty() || self.service.note_store_url.trim().is_empty()
    }

    /// Resolve an attachment path typed by the user.
    ///
    /// Returns the path and whether an upload folder is configured at all.
    pub fn resolve_upload_path(&self, input: &str) -> (PathBuf, bool) {
        match &self.attachments.upload_folder {
            Some(folder) if folder.is_dir() => (folder.join(input), true),
            Some(_) => (PathBuf::from(input), true),
            None => (PathBuf::from(input), false),
        }
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.service.token.trim().is_empty() {
        bail!("service.token must not be empty");
    }
    if config.service.note_store_url.trim().is_empty() {
        bail!("service.note_store_url must not be empty");
    }
    if !config.service.note_store_url.contains(SHARD_MARKER) {
        bail!(
            "service.note_store_url must contain '{}' (e.g. https://www.evernote.com/shard/s1/notestore)",
            SHARD_MARKER
        );
    }
    if config.attachments.download_prefix.contains(['/', '\\']) {
        bail!("attachments.download_prefix must not contain path separators");
    }

    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[service]
token = "S=s1:U=1:E=abc"
note_store_url = "https://www.evernote.com/shard/s1/notestore"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert!(config.attachments.upload_folder.is_none());
        assert_eq!(config.attachments.download_folder, PathBuf::from("./attachments"));
        assert_eq!(config.attachments.download_prefix, "notesync-");
        assert!(config.editor.save_tips);
    }

    #[test]
    fn web_url_uses_host_before_shard() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(
            config.note_web_url("abc-123").unwrap(),
            "https://www.evernote.com/Home.action#n=abc-123&ses=4&sh=2&sds=5&"
        );
    }

    #[test]
    fn rejects_missing_token_and_bad_url() {
        let empty_token = MINIMAL.replace("S=s1:U=1:E=abc", " ");
        assert!(parse_config(&empty_token).is_err());

        let no_shard = MINIMAL.replace("/shard/s1/notestore", "/notestore");
        let err = parse_config(&no_shard).unwrap_err();
        assert!(err.to_string().contains("/shard"));
    }

    #[test]
    fn blank_credentials_are_reported() {
        let mut config = parse_config(MINIMAL).unwrap();
        assert!(!config.missing_credentials());
        config.service.token = "  ".to_string();
        assert!(config.missing_credentials());
    }

    #[test]
    fn upload_folder_is_joined_when_it_exists() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            "{}\n[attachments]\nupload_folder = \"{}\"\n",
            MINIMAL,
            dir.path().display()
        );
        let config = parse_config(&content).unwrap();
        let (path, configured) = config.resolve_upload_path("photo.png");
        assert!(configured);
        assert_eq!(path, dir.path().join("photo.png"));

        let (path, configured) = parse_config(MINIMAL).unwrap().resolve_upload_path("photo.png");
        assert!(!configured);
        assert_eq!(path, PathBuf::from("photo.png"));
    }
}
