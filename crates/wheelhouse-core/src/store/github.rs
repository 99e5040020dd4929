use super::{RemoteAsset, RemoteStore, StoreSettings, check_asset_name};
use crate::error::{Error, Result, StoreOp};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use sha2::Digest;
use tokio::sync::OnceCell;
use wheelhouse_schema::Sha256Digest;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct Release {
    id: u64,
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    url: String,
}

/// Assets of one GitHub release, addressed by tag.
///
/// The release must already exist; it is never created here.
#[derive(Debug)]
pub struct GitHubReleaseStore {
    client: Client,
    api_url: String,
    repo: String,
    tag: String,
    release: OnceCell<Release>,
}

impl GitHubReleaseStore {
    /// Build from settings. `repo` is required, `api_url` falls back to
    /// [`DEFAULT_API_URL`], and `token` is optional for public reads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a missing or malformed repository,
    /// or an unusable token.
    pub fn from_settings(settings: &StoreSettings, tag: &str) -> Result<Self> {
        let repo = settings
            .repo
            .as_deref()
            .ok_or_else(|| Error::validation("the github store needs a repository (--repo or GITHUB_REPOSITORY)"))?;
        match repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {}
            _ => return Err(Error::validation(format!("repository must be 'owner/name', got '{repo}'"))),
        }
        if tag.is_empty() {
            return Err(Error::validation("release tag must not be empty"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        if let Some(token) = settings.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::validation("GITHUB_TOKEN contains invalid characters"))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        } else {
            tracing::debug!("no GitHub token configured, requests are unauthenticated");
        }

        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::validation(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: settings
                .api_url
                .as_deref()
                .unwrap_or(DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            repo: repo.to_string(),
            tag: tag.to_string(),
            release: OnceCell::new(),
        })
    }

    async fn release(&self) -> Result<&Release> {
        self.release
            .get_or_try_init(|| async {
                let url = format!("{}/repos/{}/releases/tags/{}", self.api_url, self.repo, self.tag);
                let resp = send(self.client.get(&url), StoreOp::List, &self.tag).await?;
                let release: Release = resp
                    .json()
                    .await
                    .map_err(|e| Error::store(StoreOp::List, &self.tag, e))?;
                tracing::debug!("release {} has id {}", self.tag, release.id);
                Ok::<_, Error>(release)
            })
            .await
    }
}

/// Send a request and turn transport failures and non-2xx statuses into
/// store errors.
async fn send(request: RequestBuilder, op: StoreOp, name: &str) -> Result<Response> {
    let resp = request.send().await.map_err(|e| Error::store(op, name, e))?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let body = body.trim();
    let reason = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    };
    Err(Error::store(op, name, reason))
}

/// `https://uploads.github.com/.../assets{?name,label}` without the template.
fn strip_uri_template(url: &str) -> &str {
    url.split_once('{').map_or(url, |(base, _)| base)
}

#[async_trait]
impl RemoteStore for GitHubReleaseStore {
    fn describe(&self) -> String {
        format!("github:{}@{}", self.repo, self.tag)
    }

    async fn list(&self) -> Result<Vec<RemoteAsset>> {
        let release = self.release().await?;
        let mut assets = Vec::new();
        for page in 1.. {
            let url = format!(
                "{}/repos/{}/releases/{}/assets?per_page={PAGE_SIZE}&page={page}",
                self.api_url, self.repo, release.id
            );
            let batch: Vec<Asset> = send(self.client.get(&url), StoreOp::List, &self.tag)
                .await?
                .json()
                .await
                .map_err(|e| Error::store(StoreOp::List, &self.tag, e))?;
            let done = batch.len() < PAGE_SIZE;
            assets.extend(batch.into_iter().map(|a| RemoteAsset::new(a.name, a.url)));
            if done {
                break;
            }
        }
        tracing::debug!("{} lists {} assets", self.describe(), assets.len());
        Ok(assets)
    }

    async fn fetch(&self, asset: &RemoteAsset) -> Result<Bytes> {
        let request = self
            .client
            .get(&asset.handle)
            .header(header::ACCEPT, "application/octet-stream");
        send(request, StoreOp::Get, &asset.name)
            .await?
            .bytes()
            .await
            .map_err(|e| Error::store(StoreOp::Get, &asset.name, e))
    }

    async fn fetch_hash(&self, asset: &RemoteAsset) -> Result<Sha256Digest> {
        let request = self
            .client
            .get(&asset.handle)
            .header(header::ACCEPT, "application/octet-stream");
        let resp = send(request, StoreOp::Get, &asset.name).await?;

        let mut hasher = sha2::Sha256::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::store(StoreOp::Get, &asset.name, e))?;
            hasher.update(&chunk);
        }
        Ok(Sha256Digest::from_hasher(hasher))
    }

    async fn upload(&self, name: &str, data: Bytes) -> Result<()> {
        check_asset_name(name, StoreOp::Put)?;
        let release = self.release().await?;
        let request = self
            .client
            .post(strip_uri_template(&release.upload_url))
            .query(&[("name", name)])
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(data);
        send(request, StoreOp::Put, name).await?;
        Ok(())
    }

    async fn delete(&self, asset: &RemoteAsset) -> Result<()> {
        send(self.client.delete(&asset.handle), StoreOp::Delete, &asset.name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mockito::Matcher;

    fn store(api_url: &str) -> GitHubReleaseStore {
        let settings = StoreSettings {
            repo: Some("kivy/wheels".into()),
            api_url: Some(api_url.into()),
            token: Some("t0ken".into()),
            root: None,
        };
        GitHubReleaseStore::from_settings(&settings, "android-arm64_v8a").unwrap()
    }

    fn release_body(url: &str) -> String {
        serde_json::json!({
            "id": 7,
            "tag_name": "android-arm64_v8a",
            "upload_url": format!("{url}/upload/7/assets{{?name,label}}"),
        })
        .to_string()
    }

    #[test]
    fn repo_must_be_owner_slash_name() {
        for repo in ["kivy", "/wheels", "kivy/", "a/b/c"] {
            let settings = StoreSettings {
                repo: Some(repo.into()),
                ..StoreSettings::default()
            };
            let err = GitHubReleaseStore::from_settings(&settings, "v1").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{repo}");
        }
    }

    #[test]
    fn upload_template_is_stripped() {
        assert_eq!(
            strip_uri_template("https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}"),
            "https://uploads.github.com/repos/o/r/releases/1/assets"
        );
        assert_eq!(strip_uri_template("https://x/assets"), "https://x/assets");
    }

    #[tokio::test]
    async fn lists_assets_with_auth() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _release = server
            .mock("GET", "/repos/kivy/wheels/releases/tags/android-arm64_v8a")
            .match_header("authorization", "Bearer t0ken")
            .match_header("x-github-api-version", API_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(release_body(&url))
            .create_async()
            .await;
        let _assets = server
            .mock("GET", "/repos/kivy/wheels/releases/7/assets")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!([
                    {"id": 1, "name": "a-1.0-py3-none-any.whl", "url": format!("{url}/assets/1")},
                    {"id": 2, "name": "notes.txt", "url": format!("{url}/assets/2")},
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let assets = store(&url).list().await.unwrap();
        assert_eq!(
            assets,
            [
                RemoteAsset::new("a-1.0-py3-none-any.whl", format!("{url}/assets/1")),
                RemoteAsset::new("notes.txt", format!("{url}/assets/2")),
            ]
        );
    }

    #[tokio::test]
    async fn missing_release_is_a_store_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/repos/kivy/wheels/releases/tags/android-arm64_v8a")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let err = store(&server.url()).list().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteStore);
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn fetch_hash_streams_octets() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        let _m = server
            .mock("GET", "/assets/1")
            .match_header("accept", "application/octet-stream")
            .with_status(200)
            .with_body("wheel bytes")
            .create_async()
            .await;

        let asset = RemoteAsset::new("a-1.0-py3-none-any.whl", format!("{url}/assets/1"));
        let hash = store(&url).fetch_hash(&asset).await.unwrap();
        assert_eq!(hash, Sha256Digest::compute(b"wheel bytes"));
    }

    #[tokio::test]
    async fn upload_posts_to_release_upload_url() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        let _release = server
            .mock("GET", "/repos/kivy/wheels/releases/tags/android-arm64_v8a")
            .with_status(200)
            .with_body(release_body(&url))
            .expect(1)
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/upload/7/assets")
            .match_query(Matcher::UrlEncoded("name".into(), "a-1.0-py3-none-any.whl".into()))
            .match_header("content-type", "application/octet-stream")
            .match_body("payload")
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;
        let conflict = server
            .mock("POST", "/upload/7/assets")
            .match_query(Matcher::UrlEncoded("name".into(), "b-1.0-py3-none-any.whl".into()))
            .with_status(422)
            .with_body(r#"{"message": "already_exists"}"#)
            .create_async()
            .await;

        let store = store(&url);
        store
            .upload("a-1.0-py3-none-any.whl", Bytes::from_static(b"payload"))
            .await
            .unwrap();
        let err = store
            .upload("b-1.0-py3-none-any.whl", Bytes::from_static(b"payload"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("422"));

        upload.assert_async().await;
        conflict.assert_async().await;
    }

    #[tokio::test]
    async fn delete_hits_asset_url() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        let m = server
            .mock("DELETE", "/assets/9")
            .with_status(204)
            .create_async()
            .await;

        let asset = RemoteAsset::new("old.whl", format!("{url}/assets/9"));
        store(&url).delete(&asset).await.unwrap();
        m.assert_async().await;
    }
}
