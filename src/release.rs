//! GitHub release lookups and asset downloads.
//!
//! A saved token only raises the rate limit; when GitHub refuses it (401 for a
//! bad token, 403 for an exhausted quota) the request is repeated anonymously once.

use crate::error::{FailureKind, ReleaseError};
use log::{debug, warn};
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::Duration;

const USER_AGENT: &str = concat!("spicetify-wizard/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    /// `v2.38.5` -> `2.38.5`
    pub fn version(&self) -> &str {
        self.tag_name.trim_start_matches('v')
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// How the release request ended up authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Anonymous,
    Token,
    /// The token was refused for this reason and the anonymous retry was used.
    FellBack(FailureKind),
}

#[derive(Debug, Clone)]
pub struct ReleaseFetch {
    pub release: Release,
    pub auth: AuthMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCheck {
    Valid { remaining: Option<u64> },
    Invalid,
    RateLimited,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    rate: RateWindow,
}

#[derive(Debug, Deserialize)]
struct RateWindow {
    remaining: u64,
}

pub struct ReleaseClient {
    http: Client,
    api_base: String,
    token: Option<String>,
}

impl ReleaseClient {
    pub fn new(
        api_base: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ReleaseError> {
        let http = Client::builder().user_agent(USER_AGENT).timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn get(&self, url: &str, token: Option<&str>) -> Result<Response, ReleaseError> {
        let mut request = self.http.get(url).header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        debug!("GET {} (token: {})", url, token.is_some());
        Ok(request.send()?)
    }

    fn fetch_release(&self, url: &str, token: Option<&str>) -> Result<Release, ReleaseError> {
        let response = self.get(url, token)?;
        check_status(response.status().as_u16())?;
        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    pub fn latest_release(&self, repo: &str) -> Result<ReleaseFetch, ReleaseError> {
        let url = format!("{}/repos/{}/releases/latest", self.api_base, repo);

        if let Some(token) = self.token.as_deref() {
            match self.fetch_release(&url, Some(token)) {
                Ok(release) => return Ok(ReleaseFetch { release, auth: AuthMode::Token }),
                Err(e @ (ReleaseError::Unauthorized | ReleaseError::RateLimited)) => {
                    warn!("{}; retrying without token", e);
                    let release = self.fetch_release(&url, None)?;
                    return Ok(ReleaseFetch { release, auth: AuthMode::FellBack(e.kind()) });
                }
                Err(e) => return Err(e),
            }
        }

        let release = self.fetch_release(&url, None)?;
        Ok(ReleaseFetch { release, auth: AuthMode::Anonymous })
    }

    pub fn validate_token(&self, token: &str) -> Result<TokenCheck, ReleaseError> {
        let url = format!("{}/rate_limit", self.api_base);
        let response = self.get(&url, Some(token))?;
        match check_status(response.status().as_u16()) {
            Ok(()) => {
                let remaining = response
                    .text()
                    .ok()
                    .and_then(|body| serde_json::from_str::<RateLimitBody>(&body).ok())
                    .map(|b| b.rate.remaining);
                Ok(TokenCheck::Valid { remaining })
            }
            Err(ReleaseError::Unauthorized) => Ok(TokenCheck::Invalid),
            Err(ReleaseError::RateLimited) => Ok(TokenCheck::RateLimited),
            Err(e) => Err(e),
        }
    }

    /// Streams `url` into `dest`, returning the number of bytes written.
    pub fn download(&self, url: &str, dest: &Path) -> Result<u64, ReleaseError> {
        let mut response = self.http.get(url).send()?;
        check_status(response.status().as_u16())?;
        let mut file = File::create(dest)?;
        let written = response.copy_to(&mut file)?;
        debug!("downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }
}

fn check_status(status: u16) -> Result<(), ReleaseError> {
    match status {
        200..=299 => Ok(()),
        401 => Err(ReleaseError::Unauthorized),
        403 | 429 => Err(ReleaseError::RateLimited),
        other => Err(ReleaseError::Status(other)),
    }
}

/// OS label used in spicetify asset names.
pub fn os_tag() -> &'static str {
    match std::env::consts::OS {
        "windows" => "windows",
        "macos" => "darwin",
        _ => "linux",
    }
}

fn arch_aliases(arch: &str) -> &'static [&'static str] {
    match arch {
        "x86_64" => &["x64", "amd64"],
        "aarch64" => &["arm64"],
        "x86" => &["x32", "386"],
        _ => &[],
    }
}

fn is_archive(name: &str) -> bool {
    name.ends_with(".zip") || name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Finds the archive built for `os`/`arch` (e.g. `spicetify-2.38.5-windows-x64.zip`).
pub fn pick_asset<'a>(
    release: &'a Release,
    os: &str,
    arch: &str,
) -> Result<&'a Asset, ReleaseError> {
    let aliases = arch_aliases(arch);
    release
        .assets
        .iter()
        .find(|asset| {
            let name = asset.name.to_lowercase();
            is_archive(&name)
                && name.contains(&format!("-{}", os))
                && aliases.iter().any(|a| name.contains(&format!("-{}", a)))
        })
        .ok_or_else(|| ReleaseError::NoAsset { os: os.to_string(), arch: arch.to_string() })
}

/// First asset with this file name, ignoring ASCII case.
pub fn asset_named<'a>(release: &'a Release, name: &str) -> Option<&'a Asset> {
    release.assets.iter().find(|a| a.name.eq_ignore_ascii_case(name))
}

/// Unpacks a `.zip` or `.tar.gz` into `dest`.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), ReleaseError> {
    fs::create_dir_all(dest)?;
    let name = archive.to_string_lossy().to_lowercase();
    if name.ends_with(".zip") {
        extract_zip(archive, dest)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let file = File::open(archive)?;
        let mut tarball = tar::Archive::new(flate2::read::GzDecoder::new(file));
        tarball.unpack(dest)?;
        Ok(())
    } else {
        Err(ReleaseError::Archive(format!("unsupported archive: {}", archive.display())))
    }
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<(), ReleaseError> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        // Skip entries that would escape dest
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let out = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&out)?;
        io::copy(&mut entry, &mut file)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out, fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Write;

    const RELEASE_JSON: &str = r#"{
        "tag_name": "v2.38.5",
        "assets": [
            {"name": "spicetify-2.38.5-darwin-arm64.tar.gz",
             "browser_download_url": "https://example.invalid/d", "size": 1},
            {"name": "spicetify-2.38.5-linux-amd64.tar.gz",
             "browser_download_url": "https://example.invalid/l", "size": 1},
            {"name": "spicetify-2.38.5-windows-x64.zip",
             "browser_download_url": "https://example.invalid/w", "size": 1},
            {"name": "checksums.txt", "browser_download_url": "https://example.invalid/c"}
        ]
    }"#;

    const LATEST: &str = "/repos/spicetify/cli/releases/latest";

    fn client(base: &str, token: Option<&str>) -> ReleaseClient {
        ReleaseClient::new(base, token.map(str::to_string), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn bad_token_falls_back_to_anonymous() {
        let mut server = mockito::Server::new();
        let authed = server
            .mock("GET", LATEST)
            .match_header("authorization", "Bearer bad-token")
            .with_status(401)
            .with_body(r#"{"message":"Bad credentials"}"#)
            .expect(1)
            .create();
        let anonymous = server
            .mock("GET", LATEST)
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(RELEASE_JSON)
            .expect(1)
            .create();

        let fetch = client(&server.url(), Some("bad-token"))
            .latest_release("spicetify/cli")
            .unwrap();
        assert_eq!(fetch.release.tag_name, "v2.38.5");
        assert_eq!(fetch.release.version(), "2.38.5");
        assert_eq!(fetch.auth, AuthMode::FellBack(FailureKind::Unauthorized));
        authed.assert();
        anonymous.assert();
    }

    #[test]
    fn rate_limited_token_is_told_apart() {
        let mut server = mockito::Server::new();
        let _spent = server
            .mock("GET", LATEST)
            .match_header("authorization", "Bearer spent")
            .with_status(403)
            .create();
        let _anonymous = server
            .mock("GET", LATEST)
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(RELEASE_JSON)
            .create();

        let fetch = client(&server.url(), Some("spent")).latest_release("spicetify/cli").unwrap();
        assert_eq!(fetch.auth, AuthMode::FellBack(FailureKind::RateLimited));
    }

    #[test]
    fn anonymous_rate_limit_is_an_error() {
        let mut server = mockito::Server::new();
        let _limited = server.mock("GET", LATEST).with_status(403).create();
        let err = client(&server.url(), None).latest_release("spicetify/cli").unwrap_err();
        assert!(matches!(err, ReleaseError::RateLimited));
        assert_eq!(err.kind(), FailureKind::RateLimited);
    }

    #[test]
    fn token_validation_reads_remaining_quota() {
        let mut server = mockito::Server::new();
        let _good = server
            .mock("GET", "/rate_limit")
            .match_header("authorization", "Bearer good")
            .with_status(200)
            .with_body(r#"{"resources":{},"rate":{"limit":5000,"remaining":4999}}"#)
            .create();
        let _bad = server
            .mock("GET", "/rate_limit")
            .match_header("authorization", "Bearer nope")
            .with_status(401)
            .create();

        let c = client(&server.url(), None);
        assert_eq!(c.validate_token("good").unwrap(), TokenCheck::Valid { remaining: Some(4999) });
        assert_eq!(c.validate_token("nope").unwrap(), TokenCheck::Invalid);
    }

    #[test]
    fn picks_asset_for_platform() {
        let release: Release = serde_json::from_str(RELEASE_JSON).unwrap();
        let name = |os, arch| pick_asset(&release, os, arch).unwrap().name.clone();
        assert_eq!(name("windows", "x86_64"), "spicetify-2.38.5-windows-x64.zip");
        assert_eq!(name("linux", "x86_64"), "spicetify-2.38.5-linux-amd64.tar.gz");
        assert_eq!(name("darwin", "aarch64"), "spicetify-2.38.5-darwin-arm64.tar.gz");
        assert!(matches!(
            pick_asset(&release, "linux", "aarch64"),
            Err(ReleaseError::NoAsset { .. })
        ));
        assert!(asset_named(&release, "CHECKSUMS.txt").is_some());
    }

    #[test]
    fn download_writes_body() {
        let mut server = mockito::Server::new();
        let _file = server.mock("GET", "/file.bin").with_status(200).with_body("payload").create();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.bin");
        let url = format!("{}/file.bin", server.url());
        let written = client(&server.url(), None).download(&url, &dest).unwrap();
        assert_eq!(written, 7);
        assert_eq!(fs::read_to_string(dest).unwrap(), "payload");
    }

    #[test]
    fn extracts_zip_and_tarball() {
        let dir = tempfile::tempdir().unwrap();

        let zip_path = dir.path().join("cli.zip");
        let mut writer = zip::ZipWriter::new(File::create(&zip_path).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("spicetify.exe", options).unwrap();
        writer.write_all(b"binary").unwrap();
        writer.start_file("Extensions/shuffle+.js", options).unwrap();
        writer.write_all(b"ext").unwrap();
        writer.finish().unwrap();

        let out = dir.path().join("zip-out");
        extract_archive(&zip_path, &out).unwrap();
        assert_eq!(fs::read(out.join("spicetify.exe")).unwrap(), b"binary");
        assert!(out.join("Extensions/shuffle+.js").is_file());

        let tar_path = dir.path().join("cli.tar.gz");
        {
            let gz = flate2::write::GzEncoder::new(
                File::create(&tar_path).unwrap(),
                flate2::Compression::default(),
            );
            let mut builder = tar::Builder::new(gz);
            let mut header = tar::Header::new_gnu();
            header.set_size(6);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, "spicetify", &b"binary"[..]).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }
        let out = dir.path().join("tar-out");
        extract_archive(&tar_path, &out).unwrap();
        assert_eq!(fs::read(out.join("spicetify")).unwrap(), b"binary");

        assert!(extract_archive(&dir.path().join("x.rar"), &out).is_err());
    }
}
