//! Network reachability and the native terminal extension download.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use zip::ZipArchive;

use super::interpreter::InterpreterInfo;
use crate::error::LaunchError;

static WHEEL_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://files\.pythonhosted\.org[^"'\s<>#]+?\.whl"#).expect("valid wheel url regex")
});

/// Any HTTP answer counts as reachable; only transport failures do not.
pub fn probe(url: &str, timeout: Duration) -> Result<(), LaunchError> {
    let offline = || LaunchError::Offline {
        url: url.to_string(),
    };

    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|_| offline())?;

    match client.head(url).send() {
        Ok(response) => {
            tracing::debug!(url, status = %response.status(), "network probe ok");
            Ok(())
        }
        Err(err) => {
            tracing::warn!(url, "network probe failed: {err}");
            Err(offline())
        }
    }
}

/// File-name fragment that identifies the wheel for this interpreter,
/// e.g. `cp311` + `win_amd64`.
pub fn wheel_tags(info: &InterpreterInfo) -> (String, &'static str) {
    let python = format!("cp{}{}", info.major(), info.minor());
    let platform = if info.is_64bit() { "win_amd64" } else { "win32" };
    (python, platform)
}

/// All wheel links on a package index page.
pub fn wheel_urls(page: &str) -> Vec<String> {
    WHEEL_URL_RE
        .find_iter(page)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn select_wheel<'a>(urls: &'a [String], info: &InterpreterInfo) -> Option<&'a str> {
    let (python, platform) = wheel_tags(info);
    urls.iter()
        .map(String::as_str)
        .find(|url| {
            let file = url.rsplit('/').next().unwrap_or(url);
            file.contains(&format!("-{python}-")) && file.ends_with(&format!("{platform}.whl"))
        })
}

/// Download the matching wheel from `index_url` and unpack its native modules.
pub fn download_extension(
    index_url: &str,
    info: &InterpreterInfo,
    dest: &Path,
    timeout: Duration,
) -> Result<Vec<PathBuf>> {
    let client = Client::builder().timeout(timeout).build()?;

    let page = client
        .get(index_url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .with_context(|| format!("failed to fetch {index_url}"))?;

    let urls = wheel_urls(&page);
    let url = select_wheel(&urls, info)
        .ok_or_else(|| LaunchError::ExtensionMissing(info.to_string()))?;

    tracing::info!(url, "downloading terminal extension");
    let bytes = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.bytes())
        .with_context(|| format!("failed to download {url}"))?;

    extract_native_modules(Cursor::new(bytes), dest)
}

/// Copy every `.pyd` member of a wheel into `dest`, flattened.
pub fn extract_native_modules<R: Read + Seek>(wheel: R, dest: &Path) -> Result<Vec<PathBuf>> {
    let mut archive = ZipArchive::new(wheel).context("terminal extension is not a valid wheel")?;
    fs::create_dir_all(dest)?;

    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(file_name) = entry
            .enclosed_name()
            .and_then(|path| path.file_name().map(|name| name.to_os_string()))
        else {
            continue;
        };
        if entry.is_dir() || !file_name.to_string_lossy().ends_with(".pyd") {
            continue;
        }

        let target = dest.join(file_name);
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        extracted.push(target);
    }

    Ok(extracted)
}
