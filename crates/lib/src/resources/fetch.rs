//! Downloading resources with SHA256 verification.
//!
//! Downloads are streamed to a temporary file next to their final cache
//! location while being hashed, and only renamed into place once the digest
//! matches. A cache entry that still verifies is reused without network access.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::resources::types::{FetchedResource, Resource, ResourceError, sanitize_file_name};
use crate::util::hash::hash_file;

/// Build the HTTP client shared by all fetches of one invocation.
pub fn http_client() -> Result<reqwest::Client, ResourceError> {
  reqwest::Client::builder()
    .user_agent(concat!("muslcross/", env!("CARGO_PKG_VERSION")))
    .build()
    .map_err(|e| ResourceError::FetchFailed {
      url: String::new(),
      message: e.to_string(),
    })
}

/// Fetch a single resource into `downloads_dir`.
///
/// Returns the cached copy when it verifies. Otherwise downloads into a
/// private temporary file, verifies it and renames it into place. A digest
/// mismatch discards the download and fails with [`ResourceError::Integrity`].
pub async fn fetch(
  client: &reqwest::Client,
  resource: &Resource,
  downloads_dir: &Path,
) -> Result<FetchedResource, ResourceError> {
  let dest_path = resource.cache_path(downloads_dir);

  if let Some(size) = cached_size(resource, &dest_path).await? {
    info!(name = %resource.name, path = ?dest_path, "using cached file");
    return Ok(FetchedResource {
      resource: resource.clone(),
      path: dest_path,
      cached: true,
      size,
    });
  }

  info!(name = %resource.name, url = %resource.url, "fetching resource");

  let dest_dir = dest_path
    .parent()
    .map(Path::to_path_buf)
    .unwrap_or_else(|| downloads_dir.to_path_buf());
  fs::create_dir_all(&dest_dir).await?;

  // Each fetch streams into its own temporary file so concurrent runs sharing
  // the cache never write the same partial file.
  let part = tempfile::Builder::new()
    .prefix(&format!(".{}.", sanitize_file_name(&resource.name)))
    .suffix(".part")
    .tempfile_in(&dest_dir)?;
  let file = fs::File::from_std(part.as_file().try_clone()?);

  let (actual, size) = download(client, resource, file).await?;

  if actual != resource.sha256 {
    error!(name = %resource.name, expected = %resource.sha256, actual = %actual, "integrity check failed");
    return Err(ResourceError::Integrity {
      name: resource.name.clone(),
      url: resource.url.clone(),
      expected: resource.sha256.clone(),
      actual,
    });
  }

  // A concurrent run may already have stored the same verified bytes here.
  part.persist(&dest_path).map_err(|e| ResourceError::Io(e.error))?;
  info!(path = ?dest_path, size, "download complete");

  Ok(FetchedResource {
    resource: resource.clone(),
    path: dest_path,
    cached: false,
    size,
  })
}

/// Fetch every resource, running at most `parallelism` downloads at once.
///
/// Results are returned in the order of `resources`. If any fetch fails, the
/// error of the earliest failing resource is returned.
pub async fn fetch_all(
  client: &reqwest::Client,
  resources: &[Resource],
  downloads_dir: &Path,
  parallelism: usize,
) -> Result<Vec<FetchedResource>, ResourceError> {
  use tokio::task::JoinSet;

  info!(count = resources.len(), parallelism, "fetching resources");

  let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
  let mut join_set = JoinSet::new();

  for (index, resource) in resources.iter().enumerate() {
    let resource = resource.clone();
    let client = client.clone();
    let downloads_dir = downloads_dir.to_path_buf();
    let semaphore = semaphore.clone();

    join_set.spawn(async move {
      let _permit = semaphore.acquire_owned().await;
      let result = fetch(&client, &resource, &downloads_dir).await;
      (index, result)
    });
  }

  let mut slots: Vec<Option<Result<FetchedResource, ResourceError>>> = resources.iter().map(|_| None).collect();

  while let Some(join_result) = join_set.join_next().await {
    match join_result {
      Ok((index, result)) => slots[index] = Some(result),
      Err(e) => {
        error!(error = %e, "fetch task panicked");
        return Err(ResourceError::FetchFailed {
          url: String::new(),
          message: format!("fetch task failed: {e}"),
        });
      }
    }
  }

  let mut fetched = Vec::with_capacity(resources.len());
  for slot in slots {
    match slot {
      Some(Ok(f)) => fetched.push(f),
      Some(Err(e)) => return Err(e),
      None => return Err(ResourceError::FetchFailed {
        url: String::new(),
        message: "fetch task did not complete".to_string(),
      }),
    }
  }

  Ok(fetched)
}

/// Size of the cached file if it exists and verifies; stale entries are removed.
async fn cached_size(resource: &Resource, path: &Path) -> Result<Option<u64>, ResourceError> {
  if !path.exists() {
    return Ok(None);
  }

  debug!(path = ?path, "checking cached file");
  let owned: PathBuf = path.to_path_buf();
  let actual = tokio::task::spawn_blocking(move || hash_file(&owned))
    .await
    .map_err(|e| ResourceError::Io(std::io::Error::other(e)))?;

  match actual {
    Ok(hash) if hash.matches(&resource.sha256) => Ok(Some(fs::metadata(path).await?.len())),
    Ok(hash) => {
      warn!(
        name = %resource.name,
        expected = %resource.sha256,
        actual = %hash,
        "cached file hash mismatch, re-downloading"
      );
      match fs::remove_file(path).await {
        Ok(()) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
      }
    }
    Err(e) => {
      warn!(path = ?path, error = %e, "unreadable cache entry, re-downloading");
      Ok(None)
    }
  }
}

/// Stream the response body into `file`, returning its digest and size.
async fn download(
  client: &reqwest::Client,
  resource: &Resource,
  mut file: fs::File,
) -> Result<(String, u64), ResourceError> {
  let fetch_failed = |message: String| ResourceError::FetchFailed {
    url: resource.url.clone(),
    message,
  };

  let mut response = client
    .get(&resource.url)
    .send()
    .await
    .map_err(|e| fetch_failed(e.to_string()))?;

  if !response.status().is_success() {
    return Err(fetch_failed(format!("HTTP {}", response.status())));
  }

  let mut hasher = Sha256::new();
  let mut size: u64 = 0;

  while let Some(chunk) = response.chunk().await.map_err(|e| fetch_failed(e.to_string()))? {
    hasher.update(&chunk);
    file.write_all(&chunk).await?;
    size += chunk.len() as u64;
  }

  file.flush().await?;

  Ok((hex::encode(hasher.finalize()), size))
}
