// src/cache.rs

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::ScrapeError;

/// Write-once on-disk cache of fetched documents, one file per year.
///
/// A cached year is never re-fetched and never overwritten; invalidation is
/// manual (delete the file). Entries for different years are fully
/// independent, so concurrent pipelines only contend when they race on the
/// same year, and the create-exclusive claim makes the second writer fail
/// with [`ScrapeError::ClaimHeld`] rather than fetch the year twice.
pub struct YearCache {
    dir: PathBuf,
}

impl YearCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ScrapeError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(YearCache { dir })
    }

    /// Deterministic location of a year's document.
    pub fn path_for(&self, year: i32) -> PathBuf {
        self.dir.join(format!("{year}.html"))
    }

    /// Return the cached document for `year`, fetching and storing it first
    /// if absent. `fetch` is only invoked on a cache miss.
    ///
    /// A failed fetch leaves nothing behind at the year's path, so a later
    /// run sees a clean miss instead of a bogus hit. The failure comes back
    /// as [`ScrapeError::FetchFailed`] naming the year. A zero-byte file is
    /// another writer's in-flight claim and fails this call with
    /// [`ScrapeError::ClaimHeld`]; a claim orphaned by a crash has to be
    /// deleted manually, like any other cache invalidation.
    pub async fn ensure<F, Fut>(&self, year: i32, fetch: F) -> Result<String, ScrapeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ScrapeError>>,
    {
        let path = self.path_for(year);

        match fs::read_to_string(&path).await {
            Ok(body) if !body.is_empty() => {
                debug!(year, path = %path.display(), "cache hit");
                return Ok(body);
            }
            Ok(_) => {
                // A zero-byte file is another writer's live claim. Deleting
                // it would let two writers fetch the same year and race on
                // the final rename, so the claim stands and this call loses.
                return Err(ScrapeError::ClaimHeld { year });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // Claim the destination exclusively; a writer that slipped in
        // between the read above and here wins the race.
        let claim = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ScrapeError::ClaimHeld { year });
            }
            Err(e) => return Err(e.into()),
        };
        drop(claim);

        info!(year, "cache miss, fetching");
        let body = match fetch().await {
            Ok(body) => body,
            Err(source) => {
                let _ = fs::remove_file(&path).await;
                return Err(ScrapeError::FetchFailed {
                    year,
                    source: Box::new(source),
                });
            }
        };

        // The full body lands in a temp file first so the final path never
        // holds a partial document.
        let tmp = self.dir.join(format!("{year}.html.tmp"));
        if let Err(e) = write_and_swap(&tmp, &path, &body).await {
            let _ = fs::remove_file(&tmp).await;
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        Ok(body)
    }
}

async fn write_and_swap(tmp: &Path, dest: &Path, body: &str) -> std::io::Result<()> {
    fs::write(tmp, body).await?;
    fs::rename(tmp, dest).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tempfile::tempdir;

    fn counting_fetch(
        counter: Arc<AtomicUsize>,
        result: Result<String, ScrapeError>,
    ) -> impl FnOnce() -> std::future::Ready<Result<String, ScrapeError>> {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(result)
        }
    }

    #[tokio::test]
    async fn miss_fetches_and_stores() {
        let tmp = tempdir().unwrap();
        let cache = YearCache::new(tmp.path()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let body = cache
            .ensure(
                2001,
                counting_fetch(Arc::clone(&calls), Ok("<table>mvp</table>".to_string())),
            )
            .await
            .unwrap();

        assert_eq!(body, "<table>mvp</table>");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let on_disk = std::fs::read_to_string(cache.path_for(2001)).unwrap();
        assert_eq!(on_disk, "<table>mvp</table>");
    }

    #[tokio::test]
    async fn hit_never_invokes_fetch_and_is_byte_identical() {
        let tmp = tempdir().unwrap();
        let cache = YearCache::new(tmp.path()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .ensure(
                2002,
                counting_fetch(Arc::clone(&calls), Ok("original body".to_string())),
            )
            .await
            .unwrap();

        // Second call would return different bytes if it fetched again.
        let second = cache
            .ensure(
                2002,
                counting_fetch(Arc::clone(&calls), Ok("different body".to_string())),
            )
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_artifact() {
        let tmp = tempdir().unwrap();
        let cache = YearCache::new(tmp.path()).unwrap();

        let err = cache
            .ensure(1999, || {
                std::future::ready(Err(ScrapeError::InvalidTarget {
                    url: "http://example.invalid/awards_1999.html".to_string(),
                }))
            })
            .await
            .unwrap_err();

        match err {
            ScrapeError::FetchFailed { year, source } => {
                assert_eq!(year, 1999);
                assert!(matches!(*source, ScrapeError::InvalidTarget { .. }));
            }
            other => panic!("expected FetchFailed, got {other}"),
        }
        assert!(!cache.path_for(1999).exists());

        // A retry after the failure is a clean miss, not a bogus hit.
        let body = cache
            .ensure(1999, || std::future::ready(Ok("recovered".to_string())))
            .await
            .unwrap();
        assert_eq!(body, "recovered");
    }

    #[tokio::test]
    async fn empty_file_is_a_live_claim_not_a_hit() {
        let tmp = tempdir().unwrap();
        let cache = YearCache::new(tmp.path()).unwrap();
        std::fs::write(cache.path_for(2010), "").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let err = cache
            .ensure(
                2010,
                counting_fetch(Arc::clone(&calls), Ok("fresh".to_string())),
            )
            .await
            .unwrap_err();

        match err {
            ScrapeError::ClaimHeld { year } => assert_eq!(year, 2010),
            other => panic!("expected ClaimHeld, got {other}"),
        }
        // The claim is untouched and no fetch happened.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.path_for(2010).exists());
    }

    #[tokio::test]
    async fn concurrent_writer_loses_and_the_year_is_fetched_once() {
        let tmp = tempdir().unwrap();
        let cache_a = YearCache::new(tmp.path()).unwrap();
        let cache_b = YearCache::new(tmp.path()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        // Writer A holds its claim across a slow fetch; writer B arrives
        // mid-flight and must fail instead of re-fetching or clobbering.
        let calls_a = Arc::clone(&calls);
        let writer_a = async {
            cache_a
                .ensure(2005, || async move {
                    calls_a.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                    Ok("first writer".to_string())
                })
                .await
        };

        let calls_b = Arc::clone(&calls);
        let writer_b = async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            cache_b
                .ensure(2005, || async move {
                    calls_b.fetch_add(1, Ordering::SeqCst);
                    Ok("second writer".to_string())
                })
                .await
        };

        let (a, b) = tokio::join!(writer_a, writer_b);

        assert_eq!(a.unwrap(), "first writer");
        match b.unwrap_err() {
            ScrapeError::ClaimHeld { year } => assert_eq!(year, 2005),
            other => panic!("expected ClaimHeld, got {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            std::fs::read_to_string(cache_a.path_for(2005)).unwrap(),
            "first writer"
        );
    }

    #[tokio::test]
    async fn years_map_to_distinct_paths() {
        let tmp = tempdir().unwrap();
        let cache = YearCache::new(tmp.path()).unwrap();
        assert_ne!(cache.path_for(1991), cache.path_for(1992));
        assert!(cache.path_for(1991).ends_with("1991.html"));
    }
}
