use tracing::warn;

use crate::sources::ReviewSource;

/// Fetch the text behind a review link.
///
/// Never fails: a transport or auth error is logged and yields an empty body
/// so the rest of the docmap still converts.
pub async fn scrape_review(source: &dyn ReviewSource, url: &str) -> String {
    match source.fetch_review(url).await {
        Ok(body) => body,
        Err(err) => {
            warn!(url, error = %err, "review scrape failed; using empty comment");
            String::new()
        }
    }
}
