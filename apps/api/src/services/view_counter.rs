//! Post reads that count views

use inkpost_http::{HttpError, HttpResult};
use inkpost_orm::{Post, Store};
use tracing::warn;

/// Fetch the post at `slug`, counting the view when it is published.
///
/// A failed increment degrades to a plain read. Unpublished posts are only
/// returned to admins and are never counted.
pub async fn read_post(store: &dyn Store, slug: &str, is_admin: bool) -> HttpResult<Post> {
    match store.increment_post_views(slug).await {
        Ok(Some(post)) => return Ok(post),
        Ok(None) => {}
        Err(e) => warn!(slug, error = %e, "View count increment failed"),
    }

    let post = store
        .find_post_by_slug(slug)
        .await?
        .ok_or_else(|| HttpError::not_found("Post"))?;
    if !post.is_published() && !is_admin {
        return Err(HttpError::not_found("Post"));
    }
    Ok(post)
}
