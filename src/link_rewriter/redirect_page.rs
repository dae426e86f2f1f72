//! Placeholder pages for archived redirects.

use html_escape::encode_double_quoted_attribute;
use url::Url;

use super::{LinkResolver, Rewritten};
use crate::resource_index::{Snapshot, SnapshotId};
use crate::utils::relativize;

/// Render the meta-refresh page written in place of a redirect's body.
///
/// The destination is the redirect's `Location` resolved through the index.
/// When it resolves to the redirect itself (a scheme-only change such as
/// http to https), the page instead points at the snapshot holding the
/// unsuffixed candidate path, provided that one is emitted and is not this
/// page. Anything unresolved falls back to the raw `Location`.
#[must_use]
pub fn render(resolver: &LinkResolver<'_>, id: SnapshotId, snapshot: &Snapshot) -> Rewritten {
    let location = snapshot.redirect_target().unwrap_or_default();
    let mut page = format!("<!-- Redirected From : {} -->\n", comment_safe(snapshot.url()));

    let destination = match (Url::parse(snapshot.url()), snapshot.output_path()) {
        (Ok(base), Some(from_path)) => match resolver.resolve(location, &base) {
            Some((target_id, target)) if target_id != id => {
                target.output_path().and_then(|p| relativize(p, from_path))
            }
            Some(_) => {
                page.push_str("<!-- Change to HTTPS -->\n");
                unsuffixed_destination(resolver, id, snapshot, location, base)
            }
            None => None,
        },
        _ => None,
    };

    let links_rewritten = usize::from(destination.is_some());
    let destination = destination.unwrap_or_else(|| location.to_string());
    page.push_str(&format!(
        "<meta http-equiv=\"refresh\" content=\"0; url={}\">\n",
        encode_double_quoted_attribute(&destination)
    ));

    Rewritten {
        body: page.into_bytes(),
        links_rewritten,
    }
}

/// Retry a self-targeting redirect over https, measured between unsuffixed
/// candidate paths.
fn unsuffixed_destination(
    resolver: &LinkResolver<'_>,
    id: SnapshotId,
    snapshot: &Snapshot,
    location: &str,
    mut base: Url,
) -> Option<String> {
    if base.scheme() == "http" {
        base.set_scheme("https").ok()?;
    }
    let (_, target) = resolver.resolve(location, &base)?;
    let target_base = target.base_path()?;
    let from_base = snapshot.base_path()?;

    match resolver.index().emitted_at(target_base) {
        Some(emitted) if emitted != id => relativize(target_base, from_base),
        _ => {
            log::debug!(
                "No unsuffixed page for self-redirect {}, using raw Location",
                snapshot.url()
            );
            None
        }
    }
}

fn comment_safe(text: &str) -> String {
    text.replace("--", "%2D%2D")
}
