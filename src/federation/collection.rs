//! Paged collections
//!
//! Following, followers and outbox are served from host page providers.
//! Cursors are opaque: they are only ever copied into links.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{Context, CursorProvider, PageProvider};
use crate::error::{FederationError, Result};
use crate::routes::RouteName;
use crate::vocab::{ACTIVITY_STREAMS_CONTEXT, Collection, CollectionPage, CollectionSummary, ObjectRef};

/// Collection kinds a local actor exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Following,
    Followers,
    Outbox,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [Self::Following, Self::Followers, Self::Outbox];

    pub fn route(self) -> RouteName {
        match self {
            CollectionKind::Following => RouteName::Following,
            CollectionKind::Followers => RouteName::Followers,
            CollectionKind::Outbox => RouteName::Outbox,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Following => "following",
            CollectionKind::Followers => "followers",
            CollectionKind::Outbox => "outbox",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of items returned by a host page provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSlice {
    pub items: Vec<ObjectRef>,
    /// Cursor of the following page, as the provider reports it. The
    /// `next` link of a page is addressed with the requested cursor instead.
    pub next_cursor: Option<String>,
    pub total_items: Option<u64>,
}

impl CollectionSlice {
    pub fn new(items: Vec<ObjectRef>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn with_next_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.next_cursor = Some(cursor.into());
        self
    }

    pub fn with_total_items(mut self, total: u64) -> Self {
        self.total_items = Some(total);
        self
    }
}

/// Page provider plus optional first/last cursor providers
#[derive(Clone)]
pub struct CollectionDispatcher {
    page: PageProvider,
    first_cursor: Option<CursorProvider>,
    last_cursor: Option<CursorProvider>,
}

impl fmt::Debug for CollectionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionDispatcher")
            .field("first_cursor", &self.first_cursor.is_some())
            .field("last_cursor", &self.last_cursor.is_some())
            .finish_non_exhaustive()
    }
}

impl CollectionDispatcher {
    pub fn new<F>(page: F) -> Self
    where
        F: Fn(&Context, &str, Option<&str>) -> Option<CollectionSlice> + Send + Sync + 'static,
    {
        Self {
            page: Arc::new(page),
            first_cursor: None,
            last_cursor: None,
        }
    }

    pub fn with_first_cursor<F>(mut self, provider: F) -> Self
    where
        F: Fn(&Context, &str) -> String + Send + Sync + 'static,
    {
        self.first_cursor = Some(Arc::new(provider));
        self
    }

    pub fn with_last_cursor<F>(mut self, provider: F) -> Self
    where
        F: Fn(&Context, &str) -> String + Send + Sync + 'static,
    {
        self.last_cursor = Some(Arc::new(provider));
        self
    }
}

/// Build the collection document for a local actor.
///
/// Without data the answer is a summary linking to the first (and last)
/// page, or listing no items when no first cursor is available. With data
/// it is a page; `next` is only attached when the page has items and is
/// addressed with the current cursor.
///
/// # Errors
/// `NotFound` when no dispatcher is registered for `kind`
pub fn get_collection(
    ctx: &Context,
    kind: CollectionKind,
    identifier: &str,
    cursor: Option<&str>,
) -> Result<Collection> {
    let dispatcher = ctx
        .federation()
        .collection(kind)
        .ok_or(FederationError::NotFound)?;

    let route = kind.route();
    let collection_uri = ctx.link(route, identifier, None)?;
    let context = Some(Value::String(ACTIVITY_STREAMS_CONTEXT.to_string()));

    let Some(slice) = (dispatcher.page)(ctx, identifier, cursor) else {
        let first = dispatcher
            .first_cursor
            .as_ref()
            .map(|provider| ctx.link(route, identifier, Some(provider(ctx, identifier).as_str())))
            .transpose()?;
        let last = dispatcher
            .last_cursor
            .as_ref()
            .map(|provider| ctx.link(route, identifier, Some(provider(ctx, identifier).as_str())))
            .transpose()?;
        let ordered_items = first.is_none().then(Vec::new);

        tracing::debug!(collection = %kind, identifier, "Serving collection summary");
        return Ok(Collection::OrderedCollection(CollectionSummary {
            context,
            id: collection_uri,
            total_items: None,
            first,
            last,
            ordered_items,
        }));
    };

    let next = if slice.items.is_empty() {
        None
    } else {
        Some(ctx.link(route, identifier, cursor)?)
    };

    tracing::debug!(
        collection = %kind,
        identifier,
        items = slice.items.len(),
        "Serving collection page"
    );

    Ok(Collection::OrderedCollectionPage(CollectionPage {
        context,
        id: ctx.link(route, identifier, cursor)?,
        part_of: collection_uri,
        total_items: slice.total_items,
        ordered_items: slice.items,
        next,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::Federation;
    use crate::federation::test_support::*;

    fn notes(count: usize) -> Vec<ObjectRef> {
        (0..count)
            .map(|i| ObjectRef::link(format!("https://local.example/notes/{}", i)))
            .collect()
    }

    #[test]
    fn unconfigured_kind_is_not_found() {
        let ctx = test_context(Federation::builder(test_config()));
        assert!(matches!(
            get_collection(&ctx, CollectionKind::Outbox, "alice", None),
            Err(FederationError::NotFound)
        ));
    }

    #[test]
    fn empty_page_has_no_next_link() {
        let ctx = test_context(Federation::builder(test_config()).collection(
            CollectionKind::Outbox,
            CollectionDispatcher::new(|_, _, _| {
                Some(CollectionSlice::new(Vec::new()).with_next_cursor("6"))
            }),
        ));

        let Collection::OrderedCollectionPage(page) =
            get_collection(&ctx, CollectionKind::Outbox, "alice", Some("5")).unwrap()
        else {
            panic!("expected a page");
        };
        assert!(page.ordered_items.is_empty());
        assert!(page.next.is_none());
        assert_eq!(page.id, "https://local.example/users/alice/outbox?cursor=5");
        assert_eq!(page.part_of, "https://local.example/users/alice/outbox");
    }

    #[test]
    fn page_with_items_links_next_with_current_cursor() {
        let ctx = test_context(Federation::builder(test_config()).collection(
            CollectionKind::Followers,
            CollectionDispatcher::new(|_, _, _| {
                Some(
                    CollectionSlice::new(notes(2))
                        .with_next_cursor("7")
                        .with_total_items(7),
                )
            }),
        ));

        let Collection::OrderedCollectionPage(page) =
            get_collection(&ctx, CollectionKind::Followers, "alice", Some("5")).unwrap()
        else {
            panic!("expected a page");
        };
        assert_eq!(page.ordered_items.len(), 2);
        assert_eq!(page.total_items, Some(7));
        assert_eq!(
            page.next.as_deref(),
            Some("https://local.example/users/alice/followers?cursor=5")
        );
    }

    #[test]
    fn page_without_cursor_links_next_to_bare_collection() {
        let ctx = test_context(Federation::builder(test_config()).collection(
            CollectionKind::Outbox,
            CollectionDispatcher::new(|_, _, _| Some(CollectionSlice::new(notes(1)))),
        ));

        let Collection::OrderedCollectionPage(page) =
            get_collection(&ctx, CollectionKind::Outbox, "alice", None).unwrap()
        else {
            panic!("expected a page");
        };
        assert_eq!(page.id, "https://local.example/users/alice/outbox");
        assert_eq!(
            page.next.as_deref(),
            Some("https://local.example/users/alice/outbox")
        );
    }

    #[test]
    fn no_data_without_first_cursor_lists_no_items() {
        let ctx = test_context(Federation::builder(test_config()).collection(
            CollectionKind::Outbox,
            CollectionDispatcher::new(|_, _, _| None),
        ));

        let Collection::OrderedCollection(summary) =
            get_collection(&ctx, CollectionKind::Outbox, "alice", None).unwrap()
        else {
            panic!("expected a summary");
        };
        assert_eq!(summary.id, "https://local.example/users/alice/outbox");
        assert_eq!(summary.ordered_items, Some(Vec::new()));
        assert!(summary.first.is_none());
    }

    #[test]
    fn no_data_with_cursor_providers_links_first_and_last() {
        let ctx = test_context(
            Federation::builder(test_config()).collection(
                CollectionKind::Following,
                CollectionDispatcher::new(|_, _, cursor| cursor.map(|_| CollectionSlice::default()))
                    .with_first_cursor(|_, _| "0".to_string())
                    .with_last_cursor(|_, _| "99".to_string()),
            ),
        );

        let Collection::OrderedCollection(summary) =
            get_collection(&ctx, CollectionKind::Following, "alice", None).unwrap()
        else {
            panic!("expected a summary");
        };
        assert_eq!(
            summary.first.as_deref(),
            Some("https://local.example/users/alice/following?cursor=0")
        );
        assert_eq!(
            summary.last.as_deref(),
            Some("https://local.example/users/alice/following?cursor=99")
        );
        assert!(summary.ordered_items.is_none());
    }

    #[test]
    fn paging_is_idempotent_for_a_pure_provider() {
        let ctx = test_context(Federation::builder(test_config()).collection(
            CollectionKind::Outbox,
            CollectionDispatcher::new(|_, _, cursor| {
                let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
                Some(CollectionSlice::new(notes(offset % 3)).with_next_cursor((offset + 1).to_string()))
            }),
        ));

        let first = get_collection(&ctx, CollectionKind::Outbox, "alice", Some("2")).unwrap();
        let second = get_collection(&ctx, CollectionKind::Outbox, "alice", Some("2")).unwrap();
        assert_eq!(first, second);
    }
}
