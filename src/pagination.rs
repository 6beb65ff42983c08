//! pagination helpers
//!
//! generic cursor paginator shared by instance listing and graphql connections.

use crate::error::Result;
use crate::graphql::GraphQlConnection;
use std::future::Future;
use std::marker::PhantomData;

/// a single page of cursor-paged results
#[derive(Debug, Clone)]
pub struct Page<T, C = String> {
    pub items: Vec<T>,
    /// `None` on the last page
    pub next_cursor: Option<C>,
}

impl<T> From<GraphQlConnection<T>> for Page<T, String> {
    fn from(connection: GraphQlConnection<T>) -> Self {
        let next_cursor = connection
            .page_info
            .filter(|info| info.has_next_page)
            .and_then(|info| info.end_cursor);
        Self {
            items: connection.items,
            next_cursor,
        }
    }
}

/// walks a cursor-paged endpoint one request at a time
///
/// `fetch` sends a request for a cursor (`None` for the first page) and
/// `extract` turns the raw response into a [`Page`]. the walk ends on the
/// first page without a next cursor.
pub struct Paginator<T, C, R, Fetch, Fut, Extract>
where
    C: Clone,
    Fetch: FnMut(Option<C>) -> Fut,
    Fut: Future<Output = Result<R>>,
    Extract: FnMut(R) -> Result<Page<T, C>>,
{
    fetch: Fetch,
    extract: Extract,
    /// `None` once the last page has been returned
    position: Option<Option<C>>,
    _marker: PhantomData<fn() -> (T, R)>,
}

impl<T, C, R, Fetch, Fut, Extract> Paginator<T, C, R, Fetch, Fut, Extract>
where
    C: Clone,
    Fetch: FnMut(Option<C>) -> Fut,
    Fut: Future<Output = Result<R>>,
    Extract: FnMut(R) -> Result<Page<T, C>>,
{
    pub fn new(fetch: Fetch, extract: Extract) -> Self {
        Self {
            fetch,
            extract,
            position: Some(None),
            _marker: PhantomData,
        }
    }

    /// items of the next page, or `None` after the last one
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        let Some(cursor) = self.position.take() else {
            return Ok(None);
        };
        let raw = (self.fetch)(cursor).await?;
        let Page { items, next_cursor } = (self.extract)(raw)?;
        self.position = next_cursor.map(Some);
        Ok(Some(items))
    }

    pub async fn collect_all(self) -> Result<Vec<T>> {
        self.collect_up_to(None).await
    }

    /// stop requesting once `limit` items are in hand; extra items are dropped
    pub async fn collect_up_to(mut self, limit: Option<usize>) -> Result<Vec<T>> {
        let mut collected = Vec::new();
        while let Some(items) = self.next_page().await? {
            collected.extend(items);
            if limit.is_some_and(|limit| collected.len() >= limit) {
                break;
            }
        }
        if let Some(limit) = limit {
            collected.truncate(limit);
        }
        Ok(collected)
    }
}
