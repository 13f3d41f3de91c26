//! Bus request handling and channel event fan-out.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use readmark_protocols::{
    normalize_url, BookmarkRecord, BusEnvelope, BusRequest, BusResponse, ChannelEvent,
    PanelNotice, TabInfo,
};

use crate::context::ExtensionContext;
use crate::highlight;

/// Serves bus requests against the context.
///
/// Each envelope is handled on its own task: requests with long retry
/// budgets must not block quick ones, and no completion order is promised
/// across independent requests.
pub struct EventRouter {
    ctx: Arc<ExtensionContext>,
}

impl EventRouter {
    pub fn new(ctx: Arc<ExtensionContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(self, mut bus_rx: mpsc::Receiver<BusEnvelope>) {
        while let Some(envelope) = bus_rx.recv().await {
            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                let response = handle(&ctx, envelope.request).await;
                // The caller may have given up waiting; that is their call.
                let _ = envelope.respond_to.send(response);
            });
        }
        debug!("Bus closed, router stopping");
    }
}

async fn handle(ctx: &ExtensionContext, request: BusRequest) -> BusResponse {
    match request {
        BusRequest::FetchDocument { bookmark_id } => {
            match ctx.api.fetch_document_plus(bookmark_id).await {
                Ok(document) => BusResponse::Document {
                    document: Some(document),
                },
                Err(e) => {
                    warn!("Document fetch for bookmark {bookmark_id} failed: {e}");
                    BusResponse::Document { document: None }
                }
            }
        }
        BusRequest::RegenerateDocument { document } => regenerate_document(ctx, &document).await,
        BusRequest::FetchQanda { document_id } => match ctx.api.fetch_qanda(&document_id).await {
            Ok(qanda) => BusResponse::Qanda { qanda: Some(qanda) },
            Err(e) => {
                warn!("Q&A fetch for document {document_id} failed: {e}");
                BusResponse::Qanda { qanda: None }
            }
        },
        BusRequest::FetchChat { document_id } => match ctx.api.fetch_chat(&document_id).await {
            Ok(chat) => BusResponse::Chat {
                chat: Some(chat),
                error: None,
            },
            Err(e) => BusResponse::Chat {
                chat: None,
                error: Some(e.to_string()),
            },
        },
        BusRequest::AskQuestion { payload } => match ctx.api.ask_question(&payload).await {
            Ok(answer) => BusResponse::Answer {
                answer: Some(answer),
            },
            Err(e) => {
                warn!("Ask question failed: {e}");
                BusResponse::Answer { answer: None }
            }
        },
        BusRequest::DeleteQanda { message_id } => {
            match ctx.api.delete_chat_message(&message_id).await {
                Ok(deleted) => BusResponse::Deleted { deleted },
                Err(e) => BusResponse::Failed {
                    error: e.to_string(),
                },
            }
        }
        BusRequest::DeleteBookmark { bookmark_id } => {
            match ctx.api.delete_bookmark(bookmark_id).await {
                Ok(deleted) => BusResponse::Deleted { deleted },
                Err(e) => BusResponse::Failed {
                    error: e.to_string(),
                },
            }
        }
        BusRequest::BookmarkPage { tab } => bookmark_page(ctx, tab).await,
        BusRequest::HighlightCitation { verbatim } => {
            highlight::handle_highlight(ctx, &verbatim).await
        }
        BusRequest::CheckForBookmarks { url } => check_for_bookmarks(ctx, &url).await,
        BusRequest::UpdateBadge { tab } => update_badge(ctx, tab).await,
        BusRequest::ServerIs => server_is(ctx).await,
    }
}

/// Ask the backend to regenerate a failed document, then chain into the
/// long-budget fetch of the fresh result.
async fn regenerate_document(ctx: &ExtensionContext, document: &serde_json::Value) -> BusResponse {
    let bookmark_id = match ctx.api.regenerate_document(document).await {
        Ok(Some(id)) => id,
        Ok(None) => return BusResponse::Document { document: None },
        Err(e) => {
            warn!("Document regeneration failed: {e}");
            return BusResponse::Document { document: None };
        }
    };
    match ctx.api.fetch_document_plus(bookmark_id).await {
        Ok(document) => BusResponse::Document {
            document: Some(document),
        },
        Err(e) => {
            warn!("Document fetch after regeneration failed: {e}");
            BusResponse::Document { document: None }
        }
    }
}

async fn bookmark_page(ctx: &ExtensionContext, tab: TabInfo) -> BusResponse {
    let Some(user) = ctx.session.user() else {
        return BusResponse::NotAuthenticated;
    };

    // A bookmark triggers server-side document generation whose progress
    // arrives over the channel, so revive it before posting.
    if !ctx.connection.is_open() {
        if let Err(e) = ctx.connection.connect(&user.uid).await {
            warn!("Channel kick before bookmarking failed: {e}");
        }
    }

    let html = match ctx.surfaces.scripting.capture_html(tab.id).await {
        Ok(html) => html,
        Err(e) => {
            // Capture failure is tolerated; the bookmark goes up without it.
            warn!("HTML capture for tab {} failed: {e}", tab.id);
            None
        }
    };

    match ctx.api.create_bookmark(&tab.url, html, &user.uid).await {
        Ok(outcome) => BusResponse::BookmarkCreated {
            status: outcome.status,
            content: outcome.content,
        },
        Err(e) => BusResponse::BookmarkCreated {
            status: 500,
            content: json!({ "error": e.to_string() }),
        },
    }
}

async fn check_for_bookmarks(ctx: &ExtensionContext, url: &str) -> BusResponse {
    let Some(user) = ctx.session.user() else {
        return BusResponse::NotAuthenticated;
    };
    let canonical = normalize_url(url);

    match ctx.cache.lookup(&canonical).await {
        Ok(Some(bookmark)) => {
            return BusResponse::Bookmark {
                bookmark: Some(bookmark),
            }
        }
        Ok(None) => {}
        Err(e) => {
            return BusResponse::Failed {
                error: e.to_string(),
            }
        }
    }

    // Cache miss. Ask the server only while a surface is looking; the reply
    // is relayed without populating the cache, which only rebuilds wholesale.
    if !ctx.surfaces.panel.is_active() {
        return BusResponse::Bookmark { bookmark: None };
    }
    match ctx.api.find_bookmark_by_url(&user.uid, &canonical).await {
        Ok(bookmark) => BusResponse::Bookmark { bookmark },
        Err(e) => BusResponse::Failed {
            error: e.to_string(),
        },
    }
}

async fn update_badge(ctx: &ExtensionContext, tab: TabInfo) -> BusResponse {
    ctx.session.set_active_tab(tab.id);

    let found = if ctx.session.is_authenticated() {
        let canonical = normalize_url(&tab.url);
        matches!(ctx.cache.lookup(&canonical).await, Ok(Some(_)))
    } else {
        false
    };

    let result = if found {
        ctx.surfaces.badge.badge_on(tab.id).await
    } else {
        ctx.surfaces.badge.badge_off(tab.id).await
    };
    if let Err(e) = result {
        warn!("Badge update for tab {} failed: {e}", tab.id);
    }
    BusResponse::BadgeUpdated
}

async fn server_is(ctx: &ExtensionContext) -> BusResponse {
    match ctx.api.ping().await {
        Ok(_) => {
            if let Some(user) = ctx.session.user() {
                if let Err(e) = ctx.connection.connect(&user.uid).await {
                    warn!("Channel kick after ping failed: {e}");
                }
            }
            BusResponse::ServerStatus { up: true }
        }
        Err(e) => {
            debug!("Server probe failed: {e}");
            BusResponse::ServerStatus { up: false }
        }
    }
}

/// Fan channel events out to the panel and the cache.
///
/// Events are handled in receipt order. A lagged receiver skips what it
/// missed rather than stopping.
pub async fn run_channel_events(
    ctx: Arc<ExtensionContext>,
    mut events: broadcast::Receiver<ChannelEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Channel event listener lagged, {n} event(s) skipped");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            ChannelEvent::Document { data, .. } => {
                notify(ctx.as_ref(), PanelNotice::NewDoc { data }).await;
            }
            ChannelEvent::ChatReady { data } => {
                notify(ctx.as_ref(), PanelNotice::ChatReady { data }).await;
            }
            ChannelEvent::ChatNotReady { data } => {
                notify(ctx.as_ref(), PanelNotice::ChatNotReady { data }).await;
            }
            ChannelEvent::ProgressPercentage { data } => {
                notify(ctx.as_ref(), PanelNotice::ProgressPercentage { data }).await;
            }
            ChannelEvent::Error { data } => {
                notify(ctx.as_ref(), PanelNotice::ErrorBookmarking { data }).await;
            }
            ChannelEvent::SuggestedQuestions { data } => {
                notify(ctx.as_ref(), PanelNotice::SuggestedQuestions { data }).await;
            }
            // Generation progress and failure both carry bookmark records
            // that keep the cache current between rebuilds.
            ChannelEvent::DocumentInProgress { data }
            | ChannelEvent::DocumentError { data } => {
                let records = BookmarkRecord::from_payload(&data);
                if records.is_empty() {
                    warn!("Bookmark push event carried no parseable records");
                } else if let Err(e) = ctx.cache.upsert_many(records).await {
                    warn!("Cache upsert from push event failed: {e}");
                }
            }
        }
    }
    debug!("Channel event stream closed");
}

async fn notify(ctx: &ExtensionContext, notice: PanelNotice) {
    if let Err(e) = ctx.surfaces.panel.notify(notice).await {
        debug!("Panel notice dropped: {e}");
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
