use super::*;

use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use readmark_protocols::SessionUser;

use crate::test_support::{core, core_with_scripting, CannedScripting, HangingScripting};

fn record_json(id: i64, url: &str) -> serde_json::Value {
    json!({
        "id": id,
        "url": url,
        "updated_at": "2024-03-01T10:00:00Z",
        "user_id": "u-1",
    })
}

fn seed_record(id: i64, url: &str) -> BookmarkRecord {
    BookmarkRecord {
        id,
        url: url.to_string(),
        title: None,
        updated_at: Utc.timestamp_opt(100, 0).unwrap(),
        user_id: "u-1".to_string(),
        filename: None,
        document_id: None,
    }
}

#[tokio::test]
async fn fetch_document_returns_body_or_none() {
    let t = core(true).await;
    Mock::given(method("GET"))
        .and(path("/document_plus/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"summary": "done"})))
        .mount(&t.server)
        .await;

    let bus = crate::start(t.ctx.clone());
    let response = bus
        .call(BusRequest::FetchDocument { bookmark_id: 7 })
        .await
        .unwrap();
    assert_eq!(
        response,
        BusResponse::Document {
            document: Some(json!({"summary": "done"}))
        }
    );

    // Unmocked id: the fetch fails and resolves to an empty result.
    let response = bus
        .call(BusRequest::FetchDocument { bookmark_id: 8 })
        .await
        .unwrap();
    assert_eq!(response, BusResponse::Document { document: None });
}

#[tokio::test]
async fn regenerate_chains_into_document_fetch() {
    let t = core(true).await;
    Mock::given(method("POST"))
        .and(path("/document/regenerate"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"id": 11})))
        .mount(&t.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/document_plus/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"summary": "second try"})))
        .mount(&t.server)
        .await;

    let bus = crate::start(t.ctx.clone());
    let response = bus
        .call(BusRequest::RegenerateDocument {
            document: json!({"id": "doc-1", "status": "failed"}),
        })
        .await
        .unwrap();
    assert_eq!(
        response,
        BusResponse::Document {
            document: Some(json!({"summary": "second try"}))
        }
    );
}

#[tokio::test]
async fn rejected_regeneration_resolves_empty() {
    let t = core(true).await;
    Mock::given(method("POST"))
        .and(path("/document/regenerate"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&t.server)
        .await;

    let bus = crate::start(t.ctx.clone());
    let response = bus
        .call(BusRequest::RegenerateDocument {
            document: json!({"id": "doc-1"}),
        })
        .await
        .unwrap();
    assert_eq!(response, BusResponse::Document { document: None });
}

#[tokio::test]
async fn bookmark_page_without_session_short_circuits() {
    let t = core(true).await;
    let bus = crate::start(t.ctx.clone());
    let response = bus
        .call(BusRequest::BookmarkPage {
            tab: TabInfo {
                id: 7,
                url: "https://a.com/x".to_string(),
            },
        })
        .await
        .unwrap();
    assert_eq!(response, BusResponse::NotAuthenticated);
}

#[tokio::test]
async fn bookmark_page_posts_captured_html() {
    let scripting = Arc::new(CannedScripting {
        html: Some("<html>page</html>".to_string()),
    });
    let t = core_with_scripting(true, scripting).await;
    Mock::given(method("POST"))
        .and(path("/bookmark"))
        .and(body_json(json!({
            "url": "https://a.com/x",
            "html": "<html>page</html>",
            "user_id": "u-1",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
        .mount(&t.server)
        .await;

    let bus = crate::start(t.ctx.clone());
    t.ctx.session.login(SessionUser::new("u-1"));

    let response = bus
        .call(BusRequest::BookmarkPage {
            tab: TabInfo {
                id: 7,
                url: "https://a.com/x".to_string(),
            },
        })
        .await
        .unwrap();
    assert_eq!(
        response,
        BusResponse::BookmarkCreated {
            status: 201,
            content: json!({"id": 9})
        }
    );
}

#[tokio::test]
async fn bookmark_page_tolerates_missing_html() {
    let t = core(true).await;
    Mock::given(method("POST"))
        .and(path("/bookmark"))
        .and(body_json(json!({
            "url": "https://a.com/x",
            "html": null,
            "user_id": "u-1",
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"id": 10})))
        .mount(&t.server)
        .await;

    let bus = crate::start(t.ctx.clone());
    t.ctx.session.login(SessionUser::new("u-1"));

    let response = bus
        .call(BusRequest::BookmarkPage {
            tab: TabInfo {
                id: 7,
                url: "https://a.com/x".to_string(),
            },
        })
        .await
        .unwrap();
    assert!(matches!(
        response,
        BusResponse::BookmarkCreated { status: 202, .. }
    ));
}

#[tokio::test]
async fn check_for_bookmarks_requires_session() {
    let t = core(true).await;
    let bus = crate::start(t.ctx.clone());
    let response = bus
        .call(BusRequest::CheckForBookmarks {
            url: "https://a.com/x".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(response, BusResponse::NotAuthenticated);
}

#[tokio::test]
async fn check_for_bookmarks_hits_cache_first() {
    let t = core(true).await;
    let bus = crate::start(t.ctx.clone());
    t.ctx.session.login(SessionUser::new("u-1"));
    t.ctx
        .cache
        .upsert_many(vec![seed_record(1, "https://a.com/x")])
        .await
        .unwrap();

    // Decorated URL reduces to the cached canonical form; no server mock is
    // mounted, so a fall-through would not find anything.
    let response = bus
        .call(BusRequest::CheckForBookmarks {
            url: "https://a.com/x?utm_source=feed#top".to_string(),
        })
        .await
        .unwrap();
    match response {
        BusResponse::Bookmark { bookmark: Some(b) } => assert_eq!(b.id, 1),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn cache_miss_with_inactive_panel_skips_server() {
    let t = core(false).await;
    Mock::given(method("POST"))
        .and(path("/bookmark/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json(3, "https://a.com/x")))
        .expect(0)
        .mount(&t.server)
        .await;

    let bus = crate::start(t.ctx.clone());
    t.ctx.session.login(SessionUser::new("u-1"));

    let response = bus
        .call(BusRequest::CheckForBookmarks {
            url: "https://a.com/x".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(response, BusResponse::Bookmark { bookmark: None });
}

#[tokio::test]
async fn cache_miss_with_active_panel_asks_server_without_caching() {
    let t = core(true).await;
    Mock::given(method("POST"))
        .and(path("/bookmark/user"))
        .and(body_json(json!({
            "url": "https://a.com/x",
            "html": "",
            "user_id": "u-1",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json(3, "https://a.com/x")))
        .mount(&t.server)
        .await;

    let bus = crate::start(t.ctx.clone());
    t.ctx.session.login(SessionUser::new("u-1"));

    let response = bus
        .call(BusRequest::CheckForBookmarks {
            url: "https://a.com/x".to_string(),
        })
        .await
        .unwrap();
    match response {
        BusResponse::Bookmark { bookmark: Some(b) } => assert_eq!(b.id, 3),
        other => panic!("unexpected response: {other:?}"),
    }
    // The server hit is relayed, never written back.
    assert_eq!(t.ctx.cache.len().await.unwrap(), 0);
}

#[tokio::test]
async fn update_badge_toggles_and_records_tab() {
    let t = core(true).await;
    let bus = crate::start(t.ctx.clone());
    t.ctx.session.login(SessionUser::new("u-1"));
    t.ctx
        .cache
        .upsert_many(vec![seed_record(1, "https://a.com/x")])
        .await
        .unwrap();

    let response = bus
        .call(BusRequest::UpdateBadge {
            tab: TabInfo {
                id: 7,
                url: "https://a.com/x".to_string(),
            },
        })
        .await
        .unwrap();
    assert_eq!(response, BusResponse::BadgeUpdated);
    assert_eq!(t.ctx.session.active_tab(), Some(7));

    bus.call(BusRequest::UpdateBadge {
        tab: TabInfo {
            id: 8,
            url: "https://other.com/".to_string(),
        },
    })
    .await
    .unwrap();

    let states = t.badge.states.lock().clone();
    assert_eq!(states, vec![(7, true), (8, false)]);
    assert_eq!(t.ctx.session.active_tab(), Some(8));
}

#[tokio::test]
async fn highlight_citation_round_trip() {
    let t = core(true).await;
    t.pages.load_page(
        7,
        vec![
            "The quick brown fox ".to_string(),
            "jumps over the lazy dog".to_string(),
        ],
    );
    let bus = crate::start(t.ctx.clone());

    // No active tab recorded yet; the host fallback resolves tab 7.
    let response = bus
        .call(BusRequest::HighlightCitation {
            verbatim: "The quick brown fox jumps over the lazy dog".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(
        response,
        BusResponse::Highlight {
            success: true,
            error: None
        }
    );
    assert_eq!(t.ctx.session.active_tab(), Some(7));
    assert_eq!(t.pages.highlight_count(7), 2);

    // Empty citation: negative result, page untouched.
    let response = bus
        .call(BusRequest::HighlightCitation {
            verbatim: "   ".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(
        response,
        BusResponse::Highlight {
            success: false,
            error: None
        }
    );
    assert_eq!(t.pages.highlight_count(7), 2);
}

#[tokio::test]
async fn highlight_citation_times_out_to_failure() {
    let t = core_with_scripting(true, Arc::new(HangingScripting)).await;
    let bus = crate::start(t.ctx.clone());
    t.ctx.session.set_active_tab(7);

    let started = std::time::Instant::now();
    let response = bus
        .call(BusRequest::HighlightCitation {
            verbatim: "some quoted text here".to_string(),
        })
        .await
        .unwrap();
    assert!(matches!(
        response,
        BusResponse::Highlight {
            success: false,
            error: Some(_)
        }
    ));
    // Resolved by the timeout race, well before the hanging call finishes.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn server_health_is_probed_and_reported() {
    let t = core(true).await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&t.server)
        .await;

    let bus = crate::start(t.ctx.clone());
    let response = bus.call(BusRequest::ServerIs).await.unwrap();
    assert_eq!(response, BusResponse::ServerStatus { up: true });
}

#[tokio::test]
async fn server_is_reports_down_when_unreachable() {
    let t = core(true).await;
    let bus = crate::start(t.ctx.clone());
    let response = bus.call(BusRequest::ServerIs).await.unwrap();
    assert_eq!(response, BusResponse::ServerStatus { up: false });
}

#[tokio::test]
async fn channel_events_fan_out_to_panel_and_cache() {
    let t = core(true).await;
    let (tx, rx) = broadcast::channel(8);
    tokio::spawn(run_channel_events(t.ctx.clone(), rx));

    tx.send(ChannelEvent::Document {
        document_id: Some("d-1".to_string()),
        data: json!({"summary": "fresh"}),
    })
    .unwrap();
    tx.send(ChannelEvent::DocumentInProgress {
        data: record_json(5, "https://b.com/y"),
    })
    .unwrap();
    tx.send(ChannelEvent::ProgressPercentage {
        data: json!({"value": 60}),
    })
    .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let notices = t.panel.notices.lock().clone();
    assert_eq!(notices.len(), 2);
    assert_eq!(
        notices[0],
        PanelNotice::NewDoc {
            data: json!({"summary": "fresh"})
        }
    );
    assert_eq!(
        notices[1],
        PanelNotice::ProgressPercentage {
            data: json!({"value": 60})
        }
    );

    // The in-progress record landed in the cache instead of the panel.
    let cached = t.ctx.cache.lookup("https://b.com/y").await.unwrap();
    assert_eq!(cached.unwrap().id, 5);
}
