//! # Request Dispatch
//!
//! Top-level control flow for one request:
//!
//! ```text
//! receive → match route ─┬─ OPTIONS ──────────→ preflight ─┐
//!                        ├─ handler ─ Ok/Err ─→ envelope ──┼─→ CORS → emit
//!                        └─ no match ─────────→ 404 ───────┘
//! ```
//!
//! Every path ends in a [`GatewayResponse`]: handler errors are rendered
//! through [`AppError::to_response`] and never escape `handle`.

use http::Method;

use crate::config::Config;
use crate::envelope::{GatewayRequest, GatewayResponse};
use crate::errors::{AppError, AppResult};
use crate::handlers::template::AssetKey;
use crate::handlers::{handle_not_found, handle_version, items, sync_task, template};
use crate::log_data;
use crate::logging::Logger;
use crate::middleware::CorsMiddleware;
use crate::router::{match_route, HandlerKind, RouteMatch, ROUTES};
use crate::storage::AssetStore;
use crate::store::ResourceStore;
use crate::upstream::UpstreamClient;

/// Collaborators for one dispatch. Built per request by the entry point; the
/// item store outlives it.
pub struct Gateway<'a> {
    pub config: &'a Config,
    pub items: &'a ResourceStore,
    /// `None` when the template binding is missing.
    pub assets: Option<&'a dyn AssetStore>,
    pub upstream: &'a dyn UpstreamClient,
}

impl Gateway<'_> {
    pub async fn handle(&self, req: GatewayRequest, logger: &Logger) -> GatewayResponse {
        let response = match match_route(&ROUTES, &req.method, &req.path) {
            None => {
                logger.warn(
                    "No route matched",
                    log_data!("method" => req.method.as_str(), "path" => req.path),
                );
                handle_not_found()
            }
            Some(route) => match self.invoke(&route, &req, logger).await {
                Ok(response) => response,
                Err(e) => {
                    log_failure(&e, &req, logger);
                    e.to_response()
                }
            },
        };

        logger.info(
            "Request completed",
            log_data!(
                "method" => req.method.as_str(),
                "path" => req.path,
                "status" => response.status.as_u16()
            ),
        );
        CorsMiddleware::apply_headers(response)
    }

    async fn invoke(
        &self,
        route: &RouteMatch<'_>,
        req: &GatewayRequest,
        logger: &Logger,
    ) -> AppResult<GatewayResponse> {
        match route.handler() {
            // Preflight never reaches a handler or reads the body.
            HandlerKind::Cors => Ok(CorsMiddleware::handle_preflight()),
            HandlerKind::Version => Ok(handle_version(self.config)),
            HandlerKind::TemplateAsset => {
                let decoded = AssetKey::decode(
                    route.param("version"),
                    route.param("category"),
                    route.param("filename"),
                );
                match decoded {
                    Some(key) => template::handle_template(self.assets, &key, &req.path, logger).await,
                    None => {
                        logger.warn("Undecodable template path", log_data!("path" => req.path));
                        Ok(template::template_not_found(&req.path))
                    }
                }
            }
            HandlerKind::SyncTask => {
                sync_task::handle_sync_task(
                    req,
                    route.param("fileId"),
                    route.param("taskId"),
                    self.config,
                    self.upstream,
                    logger,
                )
                .await
            }
            HandlerKind::ResourceList if req.method == Method::POST => {
                items::create_item(req, self.items, logger)
            }
            HandlerKind::ResourceList => items::list_items(self.items),
            HandlerKind::ResourceItem => {
                let id = route.param("id");
                if req.method == Method::PUT {
                    items::update_item(req, self.items, id, logger)
                } else if req.method == Method::DELETE {
                    items::delete_item(self.items, id, logger)
                } else {
                    items::get_item(self.items, id)
                }
            }
        }
    }
}

fn log_failure(error: &AppError, req: &GatewayRequest, logger: &Logger) {
    let data = log_data!(
        "path" => req.path,
        "status" => error.status_code().as_u16(),
        "upstream" => error.is_upstream(),
        "error" => error.to_string()
    );
    if error.status_code().is_server_error() {
        logger.error("Request failed", data);
    } else {
        logger.warn("Request rejected", data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{UpstreamReply, UpstreamRequest};
    use async_trait::async_trait;
    use futures::executor::block_on;
    use http::StatusCode;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct MapStore(HashMap<String, Vec<u8>>);

    #[async_trait(?Send)]
    impl AssetStore for MapStore {
        async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
            Ok(self.0.get(key).cloned())
        }
    }

    struct FakeUpstream {
        reply: UpstreamReply,
        seen: RefCell<Vec<UpstreamRequest>>,
    }

    #[async_trait(?Send)]
    impl UpstreamClient for FakeUpstream {
        async fn post(&self, request: UpstreamRequest) -> AppResult<UpstreamReply> {
            self.seen.borrow_mut().push(request);
            Ok(self.reply.clone())
        }
    }

    struct Fixture {
        config: Config,
        items: ResourceStore,
        assets: MapStore,
        upstream: FakeUpstream,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: Config {
                    bundled_version: None,
                    upstream_token: Some("token-123".to_string()),
                    ..Config::default()
                },
                items: ResourceStore::new(),
                assets: MapStore(HashMap::from([(
                    "v1/forms/report.csv".to_string(),
                    b"id,name\n1,Widget\n".to_vec(),
                )])),
                upstream: FakeUpstream {
                    reply: UpstreamReply {
                        status: 200,
                        body: r#"{"data":{"logs":[]},"status":"finished"}"#.to_string(),
                    },
                    seen: RefCell::new(Vec::new()),
                },
            }
        }

        fn send(&self, method: Method, path: &str, body: Option<&str>) -> GatewayResponse {
            let gateway = Gateway {
                config: &self.config,
                items: &self.items,
                assets: Some(&self.assets),
                upstream: &self.upstream,
            };
            let mut req = GatewayRequest::new(method, path);
            if let Some(body) = body {
                req = req.with_body(body);
            }
            block_on(gateway.handle(req, &Logger::new("test".to_string())))
        }
    }

    fn body(response: &GatewayResponse) -> Value {
        response.json_body().expect("JSON body")
    }

    fn assert_cors(response: &GatewayResponse) {
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
    }

    #[test]
    fn unmatched_routes_get_plain_404() {
        let fx = Fixture::new();
        for (method, path) in [
            (Method::GET, "/"),
            (Method::GET, "/unknown"),
            (Method::POST, "/api/version"),
            (Method::PATCH, "/items/1"),
            (Method::GET, "/items/abc"),
            (Method::GET, "/v1/wo/file/F1/script/T1/sync_task"),
        ] {
            let response = fx.send(method, path, None);
            assert_eq!(response.status, StatusCode::NOT_FOUND, "{path}");
            assert_eq!(body(&response), json!({ "error": "resource not found" }));
            assert_eq!(response.header("Content-Type"), Some("application/json"));
            assert_cors(&response);
        }
    }

    #[test]
    fn options_short_circuits_to_preflight() {
        let fx = Fixture::new();
        for path in ["/items", "/v1/wo/file/F1/script/T1/sync_task", "/does/not/exist"] {
            let response = fx.send(Method::OPTIONS, path, None);
            assert_eq!(response.status, StatusCode::NO_CONTENT);
            assert!(response.body.is_empty());
            assert_cors(&response);
            assert_eq!(
                response.header("Access-Control-Allow-Methods"),
                Some("GET, POST, PUT, DELETE, OPTIONS")
            );
            assert_eq!(
                response.header("Access-Control-Allow-Headers"),
                Some("Content-Type, AirScript-Token")
            );
        }
        assert!(fx.upstream.seen.borrow().is_empty());
    }

    #[test]
    fn version_defaults_to_literal() {
        let fx = Fixture::new();
        let response = fx.send(Method::GET, "/api/version", None);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(body(&response), json!({ "version": "1.0.0" }));
        assert_cors(&response);
    }

    #[test]
    fn version_uses_override() {
        let mut fx = Fixture::new();
        fx.config.version_override = Some("2.4.1".to_string());
        let response = fx.send(Method::GET, "/api/version", None);
        assert_eq!(body(&response), json!({ "version": "2.4.1" }));
    }

    #[test]
    fn create_item_validates_and_defaults() {
        let fx = Fixture::new();

        let rejected = fx.send(Method::POST, "/items", Some(r#"{"name":"Widget"}"#));
        assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
        assert!(body(&rejected)["error"].is_string());
        assert_cors(&rejected);

        let created = fx.send(Method::POST, "/items", Some(r#"{"name":"Widget","price":9.99}"#));
        assert_eq!(created.status, StatusCode::CREATED);
        let item = body(&created);
        assert!(!item["id"].as_str().unwrap().is_empty());
        assert_eq!(item["name"], "Widget");
        assert_eq!(item["description"], "");
        assert_eq!(item["price"], 9.99);
        assert_eq!(item["tax"], Value::Null);
    }

    #[test]
    fn integer_price_is_echoed_unchanged() {
        let fx = Fixture::new();
        let created = fx.send(Method::POST, "/items", Some(r#"{"name":"Widget","price":1,"tax":0}"#));
        assert_eq!(created.status, StatusCode::CREATED);
        let item = body(&created);
        assert!(item["price"].is_u64());
        assert_eq!(item["price"], 1);
        assert_eq!(item["tax"], 0);
        let text = String::from_utf8(created.body).unwrap();
        assert!(text.contains(r#""price":1,"#));
    }

    #[test]
    fn malformed_item_body_is_bad_request() {
        let fx = Fixture::new();
        let response = fx.send(Method::POST, "/items", Some("{name: Widget"));
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(body(&response)["error"], "bad request");
    }

    #[test]
    fn update_merges_only_supplied_fields() {
        let fx = Fixture::new();
        let created = body(&fx.send(
            Method::POST,
            "/items",
            Some(r#"{"name":"Widget","price":9.99,"description":"blue","tax":0.5}"#),
        ));
        let path = format!("/items/{}", created["id"].as_str().unwrap());

        let updated = fx.send(Method::PUT, &path, Some(r#"{"price":12.5}"#));
        assert_eq!(updated.status, StatusCode::OK);
        let item = body(&updated);
        assert_eq!(item["price"], 12.5);
        assert_eq!(item["name"], "Widget");
        assert_eq!(item["description"], "blue");
        assert_eq!(item["tax"], 0.5);

        let fetched = body(&fx.send(Method::GET, &path, None));
        assert_eq!(fetched, item);

        let cleared = body(&fx.send(Method::PUT, &path, Some(r#"{"tax":null}"#)));
        assert_eq!(cleared["tax"], Value::Null);
        assert_eq!(cleared["price"], 12.5);
    }

    #[test]
    fn update_unknown_item_is_not_found() {
        let fx = Fixture::new();
        let response = fx.send(Method::PUT, "/items/999", Some(r#"{"price":12.5}"#));
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_cors(&response);
    }

    #[test]
    fn delete_removes_item_with_empty_204() {
        let fx = Fixture::new();
        let created = body(&fx.send(Method::POST, "/items", Some(r#"{"name":"Widget","price":1}"#)));
        let path = format!("/items/{}", created["id"].as_str().unwrap());

        let deleted = fx.send(Method::DELETE, &path, None);
        assert_eq!(deleted.status, StatusCode::NO_CONTENT);
        assert!(deleted.body.is_empty());
        assert_cors(&deleted);

        assert_eq!(fx.send(Method::GET, &path, None).status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn delete_unknown_item_leaves_store_untouched() {
        let fx = Fixture::new();
        fx.send(Method::POST, "/items", Some(r#"{"name":"Widget","price":1}"#));

        let response = fx.send(Method::DELETE, "/items/1", None);
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let listed = body(&fx.send(Method::GET, "/items", None));
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[test]
    fn template_round_trips_stored_bytes() {
        let fx = Fixture::new();
        let response = fx.send(Method::GET, "/template/v1/forms/report.csv", None);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header("Content-Type"), Some("text/csv"));
        assert_eq!(response.body, b"id,name\n1,Widget\n".to_vec());
        assert_cors(&response);
    }

    #[test]
    fn template_with_encoded_name_is_served() {
        let mut fx = Fixture::new();
        let bytes = "月份,金额\n1,100\n".as_bytes().to_vec();
        fx.assets.0.insert("v1/forms/报表 2024.csv".to_string(), bytes.clone());

        let response = fx.send(
            Method::GET,
            "/template/v1/forms/%E6%8A%A5%E8%A1%A8%202024.csv",
            None,
        );
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header("Content-Type"), Some("text/csv"));
        assert_eq!(response.body, bytes);
    }

    #[test]
    fn undecodable_template_path_is_not_found() {
        let fx = Fixture::new();
        let response = fx.send(Method::GET, "/template/v1/forms/%FF.csv", None);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(body(&response)["requestedPath"], "/template/v1/forms/%FF.csv");
        assert_cors(&response);
    }

    #[test]
    fn missing_template_echoes_requested_path() {
        let fx = Fixture::new();
        let response = fx.send(Method::GET, "/template/v9/forms/report.csv", None);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(
            body(&response),
            json!({ "error": "template not found", "requestedPath": "/template/v9/forms/report.csv" })
        );
        assert_cors(&response);
    }

    #[test]
    fn sync_task_relays_upstream_json() {
        let fx = Fixture::new();
        let response = fx.send(
            Method::POST,
            "/v1/wo/file/F1/script/T1/sync_task",
            Some(r#"{"Context":{"argv":{"name":"x"}}}"#),
        );
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(body(&response), json!({ "data": { "logs": [] }, "status": "finished" }));

        let seen = fx.upstream.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].url.ends_with("/file/F1/script/T1/sync_task"));
        assert!(seen[0]
            .headers
            .contains(&("AirScript-Token", "token-123".to_string())));
        assert_eq!(seen[0].body, r#"{"Context":{"argv":{"name":"x"}}}"#);
    }

    #[test]
    fn upstream_error_becomes_500_with_status_and_text() {
        let mut fx = Fixture::new();
        fx.upstream.reply = UpstreamReply {
            status: 403,
            body: "invalid token".to_string(),
        };
        let response = fx.send(Method::POST, "/v1/wo/file/F1/script/T1/sync_task", Some("{}"));
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let details = body(&response)["details"].as_str().unwrap().to_string();
        assert!(details.contains("403"));
        assert!(details.contains("invalid token"));
        assert_cors(&response);
    }

    #[test]
    fn sync_task_with_invalid_json_fails_before_upstream() {
        let fx = Fixture::new();
        let response = fx.send(Method::POST, "/v1/wo/file/F1/script/T1/sync_task", Some("not json"));
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(fx.upstream.seen.borrow().is_empty());
    }

    #[test]
    fn sync_task_without_token_is_internal_error() {
        let mut fx = Fixture::new();
        fx.config.upstream_token = None;
        let response = fx.send(Method::POST, "/v1/wo/file/F1/script/T1/sync_task", Some("{}"));
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&response)["error"], "internal server error");
        assert!(fx.upstream.seen.borrow().is_empty());
    }
}
