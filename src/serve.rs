//! HTTP surface over the live view pipeline.
//!
//! Built on `tiny_http`. The accept loop runs on the calling thread and
//! every request is spawned onto the tokio runtime.
//!
//! | Route                               | Handler                               |
//! |-------------------------------------|---------------------------------------|
//! | `GET /`                             | home page through view `Home/Index`   |
//! | `GET /{controller}/{action}`        | view `action` for `controller`        |
//! | `GET /{area}/{controller}/{action}` | same, with an area                    |
//! | `POST /Home/AddOrUpdateLiquid`      | `PageService::add_or_update`          |
//! | `POST /Home/AddOrUpdateWidget`      | `PageService::add_or_update_widget`   |
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │   Main Thread   │     │  Tokio Workers   │     │  Watcher Thread  │
//! │  (accept loop)  │────▶│ (route, render)  │     │ (Views/ monitor) │
//! └─────────────────┘     └────────┬─────────┘     └────────┬─────────┘
//!                                  ▼                        ▼
//!                                 App ◄──── bus.signal ─────┘
//! ```

use crate::{
    app::{App, ViewError},
    config::cfg,
    log,
    pages::{LiquidPageRequest, PageModel, WidgetRequest, WriteError},
    store::StoreError,
    template::{Value, to_model},
    view::RoutingContext,
    watch::watch_views_blocking,
};
use anyhow::{Context, Result, anyhow};
use std::{net::SocketAddr, sync::Arc};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tokio::runtime::Handle;

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Server Entry Point
// ============================================================================

/// Serve `app` until Ctrl+C.
///
/// Binds to the configured interface and port (with auto-retry on port
/// conflict), spawns the views watcher when enabled, then dispatches each
/// request onto `runtime`.
pub fn serve_views(app: Arc<App>, runtime: &Handle) -> Result<()> {
    let c = cfg();
    let interface: std::net::IpAddr = c.serve.interface.parse()?;
    let base_port = c.serve.port;

    let (server, addr) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);

    if c.serve.watch {
        let bus = Arc::clone(app.bus());
        let root = c.views.root.clone();
        let extension = c.views.extension.clone();
        std::thread::spawn(move || {
            if let Err(err) = watch_views_blocking(&root, &extension, &bus) {
                log!("watch"; "{err}");
            }
        });
    }

    for request in server.incoming_requests() {
        let app = Arc::clone(&app);
        runtime.spawn(async move {
            if let Err(e) = handle_request(request, &app).await {
                log!("serve"; "request error: {e}");
            }
        });
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(
    interface: std::net::IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Routing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Home,
    View {
        area: Option<String>,
        controller: String,
        action: String,
    },
    AddOrUpdateLiquid,
    AddOrUpdateWidget,
    NotFound,
}

/// Match a decoded, query-free URL path.
fn route(method: &Method, path: &str) -> Route {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        (Method::Get, []) => Route::Home,
        (Method::Post, [home, action]) if home.eq_ignore_ascii_case("Home") => {
            match action.to_ascii_lowercase().as_str() {
                "addorupdateliquid" => Route::AddOrUpdateLiquid,
                "addorupdatewidget" => Route::AddOrUpdateWidget,
                _ => Route::NotFound,
            }
        }
        (Method::Get, [controller, action]) => Route::View {
            area: None,
            controller: (*controller).to_owned(),
            action: (*action).to_owned(),
        },
        (Method::Get, [area, controller, action]) => Route::View {
            area: Some((*area).to_owned()),
            controller: (*controller).to_owned(),
            action: (*action).to_owned(),
        },
        _ => Route::NotFound,
    }
}

/// Response before it is bound to a connection.
#[derive(Debug)]
struct Reply {
    status: u16,
    content_type: &'static str,
    body: String,
}

impl Reply {
    fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    fn json_true() -> Self {
        Self {
            status: 200,
            content_type: "application/json; charset=utf-8",
            body: "true".into(),
        }
    }

    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }
}

// ============================================================================
// Request Handling
// ============================================================================

async fn handle_request(mut request: Request, app: &App) -> Result<()> {
    // Decode URL-encoded characters (e.g., %20 → space)
    let url_path = urlencoding::decode(request.url())
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    let path = url_path.split('?').next().unwrap_or(&url_path).to_owned();
    let route = route(request.method(), &path);

    let mut body = String::new();
    if matches!(route, Route::AddOrUpdateLiquid | Route::AddOrUpdateWidget) {
        request
            .as_reader()
            .read_to_string(&mut body)
            .context("Failed to read request body")?;
    }

    let reply = dispatch(route, &body, app).await;
    if reply.status >= 500 {
        log!("error"; "{} {}: {}", request.method(), path, reply.body);
    }
    respond(request, reply)
}

async fn dispatch(route: Route, body: &str, app: &App) -> Reply {
    let home_page = cfg().views.home_page.clone();
    match route {
        Route::Home => match app.page(&home_page).await {
            Some(page) => match to_model(&PageModel::from(&page)) {
                Ok(model) => view_reply(
                    app.render_view("Index", &RoutingContext::controller("Home"), model).await,
                ),
                Err(err) => view_reply(Err(err.into())),
            },
            None => Reply::text(404, format!("page `{home_page}` not found")),
        },
        Route::View {
            area,
            controller,
            action,
        } => {
            let mut routing = RoutingContext::controller(controller);
            routing.area = area;
            view_reply(app.render_view(&action, &routing, Value::Nil).await)
        }
        Route::AddOrUpdateLiquid => match serde_json::from_str::<LiquidPageRequest>(body) {
            Ok(request) => write_reply(app.pages().add_or_update(request).await.map(drop)),
            Err(err) => Reply::text(400, format!("invalid request body: {err}")),
        },
        Route::AddOrUpdateWidget => match serde_json::from_str::<WidgetRequest>(body) {
            Ok(request) => write_reply(app.pages().add_or_update_widget(request).await.map(drop)),
            Err(err) => Reply::text(400, format!("invalid request body: {err}")),
        },
        Route::NotFound => Reply::text(404, "404 Not Found"),
    }
}

fn view_reply(result: Result<String, ViewError>) -> Reply {
    match result {
        Ok(html) => Reply::html(html),
        Err(err @ ViewError::NotFound { .. }) => Reply::text(404, err.to_string()),
        Err(ViewError::Render(err)) => Reply::text(500, err.to_string()),
    }
}

fn write_reply(result: Result<(), WriteError>) -> Reply {
    match result {
        Ok(()) => Reply::json_true(),
        Err(err @ WriteError::Validation(_)) => Reply::text(400, err.to_string()),
        Err(WriteError::Store(err @ StoreError::Duplicate { .. })) => {
            Reply::text(409, err.to_string())
        }
        Err(err) => Reply::text(500, err.to_string()),
    }
}

// ============================================================================
// Response Helpers
// ============================================================================

fn respond(request: Request, reply: Reply) -> Result<()> {
    let header = Header::from_bytes("Content-Type", reply.content_type)
        .map_err(|()| anyhow!("invalid content type `{}`", reply.content_type))?;
    let response = Response::from_string(reply.body)
        .with_status_code(StatusCode(reply.status))
        .with_header(header);
    request.respond(response)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewsConfig;
    use crate::store::Stores;
    use crate::view::NullProvider;

    fn app() -> App {
        App::new(Stores::in_memory(), Arc::new(NullProvider), &ViewsConfig::default()).unwrap()
    }

    #[test]
    fn test_route_table() {
        assert_eq!(route(&Method::Get, "/"), Route::Home);
        assert_eq!(
            route(&Method::Get, "/Home/Render"),
            Route::View {
                area: None,
                controller: "Home".into(),
                action: "Render".into()
            }
        );
        assert_eq!(
            route(&Method::Get, "/Admin/Home/Index/"),
            Route::View {
                area: Some("Admin".into()),
                controller: "Home".into(),
                action: "Index".into()
            }
        );
        assert_eq!(route(&Method::Post, "/Home/AddOrUpdateLiquid"), Route::AddOrUpdateLiquid);
        assert_eq!(route(&Method::Post, "/home/addorupdatewidget"), Route::AddOrUpdateWidget);
        assert_eq!(route(&Method::Post, "/Home/Other"), Route::NotFound);
        assert_eq!(route(&Method::Get, "/a/b/c/d"), Route::NotFound);
    }

    #[tokio::test]
    async fn test_write_then_render() {
        let app = app();
        let reply = dispatch(
            Route::AddOrUpdateLiquid,
            r#"{"Name":"render","Content":"<p>{% render greet:x %}</p>","Path":"/Home/Render.liquid"}"#,
            &app,
        )
        .await;
        assert_eq!((reply.status, reply.body.as_str()), (200, "true"));

        let reply = dispatch(
            Route::AddOrUpdateWidget,
            r#"{"Name":"greet","Content":"Hello"}"#,
            &app,
        )
        .await;
        assert_eq!(reply.status, 200);

        let reply = dispatch(route(&Method::Get, "/Home/Render"), "", &app).await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, "<p>Hello</p>");
    }

    #[tokio::test]
    async fn test_write_errors_map_to_status() {
        let app = app();
        let reply = dispatch(Route::AddOrUpdateLiquid, r#"{"Name":"a"}"#, &app).await;
        assert_eq!(reply.status, 400);

        let reply = dispatch(Route::AddOrUpdateLiquid, "not json", &app).await;
        assert_eq!(reply.status, 400);

        let body = r#"{"Name":"a","Content":"x","Path":"/Same"}"#;
        assert_eq!(dispatch(Route::AddOrUpdateLiquid, body, &app).await.status, 200);
        let clash = r#"{"Name":"b","Content":"x","Path":"/same"}"#;
        assert_eq!(dispatch(Route::AddOrUpdateLiquid, clash, &app).await.status, 409);
    }

    #[tokio::test]
    async fn test_view_errors_map_to_status() {
        let app = app();
        let reply = dispatch(route(&Method::Get, "/Home/Missing"), "", &app).await;
        assert_eq!(reply.status, 404);
        assert!(reply.body.contains("/Home/Missing.liquid"));
        assert!(reply.body.contains("/Shared/Missing.liquid"));

        let body = r#"{"Name":"broken","Content":"{% render nope:x %}","Path":"/Home/Broken"}"#;
        dispatch(Route::AddOrUpdateLiquid, body, &app).await;
        let reply = dispatch(route(&Method::Get, "/Home/Broken"), "", &app).await;
        assert_eq!(reply.status, 500);
        assert!(reply.body.contains("nope"));
    }

    #[tokio::test]
    async fn test_home_page() {
        let app = app();
        assert_eq!(dispatch(Route::Home, "", &app).await.status, 404);

        let body = r#"{"Name":"about","Content":"ignored","Path":"/about"}"#;
        dispatch(Route::AddOrUpdateLiquid, body, &app).await;
        let body = r#"{"Name":"index","Content":"<h1>{{ Name }}</h1>","Path":"/Home/Index"}"#;
        dispatch(Route::AddOrUpdateLiquid, body, &app).await;

        let reply = dispatch(Route::Home, "", &app).await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, "<h1>about</h1>");
    }
}
