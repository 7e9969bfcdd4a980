//! Tessera - live, store-backed liquid views.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tessera::{
    App, ViewError,
    cli::{Cli, Commands},
    config::{AppConfig, cfg, init_config},
    log,
    serve::serve_views,
    template::{Value, to_model},
    view::RoutingContext,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_config(AppConfig::load(&cli)?);
    let c = cfg();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(c.serve.workers)
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    let app = Arc::new(App::from_config(&c)?);

    match cli.command {
        Commands::Serve { .. } => serve_views(app, runtime.handle()),
        Commands::Render {
            view,
            controller,
            area,
            model,
        } => {
            let model = parse_model(model.as_deref())?;
            let mut routing = RoutingContext::controller(controller);
            routing.area = area;
            runtime.block_on(render_one(&app, &view, &routing, model))
        }
        Commands::Check => check_all(&app),
    }
}

/// `--model` JSON, or nil when absent.
fn parse_model(model: Option<&str>) -> Result<Value> {
    let Some(json) = model else {
        return Ok(Value::Nil);
    };
    let value: serde_json::Value = serde_json::from_str(json).context("--model is not valid JSON")?;
    if !value.is_object() {
        bail!("--model must be a JSON object");
    }
    Ok(to_model(&value)?)
}

async fn render_one(app: &App, view: &str, routing: &RoutingContext, model: Value) -> Result<()> {
    match app.render_view(view, routing, model).await {
        Ok(html) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(html.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
        Err(err @ ViewError::NotFound { .. }) => bail!(err),
        Err(err) => Err(err).with_context(|| format!("Failed to render `{view}`")),
    }
}

fn check_all(app: &App) -> Result<()> {
    let (checked, failures) = app.check();
    for failure in &failures {
        log!("error"; "{}", failure.subject);
        for diagnostic in &failure.diagnostics {
            eprintln!("  {diagnostic}");
        }
    }
    if !failures.is_empty() {
        bail!("{} of {} template(s) failed to parse", failures.len(), checked);
    }
    log!("render"; "{} template(s) parsed", checked);
    Ok(())
}
