//! HTML templates for the page routes.
//!
//! Templates are compiled into the binary and rendered with HTML auto-escaping
//! (every template name ends in `.html`).

use std::sync::Arc;

use axum::{http::StatusCode, response::Html};
use minijinja::Environment;
use serde::Serialize;

use crate::errors::Error;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("account.html", include_str!("../templates/account.html")),
    ("community_new.html", include_str!("../templates/community_new.html")),
    ("support.html", include_str!("../templates/support.html")),
    ("ticket.html", include_str!("../templates/ticket.html")),
    ("admin.html", include_str!("../templates/admin.html")),
    ("projects.html", include_str!("../templates/projects.html")),
    ("project.html", include_str!("../templates/project.html")),
    ("cms.html", include_str!("../templates/cms.html")),
];

const FAILURE_TEMPLATE: &str = include_str!("../templates/failure.html");

#[derive(Clone)]
pub struct Templates {
    env: Arc<Environment<'static>>,
}

impl Templates {
    pub fn new() -> Result<Self, Error> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source).map_err(|e| Error::Internal {
                operation: format!("compile template {name}: {e}"),
            })?;
        }
        Ok(Self { env: Arc::new(env) })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<Html<String>, Error> {
        let template = self.env.get_template(name).map_err(|e| Error::Internal {
            operation: format!("load template {name}: {e}"),
        })?;
        let body = template.render(ctx).map_err(|e| Error::Internal {
            operation: format!("render template {name}: {e}"),
        })?;
        Ok(Html(body))
    }
}

/// Render the generic failure page.
///
/// Kept apart from [`Templates`] so it works even when the shared environment
/// is the thing that failed.
pub fn render_failure_page(status: StatusCode, message: &str, support_email: &str) -> String {
    let mut env = Environment::new();
    let rendered = env.add_template("failure.html", FAILURE_TEMPLATE).and_then(|_| {
        env.get_template("failure.html")?.render(minijinja::context! {
            status => status.as_u16(),
            message => message,
            support_email => support_email,
        })
    });

    rendered.unwrap_or_else(|e| {
        tracing::error!("Failed to render failure page: {e}");
        format!("Something went wrong. Contact {support_email}.")
    })
}
