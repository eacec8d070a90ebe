//! OpenAPI document for the JSON API, served at `/api/openapi.json`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    api::{
        handlers,
        models::{
            ErrorBody,
            projects::{ProjectCreate, ProjectResponse},
            support_tickets::{TicketCreate, TicketResponse},
        },
    },
    auth::identity::{Session, SessionUser},
    types::Role,
};

/// Session credentials are accepted from the session cookie or a bearer header.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "BearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token issued at sign-in"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "CookieAuth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("sitegate_session"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api", description = "JSON API")
    ),
    modifiers(&SecurityAddon),
    paths(
        handlers::session::get_session,
        handlers::projects::list_projects,
        handlers::projects::create_project,
        handlers::support_tickets::list_tickets,
        handlers::support_tickets::create_ticket,
        handlers::support_tickets::get_ticket,
    ),
    components(schemas(
        Session,
        SessionUser,
        Role,
        ProjectCreate,
        ProjectResponse,
        TicketCreate,
        TicketResponse,
        ErrorBody,
    )),
    tags(
        (name = "session", description = "Current session"),
        (name = "projects", description = "CMS projects (admins only)"),
        (name = "support", description = "Support tickets"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_guarded_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/session", "/admin/projects", "/support/tickets", "/support/tickets/{ticket_id}"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = &doc.components.as_ref().unwrap().security_schemes;
        assert!(schemes.contains_key("BearerAuth"));
        assert!(schemes.contains_key("CookieAuth"));
    }

    #[test]
    fn test_resource_ids_are_documented_as_uuid_strings() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        for schema in ["ProjectResponse", "TicketResponse"] {
            let id = &doc["components"]["schemas"][schema]["properties"]["id"];
            assert_eq!(id["type"], "string", "{schema}");
            assert_eq!(id["format"], "uuid", "{schema}");
        }
    }
}
