use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "fightsync API",
        version = "0.1.0",
        description = "Read access to synchronized MMA events, fight cards and fighters."
    ),
    paths(
        crate::routes::list_events,
        crate::routes::upcoming_events,
        crate::routes::get_event,
        crate::routes::list_fighters,
        crate::routes::get_fighter,
        crate::routes::flag_fighter,
        crate::routes::trigger_live_sync,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::EventResponse,
        crate::dto::EventListResponse,
        crate::dto::EventDetailResponse,
        crate::dto::CardFightResponse,
        crate::dto::FighterRefResponse,
        crate::dto::FighterResponse,
        crate::dto::FighterListResponse,
        crate::dto::FighterDetailResponse,
        crate::dto::EventRefResponse,
        crate::dto::HistoryFightResponse,
        crate::dto::FlagResponse,
        crate::dto::LiveSyncResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "events", description = "Events and fight cards"),
        (name = "fighters", description = "Fighter profiles and histories"),
        (name = "admin", description = "Refresh flags and sync triggers"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Admin token, configured with FIGHTSYNC_ADMIN_TOKEN.",
                        ))
                        .build(),
                ),
            );
        }
    }
}
