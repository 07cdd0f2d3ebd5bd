//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::common::{ApiResponse, EmptyData};
use super::middleware::{
    api_key_middleware, basic_auth_middleware, bearer_auth_middleware, ApiKeyState,
    BasicAuthState, BearerAuthState,
};
use super::modules::{auth, docs, health, metrics, observability, projects, request_id};
use crate::application::{
    AuthPolicy, IdentityService, IngestService, MetricQueryService, ProjectService,
    QuerySuggestionService,
};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::completion::CompletionProvider;
use crate::infrastructure::database::repositories::SeaOrmRepositoryProvider;
use crate::infrastructure::TelemetryHandle;

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token from /api/v1/auth/login"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Api-Key"))),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        auth::change_password,
        projects::create_project,
        projects::list_projects,
        projects::regenerate_key,
        metrics::ingest_metric,
        metrics::list_metrics,
        metrics::export_metrics,
        metrics::aggregate_metrics,
        metrics::chart_metrics,
        metrics::suggest_query,
    ),
    components(
        schemas(
            ApiResponse<String>,
            EmptyData,
            health::HealthResponse,
            health::ComponentHealth,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RegisterRequest,
            auth::UserInfo,
            auth::CurrentUserResponse,
            auth::ChangePasswordRequest,
            projects::CreateProjectRequest,
            projects::ProjectResponse,
            metrics::CreateMetricRequest,
            metrics::MetricResponse,
            metrics::FilterBody,
            metrics::AggregateRequest,
            metrics::AggregateResponse,
            metrics::ChartRequest,
            metrics::ChartResponse,
            metrics::QuerySuggestionRequest,
            metrics::QuerySuggestionResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Authentication", description = "Registration, login (JWT) and password change"),
        (name = "Projects", description = "Projects and their ingest API keys"),
        (name = "Metrics", description = "Metric ingest, filtering, export, aggregation, charting and query suggestions"),
    ),
    info(
        title = "Operation Metrics API",
        version = "1.0.0",
        description = "Collects timed operation records per project and serves filtered, aggregated and charted views of them",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Everything the routers need, built once at startup.
#[derive(Clone)]
pub struct ApiContext {
    pub db: DatabaseConnection,
    pub policy: Arc<AuthPolicy>,
    pub identity: Arc<IdentityService>,
    pub projects: Arc<ProjectService>,
    pub ingest: Arc<IngestService>,
    pub query: Arc<MetricQueryService>,
    pub suggestions: Arc<QuerySuggestionService>,
    /// `None` leaves the docs surface unmounted
    pub docs: Option<BasicAuthState>,
    pub prometheus: PrometheusHandle,
    pub started_at: Arc<Instant>,
}

impl ApiContext {
    pub fn new(
        db: DatabaseConnection,
        config: &AppConfig,
        telemetry: TelemetryHandle,
        completion: Option<Arc<dyn CompletionProvider>>,
        prometheus: PrometheusHandle,
    ) -> Self {
        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let policy = Arc::new(AuthPolicy::new(
            config.security.auth_enabled,
            config.jwt_config(),
        ));

        Self {
            identity: Arc::new(IdentityService::new(
                repos.clone(),
                policy.clone(),
                config.security.bcrypt_cost,
            )),
            projects: Arc::new(ProjectService::new(repos.clone())),
            ingest: Arc::new(IngestService::new(repos.clone(), telemetry)),
            query: Arc::new(MetricQueryService::new(repos)),
            suggestions: Arc::new(QuerySuggestionService::new(completion)),
            docs: config.docs.enabled.then(|| BasicAuthState {
                username: config.docs.username.clone(),
                password: config.docs.password.clone(),
            }),
            policy,
            db,
            prometheus,
            started_at: Arc::new(Instant::now()),
        }
    }
}

/// Create the API router with all routes
pub fn create_api_router(ctx: ApiContext) -> Router {
    let bearer = BearerAuthState {
        policy: ctx.policy.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Auth routes
    let auth_state = auth::AuthHandlerState {
        identity: ctx.identity.clone(),
    };
    let auth_public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .with_state(auth_state.clone());
    let auth_protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/change-password", put(auth::change_password))
        .route_layer(middleware::from_fn_with_state(
            bearer.clone(),
            bearer_auth_middleware,
        ))
        .with_state(auth_state);

    // Project routes
    let project_routes = Router::new()
        .route(
            "/",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/{id}/regenerate-key", post(projects::regenerate_key))
        .route_layer(middleware::from_fn_with_state(
            bearer.clone(),
            bearer_auth_middleware,
        ))
        .with_state(projects::ProjectHandlerState {
            projects: ctx.projects.clone(),
        });

    // Metric routes: ingest is keyed by project API key, the rest by user
    let metrics_state = metrics::MetricsHandlerState {
        ingest: ctx.ingest.clone(),
        query: ctx.query.clone(),
        suggestions: ctx.suggestions.clone(),
    };
    let ingest_routes = Router::new()
        .route("/", post(metrics::ingest_metric))
        .route_layer(middleware::from_fn_with_state(
            ApiKeyState {
                projects: ctx.projects.clone(),
            },
            api_key_middleware,
        ))
        .with_state(metrics_state.clone());
    let metric_query_routes = Router::new()
        .route("/", get(metrics::list_metrics))
        .route("/export", get(metrics::export_metrics))
        .route("/aggregate", post(metrics::aggregate_metrics))
        .route("/chart", post(metrics::chart_metrics))
        .route("/query-suggestion", post(metrics::suggest_query))
        .route_layer(middleware::from_fn_with_state(bearer, bearer_auth_middleware))
        .with_state(metrics_state);

    let mut router = Router::new()
        .route(
            "/health",
            get(health::health_check).with_state(health::HealthState {
                db: ctx.db.clone(),
                started_at: ctx.started_at.clone(),
            }),
        )
        .route(
            "/metrics",
            get(observability::prometheus_metrics).with_state(observability::PrometheusState {
                handle: ctx.prometheus.clone(),
            }),
        )
        .nest("/api/v1/auth", auth_public_routes.merge(auth_protected_routes))
        .nest("/api/v1/projects", project_routes)
        .nest("/api/v1/metrics", ingest_routes.merge(metric_query_routes));

    if let Some(docs_auth) = ctx.docs {
        let docs_routes = Router::new()
            .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
            .route("/demo", get(docs::demo_page))
            .route_layer(middleware::from_fn_with_state(
                docs_auth,
                basic_auth_middleware,
            ));
        router = router.merge(docs_routes);
    }

    router
        .layer(middleware::from_fn(observability::http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
}
