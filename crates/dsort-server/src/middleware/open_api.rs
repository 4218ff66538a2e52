//! OpenAPI document generation with a Scalar viewer.

use aide::axum::ApiRouter;
use aide::openapi::{Info, License, OpenApi, Tag};
use aide::scalar::Scalar;
use axum::routing::{Router, get};
use axum::{Extension, Json};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Paths the OpenAPI document and the Scalar UI are served at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct OpenApiConfig {
    /// Path which exposes the OpenAPI JSON specification.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAPI_JSON_PATH", default_value = "/api/openapi.json")
    )]
    pub open_api_json: String,

    /// Path which exposes the Scalar API reference UI.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAPI_SCALAR_PATH", default_value = "/api/scalar")
    )]
    pub scalar_ui: String,
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            open_api_json: "/api/openapi.json".to_owned(),
            scalar_ui: "/api/scalar".to_owned(),
        }
    }
}

/// Extension trait for [`ApiRouter`] to finish the OpenAPI document.
pub trait RouterOpenApiExt<S> {
    /// Generates the document from the router's API routes and serves it
    /// together with the Scalar UI at the configured paths.
    fn with_open_api(self, config: &OpenApiConfig) -> Router<S>;
}

impl<S> RouterOpenApiExt<S> for ApiRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_open_api(self, config: &OpenApiConfig) -> Router<S> {
        async fn serve_openapi(Extension(api): Extension<OpenApi>) -> Json<OpenApi> {
            Json(api)
        }

        let mut api = OpenApi {
            info: Info {
                title: "Distributed Sort API".to_owned(),
                summary: Some("Start, abort and observe distributed sort jobs".to_owned()),
                license: Some(License {
                    name: "MIT".to_owned(),
                    identifier: Some("MIT".to_owned()),
                    ..License::default()
                }),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                ..Info::default()
            },
            tags: vec![
                Tag {
                    name: "Sort".to_owned(),
                    description: Some("Sort job lifecycle".to_owned()),
                    ..Tag::default()
                },
                Tag {
                    name: "Engine Signals".to_owned(),
                    description: Some("Reports from the sort engine".to_owned()),
                    ..Tag::default()
                },
                Tag {
                    name: "Monitors".to_owned(),
                    ..Tag::default()
                },
            ],
            ..OpenApi::default()
        };

        let scalar = Scalar::new(&config.open_api_json);
        let router = self
            .route(&config.scalar_ui, scalar.axum_route())
            .route(&config.open_api_json, get(serve_openapi));

        router.finish_api(&mut api).layer(Extension(api))
    }
}
