use std::env;

use rocket::http::Method;
use rocket_cors::{AllowedHeaders, AllowedOrigins, Cors, CorsOptions};

/// The browser client is served from a different origin than this API, so
/// every response needs CORS headers. Allowed origins come from the
/// environment, defaulting to a local dev server.
pub fn create_cors() -> Cors {
    let origins_env =
        env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:8000".to_string());

    let origins: Vec<String> = origins_env
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    CorsOptions {
        allowed_origins: AllowedOrigins::some_exact(&origins),
        allowed_methods: [Method::Get, Method::Post]
            .into_iter()
            .map(Into::into)
            .collect(),
        allowed_headers: AllowedHeaders::some(&["Accept", "Content-Type"]),
        ..Default::default()
    }
    .to_cors()
    .expect("static CORS configuration must be valid")
}
