use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};

/// Caller identity used for permission checks.
///
/// Resolved from the `X-Actor-Id` request header. Deployments without an
/// authenticating proxy fall back to the `system` actor, which the default
/// access checker accepts.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            id: "system".to_string(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match extract_header_value(&parts.headers, "x-actor-id") {
            Some(id) => Ok(Actor { id }),
            None => Ok(Actor::system()),
        }
    }
}

fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue, Request};

    #[tokio::test]
    async fn actor_from_header() {
        let request = Request::builder()
            .header(
                HeaderName::from_static("x-actor-id"),
                HeaderValue::from_static("alice"),
            )
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let actor = Actor::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(actor.id, "alice");
    }

    #[tokio::test]
    async fn actor_defaults_to_system() {
        let request = Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let actor = Actor::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(actor.id, "system");
    }
}
