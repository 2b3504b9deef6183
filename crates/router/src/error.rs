use http::Method;
use thiserror::Error;

/// Registration-time failures.
///
/// These indicate an authoring mistake in the route table and are meant to stop startup:
/// [`RouterBuilder::build`](crate::router::RouterBuilder::build) returns the first one recorded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error(
        "conflicting path parameters for {method} {path}: ':{existing}' (registered by {existing_route}) cannot be replaced by ':{conflicting}'"
    )]
    ParamConflict { method: Method, path: String, existing: String, existing_route: String, conflicting: String },

    #[error("empty path parameter name in {method} {path}")]
    EmptyParamName { method: Method, path: String },

    #[error("route {method} {path} has no handlers")]
    EmptyChain { method: Method, path: String },
}

impl RouteError {
    pub fn param_conflict<S: ToString>(
        method: &Method,
        path: S,
        existing: S,
        existing_route: S,
        conflicting: S,
    ) -> Self {
        Self::ParamConflict {
            method: method.clone(),
            path: path.to_string(),
            existing: existing.to_string(),
            existing_route: existing_route.to_string(),
            conflicting: conflicting.to_string(),
        }
    }

    pub fn empty_param_name<S: ToString>(method: &Method, path: S) -> Self {
        Self::EmptyParamName { method: method.clone(), path: path.to_string() }
    }

    pub fn empty_chain<S: ToString>(method: &Method, path: S) -> Self {
        Self::EmptyChain { method: method.clone(), path: path.to_string() }
    }
}

/// Failures decoding request data inside a handler.
///
/// These are ordinary values returned to the handler that asked for the decode; the chain keeps running.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("invalid json body: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid form data: {source}")]
    Form {
        #[from]
        source: serde_urlencoded::de::Error,
    },
}

#[derive(Error, Debug)]
pub enum DispatcherBuildError {
    #[error("router must be set")]
    MissingRouter,
}
