use headers::authorization::{Bearer, Credentials};
use http::{header, Request, Response, StatusCode};
use std::{collections::HashSet, marker::PhantomData};
use tower_http::validate_request::ValidateRequest;

/// Legacy webhook header, kept for callers that predate bearer tokens.
pub const SECRET_HEADER: &str = "x-webhook-secret";

pub struct ManyValidate<ResBody> {
    tokens: HashSet<String>,
    _ty: PhantomData<ResBody>,
}

impl<ResBody> ManyValidate<ResBody> {
    /// An empty token set disables validation entirely.
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            _ty: PhantomData,
        }
    }
}

impl<ResBody> Clone for ManyValidate<ResBody> {
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            _ty: PhantomData,
        }
    }
}

impl<B: Default> ValidateRequest<B> for ManyValidate<B> {
    type ResponseBody = B;

    fn validate(&mut self, request: &mut Request<B>) -> Result<(), Response<Self::ResponseBody>> {
        if self.tokens.is_empty() {
            return Ok(());
        }

        if let Some(secret) = request.headers().get(SECRET_HEADER) {
            match secret.to_str() {
                Ok(secret) if self.tokens.contains(secret) => return Ok(()),
                _ => return Err(unauthorized()),
            }
        }

        match request.headers().get(header::AUTHORIZATION) {
            Some(auth_header) => match Bearer::decode(auth_header) {
                Some(bearer) if self.tokens.contains(bearer.token()) => Ok(()),
                _ => Err(unauthorized()),
            },
            _ => Err(unauthorized()),
        }
    }
}

fn unauthorized<B: Default>() -> Response<B> {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .body(B::default())
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(header_name: &str, value: &str) -> Request<()> {
        Request::builder()
            .uri("/api/devices")
            .header(header_name, value)
            .body(())
            .unwrap()
    }

    #[test]
    fn empty_token_set_accepts_anything() {
        let mut validate = ManyValidate::<()>::new(vec![]);
        let mut req = Request::builder().uri("/api/devices").body(()).unwrap();
        assert!(validate.validate(&mut req).is_ok());
    }

    #[test]
    fn bearer_token_accepted() {
        let mut validate = ManyValidate::<()>::new(vec!["s3cret".to_string()]);
        let mut req = request_with("authorization", "Bearer s3cret");
        assert!(validate.validate(&mut req).is_ok());
    }

    #[test]
    fn webhook_secret_header_accepted() {
        let mut validate = ManyValidate::<()>::new(vec!["s3cret".to_string()]);
        let mut req = request_with(SECRET_HEADER, "s3cret");
        assert!(validate.validate(&mut req).is_ok());
    }

    #[test]
    fn wrong_or_missing_credentials_rejected() {
        let mut validate = ManyValidate::<()>::new(vec!["s3cret".to_string()]);

        let mut req = request_with(SECRET_HEADER, "nope");
        assert!(validate.validate(&mut req).is_err());

        let mut req = request_with("authorization", "Bearer nope");
        assert!(validate.validate(&mut req).is_err());

        let mut req = Request::builder().uri("/api/devices").body(()).unwrap();
        assert!(validate.validate(&mut req).is_err());
    }
}
