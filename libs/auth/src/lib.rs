use std::{collections::HashSet, marker::PhantomData};

use anyhow::{anyhow, Error};
use headers::authorization::{Bearer, Credentials};
use http::{header, Request, Response, StatusCode};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tower_http::validate_request::ValidateRequest;

use crate::claims::{Claims, MODE_ALL};

pub mod access;
pub mod claims;

pub const ANY_ID: &str = "*";

pub struct Keys {
    encoding: EncodingKey,
}

impl Keys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
        }
    }

    pub fn token(&self, claims: Claims) -> Result<String, Error> {
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| anyhow!(e))
    }
}

pub fn verify(secret: &[u8], token: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| anyhow!(e))
}

fn any_claims() -> Claims {
    Claims {
        id: ANY_ID.to_string(),
        exp: 0,
        mode: MODE_ALL,
    }
}

pub struct ManyValidate<ResBody> {
    tokens: HashSet<String>,
    decoding: Option<DecodingKey>,
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> ManyValidate<ResBody> {
    pub fn new(secret: String, tokens: Vec<String>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            decoding: if secret.is_empty() {
                None
            } else {
                Some(DecodingKey::from_secret(secret.as_bytes()))
            },
            _ty: PhantomData,
        }
    }

    fn is_open(&self) -> bool {
        self.tokens.is_empty() && self.decoding.is_none()
    }
}

impl<ResBody> Clone for ManyValidate<ResBody> {
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            decoding: self.decoding.clone(),
            _ty: PhantomData,
        }
    }
}

fn unauthorized<B: Default>() -> Response<B> {
    let mut res = Response::new(B::default());
    *res.status_mut() = StatusCode::UNAUTHORIZED;
    res
}

impl<B, ResBody> ValidateRequest<B> for ManyValidate<ResBody>
where
    ResBody: Default,
{
    type ResponseBody = ResBody;

    fn validate(&mut self, request: &mut Request<B>) -> Result<(), Response<Self::ResponseBody>> {
        if self.is_open() {
            request.extensions_mut().insert(any_claims());
            return Ok(());
        }

        let bearer = match request.headers().get(header::AUTHORIZATION) {
            Some(auth_header) => Bearer::decode(auth_header),
            None => None,
        };

        match bearer {
            Some(bearer) if self.tokens.contains(bearer.token()) => {
                request.extensions_mut().insert(any_claims());
                Ok(())
            }
            Some(bearer) => match &self.decoding {
                Some(decoding) => {
                    match decode::<Claims>(bearer.token(), decoding, &Validation::default()) {
                        Ok(token_data) => {
                            request.extensions_mut().insert(token_data.claims);
                            Ok(())
                        }
                        Err(_) => Err(unauthorized()),
                    }
                }
                None => Err(unauthorized()),
            },
            None => Err(unauthorized()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Access;

    fn request(token: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri("/api/session/current");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_open_when_unconfigured() {
        let mut validate = ManyValidate::<String>::new(String::new(), vec![]);
        let mut req = request(None);
        assert!(validate.validate(&mut req).is_ok());
        assert_eq!(req.extensions().get::<Claims>(), Some(&any_claims()));
    }

    #[test]
    fn test_static_token() {
        let mut validate = ManyValidate::<String>::new(String::new(), vec!["t0ken".into()]);
        assert!(validate.validate(&mut request(Some("t0ken"))).is_ok());
        let res = validate.validate(&mut request(Some("other"))).unwrap_err();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(validate.validate(&mut request(None)).is_err());
    }

    #[test]
    fn test_jwt_token() {
        let secret = "s3cret";
        let claims = Claims {
            id: "session-1".into(),
            exp: 4_102_444_800,
            mode: Access::publish().into(),
        };
        let token = Keys::new(secret.as_bytes()).token(claims.clone()).unwrap();

        let mut validate = ManyValidate::<String>::new(secret.into(), vec![]);
        let mut req = request(Some(&token));
        assert!(validate.validate(&mut req).is_ok());
        assert_eq!(req.extensions().get::<Claims>(), Some(&claims));

        assert_eq!(verify(secret.as_bytes(), &token).unwrap(), claims);
        assert!(verify(b"wrong", &token).is_err());
    }
}
