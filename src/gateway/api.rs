use reqwest::{Client, IntoUrl, RequestBuilder, Url};
use serde::Deserialize;

use crate::gateway::{
    MetricSample, ModelRecord, PendingRequest, ReferenceTable, RegistrationRequest,
};

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    /// The API base is not a URL that can be used in a network request
    #[error("invalid api base")]
    InvalidApiBase(#[source] reqwest::Error),

    /// Endpoint URL is invalid
    #[error("invalid endpoint")]
    InvalidEndpoint(
        #[from]
        #[source]
        url::ParseError,
    ),

    /// The proxy could not be reached at the network level
    #[error("failed to connect to the proxy")]
    Connect(#[source] reqwest::Error),

    /// The request timed out in transit
    #[error("request to the proxy timed out")]
    Timeout(#[source] reqwest::Error),

    /// A response body could not be decoded into the expected shape
    #[error("failed to decode the proxy's response")]
    Decode(#[source] reqwest::Error),

    /// A transport failure reqwest does not classify further
    #[error("transport error while talking to the proxy")]
    Transport(#[source] reqwest::Error),

    /// Your request was malformed or missing some required parameters
    #[error("{}", .0.message)]
    BadRequest(ApiErrorPayload),

    /// The access token is missing, expired, or not valid
    #[error("{}", .0.message)]
    Authentication(ApiErrorPayload),

    /// The caller's role does not grant access to the requested resource
    #[error("{}", .0.message)]
    PermissionDenied(ApiErrorPayload),

    /// Requested resource does not exist
    #[error("{}", .0.message)]
    NotFound(ApiErrorPayload),

    /// The resource was updated by another request
    #[error("{}", .0.message)]
    Conflict(ApiErrorPayload),

    /// Unable to process the request despite the format being correct
    #[error("{}", .0.message)]
    UnprocessableEntity(ApiErrorPayload),

    /// You have hit your assigned rate limit
    #[error("{}", .0.message)]
    RateLimit(ApiErrorPayload),

    /// The proxy has an internal issue
    #[error("{}", .0.message)]
    InternalError(ApiErrorPayload),

    /// The proxy is currently overloaded, please try again later
    #[error("{}", .0.message)]
    ApiOverloaded(ApiErrorPayload),

    /// Some unknown error was returned by the API
    #[error("{}", .0.message)]
    UnknownStatus(ApiErrorPayload),
}

impl Error {
    /// Classifies a transport-level reqwest failure. Status-bearing
    /// responses never take this path; they are mapped by `from_status`.
    fn from_transport(err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(err)
        } else if err.is_connect() {
            Error::Connect(err)
        } else if err.is_decode() {
            Error::Decode(err)
        } else {
            Error::Transport(err)
        }
    }

    fn from_status(status: u16, payload: ApiErrorPayload) -> Error {
        match status {
            400 => Error::BadRequest(payload),
            401 => Error::Authentication(payload),
            403 => Error::PermissionDenied(payload),
            404 => Error::NotFound(payload),
            409 => Error::Conflict(payload),
            422 => Error::UnprocessableEntity(payload),
            429 => Error::RateLimit(payload),
            500 => Error::InternalError(payload),
            503 => Error::ApiOverloaded(payload),
            _ => Error::UnknownStatus(payload),
        }
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct ApiErrorPayload {
    pub message: String,
    #[serde(rename = "type", default)]
    pub typ: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    error: ApiErrorPayload,
}

/* Response envelopes */

#[derive(Deserialize, Debug)]
struct ModelInfoResponse {
    data: Vec<ModelRecord>,
}

#[derive(Deserialize, Debug)]
struct PendingRequestsResponse {
    #[serde(default)]
    requests: Vec<PendingRequest>,
}

const DEFAULT_API_BASE: &str = "http://localhost:4000";

/// Raw client for the proxy's administrative endpoints. Every privileged
/// call carries the caller identity: the access token as a bearer
/// credential and the user id/role as query parameters.
pub(crate) struct ProxyApi {
    api_base: Url,
    access_token: String,
    user_id: String,
    user_role: String,
}

impl ProxyApi {
    pub(crate) fn new<U: IntoUrl>(
        api_base: U,
        access_token: &str,
        user_id: &str,
        user_role: &str,
    ) -> Result<ProxyApi, Error> {
        let api_base = api_base.into_url().map_err(Error::InvalidApiBase)?;

        Ok(ProxyApi {
            api_base,
            access_token: access_token.to_string(),
            user_id: user_id.to_string(),
            user_role: user_role.to_string(),
        })
    }

    pub(crate) fn with_access_token(
        access_token: &str,
        user_id: &str,
        user_role: &str,
    ) -> ProxyApi {
        Self::new(DEFAULT_API_BASE, access_token, user_id, user_role).unwrap()
    }

    fn get(&self, endpoint: &str) -> Result<RequestBuilder, Error> {
        let url = self.api_base.join(endpoint)?;

        Ok(Client::new().get(url).bearer_auth(&self.access_token))
    }

    fn post(&self, endpoint: &str) -> Result<RequestBuilder, Error> {
        let url = self.api_base.join(endpoint)?;

        Ok(Client::new().post(url).bearer_auth(&self.access_token))
    }

    /// Issues the request and deserializes a success body, or maps an
    /// error status to its typed variant.
    async fn dispatch<T: serde::de::DeserializeOwned>(req: RequestBuilder) -> Result<T, Error> {
        let res = req.send().await.map_err(Error::from_transport)?;

        let status = res.status();

        if status.is_success() {
            res.json().await.map_err(Error::from_transport)
        } else {
            let err: ApiErrorResponse = res.json().await.map_err(Error::from_transport)?;

            Err(Error::from_status(status.as_u16(), err.error))
        }
    }

    pub(crate) async fn model_info(&self) -> Result<Vec<ModelRecord>, Error> {
        let req = self
            .get("/model/info")?
            .query(&[("user_id", &self.user_id), ("user_role", &self.user_role)]);

        let res: ModelInfoResponse = Self::dispatch(req).await?;

        Ok(res.data)
    }

    pub(crate) async fn model_metrics(&self) -> Result<Vec<MetricSample>, Error> {
        let req = self
            .get("/model/metrics")?
            .query(&[("user_id", &self.user_id), ("user_role", &self.user_role)]);

        Self::dispatch(req).await
    }

    pub(crate) async fn user_requested_models(&self) -> Result<Vec<PendingRequest>, Error> {
        let req = self.get("/user/get_requests")?;

        let res: PendingRequestsResponse = Self::dispatch(req).await?;

        Ok(res.requests)
    }

    pub(crate) async fn model_cost_map(&self) -> Result<ReferenceTable, Error> {
        let req = self.get("/model/cost_map")?;

        Self::dispatch(req).await
    }

    pub(crate) async fn model_new(&self, request: &RegistrationRequest) -> Result<(), Error> {
        let req = self.post("/model/new")?.json(request);

        // The acknowledgment body carries no information we act on.
        let _: serde_json::Value = Self::dispatch(req).await?;

        Ok(())
    }

    pub(crate) async fn model_delete(&self, model_id: &str) -> Result<(), Error> {
        let req = self
            .post("/model/delete")?
            .json(&serde_json::json!({ "id": model_id }));

        let _: serde_json::Value = Self::dispatch(req).await?;

        Ok(())
    }

    pub(crate) async fn health(&self) -> Result<serde_json::Value, Error> {
        let req = self.get("/health")?;

        Self::dispatch(req).await
    }
}
