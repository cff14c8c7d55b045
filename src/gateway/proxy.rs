use async_trait::async_trait;
use reqwest::IntoUrl;

use crate::gateway::{
    api, ControlPlane, Error, ErrorKind, MetricSample, ModelRecord, PendingRequest,
    ReferenceTable, RegistrationRequest,
};

impl From<api::Error> for Error {
    fn from(value: api::Error) -> Self {
        let kind = match &value {
            api::Error::Authentication(_) => ErrorKind::Authentication,
            api::Error::PermissionDenied(_) => ErrorKind::PermissionDenied,
            api::Error::BadRequest(_)
            | api::Error::InvalidApiBase(_)
            | api::Error::InvalidEndpoint(_)
            | api::Error::UnprocessableEntity(_) => ErrorKind::BadRequest,
            // Request invalidated by a race condition
            api::Error::Conflict(_) => ErrorKind::BadRequest,
            api::Error::InternalError(_) => ErrorKind::InternalError,
            api::Error::NotFound(_) => ErrorKind::NotFound,
            api::Error::RateLimit(_) => ErrorKind::ExcessUsage,
            api::Error::ApiOverloaded(_) => ErrorKind::InternalError,
            api::Error::UnknownStatus(_) => ErrorKind::UnspecifiedError,

            api::Error::Connect(_) => ErrorKind::Connection,
            api::Error::Timeout(_) => ErrorKind::TimedOut,
            api::Error::Decode(_) => ErrorKind::UnexpectedResponse,
            api::Error::Transport(_) => ErrorKind::UnspecifiedError,
        };

        Error::from_source(kind, Box::new(value))
    }
}

/// The HTTP implementation of [`ControlPlane`].
pub(crate) struct ProxyGateway {
    api: api::ProxyApi,
}

impl ProxyGateway {
    pub(crate) fn new<U: IntoUrl>(
        api_base: U,
        access_token: &str,
        user_id: &str,
        user_role: &str,
    ) -> Result<ProxyGateway, Error> {
        Ok(ProxyGateway {
            api: api::ProxyApi::new(api_base, access_token, user_id, user_role)
                .map_err(Error::from)?,
        })
    }

    pub(crate) fn with_access_token(
        access_token: &str,
        user_id: &str,
        user_role: &str,
    ) -> ProxyGateway {
        ProxyGateway {
            api: api::ProxyApi::with_access_token(access_token, user_id, user_role),
        }
    }
}

#[async_trait]
impl ControlPlane for ProxyGateway {
    async fn model_info(&self) -> Result<Vec<ModelRecord>, Error> {
        Ok(self.api.model_info().await?)
    }

    async fn model_metrics(&self) -> Result<Vec<MetricSample>, Error> {
        Ok(self.api.model_metrics().await?)
    }

    async fn pending_requests(&self) -> Result<Vec<PendingRequest>, Error> {
        Ok(self.api.user_requested_models().await?)
    }

    async fn reference_table(&self) -> Result<ReferenceTable, Error> {
        Ok(self.api.model_cost_map().await?)
    }

    async fn create_model(&self, request: &RegistrationRequest) -> Result<(), Error> {
        Ok(self.api.model_new(request).await?)
    }

    async fn delete_model(&self, model_id: &str) -> Result<(), Error> {
        Ok(self.api.model_delete(model_id).await?)
    }

    async fn health(&self) -> Result<serde_json::Value, Error> {
        Ok(self.api.health().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::api::ApiErrorPayload;

    fn payload() -> ApiErrorPayload {
        ApiErrorPayload {
            message: "denied".to_string(),
            typ: None,
        }
    }

    #[test]
    fn status_errors_map_to_their_kind() {
        let err = Error::from(api::Error::Authentication(payload()));

        assert!(matches!(err.kind(), ErrorKind::Authentication));

        let err = Error::from(api::Error::PermissionDenied(payload()));

        assert!(matches!(err.kind(), ErrorKind::PermissionDenied));

        let err = Error::from(api::Error::NotFound(payload()));

        assert!(matches!(err.kind(), ErrorKind::NotFound));

        let err = Error::from(api::Error::RateLimit(payload()));

        assert!(matches!(err.kind(), ErrorKind::ExcessUsage));
    }

    #[test]
    fn errors_retain_the_api_message() {
        let err = Error::from(api::Error::PermissionDenied(payload()));

        assert!(err.to_string().contains("denied"));
    }
}
