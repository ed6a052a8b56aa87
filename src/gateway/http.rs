use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{ApiResult, PaymentsApi};
use crate::error::ApiError;
use crate::models::{Credentials, DateRange, NewPatient, NewPayment, Patient, Payment, User};

/// `PaymentsApi` over HTTP/JSON.
///
/// The session cookie set by `POST /login` is kept in the client's cookie store and sent
/// back on every later request.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(header::ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        // Error bodies are best effort; an unreadable one still yields a status error
        let body = response.bytes().await.unwrap_or_default();
        let err = ApiError::from_response_body(status, &body);
        tracing::debug!("{} responded {}: {}", self.base_url, status, err);
        Err(err)
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Like `json`, but a 204 is an empty list rather than a missing body.
    async fn json_list<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<Vec<T>> {
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl PaymentsApi for HttpGateway {
    /// POST /login
    async fn login(&self, credentials: &Credentials) -> ApiResult<User> {
        self.json(self.request(Method::POST, "/login").json(credentials))
            .await
    }

    /// POST /logout, expected to answer 204
    async fn logout(&self) -> ApiResult<()> {
        let response = self.send(self.request(Method::POST, "/logout")).await?;
        if response.status() != StatusCode::NO_CONTENT {
            tracing::debug!("logout answered {} instead of 204", response.status());
        }
        Ok(())
    }

    /// GET /patients?search={query}
    async fn search_patients(&self, query: &str) -> ApiResult<Vec<Patient>> {
        self.json_list(
            self.request(Method::GET, "/patients")
                .query(&[("search", query)]),
        )
        .await
    }

    /// GET /payments?start_date={date}&end_date={date}
    async fn list_payments(&self, range: &DateRange) -> ApiResult<Vec<Payment>> {
        self.json_list(
            self.request(Method::GET, "/payments")
                .query(&range.query_pairs()),
        )
        .await
    }

    /// POST /patients
    async fn create_patient(&self, patient: &NewPatient) -> ApiResult<Patient> {
        self.json(self.request(Method::POST, "/patients").json(patient))
            .await
    }

    /// POST /payments
    async fn create_payment(&self, payment: &NewPayment) -> ApiResult<Payment> {
        self.json(self.request(Method::POST, "/payments").json(payment))
            .await
    }
}
