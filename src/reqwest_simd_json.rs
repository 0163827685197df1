use anyhow::{Context, Result};
use reqwest::RequestBuilder;
use serde::Serialize;

/// Extension trait to send request bodies serialized with simd-json.
pub trait ReqwestSimdJsonExt: Sized {
    fn simd_json<T>(self, json: &T) -> Result<RequestBuilder>
    where
        T: Serialize + ?Sized;
}

impl ReqwestSimdJsonExt for RequestBuilder {
    fn simd_json<T>(self, json: &T) -> Result<RequestBuilder>
    where
        T: Serialize + ?Sized,
    {
        let body = simd_json::to_vec(json).context("Failed to serialize request body")?;

        Ok(self
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body))
    }
}
