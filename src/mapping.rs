use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};

use crate::request::{BuiltRequest, FormValue, RequestBody};
use crate::response::{ResponseBody, ResponseRecord};

/// Turn a built request into a ready-to-send reqwest builder. File parts are
/// read from disk here.
pub async fn to_reqwest(client: &reqwest::Client, req: &BuiltRequest) -> Result<reqwest::RequestBuilder> {
    let mut builder = client.request(req.method.to_reqwest(), &req.url);
    for (k, v) in &req.headers {
        builder = builder.header(k.as_str(), v.as_str());
    }
    builder = match &req.body {
        RequestBody::None => builder,
        RequestBody::Json(body) => builder.body(body.clone()),
        RequestBody::Multipart(parts) => {
            let mut form = Form::new();
            for part in parts {
                form = match &part.value {
                    FormValue::Text(s) => form.text(part.name.clone(), s.clone()),
                    FormValue::File(f) => {
                        let bytes = tokio::fs::read(&f.path)
                            .await
                            .with_context(|| format!("reading upload file {}", f.path.display()))?;
                        form.part(part.name.clone(), Part::bytes(bytes).file_name(f.file_name.clone()))
                    }
                };
            }
            builder.multipart(form)
        }
    };
    Ok(builder)
}

/// Read a response into a record. JSON bodies are parsed, images are
/// summarized by size, everything else is kept as text.
pub async fn record_response(resp: reqwest::Response, started: Instant) -> Result<ResponseRecord> {
    let status = resp.status();
    let headers: BTreeMap<String, String> = resp
        .headers()
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();
    let content_type = headers.get("content-type").cloned().unwrap_or_default();
    let is_image = content_type.contains("image/");

    let body = if content_type.contains("application/json") {
        let text = resp.text().await.context("reading response body")?;
        match serde_json::from_str(&text) {
            Ok(v) => ResponseBody::Json(v),
            Err(_) => ResponseBody::Text(text),
        }
    } else if is_image {
        let bytes = resp.bytes().await.context("reading image body")?;
        ResponseBody::Image { size: bytes.len() as u64 }
    } else {
        ResponseBody::Text(resp.text().await.context("reading response body")?)
    };

    let size = match &body {
        ResponseBody::Json(v) => v.to_string().len(),
        ResponseBody::Image { size } => *size as usize,
        ResponseBody::Text(s) => s.len(),
    };

    Ok(ResponseRecord {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body,
        time: started.elapsed().as_millis() as u64,
        size,
        is_image,
    })
}
