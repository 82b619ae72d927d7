//! Snippets that reproduce a built request in other languages.
//!
//! Pure string formatting. The JSON body is pasted into each language's
//! string literal as-is, so bodies containing that language's quote
//! character produce snippets that need hand-fixing.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::catalog::HttpMethod;
use crate::request::BuiltRequest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Curl,
    #[strum(to_string = "javascript", serialize = "js")]
    JavaScript,
    #[strum(to_string = "python", serialize = "py")]
    Python,
    Php,
    Go,
    #[strum(to_string = "rust", serialize = "rs")]
    Rust,
    Swift,
}

impl Language {
    pub fn all() -> impl Iterator<Item = Language> { Language::iter() }

    pub fn label(self) -> &'static str {
        match self {
            Self::Curl => "cURL",
            Self::JavaScript => "JavaScript",
            Self::Python => "Python",
            Self::Php => "PHP",
            Self::Go => "Go",
            Self::Rust => "Rust",
            Self::Swift => "Swift",
        }
    }

    pub fn generate(self, req: &Snippet<'_>) -> String {
        match self {
            Self::Curl => curl(req),
            Self::JavaScript => javascript(req),
            Self::Python => python(req),
            Self::Php => php(req),
            Self::Go => go(req),
            Self::Rust => rust(req),
            Self::Swift => swift(req),
        }
    }
}

/// The parts of a request every generator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snippet<'a> {
    pub method: HttpMethod,
    pub url: &'a str,
    pub token: Option<&'a str>,
    pub json_body: Option<&'a str>,
}

impl<'a> From<&'a BuiltRequest> for Snippet<'a> {
    fn from(req: &'a BuiltRequest) -> Self {
        Self { method: req.method, url: &req.url, token: req.bearer_token(), json_body: req.json_body() }
    }
}

pub fn generate(language: Language, req: &BuiltRequest) -> String {
    language.generate(&Snippet::from(req))
}

fn curl(r: &Snippet<'_>) -> String {
    let mut cmd = format!("curl -X {} \"{}\"", r.method, r.url);
    if let Some(token) = r.token {
        cmd.push_str(&format!(" \\\n  -H \"Authorization: Bearer {token}\""));
    }
    if let Some(body) = r.json_body {
        cmd.push_str(" \\\n  -H \"Content-Type: application/json\"");
        cmd.push_str(&format!(" \\\n  -d '{body}'"));
    }
    cmd
}

fn javascript(r: &Snippet<'_>) -> String {
    let mut code = format!("const response = await fetch('{}', {{\n", r.url);
    code.push_str(&format!("  method: '{}',\n", r.method));
    code.push_str("  headers: {\n");
    if let Some(token) = r.token {
        code.push_str(&format!("    'Authorization': 'Bearer {token}',\n"));
    }
    match r.json_body {
        Some(body) => {
            code.push_str("    'Content-Type': 'application/json'\n");
            code.push_str("  },\n");
            code.push_str(&format!("  body: JSON.stringify({body})\n"));
        }
        None => code.push_str("  }\n"),
    }
    code.push_str("});\n\n");
    code.push_str("const data = await response.json();\n");
    code.push_str("console.log(data);");
    code
}

fn python(r: &Snippet<'_>) -> String {
    let mut code = String::from("import requests\n\n");
    code.push_str(&format!("url = \"{}\"\n", r.url));
    if let Some(token) = r.token {
        code.push_str("headers = {\n");
        code.push_str(&format!("    \"Authorization\": \"Bearer {token}\"\n"));
        code.push_str("}\n\n");
    }
    let headers_arg = if r.token.is_some() { ", headers=headers" } else { "" };
    let method = r.method.as_lower();
    match r.json_body {
        Some(body) => {
            code.push_str(&format!("data = {body}\n\n"));
            code.push_str(&format!("response = requests.{method}(url{headers_arg}, json=data)\n"));
        }
        None => code.push_str(&format!("response = requests.{method}(url{headers_arg})\n")),
    }
    code.push_str("print(response.json())");
    code
}

fn php(r: &Snippet<'_>) -> String {
    let mut code = String::from("<?php\n");
    code.push_str(&format!("$url = \"{}\";\n", r.url));
    code.push_str("$ch = curl_init($url);\n\n");
    code.push_str(&format!("curl_setopt($ch, CURLOPT_CUSTOMREQUEST, \"{}\");\n", r.method));
    code.push_str("curl_setopt($ch, CURLOPT_RETURNTRANSFER, true);\n\n");
    let mut headers = Vec::new();
    if let Some(token) = r.token {
        headers.push(format!("    \"Authorization: Bearer {token}\""));
    }
    if r.json_body.is_some() {
        headers.push("    \"Content-Type: application/json\"".to_string());
    }
    if !headers.is_empty() {
        code.push_str("$headers = [\n");
        code.push_str(&headers.join(",\n"));
        code.push_str("\n];\n");
        code.push_str("curl_setopt($ch, CURLOPT_HTTPHEADER, $headers);\n\n");
    }
    if let Some(body) = r.json_body {
        code.push_str(&format!("$data = '{body}';\n"));
        code.push_str("curl_setopt($ch, CURLOPT_POSTFIELDS, $data);\n\n");
    }
    code.push_str("$response = curl_exec($ch);\n");
    code.push_str("curl_close($ch);\n\n");
    code.push_str("$data = json_decode($response, true);\n");
    code.push_str("print_r($data);");
    code
}

fn go(r: &Snippet<'_>) -> String {
    let mut code = String::from("package main\n\n");
    code.push_str("import (\n");
    if r.json_body.is_some() {
        code.push_str("    \"bytes\"\n");
    }
    code.push_str("    \"fmt\"\n");
    code.push_str("    \"io\"\n");
    code.push_str("    \"net/http\"\n");
    code.push_str(")\n\n");
    code.push_str("func main() {\n");
    code.push_str(&format!("    url := \"{}\"\n\n", r.url));
    match r.json_body {
        Some(body) => {
            code.push_str(&format!("    payload := []byte(`{body}`)\n"));
            code.push_str(&format!(
                "    req, _ := http.NewRequest(\"{}\", url, bytes.NewBuffer(payload))\n",
                r.method
            ));
        }
        None => code.push_str(&format!("    req, _ := http.NewRequest(\"{}\", url, nil)\n", r.method)),
    }
    if let Some(token) = r.token {
        code.push_str(&format!("    req.Header.Set(\"Authorization\", \"Bearer {token}\")\n"));
    }
    if r.json_body.is_some() {
        code.push_str("    req.Header.Set(\"Content-Type\", \"application/json\")\n");
    }
    code.push_str("\n    client := &http.Client{}\n");
    code.push_str("    resp, _ := client.Do(req)\n");
    code.push_str("    defer resp.Body.Close()\n\n");
    code.push_str("    body, _ := io.ReadAll(resp.Body)\n");
    code.push_str("    fmt.Println(string(body))\n");
    code.push('}');
    code
}

fn rust(r: &Snippet<'_>) -> String {
    let mut code = String::from("#[tokio::main]\n");
    code.push_str("async fn main() -> Result<(), reqwest::Error> {\n");
    code.push_str(&format!("    let url = \"{}\";\n", r.url));
    code.push_str("    let client = reqwest::Client::new();\n\n");
    code.push_str(&format!("    let mut request = client.{}(url);\n\n", r.method.as_lower()));
    if let Some(token) = r.token {
        code.push_str(&format!("    request = request.header(\"Authorization\", \"Bearer {token}\");\n"));
    }
    if let Some(body) = r.json_body {
        code.push_str("    request = request.header(\"Content-Type\", \"application/json\");\n");
        code.push_str(&format!("    request = request.body(r#\"{body}\"#);\n"));
    }
    code.push_str("\n    let response = request.send().await?;\n");
    code.push_str("    let body = response.text().await?;\n");
    code.push_str("    println!(\"{}\", body);\n\n");
    code.push_str("    Ok(())\n");
    code.push('}');
    code
}

fn swift(r: &Snippet<'_>) -> String {
    let mut code = String::from("import Foundation\n\n");
    code.push_str(&format!("let url = URL(string: \"{}\")!\n", r.url));
    code.push_str("var request = URLRequest(url: url)\n");
    code.push_str(&format!("request.httpMethod = \"{}\"\n\n", r.method));
    if let Some(token) = r.token {
        code.push_str(&format!("request.setValue(\"Bearer {token}\", forHTTPHeaderField: \"Authorization\")\n"));
    }
    if let Some(body) = r.json_body {
        code.push_str("request.setValue(\"application/json\", forHTTPHeaderField: \"Content-Type\")\n");
        code.push_str(&format!("let jsonData = \"\"\"\n{body}\n\"\"\".data(using: .utf8)\n"));
        code.push_str("request.httpBody = jsonData\n\n");
    }
    code.push_str("let task = URLSession.shared.dataTask(with: request) { data, response, error in\n");
    code.push_str("    guard let data = data else {\n");
    code.push_str("        print(\"Error: \\(error?.localizedDescription ?? \"Unknown error\")\")\n");
    code.push_str("        return\n");
    code.push_str("    }\n\n");
    code.push_str("    if let json = try? JSONSerialization.jsonObject(with: data, options: []) {\n");
    code.push_str("        print(json)\n");
    code.push_str("    }\n");
    code.push_str("}\n\n");
    code.push_str("task.resume()");
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload() -> Snippet<'static> {
        Snippet {
            method: HttpMethod::Post,
            url: "https://api.img.pro/v1/upload",
            token: Some("tok123"),
            json_body: None,
        }
    }

    #[test]
    fn curl_has_method_url_and_bearer() {
        let out = Language::Curl.generate(&upload());
        assert!(out.contains("-X POST"));
        assert!(out.contains("\"https://api.img.pro/v1/upload\""));
        assert!(out.contains("-H \"Authorization: Bearer tok123\""));
        assert!(!out.contains("-d '"));
    }

    #[test]
    fn curl_appends_json_body() {
        let snip = Snippet { json_body: Some("{\"a\":1}"), ..upload() };
        let out = Language::Curl.generate(&snip);
        assert!(out.ends_with("-H \"Content-Type: application/json\" \\\n  -d '{\"a\":1}'"));
    }

    #[test]
    fn anonymous_request_has_no_auth_anywhere() {
        let snip = Snippet { method: HttpMethod::Get, url: "https://api.img.pro/v1/media/x", token: None, json_body: None };
        for lang in Language::all() {
            let out = lang.generate(&snip);
            assert!(!out.contains("Bearer"), "{lang} leaked auth");
            assert!(out.contains("https://api.img.pro/v1/media/x"), "{lang} lost url");
        }
    }

    #[test]
    fn python_without_token_does_not_reference_headers() {
        let snip = Snippet { token: None, json_body: Some("{}"), ..upload() };
        let out = Language::Python.generate(&snip);
        assert!(out.contains("requests.post(url, json=data)"));
        assert!(!out.contains("headers"));
    }

    #[test]
    fn method_is_lowercased_where_the_language_wants_it() {
        let snip = Snippet { method: HttpMethod::Delete, ..upload() };
        assert!(Language::Rust.generate(&snip).contains("client.delete(url)"));
        assert!(Language::Python.generate(&snip).contains("requests.delete(url, headers=headers)"));
        assert!(Language::Go.generate(&snip).contains("http.NewRequest(\"DELETE\", url, nil)"));
    }

    #[test]
    fn languages_parse_from_names_and_aliases() {
        assert_eq!("curl".parse::<Language>().unwrap(), Language::Curl);
        assert_eq!("JS".parse::<Language>().unwrap(), Language::JavaScript);
        assert_eq!("php".parse::<Language>().unwrap(), Language::Php);
        assert_eq!(Language::all().count(), 7);
        assert_eq!(Language::JavaScript.to_string(), "javascript");
    }

    #[test]
    fn snippet_from_built_request_reads_auth_and_body() {
        use crate::request::RequestBody;
        let req = BuiltRequest {
            method: HttpMethod::Patch,
            url: "https://api.img.pro/v1/media/abc".into(),
            headers: vec![("Authorization".into(), "Bearer t1".into())],
            body: RequestBody::Json("{\"name\":\"n\"}".into()),
        };
        let snip = Snippet::from(&req);
        assert_eq!(snip.token, Some("t1"));
        assert_eq!(snip.json_body, Some("{\"name\":\"n\"}"));
        assert!(generate(Language::Swift, &req).contains("request.httpMethod = \"PATCH\""));
    }
}
