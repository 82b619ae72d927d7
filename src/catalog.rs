//! Static description of the callable API operations.
//!
//! The catalog drives the playground: every endpoint lists its parameters in
//! the order they should appear (and be appended to query strings), plus a set
//! of named example scenarios. Scenario params are examples only; nothing here
//! checks them against the declared parameters.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::request::ParamValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }

    pub fn as_lower(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Text,
    Number,
    Boolean,
    File,
    Url,
    Select,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub options: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<&'static str>,
}

impl ParameterDescriptor {
    fn new(name: &'static str, kind: ParamType) -> Self {
        Self { name, kind, required: false, placeholder: None, description: None, options: &[], accept: None }
    }

    fn required(mut self) -> Self { self.required = true; self }
    fn placeholder(mut self, p: &'static str) -> Self { self.placeholder = Some(p); self }
    fn describe(mut self, d: &'static str) -> Self { self.description = Some(d); self }
    fn options(mut self, o: &'static [&'static str]) -> Self { self.options = o; self }
    fn accept(mut self, a: &'static str) -> Self { self.accept = Some(a); self }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScenarioOutcome {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestScenario {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub outcome: ScenarioOutcome,
    pub description: &'static str,
    pub params: Vec<(&'static str, ParamValue)>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub clear_auth: bool,
}

impl TestScenario {
    fn new(id: &'static str, name: &'static str, outcome: ScenarioOutcome, description: &'static str) -> Self {
        Self { id, name, outcome, description, params: Vec::new(), clear_auth: false }
    }

    fn text(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, ParamValue::Text(value.into())));
        self
    }

    fn number(mut self, name: &'static str, value: i64) -> Self {
        self.params.push((name, ParamValue::Number(value.into())));
        self
    }

    fn flag(mut self, name: &'static str, value: bool) -> Self {
        self.params.push((name, ParamValue::Bool(value)));
        self
    }

    fn clear_auth(mut self) -> Self { self.clear_auth = true; self }

    pub fn is_error(&self) -> bool { self.outcome == ScenarioOutcome::Error }
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointDescriptor {
    pub id: &'static str,
    pub method: HttpMethod,
    pub path: &'static str,
    pub description: &'static str,
    pub requires_auth: bool,
    pub has_body: bool,
    pub parameters: Vec<ParameterDescriptor>,
    pub scenarios: Vec<TestScenario>,
}

impl EndpointDescriptor {
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn scenario(&self, id: &str) -> Option<&TestScenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    /// Whether `{name}` appears in the path template.
    pub fn is_path_param(&self, name: &str) -> bool {
        self.path.contains(&format!("{{{name}}}"))
    }

    /// Example JSON body for endpoints that take one.
    pub fn example_body(&self) -> Option<serde_json::Value> {
        use serde_json::json;
        match self.id {
            "import" => Some(json!({
                "url": "https://example.com/image.jpg",
                "description": "Example image",
                "tags": "example, demo"
            })),
            "update-media" => Some(json!({
                "name": "updated-name.jpg",
                "description": "Updated description",
                "tags": "updated, tags"
            })),
            "batch-update" => Some(json!({
                "description": "Batch updated",
                "tags": "batch",
                "tag_mode": "replace"
            })),
            _ => None,
        }
    }
}

/// Endpoint visibility filters shown in the sidebar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointFilter {
    /// Only endpoints that need a token.
    pub auth: bool,
    /// Only endpoints callable without a token.
    pub public: bool,
}

impl EndpointFilter {
    pub fn matches(&self, e: &EndpointDescriptor) -> bool {
        if self.auth && !e.requires_auth { return false; }
        if self.public && e.requires_auth { return false; }
        true
    }
}

static CATALOG: OnceLock<Vec<EndpointDescriptor>> = OnceLock::new();

/// All endpoints, in display order.
pub fn endpoints() -> &'static [EndpointDescriptor] {
    CATALOG.get_or_init(build_catalog)
}

pub fn find(id: &str) -> Option<&'static EndpointDescriptor> {
    endpoints().iter().find(|e| e.id == id)
}

/// First endpoint whose path template equals `path`. Several endpoints share
/// a path with different methods, so this is ambiguous by nature.
pub fn find_by_path(path: &str) -> Option<&'static EndpointDescriptor> {
    endpoints().iter().find(|e| e.path == path)
}

/// Prefer the exact method+path match, fall back to the first path match.
pub fn find_by_route(method: HttpMethod, path: &str) -> Option<&'static EndpointDescriptor> {
    endpoints()
        .iter()
        .find(|e| e.path == path && e.method == method)
        .or_else(|| find_by_path(path))
}

pub fn filtered(filter: EndpointFilter) -> impl Iterator<Item = &'static EndpointDescriptor> {
    endpoints().iter().filter(move |e| filter.matches(e))
}

fn build_catalog() -> Vec<EndpointDescriptor> {
    use HttpMethod::*;
    use ParamType::*;
    use ScenarioOutcome::{Error as Fail, Success as Pass};

    let uid = || {
        ParameterDescriptor::new("uid", Text)
            .required()
            .placeholder("abc123")
            .describe("Unique identifier of the media item")
    };
    let public = |d: &'static str| ParameterDescriptor::new("public", Boolean).describe(d);

    vec![
        EndpointDescriptor {
            id: "get-root",
            method: Get,
            path: "/",
            description: "Get service information and available endpoints",
            requires_auth: false,
            has_body: false,
            parameters: vec![],
            scenarios: vec![TestScenario::new("basic", "Basic Info", Pass, "Get service information")],
        },
        EndpointDescriptor {
            id: "upload",
            method: Post,
            path: "/v1/upload",
            description: "Upload an image file",
            requires_auth: true,
            has_body: true,
            parameters: vec![
                ParameterDescriptor::new("file", File)
                    .required()
                    .accept("image/*")
                    .describe("Image file to upload (JPEG, PNG, GIF, WebP, HEIC, etc.)"),
                ParameterDescriptor::new("description", Text)
                    .placeholder("Image description")
                    .describe("Optional description for the image"),
                ParameterDescriptor::new("tags", Text)
                    .placeholder("tag1, tag2, tag3")
                    .describe("Comma-separated tags (max 10 tags, 50 chars each)"),
                ParameterDescriptor::new("ttl", Text)
                    .placeholder("7d or 604800")
                    .describe("Time-to-live for ephemeral images (e.g., 5m, 2h, 7d, or seconds)"),
                public("Make the image publicly accessible"),
            ],
            scenarios: vec![
                TestScenario::new("basic-upload", "Basic Upload", Pass, "Upload a simple image")
                    .text("description", "Test image upload"),
                TestScenario::new("with-tags", "Upload with Tags", Pass, "Upload with tags and metadata")
                    .text("description", "Tagged image")
                    .text("tags", "test, playground, demo")
                    .flag("public", true),
                TestScenario::new("ephemeral", "Ephemeral Upload", Pass, "Upload with expiration")
                    .text("description", "Temporary image")
                    .text("ttl", "1h"),
                TestScenario::new("no-auth", "No Authentication", Fail, "Attempt upload without token").clear_auth(),
                TestScenario::new("invalid-ttl", "Invalid TTL", Fail, "Invalid TTL format").text("ttl", "invalid"),
                TestScenario::new("too-many-tags", "Too Many Tags", Fail, "Exceed tag limit")
                    .text("tags", "tag1, tag2, tag3, tag4, tag5, tag6, tag7, tag8, tag9, tag10, tag11"),
            ],
        },
        EndpointDescriptor {
            id: "import",
            method: Post,
            path: "/v1/import",
            description: "Import an image from a URL",
            requires_auth: true,
            has_body: true,
            parameters: vec![
                ParameterDescriptor::new("url", Url)
                    .required()
                    .placeholder("https://example.com/image.jpg")
                    .describe("URL of the image to import"),
                ParameterDescriptor::new("description", Text)
                    .placeholder("Image description")
                    .describe("Optional description for the image"),
                ParameterDescriptor::new("tags", Text)
                    .placeholder("tag1, tag2, tag3")
                    .describe("Comma-separated tags"),
                ParameterDescriptor::new("ttl", Text)
                    .placeholder("7d")
                    .describe("Time-to-live for ephemeral images"),
                public("Make the image publicly accessible"),
            ],
            scenarios: vec![
                TestScenario::new("import-unsplash", "Import from Unsplash", Pass, "Import a sample Unsplash image")
                    .text("url", "https://images.unsplash.com/photo-1682687220742-aba13b6e50ba?w=400")
                    .text("description", "Sample from Unsplash")
                    .text("tags", "unsplash, demo"),
                TestScenario::new("import-invalid", "Invalid URL", Fail, "Attempt to import from invalid URL")
                    .text("url", "not-a-valid-url"),
                TestScenario::new("import-timeout", "Timeout Test", Fail, "Test timeout handling")
                    .text("url", "https://httpstat.us/200?sleep=35000"),
            ],
        },
        EndpointDescriptor {
            id: "list-media",
            method: Get,
            path: "/v1/media",
            description: "List media items for your team",
            requires_auth: true,
            has_body: false,
            parameters: vec![
                ParameterDescriptor::new("limit", Number)
                    .placeholder("50")
                    .describe("Number of items to return (max 100)"),
                ParameterDescriptor::new("cursor", Text)
                    .placeholder("cursor_string")
                    .describe("Pagination cursor from previous response"),
                ParameterDescriptor::new("ids", Text)
                    .placeholder("uid1,uid2,uid3")
                    .describe("Comma-separated list of specific UIDs to fetch"),
                ParameterDescriptor::new("tags", Text)
                    .placeholder("tag1,tag2")
                    .describe("Filter by tags"),
                ParameterDescriptor::new("tag_mode", Select)
                    .options(&["any", "all"])
                    .describe("Tag matching mode"),
            ],
            scenarios: vec![
                TestScenario::new("list-all", "List All", Pass, "List all media items"),
                TestScenario::new("list-paginated", "Paginated List", Pass, "List with pagination").number("limit", 10),
                TestScenario::new("list-by-tags", "Filter by Tags", Pass, "Filter media by tags")
                    .text("tags", "demo")
                    .text("tag_mode", "any"),
                TestScenario::new("list-specific", "Specific IDs", Pass, "Get specific media items")
                    .text("ids", "abc123,def456"),
            ],
        },
        EndpointDescriptor {
            id: "get-media",
            method: Get,
            path: "/v1/media/{uid}",
            description: "Get details for a specific media item",
            requires_auth: false,
            has_body: false,
            parameters: vec![uid()],
            scenarios: vec![
                TestScenario::new("get-existing", "Get Existing", Pass, "Get an existing media item").text("uid", "sample123"),
                TestScenario::new("get-nonexistent", "Non-existent", Fail, "Attempt to get non-existent media")
                    .text("uid", "doesnotexist"),
                TestScenario::new("get-private", "Private Media", Fail, "Access private media without auth")
                    .text("uid", "private123")
                    .clear_auth(),
            ],
        },
        EndpointDescriptor {
            id: "update-media",
            method: Patch,
            path: "/v1/media/{uid}",
            description: "Update metadata for a media item",
            requires_auth: true,
            has_body: true,
            parameters: vec![
                uid(),
                ParameterDescriptor::new("name", Text).placeholder("new-filename.jpg").describe("New filename"),
                ParameterDescriptor::new("description", Text)
                    .placeholder("New description")
                    .describe("New description"),
                ParameterDescriptor::new("tags", Text)
                    .placeholder("tag1, tag2")
                    .describe("New tags (replaces existing)"),
                public("Update public status"),
            ],
            scenarios: vec![
                TestScenario::new("update-all", "Update All Fields", Pass, "Update all metadata fields")
                    .text("uid", "sample123")
                    .text("name", "updated-name.jpg")
                    .text("description", "Updated description")
                    .text("tags", "updated, new")
                    .flag("public", true),
                TestScenario::new("update-partial", "Partial Update", Pass, "Update only description")
                    .text("uid", "sample123")
                    .text("description", "Only updating description"),
                TestScenario::new("update-unauthorized", "Unauthorized", Fail, "Update without permission")
                    .text("uid", "other-team-media")
                    .text("description", "Should fail"),
            ],
        },
        EndpointDescriptor {
            id: "delete-media",
            method: Delete,
            path: "/v1/media/{uid}",
            description: "Delete a media item",
            requires_auth: true,
            has_body: false,
            parameters: vec![uid().describe("Unique identifier of the media item to delete")],
            scenarios: vec![
                TestScenario::new("delete-single", "Delete Single", Pass, "Delete a single media item").text("uid", "sample123"),
                TestScenario::new("delete-nonexistent", "Non-existent", Fail, "Delete non-existent media")
                    .text("uid", "doesnotexist"),
            ],
        },
        EndpointDescriptor {
            id: "batch-update",
            method: Patch,
            path: "/v1/media",
            description: "Update multiple media items at once",
            requires_auth: true,
            has_body: true,
            parameters: vec![
                ParameterDescriptor::new("ids", Text)
                    .required()
                    .placeholder("uid1,uid2,uid3")
                    .describe("Comma-separated UIDs (max 100)"),
                ParameterDescriptor::new("description", Text)
                    .placeholder("Batch description")
                    .describe("New description for all items"),
                ParameterDescriptor::new("tags", Text).placeholder("tag1, tag2").describe("Tags to apply"),
                ParameterDescriptor::new("tag_mode", Select)
                    .options(&["replace", "add", "remove"])
                    .describe("How to apply tags"),
                public("Update public status"),
            ],
            scenarios: vec![
                TestScenario::new("batch-replace-tags", "Replace Tags", Pass, "Replace tags on multiple items")
                    .text("ids", "abc123,def456,ghi789")
                    .text("tags", "batch, updated")
                    .text("tag_mode", "replace"),
                TestScenario::new("batch-add-tags", "Add Tags", Pass, "Add tags to existing")
                    .text("ids", "abc123,def456")
                    .text("tags", "new-tag")
                    .text("tag_mode", "add"),
                TestScenario::new("batch-too-many", "Too Many UIDs", Fail, "Exceed 100 UID limit")
                    .text("ids", (0..101).map(|i| format!("uid{i}")).collect::<Vec<_>>().join(","))
                    .text("description", "Should fail"),
            ],
        },
        EndpointDescriptor {
            id: "batch-delete",
            method: Delete,
            path: "/v1/media",
            description: "Delete multiple media items at once",
            requires_auth: true,
            has_body: false,
            parameters: vec![ParameterDescriptor::new("ids", Text)
                .required()
                .placeholder("uid1,uid2,uid3")
                .describe("Comma-separated UIDs to delete (max 100)")],
            scenarios: vec![
                TestScenario::new("batch-delete-multiple", "Delete Multiple", Pass, "Delete multiple items")
                    .text("ids", "abc123,def456,ghi789"),
                TestScenario::new("batch-delete-mixed", "Mixed Results", Pass, "Some exist, some don't")
                    .text("ids", "exists1,notexist,exists2"),
            ],
        },
    ]
}
