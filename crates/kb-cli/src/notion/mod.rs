//! RemoteGateway over the Notion REST API.

mod convert;

pub use convert::{
    MAX_TEXT_LEN, PropertySchema, block_from_json, block_to_json, document_from_page,
    properties_to_json, rich_text_from_json, rich_text_to_json,
};

use async_trait::async_trait;
use kb_sync::blocks::{Block, RemoteBlock};
use kb_sync::gateway::{
    CreatedDocument, DocumentProperties, GatewayError, Page, RemoteDocument, RemoteGateway, Result,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::{NotionSettings, RemoteTarget};

/// Largest page Notion returns.
const PAGE_SIZE: u32 = 100;

/// Paginated list envelope shared by query and block-children endpoints.
#[derive(Debug, Deserialize)]
struct ListResponse {
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl ListResponse {
    fn cursor(&self) -> Option<String> {
        if self.has_more {
            self.next_cursor.clone()
        } else {
            None
        }
    }
}

/// Error body returned by Notion on failure.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// HTTP client for one Notion integration token.
#[derive(Clone, Debug)]
pub struct NotionGateway {
    client: Client,
    base_url: String,
    token: String,
    version: String,
    schema: PropertySchema,
}

impl NotionGateway {
    pub fn new(target: RemoteTarget<'_>, settings: &NotionSettings) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            token: target.token.to_string(),
            version: settings.notion_version.clone(),
            schema: PropertySchema {
                type_property: settings.type_property.clone(),
                status_property: settings.status_property.clone(),
                status_kind: settings.status_kind,
            },
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/v1/{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.version)
    }

    /// Send a request and decode the JSON body, mapping HTTP failures.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| GatewayError::Decode(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(GatewayError::RateLimited),
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound(what.to_string())),
            status => Err(self.error_from_response(status, response).await),
        }
    }

    async fn error_from_response(
        &self,
        status: StatusCode,
        response: reqwest::Response,
    ) -> GatewayError {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) if !body.message.is_empty() => format!("{} ({})", body.message, body.code),
            _ => text,
        };
        GatewayError::Status {
            status: status.as_u16(),
            message,
        }
    }

    fn blocks_json(blocks: &[Block]) -> Value {
        Value::Array(blocks.iter().map(block_to_json).collect())
    }
}

fn parse_list(value: Value) -> Result<ListResponse> {
    serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[async_trait]
impl RemoteGateway for NotionGateway {
    async fn query_documents(
        &self,
        collection_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteDocument>> {
        let mut body = json!({ "page_size": PAGE_SIZE });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        let request = self
            .request(Method::POST, &format!("databases/{collection_id}/query"))
            .json(&body);
        let list = parse_list(self.send(request, collection_id).await?)?;

        let next_cursor = list.cursor();
        let items = list
            .results
            .iter()
            .map(|page| document_from_page(page, &self.schema))
            .collect::<Result<Vec<_>>>()?;
        debug!("Queried {} pages from {}", items.len(), collection_id);
        Ok(Page { items, next_cursor })
    }

    async fn fetch_block_children(
        &self,
        document_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteBlock>> {
        let mut query = vec![("page_size", PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor.to_string()));
        }
        let request = self
            .request(Method::GET, &format!("blocks/{document_id}/children"))
            .query(&query);
        let list = parse_list(self.send(request, document_id).await?)?;

        let next_cursor = list.cursor();
        let items = list
            .results
            .iter()
            .map(block_from_json)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page { items, next_cursor })
    }

    async fn delete_block(&self, block_id: &str) -> Result<()> {
        let request = self.request(Method::DELETE, &format!("blocks/{block_id}"));
        self.send(request, block_id).await?;
        Ok(())
    }

    async fn append_block_children(&self, document_id: &str, blocks: &[Block]) -> Result<()> {
        if blocks.len() > kb_sync::MAX_BLOCKS_PER_REQUEST {
            return Err(GatewayError::BatchTooLarge(blocks.len()));
        }
        let request = self
            .request(Method::PATCH, &format!("blocks/{document_id}/children"))
            .json(&json!({ "children": Self::blocks_json(blocks) }));
        self.send(request, document_id).await?;
        Ok(())
    }

    async fn create_document(
        &self,
        collection_id: &str,
        properties: &DocumentProperties,
        blocks: &[Block],
    ) -> Result<CreatedDocument> {
        if blocks.len() > kb_sync::MAX_BLOCKS_PER_REQUEST {
            return Err(GatewayError::BatchTooLarge(blocks.len()));
        }
        let body = json!({
            "parent": { "database_id": collection_id },
            "properties": properties_to_json(properties, &self.schema),
            "children": Self::blocks_json(blocks),
        });
        let request = self.request(Method::POST, "pages").json(&body);
        let page = self.send(request, collection_id).await?;

        let id = page["id"]
            .as_str()
            .ok_or_else(|| GatewayError::Decode("created page without id".to_string()))?;
        Ok(CreatedDocument {
            id: id.to_string(),
            url: page["url"].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn patch_properties(
        &self,
        document_id: &str,
        properties: &DocumentProperties,
    ) -> Result<()> {
        let body = json!({ "properties": properties_to_json(properties, &self.schema) });
        let request = self
            .request(Method::PATCH, &format!("pages/{document_id}"))
            .json(&body);
        self.send(request, document_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kb_sync::Span;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer a single request with a canned response, yielding the request head.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            let head_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before request head");
                request.extend_from_slice(&chunk[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&request[..head_end]).to_string();
            let content_length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while request.len() < head_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            head
        });

        (base_url, handle)
    }

    fn gateway(base_url: String) -> NotionGateway {
        let settings = NotionSettings {
            api_base_url: base_url,
            ..Default::default()
        };
        let target = RemoteTarget {
            token: "secret",
            database_id: "db",
        };
        let mut gateway = NotionGateway::new(target, &settings);
        gateway.client = Client::builder().no_proxy().build().unwrap();
        gateway
    }

    #[tokio::test]
    async fn test_rate_limit_status_maps_to_rate_limited() {
        let (base_url, server) =
            serve_once("429 Too Many Requests", r#"{"code":"rate_limited"}"#).await;

        let err = gateway(base_url).delete_block("blk-1").await.unwrap_err();

        assert!(matches!(err, GatewayError::RateLimited));
        let head = server.await.unwrap();
        assert!(head.starts_with("DELETE /v1/blocks/blk-1 "));
    }

    #[tokio::test]
    async fn test_missing_object_maps_to_not_found() {
        let (base_url, server) = serve_once("404 Not Found", "{}").await;

        let err = gateway(base_url)
            .fetch_block_children("page-9", None)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::NotFound(ref what) if what == "page-9"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_other_failures_carry_notion_message() {
        let (base_url, server) = serve_once(
            "400 Bad Request",
            r#"{"object":"error","code":"validation_error","message":"body.children should be an array"}"#,
        )
        .await;

        let err = gateway(base_url)
            .append_block_children("page-1", &[Block::paragraph("x")])
            .await
            .unwrap_err();

        match err {
            GatewayError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(
                    message,
                    "body.children should be an array (validation_error)"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_success_decodes_page_and_sends_auth_headers() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"results":[{"id":"b1","type":"paragraph","paragraph":{"rich_text":[{"type":"text","text":{"content":"hi"},"plain_text":"hi"}]}}],"has_more":true,"next_cursor":"c2"}"#,
        )
        .await;

        let page = gateway(base_url)
            .fetch_block_children("page-1", Some("c1"))
            .await
            .unwrap();

        assert_eq!(page.next_cursor.as_deref(), Some("c2"));
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "b1");
        assert_eq!(
            page.items[0].block,
            Some(Block::Paragraph {
                text: vec![Span::plain("hi")]
            })
        );

        let head = server.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /v1/blocks/page-1/children?"));
        assert!(head.contains("start_cursor=c1"));
        assert!(head.contains("authorization: bearer secret"));
        assert!(head.contains("notion-version: "));
    }
}
