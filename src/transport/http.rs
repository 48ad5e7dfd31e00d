//! reqwestによるHTTP実装

use super::FormulaTransport;
use crate::config::Config;
use crate::error::{Action, FormulaManagerError, Result};
use formula_manager_common::{
    ComparisonResult, ExportResponse, Formula, FormulaFields, FormulaId, LatexResponse,
    ManageRequest, ManageResponse,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

const PATH_FORMULAS: &str = "formulas";
const PATH_MANAGE: &str = "manage_formula";
const PATH_FIND_SIMILAR: &str = "find_similar";
const PATH_CONVERT_AST: &str = "convert_ast_to_latex";
const PATH_CONVERT_DOCX: &str = "convert_to_docx";

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FormulaManagerError::Config(format!("HTTPクライアント初期化失敗: {}", e)))?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_seconds))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| FormulaManagerError::Config(format!("URL組み立て失敗 ({}): {}", path, e)))
    }

    /// サーバが返した `file_url` を解決する（相対ならベースURL基準）
    pub fn resolve_file_url(&self, file_url: &str) -> Result<Url> {
        self.base_url.join(file_url).map_err(|e| {
            FormulaManagerError::UnexpectedResponse {
                action: Action::DownloadFile,
                message: format!("invalid file_url {}: {}", file_url, e),
            }
        })
    }

    async fn get_json<R: DeserializeOwned>(&self, action: Action, path: &str) -> Result<R> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, %action, "GET");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| FormulaManagerError::request(action, e))?;
        decode(action, response).await
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        action: Action,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, %action, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| FormulaManagerError::request(action, e))?;
        decode(action, response).await
    }
}

async fn decode<R: DeserializeOwned>(action: Action, response: reqwest::Response) -> Result<R> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        tracing::warn!(%status, %action, body = %text, "request rejected");
        return Err(FormulaManagerError::request(action, format!("HTTP {}", status)));
    }
    response
        .json::<R>()
        .await
        .map_err(|e| FormulaManagerError::request(action, e))
}

/// 末尾に `/` を付け、相対パスの結合でベースのパスが消えないようにする
fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Url::parse(&with_slash)
        .map_err(|e| FormulaManagerError::Config(format!("ベースURLが不正です ({}): {}", base_url, e)))
}

impl FormulaTransport for HttpTransport {
    async fn list_all(&self) -> Result<Value> {
        self.get_json(Action::LoadFormulas, PATH_FORMULAS).await
    }

    async fn create(&self, fields: &FormulaFields, user_id: i64) -> Result<ManageResponse> {
        let body = ManageRequest::create(fields, user_id);
        self.post_json(Action::AddFormula, PATH_MANAGE, &body).await
    }

    async fn update(&self, id: FormulaId, fields: &FormulaFields, user_id: i64) -> Result<ManageResponse> {
        let body = ManageRequest::update(id, fields, user_id);
        self.post_json(Action::SaveFormula, PATH_MANAGE, &body).await
    }

    async fn delete(&self, id: FormulaId, user_id: i64) -> Result<ManageResponse> {
        let body = ManageRequest::delete(id, user_id);
        self.post_json(Action::DeleteFormula, PATH_MANAGE, &body).await
    }

    async fn find_similar(&self, latex: &str) -> Result<Vec<ComparisonResult>> {
        let body = json!({ "formula": latex });
        self.post_json(Action::FindSimilar, PATH_FIND_SIMILAR, &body).await
    }

    async fn convert_ast_to_latex(&self, ast: &[Value]) -> Result<String> {
        let body = json!({ "ast": ast });
        let response: LatexResponse = self
            .post_json(Action::ConvertAst, PATH_CONVERT_AST, &body)
            .await?;
        Ok(response.latex)
    }

    async fn convert_to_export_format(&self, formulas: &[Formula]) -> Result<ExportResponse> {
        self.post_json(Action::ExportFormulas, PATH_CONVERT_DOCX, formulas).await
    }

    async fn fetch_file(&self, file_url: &str) -> Result<Vec<u8>> {
        let url = self.resolve_file_url(file_url)?;
        tracing::debug!(%url, "download");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FormulaManagerError::request(Action::DownloadFile, e))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FormulaManagerError::request(Action::DownloadFile, e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(base, Duration::from_secs(1)).unwrap()
    }

    /// サーバが受け取ったリクエスト
    #[derive(Debug)]
    struct Received {
        method: String,
        path: String,
        body: Vec<u8>,
    }

    impl Received {
        fn json(&self) -> Value {
            serde_json::from_slice(&self.body).expect("request body is not JSON")
        }
    }

    /// 1リクエストだけ受けて決まった応答を返すサーバ
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Received>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test http listener");
        let addr = listener.local_addr().expect("listener addr");

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");

            let mut buf = [0u8; 1024];
            let mut request = Vec::new();
            let header_end = loop {
                let n = socket.read(&mut buf).await.expect("read request");
                assert!(n > 0, "connection closed before headers");
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&request[..header_end]).to_string();
            let mut lines = head.lines();
            let mut start = lines.next().unwrap_or_default().split_whitespace();
            let method = start.next().unwrap_or_default().to_string();
            let path = start.next().unwrap_or_default().to_string();
            let content_length = lines
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);

            let mut received = request[header_end..].to_vec();
            while received.len() < content_length {
                let n = socket.read(&mut buf).await.expect("read body");
                assert!(n > 0, "connection closed before body");
                received.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;

            Received {
                method,
                path,
                body: received,
            }
        });

        (format!("http://{}/", addr), handle)
    }

    #[tokio::test]
    async fn test_list_all_gets_formulas() {
        let (base, server) = serve_once("200 OK", "[]").await;

        let list = transport(&base).list_all().await.expect("空配列は成功");
        assert_eq!(list, json!([]));

        let received = server.await.expect("server task");
        assert_eq!(received.method, "GET");
        assert_eq!(received.path, "/formulas");
    }

    #[tokio::test]
    async fn test_find_similar_posts_formula() {
        let body = r#"[{"formula": {"id": 2, "latex_formula": "E=mc^2"}, "equivalent": false, "similarity": 87.5}]"#;
        let (base, server) = serve_once("200 OK", body).await;

        let results = transport(&base).find_similar("a+b").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].formula.id, FormulaId(2));
        assert_eq!(results[0].similarity, 87.5);

        let received = server.await.expect("server task");
        assert_eq!(received.method, "POST");
        assert_eq!(received.path, "/find_similar");
        assert_eq!(received.json(), json!({"formula": "a+b"}));
    }

    #[tokio::test]
    async fn test_convert_ast_posts_ast_and_reads_latex() {
        let (base, server) = serve_once("200 OK", r#"{"latex": "\\frac{a}{b}"}"#).await;

        let ast = vec![json!({"type": "frac", "num": "a", "den": "b"})];
        let latex = transport(&base).convert_ast_to_latex(&ast).await.unwrap();
        assert_eq!(latex, r"\frac{a}{b}");

        let received = server.await.expect("server task");
        assert_eq!(received.method, "POST");
        assert_eq!(received.path, "/convert_ast_to_latex");
        assert_eq!(received.json(), json!({"ast": [{"type": "frac", "num": "a", "den": "b"}]}));
    }

    /// エクスポートは数式の配列をそのまま送る
    #[tokio::test]
    async fn test_export_posts_bare_array() {
        let (base, server) =
            serve_once("200 OK", r#"{"status": "success", "file_url": "/files/formulas.docx"}"#).await;

        let formulas: Vec<Formula> = serde_json::from_value(json!([
            {"id": 1, "latex_formula": "a^2+b^2=c^2", "legend": "Pythagoras"},
            {"id": 5, "latex_formula": "F=ma"}
        ]))
        .unwrap();
        let response = transport(&base).convert_to_export_format(&formulas).await.unwrap();
        assert_eq!(response.file_url_on_success(), Some("/files/formulas.docx"));

        let received = server.await.expect("server task");
        assert_eq!(received.method, "POST");
        assert_eq!(received.path, "/convert_to_docx");
        let sent = received.json();
        let items = sent.as_array().expect("本文は配列");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], json!(1));
        assert_eq!(items[0]["latex_formula"], json!("a^2+b^2=c^2"));
        assert_eq!(items[1]["id"], json!(5));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_request_error() {
        let (base, server) = serve_once("500 Internal Server Error", r#"{"detail": "boom"}"#).await;

        let err = transport(&base).list_all().await.unwrap_err();
        assert!(matches!(
            err,
            FormulaManagerError::Request { action: Action::LoadFormulas, ref message } if message.contains("500")
        ));
        server.await.expect("server task");
    }

    /// 2xxでも本文が読めなければ失敗
    #[tokio::test]
    async fn test_unparsable_success_body_is_error() {
        let (base, server) = serve_once("200 OK", "<html>oops</html>").await;

        let err = transport(&base).find_similar("x").await.unwrap_err();
        assert!(matches!(err, FormulaManagerError::Request { action: Action::FindSimilar, .. }));
        server.await.expect("server task");
    }

    #[test]
    fn test_endpoint_joins_relative_to_base() {
        let t = transport("http://localhost:8000");
        assert_eq!(t.endpoint(PATH_FORMULAS).unwrap().as_str(), "http://localhost:8000/formulas");

        let t = transport("http://example.com/api");
        assert_eq!(
            t.endpoint(PATH_FIND_SIMILAR).unwrap().as_str(),
            "http://example.com/api/find_similar"
        );
    }

    #[test]
    fn test_resolve_file_url() {
        let t = transport("http://localhost:8000/");
        assert_eq!(
            t.resolve_file_url("/files/formulas.docx").unwrap().as_str(),
            "http://localhost:8000/files/formulas.docx"
        );
        assert_eq!(
            t.resolve_file_url("http://cdn.example.com/out/a.docx").unwrap().as_str(),
            "http://cdn.example.com/out/a.docx"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpTransport::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, FormulaManagerError::Config(_)));
    }
}
